//! Static capabilities, capabilities extension and offering extension storage.
//!
//! # Responsibility
//! - Provide CRUD and (de)activation over the three extension tables.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - At most one static capabilities row is active. Activation clears every
//!   other active row first, inside the caller's transaction.
//! - Saves keep the existing `active`/`disabled` flag of a row.
//! - Operations on unknown identifiers fail with `NoSuchExtension`.

use crate::error::{SettingsError, SettingsResult};
use crate::model::extension::{CapabilitiesExtension, OfferingExtension, StaticCapabilities};
use crate::repo::activation_repo::{bool_to_int, int_to_bool};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::BTreeMap;

/// Repository interface for capabilities settings records.
pub trait CapabilitiesRepository {
    fn active_static_capabilities(&self) -> SettingsResult<Option<StaticCapabilities>>;
    fn static_capabilities(&self) -> SettingsResult<BTreeMap<String, String>>;
    fn static_capabilities_by_id(&self, identifier: &str) -> SettingsResult<Option<String>>;
    fn save_static_capabilities(&self, identifier: &str, document: &str) -> SettingsResult<()>;
    fn delete_static_capabilities(&self, identifier: &str) -> SettingsResult<()>;
    /// Activates one document, or deactivates all of them for `None`.
    fn set_active_static_capabilities(&self, identifier: Option<&str>) -> SettingsResult<()>;

    fn capabilities_extensions(&self) -> SettingsResult<BTreeMap<String, CapabilitiesExtension>>;
    fn save_capabilities_extension(&self, identifier: &str, value: &str) -> SettingsResult<()>;
    fn set_capabilities_extension_disabled(
        &self,
        identifier: &str,
        disabled: bool,
    ) -> SettingsResult<()>;
    fn delete_capabilities_extension(&self, identifier: &str) -> SettingsResult<()>;

    fn offering_extensions(&self) -> SettingsResult<BTreeMap<String, Vec<OfferingExtension>>>;
    fn save_offering_extension(
        &self,
        offering: &str,
        identifier: &str,
        value: &str,
    ) -> SettingsResult<()>;
    fn set_offering_extension_disabled(
        &self,
        offering: &str,
        identifier: &str,
        disabled: bool,
    ) -> SettingsResult<()>;
    fn delete_offering_extension(&self, offering: &str, identifier: &str) -> SettingsResult<()>;

    /// Removes every static capabilities document and extension.
    fn clear_all(&self) -> SettingsResult<()>;
}

/// SQLite-backed capabilities settings repository.
pub struct SqliteCapabilitiesRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteCapabilitiesRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl CapabilitiesRepository for SqliteCapabilitiesRepository<'_> {
    fn active_static_capabilities(&self) -> SettingsResult<Option<StaticCapabilities>> {
        Ok(self
            .conn
            .query_row(
                "SELECT identifier, document FROM static_capabilities WHERE active = 1;",
                [],
                |row| {
                    Ok(StaticCapabilities {
                        identifier: row.get("identifier")?,
                        document: row.get("document")?,
                    })
                },
            )
            .optional()?)
    }

    fn static_capabilities(&self) -> SettingsResult<BTreeMap<String, String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT identifier, document FROM static_capabilities;")?;
        let mut rows = stmt.query([])?;
        let mut documents = BTreeMap::new();

        while let Some(row) = rows.next()? {
            documents.insert(row.get("identifier")?, row.get("document")?);
        }

        Ok(documents)
    }

    fn static_capabilities_by_id(&self, identifier: &str) -> SettingsResult<Option<String>> {
        Ok(self
            .conn
            .query_row(
                "SELECT document FROM static_capabilities WHERE identifier = ?1;",
                [identifier],
                |row| row.get(0),
            )
            .optional()?)
    }

    fn save_static_capabilities(&self, identifier: &str, document: &str) -> SettingsResult<()> {
        self.conn.execute(
            "INSERT INTO static_capabilities (identifier, document)
             VALUES (?1, ?2)
             ON CONFLICT(identifier) DO UPDATE SET
                document = excluded.document,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![identifier, document],
        )?;
        Ok(())
    }

    fn delete_static_capabilities(&self, identifier: &str) -> SettingsResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM static_capabilities WHERE identifier = ?1;",
            [identifier],
        )?;
        ensure_changed(changed, || format!("static capabilities {identifier}"))
    }

    fn set_active_static_capabilities(&self, identifier: Option<&str>) -> SettingsResult<()> {
        if let Some(identifier) = identifier {
            if self.static_capabilities_by_id(identifier)?.is_none() {
                return Err(SettingsError::NoSuchExtension(format!(
                    "static capabilities {identifier}"
                )));
            }
        }

        // Deactivate first: the single-active index is checked per statement.
        self.conn.execute(
            "UPDATE static_capabilities SET active = 0
             WHERE active = 1 AND (?1 IS NULL OR identifier <> ?1);",
            [identifier],
        )?;

        if let Some(identifier) = identifier {
            self.conn.execute(
                "UPDATE static_capabilities SET active = 1 WHERE identifier = ?1;",
                [identifier],
            )?;
        }

        Ok(())
    }

    fn capabilities_extensions(&self) -> SettingsResult<BTreeMap<String, CapabilitiesExtension>> {
        let mut stmt = self
            .conn
            .prepare("SELECT identifier, value, disabled FROM capabilities_extensions;")?;
        let mut rows = stmt.query([])?;
        let mut extensions = BTreeMap::new();

        while let Some(row) = rows.next()? {
            let extension = parse_capabilities_extension_row(row)?;
            extensions.insert(extension.identifier.clone(), extension);
        }

        Ok(extensions)
    }

    fn save_capabilities_extension(&self, identifier: &str, value: &str) -> SettingsResult<()> {
        self.conn.execute(
            "INSERT INTO capabilities_extensions (identifier, value)
             VALUES (?1, ?2)
             ON CONFLICT(identifier) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![identifier, value],
        )?;
        Ok(())
    }

    fn set_capabilities_extension_disabled(
        &self,
        identifier: &str,
        disabled: bool,
    ) -> SettingsResult<()> {
        let changed = self.conn.execute(
            "UPDATE capabilities_extensions
             SET disabled = ?2, updated_at = (strftime('%s', 'now') * 1000)
             WHERE identifier = ?1;",
            params![identifier, bool_to_int(disabled)],
        )?;
        ensure_changed(changed, || format!("capabilities extension {identifier}"))
    }

    fn delete_capabilities_extension(&self, identifier: &str) -> SettingsResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM capabilities_extensions WHERE identifier = ?1;",
            [identifier],
        )?;
        ensure_changed(changed, || format!("capabilities extension {identifier}"))
    }

    fn offering_extensions(&self) -> SettingsResult<BTreeMap<String, Vec<OfferingExtension>>> {
        let mut stmt = self.conn.prepare(
            "SELECT offering, identifier, value, disabled
             FROM offering_extensions
             ORDER BY offering ASC, identifier ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut extensions: BTreeMap<String, Vec<OfferingExtension>> = BTreeMap::new();

        while let Some(row) = rows.next()? {
            let extension = parse_offering_extension_row(row)?;
            extensions
                .entry(extension.offering.clone())
                .or_default()
                .push(extension);
        }

        Ok(extensions)
    }

    fn save_offering_extension(
        &self,
        offering: &str,
        identifier: &str,
        value: &str,
    ) -> SettingsResult<()> {
        self.conn.execute(
            "INSERT INTO offering_extensions (offering, identifier, value)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(offering, identifier) DO UPDATE SET
                value = excluded.value,
                updated_at = (strftime('%s', 'now') * 1000);",
            params![offering, identifier, value],
        )?;
        Ok(())
    }

    fn set_offering_extension_disabled(
        &self,
        offering: &str,
        identifier: &str,
        disabled: bool,
    ) -> SettingsResult<()> {
        let changed = self.conn.execute(
            "UPDATE offering_extensions
             SET disabled = ?3, updated_at = (strftime('%s', 'now') * 1000)
             WHERE offering = ?1 AND identifier = ?2;",
            params![offering, identifier, bool_to_int(disabled)],
        )?;
        ensure_changed(changed, || {
            format!("offering extension {identifier} of {offering}")
        })
    }

    fn delete_offering_extension(&self, offering: &str, identifier: &str) -> SettingsResult<()> {
        let changed = self.conn.execute(
            "DELETE FROM offering_extensions WHERE offering = ?1 AND identifier = ?2;",
            params![offering, identifier],
        )?;
        ensure_changed(changed, || {
            format!("offering extension {identifier} of {offering}")
        })
    }

    fn clear_all(&self) -> SettingsResult<()> {
        self.conn.execute_batch(
            "DELETE FROM static_capabilities;
             DELETE FROM capabilities_extensions;
             DELETE FROM offering_extensions;",
        )?;
        Ok(())
    }
}

fn ensure_changed(changed: usize, describe: impl FnOnce() -> String) -> SettingsResult<()> {
    if changed == 0 {
        return Err(SettingsError::NoSuchExtension(describe()));
    }
    Ok(())
}

fn parse_capabilities_extension_row(row: &Row<'_>) -> SettingsResult<CapabilitiesExtension> {
    Ok(CapabilitiesExtension {
        identifier: row.get("identifier")?,
        value: row.get("value")?,
        disabled: int_to_bool(row.get("disabled")?, "capabilities_extensions.disabled")?,
    })
}

fn parse_offering_extension_row(row: &Row<'_>) -> SettingsResult<OfferingExtension> {
    Ok(OfferingExtension {
        offering: row.get("offering")?,
        identifier: row.get("identifier")?,
        value: row.get("value")?,
        disabled: int_to_bool(row.get("disabled")?, "offering_extensions.disabled")?,
    })
}
