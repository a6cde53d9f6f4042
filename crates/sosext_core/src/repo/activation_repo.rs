//! Activation flag persistence.
//!
//! # Responsibility
//! - Store one boolean activation flag per `(kind, key)`.
//! - Enumerate persisted keys per kind.
//!
//! # Invariants
//! - A missing record means "use the caller's default", never "inactive".
//! - `set_active` writes only when the stored flag differs.

use crate::error::{SettingsError, SettingsResult};
use crate::model::activatable::Activatable;
use crate::model::key::{ActivationKind, ExtensionKey};
use rusqlite::{params, Connection, OptionalExtension, Row};

/// Activation store contract, scoped to one connection or transaction.
pub trait ActivationRepository {
    fn is_active(
        &self,
        kind: ActivationKind,
        key: &ExtensionKey,
        default_active: bool,
    ) -> SettingsResult<bool>;
    /// Returns whether a row was inserted or updated.
    fn set_active(
        &self,
        kind: ActivationKind,
        key: &ExtensionKey,
        active: bool,
    ) -> SettingsResult<bool>;
    fn get_keys(&self, kind: ActivationKind) -> SettingsResult<Vec<ExtensionKey>>;
    fn list(&self, kind: ActivationKind) -> SettingsResult<Vec<Activatable<ExtensionKey>>>;
    fn delete(&self, kind: ActivationKind, key: &ExtensionKey) -> SettingsResult<()>;
    fn clear(&self, kind: ActivationKind) -> SettingsResult<usize>;
}

/// SQLite-backed activation repository.
pub struct SqliteActivationRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteActivationRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn stored_flag(&self, kind: ActivationKind, key: &ExtensionKey) -> SettingsResult<Option<bool>> {
        let value = self
            .conn
            .query_row(
                &format!(
                    "SELECT active FROM {}
                     WHERE service = ?1 AND version = ?2 AND discriminator = ?3;",
                    kind.table()
                ),
                params![key.service(), key.version(), key.discriminator()],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;

        value
            .map(|raw| int_to_bool(raw, kind.table()))
            .transpose()
    }
}

impl ActivationRepository for SqliteActivationRepository<'_> {
    fn is_active(
        &self,
        kind: ActivationKind,
        key: &ExtensionKey,
        default_active: bool,
    ) -> SettingsResult<bool> {
        Ok(self.stored_flag(kind, key)?.unwrap_or(default_active))
    }

    fn set_active(
        &self,
        kind: ActivationKind,
        key: &ExtensionKey,
        active: bool,
    ) -> SettingsResult<bool> {
        match self.stored_flag(kind, key)? {
            None => {
                self.conn.execute(
                    &format!(
                        "INSERT INTO {} (service, version, discriminator, active)
                         VALUES (?1, ?2, ?3, ?4);",
                        kind.table()
                    ),
                    params![
                        key.service(),
                        key.version(),
                        key.discriminator(),
                        bool_to_int(active)
                    ],
                )?;
                Ok(true)
            }
            Some(stored) if stored == active => Ok(false),
            Some(_) => {
                self.conn.execute(
                    &format!(
                        "UPDATE {} SET active = ?4
                         WHERE service = ?1 AND version = ?2 AND discriminator = ?3;",
                        kind.table()
                    ),
                    params![
                        key.service(),
                        key.version(),
                        key.discriminator(),
                        bool_to_int(active)
                    ],
                )?;
                Ok(true)
            }
        }
    }

    fn get_keys(&self, kind: ActivationKind) -> SettingsResult<Vec<ExtensionKey>> {
        Ok(self
            .list(kind)?
            .into_iter()
            .map(Activatable::into_inner)
            .collect())
    }

    fn list(&self, kind: ActivationKind) -> SettingsResult<Vec<Activatable<ExtensionKey>>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT service, version, discriminator, active FROM {}
             ORDER BY service ASC, version ASC, discriminator ASC;",
            kind.table()
        ))?;
        let mut rows = stmt.query([])?;
        let mut entries = Vec::new();

        while let Some(row) = rows.next()? {
            entries.push(parse_activation_row(row, kind)?);
        }

        Ok(entries)
    }

    fn delete(&self, kind: ActivationKind, key: &ExtensionKey) -> SettingsResult<()> {
        let changed = self.conn.execute(
            &format!(
                "DELETE FROM {}
                 WHERE service = ?1 AND version = ?2 AND discriminator = ?3;",
                kind.table()
            ),
            params![key.service(), key.version(), key.discriminator()],
        )?;

        if changed == 0 {
            return Err(SettingsError::NoSuchExtension(format!("{kind}:{key}")));
        }

        Ok(())
    }

    fn clear(&self, kind: ActivationKind) -> SettingsResult<usize> {
        Ok(self
            .conn
            .execute(&format!("DELETE FROM {};", kind.table()), [])?)
    }
}

fn parse_activation_row(
    row: &Row<'_>,
    kind: ActivationKind,
) -> SettingsResult<Activatable<ExtensionKey>> {
    let key = ExtensionKey::new(
        row.get::<_, String>("service")?,
        row.get::<_, String>("version")?,
        row.get::<_, String>("discriminator")?,
    );
    let active = int_to_bool(row.get("active")?, kind.table())?;
    Ok(Activatable::new(key, active))
}

pub(crate) fn int_to_bool(value: i64, table: &str) -> SettingsResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(SettingsError::InvalidData(format!(
            "invalid flag value `{other}` in {table}"
        ))),
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::{ActivationRepository, SqliteActivationRepository};
    use crate::db::open_db_in_memory;
    use crate::error::SettingsError;
    use crate::model::key::{ActivationKind, ExtensionKey};

    fn operation(name: &str) -> ExtensionKey {
        ExtensionKey::new("SOS", "2.0.0", name)
    }

    #[test]
    fn missing_record_returns_default() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteActivationRepository::new(&conn);

        let key = operation("GetObservation");
        assert!(repo.is_active(ActivationKind::Operation, &key, true).unwrap());
        assert!(!repo.is_active(ActivationKind::Operation, &key, false).unwrap());
    }

    #[test]
    fn set_active_upserts_and_skips_redundant_writes() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteActivationRepository::new(&conn);
        let key = operation("GetObservation");

        assert!(repo.set_active(ActivationKind::Operation, &key, true).unwrap());
        assert!(!repo.set_active(ActivationKind::Operation, &key, true).unwrap());
        assert!(repo.set_active(ActivationKind::Operation, &key, false).unwrap());

        assert!(!repo.is_active(ActivationKind::Operation, &key, true).unwrap());
    }

    #[test]
    fn kinds_are_stored_independently() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteActivationRepository::new(&conn);
        let key = ExtensionKey::new("SOS", "2.0.0", "application/json");

        repo.set_active(ActivationKind::ResponseFormat, &key, false)
            .unwrap();

        assert!(repo
            .is_active(ActivationKind::ProcedureDescriptionFormat, &key, true)
            .unwrap());
        assert_eq!(
            repo.get_keys(ActivationKind::ResponseFormat).unwrap(),
            vec![key]
        );
        assert!(repo
            .get_keys(ActivationKind::ProcedureDescriptionFormat)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn delete_unknown_key_is_no_such_extension() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteActivationRepository::new(&conn);

        let err = repo
            .delete(ActivationKind::Operation, &operation("DescribeSensor"))
            .unwrap_err();
        assert!(matches!(err, SettingsError::NoSuchExtension(_)));
    }

    #[test]
    fn clear_removes_all_rows_of_one_kind() {
        let conn = open_db_in_memory().unwrap();
        let repo = SqliteActivationRepository::new(&conn);

        repo.set_active(ActivationKind::Operation, &operation("A"), true)
            .unwrap();
        repo.set_active(ActivationKind::Operation, &operation("B"), false)
            .unwrap();

        assert_eq!(repo.clear(ActivationKind::Operation).unwrap(), 2);
        assert!(repo.list(ActivationKind::Operation).unwrap().is_empty());
    }
}
