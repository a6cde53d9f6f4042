use sosext_core::{
    ActivationKind, CapabilitiesExtensionProvider, ExtensionKey, ExtensionProvider,
    InMemoryOfferingCatalog, OfferingExtensionProvider, SettingsConfig, SettingsContext,
    StaticProviderSource,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

struct Section {
    key: ExtensionKey,
    operation: Option<&'static str>,
    body: &'static str,
}

impl ExtensionProvider for Section {
    fn key(&self) -> &ExtensionKey {
        &self.key
    }

    fn related_operation(&self) -> Option<&str> {
        self.operation
    }
}

impl CapabilitiesExtensionProvider for Section {
    fn section(&self) -> String {
        self.body.to_string()
    }
}

struct PerOffering {
    key: ExtensionKey,
}

impl ExtensionProvider for PerOffering {
    fn key(&self) -> &ExtensionKey {
        &self.key
    }
}

impl OfferingExtensionProvider for PerOffering {
    fn extensions_for(&self, offering: &str) -> Vec<String> {
        vec![format!("<ext offering=\"{offering}\"/>")]
    }
}

fn context() -> SettingsContext {
    SettingsContext::in_memory(
        &SettingsConfig::default(),
        Arc::new(InMemoryOfferingCatalog::new()),
    )
    .unwrap()
}

fn section(
    discriminator: &str,
    operation: Option<&'static str>,
    body: &'static str,
) -> Arc<dyn CapabilitiesExtensionProvider> {
    Arc::new(Section {
        key: ExtensionKey::new("SOS", "2.0.0", discriminator),
        operation,
        body,
    })
}

#[test]
fn providers_need_own_and_related_operation_activation() {
    let context = context();
    let registry = context
        .capabilities_extension_registry(StaticProviderSource::new(vec![
            section("inspire", None, "<inspire/>"),
            section("insertion", Some("InsertObservation"), "<insertion/>"),
        ]))
        .unwrap();

    assert_eq!(
        registry.sections("SOS", "2.0.0").unwrap(),
        vec!["<insertion/>", "<inspire/>"]
    );

    let operation = ExtensionKey::new("SOS", "2.0.0", "InsertObservation");
    context
        .activation()
        .set_active(ActivationKind::Operation, &operation, false)
        .unwrap();
    assert_eq!(registry.sections("SOS", "2.0.0").unwrap(), vec!["<inspire/>"]);

    let insertion = ExtensionKey::new("SOS", "2.0.0", "insertion");
    assert!(registry.is_active(&insertion).unwrap());
    let states = registry.providers_with_state(&insertion).unwrap();
    assert_eq!(states.len(), 1);
    assert!(!states[0].is_active());

    context
        .activation()
        .set_active(ActivationKind::Operation, &operation, true)
        .unwrap();
    context
        .activation()
        .set_active(
            ActivationKind::ExtendedCapabilities,
            &ExtensionKey::new("SOS", "2.0.0", "inspire"),
            false,
        )
        .unwrap();
    assert_eq!(registry.sections("SOS", "2.0.0").unwrap(), vec!["<insertion/>"]);
}

#[test]
fn lookups_are_scoped_to_service_version() {
    let context = context();
    let registry = context
        .capabilities_extension_registry(StaticProviderSource::new(vec![
            section("inspire", None, "<v2/>"),
            Arc::new(Section {
                key: ExtensionKey::new("SOS", "1.0.0", "inspire"),
                operation: None,
                body: "<v1/>",
            }) as Arc<dyn CapabilitiesExtensionProvider>,
        ]))
        .unwrap();

    assert_eq!(registry.sections("SOS", "1.0.0").unwrap(), vec!["<v1/>"]);
    assert_eq!(registry.sections("SOS", "2.0.0").unwrap(), vec!["<v2/>"]);
    assert!(registry.sections("SOS", "3.0.0").unwrap().is_empty());
    assert_eq!(registry.len(), 2);
}

#[test]
fn offering_registry_respects_offering_extension_activation() {
    let context = context();
    let key = ExtensionKey::new("SOS", "2.0.0", "sampling");
    let provider: Arc<dyn OfferingExtensionProvider> =
        Arc::new(PerOffering { key: key.clone() });
    let registry = context
        .offering_extension_registry(StaticProviderSource::new(vec![provider]))
        .unwrap();

    assert_eq!(
        registry.extensions_for("SOS", "2.0.0", "off1").unwrap(),
        vec!["<ext offering=\"off1\"/>"]
    );

    context
        .activation()
        .set_active(ActivationKind::OfferingExtension, &key, false)
        .unwrap();
    assert!(registry
        .extensions_for("SOS", "2.0.0", "off1")
        .unwrap()
        .is_empty());
}

#[test]
fn update_reenumerates_the_source() {
    let context = context();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let registry = context
        .capabilities_extension_registry(move |force_reload: bool| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            if force_reload && n > 0 {
                vec![section("a", None, "<a/>"), section("b", None, "<b/>")]
            } else {
                vec![section("a", None, "<a/>")]
            }
        })
        .unwrap();
    assert_eq!(registry.len(), 1);

    assert_eq!(registry.update().unwrap(), 2);
    assert_eq!(registry.keys().len(), 2);
}
