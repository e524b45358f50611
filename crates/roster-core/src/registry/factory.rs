//! The class registry: owner and lookup table for class records.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::creator::{instance_key, FnCreator};
use super::record::{ClassData, ClassRecord};

/// State shared between a [`ClassFactory`] and its clones.
///
/// Records and aliases live here so that cloned registries observe each
/// other's registrations; the whole structure is released when the last
/// clone drops.
pub(crate) struct FactoryShared<C: ?Sized> {
    /// Owned records, keyed by record identity. Order is irrelevant.
    records: RwLock<HashMap<usize, Arc<ClassRecord<C>>>>,
    /// Alias table; many names may map to one record.
    aliases: RwLock<HashMap<String, Arc<ClassRecord<C>>>>,
    /// Default tracking flag consumed by `add_class` at call time.
    registration_enabled: AtomicBool,
}

fn record_key<C: ?Sized>(record: &Arc<ClassRecord<C>>) -> usize {
    Arc::as_ptr(record) as usize
}

/// Owner and lookup table for class records, keyed by name and alias.
///
/// One factory manages a family of interchangeable implementations of the
/// shared interface `C`. Cloning a factory shares its record collection and
/// alias table.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use roster_registry::ClassFactory;
///
/// trait Greeter: Send + Sync {
///     fn greet(&self) -> &'static str;
/// }
///
/// #[derive(Default)]
/// struct English;
///
/// impl Greeter for English {
///     fn greet(&self) -> &'static str {
///         "hello"
///     }
/// }
///
/// let factory = ClassFactory::<dyn Greeter>::new();
/// factory.set_registration(true);
/// factory.add_class("english", || Arc::new(English));
///
/// let greeter = factory.instance("english").expect("registered class");
/// assert_eq!(greeter.greet(), "hello");
///
/// factory.destroy("english", greeter);
/// ```
pub struct ClassFactory<C: ?Sized> {
    shared: Arc<FactoryShared<C>>,
}

impl<C: ?Sized> Clone for ClassFactory<C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<C: ?Sized> Default for ClassFactory<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: ?Sized> ClassFactory<C> {
    /// Create an empty registry with tracking disabled by default.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(FactoryShared {
                records: RwLock::new(HashMap::new()),
                aliases: RwLock::new(HashMap::new()),
                registration_enabled: AtomicBool::new(false),
            }),
        }
    }

    pub(crate) fn from_shared(shared: Arc<FactoryShared<C>>) -> Self {
        Self { shared }
    }

    pub(crate) fn shares_state_with(&self, other: &ClassFactory<C>) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    pub(crate) fn downgrade(&self) -> std::sync::Weak<FactoryShared<C>> {
        Arc::downgrade(&self.shared)
    }

    /// Register a class under `name` with a constructor closure.
    ///
    /// The closure upcasts the concrete type to the shared interface:
    /// `factory.add_class("sphere", || Arc::new(Sphere::default()))`.
    /// Tracking for the new record is inherited from the registry default
    /// at the moment of this call; later [`set_registration`] calls do not
    /// affect it.
    ///
    /// [`set_registration`]: ClassFactory::set_registration
    pub fn add_class<F>(&self, name: impl Into<String>, ctor: F) -> Arc<ClassRecord<C>>
    where
        F: Fn() -> Arc<C> + Send + Sync + 'static,
        C: 'static,
    {
        self.add_class_with_data(name, ClassData::new(), ctor)
    }

    /// Register a class with an initial metadata bag.
    pub fn add_class_with_data<F>(
        &self,
        name: impl Into<String>,
        data: ClassData,
        ctor: F,
    ) -> Arc<ClassRecord<C>>
    where
        F: Fn() -> Arc<C> + Send + Sync + 'static,
        C: 'static,
    {
        let record = ClassRecord::with_data(name, data, FnCreator::new(ctor));
        record.set_registration_enabled(self.is_registration_enabled());
        self.add_record(&record);
        record
    }

    /// Look up a record by name or alias. Absent names yield `None`.
    pub fn record(&self, name: &str) -> Option<Arc<ClassRecord<C>>> {
        self.shared
            .aliases
            .read()
            .ok()
            .and_then(|aliases| aliases.get(name).cloned())
    }

    /// Attach an externally built record.
    ///
    /// No-op when this registry already owns the record. A record owned by
    /// another registry is detached from it first. The record's name
    /// becomes an alias, overwriting any prior alias with the same string.
    pub fn add_record(&self, record: &Arc<ClassRecord<C>>) {
        if self.owns(record) {
            return;
        }
        if let Some(previous) = record.factory() {
            previous.take(record);
        }
        if let Ok(mut records) = self.shared.records.write() {
            records.insert(record_key(record), Arc::clone(record));
        }
        if let Ok(mut aliases) = self.shared.aliases.write() {
            aliases.insert(record.name().to_string(), Arc::clone(record));
        }
        record.set_owner(self.downgrade());
        debug!("Registered class record '{}'", record.name());
    }

    /// Detach `record` without destroying it.
    ///
    /// Removes the record from the owned collection, removes every alias
    /// entry pointing at it, and clears its owner back-reference. Returns
    /// `false` when the record is not owned by this registry.
    pub fn take(&self, record: &Arc<ClassRecord<C>>) -> bool {
        let removed = self
            .shared
            .records
            .write()
            .ok()
            .map(|mut records| records.remove(&record_key(record)).is_some())
            .unwrap_or(false);
        if !removed {
            return false;
        }
        if let Ok(mut aliases) = self.shared.aliases.write() {
            aliases.retain(|_, candidate| !Arc::ptr_eq(candidate, record));
        }
        record.clear_owner();
        debug!("Detached class record '{}'", record.name());
        true
    }

    /// Detach the record registered under `name`, returning it.
    pub fn take_record(&self, name: &str) -> Option<Arc<ClassRecord<C>>> {
        let record = self.record(name)?;
        self.take(&record);
        Some(record)
    }

    /// Detach and drop the record registered under `name`.
    ///
    /// Callers must not rely on instances that depended on the removed
    /// record's destroy strategy.
    pub fn remove_record(&self, name: &str) -> bool {
        self.take_record(name).is_some()
    }

    /// Detach and drop a record held by handle.
    pub fn remove(&self, record: &Arc<ClassRecord<C>>) -> bool {
        self.take(record)
    }

    /// Whether `name` resolves through the alias table.
    pub fn contains(&self, name: &str) -> bool {
        self.shared
            .aliases
            .read()
            .map(|aliases| aliases.contains_key(name))
            .unwrap_or(false)
    }

    /// Whether this registry owns `record`.
    pub fn owns(&self, record: &Arc<ClassRecord<C>>) -> bool {
        self.shared
            .records
            .read()
            .map(|records| records.contains_key(&record_key(record)))
            .unwrap_or(false)
    }

    /// Create an instance of the class registered under `name`.
    pub fn instance(&self, name: &str) -> Option<Arc<C>> {
        self.record(name).map(|record| record.instance())
    }

    /// Destroy `instance` through the record registered under `name`.
    ///
    /// An unknown name releases the handle without invoking any strategy.
    pub fn destroy(&self, name: &str, instance: Arc<C>) {
        if let Some(record) = self.record(name) {
            record.destroy(instance);
        }
    }

    /// Destroy `instance` through whichever owned record tracks it.
    ///
    /// Only tracked instances can be matched: when the producing record has
    /// tracking disabled the handle cannot be found, and the call merely
    /// releases it and reports `false`. This is a limitation of
    /// tracking-gated lookup, not an error.
    pub fn destroy_tracked(&self, instance: Arc<C>) -> bool {
        match self.find_record(&instance) {
            Some(record) => {
                record.destroy(instance);
                true
            }
            None => false,
        }
    }

    /// Map `alias` onto the record registered under `name`.
    ///
    /// Fails when `name` does not resolve.
    pub fn bind(&self, alias: impl Into<String>, name: &str) -> bool {
        match self.record(name) {
            Some(record) => self.bind_record(alias, &record),
            None => false,
        }
    }

    /// Map `alias` onto `record`.
    ///
    /// Fails when the record is not owned by this registry, so aliases can
    /// never point at foreign records.
    pub fn bind_record(&self, alias: impl Into<String>, record: &Arc<ClassRecord<C>>) -> bool {
        if !self.owns(record) {
            return false;
        }
        match self.shared.aliases.write() {
            Ok(mut aliases) => {
                aliases.insert(alias.into(), Arc::clone(record));
                true
            }
            Err(_) => false,
        }
    }

    /// Remove exactly one alias entry.
    ///
    /// Other aliases of the same record, and the record itself, are
    /// unaffected.
    pub fn unbind(&self, name: &str) -> bool {
        self.shared
            .aliases
            .write()
            .ok()
            .map(|mut aliases| aliases.remove(name).is_some())
            .unwrap_or(false)
    }

    /// Default tracking flag consumed by subsequent [`add_class`] calls.
    ///
    /// [`add_class`]: ClassFactory::add_class
    pub fn is_registration_enabled(&self) -> bool {
        self.shared.registration_enabled.load(Ordering::SeqCst)
    }

    /// Set the default tracking flag. Records created earlier keep theirs.
    pub fn set_registration(&self, enabled: bool) {
        self.shared.registration_enabled.store(enabled, Ordering::SeqCst);
    }

    /// Find the owned record tracking `instance`.
    ///
    /// Linear scan over owned records' tracked sets; `None` when nothing
    /// tracks the handle, including when the true producer has tracking
    /// disabled.
    pub fn find_record(&self, instance: &C) -> Option<Arc<ClassRecord<C>>> {
        let key = instance_key(instance);
        let records = self.shared.records.read().ok()?;
        records
            .values()
            .find(|record| record.tracks_key(key))
            .cloned()
    }

    /// Snapshot of all owned records.
    pub fn records(&self) -> Vec<Arc<ClassRecord<C>>> {
        self.shared
            .records
            .read()
            .map(|records| records.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of owned records.
    pub fn len(&self) -> usize {
        self.shared
            .records
            .read()
            .map(|records| records.len())
            .unwrap_or(0)
    }

    /// Whether the registry owns no records.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Codec: Send + Sync {
        fn id(&self) -> &'static str;
    }

    #[derive(Default)]
    struct JsonCodec;

    impl Codec for JsonCodec {
        fn id(&self) -> &'static str {
            "json"
        }
    }

    #[derive(Default)]
    struct YamlCodec;

    impl Codec for YamlCodec {
        fn id(&self) -> &'static str {
            "yaml"
        }
    }

    fn codec_factory() -> ClassFactory<dyn Codec> {
        let factory = ClassFactory::<dyn Codec>::new();
        factory.add_class("json", || Arc::new(JsonCodec));
        factory.add_class("yaml", || Arc::new(YamlCodec));
        factory
    }

    #[test]
    fn test_add_class_registers_name() {
        let factory = codec_factory();
        assert!(factory.contains("json"));
        assert!(factory.contains("yaml"));
        assert_eq!(factory.len(), 2);
        assert_eq!(factory.instance("json").unwrap().id(), "json");
    }

    #[test]
    fn test_unknown_name_lookups_are_absent() {
        let factory = codec_factory();
        assert!(factory.record("toml").is_none());
        assert!(factory.instance("toml").is_none());
        assert!(!factory.contains("toml"));
    }

    #[test]
    fn test_add_class_inherits_current_tracking_default() {
        let factory = ClassFactory::<dyn Codec>::new();
        factory.set_registration(true);
        let tracked = factory.add_class("json", || Arc::new(JsonCodec));

        factory.set_registration(false);
        let untracked = factory.add_class("yaml", || Arc::new(YamlCodec));

        assert!(tracked.is_registration_enabled());
        assert!(!untracked.is_registration_enabled());

        // Flipping the default later does not rewrite existing records.
        factory.set_registration(true);
        assert!(!untracked.is_registration_enabled());
    }

    #[test]
    fn test_bind_and_unbind_aliases() {
        let factory = codec_factory();
        assert!(factory.bind("js", "json"));

        let by_alias = factory.record("js").unwrap();
        let by_name = factory.record("json").unwrap();
        assert!(Arc::ptr_eq(&by_alias, &by_name));

        assert!(factory.unbind("js"));
        assert!(factory.record("js").is_none());
        assert!(factory.record("json").is_some());
    }

    #[test]
    fn test_bind_unknown_name_fails() {
        let factory = codec_factory();
        assert!(!factory.bind("t", "toml"));
    }

    #[test]
    fn test_bind_record_rejects_foreign_record() {
        let factory = codec_factory();
        let other = ClassFactory::<dyn Codec>::new();
        let foreign = other.add_class("toml", || Arc::new(JsonCodec));

        assert!(!factory.bind_record("t", &foreign));
        assert!(!factory.contains("t"));
    }

    #[test]
    fn test_take_record_removes_every_alias() {
        let factory = codec_factory();
        factory.bind("js", "json");
        factory.bind("j", "json");

        let record = factory.take_record("json").unwrap();
        assert!(record.factory().is_none());
        assert!(!factory.contains("json"));
        assert!(!factory.contains("js"));
        assert!(!factory.contains("j"));
        assert!(factory.contains("yaml"));
        assert_eq!(factory.len(), 1);
    }

    #[test]
    fn test_take_rejects_foreign_record() {
        let factory = codec_factory();
        let other = ClassFactory::<dyn Codec>::new();
        let foreign = other.add_class("toml", || Arc::new(JsonCodec));

        assert!(!factory.take(&foreign));
        assert!(other.owns(&foreign));
    }

    #[test]
    fn test_remove_record_leaves_other_records() {
        let factory = codec_factory();
        assert!(factory.remove_record("json"));
        assert!(!factory.contains("json"));
        assert!(factory.contains("yaml"));
        assert_eq!(factory.len(), 1);

        assert!(!factory.remove_record("json"));

        let yaml = factory.record("yaml").unwrap();
        assert!(factory.remove(&yaml));
        assert!(factory.is_empty());
    }

    #[test]
    fn test_add_record_is_noop_when_already_owned() {
        let factory = codec_factory();
        let record = factory.record("json").unwrap();

        factory.add_record(&record);
        assert_eq!(factory.len(), 2);
    }

    #[test]
    fn test_add_record_moves_record_between_registries() {
        let first = codec_factory();
        let second = ClassFactory::<dyn Codec>::new();
        let record = first.record("json").unwrap();

        second.add_record(&record);
        assert!(!first.owns(&record));
        assert!(!first.contains("json"));
        assert!(second.owns(&record));
        assert!(second.contains("json"));
    }

    #[test]
    fn test_add_class_with_same_name_rebinds_alias() {
        let factory = codec_factory();
        let replacement = factory.add_class("json", || Arc::new(YamlCodec));

        // Both records stay owned; the alias resolves to the newcomer.
        assert_eq!(factory.len(), 3);
        let resolved = factory.record("json").unwrap();
        assert!(Arc::ptr_eq(&resolved, &replacement));
        assert_eq!(factory.instance("json").unwrap().id(), "yaml");
    }

    #[test]
    fn test_destroy_by_name_updates_tracked_count() {
        let factory = ClassFactory::<dyn Codec>::new();
        factory.set_registration(true);
        let record = factory.add_class("json", || Arc::new(JsonCodec));

        let instance = factory.instance("json").unwrap();
        assert_eq!(record.instance_count(), 1);

        factory.destroy("json", instance);
        assert_eq!(record.instance_count(), 0);
    }

    #[test]
    fn test_destroy_tracked_decrements_only_the_producer() {
        let factory = ClassFactory::<dyn Codec>::new();
        factory.set_registration(true);
        let json = factory.add_class("json", || Arc::new(JsonCodec));
        let yaml = factory.add_class("yaml", || Arc::new(YamlCodec));

        let json_instance = factory.instance("json").unwrap();
        let _yaml_instance = factory.instance("yaml").unwrap();
        assert_eq!(json.instance_count(), 1);
        assert_eq!(yaml.instance_count(), 1);

        assert!(factory.destroy_tracked(json_instance));
        assert_eq!(json.instance_count(), 0);
        assert_eq!(yaml.instance_count(), 1);
    }

    #[test]
    fn test_destroy_tracked_misses_untracked_instances() {
        let factory = codec_factory();
        let instance = factory.instance("json").unwrap();

        // Tracking is off, so the producing record cannot be found.
        assert!(!factory.destroy_tracked(instance));
    }

    #[test]
    fn test_find_record_scans_tracked_sets() {
        let factory = ClassFactory::<dyn Codec>::new();
        factory.set_registration(true);
        let record = factory.add_class("json", || Arc::new(JsonCodec));

        let instance = record.instance();
        let found = factory.find_record(&*instance).unwrap();
        assert!(Arc::ptr_eq(&found, &record));

        record.destroy(instance);
        let another = ClassFactory::<dyn Codec>::new();
        let orphan = another.add_class("yaml", || Arc::new(YamlCodec)).instance();
        assert!(factory.find_record(&*orphan).is_none());
    }

    #[test]
    fn test_records_returns_snapshot() {
        let factory = codec_factory();
        let snapshot = factory.records();
        assert_eq!(snapshot.len(), 2);

        factory.remove_record("json");
        assert_eq!(snapshot.len(), 2);
        assert_eq!(factory.records().len(), 1);
    }

    #[test]
    fn test_clones_share_registrations() {
        let factory = codec_factory();
        let clone = factory.clone();

        clone.add_class("toml", || Arc::new(JsonCodec));
        assert!(factory.contains("toml"));

        factory.remove_record("yaml");
        assert!(!clone.contains("yaml"));
    }
}
