//! Class records: named bindings between an identifier and a creation
//! strategy for one concrete implementation type.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, Weak};

use tracing::debug;

use super::creator::{instance_key, ClassCreator};
use super::factory::{ClassFactory, FactoryShared};

/// String-keyed metadata bag attached to a record.
///
/// Values may be scalars, booleans, nested maps, or sequences. The bag is
/// opaque to registry and record logic; it exists for application use
/// (labels, flags, configuration hints).
pub type ClassData = serde_json::Map<String, serde_json::Value>;

/// A named binding between an identifier and a strategy for creating and
/// destroying instances of one concrete implementation of the shared
/// interface `C`.
///
/// While tracking is enabled (see [`set_registration_enabled`]) the record
/// keeps one reference per live instance it produced. A record dropped with
/// tracked instances releases those references; each instance is
/// deallocated once the callers' own handles are gone.
///
/// [`set_registration_enabled`]: ClassRecord::set_registration_enabled
pub struct ClassRecord<C: ?Sized> {
    name: String,
    creator: Box<dyn ClassCreator<C>>,
    data: RwLock<ClassData>,
    registration_enabled: AtomicBool,
    /// Live instances by address identity, populated while tracking is on.
    tracked: RwLock<HashMap<usize, Arc<C>>>,
    /// Owning registry, observation-only.
    owner: RwLock<Weak<FactoryShared<C>>>,
    self_ref: Weak<ClassRecord<C>>,
}

impl<C: ?Sized> ClassRecord<C> {
    /// Create a detached record with an empty metadata bag.
    pub fn new(name: impl Into<String>, creator: impl ClassCreator<C> + 'static) -> Arc<Self> {
        Self::with_data(name, ClassData::new(), creator)
    }

    /// Create a detached record with an initial metadata bag.
    pub fn with_data(
        name: impl Into<String>,
        data: ClassData,
        creator: impl ClassCreator<C> + 'static,
    ) -> Arc<Self> {
        Arc::new_cyclic(|self_ref| Self {
            name: name.into(),
            creator: Box::new(creator),
            data: RwLock::new(data),
            registration_enabled: AtomicBool::new(false),
            tracked: RwLock::new(HashMap::new()),
            owner: RwLock::new(Weak::new()),
            self_ref: self_ref.clone(),
        })
    }

    /// The primary registration name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The owning registry, if attached.
    pub fn factory(&self) -> Option<ClassFactory<C>> {
        self.owner
            .read()
            .ok()
            .and_then(|owner| owner.upgrade())
            .map(ClassFactory::from_shared)
    }

    /// Change the owning registry.
    ///
    /// No-op when `factory` already owns this record. Otherwise detaches
    /// from the previous owner (if any) and attaches to the new one (if
    /// any), keeping both sides of the attachment in sync.
    pub fn set_factory(&self, factory: Option<&ClassFactory<C>>) {
        let Some(this) = self.self_ref.upgrade() else {
            return;
        };
        let current = self.factory();
        if let (Some(current), Some(next)) = (current.as_ref(), factory) {
            if current.shares_state_with(next) {
                return;
            }
        }
        if let Some(current) = current {
            current.take(&this);
        }
        if let Some(next) = factory {
            next.add_record(&this);
        }
    }

    /// Register `alias` with the owning registry.
    ///
    /// Returns `false` when the record is detached.
    pub fn bind(&self, alias: impl Into<String>) -> bool {
        let Some(this) = self.self_ref.upgrade() else {
            return false;
        };
        match self.factory() {
            Some(factory) => factory.bind_record(alias, &this),
            None => false,
        }
    }

    /// Construct a new instance through the creation strategy.
    ///
    /// The handle is recorded as live while tracking is enabled. Allocation
    /// failure is fatal, not a recoverable error.
    pub fn instance(&self) -> Arc<C> {
        let instance = self.creator.create();
        if self.is_registration_enabled() {
            if let Ok(mut tracked) = self.tracked.write() {
                tracked.insert(instance_key(&*instance), Arc::clone(&instance));
            }
        }
        instance
    }

    /// Destroy an instance produced by this record.
    ///
    /// While tracking is enabled the handle is removed from the tracked set
    /// first (no-op if absent); the strategy's destroy hook then runs
    /// unconditionally. Passing a handle some other record produced is
    /// caller error and is not defended against.
    pub fn destroy(&self, instance: Arc<C>) {
        if self.is_registration_enabled() {
            if let Ok(mut tracked) = self.tracked.write() {
                tracked.remove(&instance_key(&*instance));
            }
        }
        self.creator.destroy(instance);
    }

    /// Destroy every currently tracked instance.
    pub fn destroy_all(&self) {
        // Drain to a snapshot first; each destroy call mutates the set.
        let drained: Vec<Arc<C>> = match self.tracked.write() {
            Ok(mut tracked) => tracked.drain().map(|(_, instance)| instance).collect(),
            Err(_) => Vec::new(),
        };
        if drained.is_empty() {
            return;
        }
        debug!(
            "Destroying {} tracked instance(s) of class '{}'",
            drained.len(),
            self.name
        );
        for instance in drained {
            self.creator.destroy(instance);
        }
    }

    /// Snapshot of the tracked live instances.
    pub fn instances(&self) -> Vec<Arc<C>> {
        self.tracked
            .read()
            .map(|tracked| tracked.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of tracked live instances.
    pub fn instance_count(&self) -> usize {
        self.tracked.read().map(|tracked| tracked.len()).unwrap_or(0)
    }

    /// The metadata bag.
    pub fn data(&self) -> ClassData {
        self.data
            .read()
            .map(|bag| bag.clone())
            .unwrap_or_default()
    }

    /// Replace the metadata bag. No validation is applied.
    pub fn set_data(&self, data: ClassData) {
        if let Ok(mut bag) = self.data.write() {
            *bag = data;
        }
    }

    /// Whether this record tracks the instances it creates.
    pub fn is_registration_enabled(&self) -> bool {
        self.registration_enabled.load(Ordering::SeqCst)
    }

    /// Toggle instance tracking going forward only.
    ///
    /// Already-tracked instances are neither purged nor retroactively
    /// recorded.
    pub fn set_registration_enabled(&self, enabled: bool) {
        self.registration_enabled.store(enabled, Ordering::SeqCst);
    }

    pub(crate) fn tracks_key(&self, key: usize) -> bool {
        self.tracked
            .read()
            .map(|tracked| tracked.contains_key(&key))
            .unwrap_or(false)
    }

    pub(crate) fn set_owner(&self, owner: Weak<FactoryShared<C>>) {
        if let Ok(mut slot) = self.owner.write() {
            *slot = owner;
        }
    }

    pub(crate) fn clear_owner(&self) {
        self.set_owner(Weak::new());
    }
}
