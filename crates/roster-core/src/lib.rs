//! Roster - runtime class registry over a shared interface.
//!
//! Given a shared interface type (a trait object), a [`ClassFactory`] lets
//! applications register named concrete implementations, create and destroy
//! instances through a uniform name- or handle-based API, and optionally
//! track which instances are currently live per registration. Extra alias
//! names may be bound onto any registration, and each record carries an
//! opaque JSON metadata bag for application use.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use roster_registry::ClassFactory;
//!
//! trait Greeter: Send + Sync {
//!     fn greet(&self) -> &'static str;
//! }
//!
//! #[derive(Default)]
//! struct English;
//!
//! impl Greeter for English {
//!     fn greet(&self) -> &'static str {
//!         "hello"
//!     }
//! }
//!
//! let factory = ClassFactory::<dyn Greeter>::new();
//! factory.set_registration(true);
//! factory.add_class("english", || Arc::new(English));
//!
//! let greeter = factory.instance("english").expect("registered class");
//! assert_eq!(greeter.greet(), "hello");
//! assert_eq!(factory.record("english").expect("registered").instance_count(), 1);
//!
//! factory.destroy("english", greeter);
//! assert_eq!(factory.record("english").expect("registered").instance_count(), 0);
//! ```

pub mod error;
pub mod manifest;
pub mod registry;

// Re-export commonly used types
pub use error::{Result, RosterError};
pub use manifest::{ManifestEntry, RegistryManifest};
pub use registry::{ClassCreator, ClassData, ClassFactory, ClassRecord, FnCreator};

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    trait Probe: Send + Sync {
        fn value(&self) -> i32;
    }

    #[derive(Default)]
    struct Alpha;

    impl Probe for Alpha {
        fn value(&self) -> i32 {
            111
        }
    }

    #[derive(Default)]
    struct Beta;

    impl Probe for Beta {
        fn value(&self) -> i32 {
            222
        }
    }

    fn probe_factory() -> ClassFactory<dyn Probe> {
        let factory = ClassFactory::<dyn Probe>::new();
        factory.set_registration(true);
        factory.add_class("a", || Arc::new(Alpha));
        factory.add_class("b", || Arc::new(Beta));
        factory
    }

    #[test]
    fn test_create_and_destroy_by_name() {
        let factory = probe_factory();

        assert!(factory.contains("a"));
        let a = factory.instance("a").unwrap();
        assert_eq!(a.value(), 111);
        assert_eq!(factory.record("a").unwrap().instance_count(), 1);

        factory.destroy("a", a);
        assert_eq!(factory.record("a").unwrap().instance_count(), 0);
    }

    #[test]
    fn test_create_and_destroy_by_handle() {
        let factory = probe_factory();

        assert!(factory.contains("b"));
        let b = factory.instance("b").unwrap();
        assert_eq!(b.value(), 222);
        assert_eq!(factory.record("b").unwrap().instance_count(), 1);

        assert!(factory.destroy_tracked(b));
        assert_eq!(factory.record("b").unwrap().instance_count(), 0);
    }

    #[test]
    fn test_removal_empties_the_registry() {
        let factory = probe_factory();

        assert!(factory.remove_record("a"));
        assert!(!factory.contains("a"));
        assert!(factory.contains("b"));
        assert_eq!(factory.records().len(), 1);

        assert!(factory.remove_record("b"));
        assert!(!factory.contains("b"));
        assert!(factory.is_empty());
    }

    #[test]
    fn test_manifest_decorates_registered_classes() {
        let factory = probe_factory();
        let manifest = RegistryManifest::parse(
            r#"{
                "entries": [
                    { "class": "a", "aliases": ["alpha"], "data": { "weight": 1 } }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(manifest.apply(&factory), 1);
        let record = factory.record("alpha").unwrap();
        assert_eq!(record.name(), "a");
        assert_eq!(record.data()["weight"], 1);
        assert_eq!(factory.instance("alpha").unwrap().value(), 111);
    }
}
