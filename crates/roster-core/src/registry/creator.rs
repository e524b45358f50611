//! Creation strategies for registered implementation types.

use std::sync::Arc;

/// Creation strategy for one concrete implementation of the shared
/// interface `C`.
///
/// A creator knows how to construct an instance of a single implementation
/// type, upcast to `C`, and how to release an instance it produced.
/// `destroy` defaults to dropping the handle, which deallocates the object
/// once no other handles remain; pooling or reuse policies can override it.
pub trait ClassCreator<C: ?Sized>: Send + Sync {
    /// Construct a new instance of the bound implementation type.
    fn create(&self) -> Arc<C>;

    /// Release an instance assumed to have been produced by this creator.
    fn destroy(&self, instance: Arc<C>) {
        drop(instance);
    }
}

/// Creator backed by a constructor closure.
///
/// The closure performs the upcast from the concrete type to `Arc<C>` at
/// the registration site, fixing the implementation type for the lifetime
/// of the record:
///
/// ```
/// use std::sync::Arc;
/// use roster_registry::{ClassCreator, FnCreator};
///
/// trait Shape: Send + Sync {
///     fn sides(&self) -> u32;
/// }
///
/// #[derive(Default)]
/// struct Triangle;
///
/// impl Shape for Triangle {
///     fn sides(&self) -> u32 {
///         3
///     }
/// }
///
/// let creator = FnCreator::<dyn Shape>::new(|| Arc::new(Triangle));
/// assert_eq!(creator.create().sides(), 3);
/// ```
pub struct FnCreator<C: ?Sized> {
    ctor: Box<dyn Fn() -> Arc<C> + Send + Sync>,
}

impl<C: ?Sized> FnCreator<C> {
    /// Wrap a constructor closure.
    pub fn new<F>(ctor: F) -> Self
    where
        F: Fn() -> Arc<C> + Send + Sync + 'static,
    {
        Self {
            ctor: Box::new(ctor),
        }
    }
}

impl<C: ?Sized> ClassCreator<C> for FnCreator<C> {
    fn create(&self) -> Arc<C> {
        (self.ctor)()
    }
}

/// Address identity of an instance, used as its key in tracked sets.
///
/// The cast discards any pointer metadata; two handles compare equal
/// exactly when they point at the same object.
pub(crate) fn instance_key<C: ?Sized>(instance: &C) -> usize {
    instance as *const C as *const u8 as usize
}
