use super::*;
use std::collections::HashMap;
use std::sync::{LazyLock, RwLock};

/// A mapping from `kty` type tag to the [`KeyType`] capability serving it.
///
/// Stores take their registry by explicit reference, so isolated instances
/// compose freely; [`global`] provides the process-wide default.
pub struct Registry {
    types: RwLock<HashMap<Box<str>, Arc<dyn KeyType>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            types: RwLock::new(HashMap::new()),
        }
    }

    /// Register a key type capability under its tag, replacing any previous
    /// registration for the same tag
    pub fn register(&self, key_type: Arc<dyn KeyType>) -> Result<()> {
        let kty = key_type.kty();
        if kty.is_empty() {
            return Err(Error::InvalidKeyType);
        }

        trace!("Registering key type {kty}");

        self.types
            .write()
            .trace_expect("Failed to lock key type registry")
            .insert(kty.into(), key_type);
        Ok(())
    }

    /// Remove a registration, but only if `key_type` is the exact capability
    /// currently registered for its tag
    pub fn unregister(&self, key_type: &Arc<dyn KeyType>) -> Result<()> {
        let kty = key_type.kty();
        if kty.is_empty() {
            return Err(Error::InvalidKeyType);
        }

        let mut types = self
            .types
            .write()
            .trace_expect("Failed to lock key type registry");
        if types.get(kty).is_some_and(|t| Arc::ptr_eq(t, key_type)) {
            trace!("Unregistering key type {kty}");
            types.remove(kty);
        }
        Ok(())
    }

    /// The capability for `kty`, or `None` for unknown tags
    pub fn get(&self, kty: &str) -> Option<Arc<dyn KeyType>> {
        self.types
            .read()
            .trace_expect("Failed to lock key type registry")
            .get(kty)
            .cloned()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide default registry, with the built-in key types
/// pre-registered
pub fn global() -> &'static Arc<Registry> {
    static GLOBAL: LazyLock<Arc<Registry>> = LazyLock::new(|| {
        let registry = Arc::new(Registry::new());

        #[cfg(feature = "oct")]
        registry
            .register(Arc::new(oct::OctetSequence))
            .trace_expect("Failed to register built-in key types");

        registry
    });
    &GLOBAL
}
