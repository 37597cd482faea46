use super::*;
use std::{collections::BTreeMap, sync::RwLock};


/// Match criteria for [`KeyStore`] queries; unset fields are wildcards
#[derive(Debug, Default, Clone)]
pub struct Filter {
    kty: Option<Box<str>>,
    key_use: Option<Box<str>>,
    alg: Option<Box<str>>,
    kid: Option<Box<str>>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn kty(mut self, kty: &str) -> Self {
        self.kty = Some(kty.into());
        self
    }

    pub fn key_use(mut self, key_use: &str) -> Self {
        self.key_use = Some(key_use.into());
        self
    }

    pub fn alg(mut self, alg: &str) -> Self {
        self.alg = Some(alg.into());
        self
    }

    pub fn kid(mut self, kid: &str) -> Self {
        self.kid = Some(kid.into());
        self
    }

    fn matches(&self, key: &Key) -> bool {
        if let Some(kty) = &self.kty {
            if key.kty() != kty.as_ref() {
                return false;
            }
        }

        if let Some(key_use) = &self.key_use {
            if let Some(u) = key.key_use() {
                if u != key_use.as_ref() {
                    return false;
                }
            }
        }

        if let Some(alg) = &self.alg {
            // "dir" matches every key, whatever its own algorithm
            if alg.as_ref() != "dir" {
                if let Some(a) = key.alg() {
                    if a != alg.as_ref() {
                        return false;
                    }
                }
                if !key.supports(alg) {
                    return false;
                }
            }
        }

        true
    }
}

/// A hierarchical, in-memory container of [`Key`]s.
///
/// Keys are indexed by identifier; a store constructed as a child sees its
/// ancestors' keys through non-local queries but never mutates them.
/// Serialization covers only the store's own keys.
pub struct KeyStore {
    registry: Arc<Registry>,
    parent: Option<Arc<KeyStore>>,
    keysets: RwLock<BTreeMap<Box<str>, Vec<Arc<Key>>>>,
}

impl KeyStore {
    /// A new empty store bound to the [`registry::global`] registry
    pub fn new() -> Arc<Self> {
        Self::with_registry(registry::global().clone())
    }

    /// A new empty store dispatching through `registry`
    pub fn with_registry(registry: Arc<Registry>) -> Arc<Self> {
        Arc::new(Self {
            registry,
            parent: None,
            keysets: RwLock::new(BTreeMap::new()),
        })
    }

    /// A new empty store inheriting this store's keys (and registry) through
    /// non-local queries
    pub fn new_child(self: &Arc<Self>) -> Arc<Self> {
        Arc::new(Self {
            registry: self.registry.clone(),
            parent: Some(self.clone()),
            keysets: RwLock::new(BTreeMap::new()),
        })
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn parent(&self) -> Option<&Arc<KeyStore>> {
        self.parent.as_ref()
    }

    /// Generate a fresh key of type `kty` and add it to this store.
    ///
    /// `props` seeds the new key's interchange form; generated fields win on
    /// collision, and the requested `kty` always wins.
    #[instrument(skip(self, props))]
    pub async fn generate(
        self: &Arc<Self>,
        kty: &str,
        size: KeySize,
        props: Option<Jwk>,
    ) -> Result<Arc<Key>> {
        let Some(key_type) = self.registry.get(kty) else {
            return Err(Error::UnsupportedKeyType(kty.into()));
        };

        let mut jwk = props.unwrap_or_default();
        jwk.insert("kty", kty.into());

        let generated = key_type.generate(size).await?;
        jwk.merge(generated);
        jwk.insert("kty", kty.into());

        self.add(jwk).await
    }

    /// Add a key in interchange form.
    ///
    /// The store is mutated only once type dispatch and preparation have
    /// succeeded; a failed add leaves it untouched.
    #[instrument(skip(self, jwk))]
    pub async fn add(self: &Arc<Self>, jwk: Jwk) -> Result<Arc<Key>> {
        let kty = jwk.kty().unwrap_or_default();
        let Some(key_type) = self.registry.get(kty) else {
            return Err(Error::UnsupportedKeyType(kty.into()));
        };

        let ops = key_type.prepare(&jwk).await?;

        let key = Arc::new(Key::new(Arc::downgrade(self), jwk, ops));

        trace!("Adding key {key:?}");

        self.keysets
            .write()
            .trace_expect("Failed to lock keysets")
            .entry(key.kid().into())
            .or_default()
            .push(key.clone());

        Ok(key)
    }

    /// Parse JSON text as a single key and add it
    pub async fn add_json(self: &Arc<Self>, json: &str) -> Result<Arc<Key>> {
        self.add(Jwk::from_json(json)?).await
    }

    /// Add an independent duplicate of an existing key, through its public
    /// interchange form. The duplicate shares nothing with `key`, and
    /// carries no private material.
    pub async fn add_key(self: &Arc<Self>, key: &Key) -> Result<Arc<Key>> {
        self.add(key.to_jwk(false)).await
    }

    /// Remove `key` from this store. A no-op unless this very instance is
    /// held here; the key's home-store pointer is left as it was.
    pub fn remove(&self, key: &Arc<Key>) {
        let mut keysets = self.keysets.write().trace_expect("Failed to lock keysets");

        let Some(bucket) = keysets.get_mut(key.kid()) else {
            return;
        };
        let Some(idx) = bucket.iter().position(|k| Arc::ptr_eq(k, key)) else {
            return;
        };

        trace!("Removing key {key:?}");

        bucket.remove(idx);
        if bucket.is_empty() {
            keysets.remove(key.kid());
        }
    }

    /// All matching keys: this store's own first, then every ancestor's,
    /// nearest first
    pub fn all(&self, filter: &Filter) -> Vec<Arc<Key>> {
        let mut keys = Vec::new();
        self.collect(filter, false, &mut keys);
        keys
    }

    /// All matching keys held by this store itself
    pub fn all_local(&self, filter: &Filter) -> Vec<Arc<Key>> {
        let mut keys = Vec::new();
        self.collect(filter, true, &mut keys);
        keys
    }

    fn collect(&self, filter: &Filter, local: bool, keys: &mut Vec<Arc<Key>>) {
        {
            let keysets = self.keysets.read().trace_expect("Failed to lock keysets");
            match &filter.kid {
                Some(kid) => {
                    if let Some(bucket) = keysets.get(kid.as_ref()) {
                        keys.extend(bucket.iter().filter(|k| filter.matches(k)).cloned());
                    }
                }
                None => {
                    for bucket in keysets.values() {
                        keys.extend(bucket.iter().filter(|k| filter.matches(k)).cloned());
                    }
                }
            }
        }

        // Once delegation begins the whole ancestor chain is in scope
        if !local {
            if let Some(parent) = &self.parent {
                parent.collect(filter, false, keys);
            }
        }
    }

    /// First key with identifier `kid`, local keys before ancestors'
    pub fn get(&self, kid: &str) -> Option<Arc<Key>> {
        self.find(&Filter::new().kid(kid))
    }

    /// First local key with identifier `kid`
    pub fn get_local(&self, kid: &str) -> Option<Arc<Key>> {
        self.find_local(&Filter::new().kid(kid))
    }

    /// First matching key, local keys before ancestors'. Absence is a
    /// normal outcome, not an error.
    pub fn find(&self, filter: &Filter) -> Option<Arc<Key>> {
        match self.find_local(filter) {
            Some(key) => Some(key),
            None => self.parent.as_ref().and_then(|parent| parent.find(filter)),
        }
    }

    /// First matching key held by this store itself
    pub fn find_local(&self, filter: &Filter) -> Option<Arc<Key>> {
        let keysets = self.keysets.read().trace_expect("Failed to lock keysets");
        match &filter.kid {
            Some(kid) => keysets
                .get(kid.as_ref())?
                .iter()
                .find(|k| filter.matches(k))
                .cloned(),
            None => keysets
                .values()
                .flatten()
                .find(|k| filter.matches(k))
                .cloned(),
        }
    }

    /// This store's own keys in wire form, bucket by bucket. Ancestor keys
    /// are never serialized, even though non-local queries see them.
    pub fn to_jwks(&self, private: bool) -> JwkSet {
        JwkSet {
            keys: self
                .keysets
                .read()
                .trace_expect("Failed to lock keysets")
                .values()
                .flatten()
                .map(|k| k.to_jwk(private))
                .collect(),
        }
    }
}

impl core::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("KeyStore")
            .field("keys", &self.all_local(&Filter::new()).len())
            .field("parent", &self.parent.is_some())
            .finish()
    }
}
