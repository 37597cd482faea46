use super::*;
use std::sync::Weak;
use zeroize::Zeroizing;

/// Requested size for key generation. Interpretation belongs to the key
/// type: a bit count for symmetric types, a named parameter set (e.g. a
/// curve) for types that are not sized in bits.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub enum KeySize {
    #[default]
    Default,
    Bits(usize),
    Named(Box<str>),
}

impl From<usize> for KeySize {
    fn from(bits: usize) -> Self {
        KeySize::Bits(bits)
    }
}

impl From<&str> for KeySize {
    fn from(name: &str) -> Self {
        KeySize::Named(name.into())
    }
}

/// Output of an authenticated encryption operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherText {
    pub iv: Box<[u8]>,
    pub data: Box<[u8]>,
    pub tag: Box<[u8]>,
}

/// A capability that knows how to generate and validate keys of one type
/// tag. Implementations are registered with a [`Registry`] and dispatched
/// by [`KeyStore`](store::KeyStore) on the `kty` of incoming keys.
#[async_trait]
pub trait KeyType: Send + Sync {
    /// The type tag this capability serves. Must be non-empty.
    fn kty(&self) -> &str;

    /// Produce the raw material fields of a fresh key of the requested size
    async fn generate(&self, size: KeySize) -> Result<Jwk>;

    /// Validate interchange-form material and build the operational
    /// configuration a [`Key`] is constructed around
    async fn prepare(&self, jwk: &Jwk) -> Result<Box<dyn KeyOps>>;
}

/// The per-type operational surface of a prepared key: length and algorithm
/// queries, the cryptographic operations, and the public/private projection
/// of its JWK form.
///
/// Operations default to rejecting the algorithm, so a key type implements
/// only the surface its family actually has.
pub trait KeyOps: Send + Sync + core::fmt::Debug {
    /// Key length in bits
    fn length(&self) -> usize;

    /// Algorithms this key can perform for one operation
    fn algorithms(&self, op: Operation) -> Vec<Box<str>>;

    /// Whether this key can perform `alg` in any operation
    fn supports(&self, alg: &str) -> bool {
        Operation::ALL
            .iter()
            .any(|op| self.algorithms(*op).iter().any(|a| a.as_ref() == alg))
    }

    /// Project the key's interchange form, stripping private material
    /// fields unless `private` is set
    fn export(&self, jwk: &Jwk, private: bool) -> Jwk;

    fn sign(&self, alg: &str, _data: &[u8]) -> Result<Box<[u8]>> {
        Err(Error::UnsupportedAlgorithm(alg.into()))
    }

    fn verify(&self, alg: &str, _data: &[u8], _signature: &[u8]) -> Result<()> {
        Err(Error::UnsupportedAlgorithm(alg.into()))
    }

    fn encrypt(&self, alg: &str, _plaintext: &[u8], _aad: &[u8]) -> Result<CipherText> {
        Err(Error::UnsupportedAlgorithm(alg.into()))
    }

    fn decrypt(&self, alg: &str, _ciphertext: &CipherText, _aad: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        Err(Error::UnsupportedAlgorithm(alg.into()))
    }

    fn wrap(&self, alg: &str, _key: &[u8]) -> Result<Box<[u8]>> {
        Err(Error::UnsupportedAlgorithm(alg.into()))
    }

    fn unwrap(&self, alg: &str, _wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        Err(Error::UnsupportedAlgorithm(alg.into()))
    }
}

/// A key held by a [`KeyStore`](store::KeyStore).
///
/// Constructed only by its owning store; the store a key was added to is its
/// home for life, even after removal. The back-reference is weak, so a key
/// outliving its store sees [`Key::keystore`] return `None` rather than
/// keeping the store alive.
pub struct Key {
    store: Weak<store::KeyStore>,
    kty: Box<str>,
    kid: Box<str>,
    key_use: Option<Box<str>>,
    alg: Option<Box<str>>,
    jwk: Jwk,
    ops: Box<dyn KeyOps>,
}

impl Key {
    pub(crate) fn new(store: Weak<store::KeyStore>, jwk: Jwk, ops: Box<dyn KeyOps>) -> Self {
        Self {
            kty: jwk.kty().unwrap_or_default().into(),
            kid: jwk.kid().unwrap_or_default().into(),
            key_use: jwk.key_use().map(Into::into),
            alg: jwk.alg().map(Into::into),
            store,
            jwk,
            ops,
        }
    }

    pub fn kty(&self) -> &str {
        &self.kty
    }

    /// The key identifier; empty when the key has none
    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn key_use(&self) -> Option<&str> {
        self.key_use.as_deref()
    }

    pub fn alg(&self) -> Option<&str> {
        self.alg.as_deref()
    }

    /// Key length in bits
    pub fn length(&self) -> usize {
        self.ops.length()
    }

    /// The store this key was added to, if it is still alive
    pub fn keystore(&self) -> Option<Arc<store::KeyStore>> {
        self.store.upgrade()
    }

    pub fn algorithms(&self, op: Operation) -> Vec<Box<str>> {
        self.ops.algorithms(op)
    }

    pub fn supports(&self, alg: &str) -> bool {
        self.ops.supports(alg)
    }

    /// The key's interchange form; material fields are stripped unless
    /// `private` is set
    pub fn to_jwk(&self, private: bool) -> Jwk {
        self.ops.export(&self.jwk, private)
    }

    pub fn sign(&self, alg: &str, data: &[u8]) -> Result<Box<[u8]>> {
        self.ops.sign(alg, data)
    }

    pub fn verify(&self, alg: &str, data: &[u8], signature: &[u8]) -> Result<()> {
        self.ops.verify(alg, data, signature)
    }

    pub fn encrypt(&self, alg: &str, plaintext: &[u8], aad: &[u8]) -> Result<CipherText> {
        self.ops.encrypt(alg, plaintext, aad)
    }

    pub fn decrypt(&self, alg: &str, ciphertext: &CipherText, aad: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        self.ops.decrypt(alg, ciphertext, aad)
    }

    pub fn wrap(&self, alg: &str, key: &[u8]) -> Result<Box<[u8]>> {
        self.ops.wrap(alg, key)
    }

    pub fn unwrap(&self, alg: &str, wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        self.ops.unwrap(alg, wrapped)
    }
}

// Material fields stay out of logs
impl core::fmt::Debug for Key {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Key")
            .field("kty", &self.kty)
            .field("kid", &self.kid)
            .field("use", &self.key_use)
            .field("alg", &self.alg)
            .field("length", &self.length())
            .finish()
    }
}
