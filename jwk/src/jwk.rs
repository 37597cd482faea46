use super::*;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A single key in JWK interchange form: a loose JSON object carrying at
/// minimum a `kty` tag, and optionally `kid`/`use`/`alg` and the
/// type-specific material fields.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Jwk(Map<String, Value>);

impl Jwk {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(Into::into)
    }

    pub fn kty(&self) -> Option<&str> {
        self.str_field("kty")
    }

    pub fn kid(&self) -> Option<&str> {
        self.str_field("kid")
    }

    pub fn key_use(&self) -> Option<&str> {
        self.str_field("use")
    }

    pub fn alg(&self) -> Option<&str> {
        self.str_field("alg")
    }

    pub fn field(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn str_field(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn insert(&mut self, field: &str, value: Value) -> Option<Value> {
        self.0.insert(field.to_string(), value)
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Overlay `other` onto `self`, `other`'s fields winning on collision
    pub fn merge(&mut self, other: Jwk) {
        for (field, value) in other.0 {
            self.0.insert(field, value);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for Jwk {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// The key-set wire format: `{ "keys": [ ... ] }`, order preserved
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct JwkSet {
    pub keys: Vec<Jwk>,
}

/// Cryptographic operations a key capability may offer, named per the
/// RFC 7517 `key_ops` registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Sign,
    Verify,
    Encrypt,
    Decrypt,
    WrapKey,
    UnwrapKey,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::Sign,
        Operation::Verify,
        Operation::Encrypt,
        Operation::Decrypt,
        Operation::WrapKey,
        Operation::UnwrapKey,
    ];
}
