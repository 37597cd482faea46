use super::*;
use serde_json::Value;

/// Build a [`KeyStore`] from loose JSON: either an array of raw key
/// entries, or an object whose `keys` field holds one.
///
/// Entries are added concurrently; the first failure wins and is returned.
/// Additions that completed before the failure have already populated the
/// store, which is then dropped along with them.
pub async fn as_key_store(value: Value) -> Result<Arc<KeyStore>> {
    let entries = match value {
        Value::Array(entries) => entries,
        Value::Object(mut map) => match map.remove("keys") {
            Some(Value::Array(entries)) => entries,
            _ => return Err(Error::InvalidKeySet),
        },
        _ => return Err(Error::InvalidKeySet),
    };

    let store = KeyStore::new();
    futures::future::try_join_all(entries.into_iter().map(|entry| {
        let store = store.clone();
        async move {
            match entry {
                Value::Object(map) => store.add(Jwk::from(map)).await,
                _ => Err(Error::InvalidKeySet),
            }
        }
    }))
    .await?;

    Ok(store)
}

/// [`as_key_store`], parsing the JSON text first. Malformed text surfaces
/// the parse error.
pub async fn as_key_store_json(json: &str) -> Result<Arc<KeyStore>> {
    as_key_store(serde_json::from_str(json)?).await
}

/// Wrap a raw key entry as a [`Key`] in a brand-new, parentless store of its
/// own. The key is never attached to any store the caller already holds;
/// nothing else references the anonymous home store, so it is gone by the
/// time the call returns and [`Key::keystore`] yields `None`.
pub async fn as_key(value: Value) -> Result<Arc<Key>> {
    match value {
        Value::Object(map) => KeyStore::new().add(Jwk::from(map)).await,
        _ => Err(Error::InvalidKeySet),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn keys_field_and_bare_array_forms() {
        let store = as_key_store(json!({
            "keys": [
                {"kty": "oct", "k": "AAECAwQFBgcICQoLDA0ODw", "kid": "a"},
                {"kty": "oct", "k": "AAECAwQFBgcICQoLDA0ODw", "kid": "a"},
            ]
        }))
        .await
        .unwrap();
        assert_eq!(store.all(&Filter::new().kid("a")).len(), 2);

        let store = as_key_store(json!([
            {"kty": "oct", "k": "AAECAwQFBgcICQoLDA0ODw"},
        ]))
        .await
        .unwrap();
        assert_eq!(store.all(&Filter::new()).len(), 1);
    }

    #[tokio::test]
    async fn invalid_shapes_are_rejected() {
        assert!(matches!(
            as_key_store(json!("oct")).await,
            Err(Error::InvalidKeySet)
        ));
        assert!(matches!(
            as_key_store(json!({"kty": "oct"})).await,
            Err(Error::InvalidKeySet)
        ));
        assert!(matches!(
            as_key_store(json!({"keys": "none"})).await,
            Err(Error::InvalidKeySet)
        ));
        assert!(matches!(
            as_key_store(json!(["oct"])).await,
            Err(Error::InvalidKeySet)
        ));
    }

    #[tokio::test]
    async fn malformed_text_is_a_parse_error() {
        assert!(matches!(
            as_key_store_json("not json").await,
            Err(Error::Json(_))
        ));
    }

    #[tokio::test]
    async fn first_add_failure_wins() {
        assert!(matches!(
            as_key_store(json!({
                "keys": [
                    {"kty": "oct", "k": "AAECAwQFBgcICQoLDA0ODw"},
                    {"kty": "spaniel"},
                ]
            }))
            .await,
            Err(Error::UnsupportedKeyType(_))
        ));
    }

    #[tokio::test]
    async fn as_key_wraps_in_a_fresh_store() {
        let key = as_key(json!({"kty": "oct", "k": "AAECAwQFBgcICQoLDA0ODw", "kid": "w"}))
            .await
            .unwrap();

        assert_eq!(key.kty(), "oct");
        assert_eq!(key.kid(), "w");
        assert_eq!(key.length(), 128);

        assert!(matches!(as_key(json!(["oct"])).await, Err(Error::InvalidKeySet)));
    }
}
