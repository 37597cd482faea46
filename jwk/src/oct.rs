use super::*;
use base64::prelude::*;
use hmac::{KeyInit, Mac};
use rand::Rng;
use zeroize::Zeroizing;

const DEFAULT_SIZE_BITS: usize = 256;
const GCM_IV_LENGTH: usize = 12;
const GCM_TAG_LENGTH: usize = 16;

/// The octet-sequence (`"oct"`) symmetric key type.
///
/// Sign/verify is HMAC-SHA2, encrypt/decrypt is AES-GCM, wrap/unwrap is
/// AES-KW, each offered only at the lengths the key material can serve.
pub struct OctetSequence;

#[async_trait]
impl KeyType for OctetSequence {
    fn kty(&self) -> &str {
        "oct"
    }

    async fn generate(&self, size: KeySize) -> Result<Jwk> {
        let bits = match size {
            KeySize::Default => DEFAULT_SIZE_BITS,
            KeySize::Bits(bits) if bits > 0 && bits % 8 == 0 => bits,
            size => return Err(Error::InvalidKeySize(size)),
        };

        let mut k = Zeroizing::new(vec![0u8; bits / 8]);
        rand::rng().fill_bytes(&mut k);

        let mut jwk = Jwk::default();
        jwk.insert("k", BASE64_URL_SAFE_NO_PAD.encode(k.as_slice()).into());
        Ok(jwk)
    }

    async fn prepare(&self, jwk: &Jwk) -> Result<Box<dyn KeyOps>> {
        let Some(k) = jwk.str_field("k") else {
            return Err(Error::MissingKeyMaterial("k"));
        };

        let k = BASE64_URL_SAFE_NO_PAD
            .decode(k)
            .map_err(|_| Error::InvalidKeyMaterial("k"))?;
        if k.is_empty() {
            return Err(Error::InvalidKeyMaterial("k"));
        }

        Ok(Box::new(OctOps {
            k: Zeroizing::new(k.into_boxed_slice()),
        }))
    }
}

struct OctOps {
    k: Zeroizing<Box<[u8]>>,
}

impl OctOps {
    fn seal<M>(&self, cipher: M, plaintext: &[u8], aad: &[u8]) -> Result<CipherText>
    where
        M: aes_gcm::aead::Aead,
    {
        let mut iv = [0u8; GCM_IV_LENGTH];
        rand::rng().fill_bytes(&mut iv);

        let mut data = cipher
            .encrypt(
                iv.as_ref().into(),
                aes_gcm::aead::Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|_| Error::EncryptionFailed)?;
        let tag = data.split_off(data.len() - GCM_TAG_LENGTH);

        Ok(CipherText {
            iv: iv.as_slice().into(),
            data: data.into(),
            tag: tag.into(),
        })
    }

    fn open<M>(&self, cipher: M, ciphertext: &CipherText, aad: &[u8]) -> Result<Zeroizing<Vec<u8>>>
    where
        M: aes_gcm::aead::Aead,
    {
        if ciphertext.iv.len() != GCM_IV_LENGTH {
            return Err(Error::DecryptionFailed);
        }

        let mut data = Vec::with_capacity(ciphertext.data.len() + ciphertext.tag.len());
        data.extend_from_slice(&ciphertext.data);
        data.extend_from_slice(&ciphertext.tag);

        cipher
            .decrypt(
                ciphertext.iv.as_ref().into(),
                aes_gcm::aead::Payload { msg: &data, aad },
            )
            .map(Zeroizing::new)
            .map_err(|_| Error::DecryptionFailed)
    }
}

impl KeyOps for OctOps {
    fn length(&self) -> usize {
        self.k.len() * 8
    }

    fn algorithms(&self, op: Operation) -> Vec<Box<str>> {
        let bits = self.length();
        let mut algs: Vec<Box<str>> = Vec::new();
        match op {
            Operation::Sign | Operation::Verify => {
                if bits >= 256 {
                    algs.push("HS256".into());
                }
                if bits >= 384 {
                    algs.push("HS384".into());
                }
                if bits >= 512 {
                    algs.push("HS512".into());
                }
            }
            Operation::Encrypt | Operation::Decrypt => match bits {
                128 => algs.push("A128GCM".into()),
                256 => algs.push("A256GCM".into()),
                _ => {}
            },
            Operation::WrapKey | Operation::UnwrapKey => {
                match bits {
                    128 => algs.push("A128KW".into()),
                    192 => algs.push("A192KW".into()),
                    256 => algs.push("A256KW".into()),
                    _ => {}
                }
                algs.push("dir".into());
            }
        }
        algs
    }

    fn export(&self, jwk: &Jwk, private: bool) -> Jwk {
        let mut jwk = jwk.clone();
        if !private {
            // A symmetric key has no public material, just metadata
            jwk.remove("k");
        }
        jwk
    }

    fn sign(&self, alg: &str, data: &[u8]) -> Result<Box<[u8]>> {
        if !self.algorithms(Operation::Sign).iter().any(|a| a.as_ref() == alg) {
            return Err(Error::UnsupportedAlgorithm(alg.into()));
        }

        match alg {
            "HS256" => {
                let mut mac = hmac::Hmac::<sha2::Sha256>::new_from_slice(&self.k)
                    .map_err(|_| Error::InvalidKeyMaterial("k"))?;
                mac.update(data);
                Ok(mac.finalize().into_bytes().as_slice().into())
            }
            "HS384" => {
                let mut mac = hmac::Hmac::<sha2::Sha384>::new_from_slice(&self.k)
                    .map_err(|_| Error::InvalidKeyMaterial("k"))?;
                mac.update(data);
                Ok(mac.finalize().into_bytes().as_slice().into())
            }
            "HS512" => {
                let mut mac = hmac::Hmac::<sha2::Sha512>::new_from_slice(&self.k)
                    .map_err(|_| Error::InvalidKeyMaterial("k"))?;
                mac.update(data);
                Ok(mac.finalize().into_bytes().as_slice().into())
            }
            _ => Err(Error::UnsupportedAlgorithm(alg.into())),
        }
    }

    fn verify(&self, alg: &str, data: &[u8], signature: &[u8]) -> Result<()> {
        if !self.algorithms(Operation::Verify).iter().any(|a| a.as_ref() == alg) {
            return Err(Error::UnsupportedAlgorithm(alg.into()));
        }

        match alg {
            "HS256" => {
                let mut mac = hmac::Hmac::<sha2::Sha256>::new_from_slice(&self.k)
                    .map_err(|_| Error::InvalidKeyMaterial("k"))?;
                mac.update(data);
                mac.verify_slice(signature)
                    .map_err(|_| Error::IntegrityCheckFailed)
            }
            "HS384" => {
                let mut mac = hmac::Hmac::<sha2::Sha384>::new_from_slice(&self.k)
                    .map_err(|_| Error::InvalidKeyMaterial("k"))?;
                mac.update(data);
                mac.verify_slice(signature)
                    .map_err(|_| Error::IntegrityCheckFailed)
            }
            "HS512" => {
                let mut mac = hmac::Hmac::<sha2::Sha512>::new_from_slice(&self.k)
                    .map_err(|_| Error::InvalidKeyMaterial("k"))?;
                mac.update(data);
                mac.verify_slice(signature)
                    .map_err(|_| Error::IntegrityCheckFailed)
            }
            _ => Err(Error::UnsupportedAlgorithm(alg.into())),
        }
    }

    fn encrypt(&self, alg: &str, plaintext: &[u8], aad: &[u8]) -> Result<CipherText> {
        use aes_gcm::KeyInit;

        match alg {
            "A128GCM" if self.k.len() == 16 => self.seal(
                aes_gcm::Aes128Gcm::new(self.k.as_ref().into()),
                plaintext,
                aad,
            ),
            "A256GCM" if self.k.len() == 32 => self.seal(
                aes_gcm::Aes256Gcm::new(self.k.as_ref().into()),
                plaintext,
                aad,
            ),
            _ => Err(Error::UnsupportedAlgorithm(alg.into())),
        }
    }

    fn decrypt(&self, alg: &str, ciphertext: &CipherText, aad: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        use aes_gcm::KeyInit;

        match alg {
            "A128GCM" if self.k.len() == 16 => self.open(
                aes_gcm::Aes128Gcm::new(self.k.as_ref().into()),
                ciphertext,
                aad,
            ),
            "A256GCM" if self.k.len() == 32 => self.open(
                aes_gcm::Aes256Gcm::new(self.k.as_ref().into()),
                ciphertext,
                aad,
            ),
            _ => Err(Error::UnsupportedAlgorithm(alg.into())),
        }
    }

    fn wrap(&self, alg: &str, key: &[u8]) -> Result<Box<[u8]>> {
        match alg {
            // Direct use of the shared key as CEK: nothing to transmit
            "dir" => Ok(Box::default()),
            "A128KW" if self.k.len() == 16 => aes_kw::KekAes128::new(self.k.as_ref().into())
                .wrap_vec(key)
                .map(Vec::into_boxed_slice)
                .map_err(Into::into),
            "A192KW" if self.k.len() == 24 => aes_kw::KekAes192::new(self.k.as_ref().into())
                .wrap_vec(key)
                .map(Vec::into_boxed_slice)
                .map_err(Into::into),
            "A256KW" if self.k.len() == 32 => aes_kw::KekAes256::new(self.k.as_ref().into())
                .wrap_vec(key)
                .map(Vec::into_boxed_slice)
                .map_err(Into::into),
            _ => Err(Error::UnsupportedAlgorithm(alg.into())),
        }
    }

    fn unwrap(&self, alg: &str, wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        match alg {
            // Direct use: the CEK is the shared key itself
            "dir" => Ok(Zeroizing::new(self.k.to_vec())),
            "A128KW" if self.k.len() == 16 => aes_kw::KekAes128::new(self.k.as_ref().into())
                .unwrap_vec(wrapped)
                .map(Zeroizing::new)
                .map_err(Into::into),
            "A192KW" if self.k.len() == 24 => aes_kw::KekAes192::new(self.k.as_ref().into())
                .unwrap_vec(wrapped)
                .map(Zeroizing::new)
                .map_err(Into::into),
            "A256KW" if self.k.len() == 32 => aes_kw::KekAes256::new(self.k.as_ref().into())
                .unwrap_vec(wrapped)
                .map(Zeroizing::new)
                .map_err(Into::into),
            _ => Err(Error::UnsupportedAlgorithm(alg.into())),
        }
    }
}

// Material stays out of logs
impl core::fmt::Debug for OctOps {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("OctOps")
            .field("length", &self.length())
            .finish()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use hex_literal::hex;

    async fn prepare(k: &[u8]) -> Box<dyn KeyOps> {
        let mut jwk = Jwk::default();
        jwk.insert("kty", "oct".into());
        jwk.insert("k", BASE64_URL_SAFE_NO_PAD.encode(k).into());
        OctetSequence.prepare(&jwk).await.unwrap()
    }

    #[tokio::test]
    async fn hmac_sha2() {
        let ops = prepare(&hex!(
            "000102030405060708090a0b0c0d0e0f101112131415161718191a1b1c1d1e1f"
        ))
        .await;
        let data = b"The quick brown fox jumps over the lazy dog";

        let mac = ops.sign("HS256", data).unwrap();
        assert_eq!(
            mac.as_ref(),
            hex!("f87ad256151fc7b4c5dffa4adb3ebe911a8eeb8a8ebdee3c2a4a8e5f5ec02c32")
        );
        ops.verify("HS256", data, &mac).unwrap();
        assert!(matches!(
            ops.verify("HS256", b"The quick brown fox", &mac),
            Err(Error::IntegrityCheckFailed)
        ));

        // A 256-bit key serves none of the longer variants
        assert!(matches!(
            ops.sign("HS384", data),
            Err(Error::UnsupportedAlgorithm(_))
        ));
        assert!(matches!(
            ops.sign("HS512", data),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[tokio::test]
    async fn undersized_hmac_keys_are_refused() {
        // RFC 4231 test case 2: 32-bit key, too short for HS256
        let ops = prepare(b"Jefe").await;
        assert!(matches!(
            ops.sign("HS256", b"what do ya want for nothing?"),
            Err(Error::UnsupportedAlgorithm(_))
        ));
        assert!(!ops.supports("HS256"));
    }

    #[tokio::test]
    async fn aes_gcm_round_trip() {
        let ops = prepare(&hex!("000102030405060708090a0b0c0d0e0f")).await;

        let sealed = ops.encrypt("A128GCM", b"attack at dawn", b"aad").unwrap();
        assert_eq!(sealed.iv.len(), GCM_IV_LENGTH);
        assert_eq!(sealed.tag.len(), GCM_TAG_LENGTH);

        let opened = ops.decrypt("A128GCM", &sealed, b"aad").unwrap();
        assert_eq!(opened.as_slice(), b"attack at dawn".as_slice());

        // Wrong aad must not open
        assert!(matches!(
            ops.decrypt("A128GCM", &sealed, b"other"),
            Err(Error::DecryptionFailed)
        ));

        // Tampered ciphertext must not open
        let mut tampered = sealed.clone();
        tampered.data[0] ^= 1;
        assert!(matches!(
            ops.decrypt("A128GCM", &tampered, b"aad"),
            Err(Error::DecryptionFailed)
        ));

        // The key is 128-bit only
        assert!(matches!(
            ops.encrypt("A256GCM", b"attack at dawn", b"aad"),
            Err(Error::UnsupportedAlgorithm(_))
        ));
    }

    #[tokio::test]
    async fn aes_gcm_fixed_vector() {
        let ops = prepare(&hex!("000102030405060708090a0b0c0d0e0f")).await;

        let sealed = CipherText {
            iv: hex!("000000000000000000000000").into(),
            data: hex!("28a2f332faf086ed97a91e0917ef").into(),
            tag: hex!("7a71a74ac8a3343f09799308c5aa34f5").into(),
        };
        assert_eq!(
            ops.decrypt("A128GCM", &sealed, b"aad").unwrap().as_slice(),
            b"attack at dawn".as_slice()
        );
    }

    #[tokio::test]
    async fn aes_kw_rfc3394_vector() {
        let ops = prepare(&hex!("000102030405060708090a0b0c0d0e0f")).await;
        let cek = hex!("00112233445566778899aabbccddeeff");

        let wrapped = ops.wrap("A128KW", &cek).unwrap();
        assert_eq!(
            wrapped.as_ref(),
            hex!("1fa68b0a8112b447aef34bd8fb5a7b829d3e862371d2cfe5")
        );
        assert_eq!(ops.unwrap("A128KW", &wrapped).unwrap().as_slice(), cek);

        let mut tampered = Vec::from(wrapped);
        tampered[0] ^= 1;
        assert!(ops.unwrap("A128KW", &tampered).is_err());
    }

    #[tokio::test]
    async fn direct_use() {
        let k = hex!("000102030405060708090a0b0c0d0e0f");
        let ops = prepare(&k).await;

        assert!(ops.supports("dir"));
        assert!(ops.wrap("dir", b"ignored").unwrap().is_empty());
        assert_eq!(ops.unwrap("dir", b"").unwrap().as_slice(), k);
    }

    #[tokio::test]
    async fn generated_material_has_the_requested_size() {
        let jwk = OctetSequence.generate(KeySize::Bits(192)).await.unwrap();
        let k = BASE64_URL_SAFE_NO_PAD
            .decode(jwk.str_field("k").unwrap())
            .unwrap();
        assert_eq!(k.len(), 24);

        let jwk = OctetSequence.generate(KeySize::Default).await.unwrap();
        let k = BASE64_URL_SAFE_NO_PAD
            .decode(jwk.str_field("k").unwrap())
            .unwrap();
        assert_eq!(k.len(), DEFAULT_SIZE_BITS / 8);

        assert!(matches!(
            OctetSequence.generate(KeySize::Bits(100)).await,
            Err(Error::InvalidKeySize(_))
        ));
        assert!(matches!(
            OctetSequence.generate(KeySize::Named("P-256".into())).await,
            Err(Error::InvalidKeySize(_))
        ));
    }

    #[tokio::test]
    async fn prepare_validates_material() {
        let mut jwk = Jwk::default();
        jwk.insert("kty", "oct".into());
        assert!(matches!(
            OctetSequence.prepare(&jwk).await,
            Err(Error::MissingKeyMaterial("k"))
        ));

        jwk.insert("k", "not!base64".into());
        assert!(matches!(
            OctetSequence.prepare(&jwk).await,
            Err(Error::InvalidKeyMaterial("k"))
        ));
    }

    #[tokio::test]
    async fn public_export_strips_material() {
        let mut jwk = Jwk::default();
        jwk.insert("kty", "oct".into());
        jwk.insert("kid", "a".into());
        jwk.insert("k", BASE64_URL_SAFE_NO_PAD.encode(b"0123456789abcdef").into());

        let ops = OctetSequence.prepare(&jwk).await.unwrap();

        let public = ops.export(&jwk, false);
        assert!(public.field("k").is_none());
        assert_eq!(public.kid(), Some("a"));

        assert!(ops.export(&jwk, true).field("k").is_some());
    }
}
