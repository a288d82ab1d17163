//! Password-based config encryption.
//!
//! Envelope format (all binary fields lowercase hex):
//!
//! ```json
//! { "version": 2, "kdf": "pbkdf2-sha256", "iterations": 100000,
//!   "salt": "..", "iv": "..", "tag": "..", "data": ".." }
//! ```
//!
//! - Key: PBKDF2-HMAC-SHA256 over the password and a random 16-byte salt.
//! - Cipher: AES-256-GCM with a random 16-byte IV and the raw salt as AAD.
//! - Envelopes written before `version`/`kdf`/`iterations` existed decode as
//!   PBKDF2-SHA256 with 100,000 iterations.

use crate::error::CryptoError;
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::{AeadInPlace, KeyInit};
use aes_gcm::aes::Aes256;
use aes_gcm::{AesGcm, Nonce, Tag};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use std::path::Path;
use tracing::debug;

/// AES-256-GCM with a 16-byte nonce.
type ConfigCipher = AesGcm<Aes256, U16>;

pub const ENVELOPE_VERSION: u32 = 2;
pub const KDF_PBKDF2_SHA256: &str = "pbkdf2-sha256";
pub const DEFAULT_ITERATIONS: u32 = 100_000;
pub const MIN_ITERATIONS: u32 = 1_000;
pub const MAX_ITERATIONS: u32 = 10_000_000;

pub const SALT_SIZE: usize = 16;
pub const IV_SIZE: usize = 16;
pub const TAG_SIZE: usize = 16;
pub const KEY_SIZE: usize = 32;

/// Fields whose joint presence marks a JSON document as an envelope.
const ENVELOPE_FIELDS: [&str; 4] = ["salt", "iv", "tag", "data"];

/// Encrypted configuration as persisted on disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedConfigBlob {
    #[serde(default = "legacy_version")]
    pub version: u32,
    #[serde(default = "default_kdf")]
    pub kdf: String,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    pub salt: String,
    pub iv: String,
    pub tag: String,
    pub data: String,
}

fn legacy_version() -> u32 {
    1
}

fn default_kdf() -> String {
    KDF_PBKDF2_SHA256.to_string()
}

fn default_iterations() -> u32 {
    DEFAULT_ITERATIONS
}

/// Encrypts and decrypts config envelopes with a fixed iteration count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigCrypto {
    iterations: u32,
}

impl Default for ConfigCrypto {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

impl ConfigCrypto {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a non-default iteration count for new envelopes.
    pub fn with_iterations(iterations: u32) -> Result<Self, CryptoError> {
        check_iterations(iterations)?;
        Ok(Self { iterations })
    }

    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Encrypt `config` (serialized as JSON) under `password`.
    pub fn encrypt<T: Serialize + ?Sized>(
        &self,
        config: &T,
        password: &str,
    ) -> Result<EncryptedConfigBlob, CryptoError> {
        let mut buffer = serde_json::to_vec(config).map_err(|_| CryptoError::Encryption)?;

        let mut salt = [0u8; SALT_SIZE];
        let mut iv = [0u8; IV_SIZE];
        OsRng.fill_bytes(&mut salt);
        OsRng.fill_bytes(&mut iv);

        let key = derive_key(password, &salt, self.iterations);
        let cipher = ConfigCipher::new_from_slice(&key).map_err(|_| CryptoError::Encryption)?;
        let tag = cipher
            .encrypt_in_place_detached(Nonce::<U16>::from_slice(&iv), &salt, &mut buffer)
            .map_err(|_| CryptoError::Encryption)?;

        Ok(EncryptedConfigBlob {
            version: ENVELOPE_VERSION,
            kdf: KDF_PBKDF2_SHA256.to_string(),
            iterations: self.iterations,
            salt: hex::encode(salt),
            iv: hex::encode(iv),
            tag: hex::encode(tag),
            data: hex::encode(buffer),
        })
    }
}

/// Encrypt with the default iteration count.
pub fn encrypt<T: Serialize + ?Sized>(
    config: &T,
    password: &str,
) -> Result<EncryptedConfigBlob, CryptoError> {
    ConfigCrypto::default().encrypt(config, password)
}

/// Decrypt an envelope back into its JSON document.
///
/// Every failure (bad hex, wrong lengths, unknown KDF, out-of-range
/// iterations, tag mismatch, non-JSON plaintext) is [`CryptoError::Decryption`].
pub fn decrypt(blob: &EncryptedConfigBlob, password: &str) -> Result<Value, CryptoError> {
    if blob.kdf != KDF_PBKDF2_SHA256 {
        debug!(kdf = %blob.kdf, "Unsupported envelope KDF");
        return Err(CryptoError::Decryption);
    }
    if check_iterations(blob.iterations).is_err() {
        debug!(iterations = blob.iterations, "Envelope iterations out of range");
        return Err(CryptoError::Decryption);
    }

    let salt = decode_exact(&blob.salt, SALT_SIZE)?;
    let iv = decode_exact(&blob.iv, IV_SIZE)?;
    let tag = decode_exact(&blob.tag, TAG_SIZE)?;
    let mut buffer = hex::decode(&blob.data).map_err(|_| CryptoError::Decryption)?;

    let key = derive_key(password, &salt, blob.iterations);
    let cipher = ConfigCipher::new_from_slice(&key).map_err(|_| CryptoError::Decryption)?;
    cipher
        .decrypt_in_place_detached(
            Nonce::<U16>::from_slice(&iv),
            &salt,
            &mut buffer,
            Tag::<U16>::from_slice(&tag),
        )
        .map_err(|_| CryptoError::Decryption)?;

    serde_json::from_slice(&buffer).map_err(|_| CryptoError::Decryption)
}

/// Whether a parsed JSON document has the envelope fields.
pub fn looks_encrypted(value: &Value) -> bool {
    value
        .as_object()
        .map(|obj| ENVELOPE_FIELDS.iter().all(|field| obj.contains_key(*field)))
        .unwrap_or(false)
}

/// Whether the file at `path` parses as JSON and looks like an envelope.
///
/// Unreadable or non-JSON files are reported as not encrypted.
pub fn is_encrypted(path: &Path) -> bool {
    std::fs::read(path)
        .ok()
        .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).ok())
        .map(|value| looks_encrypted(&value))
        .unwrap_or(false)
}

fn check_iterations(iterations: u32) -> Result<(), CryptoError> {
    if (MIN_ITERATIONS..=MAX_ITERATIONS).contains(&iterations) {
        Ok(())
    } else {
        Err(CryptoError::InvalidIterations(iterations))
    }
}

fn derive_key(password: &str, salt: &[u8], iterations: u32) -> [u8; KEY_SIZE] {
    let mut key = [0u8; KEY_SIZE];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, iterations, &mut key);
    key
}

// from_slice panics on a length mismatch, so lengths are checked here first.
fn decode_exact(hex_str: &str, len: usize) -> Result<Vec<u8>, CryptoError> {
    let bytes = hex::decode(hex_str).map_err(|_| CryptoError::Decryption)?;
    if bytes.len() != len {
        return Err(CryptoError::Decryption);
    }
    Ok(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fast() -> ConfigCrypto {
        ConfigCrypto::with_iterations(MIN_ITERATIONS).unwrap()
    }

    fn sample() -> Value {
        json!({
            "environments": {
                "prod": {"n8n_host": "https://n8n.example.com", "n8n_api_key": "n8n_api_prod_0123456789"},
                "stage": {"n8n_host": "http://localhost:5678", "n8n_api_key": "n8n_api_stage_0123456789"}
            },
            "defaultEnv": "prod"
        })
    }

    #[test]
    fn test_round_trip_default_iterations() {
        let blob = encrypt(&sample(), "correct horse battery staple").unwrap();
        assert_eq!(blob.version, ENVELOPE_VERSION);
        assert_eq!(blob.iterations, DEFAULT_ITERATIONS);
        assert_eq!(blob.salt.len(), SALT_SIZE * 2);
        assert_eq!(blob.iv.len(), IV_SIZE * 2);
        assert_eq!(blob.tag.len(), TAG_SIZE * 2);

        let decrypted = decrypt(&blob, "correct horse battery staple").unwrap();
        assert_eq!(decrypted, sample());
    }

    #[test]
    fn test_wrong_password_is_decryption_error() {
        let blob = fast().encrypt(&sample(), "right-password").unwrap();
        assert_eq!(decrypt(&blob, "wrong-password"), Err(CryptoError::Decryption));
    }

    #[test]
    fn test_fresh_salt_and_iv_per_encryption() {
        let a = fast().encrypt(&sample(), "pw-pw-pw-pw").unwrap();
        let b = fast().encrypt(&sample(), "pw-pw-pw-pw").unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.iv, b.iv);
        assert_ne!(a.data, b.data);
    }

    #[test]
    fn test_tampering_is_indistinguishable() {
        let blob = fast().encrypt(&sample(), "pw-pw-pw-pw").unwrap();

        let mut bad_tag = blob.clone();
        bad_tag.tag = "00".repeat(TAG_SIZE);
        assert_eq!(decrypt(&bad_tag, "pw-pw-pw-pw"), Err(CryptoError::Decryption));

        // Salt is bound as AAD as well as KDF input.
        let mut bad_salt = blob.clone();
        bad_salt.salt = "11".repeat(SALT_SIZE);
        assert_eq!(decrypt(&bad_salt, "pw-pw-pw-pw"), Err(CryptoError::Decryption));

        let mut short_iv = blob.clone();
        short_iv.iv = "abcd".to_string();
        assert_eq!(decrypt(&short_iv, "pw-pw-pw-pw"), Err(CryptoError::Decryption));

        let mut not_hex = blob.clone();
        not_hex.data = "zz".to_string();
        assert_eq!(decrypt(&not_hex, "pw-pw-pw-pw"), Err(CryptoError::Decryption));

        let mut unknown_kdf = blob;
        unknown_kdf.kdf = "scrypt".to_string();
        assert_eq!(decrypt(&unknown_kdf, "pw-pw-pw-pw"), Err(CryptoError::Decryption));
    }

    #[test]
    fn test_iteration_bounds() {
        assert_eq!(
            ConfigCrypto::with_iterations(999),
            Err(CryptoError::InvalidIterations(999))
        );
        assert!(ConfigCrypto::with_iterations(MAX_ITERATIONS + 1).is_err());
        assert!(ConfigCrypto::with_iterations(MAX_ITERATIONS).is_ok());

        let mut blob = fast().encrypt(&sample(), "pw-pw-pw-pw").unwrap();
        blob.iterations = u32::MAX;
        assert_eq!(decrypt(&blob, "pw-pw-pw-pw"), Err(CryptoError::Decryption));
    }

    #[test]
    fn test_legacy_envelope_defaults() {
        let blob: EncryptedConfigBlob = serde_json::from_value(json!({
            "salt": "00", "iv": "00", "tag": "00", "data": "00"
        }))
        .unwrap();
        assert_eq!(blob.version, 1);
        assert_eq!(blob.kdf, KDF_PBKDF2_SHA256);
        assert_eq!(blob.iterations, DEFAULT_ITERATIONS);
    }

    #[test]
    fn test_looks_encrypted() {
        let blob = fast().encrypt(&sample(), "pw-pw-pw-pw").unwrap();
        assert!(looks_encrypted(&serde_json::to_value(&blob).unwrap()));
        assert!(!looks_encrypted(&sample()));
        assert!(!looks_encrypted(&json!({"salt": "", "iv": "", "tag": ""})));
        assert!(!looks_encrypted(&json!(["salt", "iv", "tag", "data"])));
    }

    #[test]
    fn test_is_encrypted_file() {
        let dir = tempfile::tempdir().unwrap();
        let plain = dir.path().join("plain.json");
        let sealed = dir.path().join("sealed.json");
        let garbage = dir.path().join("garbage.json");

        std::fs::write(&plain, sample().to_string()).unwrap();
        let blob = fast().encrypt(&sample(), "pw-pw-pw-pw").unwrap();
        std::fs::write(&sealed, serde_json::to_string(&blob).unwrap()).unwrap();
        std::fs::write(&garbage, "not json").unwrap();

        assert!(!is_encrypted(&plain));
        assert!(is_encrypted(&sealed));
        assert!(!is_encrypted(&garbage));
        assert!(!is_encrypted(&dir.path().join("missing.json")));
    }
}
