//! Crypto Vault
//!
//! Field-level authenticated encryption for sensitive payment data.
//!
//! - [`Vault::encrypt`] / [`Vault::decrypt`]: AES-256-GCM envelopes
//!   (`v1.` + base64(nonce || ciphertext || tag)); the key never leaves the vault
//! - [`Vault::hash`]: deterministic keyed digest (HMAC-SHA256) for lookup tokens
//! - [`Vault::generate_token`]: random hex tokens
//! - [`mask`] / [`sanitize_for_logging`]: display-safe renditions
//!
//! A vault cannot be constructed from an absent or weak key; there is no
//! plaintext fallback.

mod mask;

pub use mask::{SENSITIVE_FIELDS, is_sensitive_field, mask, sanitize_for_logging};

use aes_gcm::{Aes256Gcm, KeyInit, Nonce, aead::Aead};
use base64::{Engine, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

/// Envelope version prefix
const ENVELOPE_PREFIX: &str = "v1.";
/// Nonce length for AES-GCM (96 bits)
const NONCE_LEN: usize = 12;
/// Authentication tag length appended by AES-GCM
const TAG_LEN: usize = 16;
/// Minimum decoded key material length (256 bits)
pub const MIN_KEY_LEN: usize = 32;
/// Minimum number of distinct byte values in the key material
const MIN_DISTINCT_BYTES: usize = 16;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum VaultError {
    #[error("Vault configuration error: {0}")]
    Configuration(String),
    #[error("Encryption error: {0}")]
    Encryption(String),
    #[error("Decryption error: {0}")]
    Decryption(String),
}

/// Platform-wide field encryption vault
pub struct Vault {
    cipher: Aes256Gcm,
    hasher: HmacSha256,
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault").finish_non_exhaustive()
    }
}

impl Vault {
    /// Build a vault from base64-encoded key material.
    ///
    /// Fails with `Configuration` when the key is absent, not base64, shorter
    /// than [`MIN_KEY_LEN`] bytes, or has too little byte diversity.
    pub fn from_base64_key(key: Option<&str>) -> Result<Self, VaultError> {
        let encoded = key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| VaultError::Configuration("vault key is not configured".into()))?;

        let material = BASE64
            .decode(encoded)
            .map_err(|_| VaultError::Configuration("vault key is not valid base64".into()))?;

        Self::from_key_material(&material)
    }

    /// Build a vault from raw key material.
    pub fn from_key_material(material: &[u8]) -> Result<Self, VaultError> {
        validate_key_material(material)?;

        let enc_key = derive_subkey(b"payment-core/enc", material);
        let hash_key = derive_subkey(b"payment-core/hash", material);

        let cipher = Aes256Gcm::new_from_slice(&enc_key)
            .map_err(|e| VaultError::Configuration(e.to_string()))?;
        let hasher = <HmacSha256 as Mac>::new_from_slice(&hash_key)
            .map_err(|e| VaultError::Configuration(e.to_string()))?;

        Ok(Self { cipher, hasher })
    }

    /// Encrypt a UTF-8 string into a self-describing envelope.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, VaultError> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);

        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|e| VaultError::Encryption(e.to_string()))?;

        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&ciphertext);

        Ok(format!("{}{}", ENVELOPE_PREFIX, BASE64.encode(payload)))
    }

    /// Decrypt an envelope produced by [`Vault::encrypt`].
    ///
    /// Malformed envelopes and tag mismatches fail; garbage is never returned.
    pub fn decrypt(&self, envelope: &str) -> Result<String, VaultError> {
        let encoded = envelope
            .strip_prefix(ENVELOPE_PREFIX)
            .ok_or_else(|| VaultError::Decryption("unknown envelope version".into()))?;

        let payload = BASE64
            .decode(encoded)
            .map_err(|_| VaultError::Decryption("envelope is not valid base64".into()))?;

        if payload.len() < NONCE_LEN + TAG_LEN {
            return Err(VaultError::Decryption("envelope too short".into()));
        }

        let (nonce_bytes, ciphertext) = payload.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| VaultError::Decryption("authentication tag mismatch".into()))?;

        String::from_utf8(plaintext)
            .map_err(|_| VaultError::Decryption("plaintext is not UTF-8".into()))
    }

    /// Encrypt an optional value, skipping blank strings. Non-blank values are sealed verbatim.
    pub fn encrypt_opt(&self, value: Option<&str>) -> Result<Option<String>, VaultError> {
        match value.filter(|v| !v.trim().is_empty()) {
            Some(v) => self.encrypt(v).map(Some),
            None => Ok(None),
        }
    }

    /// Decrypt an optional envelope.
    pub fn decrypt_opt(&self, envelope: Option<&str>) -> Result<Option<String>, VaultError> {
        envelope.map(|e| self.decrypt(e)).transpose()
    }

    /// Deterministic one-way digest (hex) for values compared but never recovered.
    pub fn hash(&self, value: &str) -> String {
        let mut mac = self.hasher.clone();
        mac.update(value.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Random hex token with `bytes` bytes of entropy.
    pub fn generate_token(bytes: usize) -> String {
        let mut buf = vec![0u8; bytes];
        rand::thread_rng().fill_bytes(&mut buf);
        hex::encode(buf)
    }
}

fn validate_key_material(material: &[u8]) -> Result<(), VaultError> {
    if material.len() < MIN_KEY_LEN {
        return Err(VaultError::Configuration(format!(
            "vault key must be at least {} bytes, got {}",
            MIN_KEY_LEN,
            material.len()
        )));
    }

    let mut seen = [false; 256];
    let distinct = material
        .iter()
        .filter(|b| !std::mem::replace(&mut seen[**b as usize], true))
        .count();
    if distinct < MIN_DISTINCT_BYTES {
        return Err(VaultError::Configuration(
            "vault key has insufficient entropy".into(),
        ));
    }

    Ok(())
}

fn derive_subkey(label: &[u8], material: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(label);
    hasher.update(material);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hasher.finalize());
    out
}

#[cfg(test)]
pub(crate) fn test_vault() -> Vault {
    let material: Vec<u8> = (0u8..48).map(|i| i.wrapping_mul(37).wrapping_add(11)).collect();
    Vault::from_key_material(&material).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let vault = test_vault();
        for s in ["", "1234567890", "proof/2024/abc.png", "Catatan: transfer via BCA ✓"] {
            let envelope = vault.encrypt(s).unwrap();
            assert!(envelope.starts_with("v1."));
            assert!(!envelope.contains(s) || s.is_empty());
            assert_eq!(vault.decrypt(&envelope).unwrap(), s);
        }
    }

    #[test]
    fn test_nonce_is_random() {
        let vault = test_vault();
        assert_ne!(vault.encrypt("same").unwrap(), vault.encrypt("same").unwrap());
    }

    #[test]
    fn test_tampered_envelope_fails() {
        let vault = test_vault();
        let envelope = vault.encrypt("0812-3456-7890").unwrap();
        let mut raw = BASE64.decode(&envelope[3..]).unwrap();

        for idx in [0, NONCE_LEN, raw.len() - 1] {
            raw[idx] ^= 0x01;
            let tampered = format!("v1.{}", BASE64.encode(&raw));
            assert!(matches!(
                vault.decrypt(&tampered),
                Err(VaultError::Decryption(_))
            ));
            raw[idx] ^= 0x01;
        }
    }

    #[test]
    fn test_malformed_envelopes() {
        let vault = test_vault();
        for bad in ["", "plaintext", "v2.AAAA", "v1.!!!", "v1.AAAA"] {
            assert!(matches!(vault.decrypt(bad), Err(VaultError::Decryption(_))));
        }
    }

    #[test]
    fn test_wrong_key_fails() {
        let a = test_vault();
        let material: Vec<u8> = (0u8..32).map(|i| i.wrapping_mul(7).wrapping_add(3)).collect();
        let b = Vault::from_key_material(&material).unwrap();
        let envelope = a.encrypt("secret").unwrap();
        assert!(b.decrypt(&envelope).is_err());
    }

    #[test]
    fn test_key_validation() {
        assert!(matches!(
            Vault::from_base64_key(None),
            Err(VaultError::Configuration(_))
        ));
        assert!(matches!(
            Vault::from_base64_key(Some("   ")),
            Err(VaultError::Configuration(_))
        ));
        assert!(matches!(
            Vault::from_base64_key(Some("not base64 !!")),
            Err(VaultError::Configuration(_))
        ));
        let short = BASE64.encode([7u8; 16]);
        assert!(Vault::from_base64_key(Some(&short)).is_err());
        let low_entropy = BASE64.encode([0u8; 64]);
        assert!(Vault::from_base64_key(Some(&low_entropy)).is_err());

        let good: Vec<u8> = (0u8..32).collect();
        assert!(Vault::from_base64_key(Some(&BASE64.encode(good))).is_ok());
    }

    #[test]
    fn test_hash_is_deterministic() {
        let vault = test_vault();
        assert_eq!(vault.hash("0812"), vault.hash("0812"));
        assert_ne!(vault.hash("0812"), vault.hash("0813"));
        assert_eq!(vault.hash("x").len(), 64);
    }

    #[test]
    fn test_optional_helpers() {
        let vault = test_vault();
        assert_eq!(vault.encrypt_opt(None).unwrap(), None);
        assert_eq!(vault.encrypt_opt(Some("  ")).unwrap(), None);
        let env = vault.encrypt_opt(Some("note")).unwrap();
        assert_eq!(
            vault.decrypt_opt(env.as_deref()).unwrap().as_deref(),
            Some("note")
        );

        let env = vault.encrypt_opt(Some("  transfer via BCA\n")).unwrap();
        assert_eq!(
            vault.decrypt_opt(env.as_deref()).unwrap().as_deref(),
            Some("  transfer via BCA\n")
        );
    }

    #[test]
    fn test_generate_token() {
        let t = Vault::generate_token(16);
        assert_eq!(t.len(), 32);
        assert_ne!(t, Vault::generate_token(16));
    }
}
