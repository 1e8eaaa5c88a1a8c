//! Local Ed25519 signer
//!
//! SECURITY: This is the ONLY place where private key material is used.
//! - Keys are held in ed25519-dalek's SigningKey
//! - Keys are never serialized to JSON
//! - Keys are never logged

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};

use crate::accounts::{derive_address, ActiveAccount};
use crate::{Error, Result};

/// Signer for a single-key Ed25519 account
///
/// The private key is:
/// - Stored in a `SigningKey` (zeroized on drop)
/// - Never serialized (no Serialize impl)
/// - Only accessible via signing operations
pub struct LocalSigner {
    signing_key: SigningKey,
    /// Derived account address (safe to expose)
    address: String,
}

impl LocalSigner {
    /// Create a signer from a hex-encoded 32-byte private key
    pub fn from_hex(key_hex: &str) -> Result<Self> {
        // Remove 0x prefix if present
        let key_hex = key_hex.trim();
        let key_hex = key_hex.strip_prefix("0x").unwrap_or(key_hex);

        let bytes = hex::decode(key_hex)
            .map_err(|e| Error::Wallet(format!("Invalid private key: {}", e)))?;
        let bytes: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            Error::Wallet(format!(
                "Invalid private key: expected 32 bytes, got {}",
                b.len()
            ))
        })?;

        Ok(Self::from_signing_key(SigningKey::from_bytes(&bytes)))
    }

    /// Generate a fresh key from the OS RNG
    pub fn generate() -> Self {
        let mut rng = rand::rngs::OsRng;
        Self::from_signing_key(SigningKey::generate(&mut rng))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let address = derive_address(signing_key.verifying_key().as_bytes());
        Self {
            signing_key,
            address,
        }
    }

    /// Get the account address (safe to share)
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn public_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// `0x`-prefixed hex public key
    pub fn public_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.public_key().as_bytes()))
    }

    pub fn account(&self) -> ActiveAccount {
        ActiveAccount {
            address: self.address.clone(),
            public_key: self.public_key_hex(),
        }
    }

    /// Export the private key, for writing to the CLI user only
    pub fn private_key_hex(&self) -> String {
        format!("0x{}", hex::encode(self.signing_key.to_bytes()))
    }

    /// Sign raw bytes
    pub fn sign(&self, message: &[u8]) -> Signature {
        self.signing_key.sign(message)
    }

    /// Sign raw bytes, returning the `0x`-prefixed hex signature
    pub fn sign_hex(&self, message: &[u8]) -> String {
        format!("0x{}", hex::encode(self.sign(message).to_bytes()))
    }

    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        self.public_key().verify(message, signature).is_ok()
    }
}

// Implement Debug manually to avoid exposing the key
impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.address)
            .field("signing_key", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Test private key (DO NOT use in production!)
    const TEST_KEY: &str = "0x9bf49a6a0755f953811fce125f2683d50429c3bb49e074147e0089a52eae155f";

    #[test]
    fn test_signer_from_hex() {
        let signer = LocalSigner::from_hex(TEST_KEY).unwrap();
        let unprefixed = LocalSigner::from_hex(TEST_KEY.trim_start_matches("0x")).unwrap();

        assert_eq!(signer.address(), unprefixed.address());
        assert_eq!(
            signer.address(),
            derive_address(signer.public_key().as_bytes())
        );
        assert_eq!(signer.private_key_hex(), TEST_KEY);
    }

    #[test]
    fn test_rejects_wrong_length() {
        let err = LocalSigner::from_hex("0xdeadbeef").unwrap_err();
        assert!(err.to_string().contains("expected 32 bytes"));
        assert!(LocalSigner::from_hex("0xzz").is_err());
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = LocalSigner::from_hex(TEST_KEY).unwrap();
        let signature = signer.sign(b"hello");
        assert!(signer.verify(b"hello", &signature));
        assert!(!signer.verify(b"hullo", &signature));
        // 0x + 64 bytes hex
        assert_eq!(signer.sign_hex(b"hello").len(), 130);
    }

    #[test]
    fn test_debug_redacts_key() {
        let signer = LocalSigner::from_hex(TEST_KEY).unwrap();
        let debug_str = format!("{:?}", signer);

        assert!(!debug_str.contains("9bf49a6a"));
        assert!(debug_str.contains("[REDACTED]"));
    }

    #[test]
    fn test_generated_keys_differ() {
        let a = LocalSigner::generate();
        let b = LocalSigner::generate();
        assert_ne!(a.address(), b.address());
    }
}
