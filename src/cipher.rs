//! Repeating-key XOR obfuscation.
//!
//! This is **not** encryption. The key is a fixed value shared by every
//! installation, there is no nonce and no integrity check. It only keeps the
//! contents of a template from being readable at a glance.
//!
//! `encode` and `decode` are the same involution:
//! `output[i] = input[i] ^ key[i % key.len()]`.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use crate::config::DEFAULT_KEY;
use crate::error::TemplateError;

/// Non-empty obfuscation key.
#[derive(Clone, PartialEq, Eq)]
pub struct Key {
    bytes: Arc<[u8]>,
}

impl Key {
    pub fn new(bytes: impl AsRef<[u8]>) -> Result<Self, TemplateError> {
        let bytes = bytes.as_ref();
        if bytes.is_empty() {
            return Err(TemplateError::EmptyKey);
        }

        Ok(Self { bytes: Arc::from(bytes) })
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Default for Key {
    fn default() -> Self {
        Self { bytes: Arc::from(DEFAULT_KEY.as_bytes()) }
    }
}

impl Debug for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Key([... {} bytes ...])", self.bytes.len())
    }
}

/// Stateless XOR transform bound to a [`Key`].
///
/// Cheap to clone; workers each hold their own copy.
#[derive(Debug, Clone, Default)]
pub struct Cipher {
    key: Key,
}

impl Cipher {
    #[inline]
    pub fn new(key: Key) -> Self {
        Self { key }
    }

    pub fn encode(&self, plaintext: &[u8]) -> Vec<u8> {
        let mut out = plaintext.to_vec();
        self.apply_in_place(&mut out);
        out
    }

    pub fn decode(&self, ciphertext: &[u8]) -> Vec<u8> {
        let mut out = ciphertext.to_vec();
        self.apply_in_place(&mut out);
        out
    }

    /// XORs `data` with the key stream, starting at key offset 0.
    pub fn apply_in_place(&self, data: &mut [u8]) {
        let key = self.key.as_bytes();
        for (byte, k) in data.iter_mut().zip(key.iter().cycle()) {
            *byte ^= k;
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    #[test]
    fn test_empty_key_rejected() {
        assert!(matches!(Key::new(b""), Err(TemplateError::EmptyKey)));
    }

    #[test]
    fn test_known_vector() {
        let cipher = Cipher::new(Key::new(b"ab").unwrap());
        // 'a' = 0x61, 'b' = 0x62
        assert_eq!(cipher.encode(&[0x00, 0x00, 0x01, 0xff]), vec![0x61, 0x62, 0x60, 0x9d]);
    }

    #[test]
    fn test_default_key() {
        let cipher = Cipher::default();
        let encoded = cipher.encode(b"tdmcliKeyy");
        assert!(encoded.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_empty_input() {
        assert!(Cipher::default().encode(&[]).is_empty());
    }

    #[test]
    fn test_debug_hides_key() {
        let rendered = format!("{:?}", Key::default());
        assert!(!rendered.contains("tdmcli"));
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(
            data in prop::collection::vec(any::<u8>(), 0..4096),
            key in prop::collection::vec(any::<u8>(), 1..64),
        ) {
            let cipher = Cipher::new(Key::new(&key).unwrap());
            prop_assert_eq!(cipher.decode(&cipher.encode(&data)), data);
        }

        #[test]
        fn prop_length_preserved(data in prop::collection::vec(any::<u8>(), 0..1024)) {
            prop_assert_eq!(Cipher::default().encode(&data).len(), data.len());
        }
    }
}
