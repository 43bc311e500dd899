//! Reversible payload encoding.
//!
//! Secrets are stored as standard padded base64 text so arbitrary bytes
//! survive text columns and JSON values unchanged. The encoding is not a
//! confidentiality measure.

use base64::{engine::general_purpose::STANDARD, Engine as _};

use crate::error::CodecError;

/// Encode raw secret bytes for storage. Total over all inputs.
pub fn encode(raw: &[u8]) -> String {
    STANDARD.encode(raw)
}

/// Decode a stored payload back into the raw secret bytes.
///
/// A failure here means the stored payload was corrupted after it was
/// written; callers treat it as an internal error, not a client error.
pub fn decode(encoded: &str) -> Result<Vec<u8>, CodecError> {
    STANDARD
        .decode(encoded)
        .map_err(|e| CodecError::InvalidPayload {
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_encode_known_value() {
        assert_eq!(encode(b"Meow"), "TWVvdw==");
        assert_eq!(decode("TWVvdw==").expect("valid payload"), b"Meow");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(encode(b""), "");
        assert_eq!(decode("").expect("empty payload"), Vec::<u8>::new());
    }

    #[test]
    fn test_non_utf8_bytes_survive() {
        let raw = [0xff, 0xfe, 0x00, 0x80, 0xc3, 0x28];
        let encoded = encode(&raw);
        assert!(encoded.is_ascii());
        assert_eq!(decode(&encoded).expect("valid payload"), raw);
    }

    #[test]
    fn test_decode_rejects_corrupted_payload() {
        let err = decode("not*base64!").unwrap_err();
        assert!(matches!(err, CodecError::InvalidPayload { .. }));
    }

    proptest! {
        #[test]
        fn prop_decode_inverts_encode(raw in proptest::collection::vec(any::<u8>(), 0..512)) {
            let encoded = encode(&raw);
            prop_assert_eq!(decode(&encoded).unwrap(), raw);
        }
    }
}
