//! PEM armor for raw key bytes.
//!
//! The overlay's key files carry the 32 raw key bytes in a PEM block with a
//! custom label rather than a PKCS#8 structure.

use ::pem::{EncodeConfig, LineEnding, Pem};

use super::keys::KeyError;

/// Label of a public key block.
pub const PUBLIC_KEY_LABEL: &str = "NEBULA X25519 PUBLIC KEY";

/// Label of a private key block.
pub const PRIVATE_KEY_LABEL: &str = "NEBULA X25519 PRIVATE KEY";

/// Base64 line width used when armoring.
const LINE_WIDTH: usize = 64;

/// Armor `bytes` in a PEM block with the given label.
#[must_use]
pub fn encode(label: &str, bytes: &[u8]) -> String {
    let block = Pem::new(label, bytes);
    let config = EncodeConfig::new()
        .set_line_ending(LineEnding::LF)
        .set_line_wrap(LINE_WIDTH);
    ::pem::encode_config(&block, config)
}

/// Extract the bytes of the first PEM block labelled `label` in `text`.
///
/// # Errors
///
/// Returns `KeyError::InvalidPem` if the text isn't well-formed PEM or holds
/// no block with that label.
pub fn decode(label: &str, text: &str) -> Result<Vec<u8>, KeyError> {
    let blocks = ::pem::parse_many(text).map_err(|e| KeyError::InvalidPem(e.to_string()))?;

    blocks
        .into_iter()
        .find(|block| block.tag() == label)
        .map(Pem::into_contents)
        .ok_or_else(|| KeyError::InvalidPem(format!("no {label} block")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let pem = encode(PUBLIC_KEY_LABEL, &[0u8; 32]);
        assert_eq!(
            pem,
            "-----BEGIN NEBULA X25519 PUBLIC KEY-----\n\
             AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=\n\
             -----END NEBULA X25519 PUBLIC KEY-----\n"
        );
    }

    #[test]
    fn test_labels_survive_parsing() {
        let public = ::pem::parse(encode(PUBLIC_KEY_LABEL, &[1u8; 32])).unwrap();
        let private = ::pem::parse(encode(PRIVATE_KEY_LABEL, &[2u8; 32])).unwrap();

        assert_eq!(public.tag(), "NEBULA X25519 PUBLIC KEY");
        assert_eq!(private.tag(), "NEBULA X25519 PRIVATE KEY");
    }

    #[test]
    fn test_long_bodies_wrap_at_64_columns() {
        let pem = encode("TEST", &[0xAB; 100]);
        let body: Vec<&str> = pem.lines().skip(1).take_while(|l| !l.starts_with("-----")).collect();

        assert_eq!(body.len(), 3);
        assert_eq!(body[0].len(), LINE_WIDTH);
        assert_eq!(decode("TEST", &pem).unwrap(), vec![0xAB; 100]);
    }

    #[test]
    fn test_decode_picks_block_by_label() {
        let text = format!(
            "{}{}",
            encode(PUBLIC_KEY_LABEL, &[1u8; 32]),
            encode(PRIVATE_KEY_LABEL, &[2u8; 32])
        );
        assert_eq!(decode(PRIVATE_KEY_LABEL, &text).unwrap(), vec![2u8; 32]);
    }

    #[test]
    fn test_decode_rejects_wrong_label() {
        let pem = encode(PRIVATE_KEY_LABEL, &[1u8; 32]);
        assert!(matches!(
            decode(PUBLIC_KEY_LABEL, &pem),
            Err(KeyError::InvalidPem(_))
        ));
    }

    #[test]
    fn test_decode_rejects_unterminated_block() {
        let pem = "-----BEGIN TEST-----\naGVsbG8=\n";
        assert!(decode("TEST", pem).is_err());
    }

    #[test]
    fn test_decode_rejects_bad_base64() {
        let pem = "-----BEGIN TEST-----\n!!!!\n-----END TEST-----\n";
        assert!(decode("TEST", pem).is_err());
    }
}
