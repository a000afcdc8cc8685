//! `X-Hub-Signature-256` verification.
//!
//! GitHub signs each delivery body with HMAC-SHA256 keyed by the webhook
//! secret and sends `sha256=<hex digest>`. Comparison is constant-time.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

/// Header carrying the HMAC-SHA256 signature.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

/// Reasons a delivery fails signature verification.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing X-Hub-Signature-256 header")]
    Missing,
    #[error("signature must use sha256=<hex> format")]
    Format,
    #[error("signature digest is not valid hex")]
    Hex,
    #[error("signature does not match payload")]
    Mismatch,
}

/// Verifies `signature_header` against `payload` signed with `secret`.
pub fn verify_signature(
    payload: &[u8],
    signature_header: Option<&str>,
    secret: &str,
) -> Result<(), SignatureError> {
    let header = signature_header
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or(SignatureError::Missing)?;
    let digest_hex = header
        .strip_prefix("sha256=")
        .ok_or(SignatureError::Format)?;
    let signature = decode_hex(digest_hex)?;

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).map_err(|_| SignatureError::Mismatch)?;
    mac.update(payload);
    mac.verify_slice(&signature)
        .map_err(|_| SignatureError::Mismatch)
}

fn decode_hex(raw: &str) -> Result<Vec<u8>, SignatureError> {
    if raw.is_empty() || raw.len() % 2 != 0 {
        return Err(SignatureError::Hex);
    }
    raw.as_bytes()
        .chunks(2)
        .map(|pair| {
            let high = hex_value(pair[0])?;
            let low = hex_value(pair[1])?;
            Ok((high << 4) | low)
        })
        .collect()
}

fn hex_value(byte: u8) -> Result<u8, SignatureError> {
    match byte {
        b'0'..=b'9' => Ok(byte - b'0'),
        b'a'..=b'f' => Ok(byte - b'a' + 10),
        b'A'..=b'F' => Ok(byte - b'A' + 10),
        _ => Err(SignatureError::Hex),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Produces the header value GitHub would send for `payload`.
    pub(crate) fn sign(payload: &[u8], secret: &str) -> String {
        let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac");
        mac.update(payload);
        let digest: String = mac
            .finalize()
            .into_bytes()
            .iter()
            .map(|byte| format!("{byte:02x}"))
            .collect();
        format!("sha256={digest}")
    }

    #[test]
    fn accepts_a_matching_signature() {
        let header = sign(b"{\"zen\":\"Design for failure.\"}", "s3cret");
        assert_eq!(
            verify_signature(
                b"{\"zen\":\"Design for failure.\"}",
                Some(&header),
                "s3cret"
            ),
            Ok(())
        );
    }

    #[test]
    fn accepts_uppercase_hex_digests() {
        let header = sign(b"body", "s3cret").to_uppercase().replacen("SHA256=", "sha256=", 1);
        assert_eq!(verify_signature(b"body", Some(&header), "s3cret"), Ok(()));
    }

    #[test]
    fn rejects_tampered_payloads_and_wrong_secrets() {
        let header = sign(b"body", "s3cret");
        assert_eq!(
            verify_signature(b"b0dy", Some(&header), "s3cret"),
            Err(SignatureError::Mismatch)
        );
        assert_eq!(
            verify_signature(b"body", Some(&header), "other"),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn rejects_malformed_headers() {
        assert_eq!(
            verify_signature(b"body", None, "s3cret"),
            Err(SignatureError::Missing)
        );
        assert_eq!(
            verify_signature(b"body", Some("sha1=abcd"), "s3cret"),
            Err(SignatureError::Format)
        );
        assert_eq!(
            verify_signature(b"body", Some("sha256=abc"), "s3cret"),
            Err(SignatureError::Hex)
        );
        assert_eq!(
            verify_signature(b"body", Some("sha256=zz"), "s3cret"),
            Err(SignatureError::Hex)
        );
    }
}
