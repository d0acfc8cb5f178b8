//! Transport-safe encoding of raw signature bytes.
//!
//! Signatures travel as text, so the raw bytes are rendered as standard padded Base64 without
//! line wrapping.
//! Encoding is deterministic and total; decoding is its exact inverse and fails on malformed
//! input.

use base64ct::{Base64, Encoding as _};

/// An error that can occur when decoding an encoded signature.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input is not valid Base64.
    #[error("Malformed signature encoding: {0}")]
    MalformedEncoding(#[from] base64ct::Error),
}

/// Encodes raw signature bytes as standard padded Base64 without line wrapping.
///
/// # Examples
///
/// ```
/// assert_eq!(firma_pki::codec::encode(b"firma"), "ZmlybWE=");
/// assert_eq!(firma_pki::codec::encode(b""), "");
/// ```
pub fn encode(bytes: &[u8]) -> String {
    Base64::encode_string(bytes)
}

/// Decodes a Base64 string produced by [`encode`] back into raw bytes.
///
/// # Errors
///
/// Returns [`Error::MalformedEncoding`] if `text` is not valid standard padded Base64.
///
/// # Examples
///
/// ```
/// # fn main() -> testresult::TestResult {
/// assert_eq!(firma_pki::codec::decode("ZmlybWE=")?, b"firma");
/// assert!(firma_pki::codec::decode("not base64!").is_err());
/// # Ok(())
/// # }
/// ```
pub fn decode(text: &str) -> Result<Vec<u8>, Error> {
    Ok(Base64::decode_vec(text)?)
}
