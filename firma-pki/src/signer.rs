//! The detached signing workflow.
//!
//! [`SigningService`] orchestrates one signing operation from store discovery to the encoded
//! signature: open the store, snapshot its entries, select one certificate, acquire its private
//! key (the sole step that may block on interactive authorization) and compute the signature.
//!
//! Every failure surfaces as a distinct [`Error`] kind and no step is retried internally.
//! Re-prompting a user for authorization without their action is a security anti-pattern, so
//! retries of interactive failures are left to the caller.

use log::debug;
use strum::IntoEnumIterator;

use crate::{
    codec,
    entry::Alias,
    filter::{self, SelectionRule, TieBreak, select},
    store::{self, CredentialStore, StoreSession},
};

/// The default upper bound for payloads accepted by a [`SigningRequest`] (16 MiB).
///
/// Whole-payload signing implies the whole payload is held in memory, so unbounded inputs are
/// rejected before the store is touched.
pub const DEFAULT_MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// An error that may occur during the signing workflow.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The payload exceeds the size bound of the request.
    #[error("Payload of {size} bytes exceeds the configured bound of {max} bytes")]
    PayloadTooLarge {
        /// The size of the rejected payload in bytes.
        size: usize,
        /// The configured bound in bytes.
        max: usize,
    },

    /// A credential store operation failed.
    #[error(transparent)]
    Store(#[from] store::Error),

    /// Certificate selection failed.
    #[error(transparent)]
    Selection(#[from] filter::Error),

    /// An algorithm identifier could not be parsed.
    #[error("Unknown signature algorithm: {input}")]
    UnknownAlgorithm {
        /// The string that does not identify a supported algorithm.
        input: String,
    },
}

/// The digest half of a [`SignatureAlgorithm`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    PartialEq,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "lowercase")]
pub enum HashAlgorithm {
    /// SHA-1 (legacy, kept for stores that only support it).
    Sha1,
    /// SHA-256.
    #[default]
    Sha256,
    /// SHA-384.
    Sha384,
    /// SHA-512.
    Sha512,
}

impl HashAlgorithm {
    /// Returns the digest of `payload` under this algorithm.
    pub fn digest(self, payload: &[u8]) -> Vec<u8> {
        use sha2::Digest as _;

        match self {
            HashAlgorithm::Sha1 => sha1::Sha1::digest(payload).to_vec(),
            HashAlgorithm::Sha256 => sha2::Sha256::digest(payload).to_vec(),
            HashAlgorithm::Sha384 => sha2::Sha384::digest(payload).to_vec(),
            HashAlgorithm::Sha512 => sha2::Sha512::digest(payload).to_vec(),
        }
    }
}

/// The signature scheme half of a [`SignatureAlgorithm`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Eq,
    Hash,
    PartialEq,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "kebab-case")]
pub enum SignatureScheme {
    /// RSA with PKCS#1 v1.5 padding.
    #[default]
    RsaPkcs1,
}

/// A hash-then-sign algorithm identifier, e.g. `sha256-rsa-pkcs1`.
///
/// The pair is a configuration value of each request, not a property of this crate.
/// The default, SHA-256 with RSA PKCS#1 v1.5, matches what qualified signing certificates on a
/// DNIe are provisioned for.
///
/// # Examples
///
/// ```
/// use firma_pki::SignatureAlgorithm;
///
/// # fn main() -> testresult::TestResult {
/// let algorithm = SignatureAlgorithm::default();
/// assert_eq!(algorithm.to_string(), "sha256-rsa-pkcs1");
/// assert_eq!("sha512-rsa-pkcs1".parse::<SignatureAlgorithm>()?.to_string(), "sha512-rsa-pkcs1");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(into = "String", try_from = "String")]
pub struct SignatureAlgorithm {
    /// The hash function applied to the payload.
    pub hash: HashAlgorithm,
    /// The signature scheme applied to the digest.
    pub scheme: SignatureScheme,
}

impl SignatureAlgorithm {
    /// Creates a new [`SignatureAlgorithm`] from a hash function and a signature scheme.
    pub fn new(hash: HashAlgorithm, scheme: SignatureScheme) -> Self {
        Self { hash, scheme }
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.hash, self.scheme)
    }
}

impl std::str::FromStr for SignatureAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        for scheme in SignatureScheme::iter() {
            let suffix: &'static str = scheme.into();
            if let Some(prefix) = s.strip_suffix(suffix)
                && let Some(hash) = prefix.strip_suffix('-')
                && let Ok(hash) = hash.parse()
            {
                return Ok(Self { hash, scheme });
            }
        }

        Err(Error::UnknownAlgorithm { input: s.into() })
    }
}

impl From<SignatureAlgorithm> for String {
    fn from(value: SignatureAlgorithm) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for SignatureAlgorithm {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One payload to sign together with the policy selecting the certificate to sign it with.
#[derive(Clone, Debug)]
pub struct SigningRequest {
    payload: Vec<u8>,
    rule: SelectionRule,
    tie_break: TieBreak,
    algorithm: SignatureAlgorithm,
    max_payload_size: usize,
}

impl SigningRequest {
    /// Creates a new [`SigningRequest`] over `payload` with default rule, tie-break, algorithm
    /// and size bound.
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            payload,
            rule: SelectionRule::default(),
            tie_break: TieBreak::default(),
            algorithm: SignatureAlgorithm::default(),
            max_payload_size: DEFAULT_MAX_PAYLOAD_SIZE,
        }
    }

    /// Sets the selection rule of the request.
    pub fn with_rule(mut self, rule: SelectionRule) -> Self {
        self.rule = rule;
        self
    }

    /// Sets the tie-break policy of the request.
    pub fn with_tie_break(mut self, tie_break: TieBreak) -> Self {
        self.tie_break = tie_break;
        self
    }

    /// Sets the signature algorithm of the request.
    pub fn with_algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Sets the payload size bound of the request.
    pub fn with_max_payload_size(mut self, max_payload_size: usize) -> Self {
        self.max_payload_size = max_payload_size;
        self
    }

    /// Returns the payload of the request.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Returns the signature algorithm of the request.
    pub fn algorithm(&self) -> SignatureAlgorithm {
        self.algorithm
    }
}

/// The result of a completed signing operation.
///
/// There is no partial result: a request either yields a [`SigningOutcome`] or an [`Error`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SigningOutcome {
    signature: String,
    alias: Alias,
    subject_name: String,
}

impl SigningOutcome {
    /// Returns the Base64-encoded detached signature.
    pub fn signature(&self) -> &str {
        &self.signature
    }

    /// Returns the alias of the certificate entry that produced the signature.
    pub fn alias(&self) -> &Alias {
        &self.alias
    }

    /// Returns the subject distinguished name of the certificate that produced the signature.
    pub fn subject_name(&self) -> &str {
        &self.subject_name
    }
}

/// A one-shot orchestration of the signing workflow against a [`CredentialStore`].
///
/// The service borrows the store and owns no state across calls; each call to
/// [`sign`][`SigningService::sign`] runs the workflow exactly once.
///
/// Acquiring the private key is the sole step that may block for a human time scale.
/// Callers in latency-sensitive contexts must run [`sign`][`SigningService::sign`] off that
/// context and layer their own timeout or cancellation on top; cancelling mid-authorization is
/// provider-defined behavior, so none is imposed here.
#[derive(Debug)]
pub struct SigningService<'a, S: CredentialStore> {
    store: &'a S,
}

impl<'a, S: CredentialStore> SigningService<'a, S> {
    /// Creates a new [`SigningService`] using `store`.
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Runs the signing workflow for `request` and returns the encoded signature.
    ///
    /// The private key of the selected entry is acquired exactly once and only after selection,
    /// so entries that do not match the rule never provoke an authorization prompt.
    ///
    /// # Errors
    ///
    /// Returns an [`Error`][`crate::Error`] if
    /// * the payload exceeds the size bound of the request ([`Error::PayloadTooLarge`])
    /// * the store cannot be opened or enumerated ([`store::Error::Unavailable`])
    /// * no entry matches the selection rule ([`filter::Error::NoMatch`])
    /// * more than one entry matches under [`TieBreak::RequireUnique`]
    ///   ([`filter::Error::Ambiguous`])
    /// * key authorization is denied or cancelled ([`store::Error::AccessDenied`],
    ///   [`store::Error::AccessCancelled`])
    /// * the cryptographic operation fails ([`store::Error::Signing`])
    pub fn sign(&self, request: &SigningRequest) -> Result<SigningOutcome, crate::Error> {
        if request.payload.len() > request.max_payload_size {
            return Err(Error::PayloadTooLarge {
                size: request.payload.len(),
                max: request.max_payload_size,
            }
            .into());
        }

        debug!("Opening credential store");
        let session = self.store.open()?;

        let entries = session.entries()?;
        debug!("Enumerated {} certificate entries", entries.len());

        let selected = select(&entries, &request.rule, request.tie_break)?;
        debug!(
            "Selected certificate {} ({})",
            selected.alias(),
            selected.subject_name()
        );

        debug!(
            "Acquiring private key for {} (may block on interactive authorization)",
            selected.alias()
        );
        let key = session.private_key(selected.alias())?;

        let raw = key.sign(request.algorithm, &request.payload)?;
        debug!("Created {} byte signature with {}", raw.len(), request.algorithm);

        Ok(SigningOutcome {
            signature: codec::encode(&raw),
            alias: selected.alias().clone(),
            subject_name: selected.subject_name().to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use testresult::TestResult;

    use super::*;

    #[rstest]
    #[case("sha1-rsa-pkcs1", HashAlgorithm::Sha1)]
    #[case("sha256-rsa-pkcs1", HashAlgorithm::Sha256)]
    #[case("sha384-rsa-pkcs1", HashAlgorithm::Sha384)]
    #[case("sha512-rsa-pkcs1", HashAlgorithm::Sha512)]
    fn algorithm_string_round_trip(#[case] input: &str, #[case] hash: HashAlgorithm) -> TestResult {
        let algorithm: SignatureAlgorithm = input.parse()?;
        assert_eq!(algorithm.hash, hash);
        assert_eq!(algorithm.scheme, SignatureScheme::RsaPkcs1);
        assert_eq!(algorithm.to_string(), input);
        Ok(())
    }

    #[rstest]
    #[case("")]
    #[case("sha256")]
    #[case("rsa-pkcs1")]
    #[case("md5-rsa-pkcs1")]
    #[case("sha256-rsa-pss")]
    fn unknown_algorithm_is_rejected(#[case] input: &str) {
        assert!(matches!(
            input.parse::<SignatureAlgorithm>(),
            Err(Error::UnknownAlgorithm { .. })
        ));
    }

    #[test]
    fn default_algorithm_is_sha256_rsa_pkcs1() {
        assert_eq!(
            SignatureAlgorithm::default(),
            SignatureAlgorithm::new(HashAlgorithm::Sha256, SignatureScheme::RsaPkcs1)
        );
    }

    #[rstest]
    #[case(HashAlgorithm::Sha1, 20)]
    #[case(HashAlgorithm::Sha256, 32)]
    #[case(HashAlgorithm::Sha384, 48)]
    #[case(HashAlgorithm::Sha512, 64)]
    fn digest_lengths(#[case] hash: HashAlgorithm, #[case] len: usize) {
        assert_eq!(hash.digest(b"Prueba de firma con DNIe").len(), len);
    }
}
