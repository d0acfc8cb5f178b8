//! Traits for accessing a platform credential store.
//!
//! A credential store pairs certificates with private keys that may be software-backed or live in
//! hardware (smart card, HSM, TPM).
//! Providers differ wildly in their APIs, so this module only fixes the three operations the
//! signing workflow needs: opening the store, enumerating its certificate slots and acquiring a
//! private key for one selected alias.
//!
//! Enumeration and key acquisition are split into two calls specifically so that filtering never
//! triggers an interactive prompt.
//! Only the finally selected alias pays the interaction cost.

use crate::{
    entry::{Alias, CertificateEntry},
    signer::SignatureAlgorithm,
};

/// An error that may occur when using a credential store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The credential provider could not be opened.
    #[error("Credential store unavailable: {context}")]
    Unavailable {
        /// The context in which the error occurred.
        ///
        /// This is meant to complete the sentence "Credential store unavailable: ".
        context: String,
    },

    /// No slot with the requested alias exists in the store.
    #[error("No slot with alias {0} exists in the store")]
    NoSuchAlias(Alias),

    /// The interactive authorization step was explicitly rejected.
    ///
    /// This covers a wrong PIN as well as an exhausted retry counter on the token.
    #[error("Access to the private key of {alias} was denied")]
    AccessDenied {
        /// The alias for which key access was denied.
        alias: Alias,
    },

    /// The interactive authorization step was aborted by the operator.
    #[error("Access to the private key of {alias} was cancelled")]
    AccessCancelled {
        /// The alias for which key access was cancelled.
        alias: Alias,
    },

    /// A private key was acquired but the cryptographic operation itself failed.
    #[error("Signing operation failed while {context}:\n{source}")]
    Signing {
        /// The context in which the error occurred.
        ///
        /// This is meant to complete the sentence "Signing operation failed while ".
        context: &'static str,
        /// The source error.
        source: Box<dyn std::error::Error + 'static + Send + Sync>,
    },
}

/// A provider of certificates and associated private keys.
///
/// Opening the store must be idempotent within a process and must not ask for a global
/// passphrase.
/// Per-key authorization happens later, per selected entry, in
/// [`StoreSession::private_key`].
pub trait CredentialStore {
    /// The session type produced by [`open`][`CredentialStore::open`].
    type Session: StoreSession;

    /// Opens a connection to the credential provider.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unavailable`] if the provider cannot be reached, e.g. because the
    /// platform service is not running or no compatible provider exists on this host.
    fn open(&self) -> Result<Self::Session, Error>;
}

/// One open connection to a credential store.
pub trait StoreSession {
    /// Returns a snapshot of all certificate slots in the store.
    ///
    /// Entries are returned in provider-defined order; callers must not assume any ordering.
    /// Slots without parsable certificate material are silently skipped, as a heterogeneous
    /// store (machine certificates, root certificates, expired certificates) is expected.
    ///
    /// The snapshot is eager because providers do not guarantee that enumeration is resumable
    /// after an interactive key prompt.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Unavailable`] if the provider connection broke down mid-enumeration.
    fn entries(&self) -> Result<Vec<CertificateEntry>, Error>;

    /// Acquires the private key bound to `alias`.
    ///
    /// This call blocks and may suspend indefinitely pending user interaction (PIN entry,
    /// biometric check) that occurs exactly once per acquisition and outside the control of this
    /// crate.
    /// Callers must run it off any latency-sensitive execution context and must not call it
    /// speculatively for entries that were not selected, as that provokes spurious prompts.
    ///
    /// # Errors
    ///
    /// Returns an error if
    /// * no slot with `alias` exists ([`Error::NoSuchAlias`])
    /// * authorization is explicitly rejected ([`Error::AccessDenied`])
    /// * the operator aborts the interactive step ([`Error::AccessCancelled`])
    fn private_key(&self, alias: &Alias) -> Result<Box<dyn PrivateKeyHandle>, Error>;
}

/// An opaque, non-exportable capability to use (not extract) one private key.
///
/// A handle is bound to exactly one alias, is used for one signature computation and is then
/// released.
/// It is never cached, never serialized and never logged.
pub trait PrivateKeyHandle {
    /// Returns the alias of the slot this handle is bound to.
    fn alias(&self) -> &Alias;

    /// Creates a detached signature over `payload` using a hash-then-sign scheme.
    ///
    /// The digest and padding are selected by `algorithm`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Signing`] if the cryptographic operation fails, e.g. on a device I/O
    /// error or a key that does not support `algorithm`.
    fn sign(&self, algorithm: SignatureAlgorithm, payload: &[u8]) -> Result<Vec<u8>, Error>;
}

impl std::fmt::Debug for dyn PrivateKeyHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // deliberately reveals the bound alias only
        f.debug_struct("PrivateKeyHandle")
            .field("alias", self.alias())
            .finish_non_exhaustive()
    }
}
