//! Error handling for the signing workflow.

#[cfg(doc)]
use crate::{codec, filter, signer, store};

/// An error that may occur when using this crate.
///
/// Collects the errors of all modules so that callers holding results from different parts of
/// the workflow can use one error type.
/// Every failure kind stays distinguishable through its variant; no kind is ever communicated
/// through a message string.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An error occurred in the [`store`] module.
    #[error("Credential store error: {0}")]
    Store(#[from] crate::store::Error),

    /// An error occurred in the [`filter`] module.
    #[error("Certificate selection error: {0}")]
    Filter(#[from] crate::filter::Error),

    /// An error occurred in the [`signer`] module.
    #[error("Signing error: {0}")]
    Signer(#[from] crate::signer::Error),

    /// An error occurred in the [`codec`] module.
    #[error("Signature codec error: {0}")]
    Codec(#[from] crate::codec::Error),

    /// An error with a certificate entry occurred.
    #[error("Certificate entry error: {0}")]
    Entry(#[from] crate::entry::Error),
}
