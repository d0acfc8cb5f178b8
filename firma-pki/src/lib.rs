//! A library for locating a qualified signing certificate in a credential store and creating
//! detached signatures with its private key.
//!
//! Credential stores (smart cards such as the DNIe, HSMs, TPMs or software key files) hold a
//! heterogeneous mix of certificates: identification and signing certificates of the holder,
//! machine certificates, root certificates and expired leftovers.
//! This crate selects the one entry that is usable for qualified signing and creates a detached
//! signature over an arbitrary byte payload with the private key associated with that entry.
//!
//! The store is consumed through the [`CredentialStore`] trait, so that any provider exposing
//! "open", "enumerate" and "get private key for alias" can be plugged in.
//! Enumeration is cheap and side-effect free, while acquiring a private key may block on an
//! interactive authorization step (a PIN prompt on hardware tokens).
//! The two are deliberately separate operations: filtering never triggers a prompt, only the
//! finally selected alias pays the interaction cost.
//!
//! Certificate selection is driven by a [`SelectionRule`], a conjunction of substring predicates
//! over the distinguished names of an entry, combined with a named [`TieBreak`] policy for the
//! case of multiple matches.
//!
//! # Examples
//!
//! ```
//! use firma_pki::{
//!     AuthorizationOutcome,
//!     MemoryStore,
//!     SelectionRule,
//!     SigningRequest,
//!     SigningService,
//! };
//!
//! # fn main() -> testresult::TestResult {
//! # let key = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 2048)?;
//! // A software-backed store with a single signing certificate.
//! let mut store = MemoryStore::new();
//! store.insert(
//!     firma_pki::MemorySlot::new(
//!         "dnie-0".parse()?,
//!         "CN=Jane Doe FIR Signing",
//!         "CN=RENIEC ECEP",
//!         key,
//!     )
//!     .with_authorization(AuthorizationOutcome::Granted),
//! );
//!
//! let request = SigningRequest::new(b"payload".to_vec())
//!     .with_rule(SelectionRule::new().issuer_contains("RENIEC"));
//!
//! let outcome = SigningService::new(&store).sign(&request)?;
//! assert!(!outcome.signature().is_empty());
//! # Ok(())
//! # }
//! ```

pub mod codec;
mod entry;
mod error;
pub mod filter;
pub mod memory;
pub mod signer;
pub mod store;

// Publicly re-export chrono facilities used in the API of CertificateEntry.
pub use chrono::{DateTime, Utc};
pub use entry::{Alias, CertificateEntry, Error as EntryError};
pub use error::Error;
pub use filter::{SelectionRule, TieBreak, select};
pub use memory::{AuthorizationOutcome, MemorySlot, MemoryStore};
pub use signer::{
    DEFAULT_MAX_PAYLOAD_SIZE,
    HashAlgorithm,
    SignatureAlgorithm,
    SignatureScheme,
    SigningOutcome,
    SigningRequest,
    SigningService,
};
pub use store::{CredentialStore, PrivateKeyHandle, StoreSession};
