//! A software-backed, in-memory credential store.
//!
//! [`MemoryStore`] implements [`CredentialStore`] over RSA keys held in process memory.
//! It serves two purposes: it is the hermetic backend for setups without a hardware token, and
//! it is the deterministic test double for the signing workflow.
//! The interactive authorization step of a real provider (the PIN prompt of a smart card) is
//! replaced by a scripted [`AuthorizationOutcome`] per slot, and the number of private key
//! acquisitions is recorded so that tests can assert that filtering never provokes a prompt.

use std::sync::{
    Arc,
    Mutex,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use chrono::{DateTime, Days, Utc};
use log::debug;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};

use crate::{
    entry::{Alias, CertificateEntry},
    signer::{HashAlgorithm, SignatureAlgorithm, SignatureScheme},
    store::{CredentialStore, Error, PrivateKeyHandle, StoreSession},
};

/// The scripted result of the authorization step for one slot.
///
/// A real provider would block on user interaction at this point; the in-memory store resolves
/// the interaction from this script instead.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum AuthorizationOutcome {
    /// Authorization succeeds and the private key is handed out.
    #[default]
    Granted,
    /// Authorization is explicitly rejected (wrong PIN, retry counter exhausted).
    Denied,
    /// The operator aborts the interactive step.
    Cancelled,
}

/// One slot of a [`MemoryStore`].
///
/// A slot either carries parsable certificate material together with an RSA private key, or is
/// marked unparsable, in which case it is silently skipped during enumeration just like a
/// non-certificate slot in a platform store.
pub struct MemorySlot {
    alias: Alias,
    certificate: Option<SlotCertificate>,
    authorization: AuthorizationOutcome,
}

/// Parsed certificate material of a [`MemorySlot`].
struct SlotCertificate {
    subject_name: String,
    issuer_name: String,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
    key: RsaPrivateKey,
}

impl MemorySlot {
    /// Creates a new parsable slot with a four year validity window starting now.
    pub fn new(
        alias: Alias,
        subject_name: impl Into<String>,
        issuer_name: impl Into<String>,
        key: RsaPrivateKey,
    ) -> Self {
        let now = Utc::now();
        Self {
            alias,
            certificate: Some(SlotCertificate {
                subject_name: subject_name.into(),
                issuer_name: issuer_name.into(),
                not_before: now,
                not_after: now + Days::new(4 * 365),
                key,
            }),
            authorization: AuthorizationOutcome::default(),
        }
    }

    /// Creates a slot whose certificate material cannot be parsed.
    ///
    /// Such a slot is skipped during enumeration and yields [`Error::NoSuchAlias`] on key
    /// acquisition.
    pub fn unparsable(alias: Alias) -> Self {
        Self {
            alias,
            certificate: None,
            authorization: AuthorizationOutcome::default(),
        }
    }

    /// Sets the scripted authorization outcome of the slot.
    pub fn with_authorization(mut self, authorization: AuthorizationOutcome) -> Self {
        self.authorization = authorization;
        self
    }

    /// Sets the validity window of the slot's certificate.
    ///
    /// Has no effect on unparsable slots.
    pub fn with_validity(mut self, not_before: DateTime<Utc>, not_after: DateTime<Utc>) -> Self {
        if let Some(certificate) = self.certificate.as_mut() {
            certificate.not_before = not_before;
            certificate.not_after = not_after;
        }
        self
    }

    /// Returns the entry snapshot of the slot, or [`None`] for unparsable slots.
    fn entry(&self) -> Option<CertificateEntry> {
        self.certificate.as_ref().map(|certificate| {
            CertificateEntry::new(
                self.alias.clone(),
                certificate.subject_name.clone(),
                certificate.issuer_name.clone(),
                certificate.not_before,
                certificate.not_after,
            )
        })
    }
}

impl std::fmt::Debug for MemorySlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // key material is deliberately not shown
        f.debug_struct("MemorySlot")
            .field("alias", &self.alias)
            .field("parsable", &self.certificate.is_some())
            .field("authorization", &self.authorization)
            .finish_non_exhaustive()
    }
}

/// Shared state of a [`MemoryStore`] and its sessions.
struct Inner {
    slots: Mutex<Vec<MemorySlot>>,
    available: AtomicBool,
    acquisitions: AtomicUsize,
}

/// A software-backed credential store holding its slots in process memory.
///
/// Opening the store is idempotent and sessions of one store share its slots, which mirrors the
/// read-mostly, shared nature of a platform store accessed by concurrent callers.
///
/// # Examples
///
/// ```
/// use firma_pki::{AuthorizationOutcome, CredentialStore, MemorySlot, MemoryStore, StoreSession};
///
/// # fn main() -> testresult::TestResult {
/// # let key = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 2048)?;
/// let mut store = MemoryStore::new();
/// store.insert(MemorySlot::new(
///     "dnie-0".parse()?,
///     "CN=Jane Doe FIR Signing",
///     "CN=RENIEC ECEP",
///     key,
/// ));
/// store.insert(MemorySlot::unparsable("scrap".parse()?));
///
/// let session = store.open()?;
/// // the unparsable slot is skipped
/// assert_eq!(session.entries()?.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    /// Creates a new, empty [`MemoryStore`].
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: Mutex::new(Vec::new()),
                available: AtomicBool::new(true),
                acquisitions: AtomicUsize::new(0),
            }),
        }
    }

    /// Adds `slot` to the store, after all existing slots.
    ///
    /// Insertion order is the enumeration order of the store.
    pub fn insert(&mut self, slot: MemorySlot) {
        self.inner
            .slots
            .lock()
            .expect("memory store lock is never poisoned")
            .push(slot);
    }

    /// Marks the store as available or unavailable.
    ///
    /// An unavailable store fails to [`open`][`CredentialStore::open`], emulating a platform
    /// provider that is not running.
    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    /// Returns how often a private key acquisition has been attempted on this store.
    pub fn acquisitions(&self) -> usize {
        self.inner.acquisitions.load(Ordering::SeqCst)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("available", &self.inner.available.load(Ordering::SeqCst))
            .field("acquisitions", &self.acquisitions())
            .finish_non_exhaustive()
    }
}

impl CredentialStore for MemoryStore {
    type Session = MemorySession;

    fn open(&self) -> Result<Self::Session, Error> {
        if !self.inner.available.load(Ordering::SeqCst) {
            return Err(Error::Unavailable {
                context: "the in-memory provider is marked unavailable".into(),
            });
        }

        Ok(MemorySession {
            inner: Arc::clone(&self.inner),
        })
    }
}

/// One open session on a [`MemoryStore`].
pub struct MemorySession {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MemorySession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySession").finish_non_exhaustive()
    }
}

impl StoreSession for MemorySession {
    fn entries(&self) -> Result<Vec<CertificateEntry>, Error> {
        Ok(self
            .inner
            .slots
            .lock()
            .expect("memory store lock is never poisoned")
            .iter()
            .filter_map(|slot| {
                let entry = slot.entry();
                if entry.is_none() {
                    debug!("Skipping slot {}: no parsable certificate material", slot.alias);
                }
                entry
            })
            .collect())
    }

    fn private_key(&self, alias: &Alias) -> Result<Box<dyn PrivateKeyHandle>, Error> {
        self.inner.acquisitions.fetch_add(1, Ordering::SeqCst);

        let slots = self
            .inner
            .slots
            .lock()
            .expect("memory store lock is never poisoned");
        let slot = slots
            .iter()
            .find(|slot| &slot.alias == alias && slot.certificate.is_some())
            .ok_or_else(|| Error::NoSuchAlias(alias.clone()))?;

        match slot.authorization {
            AuthorizationOutcome::Granted => {}
            AuthorizationOutcome::Denied => {
                return Err(Error::AccessDenied {
                    alias: alias.clone(),
                });
            }
            AuthorizationOutcome::Cancelled => {
                return Err(Error::AccessCancelled {
                    alias: alias.clone(),
                });
            }
        }

        let certificate = slot
            .certificate
            .as_ref()
            .ok_or_else(|| Error::NoSuchAlias(alias.clone()))?;

        Ok(Box::new(MemoryKey {
            alias: alias.clone(),
            key: certificate.key.clone(),
        }))
    }
}

/// A private key handle of a [`MemoryStore`] slot.
struct MemoryKey {
    alias: Alias,
    key: RsaPrivateKey,
}

impl PrivateKeyHandle for MemoryKey {
    fn alias(&self) -> &Alias {
        &self.alias
    }

    fn sign(&self, algorithm: SignatureAlgorithm, payload: &[u8]) -> Result<Vec<u8>, Error> {
        let digest = algorithm.hash.digest(payload);
        let padding = match (algorithm.scheme, algorithm.hash) {
            (SignatureScheme::RsaPkcs1, HashAlgorithm::Sha1) => {
                Pkcs1v15Sign::new::<sha1::Sha1>()
            }
            (SignatureScheme::RsaPkcs1, HashAlgorithm::Sha256) => {
                Pkcs1v15Sign::new::<sha2::Sha256>()
            }
            (SignatureScheme::RsaPkcs1, HashAlgorithm::Sha384) => {
                Pkcs1v15Sign::new::<sha2::Sha384>()
            }
            (SignatureScheme::RsaPkcs1, HashAlgorithm::Sha512) => {
                Pkcs1v15Sign::new::<sha2::Sha512>()
            }
        };

        self.key.sign(padding, &digest).map_err(|e| Error::Signing {
            context: "creating a PKCS#1 v1.5 signature",
            source: Box::new(e),
        })
    }
}
