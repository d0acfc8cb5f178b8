//! A single-slot store for the document to be signed.
//!
//! The workflow only ever deals with one document at a time, so the store is a fixed file slot
//! with overwrite semantics and no versioning.
//! Input is validated for a `.pdf` suffix and non-emptiness; beyond that the document is an
//! opaque blob.

use std::{
    fs::{create_dir_all, read, write},
    io::ErrorKind,
    path::{Path, PathBuf},
};

use log::debug;

/// The file name of the fixed document slot.
pub const DOCUMENT_SLOT: &str = "documento.pdf";

/// An error that can occur when using the document store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The provided document is empty.
    #[error("The provided document is empty")]
    EmptyDocument,

    /// The provided file name does not carry a `.pdf` suffix.
    #[error("The file {filename} is not a PDF document")]
    NotAPdf {
        /// The offending file name.
        filename: String,
    },

    /// No document has been stored yet.
    #[error("No document stored at {path}")]
    NoDocument {
        /// The path of the empty slot.
        path: PathBuf,
    },

    /// An I/O error occurred.
    #[error("Document store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A store persisting one document at a fixed slot below a directory.
#[derive(Clone, Debug)]
pub struct DocumentStore {
    dir: PathBuf,
}

impl DocumentStore {
    /// Creates a new [`DocumentStore`] below `dir`.
    ///
    /// The directory is created lazily on the first store operation.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Returns the path of the document slot.
    pub fn slot(&self) -> PathBuf {
        self.dir.join(DOCUMENT_SLOT)
    }

    /// Stores `bytes` as the current document, overwriting any previous one.
    ///
    /// The original `filename` is only used for suffix validation; the document is always
    /// persisted at the fixed slot.
    ///
    /// # Errors
    ///
    /// Returns an error if
    /// * `bytes` is empty ([`Error::EmptyDocument`])
    /// * `filename` does not end in `.pdf`, compared case-insensitively ([`Error::NotAPdf`])
    /// * the document cannot be written ([`Error::Io`])
    pub fn store(&self, bytes: &[u8], filename: &str) -> Result<PathBuf, Error> {
        if bytes.is_empty() {
            return Err(Error::EmptyDocument);
        }

        if !filename.to_lowercase().ends_with(".pdf") {
            return Err(Error::NotAPdf {
                filename: filename.to_string(),
            });
        }

        create_dir_all(&self.dir)?;
        let slot = self.slot();
        write(&slot, bytes)?;
        debug!("Stored {} byte document at {}", bytes.len(), slot.display());
        Ok(slot)
    }

    /// Returns the bytes of the currently stored document.
    ///
    /// # Errors
    ///
    /// Returns an error if
    /// * no document has been stored yet ([`Error::NoDocument`])
    /// * the document cannot be read ([`Error::Io`])
    pub fn retrieve(&self) -> Result<Vec<u8>, Error> {
        let slot = self.slot();
        read(&slot).map_err(|error| {
            if error.kind() == ErrorKind::NotFound {
                Error::NoDocument { path: slot }
            } else {
                error.into()
            }
        })
    }
}

impl AsRef<Path> for DocumentStore {
    fn as_ref(&self) -> &Path {
        &self.dir
    }
}
