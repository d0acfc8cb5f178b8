//! Configuration file handling for `firma`.
//!
//! The configuration carries the selection markers and algorithm defaults as well as the key
//! slots that populate the software-backed credential store.
//! A platform provider (smart card middleware, OS trust store) would replace the slot list
//! entirely; it plugs in at the [`CredentialStore`] seam and needs no configuration beyond the
//! markers.
//!
//! [`CredentialStore`]: firma_pki::CredentialStore

use std::{
    fs::read_to_string,
    path::{Path, PathBuf},
};

use chrono::{DateTime, Days, Utc};
use firma_pki::{Alias, MemorySlot, MemoryStore, SelectionRule, SignatureAlgorithm, TieBreak};
use rsa::{
    RsaPrivateKey,
    pkcs1::DecodeRsaPrivateKey as _,
    pkcs8::DecodePrivateKey as _,
};
use serde::{Deserialize, Serialize};

/// The application qualifier used for the default configuration file location.
const APPLICATION: &str = "firma";

/// Errors related to configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A config loading error.
    #[error("Config loading issue: {0}")]
    Load(#[source] confy::ConfyError),

    /// A private key file could not be read.
    #[error("Unable to read private key file {path}: {source}")]
    KeyFileRead {
        /// The path of the key file.
        path: PathBuf,
        /// The source error.
        source: std::io::Error,
    },

    /// A private key file does not contain a parsable RSA private key.
    #[error("Private key file {path} contains no parsable RSA private key (PKCS#8 or PKCS#1 PEM)")]
    KeyFileParse {
        /// The path of the key file.
        path: PathBuf,
    },
}

/// One key slot backing the software credential store.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct SlotSettings {
    /// The alias of the slot.
    pub alias: Alias,

    /// The subject distinguished name of the slot's certificate.
    pub subject_name: String,

    /// The issuer distinguished name of the slot's certificate.
    pub issuer_name: String,

    /// The start of the validity interval (defaults to now).
    #[serde(default)]
    pub not_before: Option<DateTime<Utc>>,

    /// The end of the validity interval (defaults to four years from now).
    #[serde(default)]
    pub not_after: Option<DateTime<Utc>>,

    /// The path to a PEM-encoded RSA private key (PKCS#8 or PKCS#1).
    pub private_key_file: PathBuf,
}

/// The configuration of the `firma` CLI.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(default)]
pub struct Settings {
    /// A substring the issuer distinguished name of a signing certificate must contain.
    pub issuer_marker: String,

    /// A substring the subject distinguished name of a signing certificate must contain.
    pub subject_marker: String,

    /// The default hash-then-sign algorithm.
    pub algorithm: SignatureAlgorithm,

    /// The default tie-break policy.
    pub tie_break: TieBreak,

    /// The directory holding the single-slot document store.
    pub document_dir: PathBuf,

    /// The key slots backing the software credential store.
    pub slots: Vec<SlotSettings>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            issuer_marker: "RENIEC".to_string(),
            subject_marker: " FIR ".to_string(),
            algorithm: SignatureAlgorithm::default(),
            tie_break: TieBreak::default(),
            document_dir: PathBuf::from("uploads"),
            slots: Vec::new(),
        }
    }
}

impl Settings {
    /// Loads the configuration from `path` or from the default location.
    ///
    /// A missing file yields the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Load`] if an existing configuration file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, Error> {
        if let Some(path) = path {
            confy::load_path(path).map_err(Error::Load)
        } else {
            confy::load(APPLICATION, Some("config")).map_err(Error::Load)
        }
    }

    /// Returns the selection rule built from the configured markers.
    ///
    /// An explicitly provided `issuer` or `subject` marker overrides the configured one.
    pub fn selection(&self, issuer: Option<String>, subject: Option<String>) -> SelectionRule {
        SelectionRule::new()
            .issuer_contains(issuer.unwrap_or_else(|| self.issuer_marker.clone()))
            .subject_contains(subject.unwrap_or_else(|| self.subject_marker.clone()))
    }

    /// Returns the selection rule scoped to the configured issuer only.
    ///
    /// Used by status reporting, which lists all certificates of the trusted issuer, not only
    /// the signing certificate class.
    pub fn issuer_rule(&self) -> SelectionRule {
        SelectionRule::new().issuer_contains(self.issuer_marker.clone())
    }

    /// Builds the software credential store from the configured key slots.
    ///
    /// # Errors
    ///
    /// Returns an error if a private key file cannot be read ([`Error::KeyFileRead`]) or does
    /// not contain a parsable RSA private key ([`Error::KeyFileParse`]).
    pub fn to_store(&self) -> Result<MemoryStore, Error> {
        let mut store = MemoryStore::new();
        let now = Utc::now();

        for slot in &self.slots {
            let pem = read_to_string(&slot.private_key_file).map_err(|source| {
                Error::KeyFileRead {
                    path: slot.private_key_file.clone(),
                    source,
                }
            })?;
            let key = RsaPrivateKey::from_pkcs8_pem(&pem)
                .or_else(|_| RsaPrivateKey::from_pkcs1_pem(&pem))
                .map_err(|_| Error::KeyFileParse {
                    path: slot.private_key_file.clone(),
                })?;

            store.insert(
                MemorySlot::new(
                    slot.alias.clone(),
                    slot.subject_name.clone(),
                    slot.issuer_name.clone(),
                    key,
                )
                .with_validity(
                    slot.not_before.unwrap_or(now),
                    slot.not_after.unwrap_or(now + Days::new(4 * 365)),
                ),
            );
        }

        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use firma_pki::{CredentialStore as _, StoreSession as _};
    use rsa::pkcs8::EncodePrivateKey as _;
    use rstest::rstest;
    use testresult::TestResult;

    use super::*;

    #[test]
    fn default_settings_match_the_dnie_deployment() {
        let settings = Settings::default();
        assert_eq!(settings.issuer_marker, "RENIEC");
        assert_eq!(settings.subject_marker, " FIR ");
        assert_eq!(settings.algorithm.to_string(), "sha256-rsa-pkcs1");
        assert_eq!(settings.tie_break, TieBreak::FirstMatch);
    }

    #[test]
    fn settings_round_trip_through_file() -> TestResult {
        let dir = testdir::testdir!();
        let path = dir.join("config.toml");

        let settings = Settings {
            issuer_marker: "Other CA".to_string(),
            ..Default::default()
        };
        confy::store_path(&path, &settings)?;

        assert_eq!(Settings::load(Some(&path))?, settings);
        Ok(())
    }

    #[test]
    fn marker_overrides_take_precedence() {
        let settings = Settings::default();

        let rule = settings.selection(Some("Other CA".to_string()), None);
        let entry = firma_pki::CertificateEntry::new(
            "a".parse().unwrap(),
            "CN=Jane Doe FIR Signing",
            "CN=Other CA",
            Utc::now(),
            Utc::now() + Days::new(1),
        );
        assert!(rule.matches(&entry));
        assert!(!settings.selection(None, None).matches(&entry));
    }

    #[rstest]
    fn store_is_built_from_key_slots() -> TestResult {
        let dir = testdir::testdir!();
        let key_file = dir.join("sign.pem");
        let key = RsaPrivateKey::new(&mut rand::thread_rng(), 2048)?;
        std::fs::write(&key_file, key.to_pkcs8_pem(rsa::pkcs8::LineEnding::LF)?.as_bytes())?;

        let settings = Settings {
            slots: vec![SlotSettings {
                alias: "dnie-sign".parse()?,
                subject_name: "CN=Jane Doe FIR Signing".to_string(),
                issuer_name: "CN=RENIEC ECEP".to_string(),
                not_before: None,
                not_after: None,
                private_key_file: key_file,
            }],
            ..Default::default()
        };

        let store = settings.to_store()?;
        let entries = store.open()?.entries()?;
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].subject_name(), "CN=Jane Doe FIR Signing");
        Ok(())
    }

    #[test]
    fn unparsable_key_file_is_an_error() -> TestResult {
        let dir = testdir::testdir!();
        let key_file = dir.join("garbage.pem");
        std::fs::write(&key_file, "not a key")?;

        let settings = Settings {
            slots: vec![SlotSettings {
                alias: "dnie-sign".parse()?,
                subject_name: "CN=Jane Doe FIR Signing".to_string(),
                issuer_name: "CN=RENIEC ECEP".to_string(),
                not_before: None,
                not_after: None,
                private_key_file: key_file,
            }],
            ..Default::default()
        };

        assert!(matches!(
            settings.to_store(),
            Err(Error::KeyFileParse { .. })
        ));
        Ok(())
    }

    #[test]
    fn missing_key_file_is_an_error() -> TestResult {
        let settings = Settings {
            slots: vec![SlotSettings {
                alias: "dnie-sign".parse()?,
                subject_name: "CN=Jane Doe FIR Signing".to_string(),
                issuer_name: "CN=RENIEC ECEP".to_string(),
                not_before: None,
                not_after: None,
                private_key_file: PathBuf::from("/nonexistent/sign.pem"),
            }],
            ..Default::default()
        };

        assert!(matches!(settings.to_store(), Err(Error::KeyFileRead { .. })));
        Ok(())
    }
}
