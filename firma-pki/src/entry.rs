use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An error that can occur when dealing with certificate entries.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An alias is empty or contains control characters.
    #[error("Invalid alias: {alias:?}")]
    InvalidAlias {
        /// The string representing an invalid [`Alias`].
        alias: String,
    },
}

/// A store-assigned identifier for one slot in a credential store.
///
/// An [`Alias`] is unique within one store session but not guaranteed to be stable across
/// sessions.
/// It must be non-empty and free of control characters, but is otherwise opaque to this crate.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(into = "String", try_from = "String")]
pub struct Alias(String);

impl Alias {
    /// Constructs a new [`Alias`] from a `String`.
    ///
    /// # Errors
    ///
    /// Returns an error if
    /// * the string is empty
    /// * the string contains control characters
    ///
    /// # Examples
    ///
    /// ```
    /// use firma_pki::Alias;
    ///
    /// assert!(Alias::new("dnie-0".into()).is_ok());
    /// assert!(Alias::new("CertificadoDeFirma".into()).is_ok());
    ///
    /// // the alias must be non-empty and printable
    /// assert!(Alias::new("".into()).is_err());
    /// assert!(Alias::new("slot\n0".into()).is_err());
    /// ```
    pub fn new(alias: String) -> Result<Self, Error> {
        if alias.is_empty() || alias.chars().any(char::is_control) {
            return Err(Error::InvalidAlias { alias });
        }

        Ok(Self(alias))
    }
}

impl AsRef<str> for Alias {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Alias {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl From<Alias> for String {
    fn from(value: Alias) -> Self {
        value.0
    }
}

impl FromStr for Alias {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.into())
    }
}

impl TryFrom<&str> for Alias {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::from_str(value)
    }
}

impl TryFrom<String> for Alias {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// A read-only snapshot of one certificate slot in a credential store.
///
/// A [`CertificateEntry`] is produced by one enumeration call on a [`StoreSession`] and is
/// discarded after the signing operation completes or fails.
/// The validity interval is taken verbatim from the certificate; `not_before <= not_after` is
/// enforced by the issuing CA and not re-validated here.
///
/// [`StoreSession`]: crate::store::StoreSession
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CertificateEntry {
    alias: Alias,
    subject_name: String,
    issuer_name: String,
    not_before: DateTime<Utc>,
    not_after: DateTime<Utc>,
}

impl CertificateEntry {
    /// Creates a new [`CertificateEntry`].
    pub fn new(
        alias: Alias,
        subject_name: impl Into<String>,
        issuer_name: impl Into<String>,
        not_before: DateTime<Utc>,
        not_after: DateTime<Utc>,
    ) -> Self {
        Self {
            alias,
            subject_name: subject_name.into(),
            issuer_name: issuer_name.into(),
            not_before,
            not_after,
        }
    }

    /// Returns the store-assigned alias of the entry.
    pub fn alias(&self) -> &Alias {
        &self.alias
    }

    /// Returns the distinguished name of the certificate holder.
    pub fn subject_name(&self) -> &str {
        &self.subject_name
    }

    /// Returns the distinguished name of the issuing authority.
    pub fn issuer_name(&self) -> &str {
        &self.issuer_name
    }

    /// Returns the start of the validity interval.
    pub fn not_before(&self) -> DateTime<Utc> {
        self.not_before
    }

    /// Returns the end of the validity interval.
    pub fn not_after(&self) -> DateTime<Utc> {
        self.not_after
    }
}

impl Display for CertificateEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} (subject: {}; issuer: {}; valid: {} - {})",
            self.alias, self.subject_name, self.issuer_name, self.not_before, self.not_after
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use testresult::TestResult;

    use super::*;

    #[rstest]
    #[case("dnie-0", true)]
    #[case("CertificadoDeFirma", true)]
    #[case("0", true)]
    #[case("", false)]
    #[case("slot\n0", false)]
    #[case("slot\t0", false)]
    fn alias_validation(#[case] input: &str, #[case] valid: bool) {
        assert_eq!(Alias::new(input.into()).is_ok(), valid);
    }

    #[test]
    fn alias_string_round_trip() -> TestResult {
        let alias: Alias = "dnie-0".parse()?;
        assert_eq!(String::from(alias.clone()), "dnie-0");
        assert_eq!(alias.to_string(), "dnie-0");
        assert_eq!(alias.as_ref(), "dnie-0");
        Ok(())
    }
}
