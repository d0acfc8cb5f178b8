//! Pure selection logic for certificate entries.
//!
//! Credential stores hold a mix of certificates and a single holder commonly has several of
//! different purposes in the same store, e.g. an authentication and a signing certificate on a
//! DNIe.
//! A [`SelectionRule`] narrows an enumeration snapshot down by substring predicates over the
//! distinguished names of each entry and a [`TieBreak`] policy decides which entry wins when more
//! than one matches.
//!
//! Substring matching over distinguished names is knowingly coarse.
//! It is kept as the selection mechanism because it is what qualified-certificate deployments in
//! the field key on (issuer organization markers, role tokens such as `" FIR "` in the subject),
//! but the rule is a plain data value so that a stronger mechanism can replace it without
//! touching the signing workflow.

use std::fmt::Display;

use serde::{Deserialize, Serialize};

use crate::entry::{Alias, CertificateEntry};

/// An error that can occur when selecting a certificate entry.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No entry satisfied the selection rule.
    ///
    /// This is distinct from the store being unavailable, so that callers can tell "nothing to
    /// sign with" from "system broken".
    #[error("No certificate matches the selection rule ({rule})")]
    NoMatch {
        /// The rule that no entry satisfied.
        rule: SelectionRule,
    },

    /// More than one entry satisfied the selection rule under [`TieBreak::RequireUnique`].
    #[error("The selection rule matches more than one certificate: {}", aliases.iter().map(ToString::to_string).collect::<Vec<_>>().join(", "))]
    Ambiguous {
        /// The aliases of all matching entries.
        aliases: Vec<Alias>,
    },
}

/// A conjunction of substring predicates over the distinguished names of a certificate entry.
///
/// All predicates are case-sensitive.
/// An empty rule matches every entry.
///
/// # Examples
///
/// ```
/// use firma_pki::SelectionRule;
///
/// // scope to a trusted national issuer and the signing certificate class
/// let rule = SelectionRule::new()
///     .issuer_contains("RENIEC")
///     .subject_contains(" FIR ");
/// ```
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct SelectionRule {
    /// Substrings that must all occur in the issuer distinguished name.
    #[serde(default)]
    issuer_substrings: Vec<String>,

    /// Substrings that must all occur in the subject distinguished name.
    #[serde(default)]
    subject_substrings: Vec<String>,
}

impl SelectionRule {
    /// Creates a new, empty [`SelectionRule`] that matches every entry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a predicate requiring `marker` to occur in the issuer distinguished name.
    pub fn issuer_contains(mut self, marker: impl Into<String>) -> Self {
        self.issuer_substrings.push(marker.into());
        self
    }

    /// Adds a predicate requiring `marker` to occur in the subject distinguished name.
    ///
    /// This is used to tell apart certificate classes of one holder, e.g. a role marker
    /// denoting the signing (as opposed to the authentication) certificate.
    pub fn subject_contains(mut self, marker: impl Into<String>) -> Self {
        self.subject_substrings.push(marker.into());
        self
    }

    /// Returns whether `entry` satisfies all predicates of this rule.
    pub fn matches(&self, entry: &CertificateEntry) -> bool {
        self.issuer_substrings
            .iter()
            .all(|marker| entry.issuer_name().contains(marker))
            && self
                .subject_substrings
                .iter()
                .all(|marker| entry.subject_name().contains(marker))
    }
}

impl Display for SelectionRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "issuer contains {:?}, subject contains {:?}",
            self.issuer_substrings, self.subject_substrings
        )
    }
}

/// The policy deciding which entry wins when more than one matches a [`SelectionRule`].
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    Deserialize,
    Eq,
    PartialEq,
    Serialize,
    strum::Display,
    strum::EnumIter,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum TieBreak {
    /// The first match in enumeration order wins.
    ///
    /// Enumeration order is provider-defined, so this policy is only deterministic for a fixed
    /// store session.
    /// It is the default because it matches the behavior qualified-certificate deployments
    /// commonly rely on.
    #[default]
    FirstMatch,

    /// The match with the latest `not_before` wins.
    ///
    /// Ties on `not_before` fall back to enumeration order.
    LatestNotBefore,

    /// Exactly one entry must match; more than one is an [`Error::Ambiguous`].
    RequireUnique,
}

/// Selects one certificate entry from an enumeration snapshot.
///
/// The function is pure: it is deterministic for fixed inputs and has no side effects.
/// Entries that do not match `rule` never influence the result.
///
/// # Errors
///
/// Returns an error if
/// * no entry matches `rule` ([`Error::NoMatch`])
/// * more than one entry matches under [`TieBreak::RequireUnique`] ([`Error::Ambiguous`])
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use firma_pki::{CertificateEntry, SelectionRule, TieBreak, select};
///
/// # fn main() -> testresult::TestResult {
/// let entries = [
///     CertificateEntry::new(
///         "auth".parse()?,
///         "CN=Jane Doe AUT Authentication",
///         "CN=RENIEC ECEP",
///         Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
///         Utc.with_ymd_and_hms(2028, 1, 1, 0, 0, 0).unwrap(),
///     ),
///     CertificateEntry::new(
///         "sign".parse()?,
///         "CN=Jane Doe FIR Signing",
///         "CN=RENIEC ECEP",
///         Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
///         Utc.with_ymd_and_hms(2028, 1, 1, 0, 0, 0).unwrap(),
///     ),
/// ];
///
/// let rule = SelectionRule::new().subject_contains(" FIR ");
/// let selected = select(&entries, &rule, TieBreak::FirstMatch)?;
/// assert_eq!(selected.alias().as_ref(), "sign");
/// # Ok(())
/// # }
/// ```
pub fn select<'a>(
    entries: &'a [CertificateEntry],
    rule: &SelectionRule,
    tie_break: TieBreak,
) -> Result<&'a CertificateEntry, Error> {
    let matches: Vec<&CertificateEntry> = entries.iter().filter(|entry| rule.matches(entry)).collect();

    match tie_break {
        TieBreak::FirstMatch => matches.first().copied(),
        TieBreak::LatestNotBefore => matches
            .iter()
            .copied()
            // max_by_key returns the last maximum, rev() makes earlier entries win ties
            .rev()
            .max_by_key(|entry| entry.not_before()),
        TieBreak::RequireUnique => {
            if matches.len() > 1 {
                return Err(Error::Ambiguous {
                    aliases: matches.iter().map(|entry| entry.alias().clone()).collect(),
                });
            }
            matches.first().copied()
        }
    }
    .ok_or_else(|| Error::NoMatch { rule: rule.clone() })
}
