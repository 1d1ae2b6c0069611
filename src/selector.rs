//! Host-facing certificate selectors.
//!
//! [`CertificateSelector`] is the configuration a host deserializes;
//! [`Selector`] is its validated, runtime form bound to a
//! [`CertificateCache`].

use crate::cache::CertificateCache;
use crate::cert::Fingerprint;
use crate::error::Result;
use crate::matcher::{MatchField, MatchRule};
use crate::material::TlsCertificate;
use crate::store::StoreLocation;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Which certificate to load and from where.
///
/// Criteria are checked in order `pattern`, `issuer`, `name`; the first one
/// set decides the rule. Empty strings count as unset.
///
/// # Examples
///
/// ```
/// use certstore_tls::CertificateSelector;
///
/// let selector: CertificateSelector = serde_json::from_str(
///     r#"{ "name": "test.example.local", "location": "user", "tags": ["internal"] }"#,
/// )
/// .unwrap();
///
/// assert_eq!(selector.rule().unwrap().to_string(), "CN 'test.example.local'");
/// ```
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CertificateSelector {
    /// Subject common name. Treated as a regular expression if it contains a
    /// regex metacharacter other than `.`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Exact issuer common name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,

    /// Regular expression applied to `field`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Field `pattern` is applied to. Defaults to the subject common name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<MatchField>,

    /// Store location: `user`, `system` or `machine`. Anything else, or
    /// nothing, selects the system store.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,

    /// Arbitrary values passed through to the host with the certificate.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

/// An error that may arise validating a [`CertificateSelector`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum SelectorError {
    /// None of `name`, `issuer` or `pattern` is set.
    #[error("certificate selector must have either 'name' or 'issuer' set")]
    MissingCriteria,

    /// `name` or `pattern` is not a valid regular expression.
    #[error("invalid certificate pattern '{pattern}'")]
    InvalidPattern {
        /// The rejected expression.
        pattern: String,
        /// Error from the regex compiler.
        source: regex::Error,
    },
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

impl CertificateSelector {
    /// Compiles the configured criteria into a [`MatchRule`].
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError::MissingCriteria`] if no criterion is set, or
    /// [`SelectorError::InvalidPattern`] if a pattern does not compile.
    pub fn rule(&self) -> std::result::Result<MatchRule, SelectorError> {
        let invalid = |pattern: &str| {
            let pattern = pattern.to_owned();
            move |source| SelectorError::InvalidPattern { pattern, source }
        };

        if let Some(pattern) = non_empty(&self.pattern) {
            let field = self.field.unwrap_or_default();
            return MatchRule::pattern(pattern, field).map_err(invalid(pattern));
        }
        if let Some(issuer) = non_empty(&self.issuer) {
            return Ok(MatchRule::ExactIssuer(issuer.to_owned()));
        }
        if let Some(name) = non_empty(&self.name) {
            return MatchRule::from_name(name).map_err(invalid(name));
        }
        Err(SelectorError::MissingCriteria)
    }

    /// Returns the configured store location.
    pub fn store_location(&self) -> StoreLocation {
        StoreLocation::parse(self.location.as_deref().unwrap_or_default())
    }
}

/// A validated selector bound to a cache.
///
/// Each successful [`resolve`](Self::resolve) takes one cache reference;
/// [`release`](Self::release) gives back all of them. Dropping the selector
/// releases as well.
#[derive(Debug)]
pub struct Selector {
    rule: MatchRule,
    location: StoreLocation,
    tags: Vec<String>,
    cache: Arc<CertificateCache>,
    held: Mutex<Vec<Fingerprint>>,
}

impl Selector {
    /// Validates `config` and binds it to `cache`.
    ///
    /// # Errors
    ///
    /// Returns [`SelectorError`] if the configuration is invalid.
    pub fn new(
        config: &CertificateSelector,
        cache: Arc<CertificateCache>,
    ) -> std::result::Result<Self, SelectorError> {
        Ok(Self {
            rule: config.rule()?,
            location: config.store_location(),
            tags: config.tags.clone(),
            cache,
            held: Mutex::new(Vec::new()),
        })
    }

    fn held(&self) -> MutexGuard<'_, Vec<Fingerprint>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the rule used to pick an identity.
    pub fn rule(&self) -> &MatchRule {
        &self.rule
    }

    /// Returns the store location searched.
    pub fn location(&self) -> StoreLocation {
        self.location
    }

    /// Returns the configured tags.
    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Fingerprint of the most recently resolved certificate still held.
    pub fn fingerprint(&self) -> Option<Fingerprint> {
        self.held().last().copied()
    }

    /// Number of cache references this selector holds.
    pub fn references(&self) -> usize {
        self.held().len()
    }

    /// Loads the certificate through the cache.
    ///
    /// # Errors
    ///
    /// Returns the [`Error`](crate::Error) of the store pass; no reference is
    /// taken in that case.
    pub fn resolve(&self) -> Result<TlsCertificate> {
        let (certificate, fingerprint) = self.cache.get_or_load(self.location, &self.rule)?;
        self.held().push(fingerprint);
        Ok(TlsCertificate::new(certificate, self.tags.clone()))
    }

    /// Gives back every cache reference taken by [`resolve`](Self::resolve).
    ///
    /// Calling it again, or without a prior successful resolve, does nothing.
    pub fn release(&self) {
        let held = std::mem::take(&mut *self.held());
        for fingerprint in &held {
            self.cache.release(fingerprint);
        }
    }

    /// Gives back only the reference taken by the latest resolve.
    pub(crate) fn release_latest(&self) {
        let latest = self.held().pop();
        if let Some(fingerprint) = latest {
            self.cache.release(&fingerprint);
        }
    }
}

impl Drop for Selector {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selector(json: &str) -> CertificateSelector {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn deserializes_every_field() {
        let s = selector(
            r#"{
                "name": "n", "issuer": "i", "pattern": "^p", "field": "dns_san",
                "location": "USER", "tags": ["a", "b"]
            }"#,
        );

        assert_eq!(s.name.as_deref(), Some("n"));
        assert_eq!(s.issuer.as_deref(), Some("i"));
        assert_eq!(s.pattern.as_deref(), Some("^p"));
        assert_eq!(s.field, Some(MatchField::DnsSan));
        assert_eq!(s.store_location(), StoreLocation::User);
        assert_eq!(s.tags, vec!["a".to_owned(), "b".to_owned()]);
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(serde_json::from_str::<CertificateSelector>(r#"{"nmae": "x"}"#).is_err());
    }

    #[test]
    fn pattern_wins_over_issuer_and_name() {
        let rule = selector(r#"{"name": "n", "issuer": "i", "pattern": "^p", "field": "serial"}"#)
            .rule()
            .unwrap();
        assert!(matches!(
            rule,
            MatchRule::Pattern {
                field: MatchField::Serial,
                ..
            }
        ));
    }

    #[test]
    fn issuer_wins_over_name() {
        let rule = selector(r#"{"name": "n", "issuer": "Test CA"}"#).rule().unwrap();
        assert!(matches!(rule, MatchRule::ExactIssuer(ref i) if i == "Test CA"));
    }

    #[test]
    fn name_uses_literal_or_pattern() {
        assert!(matches!(
            selector(r#"{"name": "test.example.com"}"#).rule().unwrap(),
            MatchRule::ExactName(_)
        ));
        assert!(matches!(
            selector(r#"{"name": "^test\\..*$"}"#).rule().unwrap(),
            MatchRule::Pattern {
                field: MatchField::Subject,
                ..
            }
        ));
    }

    #[test]
    fn missing_criteria() {
        let err = selector(r#"{"location": "system", "name": ""}"#)
            .rule()
            .unwrap_err();
        assert!(matches!(err, SelectorError::MissingCriteria));
    }

    #[test]
    fn invalid_pattern_names_the_pattern() {
        let err = selector(r#"{"pattern": "(unclosed"}"#).rule().unwrap_err();
        assert!(err.to_string().contains("(unclosed"));
    }

    #[test]
    fn location_defaults_to_system() {
        assert_eq!(selector("{}").store_location(), StoreLocation::System);
        assert_eq!(
            selector(r#"{"location": "nowhere"}"#).store_location(),
            StoreLocation::System
        );
    }
}
