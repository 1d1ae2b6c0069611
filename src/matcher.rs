//! Identity selection rules and the first-match search over a store listing.

use crate::cert::CertificateInfo;
use crate::store::IdentityHandle;
use log::debug;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Characters that make a configured name a regular expression.
///
/// `.` is not one of them, so dotted hostnames match literally.
const REGEX_METACHARACTERS: &[char] = &[
    '\\', '+', '*', '?', '(', ')', '|', '[', ']', '{', '}', '^', '$',
];

/// Certificate field a [`MatchRule::Pattern`] is applied to.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchField {
    /// Subject common name.
    #[default]
    Subject,
    /// Issuer common name.
    Issuer,
    /// Serial number, lowercase hex.
    Serial,
    /// First DNS subject alternative name.
    #[serde(alias = "dns")]
    DnsSan,
}

impl MatchField {
    fn value<'a>(&self, info: &'a CertificateInfo) -> Option<&'a str> {
        match self {
            MatchField::Subject => info.subject_common_name.as_deref(),
            MatchField::Issuer => info.issuer_common_name.as_deref(),
            MatchField::Serial => Some(info.serial.as_str()),
            MatchField::DnsSan => info.dns_names.first().map(String::as_str),
        }
    }
}

impl fmt::Display for MatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MatchField::Subject => "subject",
            MatchField::Issuer => "issuer",
            MatchField::Serial => "serial",
            MatchField::DnsSan => "dns_san",
        })
    }
}

/// How an identity is selected from a store.
#[derive(Clone, Debug)]
pub enum MatchRule {
    /// Subject common name equals the value.
    ExactName(String),
    /// Issuer common name equals the value.
    ExactIssuer(String),
    /// The regex matches somewhere in the given field.
    Pattern {
        /// Compiled expression.
        regex: Regex,
        /// Field the expression is applied to.
        field: MatchField,
    },
}

impl MatchRule {
    /// Builds a rule for a configured certificate name.
    ///
    /// A name containing a regex metacharacter other than `.` is compiled as a
    /// pattern against the subject common name; anything else must match the
    /// subject common name exactly.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] if the name looks like a pattern but does not
    /// compile.
    pub fn from_name(name: &str) -> Result<Self, regex::Error> {
        if looks_like_pattern(name) {
            Self::pattern(name, MatchField::Subject)
        } else {
            Ok(MatchRule::ExactName(name.to_owned()))
        }
    }

    /// Builds a pattern rule against `field`.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] if `pattern` does not compile.
    pub fn pattern(pattern: &str, field: MatchField) -> Result<Self, regex::Error> {
        Ok(MatchRule::Pattern {
            regex: Regex::new(pattern)?,
            field,
        })
    }

    /// Returns `true` if a certificate with these fields satisfies the rule.
    pub fn matches(&self, info: &CertificateInfo) -> bool {
        match self {
            MatchRule::ExactName(name) => {
                info.subject_common_name.as_deref() == Some(name.as_str())
            }
            MatchRule::ExactIssuer(issuer) => {
                info.issuer_common_name.as_deref() == Some(issuer.as_str())
            }
            MatchRule::Pattern { regex, field } => {
                field.value(info).is_some_and(|value| regex.is_match(value))
            }
        }
    }
}

impl fmt::Display for MatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchRule::ExactName(name) => write!(f, "CN '{name}'"),
            MatchRule::ExactIssuer(issuer) => write!(f, "Issuer '{issuer}'"),
            MatchRule::Pattern { regex, field } => write!(f, "{field} pattern '{regex}'"),
        }
    }
}

/// Returns `true` if `value` would be treated as a regular expression.
pub fn looks_like_pattern(value: &str) -> bool {
    value.contains(REGEX_METACHARACTERS)
}

/// Returns the first identity satisfying `rule`, in listing order.
///
/// Every other identity is closed before returning: the ones that did not
/// match, the ones whose certificate could not be read, and every identity
/// after the match. On `None` nothing is left open.
pub fn find_matching_identity(
    identities: Vec<IdentityHandle>,
    rule: &MatchRule,
) -> Option<IdentityHandle> {
    let mut found = None;

    for identity in identities {
        if found.is_some() {
            identity.close();
            continue;
        }

        let Some(info) = read_info(&identity) else {
            identity.close();
            continue;
        };

        if rule.matches(&info) {
            found = Some(identity);
        } else {
            identity.close();
        }
    }

    found
}

fn read_info(identity: &IdentityHandle) -> Option<CertificateInfo> {
    let cert = match identity.certificate() {
        Ok(cert) => cert,
        Err(e) => {
            debug!("skipping identity with unreadable certificate: {e}");
            return None;
        }
    };

    match cert.info() {
        Ok(info) => Some(info),
        Err(e) => {
            debug!("skipping identity with unparseable certificate: {e}");
            None
        }
    }
}
