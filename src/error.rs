//! Errors returned resolving certificates.

use crate::builder::BuildError;
use crate::matcher::MatchRule;
use crate::store::{StoreError, StoreLocation};

/// Result type used by this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors returned resolving a certificate from a credential store.
///
/// Every message names the store location that was searched.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The store could not be opened.
    #[error("failed opening {location} store")]
    StoreUnavailable {
        /// Location that was opened.
        location: StoreLocation,
        /// Error reported by the store.
        source: StoreError,
    },

    /// The store was opened but listing its identities failed.
    #[error("failed listing identities in {location} store")]
    EnumerationFailed {
        /// Location that was searched.
        location: StoreLocation,
        /// Error reported by the store.
        source: StoreError,
    },

    /// No identity in the store satisfied the rule.
    #[error("no identity found with {rule} in {location} store")]
    NoMatchingIdentity {
        /// Rule that failed to match.
        rule: MatchRule,
        /// Location that was searched.
        location: StoreLocation,
    },

    /// The matched identity could not be turned into TLS material.
    #[error("failed reading matched identity in {location} store")]
    Build {
        /// Location that was searched.
        location: StoreLocation,
        /// What could not be read.
        source: BuildError,
    },

    /// The matched identity yielded an empty chain or no signer.
    #[error("identity with {rule} in {location} store has no certificate chain or no private key")]
    InvalidResult {
        /// Rule that matched.
        rule: MatchRule,
        /// Location that was searched.
        location: StoreLocation,
    },
}
