//! One pass over a credential store: open, list, match, build.
//!
//! Whatever the outcome, nothing opened here is left dangling: on error every
//! store and identity handle is closed before returning, on success the two
//! handles still open are moved into the returned [`LoadedIdentity`].

use crate::builder::build_certificate;
use crate::error::{Error, Result};
use crate::matcher::{find_matching_identity, MatchRule};
use crate::material::ResolvedCertificate;
use crate::store::{IdentityHandle, StoreHandle, StoreLocation, StoreProvider};

/// A resolved certificate and the open handles it was read from.
#[derive(Debug)]
pub struct LoadedIdentity {
    /// Validated chain and signer.
    pub certificate: ResolvedCertificate,
    /// Store the identity came from.
    pub store: StoreHandle,
    /// Matched identity.
    pub identity: IdentityHandle,
}

impl LoadedIdentity {
    /// Closes the identity, then the store.
    pub fn close(self) {
        self.identity.close();
        self.store.close();
    }
}

/// Finds the first identity at `location` satisfying `rule` and reads its
/// certificate chain and signer.
///
/// # Errors
///
/// - [`Error::StoreUnavailable`] if the store cannot be opened.
/// - [`Error::EnumerationFailed`] if its identities cannot be listed.
/// - [`Error::NoMatchingIdentity`] if no identity satisfies `rule`.
/// - [`Error::Build`] if the chain or signer of the match cannot be read.
/// - [`Error::InvalidResult`] if the match has an empty chain or no signer.
pub fn resolve(
    provider: &dyn StoreProvider,
    location: StoreLocation,
    rule: &MatchRule,
) -> Result<LoadedIdentity> {
    let store = provider
        .open(location)
        .map_err(|source| Error::StoreUnavailable { location, source })?;
    let mut store = StoreHandle::new(store, location);

    let identities = match store.identities() {
        Ok(identities) => identities,
        Err(source) => {
            store.close();
            return Err(Error::EnumerationFailed { location, source });
        }
    };

    let Some(identity) = find_matching_identity(identities, rule) else {
        store.close();
        return Err(Error::NoMatchingIdentity {
            rule: rule.clone(),
            location,
        });
    };

    let material = match build_certificate(&identity) {
        Ok(material) => material,
        Err(source) => {
            identity.close();
            store.close();
            return Err(Error::Build { location, source });
        }
    };

    let Some(certificate) = material.into_resolved() else {
        identity.close();
        store.close();
        return Err(Error::InvalidResult {
            rule: rule.clone(),
            location,
        });
    };

    Ok(LoadedIdentity {
        certificate,
        store,
        identity,
    })
}
