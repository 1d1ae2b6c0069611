//! Reference-counted certificate cache keyed by leaf fingerprint.
//!
//! Several selectors can end up pointing at the same identity (one by name,
//! another by pattern, a third by issuer). The cache keeps a single open
//! store/identity pair per leaf certificate and hands every caller a copy of
//! the resolved certificate. The pair is closed when the last reference is
//! released.
//!
//! Store I/O never runs under the table lock. Two callers resolving the same
//! certificate concurrently may both do a full store pass; whichever inserts
//! second closes its own handles and takes a reference on the first one's
//! entry.

use crate::cert::Fingerprint;
use crate::error::Result;
use crate::matcher::MatchRule;
use crate::material::ResolvedCertificate;
use crate::session::{self, LoadedIdentity};
use crate::store::{IdentityHandle, StoreHandle, StoreLocation, StoreProvider};
use log::debug;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct CacheEntry {
    certificate: ResolvedCertificate,
    store: StoreHandle,
    identity: IdentityHandle,
    ref_count: usize,
}

/// Process-wide table of resolved certificates and the store handles backing
/// them.
///
/// Create one per process and share it (`Arc<CertificateCache>`) with every
/// [`Selector`](crate::Selector).
#[derive(Debug)]
pub struct CertificateCache {
    provider: Arc<dyn StoreProvider>,
    entries: Mutex<HashMap<Fingerprint, CacheEntry>>,
}

impl CertificateCache {
    /// Creates an empty cache opening stores through `provider`.
    pub fn new(provider: Arc<dyn StoreProvider>) -> Self {
        Self {
            provider,
            entries: Mutex::new(HashMap::new()),
        }
    }

    // Every mutation leaves the table consistent, so a panic elsewhere while
    // the lock was held does not invalidate it.
    fn entries(&self) -> MutexGuard<'_, HashMap<Fingerprint, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Resolves `rule` at `location` and takes one reference on the result.
    ///
    /// Every successful call must be paired with one [`release`](Self::release)
    /// of the returned fingerprint.
    ///
    /// # Errors
    ///
    /// Returns the [`Error`](crate::Error) of the store pass. A failed call
    /// does not change the cache.
    pub fn get_or_load(
        &self,
        location: StoreLocation,
        rule: &MatchRule,
    ) -> Result<(ResolvedCertificate, Fingerprint)> {
        let LoadedIdentity {
            certificate,
            store,
            identity,
        } = session::resolve(self.provider.as_ref(), location, rule)?;

        let fingerprint = certificate.fingerprint();

        let mut entries = self.entries();
        if let Some(entry) = entries.get_mut(&fingerprint) {
            entry.ref_count += 1;
            let cached = entry.certificate.clone();
            let ref_count = entry.ref_count;
            drop(entries);

            identity.close();
            store.close();

            debug!(
                "reusing cached certificate: cache_key={}, ref_count={}",
                fingerprint.short(),
                ref_count
            );
            return Ok((cached, fingerprint));
        }

        entries.insert(
            fingerprint,
            CacheEntry {
                certificate: certificate.clone(),
                store,
                identity,
                ref_count: 1,
            },
        );
        drop(entries);

        debug!(
            "cached new certificate: cache_key={}, rule={}, location={}",
            fingerprint.short(),
            rule,
            location
        );
        Ok((certificate, fingerprint))
    }

    /// Gives back one reference on `fingerprint`.
    ///
    /// When the last reference goes, the identity and then the store are
    /// closed and the entry is removed, under the table lock. Releasing an
    /// unknown fingerprint does nothing.
    pub fn release(&self, fingerprint: &Fingerprint) {
        let mut entries = self.entries();

        let Some(entry) = entries.get_mut(fingerprint) else {
            return;
        };

        entry.ref_count = entry.ref_count.saturating_sub(1);
        if entry.ref_count > 0 {
            debug!(
                "released cached certificate: cache_key={}, ref_count={}",
                fingerprint.short(),
                entry.ref_count
            );
            return;
        }

        if let Some(entry) = entries.remove(fingerprint) {
            entry.identity.close();
            entry.store.close();
            debug!(
                "evicted cached certificate: cache_key={}",
                fingerprint.short()
            );
        }
    }

    /// Number of cached certificates.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    /// Returns `true` if nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    /// Returns `true` if `fingerprint` is cached.
    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.entries().contains_key(fingerprint)
    }

    /// Current reference count of `fingerprint`, or `None` if it is not cached.
    pub fn ref_count(&self, fingerprint: &Fingerprint) -> Option<usize> {
        self.entries().get(fingerprint).map(|entry| entry.ref_count)
    }
}
