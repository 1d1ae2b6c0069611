//! In-process credential store.
//!
//! Holds identities built from DER certificates and PKCS#8 keys. Each
//! [`StoreProvider::open`] returns a snapshot of the identities registered for
//! that location at the time of the call. The provider counts the store and
//! identity handles it has handed out and not yet seen closed.

use super::{Identity, Store, StoreError, StoreLocation, StoreProvider};
use crate::cert::errors::{CertificateError, PrivateKeyError};
use crate::cert::parsing::to_certificate_vec;
use crate::cert::{Certificate, PrivateKey};
use rustls::sign::SigningKey;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// An error that may arise building a [`MemoryIdentity`].
#[derive(Debug, thiserror::Error, PartialEq)]
#[non_exhaustive]
pub enum MemoryIdentityError {
    /// The certificate chain is empty.
    #[error("certificate chain is empty")]
    EmptyChain,

    /// The certificate chain could not be parsed.
    #[error("failed parsing certificate chain")]
    Certificate(#[from] CertificateError),

    /// The private key could not be parsed.
    #[error("failed parsing private key")]
    PrivateKey(#[from] PrivateKeyError),
}

/// A certificate chain and its private key.
#[derive(Clone, Debug)]
pub struct MemoryIdentity {
    chain: Vec<Certificate>,
    key: PrivateKey,
}

impl MemoryIdentity {
    /// Parses a concatenated DER certificate chain (leaf first) and a PKCS#8
    /// DER private key.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryIdentityError`] if either input fails to parse or the
    /// chain is empty.
    pub fn from_der(chain_der: &[u8], key_der: &[u8]) -> Result<Self, MemoryIdentityError> {
        let chain = to_certificate_vec(chain_der)?;
        let key = PrivateKey::try_from(key_der)?;
        Self::from_parts(chain, key)
    }

    /// Builds an identity from already parsed parts.
    ///
    /// # Errors
    ///
    /// Returns [`MemoryIdentityError::EmptyChain`] if `chain` is empty.
    pub fn from_parts(
        chain: Vec<Certificate>,
        key: PrivateKey,
    ) -> Result<Self, MemoryIdentityError> {
        if chain.is_empty() {
            return Err(MemoryIdentityError::EmptyChain);
        }
        Ok(Self { chain, key })
    }

    /// Returns the chain, leaf first.
    pub fn chain(&self) -> &[Certificate] {
        &self.chain
    }
}

#[derive(Debug, Default)]
struct Counters {
    opens: AtomicUsize,
    open_stores: AtomicUsize,
    open_identities: AtomicUsize,
}

/// [`StoreProvider`] over identities registered at runtime.
///
/// Clones share the same identities and counters.
#[derive(Clone, Debug, Default)]
pub struct MemoryStoreProvider {
    identities: Arc<Mutex<HashMap<StoreLocation, Vec<MemoryIdentity>>>>,
    counters: Arc<Counters>,
}

impl MemoryStoreProvider {
    /// Creates an empty provider.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an identity at `location`, after any already registered there.
    pub fn add(&self, location: StoreLocation, identity: MemoryIdentity) {
        self.identities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(location)
            .or_default()
            .push(identity);
    }

    /// Removes every identity registered at `location`.
    pub fn clear(&self, location: StoreLocation) {
        self.identities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&location);
    }

    /// Number of successful [`StoreProvider::open`] calls so far.
    pub fn opens(&self) -> usize {
        self.counters.opens.load(Ordering::Acquire)
    }

    /// Number of stores opened and not yet closed.
    pub fn open_stores(&self) -> usize {
        self.counters.open_stores.load(Ordering::Acquire)
    }

    /// Number of identities handed out and not yet closed.
    pub fn open_identities(&self) -> usize {
        self.counters.open_identities.load(Ordering::Acquire)
    }
}

impl StoreProvider for MemoryStoreProvider {
    fn open(&self, location: StoreLocation) -> Result<Box<dyn Store>, StoreError> {
        let identities = self
            .identities
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&location)
            .cloned()
            .unwrap_or_default();

        self.counters.opens.fetch_add(1, Ordering::AcqRel);
        self.counters.open_stores.fetch_add(1, Ordering::AcqRel);

        Ok(Box::new(MemoryStore {
            identities,
            counters: Arc::clone(&self.counters),
        }))
    }
}

#[derive(Debug)]
struct MemoryStore {
    identities: Vec<MemoryIdentity>,
    counters: Arc<Counters>,
}

impl Store for MemoryStore {
    fn identities(&mut self) -> Result<Vec<Box<dyn Identity>>, StoreError> {
        Ok(self
            .identities
            .iter()
            .map(|identity| {
                self.counters.open_identities.fetch_add(1, Ordering::AcqRel);
                Box::new(OpenMemoryIdentity {
                    identity: identity.clone(),
                    counters: Arc::clone(&self.counters),
                }) as Box<dyn Identity>
            })
            .collect())
    }

    fn close(self: Box<Self>) {
        self.counters.open_stores.fetch_sub(1, Ordering::AcqRel);
    }
}

#[derive(Debug)]
struct OpenMemoryIdentity {
    identity: MemoryIdentity,
    counters: Arc<Counters>,
}

impl Identity for OpenMemoryIdentity {
    fn certificate(&self) -> Result<Certificate, StoreError> {
        self.identity
            .chain
            .first()
            .cloned()
            .ok_or_else(|| StoreError::new("identity has no certificate"))
    }

    fn certificate_chain(&self) -> Result<Vec<Certificate>, StoreError> {
        Ok(self.identity.chain.clone())
    }

    fn signer(&self) -> Result<Option<Arc<dyn SigningKey>>, StoreError> {
        self.identity
            .key
            .signing_key()
            .map(Some)
            .map_err(StoreError::new)
    }

    fn close(self: Box<Self>) {
        self.counters.open_identities.fetch_sub(1, Ordering::AcqRel);
    }
}
