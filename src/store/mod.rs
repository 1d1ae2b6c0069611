//! Credential store capability consumed by the resolver.
//!
//! A platform integration (keychain, Windows certificate store, PKCS#11 ...)
//! implements [`StoreProvider`], [`Store`] and [`Identity`]. Every store and
//! identity it hands out must be closed exactly once; inside this crate they
//! are always owned through [`StoreHandle`] and [`IdentityHandle`], which
//! enforce that.
//!
//! [`memory::MemoryStoreProvider`] is a software implementation backed by DER
//! certificates and PKCS#8 keys.

use crate::cert::Certificate;
use rustls::sign::SigningKey;
use std::fmt;
use std::sync::Arc;

mod handle;
mod location;
pub mod memory;

pub use handle::{IdentityHandle, StoreHandle};
pub use location::StoreLocation;

/// Opens credential stores.
pub trait StoreProvider: fmt::Debug + Send + Sync {
    /// Opens the store at `location` read-only.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the store is absent or cannot be accessed.
    fn open(&self, location: StoreLocation) -> Result<Box<dyn Store>, StoreError>;
}

/// An open credential store.
pub trait Store: fmt::Debug + Send {
    /// Lists every identity (certificate with private key) in the store.
    ///
    /// The order is defined by the store and may differ between calls. Each
    /// returned identity is open and must be closed by the caller.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the listing fails.
    fn identities(&mut self) -> Result<Vec<Box<dyn Identity>>, StoreError>;

    /// Releases the native store.
    fn close(self: Box<Self>);
}

/// A certificate and private key pair held by a [`Store`].
pub trait Identity: fmt::Debug + Send {
    /// Returns the identity's leaf certificate.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the certificate cannot be read.
    fn certificate(&self) -> Result<Certificate, StoreError>;

    /// Returns the certificate chain, leaf first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the chain cannot be built.
    fn certificate_chain(&self) -> Result<Vec<Certificate>, StoreError>;

    /// Returns a signer backed by the identity's private key.
    ///
    /// `Ok(None)` means the store answered but exposed no usable key.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the key cannot be accessed.
    fn signer(&self) -> Result<Option<Arc<dyn SigningKey>>, StoreError>;

    /// Releases the native identity.
    fn close(self: Box<Self>);
}

/// Error reported by a credential store implementation.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct StoreError(Box<dyn std::error::Error + Send + Sync>);

impl StoreError {
    /// Wraps an implementation error or message.
    pub fn new<E>(error: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        Self(error.into())
    }
}
