use super::{Identity, Store, StoreError, StoreLocation};
use crate::cert::Certificate;
use log::warn;
use rustls::sign::SigningKey;
use std::sync::Arc;

/// Sole owner of an open [`Store`].
///
/// [`StoreHandle::close`] consumes the handle, so a store can only be closed
/// once. A handle dropped without being closed closes the store from `Drop`.
#[derive(Debug)]
pub struct StoreHandle {
    inner: Option<Box<dyn Store>>,
    location: StoreLocation,
}

impl StoreHandle {
    /// Takes ownership of an open store.
    pub fn new(store: Box<dyn Store>, location: StoreLocation) -> Self {
        Self {
            inner: Some(store),
            location,
        }
    }

    /// Returns the location the store was opened at.
    pub fn location(&self) -> StoreLocation {
        self.location
    }

    /// Lists the store's identities, each wrapped in its own handle.
    ///
    /// # Errors
    ///
    /// Returns the store's [`StoreError`] if the listing fails.
    pub fn identities(&mut self) -> Result<Vec<IdentityHandle>, StoreError> {
        let store = self
            .inner
            .as_mut()
            .ok_or_else(|| StoreError::new("store handle is closed"))?;

        Ok(store
            .identities()?
            .into_iter()
            .map(IdentityHandle::new)
            .collect())
    }

    /// Closes the store.
    pub fn close(mut self) {
        if let Some(store) = self.inner.take() {
            store.close();
        }
    }
}

impl Drop for StoreHandle {
    fn drop(&mut self) {
        if let Some(store) = self.inner.take() {
            warn!("{} store handle dropped without close; closing", self.location);
            store.close();
        }
    }
}

/// Sole owner of an open [`Identity`].
///
/// Same contract as [`StoreHandle`]: closed exactly once, by
/// [`IdentityHandle::close`] or, failing that, by `Drop`.
#[derive(Debug)]
pub struct IdentityHandle {
    inner: Option<Box<dyn Identity>>,
}

impl IdentityHandle {
    /// Takes ownership of an open identity.
    pub fn new(identity: Box<dyn Identity>) -> Self {
        Self {
            inner: Some(identity),
        }
    }

    fn identity(&self) -> Result<&dyn Identity, StoreError> {
        self.inner
            .as_deref()
            .ok_or_else(|| StoreError::new("identity handle is closed"))
    }

    /// See [`Identity::certificate`].
    ///
    /// # Errors
    ///
    /// Propagates the identity's [`StoreError`].
    pub fn certificate(&self) -> Result<Certificate, StoreError> {
        self.identity()?.certificate()
    }

    /// See [`Identity::certificate_chain`].
    ///
    /// # Errors
    ///
    /// Propagates the identity's [`StoreError`].
    pub fn certificate_chain(&self) -> Result<Vec<Certificate>, StoreError> {
        self.identity()?.certificate_chain()
    }

    /// See [`Identity::signer`].
    ///
    /// # Errors
    ///
    /// Propagates the identity's [`StoreError`].
    pub fn signer(&self) -> Result<Option<Arc<dyn SigningKey>>, StoreError> {
        self.identity()?.signer()
    }

    /// Closes the identity.
    pub fn close(mut self) {
        if let Some(identity) = self.inner.take() {
            identity.close();
        }
    }
}

impl Drop for IdentityHandle {
    fn drop(&mut self) {
        if let Some(identity) = self.inner.take() {
            warn!("identity handle dropped without close; closing");
            identity.close();
        }
    }
}
