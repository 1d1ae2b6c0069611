//! A list of selectors loaded together, as a host's certificate loader module.

use crate::cache::CertificateCache;
use crate::error::Result;
use crate::material::TlsCertificate;
use crate::selector::{CertificateSelector, Selector, SelectorError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// An error that may arise configuring a [`CertStoreLoader`].
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LoaderError {
    /// The configuration document could not be parsed.
    #[error("failed parsing certificate loader configuration")]
    Config(#[from] serde_json::Error),

    /// A selector has none of `name`, `issuer` or `pattern` set.
    #[error("certificate selector at index {index} must have either 'name' or 'issuer' set")]
    MissingCriteria {
        /// Position of the selector in `certificates`.
        index: usize,
    },

    /// A selector failed validation.
    #[error("certificate selector at index {index} is invalid")]
    InvalidSelector {
        /// Position of the selector in `certificates`.
        index: usize,
        /// Why it was rejected.
        source: SelectorError,
    },
}

/// Loads every configured certificate from the credential store.
///
/// # Examples
///
/// ```
/// use certstore_tls::store::memory::MemoryStoreProvider;
/// use certstore_tls::{CertStoreLoader, CertificateCache};
/// use std::sync::Arc;
///
/// let cache = Arc::new(CertificateCache::new(Arc::new(MemoryStoreProvider::new())));
///
/// let mut loader = CertStoreLoader::from_json(
///     r#"{ "certificates": [ { "name": "test.example.local", "location": "user" } ] }"#,
/// )
/// .unwrap();
/// loader.provision(cache).unwrap();
///
/// // nothing registered in the store yet
/// assert!(loader.load_certificates().is_err());
/// loader.cleanup();
/// ```
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CertStoreLoader {
    /// Certificates to load, in order.
    pub certificates: Vec<CertificateSelector>,

    #[serde(skip)]
    selectors: Vec<Selector>,
}

impl CertStoreLoader {
    /// Creates a loader for the given selectors.
    pub fn new(certificates: Vec<CertificateSelector>) -> Self {
        Self {
            certificates,
            selectors: Vec::new(),
        }
    }

    /// Parses a JSON loader configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError::Config`] if the document is malformed.
    pub fn from_json(json: &str) -> std::result::Result<Self, LoaderError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validates every selector and binds it to `cache`.
    ///
    /// Provisioning again replaces the previous selectors, releasing whatever
    /// they still hold.
    ///
    /// # Errors
    ///
    /// Returns [`LoaderError`] for the first invalid selector; no selector is
    /// bound in that case.
    pub fn provision(
        &mut self,
        cache: Arc<CertificateCache>,
    ) -> std::result::Result<(), LoaderError> {
        let selectors = self
            .certificates
            .iter()
            .enumerate()
            .map(|(index, config)| {
                Selector::new(config, Arc::clone(&cache)).map_err(|source| match source {
                    SelectorError::MissingCriteria => LoaderError::MissingCriteria { index },
                    source => LoaderError::InvalidSelector { index, source },
                })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;

        self.cleanup();
        self.selectors = selectors;
        Ok(())
    }

    /// Resolves every selector, in order.
    ///
    /// All or nothing: if one selector fails, the references this call took
    /// on the ones before it are released and the error is returned.
    ///
    /// # Errors
    ///
    /// Returns the first selector's [`Error`](crate::Error).
    pub fn load_certificates(&self) -> Result<Vec<TlsCertificate>> {
        let mut certificates = Vec::with_capacity(self.selectors.len());

        for (index, selector) in self.selectors.iter().enumerate() {
            match selector.resolve() {
                Ok(certificate) => certificates.push(certificate),
                Err(e) => {
                    for resolved in &self.selectors[..index] {
                        resolved.release_latest();
                    }
                    return Err(e);
                }
            }
        }

        Ok(certificates)
    }

    /// Releases every certificate the selectors hold. Safe to call any number
    /// of times.
    pub fn cleanup(&self) {
        for selector in &self.selectors {
            selector.release();
        }
    }
}
