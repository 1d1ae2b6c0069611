//! Certificate material as read from a store and as handed to the host.

use crate::cert::{Certificate, Fingerprint};
use rustls::sign::{CertifiedKey, SigningKey};
use std::sync::Arc;

/// Certificate chain and signer read from an identity, not yet validated.
#[derive(Clone, Debug)]
pub struct CertificateMaterial {
    /// Chain, leaf first.
    pub chain: Vec<Certificate>,
    /// Signer for the leaf's private key, if the store provided one.
    pub signer: Option<Arc<dyn SigningKey>>,
}

impl CertificateMaterial {
    /// Returns `true` if the chain is non-empty and a signer is present.
    pub fn is_valid(&self) -> bool {
        !self.chain.is_empty() && self.signer.is_some()
    }

    /// Converts into a [`ResolvedCertificate`], or `None` if the material is
    /// not valid.
    pub fn into_resolved(self) -> Option<ResolvedCertificate> {
        let signer = self.signer?;
        let leaf = self.chain.first()?.clone();
        Some(ResolvedCertificate {
            leaf,
            chain: self.chain,
            signer,
        })
    }
}

/// A certificate chain with a signer for its leaf.
///
/// Invariant: the chain is non-empty, `leaf` is its first element.
/// Cloning is cheap for the signer (shared) and copies the DER bytes.
#[derive(Clone, Debug)]
pub struct ResolvedCertificate {
    leaf: Certificate,
    chain: Vec<Certificate>,
    signer: Arc<dyn SigningKey>,
}

impl ResolvedCertificate {
    /// Returns the leaf certificate.
    pub fn leaf(&self) -> &Certificate {
        &self.leaf
    }

    /// Returns the chain, leaf first.
    pub fn chain(&self) -> &[Certificate] {
        &self.chain
    }

    /// Returns the signer for the leaf's private key.
    pub fn signer(&self) -> &Arc<dyn SigningKey> {
        &self.signer
    }

    /// Returns the cache key of this certificate.
    pub fn fingerprint(&self) -> Fingerprint {
        self.leaf.fingerprint()
    }

    /// Builds the rustls certified key for use in a server or client config.
    pub fn certified_key(&self) -> Arc<CertifiedKey> {
        let chain = self.chain.iter().map(Certificate::to_der).collect();
        Arc::new(CertifiedKey::new(chain, Arc::clone(&self.signer)))
    }
}

/// The certificate handed to the host, with its configured tags.
#[derive(Clone, Debug)]
pub struct TlsCertificate {
    /// Resolved chain and signer.
    pub certificate: ResolvedCertificate,
    /// rustls view of `certificate`.
    pub certified_key: Arc<CertifiedKey>,
    /// Tags copied from the selector configuration.
    pub tags: Vec<String>,
}

impl TlsCertificate {
    pub(crate) fn new(certificate: ResolvedCertificate, tags: Vec<String>) -> Self {
        let certified_key = certificate.certified_key();
        Self {
            certificate,
            certified_key,
            tags,
        }
    }
}
