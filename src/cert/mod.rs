//! Certificate and PrivateKey types and functions.
//!
//! These types wrap DER-encoded bytes and validate them at construction time.

use crate::cert::errors::{CertificateError, PrivateKeyError};
use crate::cert::parsing::{parse_der_encoded_bytes_as_x509_certificate, read_certificate_info};
use pkcs8::PrivateKeyInfo;
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::sign::SigningKey;
use std::sync::Arc;
use zeroize::Zeroize;

pub mod errors;
mod fingerprint;
pub(crate) mod parsing;

pub use fingerprint::Fingerprint;

/// A single DER-encoded X.509 certificate.
///
/// Invariant: instances are always validated as parseable DER-encoded X.509.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Certificate(Vec<u8>);

impl Certificate {
    /// Returns the content of the certificate as a slice of bytes.
    pub fn content(&self) -> &[u8] {
        &self.0
    }

    /// Returns the fields of the certificate that identities can be matched on.
    ///
    /// # Errors
    ///
    /// Returns [`CertificateError`] if the subject alternative name extension is
    /// present but malformed.
    pub fn info(&self) -> Result<CertificateInfo, CertificateError> {
        let x509 = parse_der_encoded_bytes_as_x509_certificate(&self.0)?;
        read_certificate_info(&x509)
    }

    /// Returns the SHA-256 fingerprint of the DER bytes.
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::of(&self.0)
    }

    /// Returns an owned rustls view of the certificate.
    pub fn to_der(&self) -> CertificateDer<'static> {
        CertificateDer::from(self.0.clone())
    }
}

impl AsRef<[u8]> for Certificate {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for Certificate {
    type Error = CertificateError;

    fn try_from(der_bytes: &[u8]) -> Result<Self, Self::Error> {
        parse_der_encoded_bytes_as_x509_certificate(der_bytes)?;
        Ok(Self(Vec::from(der_bytes)))
    }
}

impl TryFrom<Vec<u8>> for Certificate {
    type Error = CertificateError;

    fn try_from(der_bytes: Vec<u8>) -> Result<Self, Self::Error> {
        parse_der_encoded_bytes_as_x509_certificate(&der_bytes)?;
        Ok(Self(der_bytes))
    }
}

/// Certificate fields used for identity selection.
#[derive(Debug, Clone, Default, Eq, PartialEq)]
pub struct CertificateInfo {
    /// First common name of the subject, if any.
    pub subject_common_name: Option<String>,
    /// First common name of the issuer, if any.
    pub issuer_common_name: Option<String>,
    /// Serial number as lowercase hex, leading zero octets stripped.
    pub serial: String,
    /// DNS names from the subject alternative name extension, in order.
    pub dns_names: Vec<String>,
}

/// A DER-encoded private key in PKCS#8 format.
///
/// Invariant: instances are always validated as parseable PKCS#8.
///
/// This type is zeroized on drop.
#[derive(Clone, Eq, PartialEq, Zeroize)]
#[zeroize(drop)]
pub struct PrivateKey(Vec<u8>);

impl PrivateKey {
    /// Returns the content of the private key as a slice of bytes.
    pub fn content(&self) -> &[u8] {
        &self.0
    }

    /// Loads the key into a rustls [`SigningKey`] using the process-default
    /// crypto provider, installing the crate's provider first if none is set.
    ///
    /// # Errors
    ///
    /// Returns [`PrivateKeyError::SigningKey`] if the provider rejects the key
    /// (e.g. unsupported algorithm).
    pub fn signing_key(&self) -> Result<Arc<dyn SigningKey>, PrivateKeyError> {
        crate::crypto::ensure_crypto_provider_installed();

        let provider = rustls::crypto::CryptoProvider::get_default()
            .ok_or(PrivateKeyError::NoCryptoProvider)?;

        let key_der = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(self.0.clone()));
        provider
            .key_provider
            .load_private_key(key_der)
            .map_err(|e| PrivateKeyError::SigningKey(e.to_string()))
    }
}

impl AsRef<[u8]> for PrivateKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl TryFrom<&[u8]> for PrivateKey {
    type Error = PrivateKeyError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        // validate that the bytes are a valid private key
        PrivateKeyInfo::try_from(bytes).map_err(PrivateKeyError::DecodePkcs8)?;
        Ok(Self(Vec::from(bytes)))
    }
}

impl TryFrom<Vec<u8>> for PrivateKey {
    type Error = PrivateKeyError;

    fn try_from(bytes: Vec<u8>) -> Result<Self, Self::Error> {
        // validate that the bytes are a valid private key
        PrivateKeyInfo::try_from(bytes.as_slice()).map_err(PrivateKeyError::DecodePkcs8)?;
        Ok(Self(bytes))
    }
}

impl std::fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivateKey")
            .field("len", &self.0.len())
            .finish()
    }
}
