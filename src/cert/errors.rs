//! Error types for certificate and private key parsing.

use x509_parser::error::X509Error;

/// An error that may arise parsing X.509 certificates.
#[derive(Debug, thiserror::Error, PartialEq)]
#[non_exhaustive]
pub enum CertificateError {
    /// Error returned by the X.509 parsing library.
    #[error("failed parsing X.509 certificate")]
    ParseX509Certificate(#[from] X509Error),

    /// The chain holds more certificates than will be processed.
    #[error("certificate chain has too many certificates (max {max})")]
    TooManyCertificates {
        /// Maximum number of certificates accepted in a chain.
        max: usize,
    },
}

/// An error that may arise decoding or loading private keys.
#[derive(Debug, thiserror::Error, PartialEq)]
#[non_exhaustive]
pub enum PrivateKeyError {
    /// Error returned by the pkcs#8 private key decoding library.
    #[error("failed decoding PKCS#8 private key")]
    DecodePkcs8(pkcs8::Error),

    /// No rustls crypto provider is installed for the process.
    #[error("rustls crypto provider is not installed")]
    NoCryptoProvider,

    /// The crypto provider could not turn the key into a signing key.
    #[error("failed loading signing key: {0}")]
    SigningKey(String),
}
