#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(missing_debug_implementations)]

//! Loads TLS certificates from OS-native credential stores (macOS keychain,
//! Windows certificate store, ...) for a host TLS runtime.
//!
//! A [`Selector`] describes one certificate: an exact subject or issuer common
//! name, or a regular expression over the subject, issuer, serial number or
//! first DNS name. Resolving it opens the store, picks the first matching
//! identity, and returns its chain with a signer for the private key as a
//! [`rustls::sign::CertifiedKey`].
//!
//! Resolved certificates live in a shared [`CertificateCache`] keyed by the
//! leaf's SHA-256 fingerprint: selectors that land on the same certificate
//! share one open store/identity pair, closed when the last of them releases
//! it.
//!
//! The platform store is reached through the traits in [`store`]; the crate
//! ships an in-memory implementation in [`store::memory`].
//!
//! # Examples
//!
//! ```no_run
//! use certstore_tls::store::memory::{MemoryIdentity, MemoryStoreProvider};
//! use certstore_tls::store::StoreLocation;
//! use certstore_tls::{CertificateCache, CertificateSelector, Selector};
//! use std::sync::Arc;
//!
//! # fn example(chain_der: &[u8], key_der: &[u8]) -> Result<(), Box<dyn std::error::Error>> {
//! let provider = MemoryStoreProvider::new();
//! provider.add(StoreLocation::User, MemoryIdentity::from_der(chain_der, key_der)?);
//!
//! let cache = Arc::new(CertificateCache::new(Arc::new(provider)));
//!
//! let config = CertificateSelector {
//!     name: Some("test.example.local".into()),
//!     location: Some("user".into()),
//!     ..Default::default()
//! };
//! let selector = Selector::new(&config, Arc::clone(&cache))?;
//!
//! let certificate = selector.resolve()?;
//! let certified_key = certificate.certified_key;
//!
//! // host teardown
//! selector.release();
//! assert!(cache.is_empty());
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature flags
//!
//! Exactly **one** `rustls` crypto provider must be enabled, used to load
//! software private keys:
//!
//! * `ring` (default)
//! * `aws-lc-rs`

#[cfg(all(feature = "ring", feature = "aws-lc-rs"))]
compile_error!("Enable only one crypto provider feature: `ring` or `aws-lc-rs`.");

#[cfg(not(any(feature = "ring", feature = "aws-lc-rs")))]
compile_error!("Enable one crypto provider feature: `ring` (default) or `aws-lc-rs`.");

pub mod builder;
pub mod cache;
pub mod cert;
pub mod error;
pub mod loader;
pub mod matcher;
pub mod material;
pub mod selector;
pub mod session;
pub mod store;

mod crypto;

pub use builder::{build_certificate, BuildError};
pub use cache::CertificateCache;
pub use cert::{Certificate, CertificateInfo, Fingerprint, PrivateKey};
pub use error::{Error, Result};
pub use loader::{CertStoreLoader, LoaderError};
pub use matcher::{find_matching_identity, MatchField, MatchRule};
pub use material::{CertificateMaterial, ResolvedCertificate, TlsCertificate};
pub use selector::{CertificateSelector, Selector, SelectorError};
pub use session::LoadedIdentity;
pub use store::{
    Identity, IdentityHandle, Store, StoreError, StoreHandle, StoreLocation, StoreProvider,
};
