//! Reading TLS material out of a matched identity.

use crate::material::CertificateMaterial;
use crate::store::{IdentityHandle, StoreError};

/// An error that may arise reading TLS material from a matched identity.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum BuildError {
    /// The identity's certificate chain could not be read.
    #[error("failed reading certificate chain")]
    ChainUnavailable(#[source] StoreError),

    /// The identity's signer could not be read.
    #[error("failed reading private key signer")]
    SignerUnavailable(#[source] StoreError),
}

/// Reads the chain and signer of `identity`.
///
/// The identity is left open whatever the outcome; closing it is the caller's
/// job. The result is not validated, see [`CertificateMaterial::is_valid`].
///
/// # Errors
///
/// Returns [`BuildError::ChainUnavailable`] or [`BuildError::SignerUnavailable`].
pub fn build_certificate(identity: &IdentityHandle) -> Result<CertificateMaterial, BuildError> {
    let chain = identity
        .certificate_chain()
        .map_err(BuildError::ChainUnavailable)?;

    let signer = identity.signer().map_err(BuildError::SignerUnavailable)?;

    Ok(CertificateMaterial { chain, signer })
}
