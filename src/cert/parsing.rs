use crate::cert::errors::CertificateError;
use crate::cert::{Certificate, CertificateInfo};
use x509_parser::certificate::X509Certificate;
use x509_parser::error::X509Error;
use x509_parser::extensions::GeneralName;
use x509_parser::nom::Err;
use x509_parser::x509::X509Name;

/// Maximum number of certificates accepted in a concatenated DER chain.
///
/// Leaf plus intermediates rarely goes beyond three or four certificates.
const MAX_CERT_CHAIN_LENGTH: usize = 16;

/// Takes a concatenated chain of DER-encoded certificates and parses it
/// into a `Vec<Certificate>`, preserving order.
pub(crate) fn to_certificate_vec(
    cert_chain_der: &[u8],
) -> Result<Vec<Certificate>, CertificateError> {
    let mut rest = cert_chain_der;
    let mut certs = Vec::new();

    while !rest.is_empty() {
        if certs.len() >= MAX_CERT_CHAIN_LENGTH {
            return Err(CertificateError::TooManyCertificates {
                max: MAX_CERT_CHAIN_LENGTH,
            });
        }

        let (new_rest, _cert) = x509_parser::parse_x509_certificate(rest).map_err(|e| match e {
            Err::Incomplete(_) => {
                CertificateError::ParseX509Certificate(X509Error::InvalidCertificate)
            }
            Err::Error(err) | Err::Failure(err) => CertificateError::ParseX509Certificate(err),
        })?;

        let cert_len = rest.len() - new_rest.len();
        certs.push(Certificate(rest[..cert_len].to_vec()));

        rest = new_rest;
    }

    Ok(certs)
}

/// Try to parse the given DER-encoded slice of bytes as a X.509 certificate.
/// Returns a [`CertificateError`] if `der_bytes` is not DER-encoded or if
/// it cannot be parsed to a X.509 certificate.
pub(crate) fn parse_der_encoded_bytes_as_x509_certificate(
    der_bytes: &[u8],
) -> Result<X509Certificate<'_>, CertificateError> {
    match x509_parser::parse_x509_certificate(der_bytes) {
        Ok((_, cert)) => Ok(cert),
        Err(Err::Incomplete(_)) => Err(CertificateError::ParseX509Certificate(
            X509Error::InvalidCertificate,
        )),
        Err(Err::Error(e) | Err::Failure(e)) => Err(CertificateError::ParseX509Certificate(e)),
    }
}

pub(crate) fn read_certificate_info(
    cert: &X509Certificate<'_>,
) -> Result<CertificateInfo, CertificateError> {
    let dns_names = match cert.subject_alternative_name()? {
        Some(san) => san
            .value
            .general_names
            .iter()
            .filter_map(|name| match name {
                GeneralName::DNSName(dns) => Some((*dns).to_owned()),
                _ => None,
            })
            .collect(),
        None => Vec::new(),
    };

    Ok(CertificateInfo {
        subject_common_name: first_common_name(cert.subject()),
        issuer_common_name: first_common_name(cert.issuer()),
        serial: serial_to_hex(cert.raw_serial()),
        dns_names,
    })
}

fn first_common_name(name: &X509Name<'_>) -> Option<String> {
    name.iter_common_name()
        .next()
        .and_then(|cn| cn.as_str().ok())
        .map(str::to_owned)
}

// DER integers carry a leading zero octet when the high bit is set; strip
// those so the same serial always renders the same way.
pub(crate) fn serial_to_hex(raw: &[u8]) -> String {
    match raw.iter().position(|b| *b != 0) {
        Some(start) => hex::encode(&raw[start..]),
        None => "0".to_owned(),
    }
}
