#![forbid(unsafe_code)]

//! Loading X.509 certificates into a key.
//!
//! Certificates are only parsed far enough to reject malformed input; the DER
//! bytes are what ends up in `X509Data`.

use crate::key::Key;
use solna_core::Error;

const BEGIN: &str = "-----BEGIN ";

/// Split PEM text into its individual armored blocks.
fn pem_blocks(text: &str) -> Vec<&str> {
    let mut blocks = Vec::new();
    let mut rest = text;
    while let Some(start) = rest.find(BEGIN) {
        let from = &rest[start..];
        let label_end = from[BEGIN.len()..].find("-----").map(|i| i + BEGIN.len());
        let Some(label_end) = label_end else { break };
        let end_marker = format!("-----END {}-----", &from[BEGIN.len()..label_end]);
        match from.find(&end_marker) {
            Some(end) => {
                let len = end + end_marker.len();
                blocks.push(&from[..len]);
                rest = &from[len..];
            }
            None => {
                blocks.push(from);
                break;
            }
        }
    }
    blocks
}

fn parse_der(der: Vec<u8>) -> Result<Vec<u8>, Error> {
    use der::Decode;
    x509_cert::Certificate::from_der(&der)
        .map_err(|e| Error::Certificate(format!("failed to parse X.509 certificate: {e}")))?;
    Ok(der)
}

/// Parse one or more certificates (PEM `CERTIFICATE` blocks, or a single DER
/// certificate) and return their DER encodings in input order.
pub fn load_certificates(data: &[u8]) -> Result<Vec<Vec<u8>>, Error> {
    let text = std::str::from_utf8(data).ok().filter(|t| t.contains(BEGIN));
    let Some(text) = text else {
        if data.is_empty() {
            return Err(Error::Certificate("certificate data is empty".into()));
        }
        return Ok(vec![parse_der(data.to_vec())?]);
    };

    let mut certs = Vec::new();
    for block in pem_blocks(text) {
        let (label, der) = pem_rfc7468::decode_vec(block.as_bytes())
            .map_err(|e| Error::Certificate(format!("failed to decode certificate PEM: {e}")))?;
        if label != "CERTIFICATE" {
            return Err(Error::Certificate(format!(
                "expected CERTIFICATE PEM label, got: {label}"
            )));
        }
        certs.push(parse_der(der)?);
    }
    if certs.is_empty() {
        return Err(Error::Certificate("no certificate found".into()));
    }
    Ok(certs)
}

/// Parse certificates and append them to the key's chain.
///
/// The key is left untouched when any certificate is rejected.
pub fn attach_certificates(key: &mut Key, data: &[u8]) -> Result<(), Error> {
    let certs = load_certificates(data)?;
    key.x509_chain.extend(certs);
    Ok(())
}
