use der::{Decode, Encode};
use sha2::{Digest, Sha256};
use x509_cert::Certificate as X509Certificate;

use crate::error::CryptoError;

const CERTIFICATE_PEM_TAG: &str = "CERTIFICATE";

/// Trust-pinning fingerprints of every certificate in a PEM bundle.
///
/// Each fingerprint is `sha256:` followed by the lowercase hex SHA-256 of the
/// certificate's DER-encoded SubjectPublicKeyInfo, so reissuing a certificate
/// over the same key keeps its fingerprint. PEM blocks that are not
/// certificates are skipped; a bundle without any certificate is an error.
pub fn spki_hashes(bundle: &[u8]) -> Result<Vec<String>, CryptoError> {
    let blocks = pem::parse_many(bundle)?;

    let hashes = blocks
        .iter()
        .filter(|block| block.tag() == CERTIFICATE_PEM_TAG)
        .map(|block| {
            let certificate = X509Certificate::from_der(block.contents())?;
            hash_spki(&certificate)
        })
        .collect::<Result<Vec<_>, CryptoError>>()?;

    if hashes.is_empty() {
        return Err(CryptoError::DecodingError(
            "data does not contain any valid certificates".to_string(),
        ));
    }
    Ok(hashes)
}

fn hash_spki(certificate: &X509Certificate) -> Result<String, CryptoError> {
    let spki = certificate
        .tbs_certificate
        .subject_public_key_info
        .to_der()
        .map_err(|e| CryptoError::EncodingError(e.to_string()))?;
    let digest = Sha256::digest(&spki);
    Ok(format!("sha256:{}", hex::encode(digest)))
}
