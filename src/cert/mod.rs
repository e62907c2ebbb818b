pub mod extensions;
pub mod params;

use der::{Encode, EncodePem};
use x509_cert::certificate::CertificateInner;

use crate::config::CaConfig;
use crate::error::CryptoError;
use crate::key::KeyPair;
use crate::tbs_certificate::{ExtensionParam, TbsCertificate, sha256_with_rsa};
use extensions::{BasicConstraints, KeyUsage, SubjectKeyIdentifier};
use params::{DistinguishedName, Validity};

pub type Result<T> = std::result::Result<T, CryptoError>;

/// Represents an X.509 certificate.
///
/// The wrapped certificate is exported as PEM; `inner` gives DER access.
#[derive(Debug, Clone)]
pub struct Certificate {
    /// The inner representation of the certificate.
    pub inner: CertificateInner,
}

impl Certificate {
    /// Encodes the certificate into PEM format.
    pub fn to_pem(&self) -> Result<String> {
        self.inner
            .to_pem(pkcs8::LineEnding::LF)
            .map_err(|e| CryptoError::EncodingError(e.to_string()))
    }

    /// Creates a self-signed root certificate authority for `key`.
    ///
    /// The certificate carries:
    /// * subject and issuer `CN=<common name>`;
    /// * the given validity window;
    /// * basic constraints `CA:TRUE, pathlen:0` (critical);
    /// * key usage `keyEncipherment, digitalSignature, keyCertSign` (critical);
    /// * a subject key identifier.
    ///
    /// The serial number follows `config.serial`.
    pub fn new_self_signed_ca(key: &KeyPair, config: &CaConfig, validity: Validity) -> Result<Self> {
        let name = DistinguishedName::new(config.common_name.clone());
        let spki = key.as_spki()?;

        let basic_constraints = BasicConstraints {
            is_ca: true,
            max_path_length: Some(0),
        };

        let extensions = vec![
            ExtensionParam::from_extension(basic_constraints, true)?,
            ExtensionParam::from_extension(KeyUsage::certificate_authority(), true)?,
            ExtensionParam::from_extension(SubjectKeyIdentifier::from_spki(&spki), false)?,
        ];

        // For self-signed certificates, the issuer is the same as the subject
        let tbs_cert = TbsCertificate {
            serial_number: config.serial.serial_number(),
            issuer: name.clone(),
            validity,
            subject: name,
            subject_public_key_info: spki,
            extensions,
        };

        let tbs_cert_inner = tbs_cert.to_tbs_certificate_inner()?;
        let signature = key.sign_data(&tbs_cert_inner.to_der()?)?;

        let inner = CertificateInner {
            tbs_certificate: tbs_cert_inner,
            signature_algorithm: sha256_with_rsa(),
            signature: der::asn1::BitString::from_bytes(&signature)?,
        };

        Ok(Certificate { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert::params::SerialPolicy;

    #[test]
    fn test_self_signed_ca_pem() {
        let key = KeyPair::generate_rsa(1024).unwrap();
        let config = CaConfig::builder().key_bits(1024).build();
        let validity = Validity::for_ca(time::OffsetDateTime::now_utc());
        let ca = Certificate::new_self_signed_ca(&key, &config, validity).unwrap();

        let pem = ca.to_pem().unwrap();
        assert!(pem.starts_with("-----BEGIN CERTIFICATE-----"));
        assert_eq!(ca.inner.tbs_certificate.serial_number.as_bytes(), &[0]);
        assert_eq!(
            ca.inner.tbs_certificate.issuer,
            ca.inner.tbs_certificate.subject
        );
    }

    #[test]
    fn test_random_serial_policy() {
        let key = KeyPair::generate_rsa(1024).unwrap();
        let config = CaConfig::builder()
            .key_bits(1024)
            .serial(SerialPolicy::Random)
            .build();
        let validity = Validity::for_ca(time::OffsetDateTime::now_utc());
        let ca = Certificate::new_self_signed_ca(&key, &config, validity).unwrap();
        assert_eq!(ca.inner.tbs_certificate.serial_number.as_bytes().len(), 16);
    }
}
