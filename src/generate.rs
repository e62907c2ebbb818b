//! Fresh material for each certificate purpose.

use time::OffsetDateTime;
use tracing::debug;

use crate::cert::Certificate as X509Certificate;
use crate::cert::params::Validity;
use crate::certificates::KeyPair;
use crate::config::CaConfig;
use crate::error::CryptoError;
use crate::key::KeyPair as RsaKeyPair;
use crate::purpose::Purpose;

/// Generates material for `purpose`.
///
/// Returns `None` for purposes that are only ever supplied by the user.
pub fn generate(purpose: Purpose, config: &CaConfig) -> Result<Option<KeyPair>, CryptoError> {
    let key_pair = match purpose {
        Purpose::ClusterCA | Purpose::ClientClusterCA | Purpose::EtcdCA => {
            generate_ca_cert(config)?
        }
        Purpose::ServiceAccount => generate_service_account_keys(config)?,
        // Always supplied with an external etcd; must already be in the store.
        Purpose::APIServerEtcdClient => return Ok(None),
    };
    debug!(%purpose, "generated key pair");
    Ok(Some(key_pair))
}

/// A self-signed CA: PEM certificate in the certificate slot, PEM private key
/// in the key slot.
pub fn generate_ca_cert(config: &CaConfig) -> Result<KeyPair, CryptoError> {
    let key = RsaKeyPair::generate_rsa(config.key_bits)?;
    let validity = Validity::for_ca(OffsetDateTime::now_utc());
    let certificate = X509Certificate::new_self_signed_ca(&key, config, validity)?;
    Ok(KeyPair {
        cert: certificate.to_pem()?.into_bytes(),
        key: key.private_key_pem()?.into_bytes(),
    })
}

/// Token signing keys: PEM public key in the certificate slot, PEM private key
/// in the key slot.
pub fn generate_service_account_keys(config: &CaConfig) -> Result<KeyPair, CryptoError> {
    let key = RsaKeyPair::generate_rsa(config.key_bits)?;
    Ok(KeyPair {
        cert: key.public_key_pem()?.into_bytes(),
        key: key.private_key_pem()?.into_bytes(),
    })
}
