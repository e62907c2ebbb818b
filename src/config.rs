use std::path::PathBuf;

use bon::Builder;

use crate::cert::params::SerialPolicy;

/// Default directory certificate files are written to on control-plane nodes.
pub const DEFAULT_CERTIFICATES_DIR: &str = "/var/lib/rancher/k3s/server/tls";

/// Common name of every generated CA.
pub const DEFAULT_CA_COMMON_NAME: &str = "kubernetes";

/// Key size of every generated RSA key.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Parameters for generated authorities and signing keys.
///
/// ```
/// use bootstrap_certs::cert::params::SerialPolicy;
/// use bootstrap_certs::config::CaConfig;
///
/// let config = CaConfig::builder().serial(SerialPolicy::Random).build();
/// assert_eq!(config.common_name, "kubernetes");
/// assert_eq!(config.key_bits, 2048);
/// ```
#[derive(Clone, Debug, Builder, PartialEq, Eq)]
pub struct CaConfig {
    #[builder(default = DEFAULT_KEY_BITS)]
    pub key_bits: usize,
    #[builder(default)]
    pub serial: SerialPolicy,
    #[builder(default = DEFAULT_CA_COMMON_NAME.to_string())]
    pub common_name: String,
}

impl Default for CaConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Where bootstrap material lands on nodes and how it is generated.
#[derive(Clone, Debug, Builder, PartialEq, Eq)]
pub struct BootstrapConfig {
    #[builder(default = PathBuf::from(DEFAULT_CERTIFICATES_DIR), into)]
    pub certificates_dir: PathBuf,
    #[builder(default)]
    pub ca: CaConfig,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
