//! The certificates a cluster needs to bootstrap, and their reconciliation
//! against a [`SecretStore`].
//!
//! A [`Certificates`] collection moves through three phases, each of which
//! stops at the first failing entry and leaves already completed entries in
//! place:
//!
//! 1. [`Certificates::lookup`] fills entries from records already in the store.
//! 2. [`Certificates::generate`] fills the remaining gaps with fresh material.
//! 3. [`Certificates::save_generated`] creates records for the generated entries.
//!
//! [`Certificates::lookup_or_generate`] runs all three. Running it again
//! against the same store finds everything and writes nothing.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::config::{BootstrapConfig, CaConfig};
use crate::error::CertificateError;
use crate::files::File;
use crate::generate;
use crate::hash;
use crate::purpose::{Purpose, name};
use crate::secret::{
    CLUSTER_NAME_LABEL, CLUSTER_SECRET_TYPE, ObjectMeta, OwnerReference, Secret,
    TLS_CRT_DATA_NAME, TLS_KEY_DATA_NAME,
};
use crate::store::{ObjectKey, SecretStore};

pub type Result<T> = std::result::Result<T, CertificateError>;

/// Certificate (or public key) bytes paired with private key bytes.
///
/// `key` may be empty for material supplied without a private key, such as
/// the CA of an external etcd.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPair {
    pub cert: Vec<u8>,
    pub key: Vec<u8>,
}

/// Paths of the files backing an external etcd.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalEtcd {
    pub ca_file: PathBuf,
    pub cert_file: PathBuf,
    pub key_file: PathBuf,
}

/// A single certificate authority or signing key.
#[derive(Debug, Clone)]
pub struct Certificate {
    pub purpose: Purpose,
    /// Must already exist in the store; never generated.
    pub external: bool,
    pub cert_file: PathBuf,
    pub key_file: Option<PathBuf>,
    key_pair: Option<KeyPair>,
    generated: bool,
    saved: bool,
}

impl Certificate {
    pub fn new(purpose: Purpose, cert_file: impl Into<PathBuf>) -> Self {
        Self {
            purpose,
            external: false,
            cert_file: cert_file.into(),
            key_file: None,
            key_pair: None,
            generated: false,
            saved: false,
        }
    }

    pub fn with_key_file(mut self, key_file: impl Into<PathBuf>) -> Self {
        self.key_file = Some(key_file.into());
        self
    }

    pub fn external(mut self) -> Self {
        self.external = true;
        self
    }

    /// Supplies material up front. Lookup leaves the entry alone, and the
    /// material is never persisted or owned.
    pub fn with_key_pair(mut self, key_pair: KeyPair) -> Self {
        self.key_pair = Some(key_pair);
        self
    }

    pub fn key_pair(&self) -> Option<&KeyPair> {
        self.key_pair.as_ref()
    }

    /// This process created the material and owns it.
    pub fn is_generated(&self) -> bool {
        self.generated
    }

    /// Fingerprints of every certificate stored in this entry.
    pub fn hashes(&self) -> Result<Vec<String>> {
        let key_pair = self.require_key_pair()?;
        hash::spki_hashes(&key_pair.cert).map_err(|source| CertificateError::Parse {
            purpose: self.purpose,
            source,
        })
    }

    /// The record this entry is stored as for `cluster`.
    ///
    /// Only generated material is handed to `owner`; anything read from the
    /// store or supplied externally stays outside its garbage collection.
    pub fn as_secret(&self, cluster: &ObjectKey, owner: &OwnerReference) -> Result<Secret> {
        let key_pair = self.require_key_pair()?;

        let owner_references = if self.generated {
            vec![owner.clone()]
        } else {
            Vec::new()
        };

        Ok(Secret {
            metadata: ObjectMeta {
                namespace: cluster.namespace.clone(),
                name: name(&cluster.name, self.purpose),
                labels: BTreeMap::from([(CLUSTER_NAME_LABEL.to_string(), cluster.name.clone())]),
                owner_references,
            },
            data: BTreeMap::from([
                (TLS_CRT_DATA_NAME.to_string(), key_pair.cert.clone()),
                (TLS_KEY_DATA_NAME.to_string(), key_pair.key.clone()),
            ]),
            type_: CLUSTER_SECRET_TYPE.to_string(),
        })
    }

    /// Converts the certificate to 0, 1 or 2 files.
    ///
    /// A file is left out when its bytes are empty, or for the key when no
    /// key path is configured. Content that is not UTF-8 is rejected.
    pub fn as_files(&self) -> Result<Vec<File>> {
        let Some(key_pair) = &self.key_pair else {
            return Ok(Vec::new());
        };

        let mut out = Vec::with_capacity(2);
        if !key_pair.cert.is_empty() {
            let file = File::certificate(self.cert_file.clone(), &key_pair.cert)
                .map_err(|_| self.invalid_content(&self.cert_file))?;
            out.push(file);
        }
        if let Some(key_file) = &self.key_file {
            if !key_pair.key.is_empty() {
                let file = File::key(key_file.clone(), &key_pair.key)
                    .map_err(|_| self.invalid_content(key_file))?;
                out.push(file);
            }
        }
        Ok(out)
    }

    fn invalid_content(&self, path: &Path) -> CertificateError {
        CertificateError::InvalidFileContent {
            purpose: self.purpose,
            path: path.to_path_buf(),
        }
    }

    fn require_key_pair(&self) -> Result<&KeyPair> {
        self.key_pair
            .as_ref()
            .ok_or(CertificateError::MissingCertificate {
                purpose: self.purpose,
            })
    }
}

/// The certificates necessary to bootstrap a cluster, at most one per purpose.
#[derive(Debug, Clone, Default)]
pub struct Certificates {
    certificates: Vec<Certificate>,
    ca: CaConfig,
}

impl Certificates {
    pub fn new(ca: CaConfig) -> Self {
        Self {
            certificates: Vec::new(),
            ca,
        }
    }

    /// The cluster and client CAs of the first control-plane node.
    pub fn for_initial_control_plane(config: &BootstrapConfig) -> Self {
        let dir = &config.certificates_dir;
        Self {
            certificates: vec![
                Certificate::new(Purpose::ClusterCA, dir.join("server-ca.crt"))
                    .with_key_file(dir.join("server-ca.key")),
                Certificate::new(Purpose::ClientClusterCA, dir.join("client-ca.crt"))
                    .with_key_file(dir.join("client-ca.key")),
            ],
            ca: config.ca.clone(),
        }
    }

    /// The cluster CA as a worker needs it: certificate only.
    ///
    /// The entry is external, so a worker never mints its own CA. Run
    /// [`Certificates::lookup`] then [`Certificates::ensure_all_exist`].
    pub fn for_worker(ca_cert_path: impl AsRef<Path>) -> Self {
        Self {
            certificates: vec![
                Certificate::new(Purpose::ClusterCA, ca_cert_path.as_ref()).external(),
            ],
            ca: CaConfig::default(),
        }
    }

    /// Adds the user-supplied CA and API server client certificate of an external etcd.
    pub fn with_external_etcd(mut self, etcd: &ExternalEtcd) -> Result<Self> {
        self.push(Certificate::new(Purpose::EtcdCA, &etcd.ca_file).external())?;
        self.push(
            Certificate::new(Purpose::APIServerEtcdClient, &etcd.cert_file)
                .with_key_file(&etcd.key_file)
                .external(),
        )?;
        Ok(self)
    }

    /// Adds the service-account signing keys.
    pub fn with_service_account(mut self, config: &BootstrapConfig) -> Result<Self> {
        let dir = &config.certificates_dir;
        self.push(
            Certificate::new(Purpose::ServiceAccount, dir.join("sa.pub"))
                .with_key_file(dir.join("sa.key")),
        )?;
        Ok(self)
    }

    pub fn push(&mut self, certificate: Certificate) -> Result<()> {
        if self.get_by_purpose(certificate.purpose).is_some() {
            return Err(CertificateError::DuplicatePurpose {
                purpose: certificate.purpose,
            });
        }
        self.certificates.push(certificate);
        Ok(())
    }

    pub fn get_by_purpose(&self, purpose: Purpose) -> Option<&Certificate> {
        self.certificates.iter().find(|c| c.purpose == purpose)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Certificate> {
        self.certificates.iter()
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    /// Looks up each certificate in `store` and populates it with the stored data.
    ///
    /// Missing records are skipped, except for external certificates.
    /// Entries that already hold material are left alone, unless it was
    /// generated and never saved: a stored record then replaces it.
    pub fn lookup(&mut self, store: &impl SecretStore, cluster: &ObjectKey) -> Result<()> {
        for certificate in &mut self.certificates {
            let unsaved = certificate.generated && !certificate.saved;
            if certificate.key_pair.is_some() && !unsaved {
                continue;
            }
            let purpose = certificate.purpose;
            let key = ObjectKey::new(&cluster.namespace, name(&cluster.name, purpose));

            let secret = match store.get(&key) {
                Ok(secret) => secret,
                Err(err) if err.is_not_found() => {
                    if certificate.external {
                        return Err(CertificateError::ExternalNotFound {
                            purpose,
                            source: err,
                        });
                    }
                    debug!(%purpose, secret = %key.name, namespace = %key.namespace, "certificate not found");
                    continue;
                }
                Err(source) => return Err(CertificateError::Store { purpose, source }),
            };

            // A badly formatted secret prevents the cluster from working, so it is fatal.
            certificate.key_pair = Some(secret_to_key_pair(purpose, &secret)?);
            certificate.generated = false;
            debug!(%purpose, secret = %key.name, namespace = %key.namespace, "found certificate");
        }
        Ok(())
    }

    /// Ensures there is data present for every certificate.
    pub fn ensure_all_exist(&self) -> Result<()> {
        for certificate in &self.certificates {
            let purpose = certificate.purpose;
            let Some(key_pair) = &certificate.key_pair else {
                return Err(CertificateError::MissingCertificate { purpose });
            };
            if key_pair.cert.is_empty() {
                return Err(CertificateError::MissingCertData { purpose });
            }
            if !certificate.external && key_pair.key.is_empty() {
                return Err(CertificateError::MissingKeyData { purpose });
            }
        }
        Ok(())
    }

    /// Generates material for every certificate that has none.
    ///
    /// External and user-supplied certificates are left empty;
    /// [`Certificates::ensure_all_exist`] reports them.
    pub fn generate(&mut self) -> Result<()> {
        for certificate in &mut self.certificates {
            if certificate.key_pair.is_some() || certificate.external {
                continue;
            }
            let purpose = certificate.purpose;
            let generated = generate::generate(purpose, &self.ca)
                .map_err(|source| CertificateError::Generation { purpose, source })?;
            if let Some(key_pair) = generated {
                certificate.key_pair = Some(key_pair);
                certificate.generated = true;
            }
        }
        Ok(())
    }

    /// Creates a record for every generated certificate not yet saved.
    ///
    /// Creation never overwrites: if another actor stored the same certificate
    /// first this fails with [`CertificateError::PersistConflict`]. The losing
    /// entry is emptied so the next lookup adopts the stored record.
    pub fn save_generated(
        &mut self,
        store: &impl SecretStore,
        cluster: &ObjectKey,
        owner: &OwnerReference,
    ) -> Result<()> {
        for certificate in &mut self.certificates {
            if !certificate.generated || certificate.saved {
                continue;
            }
            let purpose = certificate.purpose;
            let secret = certificate.as_secret(cluster, owner)?;

            match store.create(&secret) {
                Ok(()) => {
                    info!(%purpose, secret = %secret.metadata.name, namespace = %secret.metadata.namespace, "created certificate secret");
                    certificate.saved = true;
                }
                Err(err) if err.is_already_exists() => {
                    warn!(%purpose, secret = %secret.metadata.name, namespace = %secret.metadata.namespace, "certificate secret was created concurrently");
                    certificate.key_pair = None;
                    certificate.generated = false;
                    return Err(CertificateError::PersistConflict {
                        purpose,
                        name: secret.metadata.name,
                    });
                }
                Err(source) => return Err(CertificateError::Store { purpose, source }),
            }
        }
        Ok(())
    }

    /// Looks up, generates and saves, stopping at the first failure.
    pub fn lookup_or_generate(
        &mut self,
        store: &impl SecretStore,
        cluster: &ObjectKey,
        owner: &OwnerReference,
    ) -> Result<()> {
        self.lookup(store, cluster)?;
        self.generate()?;
        self.save_generated(store, cluster, owner)
    }

    /// Converts the certificates into node files, in a fixed purpose order.
    ///
    /// Service-account keys are not written by this projection.
    pub fn as_files(&self) -> Result<Vec<File>> {
        let mut files = Vec::new();
        for purpose in [
            Purpose::ClusterCA,
            Purpose::ClientClusterCA,
            Purpose::EtcdCA,
            // only present with a user-supplied external etcd
            Purpose::APIServerEtcdClient,
        ] {
            if let Some(certificate) = self.get_by_purpose(purpose) {
                files.extend(certificate.as_files()?);
            }
        }
        Ok(files)
    }
}

fn secret_to_key_pair(purpose: Purpose, secret: &Secret) -> Result<KeyPair> {
    let cert = secret
        .data
        .get(TLS_CRT_DATA_NAME)
        .ok_or(CertificateError::MissingStoredField {
            purpose,
            field: TLS_CRT_DATA_NAME,
        })?;

    // Some purposes are legitimately keyless, e.g. an external etcd CA.
    let key = secret.data.get(TLS_KEY_DATA_NAME).cloned().unwrap_or_default();

    Ok(KeyPair {
        cert: cert.clone(),
        key,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn cluster() -> ObjectKey {
        ObjectKey::new("default", "c1")
    }

    fn stored(purpose: Purpose, data: &[(&str, &[u8])]) -> Secret {
        Secret {
            metadata: ObjectMeta {
                namespace: "default".to_string(),
                name: name("c1", purpose),
                ..Default::default()
            },
            data: data
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_vec()))
                .collect(),
            type_: CLUSTER_SECRET_TYPE.to_string(),
        }
    }

    #[test]
    fn test_push_rejects_duplicate_purpose() {
        let mut certificates = Certificates::for_initial_control_plane(&BootstrapConfig::default());
        let err = certificates
            .push(Certificate::new(Purpose::ClusterCA, "/tmp/ca.crt"))
            .unwrap_err();
        assert!(matches!(
            err,
            CertificateError::DuplicatePurpose {
                purpose: Purpose::ClusterCA
            }
        ));
        assert_eq!(certificates.len(), 2);
    }

    #[test]
    fn test_initial_control_plane_paths() {
        let certificates = Certificates::for_initial_control_plane(&BootstrapConfig::default());
        let ca = certificates.get_by_purpose(Purpose::ClusterCA).unwrap();
        assert_eq!(
            ca.cert_file,
            PathBuf::from("/var/lib/rancher/k3s/server/tls/server-ca.crt")
        );
        assert_eq!(
            ca.key_file.as_deref(),
            Some(Path::new("/var/lib/rancher/k3s/server/tls/server-ca.key"))
        );
        assert!(certificates.get_by_purpose(Purpose::EtcdCA).is_none());
    }

    #[test]
    fn test_lookup_tolerates_missing_key() {
        let store = MemoryStore::new();
        store
            .insert(stored(Purpose::ClusterCA, &[(TLS_CRT_DATA_NAME, b"crt")]))
            .unwrap();

        let mut certificates = Certificates::for_worker("/etc/ca.crt");
        certificates.lookup(&store, &cluster()).unwrap();

        let ca = certificates.get_by_purpose(Purpose::ClusterCA).unwrap();
        assert_eq!(ca.key_pair().unwrap().cert, b"crt");
        assert!(ca.key_pair().unwrap().key.is_empty());
        assert!(!ca.is_generated());
    }

    #[test]
    fn test_lookup_fails_on_missing_cert_field() {
        let store = MemoryStore::new();
        store
            .insert(stored(Purpose::ClusterCA, &[(TLS_KEY_DATA_NAME, b"key")]))
            .unwrap();

        let mut certificates = Certificates::for_worker("/etc/ca.crt");
        let err = certificates.lookup(&store, &cluster()).unwrap_err();
        assert!(matches!(
            err,
            CertificateError::MissingStoredField {
                purpose: Purpose::ClusterCA,
                field: "tls.crt"
            }
        ));
    }

    #[test]
    fn test_ensure_all_exist_distinguishes_halves() {
        let mut certificates = Certificates::default();
        certificates
            .push(Certificate::new(Purpose::ClusterCA, "/ca.crt"))
            .unwrap();
        assert!(matches!(
            certificates.ensure_all_exist(),
            Err(CertificateError::MissingCertificate { .. })
        ));

        let mut certificates = Certificates::default();
        certificates
            .push(Certificate::new(Purpose::ClusterCA, "/ca.crt").with_key_pair(KeyPair {
                cert: Vec::new(),
                key: b"key".to_vec(),
            }))
            .unwrap();
        assert!(matches!(
            certificates.ensure_all_exist(),
            Err(CertificateError::MissingCertData { .. })
        ));

        let mut certificates = Certificates::default();
        certificates
            .push(Certificate::new(Purpose::ClusterCA, "/ca.crt").with_key_pair(KeyPair {
                cert: b"crt".to_vec(),
                key: Vec::new(),
            }))
            .unwrap();
        assert!(matches!(
            certificates.ensure_all_exist(),
            Err(CertificateError::MissingKeyData { .. })
        ));
    }

    #[test]
    fn test_external_certificate_needs_no_key() {
        let mut certificates = Certificates::default();
        certificates
            .push(
                Certificate::new(Purpose::EtcdCA, "/etcd/ca.crt")
                    .external()
                    .with_key_pair(KeyPair {
                        cert: b"crt".to_vec(),
                        key: Vec::new(),
                    }),
            )
            .unwrap();
        certificates.ensure_all_exist().unwrap();
    }

    #[test]
    fn test_generate_skips_external_and_user_supplied() {
        let mut certificates = Certificates::new(CaConfig::builder().key_bits(1024).build());
        certificates
            .push(Certificate::new(Purpose::EtcdCA, "/etcd/ca.crt").external())
            .unwrap();
        certificates
            .push(Certificate::new(Purpose::APIServerEtcdClient, "/etcd/client.crt"))
            .unwrap();
        certificates.generate().unwrap();

        assert!(certificates.iter().all(|c| c.key_pair().is_none()));
        assert!(certificates.iter().all(|c| !c.is_generated()));
        assert!(certificates.ensure_all_exist().is_err());
    }

    #[test]
    fn test_hashes_without_key_pair() {
        let certificate = Certificate::new(Purpose::ClusterCA, "/ca.crt");
        assert!(matches!(
            certificate.hashes(),
            Err(CertificateError::MissingCertificate { .. })
        ));

        let certificate = certificate.with_key_pair(KeyPair {
            cert: b"garbage".to_vec(),
            key: Vec::new(),
        });
        assert!(matches!(
            certificate.hashes(),
            Err(CertificateError::Parse { .. })
        ));
    }

    #[test]
    fn test_files_omit_empty_halves() {
        let certificate = Certificate::new(Purpose::EtcdCA, "/etcd/ca.crt")
            .with_key_file("/etcd/ca.key")
            .with_key_pair(KeyPair {
                cert: b"crt".to_vec(),
                key: Vec::new(),
            });
        let files = certificate.as_files().unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path, PathBuf::from("/etcd/ca.crt"));
        assert_eq!(files[0].permissions, "0640");
        assert_eq!(files[0].owner, "root:root");

        assert!(
            Certificate::new(Purpose::EtcdCA, "/etcd/ca.crt")
                .as_files()
                .unwrap()
                .is_empty()
        );
    }

    #[test]
    fn test_files_reject_non_utf8_content() {
        let certificate = Certificate::new(Purpose::ClusterCA, "/ca.crt")
            .with_key_file("/ca.key")
            .with_key_pair(KeyPair {
                cert: b"crt".to_vec(),
                key: vec![0xff, 0xfe],
            });
        match certificate.as_files().unwrap_err() {
            CertificateError::InvalidFileContent { purpose, path } => {
                assert_eq!(purpose, Purpose::ClusterCA);
                assert_eq!(path, PathBuf::from("/ca.key"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_lookup_keeps_supplied_material() {
        let store = MemoryStore::new();
        store
            .insert(stored(Purpose::ClusterCA, &[(TLS_CRT_DATA_NAME, b"stored")]))
            .unwrap();

        let mut certificates = Certificates::default();
        certificates
            .push(Certificate::new(Purpose::ClusterCA, "/ca.crt").with_key_pair(KeyPair {
                cert: b"supplied".to_vec(),
                key: b"key".to_vec(),
            }))
            .unwrap();
        certificates
            .push(
                Certificate::new(Purpose::EtcdCA, "/etcd/ca.crt")
                    .external()
                    .with_key_pair(KeyPair {
                        cert: b"etcd".to_vec(),
                        key: Vec::new(),
                    }),
            )
            .unwrap();
        certificates.lookup(&store, &cluster()).unwrap();

        let ca = certificates.get_by_purpose(Purpose::ClusterCA).unwrap();
        assert_eq!(ca.key_pair().unwrap().cert, b"supplied");
        let etcd = certificates.get_by_purpose(Purpose::EtcdCA).unwrap();
        assert_eq!(etcd.key_pair().unwrap().cert, b"etcd");
    }

    #[test]
    fn test_worker_never_generates_its_ca() {
        let store = MemoryStore::new();
        let mut certificates = Certificates::for_worker("/etc/ca.crt");
        certificates.generate().unwrap();
        assert!(certificates.get_by_purpose(Purpose::ClusterCA).unwrap().key_pair().is_none());

        let err = certificates.lookup(&store, &cluster()).unwrap_err();
        assert!(matches!(
            err,
            CertificateError::ExternalNotFound {
                purpose: Purpose::ClusterCA,
                ..
            }
        ));
        assert!(store.is_empty());
    }
}
