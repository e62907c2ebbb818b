//! # bootstrap-certs - Cluster Bootstrap Certificate Authorities
//!
//! Guarantees that the certificate authorities and signing keys a cluster
//! control plane needs exist exactly once: read from the store if already
//! issued, generated if absent, and persisted with create-only writes so that
//! concurrent or repeated bootstrap attempts converge on the same material.
//! Built entirely with rustcrypto libraries.
//!
//! ## Certificate Purposes
//!
//! - **ClusterCA**, **ClientClusterCA**, **EtcdCA**: self-signed RSA root CAs
//!   (`CN=kubernetes`, path length 0, valid ten years from five minutes ago)
//! - **ServiceAccount**: an RSA key pair for signing service-account tokens
//! - **APIServerEtcdClient**: always supplied by the user with an external etcd
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use bootstrap_certs::{
//!     certificates::Certificates,
//!     config::BootstrapConfig,
//!     secret::OwnerReference,
//!     store::{MemoryStore, ObjectKey},
//! };
//!
//! # fn main() -> Result<(), bootstrap_certs::error::CertificateError> {
//! let store = MemoryStore::new();
//! let cluster = ObjectKey::new("default", "my-cluster");
//! let owner = OwnerReference {
//!     api_version: "controlplane.cluster.x-k8s.io/v1beta1".to_string(),
//!     kind: "KThreesControlPlane".to_string(),
//!     name: "my-cluster-control-plane".to_string(),
//!     uid: "6b1f3c2e-0000-0000-0000-000000000000".to_string(),
//!     ..Default::default()
//! };
//!
//! let mut certificates = Certificates::for_initial_control_plane(&BootstrapConfig::default());
//! certificates.lookup_or_generate(&store, &cluster, &owner)?;
//! certificates.ensure_all_exist()?;
//!
//! // Files to write on the node, and the pin for joining nodes.
//! let files = certificates.as_files()?;
//! # let _ = files;
//! if let Some(ca) = certificates.get_by_purpose(bootstrap_certs::purpose::Purpose::ClusterCA) {
//!     println!("discovery-token-ca-cert-hash: {:?}", ca.hashes()?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## External etcd
//!
//! ```rust,no_run
//! use bootstrap_certs::certificates::{Certificates, ExternalEtcd};
//! use bootstrap_certs::config::BootstrapConfig;
//!
//! # fn main() -> Result<(), bootstrap_certs::error::CertificateError> {
//! let certificates = Certificates::for_initial_control_plane(&BootstrapConfig::default())
//!     .with_external_etcd(&ExternalEtcd {
//!         ca_file: "/etc/etcd/ca.crt".into(),
//!         cert_file: "/etc/etcd/apiserver-etcd-client.crt".into(),
//!         key_file: "/etc/etcd/apiserver-etcd-client.key".into(),
//!     })?;
//! // Lookup now fails with `CertificateError::ExternalNotFound` until both
//! // etcd records have been provisioned in the store.
//! # let _ = certificates;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Every failure is a [`error::CertificateError`] carrying the purpose involved:
//!
//! ```rust
//! use bootstrap_certs::{error::CertificateError, purpose::Purpose};
//!
//! fn describe(err: &CertificateError) -> String {
//!     match err {
//!         CertificateError::PersistConflict { .. } => "already created elsewhere, retry".to_string(),
//!         CertificateError::ExternalNotFound { purpose, .. } => format!("provide {purpose}"),
//!         other => other.to_string(),
//!     }
//! }
//!
//! let err = CertificateError::MissingCertificate { purpose: Purpose::EtcdCA };
//! assert_eq!(describe(&err), "missing certificate for etcd");
//! ```
//!
//! ## Module Organization
//!
//! - [`certificates`]: the collection and its lookup / generate / save phases
//! - [`purpose`]: certificate roles and storage names
//! - [`generate`]: per-purpose generation strategies
//! - [`cert`]: self-signed CA construction and X.509 extensions
//! - [`key`]: RSA key generation and PEM export
//! - [`hash`]: SubjectPublicKeyInfo fingerprints
//! - [`store`]: the get / create-only store contract
//! - [`secret`], [`files`]: at-rest and on-disk projections
//! - [`config`]: generation and layout parameters
//! - [`error`]: error types
//! - [`tbs_certificate`]: low-level certificate structure

pub mod cert;
pub mod certificates;
pub mod config;
pub mod error;
pub mod files;
pub mod generate;
pub mod hash;
pub mod key;
pub mod purpose;
pub mod secret;
pub mod store;
pub mod tbs_certificate;

pub use certificates::{Certificate, Certificates, KeyPair};
pub use error::CertificateError;
pub use purpose::Purpose;
