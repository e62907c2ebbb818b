#![allow(dead_code)]

use bootstrap_certs::config::{BootstrapConfig, CaConfig};
use bootstrap_certs::secret::{OwnerReference, Secret};
use bootstrap_certs::store::{ObjectKey, SecretStore, StoreError};

pub fn cluster() -> ObjectKey {
    ObjectKey::new("default", "c1")
}

pub fn owner() -> OwnerReference {
    OwnerReference {
        api_version: "controlplane.cluster.x-k8s.io/v1beta1".to_string(),
        kind: "KThreesControlPlane".to_string(),
        name: "c1-control-plane".to_string(),
        uid: "0d4a5c1e-1f2b-4c3d-8e9f-001122334455".to_string(),
        controller: Some(true),
        block_owner_deletion: Some(true),
    }
}

/// Small keys keep generation fast; nothing here depends on key strength.
pub fn config() -> BootstrapConfig {
    BootstrapConfig::builder()
        .certificates_dir("/var/lib/rancher/k3s/server/tls")
        .ca(CaConfig::builder().key_bits(1024).build())
        .build()
}

/// A store whose every call fails with a backend error.
pub struct UnavailableStore;

impl SecretStore for UnavailableStore {
    fn get(&self, _key: &ObjectKey) -> Result<Secret, StoreError> {
        Err(StoreError::Backend("connection refused".to_string()))
    }

    fn create(&self, _secret: &Secret) -> Result<(), StoreError> {
        Err(StoreError::Backend("connection refused".to_string()))
    }
}
