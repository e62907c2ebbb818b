//! use bootstrap_certs::error::{CertificateError, CryptoError};

use std::path::PathBuf;

use thiserror::Error;

use crate::purpose::Purpose;
use crate::store::StoreError;

/// Errors raised by the key and certificate primitives.
///
/// These never escape a reconciliation pass on their own; the coordinator
/// wraps them in a [`CertificateError`] naming the purpose involved.
#[derive(Debug, Error, Clone)]
pub enum CryptoError {
    /// Error during data encoding.
    #[error("Failed to encode data: {0}")]
    EncodingError(String),

    /// Error during data decoding.
    #[error("Failed to decode data: {0}")]
    DecodingError(String),

    /// Error due to invalid input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Error during key generation.
    #[error("Key generation error: {0}")]
    KeyGenerationError(String),

    /// Error related to certificate operations.
    #[error("Certificate error: {0}")]
    CertificateError(String),

    /// Error from RSA operations.
    #[error("RSA error: {0}")]
    RsaError(String),

    /// Error from RSA PKCS1 operations.
    #[error("RSA PKCS1 error: {0}")]
    RsaPkcs1Error(String),
}

impl From<der::Error> for CryptoError {
    /// Converts a `der::Error` into a `CryptoError`.
    fn from(err: der::Error) -> Self {
        CryptoError::DecodingError(err.to_string())
    }
}

impl From<rsa::Error> for CryptoError {
    fn from(err: rsa::Error) -> Self {
        CryptoError::RsaError(err.to_string())
    }
}

impl From<rsa::pkcs1::Error> for CryptoError {
    fn from(err: rsa::pkcs1::Error) -> Self {
        CryptoError::RsaPkcs1Error(err.to_string())
    }
}

impl From<pkcs8::spki::Error> for CryptoError {
    fn from(err: pkcs8::spki::Error) -> Self {
        CryptoError::EncodingError(err.to_string())
    }
}

impl From<pem::PemError> for CryptoError {
    fn from(err: pem::PemError) -> Self {
        CryptoError::DecodingError(err.to_string())
    }
}

impl From<rsa::signature::Error> for CryptoError {
    fn from(err: rsa::signature::Error) -> Self {
        CryptoError::CertificateError(err.to_string())
    }
}

/// Errors raised while reconciling a [`Certificates`](crate::certificates::Certificates)
/// collection against a store.
///
/// Every variant carries the purpose that failed so callers can branch on the
/// kind and the role without matching on messages.
#[derive(Debug, Error, Clone)]
pub enum CertificateError {
    /// The entry has no keypair after lookup and generation.
    #[error("missing certificate for {purpose}")]
    MissingCertificate { purpose: Purpose },

    /// The keypair is present but its certificate half is empty.
    #[error("for certificate {purpose}: missing crt data")]
    MissingCertData { purpose: Purpose },

    /// The keypair is present but its key half is empty on a non-external entry.
    #[error("for certificate {purpose}: missing key data")]
    MissingKeyData { purpose: Purpose },

    /// A stored record exists but lacks the named data field.
    #[error("for certificate {purpose}: key {field}: missing data")]
    MissingStoredField {
        purpose: Purpose,
        field: &'static str,
    },

    /// A certificate that must be supplied externally is absent from the store.
    #[error("external certificate {purpose} not found: {source}")]
    ExternalNotFound {
        purpose: Purpose,
        #[source]
        source: StoreError,
    },

    /// Key or certificate creation failed.
    #[error("failed to generate {purpose}: {source}")]
    Generation {
        purpose: Purpose,
        #[source]
        source: CryptoError,
    },

    /// A create-only write found an existing record, another actor won the race.
    #[error("secret {name} for certificate {purpose} already exists")]
    PersistConflict { purpose: Purpose, name: String },

    /// Any other store failure.
    #[error("store error for certificate {purpose}: {source}")]
    Store {
        purpose: Purpose,
        #[source]
        source: StoreError,
    },

    /// The stored certificate bytes are not a PEM certificate bundle.
    #[error("unable to parse {purpose} certificate: {source}")]
    Parse {
        purpose: Purpose,
        #[source]
        source: CryptoError,
    },

    /// Material bound for a node file is not valid UTF-8.
    #[error("for certificate {purpose}: content for {} is not valid UTF-8", path.display())]
    InvalidFileContent { purpose: Purpose, path: PathBuf },

    /// A collection already holds an entry for this purpose.
    #[error("duplicate certificate purpose {purpose}")]
    DuplicatePurpose { purpose: Purpose },
}

impl CertificateError {
    /// The purpose of the entry that failed.
    pub fn purpose(&self) -> Purpose {
        match self {
            CertificateError::MissingCertificate { purpose }
            | CertificateError::MissingCertData { purpose }
            | CertificateError::MissingKeyData { purpose }
            | CertificateError::MissingStoredField { purpose, .. }
            | CertificateError::ExternalNotFound { purpose, .. }
            | CertificateError::Generation { purpose, .. }
            | CertificateError::PersistConflict { purpose, .. }
            | CertificateError::Store { purpose, .. }
            | CertificateError::Parse { purpose, .. }
            | CertificateError::InvalidFileContent { purpose, .. }
            | CertificateError::DuplicatePurpose { purpose } => *purpose,
        }
    }

    /// Whether this is the create-only race guard firing.
    ///
    /// The surrounding controller treats this as "someone else already created
    /// it" and retries the whole reconciliation, which will then pick up the
    /// winner's record during lookup.
    pub fn is_conflict(&self) -> bool {
        matches!(self, CertificateError::PersistConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_carries_purpose() {
        let err = CertificateError::MissingStoredField {
            purpose: Purpose::EtcdCA,
            field: "tls.crt",
        };
        assert_eq!(err.purpose(), Purpose::EtcdCA);
        assert_eq!(
            err.to_string(),
            "for certificate etcd: key tls.crt: missing data"
        );
    }

    #[test]
    fn test_external_not_found_wraps_store_error() {
        let err = CertificateError::ExternalNotFound {
            purpose: Purpose::APIServerEtcdClient,
            source: StoreError::NotFound {
                name: "c1-apiserver-etcd-client".to_string(),
            },
        };
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(
            source.as_deref(),
            Some("secret c1-apiserver-etcd-client not found")
        );
        assert!(!err.is_conflict());
    }
}
