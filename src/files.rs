use std::path::PathBuf;
use std::string::FromUtf8Error;

use serde::{Deserialize, Serialize};

/// Owner of every certificate file written to a node.
pub const ROOT_OWNER: &str = "root:root";

pub const CERT_PERMISSIONS: &str = "0640";

pub const KEY_PERMISSIONS: &str = "0600";

/// A file to provision on a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct File {
    pub path: PathBuf,
    pub owner: String,
    pub permissions: String,
    pub content: String,
}

impl File {
    pub(crate) fn certificate(path: PathBuf, content: &[u8]) -> Result<Self, FromUtf8Error> {
        Self::root_owned(path, CERT_PERMISSIONS, content)
    }

    pub(crate) fn key(path: PathBuf, content: &[u8]) -> Result<Self, FromUtf8Error> {
        Self::root_owned(path, KEY_PERMISSIONS, content)
    }

    fn root_owned(path: PathBuf, permissions: &str, content: &[u8]) -> Result<Self, FromUtf8Error> {
        Ok(Self {
            path,
            owner: ROOT_OWNER.to_string(),
            permissions: permissions.to_string(),
            content: String::from_utf8(content.to_vec())?,
        })
    }
}
