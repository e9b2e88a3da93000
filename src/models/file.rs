//! File observables and file content references.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::{serde_as, DefaultOnNull};

use super::tag_names;
use crate::error::{Result, YetiError};

/// A file observable as returned by upload and search endpoints.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileInfo {
    pub id: String,

    /// `FILE:<sha256>` on legacy servers.
    #[serde(default)]
    pub value: String,

    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub hashes: Vec<FileHash>,

    #[serde_as(as = "DefaultOnNull")]
    #[serde(default)]
    pub filenames: Vec<String>,

    #[serde(default)]
    pub mime_type: Option<String>,

    #[serde(default)]
    pub human_url: Option<String>,

    #[serde(default)]
    pub created: Option<String>,

    #[serde(default)]
    pub tags: Value,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One digest of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileHash {
    /// Algorithm name (`md5`, `sha1`, `sha256`, ...).
    pub hash: String,
    pub value: String,
}

impl FileInfo {
    /// Digest for the given algorithm, if present.
    pub fn hash(&self, algorithm: &str) -> Option<&str> {
        self.hashes
            .iter()
            .find(|h| h.hash.eq_ignore_ascii_case(algorithm))
            .map(|h| h.value.as_str())
    }

    pub fn sha256(&self) -> Option<&str> {
        self.hash("sha256")
    }

    pub fn tag_names(&self) -> Vec<String> {
        tag_names(&self.tags)
    }
}

/// How to address stored file content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRef {
    Id(String),
    Hash(String),
}

impl FileRef {
    /// Build a reference from optional id and hash.
    ///
    /// # Errors
    ///
    /// Exactly one of the two must be given; anything else is
    /// [`YetiError::InvalidArgument`].
    pub fn from_parts(objectid: Option<&str>, filehash: Option<&str>) -> Result<Self> {
        match (objectid, filehash) {
            (Some(id), None) => Ok(Self::Id(id.to_string())),
            (None, Some(hash)) => Ok(Self::Hash(hash.to_string())),
            (None, None) => Err(YetiError::InvalidArgument(
                "either an object id or a file hash is required".to_string(),
            )),
            (Some(_), Some(_)) => Err(YetiError::InvalidArgument(
                "give either an object id or a file hash, not both".to_string(),
            )),
        }
    }
}
