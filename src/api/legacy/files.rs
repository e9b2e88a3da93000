//! File upload and download.

use std::path::Path;

use serde_json::{Map, Value};

use super::YetiApi;
use crate::client::{segment, FileUpload};
use crate::error::{Result, YetiError};
use crate::models::{FileInfo, FileRef, SearchQuery};

impl YetiApi {
    /// Upload raw content as a file observable.
    ///
    /// The server answers with one entry per stored file.
    #[tracing::instrument(skip(self, upload), fields(file_name = %upload.file_name))]
    pub async fn upload_file(&self, upload: FileUpload) -> Result<Vec<FileInfo>> {
        self.executor
            .post_multipart("file/addfile", upload)
            .await?
            .into_json()
    }

    /// Upload a file from disk, then tag it.
    ///
    /// When `tags` or `context` are non-empty, each uploaded file observable is
    /// updated with them and the updated observables are returned.
    ///
    /// # Errors
    ///
    /// Fails with [`YetiError::Io`] if the file cannot be read.
    #[tracing::instrument(skip(self, path, context), fields(path = %path.as_ref().display()))]
    pub async fn observable_file_add(
        &self,
        path: impl AsRef<Path> + Send,
        tags: &[String],
        context: &Map<String, Value>,
    ) -> Result<Vec<FileInfo>> {
        let path = tokio::fs::canonicalize(path.as_ref()).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| {
                YetiError::InvalidArgument(format!("{} has no file name", path.display()))
            })?;
        let content = tokio::fs::read(&path).await?;

        let fileinfo = self.upload_file(FileUpload::new(file_name, content)).await?;
        if tags.is_empty() && context.is_empty() {
            return Ok(fileinfo);
        }

        let mut updated = Vec::with_capacity(fileinfo.len());
        for info in fileinfo {
            updated.push(self.change(&info.id, tags, context).await?);
        }
        Ok(updated)
    }

    /// Download stored file content.
    #[tracing::instrument(skip(self))]
    pub async fn file_contents(&self, file: &FileRef) -> Result<Vec<u8>> {
        let path = match file {
            FileRef::Id(id) => format!("file/get/id/{}", segment(id)),
            FileRef::Hash(hash) => format!("file/get/hash/{}", segment(hash)),
        };
        self.executor.download(&path).await
    }

    /// Download stored file content by object id or by hash.
    ///
    /// # Errors
    ///
    /// Exactly one of `objectid` and `filehash` must be given; otherwise this
    /// fails with [`YetiError::InvalidArgument`] before any request is made.
    pub async fn observable_file_contents(
        &self,
        objectid: Option<&str>,
        filehash: Option<&str>,
    ) -> Result<Vec<u8>> {
        let file = FileRef::from_parts(objectid, filehash)?;
        self.file_contents(&file).await
    }

    /// File observables carrying the given hash, in any algorithm.
    #[tracing::instrument(skip(self))]
    pub async fn search_files_by_hash(&self, hash: &str) -> Result<Vec<FileInfo>> {
        let query = SearchQuery::new().filter("hashes__value", hash);
        Ok(self.search_page("observablesearch/", &query).await?.items)
    }

    /// Download a file by its observable id.
    pub async fn observable_file_download(&self, objectid: &str) -> Result<Vec<u8>> {
        self.file_contents(&FileRef::Id(objectid.to_string())).await
    }
}
