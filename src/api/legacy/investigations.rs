//! Investigation graphs.

use serde::Serialize;
use serde_json::{json, Value};

use super::YetiApi;
use crate::client::segment;
use crate::error::Result;
use crate::models::{Investigation, ObjectRef, SearchQuery};
use crate::pagination::Page;

impl YetiApi {
    /// Create an empty investigation.
    #[tracing::instrument(skip(self))]
    pub async fn investigation_create(&self, name: &str) -> Result<Investigation> {
        #[derive(Serialize)]
        struct CreateBody<'a> {
            name: &'a str,
        }

        self.executor
            .post("investigation/", &CreateBody { name })
            .await?
            .into_json()
    }

    #[tracing::instrument(skip(self))]
    pub async fn investigation(&self, id: &str) -> Result<Investigation> {
        let path = format!("investigation/{}", segment(id));
        self.executor.get(&path).await?.into_json()
    }

    #[tracing::instrument(skip(self))]
    pub async fn investigation_search(&self, query: &SearchQuery) -> Result<Page<Investigation>> {
        self.search_page("investigationsearch/", query).await
    }

    /// Add nodes to an investigation.
    #[tracing::instrument(skip(self, nodes), fields(nodes = nodes.len()))]
    pub async fn investigation_add(&self, id: &str, nodes: &[ObjectRef]) -> Result<Value> {
        let path = format!("investigation/add/{}", segment(id));
        self.executor.post(&path, &nodes_body(nodes)).await?.into_value()
    }

    /// Remove nodes from an investigation.
    #[tracing::instrument(skip(self, nodes), fields(nodes = nodes.len()))]
    pub async fn investigation_remove(&self, id: &str, nodes: &[ObjectRef]) -> Result<Value> {
        let path = format!("investigation/remove/{}", segment(id));
        self.executor.post(&path, &nodes_body(nodes)).await?.into_value()
    }

    #[tracing::instrument(skip(self))]
    pub async fn investigation_delete(&self, id: &str) -> Result<Value> {
        let path = format!("investigation/{}", segment(id));
        self.executor.delete(&path).await?.into_value()
    }
}

/// Nodes as Mongo DBRefs: `{"$id": {"$oid": id}, "$ref": collection}`.
fn nodes_body(nodes: &[ObjectRef]) -> Value {
    let nodes: Vec<Value> = nodes
        .iter()
        .map(|node| json!({"$id": {"$oid": node.id}, "$ref": node.kind.legacy_name()}))
        .collect();
    json!({"links": [], "nodes": nodes})
}
