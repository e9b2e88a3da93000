//! Graph link management.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::models::{NewLink, ObjectRef};

/// Create, relabel and remove edges between graph nodes.
#[async_trait]
pub trait LinkApi: Send + Sync {
    async fn add_link(&self, link: &NewLink) -> Result<Value>;

    /// Change a link's description (and, on v2, its type).
    async fn update_link(&self, id: &str, link_type: Option<&str>, description: &str) -> Result<Value>;

    async fn delete_links(&self, ids: &[String]) -> Result<()>;

    async fn link_entity_to_observable(
        &self,
        entity_id: &str,
        observable_id: &str,
        description: &str,
    ) -> Result<Value> {
        let link = NewLink::new(ObjectRef::entity(entity_id), ObjectRef::observable(observable_id))
            .with_description(description);
        self.add_link(&link).await
    }

    async fn link_observables(&self, source_id: &str, target_id: &str, description: &str) -> Result<Value> {
        let link = NewLink::new(ObjectRef::observable(source_id), ObjectRef::observable(target_id))
            .with_description(description);
        self.add_link(&link).await
    }

    async fn link_entities(&self, source_id: &str, target_id: &str, description: &str) -> Result<Value> {
        let link = NewLink::new(ObjectRef::entity(source_id), ObjectRef::entity(target_id))
            .with_description(description);
        self.add_link(&link).await
    }
}
