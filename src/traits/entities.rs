//! Entity operations shared by both API generations.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::models::{Entity, EntityType, NewEntity, SearchQuery};
use crate::pagination::Page;

/// Entity CRUD and search.
#[async_trait]
pub trait EntityApi: Send + Sync {
    /// Create an entity and return it as stored by the server.
    async fn add_entity(&self, entity: &NewEntity) -> Result<Entity>;

    /// Fetch an entity by id.
    async fn entity(&self, id: &str) -> Result<Entity>;

    async fn delete_entity(&self, id: &str) -> Result<Value>;

    /// Fetch one page of matching entities.
    async fn search_entities_page(&self, query: &SearchQuery) -> Result<Page<Entity>>;

    async fn search_entities(&self, query: &SearchQuery) -> Result<Vec<Entity>> {
        Ok(self.search_entities_page(query).await?.items)
    }

    /// Create a named entity of the given type with tags.
    async fn add_named(&self, kind: EntityType, name: &str, tags: &[&str]) -> Result<Entity> {
        self.add_entity(&NewEntity::new(kind, name).with_tags(tags.iter().copied()))
            .await
    }

    async fn add_actor(&self, name: &str, tags: &[&str]) -> Result<Entity> {
        self.add_named(EntityType::Actor, name, tags).await
    }

    async fn add_malware(&self, name: &str, tags: &[&str]) -> Result<Entity> {
        self.add_named(EntityType::Malware, name, tags).await
    }

    async fn add_campaign(&self, name: &str, tags: &[&str]) -> Result<Entity> {
        self.add_named(EntityType::Campaign, name, tags).await
    }

    async fn add_ttp(&self, name: &str, killchain: &str, tags: &[&str]) -> Result<Entity> {
        let ttp = NewEntity::new(EntityType::Ttp, name)
            .with_killchain(killchain)
            .with_tags(tags.iter().copied());
        self.add_entity(&ttp).await
    }

    async fn add_exploit(&self, name: &str, tags: &[&str]) -> Result<Entity> {
        self.add_named(EntityType::Exploit, name, tags).await
    }

    async fn add_company(&self, name: &str, tags: &[&str]) -> Result<Entity> {
        self.add_named(EntityType::Company, name, tags).await
    }
}
