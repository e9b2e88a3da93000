//! Adapter for the v2 Yeti API.
//!
//! V2 endpoints are pluralized (`observables/`, `entities/search`), searches
//! are 0-indexed and return wrapped results, graph links live under `graph/`
//! and the API key travels in `x-yeti-apikey`.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

use crate::client::{segment, Payload, RequestExecutor};
use crate::config::{ApiGeneration, ClientConfig};
use crate::error::{Result, YetiError};
use crate::models::{
    Entity, EntityType, NewEntity, NewLink, NewObservable, ObjectRef, Observable, ObservableType,
    SearchQuery,
};
use crate::pagination::Page;
use crate::traits::{EntityApi, LinkApi, ObservableApi};

/// Client for the v2 Yeti REST API.
#[derive(Debug, Clone)]
pub struct YetiV2Api {
    executor: RequestExecutor,
}

impl YetiV2Api {
    /// Connect to a v2 Yeti instance with an optional API key.
    pub fn new(url: &str, api_key: Option<&str>) -> Result<Self> {
        let mut config = ClientConfig::new(url)?;
        if let Some(key) = api_key {
            config = config.with_api_key(key);
        }
        Self::with_config(config)
    }

    /// Connect with a full configuration. The generation is forced to v2.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let executor = RequestExecutor::new(config.with_generation(ApiGeneration::V2))?;
        Ok(Self { executor })
    }

    pub fn from_env() -> Result<Self> {
        Self::with_config(ClientConfig::from_env()?)
    }

    pub fn from_executor(executor: RequestExecutor) -> Self {
        if executor.generation() != ApiGeneration::V2 {
            tracing::warn!("v2 adapter built on an executor configured for {:?}", executor.generation());
        }
        Self { executor }
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Overwrite fields of a stored observable.
    ///
    /// `fields` is sent as-is under the `observable` key.
    #[tracing::instrument(skip(self, fields))]
    pub async fn patch_observable(&self, id: &str, fields: &Map<String, Value>) -> Result<Observable> {
        #[derive(Serialize)]
        struct PatchBody<'a> {
            observable: &'a Map<String, Value>,
        }

        let path = format!("observables/{}", segment(id));
        self.executor
            .patch(&path, &PatchBody { observable: fields })
            .await?
            .into_json()
    }

    /// Attach a context entry to a stored observable.
    #[tracing::instrument(skip(self, context))]
    pub async fn add_context(
        &self,
        id: &str,
        source: &str,
        context: &Map<String, Value>,
    ) -> Result<Observable> {
        #[derive(Serialize)]
        struct ContextBody<'a> {
            source: &'a str,
            context: &'a Map<String, Value>,
        }

        let path = format!("observables/{}/context", segment(id));
        self.executor
            .post(&path, &ContextBody { source, context })
            .await?
            .into_json()
    }

    async fn search_page<T: DeserializeOwned>(
        &self,
        path: &str,
        key: &'static str,
        query: &SearchQuery,
    ) -> Result<Page<T>> {
        let body = SearchBody::from_query(query);
        let mut wrapper: Map<String, Value> = self.executor.post(path, &body).await?.into_json()?;

        let total = wrapper.get("total").and_then(Value::as_u64);
        let items = wrapper
            .remove(key)
            .ok_or(YetiError::UnexpectedPayload("search response without results"))?;
        let items: Vec<T> = serde_json::from_value(items)?;
        Ok(Page::new(items, query.page, query.count, total))
    }
}

/// V2 type name for an observable.
///
/// V2 splits hashes by algorithm; the algorithm is inferred from the digest
/// length and defaults to sha256.
fn observable_type_name(kind: ObservableType, value: &str) -> &'static str {
    match kind {
        ObservableType::Ip => "ipv4",
        ObservableType::Ipv6 => "ipv6",
        ObservableType::Hostname => "hostname",
        ObservableType::Url => "url",
        ObservableType::Email => "email",
        ObservableType::Hash => match value.len() {
            32 => "md5",
            40 => "sha1",
            _ => "sha256",
        },
        ObservableType::File => "file",
        ObservableType::Text => "generic",
        ObservableType::Asn => "asn",
        ObservableType::MacAddress => "mac_address",
        ObservableType::Path => "path",
        ObservableType::Bitcoin => "bitcoin_wallet",
    }
}

fn entity_type_name(kind: EntityType) -> &'static str {
    match kind {
        EntityType::Actor => "threat-actor",
        EntityType::Malware => "malware",
        EntityType::Campaign => "campaign",
        EntityType::Ttp => "attack-pattern",
        EntityType::Exploit => "exploit",
        EntityType::Company => "identity",
    }
}

/// `"{collection}/{id}"` node handle used by `graph/` endpoints.
fn node_handle(node: &ObjectRef) -> String {
    format!("{}/{}", node.kind.v2_collection(), node.id)
}

#[derive(Debug, Serialize)]
struct ObservableBody<'a> {
    value: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
    tags: &'a [String],
}

impl<'a> From<&'a NewObservable> for ObservableBody<'a> {
    fn from(obs: &'a NewObservable) -> Self {
        Self {
            value: &obs.value,
            kind: obs
                .kind
                .map_or("generic", |kind| observable_type_name(kind, &obs.value)),
            tags: &obs.tags,
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
struct EntityFields<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'a str,
    tags: &'a [String],
    description: Option<&'a str>,
    aliases: Option<&'a [String]>,
    kill_chain_phases: Option<Vec<&'a str>>,
}

impl<'a> From<&'a NewEntity> for EntityFields<'a> {
    fn from(entity: &'a NewEntity) -> Self {
        Self {
            kind: entity_type_name(entity.kind),
            name: &entity.name,
            tags: &entity.tags,
            description: entity.description.as_deref(),
            aliases: (!entity.aliases.is_empty()).then_some(entity.aliases.as_slice()),
            kill_chain_phases: entity.killchain.as_deref().map(|phase| vec![phase]),
        }
    }
}

/// `{query: {...}, type?, count, page}` with a 0-based page.
#[skip_serializing_none]
#[derive(Debug, Serialize)]
struct SearchBody<'a> {
    query: &'a Map<String, Value>,
    #[serde(rename = "type")]
    kind: Option<&'a str>,
    count: u32,
    page: u32,
}

impl<'a> SearchBody<'a> {
    fn from_query(query: &'a SearchQuery) -> Self {
        Self {
            query: &query.filter,
            kind: query.kind.as_deref(),
            count: query.count,
            page: ApiGeneration::V2.wire_page(query.page),
        }
    }
}

/// Bulk responses are either a bare list or `{added: [...], failed: [...]}`.
#[derive(Deserialize)]
#[serde(untagged)]
enum BulkResponse {
    List(Vec<Observable>),
    Wrapped {
        #[serde(default)]
        added: Vec<Observable>,
        #[serde(default)]
        failed: Vec<Value>,
    },
}

#[async_trait]
impl ObservableApi for YetiV2Api {
    #[tracing::instrument(skip(self, observable), fields(value = %observable.value))]
    async fn add_observable(&self, observable: &NewObservable) -> Result<Observable> {
        let created: Observable = self
            .executor
            .post("observables/", &ObservableBody::from(observable))
            .await?
            .into_json()?;

        if observable.context.is_empty() {
            return Ok(created);
        }
        self.add_context(&created.id, &observable.source, &observable.context)
            .await
    }

    #[tracing::instrument(skip(self, observables), fields(count = observables.len()))]
    async fn bulk_add_observables(&self, observables: &[NewObservable]) -> Result<Vec<Observable>> {
        #[derive(Serialize)]
        struct BulkBody<'a> {
            observables: Vec<ObservableBody<'a>>,
        }

        let body = BulkBody {
            observables: observables.iter().map(ObservableBody::from).collect(),
        };
        let response: BulkResponse = self.executor.post("observables/bulk", &body).await?.into_json()?;
        match response {
            BulkResponse::List(added) => Ok(added),
            BulkResponse::Wrapped { added, failed } => {
                if !failed.is_empty() {
                    tracing::warn!(failed = failed.len(), "bulk add rejected some observables");
                }
                Ok(added)
            }
        }
    }

    #[tracing::instrument(skip(self))]
    async fn observable(&self, id: &str) -> Result<Observable> {
        let path = format!("observables/{}", segment(id));
        self.executor.get(&path).await?.into_json()
    }

    /// Tags are merged with existing ones; the updated observable is re-read.
    #[tracing::instrument(skip(self))]
    async fn tag_observable(&self, id: &str, tags: &[String]) -> Result<Observable> {
        #[derive(Serialize)]
        struct TagBody<'a> {
            ids: [&'a str; 1],
            tags: &'a [String],
            strict: bool,
        }

        let body = TagBody {
            ids: [id],
            tags,
            strict: false,
        };
        self.executor.post("observables/tag", &body).await?;
        self.observable(id).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_observable(&self, id: &str) -> Result<Value> {
        let path = format!("observables/{}", segment(id));
        // v2 answers deletes with an empty body
        match self.executor.delete(&path).await? {
            Payload::Json(value) => Ok(value),
            Payload::Binary(_) => Ok(Value::Null),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn search_observables_page(&self, query: &SearchQuery) -> Result<Page<Observable>> {
        self.search_page("observables/search", "observables", query).await
    }
}

#[async_trait]
impl EntityApi for YetiV2Api {
    #[tracing::instrument(skip(self, entity), fields(name = %entity.name, kind = %entity.kind))]
    async fn add_entity(&self, entity: &NewEntity) -> Result<Entity> {
        #[derive(Serialize)]
        struct EntityBody<'a> {
            entity: EntityFields<'a>,
        }

        let body = EntityBody {
            entity: EntityFields::from(entity),
        };
        self.executor.post("entities/", &body).await?.into_json()
    }

    #[tracing::instrument(skip(self))]
    async fn entity(&self, id: &str) -> Result<Entity> {
        let path = format!("entities/{}", segment(id));
        self.executor.get(&path).await?.into_json()
    }

    #[tracing::instrument(skip(self))]
    async fn delete_entity(&self, id: &str) -> Result<Value> {
        let path = format!("entities/{}", segment(id));
        match self.executor.delete(&path).await? {
            Payload::Json(value) => Ok(value),
            Payload::Binary(_) => Ok(Value::Null),
        }
    }

    #[tracing::instrument(skip(self))]
    async fn search_entities_page(&self, query: &SearchQuery) -> Result<Page<Entity>> {
        self.search_page("entities/search", "entities", query).await
    }
}

#[async_trait]
impl LinkApi for YetiV2Api {
    #[tracing::instrument(skip(self, link))]
    async fn add_link(&self, link: &NewLink) -> Result<Value> {
        #[derive(Serialize)]
        struct GraphBody<'a> {
            source: String,
            target: String,
            link_type: &'a str,
            description: &'a str,
        }

        let body = GraphBody {
            source: node_handle(&link.source),
            target: node_handle(&link.target),
            link_type: link.link_type.as_deref().unwrap_or("related-to"),
            description: link.description.as_deref().unwrap_or_default(),
        };
        self.executor.post("graph/add", &body).await?.into_value()
    }

    #[tracing::instrument(skip(self))]
    async fn update_link(&self, id: &str, link_type: Option<&str>, description: &str) -> Result<Value> {
        #[skip_serializing_none]
        #[derive(Serialize)]
        struct UpdateBody<'a> {
            link_type: Option<&'a str>,
            description: &'a str,
        }

        let path = format!("graph/{}", segment(id));
        self.executor
            .patch(&path, &UpdateBody { link_type, description })
            .await?
            .into_value()
    }

    /// V2 deletes links one at a time; stops at the first failure.
    #[tracing::instrument(skip(self))]
    async fn delete_links(&self, ids: &[String]) -> Result<()> {
        for id in ids {
            let path = format!("graph/{}", segment(id));
            self.executor.delete(&path).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_hash_type_follows_digest_length() {
        assert_eq!(observable_type_name(ObservableType::Hash, &"a".repeat(32)), "md5");
        assert_eq!(observable_type_name(ObservableType::Hash, &"a".repeat(40)), "sha1");
        assert_eq!(observable_type_name(ObservableType::Hash, &"a".repeat(64)), "sha256");
        assert_eq!(observable_type_name(ObservableType::Ip, "127.0.0.1"), "ipv4");
    }

    #[test]
    fn test_untyped_observable_is_generic() {
        let obs = NewObservable::new("some text").with_tags(["x"]);
        let body = serde_json::to_value(ObservableBody::from(&obs)).unwrap();
        assert_eq!(body, json!({"value": "some text", "type": "generic", "tags": ["x"]}));
    }

    #[test]
    fn test_search_body_is_zero_based() {
        let query = SearchQuery::new().filter("value", "test").kind("hostname").count(10);
        let body = serde_json::to_value(SearchBody::from_query(&query)).unwrap();
        assert_eq!(
            body,
            json!({"query": {"value": "test"}, "type": "hostname", "count": 10, "page": 0})
        );
    }

    #[test]
    fn test_entity_fields_carry_kill_chain() {
        let ttp = NewEntity::new(EntityType::Ttp, "spearphishing").with_killchain("delivery");
        let body = serde_json::to_value(EntityFields::from(&ttp)).unwrap();
        assert_eq!(
            body,
            json!({
                "type": "attack-pattern",
                "name": "spearphishing",
                "tags": [],
                "kill_chain_phases": ["delivery"]
            })
        );
    }

    #[test]
    fn test_node_handle() {
        assert_eq!(node_handle(&ObjectRef::entity("e1")), "entities/e1");
        assert_eq!(node_handle(&ObjectRef::observable("o1")), "observables/o1");
    }
}
