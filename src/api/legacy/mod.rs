//! Adapter for the legacy Yeti API.
//!
//! Legacy endpoints are flat (`observable/`, `entitysearch/`, ...), searches
//! are 1-indexed and the API key travels in `X-Api-Key`.

mod analytics;
mod files;
mod investigations;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

use crate::client::{segment, RequestExecutor};
use crate::config::{ApiGeneration, ClientConfig};
use crate::error::Result;
use crate::models::{
    AnalysisMatch, Entity, EntityType, NewEntity, NewLink, NewObservable, Observable,
    ObservableType, SearchQuery,
};
use crate::pagination::Page;
use crate::traits::{EntityApi, LinkApi, ObservableApi};

/// Client for the legacy Yeti REST API.
///
/// # Example
///
/// ```no_run
/// use yetiapi::{ObservableApi, YetiApi};
///
/// # async fn example() -> yetiapi::Result<()> {
/// let api = YetiApi::new("http://localhost:5000/api", Some("my-api-key"))?;
/// let obs = api.add_hostname("evil.example.com", &["c2"]).await?;
/// let details = api.observable(&obs.id).await?;
/// assert_eq!(details.value, "evil.example.com");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct YetiApi {
    executor: RequestExecutor,
}

impl YetiApi {
    /// Connect to a legacy Yeti instance with an optional API key.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the HTTP client cannot be built.
    pub fn new(url: &str, api_key: Option<&str>) -> Result<Self> {
        let mut config = ClientConfig::new(url)?;
        if let Some(key) = api_key {
            config = config.with_api_key(key);
        }
        Self::with_config(config)
    }

    /// Connect with a full configuration. The generation is forced to legacy.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let executor = RequestExecutor::new(config.with_generation(ApiGeneration::Legacy))?;
        Ok(Self { executor })
    }

    /// Connect using `YETI_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::with_config(ClientConfig::from_env()?)
    }

    /// Wrap an existing executor.
    pub fn from_executor(executor: RequestExecutor) -> Self {
        if executor.generation() != ApiGeneration::Legacy {
            tracing::warn!("legacy adapter built on an executor configured for {:?}", executor.generation());
        }
        Self { executor }
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    /// Issue an empty observable search to verify URL and credentials.
    #[tracing::instrument(skip(self))]
    pub async fn check_connection(&self) -> Result<()> {
        match self.executor.post("observablesearch/", &Map::new()).await {
            Ok(_) => {
                tracing::debug!(url = %self.executor.base_url(), "connection successful");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(url = %self.executor.base_url(), error = %e, "connection failed");
                Err(e)
            }
        }
    }

    /// Match raw values against stored observables and indicators.
    #[tracing::instrument(skip(self))]
    pub async fn analysis_match(&self, values: &[&str]) -> Result<AnalysisMatch> {
        #[derive(Serialize)]
        struct MatchBody<'a> {
            observables: &'a [&'a str],
        }

        self.executor
            .post("analysis/match", &MatchBody { observables: values })
            .await?
            .into_json()
    }

    /// Add tags and context to an existing observable.
    ///
    /// Posts to `observable/` with the id set, which the server treats as an
    /// update rather than a creation.
    pub async fn observable_change(
        &self,
        id: &str,
        tags: &[String],
        context: &Map<String, Value>,
    ) -> Result<Observable> {
        self.change(id, tags, context).await
    }

    #[tracing::instrument(skip(self, context))]
    async fn change<T: DeserializeOwned>(
        &self,
        id: &str,
        tags: &[String],
        context: &Map<String, Value>,
    ) -> Result<T> {
        #[derive(Serialize)]
        struct ChangeBody<'a> {
            id: &'a str,
            tags: &'a [String],
            context: &'a Map<String, Value>,
        }

        let result = self
            .executor
            .post("observable/", &ChangeBody { id, tags, context })
            .await?
            .into_json()?;
        Ok(result)
    }

    /// One page of any legacy `*search/` endpoint.
    async fn search_page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &SearchQuery,
    ) -> Result<Page<T>> {
        let body = SearchBody::from_query(query);
        let items: Vec<T> = self.executor.post(path, &body).await?.into_json()?;
        Ok(Page::new(items, query.page, query.count, None))
    }
}

/// Legacy class name for an observable type.
fn observable_type_name(kind: ObservableType) -> &'static str {
    match kind {
        ObservableType::Ip | ObservableType::Ipv6 => "Ip",
        ObservableType::Hostname => "Hostname",
        ObservableType::Url => "Url",
        ObservableType::Email => "Email",
        ObservableType::Hash => "Hash",
        ObservableType::File => "File",
        ObservableType::Text => "Text",
        ObservableType::Asn => "AutonomousSystem",
        ObservableType::MacAddress => "MacAddress",
        ObservableType::Path => "Path",
        ObservableType::Bitcoin => "Bitcoin",
    }
}

/// Legacy class name for an entity type.
fn entity_type_name(kind: EntityType) -> &'static str {
    match kind {
        EntityType::Actor => "Actor",
        EntityType::Malware => "Malware",
        EntityType::Campaign => "Campaign",
        EntityType::Ttp => "TTP",
        EntityType::Exploit => "Exploit",
        EntityType::Company => "Company",
    }
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
struct ObservableBody<'a> {
    value: &'a str,
    tags: &'a [String],
    context: &'a Map<String, Value>,
    source: &'a str,
    description: Option<&'a str>,
    #[serde(rename = "type")]
    kind: Option<&'static str>,
}

impl<'a> From<&'a NewObservable> for ObservableBody<'a> {
    fn from(obs: &'a NewObservable) -> Self {
        Self {
            value: &obs.value,
            tags: &obs.tags,
            context: &obs.context,
            source: &obs.source,
            description: obs.description.as_deref(),
            kind: obs.kind.map(observable_type_name),
        }
    }
}

#[skip_serializing_none]
#[derive(Debug, Serialize)]
struct EntityBody<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    name: &'a str,
    tags: &'a [String],
    description: Option<&'a str>,
    aliases: Option<&'a [String]>,
    killchain: Option<&'a str>,
}

impl<'a> From<&'a NewEntity> for EntityBody<'a> {
    fn from(entity: &'a NewEntity) -> Self {
        Self {
            kind: entity_type_name(entity.kind),
            name: &entity.name,
            tags: &entity.tags,
            description: entity.description.as_deref(),
            aliases: (!entity.aliases.is_empty()).then_some(entity.aliases.as_slice()),
            killchain: entity.killchain.as_deref(),
        }
    }
}

/// `{filter: {...}, params: {page, range, regex}}` with a 1-based page.
#[derive(Debug, Serialize)]
struct SearchBody {
    filter: Map<String, Value>,
    params: SearchParams,
}

#[derive(Debug, Serialize)]
struct SearchParams {
    page: u32,
    range: u32,
    regex: bool,
}

impl SearchBody {
    fn from_query(query: &SearchQuery) -> Self {
        let mut filter = query.filter.clone();
        if let Some(kind) = &query.kind {
            filter.insert("type".to_string(), Value::String(kind.clone()));
        }
        Self {
            filter,
            params: SearchParams {
                page: ApiGeneration::Legacy.wire_page(query.page),
                range: query.count,
                regex: query.regex,
            },
        }
    }
}

#[async_trait]
impl ObservableApi for YetiApi {
    #[tracing::instrument(skip(self, observable), fields(value = %observable.value))]
    async fn add_observable(&self, observable: &NewObservable) -> Result<Observable> {
        self.executor
            .post("observable/", &ObservableBody::from(observable))
            .await?
            .into_json()
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
        self.executor.post("observable/bulk", &body).await?.into_json()
    }

    #[tracing::instrument(skip(self))]
    async fn observable(&self, id: &str) -> Result<Observable> {
        let path = format!("observable/{}", segment(id));
        self.executor.get(&path).await?.into_json()
    }

    async fn tag_observable(&self, id: &str, tags: &[String]) -> Result<Observable> {
        self.change(id, tags, &Map::new()).await
    }

    #[tracing::instrument(skip(self))]
    async fn delete_observable(&self, id: &str) -> Result<Value> {
        let path = format!("observable/{}", segment(id));
        self.executor.delete(&path).await?.into_value()
    }

    #[tracing::instrument(skip(self))]
    async fn search_observables_page(&self, query: &SearchQuery) -> Result<Page<Observable>> {
        self.search_page("observablesearch/", query).await
    }
}

#[async_trait]
impl EntityApi for YetiApi {
    #[tracing::instrument(skip(self, entity), fields(name = %entity.name, kind = %entity.kind))]
    async fn add_entity(&self, entity: &NewEntity) -> Result<Entity> {
        self.executor
            .post("entity/", &EntityBody::from(entity))
            .await?
            .into_json()
    }

    #[tracing::instrument(skip(self))]
    async fn entity(&self, id: &str) -> Result<Entity> {
        let path = format!("entity/{}", segment(id));
        self.executor.get(&path).await?.into_json()
    }

    #[tracing::instrument(skip(self))]
    async fn delete_entity(&self, id: &str) -> Result<Value> {
        let path = format!("entity/{}", segment(id));
        self.executor.delete(&path).await?.into_value()
    }

    #[tracing::instrument(skip(self))]
    async fn search_entities_page(&self, query: &SearchQuery) -> Result<Page<Entity>> {
        self.search_page("entitysearch/", query).await
    }
}

#[async_trait]
impl LinkApi for YetiApi {
    #[tracing::instrument(skip(self, link))]
    async fn add_link(&self, link: &NewLink) -> Result<Value> {
        #[skip_serializing_none]
        #[derive(Serialize)]
        struct LinkBody<'a> {
            source: &'a crate::models::ObjectRef,
            target: &'a crate::models::ObjectRef,
            description: Option<&'a str>,
        }

        let body = LinkBody {
            source: &link.source,
            target: &link.target,
            description: link.description.as_deref(),
        };
        self.executor.post("link/", &body).await?.into_value()
    }

    /// Legacy servers derive the link type themselves; `link_type` is ignored.
    #[tracing::instrument(skip(self))]
    async fn update_link(&self, id: &str, _link_type: Option<&str>, description: &str) -> Result<Value> {
        #[derive(Serialize)]
        struct UpdateBody<'a> {
            description: &'a str,
        }

        let path = format!("link/{}", segment(id));
        self.executor
            .patch(&path, &UpdateBody { description })
            .await?
            .into_value()
    }

    #[tracing::instrument(skip(self))]
    async fn delete_links(&self, ids: &[String]) -> Result<()> {
        #[derive(Serialize)]
        struct DeleteBody<'a> {
            ids: &'a [String],
        }

        self.executor.delete_with_body("link/", &DeleteBody { ids }).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_observable_body_shape() {
        let obs = NewObservable::typed(ObservableType::Hostname, "test.com")
            .with_tags(["asd"])
            .with_context("note", "x");
        let body = serde_json::to_value(ObservableBody::from(&obs)).unwrap();

        assert_eq!(
            body,
            json!({
                "value": "test.com",
                "tags": ["asd"],
                "context": {"note": "x"},
                "source": "API",
                "type": "Hostname"
            })
        );
    }

    #[test]
    fn test_untyped_observable_body_has_no_type() {
        let body = serde_json::to_value(ObservableBody::from(&NewObservable::new("x"))).unwrap();
        assert!(body.get("type").is_none());
        assert!(body.get("description").is_none());
        assert_eq!(body["tags"], json!([]));
        assert_eq!(body["context"], json!({}));
    }

    #[test]
    fn test_search_body_is_one_based() {
        let query = SearchQuery::new().filter("value", "test").regex(true).count(10);
        let body = serde_json::to_value(SearchBody::from_query(&query)).unwrap();
        assert_eq!(
            body,
            json!({
                "filter": {"value": "test"},
                "params": {"page": 1, "range": 10, "regex": true}
            })
        );

        let body = serde_json::to_value(SearchBody::from_query(&query.page(2))).unwrap();
        assert_eq!(body["params"]["page"], 3);
    }

    #[test]
    fn test_entity_body_shape() {
        let ttp = NewEntity::new(EntityType::Ttp, "test_ttp")
            .with_killchain("toto")
            .with_tags(["asd"]);
        let body = serde_json::to_value(EntityBody::from(&ttp)).unwrap();
        assert_eq!(
            body,
            json!({"type": "TTP", "name": "test_ttp", "tags": ["asd"], "killchain": "toto"})
        );
    }
}
