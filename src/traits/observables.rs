//! Observable operations shared by both API generations.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::models::{NewObservable, Observable, ObservableType, SearchQuery};
use crate::pagination::Page;

/// Maximum pages to fetch (safety limit).
const MAX_PAGES: u32 = 1000;

/// Observable CRUD and search.
///
/// Implemented by [`YetiApi`](crate::YetiApi) and
/// [`YetiV2Api`](crate::YetiV2Api); each maps the calls onto its own
/// endpoints and body shapes.
///
/// # Example
///
/// ```ignore
/// use yetiapi::{ObservableApi, SearchQuery, YetiApi};
///
/// let api = YetiApi::from_env()?;
/// let obs = api.add_hostname("evil.example.com", &["c2"]).await?;
/// let same = api.observable(&obs.id).await?;
/// let hits = api.search_observables(&SearchQuery::new().filter("tags", "c2")).await?;
/// ```
#[async_trait]
pub trait ObservableApi: Send + Sync {
    /// Create an observable and return it as stored by the server.
    async fn add_observable(&self, observable: &NewObservable) -> Result<Observable>;

    /// Create several observables in one request.
    ///
    /// The server answers with one observable per input, in input order.
    async fn bulk_add_observables(&self, observables: &[NewObservable]) -> Result<Vec<Observable>>;

    /// Fetch an observable by id.
    ///
    /// # Errors
    ///
    /// A missing observable surfaces as an upstream 404
    /// (see [`YetiError::is_not_found`](crate::YetiError::is_not_found)).
    async fn observable(&self, id: &str) -> Result<Observable>;

    /// Add tags to an existing observable.
    async fn tag_observable(&self, id: &str, tags: &[String]) -> Result<Observable>;

    /// Delete an observable. Returns the server's acknowledgement.
    async fn delete_observable(&self, id: &str) -> Result<Value>;

    /// Fetch one page of matching observables.
    async fn search_observables_page(&self, query: &SearchQuery) -> Result<Page<Observable>>;

    /// Matching observables on the query's page.
    async fn search_observables(&self, query: &SearchQuery) -> Result<Vec<Observable>> {
        Ok(self.search_observables_page(query).await?.items)
    }

    /// All matching observables, starting at the query's page and following
    /// pages until a short one comes back.
    async fn search_all_observables(&self, query: &SearchQuery) -> Result<Vec<Observable>> {
        let mut all_items = Vec::new();
        let mut query = query.clone();
        let first_page = query.page;

        loop {
            let result = self.search_observables_page(&query).await?;
            let has_more = result.has_more;
            all_items.extend(result.items);

            if !has_more {
                break;
            }
            query = query.next_page();

            if query.page - first_page >= MAX_PAGES {
                tracing::warn!("Reached pagination limit of {} pages, stopping", MAX_PAGES);
                break;
            }
        }

        Ok(all_items)
    }

    /// Create an observable of a known type.
    async fn add_typed(&self, kind: ObservableType, value: &str, tags: &[&str]) -> Result<Observable> {
        let observable = NewObservable::typed(kind, value).with_tags(tags.iter().copied());
        self.add_observable(&observable).await
    }

    async fn add_ip(&self, value: &str, tags: &[&str]) -> Result<Observable> {
        self.add_typed(ObservableType::Ip, value, tags).await
    }

    async fn add_ipv6(&self, value: &str, tags: &[&str]) -> Result<Observable> {
        self.add_typed(ObservableType::Ipv6, value, tags).await
    }

    async fn add_hostname(&self, value: &str, tags: &[&str]) -> Result<Observable> {
        self.add_typed(ObservableType::Hostname, value, tags).await
    }

    async fn add_url(&self, value: &str, tags: &[&str]) -> Result<Observable> {
        self.add_typed(ObservableType::Url, value, tags).await
    }

    async fn add_email(&self, value: &str, tags: &[&str]) -> Result<Observable> {
        self.add_typed(ObservableType::Email, value, tags).await
    }

    async fn add_hash(&self, value: &str, tags: &[&str]) -> Result<Observable> {
        self.add_typed(ObservableType::Hash, value, tags).await
    }

    /// Register a file observable by name, without uploading content.
    async fn add_file_observable(&self, value: &str, tags: &[&str]) -> Result<Observable> {
        self.add_typed(ObservableType::File, value, tags).await
    }

    async fn add_text(&self, value: &str, tags: &[&str]) -> Result<Observable> {
        self.add_typed(ObservableType::Text, value, tags).await
    }
}
