//! Oneshot analytics, analytics settings and indicator neighbors.

use serde::Serialize;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use super::YetiApi;
use crate::client::segment;
use crate::error::{Result, YetiError};
use crate::models::{Entity, Observable, OneshotInstance, OneshotJob, OneshotStatus};
use crate::polling::{poll_until_terminal, PollOptions};

impl YetiApi {
    /// List the oneshot analytics available on the server.
    #[tracing::instrument(skip(self))]
    pub async fn oneshot_analytics(&self) -> Result<Vec<OneshotJob>> {
        self.executor.get("analytics/oneshot").await?.into_json()
    }

    /// Find a oneshot analytic by its display name.
    pub async fn get_analytic_oneshot(&self, name: &str) -> Result<Option<OneshotJob>> {
        let jobs = self.oneshot_analytics().await?;
        Ok(jobs.into_iter().find(|job| job.name == name))
    }

    /// Submit a oneshot run without waiting for it.
    #[tracing::instrument(skip(self, job, observable), fields(job = %job.name, observable = %observable.id))]
    pub async fn oneshot_run(&self, job: &OneshotJob, observable: &Observable) -> Result<OneshotInstance> {
        #[derive(Serialize)]
        struct RunBody<'a> {
            id: &'a str,
        }

        let path = format!("analytics/oneshot/{}/run", segment(&job.id));
        self.executor
            .post(&path, &RunBody { id: &observable.id })
            .await?
            .into_json()
    }

    /// Current state of a oneshot run.
    #[tracing::instrument(skip(self))]
    pub async fn oneshot_status(&self, instance_id: &str) -> Result<OneshotInstance> {
        let path = format!("analytics/oneshot/{}/status", segment(instance_id));
        self.executor.get(&path).await?.into_json()
    }

    /// Run a oneshot analytic and wait for its results with default bounds.
    ///
    /// Equivalent to [`analytics_oneshot_run_with`](Self::analytics_oneshot_run_with)
    /// with [`PollOptions::default`] and a token nobody cancels.
    pub async fn analytics_oneshot_run(&self, job: &OneshotJob, observable: &Observable) -> Result<Value> {
        self.analytics_oneshot_run_with(job, observable, &PollOptions::default(), &CancellationToken::new())
            .await
    }

    /// Run a oneshot analytic and poll until it finishes.
    ///
    /// # Errors
    ///
    /// - [`YetiError::JobFailed`] if the run ends in any state but `finished`
    /// - [`YetiError::PollTimeout`] / [`YetiError::Cancelled`] from the poll loop
    pub async fn analytics_oneshot_run_with(
        &self,
        job: &OneshotJob,
        observable: &Observable,
        options: &PollOptions,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        let submitted = self.oneshot_run(job, observable).await?;
        let api = self;
        let done = poll_until_terminal(submitted, options, cancel, move |id| async move {
            api.oneshot_status(&id).await
        })
        .await?;

        match done.status {
            OneshotStatus::Finished => Ok(done.results),
            status => {
                tracing::error!(job = %job.name, id = %done.id, %status, "oneshot run failed");
                Err(YetiError::JobFailed {
                    id: done.id,
                    status: status.to_string(),
                })
            }
        }
    }

    /// Store per-user analytics settings (third-party API keys and the like).
    #[tracing::instrument(skip(self, settings))]
    pub async fn add_analytics_settings(&self, settings: &Map<String, Value>) -> Result<Value> {
        self.executor.post("user/settings", settings).await?.into_value()
    }

    /// Indicators linked to an entity.
    #[tracing::instrument(skip(self, filter))]
    pub async fn related_indicators(
        &self,
        kind: &str,
        id: &str,
        filter: &Map<String, Value>,
    ) -> Result<Value> {
        #[derive(Serialize)]
        struct NeighborsBody<'a> {
            filter: &'a Map<String, Value>,
        }

        let path = format!("neighbors/tuples/{}/{}/indicator", segment(kind), segment(id));
        self.executor
            .post(&path, &NeighborsBody { filter })
            .await?
            .into_value()
    }

    /// Indicators linked to an entity, with no extra filter.
    pub async fn entity_indicators(&self, entity: &Entity) -> Result<Value> {
        let kind = entity.kind.as_deref().ok_or_else(|| {
            YetiError::InvalidArgument(format!("entity '{}' has no type", entity.id))
        })?;
        self.related_indicators(kind, &entity.id, &Map::new()).await
    }
}
