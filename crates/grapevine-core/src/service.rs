use std::sync::Arc;
use std::time::Duration;

use grapevine_api::{GeocodeClient, Place, RetryConfig};
use grapevine_store::{KeyValueStore, StorageAdapter};
use tracing::{debug, info};

use crate::{
    aggregate::{AggregatedPage, Aggregator, JoinMode},
    analytics::AnalyticsRecorder,
    auth::AuthFlow,
    config::Config,
    feed::IssueFeed,
    fetcher::IssueFetcher,
    filter::apply_filter,
    models::{Issue, SearchFilter},
    providers::GitHubIssueFetcher,
    registry::SourceRegistry,
    saved_filters::SavedFilterStore,
    session::SessionStore,
    Error, Result,
};

/// Everything the app needs, wired from one [`Config`] and one store.
///
/// There is no global state: whoever holds this value owns the registry,
/// the analytics and the session.
pub struct Grapevine {
    config: Config,
    registry: SourceRegistry,
    aggregator: Arc<Aggregator>,
    analytics: AnalyticsRecorder,
    saved_filters: SavedFilterStore,
    session: SessionStore,
    auth: AuthFlow,
    geocoder: GeocodeClient,
}

impl Grapevine {
    /// Wire up with the GitHub fetcher. A token from the config (or
    /// `GITHUB_TOKEN`) wins over one stored by a previous login.
    pub fn init(config: Config, store: Arc<dyn KeyValueStore>) -> Result<Self> {
        let session = SessionStore::new(StorageAdapter::new(store.clone()));
        let token = config.github.token.clone().or_else(|| session.token());

        let retry_config = if config.github.max_retries > 0 {
            RetryConfig {
                max_retries: config.github.max_retries,
                ..RetryConfig::default()
            }
        } else {
            RetryConfig::none()
        };
        let fetcher =
            GitHubIssueFetcher::new(token, &config.github.api_url)?.with_retry_config(retry_config);

        Self::with_fetcher(config, store, Arc::new(fetcher))
    }

    /// Wire up with any fetcher
    pub fn with_fetcher(
        config: Config,
        store: Arc<dyn KeyValueStore>,
        fetcher: Arc<dyn IssueFetcher>,
    ) -> Result<Self> {
        if config.github.per_page == 0 {
            return Err(Error::ConfigError("github.per_page must be at least 1".into()));
        }

        let storage = StorageAdapter::new(store);
        let session = SessionStore::new(storage.clone());
        let mode = if config.feed.partial_results {
            JoinMode::Partial
        } else {
            JoinMode::AllOrNothing
        };

        let grapevine = Self {
            registry: config.registry(),
            aggregator: Arc::new(Aggregator::new(fetcher).with_mode(mode)),
            analytics: AnalyticsRecorder::new(storage.clone()).with_limits(
                config.analytics.max_view_history,
                config.analytics.max_tracked_repos,
            ),
            saved_filters: SavedFilterStore::new(storage),
            auth: AuthFlow::new(config.auth.clone(), session.clone())?,
            session,
            geocoder: GeocodeClient::with_base_url(
                config.geocode.base_url.clone(),
                Duration::from_secs(config.geocode.timeout_secs),
            )?,
            config,
        };

        info!(
            "Grapevine ready: {} source(s), {} categories",
            grapevine.registry.sources().len(),
            grapevine.registry.categories().len()
        );
        Ok(grapevine)
    }

    /// Config with the current registry folded back in, ready to save
    pub fn config(&self) -> Config {
        let mut config = self.config.clone();
        config.store_registry(&self.registry);
        config
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut SourceRegistry {
        &mut self.registry
    }

    pub fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }

    pub fn analytics(&self) -> &AnalyticsRecorder {
        &self.analytics
    }

    pub fn saved_filters(&self) -> &SavedFilterStore {
        &self.saved_filters
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn auth(&self) -> &AuthFlow {
        &self.auth
    }

    /// A feed over `category_id` using the configured page size and auto-expand limits
    pub fn feed(&self, category_id: &str) -> IssueFeed {
        IssueFeed::new(self.aggregator.clone(), self.config.github.per_page)
            .with_category(category_id)
            .with_auto_expand(self.config.feed.min_visible, self.config.feed.max_auto_pages)
    }

    /// One exact page of a category, filtered. The keyword (if any) is
    /// recorded as a search.
    pub async fn fetch_page(
        &self,
        category_id: &str,
        page: u32,
        per_page: u32,
        filter: &SearchFilter,
    ) -> Result<AggregatedPage> {
        if let Some(keyword) = &filter.keyword {
            self.analytics.record_search(keyword);
        }

        let mut result = self
            .aggregator
            .fetch_by_category(&self.registry, category_id, page, per_page)
            .await?;
        if !filter.is_empty() {
            result.issues = apply_filter(&result.issues, filter);
        }
        Ok(result)
    }

    /// Open one issue and record the view
    pub async fn view_issue(&self, source_id: &str, number: u64) -> Result<Issue> {
        let source = self
            .registry
            .get_source(source_id)
            .ok_or_else(|| Error::NotFound(format!("source '{}'", source_id)))?;

        let issue = self.aggregator.fetcher().fetch_issue(source, number).await?;
        self.analytics.record_view(&issue);
        Ok(issue)
    }

    pub async fn locate(&self, lat: f64, lon: f64) -> Result<Place> {
        Ok(self.geocoder.reverse(lat, lon).await?)
    }

    /// Shut down. Pending storage writes are synchronous, so there is
    /// nothing left to flush.
    pub fn dispose(self) {
        debug!("Disposing Grapevine ({} sources)", self.registry.sources().len());
        info!("Grapevine shut down");
    }
}
