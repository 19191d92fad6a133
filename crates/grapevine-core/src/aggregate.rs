// Multi-source aggregation: one fetch per active source, merged into one list
use std::collections::HashSet;
use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use tracing::{debug, info, warn};

use crate::{
    fetcher::{IssueFetcher, IssuePage},
    models::{Issue, Source},
    registry::SourceRegistry,
    Error, Result,
};

/// What to do when some sources fail and others succeed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JoinMode {
    /// Any failing source fails the whole aggregate
    #[default]
    AllOrNothing,
    /// Keep what arrived; fail only if every source failed
    Partial,
}

/// A source that failed during a partial join
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFailure {
    pub source_id: String,
    pub message: String,
}

/// Merged page across sources
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggregatedPage {
    /// Sorted by `updated_at`, newest first
    pub issues: Vec<Issue>,
    /// Sum of the per-source estimates. Advisory only.
    pub total_count: u64,
    /// At least one source returned a full page
    pub has_more: bool,
    /// Always empty in [`JoinMode::AllOrNothing`]
    pub failures: Vec<SourceFailure>,
}

/// Fetches a category's active sources concurrently and merges the results
pub struct Aggregator {
    fetcher: Arc<dyn IssueFetcher>,
    mode: JoinMode,
}

impl Aggregator {
    pub fn new(fetcher: Arc<dyn IssueFetcher>) -> Self {
        Self {
            fetcher,
            mode: JoinMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: JoinMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> JoinMode {
        self.mode
    }

    pub fn fetcher(&self) -> &Arc<dyn IssueFetcher> {
        &self.fetcher
    }

    /// Fetch `page` of every active source in `category_id` ("all" for every
    /// active source) and merge them.
    pub async fn fetch_by_category(
        &self,
        registry: &SourceRegistry,
        category_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<AggregatedPage> {
        let sources = registry.active_sources_for(category_id);
        if sources.is_empty() {
            debug!("No active sources in category '{}'", category_id);
            return Ok(AggregatedPage::default());
        }

        self.fetch_sources(&sources, page, per_page).await
    }

    /// Same as [`Self::fetch_by_category`] for an explicit source list
    pub async fn fetch_sources(
        &self,
        sources: &[&Source],
        page: u32,
        per_page: u32,
    ) -> Result<AggregatedPage> {
        if sources.is_empty() {
            return Ok(AggregatedPage::default());
        }

        info!(
            "Fetching page {} from {} source(s) ({:?})",
            page,
            sources.len(),
            self.mode
        );

        // Requests go out together; arrival order doesn't matter because of the sort below
        let fetches = sources
            .iter()
            .map(|source| self.fetcher.fetch_issues(source, page, per_page));

        let mut failures = Vec::new();
        let pages: Vec<IssuePage> = match self.mode {
            JoinMode::AllOrNothing => try_join_all(fetches).await?,
            JoinMode::Partial => {
                let results = join_all(fetches).await;
                let mut pages = Vec::new();
                let mut last_error: Option<Error> = None;

                for (source, result) in sources.iter().zip(results) {
                    match result {
                        Ok(page) => pages.push(page),
                        Err(e) => {
                            warn!("Source '{}' failed: {}", source.id, e);
                            failures.push(SourceFailure {
                                source_id: source.id.clone(),
                                message: e.to_string(),
                            });
                            last_error = Some(e);
                        }
                    }
                }

                if pages.is_empty() {
                    if let Some(e) = last_error {
                        return Err(e);
                    }
                }
                pages
            }
        };

        Ok(merge_pages(pages, per_page, failures))
    }
}

/// Concatenate, sum totals, stable-sort by recency and drop repeated
/// `(source, number)` pairs.
pub fn merge_pages(
    pages: Vec<IssuePage>,
    per_page: u32,
    failures: Vec<SourceFailure>,
) -> AggregatedPage {
    let has_more = pages.iter().any(|p| p.is_full(per_page));
    let total_count = pages.iter().map(|p| p.total_count).sum();

    let mut issues: Vec<Issue> = pages.into_iter().flat_map(|p| p.issues).collect();
    issues.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

    let mut seen = HashSet::new();
    issues.retain(|issue| seen.insert(issue.merge_key()));

    AggregatedPage {
        issues,
        total_count,
        has_more,
        failures,
    }
}
