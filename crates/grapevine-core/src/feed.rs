use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::{
    aggregate::Aggregator,
    filter::apply_filter,
    models::{Issue, SearchFilter, ALL_CATEGORY},
    pagination::{LoadMoreController, LoadState},
    registry::SourceRegistry,
    throttle::Throttle,
    Result,
};

/// Default lower bound of filtered results before the feed stops paging on its own
pub const DEFAULT_MIN_VISIBLE: usize = 5;
pub const DEFAULT_MAX_AUTO_PAGES: u32 = 10;
pub const DEFAULT_SCROLL_THROTTLE: Duration = Duration::from_millis(500);

/// A category listing as the user sees it: the pages loaded so far, seen
/// through the active filter.
///
/// When the filter leaves fewer than `min_visible` issues on screen the feed
/// keeps pulling pages by itself, until either enough issues show up, the
/// sources run dry or `max_auto_pages` extra pages have been fetched.
pub struct IssueFeed {
    aggregator: Arc<Aggregator>,
    category_id: String,
    filter: SearchFilter,
    controller: LoadMoreController,
    scroll_throttle: Throttle,
    min_visible: usize,
    max_auto_pages: u32,
}

impl IssueFeed {
    pub fn new(aggregator: Arc<Aggregator>, per_page: u32) -> Self {
        Self {
            aggregator,
            category_id: ALL_CATEGORY.to_string(),
            filter: SearchFilter::default(),
            controller: LoadMoreController::new(per_page),
            scroll_throttle: Throttle::new(DEFAULT_SCROLL_THROTTLE),
            min_visible: DEFAULT_MIN_VISIBLE,
            max_auto_pages: DEFAULT_MAX_AUTO_PAGES,
        }
    }

    pub fn with_category(mut self, category_id: &str) -> Self {
        self.category_id = category_id.to_string();
        self
    }

    pub fn with_filter(mut self, filter: SearchFilter) -> Self {
        self.filter = filter;
        self
    }

    pub fn with_auto_expand(mut self, min_visible: usize, max_auto_pages: u32) -> Self {
        self.min_visible = min_visible;
        self.max_auto_pages = max_auto_pages;
        self
    }

    pub fn with_scroll_throttle(mut self, interval: Duration) -> Self {
        self.scroll_throttle = Throttle::new(interval);
        self
    }

    pub fn category_id(&self) -> &str {
        &self.category_id
    }

    pub fn filter(&self) -> &SearchFilter {
        &self.filter
    }

    pub fn controller(&self) -> &LoadMoreController {
        &self.controller
    }

    pub fn state(&self) -> &LoadState {
        self.controller.state()
    }

    /// Every issue loaded so far, unfiltered
    pub fn loaded(&self) -> &[Issue] {
        self.controller.issues()
    }

    /// Loaded issues after the filter
    pub fn visible(&self) -> Vec<Issue> {
        apply_filter(self.controller.issues(), &self.filter)
    }

    /// Switch category. Pages loaded for the previous one are dropped, so the
    /// next load starts over at page 1.
    pub fn set_category(&mut self, category_id: &str) {
        if self.category_id == category_id {
            return;
        }
        self.category_id = category_id.to_string();
        self.controller.reset();
    }

    /// Swap the filter and top up the list if it got too thin
    pub async fn set_filter(
        &mut self,
        registry: &SourceRegistry,
        filter: SearchFilter,
    ) -> Result<()> {
        self.filter = filter;
        self.auto_expand(registry).await
    }

    /// Reload from page 1
    pub async fn refresh(&mut self, registry: &SourceRegistry) -> Result<()> {
        info!("Refreshing feed for category '{}'", self.category_id);
        let ticket = self.controller.refresh();
        let result = self
            .aggregator
            .fetch_by_category(registry, &self.category_id, ticket.page, ticket.per_page)
            .await;
        self.controller.complete(ticket, result)?;
        self.auto_expand(registry).await
    }

    /// Append the next page. Returns false when there was nothing to load
    /// (already loading or no more pages).
    pub async fn load_more(&mut self, registry: &SourceRegistry) -> Result<bool> {
        let loaded = self.load_next_page(registry).await?;
        if loaded {
            self.auto_expand(registry).await?;
        }
        Ok(loaded)
    }

    /// Scroll reached the bottom. Throttled; returns whether a load ran.
    pub async fn on_scroll_end(&mut self, registry: &SourceRegistry) -> Result<bool> {
        if !self.scroll_throttle.try_acquire() {
            debug!("Scroll end throttled");
            return Ok(false);
        }
        self.load_more(registry).await
    }

    async fn load_next_page(&mut self, registry: &SourceRegistry) -> Result<bool> {
        let Some(ticket) = self.controller.load_more() else {
            return Ok(false);
        };
        let result = self
            .aggregator
            .fetch_by_category(registry, &self.category_id, ticket.page, ticket.per_page)
            .await;
        self.controller.complete(ticket, result)
    }

    async fn auto_expand(&mut self, registry: &SourceRegistry) -> Result<()> {
        let mut extra_pages = 0;
        while self.visible().len() < self.min_visible
            && self.controller.has_more_pages()
            && extra_pages < self.max_auto_pages
        {
            debug!(
                "Only {} issue(s) visible, fetching page {}",
                self.visible().len(),
                self.controller.current_page() + 1
            );
            if !self.load_next_page(registry).await? {
                break;
            }
            extra_pages += 1;
        }
        Ok(())
    }
}
