use crate::{
    models::{Issue, Source},
    Result,
};

/// One page of normalized issues from a single source
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IssuePage {
    pub issues: Vec<Issue>,
    /// Advisory estimate, see [`grapevine_api::github::estimate_total_count`]
    pub total_count: u64,
}

impl IssuePage {
    /// A page shorter than requested is the authoritative "no more pages" signal
    pub fn is_full(&self, per_page: u32) -> bool {
        self.issues.len() as u64 >= per_page as u64
    }
}

/// Trait for issue backends - the aggregator only ever talks to this.
///
/// GitHub is the only real implementation; tests plug in scripted ones.
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait IssueFetcher: Send + Sync {
    /// Open issues of `source`, `page` is 1-based
    async fn fetch_issues(&self, source: &Source, page: u32, per_page: u32) -> Result<IssuePage>;

    async fn fetch_issue(&self, source: &Source, number: u64) -> Result<Issue>;
}
