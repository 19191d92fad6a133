use std::collections::HashSet;

use tracing::debug;

use crate::{aggregate::AggregatedPage, models::Issue, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Succeeded,
    Failed(String),
}

/// Permission to run one fetch. Handed out by the controller and given back
/// with the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    pub page: u32,
    pub per_page: u32,
    generation: u64,
}

/// Page bookkeeping for one listing (refresh vs. infinite scroll).
///
/// Page 1 replaces the accumulated list, later pages append to it. Whether
/// more pages exist is decided by the returned page sizes only; the total
/// count estimate is never consulted.
#[derive(Debug, Clone)]
pub struct LoadMoreController {
    current_page: u32,
    per_page: u32,
    has_more_pages: bool,
    state: LoadState,
    issues: Vec<Issue>,
    total_count: u64,
    generation: u64,
}

impl LoadMoreController {
    pub fn new(per_page: u32) -> Self {
        Self {
            current_page: 0,
            per_page: per_page.max(1),
            has_more_pages: true,
            state: LoadState::Idle,
            issues: Vec::new(),
            total_count: 0,
            generation: 0,
        }
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn has_more_pages(&self) -> bool {
        self.has_more_pages
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    pub fn is_loading(&self) -> bool {
        self.state == LoadState::Loading
    }

    pub fn issues(&self) -> &[Issue] {
        &self.issues
    }

    /// Advisory, see [`AggregatedPage::total_count`]
    pub fn total_count(&self) -> u64 {
        self.total_count
    }

    /// Start over at page 1. Any fetch still in flight becomes stale.
    pub fn refresh(&mut self) -> LoadTicket {
        self.generation += 1;
        self.state = LoadState::Loading;
        self.ticket(1)
    }

    /// Ticket for the next page, or `None` while a load is running or once
    /// the listing is exhausted.
    pub fn load_more(&mut self) -> Option<LoadTicket> {
        if self.is_loading() || !self.has_more_pages {
            return None;
        }
        self.state = LoadState::Loading;
        Some(self.ticket(self.current_page + 1))
    }

    /// Record the outcome of a ticket.
    ///
    /// `Ok(false)` means the ticket was superseded by a later refresh and
    /// nothing changed. A fetch error is recorded in the state and handed
    /// back.
    pub fn complete(
        &mut self,
        ticket: LoadTicket,
        result: Result<AggregatedPage>,
    ) -> Result<bool> {
        if ticket.generation != self.generation {
            debug!(
                "Ignoring stale response for page {} (generation {} < {})",
                ticket.page, ticket.generation, self.generation
            );
            return Ok(false);
        }

        match result {
            Ok(page) => {
                if ticket.page <= 1 {
                    self.issues = dedupe(page.issues, &[]);
                } else {
                    let fresh = dedupe(page.issues, &self.issues);
                    self.issues.extend(fresh);
                }
                self.current_page = ticket.page;
                self.has_more_pages = page.has_more;
                self.total_count = page.total_count;
                self.state = LoadState::Succeeded;
            }
            Err(e) => {
                self.state = LoadState::Failed(e.to_string());
                return Err(e);
            }
        }
        Ok(true)
    }

    /// Forget every loaded page, e.g. because the listing now means
    /// something else. A fetch still in flight becomes stale and the next
    /// `load_more` asks for page 1.
    pub fn reset(&mut self) {
        self.generation += 1;
        self.current_page = 0;
        self.has_more_pages = true;
        self.state = LoadState::Idle;
        self.issues.clear();
        self.total_count = 0;
    }

    fn ticket(&self, page: u32) -> LoadTicket {
        LoadTicket {
            page,
            per_page: self.per_page,
            generation: self.generation,
        }
    }
}

/// Drop issues already in `existing` (or repeated within `incoming`)
fn dedupe(incoming: Vec<Issue>, existing: &[Issue]) -> Vec<Issue> {
    let mut seen: HashSet<_> = existing.iter().map(Issue::merge_key).collect();
    incoming
        .into_iter()
        .filter(|i| seen.insert(i.merge_key()))
        .collect()
}
