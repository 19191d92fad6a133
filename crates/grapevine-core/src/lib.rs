// Core business logic: sources, aggregation, paging, analytics and session
pub mod aggregate;
pub mod analytics;
pub mod auth;
pub mod config;
pub mod error;
pub mod feed;
pub mod fetcher;
pub mod filter;
pub mod models;
pub mod pagination;
pub mod providers;
pub mod registry;
pub mod saved_filters;
pub mod service;
pub mod session;
pub mod throttle;

pub use aggregate::{AggregatedPage, Aggregator, JoinMode, SourceFailure};
pub use analytics::{AnalyticsData, AnalyticsRecorder, RepoActivity, ViewRecord};
pub use auth::AuthFlow;
pub use config::Config;
pub use error::Error;
pub use feed::IssueFeed;
pub use fetcher::{IssueFetcher, IssuePage};
pub use filter::apply_filter;
pub use models::{
    Author, Category, DateRange, Issue, Label, SearchFilter, SortField, SortOrder, Source,
    ALL_CATEGORY,
};
pub use pagination::{LoadMoreController, LoadState, LoadTicket};
pub use registry::{CategoryPatch, SourcePatch, SourceRegistry};
pub use saved_filters::SavedFilterStore;
pub use service::Grapevine;
pub use session::SessionStore;
pub use throttle::{Debouncer, Throttle};

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
