// Provider implementations for issue backends
pub mod github;

pub use github::GitHubIssueFetcher;
