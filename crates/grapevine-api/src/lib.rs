// Clients for the remote services Grapevine reads from
pub mod geocode;
pub mod github;
pub mod oauth;
pub mod retry;

// Re-export common types
pub use geocode::{GeocodeClient, GeocodeError, Place};
pub use github::{GitHubClient, GitHubError, GitHubIssue, GitHubLabel, GitHubUser, IssueListing};
pub use oauth::{OAuthClient, OAuthError, TokenResponse};
pub use retry::RetryConfig;
