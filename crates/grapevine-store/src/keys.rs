// Storage keys. Changing any of these orphans data already on disk.

/// Analytics blob (JSON object)
pub const ANALYTICS: &str = "grapevine_analytics";

/// Saved search filters (JSON array)
pub const SAVED_FILTERS: &str = "grapevine_saved_filters";

/// Last username typed into the login prompt (plain string)
pub const REMEMBERED_USERNAME: &str = "grapevine_remembered_username";

/// CSRF state of the OAuth round-trip in flight (plain string)
pub const OAUTH_STATE: &str = "grapevine_oauth_state";

/// GitHub access token for the session (plain string)
pub const AUTH_TOKEN: &str = "grapevine_auth_token";
