use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use grapevine_core::{SortField, SortOrder, ALL_CATEGORY};

#[derive(Parser)]
#[command(name = "grapevine")]
#[command(version, about = "Issues from many GitHub repositories in one feed", long_about = None)]
pub struct Cli {
    /// Config file (default: <config dir>/grapevine/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// GitHub token, overrides GITHUB_TOKEN and the config file
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Debug logging
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List open issues of a category
    Browse {
        /// Category id
        #[arg(long, short, default_value = ALL_CATEGORY)]
        category: String,
        /// Fetch exactly this page instead of filling the screen
        #[arg(long)]
        page: Option<u32>,
        /// Issues per source and page (default from config)
        #[arg(long)]
        per_page: Option<u32>,
        /// Start from a saved filter
        #[arg(long)]
        filter: Option<String>,
        #[command(flatten)]
        criteria: FilterArgs,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one issue and record the view
    View {
        /// Source id
        source: String,
        /// Issue number
        number: u64,
        #[arg(long)]
        json: bool,
    },
    /// Manage sources
    Sources {
        #[command(subcommand)]
        action: SourceCommands,
    },
    /// Manage categories
    Categories {
        #[command(subcommand)]
        action: CategoryCommands,
    },
    /// Manage saved filters
    Filters {
        #[command(subcommand)]
        action: FilterCommands,
    },
    /// Reading statistics
    Analytics {
        #[command(subcommand)]
        action: Option<AnalyticsCommands>,
        /// Only repositories of this owner (default: analytics.target_author)
        #[arg(long)]
        author: Option<String>,
        /// Entries per ranking
        #[arg(long, default_value = "5")]
        top: usize,
        #[arg(long)]
        json: bool,
    },
    /// GitHub login
    Login {
        #[command(subcommand)]
        action: LoginCommands,
    },
    /// Forget the stored token
    Logout {
        /// Also forget the remembered username
        #[arg(long)]
        forget: bool,
    },
    /// Describe a coordinate
    Locate {
        #[arg(long, allow_negative_numbers = true)]
        lat: f64,
        #[arg(long, allow_negative_numbers = true)]
        lon: f64,
    },
}

/// Issue filter criteria shared by `browse` and `filters save`
#[derive(Args, Debug, Default)]
pub struct FilterArgs {
    /// Case-insensitive text in title, body or author
    #[arg(long, short)]
    pub keyword: Option<String>,
    /// Label name (repeatable, any match)
    #[arg(long = "label", short = 'l')]
    pub labels: Vec<String>,
    /// Author login (repeatable, exact)
    #[arg(long = "author", short = 'a')]
    pub authors: Vec<String>,
    /// Source id (repeatable)
    #[arg(long = "repo", short = 'r')]
    pub repositories: Vec<String>,
    /// Earliest date, YYYY-MM-DD or RFC 3339
    #[arg(long)]
    pub since: Option<String>,
    /// Latest date, YYYY-MM-DD or RFC 3339
    #[arg(long)]
    pub until: Option<String>,
    /// created or updated
    #[arg(long)]
    pub sort: Option<SortField>,
    /// asc or desc
    #[arg(long)]
    pub order: Option<SortOrder>,
}

#[derive(Subcommand)]
pub enum SourceCommands {
    /// List configured sources
    List,
    /// Add a repository
    Add {
        /// Unique id
        id: String,
        /// Repository as owner/repo
        repository: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long, short)]
        category: Option<String>,
        #[arg(long, short)]
        description: Option<String>,
    },
    /// Remove a source
    Remove { id: String },
    /// Enable or disable a source
    Toggle { id: String },
}

#[derive(Subcommand)]
pub enum CategoryCommands {
    /// List categories
    List,
    /// Add a category
    Add {
        id: String,
        name: String,
        #[arg(long, default_value = "100")]
        order: u32,
        #[arg(long, short)]
        description: Option<String>,
    },
    /// Remove a category; its sources become uncategorized
    Remove { id: String },
}

#[derive(Subcommand)]
pub enum FilterCommands {
    /// List saved filters
    List,
    /// Save a filter under a name
    Save {
        name: String,
        #[command(flatten)]
        criteria: FilterArgs,
    },
    /// Delete a saved filter
    Delete { id: String },
}

#[derive(Subcommand)]
pub enum AnalyticsCommands {
    /// Delete all recorded analytics
    Clear,
}

#[derive(Subcommand)]
pub enum LoginCommands {
    /// Print the authorization URL
    Url {
        /// GitHub username to remember for the next login
        #[arg(long, short)]
        username: Option<String>,
    },
    /// Finish the login with the redirect's code and state
    Callback {
        #[arg(long)]
        code: String,
        #[arg(long)]
        state: String,
    },
}
