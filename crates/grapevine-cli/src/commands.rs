// Subcommand handlers. Each one talks to the service and leaves the
// formatting to `output`.
use std::path::Path;

use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, NaiveDate, Utc};
use grapevine_core::{Category, Config, Grapevine, SearchFilter, Source};
use tracing::info;

use crate::args::{
    AnalyticsCommands, CategoryCommands, FilterArgs, FilterCommands, LoginCommands,
    SourceCommands,
};
use crate::output;

pub struct BrowseRequest {
    pub category: String,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub saved_filter: Option<String>,
    pub criteria: FilterArgs,
}

pub async fn browse(
    grapevine: &Grapevine,
    request: BrowseRequest,
    json: bool,
) -> anyhow::Result<()> {
    if grapevine.registry().get_category(&request.category).is_none() {
        bail!("Unknown category '{}'", request.category);
    }

    let base = match &request.saved_filter {
        Some(id) => grapevine
            .saved_filters()
            .get(id)
            .ok_or_else(|| anyhow!("No saved filter with id '{}'", id))?,
        None => SearchFilter::default(),
    };
    let filter = request.criteria.apply_to(base)?;

    let issues = match request.page {
        Some(page) => {
            let per_page = request.per_page.unwrap_or(grapevine.config().github.per_page);
            let result = grapevine
                .fetch_page(&request.category, page, per_page, &filter)
                .await?;
            output::print_failures(&result.failures);
            if !json {
                println!(
                    "Page {} - about {} open issue(s) in total{}",
                    page,
                    result.total_count,
                    if result.has_more { ", more available" } else { "" }
                );
            }
            result.issues
        }
        None => {
            if let Some(keyword) = &filter.keyword {
                grapevine.analytics().record_search(keyword);
            }
            let mut feed = grapevine.feed(&request.category).with_filter(filter);
            feed.refresh(grapevine.registry()).await?;
            feed.visible()
        }
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&issues)?);
    } else {
        output::print_issues(&issues);
    }
    Ok(())
}

pub async fn view(
    grapevine: &Grapevine,
    source: &str,
    number: u64,
    json: bool,
) -> anyhow::Result<()> {
    let issue = grapevine.view_issue(source, number).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&issue)?);
    } else {
        output::print_issue(&issue);
    }
    Ok(())
}

pub fn sources(
    grapevine: &mut Grapevine,
    action: SourceCommands,
    config_path: &Path,
) -> anyhow::Result<()> {
    match action {
        SourceCommands::List => {
            output::print_sources(grapevine.registry().sources());
            return Ok(());
        }
        SourceCommands::Add {
            id,
            repository,
            name,
            category,
            description,
        } => {
            let (owner, repo) = repository
                .split_once('/')
                .filter(|(o, r)| !o.is_empty() && !r.is_empty() && !r.contains('/'))
                .ok_or_else(|| anyhow!("Repository must look like owner/repo"))?;
            if let Some(category) = &category {
                if grapevine.registry().get_category(category).is_none() {
                    bail!("Unknown category '{}'", category);
                }
            }

            let mut source = Source::new(&id, owner, repo);
            source.name = name.unwrap_or_else(|| source.full_name());
            source.description = description.unwrap_or_default();
            source.category = category;

            if !grapevine.registry_mut().add_source(source) {
                println!("Source '{}' already exists, left unchanged.", id);
                return Ok(());
            }
            println!("Added source '{}'.", id);
        }
        SourceCommands::Remove { id } => {
            grapevine.registry_mut().remove_source(&id)?;
            println!("Removed source '{}'.", id);
        }
        SourceCommands::Toggle { id } => {
            let active = grapevine.registry_mut().toggle_active(&id)?;
            println!(
                "Source '{}' is now {}.",
                id,
                if active { "active" } else { "inactive" }
            );
        }
    }

    save_registry(grapevine, config_path)
}

pub fn categories(
    grapevine: &mut Grapevine,
    action: CategoryCommands,
    config_path: &Path,
) -> anyhow::Result<()> {
    match action {
        CategoryCommands::List => {
            output::print_categories(grapevine.registry());
            return Ok(());
        }
        CategoryCommands::Add {
            id,
            name,
            order,
            description,
        } => {
            let mut category = Category::new(&id, &name, order);
            category.description = description.unwrap_or_default();
            if !grapevine.registry_mut().add_category(category) {
                println!("Category '{}' already exists, left unchanged.", id);
                return Ok(());
            }
            println!("Added category '{}'.", id);
        }
        CategoryCommands::Remove { id } => {
            grapevine.registry_mut().remove_category(&id)?;
            println!("Removed category '{}'.", id);
        }
    }

    save_registry(grapevine, config_path)
}

pub fn filters(grapevine: &Grapevine, action: FilterCommands) -> anyhow::Result<()> {
    let store = grapevine.saved_filters();
    match action {
        FilterCommands::List => output::print_saved_filters(&store.list()),
        FilterCommands::Save { name, criteria } => {
            let filter = criteria.apply_to(SearchFilter::default())?;
            let saved = store.save(&name, filter)?;
            println!(
                "Saved filter '{}' with id {}",
                name,
                saved.id.unwrap_or_default()
            );
        }
        FilterCommands::Delete { id } => {
            if !store.delete(&id) {
                bail!("No saved filter with id '{}'", id);
            }
            println!("Deleted filter {}.", id);
        }
    }
    Ok(())
}

pub fn analytics(
    grapevine: &Grapevine,
    action: Option<AnalyticsCommands>,
    author: Option<String>,
    top: usize,
    json: bool,
) -> anyhow::Result<()> {
    if let Some(AnalyticsCommands::Clear) = action {
        if !grapevine.analytics().clear_all() {
            bail!("Could not clear analytics, see the log for details");
        }
        println!("Analytics cleared.");
        return Ok(());
    }

    let mut data = grapevine.analytics().snapshot();
    let author = author.or_else(|| grapevine.config().analytics.target_author);
    if let Some(author) = &author {
        data = data.for_author(author);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&data)?);
    } else {
        output::print_analytics(&data, author.as_deref(), top);
    }
    Ok(())
}

pub async fn login(grapevine: &Grapevine, action: LoginCommands) -> anyhow::Result<()> {
    match action {
        LoginCommands::Url { username } => {
            match username {
                Some(name) => {
                    grapevine.session().remember_username(&name);
                }
                None => {
                    if let Some(name) = grapevine.session().remembered_username() {
                        println!("Last login: {} (pass --username to change)", name);
                    }
                }
            }
            let url = grapevine.auth().begin()?;
            println!("Open this URL to authorize Grapevine:\n\n  {}\n", url);
            println!("Then run: grapevine login callback --code <code> --state <state>");
        }
        LoginCommands::Callback { code, state } => {
            grapevine.auth().handle_callback(&code, &state).await?;
            println!("Logged in. The token is used from the next command on.");
        }
    }
    Ok(())
}

pub fn logout(grapevine: &Grapevine, forget: bool) -> anyhow::Result<()> {
    grapevine.auth().logout();
    if forget {
        grapevine.session().forget_username();
    }
    println!("Logged out.");
    Ok(())
}

pub async fn locate(grapevine: &Grapevine, lat: f64, lon: f64) -> anyhow::Result<()> {
    let place = grapevine.locate(lat, lon).await?;
    output::print_place(&place);
    Ok(())
}

/// Write the registry into the config file without touching the rest of it,
/// so env and CLI overrides never end up on disk.
fn save_registry(grapevine: &Grapevine, config_path: &Path) -> anyhow::Result<()> {
    let mut on_disk = Config::load_from(config_path)?;
    on_disk.store_registry(grapevine.registry());
    on_disk
        .save_to(config_path)
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    info!("Saved registry to {}", config_path.display());
    Ok(())
}

impl FilterArgs {
    /// Layer these flags over `base`. Lists extend, single values replace.
    pub fn apply_to(self, mut base: SearchFilter) -> anyhow::Result<SearchFilter> {
        if let Some(keyword) = self.keyword {
            base.keyword = Some(keyword);
        }
        base.labels.extend(self.labels);
        base.authors.extend(self.authors);
        base.repositories.extend(self.repositories);

        if self.since.is_some() || self.until.is_some() {
            let since = self.since.as_deref().map(|s| parse_date(s, false)).transpose()?;
            let until = self.until.as_deref().map(|s| parse_date(s, true)).transpose()?;
            base = base.date_range(since, until);
        }
        if let Some(sort) = self.sort {
            base.sort_by = Some(sort);
        }
        if let Some(order) = self.order {
            base.sort_order = Some(order);
        }
        Ok(base)
    }
}

/// RFC 3339, or a bare date meaning the start (or end) of that UTC day
fn parse_date(input: &str, end_of_day: bool) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(at) = DateTime::parse_from_rfc3339(input) {
        return Ok(at.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", input))?;
    let time = if end_of_day {
        date.and_hms_opt(23, 59, 59)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.map(|t| t.and_utc())
        .ok_or_else(|| anyhow!("Invalid date '{}'", input))
}
