// Plain-text rendering for the terminal
use grapevine_api::Place;
use grapevine_core::{AnalyticsData, Issue, SearchFilter, Source, SourceFailure, SourceRegistry};

const TITLE_WIDTH: usize = 60;

pub fn print_issues(issues: &[Issue]) {
    if issues.is_empty() {
        println!("No issues found.");
        return;
    }

    for issue in issues {
        let origin = issue
            .repo_full_name()
            .or_else(|| issue.source.clone())
            .unwrap_or_default();
        let labels: Vec<&str> = issue.labels.iter().map(|l| l.name.as_str()).collect();
        println!(
            "{:<24} #{:<6} {:<width$} {:>3} comments  updated {}{}",
            truncate(&origin, 24),
            issue.number,
            truncate(&issue.title, TITLE_WIDTH),
            issue.comment_count,
            issue.updated_at.format("%Y-%m-%d"),
            if labels.is_empty() {
                String::new()
            } else {
                format!("  [{}]", labels.join(", "))
            },
            width = TITLE_WIDTH,
        );
    }
    println!("\n{} issue(s)", issues.len());
}

pub fn print_issue(issue: &Issue) {
    println!("#{} {}", issue.number, issue.title);
    if let Some(repo) = issue.repo_full_name() {
        println!("Repository: {}", repo);
    }
    println!("Author:     {}", issue.author.login);
    println!("State:      {}", issue.state);
    println!("Created:    {}", issue.created_at.format("%Y-%m-%d %H:%M UTC"));
    println!("Updated:    {}", issue.updated_at.format("%Y-%m-%d %H:%M UTC"));
    println!("Comments:   {}", issue.comment_count);
    if !issue.labels.is_empty() {
        let labels: Vec<&str> = issue.labels.iter().map(|l| l.name.as_str()).collect();
        println!("Labels:     {}", labels.join(", "));
    }
    println!("URL:        {}", issue.html_url);
    if !issue.body.is_empty() {
        println!("\n{}", issue.body);
    }
}

pub fn print_failures(failures: &[SourceFailure]) {
    for failure in failures {
        eprintln!("warning: source '{}' failed: {}", failure.source_id, failure.message);
    }
}

pub fn print_sources(sources: &[Source]) {
    if sources.is_empty() {
        println!("No sources configured. Add one with: grapevine sources add <id> <owner/repo>");
        return;
    }
    for source in sources {
        println!(
            "{:<16} {:<32} {:<12} {}",
            source.id,
            source.full_name(),
            source.category.as_deref().unwrap_or("-"),
            if source.is_active { "active" } else { "inactive" }
        );
    }
}

pub fn print_categories(registry: &SourceRegistry) {
    for category in registry.categories() {
        let count = registry.active_sources_for(&category.id).len();
        println!(
            "{:<16} {:<20} {:>3} active source(s){}",
            category.id,
            category.name,
            count,
            if category.is_protected() { "  (built in)" } else { "" }
        );
    }
}

pub fn print_saved_filters(filters: &[SearchFilter]) {
    if filters.is_empty() {
        println!("No saved filters.");
        return;
    }
    for filter in filters {
        let mut parts = Vec::new();
        if let Some(keyword) = &filter.keyword {
            parts.push(format!("keyword={}", keyword));
        }
        if !filter.labels.is_empty() {
            parts.push(format!("labels={}", filter.labels.join(",")));
        }
        if !filter.authors.is_empty() {
            parts.push(format!("authors={}", filter.authors.join(",")));
        }
        if !filter.repositories.is_empty() {
            parts.push(format!("repos={}", filter.repositories.join(",")));
        }
        if filter.date_range.is_some() {
            parts.push("date range".to_string());
        }
        println!(
            "{:<38} {:<20} {}",
            filter.id.as_deref().unwrap_or("-"),
            filter.name.as_deref().unwrap_or("-"),
            parts.join(" ")
        );
    }
}

pub fn print_analytics(data: &AnalyticsData, author: Option<&str>, top: usize) {
    if let Some(author) = author {
        println!("Dashboard for {}\n", author);
    }
    println!("Views:         {}", data.total_views());
    println!("Reading time:  {}", data.formatted_reading_time());
    if let Some(last) = data.last_active {
        println!("Last active:   {}", last.format("%Y-%m-%d %H:%M UTC"));
    }

    let most_viewed = data.most_viewed(top);
    if !most_viewed.is_empty() {
        println!("\nMost viewed issues:");
        for (number, views) in most_viewed {
            println!("  #{:<8} {} view(s)", number, views);
        }
    }

    let repos = data.most_active_repos(top);
    if !repos.is_empty() {
        println!("\nMost active repositories:");
        for repo in repos {
            println!(
                "  {}/{:<24} {} created, {} updated",
                repo.repo_owner, repo.repo_name, repo.created, repo.updated
            );
        }
    }

    let tags = data.top_tags(top);
    if !tags.is_empty() {
        println!("\nTop labels:");
        for (tag, count) in tags {
            println!("  {:<24} {}", tag, count);
        }
    }

    const DAYS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];
    let weekdays = data.activity_by_weekday();
    if weekdays.iter().any(|&n| n > 0) {
        println!("\nViews by weekday:");
        for (day, count) in DAYS.iter().zip(weekdays) {
            println!("  {} {}", day, "#".repeat(count as usize));
        }
    }
}

pub fn print_place(place: &Place) {
    println!("{}", place.display_name);
    let line = [
        place.road.as_deref(),
        place.city.as_deref(),
        place.region.as_deref(),
        place.country.as_deref(),
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join(", ");
    if !line.is_empty() {
        println!("{}", line);
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut)
}
