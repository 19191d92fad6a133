// Client-side filtering over an already fetched issue list
use crate::models::{Issue, SearchFilter, SortField, SortOrder};

/// Apply every predicate of `filter` (AND-combined) and its sort.
///
/// Empty dimensions pass everything through, so an empty filter returns the
/// input unchanged, order included.
pub fn apply_filter(issues: &[Issue], filter: &SearchFilter) -> Vec<Issue> {
    let keyword = filter
        .keyword
        .as_deref()
        .filter(|k| !k.trim().is_empty())
        .map(str::to_lowercase);
    let labels: Vec<String> = filter.labels.iter().map(|l| l.to_lowercase()).collect();
    let date_field = filter.sort_by.unwrap_or_default();

    let mut matched: Vec<Issue> = issues
        .iter()
        .filter(|issue| keyword.as_deref().map_or(true, |k| matches_keyword(issue, k)))
        .filter(|issue| matches_repository(issue, &filter.repositories))
        .filter(|issue| matches_labels(issue, &labels))
        .filter(|issue| filter.authors.is_empty() || filter.authors.contains(&issue.author.login))
        .filter(|issue| {
            filter
                .date_range
                .map_or(true, |range| range.contains(date_field.timestamp(issue)))
        })
        .cloned()
        .collect();

    if let Some(field) = filter.sort_by {
        sort_issues(&mut matched, field, filter.sort_order.unwrap_or_default());
    }

    matched
}

/// Stable sort: equal timestamps keep their relative order
pub fn sort_issues(issues: &mut [Issue], field: SortField, order: SortOrder) {
    issues.sort_by(|a, b| {
        let ordering = field.timestamp(a).cmp(&field.timestamp(b));
        match order {
            SortOrder::Asc => ordering,
            SortOrder::Desc => ordering.reverse(),
        }
    });
}

/// `keyword` must already be lowercased
fn matches_keyword(issue: &Issue, keyword: &str) -> bool {
    issue.title.to_lowercase().contains(keyword)
        || issue.body.to_lowercase().contains(keyword)
        || issue.author.login.to_lowercase().contains(keyword)
}

fn matches_repository(issue: &Issue, repositories: &[String]) -> bool {
    if repositories.is_empty() {
        return true;
    }
    // Untagged issues can't prove membership
    issue
        .source
        .as_ref()
        .map_or(false, |source| repositories.contains(source))
}

/// `wanted` must already be lowercased
fn matches_labels(issue: &Issue, wanted: &[String]) -> bool {
    wanted.is_empty()
        || issue
            .labels
            .iter()
            .any(|label| wanted.contains(&label.name.to_lowercase()))
}
