use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel category meaning "no category filter"
pub const ALL_CATEGORY: &str = "all";

/// An issue after normalization, whatever repository it came from
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    /// Unique within one source's results only
    pub id: u64,
    pub number: u64,
    pub title: String,
    /// Empty when the issue has no description
    pub body: String,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub comment_count: u32,
    /// API order, duplicates kept
    pub labels: Vec<Label>,
    /// "open" or "closed" in practice, but GitHub owns the vocabulary
    pub state: String,
    pub html_url: String,
    pub source: Option<String>,
    pub repo_owner: Option<String>,
    pub repo_name: Option<String>,
}

impl Issue {
    /// Identity used when merging lists from several sources.
    /// `id` alone is not enough: two repositories can hand out the same one.
    pub fn merge_key(&self) -> (Option<String>, u64) {
        (self.source.clone(), self.number)
    }

    pub fn is_open(&self) -> bool {
        self.state.eq_ignore_ascii_case("open")
    }

    pub fn repo_full_name(&self) -> Option<String> {
        match (&self.repo_owner, &self.repo_name) {
            (Some(owner), Some(name)) => Some(format!("{}/{}", owner, name)),
            _ => None,
        }
    }

    pub fn word_count(&self) -> usize {
        self.body.split_whitespace().count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub login: String,
    pub avatar_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub name: String,
    /// Hex color without '#'
    pub color: String,
}

/// A configured GitHub repository feeding issues into the aggregate view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Unique slug
    pub id: String,
    pub name: String,
    pub owner: String,
    pub repo: String,
    #[serde(default)]
    pub description: String,
    /// Inactive sources keep their configuration but are never fetched
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default)]
    pub category: Option<String>,
}

fn default_true() -> bool {
    true
}

impl Source {
    pub fn new(id: &str, owner: &str, repo: &str) -> Self {
        Self {
            id: id.to_string(),
            name: format!("{}/{}", owner, repo),
            owner: owner.to_string(),
            repo: repo.to_string(),
            description: String::new(),
            is_active: true,
            category: None,
        }
    }

    pub fn with_category(mut self, category: &str) -> Self {
        self.category = Some(category.to_string());
        self
    }

    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// User-defined grouping of sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub is_default: bool,
}

impl Category {
    pub fn new(id: &str, name: &str, order: u32) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            description: String::new(),
            order,
            is_default: false,
        }
    }

    pub fn all() -> Self {
        Self {
            id: ALL_CATEGORY.to_string(),
            name: "All".to_string(),
            description: "Every active source".to_string(),
            order: 0,
            is_default: true,
        }
    }

    pub fn is_protected(&self) -> bool {
        self.id == ALL_CATEGORY
    }
}

/// Which timestamp a filter sorts and date-bounds on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Created,
    Updated,
}

impl SortField {
    pub fn timestamp(&self, issue: &Issue) -> DateTime<Utc> {
        match self {
            SortField::Created => issue.created_at,
            SortField::Updated => issue.updated_at,
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "created" => Ok(SortField::Created),
            "updated" => Ok(SortField::Updated),
            other => Err(format!("unknown sort field '{}' (expected created|updated)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl std::str::FromStr for SortOrder {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(format!("unknown sort order '{}' (expected asc|desc)", other)),
        }
    }
}

/// Inclusive `[start, end]` window; `None` on either side is unbounded.
/// Serialized as a two-element array.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DateRange(pub Option<DateTime<Utc>>, pub Option<DateTime<Utc>>);

impl DateRange {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.0.map_or(true, |start| at >= start) && self.1.map_or(true, |end| at <= end)
    }

    pub fn is_unbounded(&self) -> bool {
        self.0.is_none() && self.1.is_none()
    }
}

/// Composable issue filter. The default value filters nothing and keeps the
/// input order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_range: Option<DateRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_by: Option<SortField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<SortOrder>,
    /// Only set on saved filters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keyword(mut self, keyword: &str) -> Self {
        self.keyword = Some(keyword.to_string());
        self
    }

    pub fn repository(mut self, source_id: &str) -> Self {
        self.repositories.push(source_id.to_string());
        self
    }

    pub fn label(mut self, label: &str) -> Self {
        self.labels.push(label.to_string());
        self
    }

    pub fn author(mut self, login: &str) -> Self {
        self.authors.push(login.to_string());
        self
    }

    pub fn date_range(mut self, start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Self {
        self.date_range = Some(DateRange(start, end));
        self
    }

    pub fn sort(mut self, field: SortField, order: SortOrder) -> Self {
        self.sort_by = Some(field);
        self.sort_order = Some(order);
        self
    }

    /// True when applying this filter would return its input untouched
    pub fn is_empty(&self) -> bool {
        self.keyword.as_deref().map_or(true, |k| k.trim().is_empty())
            && self.repositories.is_empty()
            && self.labels.is_empty()
            && self.authors.is_empty()
            && self.date_range.map_or(true, |r| r.is_unbounded())
            && self.sort_by.is_none()
    }
}
