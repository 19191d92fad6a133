// Local reading analytics: what was opened, for how long, and which repos
// were pulled. Everything lives in one JSON blob in the storage adapter.
use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use grapevine_store::{keys, StorageAdapter};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::models::Issue;

pub const DEFAULT_MAX_VIEW_HISTORY: usize = 100;
pub const DEFAULT_MAX_TRACKED_REPOS: usize = 200;
pub const MAX_SEARCH_QUERIES: usize = 50;

/// Reading speed assumption, words per second
const WORDS_PER_SECOND: f64 = 5.0;
const MIN_READING_SECONDS: u64 = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewRecord {
    pub id: String,
    pub issue_number: u64,
    pub title: String,
    pub timestamp: DateTime<Utc>,
    pub reading_time_seconds: u64,
    pub source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repo_owner: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepoActivity {
    pub repo_id: String,
    pub repo_owner: String,
    pub repo_name: String,
    pub created: u64,
    pub updated: u64,
    pub last_fetched_at: DateTime<Utc>,
}

impl RepoActivity {
    pub fn total(&self) -> u64 {
        self.created + self.updated
    }
}

/// The persisted analytics blob
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnalyticsData {
    /// Newest first
    pub view_history: Vec<ViewRecord>,
    /// Keyed by issue number only, so equal numbers from different repos share a counter
    pub most_viewed: BTreeMap<u64, u32>,
    pub reading_time_total: u64,
    pub last_active: Option<DateTime<Utc>>,
    pub tags_interacted: BTreeMap<String, u32>,
    pub search_queries: Vec<String>,
    pub repo_activity: BTreeMap<String, RepoActivity>,
}

/// `max(10, round(words / 5))` seconds
pub fn reading_time_seconds(word_count: usize) -> u64 {
    let estimate = (word_count as f64 / WORDS_PER_SECOND).round() as u64;
    estimate.max(MIN_READING_SECONDS)
}

impl AnalyticsData {
    /// Issue numbers with their view counts, most viewed first
    pub fn most_viewed(&self, n: usize) -> Vec<(u64, u32)> {
        let mut ranked: Vec<(u64, u32)> =
            self.most_viewed.iter().map(|(k, v)| (*k, *v)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked.truncate(n);
        ranked
    }

    /// Repos with the most created + updated activity
    pub fn most_active_repos(&self, n: usize) -> Vec<&RepoActivity> {
        let mut ranked: Vec<&RepoActivity> = self.repo_activity.values().collect();
        ranked.sort_by(|a, b| {
            b.total()
                .cmp(&a.total())
                .then(b.last_fetched_at.cmp(&a.last_fetched_at))
        });
        ranked.truncate(n);
        ranked
    }

    pub fn top_tags(&self, n: usize) -> Vec<(&str, u32)> {
        let mut ranked: Vec<(&str, u32)> = self
            .tags_interacted
            .iter()
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        ranked.truncate(n);
        ranked
    }

    pub fn total_views(&self) -> u64 {
        self.most_viewed.values().map(|&v| v as u64).sum()
    }

    /// Total reading time as "XhYm"
    pub fn formatted_reading_time(&self) -> String {
        let hours = self.reading_time_total / 3600;
        let minutes = (self.reading_time_total % 3600) / 60;
        format!("{}h{}m", hours, minutes)
    }

    /// Views per weekday, index 0 is Sunday
    pub fn activity_by_weekday(&self) -> [u32; 7] {
        let mut buckets = [0u32; 7];
        for record in &self.view_history {
            buckets[record.timestamp.weekday().num_days_from_sunday() as usize] += 1;
        }
        buckets
    }

    /// Views per calendar day (UTC), oldest day first
    pub fn activity_by_date(&self) -> BTreeMap<NaiveDate, u32> {
        let mut series = BTreeMap::new();
        for record in &self.view_history {
            *series.entry(record.timestamp.date_naive()).or_insert(0) += 1;
        }
        series
    }

    /// The slice of this data that concerns `author`'s repositories.
    ///
    /// A record belongs to the author when its repo owner equals `author` or
    /// its source id contains it. View counters and reading time are rebuilt
    /// from the kept history; tag counts can't be attributed and are dropped.
    pub fn for_author(&self, author: &str) -> AnalyticsData {
        let belongs = |owner: Option<&str>, source: Option<&str>| {
            owner == Some(author) || source.map_or(false, |s| s.contains(author))
        };

        let view_history: Vec<ViewRecord> = self
            .view_history
            .iter()
            .filter(|r| belongs(r.repo_owner.as_deref(), r.source.as_deref()))
            .cloned()
            .collect();

        let mut most_viewed = BTreeMap::new();
        for record in &view_history {
            *most_viewed.entry(record.issue_number).or_insert(0) += 1;
        }

        let repo_activity = self
            .repo_activity
            .iter()
            .filter(|(_, a)| belongs(Some(a.repo_owner.as_str()), Some(a.repo_id.as_str())))
            .map(|(k, a)| (k.clone(), a.clone()))
            .collect();

        AnalyticsData {
            reading_time_total: view_history.iter().map(|r| r.reading_time_seconds).sum(),
            last_active: view_history.first().map(|r| r.timestamp),
            view_history,
            most_viewed,
            tags_interacted: BTreeMap::new(),
            search_queries: Vec::new(),
            repo_activity,
        }
    }
}

/// Writes analytics events through the storage adapter.
///
/// Every event is one read-modify-write of the blob under the adapter's lock.
/// Storage failures are logged by the adapter and otherwise ignored.
#[derive(Clone)]
pub struct AnalyticsRecorder {
    storage: StorageAdapter,
    max_view_history: usize,
    max_tracked_repos: usize,
}

impl AnalyticsRecorder {
    pub fn new(storage: StorageAdapter) -> Self {
        Self {
            storage,
            max_view_history: DEFAULT_MAX_VIEW_HISTORY,
            max_tracked_repos: DEFAULT_MAX_TRACKED_REPOS,
        }
    }

    pub fn with_limits(mut self, max_view_history: usize, max_tracked_repos: usize) -> Self {
        self.max_view_history = max_view_history;
        self.max_tracked_repos = max_tracked_repos;
        self
    }

    pub fn record_view(&self, issue: &Issue) -> ViewRecord {
        self.record_view_at(issue, Utc::now())
    }

    pub fn record_view_at(&self, issue: &Issue, now: DateTime<Utc>) -> ViewRecord {
        let record = ViewRecord {
            id: Uuid::new_v4().to_string(),
            issue_number: issue.number,
            title: issue.title.clone(),
            timestamp: now,
            reading_time_seconds: reading_time_seconds(issue.word_count()),
            source: issue.source.clone(),
            repo_owner: issue.repo_owner.clone(),
        };
        debug!(
            "Recording view of #{} ({}s)",
            record.issue_number, record.reading_time_seconds
        );

        self.storage.update(keys::ANALYTICS, |data: &mut AnalyticsData| {
            data.view_history.insert(0, record.clone());
            data.view_history.truncate(self.max_view_history);
            *data.most_viewed.entry(issue.number).or_insert(0) += 1;
            data.reading_time_total += record.reading_time_seconds;
            for label in &issue.labels {
                *data.tags_interacted.entry(label.name.clone()).or_insert(0) += 1;
            }
            data.last_active = Some(now);

            // A view only marks the repo as recently seen
            if let (Some(source), Some(owner), Some(name)) =
                (&issue.source, &issue.repo_owner, &issue.repo_name)
            {
                self.upsert_repo(data, source, owner, name, 0, 0, now);
            }
        });

        record
    }

    /// Add `created`/`updated` to the repo's counters (never resets them)
    pub fn record_repo_activity(
        &self,
        repo_id: &str,
        owner: &str,
        name: &str,
        created: u64,
        updated: u64,
    ) {
        self.record_repo_activity_at(repo_id, owner, name, created, updated, Utc::now());
    }

    pub fn record_repo_activity_at(
        &self,
        repo_id: &str,
        owner: &str,
        name: &str,
        created: u64,
        updated: u64,
        now: DateTime<Utc>,
    ) {
        self.storage.update(keys::ANALYTICS, |data: &mut AnalyticsData| {
            self.upsert_repo(data, repo_id, owner, name, created, updated, now);
        });
    }

    /// Remember a search query. Blank queries are ignored.
    pub fn record_search(&self, query: &str) {
        let query = query.trim();
        if query.is_empty() {
            return;
        }
        self.storage.update(keys::ANALYTICS, |data: &mut AnalyticsData| {
            data.search_queries.push(query.to_string());
            let overflow = data.search_queries.len().saturating_sub(MAX_SEARCH_QUERIES);
            data.search_queries.drain(..overflow);
            data.last_active = Some(Utc::now());
        });
    }

    /// Current analytics, or empty data when storage can't be read
    pub fn snapshot(&self) -> AnalyticsData {
        self.storage.load_or_default(keys::ANALYTICS)
    }

    pub fn clear_all(&self) -> bool {
        self.storage.remove(keys::ANALYTICS)
    }

    #[allow(clippy::too_many_arguments)]
    fn upsert_repo(
        &self,
        data: &mut AnalyticsData,
        repo_id: &str,
        owner: &str,
        name: &str,
        created: u64,
        updated: u64,
        now: DateTime<Utc>,
    ) {
        let entry = data
            .repo_activity
            .entry(repo_id.to_string())
            .or_insert_with(|| RepoActivity {
                repo_id: repo_id.to_string(),
                repo_owner: owner.to_string(),
                repo_name: name.to_string(),
                created: 0,
                updated: 0,
                last_fetched_at: now,
            });
        entry.created += created;
        entry.updated += updated;
        entry.last_fetched_at = now;

        evict_stale_repos(&mut data.repo_activity, self.max_tracked_repos, repo_id);
    }
}

/// Drop the least recently fetched repos beyond `max`, never `keep`
fn evict_stale_repos(activity: &mut BTreeMap<String, RepoActivity>, max: usize, keep: &str) {
    let overflow = activity.len().saturating_sub(max);
    if overflow == 0 {
        return;
    }

    let mut candidates: Vec<(DateTime<Utc>, String)> = activity
        .values()
        .filter(|a| a.repo_id != keep)
        .map(|a| (a.last_fetched_at, a.repo_id.clone()))
        .collect();
    candidates.sort();

    let evicted: HashSet<String> = candidates
        .into_iter()
        .take(overflow)
        .map(|(_, id)| id)
        .collect();
    debug!("Evicting {} stale repo activity row(s)", evicted.len());
    activity.retain(|id, _| !evicted.contains(id));
}
