use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use grapevine_core::{
    Author, Config, Error, Grapevine, Issue, IssueFetcher, IssuePage, Label, LoadState,
    SearchFilter, Source, ALL_CATEGORY,
};
use grapevine_store::{MemoryStore, SqliteStore};

/// Serves canned issue lists per source, paged like the GitHub API
struct ScriptedFetcher {
    issues: HashMap<String, Vec<Issue>>,
    calls: AtomicUsize,
}

impl ScriptedFetcher {
    fn new() -> Self {
        Self {
            issues: HashMap::new(),
            calls: AtomicUsize::new(0),
        }
    }

    /// `count` issues for `source`, updated at `offset_h + 2*i` hours
    fn with_issues(mut self, source: &Source, count: u64, offset_h: i64) -> Self {
        let base = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let issues = (1..=count)
            .map(|n| Issue {
                id: n,
                number: n,
                title: format!("{} issue {}", source.repo, n),
                body: "one two three four five six seven eight nine ten ".repeat(6),
                author: Author {
                    login: format!("{}-author", source.repo),
                    avatar_url: String::new(),
                },
                created_at: base,
                updated_at: base + Duration::hours(offset_h + 2 * n as i64),
                comment_count: 0,
                labels: vec![Label {
                    name: if n % 2 == 0 { "even" } else { "odd" }.to_string(),
                    color: "ffffff".to_string(),
                }],
                state: "open".to_string(),
                html_url: format!("https://github.com/{}/issues/{}", source.full_name(), n),
                source: Some(source.id.clone()),
                repo_owner: Some(source.owner.clone()),
                repo_name: Some(source.repo.clone()),
            })
            .collect();
        self.issues.insert(source.id.clone(), issues);
        self
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IssueFetcher for ScriptedFetcher {
    async fn fetch_issues(
        &self,
        source: &Source,
        page: u32,
        per_page: u32,
    ) -> grapevine_core::Result<IssuePage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let all = self
            .issues
            .get(&source.id)
            .ok_or_else(|| Error::NotFound(source.full_name()))?;

        let start = ((page - 1) * per_page) as usize;
        let issues: Vec<Issue> = all.iter().skip(start).take(per_page as usize).cloned().collect();
        Ok(IssuePage {
            total_count: all.len() as u64,
            issues,
        })
    }

    async fn fetch_issue(&self, source: &Source, number: u64) -> grapevine_core::Result<Issue> {
        self.issues
            .get(&source.id)
            .and_then(|issues| issues.iter().find(|i| i.number == number))
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("{}#{}", source.id, number)))
    }
}

fn sources() -> (Source, Source) {
    (
        Source::new("a", "acme", "alpha").with_category("community"),
        Source::new("b", "acme", "beta").with_category("jobs"),
    )
}

fn config(per_page: u32) -> Config {
    let (a, b) = sources();
    let mut config = Config::default();
    config.github.per_page = per_page;
    config.sources = vec![a, b];
    config
}

#[tokio::test]
async fn test_two_sources_merge_into_one_sorted_page() {
    let (a, b) = sources();
    // A has more than a page, B fits in one
    let fetcher = Arc::new(ScriptedFetcher::new().with_issues(&a, 12, 0).with_issues(&b, 3, 1));
    let grapevine =
        Grapevine::with_fetcher(config(10), Arc::new(MemoryStore::new()), fetcher.clone())
            .unwrap();

    let page = grapevine
        .fetch_page(ALL_CATEGORY, 1, 10, &SearchFilter::default())
        .await
        .unwrap();

    assert_eq!(page.issues.len(), 13);
    assert_eq!(page.total_count, 15);
    assert!(page.has_more);
    assert!(page
        .issues
        .windows(2)
        .all(|pair| pair[0].updated_at >= pair[1].updated_at));
    assert_eq!(fetcher.calls(), 2);
}

#[tokio::test]
async fn test_feed_pages_until_sources_run_dry() {
    let (a, b) = sources();
    let fetcher = Arc::new(ScriptedFetcher::new().with_issues(&a, 12, 0).with_issues(&b, 3, 1));
    let grapevine =
        Grapevine::with_fetcher(config(10), Arc::new(MemoryStore::new()), fetcher).unwrap();
    let registry = grapevine.registry().clone();

    let mut feed = grapevine.feed(ALL_CATEGORY);
    feed.refresh(&registry).await.unwrap();
    assert_eq!(feed.loaded().len(), 13);
    assert!(feed.controller().has_more_pages());

    // Page 2: A returns its last 2, B returns nothing
    assert!(feed.load_more(&registry).await.unwrap());
    assert_eq!(feed.loaded().len(), 15);
    assert!(!feed.controller().has_more_pages());
    assert!(!feed.load_more(&registry).await.unwrap());
    assert_eq!(feed.state(), &LoadState::Succeeded);
}

#[tokio::test]
async fn test_category_feed_with_filter() {
    let (a, b) = sources();
    let fetcher = Arc::new(ScriptedFetcher::new().with_issues(&a, 12, 0).with_issues(&b, 3, 1));
    let grapevine =
        Grapevine::with_fetcher(config(4), Arc::new(MemoryStore::new()), fetcher.clone()).unwrap();
    let registry = grapevine.registry().clone();

    let mut feed = grapevine
        .feed("community")
        .with_filter(SearchFilter::new().label("even"));
    feed.refresh(&registry).await.unwrap();

    // Two even issues per page of 4, so the feed needs three pages for five
    assert!(feed.visible().len() >= 5);
    assert!(feed.visible().iter().all(|i| i.source.as_deref() == Some("a")));
    assert_eq!(feed.controller().current_page(), 3);
    assert_eq!(fetcher.calls(), 3);
}

#[tokio::test]
async fn test_empty_category_fetches_nothing() {
    let (a, b) = sources();
    let fetcher = Arc::new(ScriptedFetcher::new().with_issues(&a, 1, 0).with_issues(&b, 1, 0));
    let grapevine =
        Grapevine::with_fetcher(config(10), Arc::new(MemoryStore::new()), fetcher.clone())
            .unwrap();

    let page = grapevine
        .fetch_page("newsletter", 1, 10, &SearchFilter::default())
        .await
        .unwrap();
    assert!(page.issues.is_empty());
    assert_eq!(page.total_count, 0);
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn test_one_broken_source_fails_the_aggregate_unless_partial() {
    let (a, _) = sources();
    // B has no script, so it answers NotFound
    let fetcher = Arc::new(ScriptedFetcher::new().with_issues(&a, 2, 0));

    let strict =
        Grapevine::with_fetcher(config(10), Arc::new(MemoryStore::new()), fetcher.clone())
            .unwrap();
    let result = strict
        .fetch_page(ALL_CATEGORY, 1, 10, &SearchFilter::default())
        .await;
    assert!(matches!(result, Err(Error::NotFound(_))));

    let mut lenient_config = config(10);
    lenient_config.feed.partial_results = true;
    let lenient =
        Grapevine::with_fetcher(lenient_config, Arc::new(MemoryStore::new()), fetcher).unwrap();
    let page = lenient
        .fetch_page(ALL_CATEGORY, 1, 10, &SearchFilter::default())
        .await
        .unwrap();
    assert_eq!(page.issues.len(), 2);
    assert_eq!(page.failures.len(), 1);
}

#[tokio::test]
async fn test_views_persist_across_restarts() {
    let dir = tempfile::tempdir().unwrap();
    let db = dir.path().join("grapevine.db");
    let (a, b) = sources();

    {
        let fetcher = Arc::new(ScriptedFetcher::new().with_issues(&a, 3, 0).with_issues(&b, 1, 0));
        let grapevine =
            Grapevine::with_fetcher(config(10), Arc::new(SqliteStore::open(&db).unwrap()), fetcher)
                .unwrap();
        for _ in 0..3 {
            grapevine.view_issue("a", 2).await.unwrap();
        }
        grapevine.view_issue("b", 1).await.unwrap();
        grapevine.dispose();
    }

    let fetcher = Arc::new(ScriptedFetcher::new());
    let grapevine =
        Grapevine::with_fetcher(config(10), Arc::new(SqliteStore::open(&db).unwrap()), fetcher)
            .unwrap();
    let data = grapevine.analytics().snapshot();

    assert_eq!(data.view_history.len(), 4);
    // 60 words -> 12 seconds per view
    assert_eq!(data.reading_time_total, 48);
    assert_eq!(data.most_viewed(1), vec![(2, 3)]);
    assert_eq!(data.tags_interacted.get("even"), Some(&3));
    assert_eq!(data.repo_activity.len(), 2);
    assert_eq!(data.for_author("acme").total_views(), 4);
}
