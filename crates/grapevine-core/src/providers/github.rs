// GitHub provider implementation - bridges the API client with IssueFetcher
use async_trait::async_trait;
use grapevine_api::{GitHubClient, GitHubIssue, RetryConfig};

use crate::{
    fetcher::{IssueFetcher, IssuePage},
    models::{Author, Issue, Label, Source},
    Result,
};

/// Wrapper around GitHubClient that implements IssueFetcher
pub struct GitHubIssueFetcher {
    client: GitHubClient,
}

impl GitHubIssueFetcher {
    pub fn new(token: Option<String>, api_url: &str) -> Result<Self> {
        let client = GitHubClient::with_base_url(token, api_url.to_string())?;
        Ok(Self { client })
    }

    pub fn with_retry_config(mut self, retry_config: RetryConfig) -> Self {
        self.client = self.client.with_retry_config(retry_config);
        self
    }
}

#[async_trait]
impl IssueFetcher for GitHubIssueFetcher {
    async fn fetch_issues(&self, source: &Source, page: u32, per_page: u32) -> Result<IssuePage> {
        let listing = self
            .client
            .list_open_issues(&source.owner, &source.repo, page, per_page)
            .await?;

        Ok(IssuePage {
            issues: listing
                .issues
                .into_iter()
                .map(|gh| github_to_issue(gh, Some(source)))
                .collect(),
            total_count: listing.total_count,
        })
    }

    async fn fetch_issue(&self, source: &Source, number: u64) -> Result<Issue> {
        let issue = self
            .client
            .get_issue(&source.owner, &source.repo, number)
            .await?;
        Ok(github_to_issue(issue, Some(source)))
    }
}

/// Convert a raw GitHub issue to our Issue model.
///
/// With a source the issue is tagged with its origin; without one the origin
/// fields stay empty.
pub fn github_to_issue(gh: GitHubIssue, source: Option<&Source>) -> Issue {
    Issue {
        id: gh.id,
        number: gh.number,
        title: gh.title,
        body: gh.body.unwrap_or_default(),
        author: Author {
            login: gh.user.login,
            avatar_url: gh.user.avatar_url,
        },
        created_at: gh.created_at,
        updated_at: gh.updated_at,
        comment_count: gh.comments,
        labels: gh
            .labels
            .into_iter()
            .map(|l| Label {
                name: l.name,
                color: l.color,
            })
            .collect(),
        state: gh.state,
        html_url: gh.html_url,
        source: source.map(|s| s.id.clone()),
        repo_owner: source.map(|s| s.owner.clone()),
        repo_name: source.map(|s| s.repo.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_issue() -> GitHubIssue {
        serde_json::from_value(serde_json::json!({
            "id": 77,
            "number": 5,
            "title": "Hiring: Rust engineer",
            "body": null,
            "user": { "login": "recruiter", "avatar_url": "https://avatars.example/r" },
            "created_at": "2024-02-01T09:00:00Z",
            "updated_at": "2024-02-03T09:00:00Z",
            "comments": 4,
            "labels": [
                { "name": "remote", "color": "0e8a16" },
                { "name": "remote", "color": "0e8a16" }
            ],
            "state": "open",
            "html_url": "https://github.com/acme/jobs/issues/5"
        }))
        .unwrap()
    }

    #[test]
    fn test_normalization_tags_origin() {
        let source = Source::new("jobs", "acme", "jobs");
        let issue = github_to_issue(raw_issue(), Some(&source));

        assert_eq!(issue.body, "");
        assert_eq!(issue.comment_count, 4);
        assert_eq!(issue.source.as_deref(), Some("jobs"));
        assert_eq!(issue.repo_full_name().as_deref(), Some("acme/jobs"));
        // Labels keep API order and duplicates
        assert_eq!(issue.labels.len(), 2);
        assert!(issue.is_open());
    }

    #[test]
    fn test_normalization_without_source() {
        let issue = github_to_issue(raw_issue(), None);
        assert_eq!(issue.source, None);
        assert_eq!(issue.repo_owner, None);
        assert_eq!(issue.merge_key(), (None, 5));
    }
}
