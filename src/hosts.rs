//! Git hosting-service helpers.
//!
//! Recognizes user/organization URLs of the common hosting services and
//! lists a user's repositories through the service API, so `ugit clone`
//! can fan out over an entire account. Repository URLs (one extra path
//! segment) deliberately do not match the user patterns and fall through
//! to a plain clone.

use anyhow::{Result, bail};
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde::Deserialize;
use tracing::{debug, warn};

pub const GITHUB_API: &str = "https://api.github.com";
pub const GITLAB_API: &str = "https://gitlab.com/api/v4";
pub const BITBUCKET_API: &str = "https://api.bitbucket.org/2.0";

const PAGE_SIZE: usize = 100;

/// Hosting services with recognizable URL shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    GitHub,
    GitLab,
    Bitbucket,
    Azure,
    AwsCodeCommit,
    SourceHut,
    Launchpad,
    Custom,
}

/// Last path segment of a repository URL, without a `.git` suffix.
pub fn extract_repo_name(url: &str) -> String {
    let url = url.trim_end_matches('/');
    let url = url.strip_suffix(".git").unwrap_or(url);
    url.rsplit('/').next().unwrap_or(url).to_string()
}

fn patterns() -> Vec<(HostKind, Regex)> {
    [
        (HostKind::GitHub, r"^https?://(www\.)?github\.com/([^/]+)/?$"),
        (HostKind::GitLab, r"^https?://(www\.)?gitlab\.com/([^/]+)/?$"),
        (
            HostKind::Bitbucket,
            r"^https?://(www\.)?bitbucket\.org/([^/]+)/?$",
        ),
        (
            HostKind::Azure,
            r"^https?://([^/]+)\.visualstudio\.com/([^/]+)/?$",
        ),
        (
            HostKind::AwsCodeCommit,
            r"^https?://git-codecommit\.[^/]+\.amazonaws\.com/v1/repos/([^/]+)/?$",
        ),
        (
            HostKind::SourceHut,
            r"^https?://(git|hg)\.sr\.ht/~([^/]+)/?$",
        ),
        (HostKind::Launchpad, r"^https?://launchpad\.net/([^/]+)/?$"),
        (HostKind::Custom, r"^https?://([^/]+)/([^/]+)/?$"),
    ]
    .into_iter()
    .map(|(kind, pat)| (kind, Regex::new(pat).unwrap()))
    .collect()
}

/// Decide whether `url` names a whole account rather than a single
/// repository, and extract the username if so.
///
/// AWS CodeCommit has no user URLs, so its repository URLs never
/// classify as one.
pub fn classify_user_url(url: &str) -> Option<(HostKind, String)> {
    let trimmed = url.trim_end_matches('/');
    for (kind, re) in patterns() {
        if !re.is_match(trimmed) {
            continue;
        }
        if kind == HostKind::AwsCodeCommit {
            return None;
        }
        let user = trimmed.rsplit('/').next()?.trim_start_matches('~');
        return Some((kind, user.to_string()));
    }
    None
}

/// HTTP client for hosting-service APIs.
pub fn api_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    headers.insert(USER_AGENT, HeaderValue::from_static("ugit"));
    let client = Client::builder().default_headers(headers).build()?;
    Ok(client)
}

#[derive(Debug, Deserialize)]
struct GitHubRepo {
    clone_url: String,
}

#[derive(Debug, Deserialize)]
struct GitLabProject {
    http_url_to_repo: String,
}

#[derive(Debug, Deserialize)]
struct BitbucketPage {
    #[serde(default)]
    values: Vec<BitbucketRepo>,
    next: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BitbucketRepo {
    links: BitbucketLinks,
}

#[derive(Debug, Deserialize)]
struct BitbucketLinks {
    #[serde(default)]
    clone: Vec<CloneLink>,
}

#[derive(Debug, Deserialize)]
struct CloneLink {
    name: String,
    href: String,
}

/// List every clone URL of `username` on the given service.
///
/// `api_base` is the service API root (see the `*_API` constants);
/// injectable so tests can point at a mock server.
///
/// # Errors
/// Returns an error for services without a listing API, or when a
/// response cannot be decoded. A non-success status ends the walk with
/// the repositories collected so far, matching a best-effort sweep.
pub fn list_user_repos(
    client: &Client,
    kind: HostKind,
    username: &str,
    api_base: &str,
) -> Result<Vec<String>> {
    match kind {
        HostKind::GitHub => list_github(client, username, api_base),
        HostKind::GitLab => list_gitlab(client, username, api_base),
        HostKind::Bitbucket => list_bitbucket(client, username, api_base),
        other => bail!("automatic repository listing is not supported for {other:?}"),
    }
}

fn list_github(client: &Client, username: &str, api_base: &str) -> Result<Vec<String>> {
    let mut repos = Vec::new();
    let mut page = 1;
    loop {
        let url = format!("{api_base}/users/{username}/repos?per_page={PAGE_SIZE}&page={page}");
        debug!(%url, "listing repositories");
        let resp = client.get(&url).send()?;
        if !resp.status().is_success() {
            warn!(status = %resp.status(), "error fetching repositories");
            break;
        }
        let batch: Vec<GitHubRepo> = resp.json()?;
        if batch.is_empty() {
            break;
        }
        let n = batch.len();
        repos.extend(batch.into_iter().map(|r| r.clone_url));
        if n < PAGE_SIZE {
            break;
        }
        page += 1;
    }
    Ok(repos)
}

fn list_gitlab(client: &Client, username: &str, api_base: &str) -> Result<Vec<String>> {
    let mut repos = Vec::new();
    let mut page = 1;
    loop {
        let url = format!("{api_base}/users/{username}/projects?per_page={PAGE_SIZE}&page={page}");
        let mut resp = client.get(&url).send()?;
        if !resp.status().is_success() {
            // The name may be a group rather than a user.
            let group_url =
                format!("{api_base}/groups/{username}/projects?per_page={PAGE_SIZE}&page={page}");
            resp = client.get(&group_url).send()?;
            if !resp.status().is_success() {
                warn!(status = %resp.status(), "error fetching repositories");
                break;
            }
        }
        let batch: Vec<GitLabProject> = resp.json()?;
        if batch.is_empty() {
            break;
        }
        let n = batch.len();
        repos.extend(batch.into_iter().map(|p| p.http_url_to_repo));
        if n < PAGE_SIZE {
            break;
        }
        page += 1;
    }
    Ok(repos)
}

fn list_bitbucket(client: &Client, username: &str, api_base: &str) -> Result<Vec<String>> {
    let mut repos = Vec::new();
    let mut page = 1;
    loop {
        let url = format!("{api_base}/repositories/{username}?page={page}");
        let resp = client.get(&url).send()?;
        if !resp.status().is_success() {
            warn!(status = %resp.status(), "error fetching repositories");
            break;
        }
        let body: BitbucketPage = resp.json()?;
        if body.values.is_empty() {
            break;
        }
        for repo in &body.values {
            if let Some(link) = repo.links.clone.iter().find(|l| l.name == "https") {
                repos.push(link.href.clone());
            }
        }
        if body.next.is_none() {
            break;
        }
        page += 1;
    }
    Ok(repos)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[test]
    fn repo_name_strips_git_suffix_and_trailing_slash() {
        assert_eq!(
            extract_repo_name("https://github.com/user/project.git"),
            "project"
        );
        assert_eq!(
            extract_repo_name("https://github.com/user/project/"),
            "project"
        );
        assert_eq!(extract_repo_name("project"), "project");
    }

    #[test]
    fn user_urls_classify_per_host() {
        assert_eq!(
            classify_user_url("https://github.com/octocat"),
            Some((HostKind::GitHub, "octocat".to_string()))
        );
        assert_eq!(
            classify_user_url("https://www.gitlab.com/somegroup/"),
            Some((HostKind::GitLab, "somegroup".to_string()))
        );
        assert_eq!(
            classify_user_url("https://git.sr.ht/~anna"),
            Some((HostKind::SourceHut, "anna".to_string()))
        );
        assert_eq!(
            classify_user_url("https://example.org/mirrors"),
            Some((HostKind::Custom, "mirrors".to_string()))
        );
    }

    #[test]
    fn repository_urls_do_not_classify_as_user_urls() {
        assert_eq!(classify_user_url("https://github.com/user/project"), None);
        assert_eq!(
            classify_user_url(
                "https://git-codecommit.eu-west-1.amazonaws.com/v1/repos/myrepo"
            ),
            None
        );
        assert_eq!(classify_user_url("not a url"), None);
    }

    #[test]
    fn github_listing_collects_clone_urls() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/users/octocat/repos")
                .query_param("page", "1");
            then.status(200).json_body(serde_json::json!([
                {"clone_url": "https://github.com/octocat/a.git"},
                {"clone_url": "https://github.com/octocat/b.git"}
            ]));
        });

        let client = api_client().unwrap();
        let repos =
            list_user_repos(&client, HostKind::GitHub, "octocat", &server.base_url()).unwrap();

        mock.assert();
        assert_eq!(
            repos,
            vec![
                "https://github.com/octocat/a.git",
                "https://github.com/octocat/b.git"
            ]
        );
    }

    #[test]
    fn github_listing_stops_on_error_status() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/users/octocat/repos");
            then.status(403);
        });

        let client = api_client().unwrap();
        let repos =
            list_user_repos(&client, HostKind::GitHub, "octocat", &server.base_url()).unwrap();
        assert!(repos.is_empty());
    }

    #[test]
    fn gitlab_listing_falls_back_to_groups() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/users/acme/projects");
            then.status(404);
        });
        server.mock(|when, then| {
            when.method(GET).path("/groups/acme/projects");
            then.status(200).json_body(serde_json::json!([
                {"http_url_to_repo": "https://gitlab.com/acme/tool.git"}
            ]));
        });

        let client = api_client().unwrap();
        let repos =
            list_user_repos(&client, HostKind::GitLab, "acme", &server.base_url()).unwrap();
        assert_eq!(repos, vec!["https://gitlab.com/acme/tool.git"]);
    }

    #[test]
    fn bitbucket_listing_follows_next_pages() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET)
                .path("/repositories/team")
                .query_param("page", "1");
            then.status(200).json_body(serde_json::json!({
                "values": [
                    {"links": {"clone": [
                        {"name": "https", "href": "https://bitbucket.org/team/one.git"},
                        {"name": "ssh", "href": "ssh://bitbucket.org/team/one.git"}
                    ]}}
                ],
                "next": "more"
            }));
        });
        server.mock(|when, then| {
            when.method(GET)
                .path("/repositories/team")
                .query_param("page", "2");
            then.status(200).json_body(serde_json::json!({
                "values": [
                    {"links": {"clone": [
                        {"name": "https", "href": "https://bitbucket.org/team/two.git"}
                    ]}}
                ]
            }));
        });

        let client = api_client().unwrap();
        let repos =
            list_user_repos(&client, HostKind::Bitbucket, "team", &server.base_url()).unwrap();
        assert_eq!(
            repos,
            vec![
                "https://bitbucket.org/team/one.git",
                "https://bitbucket.org/team/two.git"
            ]
        );
    }

    #[test]
    fn unsupported_hosts_error_out() {
        let client = api_client().unwrap();
        assert!(list_user_repos(&client, HostKind::Launchpad, "x", "http://unused").is_err());
    }
}
