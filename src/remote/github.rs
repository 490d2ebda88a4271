// file: src/remote/github.rs
// description: GitHub REST API client for repository and contents endpoints
// reference: https://docs.github.com/en/rest

use crate::config::GithubConfig;
use crate::error::{BackupError, Result};
use crate::remote::client::{PutFileRequest, RemoteContent, RemoteRepoClient, RemoteRepository};
use crate::utils::Validator;
use async_trait::async_trait;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, Response, StatusCode, Url};
use serde_json::json;
use tracing::debug;

const PER_PAGE: usize = 100;
const API_VERSION: &str = "2022-11-28";
const MAX_ERROR_BODY: usize = 200;

pub struct GithubClient {
    client: Client,
    api_url: Url,
    token: String,
}

impl GithubClient {
    pub fn new(config: &GithubConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(API_VERSION),
        );

        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .default_headers(headers)
            .build()?;

        Self::with_client(client, &config.api_url, config.token.clone())
    }

    pub fn with_client(client: Client, api_url: &str, token: String) -> Result<Self> {
        let api_url = Url::parse(api_url.trim_end_matches('/'))
            .map_err(|e| BackupError::Config(format!("Invalid api_url {}: {}", api_url, e)))?;

        if api_url.cannot_be_a_base() {
            return Err(BackupError::Config(format!(
                "api_url cannot be used as a base: {}",
                api_url
            )));
        }

        Ok(Self {
            client,
            api_url,
            token,
        })
    }

    fn endpoint<'a>(&self, segments: impl IntoIterator<Item = &'a str>) -> Url {
        let mut url = self.api_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn repos_url(&self) -> Url {
        self.endpoint(["user", "repos"])
    }

    fn contents_url(&self, owner: &str, repo: &str, path: &str) -> Url {
        self.endpoint(
            ["repos", owner, repo, "contents"]
                .into_iter()
                .chain(path.split('/').filter(|segment| !segment.is_empty())),
        )
    }

    async fn api_error(response: Response) -> BackupError {
        let status = response.status();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        let message = serde_json::from_str::<serde_json::Value>(&body)
            .ok()
            .and_then(|value| value["message"].as_str().map(str::to_string))
            .unwrap_or(body);

        BackupError::Api {
            status: status.as_u16(),
            message: Validator::truncate_text(&message, MAX_ERROR_BODY),
        }
    }
}

#[async_trait]
impl RemoteRepoClient for GithubClient {
    async fn list_owned_repositories(&self) -> Result<Vec<RemoteRepository>> {
        let mut repositories = Vec::new();
        let mut page = 1usize;

        loop {
            let response = self
                .client
                .get(self.repos_url())
                .bearer_auth(&self.token)
                .query(&[
                    ("affiliation", "owner".to_string()),
                    ("per_page", PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ])
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(Self::api_error(response).await);
            }

            let batch: Vec<RemoteRepository> = response.json().await?;
            let batch_len = batch.len();
            repositories.extend(batch);

            debug!("Listed page {} ({} repositories)", page, batch_len);

            if batch_len < PER_PAGE {
                break;
            }
            page += 1;
        }

        Ok(repositories)
    }

    async fn create_repository(&self, name: &str, private: bool) -> Result<RemoteRepository> {
        let response = self
            .client
            .post(self.repos_url())
            .bearer_auth(&self.token)
            .json(&json!({ "name": name, "private": private }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        Ok(response.json().await?)
    }

    async fn get_file_content(
        &self,
        owner: &str,
        repo: &str,
        path: &str,
    ) -> Result<Option<RemoteContent>> {
        let response = self
            .client
            .get(self.contents_url(owner, repo, path))
            .bearer_auth(&self.token)
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => {
                let body = response.text().await?;
                Ok(Some(serde_json::from_str(&body)?))
            }
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn create_or_update_file(
        &self,
        owner: &str,
        repo: &str,
        request: &PutFileRequest,
    ) -> Result<()> {
        let response = self
            .client
            .put(self.contents_url(owner, repo, &request.path))
            .bearer_auth(&self.token)
            .json(request)
            .send()
            .await?;

        match response.status() {
            StatusCode::OK | StatusCode::CREATED => Ok(()),
            StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                Err(BackupError::Conflict(request.path.clone()))
            }
            _ => Err(Self::api_error(response).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_url: &str) -> GithubClient {
        GithubClient::with_client(Client::new(), api_url, "token".to_string()).unwrap()
    }

    #[test]
    fn test_repos_url() {
        let github = client("https://api.github.com");
        assert_eq!(github.repos_url().as_str(), "https://api.github.com/user/repos");
    }

    #[test]
    fn test_contents_url_encodes_segments() {
        let github = client("https://api.github.com/");
        let url = github.contents_url("octocat", "backup", "sub dir/notes #1.txt");
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/octocat/backup/contents/sub%20dir/notes%20%231.txt"
        );
    }

    #[test]
    fn test_enterprise_base_path_preserved() {
        let github = client("https://github.example.com/api/v3");
        let url = github.contents_url("team", "notes", "a.txt");
        assert_eq!(
            url.as_str(),
            "https://github.example.com/api/v3/repos/team/notes/contents/a.txt"
        );
    }

    #[test]
    fn test_rejects_invalid_api_url() {
        assert!(GithubClient::with_client(Client::new(), "not a url", String::new()).is_err());
        assert!(
            GithubClient::with_client(Client::new(), "mailto:someone@example.com", String::new())
                .is_err()
        );
    }

    #[test]
    fn test_new_from_config() {
        let config = GithubConfig {
            owner: "octocat".to_string(),
            token: "ghp_test".to_string(),
            api_url: "https://api.github.com".to_string(),
            user_agent: "gh_backup".to_string(),
        };
        assert!(GithubClient::new(&config).is_ok());
    }
}
