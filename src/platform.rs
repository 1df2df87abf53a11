use crate::config::PlatformConfig;
use crate::error::PlatformError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Account snapshot fetched for one processing pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub is_private: bool,
}

/// One post belonging to an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Media {
    pub id: String,
    #[serde(default)]
    pub is_liked_by_viewer: bool,
    #[serde(default)]
    pub is_comment_disabled: bool,
    /// Owning account, present on tag feeds
    #[serde(default)]
    pub owner_id: Option<String>,
}

/// A comment posted by the session account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub owner_id: String,
    pub media_id: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Follow relation created by a successful follow action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowedUser {
    pub followed_account_id: String,
    pub follower_account_id: String,
}

/// The identity the bot is authenticated as
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    pub username: String,
    pub account_id: String,
}

#[derive(Debug, Deserialize)]
struct SessionInfo {
    username: String,
}

#[derive(Debug, Serialize)]
struct CommentRequest<'a> {
    text: &'a str,
}

/// Scraping/API client operations used by the bot
#[async_trait]
pub trait PlatformClient: Send + Sync {
    async fn get_account_by_id(&self, id: &str) -> Result<Account, PlatformError>;
    async fn get_account(&self, username: &str) -> Result<Account, PlatformError>;
    async fn get_session_username(&self) -> Result<String, PlatformError>;
    async fn get_medias(&self, username: &str, limit: usize) -> Result<Vec<Media>, PlatformError>;
    async fn get_medias_by_tag(&self, tag: &str, limit: usize)
        -> Result<Vec<Media>, PlatformError>;
    async fn follow(&self, account_id: &str) -> Result<(), PlatformError>;
    async fn like(&self, media_id: &str) -> Result<(), PlatformError>;
    async fn comment(&self, media_id: &str, text: &str) -> Result<Comment, PlatformError>;
}

/// Resolve the session username and its account id in one step
pub async fn resolve_session<C: PlatformClient + ?Sized>(
    client: &C,
) -> Result<SessionIdentity, PlatformError> {
    let username = client.get_session_username().await?;
    let account = client.get_account(&username).await?;
    Ok(SessionIdentity {
        username,
        account_id: account.id,
    })
}

/// JSON-over-HTTP implementation of [`PlatformClient`]
#[derive(Clone)]
pub struct HttpPlatformClient {
    base_url: Url,
    access_token: String,
    http_client: reqwest::Client,
}

impl HttpPlatformClient {
    pub fn new(config: &PlatformConfig) -> Result<Self, PlatformError> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| PlatformError::InvalidUrl(format!("{}: {e}", config.base_url)))?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(format!("Engager/{}", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PlatformError::Transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            access_token: config.access_token.clone(),
            http_client,
        })
    }

    /// Append percent-encoded path segments to the base URL
    fn endpoint(&self, segments: &[&str]) -> Result<Url, PlatformError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                PlatformError::InvalidUrl(format!("{} cannot be a base", self.base_url))
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, PlatformError> {
        let response = request
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(|e| PlatformError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!("Platform request failed: HTTP {status}: {message}");
            return Err(PlatformError::Request {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, String)],
    ) -> Result<T, PlatformError> {
        debug!("GET {}", url);
        let response = self.send(self.http_client.get(url).query(query)).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| PlatformError::InvalidResponse(e.to_string()))
    }

    async fn post_empty(&self, url: Url) -> Result<(), PlatformError> {
        debug!("POST {}", url);
        self.send(self.http_client.post(url)).await?;
        Ok(())
    }
}

#[async_trait]
impl PlatformClient for HttpPlatformClient {
    async fn get_account_by_id(&self, id: &str) -> Result<Account, PlatformError> {
        let url = self.endpoint(&["accounts", id])?;
        self.get_json(url, &[]).await
    }

    async fn get_account(&self, username: &str) -> Result<Account, PlatformError> {
        let url = self.endpoint(&["accounts", "lookup"])?;
        self.get_json(url, &[("username", username.to_string())])
            .await
    }

    async fn get_session_username(&self) -> Result<String, PlatformError> {
        let url = self.endpoint(&["session"])?;
        let session: SessionInfo = self.get_json(url, &[]).await?;
        Ok(session.username)
    }

    async fn get_medias(&self, username: &str, limit: usize) -> Result<Vec<Media>, PlatformError> {
        let url = self.endpoint(&["users", username, "media"])?;
        self.get_json(url, &[("limit", limit.to_string())]).await
    }

    async fn get_medias_by_tag(
        &self,
        tag: &str,
        limit: usize,
    ) -> Result<Vec<Media>, PlatformError> {
        let url = self.endpoint(&["tags", tag, "media"])?;
        self.get_json(url, &[("limit", limit.to_string())]).await
    }

    async fn follow(&self, account_id: &str) -> Result<(), PlatformError> {
        let url = self.endpoint(&["accounts", account_id, "follow"])?;
        self.post_empty(url).await
    }

    async fn like(&self, media_id: &str) -> Result<(), PlatformError> {
        let url = self.endpoint(&["media", media_id, "like"])?;
        self.post_empty(url).await
    }

    async fn comment(&self, media_id: &str, text: &str) -> Result<Comment, PlatformError> {
        let url = self.endpoint(&["media", media_id, "comments"])?;
        debug!("POST {}", url);
        let response = self
            .send(self.http_client.post(url).json(&CommentRequest { text }))
            .await?;
        response
            .json::<Comment>()
            .await
            .map_err(|e| PlatformError::InvalidResponse(e.to_string()))
    }
}
