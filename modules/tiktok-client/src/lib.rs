pub mod error;
pub mod types;

pub use error::{Result, TikTokError};
pub use types::{ApiEnvelope, RawStats, RawVideo, UserPostsData, VideoInfoResponse};

use bytes::Bytes;
use serde::de::DeserializeOwned;
use url::Url;

/// RapidAPI host serving `user/posts`.
pub const DEFAULT_POSTS_HOST: &str = "tiktok-scraper7.p.rapidapi.com";

/// RapidAPI host serving `video/info_v2`.
pub const DEFAULT_STATS_HOST: &str = "tiktok-scraper2.p.rapidapi.com";

/// Public web URL of a video, used as the lookup key by the detail endpoint.
pub fn canonical_video_url(handle: &str, video_id: &str) -> String {
    format!("https://www.tiktok.com/@{handle}/video/{video_id}")
}

pub struct TikTokClient {
    client: reqwest::Client,
    api_key: String,
    posts_host: String,
    stats_host: String,
}

impl TikTokClient {
    pub fn new(api_key: String) -> Self {
        Self::with_hosts(
            api_key,
            DEFAULT_POSTS_HOST.to_string(),
            DEFAULT_STATS_HOST.to_string(),
        )
    }

    pub fn with_hosts(api_key: String, posts_host: String, stats_host: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            posts_host,
            stats_host,
        }
    }

    fn posts_url(&self, user_id: &str, count: u32) -> Result<Url> {
        let base = format!("https://{}/user/posts", self.posts_host);
        let count = count.to_string();
        Ok(Url::parse_with_params(
            &base,
            &[
                ("user_id", user_id),
                ("count", count.as_str()),
                ("cursor", "0"),
            ],
        )?)
    }

    fn info_url(&self, handle: &str, video_id: &str) -> Result<Url> {
        let base = format!("https://{}/video/info_v2", self.stats_host);
        Ok(Url::parse_with_params(
            &base,
            &[
                ("video_url", canonical_video_url(handle, video_id).as_str()),
                ("video_id", video_id),
            ],
        )?)
    }

    async fn get_json<T: DeserializeOwned>(&self, host: &str, url: Url) -> Result<T> {
        let resp = self
            .client
            .get(url)
            .header("x-rapidapi-host", host)
            .header("x-rapidapi-key", &self.api_key)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(TikTokError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        let body = resp.text().await?;
        Ok(serde_json::from_str(&body)?)
    }

    /// Fetch the latest page of videos for an account. A response without a
    /// video list is treated as an empty page.
    pub async fn user_posts(&self, user_id: &str, count: u32) -> Result<Vec<RawVideo>> {
        let url = self.posts_url(user_id, count)?;
        let envelope: ApiEnvelope<UserPostsData> = self.get_json(&self.posts_host, url).await?;

        match envelope.data {
            Some(data) => {
                tracing::debug!(user_id, count = data.videos.len(), "Fetched user posts");
                Ok(data.videos)
            }
            None => {
                tracing::debug!(user_id, code = envelope.code, msg = %envelope.msg, "No video list in response");
                Ok(Vec::new())
            }
        }
    }

    /// Fetch the detail record for one video.
    pub async fn video_info(&self, handle: &str, video_id: &str) -> Result<VideoInfoResponse> {
        let url = self.info_url(handle, video_id)?;
        self.get_json(&self.stats_host, url).await
    }

    /// Download a raw asset (cover image). No API headers are sent.
    pub async fn download(&self, url: &str) -> Result<Bytes> {
        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(TikTokError::Api {
                status: status.as_u16(),
                message: format!("Failed to fetch asset {url}"),
            });
        }

        Ok(resp.bytes().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn posts_url_requests_single_first_page() {
        let client = TikTokClient::new("key".to_string());
        let url = client.posts_url("6789", 30).unwrap();
        assert_eq!(url.host_str(), Some(DEFAULT_POSTS_HOST));
        assert_eq!(url.path(), "/user/posts");
        assert_eq!(url.query(), Some("user_id=6789&count=30&cursor=0"));
    }

    #[test]
    fn info_url_encodes_canonical_video_url() {
        let client = TikTokClient::new("key".to_string());
        let url = client.info_url("some.creator", "7300").unwrap();
        assert_eq!(url.host_str(), Some(DEFAULT_STATS_HOST));

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (
                    "video_url".to_string(),
                    "https://www.tiktok.com/@some.creator/video/7300".to_string()
                ),
                ("video_id".to_string(), "7300".to_string()),
            ]
        );
    }

    #[test]
    fn rate_limit_is_recognised() {
        let err = TikTokError::Api {
            status: 429,
            message: "Too many requests".to_string(),
        };
        assert!(err.is_rate_limited());
        assert!(!TikTokError::Network("reset".to_string()).is_rate_limited());
    }
}
