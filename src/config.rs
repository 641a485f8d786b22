use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::Url;

/// How often leaderboard and uploads are re-fetched while logged in.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Backend base endpoint, without a trailing slash.
    pub api_url: String,
    /// Prefix for uploaded image filenames.
    pub upload_url: String,
    pub poll_interval: Duration,
}

impl Config {
    /// Builds a config for `api_url`, with uploads served from `<api_url>/uploads`.
    pub fn new(api_url: &str) -> Result<Self> {
        let api_url = normalize_url(api_url)
            .with_context(|| format!("Invalid backend URL: {api_url}"))?;

        Ok(Self {
            upload_url: format!("{api_url}/uploads"),
            api_url,
            poll_interval: DEFAULT_POLL_INTERVAL,
        })
    }

    /// Reads `TRIVIA_API_URL` (required) and `TRIVIA_UPLOAD_URL` (optional)
    /// from the environment, after loading `.env` if one exists.
    pub fn from_env() -> Result<Self> {
        dotenv::dotenv().ok();

        let api_url = env::var("TRIVIA_API_URL")
            .context("Expected 'TRIVIA_API_URL=<backend url>' in the environment or .env.")?;
        let config = Self::new(&api_url)?;

        match env::var("TRIVIA_UPLOAD_URL") {
            Ok(upload_url) => config.with_upload_url(&upload_url),
            Err(_) => Ok(config),
        }
    }

    pub fn with_upload_url(mut self, upload_url: &str) -> Result<Self> {
        self.upload_url = normalize_url(upload_url)
            .with_context(|| format!("Invalid upload URL: {upload_url}"))?;
        Ok(self)
    }

    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Joins `path` onto the backend endpoint.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.api_url, path.trim_start_matches('/'))
    }
}

fn normalize_url(raw: &str) -> Result<String> {
    let trimmed = raw.trim();
    Url::parse(trimmed)?;
    Ok(trimmed.trim_end_matches('/').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_url_defaults_under_api_url() {
        let config = Config::new("http://localhost:5000/").unwrap();
        assert_eq!(config.api_url, "http://localhost:5000");
        assert_eq!(config.upload_url, "http://localhost:5000/uploads");
        assert_eq!(config.poll_interval, DEFAULT_POLL_INTERVAL);
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let config = Config::new("https://trivia.example.com/api").unwrap();
        assert_eq!(config.endpoint("/login"), "https://trivia.example.com/api/login");
        assert_eq!(config.endpoint("uploads.json"), "https://trivia.example.com/api/uploads.json");
    }

    #[test]
    fn rejects_garbage_urls() {
        assert!(Config::new("not a url").is_err());
        assert!(Config::new("http://ok").unwrap().with_upload_url("::").is_err());
    }

    #[test]
    fn upload_url_override() {
        let config = Config::new("http://a").unwrap().with_upload_url("http://cdn/img/").unwrap();
        assert_eq!(config.upload_url, "http://cdn/img");
    }
}
