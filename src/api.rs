pub mod http;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Credential, LeaderboardEntry, Question, QuestionId, RawUploadIndex};

pub use http::HttpApi;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ApiError {
    #[error("server responded with status {0}")]
    Status(StatusCode),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error("could not read upload: {0}")]
    Io(#[from] std::io::Error),
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status(status) => Some(*status),
            ApiError::Http(err) => err.status(),
            ApiError::Io(_) => None,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Serialize)]
pub struct AnswerBody<'a> {
    pub id: QuestionId,
    pub answer: &'a str,
}

/// What the backend said about a submitted answer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct AnswerAck {
    /// `None` when the backend acknowledged without grading.
    #[serde(default)]
    pub correct: Option<bool>,
}

/// An image file ready to be sent as a multipart upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { file_name: file_name.into(), bytes }
    }

    /// Reads the file at `path` into memory.
    pub async fn from_path(path: impl AsRef<std::path::Path>) -> ApiResult<Self> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| String::from("upload.jpg"));

        Ok(Self { file_name, bytes })
    }
}

/// The backend's request/response surface. All calls share one cookie session.
#[async_trait]
pub trait TriviaApi: Send + Sync {
    /// `POST /login`. Any non-2xx is [`ApiError::Status`].
    async fn login(&self, credential: &Credential) -> ApiResult<()>;

    /// `GET /question`
    async fn fetch_questions(&self) -> ApiResult<Vec<Question>>;

    /// `GET /user-answers`: ids answered by this user in earlier sessions.
    async fn fetch_answered_ids(&self) -> ApiResult<Vec<QuestionId>>;

    /// `POST /answer`
    async fn submit_answer(&self, id: QuestionId, answer: &str) -> ApiResult<AnswerAck>;

    /// `POST /upload` (multipart: `id`, `image`)
    async fn upload_image(&self, id: QuestionId, image: ImageUpload) -> ApiResult<()>;

    /// `GET /leaderboard`
    async fn fetch_leaderboard(&self) -> ApiResult<Vec<LeaderboardEntry>>;

    /// `GET /uploads.json`
    async fn fetch_upload_index(&self) -> ApiResult<RawUploadIndex>;
}
