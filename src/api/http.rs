use async_trait::async_trait;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;

use crate::api::{AnswerAck, AnswerBody, ApiError, ApiResult, ImageUpload, TriviaApi};
use crate::config::Config;
use crate::models::{Credential, LeaderboardEntry, Question, QuestionId, RawUploadIndex};

/// [`TriviaApi`] over HTTP. Cookies from `/login` are replayed on every later call.
#[derive(Debug, Clone)]
pub struct HttpApi {
    client: Client,
    config: Config,
}

impl HttpApi {
    pub fn new(config: Config) -> ApiResult<Self> {
        let headers = HeaderMap::from_iter([
            (header::ACCEPT, HeaderValue::from_static("application/json")),
        ]);

        let client = Client::builder()
            .cookie_store(true)
            .default_headers(headers)
            .build()?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> ApiResult<T> {
        let url = self.config.endpoint(path);
        log::trace!("[get_json] GET {url}");

        let response = self.client.get(&url).send().await?;
        Ok(check_status(response)?.json::<T>().await?)
    }
}

/// Maps any non-2xx response to [`ApiError::Status`].
fn check_status(response: Response) -> ApiResult<Response> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        log::trace!("[check_status] {} answered {status}", response.url());
        Err(ApiError::Status(status))
    }
}

/// Some backends reply to `/answer` with an empty body or plain `{"success": true}`.
fn parse_ack(body: &str) -> AnswerAck {
    serde_json::from_str(body).unwrap_or_default()
}

#[async_trait]
impl TriviaApi for HttpApi {
    async fn login(&self, credential: &Credential) -> ApiResult<()> {
        log::trace!("[login] Logging in as {}...", credential.username);

        let response = self.client
            .post(self.config.endpoint("/login"))
            .json(credential)
            .send()
            .await?;

        check_status(response).map(|_| ())
    }

    async fn fetch_questions(&self) -> ApiResult<Vec<Question>> {
        self.get_json("/question").await
    }

    async fn fetch_answered_ids(&self) -> ApiResult<Vec<QuestionId>> {
        match self.get_json("/user-answers").await {
            Err(ApiError::Status(StatusCode::NOT_FOUND)) => {
                log::warn!("[fetch_answered_ids] Backend has no /user-answers route; \
                            assuming no prior answers.");
                Ok(Vec::new())
            }
            other => other,
        }
    }

    async fn submit_answer(&self, id: QuestionId, answer: &str) -> ApiResult<AnswerAck> {
        log::trace!("[submit_answer] Submitting answer for question {id}");

        let response = self.client
            .post(self.config.endpoint("/answer"))
            .json(&AnswerBody { id, answer })
            .send()
            .await?;

        let body = check_status(response)?.text().await?;
        Ok(parse_ack(&body))
    }

    async fn upload_image(&self, id: QuestionId, image: ImageUpload) -> ApiResult<()> {
        log::trace!("[upload_image] Uploading {} ({} bytes) for question {id}",
                    image.file_name, image.bytes.len());

        let part = Part::bytes(image.bytes).file_name(image.file_name);
        let form = Form::new()
            .text("id", id.to_string())
            .part("image", part);

        let response = self.client
            .post(self.config.endpoint("/upload"))
            .multipart(form)
            .send()
            .await?;

        check_status(response).map(|_| ())
    }

    async fn fetch_leaderboard(&self) -> ApiResult<Vec<LeaderboardEntry>> {
        self.get_json("/leaderboard").await
    }

    async fn fetch_upload_index(&self) -> ApiResult<RawUploadIndex> {
        self.get_json("/uploads.json").await
    }
}
