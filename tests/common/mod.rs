#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use reqwest::StatusCode;
use tokio::sync::Notify;

use trivia::api::{AnswerAck, ApiError, ApiResult, ImageUpload, TriviaApi};
use trivia::models::{Credential, LeaderboardEntry, Question, QuestionId, RawUploadIndex};
use trivia::{Config, SessionTracker};

pub const API_URL: &str = "http://trivia.test";

/// In-memory stand-in for the trivia backend.
#[derive(Default)]
pub struct FakeApi {
    pub users: HashMap<String, String>,
    pub questions: Mutex<Vec<Question>>,
    pub answer_key: HashMap<QuestionId, String>,
    /// Ids the backend has recorded as answered, served by `/user-answers`.
    pub prior_answers: Mutex<Vec<QuestionId>>,
    pub leaderboard: Mutex<Vec<LeaderboardEntry>>,
    pub uploads: Mutex<RawUploadIndex>,

    pub current_user: Mutex<Option<String>>,
    pub submitted: Mutex<Vec<(QuestionId, String)>>,
    pub uploaded: Mutex<Vec<(QuestionId, String)>>,

    pub login_calls: AtomicUsize,
    pub question_calls: AtomicUsize,
    pub leaderboard_calls: AtomicUsize,
    pub upload_index_calls: AtomicUsize,
    pub submits_entered: AtomicUsize,

    pub fail_submits: AtomicBool,
    pub fail_leaderboard: AtomicBool,
    /// When set, `submit_answer` waits for one notification before replying.
    pub submit_gate: Mutex<Option<Arc<Notify>>>,
    /// Same for `login`.
    pub login_gate: Mutex<Option<Arc<Notify>>>,
    /// Same for `fetch_leaderboard`.
    pub leaderboard_gate: Mutex<Option<Arc<Notify>>>,
}

pub fn multiple_choice(id: QuestionId, prompt: &str, options: &[&str]) -> Question {
    Question {
        id,
        prompt: prompt.to_string(),
        options: Some(options.iter().map(|o| o.to_string()).collect()),
        requires_image: false,
        points: Some(10),
    }
}

pub fn photo(id: QuestionId, prompt: &str) -> Question {
    Question {
        id,
        prompt: prompt.to_string(),
        options: None,
        requires_image: true,
        points: Some(15),
    }
}

pub fn entry(username: &str, score: i64) -> LeaderboardEntry {
    LeaderboardEntry { username: username.to_string(), score }
}

impl FakeApi {
    pub fn with_questions(questions: Vec<Question>) -> Self {
        Self {
            users: HashMap::from([
                ("jas".to_string(), "harhar".to_string()),
                ("test".to_string(), "tester".to_string()),
            ]),
            answer_key: HashMap::from([(7, "Paris".to_string()), (1, "2020".to_string())]),
            questions: Mutex::new(questions),
            leaderboard: Mutex::new(vec![entry("jas", 0), entry("test", 0)]),
            ..Default::default()
        }
    }

    /// The default game: three multiple-choice questions and one photo question.
    pub fn standard() -> Self {
        Self::with_questions(vec![
            multiple_choice(1, "What year did we meet?", &["2019", "2020", "2021", "2022"]),
            multiple_choice(3, "Favourite colour?", &["red", "green", "blue", "teal"]),
            multiple_choice(7, "Capital of France?", &["Paris", "Lyon", "Nice", "Lille"]),
            photo(9, "Upload a picture from our last trip"),
        ])
    }

    pub fn set_leaderboard(&self, entries: Vec<LeaderboardEntry>) {
        *self.leaderboard.lock().unwrap() = entries;
    }

    pub fn gate_submits(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.submit_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn gate_logins(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.login_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn gate_leaderboard(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.leaderboard_gate.lock().unwrap() = Some(gate.clone());
        gate
    }

    pub fn submitted(&self) -> Vec<(QuestionId, String)> {
        self.submitted.lock().unwrap().clone()
    }

    pub fn leaderboard_calls(&self) -> usize {
        self.leaderboard_calls.load(Ordering::SeqCst)
    }

    fn user(&self) -> ApiResult<String> {
        self.current_user
            .lock()
            .unwrap()
            .clone()
            .ok_or(ApiError::Status(StatusCode::UNAUTHORIZED))
    }
}

#[async_trait]
impl TriviaApi for FakeApi {
    async fn login(&self, credential: &Credential) -> ApiResult<()> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.login_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        match self.users.get(&credential.username) {
            Some(password) if *password == credential.password => {
                *self.current_user.lock().unwrap() = Some(credential.username.clone());
                Ok(())
            }
            _ => Err(ApiError::Status(StatusCode::UNAUTHORIZED)),
        }
    }

    async fn fetch_questions(&self) -> ApiResult<Vec<Question>> {
        self.question_calls.fetch_add(1, Ordering::SeqCst);
        self.user()?;
        Ok(self.questions.lock().unwrap().clone())
    }

    async fn fetch_answered_ids(&self) -> ApiResult<Vec<QuestionId>> {
        self.user()?;
        Ok(self.prior_answers.lock().unwrap().clone())
    }

    async fn submit_answer(&self, id: QuestionId, answer: &str) -> ApiResult<AnswerAck> {
        self.submits_entered.fetch_add(1, Ordering::SeqCst);
        self.user()?;

        let gate = self.submit_gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.fail_submits.load(Ordering::SeqCst) {
            return Err(ApiError::Status(StatusCode::INTERNAL_SERVER_ERROR));
        }

        self.submitted.lock().unwrap().push((id, answer.to_string()));
        self.prior_answers.lock().unwrap().push(id);
        let correct = self.answer_key.get(&id).map(|key| key == answer);
        Ok(AnswerAck { correct })
    }

    async fn upload_image(&self, id: QuestionId, image: ImageUpload) -> ApiResult<()> {
        let user = self.user()?;
        let filename = format!("{user}_{id}.jpg");

        self.uploaded.lock().unwrap().push((id, image.file_name));
        self.prior_answers.lock().unwrap().push(id);
        self.uploads
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .push(filename);
        Ok(())
    }

    async fn fetch_leaderboard(&self) -> ApiResult<Vec<LeaderboardEntry>> {
        self.leaderboard_calls.fetch_add(1, Ordering::SeqCst);
        let entries = self.leaderboard.lock().unwrap().clone();

        // One-shot: only the call that finds the gate waits on it.
        let gate = self.leaderboard_gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self.fail_leaderboard.load(Ordering::SeqCst) {
            return Err(ApiError::Status(StatusCode::BAD_GATEWAY));
        }
        Ok(entries)
    }

    async fn fetch_upload_index(&self) -> ApiResult<RawUploadIndex> {
        self.upload_index_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.uploads.lock().unwrap().clone())
    }
}

pub fn tracker(api: &Arc<FakeApi>) -> SessionTracker {
    let config = Config::new(API_URL).unwrap();
    SessionTracker::new(api.clone(), config)
}

pub fn jas() -> Credential {
    Credential::new("jas", "harhar")
}
