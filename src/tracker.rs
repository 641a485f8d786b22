//! Client-side view of a trivia session.
//!
//! [`SessionTracker`] owns everything the client knows about the logged-in
//! user: the question set (with options shuffled once at login), the set of
//! answered question ids, and the latest leaderboard and uploaded images.
//!
//! Answers are applied optimistically. A question is marked answered before
//! its request goes out and stays marked even if the request fails. The
//! leaderboard and image index are replaced wholesale by
//! [`SessionTracker::refresh_shared_state`], which runs on a timer for as long
//! as the session is authenticated.

pub(crate) mod poller;
pub mod state;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;
use tokio::sync::{Mutex, RwLock, watch};

use crate::api::{AnswerAck, ApiError, ImageUpload, TriviaApi};
use crate::config::Config;
use crate::models::{
    AnsweredSet, Credential, ImageIndex, Leaderboard, Question, QuestionId, UploadedImage,
};

use poller::Poller;
use state::{RefreshTicket, Session, shuffle_options};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackerError {
    #[error("not logged in")]
    NotAuthenticated,
    #[error("already logged in; log out first")]
    AlreadyAuthenticated,
    #[error("a login is already in progress")]
    LoginInProgress,
    #[error("login cancelled by logout")]
    LoginCancelled,
    #[error("login rejected ({0}); check username and password")]
    InvalidCredentials(reqwest::StatusCode),
    #[error("question {0} has already been answered")]
    AlreadyAnswered(QuestionId),
    #[error("no question with id {0}")]
    UnknownQuestion(QuestionId),
    #[error("\"{choice}\" is not an option for question {id}")]
    UnknownOption { id: QuestionId, choice: String },
    #[error("question {0} has no options to choose from")]
    NotMultipleChoice(QuestionId),
    #[error("question {0} does not take a photo")]
    NotImageQuestion(QuestionId),
    #[error(transparent)]
    Api(#[from] ApiError),
}

enum AnswerKind<'a> {
    Choice(&'a str),
    Image,
}

/// A question as the presentation layer should draw it.
#[derive(Debug, Clone, PartialEq)]
pub struct QuestionView {
    pub question: Question,
    pub answered: bool,
    pub images: Vec<UploadedImage>,
}

/// Read-only copy of the tracker state at one point in time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub username: Option<String>,
    pub questions: Vec<QuestionView>,
    pub answered: AnsweredSet,
    pub leaderboard: Leaderboard,
    pub all_answered: bool,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.username.is_some()
    }

    fn from_session(session: &Session) -> Self {
        let questions = session.questions
            .iter()
            .map(|q| QuestionView {
                question: q.clone(),
                answered: session.answered.contains(q.id),
                images: session.images.images_for(q.id).to_vec(),
            })
            .collect();

        Self {
            username: Some(session.username.clone()),
            questions,
            answered: session.answered.clone(),
            leaderboard: session.leaderboard.clone(),
            all_answered: session.all_questions_answered(),
        }
    }
}

pub(crate) struct Inner {
    api: Arc<dyn TriviaApi>,
    config: Config,
    session: RwLock<Option<Session>>,
    poller: Mutex<Option<Poller>>,
    /// Held for the whole of a login attempt.
    login: Mutex<()>,
    /// Bumped by every login attempt and every logout.
    next_session: AtomicU64,
    next_refresh: AtomicU64,
    revision: watch::Sender<u64>,
}

/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct SessionTracker {
    inner: Arc<Inner>,
}

impl SessionTracker {
    pub fn new(api: Arc<dyn TriviaApi>, config: Config) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(Inner {
                api,
                config,
                session: RwLock::new(None),
                poller: Mutex::new(None),
                login: Mutex::new(()),
                next_session: AtomicU64::new(0),
                next_refresh: AtomicU64::new(0),
                revision,
            }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Receives a new revision number after every state change.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    fn bump(&self) {
        self.inner.revision.send_modify(|rev| *rev += 1);
    }

    /// Authenticates, loads questions and prior answers, refreshes shared
    /// state once and starts the polling loop.
    ///
    /// On failure nothing is changed and the attempt is not retried. Only one
    /// login runs at a time; a second one fails before touching the backend.
    /// A [`SessionTracker::logout`] issued while the login is still waiting
    /// on the backend cancels it.
    pub async fn login(&self, credential: Credential) -> Result<(), TrackerError> {
        let Ok(_attempt) = self.inner.login.try_lock() else {
            return Err(TrackerError::LoginInProgress);
        };
        if self.inner.session.read().await.is_some() {
            return Err(TrackerError::AlreadyAuthenticated);
        }
        let session_id = self.inner.next_session.fetch_add(1, Ordering::SeqCst) + 1;

        let api = &self.inner.api;
        api.login(&credential).await.map_err(|err| match err {
            ApiError::Status(status) => TrackerError::InvalidCredentials(status),
            other => TrackerError::Api(other),
        })?;
        log::info!("[login] Logged in as {}", credential.username);

        let mut questions = api.fetch_questions()
            .await
            .inspect_err(|err| log::warn!("[login] Could not load questions: {err}"))
            .unwrap_or_default();
        shuffle_options(&mut questions, &mut rand::rng());

        let prior = api.fetch_answered_ids()
            .await
            .inspect_err(|err| log::warn!("[login] Could not load previous answers: {err}"))
            .unwrap_or_default()
            .into_iter()
            .collect::<AnsweredSet>();

        log::info!("[login] Loaded {} questions, {} already answered",
                   questions.len(), prior.len());

        {
            let mut guard = self.inner.session.write().await;
            if self.inner.next_session.load(Ordering::SeqCst) != session_id {
                log::info!("[login] Login as {} cancelled by logout", credential.username);
                return Err(TrackerError::LoginCancelled);
            }
            *guard = Some(Session::new(session_id, credential.username, questions, prior));
        }
        self.bump();

        self.refresh_shared_state().await;

        // A logout may have raced us; only the current session gets a poller.
        let mut slot = self.inner.poller.lock().await;
        let current = self.inner.session
            .read()
            .await
            .as_ref()
            .is_some_and(|s| s.id == session_id);
        if current {
            let poller = Poller::spawn(Arc::downgrade(&self.inner), self.inner.config.poll_interval);
            if let Some(old) = slot.replace(poller) {
                old.stop();
            }
        }

        Ok(())
    }

    /// Drops all session state and stops the polling loop. A login still in
    /// flight will not install its session.
    pub async fn logout(&self) {
        let previous = {
            let mut guard = self.inner.session.write().await;
            self.inner.next_session.fetch_add(1, Ordering::SeqCst);
            guard.take()
        };
        if let Some(poller) = self.inner.poller.lock().await.take() {
            poller.stop();
        }

        if let Some(session) = previous {
            log::info!("[logout] {} logged out", session.username);
            self.bump();
        }
    }

    /// Marks `id` answered under the state lock, so only one caller per id
    /// ever gets past this point.
    async fn claim(&self, id: QuestionId, kind: AnswerKind<'_>) -> Result<(), TrackerError> {
        let mut guard = self.inner.session.write().await;
        let session = guard.as_mut().ok_or(TrackerError::NotAuthenticated)?;

        {
            let question = session.question(id).ok_or(TrackerError::UnknownQuestion(id))?;
            if session.answered.contains(id) {
                return Err(TrackerError::AlreadyAnswered(id));
            }

            match kind {
                AnswerKind::Choice(_) if !question.is_multiple_choice() => {
                    return Err(TrackerError::NotMultipleChoice(id));
                }
                AnswerKind::Choice(choice) if !question.has_option(choice) => {
                    return Err(TrackerError::UnknownOption { id, choice: choice.to_string() });
                }
                AnswerKind::Image if !question.requires_image => {
                    return Err(TrackerError::NotImageQuestion(id));
                }
                _ => {}
            }
        }

        session.answered.insert(id);
        let complete = session.all_questions_answered();
        drop(guard);

        log::trace!("[claim] Question {id} marked answered");
        if complete {
            log::info!("[claim] All questions answered!");
        }
        self.bump();

        Ok(())
    }

    /// Marks question `id` answered and returns the request still to be sent.
    ///
    /// Once this returns `Ok`, every later attempt for `id` fails with
    /// [`TrackerError::AlreadyAnswered`], whether or not the answer is ever sent.
    pub async fn begin_answer(
        &self,
        id: QuestionId,
        choice: impl Into<String>,
    ) -> Result<PendingAnswer, TrackerError> {
        let choice = choice.into();
        self.claim(id, AnswerKind::Choice(&choice)).await?;
        Ok(PendingAnswer { tracker: self.clone(), id, choice })
    }

    /// Photo-answer counterpart of [`SessionTracker::begin_answer`].
    pub async fn begin_image_answer(
        &self,
        id: QuestionId,
        image: ImageUpload,
    ) -> Result<PendingUpload, TrackerError> {
        self.claim(id, AnswerKind::Image).await?;
        Ok(PendingUpload { tracker: self.clone(), id, image })
    }

    /// Submits `choice` for question `id`.
    ///
    /// The question is marked answered before the request is sent. If the
    /// request fails the mark stays and the error is returned.
    pub async fn submit_answer(&self, id: QuestionId, choice: &str) -> Result<AnswerAck, TrackerError> {
        self.begin_answer(id, choice).await?.send().await
    }

    /// Uploads a photo answer for question `id`, then refreshes shared state
    /// so the new image shows up without waiting for the next poll.
    pub async fn submit_image_answer(&self, id: QuestionId, image: ImageUpload) -> Result<(), TrackerError> {
        self.begin_image_answer(id, image).await?.send().await
    }

    /// Re-fetches the leaderboard and the upload index and replaces both.
    ///
    /// Returns what was applied, or `None` when logged out or when a newer
    /// refresh already landed. A part that fails to fetch keeps its old value.
    pub async fn refresh_shared_state(&self) -> Option<(Leaderboard, ImageIndex)> {
        let session = self.inner.session.read().await.as_ref()?.id;
        let seq = self.inner.next_refresh.fetch_add(1, Ordering::SeqCst) + 1;
        let ticket = RefreshTicket { session, seq };
        log::trace!("[refresh_shared_state] Starting refresh {seq}");

        let api = &self.inner.api;
        let (leaderboard, uploads) = tokio::join!(api.fetch_leaderboard(), api.fetch_upload_index());

        let leaderboard = leaderboard
            .inspect_err(|err| log::warn!("[refresh_shared_state] Leaderboard unavailable: {err}"))
            .ok();
        let images = uploads
            .inspect_err(|err| log::warn!("[refresh_shared_state] Uploads unavailable: {err}"))
            .ok()
            .map(|raw| ImageIndex::from_raw(raw, &self.inner.config.upload_url));

        let applied = {
            let mut guard = self.inner.session.write().await;
            let session = guard.as_mut()?;
            session
                .apply_refresh(ticket, leaderboard, images)
                .then(|| (session.leaderboard.clone(), session.images.clone()))
        };

        if applied.is_some() {
            self.bump();
        }
        applied
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.session.read().await.is_some()
    }

    pub async fn is_answered(&self, id: QuestionId) -> bool {
        self.inner.session
            .read()
            .await
            .as_ref()
            .is_some_and(|s| s.answered.contains(id))
    }

    pub async fn all_questions_answered(&self) -> bool {
        self.inner.session
            .read()
            .await
            .as_ref()
            .is_some_and(Session::all_questions_answered)
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.session
            .read()
            .await
            .as_ref()
            .map(SessionSnapshot::from_session)
            .unwrap_or_default()
    }

    /// Whether the polling loop is currently installed.
    pub async fn is_polling(&self) -> bool {
        self.inner.poller.lock().await.is_some()
    }
}

/// An answer already marked in the answered set, waiting to go out.
#[must_use = "the answer is only sent when `send` is awaited"]
pub struct PendingAnswer {
    tracker: SessionTracker,
    id: QuestionId,
    choice: String,
}

impl PendingAnswer {
    pub fn question_id(&self) -> QuestionId {
        self.id
    }

    pub async fn send(self) -> Result<AnswerAck, TrackerError> {
        let id = self.id;
        self.tracker.inner.api
            .submit_answer(id, &self.choice)
            .await
            .inspect_err(|err| log::warn!("[PendingAnswer::send] Answer for {id} was not recorded: {err}"))
            .map_err(TrackerError::from)
    }
}

/// A photo answer already marked in the answered set, waiting to be uploaded.
#[must_use = "the image is only uploaded when `send` is awaited"]
pub struct PendingUpload {
    tracker: SessionTracker,
    id: QuestionId,
    image: ImageUpload,
}

impl PendingUpload {
    pub fn question_id(&self) -> QuestionId {
        self.id
    }

    pub async fn send(self) -> Result<(), TrackerError> {
        let id = self.id;
        let uploaded = self.tracker.inner.api
            .upload_image(id, self.image)
            .await
            .inspect_err(|err| log::warn!("[PendingUpload::send] Upload for {id} failed: {err}"));

        self.tracker.refresh_shared_state().await;
        uploaded.map_err(TrackerError::from)
    }
}
