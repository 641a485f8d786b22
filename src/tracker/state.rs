use chrono::Utc;
use rand::Rng;
use rand::seq::SliceRandom;

use crate::models::{
    AnsweredSet, ImageIndex, Leaderboard, LeaderboardEntry, Question, QuestionId,
};

/// Identifies one refresh request: which session issued it, and in what order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTicket {
    pub session: u64,
    pub seq: u64,
}

/// Everything the client knows about the logged-in user's game.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: u64,
    pub username: String,
    pub questions: Vec<Question>,
    pub answered: AnsweredSet,
    pub leaderboard: Leaderboard,
    pub images: ImageIndex,

    last_refresh: u64,
}

impl Session {
    pub fn new(id: u64, username: String, questions: Vec<Question>, prior: AnsweredSet) -> Self {
        Self {
            id,
            username,
            questions,
            answered: prior,
            leaderboard: Leaderboard::default(),
            images: ImageIndex::default(),
            last_refresh: 0,
        }
    }

    pub fn question(&self, id: QuestionId) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    /// True once every loaded question has been answered.
    pub fn all_questions_answered(&self) -> bool {
        !self.questions.is_empty()
            && self.questions.iter().all(|q| self.answered.contains(q.id))
    }

    /// Replaces leaderboard and images with a refresh result, unless the
    /// result belongs to another session or is older than one already applied.
    ///
    /// `None` parts failed to fetch and keep their previous value.
    pub fn apply_refresh(
        &mut self,
        ticket: RefreshTicket,
        leaderboard: Option<Vec<LeaderboardEntry>>,
        images: Option<ImageIndex>,
    ) -> bool {
        if ticket.session != self.id || ticket.seq <= self.last_refresh {
            log::trace!("[apply_refresh] Discarding stale refresh {} (last applied {})",
                        ticket.seq, self.last_refresh);
            return false;
        }
        self.last_refresh = ticket.seq;

        if let Some(entries) = leaderboard {
            self.leaderboard = Leaderboard { entries, fetched_at: Some(Utc::now()) };
        }
        if let Some(images) = images {
            self.images = images;
        }

        true
    }
}

/// Shuffles each question's options independently. Questions without options are untouched.
pub fn shuffle_options<R: Rng + ?Sized>(questions: &mut [Question], rng: &mut R) {
    for options in questions.iter_mut().filter_map(|q| q.options.as_mut()) {
        options.shuffle(rng);
    }
}
