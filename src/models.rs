use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use itertools::Itertools;
use serde::{Deserialize, Serialize};

pub type QuestionId = u64;

/// Login credentials. Only ever held for the duration of a login call.
#[derive(Clone, Serialize)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self { username: username.into(), password: password.into() }
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,

    #[serde(rename = "question")]
    pub prompt: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,

    #[serde(rename = "image_required", default)]
    pub requires_image: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub points: Option<i64>,
}

impl Question {
    pub fn is_multiple_choice(&self) -> bool {
        self.options.as_ref().is_some_and(|opts| !opts.is_empty())
    }

    pub fn has_option(&self, choice: &str) -> bool {
        self.options
            .as_ref()
            .is_some_and(|opts| opts.iter().any(|opt| opt == choice))
    }
}

impl std::fmt::Display for Question {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {}", self.id, self.prompt)?;
        if let Some(points) = self.points {
            write!(f, " ({points} pts)")?;
        }
        if let Some(options) = &self.options {
            write!(f, "\n\tOptions: {}", options.iter().map(|o| format!("[{o}]")).join(" "))?;
        }
        if self.requires_image {
            write!(f, "\n\tAnswer with a photo upload.")?;
        }
        Ok(())
    }
}

/// One `(username, score)` row. The server sends these as two-element arrays.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "(String, i64)")]
pub struct LeaderboardEntry {
    pub username: String,
    pub score: i64,
}

impl From<(String, i64)> for LeaderboardEntry {
    fn from((username, score): (String, i64)) -> Self {
        Self { username, score }
    }
}

/// Leaderboard as last fetched. Order is whatever the server returned.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Leaderboard {
    pub entries: Vec<LeaderboardEntry>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl std::fmt::Display for Leaderboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.fetched_at {
            Some(at) => write!(f, "Leaderboard (as of {}):", at.format("%H:%M:%S"))?,
            None => write!(f, "Leaderboard (not loaded yet):")?,
        }
        for entry in &self.entries {
            write!(f, "\n\t{}: {}", entry.username, entry.score)?;
        }
        Ok(())
    }
}

/// A displayable uploaded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub url: String,
    pub label: String,
}

impl UploadedImage {
    /// Builds the image URL by prefixing `filename` with `upload_base`.
    /// The label is whatever precedes the first underscore in the filename.
    pub fn from_filename(upload_base: &str, filename: &str) -> Self {
        let label = filename.split('_').next().unwrap_or(filename).to_string();
        Self {
            url: format!("{}/{}", upload_base.trim_end_matches('/'), filename),
            label,
        }
    }
}

/// Upload index as served by `/uploads.json`: question id (as text) to filenames.
pub type RawUploadIndex = HashMap<String, Vec<String>>;

/// Per-question image URLs. Always rebuilt wholesale from a fresh [`RawUploadIndex`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageIndex(BTreeMap<QuestionId, Vec<UploadedImage>>);

impl ImageIndex {
    pub fn from_raw(raw: RawUploadIndex, upload_base: &str) -> Self {
        let mut index = BTreeMap::new();
        for (key, filenames) in raw {
            let Ok(id) = key.trim().parse::<QuestionId>() else {
                log::warn!("[ImageIndex::from_raw] Skipping non-numeric upload key: {key}");
                continue;
            };

            let images = filenames
                .iter()
                .map(|name| UploadedImage::from_filename(upload_base, name))
                .collect::<Vec<_>>();
            index.insert(id, images);
        }

        Self(index)
    }

    pub fn images_for(&self, id: QuestionId) -> &[UploadedImage] {
        self.0.get(&id).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Question ids the user has answered this session.
///
/// There is deliberately no way to remove an id: the set only grows.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnsweredSet(BTreeSet<QuestionId>);

impl AnsweredSet {
    /// Inserts `id`, returning `false` if it was already present.
    pub fn insert(&mut self, id: QuestionId) -> bool {
        self.0.insert(id)
    }

    pub fn contains(&self, id: QuestionId) -> bool {
        self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = QuestionId> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<QuestionId> for AnsweredSet {
    fn from_iter<T: IntoIterator<Item = QuestionId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl Extend<QuestionId> for AnsweredSet {
    fn extend<T: IntoIterator<Item = QuestionId>>(&mut self, iter: T) {
        self.0.extend(iter)
    }
}
