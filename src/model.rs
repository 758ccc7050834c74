//! Domain types shared across the crate.
//!
//! Serde renames keep the persisted JSON field names identical to what the
//! clients already write (`cTitle`, `nTimePref`, `publishedOn`, ...).

use crate::error::{ApiError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A validated draft as produced by the validator. Untrusted drafts enter the
/// system as raw `serde_json::Value` and only become a `Draft` after every
/// field rule passed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    pub title: String,
    /// Pricing is not chargeable yet; publication requires this to be `""`.
    pub price: String,
    pub language: String,
    pub intro: String,
    pub chapters: Vec<Chapter>,
    pub image: String,
    /// Present when a previously published path was edited and is being
    /// republished. Never reset by a republish.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published_on: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub c_title: String,
    pub c_content: String,
    pub c_notifications: Vec<Notification>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub n_title: String,
    pub n_body: String,
    pub n_time_pref: TimePref,
}

/// When during the day a notification may fire. At least one span must be
/// enabled for the notification to be valid.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimePref {
    pub bedtime: bool,
    pub morning: bool,
    pub noon: bool,
}

impl TimePref {
    pub fn any(&self) -> bool {
        self.bedtime || self.morning || self.noon
    }
}

/// The public record produced by a successful publish. `published_on` is set
/// on first publish and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedPath {
    pub title: String,
    pub price: String,
    pub language: String,
    pub intro: String,
    pub chapters: Vec<Chapter>,
    /// Rewritten to the published, publicly readable object URL.
    pub image: String,
    /// Owner's display name, or "anonymous" when the profile has none.
    pub user: String,
    pub uid: String,
    pub published_on: DateTime<Utc>,
}

/// Lossy projection of a published path used for list/browse views.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub id: String,
    pub uid: String,
    pub user: String,
    pub title: String,
    pub price: String,
    pub language: String,
    pub image: String,
    pub intro: String,
    pub published_on: DateTime<Utc>,
    pub chapters: Vec<Chapter>,
    pub likes: i64,
    pub dislikes: i64,
}

/// Tri-state association between one principal and one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Relation {
    None,
    Liked,
    Disliked,
}

impl Relation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Relation::None => "none",
            Relation::Liked => "liked",
            Relation::Disliked => "disliked",
        }
    }

    pub fn parse(value: &str) -> Option<Relation> {
        match value {
            "none" => Some(Relation::None),
            "liked" => Some(Relation::Liked),
            "disliked" => Some(Relation::Disliked),
            _ => None,
        }
    }
}

/// What a caller wants their relation to become.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteIntent {
    Like,
    Dislike,
    Unlike,
}

/// Authentication context supplied by the caller. This crate never issues
/// credentials, it only consumes them.
#[derive(Debug, Clone)]
pub struct Principal {
    uid: Option<String>,
}

impl Principal {
    pub fn authenticated(uid: impl Into<String>) -> Self {
        Self {
            uid: Some(uid.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self { uid: None }
    }

    /// The owning uid, or `Unauthenticated` when there is none.
    pub fn require_uid(&self) -> Result<&str> {
        self.uid.as_deref().ok_or(ApiError::Unauthenticated)
    }
}
