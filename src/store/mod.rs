//! Collaborator seams: the document store and the object store.
//!
//! The orchestrators only ever see these traits; concrete backends are
//! injected by the process entry point (or by tests, which substitute
//! recording/failing fakes). The crate ships a SQLite-backed document store
//! and a filesystem-backed object store.

use crate::model::{PublishedPath, Relation, Snippet};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

pub mod fs;
pub mod sqlite;

pub use fs::FsObjectStore;
pub use sqlite::{init_pool, run_migrations, SqliteStore};

/// The relation/counter mutation a vote commits as one atomic batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VotePatch {
    pub next: Relation,
    pub likes_delta: i64,
    pub dislikes_delta: i64,
}

/// Structured-document collaborator.
///
/// Drafts are untrusted client writes and are surfaced as raw JSON; published
/// paths and snippets are typed because this crate is their only writer.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_draft(&self, uid: &str, draft_id: &str) -> Result<Option<Value>>;
    async fn put_draft(&self, uid: &str, draft_id: &str, doc: &Value) -> Result<()>;
    async fn delete_draft(&self, uid: &str, draft_id: &str) -> Result<()>;

    /// Display name from the owner's profile document, if any.
    async fn username(&self, uid: &str) -> Result<Option<String>>;
    async fn upsert_user(&self, uid: &str, username: Option<&str>) -> Result<()>;

    async fn put_path(&self, uid: &str, path_id: &str, path: &PublishedPath) -> Result<()>;
    async fn get_path(&self, uid: &str, path_id: &str) -> Result<Option<PublishedPath>>;
    async fn delete_path(&self, uid: &str, path_id: &str) -> Result<()>;

    /// Create or replace a snippet projection. The vote counters of an
    /// already existing snippet are kept; the ones in `snippet` only seed a
    /// newly created row.
    async fn put_snippet(&self, snippet: &Snippet) -> Result<()>;
    async fn get_snippet(&self, path_id: &str) -> Result<Option<Snippet>>;
    async fn delete_snippet(&self, path_id: &str) -> Result<()>;

    /// Current relation between one principal and one path.
    async fn relation(&self, uid: &str, path_id: &str) -> Result<Relation>;

    /// Drop every principal's relation to a path. Runs when the path is
    /// deleted, so a later republish under the same id starts with no stale
    /// relations against its zeroed counters.
    async fn clear_votes(&self, path_id: &str) -> Result<()>;

    /// Apply a vote transition atomically: the relation mutation and the
    /// counter deltas commit together or not at all. The write is conditional
    /// on the relation still being `observed`; returns `false` (with nothing
    /// written) when a concurrent vote got there first.
    async fn commit_vote(
        &self,
        uid: &str,
        path_id: &str,
        observed: Relation,
        patch: VotePatch,
    ) -> Result<bool>;
}

/// Binary-object collaborator.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn exists(&self, object: &str) -> Result<bool>;

    /// Copy to the new location and remove the old object.
    async fn move_object(&self, src: &str, dst: &str) -> Result<()>;

    /// Flip an existing object to publicly readable. Safe to repeat.
    async fn make_public(&self, object: &str) -> Result<()>;
    async fn is_public(&self, object: &str) -> Result<bool>;

    /// Remove an object; absent objects are acknowledged as removed.
    async fn delete(&self, object: &str) -> Result<()>;

    /// Used by seeding, not by the publish/vote core.
    async fn upload(&self, bytes: &[u8], dst: &str) -> Result<()>;
}
