//! SQLite realization of the document collaborator.
//!
//! Documents are stored as JSON text keyed the same way the abstract store
//! keys them: drafts and paths by `(uid, id)`, snippets by path id. The vote
//! relation lives in its own table with a `(uid, path_id)` primary key, which
//! makes the like/dislike disjointness structural, and the snippet counters
//! live in columns so deltas can ride the same transaction as the relation
//! write.

use crate::model::{PublishedPath, Relation, Snippet};
use crate::store::{DocumentStore, VotePatch};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::{Row, SqlitePool};
use tracing::instrument;

pub type Pool = SqlitePool;

pub async fn init_pool(database_url: &str) -> Result<Pool> {
    let pool = SqlitePool::connect(database_url).await?;
    // Enable WAL and stricter durability.
    sqlx::query("PRAGMA journal_mode=WAL;").execute(&pool).await?;
    sqlx::query("PRAGMA synchronous=FULL;").execute(&pool).await?;
    Ok(pool)
}

pub async fn run_migrations(pool: &Pool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool,
}

impl SqliteStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for SqliteStore {
    #[instrument(skip_all)]
    async fn get_draft(&self, uid: &str, draft_id: &str) -> Result<Option<Value>> {
        let doc: Option<String> =
            sqlx::query_scalar("SELECT doc FROM drafts WHERE uid = ? AND draft_id = ?")
                .bind(uid)
                .bind(draft_id)
                .fetch_optional(&self.pool)
                .await?;
        doc.map(|d| serde_json::from_str(&d).context("stored draft is not valid JSON"))
            .transpose()
    }

    #[instrument(skip_all)]
    async fn put_draft(&self, uid: &str, draft_id: &str, doc: &Value) -> Result<()> {
        sqlx::query(
            "INSERT INTO drafts (uid, draft_id, doc) VALUES (?, ?, ?) \
             ON CONFLICT (uid, draft_id) DO UPDATE SET doc = excluded.doc",
        )
        .bind(uid)
        .bind(draft_id)
        .bind(serde_json::to_string(doc)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn delete_draft(&self, uid: &str, draft_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM drafts WHERE uid = ? AND draft_id = ?")
            .bind(uid)
            .bind(draft_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn username(&self, uid: &str) -> Result<Option<String>> {
        let name: Option<Option<String>> =
            sqlx::query_scalar("SELECT username FROM users WHERE uid = ?")
                .bind(uid)
                .fetch_optional(&self.pool)
                .await?;
        Ok(name.flatten())
    }

    #[instrument(skip_all)]
    async fn upsert_user(&self, uid: &str, username: Option<&str>) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (uid, username) VALUES (?, ?) \
             ON CONFLICT (uid) DO UPDATE SET username = excluded.username",
        )
        .bind(uid)
        .bind(username)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn put_path(&self, uid: &str, path_id: &str, path: &PublishedPath) -> Result<()> {
        sqlx::query(
            "INSERT INTO paths (uid, path_id, doc) VALUES (?, ?, ?) \
             ON CONFLICT (uid, path_id) DO UPDATE SET doc = excluded.doc",
        )
        .bind(uid)
        .bind(path_id)
        .bind(serde_json::to_string(path)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn get_path(&self, uid: &str, path_id: &str) -> Result<Option<PublishedPath>> {
        let doc: Option<String> =
            sqlx::query_scalar("SELECT doc FROM paths WHERE uid = ? AND path_id = ?")
                .bind(uid)
                .bind(path_id)
                .fetch_optional(&self.pool)
                .await?;
        doc.map(|d| serde_json::from_str(&d).context("stored path is not valid JSON"))
            .transpose()
    }

    #[instrument(skip_all)]
    async fn delete_path(&self, uid: &str, path_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM paths WHERE uid = ? AND path_id = ?")
            .bind(uid)
            .bind(path_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn put_snippet(&self, snippet: &Snippet) -> Result<()> {
        // Counters of an existing row are authoritative; only the projection
        // document is replaced on regeneration.
        sqlx::query(
            "INSERT INTO snippets (path_id, doc, likes, dislikes) VALUES (?, ?, ?, ?) \
             ON CONFLICT (path_id) DO UPDATE SET doc = excluded.doc",
        )
        .bind(&snippet.id)
        .bind(serde_json::to_string(snippet)?)
        .bind(snippet.likes)
        .bind(snippet.dislikes)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn get_snippet(&self, path_id: &str) -> Result<Option<Snippet>> {
        let row = sqlx::query("SELECT doc, likes, dislikes FROM snippets WHERE path_id = ?")
            .bind(path_id)
            .fetch_optional(&self.pool)
            .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let doc: String = row.get("doc");
        let mut snippet: Snippet =
            serde_json::from_str(&doc).context("stored snippet is not valid JSON")?;
        snippet.likes = row.get("likes");
        snippet.dislikes = row.get("dislikes");
        Ok(Some(snippet))
    }

    #[instrument(skip_all)]
    async fn delete_snippet(&self, path_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM snippets WHERE path_id = ?")
            .bind(path_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn relation(&self, uid: &str, path_id: &str) -> Result<Relation> {
        let rel: Option<String> =
            sqlx::query_scalar("SELECT relation FROM votes WHERE uid = ? AND path_id = ?")
                .bind(uid)
                .bind(path_id)
                .fetch_optional(&self.pool)
                .await?;
        match rel {
            None => Ok(Relation::None),
            Some(s) => {
                Relation::parse(&s).ok_or_else(|| anyhow!("vote row has unknown relation {}", s))
            }
        }
    }

    #[instrument(skip_all)]
    async fn clear_votes(&self, path_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM votes WHERE path_id = ?")
            .bind(path_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn commit_vote(
        &self,
        uid: &str,
        path_id: &str,
        observed: Relation,
        patch: VotePatch,
    ) -> Result<bool> {
        let mut tx = self.pool.begin().await?;

        // Conditional write: re-read the relation inside the transaction and
        // refuse to commit when it no longer matches what the caller computed
        // its transition from.
        let current: Option<String> =
            sqlx::query_scalar("SELECT relation FROM votes WHERE uid = ? AND path_id = ?")
                .bind(uid)
                .bind(path_id)
                .fetch_optional(&mut *tx)
                .await?;
        let current = match current {
            None => Relation::None,
            Some(s) => {
                Relation::parse(&s).ok_or_else(|| anyhow!("vote row has unknown relation {}", s))?
            }
        };
        if current != observed {
            return Ok(false);
        }

        match patch.next {
            Relation::None => {
                sqlx::query("DELETE FROM votes WHERE uid = ? AND path_id = ?")
                    .bind(uid)
                    .bind(path_id)
                    .execute(&mut *tx)
                    .await?;
            }
            rel => {
                sqlx::query(
                    "INSERT INTO votes (uid, path_id, relation) VALUES (?, ?, ?) \
                     ON CONFLICT (uid, path_id) DO UPDATE SET relation = excluded.relation",
                )
                .bind(uid)
                .bind(path_id)
                .bind(rel.as_str())
                .execute(&mut *tx)
                .await?;
            }
        }

        let updated = sqlx::query(
            "UPDATE snippets SET likes = likes + ?, dislikes = dislikes + ? WHERE path_id = ?",
        )
        .bind(patch.likes_delta)
        .bind(patch.dislikes_delta)
        .bind(path_id)
        .execute(&mut *tx)
        .await?;
        if updated.rows_affected() == 0 {
            // Target vanished between the read phase and the commit.
            return Ok(false);
        }

        tx.commit().await?;
        Ok(true)
    }
}
