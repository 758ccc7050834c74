//! The vote state machine: a tri-state relation per (principal, path) kept
//! permanently in sync with the snippet's like/dislike counters.
//!
//! Every operation reads the current relation and the target's existence in
//! one read phase, computes the transition from the table below, and commits
//! the relation mutation together with the counter deltas as one atomic
//! write. The commit is conditional on the relation still matching what the
//! read phase observed; on conflict the whole cycle retries a few times
//! before giving up.

use crate::error::{require_id, ApiError, Result};
use crate::model::{Principal, Relation, VoteIntent};
use crate::store::{DocumentStore, VotePatch};
use anyhow::anyhow;
use tracing::{instrument, warn};

const MAX_VOTE_ATTEMPTS: u32 = 3;

/// Transition table. Redundant intents and unliking a never-voted path are
/// rejected; every accepted transition keeps both counters non-negative and
/// the liked/disliked sets disjoint.
///
/// | current  | intent  | next     | likes | dislikes |
/// |----------|---------|----------|-------|----------|
/// | None     | Like    | Liked    | +1    |          |
/// | None     | Dislike | Disliked |       | +1       |
/// | Liked    | Like    | —        | error: already exists |
/// | Disliked | Dislike | —        | error: already exists |
/// | Disliked | Like    | Liked    | +1    | −1       |
/// | Liked    | Dislike | Disliked | −1    | +1       |
/// | None     | Unlike  | —        | error: precondition   |
/// | Liked    | Unlike  | None     | −1    |          |
/// | Disliked | Unlike  | None     |       | −1       |
pub fn transition(current: Relation, intent: VoteIntent) -> Result<VotePatch> {
    let patch = |next, likes_delta, dislikes_delta| VotePatch {
        next,
        likes_delta,
        dislikes_delta,
    };
    match (current, intent) {
        (Relation::None, VoteIntent::Like) => Ok(patch(Relation::Liked, 1, 0)),
        (Relation::None, VoteIntent::Dislike) => Ok(patch(Relation::Disliked, 0, 1)),
        (Relation::Liked, VoteIntent::Like) => Err(ApiError::AlreadyExists(
            "Path was already liked before".into(),
        )),
        (Relation::Disliked, VoteIntent::Dislike) => Err(ApiError::AlreadyExists(
            "Path was already disliked before".into(),
        )),
        (Relation::Disliked, VoteIntent::Like) => Ok(patch(Relation::Liked, 1, -1)),
        (Relation::Liked, VoteIntent::Dislike) => Ok(patch(Relation::Disliked, -1, 1)),
        (Relation::None, VoteIntent::Unlike) => Err(ApiError::Precondition(
            "Path wasn't liked or disliked before".into(),
        )),
        (Relation::Liked, VoteIntent::Unlike) => Ok(patch(Relation::None, -1, 0)),
        (Relation::Disliked, VoteIntent::Unlike) => Ok(patch(Relation::None, 0, -1)),
    }
}

pub async fn like(
    docs: &dyn DocumentStore,
    principal: &Principal,
    path_id: &str,
) -> Result<Relation> {
    vote(docs, principal, path_id, VoteIntent::Like).await
}

pub async fn dislike(
    docs: &dyn DocumentStore,
    principal: &Principal,
    path_id: &str,
) -> Result<Relation> {
    vote(docs, principal, path_id, VoteIntent::Dislike).await
}

pub async fn unlike(
    docs: &dyn DocumentStore,
    principal: &Principal,
    path_id: &str,
) -> Result<Relation> {
    vote(docs, principal, path_id, VoteIntent::Unlike).await
}

/// Apply one vote intent and return the committed relation state.
pub async fn vote(
    docs: &dyn DocumentStore,
    principal: &Principal,
    path_id: &str,
    intent: VoteIntent,
) -> Result<Relation> {
    run_vote(docs, principal, path_id, intent)
        .await
        .map_err(ApiError::normalize_denied)
}

#[instrument(skip_all)]
async fn run_vote(
    docs: &dyn DocumentStore,
    principal: &Principal,
    path_id: &str,
    intent: VoteIntent,
) -> Result<Relation> {
    let uid = principal.require_uid()?;
    require_id(path_id)?;

    for attempt in 0..MAX_VOTE_ATTEMPTS {
        // Read phase: relation and target existence in one consistent pass.
        let (current, snippet) =
            tokio::join!(docs.relation(uid, path_id), docs.get_snippet(path_id));
        let current = current?;
        if snippet?.is_none() {
            return Err(ApiError::Precondition("Path doesn't exist".into()));
        }

        let patch = transition(current, intent)?;
        if docs.commit_vote(uid, path_id, current, patch).await? {
            return Ok(patch.next);
        }
        warn!(uid, path_id, attempt, "vote commit conflicted; retrying");
    }

    Err(anyhow!("vote on {} kept conflicting with concurrent votes", path_id).into())
}
