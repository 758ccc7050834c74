//! Removal of a published path: the document and its cover image go away
//! together, the snippet follows.
//!
//! Deletion is best-effort cleanup, not a transaction. Both removals are
//! always issued (concurrently, since neither depends on the other) and a
//! partial deletion is not rolled back; callers may simply retry.

use crate::error::{require_id, ApiError, Result};
use crate::media::MediaPaths;
use crate::model::Principal;
use crate::store::{DocumentStore, ObjectStore};
use tracing::{info, instrument};

/// Delete the caller's published path. Returns `"ok"`; absent targets are a
/// clean no-op, collaborator failures surface as an unclassified error.
pub async fn delete_path(
    docs: &dyn DocumentStore,
    objects: &dyn ObjectStore,
    media: &MediaPaths,
    principal: &Principal,
    path_id: &str,
) -> Result<&'static str> {
    run_delete(docs, objects, media, principal, path_id)
        .await
        .map_err(ApiError::normalize_unknown)
}

#[instrument(skip_all)]
async fn run_delete(
    docs: &dyn DocumentStore,
    objects: &dyn ObjectStore,
    media: &MediaPaths,
    principal: &Principal,
    path_id: &str,
) -> Result<&'static str> {
    let uid = principal.require_uid()?;
    require_id(path_id)?;

    let object = media.published_object(uid, path_id);
    let (doc_removed, object_removed) = tokio::join!(
        docs.delete_path(uid, path_id),
        objects.delete(&object),
    );
    doc_removed?;
    object_removed?;

    // Snippets and vote relations track the published collection; remove in
    // lockstep, otherwise a republish under the same id inherits stale
    // relations against zeroed counters.
    docs.delete_snippet(path_id).await?;
    docs.clear_votes(path_id).await?;

    info!(uid, path_id, "deleted path");
    Ok("ok")
}
