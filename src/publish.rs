//! The publish pipeline: validate an untrusted draft, relocate its cover
//! image, then relocate the document, in that order.
//!
//! Later steps assume earlier ones committed, so the sequence is strictly
//! ordered. The image must be moved and public before the published document
//! exists anywhere, otherwise browse views would show a document pointing at
//! a private or absent asset. The draft is only deleted after the published
//! copy is acknowledged, so a failed publish always leaves a retryable draft
//! behind.

use crate::error::{require_id, ApiError, Result};
use crate::media::MediaPaths;
use crate::model::{Principal, PublishedPath};
use crate::snippet;
use crate::store::{DocumentStore, ObjectStore};
use crate::validate::validate;
use chrono::Utc;
use serde_json::Value;
use tracing::{info, instrument, warn};

/// Validate and publish the caller's draft. Returns `"ok"` on success.
///
/// Failures that carry an explicit kind (authentication, preconditions,
/// validation, image steps) pass through; anything else is normalized to a
/// generic denial that hides storage internals.
pub async fn publish(
    docs: &dyn DocumentStore,
    objects: &dyn ObjectStore,
    media: &MediaPaths,
    principal: &Principal,
    draft_id: &str,
) -> Result<&'static str> {
    run_publish(docs, objects, media, principal, draft_id)
        .await
        .map_err(ApiError::normalize_denied)
}

#[instrument(skip_all)]
async fn run_publish(
    docs: &dyn DocumentStore,
    objects: &dyn ObjectStore,
    media: &MediaPaths,
    principal: &Principal,
    draft_id: &str,
) -> Result<&'static str> {
    let uid = principal.require_uid()?;
    require_id(draft_id)?;

    // 1. Fetch the draft at (uid, draft_id). A missing draft, including one a
    //    non-owner points at, validates like an empty document and is
    //    rejected before any mutation.
    let raw = docs
        .get_draft(uid, draft_id)
        .await?
        .unwrap_or_else(|| Value::Object(Default::default()));

    // 2. Field rules; aborts with no side effects.
    let draft = validate(&raw, media)?;

    // 3. The backing object must exist. An already relocated object also
    //    counts, so a retry after a crash between steps 4 and 5 completes
    //    instead of failing here.
    let src = media.draft_object(uid, draft_id);
    let dst = media.published_object(uid, draft_id);
    let src_exists = object_exists(objects, &src).await?;
    let dst_exists = object_exists(objects, &dst).await?;
    if !src_exists && !dst_exists {
        return Err(ApiError::ImageValidation);
    }

    // 4. Relocate the image and flip it public. Each sub-step is idempotent
    //    (the move is skipped once the draft object is gone, re-marking
    //    public is free), so the step as a whole is safe to retry; a failure
    //    here must not let step 5 run.
    if src_exists {
        objects.move_object(&src, &dst).await.map_err(|err| {
            warn!(?err, %src, %dst, "image move failed");
            ApiError::ImageMove
        })?;
    }
    objects.make_public(&dst).await.map_err(|err| {
        warn!(?err, %dst, "failed to make image public");
        ApiError::ImageMove
    })?;

    // 5. Copy the validated draft into the published collection, then delete
    //    the draft. The delete only fires after the copy is acknowledged.
    let user = docs
        .username(uid)
        .await?
        .unwrap_or_else(|| "anonymous".to_string());
    let published = PublishedPath {
        title: draft.title,
        price: draft.price,
        language: draft.language,
        intro: draft.intro,
        chapters: draft.chapters,
        image: media.public_url(uid, draft_id),
        user,
        uid: uid.to_string(),
        // Set once on first publish; a republished draft carries the original
        // value and keeps it.
        published_on: draft.published_on.unwrap_or_else(Utc::now),
    };
    docs.put_path(uid, draft_id, &published).await?;
    snippet::refresh(docs, draft_id, &published).await?;
    docs.delete_draft(uid, draft_id).await?;

    info!(uid, draft_id, "published path");
    Ok("ok")
}

async fn object_exists(objects: &dyn ObjectStore, object: &str) -> Result<bool> {
    objects.exists(object).await.map_err(|err| {
        warn!(?err, object, "object store lookup failed");
        ApiError::ImageValidation
    })
}
