//! Snippet projection: the lossy, cached view of a published path used by
//! list/browse screens.
//!
//! The projection keeps the first three chapters and, per chapter, up to
//! three notifications drawn uniformly without replacement. It is pure and
//! stateless; `refresh`/removal are invoked right after a path write so the
//! snippet collection stays in lockstep with the published collection.

use crate::model::{Chapter, PublishedPath, Snippet};
use crate::store::DocumentStore;
use anyhow::Result;
use rand::seq::SliceRandom;
use rand::Rng;

const MAX_CHAPTERS: usize = 3;
const MAX_NOTIFICATIONS: usize = 3;

/// Draw up to `k` distinct elements uniformly from `items`; sequences of at
/// most `k` elements are returned whole.
fn sample<T: Clone, R: Rng + ?Sized>(items: &[T], k: usize, rng: &mut R) -> Vec<T> {
    if items.len() <= k {
        return items.to_vec();
    }
    items.choose_multiple(rng, k).cloned().collect()
}

/// Project a published path into its snippet. Counters start at zero; an
/// existing snippet keeps its counters when the projection is rewritten.
pub fn project(path: &PublishedPath, path_id: &str) -> Snippet {
    project_with(path, path_id, &mut rand::thread_rng())
}

pub fn project_with<R: Rng + ?Sized>(path: &PublishedPath, path_id: &str, rng: &mut R) -> Snippet {
    Snippet {
        id: path_id.to_string(),
        uid: path.uid.clone(),
        user: path.user.clone(),
        title: path.title.clone(),
        price: path.price.clone(),
        language: path.language.clone(),
        image: path.image.clone(),
        intro: path.intro.clone(),
        published_on: path.published_on,
        chapters: path
            .chapters
            .iter()
            .take(MAX_CHAPTERS)
            .map(|chapter| Chapter {
                c_title: chapter.c_title.clone(),
                c_content: chapter.c_content.clone(),
                c_notifications: sample(&chapter.c_notifications, MAX_NOTIFICATIONS, rng),
            })
            .collect(),
        likes: 0,
        dislikes: 0,
    }
}

/// Regenerate the snippet after its path was created or updated.
pub async fn refresh(docs: &dyn DocumentStore, path_id: &str, path: &PublishedPath) -> Result<()> {
    docs.put_snippet(&project(path, path_id)).await
}
