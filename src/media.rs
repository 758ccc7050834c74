//! Object naming scheme for cover images and the public URL they get after
//! publication.
//!
//! A path carries exactly one cover image today; the `.1.` infix leaves room
//! for more pictures per document without renaming existing objects.

use crate::config::Storage;
use url::Url;

/// Addressing for draft and published image objects, derived from the
/// storage section of the configuration.
#[derive(Debug, Clone)]
pub struct MediaPaths {
    public_host: String,
    public_base_url: String,
}

impl MediaPaths {
    pub fn new(storage: &Storage) -> Self {
        Self {
            public_host: storage.public_host.clone(),
            public_base_url: storage.public_base_url.clone(),
        }
    }

    /// Object path of a draft's cover image, e.g. `media/drafts/u1/d1.1.jpg`.
    pub fn draft_object(&self, uid: &str, draft_id: &str) -> String {
        format!("media/drafts/{}/{}.1.jpg", uid, draft_id)
    }

    /// Object path of a published path's cover image.
    pub fn published_object(&self, uid: &str, path_id: &str) -> String {
        format!("media/paths/{}/{}.1.jpg", uid, path_id)
    }

    /// Publicly reachable URL of the published cover image.
    pub fn public_url(&self, uid: &str, path_id: &str) -> String {
        format!(
            "{}/{}",
            self.public_base_url,
            self.published_object(uid, path_id)
        )
    }

    /// Shallow image check: the value must be a parseable URL whose host is
    /// the object store's public hostname. Object existence is a separate
    /// collaborator check.
    pub fn host_matches(&self, image_url: &str) -> bool {
        match Url::parse(image_url) {
            Ok(url) => url.host_str() == Some(self.public_host.as_str()),
            Err(_) => false,
        }
    }
}
