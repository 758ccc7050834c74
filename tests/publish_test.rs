use anyhow::Result;
use pathhub::config::{self, Config};
use pathhub::error::ApiError;
use pathhub::media::MediaPaths;
use pathhub::model::Principal;
use pathhub::publish::publish;
use pathhub::store::{DocumentStore, FsObjectStore, ObjectStore, SqliteStore};
use serde_json::{json, Value};
use tempfile::TempDir;

async fn setup_docs() -> SqliteStore {
    // One connection, otherwise every pooled connection gets its own private
    // in-memory database.
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    sqlx::migrate!("./migrations").run(&pool).await.unwrap();
    SqliteStore::new(pool)
}

fn setup_objects() -> (TempDir, FsObjectStore) {
    let td = TempDir::new().unwrap();
    let store = FsObjectStore::new(td.path());
    (td, store)
}

fn media() -> MediaPaths {
    let cfg: Config = serde_yaml::from_str(config::example()).unwrap();
    MediaPaths::new(&cfg.storage)
}

fn valid_draft() -> Value {
    json!({
        "title": "Sleep better in 30 days",
        "price": "",
        "language": "en-US",
        "intro": "A gentle, step-by-step program.",
        "chapters": [{
            "cTitle": "Week one",
            "cContent": "Go to bed earlier.",
            "cNotifications": [
                {"nTitle": "Wind down", "nBody": "Screens off.", "nTimePref": {"bedtime": true, "morning": false, "noon": false}},
                {"nTitle": "Lights out", "nBody": "Sleep now.", "nTimePref": {"bedtime": true, "morning": true, "noon": false}}
            ]
        }],
        "image": "https://storage.pathhub.dev/pathhub-media/media/drafts/u1/d1.1.jpg"
    })
}

async fn seed(docs: &SqliteStore, objects: &FsObjectStore, media: &MediaPaths, draft: &Value) {
    docs.upsert_user("u1", Some("alice")).await.unwrap();
    docs.put_draft("u1", "d1", draft).await.unwrap();
    objects
        .upload(b"jpeg bytes", &media.draft_object("u1", "d1"))
        .await
        .unwrap();
}

#[tokio::test]
async fn publish_moves_document_and_image() {
    let docs = setup_docs().await;
    let (_td, objects) = setup_objects();
    let media = media();
    seed(&docs, &objects, &media, &valid_draft()).await;

    let result = publish(&docs, &objects, &media, &Principal::authenticated("u1"), "d1")
        .await
        .unwrap();
    assert_eq!(result, "ok");

    // Draft document and draft object are gone.
    assert!(docs.get_draft("u1", "d1").await.unwrap().is_none());
    assert!(!objects.exists(&media.draft_object("u1", "d1")).await.unwrap());

    // Published object exists and is publicly readable.
    let published_object = media.published_object("u1", "d1");
    assert!(objects.exists(&published_object).await.unwrap());
    assert!(objects.is_public(&published_object).await.unwrap());

    // Published document is stamped and points at the public URL.
    let path = docs.get_path("u1", "d1").await.unwrap().unwrap();
    assert_eq!(path.image, media.public_url("u1", "d1"));
    assert_eq!(path.user, "alice");
    assert_eq!(path.uid, "u1");

    // Snippet was created in lockstep, counters zeroed.
    let snippet = docs.get_snippet("d1").await.unwrap().unwrap();
    assert_eq!(snippet.uid, "u1");
    assert_eq!(snippet.likes, 0);
    assert_eq!(snippet.dislikes, 0);
    assert!(snippet.chapters.len() <= 3);
}

#[tokio::test]
async fn publish_without_profile_name_falls_back_to_anonymous() {
    let docs = setup_docs().await;
    let (_td, objects) = setup_objects();
    let media = media();
    docs.put_draft("u1", "d1", &valid_draft()).await.unwrap();
    objects
        .upload(b"jpeg bytes", &media.draft_object("u1", "d1"))
        .await
        .unwrap();

    publish(&docs, &objects, &media, &Principal::authenticated("u1"), "d1")
        .await
        .unwrap();
    let path = docs.get_path("u1", "d1").await.unwrap().unwrap();
    assert_eq!(path.user, "anonymous");
}

#[tokio::test]
async fn invalid_draft_changes_nothing() {
    let docs = setup_docs().await;
    let (_td, objects) = setup_objects();
    let media = media();

    let mut draft = valid_draft();
    let only_one = draft["chapters"][0]["cNotifications"][0].clone();
    draft["chapters"][0]["cNotifications"] = json!([only_one]);
    seed(&docs, &objects, &media, &draft).await;

    let err = publish(&docs, &objects, &media, &Principal::authenticated("u1"), "d1")
        .await
        .unwrap_err();
    match err {
        ApiError::Validation(msg) => {
            assert_eq!(msg, "Each chapter must have at least two notifications")
        }
        other => panic!("expected validation failure, got {:?}", other),
    }

    // Rejection happened before any mutation.
    assert_eq!(docs.get_draft("u1", "d1").await.unwrap(), Some(draft));
    assert!(objects.exists(&media.draft_object("u1", "d1")).await.unwrap());
    assert!(!objects
        .exists(&media.published_object("u1", "d1"))
        .await
        .unwrap());
    assert!(docs.get_path("u1", "d1").await.unwrap().is_none());
    assert!(docs.get_snippet("d1").await.unwrap().is_none());
}

#[tokio::test]
async fn missing_backing_object_fails_image_validation() {
    let docs = setup_docs().await;
    let (_td, objects) = setup_objects();
    let media = media();
    docs.put_draft("u1", "d1", &valid_draft()).await.unwrap();

    let err = publish(&docs, &objects, &media, &Principal::authenticated("u1"), "d1")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::ImageValidation));
    assert!(docs.get_draft("u1", "d1").await.unwrap().is_some());
}

#[tokio::test]
async fn publish_requires_authentication_and_id() {
    let docs = setup_docs().await;
    let (_td, objects) = setup_objects();
    let media = media();

    let err = publish(&docs, &objects, &media, &Principal::anonymous(), "d1")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthenticated));

    let err = publish(&docs, &objects, &media, &Principal::authenticated("u1"), "")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Precondition(_)));
}

#[tokio::test]
async fn non_owner_is_rejected_before_any_mutation() {
    let docs = setup_docs().await;
    let (_td, objects) = setup_objects();
    let media = media();
    seed(&docs, &objects, &media, &valid_draft()).await;

    // Drafts are keyed per owner; an intruder's lookup finds nothing and the
    // empty document fails validation.
    let err = publish(
        &docs,
        &objects,
        &media,
        &Principal::authenticated("intruder"),
        "d1",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));

    assert!(docs.get_draft("u1", "d1").await.unwrap().is_some());
    assert!(objects.exists(&media.draft_object("u1", "d1")).await.unwrap());
    assert!(docs.get_path("intruder", "d1").await.unwrap().is_none());
}

#[tokio::test]
async fn republish_preserves_published_on() {
    let docs = setup_docs().await;
    let (_td, objects) = setup_objects();
    let media = media();
    seed(&docs, &objects, &media, &valid_draft()).await;

    publish(&docs, &objects, &media, &Principal::authenticated("u1"), "d1")
        .await
        .unwrap();
    let first = docs.get_path("u1", "d1").await.unwrap().unwrap();

    // Editing a published path copies it back into the drafts collection,
    // publishedOn included.
    let mut edited = serde_json::to_value(&first).unwrap();
    edited["title"] = json!("Sleep better in 60 days");
    docs.put_draft("u1", "d1", &edited).await.unwrap();
    objects
        .upload(b"new cover", &media.draft_object("u1", "d1"))
        .await
        .unwrap();

    publish(&docs, &objects, &media, &Principal::authenticated("u1"), "d1")
        .await
        .unwrap();
    let second = docs.get_path("u1", "d1").await.unwrap().unwrap();
    assert_eq!(second.title, "Sleep better in 60 days");
    assert_eq!(second.published_on, first.published_on);
}

/// Object store whose publicity flip always fails, leaving the relocation in
/// its partial window.
struct FailPublicity {
    inner: FsObjectStore,
}

#[async_trait::async_trait]
impl ObjectStore for FailPublicity {
    async fn exists(&self, object: &str) -> Result<bool> {
        self.inner.exists(object).await
    }
    async fn move_object(&self, src: &str, dst: &str) -> Result<()> {
        self.inner.move_object(src, dst).await
    }
    async fn make_public(&self, _object: &str) -> Result<()> {
        anyhow::bail!("simulated outage")
    }
    async fn is_public(&self, object: &str) -> Result<bool> {
        self.inner.is_public(object).await
    }
    async fn delete(&self, object: &str) -> Result<()> {
        self.inner.delete(object).await
    }
    async fn upload(&self, bytes: &[u8], dst: &str) -> Result<()> {
        self.inner.upload(bytes, dst).await
    }
}

#[tokio::test]
async fn partial_image_relocation_blocks_the_document_and_is_retryable() {
    let docs = setup_docs().await;
    let (td, objects) = setup_objects();
    let media = media();
    seed(&docs, &objects, &media, &valid_draft()).await;

    let failing = FailPublicity {
        inner: FsObjectStore::new(td.path()),
    };
    let err = publish(&docs, &failing, &media, &Principal::authenticated("u1"), "d1")
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::ImageMove));

    // The object was moved but the document migration never started.
    assert!(!objects.exists(&media.draft_object("u1", "d1")).await.unwrap());
    assert!(objects
        .exists(&media.published_object("u1", "d1"))
        .await
        .unwrap());
    assert!(docs.get_draft("u1", "d1").await.unwrap().is_some());
    assert!(docs.get_path("u1", "d1").await.unwrap().is_none());

    // A retry against a healthy store completes: the existence check accepts
    // the already relocated object and the move sub-step is skipped.
    let result = publish(&docs, &objects, &media, &Principal::authenticated("u1"), "d1")
        .await
        .unwrap();
    assert_eq!(result, "ok");
    assert!(objects
        .is_public(&media.published_object("u1", "d1"))
        .await
        .unwrap());
    assert!(docs.get_draft("u1", "d1").await.unwrap().is_none());
    assert!(docs.get_path("u1", "d1").await.unwrap().is_some());
}
