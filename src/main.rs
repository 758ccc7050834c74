use anyhow::Result;
use clap::{Parser, Subcommand};
use pathhub::media::MediaPaths;
use pathhub::model::Principal;
use pathhub::store::{self, DocumentStore, FsObjectStore, ObjectStore, SqliteStore};
use pathhub::{config, delete, publish, vote};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Validate and publish a draft
    Publish {
        #[arg(long)]
        uid: String,
        #[arg(long)]
        draft_id: String,
    },
    /// Remove a published path together with its cover image
    Delete {
        #[arg(long)]
        uid: String,
        #[arg(long)]
        path_id: String,
    },
    /// Like a path
    Like {
        #[arg(long)]
        uid: String,
        #[arg(long)]
        path_id: String,
    },
    /// Dislike a path
    Dislike {
        #[arg(long)]
        uid: String,
        #[arg(long)]
        path_id: String,
    },
    /// Withdraw a previous like or dislike
    Unlike {
        #[arg(long)]
        uid: String,
        #[arg(long)]
        path_id: String,
    },
    /// Insert a draft document and its cover image (local workbench helper)
    Seed {
        #[arg(long)]
        uid: String,
        #[arg(long)]
        draft_id: String,
        /// JSON file with the draft document
        #[arg(long)]
        draft: PathBuf,
        /// JPEG file to upload as the draft's cover image
        #[arg(long)]
        image: PathBuf,
        /// Display name stored on the user's profile
        #[arg(long)]
        username: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| format!("sqlite://{}/pathhub.db?mode=rwc", cfg.app.data_dir));

    let pool = store::init_pool(&database_url).await?;
    store::run_migrations(&pool).await?;

    let docs = SqliteStore::new(pool);
    let objects = FsObjectStore::new(&cfg.app.data_dir);
    let media = MediaPaths::new(&cfg.storage);

    let outcome = run(&docs, &objects, &media, args.command).await;
    match outcome {
        Ok(result) => {
            info!(%result, "done");
            println!("{}", result);
            Ok(())
        }
        Err(err) => {
            eprintln!("{}: {}", err.code(), err);
            std::process::exit(1);
        }
    }
}

async fn run(
    docs: &dyn DocumentStore,
    objects: &dyn ObjectStore,
    media: &MediaPaths,
    command: Command,
) -> pathhub::error::Result<String> {
    match command {
        Command::Publish { uid, draft_id } => {
            let result = publish::publish(
                docs,
                objects,
                media,
                &Principal::authenticated(uid),
                &draft_id,
            )
            .await?;
            Ok(result.to_string())
        }
        Command::Delete { uid, path_id } => {
            let result = delete::delete_path(
                docs,
                objects,
                media,
                &Principal::authenticated(uid),
                &path_id,
            )
            .await?;
            Ok(result.to_string())
        }
        Command::Like { uid, path_id } => {
            let relation = vote::like(docs, &Principal::authenticated(uid), &path_id).await?;
            Ok(relation.as_str().to_string())
        }
        Command::Dislike { uid, path_id } => {
            let relation = vote::dislike(docs, &Principal::authenticated(uid), &path_id).await?;
            Ok(relation.as_str().to_string())
        }
        Command::Unlike { uid, path_id } => {
            let relation = vote::unlike(docs, &Principal::authenticated(uid), &path_id).await?;
            Ok(relation.as_str().to_string())
        }
        Command::Seed {
            uid,
            draft_id,
            draft,
            image,
            username,
        } => {
            let doc = tokio::fs::read_to_string(&draft)
                .await
                .map_err(anyhow::Error::from)?;
            let doc: serde_json::Value =
                serde_json::from_str(&doc).map_err(anyhow::Error::from)?;
            let bytes = tokio::fs::read(&image).await.map_err(anyhow::Error::from)?;

            docs.upsert_user(&uid, username.as_deref()).await?;
            docs.put_draft(&uid, &draft_id, &doc).await?;
            objects
                .upload(&bytes, &media.draft_object(&uid, &draft_id))
                .await?;
            Ok("seeded".to_string())
        }
    }
}
