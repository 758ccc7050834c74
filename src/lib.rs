//! # pathhub
//!
//! Publish pipeline and vote consistency engine for user-authored "path"
//! documents (title, intro, ordered chapters with scheduled notifications,
//! one cover image).
//!
//! The two hard parts live here: the multi-step publish transition that must
//! never leave a draft half-migrated (document without image or vice versa),
//! and the tri-state vote relation that keeps per-user like/dislike sets and
//! per-path counters in sync under concurrent callers. Storage is behind the
//! `store` traits and injected by the entry point, so tests substitute
//! in-memory and failing backends freely.

pub mod config;
pub mod delete;
pub mod error;
pub mod media;
pub mod model;
pub mod publish;
pub mod snippet;
pub mod store;
pub mod validate;
pub mod vote;
