//! The draft validator: pure, synchronous, no I/O.
//!
//! Drafts arrive untrusted (clients write them directly), so validation runs
//! over raw JSON and only hands back a typed [`Draft`] once every field rule
//! passed. Rules run in one top-to-bottom pass and the first failing rule
//! determines the surfaced reason.
//!
//! The image rule is shallow: it only checks that `image` is a string URL
//! pointing at the object store's public hostname. Whether the object itself
//! exists is a separate collaborator check in the publish pipeline.

use crate::error::{ApiError, Result};
use crate::media::MediaPaths;
use crate::model::Draft;
use serde_json::Value;

/// Locale tags selectable in the client's language checkbox.
pub const SUPPORTED_LANGUAGES: [&str; 25] = [
    "cs-CZ", "nl-NL", "en-US", "et-EE", "fi-FI", "de-DE", "he-IL", "hi-IN", "hu-HU", "is-IS",
    "id-ID", "it-IT", "ja-JP", "ko-KR", "fa-IR", "pl-PL", "pl-PT", "ro-RO", "ru-RU", "sk-SK",
    "es-ES", "sv-SE", "tr-TR", "uk-UA", "vi-VN",
];

/// A string field that is present and non-empty. Absent, null, empty and
/// wrong-typed values all count as missing.
fn string_field<'a>(obj: &'a Value, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn within(value: Option<&str>, max_chars: usize) -> bool {
    value.is_some_and(|s| s.chars().count() <= max_chars)
}

fn fail(reason: &str) -> ApiError {
    ApiError::Validation(reason.to_string())
}

/// Validate an untrusted draft document. A missing draft should be passed in
/// as an empty object; it fails the first rule like any other invalid draft.
pub fn validate(raw: &Value, media: &MediaPaths) -> Result<Draft> {
    if !within(string_field(raw, "title"), 80) {
        return Err(fail("Title mustn't be empty or too long"));
    }

    // Pricing is disabled; a publishable draft carries the empty string.
    if raw.get("price").and_then(Value::as_str) != Some("") {
        return Err(fail("Price mustn't be empty or nonzero"));
    }

    let language = raw.get("language").and_then(Value::as_str).unwrap_or("");
    if !SUPPORTED_LANGUAGES.contains(&language) {
        return Err(fail("Chosen language not supported"));
    }

    if !within(string_field(raw, "intro"), 1000) {
        return Err(fail("Intro is too long or too short"));
    }

    let chapters = raw.get("chapters").and_then(Value::as_array);
    let chapters = match chapters {
        Some(chapters) if !chapters.is_empty() => chapters,
        _ => return Err(fail("Chapters mustn't be empty")),
    };
    for chapter in chapters {
        if !within(string_field(chapter, "cTitle"), 80) {
            return Err(fail("Chapter titles mustn't be empty or too long"));
        }
        if !within(string_field(chapter, "cContent"), 4000) {
            return Err(fail("Chapter content mustn't be empty or too long"));
        }

        let notifications = chapter.get("cNotifications").and_then(Value::as_array);
        let notifications = match notifications {
            Some(n) if n.len() >= 2 => n,
            _ => return Err(fail("Each chapter must have at least two notifications")),
        };
        for notif in notifications {
            if !within(string_field(notif, "nTitle"), 65) {
                return Err(fail("Notification titles must be 1-65 characters long"));
            }
            if !within(string_field(notif, "nBody"), 300) {
                return Err(fail("Notification bodies must be 1-300 characters long"));
            }
            let pref = notif.get("nTimePref");
            let span = |key: &str| {
                pref.and_then(|p| p.get(key))
                    .and_then(Value::as_bool)
                    .unwrap_or(false)
            };
            if !(span("bedtime") || span("morning") || span("noon")) {
                return Err(fail("Each notification must be shown at at least one time span"));
            }
        }
    }

    let image = string_field(raw, "image").unwrap_or("");
    if !media.host_matches(image) {
        return Err(ApiError::ImageValidation);
    }

    // Every rule passed; remaining shape mismatches (e.g. a wrong-typed
    // publishedOn) still reject rather than publish a mangled document.
    serde_json::from_value(raw.clone()).map_err(|_| fail("Draft is malformed"))
}
