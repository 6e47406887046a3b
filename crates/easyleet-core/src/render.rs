//! Display projection of conversation messages.
//!
//! [`render`] is a pure function of a [`Message`]: front ends decide how each
//! [`Rendered`] variant looks, this module only decides what it contains.

use std::sync::LazyLock;

use chrono::Local;
use regex::Regex;

use crate::message::{Content, Message, Role};

/// Placeholder shown for content that doesn't fit its role.
pub const INVALID_CONTENT: &str = "Invalid message content";

const FENCE: &str = "```";

/// Leftmost, shortest match of a fenced block, across lines.
static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").expect("fence pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Prose(String),
    /// Verbatim text between two fence markers.
    Code(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered {
    /// Icon plus text treatment.
    Error { text: String },
    /// An uploaded file: its name and local upload time (`HH:MM:SS`).
    File { name: String, uploaded_at: String },
    /// Assistant reply containing fenced code.
    Segments(Vec<Segment>),
    Text(String),
    Invalid,
}

pub fn render(message: &Message) -> Rendered {
    match (message.role, &message.content) {
        (Role::Error, Content::Text(text)) => Rendered::Error { text: text.clone() },
        (Role::Error, Content::File(_)) => Rendered::Error {
            text: INVALID_CONTENT.to_string(),
        },
        (Role::User, Content::File(file)) => Rendered::File {
            name: file.name.clone(),
            uploaded_at: file
                .timestamp
                .with_timezone(&Local)
                .format("%H:%M:%S")
                .to_string(),
        },
        (Role::Assistant, Content::Text(text)) if text.contains(FENCE) => {
            Rendered::Segments(split_fenced(text))
        }
        (_, Content::Text(text)) => Rendered::Text(text.clone()),
        (Role::Assistant, Content::File(_)) => Rendered::Invalid,
    }
}

/// Split text into alternating prose and code segments.
///
/// Empty prose between adjacent blocks is dropped, so `N` blocks never yield
/// more than `2N + 1` segments. An unmatched marker stays in the prose.
pub fn split_fenced(text: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut last = 0;

    for captures in FENCED_BLOCK.captures_iter(text) {
        let (Some(whole), Some(inner)) = (captures.get(0), captures.get(1)) else {
            continue;
        };
        push_prose(&mut segments, &text[last..whole.start()]);
        segments.push(Segment::Code(inner.as_str().to_string()));
        last = whole.end();
    }
    push_prose(&mut segments, &text[last..]);

    segments
}

fn push_prose(segments: &mut Vec<Segment>, prose: &str) {
    if !prose.is_empty() {
        segments.push(Segment::Prose(prose.to_string()));
    }
}
