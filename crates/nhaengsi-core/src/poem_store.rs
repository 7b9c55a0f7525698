//! Poem store: per-word buckets of user lines and AI text, plus session history.
//!
//! Buckets are keyed by the validated [`Word`] so there is no string-key
//! juggling between user and AI slots. History is append-only; the display cap
//! is applied on read.

use std::collections::HashMap;

use chrono::{DateTime, Local};
use serde::Serialize;

use crate::error::PoemError;
use crate::validator::Word;

/// Number of history entries shown to the user.
pub const HISTORY_DISPLAY_LIMIT: usize = 5;

/// The user's own attempt: one line per character of the word.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserPoem {
    lines: Vec<String>,
}

impl UserPoem {
    fn blank(word: &Word) -> Self {
        Self {
            lines: vec![String::new(); word.len()],
        }
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// True when no line has any text yet.
    pub fn is_blank(&self) -> bool {
        self.lines.iter().all(|l| l.trim().is_empty())
    }
}

#[derive(Debug, Clone)]
struct WordBucket {
    user: UserPoem,
    ai: Option<String>,
}

/// One saved comparison.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryEntry {
    pub word: Word,
    pub ai_poem: String,
    pub user_poem: String,
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Local>,
}

impl HistoryEntry {
    pub fn new(word: Word, ai_poem: String, user_poem: String) -> Self {
        Self {
            word,
            ai_poem,
            user_poem,
            timestamp: Local::now(),
        }
    }
}

fn serialize_timestamp<S: serde::Serializer>(
    ts: &DateTime<Local>,
    s: S,
) -> Result<S::Ok, S::Error> {
    s.serialize_str(&ts.format("%Y-%m-%d %H:%M:%S").to_string())
}

/// Session-scoped poem state.
#[derive(Debug, Default)]
pub struct PoemStore {
    buckets: HashMap<Word, WordBucket>,
    history: Vec<HistoryEntry>,
}

impl PoemStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty user poem for `word` unless one already exists.
    /// Returns true when a new bucket was created.
    pub fn init_user(&mut self, word: &Word) -> bool {
        if self.buckets.contains_key(word) {
            return false;
        }
        self.buckets.insert(
            word.clone(),
            WordBucket {
                user: UserPoem::blank(word),
                ai: None,
            },
        );
        true
    }

    pub fn contains(&self, word: &Word) -> bool {
        self.buckets.contains_key(word)
    }

    pub fn user_poem(&self, word: &Word) -> Option<&UserPoem> {
        self.buckets.get(word).map(|b| &b.user)
    }

    pub fn set_user_line(
        &mut self,
        word: &Word,
        index: usize,
        text: impl Into<String>,
    ) -> Result<(), PoemError> {
        let bucket = self
            .buckets
            .get_mut(word)
            .ok_or_else(|| PoemError::UnknownWord(word.to_string()))?;
        let len = bucket.user.lines.len();
        let slot = bucket
            .user
            .lines
            .get_mut(index)
            .ok_or(PoemError::LineOutOfRange { index, len })?;
        *slot = text.into();
        Ok(())
    }

    /// Non-empty lines as `[char] text`, in character order. Empty string when
    /// the user has written nothing.
    pub fn compose_user_poem(&self, word: &Word) -> String {
        let Some(bucket) = self.buckets.get(word) else {
            return String::new();
        };
        word.chars()
            .zip(bucket.user.lines.iter())
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(c, line)| format!("[{}] {}", c, line.trim()))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Every line, with `[char] ...` standing in for the unwritten ones.
    pub fn preview_user_poem(&self, word: &Word) -> String {
        let Some(bucket) = self.buckets.get(word) else {
            return String::new();
        };
        word.chars()
            .zip(bucket.user.lines.iter())
            .map(|(c, line)| {
                if line.trim().is_empty() {
                    format!("[{}] ...", c)
                } else {
                    format!("[{}] {}", c, line.trim())
                }
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn ai_poem(&self, word: &Word) -> Option<&str> {
        self.buckets.get(word).and_then(|b| b.ai.as_deref())
    }

    pub fn set_ai_poem(&mut self, word: &Word, text: impl Into<String>) -> Result<(), PoemError> {
        let bucket = self
            .buckets
            .get_mut(word)
            .ok_or_else(|| PoemError::UnknownWord(word.to_string()))?;
        bucket.ai = Some(text.into());
        Ok(())
    }

    /// Drop the AI text for `word`. Returns the old text, if any.
    pub fn clear_ai_poem(&mut self, word: &Word) -> Option<String> {
        self.buckets.get_mut(word).and_then(|b| b.ai.take())
    }

    /// Remove both representations for `word`.
    pub fn clear_word(&mut self, word: &Word) -> bool {
        self.buckets.remove(word).is_some()
    }

    pub fn append_history(&mut self, entry: HistoryEntry) {
        self.history.push(entry);
    }

    /// Up to [`HISTORY_DISPLAY_LIMIT`] entries, newest first.
    pub fn recent_history(&self) -> Vec<&HistoryEntry> {
        self.history
            .iter()
            .rev()
            .take(HISTORY_DISPLAY_LIMIT)
            .collect()
    }

    /// Entries stored but not shown by [`recent_history`](Self::recent_history).
    pub fn hidden_history_count(&self) -> usize {
        self.history.len().saturating_sub(HISTORY_DISPLAY_LIMIT)
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }
}
