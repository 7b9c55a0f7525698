//! Word validator: decides whether user input can seed an N-행시.

use std::fmt;

use serde::Serialize;

use crate::error::{ValidationError, MAX_WORD_CHARS, MIN_WORD_CHARS};

const HANGUL_SYLLABLE_FIRST: char = '\u{AC00}';
const HANGUL_SYLLABLE_LAST: char = '\u{D7A3}';

/// Suggested words offered by the form. All pass [`validate`].
pub const EXAMPLE_WORDS: [&str; 10] = [
    "바다", "친구", "무지개", "사랑", "행복", "가족", "학교", "놀이", "여행", "음식",
];

/// A validated word. Whitespace is removed, so each char maps to one poem line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct Word(String);

impl Word {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn chars(&self) -> impl Iterator<Item = char> + '_ {
        self.0.chars()
    }

    /// Number of characters, i.e. number of poem lines.
    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn char_at(&self, index: usize) -> Option<char> {
        self.0.chars().nth(index)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn is_hangul_syllable(c: char) -> bool {
    (HANGUL_SYLLABLE_FIRST..=HANGUL_SYLLABLE_LAST).contains(&c)
}

/// Validate user input. Rules are checked in order and the first failure wins:
/// empty, no Hangul syllable, too long, too short.
pub fn validate(input: &str) -> Result<Word, ValidationError> {
    if input.is_empty() {
        return Err(ValidationError::Empty);
    }
    if input.trim().is_empty() {
        return Err(ValidationError::WhitespaceOnly);
    }
    if !input.chars().any(is_hangul_syllable) {
        return Err(ValidationError::NotKorean);
    }

    let clean: String = input.chars().filter(|c| !c.is_whitespace()).collect();
    let chars = clean.chars().count();
    if chars > MAX_WORD_CHARS {
        return Err(ValidationError::TooLong { chars });
    }
    if chars < MIN_WORD_CHARS {
        return Err(ValidationError::TooShort { chars });
    }

    Ok(Word(clean))
}

/// Tuple form of [`validate`]: `(true, "")` or `(false, message)`.
pub fn check(input: &str) -> (bool, String) {
    match validate(input) {
        Ok(_) => (true, String::new()),
        Err(e) => (false, e.to_string()),
    }
}
