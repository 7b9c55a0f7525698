//! Error taxonomy for the N-행시 session.
//!
//! Validation errors carry the user-facing Korean message as their `Display`.
//! Provider errors never leave the generator: they are folded into a
//! [`GenerationOutcome`](crate::GenerationOutcome).

use thiserror::Error;

/// Maximum number of characters in a word (whitespace removed).
pub const MAX_WORD_CHARS: usize = 10;
/// Minimum number of characters in a word (whitespace removed).
pub const MIN_WORD_CHARS: usize = 2;

/// Input rejected by the validator. Recovered locally; no state change.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("단어를 입력해주세요! 📝")]
    Empty,

    #[error("공백만 입력하셨어요. 한글 단어를 입력해주세요! ✏️")]
    WhitespaceOnly,

    #[error("한글 단어를 입력해주세요! 🇰🇷")]
    NotKorean,

    #[error("단어가 너무 길어요! 10글자 이하로 입력해주세요! 📏")]
    TooLong { chars: usize },

    #[error("2글자 이상의 단어를 입력해주세요! 📖")]
    TooShort { chars: usize },
}

/// Startup configuration failure. Fatal: the generator cannot be built.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("GEMINI_API_KEY environment variable is required")]
    MissingApiKey,

    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
}

/// Failure talking to the text-generation provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider response could not be parsed: {0}")]
    Decode(String),

    #[error("{0}")]
    Other(String),
}

/// Poem store contract violation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PoemError {
    #[error("no poem bucket for word \"{0}\"")]
    UnknownWord(String),

    #[error("line {index} is out of range for a {len}-line poem")]
    LineOutOfRange { index: usize, len: usize },
}

/// Action rejected by the session controller.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("먼저 단어를 입력해주세요")]
    NoActiveWord,

    #[error("지금은 이 동작을 할 수 없어요")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },

    #[error("AI N행시가 아직 없어요")]
    NothingToCompare,

    #[error(transparent)]
    Poem(#[from] PoemError),
}

pub type SessionResult<T> = Result<T, SessionError>;
