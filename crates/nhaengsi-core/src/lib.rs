//! N-행시 core library.
//! Word validation, per-session poem store, Gemini bridge and the session state machine.

pub mod config;
pub mod encouragement;
pub mod error;
pub mod gemini_bridge;
pub mod poem_store;
pub mod session;
pub mod validator;

pub use config::NhaengsiConfig;
pub use encouragement::{encouragement_at, pick_encouragement, Encouragement, ENCOURAGEMENTS};
pub use error::{ConfigError, PoemError, ProviderError, SessionError, SessionResult, ValidationError};
pub use gemini_bridge::{
    build_prompt, GeminiProvider, GenerationOutcome, PoemGenerator, SamplingConfig, TextProvider,
};
pub use poem_store::{HistoryEntry, PoemStore, UserPoem, HISTORY_DISPLAY_LIMIT};
pub use session::{
    ComparisonView, HistoryView, PoemAuthor, SessionController, SessionSnapshot, SessionState,
};
pub use validator::{check, validate, Word, EXAMPLE_WORDS};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
