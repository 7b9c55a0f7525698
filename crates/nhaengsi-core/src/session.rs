//! Session Controller: the per-user state machine.
//!
//! ```text
//! Idle --submit_word--> Composing --begin_generation--> Generating
//!                          ^  |                            |
//!              edit_line   |  | show_comparison            | Poem
//!                          |  v                            v
//!                        Comparing <-----------------------+
//!                          |  regenerate (clears AI poem) -> Generating
//!                          +-- reset_word --> Idle
//! ```
//!
//! `submit_word` is accepted from every state. History is appended exactly when
//! Comparing is entered with both an AI poem and a non-empty user poem.

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;

use crate::encouragement::{pick_encouragement, Encouragement};
use crate::error::{SessionError, SessionResult, ValidationError};
use crate::gemini_bridge::{GenerationOutcome, PoemGenerator};
use crate::poem_store::{HistoryEntry, PoemStore};
use crate::validator::{validate, Word};

pub const EMPTY_USER_POEM_PLACEHOLDER: &str = "아직 작성하지 않았어요!";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "word", rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Composing(Word),
    Generating(Word),
    Comparing(Word),
}

impl SessionState {
    pub fn word(&self) -> Option<&Word> {
        match self {
            SessionState::Idle => None,
            SessionState::Composing(w) | SessionState::Generating(w) | SessionState::Comparing(w) => {
                Some(w)
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::Composing(_) => "composing",
            SessionState::Generating(_) => "generating",
            SessionState::Comparing(_) => "comparing",
        }
    }
}

/// Which poem to export as copyable text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoemAuthor {
    Ai,
    User,
}

/// Side-by-side view shown while Comparing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonView {
    pub word: Word,
    /// Composed user poem, `None` when nothing was written.
    pub user_poem: Option<String>,
    pub user_poem_display: String,
    pub ai_poem: String,
    pub encouragement: Option<Encouragement>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistoryView {
    pub total: usize,
    pub hidden: usize,
    pub entries: Vec<HistoryEntry>,
}

/// Everything a UI needs to render the current session.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub state: SessionState,
    pub line_chars: Vec<String>,
    pub lines: Vec<String>,
    pub preview: Option<String>,
    pub ai_poem: Option<String>,
    pub comparison: Option<ComparisonView>,
    pub notice: Option<String>,
    pub history: HistoryView,
}

pub struct SessionController {
    state: SessionState,
    store: PoemStore,
    rng: StdRng,
    encouragement: Option<Encouragement>,
    notice: Option<String>,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionController {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// Deterministic encouragement picks, for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            state: SessionState::Idle,
            store: PoemStore::new(),
            rng,
            encouragement: None,
            notice: None,
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn active_word(&self) -> Option<&Word> {
        self.state.word()
    }

    pub fn store(&self) -> &PoemStore {
        &self.store
    }

    /// Last generation failure message, cleared by the next action.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Switch to a new word. Lines already written for the same word are kept.
    pub fn submit_word(&mut self, input: &str) -> Result<Word, ValidationError> {
        let word = validate(input).map_err(|e| {
            tracing::warn!("[NHAENGSI] Rejected word {:?}: {}", input, e);
            e
        })?;
        let created = self.store.init_user(&word);
        tracing::info!(
            "[NHAENGSI] Composing \"{}\" ({} lines, {})",
            word,
            word.len(),
            if created { "new" } else { "resumed" }
        );
        self.state = SessionState::Composing(word.clone());
        self.encouragement = None;
        self.notice = None;
        Ok(word)
    }

    pub fn edit_line(&mut self, index: usize, text: &str) -> SessionResult<()> {
        let word = match &self.state {
            SessionState::Composing(w) | SessionState::Comparing(w) => w.clone(),
            other => return Err(self.reject("edit a line", other)),
        };
        self.store.set_user_line(&word, index, text)?;
        self.state = SessionState::Composing(word);
        self.encouragement = None;
        self.notice = None;
        Ok(())
    }

    /// Enter Generating. Returns the word to send to the provider.
    pub fn begin_generation(&mut self) -> SessionResult<Word> {
        let word = match &self.state {
            SessionState::Composing(w) | SessionState::Comparing(w) => w.clone(),
            other => return Err(self.reject("generate", other)),
        };
        tracing::info!("[NHAENGSI] Generating AI poem for \"{}\"", word);
        self.state = SessionState::Generating(word.clone());
        self.encouragement = None;
        self.notice = None;
        Ok(word)
    }

    /// Leave Generating with the provider's outcome. A poem moves the session to
    /// Comparing; anything else returns to Composing with a notice.
    pub fn complete_generation(&mut self, outcome: GenerationOutcome) -> SessionResult<&SessionState> {
        let word = match &self.state {
            SessionState::Generating(w) => w.clone(),
            other => return Err(self.reject("complete generation", other)),
        };
        match outcome {
            GenerationOutcome::Poem(text) => {
                if let Err(e) = self.store.set_ai_poem(&word, text) {
                    self.state = SessionState::Composing(word);
                    return Err(e.into());
                }
                self.enter_comparing(word);
            }
            other => {
                tracing::warn!("[NHAENGSI] No AI poem for \"{}\": {:?}", word, other);
                self.notice = Some(other.display_text());
                self.state = SessionState::Composing(word);
            }
        }
        Ok(&self.state)
    }

    /// Generate (or overwrite) the AI poem for the active word.
    pub async fn generate(&mut self, generator: &PoemGenerator) -> SessionResult<&SessionState> {
        let word = self.begin_generation()?;
        let outcome = generator.generate(&word).await;
        self.complete_generation(outcome)
    }

    /// Drop the current AI poem and ask for a new one. Only from Comparing.
    pub async fn regenerate(&mut self, generator: &PoemGenerator) -> SessionResult<&SessionState> {
        let word = match &self.state {
            SessionState::Comparing(w) => w.clone(),
            other => return Err(self.reject("regenerate", other)),
        };
        self.store.clear_ai_poem(&word);
        self.generate(generator).await
    }

    /// Return to Comparing after further edits, reusing the stored AI poem.
    pub fn show_comparison(&mut self) -> SessionResult<&SessionState> {
        match &self.state {
            SessionState::Comparing(_) => {}
            SessionState::Composing(w) => {
                if self.store.ai_poem(w).is_none() {
                    return Err(SessionError::NothingToCompare);
                }
                let word = w.clone();
                self.notice = None;
                self.enter_comparing(word);
            }
            other => return Err(self.reject("compare", other)),
        }
        Ok(&self.state)
    }

    /// Forget both poems for the active word and go back to Idle.
    pub fn reset_word(&mut self) -> SessionResult<()> {
        let word = match &self.state {
            SessionState::Composing(w) | SessionState::Comparing(w) => w.clone(),
            other => return Err(self.reject("reset the word", other)),
        };
        self.store.clear_word(&word);
        tracing::info!("[NHAENGSI] Cleared \"{}\"", word);
        self.state = SessionState::Idle;
        self.encouragement = None;
        self.notice = None;
        Ok(())
    }

    pub fn clear_history(&mut self) {
        tracing::info!("[NHAENGSI] History cleared ({} entries)", self.store.history_len());
        self.store.clear_history();
    }

    fn enter_comparing(&mut self, word: Word) {
        let composed = self.store.compose_user_poem(&word);
        let ai = self.store.ai_poem(&word).map(str::to_string);
        self.encouragement = None;
        if let Some(ai) = ai {
            if !composed.is_empty() {
                self.store
                    .append_history(HistoryEntry::new(word.clone(), ai, composed));
                self.encouragement = Some(pick_encouragement(&mut self.rng));
                tracing::info!(
                    "[NHAENGSI] Saved \"{}\" to history ({} total)",
                    word,
                    self.store.history_len()
                );
            }
        }
        self.state = SessionState::Comparing(word);
    }

    fn reject(&self, action: &'static str, state: &SessionState) -> SessionError {
        match state {
            SessionState::Idle => {
                tracing::warn!("[NHAENGSI] cannot {} without a word", action);
                SessionError::NoActiveWord
            }
            other => {
                tracing::warn!("[NHAENGSI] cannot {} while {}", action, other.name());
                SessionError::InvalidTransition {
                    action,
                    state: other.name(),
                }
            }
        }
    }

    pub fn comparison(&self) -> Option<ComparisonView> {
        let SessionState::Comparing(word) = &self.state else {
            return None;
        };
        let ai_poem = self.store.ai_poem(word)?.to_string();
        let composed = self.store.compose_user_poem(word);
        let user_poem = (!composed.is_empty()).then_some(composed);
        Some(ComparisonView {
            word: word.clone(),
            user_poem_display: user_poem
                .clone()
                .unwrap_or_else(|| EMPTY_USER_POEM_PLACEHOLDER.to_string()),
            user_poem,
            ai_poem,
            encouragement: self.encouragement,
        })
    }

    pub fn history_view(&self) -> HistoryView {
        HistoryView {
            total: self.store.history_len(),
            hidden: self.store.hidden_history_count(),
            entries: self.store.recent_history().into_iter().cloned().collect(),
        }
    }

    /// Copyable text for one of the poems of the active word.
    pub fn export(&self, author: PoemAuthor) -> Option<String> {
        let word = self.active_word()?;
        match author {
            PoemAuthor::Ai => {
                let poem = self.store.ai_poem(word)?;
                Some(format!("\"{}\" N행시 (AI 작품)\n\n{}", word, poem))
            }
            PoemAuthor::User => {
                let poem = self.store.compose_user_poem(word);
                (!poem.is_empty()).then(|| format!("\"{}\" N행시 (내 작품)\n\n{}", word, poem))
            }
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let word = self.active_word();
        SessionSnapshot {
            state: self.state.clone(),
            line_chars: word
                .map(|w| w.chars().map(String::from).collect())
                .unwrap_or_default(),
            lines: word
                .and_then(|w| self.store.user_poem(w))
                .map(|p| p.lines().to_vec())
                .unwrap_or_default(),
            preview: word
                .filter(|w| self.store.user_poem(w).is_some_and(|p| !p.is_blank()))
                .map(|w| self.store.preview_user_poem(w)),
            ai_poem: word.and_then(|w| self.store.ai_poem(w)).map(str::to_string),
            comparison: self.comparison(),
            notice: self.notice.clone(),
            history: self.history_view(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encouragement::ENCOURAGEMENTS;

    fn composing(word: &str) -> SessionController {
        let mut s = SessionController::with_seed(1);
        s.submit_word(word).unwrap();
        s
    }

    fn run_generation(s: &mut SessionController, outcome: GenerationOutcome) {
        s.begin_generation().unwrap();
        s.complete_generation(outcome).unwrap();
    }

    #[test]
    fn valid_word_enters_composing_with_blank_lines() {
        let s = composing("바다");
        assert_eq!(s.state().name(), "composing");
        assert_eq!(s.store().user_poem(s.active_word().unwrap()).unwrap().lines(), ["", ""]);
    }

    #[test]
    fn invalid_word_keeps_state() {
        let mut s = SessionController::with_seed(1);
        assert_eq!(s.submit_word("hi"), Err(ValidationError::NotKorean));
        assert_eq!(s.state(), &SessionState::Idle);
        assert_eq!(s.submit_word("가"), Err(ValidationError::TooShort { chars: 1 }));

        s.submit_word("바다").unwrap();
        s.edit_line(0, "바람").unwrap();
        assert!(s.submit_word("hello").is_err());
        assert_eq!(s.active_word().unwrap().as_str(), "바다");
        assert_eq!(s.store().compose_user_poem(s.active_word().unwrap()), "[바] 바람");
    }

    #[test]
    fn actions_need_a_word() {
        let mut s = SessionController::with_seed(1);
        assert_eq!(s.edit_line(0, "x"), Err(SessionError::NoActiveWord));
        assert_eq!(s.begin_generation(), Err(SessionError::NoActiveWord));
        assert_eq!(s.show_comparison().unwrap_err(), SessionError::NoActiveWord);
        assert_eq!(s.reset_word(), Err(SessionError::NoActiveWord));
    }

    #[test]
    fn poem_with_user_lines_lands_in_history() {
        let mut s = composing("바다");
        s.edit_line(0, "바람이 불어요").unwrap();
        s.edit_line(1, "다 같이 놀아요").unwrap();
        run_generation(&mut s, GenerationOutcome::Poem("[바] AI\n[다] AI".into()));

        assert_eq!(s.state().name(), "comparing");
        let history = s.history_view();
        assert_eq!(history.total, 1);
        assert_eq!(history.entries[0].word.as_str(), "바다");
        assert_eq!(history.entries[0].user_poem, "[바] 바람이 불어요\n[다] 다 같이 놀아요");

        let view = s.comparison().unwrap();
        assert_eq!(view.ai_poem, "[바] AI\n[다] AI");
        assert!(ENCOURAGEMENTS.contains(&view.encouragement.unwrap()));
    }

    #[test]
    fn poem_without_user_lines_skips_history() {
        let mut s = composing("바다");
        run_generation(&mut s, GenerationOutcome::Poem("ai".into()));
        assert_eq!(s.state().name(), "comparing");
        assert_eq!(s.history_view().total, 0);
        let view = s.comparison().unwrap();
        assert_eq!(view.user_poem, None);
        assert_eq!(view.user_poem_display, EMPTY_USER_POEM_PLACEHOLDER);
        assert_eq!(view.encouragement, None);
    }

    #[test]
    fn failed_generation_returns_to_composing() {
        let mut s = composing("바다");
        s.edit_line(0, "바람").unwrap();
        run_generation(&mut s, GenerationOutcome::Failed("timeout".into()));
        assert_eq!(s.state().name(), "composing");
        assert!(s.notice().unwrap().contains("timeout"));
        assert_eq!(s.store().ai_poem(s.active_word().unwrap()), None);
        assert_eq!(s.history_view().total, 0);

        run_generation(&mut s, GenerationOutcome::Empty);
        assert_eq!(s.notice(), Some(crate::gemini_bridge::EMPTY_RESPONSE_FALLBACK));
    }

    #[test]
    fn generating_blocks_other_actions() {
        let mut s = composing("바다");
        s.begin_generation().unwrap();
        assert_eq!(
            s.edit_line(0, "x"),
            Err(SessionError::InvalidTransition {
                action: "edit a line",
                state: "generating"
            })
        );
        assert!(s.begin_generation().is_err());
        assert!(s.reset_word().is_err());
    }

    #[test]
    fn rejected_action_message_is_korean() {
        let mut s = composing("바다");
        s.begin_generation().unwrap();
        let err = s.edit_line(0, "x").unwrap_err();
        assert_eq!(err.to_string(), "지금은 이 동작을 할 수 없어요");
        assert!(!err.to_string().is_ascii());
        assert!(!err.to_string().contains("generating"));
    }

    #[test]
    fn preview_hidden_until_a_line_has_text() {
        let mut s = composing("바다");
        assert_eq!(s.snapshot().preview, None);
        s.edit_line(0, "   ").unwrap();
        assert_eq!(s.snapshot().preview, None);
        s.edit_line(1, "다 같이").unwrap();
        assert_eq!(s.snapshot().preview.as_deref(), Some("[바] ...\n[다] 다 같이"));
    }

    #[test]
    fn complete_without_begin_is_rejected() {
        let mut s = composing("바다");
        assert!(matches!(
            s.complete_generation(GenerationOutcome::Empty),
            Err(SessionError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn edit_in_comparing_goes_back_to_composing() {
        let mut s = composing("바다");
        s.edit_line(0, "바람").unwrap();
        run_generation(&mut s, GenerationOutcome::Poem("ai".into()));
        s.edit_line(1, "다람쥐").unwrap();
        assert_eq!(s.state().name(), "composing");
        assert!(s.comparison().is_none());

        s.show_comparison().unwrap();
        assert_eq!(s.state().name(), "comparing");
        assert_eq!(s.history_view().total, 2);
        assert_eq!(s.history_view().entries[0].user_poem, "[바] 바람\n[다] 다람쥐");

        // already comparing: no duplicate entry
        s.show_comparison().unwrap();
        assert_eq!(s.history_view().total, 2);
    }

    #[test]
    fn compare_without_ai_poem_fails() {
        let mut s = composing("바다");
        assert_eq!(s.show_comparison().unwrap_err(), SessionError::NothingToCompare);
    }

    #[test]
    fn resubmitting_same_word_keeps_lines() {
        let mut s = composing("바다");
        s.edit_line(0, "바람").unwrap();
        s.submit_word("하늘").unwrap();
        s.submit_word(" 바 다").unwrap();
        assert_eq!(s.snapshot().lines, ["바람", ""]);
    }

    #[test]
    fn reset_word_clears_buckets() {
        let mut s = composing("바다");
        s.edit_line(0, "바람").unwrap();
        run_generation(&mut s, GenerationOutcome::Poem("ai".into()));
        s.reset_word().unwrap();
        assert_eq!(s.state(), &SessionState::Idle);
        assert_eq!(s.history_view().total, 1);

        s.submit_word("바다").unwrap();
        assert_eq!(s.snapshot().lines, ["", ""]);
        assert_eq!(s.snapshot().ai_poem, None);
    }

    #[test]
    fn export_texts() {
        let mut s = composing("바다");
        assert_eq!(s.export(PoemAuthor::Ai), None);
        assert_eq!(s.export(PoemAuthor::User), None);
        s.edit_line(1, "다 함께").unwrap();
        run_generation(&mut s, GenerationOutcome::Poem("AI 시".into()));
        assert_eq!(s.export(PoemAuthor::Ai).unwrap(), "\"바다\" N행시 (AI 작품)\n\nAI 시");
        assert_eq!(
            s.export(PoemAuthor::User).unwrap(),
            "\"바다\" N행시 (내 작품)\n\n[다] 다 함께"
        );
    }

    #[test]
    fn history_display_caps_at_five() {
        let mut s = composing("바다");
        s.edit_line(0, "바람").unwrap();
        for i in 0..7 {
            run_generation(&mut s, GenerationOutcome::Poem(format!("ai {i}")));
        }
        let view = s.history_view();
        assert_eq!(view.total, 7);
        assert_eq!(view.entries.len(), 5);
        assert_eq!(view.hidden, 2);
        assert_eq!(view.entries[0].ai_poem, "ai 6");

        s.clear_history();
        assert_eq!(s.history_view().total, 0);
    }

    #[test]
    fn snapshot_serializes_state_tag() {
        let mut s = composing("바다");
        s.edit_line(0, "바람").unwrap();
        let json = serde_json::to_value(s.snapshot()).unwrap();
        assert_eq!(json["state"], "composing");
        assert_eq!(json["word"], "바다");
        assert_eq!(json["line_chars"][1], "다");
        assert_eq!(json["preview"], "[바] 바람\n[다] ...");
        assert!(json["comparison"].is_null());
    }

    #[test]
    fn seeded_sessions_pick_same_encouragement() {
        let run = || {
            let mut s = composing("바다");
            s.edit_line(0, "바람").unwrap();
            run_generation(&mut s, GenerationOutcome::Poem("ai".into()));
            s.comparison().unwrap().encouragement
        };
        assert_eq!(run(), run());
    }
}
