//! Session flow test: drives the controller through the generator with a
//! scripted provider, the way the gateway does.
//!
//! Run with: `cargo test --test session_flow_test`

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use nhaengsi_core::{
    GenerationOutcome, PoemGenerator, ProviderError, SamplingConfig, SessionController,
    SessionError, SessionState, TextProvider,
};

/// Replays canned replies in order and records each prompt.
struct ScriptedProvider {
    replies: Mutex<VecDeque<Result<String, String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    fn new(replies: Vec<Result<&str, &str>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(
                replies
                    .into_iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            prompts: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }
}

#[async_trait]
impl TextProvider for ScriptedProvider {
    async fn generate_text(
        &self,
        prompt: &str,
        _sampling: &SamplingConfig,
    ) -> Result<String, ProviderError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err("script exhausted".to_string()))
            .map_err(ProviderError::Other)
    }
}

#[tokio::test]
async fn test_compose_generate_compare() {
    let provider = ScriptedProvider::new(vec![Ok("[바] 바다는 넓어요 🌊\n[다] 다 함께 헤엄쳐요 🐟")]);
    let generator = PoemGenerator::new(provider.clone());
    let mut session = SessionController::with_seed(3);

    session.submit_word("바다").expect("valid word");
    session.edit_line(0, "바람이 시원해").unwrap();
    session.edit_line(1, "다람쥐도 놀러와").unwrap();

    let state = session.generate(&generator).await.unwrap().clone();
    assert!(matches!(state, SessionState::Comparing(ref w) if w.as_str() == "바다"));
    assert_eq!(provider.calls(), 1);
    assert!(provider.prompts.lock().unwrap()[0].contains("단어: 바다"));

    let history = session.history_view();
    assert_eq!(history.total, 1);
    assert_eq!(history.entries[0].word.as_str(), "바다");
    assert_eq!(
        history.entries[0].ai_poem,
        "[바] 바다는 넓어요 🌊\n[다] 다 함께 헤엄쳐요 🐟"
    );
}

#[tokio::test]
async fn test_regenerate_overwrites_ai_poem() {
    let provider = ScriptedProvider::new(vec![Ok("first"), Ok("second")]);
    let generator = PoemGenerator::new(provider.clone());
    let mut session = SessionController::with_seed(3);

    session.submit_word("친구").unwrap();
    session.generate(&generator).await.unwrap();
    assert_eq!(session.snapshot().ai_poem.as_deref(), Some("first"));
    assert_eq!(session.history_view().total, 0);

    session.regenerate(&generator).await.unwrap();
    assert_eq!(session.state().name(), "comparing");
    assert_eq!(session.snapshot().ai_poem.as_deref(), Some("second"));
    assert_eq!(provider.calls(), 2);
    assert_eq!(session.history_view().total, 0);

    session.edit_line(0, "친절한 마음").unwrap();
    let err = session.regenerate(&generator).await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidTransition { action: "regenerate", .. }));
    assert_eq!(provider.calls(), 2);

    session.show_comparison().unwrap();
    assert_eq!(session.history_view().total, 1);
    assert_eq!(session.history_view().entries[0].ai_poem, "second");
}

#[tokio::test]
async fn test_regenerate_with_user_lines_appends_history() {
    let provider = ScriptedProvider::new(vec![Ok("first"), Ok("second"), Err("boom")]);
    let generator = PoemGenerator::new(provider.clone());
    let mut session = SessionController::with_seed(3);

    session.submit_word("바다").unwrap();
    session.edit_line(0, "바람").unwrap();
    session.generate(&generator).await.unwrap();
    assert_eq!(session.history_view().total, 1);

    session.regenerate(&generator).await.unwrap();
    assert_eq!(session.state().name(), "comparing");
    let history = session.history_view();
    assert_eq!(history.total, 2);
    assert_eq!(history.entries[0].ai_poem, "second");
    assert_eq!(history.entries[0].user_poem, "[바] 바람");

    session.regenerate(&generator).await.unwrap();
    assert_eq!(provider.calls(), 3);
    assert_eq!(session.state().name(), "composing");
    assert_eq!(session.snapshot().ai_poem, None);
    assert!(session.notice().unwrap().contains("boom"));
    assert_eq!(session.history_view().total, 2);
    assert!(matches!(
        session.show_comparison(),
        Err(SessionError::NothingToCompare)
    ));
}

#[tokio::test]
async fn test_provider_failure_is_tagged_not_stored() {
    let provider = ScriptedProvider::new(vec![Err("503 unavailable"), Ok("   ")]);
    let generator = PoemGenerator::new(provider.clone());

    let word = nhaengsi_core::validate("학교").unwrap();
    assert_eq!(
        generator.generate(&word).await,
        GenerationOutcome::Failed("503 unavailable".into())
    );
    assert_eq!(generator.generate(&word).await, GenerationOutcome::Empty);

    let provider = ScriptedProvider::new(vec![Err("boom")]);
    let generator = PoemGenerator::new(provider);
    let mut session = SessionController::with_seed(3);
    session.submit_word("학교").unwrap();
    session.edit_line(0, "학생").unwrap();
    session.generate(&generator).await.unwrap();
    assert_eq!(session.state().name(), "composing");
    assert!(session.notice().unwrap().starts_with("오류가 발생했어요: boom"));
    assert!(session.comparison().is_none());
    assert_eq!(session.history_view().total, 0);
}

#[tokio::test]
async fn test_switching_words_keeps_each_bucket() {
    let provider = ScriptedProvider::new(vec![Ok("ai 여행")]);
    let generator = PoemGenerator::new(provider);
    let mut session = SessionController::with_seed(3);

    session.submit_word("여행").unwrap();
    session.edit_line(0, "여름에 떠나요").unwrap();
    session.generate(&generator).await.unwrap();

    session.submit_word("음식").unwrap();
    assert_eq!(session.snapshot().lines, ["", ""]);
    assert_eq!(session.snapshot().ai_poem, None);

    session.submit_word("여행").unwrap();
    assert_eq!(session.state().name(), "composing");
    let snap = session.snapshot();
    assert_eq!(snap.lines, ["여름에 떠나요", ""]);
    assert_eq!(snap.ai_poem.as_deref(), Some("ai 여행"));

    session.show_comparison().unwrap();
    assert_eq!(session.history_view().total, 2);
}
