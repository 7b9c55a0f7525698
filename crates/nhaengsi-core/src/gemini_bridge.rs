//! Gemini Bridge: turns a validated word into an AI-written N-행시.
//!
//! The prompt template and sampling settings are fixed. Provider failures stop
//! here and come back as a [`GenerationOutcome`] so callers can branch on the
//! variant instead of matching on text.
//!
//! API key: `GEMINI_API_KEY`. Default model: `gemini-2.5-flash`.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::config::NhaengsiConfig;
use crate::error::ProviderError;
use crate::validator::Word;

pub const EMPTY_RESPONSE_FALLBACK: &str = "죄송해요, N행시를 만들지 못했어요. 다시 시도해주세요! 😅";

/// Sampling parameters sent with every generation request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub max_output_tokens: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            temperature: 0.8,
            top_p: 0.9,
            max_output_tokens: 1000,
        }
    }
}

/// Remote text generator: prompt in, raw text out.
#[async_trait]
pub trait TextProvider: Send + Sync {
    async fn generate_text(
        &self,
        prompt: &str,
        sampling: &SamplingConfig,
    ) -> Result<String, ProviderError>;
}

/// Result of one generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum GenerationOutcome {
    /// Trimmed, non-empty poem text.
    Poem(String),
    /// Provider answered but with nothing usable.
    Empty,
    /// Provider call failed; carries the error description.
    Failed(String),
}

impl GenerationOutcome {
    pub fn is_poem(&self) -> bool {
        matches!(self, GenerationOutcome::Poem(_))
    }

    /// Text to show the user for this outcome.
    pub fn display_text(&self) -> String {
        match self {
            GenerationOutcome::Poem(text) => text.clone(),
            GenerationOutcome::Empty => EMPTY_RESPONSE_FALLBACK.to_string(),
            GenerationOutcome::Failed(reason) => {
                format!("오류가 발생했어요: {} 😢\n다시 시도해주세요!", reason)
            }
        }
    }
}

/// Builds the instruction prompt for `word`.
pub fn build_prompt(word: &Word) -> String {
    format!(
        "
당신은 아이들을 위한 창의적인 한국어 N행시 작가입니다.
주어진 단어 '{word}'로 재미있고 창의적인 N행시를 만들어주세요.

규칙:
1. 각 줄은 해당 글자로 시작해야 합니다
2. 아이들이 이해하기 쉬운 단어와 표현을 사용하세요
3. 긍정적이고 밝은 내용으로 작성하세요
4. 각 줄에 적절한 이모티콘을 1-2개씩 추가하세요
5. 운율이나 리듬감을 고려하세요
6. 교육적이거나 상상력을 자극하는 내용이면 더 좋습니다

예시 형식:
[첫째글자] 첫 번째 줄 내용 🌟
[둘째글자] 두 번째 줄 내용 🎈
...

단어: {word}
N행시:
",
        word = word
    )
}

/// Generation Client: fixed prompt, fixed sampling, any [`TextProvider`].
#[derive(Clone)]
pub struct PoemGenerator {
    provider: Arc<dyn TextProvider>,
    sampling: SamplingConfig,
}

impl PoemGenerator {
    pub fn new(provider: Arc<dyn TextProvider>) -> Self {
        Self {
            provider,
            sampling: SamplingConfig::default(),
        }
    }

    /// Generator backed by Gemini, built from config.
    pub fn gemini(config: &NhaengsiConfig) -> Self {
        Self::new(Arc::new(GeminiProvider::from_config(config)))
    }

    pub async fn generate(&self, word: &Word) -> GenerationOutcome {
        let prompt = build_prompt(word);
        match self.provider.generate_text(&prompt, &self.sampling).await {
            Ok(text) => {
                let text = text.trim();
                if text.is_empty() {
                    tracing::warn!("[NHAENGSI] Gemini returned no text for \"{}\"", word);
                    GenerationOutcome::Empty
                } else {
                    GenerationOutcome::Poem(text.to_string())
                }
            }
            Err(e) => {
                tracing::error!("Error generating N-row poem: {}", e);
                GenerationOutcome::Failed(e.to_string())
            }
        }
    }
}

// Gemini generateContent request/response
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Gemini `generateContent` over reqwest.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    api_base: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn from_config(config: &NhaengsiConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            api_base: config.api_base.clone(),
            client,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }
}

#[async_trait]
impl TextProvider for GeminiProvider {
    async fn generate_text(
        &self,
        prompt: &str,
        sampling: &SamplingConfig,
    ) -> Result<String, ProviderError> {
        tracing::info!("[NHAENGSI] Gemini request: model={}", self.model);

        let body = GenerateContentRequest {
            contents: vec![Content {
                role: Some("user".to_string()),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: sampling.temperature,
                top_p: sampling.top_p,
                max_output_tokens: sampling.max_output_tokens,
            },
        };

        let res = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = res.status();
        let text = res.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        extract_text(&text)
    }
}

/// Concatenates the text parts of the first candidate. No candidate or no
/// text yields an empty string.
fn extract_text(raw: &str) -> Result<String, ProviderError> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(raw).map_err(|e| ProviderError::Decode(e.to_string()))?;
    Ok(parsed
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<String>()
        })
        .unwrap_or_default())
}
