//! Upstream AI gateway client.
//!
//! Talks to an OpenAI-compatible chat-completions endpoint and shapes
//! the reply for each analyzer kind: image kinds get the vibe-analyzer
//! persona and a full score bundle, text kinds get a coaching persona
//! and a single overall score, generic chat gets the companion persona
//! and no scores. Missing or empty completions fall back to canned
//! lines — an upstream hiccup never turns into a blank reply.

use std::sync::Arc;

use rand::Rng;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::debug;
use vibecheck_core::moderation::{moderation_prompt, parse_ai_verdict, MODERATION_SYSTEM_PROMPT};
use vibecheck_core::scoring::extract_number;
use vibecheck_core::types::AnalyzerKind;

use crate::config::ServerConfig;
use crate::error::ServerError;

const VIBE_SYSTEM_PROMPT: &str = "You are Vibecheck AI, a brutally honest but hilarious vibe analyzer.\n\
Rate this person's vibe on a scale of 1-100. Be funny, use Gen Z slang, and give specific observations.\n\
Keep your response to 2-3 sentences max. Be playful but not mean.";

const LINKEDIN_SYSTEM_PROMPT: &str = "You are a professional LinkedIn coach. Analyze this profile and provide:\n\
1. A professional score (0-100)\n\
2. Honest assessment\n\
3. 3 specific improvements\n\
Keep it constructive but real. 2-3 sentences max.";

const INSTAGRAM_SYSTEM_PROMPT: &str = "You are a social media expert. Roast this Instagram bio with humor.\n\
Rate the cringe level (0-100). Be savage but funny. 2-3 sentences max.";

const DATING_SYSTEM_PROMPT: &str = "You are a dating coach. Rate this profile (0-100) and give honest feedback.\n\
What's working? What's not? Be funny but helpful. 2-3 sentences max.";

/// Generic chat keeps only the tail of the history.
const CHAT_HISTORY_LIMIT: usize = 10;

/// One role/content turn on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Optional caller context injected into the companion chat prompt.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CallerProfile {
    pub username: Option<String>,
    pub rizz_score: Option<f64>,
    pub rank: Option<String>,
}

/// Scores the gateway extracted or generated for an analysis reply.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Scores {
    pub overall: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub main_character: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rizz: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub npc: Option<f64>,
}

/// Gateway response body.
#[derive(Debug, Clone, Serialize)]
pub struct AiReply {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<Scores>,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct Completion {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Client for the upstream language-model provider.
pub struct AiClient {
    http: reqwest::Client,
    config: Arc<ServerConfig>,
}

impl AiClient {
    pub fn new(config: Arc<ServerConfig>) -> Result<Self, anyhow::Error> {
        let http = reqwest::Client::builder()
            .timeout(config.ai_timeout)
            .build()?;
        Ok(Self { http, config })
    }

    /// Dispatch one analysis request by analyzer kind.
    pub async fn analyze(
        &self,
        kind: AnalyzerKind,
        messages: &[ChatMessage],
        profile: Option<&CallerProfile>,
    ) -> Result<AiReply, ServerError> {
        match kind {
            AnalyzerKind::Selfie | AnalyzerKind::Chat => self.image_analysis(messages).await,
            AnalyzerKind::Linkedin | AnalyzerKind::Instagram | AnalyzerKind::Dating => {
                self.text_analysis(kind, messages).await
            }
            AnalyzerKind::GenericChat => self.chat(messages, profile).await,
        }
    }

    async fn image_analysis(&self, messages: &[ChatMessage]) -> Result<AiReply, ServerError> {
        let message = self
            .complete(
                &self.config.vision_model,
                VIBE_SYSTEM_PROMPT,
                messages,
                0.9,
                500,
            )
            .await?;
        let message = non_empty_or(message, "Looking good! 🔥");

        let mut rng = rand::thread_rng();
        let overall = extract_number(&message, "score")
            .filter(|s| *s > 0.0)
            .unwrap_or_else(|| rng.gen_range(75.0..95.0));

        Ok(AiReply {
            scores: Some(Scores {
                overall: overall.clamp(0.0, 100.0),
                main_character: Some(rng.gen_range(70.0..98.0)),
                rizz: Some(rng.gen_range(70.0..98.0)),
                npc: Some(rng.gen_range(5.0..35.0)),
            }),
            message,
        })
    }

    async fn text_analysis(
        &self,
        kind: AnalyzerKind,
        messages: &[ChatMessage],
    ) -> Result<AiReply, ServerError> {
        let system = match kind {
            AnalyzerKind::Linkedin => LINKEDIN_SYSTEM_PROMPT,
            AnalyzerKind::Instagram => INSTAGRAM_SYSTEM_PROMPT,
            _ => DATING_SYSTEM_PROMPT,
        };

        let message = self
            .complete(&self.config.text_model, system, messages, 0.8, 400)
            .await?;
        let message = non_empty_or(message, "Not bad! 👍");

        let overall = extract_first_int(&message)
            .unwrap_or_else(|| rand::thread_rng().gen_range(75.0..95.0))
            .clamp(0.0, 100.0);

        Ok(AiReply {
            scores: Some(Scores {
                overall,
                main_character: None,
                rizz: None,
                npc: None,
            }),
            message,
        })
    }

    async fn chat(
        &self,
        messages: &[ChatMessage],
        profile: Option<&CallerProfile>,
    ) -> Result<AiReply, ServerError> {
        let username = profile
            .and_then(|p| p.username.clone())
            .unwrap_or_else(|| "Anonymous".to_string());
        let rizz_score = profile.and_then(|p| p.rizz_score).unwrap_or(0.0);

        let system = format!(
            "You are Vibecheck AI, a witty and fun chatbot that helps people with dating advice and rizz tips.\n\
             Be conversational, use Gen Z slang naturally, and keep responses short (2-3 sentences).\n\
             Be funny and helpful. User: {username} (Rizz Score: {rizz_score})"
        );

        let tail_start = messages.len().saturating_sub(CHAT_HISTORY_LIMIT);
        let message = self
            .complete(
                &self.config.text_model,
                &system,
                &messages[tail_start..],
                0.9,
                300,
            )
            .await?;

        Ok(AiReply {
            message: non_empty_or(message, "Hey! What's up? 😊"),
            scores: None,
        })
    }

    /// Run the constrained moderation prompt. `Ok(Some(reason))` means
    /// the model flagged the content; errors are for the caller to
    /// fail open on.
    pub async fn moderate(&self, content: &str) -> Result<Option<String>, ServerError> {
        let prompt = moderation_prompt(content);
        let reply = self
            .complete(
                &self.config.text_model,
                MODERATION_SYSTEM_PROMPT,
                &[ChatMessage::user(prompt)],
                0.1,
                50,
            )
            .await?;
        Ok(parse_ai_verdict(&reply))
    }

    /// One upstream chat-completion round trip. Returns the completion
    /// text, or an empty string when the provider answered with no
    /// content (callers supply their own fallback line).
    async fn complete(
        &self,
        model: &str,
        system: &str,
        messages: &[ChatMessage],
        temperature: f64,
        max_tokens: u32,
    ) -> Result<String, ServerError> {
        let key = self
            .config
            .ai_api_key
            .as_deref()
            .ok_or(ServerError::NotConfigured)?;

        let mut all_messages = Vec::with_capacity(messages.len() + 1);
        all_messages.push(ChatMessage::system(system));
        all_messages.extend_from_slice(messages);

        let body = CompletionRequest {
            model,
            messages: all_messages,
            temperature,
            max_tokens,
        };

        let response = self
            .http
            .post(&self.config.ai_api_url)
            .bearer_auth(key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServerError::Upstream(e.to_string()))?;

        match response.status() {
            StatusCode::TOO_MANY_REQUESTS => return Err(ServerError::UpstreamRateLimited),
            StatusCode::UNAUTHORIZED => return Err(ServerError::UpstreamAuth),
            status if !status.is_success() => {
                return Err(ServerError::Upstream(format!("upstream status {status}")));
            }
            _ => {}
        }

        let completion: Completion = response
            .json()
            .await
            .map_err(|e| ServerError::Upstream(e.to_string()))?;

        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        debug!(model, chars = text.len(), "upstream completion received");
        Ok(text)
    }
}

fn non_empty_or(message: String, fallback: &str) -> String {
    if message.trim().is_empty() {
        fallback.to_string()
    } else {
        message
    }
}

/// First standalone 1-3 digit number in the text, if any. Longer runs
/// (years, ids) are skipped.
fn extract_first_int(text: &str) -> Option<f64> {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if !bytes[i].is_ascii_digit() {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && bytes[i].is_ascii_digit() {
            i += 1;
        }
        let len = i - start;
        let before_ok = start == 0 || !bytes[start - 1].is_ascii_alphanumeric();
        let after_ok = i == bytes.len() || !bytes[i].is_ascii_alphanumeric();
        if (1..=3).contains(&len) && before_ok && after_ok {
            if let Ok(v) = text[start..i].parse::<u32>() {
                return Some(v as f64);
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_int_basic() {
        assert_eq!(extract_first_int("I'd give this an 85 overall"), Some(85.0));
        assert_eq!(extract_first_int("solid 7/10 energy"), Some(7.0));
        assert_eq!(extract_first_int("no digits at all"), None);
    }

    #[test]
    fn first_int_skips_long_runs_and_word_joined() {
        // A year is not a score.
        assert_eq!(extract_first_int("since 2021, a clean 88"), Some(88.0));
        // Digits glued to letters don't count.
        assert_eq!(extract_first_int("user42x but rated 90"), Some(90.0));
    }

    #[test]
    fn non_empty_fallback() {
        assert_eq!(non_empty_or("  ".to_string(), "fallback"), "fallback");
        assert_eq!(non_empty_or("hi".to_string(), "fallback"), "hi");
    }

    #[tokio::test]
    async fn unconfigured_client_reports_it() {
        let client = AiClient::new(Arc::new(ServerConfig::default())).unwrap();
        let err = client
            .analyze(AnalyzerKind::Selfie, &[ChatMessage::user("hi")], None)
            .await
            .unwrap_err();
        assert!(matches!(err, ServerError::NotConfigured));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_an_upstream_error() {
        let config = ServerConfig {
            ai_api_key: Some("test-key".to_string()),
            // Nothing listens here; connection fails fast.
            ai_api_url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            ai_timeout: std::time::Duration::from_millis(500),
            ..ServerConfig::default()
        };
        let client = AiClient::new(Arc::new(config)).unwrap();
        let err = client.moderate("hello there").await.unwrap_err();
        assert!(matches!(err, ServerError::Upstream(_)));
    }
}
