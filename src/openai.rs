use reqwest::Client;
use serde_json::{json, Value};
use std::env;

use crate::domain::{GeneratedContent, GeneratedPractice, Mood, PracticeCategory, Slot};

const COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";

const SYSTEM_PROMPT: &str = "You are a compassionate mindful wellness coach. Based on the user's mood and body sensations, suggest:\n\
1. A short mindfulness practice (2-3 minutes) that is specific and actionable\n\
2. A thoughtful journal prompt for reflection\n\
\n\
Respond ONLY with valid JSON in this exact format:\n\
{\n\
  \"practice\": {\n\
    \"title\": \"Practice name (concise, under 50 characters)\",\n\
    \"description\": \"Step-by-step instructions (clear, numbered steps if applicable, 100-200 words)\",\n\
    \"type\": \"breathing|meditation|movement|grounding\"\n\
  },\n\
  \"journal_prompt\": \"A thoughtful question or reflection prompt (1-2 sentences)\"\n\
}\n\
\n\
Guidelines:\n\
- For anxious/stressed moods: Focus on grounding, breathing exercises, calming techniques\n\
- For sad/low moods: Focus on compassion, gentle movement, self-kindness\n\
- For happy/content moods: Focus on gratitude, energizing practices, appreciation\n\
- For calm moods: Focus on body awareness, mindfulness, meditation\n\
- Keep practices simple and accessible (no equipment needed)\n\
- Write the description as spoken guidance; use '...' where the reader should pause\n\
- Make journal prompts introspective but not overwhelming";

/// Adapter for the chat-completions API that produces a practice and a
/// journal prompt for a check-in. Every failure class (missing key, network
/// error, non-2xx, malformed payload) surfaces as `Err`; the caller decides
/// whether to fall back and whether to persist.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: Option<String>,
    model: String,
}

impl OpenAiClient {
    pub fn from_env() -> Self {
        let api_key = env::var("OPENAI_API_KEY").ok();
        if api_key.is_none() {
            tracing::warn!(
                "OPENAI_API_KEY not set. Practices will come from the fallback table."
            );
        }
        let model = env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-3.5-turbo".to_string());
        Self::new(api_key, model)
    }

    pub fn new(api_key: Option<String>, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model,
        }
    }

    pub async fn generate_practice_and_prompt(
        &self,
        mood: Mood,
        body_feeling: Option<&str>,
        slot: Slot,
    ) -> Result<GeneratedContent, String> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or("OPENAI_API_KEY not set".to_string())?;

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": build_user_message(mood, body_feeling, slot) }
            ],
            "max_tokens": 400,
            "temperature": 0.7
        });

        let res = self
            .client
            .post(COMPLETIONS_URL)
            .bearer_auth(api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| format!("Completion request failed: {}", e))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(format!("Completion failed ({}): {}", status, text));
        }

        let payload: Value = res.json().await.map_err(|e| e.to_string())?;
        let text = payload["choices"][0]["message"]["content"]
            .as_str()
            .ok_or("No text in completion response")?;

        parse_generated(text)
    }
}

fn build_user_message(mood: Mood, body_feeling: Option<&str>, slot: Slot) -> String {
    let mut message = format!("User's mood: {}", mood.label());
    if let Some(feeling) = body_feeling {
        message.push_str(&format!("\nBody feeling: {}", feeling));
    }
    if let Some(time_of_day) = slot.time_of_day() {
        message.push_str(&format!("\nTime of day: {}", time_of_day));
    }
    message
}

/// Parse the model's reply, tolerating markdown code fences around the JSON.
pub fn parse_generated(text: &str) -> Result<GeneratedContent, String> {
    let clean = text
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```");

    let value: Value = serde_json::from_str(clean)
        .map_err(|e| format!("Failed to parse completion JSON: {}", e))?;

    validate_payload(&value)
}

/// Enforce the strict payload contract: practice.title / practice.description
/// / practice.type / journal_prompt all present, non-empty, and the type
/// within the four-value category enum.
pub fn validate_payload(value: &Value) -> Result<GeneratedContent, String> {
    let practice = value
        .get("practice")
        .ok_or("response missing 'practice'".to_string())?;

    let title = required_string(practice, "title")?;
    let description = required_string(practice, "description")?;
    let kind = required_string(practice, "type")?;
    let category = kind
        .parse::<PracticeCategory>()
        .map_err(|_| format!("invalid practice type: {}", kind))?;
    let journal_prompt = required_string(value, "journal_prompt")?;

    Ok(GeneratedContent {
        practice: GeneratedPractice {
            title,
            description,
            category,
        },
        journal_prompt,
    })
}

fn required_string(parent: &Value, key: &str) -> Result<String, String> {
    let s = parent
        .get(key)
        .and_then(Value::as_str)
        .ok_or_else(|| format!("response missing '{}'", key))?;
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(format!("'{}' is empty", key));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_payload() -> Value {
        json!({
            "practice": {
                "title": "Box Breathing",
                "description": "Inhale for four counts... hold for four... exhale for four.",
                "type": "breathing"
            },
            "journal_prompt": "Where in your body did you notice the breath?"
        })
    }

    #[test]
    fn accepts_a_well_formed_payload() {
        let content = validate_payload(&valid_payload()).unwrap();
        assert_eq!(content.practice.title, "Box Breathing");
        assert_eq!(content.practice.category, PracticeCategory::Breathing);
        assert_eq!(
            content.journal_prompt,
            "Where in your body did you notice the breath?"
        );
    }

    #[test]
    fn rejects_missing_journal_prompt() {
        let mut payload = valid_payload();
        payload.as_object_mut().unwrap().remove("journal_prompt");
        assert!(validate_payload(&payload).is_err());
    }

    #[test]
    fn rejects_category_outside_the_enum() {
        let mut payload = valid_payload();
        payload["practice"]["type"] = json!("yoga");
        assert!(validate_payload(&payload).is_err());
    }

    #[test]
    fn rejects_empty_title() {
        let mut payload = valid_payload();
        payload["practice"]["title"] = json!("   ");
        assert!(validate_payload(&payload).is_err());
    }

    #[test]
    fn parses_a_fenced_reply() {
        let text = format!("```json\n{}\n```", valid_payload());
        let content = parse_generated(&text).unwrap();
        assert_eq!(content.practice.category, PracticeCategory::Breathing);
    }

    #[test]
    fn rejects_non_json_reply() {
        assert!(parse_generated("Take a deep breath and relax.").is_err());
    }

    #[test]
    fn user_message_carries_optional_lines() {
        let bare = build_user_message(Mood::Anxious, None, Slot::Day);
        assert_eq!(bare, "User's mood: Anxious");

        let full = build_user_message(Mood::Anxious, Some("tight chest"), Slot::Morning);
        assert!(full.contains("Body feeling: tight chest"));
        assert!(full.contains("Time of day: morning"));
    }
}
