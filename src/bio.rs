use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

/// Inputs handed to the bio writer. The free-form JSON blocks are passed
/// through verbatim; the writer decides how to phrase them.
#[derive(Debug, Clone)]
pub struct BioInput {
    pub name: String,
    pub skills: Vec<String>,
    pub experience: serde_json::Value,
    pub education: serde_json::Value,
    pub interests: Vec<String>,
}

/// Produces the prose bio stored on a profile. Failures propagate to the
/// caller as a dependency error; a failed writer must never leave a
/// half-written record behind.
#[async_trait]
pub trait BioWriter: Send + Sync {
    async fn write_bio(&self, input: &BioInput) -> anyhow::Result<String>;
}

/// Chat-completions backed writer, selected when an API key is configured.
pub struct OpenAiBioWriter {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl OpenAiBioWriter {
    pub fn new(api_key: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: "gpt-4".into(),
        }
    }

    fn prompt(input: &BioInput) -> String {
        format!(
            "Create a professional profile for {} with the following information:\n\
             Skills: {}\n\
             Experience: {}\n\
             Education: {}\n\
             Interests: {}\n\n\
             Please write a compelling professional profile that highlights \
             their strengths and experience.",
            input.name,
            input.skills.join(", "),
            input.experience,
            input.education,
            input.interests.join(", "),
        )
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletion {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[async_trait]
impl BioWriter for OpenAiBioWriter {
    async fn write_bio(&self, input: &BioInput) -> anyhow::Result<String> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": Self::prompt(input) }],
            "temperature": 0.7,
            "max_tokens": 500,
        });

        let response = self
            .client
            .post("https://api.openai.com/v1/chat/completions")
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        let completion: ChatCompletion = response.json().await?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("completion contained no content"))
    }
}

/// Placeholder writer used when no API key is configured. The output is
/// clearly marked so it cannot be mistaken for generated prose.
pub struct TemplateBioWriter;

#[async_trait]
impl BioWriter for TemplateBioWriter {
    async fn write_bio(&self, input: &BioInput) -> anyhow::Result<String> {
        let skills = if input.skills.is_empty() {
            "their field".to_string()
        } else {
            input.skills.join(", ")
        };
        Ok(format!(
            "[Generated placeholder] {} is a professional with experience in {}.",
            input.name, skills
        ))
    }
}
