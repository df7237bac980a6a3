use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::LlmError;

pub const INPUT_PLACEHOLDER: &str = "{input}";

/// Stored prompt template bound to a model name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LlmModule {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub prompt_template: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

impl LlmModule {
    /// Substitutes the first `{input}` placeholder. Later placeholders are
    /// left as-is.
    pub fn render_prompt(&self, user_input: &str) -> String {
        self.prompt_template.replacen(INPUT_PLACEHOLDER, user_input, 1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLlmModule {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub prompt_template: String,
    pub model: String,
}

impl NewLlmModule {
    pub fn validate(&self) -> Result<(), LlmError> {
        let missing = [
            ("name", &self.name),
            ("prompt_template", &self.prompt_template),
            ("model", &self.model),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
        .collect::<Vec<_>>();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(LlmError::validation(format!(
                "missing required fields: {}",
                missing.join(", ")
            )))
        }
    }

    pub fn into_module(self, id: String, created_at: DateTime<Utc>) -> LlmModule {
        LlmModule {
            id,
            name: self.name,
            description: self
                .description
                .filter(|description| !description.trim().is_empty()),
            prompt_template: self.prompt_template,
            model: self.model,
            created_at,
        }
    }
}
