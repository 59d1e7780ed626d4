use super::draft::ModelDraft;
use crate::error::{EntityKind, StructuralValidationError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiType {
    OpenAi,
    Azure,
    DeepSeek,
    Google,
    Anthropic,
    Mistral,
    Groq,
    Together,
    Nim,
    Cohere,
    Bedrock,
    Other,
}

impl ApiType {
    pub fn parse(value: &str) -> Option<Self> {
        let api_type = match value {
            "openai" => ApiType::OpenAi,
            "azure" => ApiType::Azure,
            "deepseek" => ApiType::DeepSeek,
            "google" => ApiType::Google,
            "anthropic" => ApiType::Anthropic,
            "mistral" => ApiType::Mistral,
            "groq" => ApiType::Groq,
            "together" => ApiType::Together,
            "nim" => ApiType::Nim,
            "cohere" => ApiType::Cohere,
            "bedrock" => ApiType::Bedrock,
            "other" => ApiType::Other,
            _ => return None,
        };
        Some(api_type)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ApiType::OpenAi => "openai",
            ApiType::Azure => "azure",
            ApiType::DeepSeek => "deepseek",
            ApiType::Google => "google",
            ApiType::Anthropic => "anthropic",
            ApiType::Mistral => "mistral",
            ApiType::Groq => "groq",
            ApiType::Together => "together",
            ApiType::Nim => "nim",
            ApiType::Cohere => "cohere",
            ApiType::Bedrock => "bedrock",
            ApiType::Other => "other",
        }
    }

    /// Providers reached through the OpenAI client; the runtime gets no
    /// `api_type` for them.
    pub fn is_openai_compatible(self) -> bool {
        matches!(
            self,
            ApiType::OpenAi | ApiType::DeepSeek | ApiType::Nim | ApiType::Other
        )
    }

    pub fn default_base_url(self) -> Option<&'static str> {
        match self {
            ApiType::DeepSeek => Some("https://api.deepseek.com/v1"),
            ApiType::Nim => Some("https://integrate.api.nvidia.com/v1"),
            _ => None,
        }
    }

    /// Environment variable holding the provider's key.
    pub fn default_api_key_env(self) -> &'static str {
        match self {
            ApiType::OpenAi | ApiType::Other => "OPENAI_API_KEY",
            ApiType::Azure => "AZURE_OPENAI_API_KEY",
            ApiType::DeepSeek => "DEEPSEEK_API_KEY",
            ApiType::Google => "GOOGLE_GEMINI_API_KEY",
            ApiType::Anthropic => "ANTHROPIC_API_KEY",
            ApiType::Mistral => "MISTRAL_API_KEY",
            ApiType::Groq => "GROQ_API_KEY",
            ApiType::Together => "TOGETHER_API_KEY",
            ApiType::Nim => "NIM_API_KEY",
            ApiType::Cohere => "COHERE_API_KEY",
            ApiType::Bedrock => "AWS_ACCESS_KEY_ID",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelPrice {
    pub prompt_price_per_1k: f64,
    pub completion_token_price_per_1k: f64,
}

/// An LLM configuration agents can link to.
#[derive(Debug, Clone, PartialEq)]
pub struct LlmModel {
    pub id: String,
    pub name: String,
    pub description: String,
    pub requirements: Vec<String>,
    pub api_type: ApiType,
    pub model: String,
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub api_key_env: String,
    pub api_version: Option<String>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub max_tokens: Option<u32>,
    pub price: Option<ModelPrice>,
}

impl LlmModel {
    pub fn build(draft: ModelDraft) -> Result<Self, StructuralValidationError> {
        let data = draft.data;
        let api_type = match data.api_type.as_deref() {
            None => ApiType::Other,
            Some(value) => {
                ApiType::parse(value).ok_or_else(|| StructuralValidationError::InvalidField {
                    kind: EntityKind::Model,
                    id: draft.id.clone(),
                    field: "api_type".to_string(),
                    value: value.to_string(),
                })?
            }
        };
        let price = data.price.and_then(|p| {
            Some(ModelPrice {
                prompt_price_per_1k: p.prompt_price_per_1k?,
                completion_token_price_per_1k: p.completion_token_price_per_1k?,
            })
        });
        Ok(Self {
            model: data
                .model
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| draft.name.clone()),
            id: draft.id,
            name: draft.name,
            description: draft.description,
            requirements: draft.requirements,
            api_type,
            base_url: data
                .base_url
                .filter(|u| !u.is_empty())
                .or_else(|| api_type.default_base_url().map(str::to_string)),
            api_key: data.api_key.filter(|k| !k.is_empty()),
            api_key_env: data
                .api_key_env
                .filter(|e| !e.is_empty())
                .unwrap_or_else(|| api_type.default_api_key_env().to_string()),
            api_version: data.api_version,
            temperature: data.temperature,
            top_p: data.top_p,
            max_tokens: data.max_tokens,
            price,
        })
    }
}
