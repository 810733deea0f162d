use std::time::Duration;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use log::{debug, trace, error};

pub const GEMINI_API_BASE: &str
  = "https://generativelanguage.googleapis.com/v1beta";

// ===== Message Types =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Part
{   #[serde(default)]
    pub text: Option<String>
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Content
{   #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>
  , #[serde(default)]
    pub parts: Vec<Part>
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerateContentRequest
{   pub contents: Vec<Content>
}

impl GenerateContentRequest
{   pub fn from_prompt(prompt: &str) -> Self
    {   GenerateContentRequest
        {   contents: vec![
              Content
              {   role: Some("user".to_string())
                , parts: vec![
                    Part
                    {   text: Some(prompt.to_string())
                    }
                  ]
              }
            ]
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateContentResponse
{   #[serde(default)]
    pub candidates: Vec<Candidate>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate
{   pub content: Option<Content>
  , #[serde(default)]
    pub finish_reason: Option<String>
}

impl GenerateContentResponse
{   /// Text of the first candidate, parts joined
    pub fn text(&self) -> Option<String>
    {   let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts
          .iter()
          .filter_map(|p| p.text.as_deref())
          .collect();
        if text.trim().is_empty()
        {   None
        } else
        {   Some(text)
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeminiModelsResponse
{   #[serde(default)]
    pub models: Vec<ModelData>
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelData
{   pub name: String
  , #[serde(default)]
    pub supported_generation_methods: Vec<String>
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorEnvelope
{   error: ApiErrorBody
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorBody
{   #[serde(default)]
    message: String
  , #[serde(default)]
    status: Option<String>
}

// ===== Gemini Client =====

/// Gemini REST client, cheap to share: one `reqwest::Client` inside
pub struct GeminiClient
{   api_key: Option<String>
  , api_base: String
  , http_client: reqwest::Client
}

impl GeminiClient
{   pub fn new(api_key: Option<String>) -> Self
    {   debug!("Creating GeminiClient");
        GeminiClient
        {   api_key
          , api_base: GEMINI_API_BASE.to_string()
          , http_client: reqwest::Client::new()
        }
    }

    /// Build from the provider section of the relay config
    pub fn from_config(
      config: &crate::config::ProviderConfig
    ) -> Result<Self, crate::error::Error>
    {   let mut builder = reqwest::Client::builder();
        if let Some(secs) = config.timeout_secs
        {   builder = builder.timeout(Duration::from_secs(secs));
        }
        let http_client = builder.build().map_err(|e| {
          crate::error::Error::InvalidConfiguration(e.to_string())
        })?;
        let api_base = config.api_base
          .clone()
          .unwrap_or_else(|| GEMINI_API_BASE.to_string());
        debug!("Creating GeminiClient against {}", api_base);
        Ok(GeminiClient
        {   api_key: config.api_key.clone()
          , api_base: api_base.trim_end_matches('/').to_string()
          , http_client
        })
    }

    pub fn api_base(&self) -> &str
    {   &self.api_base
    }

    fn get_api_key(&self) -> Result<&str, crate::error::Error>
    {   self.api_key.as_deref().ok_or_else(|| {
          error!("No Gemini API key configured");
          crate::error::Error::MissingApiKey("Gemini".to_string())
        })
    }

    async fn handle_generate(
      &self
    , model: &str
    , prompt: &str
    ) -> Result<String, crate::error::Error>
    {   debug!("Handling generate for: {}", model);
        let api_key = self.get_api_key()?;
        let request = GenerateContentRequest::from_prompt(prompt);

        let response = self.http_client
          .post(format!(
            "{}/models/{}:generateContent",
            self.api_base,
            model
          ))
          .header("x-goog-api-key", api_key)
          .json(&request)
          .send()
          .await
          .map_err(|e| {
            error!("HTTP error: {}", e);
            crate::error::Error::from(e)
          })?;

        let status = response.status();
        trace!("Gemini response status: {}", status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            return Err(api_error(status.as_u16(), &error_text));
        }

        let body: GenerateContentResponse
          = response.json().await.map_err(|e| {
            error!("Parse error: {}", e);
            crate::error::Error::ParseError(e.to_string())
          })?;

        if let Some(reason) = body.candidates
          .first()
          .and_then(|c| c.finish_reason.as_deref())
        {   trace!("Gemini finish reason: {}", reason);
        }

        body.text().ok_or_else(|| {
          error!("No text in Gemini response");
          crate::error::Error::EmptyCompletion
        })
    }

    async fn handle_list_models(
      &self
    ) -> Result<Vec<String>, crate::error::Error>
    {   debug!("Handling list_models");
        let api_key = self.get_api_key()?;

        let response = self.http_client
          .get(format!("{}/models", self.api_base))
          .header("x-goog-api-key", api_key)
          .send()
          .await
          .map_err(|e| {
            error!("Failed to fetch models: {}", e);
            crate::error::Error::from(e)
          })?;

        let status = response.status();
        trace!("Models response status: {}", status);

        if !status.is_success()
        {   let error_text = response.text().await
              .unwrap_or_else(|_|
                "Unknown error".to_string()
              );
            return Err(api_error(status.as_u16(), &error_text));
        }

        let models_response: GeminiModelsResponse
          = response.json().await.map_err(|e| {
            error!("Parse error: {}", e);
            crate::error::Error::ParseError(e.to_string())
          })?;

        let model_names: Vec<String>
          = models_response.models
            .iter()
            .filter(|m| {
              m.supported_generation_methods.is_empty()
                || m.supported_generation_methods
                    .iter()
                    .any(|g| g == "generateContent")
            })
            .map(|m| {
              m.name
                .strip_prefix("models/")
                .unwrap_or(&m.name)
                .to_string()
            })
            .collect();

        debug!("Retrieved {} models", model_names.len());
        Ok(model_names)
    }
}

/// Turn a non-success answer into an error, 429 and
/// RESOURCE_EXHAUSTED become `RateLimitExceeded`
fn api_error(status: u16, body: &str) -> crate::error::Error
{   let (message, api_status) = match serde_json::from_str::<ApiErrorEnvelope>(body)
    {   Ok(envelope) => (envelope.error.message, envelope.error.status)
      , Err(_) => (body.to_string(), None)
    };
    error!("Gemini API error ({}): {}", status, message);
    if status == 429
      || api_status.as_deref() == Some("RESOURCE_EXHAUSTED")
    {   crate::error::Error::RateLimitExceeded(message)
    } else
    {   crate::error::Error::ApiError
        {   status
          , message
        }
    }
}

#[async_trait]
impl super::TextProvider for GeminiClient
{   async fn generate(
      &self
    , model: &str
    , prompt: &str
    ) -> Result<String, crate::error::Error>
    {   self.handle_generate(model, prompt).await
    }

    async fn list_models(&self)
      -> Result<Vec<String>, crate::error::Error>
    {   self.handle_list_models().await
    }

    fn name(&self) -> &str
    {   "gemini"
    }
}
