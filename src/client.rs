use std::sync::Arc;
use log::{debug, info, warn};

/// The relay: normalize, dispatch across models, sanitize.
///
/// Holds no per-request state, so one instance is shared by every
/// HTTP handler; each call builds its own failover sequence.
#[derive(Clone)]
pub struct SqlRelay
{   provider: Arc<dyn crate::providers::TextProvider>
  , candidates: Arc<Vec<String>>
  , policy: crate::failover::RetryPolicy
  , mask_failures: bool
}

impl SqlRelay
{   pub fn new(
      provider: Arc<dyn crate::providers::TextProvider>
    , config: &crate::config::FailoverConfig
    ) -> Self
    {   debug!(
          "Creating SqlRelay with candidates {:?}",
          config.candidates
        );
        SqlRelay
        {   provider
          , candidates: Arc::new(config.candidates.clone())
          , policy: crate::failover::RetryPolicy::from_config(config)
          , mask_failures: config.mask_failures
        }
    }

    pub fn masks_failures(&self) -> bool
    {   self.mask_failures
    }

    /// Generate SQL for a request, masking provider failures
    /// with the fallback query.
    pub async fn generate(
      &self
    , request: &crate::request::GenerationRequest
    ) -> crate::request::GenerationResult
    {   let debug = self.generate_debug(request).await;
        crate::request::GenerationResult::from(&debug)
    }

    /// Generate SQL, surfacing exhaustion as an error instead of
    /// answering with the fallback query.
    pub async fn try_generate(
      &self
    , request: &crate::request::GenerationRequest
    ) -> Result<crate::request::GenerationResult, crate::error::Error>
    {   let normalized = crate::normalize::normalize(&request.prompt);
        let prompt = crate::prompt::build_prompt(&normalized.query);
        let completion = self.complete(&prompt).await?;
        Ok(crate::request::GenerationResult::new(
          completion.text,
          normalized.format
        ))
    }

    /// Like `generate`, also returning the assembled prompt and
    /// which model answered
    pub async fn generate_debug(
      &self
    , request: &crate::request::GenerationRequest
    ) -> crate::request::DebugResult
    {   let normalized = crate::normalize::normalize(&request.prompt);
        info!(
          "Generating SQL for {:?} (format {})",
          normalized.query, normalized.format
        );
        let prompt = crate::prompt::build_prompt(&normalized.query);

        match self.complete(&prompt).await
        {   Ok(completion) => crate::request::DebugResult
            {   prompt
              , consulta: normalized.query
              , sql: completion.text
              , formato: normalized.format
              , modelo: Some(completion.model)
              , fallback: false
            }
          , Err(e) => {
              warn!("Answering with fallback query: {}", e);
              let fallback
                = crate::fallback::fallback_result(&normalized.query);
              crate::request::DebugResult
              {   prompt
                , consulta: normalized.query
                , sql: fallback.sql
                , formato: fallback.formato
                , modelo: None
                , fallback: true
              }
            }
        }
    }

    /// Models the provider reports as available
    pub async fn list_models(&self)
      -> Result<Vec<String>, crate::error::Error>
    {   debug!("Listing models from {}", self.provider.name());
        self.provider.list_models().await
    }

    async fn complete(
      &self
    , prompt: &str
    ) -> Result<crate::failover::Completion, crate::error::Error>
    {   let mut sequence = crate::failover::FailoverSequence::new(
          self.candidates.as_ref().clone()
        );
        crate::failover::dispatch(
          self.provider.as_ref(),
          &mut sequence,
          &self.policy,
          prompt
        ).await
    }
}
