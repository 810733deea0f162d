//! Failover across candidate models and the pause between attempts

use std::time::Duration;
use log::{debug, info, warn};

/// Pause policy between candidate attempts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy
{   pub short_backoff: Duration
  , pub long_backoff: Duration
}

impl RetryPolicy
{   /// Create a new retry policy
    pub fn new(
      short_backoff_ms: u64
    , long_backoff_ms: u64
    ) -> Self
    {   RetryPolicy
        {   short_backoff: Duration::from_millis(short_backoff_ms)
          , long_backoff: Duration::from_millis(long_backoff_ms)
        }
    }

    pub fn from_config(config: &crate::config::FailoverConfig) -> Self
    {   RetryPolicy::new(
          config.short_backoff_ms
        , config.long_backoff_ms
        )
    }

    /// Pause to take after `error` before trying the next candidate.
    /// Errors that cannot clear up between attempts get no pause.
    pub fn backoff_for_error(
      &self
    , error: &crate::error::Error
    ) -> Duration
    {   if error.is_permanent()
        {   Duration::ZERO
        } else if error.is_rate_limit()
        {   self.long_backoff
        } else
        {   self.short_backoff
        }
    }
}

impl Default for RetryPolicy
{   fn default() -> Self
    {   RetryPolicy::new(1000, 5000)
    }
}

/// Ordered candidate models for one request
#[derive(Debug, Clone)]
pub struct FailoverSequence
{   pub candidates: Vec<String>
  , pub current_index: usize
}

impl FailoverSequence
{   /// Create a new failover sequence
    pub fn new(candidates: Vec<String>) -> Self
    {   debug!(
          "Creating failover sequence with {} candidates",
          candidates.len()
        );
        FailoverSequence
        {   candidates
          , current_index: 0
        }
    }

    /// Get the current candidate
    pub fn current(&self) -> Option<&str>
    {   self.candidates
          .get(self.current_index)
          .map(String::as_str)
    }

    /// Move to the next candidate
    pub fn advance(&mut self) -> Option<&str>
    {   if self.current_index < self.candidates.len()
        {   self.current_index += 1;
        }
        self.current()
    }

    /// Check if we have more candidates to try
    pub fn has_next(&self) -> bool
    {   self.current_index + 1 < self.candidates.len()
    }

    pub fn len(&self) -> usize
    {   self.candidates.len()
    }

    pub fn is_empty(&self) -> bool
    {   self.candidates.is_empty()
    }
}

/// Successful dispatch outcome
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion
{   /// Sanitized model output
    pub text: String
  , /// Candidate that produced it
    pub model: String
  , /// Provider calls made, including the successful one
    pub attempts: usize
}

/// Offer `prompt` to each candidate in order until one answers.
///
/// Each candidate is called at most once. After a failure the task
/// sleeps for the policy's pause, except after the last candidate.
/// Returns `CandidatesExhausted` when nobody answered.
pub async fn dispatch(
  provider: &dyn crate::providers::TextProvider
, sequence: &mut FailoverSequence
, policy: &RetryPolicy
, prompt: &str
) -> Result<Completion, crate::error::Error>
{   let total = sequence.len();
    let mut attempts = 0;
    let mut last_error = crate::error::Error::Other(
      "no candidate models configured".to_string()
    );

    while let Some(model) = sequence.current().map(str::to_string)
    {   attempts += 1;
        info!(
          "Attempt {}/{}: {} via {}",
          attempts, total, model, provider.name()
        );

        let outcome = provider
          .generate(&model, prompt)
          .await
          .and_then(|raw| {
            let text = crate::sanitize::sanitize(&raw);
            if text.is_empty()
            {   Err(crate::error::Error::EmptyCompletion)
            } else
            {   Ok(text)
            }
          });

        match outcome
        {   Ok(text) => {
              info!(
                "Model {} answered on attempt {}", model, attempts
              );
              return Ok(Completion
              {   text
                , model
                , attempts
              });
            }
          , Err(e) => {
              let more = sequence.has_next();
              if more
              {   let pause = policy.backoff_for_error(&e);
                  warn!(
                    "Model {} failed: {} (pausing {:?}{})",
                    model,
                    e,
                    pause,
                    if e.is_rate_limit() { ", rate limited" } else { "" }
                  );
                  if !pause.is_zero()
                  {   tokio::time::sleep(pause).await;
                  }
              } else
              {   warn!("Model {} failed: {} (no candidates left)", model, e);
              }
              last_error = e;
              sequence.advance();
            }
        }
    }

    warn!("All {} candidate models failed", attempts);
    Err(crate::error::Error::CandidatesExhausted
    {   attempts
      , last_error: last_error.to_string()
    })
}
