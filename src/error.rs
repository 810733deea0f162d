use std::fmt;

/// Custom error type for sqlrelay operations
/// Implements Clone so attempt outcomes can be kept and logged
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// API key is missing for the provider
    MissingApiKey(String)
  , /// HTTP transport error (connect, DNS, body read)
    HttpError(String)
  , /// Provider answered with a non-success status
    ApiError
    {   status: u16
      , message: String
    }
  , /// Failed to parse API response
    ParseError(String)
  , /// Provider answered but produced no usable text
    EmptyCompletion
  , /// Rate limit or quota exceeded
    RateLimitExceeded(String)
  , /// Every candidate model failed for one request
    CandidatesExhausted
    {   attempts: usize
      , last_error: String
    }
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// Timeout error
    Timeout
  , /// Filesystem or socket error
    Io(String)
  , /// Generic error
    Other(String)
}

impl Error
{   /// Whether this failure means the provider is throttling us.
    ///
    /// Quota errors are not always reported with a 429, so the
    /// message text is checked as well.
    pub fn is_rate_limit(&self) -> bool
    {   match self
        {   Error::RateLimitExceeded(_) => true
          , Error::ApiError { status: 429, .. } => true
          , Error::ApiError { message, .. }
          | Error::HttpError(message)
          | Error::Other(message) => mentions_quota(message)
          , _ => false
        }
    }

    /// Whether retrying with another model cannot help, such as a
    /// missing credential
    pub fn is_permanent(&self) -> bool
    {   matches!(
          self,
          Error::MissingApiKey(_) | Error::InvalidConfiguration(_)
        )
    }
}

fn mentions_quota(text: &str) -> bool
{   let lower = text.to_lowercase();
    lower.contains("429")
      || lower.contains("quota")
      || lower.contains("rate limit")
      || lower.contains("resource_exhausted")
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::MissingApiKey(provider) => {
              write!(f, "Missing API key for: {}", provider)
            }
          , Error::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::ApiError { status, message } => {
              write!(f, "API error ({}): {}", status, message)
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::EmptyCompletion => {
              write!(f, "API response contained no text")
            }
          , Error::RateLimitExceeded(msg) => {
              write!(f, "API rate limit exceeded: {}", msg)
            }
          , Error::CandidatesExhausted { attempts, last_error } => {
              write!(f,
                "All {} candidate models failed, last error: {}",
                attempts,
                last_error
              )
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::Timeout => {
              write!(f, "Request timed out")
            }
          , Error::Io(msg) => {
              write!(f, "I/O error: {}", msg)
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}

impl From<std::io::Error> for Error
{   fn from(e: std::io::Error) -> Self
    {   Error::Io(e.to_string())
    }
}

impl From<reqwest::Error> for Error
{   fn from(e: reqwest::Error) -> Self
    {   if e.is_timeout()
        {   return Error::Timeout;
        }
        match e.status()
        {   Some(status) => Error::ApiError
            {   status: status.as_u16()
              , message: e.to_string()
            }
          , None => Error::HttpError(e.to_string())
        }
    }
}
