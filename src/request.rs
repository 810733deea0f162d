//! Request and response bodies exchanged with the calling backend

use serde::{Deserialize, Serialize};

/// Inbound body of `POST /generar-sql` and `POST /debug-sql`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationRequest
{   /// Free text, may start with the `generar JSON:` prefix
    pub prompt: String
}

impl GenerationRequest
{   pub fn new(prompt: impl Into<String>) -> Self
    {   GenerationRequest
        {   prompt: prompt.into()
        }
    }
}

/// Body returned by `POST /generar-sql`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResult
{   /// Generated (or fallback) SQL text
    pub sql: String
  , /// Format hint detected from the request
    pub formato: crate::OutputFormat
  , /// Always empty, kept for the caller's parser
    pub columnas: Vec<String>
}

impl GenerationResult
{   pub fn new(sql: impl Into<String>, formato: crate::OutputFormat)
      -> Self
    {   GenerationResult
        {   sql: sql.into()
          , formato
          , columnas: vec![]
        }
    }
}

/// Body returned by `POST /debug-sql`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebugResult
{   /// Full prompt offered to the models
    pub prompt: String
  , /// User query after normalization
    pub consulta: String
  , pub sql: String
  , pub formato: crate::OutputFormat
  , /// Model that answered, none when the fallback was used
    pub modelo: Option<String>
  , /// Whether `sql` is the canned fallback query
    pub fallback: bool
}

impl From<&DebugResult> for GenerationResult
{   fn from(debug: &DebugResult) -> Self
    {   GenerationResult::new(debug.sql.clone(), debug.formato)
    }
}

/// Body returned by `GET /modelos`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelsResponse
{   pub modelos: Vec<String>
}

/// Error body, used where a failure is surfaced to the caller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse
{   pub detail: String
}
