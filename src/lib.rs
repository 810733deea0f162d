pub mod error;
pub mod config;
pub mod providers;
pub mod request;
pub mod normalize;
pub mod prompt;
pub mod sanitize;
pub mod failover;
pub mod fallback;
pub mod client;
pub mod server;

use serde::{Deserialize, Serialize};

pub use client::SqlRelay;
pub use config::RelayConfig;
pub use error::Error;
pub use providers::TextProvider;
pub use request::{GenerationRequest, GenerationResult};

/*

sqlrelay turns a natural-language report request into a SQL
statement by asking a hosted LLM, trying several models in turn.

  POST /generar-sql  { "prompt": "..." }
    -> normalize::normalize       strip prefix, pick output format
    -> prompt::build_prompt       schema text + user query
    -> failover::dispatch         one model at a time until success
    -> sanitize::sanitize         drop ``` fences
    <- { "sql": "...", "formato": "json", "columnas": [] }

When every model fails the caller still gets a 200, carrying the
canned query from fallback::fallback_sql.

*/

/// Output format the caller wants the report rendered in.
/// Serialized in lowercase, e.g. `"pdf"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat
{   #[default]
    Json
  , Pdf
  , Excel
}

impl OutputFormat
{   pub fn as_str(&self) -> &'static str
    {   match self
        {   OutputFormat::Json => "json"
          , OutputFormat::Pdf => "pdf"
          , OutputFormat::Excel => "excel"
        }
    }
}

impl std::fmt::Display for OutputFormat
{   fn fmt(&self, f: &mut std::fmt::Formatter<'_>)
      -> std::fmt::Result
    {   f.write_str(self.as_str())
    }
}
