//! Cleans the inbound prompt and guesses the wanted output format

use log::trace;

/// Literal the calling backend puts in front of every prompt
pub const PROMPT_PREFIX: &str = "generar JSON:";

/// Normalized user request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedQuery
{   pub query: String
  , pub format: crate::OutputFormat
}

/// Strip the known prefix, trim, and classify the format.
/// Never fails, an empty prompt gives an empty `json` query.
pub fn normalize(raw: &str) -> NormalizedQuery
{   let query = strip_prefix(raw.trim()).trim().to_string();
    let format = detect_format(&query);
    trace!("Normalized {:?} -> {:?} ({})", raw, query, format);
    NormalizedQuery
    {   query
      , format
    }
}

fn strip_prefix(text: &str) -> &str
{   match text.get(..PROMPT_PREFIX.len())
    {   Some(head) if head.eq_ignore_ascii_case(PROMPT_PREFIX) => {
          &text[PROMPT_PREFIX.len()..]
        }
      , _ => text
    }
}

/// `pdf` wins over `excel`, anything else is `json`
pub fn detect_format(query: &str) -> crate::OutputFormat
{   let lower = query.to_lowercase();
    if lower.contains("pdf")
    {   crate::OutputFormat::Pdf
    } else if lower.contains("excel")
    {   crate::OutputFormat::Excel
    } else
    {   crate::OutputFormat::Json
    }
}
