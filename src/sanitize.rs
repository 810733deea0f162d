//! Removes Markdown code fences from model output

/// Markdown fence marker
pub const FENCE: &str = "```";

/// Strip a leading fence (with optional language tag), a trailing
/// fence and surrounding whitespace. Repeats until nothing changes,
/// so `sanitize(sanitize(x)) == sanitize(x)`.
pub fn sanitize(raw: &str) -> String
{   let mut current = raw.trim();
    loop
    {   let next = strip_fences(current);
        if next.len() == current.len()
        {   return next.to_string();
        }
        current = next;
    }
}

fn strip_fences(text: &str) -> &str
{   let mut inner = text;
    if let Some(rest) = inner.strip_prefix(FENCE)
    {   inner = skip_language_tag(rest);
    }
    if let Some(rest) = inner.strip_suffix(FENCE)
    {   inner = rest;
    }
    inner.trim()
}

/// A tag counts when the rest of its line is blank or the text ends
/// there, so "```SELECT 1```" keeps its SELECT. `sql` also counts
/// when followed by a space, as in "```sql SELECT 1```".
fn skip_language_tag(text: &str) -> &str
{   let tag_len = text
      .find(|c: char| {
        !(c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '-'))
      })
      .unwrap_or(text.len());
    if tag_len == 0
    {   return text;
    }
    let (tag, rest) = text.split_at(tag_len);
    let line_ends = rest
      .trim_start_matches([' ', '\t'])
      .starts_with(['\n', '\r']);
    let sql_then_space = tag.eq_ignore_ascii_case("sql")
      && rest.starts_with(char::is_whitespace);
    if rest.is_empty() || line_ends || sql_then_space
    {   rest
    } else
    {   text
    }
}
