//! Path traversal over JSON values.
//!
//! Accepts mixed dot and bracket notation: `a.b["c"][0].d`.

use serde_json::Value;

use crate::error::ExpressionError;

/// One step of a parsed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
  Key(String),
  Index(usize),
}

/// Parse a path like `a.b["c"][0].d` into segments. A leading dot is
/// tolerated so callers can pass the tail of `$json.a.b` directly.
pub fn parse_path(path: &str) -> Result<Vec<PathSegment>, ExpressionError> {
  let mut segments = Vec::new();
  let bytes = path.as_bytes();
  let mut i = 0;

  while i < bytes.len() {
    match bytes[i] {
      b'.' => i += 1,
      b'[' => {
        let close = path[i..].find(']').map(|off| i + off).ok_or_else(|| {
          ExpressionError::InvalidPath {
            path: path.to_string(),
            message: "unclosed bracket".to_string(),
          }
        })?;
        let inner = path[i + 1..close].trim();
        if let Some(stripped) = strip_quotes(inner) {
          segments.push(PathSegment::Key(stripped.to_string()));
        } else {
          let index = inner.parse::<usize>().map_err(|_| ExpressionError::InvalidPath {
            path: path.to_string(),
            message: format!("bracket segment '{inner}' is neither a quoted key nor an index"),
          })?;
          segments.push(PathSegment::Index(index));
        }
        i = close + 1;
      }
      _ => {
        let start = i;
        while i < bytes.len() && bytes[i] != b'.' && bytes[i] != b'[' {
          i += 1;
        }
        let key = path[start..i].trim();
        if !key.is_empty() {
          segments.push(PathSegment::Key(key.to_string()));
        }
      }
    }
  }

  Ok(segments)
}

fn strip_quotes(s: &str) -> Option<&str> {
  let stripped = s
    .strip_prefix('"')
    .and_then(|rest| rest.strip_suffix('"'))
    .or_else(|| s.strip_prefix('\'').and_then(|rest| rest.strip_suffix('\'')));
  stripped
}

/// Walk `value` along `segments`. Returns `None` when any step is absent
/// or the value shape does not match the segment kind.
pub fn traverse<'v>(value: &'v Value, segments: &[PathSegment]) -> Option<&'v Value> {
  let mut current = value;
  for segment in segments {
    current = match segment {
      PathSegment::Key(key) => current.get(key.as_str())?,
      PathSegment::Index(index) => current.get(index)?,
    };
  }
  Some(current)
}
