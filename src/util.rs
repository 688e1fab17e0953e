//! Small utility helpers used across modules.

/// Very small and safe string templating.
/// Replaces occurrences of `{key}` in the template with provided values.
pub fn fill_template(tpl: &str, pairs: &[(&str, &str)]) -> String {
  let mut out = tpl.to_string();
  for (k, v) in pairs {
    let needle = format!("{{{}}}", k);
    out = out.replace(&needle, v);
  }
  out
}

/// Log-safe truncation for large strings, cut on a char boundary.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let mut end = max;
  while !s.is_char_boundary(end) {
    end -= 1;
  }
  format!("{}… ({} bytes total)", &s[..end], s.len())
}

/// Models like to wrap JSON in ```json fences even when told not to.
/// Returns the inner text when fenced, the trimmed input otherwise.
pub fn strip_code_fences(text: &str) -> &str {
  let t = text.trim();
  let Some(rest) = t.strip_prefix("```") else { return t };
  // Drop the optional language tag on the opening line.
  let rest = match rest.find('\n') {
    Some(nl) => &rest[nl + 1..],
    None => rest,
  };
  rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
