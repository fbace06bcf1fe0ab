//! Output file naming. A mapping profile may carry a filename pattern with
//! the tokens `{client}`, `{template}`, `{yyyy}`, `{mm}` and `{dd}`; without
//! one the name falls back to a deterministic template_client_timestamp
//! form. Everything staff-controlled is sanitized before it touches a path.

use chrono::{DateTime, Datelike, Utc};

/// Renders a filename or folder pattern. Unknown tokens stay as typed so the
/// operator sees the mistake in the output name instead of silently losing
/// it.
pub fn render_pattern(
    pattern: &str,
    client_name: &str,
    template_name: &str,
    now: DateTime<Utc>,
) -> String {
    pattern
        .replace("{client}", &sanitize(client_name))
        .replace("{template}", &sanitize(template_name))
        .replace("{yyyy}", &format!("{:04}", now.year()))
        .replace("{mm}", &format!("{:02}", now.month()))
        .replace("{dd}", &format!("{:02}", now.day()))
}

pub fn default_name(template_name: &str, client_name: &str, now: DateTime<Utc>) -> String {
    format!(
        "{}_{}_{}",
        sanitize(template_name),
        sanitize(client_name),
        now.format("%Y%m%d%H%M%S")
    )
}

/// Keeps names filesystem-friendly: path separators and control characters
/// become underscores, whitespace collapses to single underscores.
pub fn sanitize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut last_underscore = false;
    for ch in raw.trim().chars() {
        let mapped = match ch {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c if c.is_whitespace() => '_',
            c => c,
        };
        if mapped == '_' {
            if !last_underscore {
                out.push('_');
            }
            last_underscore = true;
        } else {
            out.push(mapped);
            last_underscore = false;
        }
    }
    if out.is_empty() {
        out.push_str("document");
    }
    out
}
