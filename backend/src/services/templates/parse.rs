//! Body-template syntax.
//!
//! A body template is plain text containing `{variable}` placeholders and
//! `{#block}...{/block}` repeat regions whose members are dotted names
//! (`{block.member}`). Detection runs exactly once, at upload time, and the
//! resulting variable list and typed repeat blocks are stored on the
//! template row; generation never re-derives them.

use crate::error::ServiceError;
use common::model::template::RepeatBlock;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Matches every placeholder token: `{var}`, `{block.member}`, `{#block}`,
/// `{/block}`.
fn token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\{([#/]?[A-Za-z][A-Za-z0-9_]*(?:\.[A-Za-z][A-Za-z0-9_]*)?)\}")
            .expect("placeholder regex")
    })
}

/// Everything detection derives from a template body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBody {
    /// Scalar variable names in first-occurrence order, deduplicated.
    pub variables: Vec<String>,
    pub repeat_blocks: Vec<RepeatBlock>,
}

/// Scans a template body, validating block structure as it goes. Errors here
/// are upload-time configuration errors; a template that passes never fails
/// structurally at generation time.
pub fn parse_body(text: &str) -> Result<ParsedBody, ServiceError> {
    let mut variables: Vec<String> = Vec::new();
    let mut blocks: Vec<RepeatBlock> = Vec::new();
    let mut open: Option<String> = None;

    for caps in token_re().captures_iter(text) {
        let token = &caps[1];
        if let Some(name) = token.strip_prefix('#') {
            if name.contains('.') {
                return Err(ServiceError::Configuration(format!(
                    "repeat block name '{}' must not be dotted",
                    name
                )));
            }
            if let Some(outer) = &open {
                return Err(ServiceError::Configuration(format!(
                    "repeat block '{}' opened inside '{}': blocks cannot nest",
                    name, outer
                )));
            }
            if blocks.iter().any(|b| b.name == name) {
                return Err(ServiceError::Configuration(format!(
                    "repeat block '{}' appears more than once",
                    name
                )));
            }
            blocks.push(RepeatBlock {
                name: name.to_string(),
                members: Vec::new(),
            });
            open = Some(name.to_string());
        } else if let Some(name) = token.strip_prefix('/') {
            match open.take() {
                Some(current) if current == name => {}
                Some(current) => {
                    return Err(ServiceError::Configuration(format!(
                        "repeat block '{}' closed by '{{/{}}}'",
                        current, name
                    )));
                }
                None => {
                    return Err(ServiceError::Configuration(format!(
                        "'{{/{}}}' closes a block that was never opened",
                        name
                    )));
                }
            }
        } else if let Some((prefix, member)) = token.split_once('.') {
            match &open {
                Some(current) if current == prefix => {
                    if let Some(block) = blocks.last_mut() {
                        if !block.members.iter().any(|m| m == member) {
                            block.members.push(member.to_string());
                        }
                    }
                }
                Some(current) => {
                    return Err(ServiceError::Configuration(format!(
                        "'{{{}}}' used inside block '{}'",
                        token, current
                    )));
                }
                None => {
                    return Err(ServiceError::Configuration(format!(
                        "'{{{}}}' used outside a '{{#{}}}' block",
                        token, prefix
                    )));
                }
            }
        } else {
            // Scalar placeholders are legal inside a block too; they repeat
            // with the same value each row.
            if !variables.iter().any(|v| v == token) {
                variables.push(token.to_string());
            }
        }
    }

    if let Some(name) = open {
        return Err(ServiceError::Configuration(format!(
            "repeat block '{}' is never closed",
            name
        )));
    }
    Ok(ParsedBody {
        variables,
        repeat_blocks: blocks,
    })
}

/// One repetition source: the rows a block expands against.
pub type RepeatRows = Vec<BTreeMap<String, String>>;

/// Fills a parsed body: expands each repeat region once per row of its data,
/// then substitutes every scalar placeholder. Unknown values fill as empty
/// strings; the resolver has already decided which blanks are intentional.
pub fn fill_body(
    text: &str,
    values: &BTreeMap<String, String>,
    block_rows: &BTreeMap<String, RepeatRows>,
) -> Result<String, ServiceError> {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut search_from = 0;

    while let Some(found) = rest[search_from..].find("{#") {
        let start = search_from + found;
        let Some(open_end) = rest[start..].find('}') else {
            break;
        };
        let name = &rest[start + 2..start + open_end];
        // Detection only recognizes token-shaped names; anything else is
        // literal text here too.
        if !is_block_name(name) {
            search_from = start + 2;
            continue;
        }
        let close_tag = format!("{{/{}}}", name);
        let body_start = start + open_end + 1;
        let Some(body_len) = rest[body_start..].find(&close_tag) else {
            return Err(ServiceError::Generation(format!(
                "repeat block '{}' is never closed",
                name
            )));
        };
        out.push_str(&substitute(&rest[..start], |token| {
            values.get(token).cloned().unwrap_or_default()
        }));

        let rows = block_rows.get(name).ok_or_else(|| {
            ServiceError::Generation(format!(
                "no repeat data available for block '{}'",
                name
            ))
        })?;
        let body = strip_block_edges(&rest[body_start..body_start + body_len]);
        let prefix = format!("{}.", name);
        for row in rows {
            out.push_str(&substitute(body, |token| {
                if let Some(member) = token.strip_prefix(&prefix) {
                    row.get(member).cloned().unwrap_or_default()
                } else {
                    values.get(token).cloned().unwrap_or_default()
                }
            }));
        }
        rest = strip_leading_newline(&rest[body_start + body_len + close_tag.len()..]);
        search_from = 0;
    }

    out.push_str(&substitute(rest, |token| {
        values.get(token).cloned().unwrap_or_default()
    }));
    Ok(out)
}

/// The block-name shape the placeholder regex accepts.
fn is_block_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Replaces every placeholder token via `lookup`. Block markers never reach
/// this point in well-formed input.
fn substitute(text: &str, lookup: impl Fn(&str) -> String) -> String {
    token_re()
        .replace_all(text, |caps: &regex::Captures| lookup(&caps[1]))
        .into_owned()
}

/// A block opener or closer on its own line should not leave an empty line
/// behind in the output.
fn strip_block_edges(body: &str) -> &str {
    strip_leading_newline(body)
}

fn strip_leading_newline(text: &str) -> &str {
    text.strip_prefix("\r\n")
        .or_else(|| text.strip_prefix('\n'))
        .unwrap_or(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(items: &[&[(&str, &str)]]) -> RepeatRows {
        items
            .iter()
            .map(|row| {
                row.iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            })
            .collect()
    }

    #[test]
    fn scan_keeps_first_occurrence_order() {
        let parsed =
            parse_body("Dear {client_name}, case {case_number}. Sincerely, {client_name}")
                .unwrap();
        assert_eq!(parsed.variables, vec!["client_name", "case_number"]);
        assert!(parsed.repeat_blocks.is_empty());
    }

    #[test]
    fn blocks_collect_their_members() {
        let text = "Assets:\n{#assets}\n- {assets.name}: {assets.value}\n{/assets}\nJudge: {judge}";
        let parsed = parse_body(text).unwrap();
        assert_eq!(parsed.variables, vec!["judge"]);
        assert_eq!(
            parsed.repeat_blocks,
            vec![RepeatBlock {
                name: "assets".into(),
                members: vec!["name".into(), "value".into()],
            }]
        );
    }

    #[test]
    fn dotted_name_outside_a_block_is_rejected() {
        let err = parse_body("{assets.name}").unwrap_err();
        assert!(matches!(err, ServiceError::Configuration(_)));
    }

    #[test]
    fn unclosed_block_is_rejected() {
        assert!(parse_body("{#assets}{assets.name}").is_err());
        assert!(parse_body("{/assets}").is_err());
        assert!(parse_body("{#a}{#b}{/b}{/a}").is_err());
    }

    #[test]
    fn dotted_block_name_is_rejected() {
        assert!(parse_body("{#a.b}{/a.b}").is_err());
    }

    #[test]
    fn fill_substitutes_scalars_and_blanks_unknowns() {
        let mut values = BTreeMap::new();
        values.insert("judge".to_string(), "Hon. Smith".to_string());
        let filled = fill_body("Before {judge}, re {unknown}.", &values, &BTreeMap::new()).unwrap();
        assert_eq!(filled, "Before Hon. Smith, re .");
    }

    #[test]
    fn repeat_block_expands_once_per_row_in_order() {
        let text = "Assets:\n{#assets}\n- {assets.name}: {assets.value}\n{/assets}\nEnd.";
        let mut block_rows = BTreeMap::new();
        block_rows.insert(
            "assets".to_string(),
            rows(&[
                &[("name", "House"), ("value", "$350,000")],
                &[("name", "Car"), ("value", "$12,000")],
                &[("name", "Checking"), ("value", "$4,100")],
            ]),
        );
        let filled = fill_body(text, &BTreeMap::new(), &block_rows).unwrap();
        assert_eq!(
            filled,
            "Assets:\n- House: $350,000\n- Car: $12,000\n- Checking: $4,100\nEnd."
        );
        assert_eq!(filled.matches("- ").count(), 3);
    }

    #[test]
    fn scalar_before_a_block_is_substituted() {
        let text = "Estate of {client_name}\n{#assets}\n{assets.name}\n{/assets}";
        let mut values = BTreeMap::new();
        values.insert("client_name".to_string(), "Jane Doe".to_string());
        let mut block_rows = BTreeMap::new();
        block_rows.insert("assets".to_string(), rows(&[&[("name", "House")]]));
        let filled = fill_body(text, &values, &block_rows).unwrap();
        assert_eq!(filled, "Estate of Jane Doe\nHouse\n");
    }

    #[test]
    fn scalar_inside_a_block_repeats_with_the_row() {
        let text = "{#heirs}\n{heirs.name} of {county}\n{/heirs}";
        let mut values = BTreeMap::new();
        values.insert("county".to_string(), "Cook".to_string());
        let mut block_rows = BTreeMap::new();
        block_rows.insert(
            "heirs".to_string(),
            rows(&[&[("name", "Ann")], &[("name", "Ben")]]),
        );
        let filled = fill_body(text, &values, &block_rows).unwrap();
        assert_eq!(filled, "Ann of Cook\nBen of Cook\n");
    }

    #[test]
    fn missing_repeat_data_is_a_generation_failure() {
        let err = fill_body("{#assets}{assets.name}{/assets}", &BTreeMap::new(), &BTreeMap::new())
            .unwrap_err();
        assert!(matches!(err, ServiceError::Generation(_)));
    }

    #[test]
    fn non_token_braces_stay_literal_at_fill_time() {
        // Detection skips `{#2}` (not a token), so filling must treat it as
        // literal text instead of hunting for a `{/2}` close tag.
        let parsed = parse_body("see item {#2} of {exhibit}").unwrap();
        assert_eq!(parsed.variables, vec!["exhibit"]);
        assert!(parsed.repeat_blocks.is_empty());

        let mut values = BTreeMap::new();
        values.insert("exhibit".to_string(), "Exhibit A".to_string());
        let filled = fill_body("see item {#2} of {exhibit}", &values, &BTreeMap::new()).unwrap();
        assert_eq!(filled, "see item {#2} of Exhibit A");
    }

    #[test]
    fn literal_braces_before_a_real_block_do_not_derail_it() {
        let text = "{#2} intro\n{#heirs}{heirs.name}\n{/heirs}";
        let mut block_rows = BTreeMap::new();
        block_rows.insert("heirs".to_string(), rows(&[&[("name", "Ann")]]));
        let filled = fill_body(text, &BTreeMap::new(), &block_rows).unwrap();
        assert_eq!(filled, "{#2} intro\nAnn\n");
    }

    #[test]
    fn zero_rows_expand_to_nothing() {
        let mut block_rows = BTreeMap::new();
        block_rows.insert("assets".to_string(), RepeatRows::new());
        let filled =
            fill_body("A{#assets}{assets.name}{/assets}B", &BTreeMap::new(), &block_rows).unwrap();
        assert_eq!(filled, "AB");
    }
}
