// Re-scoping of legacy page styles.
//
// Legacy pages style their content blocks through page-level `<style>`
// sheets. When a block is lifted into a fragment, the rules that target its
// classes come along, each selector prefixed with a wrapper class so the
// rules only apply inside the migrated block.

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::LazyLock;

static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid regex"));
static CLASS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\.(-?[_a-zA-Z][_a-zA-Z0-9-]*)").expect("valid regex"));

/// One top-level item of a stylesheet.
#[derive(Debug, Clone, PartialEq)]
pub enum Rule {
    /// `selectors { declarations }`
    Style { selectors: String, body: String },
    /// A conditional group (`@media`, `@supports`) holding nested rules.
    Group { prelude: String, rules: Vec<Rule> },
    /// Any other at-rule (`@import`, `@font-face`, `@keyframes`).
    Other(String),
}

/// At-rules whose bodies are themselves lists of rules.
const GROUP_AT_RULES: &[&str] = &["@media", "@supports", "@document", "@layer", "@container"];

/// Split a stylesheet into rules. Comments are dropped; malformed trailing
/// input without a closing brace is ignored.
pub fn parse_stylesheet(css: &str) -> Vec<Rule> {
    let css = COMMENT.replace_all(css, "");
    parse_rules(&css)
}

fn parse_rules(css: &str) -> Vec<Rule> {
    let mut rules = Vec::new();
    let mut rest = css;

    while let Some(start) = rest.find(|c: char| !c.is_whitespace()) {
        rest = &rest[start..];

        let Some(open) = find_outside_strings(rest, &['{', ';']) else {
            break;
        };

        if rest.as_bytes()[open] == b';' {
            rules.push(Rule::Other(rest[..=open].trim().to_string()));
            rest = &rest[open + 1..];
            continue;
        }

        let prelude = rest[..open].trim().to_string();
        let Some(close) = matching_brace(rest, open) else {
            break;
        };
        let body = &rest[open + 1..close];

        if prelude.starts_with('@') {
            let keyword = prelude
                .split(|c: char| c.is_whitespace() || c == '(')
                .next()
                .unwrap_or_default()
                .to_lowercase();
            if GROUP_AT_RULES.contains(&keyword.as_str()) {
                rules.push(Rule::Group {
                    prelude,
                    rules: parse_rules(body),
                });
            } else {
                rules.push(Rule::Other(rest[..=close].trim().to_string()));
            }
        } else {
            rules.push(Rule::Style {
                selectors: prelude,
                body: body.trim().to_string(),
            });
        }

        rest = &rest[close + 1..];
    }

    rules
}

/// Byte index of the first of `targets` outside quoted strings.
fn find_outside_strings(s: &str, targets: &[char]) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (idx, c) in s.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, c) if targets.contains(&c) => return Some(idx),
            (None, _) => {}
        }
    }
    None
}

/// Byte index of the `}` closing the `{` at `open`.
fn matching_brace(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut offset = open;
    loop {
        let idx = offset + find_outside_strings(&s[offset..], &['{', '}'])?;
        if s.as_bytes()[idx] == b'{' {
            depth += 1;
        } else {
            depth -= 1;
            if depth == 0 {
                return Some(idx);
            }
        }
        offset = idx + 1;
    }
}

/// Split a selector list on top-level commas.
pub fn split_selectors(selectors: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut current = String::new();
    for c in selectors.chars() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth -= 1,
            ',' if depth == 0 => {
                parts.push(current.trim().to_string());
                current.clear();
                continue;
            }
            _ => {}
        }
        current.push(c);
    }
    parts.push(current.trim().to_string());
    parts.retain(|p| !p.is_empty());
    parts
}

/// Class names referenced by a selector (`div.lead > .note` → lead, note).
pub fn selector_classes(selector: &str) -> BTreeSet<String> {
    CLASS
        .captures_iter(selector)
        .map(|c| c[1].to_string())
        .collect()
}

/// Keep the rules that reference any of `classes` and prefix every selector
/// of a kept rule with `.<scope> `. Group rules keep their condition and are
/// dropped when nothing inside survives; other at-rules are dropped.
pub fn rescope(css: &str, classes: &BTreeSet<String>, scope: &str) -> String {
    let rules = parse_stylesheet(css);
    render(&rescope_rules(&rules, classes, scope), 0)
}

fn rescope_rules(rules: &[Rule], classes: &BTreeSet<String>, scope: &str) -> Vec<Rule> {
    let mut kept = Vec::new();
    for rule in rules {
        match rule {
            Rule::Style { selectors, body } => {
                let list = split_selectors(selectors);
                let used = list
                    .iter()
                    .any(|s| !selector_classes(s).is_disjoint(classes));
                if used {
                    let scoped: Vec<String> = list.iter().map(|s| format!(".{scope} {s}")).collect();
                    kept.push(Rule::Style {
                        selectors: scoped.join(", "),
                        body: body.clone(),
                    });
                }
            }
            Rule::Group { prelude, rules } => {
                let nested = rescope_rules(rules, classes, scope);
                if !nested.is_empty() {
                    kept.push(Rule::Group {
                        prelude: prelude.clone(),
                        rules: nested,
                    });
                }
            }
            Rule::Other(_) => {}
        }
    }
    kept
}

fn render(rules: &[Rule], indent: usize) -> String {
    let pad = "  ".repeat(indent);
    let mut out = Vec::new();
    for rule in rules {
        match rule {
            Rule::Style { selectors, body } => {
                out.push(format!("{pad}{selectors} {{ {body} }}"));
            }
            Rule::Group { prelude, rules } => {
                out.push(format!("{pad}{prelude} {{\n{}\n{pad}}}", render(rules, indent + 1)));
            }
            Rule::Other(text) => out.push(format!("{pad}{text}")),
        }
    }
    out.join("\n")
}
