//! Name variant generation for directory text search.
//!
//! A human-supplied full name rarely matches the directory record verbatim:
//! people go by nicknames, hyphenate differently, or carry Jr./Sr. suffixes
//! the directory stores in its own way. [`VariantGenerator`] expands one full
//! name into an ordered list of `(given, family)` query pairs, most confident
//! first. The resolver consumes the list in order and stops at the first
//! acceptable match.

use std::collections::HashMap;

use crate::text::normalize;

/// One candidate `(given, family)` search pair and the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameQuery {
    pub given: String,
    pub family: String,
    pub rule: VariantRule,
}

impl NameQuery {
    fn new(given: impl Into<String>, family: impl Into<String>, rule: VariantRule) -> Self {
        Self {
            given: given.into(),
            family: family.into(),
            rule,
        }
    }

    /// The text sent to the directory search endpoint.
    pub fn search_text(&self) -> String {
        format!("{} {}", self.given, self.family)
    }
}

/// How a [`NameQuery`] was derived from the input name. Earlier rules are
/// more confident guesses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VariantRule {
    /// First token as given name, last token as family name.
    Exact,
    /// Informal name replaced via the nickname table.
    Nickname,
    /// Hyphens removed before tokenizing.
    HyphenStripped,
    /// Jr./Sr. stripped from (or re-attached to) the family name.
    SuffixStripped,
    /// Single-letter middle initial folded into the given name.
    MiddleInitial,
}

/// Expands full names into ordered, deduplicated [`NameQuery`] lists.
///
/// The nickname table maps informal names to the canonical form the directory
/// uses. A key may be a whole name or just a given name; whole-name entries
/// win.
#[derive(Debug, Clone)]
pub struct VariantGenerator {
    nicknames: HashMap<String, String>,
}

impl Default for VariantGenerator {
    fn default() -> Self {
        Self::new(builtin_nicknames())
    }
}

/// Informal-to-canonical name pairs observed in past harvest runs.
fn builtin_nicknames() -> HashMap<String, String> {
    [
        ("Jim", "James J."),
        ("Kristen Allen-Watts", "Kristen Allen Watts"),
        ("Alex", "Alexander"),
        ("RJ", "Reaford J."),
        ("Bill", "William L."),
        ("Stan", "F. Stanford"),
        ("Matt", "Matthew"),
        ("Robert", "Robert A."),
        ("Terry", "Terrence M."),
        ("Ben", "Benjamin"),
        ("Yu-Mei", "Yu Mei"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl VariantGenerator {
    pub fn new(nicknames: HashMap<String, String>) -> Self {
        Self { nicknames }
    }

    /// Returns the ordered variant list for `full_name`.
    ///
    /// Never empty for non-empty input: the first element is always the
    /// `(firstToken, lastToken)` base pair. Duplicate `(given, family)` pairs
    /// keep their first (most confident) occurrence.
    pub fn variants(&self, full_name: &str) -> Vec<NameQuery> {
        let name = normalize(full_name);
        let parts: Vec<&str> = name.split_whitespace().collect();
        let Some((&first, rest)) = parts.split_first() else {
            return Vec::new();
        };
        let last = *rest.last().unwrap_or(&first);

        let mut out = VariantList::default();
        out.push(NameQuery::new(first, last, VariantRule::Exact));

        self.nickname_variants(&name, &parts, &mut out);
        hyphen_variants(&name, &mut out);
        suffix_variants(&parts, first, last, &mut out);

        // Single-letter middle initial folded into the given name.
        if parts.len() > 2 {
            let middle = parts[parts.len() - 2];
            if middle.chars().count() == 1 {
                out.push(NameQuery::new(
                    format!("{first} {middle}"),
                    last,
                    VariantRule::MiddleInitial,
                ));
            }
        }

        out.into_inner()
    }

    fn nickname_variants(&self, name: &str, parts: &[&str], out: &mut VariantList) {
        if let Some(alt) = self.nicknames.get(name) {
            // Whole-name entry: the replacement is itself a full name.
            let alt_parts: Vec<&str> = alt.split_whitespace().collect();
            match alt_parts.as_slice() {
                [] => {}
                [only] => {
                    let last = parts.last().copied().unwrap_or(*only);
                    out.push(NameQuery::new(*only, last, VariantRule::Nickname));
                }
                [alt_first, .., alt_last] => {
                    out.push(NameQuery::new(*alt_first, *alt_last, VariantRule::Nickname));
                    if alt_parts.len() > 2 {
                        out.push(NameQuery::new(
                            format!("{alt_first} {}", alt_parts[1]),
                            *alt_last,
                            VariantRule::Nickname,
                        ));
                    }
                }
            }
        } else if let Some(alt) = parts.first().and_then(|f| self.nicknames.get(*f)) {
            // Given-name entry: the replacement supplies the given name, the
            // remaining input tokens stay as the family name.
            if parts.len() < 2 {
                return;
            }
            let family = parts[1..].join(" ");
            let alt_parts: Vec<&str> = alt.split_whitespace().collect();
            if let Some(&alt_first) = alt_parts.first() {
                out.push(NameQuery::new(alt_first, family.clone(), VariantRule::Nickname));
                if alt_parts.len() > 1 {
                    out.push(NameQuery::new(
                        format!("{alt_first} {}", alt_parts[1]),
                        family,
                        VariantRule::Nickname,
                    ));
                }
            }
        }
    }
}

fn hyphen_variants(name: &str, out: &mut VariantList) {
    if !name.contains('-') {
        return;
    }
    let stripped = name.replace('-', " ");
    let tokens: Vec<&str> = stripped.split_whitespace().collect();
    if let (Some(&first), Some(&last)) = (tokens.first(), tokens.last()) {
        out.push(NameQuery::new(first, last, VariantRule::HyphenStripped));
        if tokens.len() > 2 {
            // Compound family name: keep the two trailing tokens together.
            out.push(NameQuery::new(
                first,
                format!("{} {last}", tokens[tokens.len() - 2]),
                VariantRule::HyphenStripped,
            ));
        }
    }
}

fn suffix_variants(parts: &[&str], first: &str, last: &str, out: &mut VariantList) {
    if !last.contains("Jr") && !last.contains("Sr") {
        return;
    }
    let base = last
        .replace("Jr", "")
        .replace("Sr", "")
        .trim_matches(|c: char| c == ',' || c == '.' || c.is_whitespace())
        .to_string();
    if base.is_empty() {
        return;
    }
    let mut givens = vec![first.to_string()];
    if parts.len() > 2 {
        givens.push(format!("{first} {}", parts[1]));
    }
    for given in givens {
        out.push(NameQuery::new(given.clone(), base.clone(), VariantRule::SuffixStripped));
        out.push(NameQuery::new(
            given.clone(),
            format!("{base}, Jr."),
            VariantRule::SuffixStripped,
        ));
        out.push(NameQuery::new(
            given,
            format!("{base}, Sr."),
            VariantRule::SuffixStripped,
        ));
    }
}

/// Ordered list that drops later duplicates of the same `(given, family)`.
#[derive(Default)]
struct VariantList {
    queries: Vec<NameQuery>,
}

impl VariantList {
    fn push(&mut self, query: NameQuery) {
        let dup = self
            .queries
            .iter()
            .any(|q| q.given == query.given && q.family == query.family);
        if !dup {
            self.queries.push(query);
        }
    }

    fn into_inner(self) -> Vec<NameQuery> {
        self.queries
    }
}
