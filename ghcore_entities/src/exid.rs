//! Composite external ids.
//!
//! Entities without a natural numeric id are keyed by joining a repository id
//! with a suffix, e.g. `"156018:unstable"` for a branch or `"156018#10502"`
//! for an issue. The reserved separators are positional only: decomposition
//! normalizes all of them to one separator that does not occur in the value.

use ghcore_core::{Record, is_truthy, value_to_string};
use serde_json::Value;
use tracing::warn;

/// Separators reserved for composite ids, in preference order.
pub const SEPARATORS: [char; 3] = [':', '#', '@'];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Param(&'static str),
    Sep(char),
    Lit(&'static str),
}

const BRANCH_PARTS: &[Part] = &[Part::Param("repo_id"), Part::Sep(':'), Part::Param("branch_name")];
const GOLLUM_PARTS: &[Part] = &[Part::Param("repo_id"), Part::Sep(':'), Part::Lit("wiki")];
const ISSUE_PARTS: &[Part] = &[Part::Param("repo_id"), Part::Sep('#'), Part::Param("issue_number")];
const TAG_PARTS: &[Part] = &[Part::Param("repo_id"), Part::Sep('@'), Part::Param("tag_name")];

/// The composite id families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExidTemplate {
    Branch,
    Gollum,
    Issue,
    Tag,
}

impl ExidTemplate {
    /// Declaration order, which is also the fuzzy-match priority.
    pub const ALL: [Self; 4] = [Self::Branch, Self::Gollum, Self::Issue, Self::Tag];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Branch => "branch_exid",
            Self::Gollum => "gollum_exid",
            Self::Issue => "issue_exid",
            Self::Tag => "tag_exid",
        }
    }

    const fn parts(self) -> &'static [Part] {
        match self {
            Self::Branch => BRANCH_PARTS,
            Self::Gollum => GOLLUM_PARTS,
            Self::Issue => ISSUE_PARTS,
            Self::Tag => TAG_PARTS,
        }
    }

    /// Parameter names in template order.
    pub fn params(self) -> impl Iterator<Item = &'static str> {
        self.parts().iter().filter_map(|part| match part {
            Part::Param(name) => Some(*name),
            _ => None,
        })
    }

    /// The template in `{param}` notation, e.g. `{repo_id}#{issue_number}`.
    #[must_use]
    pub fn pattern(self) -> String {
        self.parts()
            .iter()
            .map(|part| match part {
                Part::Param(name) => format!("{{{name}}}"),
                Part::Sep(sep) => sep.to_string(),
                Part::Lit(lit) => (*lit).to_string(),
            })
            .collect()
    }

    /// Render the composite id.
    ///
    /// Absent when any supplied value is unset or a template parameter is missing.
    #[must_use]
    pub fn compose(self, params: &Record) -> Option<String> {
        if params.values().any(|v| !is_truthy(v)) {
            return None;
        }
        let mut out = String::new();
        for part in self.parts() {
            match part {
                Part::Param(name) => out.push_str(&value_to_string(params.get(*name)?)),
                Part::Sep(sep) => out.push(*sep),
                Part::Lit(lit) => out.push_str(lit),
            }
        }
        Some(out)
    }

    /// Split a composite id back into its named parameters.
    #[must_use]
    pub fn decompose(self, composite: &str) -> Option<Record> {
        let sep = SEPARATORS
            .iter()
            .copied()
            .find(|s| !composite.contains(*s))
            .unwrap_or_else(|| {
                warn!("Composite id {composite:?} contains every reserved separator, splitting on ':'");
                SEPARATORS[0]
            });
        let normalized: String = composite
            .chars()
            .map(|c| if SEPARATORS.contains(&c) { sep } else { c })
            .collect();
        let tokens: Vec<&str> = normalized.split(sep).collect();
        let slots: Vec<&Part> = self
            .parts()
            .iter()
            .filter(|part| !matches!(part, Part::Sep(_)))
            .collect();

        if tokens.len() != slots.len() {
            warn!(
                "Cannot match {} against {composite:?}: expected {} parts, found {}",
                self.pattern(),
                slots.len(),
                tokens.len()
            );
            return None;
        }

        let mut params = Record::new();
        for (slot, token) in slots.into_iter().zip(tokens) {
            match slot {
                Part::Param(name) => {
                    params.insert((*name).to_string(), Value::String(token.to_string()));
                }
                Part::Lit(lit) if *lit != token => {
                    warn!("Cannot match {} against {composite:?}: expected {lit:?}", self.pattern());
                    return None;
                }
                _ => {}
            }
        }
        Some(params)
    }
}

/// Resolve a template key such as `_pull_head_branch_exid` to its family.
///
/// Exact names and suffix matches both count; the first family in
/// declaration order wins.
#[must_use]
pub fn match_key(key: &str) -> Option<ExidTemplate> {
    let matched: Vec<ExidTemplate> = ExidTemplate::ALL
        .into_iter()
        .filter(|t| key.ends_with(t.name()))
        .collect();
    match matched.as_slice() {
        [] => {
            warn!("No composite id template matches {key:?}");
            None
        }
        [only] => Some(*only),
        [first, ..] => {
            warn!("Several composite id templates match {key:?}: {matched:?}, using {first:?}");
            Some(*first)
        }
    }
}

/// Compose the composite id for a template key.
#[must_use]
pub fn compose_id(key: &str, params: &Record) -> Option<String> {
    match_key(key)?.compose(params)
}

/// Decompose a composite id for a template key.
#[must_use]
pub fn decompose_id(key: &str, composite: &str) -> Option<Record> {
    match_key(key)?.decompose(composite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn composes_each_family() {
        let params = record(json!({"repo_id": 156_018, "branch_name": "unstable"}));
        assert_eq!(compose_id("_branch_exid", &params).as_deref(), Some("156018:unstable"));

        let params = record(json!({"repo_id": 156_018}));
        assert_eq!(compose_id("_gollum_exid", &params).as_deref(), Some("156018:wiki"));

        let params = record(json!({"repo_id": 156_018, "issue_number": "10502"}));
        assert_eq!(compose_id("_issue_exid", &params).as_deref(), Some("156018#10502"));

        let params = record(json!({"repo_id": "123456", "tag_name": "v1.2.3"}));
        assert_eq!(compose_id("_release_tag_exid", &params).as_deref(), Some("123456@v1.2.3"));
    }

    #[test]
    fn unset_values_yield_nothing() {
        for params in [
            json!({"repo_id": null, "issue_number": 1}),
            json!({"repo_id": 1, "issue_number": ""}),
            json!({"repo_id": 0, "issue_number": 1}),
            json!({"repo_id": 1}),
        ] {
            assert_eq!(compose_id("issue_exid", &record(params)), None);
        }
    }

    #[test]
    fn decompose_inverts_compose() {
        for (key, params) in [
            ("_branch_exid", json!({"repo_id": "1", "branch_name": "master"})),
            ("_issue_exid", json!({"repo_id": "288431943", "issue_number": "1552"})),
            ("_tag_exid", json!({"repo_id": "7", "tag_name": "v7.1.2"})),
            ("_gollum_exid", json!({"repo_id": "42"})),
        ] {
            let params = record(params);
            let composite = compose_id(key, &params).unwrap_or_default();
            assert_eq!(decompose_id(key, &composite), Some(params));
        }
    }

    #[test]
    fn decompose_rejects_mismatches() {
        assert_eq!(decompose_id("_gollum_exid", "42:home"), None);
        assert_eq!(decompose_id("_branch_exid", "1"), None);
        assert_eq!(decompose_id("_branch_exid", "1:feature:x"), None);
    }

    #[test]
    fn decompose_normalizes_separators() {
        let parsed = decompose_id("_tag_exid", "7:v1").unwrap_or_default();
        assert_eq!(parsed.get("tag_name"), Some(&json!("v1")));
    }

    #[test]
    fn fuzzy_key_matching() {
        assert_eq!(match_key("_pull_head_branch_exid"), Some(ExidTemplate::Branch));
        assert_eq!(match_key("issue_exid"), Some(ExidTemplate::Issue));
        assert_eq!(match_key("_repo_full_name"), None);
        assert_eq!(ExidTemplate::Issue.pattern(), "{repo_id}#{issue_number}");
    }
}
