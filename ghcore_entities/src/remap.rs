//! Compound entity type specifiers.
//!
//! A specifier such as `Commit::commit_sha=commit_comment_sha` names the
//! entity type and then maps raw input into fields of that type. A source is
//! either a raw field name or a call to one of the resolver functions in
//! [`RemapFn`], e.g. `Commit::commit_sha=tag_commit_sha(repo_id, tag_name)`.

use std::str::FromStr;

use ghcore_core::Lookups;
use serde_json::Value;

use crate::error::EntityError;

const TYPE_DELIMITER: &str = "::";

/// Resolver functions callable from a specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemapFn {
    TagCommitSha,
    RepoIdByFullName,
    ActorIdByLogin,
    RepoNameById,
}

impl RemapFn {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TagCommitSha => "tag_commit_sha",
            Self::RepoIdByFullName => "repo_id_by_full_name",
            Self::ActorIdByLogin => "actor_id_by_login",
            Self::RepoNameById => "repo_name_by_id",
        }
    }

    #[must_use]
    pub const fn arity(self) -> usize {
        match self {
            Self::TagCommitSha => 2,
            Self::RepoIdByFullName | Self::ActorIdByLogin | Self::RepoNameById => 1,
        }
    }

    /// Evaluate with positional arguments; any unusable argument yields `None`.
    pub async fn call(self, args: &[&Value], lookups: &Lookups) -> Option<Value> {
        match (self, args) {
            (Self::TagCommitSha, [repo_id, tag_name]) => lookups
                .tag_commit_sha(as_i64(repo_id)?, tag_name.as_str()?)
                .await
                .map(Value::from),
            (Self::RepoIdByFullName, [name]) => lookups
                .repo_id_by_full_name(name.as_str()?)
                .await
                .map(Value::from),
            (Self::ActorIdByLogin, [login]) => lookups
                .actor_id_by_login(login.as_str()?)
                .await
                .map(Value::from),
            (Self::RepoNameById, [repo_id]) => lookups
                .repo_name_by_id(as_i64(repo_id)?)
                .await
                .map(Value::from),
            _ => None,
        }
    }
}

impl FromStr for RemapFn {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tag_commit_sha" => Ok(Self::TagCommitSha),
            "repo_id_by_full_name" => Ok(Self::RepoIdByFullName),
            "actor_id_by_login" => Ok(Self::ActorIdByLogin),
            "repo_name_by_id" => Ok(Self::RepoNameById),
            _ => Err(format!("unknown resolver function `{s}`")),
        }
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemapSource {
    Field(String),
    Call { func: RemapFn, args: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Remap {
    pub target: String,
    pub source: RemapSource,
}

/// A parsed specifier: the entity type plus its remaps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeSpec {
    pub entity_type: String,
    pub remaps: Vec<Remap>,
}

fn is_field_name(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.')
}

impl FromStr for TypeSpec {
    type Err = EntityError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: String| EntityError::InvalidSpecifier {
            spec: spec.to_string(),
            reason,
        };

        let Some((entity_type, mappings)) = spec.split_once(TYPE_DELIMITER) else {
            return Ok(Self {
                entity_type: spec.trim().to_string(),
                remaps: Vec::new(),
            });
        };

        let entity_type = entity_type.trim();
        if entity_type.is_empty() {
            return Err(invalid("missing entity type".to_string()));
        }

        let mut remaps = Vec::new();
        for mapping in mappings.split('&') {
            let Some((target, source)) = mapping.split_once('=') else {
                return Err(invalid(format!("expected `target=source`, found `{mapping}`")));
            };
            let target = target.trim();
            if !is_field_name(target) {
                return Err(invalid(format!("bad target field `{target}`")));
            }
            remaps.push(Remap {
                target: target.to_string(),
                source: parse_source(source.trim()).map_err(invalid)?,
            });
        }

        Ok(Self {
            entity_type: entity_type.to_string(),
            remaps,
        })
    }
}

fn parse_source(source: &str) -> Result<RemapSource, String> {
    let Some((name, rest)) = source.split_once('(') else {
        return if is_field_name(source) {
            Ok(RemapSource::Field(source.to_string()))
        } else {
            Err(format!("bad source field `{source}`"))
        };
    };

    let Some(arg_list) = rest.strip_suffix(')') else {
        return Err(format!("unterminated call `{source}`"));
    };
    let func: RemapFn = name.trim().parse()?;
    let args: Vec<String> = arg_list
        .split(',')
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(str::to_string)
        .collect();

    if let Some(bad) = args.iter().find(|a| !is_field_name(a)) {
        return Err(format!("bad argument `{bad}` to {}", func.as_str()));
    }
    if args.len() != func.arity() {
        return Err(format!(
            "{} takes {} argument(s), {} given",
            func.as_str(),
            func.arity(),
            args.len()
        ));
    }
    Ok(RemapSource::Call { func, args })
}
