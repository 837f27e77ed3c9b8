//! Reference resolution entry point.

use std::sync::Arc;

use ghcore_core::{Lookups, Record, get_truthy, value_to_string};
use ghcore_entities::{EntityObject, FieldScope, InitMode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::cache::{CacheKey, ResolutionCache};
use crate::category::LinkCategory;
use crate::context::Context;
use crate::error::SearchError;
use crate::patterns::Patterns;
use crate::rules::{Resolution, Rule, rules_for};

const PROPERTIES_KEY: &str = "objnt_prop_dict";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Init mode of the produced entities.
    pub init_mode: InitMode,
    /// Field scope of the produced entities.
    pub field_scope: FieldScope,
    /// Ask the commit API when the event log cannot confirm a SHA.
    pub api_commit_fallback: bool,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            init_mode: InitMode::BuildId,
            field_scope: FieldScope::Identifying,
            api_commit_fallback: true,
        }
    }
}

/// Classifies matched reference texts and builds the entities they name.
pub struct EntitySearch {
    lookups: Lookups,
    patterns: Patterns,
    config: SearchConfig,
    cache: Option<Arc<dyn ResolutionCache>>,
}

impl EntitySearch {
    pub fn new(lookups: Lookups, config: SearchConfig) -> Result<Self, SearchError> {
        Ok(Self {
            lookups,
            patterns: Patterns::new()?,
            config,
            cache: None,
        })
    }

    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn ResolutionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub const fn config(&self) -> &SearchConfig {
        &self.config
    }

    /// The rule that decides `text` in `category`, if any.
    #[must_use]
    pub fn matching_rule(&self, category: LinkCategory, text: &str) -> Option<&'static Rule> {
        rules_for(category)
            .iter()
            .find(|rule| rule.matches(&self.patterns, text))
    }

    /// Resolve a reference found in the free text of an event-log `record`.
    ///
    /// Returns `None` only for empty text. Anything unrecognised becomes an
    /// `Obj` entity carrying whatever was extracted.
    pub async fn resolve(
        &self,
        category: LinkCategory,
        text: &str,
        record: &Record,
    ) -> Option<EntityObject> {
        if text.is_empty() {
            return None;
        }

        let key = CacheKey {
            category,
            text: text.to_string(),
            repo_id: get_truthy(record, "repo_id").map(value_to_string),
        };
        if let Some(hit) = self.cache.as_ref().and_then(|cache| cache.get(&key)) {
            debug!("Cache hit for {category} {text:?}");
            return Some(hit);
        }

        let resolution = match self.matching_rule(category, text) {
            Some(rule) => {
                debug!("{category} {text:?} matched rule {}", rule.name);
                let ctx = Context {
                    text,
                    record,
                    lookups: &self.lookups,
                    patterns: &self.patterns,
                    config: &self.config,
                };
                rule.extractor.run(&ctx).await
            }
            None => {
                debug!("{category} {text:?} matched no rule");
                Resolution::obj()
            }
        };

        let node_type = resolution.node_type;
        if !category.candidates().contains(&node_type) {
            warn!("{category} resolved {text:?} to {node_type}, outside its candidate types");
        }

        let raw = raw_input(category, text, resolution);
        let mut entity = match EntityObject::new(
            node_type.as_str(),
            self.config.init_mode,
            self.config.field_scope,
        ) {
            Ok(entity) => entity,
            Err(e) => {
                warn!("Cannot build {node_type} for {text:?}: {e}");
                return None;
            }
        };
        entity.set_values(&raw, true, &self.lookups).await;

        if let Some(cache) = &self.cache {
            cache.put(key, entity.clone());
        }
        Some(entity)
    }
}

/// The raw field dict handed to the entity: match metadata, the property
/// dict and the extracted fields.
fn raw_input(category: LinkCategory, text: &str, resolution: Resolution) -> Record {
    let Resolution { fields, props, .. } = resolution;

    let props = if get_truthy(&fields, "repo_id").is_some() {
        let mut merged = Record::new();
        for field in ["repo_name", "repo_id"] {
            merged.insert(
                field.to_string(),
                fields.get(field).cloned().unwrap_or(Value::Null),
            );
        }
        merged.extend(props.unwrap_or_default());
        Some(merged)
    } else {
        props
    };

    let mut raw = Record::new();
    raw.insert("match_text".to_string(), Value::from(text));
    raw.insert("match_pattern_type".to_string(), Value::from(category.as_str()));
    raw.insert(
        PROPERTIES_KEY.to_string(),
        props.map_or(Value::Null, Value::Object),
    );
    raw.extend(fields);
    raw
}

#[cfg(test)]
mod tests {
    use ghcore_entities::NodeType;
    use serde_json::json;

    use super::*;

    #[test]
    fn repo_fields_lead_the_property_dict() {
        let resolution = Resolution::new(NodeType::Tag)
            .with_repo(Some("redis/redis"), Some(json!(156_018)))
            .with("tag_name", "7.0.0")
            .with_props(json!({"tag_name": "7.0.0"}));

        let raw = raw_input(LinkCategory::BranchTagDir, "https://x", resolution);
        assert_eq!(
            raw.get(PROPERTIES_KEY),
            Some(&json!({"repo_name": "redis/redis", "repo_id": 156_018, "tag_name": "7.0.0"}))
        );
        assert_eq!(raw.get("match_pattern_type"), Some(&json!("Branch_Tag_GHDir")));
        assert_eq!(raw.get("tag_name"), Some(&json!("7.0.0")));
    }

    #[test]
    fn props_stay_as_extracted_without_repo_id() {
        let resolution = Resolution::obj().with_props(json!({"domain": "sqlite.org"}));
        let raw = raw_input(LinkCategory::ExternalLinks, "http://sqlite.org", resolution);
        assert_eq!(raw.get(PROPERTIES_KEY), Some(&json!({"domain": "sqlite.org"})));

        let raw = raw_input(LinkCategory::OtherLinks, "x", Resolution::obj());
        assert_eq!(raw.get(PROPERTIES_KEY), Some(&Value::Null));
    }

    #[tokio::test]
    #[expect(clippy::expect_used, reason = "Built-in grammar compiles")]
    async fn empty_text_resolves_to_nothing() {
        let search =
            EntitySearch::new(Lookups::offline(), SearchConfig::default()).expect("grammar");
        assert!(search.resolve(LinkCategory::Actor, "", &Record::new()).await.is_none());
    }
}
