//! Schema-driven entity records.

use std::fmt;
use std::str::FromStr;

use ghcore_core::{
    Condition, Lookups, Record, get_i64, get_str, is_truthy, trim_refs_heads, value_to_string,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::EntityError;
use crate::remap::{Remap, RemapSource, TypeSpec};
use crate::schema::{Derivation, EntitySchema, FieldDef, FieldRole, Lookup, SchemaRegistry};

const PROPERTIES_KEY: &str = "objnt_prop_dict";

static NULL: Value = Value::Null;

/// Which derivations run while setting values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitMode {
    /// Derive only the primary key.
    #[default]
    BuildId,
    /// Derive every tracked field except the primary key.
    QueryOtherFieldsById,
    /// Derive every tracked field.
    BuildAllFields,
}

impl InitMode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BuildId => "build_id",
            Self::QueryOtherFieldsById => "query_other_fields_by_id",
            Self::BuildAllFields => "build_all_fields",
        }
    }

    const fn derives(self, field: &FieldDef) -> bool {
        match self {
            Self::BuildId => field.is_primary_key(),
            Self::QueryOtherFieldsById => !field.is_primary_key(),
            Self::BuildAllFields => true,
        }
    }
}

impl FromStr for InitMode {
    type Err = EntityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "build_id" => Ok(Self::BuildId),
            "query_other_fields_by_id" => Ok(Self::QueryOtherFieldsById),
            "build_all_fields" => Ok(Self::BuildAllFields),
            _ => Err(EntityError::InvalidInitMode(s.to_string())),
        }
    }
}

/// Which schema fields an object tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldScope {
    #[default]
    Identifying,
    IdentifyingAndValue,
}

impl FieldScope {
    const fn includes(self, role: FieldRole) -> bool {
        match self {
            Self::Identifying => !matches!(role, FieldRole::Value),
            Self::IdentifyingAndValue => true,
        }
    }
}

/// An entity of one schema type holding the fields known so far.
#[derive(Debug, Clone)]
pub struct EntityObject {
    entity_type: String,
    schema: &'static EntitySchema,
    init_mode: InitMode,
    scope: FieldScope,
    remaps: Vec<Remap>,
    values: Record,
    fieldnames: Vec<String>,
    display_id: Option<String>,
    labels: Option<String>,
    match_text: Option<String>,
    match_pattern_type: Option<String>,
}

impl EntityObject {
    /// Create an empty object.
    ///
    /// `spec` is a type name or a compound specifier such as
    /// `Commit::commit_sha=commit_comment_sha`.
    pub fn new(spec: &str, init_mode: InitMode, scope: FieldScope) -> Result<Self, EntityError> {
        let TypeSpec {
            entity_type,
            remaps,
        } = spec.parse()?;
        let schema = SchemaRegistry::builtin().get(&entity_type);
        let values = schema
            .fields()
            .iter()
            .filter(|f| scope.includes(f.role))
            .map(|f| (f.name.to_string(), Value::Null))
            .collect();

        Ok(Self {
            entity_type,
            schema,
            init_mode,
            scope,
            remaps,
            values,
            fieldnames: Vec::new(),
            display_id: None,
            labels: None,
            match_text: None,
            match_pattern_type: None,
        })
    }

    #[must_use]
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    #[must_use]
    pub fn primary_key_field(&self) -> Option<&'static str> {
        self.schema.primary_key()
    }

    #[must_use]
    pub const fn init_mode(&self) -> InitMode {
        self.init_mode
    }

    #[must_use]
    pub const fn field_scope(&self) -> FieldScope {
        self.scope
    }

    fn tracked(&self) -> impl Iterator<Item = &FieldDef> {
        self.schema
            .fields()
            .iter()
            .filter(|f| self.scope.includes(f.role))
    }

    fn is_tracked(&self, name: &str) -> bool {
        self.tracked().any(|f| f.name == name)
    }

    /// Copy raw values onto the object and complete missing fields.
    ///
    /// With `extend_fields`, raw keys outside the schema are kept as
    /// pass-through properties.
    pub async fn set_values(&mut self, raw: &Record, extend_fields: bool, lookups: &Lookups) {
        let mut fieldnames: Vec<String> = self.tracked().map(|f| f.name.to_string()).collect();
        if extend_fields {
            for key in raw.keys() {
                if !fieldnames.contains(key) {
                    fieldnames.push(key.clone());
                }
            }
        }

        for name in &fieldnames {
            if let Some(value) = raw.get(name).filter(|v| is_truthy(v)) {
                self.values.insert(name.clone(), value.clone());
            }
        }
        self.fieldnames = fieldnames;

        self.apply_remaps(raw, lookups).await;
        self.apply_derivations(lookups).await;

        self.display_id = None;
        self.labels = None;
        if let Some(pk) = self.pk_value() {
            self.display_id = Some(format!("{}_{}", self.entity_type, value_to_string(pk)));
            self.labels = Some(format!(":{}", self.entity_type));
        }
        self.match_text = get_str(raw, "match_text").map(str::to_string);
        self.match_pattern_type = get_str(raw, "match_pattern_type").map(str::to_string);
    }

    async fn apply_remaps(&mut self, raw: &Record, lookups: &Lookups) {
        let remaps = std::mem::take(&mut self.remaps);
        for remap in &remaps {
            let value = match &remap.source {
                RemapSource::Field(field) => raw.get(field).filter(|v| is_truthy(v)).cloned(),
                RemapSource::Call { func, args } => {
                    let bound: Vec<&Value> = args
                        .iter()
                        .map(|a| self.arg(a).or_else(|| raw.get(a)).unwrap_or(&NULL))
                        .collect();
                    func.call(&bound, lookups).await
                }
            };
            if let Some(value) = value {
                self.values.insert(remap.target.clone(), value);
            }
        }
        self.remaps = remaps;
    }

    /// Fill missing tracked fields from their derivations, in declared order.
    pub async fn apply_derivations(&mut self, lookups: &Lookups) {
        let schema = self.schema;
        for field in schema.fields() {
            let Some(derivation) = field.derivation else {
                continue;
            };
            if !self.scope.includes(field.role) || !self.init_mode.derives(field) {
                continue;
            }
            if self.values.get(field.name).is_some_and(|v| !v.is_null()) {
                continue;
            }
            let derived = self.derive(field, &derivation, lookups).await;
            debug!(
                "{}.{} derived as {:?}",
                self.entity_type, field.name, derived
            );
            self.values
                .insert(field.name.to_string(), derived.unwrap_or(Value::Null));
        }
    }

    fn arg(&self, name: &str) -> Option<&Value> {
        self.values.get(name).filter(|v| !v.is_null())
    }

    async fn derive(
        &self,
        field: &FieldDef,
        derivation: &Derivation,
        lookups: &Lookups,
    ) -> Option<Value> {
        match derivation {
            Derivation::Compose { template, args } => {
                let mut params = Record::new();
                for arg in *args {
                    let value = match self.arg(arg.field) {
                        Some(Value::String(s)) if arg.trim_refs_heads => {
                            Value::String(trim_refs_heads(s).to_string())
                        }
                        Some(v) => v.clone(),
                        None => Value::Null,
                    };
                    params.insert(arg.param.to_string(), value);
                }
                template.compose(&params).map(Value::String)
            }
            Derivation::Decompose {
                template,
                source,
                part,
            } => {
                let composite = self.arg(source)?.as_str()?;
                let parts = template.decompose(composite)?;
                let text = parts.get(*part)?.as_str()?;
                Some(field.domain.coerce(text))
            }
            Derivation::CopyOf(source) => self.arg(source).filter(|v| is_truthy(v)).cloned(),
            Derivation::RepoShortName(source) => {
                let full_name = self.arg(source)?.as_str()?;
                let (_, name) = full_name.split_once('/')?;
                Some(Value::String(name.to_string()))
            }
            Derivation::Lookup(lookup) => self.lookup(lookup, lookups).await,
        }
    }

    async fn lookup(&self, lookup: &Lookup, lookups: &Lookups) -> Option<Value> {
        match lookup {
            Lookup::ActorIdByLogin(source) => {
                let login = self.arg(source)?.as_str()?;
                lookups.actor_id_by_login(login).await.map(Value::from)
            }
            Lookup::RepoIdByFullName(source) => {
                let full_name = self.arg(source)?.as_str()?;
                lookups.repo_id_by_full_name(full_name).await.map(Value::from)
            }
            Lookup::StoreField {
                column,
                event_type,
                keys,
            } => {
                let mut conditions = Vec::with_capacity(keys.len() + 1);
                if let Some(event_type) = event_type {
                    conditions.push(Condition::eq("type", *event_type));
                }
                for (key_column, key_field) in *keys {
                    conditions.push(Condition::eq(*key_column, self.arg(key_field)?.clone()));
                }
                lookups.field(column, &conditions).await
            }
            Lookup::CommitAuthorId => {
                let is_push = self
                    .arg("type")
                    .and_then(Value::as_str)
                    .is_some_and(|t| t == "PushEvent");
                if let Some(actor_id) = self.arg("actor_id").filter(|_| is_push) {
                    return Some(actor_id.clone());
                }
                let sha = self.arg("commit_sha")?.clone();
                let conditions = [
                    Condition::eq("type", "PushEvent"),
                    Condition::eq("push_head", sha),
                ];
                lookups.field("actor_id", &conditions).await
            }
            Lookup::RepoOwnerId => {
                let full_name = self.arg("repo_name")?.as_str()?;
                let owner = full_name.split('/').next()?;
                let same_actor = self
                    .arg("actor_login")
                    .and_then(Value::as_str)
                    .is_some_and(|login| login == owner);
                if let Some(actor_id) = self.arg("actor_id").filter(|_| same_actor) {
                    return Some(actor_id.clone());
                }
                lookups.actor_id_by_login(owner).await.map(Value::from)
            }
            Lookup::CommitParents => {
                let sha = self.arg("commit_sha")?.as_str()?;
                let repo_id = get_i64(&self.values, "repo_id")?;
                let parents = lookups.commit_parent_shas(sha, repo_id).await?;
                Some(Value::from(parents))
            }
        }
    }

    fn pk_value(&self) -> Option<&Value> {
        self.arg(self.schema.primary_key()?)
    }

    /// Every tracked, non-null value matches its declared domain.
    #[must_use]
    pub fn validate_types(&self) -> bool {
        self.tracked().all(|field| {
            self.values
                .get(field.name)
                .filter(|v| !v.is_null())
                .is_none_or(|v| field.domain.accepts(v))
        })
    }

    /// The primary key is populated.
    #[must_use]
    pub fn validate_primary_key(&self) -> bool {
        self.pk_value().is_some()
    }

    /// Read a field.
    ///
    /// Tracked fields read as `Ok(None)` until resolved; anything else the
    /// object never saw is an error.
    pub fn get(&self, field: &str) -> Result<Option<&Value>, EntityError> {
        match self.values.get(field) {
            Some(value) => Ok(Some(value).filter(|v| !v.is_null())),
            None if self.is_tracked(field) => Ok(None),
            None => Err(EntityError::MissingAttribute {
                field: field.to_string(),
                entity: self.to_string(),
            }),
        }
    }

    /// The fields named by the last `set_values` that exist on the object.
    #[must_use]
    pub fn get_dict(&self) -> Record {
        let names: Vec<&str> = if self.fieldnames.is_empty() {
            self.tracked().map(|f| f.name).collect()
        } else {
            self.fieldnames.iter().map(String::as_str).collect()
        };
        names
            .into_iter()
            .filter_map(|name| {
                self.values
                    .get(name)
                    .map(|value| (name.to_string(), value.clone()))
            })
            .collect()
    }

    /// `"{type}_{pk}"` once the primary key is known.
    #[must_use]
    pub fn display_id(&self) -> Option<&str> {
        self.display_id.as_deref()
    }

    /// `":{type}"` once the primary key is known.
    #[must_use]
    pub fn labels(&self) -> Option<&str> {
        self.labels.as_deref()
    }

    #[must_use]
    pub fn match_text(&self) -> Option<&str> {
        self.match_text.as_deref()
    }

    #[must_use]
    pub fn match_pattern_type(&self) -> Option<&str> {
        self.match_pattern_type.as_deref()
    }

    /// Auxiliary properties attached during resolution.
    #[must_use]
    pub fn properties(&self) -> Option<&Record> {
        self.values.get(PROPERTIES_KEY).and_then(Value::as_object)
    }
}

impl fmt::Display for EntityObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.schema.primary_key() {
            Some(pk) => {
                let value = self.values.get(pk).unwrap_or(&NULL);
                write!(f, "{}_{}", self.entity_type, value_to_string(value))
            }
            None => write!(f, "{}{}", self.entity_type, Value::Object(self.get_dict())),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use ghcore_core::CommitGraph;
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap_or_default()
    }

    #[expect(clippy::expect_used, reason = "Test specifiers are valid")]
    fn object(spec: &str, mode: InitMode) -> EntityObject {
        EntityObject::new(spec, mode, FieldScope::Identifying).expect("valid specifier")
    }

    #[test]
    fn primary_key_starts_unset() {
        for node_type in crate::schema::NodeType::ALL {
            let obj = object(node_type.as_str(), InitMode::BuildId);
            assert!(!obj.validate_primary_key(), "{node_type}");
        }
    }

    #[tokio::test]
    async fn builds_branch_exid_from_parts() {
        let lookups = Lookups::offline();
        let mut branch = object("Branch", InitMode::BuildId);

        branch.set_values(&record(json!({"repo_id": 1})), true, &lookups).await;
        assert!(!branch.validate_primary_key());
        assert_eq!(branch.display_id(), None);

        let raw = record(json!({"repo_id": 1, "branch_name": "master", "extra": "xxx"}));
        branch.set_values(&raw, true, &lookups).await;
        assert!(branch.validate_primary_key());
        assert_eq!(branch.get("_branch_exid"), Ok(Some(&json!("1:master"))));
        assert_eq!(branch.get("extra"), Ok(Some(&json!("xxx"))));
        assert_eq!(branch.display_id(), Some("Branch_1:master"));
        assert_eq!(branch.labels(), Some(":Branch"));
        assert!(branch.validate_types());
        assert_eq!(branch.to_string(), "Branch_1:master");
    }

    #[tokio::test]
    async fn decomposes_exid_in_build_all_fields() {
        let lookups = Lookups::offline();
        let mut branch = object("Branch", InitMode::BuildAllFields);
        branch
            .set_values(&record(json!({"_branch_exid": "1:master"})), false, &lookups)
            .await;
        let dict = branch.get_dict();
        assert_eq!(dict.get("repo_id"), Some(&json!(1)));
        assert_eq!(dict.get("branch_name"), Some(&json!("master")));
        assert!(branch.validate_types());
    }

    #[tokio::test]
    async fn query_mode_skips_primary_key() {
        let lookups = Lookups::offline();
        let mut tag = object("Tag", InitMode::QueryOtherFieldsById);
        let raw = record(json!({"repo_id": 7, "tag_name": "v1", "tag_branch_name": "main"}));
        tag.set_values(&raw, false, &lookups).await;
        assert!(!tag.validate_primary_key());
        assert_eq!(tag.get("_tag_branch_exid"), Ok(Some(&json!("7:main"))));
    }

    #[tokio::test]
    async fn push_branch_trims_heads_prefix() {
        let lookups = Lookups::offline();
        let mut push = object("Push", InitMode::BuildAllFields);
        let raw = record(json!({"push_id": 9, "repo_id": 3, "push_ref": "refs/heads/dev"}));
        push.set_values(&raw, false, &lookups).await;
        assert_eq!(push.get("_push_branch_exid"), Ok(Some(&json!("3:dev"))));
    }

    #[tokio::test]
    async fn set_values_is_idempotent() {
        let lookups = Lookups::offline();
        let raw = record(json!({"repo_id": 288_431_943, "issue_number": "1552", "body": "x"}));
        let mut issue = object("Issue", InitMode::BuildId);
        issue.set_values(&raw, true, &lookups).await;
        let first = issue.get_dict();
        issue.set_values(&raw, true, &lookups).await;
        assert_eq!(issue.get_dict(), first);
        assert_eq!(first.get("_issue_exid"), Some(&json!("288431943#1552")));
    }

    #[tokio::test]
    async fn field_remap_copies_source() {
        let lookups = Lookups::offline();
        let mut commit = object("Commit::commit_sha=commit_comment_sha", InitMode::BuildId);
        assert_eq!(commit.entity_type(), "Commit");
        let sha = "5a904ac97a89506456f5e890b8dabea57bd7a0fa";
        commit
            .set_values(&record(json!({"commit_comment_sha": sha})), false, &lookups)
            .await;
        assert_eq!(commit.get("commit_sha"), Ok(Some(&json!(sha))));
        assert!(commit.validate_primary_key());
    }

    struct TaggedCommits;

    #[async_trait]
    impl CommitGraph for TaggedCommits {
        async fn commit_parent_shas(
            &self,
            _sha: &str,
            _repo_id: i64,
        ) -> anyhow::Result<Vec<String>> {
            Ok(Vec::new())
        }

        async fn tag_commit_sha(
            &self,
            repo_id: i64,
            tag_name: &str,
        ) -> anyhow::Result<Option<String>> {
            Ok((repo_id == 156_018 && tag_name == "7.0.0").then(|| "abc123".to_string()))
        }
    }

    #[tokio::test]
    async fn call_remap_reads_untracked_raw_fields() {
        let lookups = Lookups::offline().with_commits(Arc::new(TaggedCommits));
        let raw = record(json!({"repo_id": 156_018, "tag_name": "7.0.0"}));

        for extend_fields in [false, true] {
            let mut commit = object(
                "Commit::commit_sha=tag_commit_sha(repo_id, tag_name)",
                InitMode::BuildId,
            );
            commit.set_values(&raw, extend_fields, &lookups).await;
            assert_eq!(
                commit.get("commit_sha"),
                Ok(Some(&json!("abc123"))),
                "extend_fields={extend_fields}"
            );
            assert_eq!(commit.display_id(), Some("Commit_abc123"));
        }
    }

    #[test]
    fn missing_attribute_names_the_object() {
        let obj = object("Actor", InitMode::BuildId);
        assert_eq!(obj.get("actor_login"), Ok(None));
        let err = obj.get("body");
        assert_eq!(
            err,
            Err(EntityError::MissingAttribute {
                field: "body".to_string(),
                entity: "Actor_null".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn unknown_type_behaves_as_empty_schema() {
        let lookups = Lookups::offline();
        let mut obj = object("Obj", InitMode::BuildId);
        let raw = record(json!({"match_text": "RB#26080", "objnt_prop_dict": {"numbers": ["26080"]}}));
        obj.set_values(&raw, true, &lookups).await;
        assert_eq!(obj.primary_key_field(), None);
        assert_eq!(obj.display_id(), None);
        assert!(obj.validate_types());
        assert_eq!(obj.match_text(), Some("RB#26080"));
        assert_eq!(
            obj.properties().and_then(|p| p.get("numbers")),
            Some(&json!(["26080"]))
        );
        assert!(obj.to_string().starts_with("Obj{"));
    }

    #[tokio::test]
    async fn validate_types_flags_wrong_domains() {
        let lookups = Lookups::offline();
        let mut actor = object("Actor", InitMode::BuildId);
        let raw = record(json!({"actor_id": "not-a-number", "actor_login": "birdflyi"}));
        actor.set_values(&raw, false, &lookups).await;
        assert!(!actor.validate_types());
    }

    #[test]
    fn init_modes_parse() {
        assert_eq!(
            "build_all_fields".parse::<InitMode>(),
            Ok(InitMode::BuildAllFields)
        );
        assert_eq!(
            "build".parse::<InitMode>(),
            Err(EntityError::InvalidInitMode("build".to_string()))
        );
    }
}
