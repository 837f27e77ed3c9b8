//! Point lookups against the GitHub event-log table.

use async_trait::async_trait;
use ghcore_core::{Condition, EventStore, IdentityResolver, UserInfo};
use sea_orm::sea_query::{
    Alias, Expr, ExprTrait, MysqlQueryBuilder, PostgresQueryBuilder, Query,
    SelectStatement, SqliteQueryBuilder, Value as SeaValue, Values,
};
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, QueryResult, Statement};
use serde_json::Value;
use tracing::{debug, info};

pub const DEFAULT_TABLE: &str = "opensource.events";

/// `schema.table` or a bare table name.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TableName {
    schema: Option<String>,
    table: String,
}

impl TableName {
    fn parse(name: &str) -> Self {
        match name.split_once('.') {
            Some((schema, table)) => Self {
                schema: Some(schema.to_string()),
                table: table.to_string(),
            },
            None => Self {
                schema: None,
                table: name.to_string(),
            },
        }
    }
}

fn bind(value: &Value) -> Option<SeaValue> {
    match value {
        Value::Null => None,
        Value::Bool(b) => Some(SeaValue::from(*b)),
        Value::Number(n) => n
            .as_i64()
            .map(SeaValue::from)
            .or_else(|| n.as_u64().map(SeaValue::from))
            .or_else(|| n.as_f64().map(SeaValue::from)),
        Value::String(s) => Some(SeaValue::from(s.clone())),
        Value::Array(_) | Value::Object(_) => Some(SeaValue::from(value.to_string())),
    }
}

fn select(table: &TableName, column: &str, conditions: &[Condition]) -> SelectStatement {
    let mut query = Query::select();
    query.column(Alias::new(column.to_string()));
    match &table.schema {
        Some(schema) => query.from((Alias::new(schema.clone()), Alias::new(table.table.clone()))),
        None => query.from(Alias::new(table.table.clone())),
    };
    for condition in conditions {
        let filter = match condition {
            Condition::Eq(col, value) => match bind(value) {
                Some(value) => Expr::col(Alias::new(col.clone())).eq(value),
                None => Expr::col(Alias::new(col.clone())).is_null(),
            },
            Condition::Prefix(col, prefix) => Expr::col(Alias::new(col.clone())).like(format!("{prefix}%")),
        };
        query.and_where(filter);
    }
    query.limit(1).to_owned()
}

fn build(backend: DatabaseBackend, statement: &SelectStatement) -> (String, Values) {
    match backend {
        DatabaseBackend::Postgres => statement.build(PostgresQueryBuilder),
        DatabaseBackend::MySql => statement.build(MysqlQueryBuilder),
        _ => statement.build(SqliteQueryBuilder),
    }
}

/// First column of a row as JSON, whatever its SQL type.
fn row_value(row: &QueryResult, column: &str) -> Value {
    if let Ok(Some(v)) = row.try_get::<Option<i64>>("", column) {
        return Value::from(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<i32>>("", column) {
        return Value::from(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<String>>("", column) {
        return Value::from(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<f64>>("", column) {
        return Value::from(v);
    }
    if let Ok(Some(v)) = row.try_get::<Option<bool>>("", column) {
        return Value::from(v);
    }
    row.try_get::<Option<Value>>("", column)
        .ok()
        .flatten()
        .unwrap_or(Value::Null)
}

/// Event-log table reached through sea-orm.
pub struct EventLogStore {
    db: DatabaseConnection,
    table: TableName,
}

impl EventLogStore {
    pub async fn connect(database_url: &str, table: &str) -> anyhow::Result<Self> {
        info!("Connecting to event log {table}");
        let db = Database::connect(database_url).await?;
        Ok(Self::new(db, table))
    }

    #[must_use]
    pub fn new(db: DatabaseConnection, table: &str) -> Self {
        Self {
            db,
            table: TableName::parse(table),
        }
    }

    async fn first(&self, column: &str, conditions: &[Condition]) -> anyhow::Result<Option<Value>> {
        let backend = self.db.get_database_backend();
        let (sql, values) = build(backend, &select(&self.table, column, conditions));
        debug!("Event log query: {sql}");
        let row = self
            .db
            .query_one_raw(Statement::from_sql_and_values(backend, sql, values))
            .await?;
        Ok(row.map(|row| row_value(&row, column)).filter(|v| !v.is_null()))
    }
}

#[async_trait]
impl EventStore for EventLogStore {
    async fn field(&self, column: &str, conditions: &[Condition]) -> anyhow::Result<Option<Value>> {
        self.first(column, conditions).await
    }
}

/// Ids and names as recorded by past events.
#[async_trait]
impl IdentityResolver for EventLogStore {
    async fn repo_id_by_full_name(&self, full_name: &str) -> anyhow::Result<Option<i64>> {
        let found = self
            .first("repo_id", &[Condition::eq("repo_name", full_name)])
            .await?;
        Ok(found.and_then(|v| v.as_i64()))
    }

    async fn repo_name_by_id(&self, repo_id: i64) -> anyhow::Result<Option<String>> {
        let found = self
            .first("repo_name", &[Condition::eq("repo_id", repo_id)])
            .await?;
        Ok(found.and_then(|v| v.as_str().map(str::to_string)))
    }

    async fn actor_id_by_login(&self, login: &str) -> anyhow::Result<Option<i64>> {
        let found = self
            .first("actor_id", &[Condition::eq("actor_login", login)])
            .await?;
        Ok(found.and_then(|v| v.as_i64()))
    }

    /// The log does not map e-mail addresses to accounts.
    async fn user_by_email(&self, _email: &str) -> anyhow::Result<Option<UserInfo>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use sea_orm::MockDatabase;

    use super::*;

    fn store_returning(rows: Vec<BTreeMap<&str, SeaValue>>) -> EventLogStore {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([rows])
            .into_connection();
        EventLogStore::new(db, DEFAULT_TABLE)
    }

    fn sql(table: &str, column: &str, conditions: &[Condition]) -> (String, Values) {
        build(
            DatabaseBackend::Postgres,
            &select(&TableName::parse(table), column, conditions),
        )
    }

    #[test]
    fn selects_one_column_from_qualified_table() {
        let (sql, values) = sql(
            DEFAULT_TABLE,
            "repo_id",
            &[Condition::eq("repo_name", "redis/redis")],
        );
        assert!(
            sql.starts_with(r#"SELECT "repo_id" FROM "opensource"."events" WHERE "repo_name" = $1"#),
            "{sql}"
        );
        assert!(sql.contains("LIMIT"), "{sql}");
        assert_eq!(values.0.first(), Some(&SeaValue::from("redis/redis")));
    }

    #[test]
    fn prefix_and_null_conditions() {
        let (sql, values) = sql(
            "events",
            "push_head",
            &[
                Condition::eq("repo_id", 156_018),
                Condition::prefix("push_head", "5c9a6c1"),
                Condition::eq("org_id", Value::Null),
            ],
        );
        assert!(sql.contains(r#"FROM "events""#), "{sql}");
        assert!(sql.contains(r#""repo_id" = $1"#), "{sql}");
        assert!(sql.contains(r#""push_head" LIKE $2"#), "{sql}");
        assert!(sql.contains(r#""org_id" IS NULL"#), "{sql}");
        assert_eq!(values.0.get(1), Some(&SeaValue::from("5c9a6c1%")));
    }

    #[test]
    fn json_values_bind_by_type() {
        assert_eq!(bind(&Value::from(7)), Some(SeaValue::from(7_i64)));
        assert_eq!(bind(&Value::from("x")), Some(SeaValue::from("x")));
        assert_eq!(bind(&Value::Null), None);
    }

    #[tokio::test]
    async fn repo_id_from_integer_column() -> anyhow::Result<()> {
        let store = store_returning(vec![BTreeMap::from([(
            "repo_id",
            SeaValue::from(156_018_i64),
        )])]);
        assert_eq!(store.repo_id_by_full_name("redis/redis").await?, Some(156_018));
        Ok(())
    }

    #[tokio::test]
    async fn repo_name_from_text_column() -> anyhow::Result<()> {
        let store = store_returning(vec![BTreeMap::from([(
            "repo_name",
            SeaValue::from("redis/redis"),
        )])]);
        assert_eq!(
            store.repo_name_by_id(156_018).await?,
            Some("redis/redis".to_string())
        );
        Ok(())
    }

    #[tokio::test]
    async fn no_matching_event_is_none() -> anyhow::Result<()> {
        let store = store_returning(Vec::new());
        assert_eq!(store.actor_id_by_login("nobody").await?, None);
        Ok(())
    }

    #[tokio::test]
    async fn field_reads_any_column() -> anyhow::Result<()> {
        let store = store_returning(vec![BTreeMap::from([(
            "push_head",
            SeaValue::from("5c9a6c1e0b"),
        )])]);
        let found = store
            .field("push_head", &[Condition::prefix("push_head", "5c9a6c1")])
            .await?;
        assert_eq!(found, Some(Value::from("5c9a6c1e0b")));
        Ok(())
    }
}
