use async_trait::async_trait;
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::client::{DatastoreError, Filter, PersistenceClient, Select};
use crate::models::{Project, ProjectMember, Record, Task};

type Row = Map<String, Value>;

/// Reference from `column` to the `id` of another table
#[derive(Debug, Clone)]
pub struct ForeignKey {
    pub column: String,
    pub references: String,
    /// Delete referencing rows with the parent; otherwise the parent delete is refused
    pub cascade: bool,
}

/// Server-side behavior of one table
#[derive(Debug, Clone, Default)]
pub struct TableSchema {
    /// Maintain an `updated_at` column on insert and update
    pub updated_at: bool,
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_updated_at(mut self) -> Self {
        self.updated_at = true;
        self
    }

    pub fn references(mut self, column: &str, table: &str, cascade: bool) -> Self {
        self.foreign_keys.push(ForeignKey {
            column: column.to_string(),
            references: table.to_string(),
            cascade,
        });
        self
    }
}

/// In-process datastore with PostgREST semantics, for tests and offline use
#[derive(Clone, Default)]
pub struct InMemoryClient {
    inner: Arc<RwLock<InMemoryClientInner>>,
}

#[derive(Default)]
struct InMemoryClientInner {
    tables: HashMap<String, Table>,
    failing: HashSet<String>,
    last_timestamp: Option<OffsetDateTime>,
}

struct Table {
    schema: TableSchema,
    rows: Vec<Row>,
}

impl InMemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Client with the given tables registered up front
    pub fn with_tables<'a>(tables: impl IntoIterator<Item = (&'a str, TableSchema)>) -> Self {
        let tables = tables
            .into_iter()
            .map(|(name, schema)| {
                (
                    name.to_string(),
                    Table {
                        schema,
                        rows: Vec::new(),
                    },
                )
            })
            .collect();

        Self {
            inner: Arc::new(RwLock::new(InMemoryClientInner {
                tables,
                ..Default::default()
            })),
        }
    }

    /// Client with the `projects`, `project_members` and `tasks` tables
    pub fn with_board_schema() -> Self {
        Self::with_tables([
            (Project::TABLE, TableSchema::new().with_updated_at()),
            (
                ProjectMember::TABLE,
                TableSchema::new().references("project_id", Project::TABLE, true),
            ),
            (
                Task::TABLE,
                TableSchema::new()
                    .with_updated_at()
                    .references("project_id", Project::TABLE, true),
            ),
        ])
    }

    /// Register (or replace) a table
    pub async fn register_table(&self, name: &str, schema: TableSchema) {
        let mut inner = self.inner.write().await;
        inner.tables.insert(
            name.to_string(),
            Table {
                schema,
                rows: Vec::new(),
            },
        );
    }

    /// Make every later request against `table` fail as unavailable
    pub async fn fail_table(&self, table: &str) {
        self.inner.write().await.failing.insert(table.to_string());
    }

    /// Undo [`InMemoryClient::fail_table`]
    pub async fn restore_table(&self, table: &str) {
        self.inner.write().await.failing.remove(table);
    }

    /// Number of rows currently stored in `table` (0 for unknown tables)
    pub async fn row_count(&self, table: &str) -> usize {
        let inner = self.inner.read().await;
        inner.tables.get(table).map_or(0, |t| t.rows.len())
    }
}

impl InMemoryClientInner {
    fn table(&self, name: &str) -> Result<&Table, DatastoreError> {
        if self.failing.contains(name) {
            return Err(unavailable());
        }
        self.tables.get(name).ok_or_else(|| missing_relation(name))
    }

    fn table_mut(&mut self, name: &str) -> Result<&mut Table, DatastoreError> {
        if self.failing.contains(name) {
            return Err(unavailable());
        }
        self.tables.get_mut(name).ok_or_else(|| missing_relation(name))
    }

    fn contains_id(&self, table: &str, id: &Value) -> bool {
        self.tables
            .get(table)
            .is_some_and(|t| t.rows.iter().any(|row| row.get("id") == Some(id)))
    }

    fn check_foreign_keys(
        &self,
        table: &str,
        schema: &TableSchema,
        row: &Row,
    ) -> Result<(), DatastoreError> {
        for fk in &schema.foreign_keys {
            match row.get(&fk.column) {
                Some(Value::Null) | None => {}
                Some(value) if self.contains_id(&fk.references, value) => {}
                Some(_) => {
                    return Err(DatastoreError::api(
                        409,
                        "23503",
                        format!(
                            "insert or update on table \"{}\" violates foreign key constraint on \"{}\"",
                            table, fk.column
                        ),
                    ))
                }
            }
        }
        Ok(())
    }

    /// Strictly increasing server timestamp
    fn next_timestamp(&mut self) -> Result<Value, DatastoreError> {
        let mut now = OffsetDateTime::now_utc();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + time::Duration::microseconds(1);
            }
        }
        self.last_timestamp = Some(now);

        now.format(&Rfc3339)
            .map(Value::String)
            .map_err(|e| DatastoreError::api(500, "XX000", e.to_string()))
    }
}

#[async_trait]
impl PersistenceClient for InMemoryClient {
    async fn select(&self, query: Select) -> Result<Option<Value>, DatastoreError> {
        let inner = self.inner.read().await;
        let table = inner.table(&query.table)?;

        let mut rows: Vec<&Row> = table
            .rows
            .iter()
            .filter(|row| query.filters.iter().all(|f| matches(row, f)))
            .collect();

        if let Some(order) = &query.order {
            rows.sort_by(|a, b| {
                let ordering = compare_values(a.get(&order.column), b.get(&order.column));
                if order.ascending {
                    ordering
                } else {
                    ordering.reverse()
                }
            });
        }

        if query.single {
            return match rows.as_slice() {
                [row] => Ok(Some(Value::Object((*row).clone()))),
                _ => Err(DatastoreError::NotSingle { rows: rows.len() }),
            };
        }

        Ok(Some(Value::Array(
            rows.into_iter().cloned().map(Value::Object).collect(),
        )))
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, DatastoreError> {
        let Value::Object(mut row) = row else {
            return Err(DatastoreError::api(400, "PGRST102", "Row must be a JSON object"));
        };

        let mut inner = self.inner.write().await;
        let schema = inner.table(table)?.schema.clone();
        inner.check_foreign_keys(table, &schema, &row)?;

        let id = row
            .entry("id")
            .or_insert_with(|| Value::String(Uuid::new_v4().to_string()))
            .clone();
        if inner.contains_id(table, &id) {
            return Err(DatastoreError::api(
                409,
                "23505",
                format!("duplicate key value violates unique constraint \"{}_pkey\"", table),
            ));
        }

        let timestamp = inner.next_timestamp()?;
        if schema.updated_at {
            row.insert("updated_at".to_string(), timestamp.clone());
        }
        row.insert("created_at".to_string(), timestamp);

        inner.table_mut(table)?.rows.push(row.clone());
        Ok(Value::Object(row))
    }

    async fn update(
        &self,
        table: &str,
        filter: Filter,
        patch: Value,
    ) -> Result<Value, DatastoreError> {
        let Value::Object(patch) = patch else {
            return Err(DatastoreError::api(400, "PGRST102", "Patch must be a JSON object"));
        };

        let mut inner = self.inner.write().await;
        let schema = inner.table(table)?.schema.clone();
        inner.check_foreign_keys(table, &schema, &patch)?;

        let positions: Vec<usize> = inner
            .table(table)?
            .rows
            .iter()
            .enumerate()
            .filter(|(_, row)| matches(row, &filter))
            .map(|(index, _)| index)
            .collect();

        let [position] = positions.as_slice() else {
            return Err(DatastoreError::NotSingle {
                rows: positions.len(),
            });
        };
        let position = *position;

        let timestamp = if schema.updated_at {
            Some(inner.next_timestamp()?)
        } else {
            None
        };

        let row = &mut inner.table_mut(table)?.rows[position];
        for (column, value) in patch {
            row.insert(column, value);
        }
        if let Some(timestamp) = timestamp {
            row.insert("updated_at".to_string(), timestamp);
        }

        Ok(Value::Object(row.clone()))
    }

    async fn delete(&self, table: &str, filter: Filter) -> Result<(), DatastoreError> {
        let mut inner = self.inner.write().await;
        inner.table(table)?;

        // (table, ids) pairs still to remove; children are queued behind their parent
        let mut pending = vec![(table.to_string(), filter_ids(&inner, table, &filter))];
        let mut removals: Vec<(String, Vec<Value>)> = Vec::new();
        // Self-referencing cascades can form cycles; each row is expanded once
        let mut visited: HashSet<(String, String)> = HashSet::new();

        while let Some((parent, ids)) = pending.pop() {
            let ids: Vec<Value> = ids
                .into_iter()
                .filter(|id| visited.insert((parent.clone(), id.to_string())))
                .collect();
            if ids.is_empty() {
                continue;
            }
            for (child, child_table) in &inner.tables {
                for fk in child_table.schema.foreign_keys.iter().filter(|fk| fk.references == parent) {
                    let children: Vec<Value> = child_table
                        .rows
                        .iter()
                        .filter(|row| row.get(&fk.column).is_some_and(|v| ids.contains(v)))
                        .filter_map(|row| row.get("id").cloned())
                        .collect();

                    if children.is_empty() {
                        continue;
                    }
                    if !fk.cascade {
                        return Err(DatastoreError::api(
                            409,
                            "23503",
                            format!(
                                "update or delete on table \"{}\" violates foreign key constraint on table \"{}\"",
                                parent, child
                            ),
                        ));
                    }
                    pending.push((child.clone(), children));
                }
            }
            removals.push((parent, ids));
        }

        for (name, ids) in removals {
            if let Some(target) = inner.tables.get_mut(&name) {
                target
                    .rows
                    .retain(|row| !row.get("id").is_some_and(|id| ids.contains(id)));
            }
        }

        Ok(())
    }
}

fn filter_ids(inner: &InMemoryClientInner, table: &str, filter: &Filter) -> Vec<Value> {
    inner.tables.get(table).map_or_else(Vec::new, |t| {
        t.rows
            .iter()
            .filter(|row| matches(row, filter))
            .filter_map(|row| row.get("id").cloned())
            .collect()
    })
}

fn matches(row: &Row, filter: &Filter) -> bool {
    match row.get(&filter.column) {
        Some(Value::String(s)) => *s == filter.value,
        Some(Value::Number(n)) => n.to_string() == filter.value,
        Some(Value::Bool(b)) => b.to_string() == filter.value,
        _ => false,
    }
}

/// Column ordering with PostgreSQL's ascending NULLS LAST
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::String(a)), Some(Value::String(b))) => {
            match (
                OffsetDateTime::parse(a, &Rfc3339),
                OffsetDateTime::parse(b, &Rfc3339),
            ) {
                (Ok(a), Ok(b)) => a.cmp(&b),
                _ => a.cmp(b),
            }
        }
        (Some(Value::Number(a)), Some(Value::Number(b))) => a
            .as_f64()
            .partial_cmp(&b.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(a)), Some(Value::Bool(b))) => a.cmp(b),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

fn unavailable() -> DatastoreError {
    DatastoreError::Api {
        status: 503,
        code: None,
        message: "Datastore unavailable".to_string(),
        details: None,
        hint: None,
    }
}

fn missing_relation(table: &str) -> DatastoreError {
    DatastoreError::api(
        404,
        "42P01",
        format!("relation \"public.{}\" does not exist", table),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn insert_project(client: &InMemoryClient, name: &str) -> Value {
        client
            .insert("projects", json!({ "name": name }))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_insert_assigns_id_and_timestamps() {
        let client = InMemoryClient::with_board_schema();

        let row = insert_project(&client, "Alpha").await;
        assert!(Uuid::parse_str(row["id"].as_str().unwrap()).is_ok());
        assert_eq!(row["created_at"], row["updated_at"]);

        let member = client
            .insert(
                "project_members",
                json!({ "project_id": row["id"], "user_name": "Ana", "role": "lead" }),
            )
            .await
            .unwrap();
        assert!(member.get("created_at").is_some());
        assert!(member.get("updated_at").is_none());
    }

    #[tokio::test]
    async fn test_timestamps_strictly_increase() {
        let client = InMemoryClient::with_board_schema();

        let mut previous: Option<OffsetDateTime> = None;
        for i in 0..20 {
            let row = insert_project(&client, &format!("P{}", i)).await;
            let created =
                OffsetDateTime::parse(row["created_at"].as_str().unwrap(), &Rfc3339).unwrap();
            if let Some(previous) = previous {
                assert!(created > previous);
            }
            previous = Some(created);
        }
    }

    #[tokio::test]
    async fn test_select_orders_and_filters() {
        let client = InMemoryClient::with_board_schema();
        insert_project(&client, "First").await;
        insert_project(&client, "Second").await;
        insert_project(&client, "Second").await;

        let rows = client
            .select(Select::from("projects").order("created_at", false))
            .await
            .unwrap()
            .unwrap();
        let names: Vec<&str> = rows
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["Second", "Second", "First"]);

        let filtered = client
            .select(Select::from("projects").eq("name", "First"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(filtered.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_single_requires_exactly_one_row() {
        let client = InMemoryClient::with_board_schema();
        insert_project(&client, "Dup").await;
        insert_project(&client, "Dup").await;

        let none = client
            .select(Select::from("projects").eq("name", "Missing").single())
            .await;
        assert!(matches!(none, Err(DatastoreError::NotSingle { rows: 0 })));

        let many = client
            .select(Select::from("projects").eq("name", "Dup").single())
            .await;
        assert!(matches!(many, Err(DatastoreError::NotSingle { rows: 2 })));
    }

    #[tokio::test]
    async fn test_update_merges_supplied_columns() {
        let client = InMemoryClient::with_board_schema();
        let row = insert_project(&client, "Alpha").await;
        let id = row["id"].as_str().unwrap();

        let updated = client
            .update("projects", Filter::eq("id", id), json!({ "progress": 40 }))
            .await
            .unwrap();

        assert_eq!(updated["name"], "Alpha");
        assert_eq!(updated["progress"], 40);
        assert_eq!(updated["created_at"], row["created_at"]);
        assert_ne!(updated["updated_at"], row["updated_at"]);

        let missing = client
            .update(
                "projects",
                Filter::eq("id", Uuid::new_v4()),
                json!({ "progress": 1 }),
            )
            .await;
        assert!(matches!(missing, Err(DatastoreError::NotSingle { rows: 0 })));
    }

    #[tokio::test]
    async fn test_foreign_key_enforced() {
        let client = InMemoryClient::with_board_schema();

        let result = client
            .insert(
                "tasks",
                json!({ "project_id": Uuid::new_v4().to_string(), "title": "Orphan" }),
            )
            .await;

        match result {
            Err(DatastoreError::Api { status, code, .. }) => {
                assert_eq!(status, 409);
                assert_eq!(code.as_deref(), Some("23503"));
            }
            other => panic!("Expected foreign key violation, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_delete_cascades_to_children() {
        let client = InMemoryClient::with_board_schema();
        let project = insert_project(&client, "Parent").await;
        let other = insert_project(&client, "Other").await;

        for parent in [&project, &other] {
            client
                .insert("tasks", json!({ "project_id": parent["id"], "title": "t" }))
                .await
                .unwrap();
            client
                .insert("project_members", json!({ "project_id": parent["id"] }))
                .await
                .unwrap();
        }

        client
            .delete("projects", Filter::eq("id", project["id"].as_str().unwrap()))
            .await
            .unwrap();

        assert_eq!(client.row_count("projects").await, 1);
        assert_eq!(client.row_count("tasks").await, 1);
        assert_eq!(client.row_count("project_members").await, 1);
    }

    #[tokio::test]
    async fn test_cyclic_self_cascade_terminates() {
        let client = InMemoryClient::with_tables([(
            "nodes",
            TableSchema::new().references("parent_id", "nodes", true),
        )]);

        let a = client.insert("nodes", json!({ "parent_id": null })).await.unwrap();
        let a_id = a["id"].as_str().unwrap().to_string();
        let b = client
            .insert("nodes", json!({ "parent_id": a_id }))
            .await
            .unwrap();
        client
            .update("nodes", Filter::eq("id", &a_id), json!({ "parent_id": b["id"] }))
            .await
            .unwrap();
        client.insert("nodes", json!({ "parent_id": null })).await.unwrap();

        client.delete("nodes", Filter::eq("id", &a_id)).await.unwrap();
        assert_eq!(client.row_count("nodes").await, 1);
    }

    #[tokio::test]
    async fn test_restrict_blocks_parent_delete() {
        let client = InMemoryClient::with_tables([
            ("teams", TableSchema::new()),
            ("players", TableSchema::new().references("team_id", "teams", false)),
        ]);
        let team = client.insert("teams", json!({})).await.unwrap();
        client
            .insert("players", json!({ "team_id": team["id"] }))
            .await
            .unwrap();

        let result = client
            .delete("teams", Filter::eq("id", team["id"].as_str().unwrap()))
            .await;
        assert!(matches!(result, Err(DatastoreError::Api { status: 409, .. })));
        assert_eq!(client.row_count("teams").await, 1);
    }

    #[tokio::test]
    async fn test_delete_missing_row_is_ok() {
        let client = InMemoryClient::with_board_schema();
        client
            .delete("projects", Filter::eq("id", Uuid::new_v4()))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_unknown_and_failing_tables() {
        let client = InMemoryClient::with_board_schema();

        let unknown = client.select(Select::from("nope")).await;
        assert!(matches!(unknown, Err(DatastoreError::Api { status: 404, .. })));

        client.fail_table("projects").await;
        let failing = client.select(Select::from("projects")).await;
        assert!(matches!(failing, Err(DatastoreError::Api { status: 503, .. })));

        client.restore_table("projects").await;
        assert!(client.select(Select::from("projects")).await.is_ok());
    }

    #[test]
    fn test_compare_values_nulls_last() {
        let a = json!("a");
        let null = Value::Null;
        assert_eq!(compare_values(Some(&a), Some(&null)), Ordering::Less);
        assert_eq!(compare_values(None, Some(&a)), Ordering::Greater);
        assert_eq!(
            compare_values(Some(&json!(2)), Some(&json!(10))),
            Ordering::Less
        );
    }
}
