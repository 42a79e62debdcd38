use std::collections::{BTreeMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, SecondsFormat, Utc};
use serde_json::{json, Value};

use crate::model::tables;
use crate::session::SessionArc;

use super::error::{conflict, permission_denied, GatewayError, GatewayResult};
use super::query::{compare_values, Direction, Embed, Filter, SelectQuery};
use super::{RemoteGateway, Row};

/// Kinds of gateway request, used for fault injection and request accounting.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    Count,
    Insert,
    Update,
    Delete,
}

/// In-process implementation of the gateway contract.
///
/// Tables registered with [`InMemoryGateway::with_owner_policy`] behave like
/// tables under a row-level security policy: inserts must carry the acting
/// user's id in the owner column and updates/deletes only see the acting user's
/// rows. The acting user is read from the attached session.
#[derive(Clone, Default)]
pub struct InMemoryGateway {
    state: Arc<Mutex<MemoryState>>,
    session: Option<SessionArc>,
}

#[derive(Default)]
struct MemoryState {
    tables: BTreeMap<String, Vec<Row>>,
    owner_columns: BTreeMap<String, String>,
    unique_keys: BTreeMap<String, Vec<Vec<String>>>,
    faults: VecDeque<Fault>,
    requests: Vec<(Operation, String)>,
    last_timestamp: Option<DateTime<Utc>>,
}

struct Fault {
    operation: Operation,
    table: String,
    error: GatewayError,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves the acting user for row-level policies from `session`.
    pub fn with_session(mut self, session: SessionArc) -> Self {
        self.session = Some(session);
        self
    }

    pub fn with_owner_policy(self, table: &str, owner_column: &str) -> Self {
        self.lock()
            .owner_columns
            .insert(table.to_owned(), owner_column.to_owned());
        self
    }

    pub fn with_unique_key(self, table: &str, columns: &[&str]) -> Self {
        self.lock()
            .unique_keys
            .entry(table.to_owned())
            .or_default()
            .push(columns.iter().map(|c| (*c).to_owned()).collect());
        self
    }

    /// Registers the hosted schema's row policies: posts, comments and both
    /// like tables are owned through `user_id`, and a user likes a post or a
    /// comment at most once.
    pub fn with_hosted_policies(self) -> Self {
        [tables::POSTS, tables::LIKES, tables::COMMENTS, tables::COMMENT_LIKES]
            .into_iter()
            .fold(self, |gateway, table| gateway.with_owner_policy(table, "user_id"))
            .with_unique_key(tables::LIKES, &["post_id", "user_id"])
            .with_unique_key(tables::COMMENT_LIKES, &["comment_id", "user_id"])
    }

    /// Stores rows as-is, bypassing policies. Missing `id`/`created_at` are filled in.
    pub fn seed(&self, table: &str, rows: impl IntoIterator<Item = Row>) {
        let mut state = self.lock();
        for mut row in rows {
            state.fill_server_columns(&mut row);
            state.tables.entry(table.to_owned()).or_default().push(row);
        }
    }

    /// Raw rows of `table`, in insertion order.
    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.lock().tables.get(table).cloned().unwrap_or_default()
    }

    /// Makes the next `operation` on `table` fail with `error`.
    pub fn fail_next(&self, operation: Operation, table: &str, error: GatewayError) {
        self.lock().faults.push_back(Fault {
            operation,
            table: table.to_owned(),
            error,
        });
    }

    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    pub fn requests(&self) -> Vec<(Operation, String)> {
        self.lock().requests.clone()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn acting_user(&self) -> Option<String> {
        self.session
            .as_ref()
            .and_then(|session| session.current_user())
            .map(|user| user.id.as_str().to_owned())
    }

    /// Records the request and returns the injected failure, if any.
    fn begin(&self, operation: Operation, table: &str) -> GatewayResult<MutexGuard<'_, MemoryState>> {
        let mut state = self.lock();
        state.requests.push((operation, table.to_owned()));
        let position = state
            .faults
            .iter()
            .position(|fault| fault.operation == operation && fault.table == table);
        if let Some(fault) = position.and_then(|index| state.faults.remove(index)) {
            return Err(fault.error);
        }
        Ok(state)
    }
}

impl MemoryState {
    fn next_timestamp(&mut self) -> String {
        let mut now = Utc::now();
        if let Some(last) = self.last_timestamp {
            if now <= last {
                now = last + ChronoDuration::milliseconds(1);
            }
        }
        self.last_timestamp = Some(now);
        now.to_rfc3339_opts(SecondsFormat::Millis, true)
    }

    fn fill_server_columns(&mut self, row: &mut Row) {
        if !row.contains_key("id") {
            row.insert("id".into(), Value::String(uuid::Uuid::new_v4().to_string()));
        }
        if !row.contains_key("created_at") {
            let now = self.next_timestamp();
            row.insert("created_at".into(), Value::String(now));
        }
    }

    fn owner_allows(&self, table: &str, row: &Row, acting_user: Option<&str>) -> bool {
        match self.owner_columns.get(table) {
            None => true,
            Some(column) => match (row.get(column).and_then(Value::as_str), acting_user) {
                (Some(owner), Some(user)) => owner == user,
                _ => false,
            },
        }
    }

    fn violates_unique(&self, table: &str, candidate: &Row) -> bool {
        let Some(keys) = self.unique_keys.get(table) else {
            return false;
        };
        let rows = self.tables.get(table).map(Vec::as_slice).unwrap_or_default();
        keys.iter().any(|columns| {
            rows.iter().any(|existing| {
                columns
                    .iter()
                    .all(|column| existing.get(column).is_some() && existing.get(column) == candidate.get(column))
            })
        })
    }

    fn hydrate(&self, row: &Row, embeds: &[Embed]) -> Row {
        let mut hydrated = row.clone();
        let id = row.get("id").cloned().unwrap_or(Value::Null);
        for embed in embeds {
            let value = match embed {
                Embed::One {
                    table,
                    local_column,
                    ..
                } => {
                    let key = row.get(local_column).cloned().unwrap_or(Value::Null);
                    self.table_rows(table)
                        .find(|candidate| !key.is_null() && candidate.get("id") == Some(&key))
                        .map(|found| Value::Object(found.clone()))
                        .unwrap_or(Value::Null)
                }
                Embed::Many {
                    table,
                    foreign_column,
                    columns,
                    filters,
                    ..
                } => Value::Array(
                    self.table_rows(table)
                        .filter(|candidate| candidate.get(foreign_column) == Some(&id))
                        .filter(|candidate| filters.iter().all(|filter| filter.matches(candidate)))
                        .map(|candidate| Value::Object(project(candidate, columns)))
                        .collect(),
                ),
                Embed::Count {
                    table,
                    foreign_column,
                    ..
                } => {
                    let total = self
                        .table_rows(table)
                        .filter(|candidate| candidate.get(foreign_column) == Some(&id))
                        .count();
                    json!([{ "count": total }])
                }
            };
            hydrated.insert(embed.alias().to_owned(), value);
        }
        hydrated
    }

    fn table_rows<'a>(&'a self, table: &str) -> impl Iterator<Item = &'a Row> + 'a {
        self.tables.get(table).into_iter().flatten()
    }
}

fn project(row: &Row, columns: &[String]) -> Row {
    if columns.is_empty() {
        return row.clone();
    }
    columns
        .iter()
        .filter_map(|column| row.get(column).map(|value| (column.clone(), value.clone())))
        .collect()
}

fn matches_all(row: &Row, filters: &[Filter]) -> bool {
    filters.iter().all(|filter| filter.matches(row))
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl RemoteGateway for InMemoryGateway {
    async fn select(&self, query: &SelectQuery) -> GatewayResult<Vec<Row>> {
        let state = self.begin(Operation::Select, query.table())?;
        let mut rows: Vec<&Row> = state
            .table_rows(query.table())
            .filter(|row| matches_all(row, query.filters()))
            .collect();

        rows.sort_by(|left, right| {
            for order in query.ordering() {
                let l = left.get(&order.column).unwrap_or(&Value::Null);
                let r = right.get(&order.column).unwrap_or(&Value::Null);
                let mut ordering = compare_values(l, r).unwrap_or(std::cmp::Ordering::Equal);
                if order.direction == Direction::Descending {
                    ordering = ordering.reverse();
                }
                if ordering != std::cmp::Ordering::Equal {
                    return ordering;
                }
            }
            std::cmp::Ordering::Equal
        });

        let offset = query.offset_value().unwrap_or(0);
        let limit = query.limit_value().unwrap_or(usize::MAX);
        Ok(rows
            .into_iter()
            .skip(offset)
            .take(limit)
            .map(|row| {
                let projected = project(row, query.selected_columns());
                let mut hydrated = state.hydrate(row, query.embeds());
                hydrated.retain(|key, _| {
                    projected.contains_key(key)
                        || query.embeds().iter().any(|embed| embed.alias() == key)
                });
                hydrated
            })
            .collect())
    }

    async fn count(&self, table: &str, filters: &[Filter]) -> GatewayResult<u64> {
        let state = self.begin(Operation::Count, table)?;
        Ok(state
            .table_rows(table)
            .filter(|row| matches_all(row, filters))
            .count() as u64)
    }

    async fn insert(&self, table: &str, values: Row, returning: &[Embed]) -> GatewayResult<Row> {
        let acting_user = self.acting_user();
        let mut state = self.begin(Operation::Insert, table)?;
        if !state.owner_allows(table, &values, acting_user.as_deref()) {
            return Err(permission_denied(format!(
                "new row violates row-level security policy for table \"{table}\""
            ))
            .with_details("42501"));
        }
        if state.violates_unique(table, &values) {
            return Err(conflict(format!(
                "duplicate key value violates unique constraint on \"{table}\""
            ))
            .with_details("23505"));
        }
        let mut stored = values;
        state.fill_server_columns(&mut stored);
        if !stored.contains_key("updated_at") {
            let created = stored.get("created_at").cloned().unwrap_or(Value::Null);
            stored.insert("updated_at".into(), created);
        }
        state
            .tables
            .entry(table.to_owned())
            .or_default()
            .push(stored.clone());
        Ok(state.hydrate(&stored, returning))
    }

    async fn update(&self, table: &str, filters: &[Filter], patch: Row) -> GatewayResult<Vec<Row>> {
        let acting_user = self.acting_user();
        let mut state = self.begin(Operation::Update, table)?;
        let timestamp = state.next_timestamp();
        let allowed: Vec<bool> = state
            .table_rows(table)
            .map(|row| {
                matches_all(row, filters) && state.owner_allows(table, row, acting_user.as_deref())
            })
            .collect();

        let mut changed = Vec::new();
        if let Some(rows) = state.tables.get_mut(table) {
            for (row, allowed) in rows.iter_mut().zip(allowed) {
                if !allowed {
                    continue;
                }
                for (column, value) in &patch {
                    row.insert(column.clone(), value.clone());
                }
                if !patch.contains_key("updated_at") {
                    row.insert("updated_at".into(), Value::String(timestamp.clone()));
                }
                changed.push(row.clone());
            }
        }
        Ok(changed)
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> GatewayResult<Vec<Row>> {
        let acting_user = self.acting_user();
        let mut state = self.begin(Operation::Delete, table)?;
        let allowed: Vec<bool> = state
            .table_rows(table)
            .map(|row| {
                matches_all(row, filters) && state.owner_allows(table, row, acting_user.as_deref())
            })
            .collect();

        let mut removed = Vec::new();
        if let Some(rows) = state.tables.get_mut(table) {
            let mut flags = allowed.into_iter();
            rows.retain(|row| {
                let remove = flags.next().unwrap_or(false);
                if remove {
                    removed.push(row.clone());
                }
                !remove
            });
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::error::{unavailable, GatewayErrorCode};
    use crate::gateway::row;
    use crate::model::UserId;
    use crate::session::MemorySession;

    fn gateway_as(user: Option<&str>) -> InMemoryGateway {
        let session = Arc::new(MemorySession::new());
        if let Some(user) = user {
            session.sign_in(UserId::new(user), None);
        }
        InMemoryGateway::new()
            .with_session(session)
            .with_owner_policy("posts", "user_id")
    }

    #[tokio::test]
    async fn select_orders_pages_and_embeds() {
        let gateway = gateway_as(Some("u1"));
        gateway.seed("profiles", [row([("id", "u1"), ("username", "ana")])]);
        gateway.seed(
            "posts",
            [
                row([("id", "p1"), ("user_id", "u1"), ("created_at", "2024-01-01T00:00:00.000Z")]),
                row([("id", "p2"), ("user_id", "u1"), ("created_at", "2024-01-02T00:00:00.000Z")]),
                row([("id", "p3"), ("user_id", "u1"), ("created_at", "2024-01-03T00:00:00.000Z")]),
            ],
        );
        gateway.seed("comments", [row([("post_id", "p2"), ("content", "nice")])]);

        let rows = gateway
            .select(
                &SelectQuery::from("posts")
                    .embed(Embed::one("author", "profiles", "user_id"))
                    .embed(Embed::count("comment_total", "comments", "post_id"))
                    .order_by("created_at", Direction::Descending)
                    .range(1, 5),
            )
            .await
            .unwrap();

        let ids: Vec<_> = rows.iter().map(|r| r["id"].as_str().unwrap()).collect();
        assert_eq!(ids, ["p2", "p1"]);
        assert_eq!(rows[0]["author"]["username"], json!("ana"));
        assert_eq!(rows[0]["comment_total"], json!([{ "count": 1 }]));
    }

    #[tokio::test]
    async fn owner_policy_hides_foreign_rows_from_mutations() {
        let gateway = gateway_as(Some("intruder"));
        gateway.seed("posts", [row([("id", "p1"), ("user_id", "u1")])]);

        let removed = gateway
            .delete("posts", &[Filter::eq("id", "p1")])
            .await
            .unwrap();
        assert!(removed.is_empty());
        assert_eq!(gateway.rows("posts").len(), 1);

        let err = gateway
            .insert("posts", row([("user_id", "u1")]), &[])
            .await
            .unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::PermissionDenied);
    }

    #[tokio::test]
    async fn unique_keys_reject_duplicates() {
        let gateway = InMemoryGateway::new().with_unique_key("likes", &["post_id", "user_id"]);
        let like = row([("post_id", "p1"), ("user_id", "u1")]);
        gateway.insert("likes", like.clone(), &[]).await.unwrap();
        let err = gateway.insert("likes", like, &[]).await.unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::Conflict);
    }

    #[tokio::test]
    async fn injected_fault_fires_once() {
        let gateway = InMemoryGateway::new();
        gateway.fail_next(Operation::Select, "posts", unavailable("offline"));
        assert!(gateway.select(&SelectQuery::from("posts")).await.is_err());
        assert!(gateway.select(&SelectQuery::from("posts")).await.is_ok());
        assert_eq!(gateway.request_count(), 2);
    }

    #[tokio::test]
    async fn hosted_policies_guard_like_tables() {
        let session = Arc::new(MemorySession::new());
        session.sign_in(UserId::new("u1"), None);
        let gateway = InMemoryGateway::new()
            .with_session(session)
            .with_hosted_policies();

        let like = row([("comment_id", "c1"), ("user_id", "u1")]);
        gateway.insert("comment_likes", like.clone(), &[]).await.unwrap();
        let err = gateway.insert("comment_likes", like, &[]).await.unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::Conflict);

        let err = gateway
            .insert("likes", row([("post_id", "p1"), ("user_id", "u2")]), &[])
            .await
            .unwrap_err();
        assert_eq!(err.code, GatewayErrorCode::PermissionDenied);
    }
}
