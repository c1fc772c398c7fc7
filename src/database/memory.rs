use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::record::{ChangeSet, Record};
use super::resource::Resource;
use super::store::{timestamp_value, DatabaseError, Session, Store};

#[derive(Debug, Clone)]
struct StoredRow {
    values: HashMap<&'static str, String>,
    registered_at: DateTime<Utc>,
}

type Tables = HashMap<&'static str, Vec<StoredRow>>;

/// Process-local store with the same contract as the PostgreSQL one:
/// primary keys are unique, each write is applied on its own.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<RwLock<Tables>>,
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sessions handed out so far
    pub fn opened_sessions(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Sessions released so far
    pub fn closed_sessions(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn open(&self) -> Result<Box<dyn Session>, DatabaseError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemorySession {
            tables: self.tables.clone(),
            closed: self.closed.clone(),
        }))
    }

    async fn ensure_schema(&self) -> Result<(), DatabaseError> {
        Ok(())
    }
}

pub struct MemorySession {
    tables: Arc<RwLock<Tables>>,
    closed: Arc<AtomicUsize>,
}

fn render(row: &StoredRow, resource: &Resource, columns: &[&str]) -> Result<Record, DatabaseError> {
    let mut record = Record::new();
    for column in columns {
        let value = if *column == resource.registration_column {
            timestamp_value(row.registered_at)
        } else {
            match row.values.get(*column) {
                Some(v) => Value::String(v.clone()),
                None => {
                    return Err(DatabaseError::Query(format!(
                        "column \"{}\" does not exist",
                        column
                    )))
                }
            }
        };
        record.insert(column.to_string(), value);
    }
    Ok(record)
}

fn row_id<'a>(row: &'a StoredRow, resource: &Resource) -> Option<&'a str> {
    row.values.get(resource.id_column).map(String::as_str)
}

#[async_trait]
impl Session for MemorySession {
    async fn fetch_all(&mut self, resource: &Resource, columns: &[&str]) -> Result<Vec<Record>, DatabaseError> {
        let tables = self.tables.read().await;
        let Some(rows) = tables.get(resource.table) else {
            return Ok(Vec::new());
        };

        let mut ordered: Vec<&StoredRow> = rows.iter().collect();
        ordered.sort_by(|a, b| {
            a.registered_at
                .cmp(&b.registered_at)
                .then_with(|| row_id(a, resource).cmp(&row_id(b, resource)))
        });
        ordered
            .into_iter()
            .map(|row| render(row, resource, columns))
            .collect()
    }

    async fn fetch_one(
        &mut self,
        resource: &Resource,
        columns: &[&str],
        id: &str,
    ) -> Result<Option<Record>, DatabaseError> {
        let tables = self.tables.read().await;
        let found = tables
            .get(resource.table)
            .and_then(|rows| rows.iter().find(|row| row_id(row, resource) == Some(id)));
        match found {
            Some(row) => Ok(Some(render(row, resource, columns)?)),
            None => Ok(None),
        }
    }

    async fn exists(&mut self, resource: &Resource, id: &str) -> Result<bool, DatabaseError> {
        let tables = self.tables.read().await;
        Ok(tables
            .get(resource.table)
            .map(|rows| rows.iter().any(|row| row_id(row, resource) == Some(id)))
            .unwrap_or(false))
    }

    async fn insert(
        &mut self,
        resource: &Resource,
        values: Vec<String>,
        registered_at: DateTime<Utc>,
    ) -> Result<(), DatabaseError> {
        if values.len() != resource.columns.len() {
            return Err(DatabaseError::Query(format!(
                "expected {} values for {}, got {}",
                resource.columns.len(),
                resource.table,
                values.len()
            )));
        }

        let row = StoredRow {
            values: resource.columns.iter().copied().zip(values).collect(),
            registered_at,
        };
        let id = row_id(&row, resource).unwrap_or_default().to_string();

        let mut tables = self.tables.write().await;
        let rows = tables.entry(resource.table).or_default();
        if rows.iter().any(|existing| row_id(existing, resource) == Some(id.as_str())) {
            return Err(DatabaseError::UniqueViolation(format!(
                "duplicate key value violates unique constraint \"{}_pkey\"",
                resource.table
            )));
        }
        debug!(table = resource.table, %id, "memory insert");
        rows.push(row);
        Ok(())
    }

    async fn update(&mut self, resource: &Resource, id: &str, changes: &ChangeSet) -> Result<u64, DatabaseError> {
        if changes.is_empty() {
            return Err(DatabaseError::Query("UPDATE requires at least one column".to_string()));
        }
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(resource.table) else {
            return Ok(0);
        };
        let mut changed = 0;
        for row in rows.iter_mut().filter(|row| row_id(row, resource) == Some(id)) {
            for (column, value) in changes.assignments() {
                row.values.insert(*column, value.clone());
            }
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete(&mut self, resource: &Resource, id: &str) -> Result<u64, DatabaseError> {
        let mut tables = self.tables.write().await;
        let Some(rows) = tables.get_mut(resource.table) else {
            return Ok(0);
        };
        let before = rows.len();
        rows.retain(|row| row_id(row, resource) != Some(id));
        Ok((before - rows.len()) as u64)
    }

    async fn close(self: Box<Self>) -> Result<(), DatabaseError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
