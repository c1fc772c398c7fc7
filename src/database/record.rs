use serde_json::{Map, Value};

use super::resource::Resource;

/// A row as returned to clients: column name to value, in select order
pub type Record = Map<String, Value>;

/// Errors raised while turning client input into a write
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum RecordError {
    #[error("Invalid JSON format: {0}")]
    InvalidJson(String),
    #[error("Invalid key in request body")]
    UnknownField(String),
    #[error("Request body must contain at least one field")]
    EmptyUpdate,
    #[error("Invalid value for key '{0}'")]
    InvalidValue(&'static str),
}

/// Validated partial update: column assignments in request body order.
///
/// Column names are the resource's static names, never the client's
/// strings, so they can be spliced into an UPDATE statement.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeSet {
    assignments: Vec<(&'static str, String)>,
}

impl ChangeSet {
    /// Validate a PUT body against the resource's mutable columns.
    ///
    /// Every key is checked before any value so an unknown key always
    /// wins over a badly typed value.
    pub fn from_json(resource: &Resource, json: Value) -> Result<Self, RecordError> {
        let map = match json {
            Value::Object(map) => map,
            _ => return Err(RecordError::InvalidJson("Expected JSON object".to_string())),
        };

        let mut columns = Vec::with_capacity(map.len());
        for key in map.keys() {
            match resource.mutable_column(key) {
                Some(column) => columns.push(column),
                None => return Err(RecordError::UnknownField(key.clone())),
            }
        }

        if columns.is_empty() {
            return Err(RecordError::EmptyUpdate);
        }

        let mut assignments = Vec::with_capacity(columns.len());
        for (column, (_, value)) in columns.into_iter().zip(map) {
            match value {
                Value::String(s) => assignments.push((column, s)),
                _ => return Err(RecordError::InvalidValue(column)),
            }
        }

        Ok(Self { assignments })
    }

    pub fn assignments(&self) -> &[(&'static str, String)] {
        &self.assignments
    }

    pub fn columns(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.assignments.iter().map(|(c, _)| *c)
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }
}
