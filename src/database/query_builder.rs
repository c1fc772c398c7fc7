use super::record::ChangeSet;
use super::resource::Resource;
use super::store::DatabaseError;

/// Builds the parameterized statements issued for a resource.
///
/// Table names are schema-qualified and quoted. Column names come from the
/// static `Resource` descriptors only; client input is always bound as a
/// parameter.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    schema: String,
}

impl QueryBuilder {
    pub fn new(schema: impl Into<String>) -> Result<Self, DatabaseError> {
        let schema = schema.into();
        if !is_valid_identifier(&schema) {
            return Err(DatabaseError::InvalidIdentifier(schema));
        }
        Ok(Self { schema })
    }

    pub fn schema(&self) -> &str {
        &self.schema
    }

    pub fn table(&self, resource: &Resource) -> String {
        format!(
            "{}.{}",
            quote_identifier(&self.schema),
            quote_identifier(resource.table)
        )
    }

    pub fn select_all(&self, resource: &Resource, columns: &[&str]) -> String {
        format!(
            "SELECT {} FROM {} ORDER BY {}, {}",
            columns.join(", "),
            self.table(resource),
            resource.registration_column,
            resource.id_column
        )
    }

    pub fn select_by_id(&self, resource: &Resource, columns: &[&str]) -> String {
        format!(
            "SELECT {} FROM {} WHERE {} = $1",
            columns.join(", "),
            self.table(resource),
            resource.id_column
        )
    }

    pub fn exists(&self, resource: &Resource) -> String {
        format!(
            "SELECT 1 FROM {} WHERE {} = $1",
            self.table(resource),
            resource.id_column
        )
    }

    /// Insert of every declared column plus the registration time, in that order
    pub fn insert(&self, resource: &Resource) -> String {
        let columns = resource.full_row();
        let placeholders: Vec<String> = (1..=columns.len()).map(|i| format!("${}", i)).collect();
        format!(
            "INSERT INTO {} ({}) VALUES ({})",
            self.table(resource),
            columns.join(", "),
            placeholders.join(", ")
        )
    }

    /// `UPDATE .. SET a = $1, b = $2 WHERE id = $3`; the id binds last
    pub fn update(&self, resource: &Resource, changes: &ChangeSet) -> Result<String, DatabaseError> {
        if changes.is_empty() {
            return Err(DatabaseError::Query("UPDATE requires at least one column".to_string()));
        }
        let assignments: Vec<String> = changes
            .columns()
            .enumerate()
            .map(|(i, column)| format!("{} = ${}", column, i + 1))
            .collect();
        Ok(format!(
            "UPDATE {} SET {} WHERE {} = ${}",
            self.table(resource),
            assignments.join(", "),
            resource.id_column,
            changes.len() + 1
        ))
    }

    pub fn delete(&self, resource: &Resource) -> String {
        format!(
            "DELETE FROM {} WHERE {} = $1",
            self.table(resource),
            resource.id_column
        )
    }

    pub fn create_schema(&self) -> String {
        format!("CREATE SCHEMA IF NOT EXISTS {}", quote_identifier(&self.schema))
    }

    pub fn create_table(&self, resource: &Resource) -> String {
        let mut columns: Vec<String> = resource
            .columns
            .iter()
            .map(|c| {
                if *c == resource.id_column {
                    format!("{} TEXT PRIMARY KEY", c)
                } else {
                    format!("{} TEXT NOT NULL", c)
                }
            })
            .collect();
        columns.push(format!(
            "{} TIMESTAMPTZ NOT NULL DEFAULT now()",
            resource.registration_column
        ));
        format!(
            "CREATE TABLE IF NOT EXISTS {} ({})",
            self.table(resource),
            columns.join(", ")
        )
    }
}

/// Quote SQL identifier to prevent injection
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Plain Postgres identifier: letter or underscore first, then [a-zA-Z0-9_],
/// at most 63 bytes
pub fn is_valid_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    name.len() <= 63 && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::{ASSET, GATEWAY};
    use serde_json::json;

    fn builder() -> QueryBuilder {
        QueryBuilder::new("geofence").unwrap()
    }

    #[test]
    fn validates_schema_names() {
        assert!(QueryBuilder::new("public").is_ok());
        assert!(QueryBuilder::new("_geo_2").is_ok());
        assert!(QueryBuilder::new("2geo").is_err());
        assert!(QueryBuilder::new("geo-fence").is_err());
        assert!(QueryBuilder::new("public; DROP TABLE assets").is_err());
        assert!(QueryBuilder::new("").is_err());
    }

    #[test]
    fn select_all_orders_by_registration_then_id() {
        let sql = builder().select_all(&ASSET, &["asset_id", "asset_type"]);
        assert_eq!(
            sql,
            "SELECT asset_id, asset_type FROM \"geofence\".\"assets\" ORDER BY asset_registration_time, asset_id"
        );
    }

    #[test]
    fn exists_and_delete_filter_by_primary_key() {
        let b = builder();
        assert_eq!(b.exists(&GATEWAY), "SELECT 1 FROM \"geofence\".\"gateways\" WHERE gateway_id = $1");
        assert_eq!(b.delete(&GATEWAY), "DELETE FROM \"geofence\".\"gateways\" WHERE gateway_id = $1");
    }

    #[test]
    fn insert_binds_every_column_and_registration_time() {
        let sql = builder().insert(&ASSET);
        assert!(sql.starts_with("INSERT INTO \"geofence\".\"assets\" (asset_id, asset_type,"));
        assert!(sql.contains("asset_tags, asset_registration_time)"));
        assert!(sql.ends_with("VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"));
    }

    #[test]
    fn update_assigns_exactly_the_supplied_columns() {
        let changes = ChangeSet::from_json(
            &GATEWAY,
            json!({ "gateway_status": "offline", "gateway_location": "floor 2" }),
        )
        .unwrap();
        let sql = builder().update(&GATEWAY, &changes).unwrap();
        assert_eq!(
            sql,
            "UPDATE \"geofence\".\"gateways\" SET gateway_status = $1, gateway_location = $2 WHERE gateway_id = $3"
        );
    }

    #[test]
    fn create_table_declares_primary_key() {
        let sql = builder().create_table(&ASSET);
        assert!(sql.starts_with("CREATE TABLE IF NOT EXISTS \"geofence\".\"assets\" (asset_id TEXT PRIMARY KEY"));
        assert!(sql.contains("asset_registration_time TIMESTAMPTZ NOT NULL DEFAULT now()"));
    }

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_identifier("assets"), "\"assets\"");
        assert_eq!(quote_identifier("a\"b"), "\"a\"\"b\"");
    }
}
