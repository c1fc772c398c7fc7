/// Static description of one of the two managed tables.
///
/// Handlers and stores are written once against this descriptor; the
/// asset and gateway kinds differ only in the values below.
#[derive(Debug, PartialEq, Eq)]
pub struct Resource {
    /// Table name inside the configured schema
    pub table: &'static str,
    /// Singular label used in client messages ("Asset")
    pub label: &'static str,
    /// Plural used in collection messages ("assets")
    pub plural: &'static str,
    pub id_column: &'static str,
    /// Client-visible columns in declared order, primary key first
    pub columns: &'static [&'static str],
    /// Server-stamped insert time, never part of `columns`
    pub registration_column: &'static str,
}

impl Resource {
    /// Columns a client may change after creation
    pub fn mutable_columns(&self) -> &'static [&'static str] {
        let columns: &'static [&'static str] = self.columns;
        &columns[1..]
    }

    /// Look up a mutable column by the name a client sent.
    /// Returns the static name so it can be spliced into SQL safely.
    pub fn mutable_column(&self, name: &str) -> Option<&'static str> {
        self.mutable_columns().iter().copied().find(|c| *c == name)
    }

    /// Declared columns followed by the registration time
    pub fn full_row(&self) -> Vec<&'static str> {
        let mut cols = self.columns.to_vec();
        cols.push(self.registration_column);
        cols
    }

    pub fn already_exists_message(&self) -> String {
        format!("{} already exists", self.label)
    }

    pub fn not_found_message(&self) -> String {
        format!("{} details not found", self.label)
    }

    pub fn none_found_message(&self) -> String {
        format!("No {} found", self.plural)
    }

    pub fn added_message(&self) -> String {
        format!("{} details added successfully", self.label)
    }

    pub fn updated_message(&self) -> String {
        format!("{} details updated successfully", self.label)
    }

    pub fn deleted_message(&self) -> String {
        format!("{} details deleted successfully", self.label)
    }
}

/// Two-column read-only slice of a resource: its id plus one attribute
#[derive(Debug)]
pub struct Projection {
    pub resource: &'static Resource,
    pub column: &'static str,
    /// Noun used when the table is empty ("asset types")
    pub noun: &'static str,
}

impl Projection {
    pub fn columns(&self) -> [&'static str; 2] {
        [self.resource.id_column, self.column]
    }

    pub fn none_found_message(&self) -> String {
        format!("No {} found", self.noun)
    }
}

#[cfg(test)]
mod tests {
    use crate::database::models::{ASSET, ASSET_TYPES, GATEWAY, GATEWAY_CONNECTIONS};

    #[test]
    fn mutable_columns_exclude_key_and_registration_time() {
        for resource in [&ASSET, &GATEWAY] {
            let mutable = resource.mutable_columns();
            assert!(!mutable.contains(&resource.id_column));
            assert!(!mutable.contains(&resource.registration_column));
            assert_eq!(mutable.len(), resource.columns.len() - 1);
        }
    }

    #[test]
    fn mutable_column_lookup() {
        assert_eq!(ASSET.mutable_column("asset_status"), Some("asset_status"));
        assert_eq!(ASSET.mutable_column("asset_id"), None);
        assert_eq!(ASSET.mutable_column("asset_registration_time"), None);
        assert_eq!(ASSET.mutable_column("gateway_status"), None);
    }

    #[test]
    fn full_row_appends_registration_time() {
        let row = GATEWAY.full_row();
        assert_eq!(row.first(), Some(&"gateway_id"));
        assert_eq!(row.last(), Some(&"gateway_registration_time"));
        assert_eq!(row.len(), 11);
    }

    #[test]
    fn messages_follow_resource_label() {
        assert_eq!(ASSET.none_found_message(), "No assets found");
        assert_eq!(GATEWAY.already_exists_message(), "Gateway already exists");
        assert_eq!(ASSET.not_found_message(), "Asset details not found");
        assert_eq!(ASSET_TYPES.none_found_message(), "No asset types found");
        assert_eq!(
            GATEWAY_CONNECTIONS.columns(),
            ["gateway_id", "gateway_connectivity_info"]
        );
    }
}
