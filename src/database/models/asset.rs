use serde::{Deserialize, Serialize};

use super::NewRecord;
use crate::database::resource::{Projection, Resource};

pub static ASSET: Resource = Resource {
    table: "assets",
    label: "Asset",
    plural: "assets",
    id_column: "asset_id",
    columns: &[
        "asset_id",
        "asset_type",
        "asset_name",
        "asset_description",
        "asset_location",
        "asset_status",
        "asset_tags",
    ],
    registration_column: "asset_registration_time",
};

pub static ASSET_TYPES: Projection = Projection {
    resource: &ASSET,
    column: "asset_type",
    noun: "asset types",
};

pub static ASSET_STATUSES: Projection = Projection {
    resource: &ASSET,
    column: "asset_status",
    noun: "asset statuses",
};

/// Body of `POST /api/assets`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAsset {
    pub asset_id: String,
    pub asset_type: String,
    pub asset_name: String,
    pub asset_description: String,
    pub asset_location: String,
    pub asset_status: String,
    pub asset_tags: String,
}

impl NewRecord for NewAsset {
    fn resource() -> &'static Resource {
        &ASSET
    }

    fn id(&self) -> &str {
        &self.asset_id
    }

    fn into_values(self) -> Vec<String> {
        vec![
            self.asset_id,
            self.asset_type,
            self.asset_name,
            self.asset_description,
            self.asset_location,
            self.asset_status,
            self.asset_tags,
        ]
    }
}
