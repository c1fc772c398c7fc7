use serde::{Deserialize, Serialize};

use super::NewRecord;
use crate::database::resource::{Projection, Resource};

pub static GATEWAY: Resource = Resource {
    table: "gateways",
    label: "Gateway",
    plural: "gateways",
    id_column: "gateway_id",
    columns: &[
        "gateway_id",
        "gateway_name",
        "gateway_description",
        "gateway_location",
        "gateway_coverage_area",
        "gateway_connectivity_info",
        "gateway_status",
        "gateway_firmware_version",
        "gateway_power_source",
        "gateway_config_params",
    ],
    registration_column: "gateway_registration_time",
};

pub static GATEWAY_STATUSES: Projection = Projection {
    resource: &GATEWAY,
    column: "gateway_status",
    noun: "gateway statuses",
};

pub static GATEWAY_CONNECTIONS: Projection = Projection {
    resource: &GATEWAY,
    column: "gateway_connectivity_info",
    noun: "gateway connections",
};

/// Body of `POST /api/gateways`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewGateway {
    pub gateway_id: String,
    pub gateway_name: String,
    pub gateway_description: String,
    pub gateway_location: String,
    pub gateway_coverage_area: String,
    pub gateway_connectivity_info: String,
    pub gateway_status: String,
    pub gateway_firmware_version: String,
    pub gateway_power_source: String,
    pub gateway_config_params: String,
}

impl NewRecord for NewGateway {
    fn resource() -> &'static Resource {
        &GATEWAY
    }

    fn id(&self) -> &str {
        &self.gateway_id
    }

    fn into_values(self) -> Vec<String> {
        vec![
            self.gateway_id,
            self.gateway_name,
            self.gateway_description,
            self.gateway_location,
            self.gateway_coverage_area,
            self.gateway_connectivity_info,
            self.gateway_status,
            self.gateway_firmware_version,
            self.gateway_power_source,
            self.gateway_config_params,
        ]
    }
}
