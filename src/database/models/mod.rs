pub mod asset;
pub mod gateway;

pub use asset::{NewAsset, ASSET, ASSET_STATUSES, ASSET_TYPES};
pub use gateway::{NewGateway, GATEWAY, GATEWAY_CONNECTIONS, GATEWAY_STATUSES};

use super::resource::Resource;

/// A complete create payload for one resource kind
pub trait NewRecord {
    fn resource() -> &'static Resource;

    fn id(&self) -> &str;

    /// Field values in the resource's declared column order
    fn into_values(self) -> Vec<String>;
}
