// handlers/mod.rs - route handlers, one module per resource kind
//
// Handlers only extract request parts; the shared CRUD flow lives in
// services::resource_service.
pub mod assets;
pub mod gateways;
pub mod root;
