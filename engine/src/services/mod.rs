// Engine services
pub mod emissions_service;

pub use emissions_service::EmissionsService;
