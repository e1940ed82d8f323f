// Shared ESG library: value types plus the validation and formatting rules
// used by the engine and by anything that renders emissions data.

pub mod error;
pub mod models;
pub mod utils;

pub use error::ValidationError;
pub use utils::esg_format::{format_emissions_value, format_with, parse_formatted, NumberFormat};
pub use utils::esg_validation::{
    parse_date, parse_date_range, validate_date_range, validate_emissions_data,
    validate_emissions_value, EmissionsValue,
};
