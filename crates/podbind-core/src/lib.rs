pub mod config;
pub mod offer;
pub mod types;

pub use config::{BindConfig, ConfigError};
pub use offer::{Offer, Resource, ResourceValue, ValueRange};
pub use types::*;
