//! Configuration management module

pub mod env;
pub mod parser;
pub mod validation;

pub use env::{EnvManager, EnvOverrides};
pub use parser::{display_config_summary, load_config, ConfigParser};
pub use validation::{test_server_connectivity, validate_config, ConfigValidator, ValidationWarning};

pub use crate::models::{AppConfig, RunConfig};
