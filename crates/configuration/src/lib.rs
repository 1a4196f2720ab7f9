//! Configuration of an asynq deployment: which backend to execute against,
//! how executions are tuned, and what diagnostics they emit.

pub mod configuration;
pub mod environment;
pub mod error;
pub mod to_runtime_configuration;
pub mod values;
pub mod version1;

pub use configuration::{Configuration, Connection};
pub use to_runtime_configuration::make_runtime_configuration;
pub use values::{Backend, ConnectionUri, Secret};
pub use version1::{
    parse_configuration, write_parsed_configuration, ConnectionSettings, DiagnosticsSettings,
    ExecutionSettings, ParsedConfiguration,
};
