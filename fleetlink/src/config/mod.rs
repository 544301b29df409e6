//! Configuration file handling for `~/.fleetlink/config.ini`.
//!
//! The file is optional. Missing sections and keys fall back to defaults,
//! present keys are validated, and the result converts into the runtime
//! configuration objects used by [`crate::session`] and [`crate::live`].
//!
//! # Example
//!
//! ```
//! use fleetlink::config::ConfigFile;
//!
//! let config = ConfigFile::default();
//! let session = config.session_config();
//! assert_eq!(session.monitor.focal_id, "V1234");
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    ConfigFile, LiveSettings, LoggingSettings, MonitorSettings, SimulationSettings, StoreSettings,
};
