//! Structured logging for Kubernetes controllers
//!
//! This crate holds the two pieces a controller needs to log the way klog-based
//! tooling expects:
//!
//! - [`ObjectRef`] (and the [`kref`] / [`kobj`] shorthands) to reference an object in a
//!   log field without formatting it unless the event is actually recorded
//! - [`LoggingOptions`] to select between a `text` and a `json` encoder and build a
//!   [`Logger`] from it
//!
//! ```no_run
//! use kref_logs::{kref, LogFormat, LoggingOptions};
//!
//! # fn main() -> Result<(), kref_logs::Error> {
//! let logger = LoggingOptions { format: LogFormat::Json, ..Default::default() }.build()?;
//! logger.install();
//! tracing::info!(pod = %kref("default", "pod-1"), "Test log");
//! # Ok(())
//! # }
//! ```

mod capture;
pub use capture::SharedBuffer;

pub mod error;
pub use error::{Error, Result};

mod format;
pub use format::LogFormat;

pub mod json;
pub use json::{JsonFields, KlogJson};

pub mod logfmt;

mod logger;
pub use logger::{Logger, LoggingOptions};

mod object_ref;
pub use object_ref::{kobj, kref, ObjectRef};
