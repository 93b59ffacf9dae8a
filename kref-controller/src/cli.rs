//! Command line flags
use clap::Parser;
use kref_logs::{LogFormat, LoggingOptions};
use std::ffi::OsString;

/// Pod controller demonstrating structured logging with lazy object references
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Log record encoding, `text` or `json`
    #[arg(long = "logging-format", default_value_t = LogFormat::Text)]
    pub logging_format: LogFormat,

    /// Verbosity of the log output, 0 logs INFO and above
    #[arg(short = 'v', long = "v", default_value_t = 0)]
    pub verbosity: u8,

    /// Log filter directives, taking precedence over -v
    #[arg(long = "log-filter", env = "RUST_LOG")]
    pub log_filter: Option<String>,

    /// Leave the call site out of JSON records
    #[arg(long = "log-no-caller")]
    pub log_no_caller: bool,
}

impl Args {
    /// Parses the process arguments after normalizing word separators
    #[must_use]
    pub fn from_env() -> Self {
        Self::parse_from(normalize_word_separators(std::env::args_os()))
    }

    /// The logging options selected by the flags
    #[must_use]
    pub fn logging(&self) -> LoggingOptions {
        LoggingOptions {
            format: self.logging_format,
            verbosity: self.verbosity,
            filter: self.log_filter.clone(),
            caller: !self.log_no_caller,
        }
    }
}

/// Rewrites `_` to `-` in the names of long flags
///
/// `--logging_format=json` and `--logging-format=json` are then the same flag.
/// Values and positional arguments are left untouched.
pub fn normalize_word_separators<I, T>(args: I) -> Vec<OsString>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    args.into_iter()
        .map(Into::into)
        .map(|arg| match arg.to_str() {
            Some(flag) if flag.len() > 2 && flag.starts_with("--") => match flag.split_once('=') {
                Some((name, value)) => format!("{}={value}", name.replace('_', "-")).into(),
                None => flag.replace('_', "-").into(),
            },
            _ => arg,
        })
        .collect()
}
