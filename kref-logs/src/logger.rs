//! Building and installing the process logger
use crate::{
    error::{Error, Result},
    format::LogFormat,
    json::{JsonFields, KlogJson},
};
use std::io::IsTerminal;
use tracing::{dispatcher, level_filters::LevelFilter, Dispatch};
use tracing_subscriber::{
    fmt::{self, MakeWriter},
    layer::SubscriberExt,
    registry, EnvFilter, Layer, Registry,
};

/// How the process should log
///
/// Mirrors the usual klog flags: a format, a `-v` verbosity and an optional set
/// of `RUST_LOG` style directives that take precedence over the verbosity.
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    /// Record encoding
    pub format: LogFormat,
    /// klog style verbosity, `0` logs `INFO` and above
    pub verbosity: u8,
    /// `EnvFilter` directives, overriding `verbosity` when set
    pub filter: Option<String>,
    /// Whether JSON records carry the `file:line` of the call site
    pub caller: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            verbosity: 0,
            filter: None,
            caller: true,
        }
    }
}

impl LoggingOptions {
    /// The most verbose level enabled by `verbosity`
    #[must_use]
    pub fn level(&self) -> LevelFilter {
        match self.verbosity {
            0 => LevelFilter::INFO,
            1..=3 => LevelFilter::DEBUG,
            _ => LevelFilter::TRACE,
        }
    }

    /// The filter selecting which events reach the encoder
    ///
    /// # Errors
    /// Fails when `filter` holds directives that do not parse.
    pub fn env_filter(&self) -> Result<EnvFilter> {
        match self.filter.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            Some(directives) => {
                EnvFilter::try_new(directives).map_err(|source| Error::InvalidFilter {
                    directives: directives.to_owned(),
                    source,
                })
            }
            None => Ok(EnvFilter::new(self.level().to_string())),
        }
    }

    /// Checks the options without building anything
    ///
    /// # Errors
    /// See [`LoggingOptions::env_filter`].
    pub fn validate(&self) -> Result<()> {
        self.env_filter().map(|_| ())
    }

    /// Builds a logger writing to stderr
    ///
    /// # Errors
    /// Fails when the options do not validate.
    pub fn build(&self) -> Result<Logger> {
        self.build_with_writer(std::io::stderr, std::io::stderr().is_terminal())
    }

    /// Builds a logger writing to `writer`
    ///
    /// `ansi` only affects the text encoder.
    ///
    /// # Errors
    /// Fails when the options do not validate.
    pub fn build_with_writer<W>(&self, writer: W, ansi: bool) -> Result<Logger>
    where
        W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
    {
        let filter = self.env_filter()?;
        let encoder: Box<dyn Layer<Registry> + Send + Sync> = match self.format {
            LogFormat::Json => fmt::layer()
                .fmt_fields(JsonFields)
                .event_format(KlogJson::default().with_caller(self.caller))
                .with_writer(writer)
                .boxed(),
            LogFormat::Text => fmt::layer().with_ansi(ansi).with_writer(writer).boxed(),
        };
        let subscriber = registry().with(encoder).with(filter);
        Ok(Logger {
            dispatch: Dispatch::new(subscriber),
            format: self.format,
        })
    }
}

/// An explicitly constructed logger
///
/// Components receive a `Logger` and emit through [`Logger::in_scope`], so tests can
/// capture output per logger without sharing process-wide state. The format is
/// fixed when the logger is built.
#[derive(Clone, Debug)]
pub struct Logger {
    dispatch: Dispatch,
    format: LogFormat,
}

impl Logger {
    /// The encoding this logger was built with
    #[must_use]
    pub fn format(&self) -> LogFormat {
        self.format
    }

    /// The underlying `tracing` dispatcher
    #[must_use]
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    /// Runs `f` with this logger as the current default
    pub fn in_scope<T>(&self, f: impl FnOnce() -> T) -> T {
        dispatcher::with_default(&self.dispatch, f)
    }

    /// Installs this logger as the process-wide default
    ///
    /// Only the first installation in a process takes effect; later calls leave
    /// the existing logger in place and return `false`.
    pub fn install(&self) -> bool {
        let installed = dispatcher::set_global_default(self.dispatch.clone()).is_ok();
        if !installed {
            self.in_scope(|| tracing::debug!("a global logger is already installed, keeping it"));
        }
        installed
    }
}

#[cfg(test)]
mod tests {
    use super::{LogFormat, LoggingOptions};
    use crate::{kref, Error, SharedBuffer};
    use assert_json_diff::assert_json_include;
    use serde_json::{json, Value};
    use tracing::{debug, info, level_filters::LevelFilter};

    fn options(format: LogFormat) -> LoggingOptions {
        LoggingOptions {
            format,
            caller: false,
            ..LoggingOptions::default()
        }
    }

    fn without_ts(line: &str) -> Value {
        let mut record: Value = serde_json::from_str(line).unwrap();
        record.as_object_mut().unwrap().remove("ts");
        record
    }

    /// Drops the leading timestamp of a text line
    fn without_time(line: &str) -> &str {
        line.split_once(' ').map_or(line, |(_, rest)| rest.trim_start())
    }

    #[test]
    fn verbosity_maps_to_levels() {
        let level = |verbosity| LoggingOptions { verbosity, ..LoggingOptions::default() }.level();
        assert_eq!(level(0), LevelFilter::INFO);
        assert_eq!(level(2), LevelFilter::DEBUG);
        assert_eq!(level(4), LevelFilter::TRACE);
    }

    #[test]
    fn invalid_filter_is_rejected() {
        let opts = LoggingOptions {
            filter: Some("kref=notalevel".into()),
            ..LoggingOptions::default()
        };
        assert!(matches!(opts.validate(), Err(Error::InvalidFilter { .. })));
        assert!(opts.build_with_writer(SharedBuffer::new(), false).is_err());
    }

    #[test]
    fn verbosity_zero_suppresses_debug() {
        let buffer = SharedBuffer::new();
        let logger = options(LogFormat::Text)
            .build_with_writer(buffer.clone(), false)
            .unwrap();
        logger.in_scope(|| {
            debug!("hidden");
            info!("shown");
        });
        let lines = buffer.lines();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("shown"));
    }

    #[test]
    fn filter_overrides_verbosity() {
        let buffer = SharedBuffer::new();
        let logger = LoggingOptions {
            filter: Some("debug".into()),
            ..options(LogFormat::Text)
        }
        .build_with_writer(buffer.clone(), false)
        .unwrap();
        logger.in_scope(|| debug!("now visible"));
        assert_eq!(buffer.lines().len(), 1);
    }

    #[test]
    fn json_reencodes_preformatted_fields() {
        let buffer = SharedBuffer::new();
        let logger = options(LogFormat::Json)
            .build_with_writer(buffer.clone(), false)
            .unwrap();
        assert_eq!(logger.format(), LogFormat::Json);
        logger.in_scope(|| info!(x = r#"k="v""#, "nested"));
        let contents = buffer.contents();
        assert!(!contents.contains(r#"k=\"v\""#), "escaped blob in {contents}");
        assert_json_include!(
            actual: without_ts(&buffer.lines()[0]),
            expected: json!({"level": "INFO", "msg": "nested", "x": {"k": "v"}})
        );
    }

    #[test]
    fn text_keeps_preformatted_fields_flat() {
        let buffer = SharedBuffer::new();
        let logger = options(LogFormat::Text)
            .build_with_writer(buffer.clone(), false)
            .unwrap();
        logger.in_scope(|| info!(x = %r#"k="v""#, "flat"));
        assert!(buffer.lines()[0].ends_with(r#"flat x=k="v""#));
    }

    #[test]
    fn lazy_and_eager_refs_render_identically() {
        let refs = [
            kref("default", "pod-1"),
            kref("", "node-a"),
            kref("", ""),
            kref("kube-system", ""),
            kref("ns with spaces", "name=odd"),
            kref("名前空間", "ポッド"),
        ];
        for format in [LogFormat::Text, LogFormat::Json] {
            for pod_ref in &refs {
                let buffer = SharedBuffer::new();
                let logger = options(format).build_with_writer(buffer.clone(), false).unwrap();
                logger.in_scope(|| {
                    info!(pod = %pod_ref, "Test log");
                    info!(pod = %pod_ref.to_string(), "Test log");
                });
                let lines = buffer.lines();
                assert_eq!(lines.len(), 2);
                match format {
                    LogFormat::Text => {
                        assert_eq!(without_time(&lines[0]), without_time(&lines[1]));
                        assert!(lines[0].ends_with(&format!("pod={pod_ref}")));
                    }
                    LogFormat::Json => {
                        assert_eq!(without_ts(&lines[0]), without_ts(&lines[1]));
                        assert_eq!(without_ts(&lines[0])["pod"], json!(pod_ref.to_string()));
                    }
                }
            }
        }
    }

    #[test]
    fn json_string_and_lazy_ref_agree() {
        let buffer = SharedBuffer::new();
        let logger = options(LogFormat::Json)
            .build_with_writer(buffer.clone(), false)
            .unwrap();
        let pod_ref = kref("default", "pod-1");
        logger.in_scope(|| {
            info!(pod = pod_ref.as_value(), "Test log");
            info!(pod = pod_ref.to_string().as_str(), "Test log");
        });
        let lines = buffer.lines();
        assert_eq!(without_ts(&lines[0]), without_ts(&lines[1]));
        assert_eq!(without_ts(&lines[0])["pod"], json!("default/pod-1"));
    }

    #[test]
    fn installing_twice_does_not_panic() {
        let logger = options(LogFormat::Text)
            .build_with_writer(SharedBuffer::new(), false)
            .unwrap();
        logger.install();
        assert!(!logger.install());
    }
}
