//! A klog-style JSON encoder for `tracing-subscriber`
//!
//! Every event becomes one JSON object per line. Span fields are stored as JSON
//! by [`JsonFields`] so they can be merged into the record without being
//! escaped twice, and string values that are themselves `key=value` text are
//! lifted into nested objects (see [`logfmt`](crate::logfmt)).
use crate::logfmt;
use serde_json::{Map, Value};
use std::fmt::{self, Write as _};
use tracing::{
    field::{Field, Visit},
    span, Event, Subscriber,
};
use tracing_subscriber::{
    field::RecordFields,
    fmt::{
        format::Writer,
        time::{FormatTime, SystemTime},
        FmtContext, FormatEvent, FormatFields, FormattedFields,
    },
    registry::LookupSpan,
};

const MESSAGE_FIELD: &str = "message";

/// Collects recorded fields into a JSON object
#[derive(Default)]
struct JsonVisitor {
    fields: Map<String, Value>,
    message: Option<String>,
}

impl JsonVisitor {
    fn with_fields(fields: Map<String, Value>) -> Self {
        Self { fields, message: None }
    }

    fn insert(&mut self, field: &Field, value: Value) {
        self.fields.insert(field.name().to_owned(), value);
    }

    fn insert_text(&mut self, field: &Field, text: &str) {
        if field.name() == MESSAGE_FIELD {
            self.message = Some(text.to_owned());
            return;
        }
        let value = logfmt::to_object(text)
            .map_or_else(|| Value::String(text.to_owned()), Value::Object);
        self.insert(field, value);
    }

    fn into_object(mut self) -> Map<String, Value> {
        if let Some(message) = self.message.take() {
            self.fields.insert(MESSAGE_FIELD.to_owned(), Value::String(message));
        }
        self.fields
    }
}

impl Visit for JsonVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert_text(field, value);
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert_text(field, &format!("{value:?}"));
    }
}

fn write_object(writer: &mut Writer<'_>, object: Map<String, Value>) -> fmt::Result {
    let encoded = serde_json::to_string(&Value::Object(object)).map_err(|_| fmt::Error)?;
    writer.write_str(&encoded)
}

/// Reads span fields back, whichever [`FormatFields`] stored them
fn stored_fields(stored: &str) -> Map<String, Value> {
    serde_json::from_str(stored)
        .ok()
        .or_else(|| logfmt::parse(stored).map(logfmt::fold))
        .unwrap_or_default()
}

/// Formats span fields as a JSON object
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFields;

impl<'writer> FormatFields<'writer> for JsonFields {
    fn format_fields<R: RecordFields>(
        &self,
        mut writer: Writer<'writer>,
        fields: R,
    ) -> fmt::Result {
        let mut visitor = JsonVisitor::default();
        fields.record(&mut visitor);
        write_object(&mut writer, visitor.into_object())
    }

    fn add_fields(
        &self,
        current: &'writer mut FormattedFields<Self>,
        fields: &span::Record<'_>,
    ) -> fmt::Result {
        let mut visitor = JsonVisitor::with_fields(stored_fields(&current.fields));
        fields.record(&mut visitor);
        current.fields.clear();
        write_object(&mut current.as_writer(), visitor.into_object())
    }
}

/// Formats events as single-line JSON records
///
/// Records carry `ts`, `level`, `logger` (the event target), `caller`, `msg`,
/// the fields of every span in scope (outermost first) and finally the event's
/// own fields. Later fields replace earlier ones with the same key.
#[derive(Debug, Clone)]
pub struct KlogJson<T = SystemTime> {
    timer: T,
    caller: bool,
}

impl Default for KlogJson {
    fn default() -> Self {
        Self {
            timer: SystemTime,
            caller: true,
        }
    }
}

impl<T> KlogJson<T> {
    /// Use another timer for `ts`; a timer that writes nothing drops the key
    #[must_use]
    pub fn with_timer<T2: FormatTime>(self, timer: T2) -> KlogJson<T2> {
        KlogJson {
            timer,
            caller: self.caller,
        }
    }

    /// Whether to record the `file:line` of the call site
    #[must_use]
    pub fn with_caller(self, caller: bool) -> Self {
        Self { caller, ..self }
    }
}

impl<S, N, T> FormatEvent<S, N> for KlogJson<T>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
    T: FormatTime,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let meta = event.metadata();
        let mut record = Map::new();

        let mut ts = String::new();
        self.timer.format_time(&mut Writer::new(&mut ts))?;
        if !ts.is_empty() {
            record.insert("ts".into(), Value::String(ts));
        }
        record.insert("level".into(), Value::String(meta.level().to_string()));
        record.insert("logger".into(), Value::String(meta.target().to_owned()));
        if self.caller {
            if let (Some(file), Some(line)) = (meta.file(), meta.line()) {
                record.insert("caller".into(), Value::String(format!("{file}:{line}")));
            }
        }

        let mut visitor = JsonVisitor::default();
        event.record(&mut visitor);
        record.insert(
            "msg".into(),
            Value::String(visitor.message.take().unwrap_or_default()),
        );

        if let Some(scope) = ctx.event_scope() {
            for span in scope.from_root() {
                let extensions = span.extensions();
                if let Some(stored) = extensions.get::<FormattedFields<N>>() {
                    record.extend(stored_fields(&stored.fields));
                }
            }
        }
        record.extend(visitor.fields);

        write_object(&mut writer, record)?;
        writeln!(writer)
    }
}
