//! Custom tracing Layer that saves events through a [`Logger`].
//!
//! Lets code instrumented with `tracing` macros end up in the same JSON
//! output as entries saved directly.

use std::fmt;
use std::sync::Arc;

use tracing::field::{Field, Visit};
use tracing::{Event, Level, Metadata, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use crate::entry::{CallSite, Entry, FieldValue, Fields, Severity};
use crate::logger::Logger;
use crate::DIAGNOSTIC_TARGET;

/// Field carrying the event's formatted message.
const MESSAGE_FIELD: &str = "message";
/// Entry field holding the event target.
pub const TARGET_FIELD: &str = "target";
/// Entry field holding the enclosing span names.
pub const SPAN_FIELD: &str = "span";

/// A tracing Layer that turns events into entries.
///
/// Events from the logger's own diagnostics target are ignored, so a failing
/// save cannot feed back into itself.
pub struct EntryLayer {
    logger: Arc<Logger>,
}

impl EntryLayer {
    pub fn new(logger: Arc<Logger>) -> Self {
        Self { logger }
    }

    pub fn logger(&self) -> &Arc<Logger> {
        &self.logger
    }
}

/// Map a tracing level onto the closed severity set.
pub fn severity_for(level: &Level) -> Severity {
    if *level == Level::ERROR {
        Severity::Error
    } else if *level == Level::WARN {
        Severity::Warning
    } else if *level == Level::INFO {
        Severity::Info
    } else {
        Severity::Debug
    }
}

/// Call site recorded in the event's metadata.
fn event_call_site(metadata: &Metadata<'static>) -> CallSite {
    metadata
        .file()
        .zip(metadata.line())
        .map(|(file, line)| CallSite::new(file, line))
        .unwrap_or_default()
}

/// Names of the spans enclosing `event`, outermost first, joined with `" > "`.
fn span_path<S>(ctx: &Context<'_, S>, event: &Event<'_>) -> Option<String>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    let names: Vec<&str> = ctx.event_scope(event)?.from_root().map(|span| span.name()).collect();
    (!names.is_empty()).then(|| names.join(" > "))
}

impl<S> Layer<S> for EntryLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if metadata.target() == DIAGNOSTIC_TARGET {
            return;
        }

        let mut collected = EventFields::default();
        event.record(&mut collected);

        let mut entry = Entry::at(
            severity_for(metadata.level()),
            collected.message.unwrap_or_default(),
            event_call_site(metadata),
        );
        entry
            .add_fields(collected.fields)
            .add_field(TARGET_FIELD, metadata.target());
        if let Some(path) = span_path(&ctx, event) {
            entry.add_field(SPAN_FIELD, &path);
        }

        self.logger.save(&entry);
    }
}

/// An event's message and the rest of its fields as entry fields.
#[derive(Default)]
struct EventFields {
    message: Option<String>,
    fields: Fields,
}

impl EventFields {
    fn put(&mut self, field: &Field, value: FieldValue) {
        self.fields.insert_value(field.name(), value);
    }

    /// Text values; the `message` field becomes the entry message.
    fn put_text(&mut self, field: &Field, text: String) {
        if field.name() == MESSAGE_FIELD {
            self.message = Some(text);
        } else {
            self.put(field, FieldValue::new(&text));
        }
    }
}

impl Visit for EventFields {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.put_text(field, format!("{:?}", value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.put_text(field, value.to_owned());
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.put(field, FieldValue::new(&value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.put(field, FieldValue::new(&value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.put(field, FieldValue::new(&value));
    }

    // NaN and infinities become null
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.put(field, FieldValue::new(&value));
    }

    /// Errors are recorded with their source chain, outermost first.
    fn record_error(&mut self, field: &Field, value: &(dyn std::error::Error + 'static)) {
        let chain: Vec<String> = std::iter::successors(Some(value), |err| err.source())
            .map(|err| err.to_string())
            .collect();
        self.put(field, FieldValue::new(&chain.join(": ")));
    }
}
