//! Custom tracing layer for JSONL output.
//!
//! Each event becomes one JSON object with the correlation ids of the
//! enclosing stage span lifted to top-level keys.

use std::io::{self, Write};
use std::sync::Mutex;

use chrono::Utc;
use tracing::field::{Field, Visit};
use tracing::span::{Attributes, Id};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::Layer;

use super::events::Level;

/// Correlation ids stored on a span.
#[derive(Debug, Clone, Default)]
struct SpanContext {
    run_id: Option<String>,
    study_id: Option<String>,
    stage: Option<String>,
}

impl SpanContext {
    fn set(&mut self, name: &str, value: String) {
        if value.is_empty() {
            return;
        }
        match name {
            "run_id" => self.run_id = Some(value),
            "study_id" => self.study_id = Some(value),
            "stage" => self.stage = Some(value),
            _ => {}
        }
    }
}

impl Visit for SpanContext {
    fn record_str(&mut self, field: &Field, value: &str) {
        self.set(field.name(), value.to_string());
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        self.set(field.name(), format!("{:?}", value));
    }
}

/// Collects event fields into a JSON map.
struct JsonFieldVisitor {
    fields: serde_json::Map<String, serde_json::Value>,
    message: Option<String>,
}

impl JsonFieldVisitor {
    fn new() -> Self {
        JsonFieldVisitor {
            fields: serde_json::Map::new(),
            message: None,
        }
    }

    fn insert(&mut self, field: &Field, value: serde_json::Value) {
        self.fields.insert(field.name().to_string(), value);
    }
}

impl Visit for JsonFieldVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.insert(field, serde_json::Value::String(value.to_string()));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        let s = format!("{:?}", value);
        if field.name() == "message" {
            self.message = Some(s);
        } else {
            self.insert(field, serde_json::Value::String(s));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, serde_json::Value::Number(value.into()));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, serde_json::Value::Number(value.into()));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        // NaN and infinities have no JSON number form
        let v = serde_json::Number::from_f64(value)
            .map(serde_json::Value::Number)
            .unwrap_or_else(|| serde_json::Value::String(value.to_string()));
        self.insert(field, v);
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, serde_json::Value::Bool(value));
    }
}

/// JSONL tracing layer, stderr by default.
pub struct JsonlLayer<W = io::Stderr> {
    writer: Mutex<W>,
}

impl JsonlLayer<io::Stderr> {
    pub fn stderr() -> Self {
        JsonlLayer {
            writer: Mutex::new(io::stderr()),
        }
    }
}

impl<W: Write> JsonlLayer<W> {
    /// Layer writing to an arbitrary sink.
    pub fn new(writer: W) -> Self {
        JsonlLayer {
            writer: Mutex::new(writer),
        }
    }
}

impl<S, W> Layer<S> for JsonlLayer<W>
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    W: Write + 'static,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let mut context = SpanContext::default();
        attrs.record(&mut context);
        if let Some(span) = ctx.span(id) {
            span.extensions_mut().insert(context);
        }
    }

    fn on_event(&self, event: &Event<'_>, ctx: Context<'_, S>) {
        let ts = Utc::now();

        // innermost span wins for each key
        let mut merged = SpanContext::default();
        if let Some(scope) = ctx.event_scope(event) {
            for span in scope {
                if let Some(span_ctx) = span.extensions().get::<SpanContext>() {
                    if merged.run_id.is_none() {
                        merged.run_id.clone_from(&span_ctx.run_id);
                    }
                    if merged.study_id.is_none() {
                        merged.study_id.clone_from(&span_ctx.study_id);
                    }
                    if merged.stage.is_none() {
                        merged.stage.clone_from(&span_ctx.stage);
                    }
                }
            }
        }

        let mut visitor = JsonFieldVisitor::new();
        event.record(&mut visitor);

        let level: Level = (*event.metadata().level()).into();
        let mut obj = serde_json::Map::new();
        obj.insert("ts".to_string(), serde_json::json!(ts.to_rfc3339()));
        obj.insert("level".to_string(), serde_json::json!(level));
        obj.insert(
            "event".to_string(),
            serde_json::json!(event.metadata().target()),
        );
        for (key, value) in [
            ("run_id", merged.run_id),
            ("study_id", merged.study_id),
            ("stage", merged.stage),
            ("message", visitor.message),
        ] {
            if let Some(v) = value {
                obj.insert(key.to_string(), serde_json::json!(v));
            }
        }
        if !visitor.fields.is_empty() {
            obj.insert(
                "fields".to_string(),
                serde_json::Value::Object(visitor.fields),
            );
        }

        let json = serde_json::to_string(&serde_json::Value::Object(obj)).unwrap_or_default();
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", json);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::{event_names, LogContext, Stage};
    use qc_common::{RunId, StudyId};
    use std::sync::Arc;
    use tracing_subscriber::layer::SubscriberExt;

    struct BufWriter(Arc<Mutex<Vec<u8>>>);

    impl Write for BufWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn capture(f: impl FnOnce()) -> Vec<serde_json::Value> {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let layer = JsonlLayer::new(BufWriter(buffer.clone()));
        let subscriber = tracing_subscriber::registry().with(layer);
        tracing::subscriber::with_default(subscriber, f);
        let bytes = buffer.lock().unwrap().clone();
        String::from_utf8_lossy(&bytes)
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect()
    }

    #[test]
    fn event_becomes_one_json_line() {
        let lines = capture(|| {
            tracing::warn!(target: "ingest.row_dropped", row = 3_u64, message = "bad latitude");
        });
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["level"], "warn");
        assert_eq!(lines[0]["event"], "ingest.row_dropped");
        assert_eq!(lines[0]["message"], "bad latitude");
        assert_eq!(lines[0]["fields"]["row"], 3);
        assert!(lines[0]["ts"].is_string());
    }

    #[test]
    fn span_context_is_lifted() {
        let ctx = LogContext::new(RunId("run-aaaaaaaaaaaa".to_string()))
            .with_study_id(StudyId("qc-20260115-143022-a7xq".to_string()));
        let lines = capture(|| {
            let span = ctx.span(Stage::Regress);
            let _guard = span.enter();
            tracing::info!(target: event_names::REGRESS_FINISHED, delta_aic = -3.5, converged = true, "fit done");
        });
        assert_eq!(lines[0]["run_id"], "run-aaaaaaaaaaaa");
        assert_eq!(lines[0]["study_id"], "qc-20260115-143022-a7xq");
        assert_eq!(lines[0]["stage"], "regress");
        assert_eq!(lines[0]["fields"]["delta_aic"], -3.5);
        assert_eq!(lines[0]["fields"]["converged"], true);
    }

    #[test]
    fn non_finite_floats_stay_valid_json() {
        let lines = capture(|| {
            tracing::info!(target: "x", value = f64::NAN, "nan");
        });
        assert_eq!(lines[0]["fields"]["value"], "NaN");
    }

    #[test]
    fn empty_span_ids_are_omitted() {
        let ctx = LogContext::new(RunId("run-bbbbbbbbbbbb".to_string()));
        let lines = capture(|| {
            let span = ctx.span(Stage::Encode);
            let _guard = span.enter();
            tracing::info!(target: "encode.finished", "ok");
        });
        assert!(lines[0].get("study_id").is_none());
    }
}
