//! Span capture for asserting on pipeline and background-task spans.

use std::sync::{Arc, Mutex};

use tracing::Dispatch;
use tracing::Subscriber;
use tracing::dispatcher::DefaultGuard;
use tracing::span::{Attributes, Id, Record};
use tracing_subscriber::Layer;
use tracing_subscriber::Registry;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::registry::LookupSpan;

const CAPTURED_TARGET: &str = "interpose";

/// Captured span information.
#[derive(Debug, Clone)]
pub struct CapturedSpan {
    pub id: u64,
    pub parent_id: Option<u64>,
    /// Span name, e.g. `background_task`.
    pub name: String,
    /// Span target, e.g. `interpose::offload::runner`.
    pub target: String,
    /// Field values rendered as strings.
    pub fields: Vec<(String, String)>,
}

impl CapturedSpan {
    /// Value of `field`, if recorded.
    pub fn field(&self, field: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value.as_str())
    }
}

/// Layer recording every span whose target belongs to the interpose crates.
pub struct SpanCaptureLayer {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
}

struct FieldVisitor {
    fields: Vec<(String, String)>,
}

impl tracing::field::Visit for FieldVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.fields
            .push((field.name().to_string(), format!("{value:?}")));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.fields
            .push((field.name().to_string(), value.to_string()));
    }

    fn record_bool(&mut self, field: &tracing::field::Field, value: bool) {
        self.fields
            .push((field.name().to_string(), value.to_string()));
    }

    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        self.fields
            .push((field.name().to_string(), value.to_string()));
    }
}

fn is_captured(target: &str) -> bool {
    target.starts_with(CAPTURED_TARGET)
}

impl<S> Layer<S> for SpanCaptureLayer
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(&self, attrs: &Attributes<'_>, id: &Id, ctx: Context<'_, S>) {
        let metadata = attrs.metadata();
        if !is_captured(metadata.target()) {
            return;
        }

        let mut visitor = FieldVisitor { fields: Vec::new() };
        attrs.record(&mut visitor);

        let parent_id = attrs
            .parent()
            .cloned()
            .or_else(|| {
                if attrs.is_contextual() {
                    ctx.current_span().id().cloned()
                } else {
                    None
                }
            })
            .map(|id| id.into_u64());

        self.spans.lock().unwrap().push(CapturedSpan {
            id: id.into_u64(),
            parent_id,
            name: metadata.name().to_string(),
            target: metadata.target().to_string(),
            fields: visitor.fields,
        });
    }

    fn on_record(&self, id: &Id, values: &Record<'_>, ctx: Context<'_, S>) {
        let Some(span_ref) = ctx.span(id) else {
            return;
        };
        if !is_captured(span_ref.metadata().target()) {
            return;
        }

        let mut visitor = FieldVisitor { fields: Vec::new() };
        values.record(&mut visitor);

        let span_id = id.into_u64();
        let mut spans = self.spans.lock().unwrap();
        if let Some(captured) = spans.iter_mut().find(|s| s.id == span_id) {
            for (key, value) in visitor.fields {
                match captured.fields.iter_mut().find(|(k, _)| *k == key) {
                    Some(existing) => existing.1 = value,
                    None => captured.fields.push((key, value)),
                }
            }
        }
    }
}

/// Handle on the spans captured by a [`SpanCaptureLayer`].
#[derive(Clone)]
pub struct SpanCollector {
    spans: Arc<Mutex<Vec<CapturedSpan>>>,
    dispatch: Dispatch,
}

/// Creates a collector with its own dispatch.
pub fn create_span_collector() -> SpanCollector {
    let spans = Arc::new(Mutex::new(Vec::new()));
    let layer = SpanCaptureLayer {
        spans: spans.clone(),
    };
    let dispatch = Dispatch::new(Registry::default().with(layer));
    SpanCollector { spans, dispatch }
}

impl SpanCollector {
    pub fn dispatch(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn spans(&self) -> Vec<CapturedSpan> {
        self.spans.lock().unwrap().clone()
    }

    /// Captured span names in creation order.
    pub fn span_names(&self) -> Vec<String> {
        self.spans
            .lock()
            .unwrap()
            .iter()
            .map(|s| s.name.clone())
            .collect()
    }

    /// All captured spans called `name`.
    pub fn named(&self, name: &str) -> Vec<CapturedSpan> {
        self.spans
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.name == name)
            .cloned()
            .collect()
    }

    pub fn has_span(&self, name: &str) -> bool {
        self.spans.lock().unwrap().iter().any(|s| s.name == name)
    }

    /// Last captured span called `name`.
    pub fn get_span(&self, name: &str) -> Option<CapturedSpan> {
        self.spans
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|s| s.name == name)
            .cloned()
    }

    pub fn get_field(&self, span_name: &str, field_name: &str) -> Option<String> {
        self.get_span(span_name)
            .and_then(|s| s.field(field_name).map(String::from))
    }

    /// Spans whose parent is `parent`.
    pub fn children_of(&self, parent: &CapturedSpan) -> Vec<CapturedSpan> {
        self.spans
            .lock()
            .unwrap()
            .iter()
            .filter(|s| s.parent_id == Some(parent.id))
            .cloned()
            .collect()
    }

    pub fn clear(&self) {
        self.spans.lock().unwrap().clear();
    }

    /// Asserts the given spans appear in order, allowing others in between.
    pub fn assert_span_sequence(&self, expected: &[&str]) {
        let names = self.span_names();
        let mut expected_iter = expected.iter();
        let mut current_expected = expected_iter.next();

        for name in &names {
            if let Some(exp) = current_expected
                && name == *exp
            {
                current_expected = expected_iter.next();
            }
        }

        if current_expected.is_some() {
            panic!("Expected span sequence {expected:?} but got {names:?}");
        }
    }
}

/// Runs `f` with span capture enabled on the current thread.
pub fn with_span_capture<F, R>(f: F) -> (R, SpanCollector)
where
    F: FnOnce() -> R,
{
    let collector = create_span_collector();
    let result = tracing::dispatcher::with_default(collector.dispatch(), f);
    (result, collector)
}

/// Enables span capture on the current thread until the guard is dropped.
///
/// Use with a current-thread runtime so spawned background tasks report to
/// the same collector.
pub fn set_span_capture() -> (SpanCollector, DefaultGuard) {
    let collector = create_span_collector();
    let guard = tracing::dispatcher::set_default(collector.dispatch());
    (collector, guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{Level, span};

    #[test]
    fn captures_interpose_targets_only() {
        let ((), collector) = with_span_capture(|| {
            let ours = span!(target: "interpose::pipeline", Level::INFO, "pipeline", method = "GET");
            let _enter = ours.enter();
            let theirs = span!(target: "other", Level::INFO, "unrelated");
            let _inner = theirs.enter();
        });

        assert_eq!(collector.span_names(), vec!["pipeline"]);
        assert!(collector.has_span("pipeline"));
        assert!(!collector.has_span("unrelated"));
        assert_eq!(
            collector.get_field("pipeline", "method"),
            Some("GET".to_string())
        );

        collector.clear();
        assert!(collector.spans().is_empty());
    }

    #[test]
    fn records_parent_and_late_fields() {
        let ((), collector) = with_span_capture(|| {
            let outer = span!(target: "interpose::offload", Level::INFO, "background_task");
            let _enter = outer.enter();
            let inner = span!(
                target: "interpose::pipeline",
                Level::INFO,
                "pipeline",
                status = tracing::field::Empty
            );
            inner.record("status", "hit");
        });

        collector.assert_span_sequence(&["background_task", "pipeline"]);
        let outer = collector.get_span("background_task").unwrap();
        let children = collector.children_of(&outer);
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].field("status"), Some("hit"));
    }
}
