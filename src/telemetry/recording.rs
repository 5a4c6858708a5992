use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use super::{Span, SpanBackend, TraceSink};

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedSpan {
    pub id: u64,
    pub parent: Option<u64>,
    pub name: &'static str,
    pub attributes: BTreeMap<String, String>,
    pub ended: bool,
}

#[derive(Default)]
struct Recorder {
    next_id: AtomicU64,
    spans: Mutex<Vec<RecordedSpan>>,
}

impl Recorder {
    fn open(self: &Arc<Self>, name: &'static str, parent: Option<u64>) -> RecordingSpan {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.spans
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(RecordedSpan {
                id,
                parent,
                name,
                attributes: BTreeMap::new(),
                ended: false,
            });
        RecordingSpan {
            id,
            recorder: self.clone(),
        }
    }

    fn update(&self, id: u64, f: impl FnOnce(&mut RecordedSpan)) {
        let mut spans = self.spans.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(span) = spans.iter_mut().find(|s| s.id == id) {
            f(span);
        }
    }
}

/// In-memory sink; cloning shares the same recording.
#[derive(Clone, Default)]
pub struct RecordingTraceSink {
    recorder: Arc<Recorder>,
}

struct RecordingSpan {
    id: u64,
    recorder: Arc<Recorder>,
}

impl SpanBackend for RecordingSpan {
    fn set_attribute(&self, key: &str, value: String) {
        self.recorder.update(self.id, |span| {
            span.attributes.insert(key.to_string(), value);
        });
    }

    fn child(&self, name: &'static str) -> Box<dyn SpanBackend> {
        Box::new(self.recorder.open(name, Some(self.id)))
    }

    fn end(&self) {
        self.recorder.update(self.id, |span| span.ended = true);
    }
}

impl RecordingTraceSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn spans(&self) -> Vec<RecordedSpan> {
        self.recorder
            .spans
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// First span with the given name.
    pub fn find(&self, name: &str) -> Option<RecordedSpan> {
        self.spans().into_iter().find(|s| s.name == name)
    }
}

impl TraceSink for RecordingTraceSink {
    fn start_root(&self, name: &'static str) -> Span {
        Span::new(Box::new(self.recorder.open(name, None)))
    }
}
