use std::sync::{Arc, Mutex};

use serde_json::Value;
use tracing::{error, info};

/// Cross-cutting analytics hook. Injected into the state machines by
/// constructor so tests can substitute a recording fake; never reached
/// through a global.
pub trait Tracker: Send + Sync {
    fn track_event(&self, name: &str, properties: Value);
    fn track_error(&self, scope: &str, message: &str);
}

/// Production tracker backed by the tracing pipeline.
#[derive(Debug, Default, Clone)]
pub struct TracingTracker;

impl Tracker for TracingTracker {
    fn track_event(&self, name: &str, properties: Value) {
        info!(event = name, %properties, "analytics event");
    }

    fn track_error(&self, scope: &str, message: &str) {
        error!(scope, message, "analytics error");
    }
}

/// No-op tracker for callers that opt out of analytics entirely.
#[derive(Debug, Default, Clone)]
pub struct NoopTracker;

impl Tracker for NoopTracker {
    fn track_event(&self, _name: &str, _properties: Value) {}
    fn track_error(&self, _scope: &str, _message: &str) {}
}

/// Test fake that records every call for assertion.
#[derive(Debug, Default, Clone)]
pub struct RecordingTracker {
    events: Arc<Mutex<Vec<(String, Value)>>>,
    errors: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, Value)> {
        self.events.lock().expect("mutex poisoned").clone()
    }

    pub fn errors(&self) -> Vec<(String, String)> {
        self.errors.lock().expect("mutex poisoned").clone()
    }

    pub fn event_names(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .map(|(name, _)| name)
            .collect()
    }
}

impl Tracker for RecordingTracker {
    fn track_event(&self, name: &str, properties: Value) {
        self.events
            .lock()
            .expect("mutex poisoned")
            .push((name.to_string(), properties));
    }

    fn track_error(&self, scope: &str, message: &str) {
        self.errors
            .lock()
            .expect("mutex poisoned")
            .push((scope.to_string(), message.to_string()));
    }
}
