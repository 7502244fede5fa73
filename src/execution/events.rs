//! Typed events delivered to the caller and the bus that carries them

use crate::core::Stage;
use crate::toolchain::ToolchainInventory;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// Events emitted while building or scanning
#[derive(Debug, Clone)]
pub enum PipelineEvent {
    /// Progress text or a chunk of tool output
    Output(String),

    /// A run entered a new stage
    StageChanged { run_id: Uuid, stage: Stage },

    /// The run succeeded; carries the directory holding the deployed executable
    Finished(PathBuf),

    /// The run failed or was stopped
    Error(String),

    /// A toolchain scan completed
    ToolchainsDiscovered(ToolchainInventory),
}

/// Type for event handlers
pub type EventHandler = Arc<dyn Fn(PipelineEvent) + Send + Sync>;

/// Fan-out of events to registered handlers.
///
/// Cheap to clone; clones share the handler list. Handlers are called
/// synchronously from whichever task or blocking thread emits.
#[derive(Clone, Default)]
pub struct EventBus {
    handlers: Arc<Mutex<Vec<EventHandler>>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an event handler
    pub fn add_handler<F>(&self, handler: F)
    where
        F: Fn(PipelineEvent) + Send + Sync + 'static,
    {
        if let Ok(mut handlers) = self.handlers.lock() {
            handlers.push(Arc::new(handler));
        }
    }

    /// Emit an event to all handlers
    pub fn emit(&self, event: PipelineEvent) {
        // Snapshot so a handler may register another handler without deadlocking
        let handlers: Vec<EventHandler> = match self.handlers.lock() {
            Ok(handlers) => handlers.clone(),
            Err(_) => return,
        };
        for handler in handlers {
            handler(event.clone());
        }
    }

    pub fn output(&self, text: impl Into<String>) {
        self.emit(PipelineEvent::Output(text.into()));
    }

    pub fn warning(&self, text: impl AsRef<str>) {
        self.emit(PipelineEvent::Output(format!("[Warning] {}\n", text.as_ref())));
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.handlers.lock().map(|h| h.len()).unwrap_or(0);
        f.debug_struct("EventBus").field("handlers", &count).finish()
    }
}
