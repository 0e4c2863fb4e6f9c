//! # Event Dispatch
//!
//! Lookup table from event type to handler, built once at startup.
//!
//! ```text
//!   VerifiedEvent ──► HandlerRegistry ──► "payment_intent.succeeded"   ──► handler
//!                                    ├──► "checkout.session.completed" ──► handler
//!                                    └──► anything else                ──► Ignored
//! ```

use crate::error::HandlerError;
use crate::event::VerifiedEvent;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// A handler for one event type.
///
/// Handlers receive the event payload (the body without its `type` member).
/// Any `Fn(&Value) -> Result<(), HandlerError>` closure is a handler.
pub trait EventHandler: Send + Sync {
    fn handle(&self, payload: &Value) -> Result<(), HandlerError>;
}

impl<F> EventHandler for F
where
    F: Fn(&Value) -> Result<(), HandlerError> + Send + Sync,
{
    fn handle(&self, payload: &Value) -> Result<(), HandlerError> {
        self(payload)
    }
}

/// Outcome of a successful dispatch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// A registered handler ran and returned Ok
    Handled(String),
    /// No handler is registered for this type
    Ignored(String),
}

impl Dispatched {
    pub fn event_type(&self) -> &str {
        match self {
            Dispatched::Handled(t) | Dispatched::Ignored(t) => t,
        }
    }
}

/// Event type -> handler table
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn EventHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler, replacing any previous one for the same type
    pub fn register(&mut self, event_type: impl Into<String>, handler: impl EventHandler + 'static) {
        self.handlers.insert(event_type.into(), Arc::new(handler));
    }

    /// Register with builder pattern
    pub fn with_handler(
        mut self,
        event_type: impl Into<String>,
        handler: impl EventHandler + 'static,
    ) -> Self {
        self.register(event_type, handler);
        self
    }

    /// Register a closure handler
    pub fn register_fn<F>(&mut self, event_type: impl Into<String>, handler: F)
    where
        F: Fn(&Value) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.register(event_type, handler);
    }

    /// Register a closure with builder pattern
    pub fn with_fn<F>(mut self, event_type: impl Into<String>, handler: F) -> Self
    where
        F: Fn(&Value) -> Result<(), HandlerError> + Send + Sync + 'static,
    {
        self.register_fn(event_type, handler);
        self
    }

    pub fn has_handler(&self, event_type: &str) -> bool {
        self.handlers.contains_key(event_type)
    }

    /// Registered event types, sorted
    pub fn event_types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the handler registered for the event's type.
    ///
    /// Unregistered types are logged and reported as `Dispatched::Ignored`.
    pub fn dispatch(&self, event: &VerifiedEvent) -> Result<Dispatched, HandlerError> {
        let event_type = event.event_type();

        match self.handlers.get(event_type) {
            Some(handler) => {
                handler.handle(event.payload())?;
                info!(event_type, event_id = ?event.id(), "Handled webhook event");
                Ok(Dispatched::Handled(event_type.to_string()))
            }
            None => {
                debug!(event_type, "Unhandled event type");
                Ok(Dispatched::Ignored(event_type.to_string()))
            }
        }
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("event_types", &self.event_types())
            .finish()
    }
}

/// Dispatch a verified event to the matching handler in `handlers`
pub fn dispatch(event: &VerifiedEvent, handlers: &HandlerRegistry) -> Result<Dispatched, HandlerError> {
    handlers.dispatch(event)
}
