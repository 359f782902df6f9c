// src/gps/dispatch.rs
//! Routing of validated sentences to per-tag handlers

use super::{
    data::NavState,
    nmea::{FieldError, GgaHandler, RmcHandler},
};
use std::{collections::HashMap, fmt, sync::Arc};
use thiserror::Error;
use tracing::{debug, trace};

/// Consumes the fields of one sentence (tag removed) and updates the state.
///
/// Implementations must parse every field they need before calling
/// [`NavState::update`], so a rejected sentence leaves the state untouched.
pub trait SentenceHandler: Send + Sync {
    fn handle(&self, fields: &[&str], state: &NavState) -> Result<(), FieldError>;
}

impl<F> SentenceHandler for F
where
    F: Fn(&[&str], &NavState) -> Result<(), FieldError> + Send + Sync,
{
    fn handle(&self, fields: &[&str], state: &NavState) -> Result<(), FieldError> {
        self(fields, state)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("a handler is already registered for {0}")]
    DuplicateTag(String),

    #[error("no handler registered for {0}")]
    UnknownTag(String),
}

/// Result of dispatching one sentence
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    Applied,
    Unhandled,
    Rejected(FieldError),
}

/// Message-type tag to handler table. Several tags may share one handler.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn SentenceHandler>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in handlers. `GN` tags are what multi-constellation
    /// receivers (GPS + GLONASS) send in place of the `GP` ones.
    pub fn standard() -> Self {
        let gga: Arc<dyn SentenceHandler> = Arc::new(GgaHandler);
        let rmc: Arc<dyn SentenceHandler> = Arc::new(RmcHandler);

        let table = [
            ("GPGGA", &gga),
            ("GNGGA", &gga),
            ("GPRMC", &rmc),
            ("GNRMC", &rmc),
        ];

        Self {
            handlers: table
                .into_iter()
                .map(|(tag, handler)| (tag.to_string(), Arc::clone(handler)))
                .collect(),
        }
    }

    /// Register a handler. A tag can only be registered once.
    pub fn register(
        &mut self,
        tag: &str,
        handler: Arc<dyn SentenceHandler>,
    ) -> Result<(), RegistryError> {
        if self.handlers.contains_key(tag) {
            return Err(RegistryError::DuplicateTag(tag.to_string()));
        }
        self.handlers.insert(tag.to_string(), handler);
        Ok(())
    }

    /// Route `alias` to whatever handles `canonical`.
    pub fn alias(&mut self, alias: &str, canonical: &str) -> Result<(), RegistryError> {
        let handler = self
            .handlers
            .get(canonical)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownTag(canonical.to_string()))?;
        self.register(alias, handler)
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.handlers.contains_key(tag)
    }

    /// Registered tags, sorted
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Split a validated payload on commas and hand the fields after the tag
    /// to the matching handler. Unknown tags are dropped without touching state.
    pub fn dispatch(&self, payload: &str, state: &NavState) -> Dispatch {
        let mut tokens = payload.split(',');
        let tag = tokens.next().unwrap_or_default();

        let Some(handler) = self.handlers.get(tag) else {
            trace!(tag, "no handler");
            return Dispatch::Unhandled;
        };

        let fields: Vec<&str> = tokens.collect();
        match handler.handle(&fields, state) {
            Ok(()) => Dispatch::Applied,
            Err(e) => {
                debug!(tag, error = %e, "sentence not applied");
                Dispatch::Rejected(e)
            }
        }
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("tags", &self.tags())
            .finish()
    }
}
