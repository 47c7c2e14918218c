//! Handler registry and dispatch
//!
//! Handlers are keyed by resource kind and implementation name. Registration
//! order is priority order: [`HandlerRegistry::dispatch`] picks the first
//! handler for a kind that reports itself available on the machine.
//! Availability is probed on every call and never cached.

use std::collections::HashMap;
use std::fmt;

use crate::config::EngineConfig;
use crate::convergence::{Context, HandlerAdapter, Reconcile, ResourceHandler};
use crate::error::{
    Result,
    registry::{none_available, not_found},
};
use crate::handlers::{PackageHandler, ServiceHandler};
use crate::resource::ResourceKind;

/// Registry of resource handlers
#[derive(Default)]
pub struct HandlerRegistry {
    handlers: Vec<Box<dyn ResourceHandler>>,
    by_key: HashMap<(ResourceKind, String), usize>,
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.handlers.iter().map(|h| (h.kind(), h.name())))
            .finish()
    }
}

impl HandlerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the built-in handlers
    pub fn with_defaults(config: &EngineConfig) -> Self {
        let mut registry = Self::new();
        registry.register(ServiceHandler::new(config.service.clone()));
        registry.register(PackageHandler::new(config.package.clone()));
        registry
    }

    /// Register a typed handler
    pub fn register<H: Reconcile + 'static>(&mut self, handler: H) {
        self.register_boxed(Box::new(HandlerAdapter::new(handler)));
    }

    /// Register an already type-erased handler
    ///
    /// A handler registered under an existing `(kind, name)` key replaces the
    /// previous one in place, keeping its priority.
    pub fn register_boxed(&mut self, handler: Box<dyn ResourceHandler>) {
        let key = (handler.kind(), handler.name().to_string());
        match self.by_key.get(&key) {
            Some(&idx) => self.handlers[idx] = handler,
            None => {
                self.by_key.insert(key, self.handlers.len());
                self.handlers.push(handler);
            }
        }
    }

    /// Look up a handler by kind and implementation name
    pub fn get(&self, kind: ResourceKind, name: &str) -> Result<&dyn ResourceHandler> {
        self.by_key
            .get(&(kind, name.to_string()))
            .and_then(|&idx| self.handlers.get(idx))
            .map(|h| &**h)
            .ok_or_else(|| not_found(kind.as_str(), name))
    }

    /// All registered handlers, in priority order
    pub fn all(&self) -> impl Iterator<Item = &dyn ResourceHandler> {
        self.handlers.iter().map(|h| &**h)
    }

    /// Handlers registered for a kind, in priority order
    pub fn handlers_for(&self, kind: ResourceKind) -> impl Iterator<Item = &dyn ResourceHandler> {
        self.all().filter(move |h| h.kind() == kind)
    }

    /// Handlers for a kind that can operate on the machine right now
    pub fn available_handlers(
        &self,
        kind: ResourceKind,
        ctx: &Context<'_>,
    ) -> Vec<&dyn ResourceHandler> {
        self.handlers_for(kind)
            .filter(|h| h.available(ctx))
            .collect()
    }

    /// First available handler for a kind
    pub fn dispatch(&self, kind: ResourceKind, ctx: &Context<'_>) -> Result<&dyn ResourceHandler> {
        self.handlers_for(kind)
            .find(|h| h.available(ctx))
            .ok_or_else(|| none_available(kind.as_str()))
    }

    /// Use the preferred handler if given, otherwise dispatch
    pub fn resolve(
        &self,
        kind: ResourceKind,
        preferred: Option<&str>,
        ctx: &Context<'_>,
    ) -> Result<&dyn ResourceHandler> {
        let Some(name) = preferred else {
            return self.dispatch(kind, ctx);
        };

        let handler = self.get(kind, name)?;
        if !handler.available(ctx) {
            return Err(none_available(kind.as_str()));
        }
        Ok(handler)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}
