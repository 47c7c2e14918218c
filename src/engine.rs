//! Engine facade over the registry, a host and a diagnostics sink
//!
//! One [`Engine::converge`] call selects a handler, lists the changes a
//! resource needs and applies them, returning a serializable [`Report`].

use serde::Serialize;

use crate::convergence::{ChangeSet, Context, Discovery, Phase, ResourceHandler};
use crate::diagnostics::{Diagnostics, Severity};
use crate::error::Result;
use crate::host::Host;
use crate::registry::HandlerRegistry;
use crate::resource::{Resource, ResourceId};

/// Options for a single convergence call
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConvergeOptions {
    /// Stop after the diff without mutating anything
    pub dry_run: bool,
    /// Implementation name to use instead of dispatching by availability
    pub handler: Option<String>,
}

impl ConvergeOptions {
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            handler: None,
        }
    }

    pub fn with_handler(mut self, name: impl Into<String>) -> Self {
        self.handler = Some(name.into());
        self
    }
}

/// Outcome of converging one resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub resource: ResourceId,
    pub handler: &'static str,
    /// Changes found before any mutation ran
    pub changes: ChangeSet,
    /// Whether at least one mutation was performed
    pub changed: bool,
    pub phase: Phase,
}

pub struct Engine<'a> {
    registry: HandlerRegistry,
    host: &'a dyn Host,
    diagnostics: &'a dyn Diagnostics,
}

impl<'a> Engine<'a> {
    pub fn new(
        registry: HandlerRegistry,
        host: &'a dyn Host,
        diagnostics: &'a dyn Diagnostics,
    ) -> Self {
        Self {
            registry,
            host,
            diagnostics,
        }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    fn context(&self) -> Context<'a> {
        Context::new(self.host, self.diagnostics)
    }

    fn handler_for(
        &self,
        resource: &Resource,
        preferred: Option<&str>,
    ) -> Result<&dyn ResourceHandler> {
        resource.validate()?;
        self.registry
            .resolve(resource.kind(), preferred, &self.context())
    }

    /// Bring a resource to its desired state
    ///
    /// The changes in the report are the ones found by the diff before any
    /// mutation. The phase is `Divergent` when changes remain, either because
    /// of a dry run or because the handler has no mutation for an attribute.
    /// A failing mutation is returned as an error; mutations that already ran
    /// stay in effect.
    pub fn converge(&self, resource: &Resource, options: &ConvergeOptions) -> Result<Report> {
        let ctx = self.context();
        let handler = self.handler_for(resource, options.handler.as_deref())?;

        if options.dry_run {
            let changes = handler.list_changes(&ctx, resource)?;
            let phase = if changes.is_empty() {
                Phase::Converged
            } else {
                ctx.emit(
                    Severity::Info,
                    &resource.id(),
                    &format!("dry run: {} change(s) pending", changes.len()),
                );
                Phase::Divergent
            };
            return Ok(Report {
                resource: resource.id(),
                handler: handler.name(),
                changes,
                changed: false,
                phase,
            });
        }

        let outcome = handler.converge(&ctx, resource)?;
        Ok(Report {
            resource: resource.id(),
            handler: handler.name(),
            phase: outcome.phase(),
            changes: outcome.changes,
            changed: outcome.changed,
        })
    }

    /// Inspect the current state of a resource without diffing
    pub fn discover(&self, resource: &Resource) -> Result<Discovery> {
        let handler = self.handler_for(resource, None)?;
        handler.discover(&self.context(), resource)
    }

    /// Reload a resource through its handler
    pub fn reload(&self, resource: &Resource) -> Result<()> {
        let handler = self.handler_for(resource, None)?;
        handler.reload(&self.context(), resource)
    }
}
