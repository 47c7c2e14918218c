//! Convergence protocol: discover, diff, apply
//!
//! The protocol is written once in [`Reconcile`]'s provided methods. A handler
//! only supplies the hooks: availability probing, discovery, and one mutation
//! per attribute. [`HandlerAdapter`] erases a typed handler into a
//! [`ResourceHandler`] so it can live in the registry.
//!
//! Per resource, a call moves through
//! `Unknown -> Discovered -> {Converged | Divergent} -> (apply) -> Converged | Failed`.
//! Only the settled outcome is reported as a [`Phase`]; a failed call surfaces
//! as the `MutationFailed` error instead, and callers retry from the start.
//! Mutations already performed before a failure are not rolled back.

pub mod diff;

use std::fmt;

use serde::Serialize;

use crate::diagnostics::{Diagnostics, Severity};
use crate::error::{
    Result,
    handler::{kind_mismatch, mutation_failed, unsupported},
};
use crate::host::{CommandOutput, Env, Host, command_line};
use crate::resource::{Attribute, DesiredState, Resource, ResourceId, ResourceKind};

pub use diff::{Change, ChangeSet, Observed, diff};

/// Per-call access to the machine and the diagnostics sink
#[derive(Clone, Copy)]
pub struct Context<'a> {
    pub host: &'a dyn Host,
    pub diagnostics: &'a dyn Diagnostics,
}

impl<'a> Context<'a> {
    pub fn new(host: &'a dyn Host, diagnostics: &'a dyn Diagnostics) -> Self {
        Self { host, diagnostics }
    }

    pub fn emit(&self, severity: Severity, resource: &ResourceId, message: &str) {
        self.diagnostics.emit(severity, resource, message);
    }

    pub fn file_exists(&self, path: &str) -> bool {
        self.host.file_exists(path)
    }

    /// Run a probing command; its exit code is left for the caller to interpret
    pub fn probe(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        self.host.run(program, args, None)
    }

    /// Run a state-changing command, failing with `MutationFailed` on a non-zero exit
    pub fn mutate(
        &self,
        resource: &ResourceId,
        program: &str,
        args: &[&str],
        env: Option<&Env>,
    ) -> Result<CommandOutput> {
        let command = command_line(program, args);
        self.emit(Severity::Debug, resource, &format!("running `{command}`"));

        let output = self.host.run(program, args, env)?;
        if !output.success() {
            return Err(mutation_failed(
                resource.to_string(),
                command,
                output.exit_code,
                output.stderr.trim(),
            ));
        }
        Ok(output)
    }
}

/// Handler-specific variant selected at discovery time
pub trait Dialect: Copy + fmt::Debug + Send + Sync {
    fn label(self) -> &'static str;
}

impl Dialect for () {
    fn label(self) -> &'static str {
        "default"
    }
}

/// Result of a single attribute mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    Applied,
    /// The active dialect has no way to change the attribute; reported as a warning
    Unsupported(String),
}

/// Settled convergence state of a resource after a call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Observed state matches desired state
    Converged,
    /// Differences remain, either pending (dry run) or without a mutation
    Divergent,
}

/// What one convergence pass found and did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Changes found by the diff that preceded the mutations
    pub changes: ChangeSet,
    /// Whether at least one mutation ran
    pub changed: bool,
    /// Changed attributes left as they were because no mutation exists for them
    pub skipped: Vec<Attribute>,
}

impl Outcome {
    pub fn phase(&self) -> Phase {
        if self.skipped.is_empty() {
            Phase::Converged
        } else {
            Phase::Divergent
        }
    }
}

/// Typed handler for one resource kind
pub trait Reconcile: Send + Sync {
    type Desired: DesiredState;
    type Dialect: Dialect;

    /// Implementation name used for registration (e.g. "apt")
    const NAME: &'static str;

    /// Order in which changed attributes are mutated
    const APPLY_ORDER: &'static [Attribute];

    /// Whether this handler can operate on the machine. Must not mutate anything.
    fn available(&self, ctx: &Context<'_>) -> bool;

    fn discover(
        &self,
        ctx: &Context<'_>,
        desired: &Self::Desired,
    ) -> Result<Observed<Self::Desired, Self::Dialect>>;

    fn mutate(
        &self,
        ctx: &Context<'_>,
        dialect: Self::Dialect,
        desired: &Self::Desired,
        attribute: Attribute,
        change: &Change,
    ) -> Result<Mutation>;

    fn can_reload(&self) -> bool {
        false
    }

    fn reload(&self, _ctx: &Context<'_>, desired: &Self::Desired) -> Result<()> {
        Err(unsupported(desired.id().to_string(), "reload"))
    }

    /// Discover and diff in one step, keeping the dialect for apply
    fn plan(
        &self,
        ctx: &Context<'_>,
        desired: &Self::Desired,
    ) -> Result<(Self::Dialect, ChangeSet)> {
        desired.validate()?;
        let observed = self.discover(ctx, desired)?;
        let changes = diff(&observed, desired);
        ctx.emit(
            Severity::Debug,
            &desired.id(),
            &format!(
                "discovered via {} with {} change(s)",
                observed.dialect.label(),
                changes.len()
            ),
        );
        Ok((observed.dialect, changes))
    }

    fn list_changes(&self, ctx: &Context<'_>, desired: &Self::Desired) -> Result<ChangeSet> {
        self.plan(ctx, desired).map(|(_, changes)| changes)
    }

    /// Converge the resource. Returns whether any mutation was performed.
    fn apply(&self, ctx: &Context<'_>, desired: &Self::Desired) -> Result<bool> {
        self.converge(ctx, desired).map(|outcome| outcome.changed)
    }

    /// Discover, diff and mutate, reporting skipped attributes
    ///
    /// Discovery always runs again here, so a plan computed earlier is never
    /// applied against stale state. The first failing mutation aborts the
    /// remaining ones.
    fn converge(&self, ctx: &Context<'_>, desired: &Self::Desired) -> Result<Outcome> {
        let id = desired.id();
        let (dialect, changes) = self.plan(ctx, desired)?;
        let mut outcome = Outcome {
            changes,
            ..Outcome::default()
        };
        if outcome.changes.is_empty() {
            ctx.emit(Severity::Debug, &id, "already converged");
            return Ok(outcome);
        }

        for &attribute in Self::APPLY_ORDER {
            let Some(change) = outcome.changes.get(attribute) else {
                continue;
            };
            match self.mutate(ctx, dialect, desired, attribute, change)? {
                Mutation::Applied => {
                    ctx.emit(Severity::Info, &id, &format!("{attribute}: {change}"));
                    outcome.changed = true;
                }
                Mutation::Unsupported(operation) => {
                    let warning = unsupported(id.to_string(), operation);
                    ctx.emit(Severity::Warning, &id, &warning.to_string());
                    outcome.skipped.push(attribute);
                }
            }
        }

        let unordered: Vec<Attribute> = outcome
            .changes
            .attributes()
            .filter(|a| !Self::APPLY_ORDER.contains(a))
            .collect();
        for attribute in unordered {
            let warning = unsupported(id.to_string(), format!("no mutation for {attribute}"));
            ctx.emit(Severity::Warning, &id, &warning.to_string());
            outcome.skipped.push(attribute);
        }

        Ok(outcome)
    }
}

/// Type-erased view of discovered state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Discovery {
    pub dialect: &'static str,
    pub current: Resource,
    pub unknown: Vec<Attribute>,
}

/// Object-safe handler surface used by the registry and the engine
pub trait ResourceHandler: Send + Sync {
    fn kind(&self) -> ResourceKind;

    fn name(&self) -> &'static str;

    fn available(&self, ctx: &Context<'_>) -> bool;

    fn discover(&self, ctx: &Context<'_>, resource: &Resource) -> Result<Discovery>;

    fn list_changes(&self, ctx: &Context<'_>, resource: &Resource) -> Result<ChangeSet>;

    fn apply(&self, ctx: &Context<'_>, resource: &Resource) -> Result<bool>;

    fn converge(&self, ctx: &Context<'_>, resource: &Resource) -> Result<Outcome>;

    fn can_reload(&self) -> bool;

    fn reload(&self, ctx: &Context<'_>, resource: &Resource) -> Result<()>;
}

/// Wraps a [`Reconcile`] implementation as a [`ResourceHandler`]
#[derive(Debug, Clone)]
pub struct HandlerAdapter<H> {
    inner: H,
}

impl<H: Reconcile> HandlerAdapter<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    fn narrow<'r>(&self, resource: &'r Resource) -> Result<&'r H::Desired> {
        let desired = H::Desired::narrow(resource).ok_or_else(|| {
            kind_mismatch(
                H::NAME,
                <H::Desired as DesiredState>::KIND.as_str(),
                resource.kind().as_str(),
            )
        })?;
        desired.validate()?;
        Ok(desired)
    }
}

impl<H: Reconcile> ResourceHandler for HandlerAdapter<H> {
    fn kind(&self) -> ResourceKind {
        <H::Desired as DesiredState>::KIND
    }

    fn name(&self) -> &'static str {
        H::NAME
    }

    fn available(&self, ctx: &Context<'_>) -> bool {
        self.inner.available(ctx)
    }

    fn discover(&self, ctx: &Context<'_>, resource: &Resource) -> Result<Discovery> {
        let observed = self.inner.discover(ctx, self.narrow(resource)?)?;
        Ok(Discovery {
            dialect: observed.dialect.label(),
            current: observed.current.into_resource(),
            unknown: observed.unknown.into_iter().collect(),
        })
    }

    fn list_changes(&self, ctx: &Context<'_>, resource: &Resource) -> Result<ChangeSet> {
        self.inner.list_changes(ctx, self.narrow(resource)?)
    }

    fn apply(&self, ctx: &Context<'_>, resource: &Resource) -> Result<bool> {
        self.inner.apply(ctx, self.narrow(resource)?)
    }

    fn converge(&self, ctx: &Context<'_>, resource: &Resource) -> Result<Outcome> {
        self.inner.converge(ctx, self.narrow(resource)?)
    }

    fn can_reload(&self) -> bool {
        self.inner.can_reload()
    }

    fn reload(&self, ctx: &Context<'_>, resource: &Resource) -> Result<()> {
        self.inner.reload(ctx, self.narrow(resource)?)
    }
}
