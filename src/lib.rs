//! Converge - resource convergence engine
//!
//! Brings OS-level resources (services, packages) on a Linux machine to a
//! declared state. Each resource kind has one or more handlers; a handler
//! discovers the current state, computes the attributes that differ from the
//! desired state, and runs the commands that close the gap. Converging an
//! already converged resource performs no mutation.
//!
//! ```no_run
//! use converge::{
//!     ConvergeOptions, Engine, EngineConfig, HandlerRegistry, LocalHost, Resource, Service,
//!     ServiceState, TracingDiagnostics,
//! };
//!
//! let registry = HandlerRegistry::with_defaults(&EngineConfig::default());
//! let (host, sink) = (LocalHost::new(), TracingDiagnostics);
//! let engine = Engine::new(registry, &host, &sink);
//!
//! let nginx = Resource::from(Service::new("nginx", ServiceState::Running, true));
//! let report = engine.converge(&nginx, &ConvergeOptions::default())?;
//! println!("{} changed: {}", report.resource, report.changed);
//! # Ok::<(), converge::ConvergeError>(())
//! ```

pub mod config;
pub mod convergence;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod handlers;
pub mod host;
pub mod registry;
pub mod resource;

pub use config::EngineConfig;
pub use convergence::{Change, ChangeSet, Context, Outcome, Phase, Reconcile, ResourceHandler};
pub use diagnostics::{Diagnostics, RecordingDiagnostics, TracingDiagnostics};
pub use engine::{ConvergeOptions, Engine, Report};
pub use error::{ConvergeError, Result};
pub use host::{CommandOutput, Host, LocalHost, MockHost};
pub use registry::HandlerRegistry;
pub use resource::{Package, PackageState, Resource, ResourceKind, Service, ServiceState};
