//! Service handler for Ubuntu machines (upstart and SysV init)
//!
//! The dialect is picked per service by probing the filesystem: an upstart job
//! definition wins over an init script when both exist.

use crate::config::ServiceConfig;
use crate::convergence::{Change, Context, Dialect, Mutation, Observed, Reconcile};
use crate::error::{Result, resource::not_found};
use crate::resource::{Attribute, DesiredState, Service, ServiceState, Value};

/// How a service is managed on the machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceDialect {
    /// Event-based init; `/etc/init/<name>.conf` exists
    Upstart,
    /// Script-based init; `/etc/init.d/<name>` exists
    SysVinit,
}

impl Dialect for ServiceDialect {
    fn label(self) -> &'static str {
        match self {
            ServiceDialect::Upstart => "upstart",
            ServiceDialect::SysVinit => "init",
        }
    }
}

/// Handler for `std::Service` resources, registered as `ubuntu_service`
#[derive(Debug, Clone, Default)]
pub struct ServiceHandler {
    config: ServiceConfig,
}

impl ServiceHandler {
    pub fn new(config: ServiceConfig) -> Self {
        Self { config }
    }

    /// Select the dialect managing `service`. Upstart is checked first.
    pub fn detect_dialect(&self, ctx: &Context<'_>, service: &Service) -> Result<ServiceDialect> {
        if ctx.file_exists(&self.config.job_file(&service.name)) {
            return Ok(ServiceDialect::Upstart);
        }
        if ctx.file_exists(&self.config.init_script(&service.name)) {
            return Ok(ServiceDialect::SysVinit);
        }
        Err(not_found(
            service.id().to_string(),
            format!(
                "neither {} nor {} exists",
                self.config.job_file(&service.name),
                self.config.init_script(&service.name)
            ),
        ))
    }

    fn discover_upstart(
        &self,
        ctx: &Context<'_>,
        observed: &mut Observed<Service, ServiceDialect>,
    ) -> Result<()> {
        let name = observed.current.name.clone();

        let config = ctx.probe(&self.config.initctl, &["show-config", name.as_str()])?;
        if config.success() {
            let onboot = config.stdout.contains("start on ");
            observed.set(Attribute::OnBoot, |s| s.onboot = onboot);
        }

        let status = ctx.probe(&self.config.status, &[name.as_str()])?;
        let state = if status.stdout.contains("start") || status.stdout.contains("running") {
            ServiceState::Running
        } else {
            ServiceState::Stopped
        };
        observed.set(Attribute::State, |s| s.state = state);
        Ok(())
    }

    fn discover_sysvinit(
        &self,
        ctx: &Context<'_>,
        observed: &mut Observed<Service, ServiceDialect>,
    ) -> Result<()> {
        let name = observed.current.name.clone();

        let links = ctx.probe(&self.config.update_rc_d, &["-n", name.as_str(), "defaults"])?;
        if links.success() {
            let onboot = links.stdout.contains("already exist");
            observed.set(Attribute::OnBoot, |s| s.onboot = onboot);
        }

        let status = ctx.probe(&self.config.init_script(&name), &["status"])?;
        let state = if status.success() {
            ServiceState::Running
        } else {
            ServiceState::Stopped
        };
        observed.set(Attribute::State, |s| s.state = state);
        Ok(())
    }

    fn set_state(
        &self,
        ctx: &Context<'_>,
        dialect: ServiceDialect,
        service: &Service,
        state: ServiceState,
    ) -> Result<Mutation> {
        let action = state.action();
        match dialect {
            ServiceDialect::Upstart => {
                let program = match state {
                    ServiceState::Running => &self.config.start,
                    ServiceState::Stopped => &self.config.stop,
                };
                ctx.mutate(&service.id(), program, &[service.name.as_str()], None)?;
            }
            ServiceDialect::SysVinit => {
                let script = self.config.init_script(&service.name);
                ctx.mutate(&service.id(), &script, &[action], None)?;
            }
        }
        Ok(Mutation::Applied)
    }

    fn set_onboot(
        &self,
        ctx: &Context<'_>,
        dialect: ServiceDialect,
        service: &Service,
        onboot: bool,
    ) -> Result<Mutation> {
        match dialect {
            ServiceDialect::Upstart => Ok(Mutation::Unsupported(
                "enabling or disabling boot for upstart jobs".to_string(),
            )),
            ServiceDialect::SysVinit => {
                let name = service.name.as_str();
                if onboot {
                    ctx.mutate(&service.id(), &self.config.update_rc_d, &[name, "defaults"], None)?;
                } else {
                    ctx.mutate(&service.id(), &self.config.update_rc_d, &["-f", name, "remove"], None)?;
                }
                Ok(Mutation::Applied)
            }
        }
    }
}

impl Reconcile for ServiceHandler {
    type Desired = Service;
    type Dialect = ServiceDialect;

    const NAME: &'static str = "ubuntu_service";
    const APPLY_ORDER: &'static [Attribute] = &[Attribute::State, Attribute::OnBoot];

    fn available(&self, ctx: &Context<'_>) -> bool {
        ctx.file_exists(&self.config.upstart_marker) || ctx.file_exists(&self.config.update_rc_d)
    }

    fn discover(
        &self,
        ctx: &Context<'_>,
        desired: &Service,
    ) -> Result<Observed<Service, ServiceDialect>> {
        let dialect = self.detect_dialect(ctx, desired)?;
        let mut observed = Observed::new(dialect, desired);
        match dialect {
            ServiceDialect::Upstart => self.discover_upstart(ctx, &mut observed)?,
            ServiceDialect::SysVinit => self.discover_sysvinit(ctx, &mut observed)?,
        }
        Ok(observed)
    }

    fn mutate(
        &self,
        ctx: &Context<'_>,
        dialect: ServiceDialect,
        desired: &Service,
        attribute: Attribute,
        change: &Change,
    ) -> Result<Mutation> {
        match (attribute, change.desired) {
            (Attribute::State, Value::Service(state)) => self.set_state(ctx, dialect, desired, state),
            (Attribute::OnBoot, Value::Bool(onboot)) => self.set_onboot(ctx, dialect, desired, onboot),
            (attribute, value) => Ok(Mutation::Unsupported(format!(
                "setting {attribute} to {value}"
            ))),
        }
    }

    fn can_reload(&self) -> bool {
        true
    }

    /// Restart the service without diffing
    fn reload(&self, ctx: &Context<'_>, desired: &Service) -> Result<()> {
        desired.validate()?;
        match self.detect_dialect(ctx, desired)? {
            ServiceDialect::Upstart => {
                ctx.mutate(&desired.id(), &self.config.restart, &[desired.name.as_str()], None)?;
            }
            ServiceDialect::SysVinit => {
                let script = self.config.init_script(&desired.name);
                ctx.mutate(&desired.id(), &script, &["restart"], None)?;
            }
        }
        Ok(())
    }
}
