//! Package handler backed by dpkg and apt-get

use crate::config::PackageConfig;
use crate::convergence::{Change, Context, Mutation, Observed, Reconcile};
use crate::error::Result;
use crate::host::CommandOutput;
use crate::resource::{Attribute, DesiredState, Package, PackageState, Value};

/// Handler for `std::Package` resources, registered as `apt`
#[derive(Debug, Clone, Default)]
pub struct PackageHandler {
    config: PackageConfig,
}

impl PackageHandler {
    pub fn new(config: PackageConfig) -> Self {
        Self { config }
    }
}

/// Normalize `dpkg -s` output to a package state
///
/// Only a `Status:` field starting with "install ok" counts as installed.
/// Anything dpkg complains about, including an unknown package, is removed.
/// That includes harmless warnings: an installed package whose query prints a
/// `dpkg-query: warning:` line is seen as removed, and `apply` reinstalls it
/// on every run.
pub fn parse_dpkg_status(output: &CommandOutput) -> PackageState {
    if !output.stderr.trim().is_empty() || !output.success() {
        return PackageState::Removed;
    }

    let status = output
        .stdout
        .lines()
        .filter_map(|line| line.split_once(": "))
        .find(|(key, _)| *key == "Status")
        .map(|(_, value)| value.trim());

    match status {
        Some(status) if status.starts_with("install ok") => PackageState::Installed,
        _ => PackageState::Removed,
    }
}

impl Reconcile for PackageHandler {
    type Desired = Package;
    type Dialect = ();

    const NAME: &'static str = "apt";
    const APPLY_ORDER: &'static [Attribute] = &[Attribute::State];

    fn available(&self, ctx: &Context<'_>) -> bool {
        ctx.file_exists(&self.config.dpkg) && ctx.file_exists(&self.config.apt_get)
    }

    fn discover(&self, ctx: &Context<'_>, desired: &Package) -> Result<Observed<Package, ()>> {
        let output = ctx.probe(&self.config.dpkg, &["-s", desired.name.as_str()])?;
        let state = parse_dpkg_status(&output);

        let mut observed = Observed::new((), desired);
        observed.set(Attribute::State, |p| p.state = state);
        Ok(observed)
    }

    fn mutate(
        &self,
        ctx: &Context<'_>,
        _dialect: (),
        desired: &Package,
        attribute: Attribute,
        change: &Change,
    ) -> Result<Mutation> {
        let name = desired.name.as_str();
        let args: Vec<&str> = match (attribute, change.desired) {
            (Attribute::State, Value::Package(PackageState::Installed)) => {
                vec!["-qq", "--yes", "--force-yes", "install", name]
            }
            (Attribute::State, Value::Package(PackageState::Removed)) => {
                vec!["-qq", "--yes", "remove", name]
            }
            (attribute, value) => {
                return Ok(Mutation::Unsupported(format!(
                    "setting {attribute} to {value}"
                )));
            }
        };

        ctx.mutate(
            &desired.id(),
            &self.config.apt_get,
            &args,
            Some(&self.config.env),
        )?;
        Ok(Mutation::Applied)
    }
}
