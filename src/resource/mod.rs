//! Resource models describing desired machine state
//!
//! A **resource** is a named OS-level entity (a service, an installed package)
//! together with the attribute values it should have. Resources are immutable
//! values owned by the caller; handlers clone them to record what they observe
//! on the machine.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Result, resource::invalid};

/// Kind of resource a handler can manage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ResourceKind {
    #[serde(rename = "std::Service")]
    Service,
    #[serde(rename = "std::Package")]
    Package,
}

impl ResourceKind {
    /// Qualified type name (e.g. "std::Service")
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceKind::Service => "std::Service",
            ResourceKind::Package => "std::Package",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a resource instance on a machine
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResourceId {
    pub kind: ResourceKind,
    pub name: String,
}

impl ResourceId {
    pub fn new(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[name={}]", self.kind, self.name)
    }
}

/// Run state of a service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceState {
    Running,
    Stopped,
}

impl ServiceState {
    /// Name of the control action that reaches this state
    pub fn action(self) -> &'static str {
        match self {
            ServiceState::Running => "start",
            ServiceState::Stopped => "stop",
        }
    }
}

/// Installation state of a package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageState {
    Installed,
    Removed,
}

/// Attribute names that can take part in a diff
///
/// Ordering follows declaration order, which keeps change sets sorted with
/// state transitions first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attribute {
    State,
    OnBoot,
}

impl Attribute {
    pub fn as_str(self) -> &'static str {
        match self {
            Attribute::State => "state",
            Attribute::OnBoot => "onboot",
        }
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value of a single resource attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Service(ServiceState),
    Package(PackageState),
    Bool(bool),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Service(ServiceState::Running) => f.write_str("running"),
            Value::Service(ServiceState::Stopped) => f.write_str("stopped"),
            Value::Package(PackageState::Installed) => f.write_str("installed"),
            Value::Package(PackageState::Removed) => f.write_str("removed"),
            Value::Bool(b) => write!(f, "{b}"),
        }
    }
}

/// Desired state of a service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub state: ServiceState,
    /// Whether the service starts when the machine boots
    pub onboot: bool,
}

impl Service {
    pub fn new(name: impl Into<String>, state: ServiceState, onboot: bool) -> Self {
        Self {
            name: name.into(),
            state,
            onboot,
        }
    }
}

/// Desired state of a package
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub name: String,
    pub state: PackageState,
}

impl Package {
    pub fn new(name: impl Into<String>, state: PackageState) -> Self {
        Self {
            name: name.into(),
            state,
        }
    }
}

/// A desired resource of any supported kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Resource {
    #[serde(rename = "std::Service")]
    Service(Service),
    #[serde(rename = "std::Package")]
    Package(Package),
}

impl Resource {
    pub fn kind(&self) -> ResourceKind {
        match self {
            Resource::Service(_) => ResourceKind::Service,
            Resource::Package(_) => ResourceKind::Package,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Resource::Service(s) => &s.name,
            Resource::Package(p) => &p.name,
        }
    }

    pub fn id(&self) -> ResourceId {
        ResourceId::new(self.kind(), self.name())
    }

    /// Check the invariants every resource must hold before it is converged
    pub fn validate(&self) -> Result<()> {
        match self {
            Resource::Service(s) => s.validate(),
            Resource::Package(p) => p.validate(),
        }
    }
}

impl From<Service> for Resource {
    fn from(service: Service) -> Self {
        Resource::Service(service)
    }
}

impl From<Package> for Resource {
    fn from(package: Package) -> Self {
        Resource::Package(package)
    }
}

/// Per-kind desired-state model
///
/// Implemented by the closed set of resource structs so the convergence
/// protocol can be written once and specialized through static dispatch.
pub trait DesiredState: Clone + fmt::Debug + Send + Sync {
    const KIND: ResourceKind;

    fn name(&self) -> &str;

    /// Attributes that take part in a diff, in declaration order
    fn attributes(&self) -> Vec<(Attribute, Value)>;

    /// Borrow the matching variant out of a [`Resource`]
    fn narrow(resource: &Resource) -> Option<&Self>;

    fn into_resource(self) -> Resource;

    fn id(&self) -> ResourceId {
        ResourceId::new(Self::KIND, self.name())
    }

    /// Names end up in executable paths and command arguments, so they must
    /// be a single plain word: no path separators, whitespace or NUL, and no
    /// leading `-`.
    fn validate(&self) -> Result<()> {
        let name = self.name();
        let reason = if name.trim().is_empty() {
            "name must not be empty"
        } else if name.starts_with('-') {
            "name must not start with '-'"
        } else if name.contains('/') {
            "name must not contain '/'"
        } else if name.chars().any(|c| c.is_whitespace() || c == '\0') {
            "name must not contain whitespace or NUL"
        } else {
            return Ok(());
        };
        Err(invalid(self.id().to_string(), reason))
    }
}

impl DesiredState for Service {
    const KIND: ResourceKind = ResourceKind::Service;

    fn name(&self) -> &str {
        &self.name
    }

    fn attributes(&self) -> Vec<(Attribute, Value)> {
        vec![
            (Attribute::State, Value::Service(self.state)),
            (Attribute::OnBoot, Value::Bool(self.onboot)),
        ]
    }

    fn narrow(resource: &Resource) -> Option<&Self> {
        match resource {
            Resource::Service(s) => Some(s),
            Resource::Package(_) => None,
        }
    }

    fn into_resource(self) -> Resource {
        Resource::Service(self)
    }
}

impl DesiredState for Package {
    const KIND: ResourceKind = ResourceKind::Package;

    fn name(&self) -> &str {
        &self.name
    }

    fn attributes(&self) -> Vec<(Attribute, Value)> {
        vec![(Attribute::State, Value::Package(self.state))]
    }

    fn narrow(resource: &Resource) -> Option<&Self> {
        match resource {
            Resource::Package(p) => Some(p),
            Resource::Service(_) => None,
        }
    }

    fn into_resource(self) -> Resource {
        Resource::Package(self)
    }
}
