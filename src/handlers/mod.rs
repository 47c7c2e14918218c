//! Concrete resource handlers
//!
//! - [`service`]: `std::Service` on upstart or SysV init (`ubuntu_service`)
//! - [`package`]: `std::Package` through dpkg and apt-get (`apt`)

pub mod package;
pub mod service;

pub use package::PackageHandler;
pub use service::{ServiceDialect, ServiceHandler};
