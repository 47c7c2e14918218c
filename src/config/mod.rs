//! Engine configuration
//!
//! Every tool path and probe location the handlers use lives here, so a
//! machine with a non-standard layout can be described in a YAML or JSON file
//! instead of code. Defaults match a stock Ubuntu system.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{
    Result,
    config::{invalid, parse_failed, read_failed},
};
use crate::host::Env;

/// Top-level configuration (`converge.yaml`)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    pub service: ServiceConfig,
    pub package: PackageConfig,
}

/// Paths used by the `ubuntu_service` handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServiceConfig {
    /// Present when upstart is installed
    pub upstart_marker: String,
    /// Directory holding `<name>.conf` job definitions
    pub upstart_jobs: String,
    /// Directory holding `<name>` init scripts
    pub init_scripts: String,
    pub initctl: String,
    pub status: String,
    pub start: String,
    pub stop: String,
    pub restart: String,
    pub update_rc_d: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            upstart_marker: "/usr/lib/upstart".to_string(),
            upstart_jobs: "/etc/init".to_string(),
            init_scripts: "/etc/init.d".to_string(),
            initctl: "/sbin/initctl".to_string(),
            status: "/sbin/status".to_string(),
            start: "/sbin/start".to_string(),
            stop: "/sbin/stop".to_string(),
            restart: "/sbin/restart".to_string(),
            update_rc_d: "/usr/sbin/update-rc.d".to_string(),
        }
    }
}

impl ServiceConfig {
    /// Upstart job definition for a service
    pub fn job_file(&self, name: &str) -> String {
        format!("{}/{}.conf", self.upstart_jobs.trim_end_matches('/'), name)
    }

    /// SysV init script for a service
    pub fn init_script(&self, name: &str) -> String {
        format!("{}/{}", self.init_scripts.trim_end_matches('/'), name)
    }

    fn tool_paths(&self) -> [(&'static str, &str); 9] {
        [
            ("service.upstart_marker", self.upstart_marker.as_str()),
            ("service.upstart_jobs", self.upstart_jobs.as_str()),
            ("service.init_scripts", self.init_scripts.as_str()),
            ("service.initctl", self.initctl.as_str()),
            ("service.status", self.status.as_str()),
            ("service.start", self.start.as_str()),
            ("service.stop", self.stop.as_str()),
            ("service.restart", self.restart.as_str()),
            ("service.update_rc_d", self.update_rc_d.as_str()),
        ]
    }
}

/// Paths and environment used by the `apt` handler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PackageConfig {
    pub dpkg: String,
    pub apt_get: String,
    /// Environment for apt-get; replaces the inherited one entirely
    pub env: Env,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            dpkg: "/usr/bin/dpkg".to_string(),
            apt_get: "/usr/bin/apt-get".to_string(),
            env: default_apt_env(),
        }
    }
}

/// Locale-independent, non-interactive environment for apt-get
pub fn default_apt_env() -> Env {
    [
        ("LANG", "C"),
        ("DEBCONF_NONINTERACTIVE_SEEN", "true"),
        ("DEBIAN_FRONTEND", "noninteractive"),
        (
            "PATH",
            "/usr/local/sbin:/usr/local/bin:/usr/sbin:/usr/bin:/sbin:/bin",
        ),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

impl EngineConfig {
    /// Parse configuration from a YAML string
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a `.json`, `.yaml` or `.yml` file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| read_failed(path.display().to_string(), e.to_string()))?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

        let config: Self = if is_json {
            serde_json::from_str(&content)
                .map_err(|e| parse_failed(path.display().to_string(), format!("Invalid JSON: {e}")))?
        } else {
            serde_yaml::from_str(&content)
                .map_err(|e| parse_failed(path.display().to_string(), format!("Invalid YAML: {e}")))?
        };

        config.validate()?;
        Ok(config)
    }

    /// Serialize configuration to a YAML string
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Every configured path must be absolute
    pub fn validate(&self) -> Result<()> {
        let package_paths = [
            ("package.dpkg", self.package.dpkg.as_str()),
            ("package.apt_get", self.package.apt_get.as_str()),
        ];
        for (key, path) in self.service.tool_paths().into_iter().chain(package_paths) {
            if !path.starts_with('/') {
                return Err(invalid(format!("{key} must be an absolute path, got '{path}'")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConvergeError;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.service.initctl, "/sbin/initctl");
        assert_eq!(config.service.job_file("nginx"), "/etc/init/nginx.conf");
        assert_eq!(config.service.init_script("nginx"), "/etc/init.d/nginx");
        assert_eq!(config.package.env["DEBIAN_FRONTEND"], "noninteractive");
        assert_eq!(config.package.env.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = "service:\n  init_scripts: /opt/etc/init.d/\npackage:\n  apt_get: /opt/bin/apt-get\n";
        let config = EngineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.service.init_script("ssh"), "/opt/etc/init.d/ssh");
        assert_eq!(config.service.initctl, "/sbin/initctl");
        assert_eq!(config.package.apt_get, "/opt/bin/apt-get");
        assert_eq!(config.package.dpkg, "/usr/bin/dpkg");
    }

    #[test]
    fn test_unknown_field_rejected() {
        let result = EngineConfig::from_yaml("service:\n  systemctl: /bin/systemctl\n");
        assert!(matches!(result, Err(ConvergeError::ConfigParseFailed { .. })));
    }

    #[test]
    fn test_relative_path_rejected() {
        let result = EngineConfig::from_yaml("package:\n  dpkg: dpkg\n");
        match result {
            Err(ConvergeError::ConfigInvalid { message }) => {
                assert!(message.contains("package.dpkg"));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_load_yaml_and_json() {
        let temp = TempDir::new().unwrap();

        let yaml_path = temp.path().join("converge.yaml");
        std::fs::write(&yaml_path, "service:\n  status: /usr/sbin/status\n").unwrap();
        let config = EngineConfig::load(&yaml_path).unwrap();
        assert_eq!(config.service.status, "/usr/sbin/status");

        let json_path = temp.path().join("converge.json");
        std::fs::write(&json_path, r#"{"package": {"dpkg": "/opt/dpkg"}}"#).unwrap();
        let config = EngineConfig::load(&json_path).unwrap();
        assert_eq!(config.package.dpkg, "/opt/dpkg");
    }

    #[test]
    fn test_load_missing_file() {
        let temp = TempDir::new().unwrap();
        let result = EngineConfig::load(&temp.path().join("missing.yaml"));
        assert!(matches!(result, Err(ConvergeError::ConfigReadFailed { .. })));
    }

    #[test]
    fn test_yaml_round_trip() {
        let config = EngineConfig::default();
        let yaml = config.to_yaml().unwrap();
        assert_eq!(EngineConfig::from_yaml(&yaml).unwrap(), config);
    }
}
