//! Common test utilities for converge integration tests
//!
//! [`FakeMachine`] is a stateful host: it interprets the upstart, SysV init,
//! dpkg and apt-get commands the built-in handlers run and updates its state
//! accordingly, so convergence can be exercised end to end.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet, HashMap};

use converge::host::{Env, Invocation, command_line};
use converge::{CommandOutput, Host, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitSystem {
    Upstart,
    SysVinit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceRecord {
    pub init: InitSystem,
    pub running: bool,
    pub onboot: bool,
}

#[derive(Debug, Default)]
struct MachineState {
    files: BTreeSet<String>,
    services: BTreeMap<String, ServiceRecord>,
    /// Packages apt-get can find, with whether they are installed
    packages: BTreeMap<String, bool>,
    failures: HashMap<String, CommandOutput>,
}

/// An in-memory Ubuntu machine
#[derive(Debug, Default)]
pub struct FakeMachine {
    state: RefCell<MachineState>,
    calls: RefCell<Vec<Invocation>>,
}

impl FakeMachine {
    /// A machine with both init systems and the apt tool chain
    pub fn ubuntu() -> Self {
        let machine = Self::default();
        for path in [
            "/usr/lib/upstart",
            "/usr/sbin/update-rc.d",
            "/usr/bin/dpkg",
            "/usr/bin/apt-get",
        ] {
            machine.add_file(path);
        }
        machine
    }

    pub fn add_file(&self, path: &str) {
        self.state.borrow_mut().files.insert(path.to_string());
    }

    pub fn remove_file(&self, path: &str) {
        self.state.borrow_mut().files.remove(path);
    }

    pub fn add_service(&self, name: &str, init: InitSystem, running: bool, onboot: bool) {
        let file = match init {
            InitSystem::Upstart => format!("/etc/init/{name}.conf"),
            InitSystem::SysVinit => format!("/etc/init.d/{name}"),
        };
        let mut state = self.state.borrow_mut();
        state.files.insert(file);
        state.services.insert(
            name.to_string(),
            ServiceRecord {
                init,
                running,
                onboot,
            },
        );
    }

    pub fn add_package(&self, name: &str, installed: bool) {
        self.state
            .borrow_mut()
            .packages
            .insert(name.to_string(), installed);
    }

    /// Make `command` (full command line) fail without touching state
    pub fn fail(&self, command: &str, stderr: &str, exit_code: i32) {
        self.state
            .borrow_mut()
            .failures
            .insert(command.to_string(), CommandOutput::failed(stderr, exit_code));
    }

    pub fn service(&self, name: &str) -> Option<ServiceRecord> {
        self.state.borrow().services.get(name).copied()
    }

    pub fn package_installed(&self, name: &str) -> bool {
        self.state
            .borrow()
            .packages
            .get(name)
            .copied()
            .unwrap_or(false)
    }

    pub fn command_lines(&self) -> Vec<String> {
        self.calls.borrow().iter().map(Invocation::command_line).collect()
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, command: &str) -> usize {
        self.command_lines().iter().filter(|l| *l == command).count()
    }

    pub fn clear_calls(&self) {
        self.calls.borrow_mut().clear();
    }

    fn with_service(&self, name: &str, update: impl FnOnce(&mut ServiceRecord)) -> CommandOutput {
        match self.state.borrow_mut().services.get_mut(name) {
            Some(record) => {
                update(record);
                CommandOutput::ok("")
            }
            None => CommandOutput::failed(format!("{name}: unrecognized service"), 1),
        }
    }

    fn upstart(&self, action: &str, name: &str) -> CommandOutput {
        let Some(record) = self.service(name) else {
            return CommandOutput::failed(format!("{action}: Unknown job: {name}"), 1);
        };
        match action {
            "show-config" if record.onboot => CommandOutput::ok(format!(
                "{name}\n  start on runlevel [2345]\n  stop on runlevel [!2345]\n"
            )),
            "show-config" => CommandOutput::ok(format!("{name}\n  stop on runlevel [!2345]\n")),
            "status" if record.running => {
                CommandOutput::ok(format!("{name} start/running, process 4242\n"))
            }
            "status" => CommandOutput::ok(format!("{name} stop/waiting\n")),
            "start" => self.with_service(name, |r| r.running = true),
            "stop" => self.with_service(name, |r| r.running = false),
            "restart" => self.with_service(name, |r| r.running = true),
            _ => CommandOutput::failed(format!("unknown action {action}"), 1),
        }
    }

    fn init_script(&self, name: &str, action: &str) -> CommandOutput {
        let Some(record) = self.service(name) else {
            return CommandOutput::failed(format!("{name}: not found"), 127);
        };
        match action {
            "status" if record.running => CommandOutput::ok(format!(" * {name} is running\n")),
            "status" => CommandOutput::new(format!(" * {name} is not running\n"), "", 3),
            "start" | "restart" => self.with_service(name, |r| r.running = true),
            "stop" => self.with_service(name, |r| r.running = false),
            _ => CommandOutput::failed(format!("Usage: /etc/init.d/{name} {{start|stop}}"), 1),
        }
    }

    fn update_rc_d(&self, args: &[&str]) -> CommandOutput {
        match args {
            ["-n", name, "defaults"] => match self.service(name) {
                Some(record) if record.onboot => CommandOutput::ok(format!(
                    " System start/stop links for /etc/init.d/{name} already exist.\n"
                )),
                Some(_) => CommandOutput::ok(format!(
                    " Adding system startup for /etc/init.d/{name} ...\n"
                )),
                None => CommandOutput::failed(format!("file /etc/init.d/{name} not found"), 1),
            },
            [name, "defaults"] => self.with_service(name, |r| r.onboot = true),
            ["-f", name, "remove"] => self.with_service(name, |r| r.onboot = false),
            _ => CommandOutput::failed("usage: update-rc.d [-n] [-f] <basename> remove", 1),
        }
    }

    fn dpkg(&self, args: &[&str]) -> CommandOutput {
        match args {
            ["-s", name] if self.package_installed(name) => CommandOutput::ok(format!(
                "Package: {name}\nStatus: install ok installed\nPriority: optional\n"
            )),
            ["-s", name] => CommandOutput::failed(
                format!(
                    "dpkg-query: package '{name}' is not installed and no information is available\n"
                ),
                1,
            ),
            _ => CommandOutput::failed("dpkg: unsupported invocation", 2),
        }
    }

    fn apt_get(&self, args: &[&str]) -> CommandOutput {
        let (action, name) = match args {
            ["-qq", "--yes", "--force-yes", "install", name] => ("install", *name),
            ["-qq", "--yes", "remove", name] => ("remove", *name),
            _ => return CommandOutput::failed("E: Invalid operation", 100),
        };

        let mut state = self.state.borrow_mut();
        match state.packages.get_mut(name) {
            Some(installed) => {
                *installed = action == "install";
                CommandOutput::ok("")
            }
            None if action == "remove" => CommandOutput::ok(""),
            None => CommandOutput::failed(format!("E: Unable to locate package {name}\n"), 100),
        }
    }
}

impl Host for FakeMachine {
    fn file_exists(&self, path: &str) -> bool {
        self.state.borrow().files.contains(path)
    }

    fn run(&self, program: &str, args: &[&str], env: Option<&Env>) -> Result<CommandOutput> {
        self.calls.borrow_mut().push(Invocation {
            program: program.to_string(),
            args: args.iter().map(|a| (*a).to_string()).collect(),
            env: env.cloned(),
        });

        let line = command_line(program, args);
        if let Some(failure) = self.state.borrow().failures.get(&line) {
            return Ok(failure.clone());
        }

        let output = match (program, args) {
            ("/sbin/initctl", ["show-config", name]) => self.upstart("show-config", name),
            ("/sbin/status", [name]) => self.upstart("status", name),
            ("/sbin/start", [name]) => self.upstart("start", name),
            ("/sbin/stop", [name]) => self.upstart("stop", name),
            ("/sbin/restart", [name]) => self.upstart("restart", name),
            ("/usr/sbin/update-rc.d", args) => self.update_rc_d(args),
            ("/usr/bin/dpkg", args) => self.dpkg(args),
            ("/usr/bin/apt-get", args) => self.apt_get(args),
            (script, [action]) if script.starts_with("/etc/init.d/") => {
                self.init_script(&script["/etc/init.d/".len()..], action)
            }
            _ => CommandOutput::failed(format!("{program}: command not found"), 127),
        };
        Ok(output)
    }
}
