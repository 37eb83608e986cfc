//! Scripted `CommandRunner` shared by the integration tests.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::VecDeque;

use systemd_user_tui::app::runner::{CommandOutput, CommandRunner};
use systemd_user_tui::error::RunError;

/// Replays queued responses in order and records every invocation.
#[derive(Default)]
pub struct ScriptedRunner {
    responses: RefCell<VecDeque<Result<CommandOutput, RunError>>>,
    calls: RefCell<Vec<Vec<String>>>,
}

impl ScriptedRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ok(self, stdout: &str) -> Self {
        self.push(Ok(CommandOutput {
            success: true,
            exit_code: Some(0),
            stdout: stdout.to_string(),
            stderr: String::new(),
        }))
    }

    pub fn fail(self, exit_code: i32, stderr: &str) -> Self {
        self.push(Ok(CommandOutput {
            success: false,
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.to_string(),
        }))
    }

    pub fn timeout(self) -> Self {
        self.push(Err(RunError::Timeout {
            program: "systemctl".to_string(),
            timeout_ms: 5000,
        }))
    }

    pub fn missing_binary(self) -> Self {
        self.push(Err(RunError::Spawn {
            program: "systemctl".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "No such file or directory"),
        }))
    }

    fn push(self, response: Result<CommandOutput, RunError>) -> Self {
        self.responses.borrow_mut().push_back(response);
        self
    }

    /// Every invocation so far, program first.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }

    pub fn call(&self, index: usize) -> String {
        self.calls.borrow()[index].join(" ")
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[String]) -> Result<CommandOutput, RunError> {
        let mut call = vec![program.to_string()];
        call.extend(args.iter().cloned());
        self.calls.borrow_mut().push(call);

        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| panic!("unexpected invocation: {program} {args:?}"))
    }
}

pub const TEXT_LISTING: &str = "\
  UNIT               LOAD   ACTIVE   SUB     DESCRIPTION
  dbus.service       loaded active   running D-Bus User Message Bus
● sync.service       loaded failed   failed  File sync
  backup.service     loaded inactive dead    Nightly backup

LOAD   = Reflects whether the unit definition was properly loaded.
ACTIVE = The high-level unit activation state, i.e. generalization of SUB.
SUB    = The low-level unit activation state, values depend on unit type.
3 loaded units listed.
To show all installed unit files use 'systemctl list-unit-files'.
";

pub const JSON_LISTING: &str = r#"[
  {"unit":"dbus.service","load":"loaded","active":"active","sub":"running","description":"D-Bus User Message Bus"},
  {"unit":"sync.service","load":"loaded","active":"failed","sub":"failed","description":"File sync"},
  {"unit":"backup.service","load":"loaded","active":"inactive","sub":"dead","description":"Nightly backup"}
]"#;

pub fn show_output(load: &str, active: &str, sub: &str) -> String {
    format!("LoadState={load}\nActiveState={active}\nSubState={sub}\n")
}
