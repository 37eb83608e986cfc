// Handles all interactions with the `systemctl` command.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use tracing::{debug, info, warn};

use super::model::{ServiceAction, ServiceRecord, Snapshot};
use super::runner::{CommandOutput, CommandRunner, ProcessRunner};
use crate::config::Settings;
use crate::error::{Error, Result, RunError};

/// Which service manager instance to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// The invoking user's session manager (`systemctl --user`).
    #[default]
    User,
    System,
}

/// How the unit listing is requested and parsed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListFormat {
    /// JSON, falling back to text if the tool does not support it.
    #[default]
    Auto,
    Json,
    Text,
}

impl FromStr for ListFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "auto" => Ok(ListFormat::Auto),
            "json" => Ok(ListFormat::Json),
            "text" => Ok(ListFormat::Text),
            other => Err(format!(
                "unknown list format '{other}' (expected auto, json or text)"
            )),
        }
    }
}

impl fmt::Display for ListFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ListFormat::Auto => "auto",
            ListFormat::Json => "json",
            ListFormat::Text => "text",
        })
    }
}

const UNIT_PROPERTIES: &str = "LoadState,ActiveState,SubState";

/// First tokens of header and legend lines in the text listing.
const HEADER_TOKENS: &[&str] = &["UNIT", "LOAD", "ACTIVE", "SUB", "JOB", "Legend:"];

/// Substrings of the summary lines systemctl prints after the table.
const SUMMARY_MARKERS: &[&str] = &[
    "loaded units listed",
    "To show all installed unit files",
    "Pass --all to see",
];

/// Reads unit snapshots and dispatches actions through `systemctl`.
#[derive(Debug, Clone)]
pub struct Systemctl<R> {
    runner: R,
    program: String,
    scope: Scope,
    list_all: bool,
    format: ListFormat,
}

impl Systemctl<ProcessRunner> {
    pub fn from_settings(settings: &Settings) -> Self {
        Systemctl::new(ProcessRunner::new(settings.timeout()))
            .with_program(&settings.systemctl_path)
            .with_scope(settings.scope)
            .with_list_all(settings.list_all)
            .with_format(settings.format)
    }
}

impl<R: CommandRunner> Systemctl<R> {
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            program: "systemctl".to_string(),
            scope: Scope::User,
            list_all: true,
            format: ListFormat::Auto,
        }
    }

    pub fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// List inactive units too (`--all`).
    pub fn with_list_all(mut self, list_all: bool) -> Self {
        self.list_all = list_all;
        self
    }

    pub fn with_format(mut self, format: ListFormat) -> Self {
        self.format = format;
        self
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Fetches every service unit known to the manager, in reported order.
    pub fn read_snapshot(&self) -> Result<Snapshot> {
        let records = match self.format {
            ListFormat::Json => self.list_json()?,
            ListFormat::Text => self.list_text()?,
            ListFormat::Auto => match self.list_json() {
                Ok(records) => records,
                Err(e) => {
                    warn!(error = %e, "JSON unit listing unavailable, falling back to text");
                    self.list_text()?
                }
            },
        };
        debug!(units = records.len(), "Read unit snapshot");
        Ok(Snapshot::from_records(records))
    }

    /// Queries the current states of a single unit.
    pub fn query_unit(&self, service: &str) -> Result<ServiceRecord> {
        validate_unit_name(service)?;
        let args = self.args([
            "show",
            &format!("--property={UNIT_PROPERTIES}"),
            service,
        ]);
        let output = self.query(&args)?;
        parse_unit_properties(service, &output.stdout)
    }

    /// Runs `action` against `service` and returns its refreshed record.
    ///
    /// A non-zero exit is reported as [`Error::ServiceAction`] with the
    /// tool's diagnostic text. The action is never retried.
    pub fn dispatch_action(&self, service: &str, action: ServiceAction) -> Result<ServiceRecord> {
        validate_unit_name(service)?;
        let args = self.args([action.verb(), service]);

        let action_error = |diagnostic: String| Error::ServiceAction {
            service: service.to_string(),
            action,
            diagnostic,
        };

        let output = self
            .runner
            .run(&self.program, &args)
            .map_err(|e| action_error(e.to_string()))?;

        if !output.success {
            let diagnostic = output.diagnostic();
            warn!(
                unit = %service,
                action = %action,
                exit_code = ?output.exit_code,
                stderr = %diagnostic,
                "Service action failed"
            );
            return Err(action_error(diagnostic));
        }

        info!(unit = %service, action = %action, "Service action succeeded");
        self.query_unit(service)
    }

    /// Queries the unit, then dispatches its toggle action.
    pub fn toggle(&self, service: &str) -> Result<(ServiceAction, ServiceRecord)> {
        let current = self.query_unit(service)?;
        let action = ServiceAction::toggle_for(&current);
        let refreshed = self.dispatch_action(service, action)?;
        Ok((action, refreshed))
    }

    fn list_text(&self) -> Result<Vec<ServiceRecord>> {
        let output = self.query(&self.list_args(false))?;
        Ok(parse_list_units(&output.stdout))
    }

    fn list_json(&self) -> Result<Vec<ServiceRecord>> {
        let output = self.query(&self.list_args(true))?;
        parse_list_json(&output.stdout)
    }

    fn list_args(&self, json: bool) -> Vec<String> {
        let mut args = self.args(["list-units", "--type=service"]);
        if self.list_all {
            args.push("--all".to_string());
        }
        args.push("--no-pager".to_string());
        if json {
            args.push("--output=json".to_string());
        }
        args
    }

    fn args<'a>(&self, rest: impl IntoIterator<Item = &'a str>) -> Vec<String> {
        let mut args = Vec::new();
        if self.scope == Scope::User {
            args.push("--user".to_string());
        }
        args.extend(rest.into_iter().map(str::to_string));
        args
    }

    /// Runs a read-only query; anything but a clean exit is an error.
    fn query(&self, args: &[String]) -> Result<CommandOutput> {
        let output = self
            .runner
            .run(&self.program, args)
            .map_err(|e: RunError| Error::external(e.to_string()))?;
        if !output.success {
            return Err(Error::external(output.diagnostic()));
        }
        Ok(output)
    }
}

/// Parses the human-oriented `list-units` table.
///
/// Header, legend and summary lines are dropped, as is a leading bullet
/// glyph. Lines with fewer than four fields are skipped rather than failing
/// the whole listing.
pub fn parse_list_units(output: &str) -> Vec<ServiceRecord> {
    output.lines().filter_map(parse_unit_line).collect()
}

fn parse_unit_line(line: &str) -> Option<ServiceRecord> {
    if SUMMARY_MARKERS.iter().any(|marker| line.contains(marker)) {
        return None;
    }

    let mut tokens = line.split_whitespace().peekable();
    if tokens
        .peek()
        .is_some_and(|token| !token.chars().any(char::is_alphanumeric))
    {
        tokens.next();
    }
    if HEADER_TOKENS.contains(tokens.peek()?) {
        return None;
    }

    let name = tokens.next()?;
    let load_state = tokens.next()?;
    let active_state = tokens.next()?;
    let sub_state = tokens.next()?;
    Some(ServiceRecord::new(name, load_state, active_state, sub_state))
}

#[derive(Debug, Deserialize)]
struct JsonUnit {
    unit: Option<String>,
    load: Option<String>,
    active: Option<String>,
    sub: Option<String>,
}

/// Parses `list-units --output=json`. Entries missing a field are skipped;
/// output that is not a JSON array of objects is an error.
pub fn parse_list_json(output: &str) -> Result<Vec<ServiceRecord>> {
    let units: Vec<JsonUnit> = serde_json::from_str(output)
        .map_err(|e| Error::external(format!("unreadable JSON unit listing: {e}")))?;

    Ok(units
        .into_iter()
        .filter_map(|unit| match unit {
            JsonUnit {
                unit: Some(name),
                load: Some(load),
                active: Some(active),
                sub: Some(sub),
            } if !name.is_empty() => Some(ServiceRecord::new(name, load, active, sub)),
            _ => None,
        })
        .collect())
}

/// Parses `Key=Value` lines from `systemctl show`. Keys may come in any
/// order; all three states must be present.
pub fn parse_unit_properties(service: &str, output: &str) -> Result<ServiceRecord> {
    let mut load_state = None;
    let mut active_state = None;
    let mut sub_state = None;

    for line in output.lines() {
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        let value = value.trim().to_string();
        match key.trim() {
            "LoadState" => load_state = Some(value),
            "ActiveState" => active_state = Some(value),
            "SubState" => sub_state = Some(value),
            _ => {}
        }
    }

    let missing = |key: &str| Error::external(format!("systemctl show {service}: missing {key}"));
    Ok(ServiceRecord {
        name: service.to_string(),
        load_state: load_state.ok_or_else(|| missing("LoadState"))?,
        active_state: active_state.ok_or_else(|| missing("ActiveState"))?,
        sub_state: sub_state.ok_or_else(|| missing("SubState"))?,
    })
}

/// Checks a unit name before it is passed to systemctl as an argument.
pub fn validate_unit_name(name: &str) -> Result<()> {
    let invalid = |reason| Error::InvalidUnitName {
        name: name.to_string(),
        reason,
    };

    if name.is_empty() {
        return Err(invalid("unit name cannot be empty"));
    }
    if name.starts_with('-') {
        return Err(invalid("unit name cannot start with '-'"));
    }
    if name.chars().any(|c| c.is_whitespace() || c.is_control()) {
        return Err(invalid("unit name cannot contain whitespace or control characters"));
    }
    Ok(())
}
