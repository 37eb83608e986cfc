//! Snapshot reading and action dispatch against a scripted systemctl.

mod common;

use common::{JSON_LISTING, ScriptedRunner, TEXT_LISTING, show_output};
use systemd_user_tui::Error;
use systemd_user_tui::app::model::{ServiceAction, ServiceRecord};
use systemd_user_tui::app::systemd::{ListFormat, Scope, Systemctl};

fn names(systemctl: &Systemctl<ScriptedRunner>) -> Vec<String> {
    systemctl
        .read_snapshot()
        .unwrap()
        .iter()
        .map(|r| r.name.clone())
        .collect()
}

#[test]
fn test_text_snapshot_uses_user_scope_and_all_units() {
    let systemctl = Systemctl::new(ScriptedRunner::new().ok(TEXT_LISTING)).with_format(ListFormat::Text);

    assert_eq!(names(&systemctl), ["dbus.service", "sync.service", "backup.service"]);
    assert_eq!(
        systemctl.runner().call(0),
        "systemctl --user list-units --type=service --all --no-pager"
    );
}

#[test]
fn test_json_and_text_listings_agree() {
    let text = Systemctl::new(ScriptedRunner::new().ok(TEXT_LISTING))
        .with_format(ListFormat::Text)
        .read_snapshot()
        .unwrap();
    let json = Systemctl::new(ScriptedRunner::new().ok(JSON_LISTING))
        .with_format(ListFormat::Json)
        .read_snapshot()
        .unwrap();

    assert_eq!(text, json);
}

#[test]
fn test_auto_prefers_json() {
    let systemctl = Systemctl::new(ScriptedRunner::new().ok(JSON_LISTING));

    assert_eq!(systemctl.read_snapshot().unwrap().len(), 3);
    assert_eq!(systemctl.runner().calls().len(), 1);
    assert!(systemctl.runner().call(0).ends_with("--output=json"));
}

#[test]
fn test_auto_falls_back_to_text() {
    let runner = ScriptedRunner::new()
        .fail(1, "Unknown output 'json'.")
        .ok(TEXT_LISTING);
    let systemctl = Systemctl::new(runner);

    assert_eq!(names(&systemctl), ["dbus.service", "sync.service", "backup.service"]);
    assert!(!systemctl.runner().call(1).contains("--output=json"));
}

#[test]
fn test_active_only_and_system_scope() {
    let systemctl = Systemctl::new(ScriptedRunner::new().ok(""))
        .with_format(ListFormat::Text)
        .with_scope(Scope::System)
        .with_list_all(false)
        .with_program("/usr/bin/systemctl");

    assert!(systemctl.read_snapshot().unwrap().is_empty());
    assert_eq!(
        systemctl.runner().call(0),
        "/usr/bin/systemctl list-units --type=service --no-pager"
    );
}

#[test]
fn test_snapshot_failure_is_an_error_not_an_empty_list() {
    let systemctl = Systemctl::new(ScriptedRunner::new().missing_binary()).with_format(ListFormat::Text);
    assert!(matches!(systemctl.read_snapshot(), Err(Error::ExternalTool { .. })));

    let runner = ScriptedRunner::new()
        .fail(1, "Failed to connect to bus: No medium found")
        .fail(1, "Failed to connect to bus: No medium found");
    let systemctl = Systemctl::new(runner);
    match systemctl.read_snapshot() {
        Err(Error::ExternalTool { diagnostic }) => {
            assert_eq!(diagnostic, "Failed to connect to bus: No medium found")
        }
        other => panic!("expected ExternalTool error, got {other:?}"),
    }
}

#[test]
fn test_dispatch_refreshes_the_unit() {
    let runner = ScriptedRunner::new()
        .ok("")
        .ok(&show_output("loaded", "active", "running"));
    let systemctl = Systemctl::new(runner);

    let record = systemctl
        .dispatch_action("backup.service", ServiceAction::Start)
        .unwrap();

    assert_eq!(
        record,
        ServiceRecord::new("backup.service", "loaded", "active", "running")
    );
    assert_eq!(systemctl.runner().call(0), "systemctl --user start backup.service");
    assert_eq!(
        systemctl.runner().call(1),
        "systemctl --user show --property=LoadState,ActiveState,SubState backup.service"
    );
}

#[test]
fn test_failed_action_reports_diagnostic_and_skips_refresh() {
    let runner = ScriptedRunner::new().fail(
        5,
        "Failed to start nope.service: Unit nope.service not found.\n",
    );
    let systemctl = Systemctl::new(runner);

    match systemctl.dispatch_action("nope.service", ServiceAction::Start) {
        Err(Error::ServiceAction {
            service,
            action,
            diagnostic,
        }) => {
            assert_eq!(service, "nope.service");
            assert_eq!(action, ServiceAction::Start);
            assert_eq!(
                diagnostic,
                "Failed to start nope.service: Unit nope.service not found."
            );
        }
        other => panic!("expected ServiceAction error, got {other:?}"),
    }
    // No retry and no property query.
    assert_eq!(systemctl.runner().calls().len(), 1);
}

#[test]
fn test_action_timeout_is_a_service_action_error() {
    let systemctl = Systemctl::new(ScriptedRunner::new().timeout());
    let result = systemctl.dispatch_action("slow.service", ServiceAction::Stop);
    assert!(matches!(result, Err(Error::ServiceAction { .. })));
}

#[test]
fn test_invalid_unit_name_runs_nothing() {
    let systemctl = Systemctl::new(ScriptedRunner::new());

    let result = systemctl.dispatch_action("--no-block", ServiceAction::Stop);
    assert!(matches!(result, Err(Error::InvalidUnitName { .. })));
    assert!(systemctl.runner().calls().is_empty());
}

#[test]
fn test_toggle_stops_a_running_unit() {
    let runner = ScriptedRunner::new()
        .ok(&show_output("loaded", "active", "running"))
        .ok("")
        .ok(&show_output("loaded", "inactive", "dead"));
    let systemctl = Systemctl::new(runner);

    let (action, record) = systemctl.toggle("dbus.service").unwrap();

    assert_eq!(action, ServiceAction::Stop);
    assert_eq!(record.sub_state, "dead");
    assert_eq!(systemctl.runner().call(1), "systemctl --user stop dbus.service");
}
