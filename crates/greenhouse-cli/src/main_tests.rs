use chrono::Utc;
use clap::Parser;
use greenhouse_core::{DashboardSnapshot, NodeView, PollQuality};

use crate::{status_view, Cli, Command, OutputFormat};

fn dashboard(status_ok: u64) -> DashboardSnapshot {
    DashboardSnapshot {
        ts: Utc::now(),
        controller: "http://192.168.10.228".to_string(),
        connected: false,
        alarm: true,
        last_update: None,
        nodes: vec![
            NodeView {
                id: "node1".to_string(),
                name: "Greenhouse".to_string(),
                category: Some("ambient".to_string()),
                reachable: true,
                readings: Default::default(),
            },
            NodeView {
                id: "node2".to_string(),
                name: "Humidity control".to_string(),
                category: None,
                reachable: false,
                readings: Default::default(),
            },
        ],
        quality: PollQuality {
            status_ok,
            ..PollQuality::default()
        },
    }
}

#[test]
fn status_subcommand_parses_with_format() {
    // Arrange
    let args = ["greenhoused", "--controller", "10.0.0.5", "status", "--format", "json"];

    // Act
    let cli = Cli::try_parse_from(args).expect("status args");

    // Assert
    assert_eq!(cli.controller, "10.0.0.5");
    assert!(matches!(cli.command, Command::Status { format: OutputFormat::Json }));
}

#[test]
fn status_defaults_to_human_output() {
    let cli = Cli::try_parse_from(["greenhoused", "status"]).expect("status args");

    assert!(matches!(cli.command, Command::Status { format: OutputFormat::Human }));
}

#[test]
fn status_view_lists_alarm_and_reachability() {
    // Arrange
    let dashboard = dashboard(1);

    // Act
    let view = status_view(&dashboard);

    // Assert
    assert_eq!(view["reachable"], true);
    assert_eq!(view["alarm"], true);
    assert_eq!(view["nodes"][0]["id"], "node1");
    assert_eq!(view["nodes"][0]["reachable"], true);
    assert_eq!(view["nodes"][1]["reachable"], false);
    assert!(view.get("readings").is_none());
}

#[test]
fn status_view_marks_unreachable_controller() {
    let view = status_view(&dashboard(0));

    assert_eq!(view["reachable"], false);
}
