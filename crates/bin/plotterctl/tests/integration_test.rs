//! End-to-end tests for the session engine over the simulated plotter.
//!
//! Each test wires a real `PlotterSession` to the virtual adapter, so the
//! receive loop, the query round trip and the wire encoding all run for real.
//! No serial hardware is touched.

use std::time::Duration;

use plotter_adapter_virtual::{VIRTUAL_PORT, VirtualPlotter};
use plotter_app::intent::{Intent, JogDirection};
use plotter_app::services::{PlotterSession, SessionOptions};
use plotter_domain::command::{Command, DEFAULT_FLOW};
use plotter_domain::command_record::{CommandRecord, Direction};
use plotter_domain::error::PlotterError;
use plotter_domain::mode::Mode;
use plotter_domain::position::Position;
use plotter_domain::session_config::SessionConfig;
use tokio_stream::StreamExt;

fn options() -> SessionOptions {
    SessionOptions {
        read_poll: Duration::from_millis(10),
        query_timeout: Duration::from_millis(500),
        log_capacity: 256,
        resync_delay: None,
    }
}

async fn connected(plotter: &VirtualPlotter) -> PlotterSession<VirtualPlotter> {
    let session = PlotterSession::new(plotter.clone(), options());
    session
        .handle(Intent::Connect(SessionConfig::for_port(VIRTUAL_PORT)))
        .await
        .expect("simulated plotter should open");
    session
}

async fn wait_for_position(session: &PlotterSession<VirtualPlotter>, expected: Position) {
    let mut state = session.subscribe_state();
    tokio::time::timeout(Duration::from_secs(1), async {
        while state.borrow_and_update().position != expected {
            state.changed().await.unwrap();
        }
    })
    .await
    .expect("position should be reported");
}

// ---------------------------------------------------------------------------
// Connected mode
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_connect_move_and_disconnect() {
    let plotter = VirtualPlotter::default();
    let session = connected(&plotter).await;
    assert_eq!(session.mode(), Mode::Connected);

    session
        .handle(Intent::MoveRelative { dx_mm: 20, dy_mm: 10 })
        .await
        .unwrap();

    assert_eq!(plotter.device_state().position, Position::new(20_000, 10_000, 0));
    assert_eq!(session.snapshot().position, Position::new(20_000, 10_000, 0));

    session.handle(Intent::Disconnect).await.unwrap();
    assert_eq!(session.mode(), Mode::Disconnected);
}

#[tokio::test]
async fn should_refresh_from_device_before_moving() {
    let plotter = VirtualPlotter::default();
    let session = connected(&plotter).await;
    plotter.set_position(Position::new(50_000, 50_000, 0));

    session
        .handle(Intent::MoveAbsolute { x_mm: Some(60), y_mm: Some(40) })
        .await
        .unwrap();

    assert_eq!(plotter.written(), vec!["!ON0;".to_string(), "PR10000,-10000;".to_string()]);
    assert_eq!(plotter.device_state().position, Position::new(60_000, 40_000, 0));
    session.disconnect().await;
}

#[tokio::test]
async fn should_keep_missing_axis_where_the_device_is() {
    let plotter = VirtualPlotter::default();
    let session = connected(&plotter).await;
    plotter.set_position(Position::new(0, 30_000, 0));

    session
        .handle(Intent::MoveAbsolute { x_mm: Some(10), y_mm: None })
        .await
        .unwrap();

    assert_eq!(plotter.written(), vec!["!ON0;".to_string(), "PR10000,0;".to_string()]);
    assert_eq!(plotter.device_state().position, Position::new(10_000, 30_000, 0));
    assert_eq!(session.snapshot().position, Position::new(10_000, 30_000, 0));
    session.disconnect().await;
}

#[tokio::test]
async fn should_resync_with_device_after_move() {
    let plotter = VirtualPlotter::default();
    let session = PlotterSession::new(
        plotter.clone(),
        SessionOptions {
            resync_delay: Some(Duration::from_millis(20)),
            ..options()
        },
    );
    session
        .connect(SessionConfig::for_port(VIRTUAL_PORT))
        .await
        .unwrap();

    session.move_relative(10_000, 0).await.unwrap();
    // the head is nudged before the follow-up query runs
    plotter.set_position(Position::new(9_500, 0, 0));

    wait_for_position(&session, Position::new(9_500, 0, 0)).await;
    assert_eq!(plotter.written().last().map(String::as_str), Some("!ON0;"));
    session.disconnect().await;
}

#[tokio::test]
async fn should_reject_move_that_leaves_workspace_after_refresh() {
    let plotter = VirtualPlotter::at(Position::new(195_000, 0, 0));
    let session = connected(&plotter).await;

    let result = session
        .handle(Intent::Jog { direction: JogDirection::Right, step_mm: 10 })
        .await;

    assert!(matches!(result, Err(PlotterError::OutOfBounds(_))));
    assert_eq!(plotter.written(), vec!["!ON0;".to_string()]);
    assert_eq!(plotter.device_state().position, Position::new(195_000, 0, 0));
    session.disconnect().await;
}

#[tokio::test]
async fn should_keep_cached_position_when_device_is_silent() {
    let plotter = VirtualPlotter::default();
    plotter.set_silent(true);
    let session = PlotterSession::new(
        plotter.clone(),
        SessionOptions {
            query_timeout: Duration::from_millis(50),
            ..options()
        },
    );
    session
        .connect(SessionConfig::for_port(VIRTUAL_PORT))
        .await
        .unwrap();

    let position = session.refresh_position().await.unwrap();

    assert_eq!(position, Position::ORIGIN);
    assert_eq!(session.mode(), Mode::Connected);
    session.disconnect().await;
}

#[tokio::test]
async fn should_apply_position_report_from_query_command() {
    let plotter = VirtualPlotter::at(Position::new(7_000, 8_000, 0));
    let session = connected(&plotter).await;

    session
        .handle(Intent::Command(Command::QueryPosition))
        .await
        .unwrap();

    wait_for_position(&session, Position::new(7_000, 8_000, 0)).await;
    session.disconnect().await;
}

#[tokio::test]
async fn should_apply_unsolicited_report() {
    let plotter = VirtualPlotter::default();
    let session = connected(&plotter).await;

    assert!(plotter.inject_line("P1234,5678,9C\r"));

    wait_for_position(&session, Position::new(1234, 5678, 9)).await;
    session.disconnect().await;
}

#[tokio::test]
async fn should_track_pen_and_motor_from_raw_text() {
    let plotter = VirtualPlotter::default();
    let session = connected(&plotter).await;

    session.handle(Intent::SendRaw("!EM1;PD".to_string())).await.unwrap();

    let state = session.snapshot();
    assert!(state.motor_enabled);
    assert!(state.pen_down);
    assert_eq!(plotter.written(), vec!["!EM1;PD;".to_string()]);
    session.disconnect().await;
}

#[tokio::test]
async fn should_stay_connected_after_write_failure() {
    let plotter = VirtualPlotter::default();
    let session = connected(&plotter).await;
    plotter.set_fail_writes(true);

    let result = session.handle(Intent::Command(Command::PenDown)).await;

    assert!(matches!(result, Err(PlotterError::Transport(_))));
    assert_eq!(session.mode(), Mode::Connected);

    plotter.set_fail_writes(false);
    session.handle(Intent::Command(Command::PenDown)).await.unwrap();
    assert!(session.snapshot().pen_down);
    session.disconnect().await;
}

#[tokio::test]
async fn should_report_unavailable_port() {
    let plotter = VirtualPlotter::default();
    plotter.set_fail_open(true);
    let session = PlotterSession::new(plotter, options());

    let result = session
        .handle(Intent::Connect(SessionConfig::for_port(VIRTUAL_PORT)))
        .await;

    assert!(matches!(result, Err(PlotterError::Connect(_))));
    assert_eq!(session.mode(), Mode::Disconnected);
}

#[tokio::test]
async fn should_reconnect_after_disconnect() {
    let plotter = VirtualPlotter::default();
    let session = connected(&plotter).await;
    session.disconnect().await;

    session
        .connect(SessionConfig::for_port(VIRTUAL_PORT))
        .await
        .unwrap();
    session.move_relative(1_000, 0).await.unwrap();

    assert_eq!(plotter.device_state().position, Position::new(1_000, 0, 0));
    session.disconnect().await;
}

// ---------------------------------------------------------------------------
// Emulation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn should_emulate_without_touching_the_device() {
    let plotter = VirtualPlotter::default();
    let session = PlotterSession::new(plotter.clone(), options());
    session.handle(Intent::SetEmulation(true)).await.unwrap();

    session
        .handle(Intent::MoveRelative { dx_mm: 30, dy_mm: 30 })
        .await
        .unwrap();
    session
        .handle(Intent::ExecuteFlow(DEFAULT_FLOW.to_string()))
        .await
        .unwrap();

    assert!(plotter.written().is_empty());
    let state = session.snapshot();
    assert_eq!(state.position, Position::new(30_000, 30_000, 0));
    assert!(!state.pen_down);
}

#[tokio::test]
async fn should_drop_connection_when_emulation_starts() {
    let plotter = VirtualPlotter::default();
    let session = connected(&plotter).await;

    session.handle(Intent::SetEmulation(true)).await.unwrap();
    session.handle(Intent::Command(Command::PenDown)).await.unwrap();

    assert_eq!(session.mode(), Mode::Emulated);
    assert!(plotter.written().is_empty());
    assert!(!plotter.inject_line("P1,1,0C"));
}

#[tokio::test]
async fn should_stream_terminal_log_in_order() {
    let plotter = VirtualPlotter::default();
    let session = PlotterSession::new(plotter, options());
    let log = session.subscribe_log();

    session.handle(Intent::SetEmulation(true)).await.unwrap();
    session
        .handle(Intent::MoveRelative { dx_mm: 300, dy_mm: 0 })
        .await
        .unwrap_err();
    session.handle(Intent::SendRaw("PD".to_string())).await.unwrap();

    let records: Vec<CommandRecord> = tokio::time::timeout(
        Duration::from_secs(1),
        log.take(4).collect::<Vec<_>>(),
    )
    .await
    .unwrap();

    assert_eq!(records[0].text, "Emulation mode enabled.");
    assert_eq!(
        records[1].text,
        "Movement would go outside workspace! Command not executed."
    );
    assert_eq!(records[2].direction, Direction::Sent);
    assert_eq!(records[2].text, "PD;");
    assert_eq!(records[3].text, "Emulation, no communication");
}
