// End-to-end session tests over the scriptable in-memory transport.
//
// Every test runs under paused tokio time, so connect timeouts, scan
// cadence, and the stall sweeper are all deterministic.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use waldo_core::{
    DeviceId, FileRef, GestureKind, InputIntent, RemoteSession, SessionConfig, SessionError,
    SessionState, SettingKind, TransferDirection, TransferId, TransferStatus,
};
use waldo_transport::sim::{sample_devices, ConnectBehavior, SimDevice, SimHandle};
use waldo_transport::{
    AppInfo, AppRunState, AppStateChange, CaptureRequest, CommandPayload, NotificationClass,
    NotificationInfo, NotificationPush, TelemetryFrame, TransferOutcome, TransportEvent,
};

const GALAXY: &str = "galaxy-s23";

fn session_over(sim: SimDevice, config: SessionConfig) -> (RemoteSession, SimHandle) {
    let control = sim.handle();
    (RemoteSession::new(Arc::new(sim), config), control)
}

/// Discover the sample fleet and wait for the scan to complete.
async fn discover(session: &RemoteSession) {
    let mut state = session.watch_state();
    session.start_discovery().await.unwrap();
    state
        .wait_for(|s| *s == SessionState::Disconnected)
        .await
        .unwrap();
}

/// Fresh session connected to the galaxy, commands recorded from zero.
async fn connected() -> (RemoteSession, SimHandle) {
    let (session, control) = session_over(SimDevice::new(sample_devices()), SessionConfig::default());
    discover(&session).await;
    session.connect(&DeviceId::from(GALAXY)).await.unwrap();
    control.clear_sent().await;
    (session, control)
}

/// Give background pumps a moment to apply injected events.
async fn settle() {
    tokio::time::sleep(Duration::from_millis(20)).await;
}

fn posted(id: &str, class: NotificationClass) -> TransportEvent {
    TransportEvent::NotificationPushed(NotificationPush::Posted(NotificationInfo {
        id: id.into(),
        app: "Messages".into(),
        title: "Sarah".into(),
        body: "See you at 6?".into(),
        class,
        unread: true,
        posted_at: chrono::Utc::now(),
    }))
}

fn inventory(package: &str, state: AppRunState) -> TransportEvent {
    TransportEvent::AppStateChanged(AppStateChange::Inventory {
        apps: vec![AppInfo {
            package: package.into(),
            label: "Maps".into(),
            version: "11.2".into(),
            state,
            size_bytes: 48_000_000,
        }],
    })
}

fn transfer_status(session: &RemoteSession, id: TransferId) -> TransferStatus {
    session
        .transfers_snapshot()
        .get(&id.to_string())
        .map(|t| t.status.clone())
        .unwrap()
}

// ── Lifecycle ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn discover_connect_disconnect_ends_clean() {
    let (session, _control) = session_over(SimDevice::new(sample_devices()), SessionConfig::default());

    discover(&session).await;
    assert_eq!(session.devices_snapshot().len(), 3);

    session.connect(&DeviceId::from(GALAXY)).await.unwrap();
    assert_eq!(session.state(), SessionState::Streaming);
    assert_eq!(session.active_device().unwrap().id.as_str(), GALAXY);

    session.disconnect().await;
    assert_eq!(session.state(), SessionState::Disconnected);
    assert!(session.active_device().is_none());
    assert!(session.devices_snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn discovery_is_only_valid_from_disconnected() {
    let (session, _control) = session_over(SimDevice::new(sample_devices()), SessionConfig::default());

    session.start_discovery().await.unwrap();
    assert_eq!(session.state(), SessionState::Discovering);

    let err = session.start_discovery().await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidState { .. }));
}

#[tokio::test(start_paused = true)]
async fn connect_requires_a_discovered_device() {
    let (session, _control) = session_over(SimDevice::new(sample_devices()), SessionConfig::default());

    let err = session.connect(&DeviceId::from(GALAXY)).await.unwrap_err();
    assert!(matches!(err, SessionError::UnknownDevice { .. }));
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn connect_timeout_lands_in_error_and_disconnect_recovers() {
    let sim = SimDevice::new(sample_devices());
    sim.on_connect(GALAXY, ConnectBehavior::Stall);
    let (session, _control) = session_over(sim, SessionConfig::default());

    discover(&session).await;
    let err = session.connect(&DeviceId::from(GALAXY)).await.unwrap_err();
    assert!(matches!(err, SessionError::Timeout { .. }));
    assert!(matches!(session.state(), SessionState::Error { .. }));

    // The only way out of Error is an explicit disconnect.
    session.disconnect().await;
    assert_eq!(session.state(), SessionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn connect_rejection_lands_in_error() {
    let sim = SimDevice::new(sample_devices());
    sim.on_connect(
        GALAXY,
        ConnectBehavior::Reject {
            reason: "pairing declined".into(),
        },
    );
    let (session, _control) = session_over(sim, SessionConfig::default());

    discover(&session).await;
    let err = session.connect(&DeviceId::from(GALAXY)).await.unwrap_err();
    assert!(matches!(err, SessionError::Transport(_)));
    assert!(matches!(session.state(), SessionState::Error { .. }));
}

#[tokio::test(start_paused = true)]
async fn device_initiated_drop_faults_but_keeps_registries() {
    let (session, control) = connected().await;
    control.inject(posted("n-1", NotificationClass::Message)).await.unwrap();
    settle().await;

    control
        .inject(TransportEvent::Disconnected {
            reason: "battery died".into(),
        })
        .await
        .unwrap();
    settle().await;

    assert_eq!(
        session.state(),
        SessionState::Error {
            reason: "battery died".into()
        }
    );
    // Last known world stays inspectable until disconnect.
    assert_eq!(session.notifications_snapshot().len(), 1);
    assert!(matches!(
        session.dispatch_input(&InputIntent::tap(50.0, 50.0)),
        Err(SessionError::NotConnected)
    ));

    session.disconnect().await;
    assert!(session.notifications_snapshot().is_empty());
}

// ── Input dispatch ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn pause_blocks_input_and_resume_restores_it() {
    let (session, control) = connected().await;

    session.pause_streaming().unwrap();
    assert_eq!(session.state(), SessionState::Paused);
    assert!(matches!(
        session.dispatch_input(&InputIntent::tap(50.0, 50.0)),
        Err(SessionError::NotStreaming)
    ));

    session.resume_streaming().unwrap();
    session.dispatch_input(&InputIntent::tap(50.0, 50.0)).unwrap();
    settle().await;

    // The paused attempt produced no send; the resumed one exactly one.
    let taps: Vec<_> = control
        .sent()
        .await
        .into_iter()
        .filter(|p| matches!(p, CommandPayload::Tap { .. }))
        .collect();
    assert_eq!(taps, [CommandPayload::Tap { x: 50.0, y: 50.0 }]);
}

#[tokio::test(start_paused = true)]
async fn pause_and_resume_are_idempotent() {
    let (session, _control) = connected().await;

    session.pause_streaming().unwrap();
    session.pause_streaming().unwrap();
    assert_eq!(session.state(), SessionState::Paused);

    session.resume_streaming().unwrap();
    session.resume_streaming().unwrap();
    assert_eq!(session.state(), SessionState::Streaming);
}

#[tokio::test(start_paused = true)]
async fn system_keys_pass_while_paused() {
    let (session, control) = connected().await;
    session.pause_streaming().unwrap();

    session.dispatch_input(&InputIntent::key("VolumeUp")).unwrap();
    assert!(matches!(
        session.dispatch_input(&InputIntent::key("a")),
        Err(SessionError::NotStreaming)
    ));
    assert!(matches!(
        session.dispatch_input(&InputIntent::Gesture(GestureKind::SwipeUp)),
        Err(SessionError::NotStreaming)
    ));
    settle().await;

    assert_eq!(control.sent().await, [CommandPayload::Key { code: 24, meta: 0 }]);
}

#[tokio::test(start_paused = true)]
async fn input_without_a_session_is_not_connected() {
    let (session, _control) = session_over(SimDevice::new(sample_devices()), SessionConfig::default());
    assert!(matches!(
        session.dispatch_input(&InputIntent::key("Enter")),
        Err(SessionError::NotConnected)
    ));
}

#[tokio::test(start_paused = true)]
async fn encoding_failures_send_nothing() {
    let (session, control) = connected().await;

    assert!(matches!(
        session.dispatch_input(&InputIntent::key("Hyper")),
        Err(SessionError::Encode(_))
    ));
    assert!(matches!(
        session.dispatch_input(&InputIntent::tap(120.0, 50.0)),
        Err(SessionError::Encode(_))
    ));
    settle().await;
    assert!(control.sent().await.is_empty());
}

// ── Settings ─────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn settings_reject_out_of_range_and_read_back() {
    let (session, _control) = connected().await;

    let err = session.update_setting(SettingKind::Quality, 150).unwrap_err();
    assert!(matches!(
        err,
        SessionError::OutOfRange {
            setting: SettingKind::Quality,
            value: 150,
            min: 0,
            max: 100,
        }
    ));

    session.update_setting(SettingKind::Quality, 50).unwrap();
    assert_eq!(session.settings().quality, 50);
}

#[tokio::test(start_paused = true)]
async fn disconnect_restores_initial_settings() {
    let (session, _control) = connected().await;
    session.update_setting(SettingKind::Volume, 5).unwrap();

    session.disconnect().await;
    assert_eq!(session.settings(), SessionConfig::default().initial_settings);
}

// ── Capture ──────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn recording_flag_round_trips_and_resets_on_disconnect() {
    let (session, control) = connected().await;
    assert!(!session.is_recording());

    session.start_recording().unwrap();
    assert!(session.is_recording());
    session.stop_recording().unwrap();
    assert!(!session.is_recording());
    settle().await;
    assert_eq!(
        control.sent().await,
        [
            CommandPayload::Capture(CaptureRequest::RecordStart),
            CommandPayload::Capture(CaptureRequest::RecordStop),
        ]
    );

    session.start_recording().unwrap();
    session.disconnect().await;
    assert!(!session.is_recording());
}

#[tokio::test(start_paused = true)]
async fn screenshot_works_while_paused() {
    let (session, control) = connected().await;
    session.pause_streaming().unwrap();

    session.take_screenshot().unwrap();
    settle().await;
    assert_eq!(
        control.sent().await,
        [CommandPayload::Capture(CaptureRequest::Screenshot)]
    );
}

// ── Telemetry ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn telemetry_enriches_the_active_device() {
    let (session, control) = connected().await;

    control
        .inject(TransportEvent::Telemetry(TelemetryFrame {
            battery_percent: 42,
            signal_bars: 1,
            storage: None,
        }))
        .await
        .unwrap();
    settle().await;

    let device = session.active_device().unwrap();
    assert_eq!(device.battery_percent, Some(42));
    assert_eq!(device.signal_bars, 1);
    // The frame is retained even with no watch subscriber around.
    assert_eq!(session.last_telemetry().unwrap().battery_percent, 42);

    session.disconnect().await;
    assert!(session.last_telemetry().is_none());
}

// ── Apps ─────────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn launch_then_stop_round_trips_and_sends_commands() {
    let (session, control) = connected().await;
    control.inject(inventory("com.maps", AppRunState::Stopped)).await.unwrap();
    settle().await;

    session.launch_app("com.maps").unwrap();
    assert_eq!(
        session.apps_snapshot().get("com.maps").unwrap().status,
        waldo_core::AppStatus::Running
    );

    session.stop_app("com.maps").unwrap();
    assert_eq!(
        session.apps_snapshot().get("com.maps").unwrap().status,
        waldo_core::AppStatus::Stopped
    );

    settle().await;
    assert_eq!(
        control.sent().await,
        [
            CommandPayload::LaunchApp {
                package: "com.maps".into()
            },
            CommandPayload::StopApp {
                package: "com.maps".into()
            },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn authoritative_inventory_overwrites_optimistic_launch() {
    let (session, control) = connected().await;
    control.inject(inventory("com.maps", AppRunState::Stopped)).await.unwrap();
    settle().await;

    session.launch_app("com.maps").unwrap();

    // The device disagrees: the launch never took.
    control.inject(inventory("com.maps", AppRunState::Stopped)).await.unwrap();
    settle().await;
    assert_eq!(
        session.apps_snapshot().get("com.maps").unwrap().status,
        waldo_core::AppStatus::Stopped
    );
}

#[tokio::test(start_paused = true)]
async fn uninstall_is_pending_until_acknowledged() {
    let (session, control) = connected().await;
    control.inject(inventory("com.maps", AppRunState::Stopped)).await.unwrap();
    settle().await;

    session.uninstall_app("com.maps").unwrap();
    assert!(session.apps_snapshot().get("com.maps").unwrap().pending_removal);

    // Repeated actions on the pending entry fail.
    assert!(matches!(
        session.uninstall_app("com.maps"),
        Err(SessionError::PendingAction { .. })
    ));
    assert!(matches!(
        session.launch_app("com.maps"),
        Err(SessionError::PendingAction { .. })
    ));

    control
        .inject(TransportEvent::AppStateChanged(AppStateChange::Removed {
            package: "com.maps".into(),
        }))
        .await
        .unwrap();
    settle().await;
    assert!(session.apps_snapshot().is_empty());
}

#[tokio::test(start_paused = true)]
async fn refresh_apps_requests_an_inventory() {
    let (session, control) = connected().await;
    session.refresh_apps().unwrap();
    settle().await;
    assert_eq!(control.sent().await, [CommandPayload::RequestAppInventory]);
}

// ── Notifications ────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn dismiss_and_reply_follow_category_rules() {
    let (session, control) = connected().await;
    control.inject(posted("msg", NotificationClass::Message)).await.unwrap();
    control.inject(posted("mail", NotificationClass::Email)).await.unwrap();
    settle().await;

    assert!(matches!(
        session.reply_to_notification("mail", "on my way"),
        Err(SessionError::Unsupported { .. })
    ));
    session.reply_to_notification("msg", "on my way").unwrap();

    session.dismiss_notification("mail").unwrap();
    assert_eq!(session.notifications_snapshot().len(), 1);
    assert!(matches!(
        session.dismiss_notification("mail"),
        Err(SessionError::UnknownNotification { .. })
    ));

    settle().await;
    assert_eq!(
        control.sent().await,
        [
            CommandPayload::ReplyNotification {
                id: "msg".into(),
                text: "on my way".into()
            },
            CommandPayload::DismissNotification { id: "mail".into() },
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn bulk_notification_actions_apply_locally_and_send() {
    let (session, control) = connected().await;
    control.inject(posted("a", NotificationClass::Message)).await.unwrap();
    control.inject(posted("b", NotificationClass::Call)).await.unwrap();
    settle().await;

    session.mark_all_notifications_read().unwrap();
    assert!(session.notifications_snapshot().iter().all(|n| !n.unread));

    session.clear_notifications().unwrap();
    assert!(session.notifications_snapshot().is_empty());

    settle().await;
    assert_eq!(
        control.sent().await,
        [
            CommandPayload::MarkAllNotificationsRead,
            CommandPayload::ClearAllNotifications,
        ]
    );
}

// ── Transfers ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn transfer_runs_to_completion_with_monotonic_progress() {
    let sim = SimDevice::new(sample_devices());
    sim.set_auto_transfers(true);
    let (session, _control) = session_over(sim, SessionConfig::default());
    discover(&session).await;
    session.connect(&DeviceId::from(GALAXY)).await.unwrap();

    let id = session
        .start_transfer(TransferDirection::Upload, FileRef::new("a.zip", Some(1_000)))
        .unwrap();
    assert_eq!(transfer_status(&session, id), TransferStatus::Queued);

    let mut last = 0;
    let mut stream = session.transfers();
    while !transfer_status(&session, id).is_terminal() {
        stream.changed().await.unwrap();
        let percent = session.transfer_progress(id).unwrap();
        assert!(percent >= last, "progress regressed: {last} -> {percent}");
        last = percent;
    }

    assert_eq!(transfer_status(&session, id), TransferStatus::Completed);
    assert_eq!(session.transfer_progress(id).unwrap(), 100);

    // Cancel after completion is a no-op error on a terminal handle.
    assert!(matches!(
        session.cancel_transfer(id),
        Err(SessionError::InvalidState { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn cancelled_transfer_never_revives() {
    let (session, control) = connected().await;

    let id = session
        .start_transfer(TransferDirection::Download, FileRef::new("b.bin", Some(500)))
        .unwrap();
    control
        .inject(TransportEvent::TransferProgress {
            id,
            transferred: 100,
            total: Some(500),
        })
        .await
        .unwrap();
    settle().await;
    assert_eq!(transfer_status(&session, id), TransferStatus::Active);

    session.cancel_transfer(id).unwrap();
    assert_eq!(transfer_status(&session, id), TransferStatus::Cancelled);

    // Late events for the cancelled handle are ignored.
    control
        .inject(TransportEvent::TransferProgress {
            id,
            transferred: 400,
            total: Some(500),
        })
        .await
        .unwrap();
    control
        .inject(TransportEvent::TransferTerminal {
            id,
            outcome: TransferOutcome::Completed,
        })
        .await
        .unwrap();
    settle().await;
    assert_eq!(transfer_status(&session, id), TransferStatus::Cancelled);

    settle().await;
    assert!(control
        .sent()
        .await
        .contains(&CommandPayload::TransferAbort { id }));
}

#[tokio::test(start_paused = true)]
async fn transfers_fail_independently() {
    let (session, control) = connected().await;

    let doomed = session
        .start_transfer(TransferDirection::Upload, FileRef::new("a", Some(100)))
        .unwrap();
    let healthy = session
        .start_transfer(TransferDirection::Upload, FileRef::new("b", Some(100)))
        .unwrap();

    control
        .inject(TransportEvent::TransferProgress {
            id: healthy,
            transferred: 50,
            total: Some(100),
        })
        .await
        .unwrap();
    control
        .inject(TransportEvent::TransferTerminal {
            id: doomed,
            outcome: TransferOutcome::Failed {
                reason: "device storage full".into(),
            },
        })
        .await
        .unwrap();
    settle().await;

    assert_eq!(
        transfer_status(&session, doomed),
        TransferStatus::Failed {
            reason: "device storage full".into()
        }
    );
    assert_eq!(transfer_status(&session, healthy), TransferStatus::Active);
    assert_eq!(session.state(), SessionState::Streaming);
}

#[tokio::test(start_paused = true)]
async fn stalled_transfer_is_failed_by_the_sweeper() {
    let sim = SimDevice::new(sample_devices());
    let control = sim.handle();
    let config = SessionConfig {
        transfer_inactivity_timeout: Duration::from_secs(2),
        transfer_sweep_interval: Duration::from_millis(500),
        ..SessionConfig::default()
    };
    let session = RemoteSession::new(Arc::new(sim), config);
    discover(&session).await;
    session.connect(&DeviceId::from(GALAXY)).await.unwrap();

    let id = session
        .start_transfer(TransferDirection::Upload, FileRef::new("a.zip", Some(100)))
        .unwrap();
    control
        .inject(TransportEvent::TransferProgress {
            id,
            transferred: 10,
            total: Some(100),
        })
        .await
        .unwrap();
    settle().await;

    // No further progress: the sweeper fails it and aborts cooperatively.
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(
        transfer_status(&session, id),
        TransferStatus::Failed {
            reason: "transfer stalled".into()
        }
    );
    assert!(control
        .sent()
        .await
        .contains(&CommandPayload::TransferAbort { id }));
}

#[tokio::test(start_paused = true)]
async fn disconnect_fails_live_transfers_but_keeps_the_archive() {
    let (session, control) = connected().await;

    let done = session
        .start_transfer(TransferDirection::Upload, FileRef::new("a", Some(10)))
        .unwrap();
    control
        .inject(TransportEvent::TransferTerminal {
            id: done,
            outcome: TransferOutcome::Completed,
        })
        .await
        .unwrap();
    settle().await;
    let live = session
        .start_transfer(TransferDirection::Upload, FileRef::new("b", Some(10)))
        .unwrap();

    session.disconnect().await;

    assert_eq!(transfer_status(&session, done), TransferStatus::Completed);
    assert_eq!(
        transfer_status(&session, live),
        TransferStatus::Failed {
            reason: "connection closed".into()
        }
    );
}

#[tokio::test(start_paused = true)]
async fn rejected_transfer_start_leaves_no_handle_behind() {
    let (session, _control) = connected().await;

    // Fill the command queue without yielding, so the driver never
    // drains it and the next start hits the backlog.
    let mut started: usize = 0;
    let mut rejection = None;
    for _ in 0..=waldo_transport::handle::DEFAULT_COMMAND_CAPACITY {
        match session.start_transfer(TransferDirection::Upload, FileRef::new("bulk", Some(10))) {
            Ok(_) => started += 1,
            Err(e) => {
                rejection = Some(e);
                break;
            }
        }
    }

    let err = rejection.unwrap();
    assert!(matches!(err, SessionError::Transport(_)));
    // Backlog is transient: the session stays up.
    assert_eq!(session.state(), SessionState::Streaming);
    // The rejected start registered nothing.
    assert_eq!(session.transfers_snapshot().len(), started);
}

#[tokio::test(start_paused = true)]
async fn transfers_require_a_connection_but_not_streaming() {
    let (session, _control) = session_over(SimDevice::new(sample_devices()), SessionConfig::default());
    assert!(matches!(
        session.start_transfer(TransferDirection::Upload, FileRef::new("a", None)),
        Err(SessionError::NotConnected)
    ));

    let (session, _control) = connected().await;
    session.pause_streaming().unwrap();
    assert!(session
        .start_transfer(TransferDirection::Upload, FileRef::new("a", None))
        .is_ok());
}
