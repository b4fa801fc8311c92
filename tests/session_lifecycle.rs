//! Session controller driven end to end with fake devices and a scripted
//! remote endpoint.

mod common;

use std::sync::atomic::Ordering;
use std::time::Duration;

use antreiber_coach::net_link::TransportEvent;
use antreiber_coach::quiz::calculate_scores;
use antreiber_coach::{spawn_session_actor, SessionError, SessionState, SessionStatus};
use common::{eventually, harness, harness_with, pump, speech, DeviceLog, DeviceSetup};

fn count(counter: &std::sync::atomic::AtomicUsize) -> usize {
    DeviceLog::count(counter)
}

#[tokio::test]
async fn full_session_releases_every_resource_once() {
    let mut h = harness(false);
    let scores = calculate_scores(&[3; 50]);

    h.controller.start(&scores).await.unwrap();
    assert_eq!(h.controller.state(), &SessionState::Connecting);
    assert_eq!(h.controller.current_status(), SessionStatus::Connecting);

    {
        let setups = h.connector.traffic.setups.lock().unwrap();
        assert_eq!(setups.len(), 1);
        assert_eq!(setups[0].input_sample_rate, 16_000);
        assert!(setups[0].system_prompt.contains("Sei perfekt: 30/50"));
        assert!(setups[0]
            .system_prompt
            .contains("Der stärkste Antreiber ist \"Sei perfekt\" mit 30 Punkten."));
    }

    // Nothing is captured before the endpoint accepts the setup.
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(h.connector.traffic.frames.load(Ordering::SeqCst), 0);

    let remote = h.connector.remote();
    remote.emit(TransportEvent::Opened).await;
    pump(&mut h.controller).await;
    assert_eq!(h.controller.state(), &SessionState::Active);
    assert_eq!(h.controller.current_status(), SessionStatus::Listening);

    let traffic = h.connector.traffic.clone();
    eventually("microphone frames", || traffic.frames.load(Ordering::SeqCst) >= 2).await;

    h.controller.stop().await;
    assert_eq!(h.controller.state(), &SessionState::Closed);
    assert_eq!(h.controller.current_status(), SessionStatus::NotStarted);
    // Released by the time stop returns.
    assert_eq!(count(&h.devices.inputs_released), 1);
    assert_eq!(count(&h.devices.outputs_closed), 1);
    eventually("close command", || traffic.closes.load(Ordering::SeqCst) == 1).await;

    let frames_after_stop = traffic.frames.load(Ordering::SeqCst);
    h.controller.stop().await;
    h.controller.stop().await;
    tokio::time::sleep(Duration::from_millis(30)).await;
    assert_eq!(count(&h.devices.inputs_released), 1);
    assert_eq!(count(&h.devices.outputs_closed), 1);
    assert_eq!(traffic.closes.load(Ordering::SeqCst), 1);
    assert_eq!(traffic.frames.load(Ordering::SeqCst), frames_after_stop);
}

#[tokio::test]
async fn back_to_back_chunks_play_without_gap_or_overlap() {
    let mut h = harness(false);
    h.controller.start(&calculate_scores(&[])).await.unwrap();
    let remote = h.connector.remote();
    remote.emit(TransportEvent::Opened).await;
    pump(&mut h.controller).await;

    for seconds in [0.05, 0.03, 0.02] {
        remote.emit(TransportEvent::AudioChunk(speech(seconds, 1000))).await;
    }
    for _ in 0..3 {
        pump(&mut h.controller).await;
    }
    assert_eq!(h.controller.current_status(), SessionStatus::Speaking);

    eventually("playback to finish", || {
        h.controller.in_flight() == 0 && h.controller.current_status() == SessionStatus::Listening
    })
    .await;
    // The period that finished the last chunk may still be on its way out.
    tokio::time::sleep(Duration::from_millis(60)).await;

    let written = h.devices.written();
    let first = written.iter().position(|&s| s != 0).expect("nothing played");
    let span = 2_400; // 0.1 s at 24 kHz
    assert!(written[first..first + span].iter().all(|&s| s == 1000));
    assert!(written[first + span..].iter().all(|&s| s == 0));

    h.controller.stop().await;
}

#[tokio::test]
async fn interruption_silences_playback_immediately() {
    let mut h = harness(false);
    h.controller.start(&calculate_scores(&[])).await.unwrap();
    let remote = h.connector.remote();
    remote.emit(TransportEvent::Opened).await;
    pump(&mut h.controller).await;

    remote.emit(TransportEvent::AudioChunk(speech(1.0, 1000))).await;
    remote.emit(TransportEvent::AudioChunk(speech(1.0, 2000))).await;
    pump(&mut h.controller).await;
    pump(&mut h.controller).await;
    assert_eq!(h.controller.in_flight(), 2);

    let devices = h.devices.clone();
    eventually("speech to start", || devices.written().contains(&1000)).await;

    remote.emit(TransportEvent::Interrupted).await;
    pump(&mut h.controller).await;
    assert_eq!(h.controller.in_flight(), 0);
    assert_eq!(h.controller.current_status(), SessionStatus::Listening);
    // Speech the device had already buffered is thrown away too.
    eventually("device queue dropped", || count(&devices.discards) == 1).await;

    // Let the period that was already rendered reach the device.
    tokio::time::sleep(Duration::from_millis(60)).await;
    let mark = h.devices.written().len();
    tokio::time::sleep(Duration::from_millis(100)).await;
    let written = h.devices.written();
    assert!(written.len() > mark);
    assert!(written[mark..].iter().all(|&s| s == 0));
    assert!(!written.contains(&2000));

    // New speech after the interruption starts right away.
    remote.emit(TransportEvent::AudioChunk(speech(0.05, 3000))).await;
    pump(&mut h.controller).await;
    eventually("resumed speech", || devices.written().contains(&3000)).await;

    h.controller.stop().await;
}

#[tokio::test]
async fn undecodable_chunk_is_skipped_and_playback_continues() {
    let mut h = harness(false);
    h.controller.start(&calculate_scores(&[])).await.unwrap();
    let remote = h.connector.remote();
    remote.emit(TransportEvent::Opened).await;
    pump(&mut h.controller).await;

    remote.emit(TransportEvent::AudioChunk(speech(0.05, 1000))).await;
    remote.emit(TransportEvent::AudioChunk("***".into())).await;
    remote.emit(TransportEvent::AudioChunk(speech(0.03, 3000))).await;
    for _ in 0..3 {
        pump(&mut h.controller).await;
    }
    assert_eq!(h.controller.state(), &SessionState::Active);
    assert_eq!(h.controller.in_flight(), 2);

    eventually("playback to finish", || {
        h.controller.in_flight() == 0 && h.controller.current_status() == SessionStatus::Listening
    })
    .await;
    tokio::time::sleep(Duration::from_millis(60)).await;

    // The second chunk starts on the sample after the first one ends.
    let written = h.devices.written();
    let first = written.iter().position(|&s| s != 0).expect("nothing played");
    let (a, b) = (1_200, 720); // 0.05 s and 0.03 s at 24 kHz
    assert!(written[first..first + a].iter().all(|&s| s == 1000));
    assert!(written[first + a..first + a + b].iter().all(|&s| s == 3000));
    assert!(written[first + a + b..].iter().all(|&s| s == 0));

    h.controller.stop().await;
}

#[tokio::test]
async fn speaker_failure_ends_the_session() {
    let mut h = harness_with(DeviceSetup {
        broken_speaker: true,
        ..DeviceSetup::default()
    });
    h.controller.start(&calculate_scores(&[])).await.unwrap();
    let remote = h.connector.remote();
    remote.emit(TransportEvent::Opened).await;
    pump(&mut h.controller).await;
    assert_eq!(h.controller.state(), &SessionState::Active);

    remote.emit(TransportEvent::AudioChunk(speech(0.1, 1000))).await;
    pump(&mut h.controller).await;
    assert_eq!(h.controller.current_status(), SessionStatus::Speaking);

    // The playback thread reports the failed write.
    pump(&mut h.controller).await;
    assert!(matches!(
        h.controller.state(),
        SessionState::Error(SessionError::AudioDevice(reason)) if reason.contains("playback device unplugged")
    ));
    assert!(matches!(h.controller.current_status(), SessionStatus::Error(_)));
    assert_eq!(h.controller.in_flight(), 0);
    assert_eq!(count(&h.devices.inputs_released), 1);
    assert_eq!(count(&h.devices.outputs_closed), 1);
    let traffic = h.connector.traffic.clone();
    eventually("close command", || traffic.closes.load(Ordering::SeqCst) == 1).await;

    // A later start works with fresh devices.
    h.controller.start(&calculate_scores(&[])).await.unwrap();
    assert_eq!(h.controller.state(), &SessionState::Connecting);
    h.controller.stop().await;
}

#[tokio::test]
async fn microphone_failure_ends_the_session() {
    let mut h = harness_with(DeviceSetup {
        broken_microphone: true,
        ..DeviceSetup::default()
    });
    h.controller.start(&calculate_scores(&[])).await.unwrap();
    let remote = h.connector.remote();
    remote.emit(TransportEvent::Opened).await;
    pump(&mut h.controller).await;
    assert_eq!(h.controller.state(), &SessionState::Active);

    pump(&mut h.controller).await;
    assert!(matches!(
        h.controller.state(),
        SessionState::Error(SessionError::AudioDevice(reason)) if reason.contains("capture device unplugged")
    ));
    assert!(matches!(h.controller.current_status(), SessionStatus::Error(_)));
    assert_eq!(count(&h.devices.inputs_released), 1);
    assert_eq!(count(&h.devices.outputs_closed), 1);
    assert_eq!(h.connector.traffic.frames.load(Ordering::SeqCst), 0);

    h.controller.stop().await;
    assert_eq!(count(&h.devices.inputs_released), 1);
}

#[tokio::test]
async fn connection_failure_is_reported_and_torn_down() {
    let mut h = harness(false);
    h.controller.start(&calculate_scores(&[5; 50])).await.unwrap();
    let remote = h.connector.remote();

    remote.emit(TransportEvent::Error("connection refused".into())).await;
    pump(&mut h.controller).await;

    assert_eq!(
        h.controller.state(),
        &SessionState::Error(SessionError::Connection("connection refused".into()))
    );
    assert_eq!(
        h.controller.current_status(),
        SessionStatus::Error("Konnte keine Verbindung herstellen: connection refused".into())
    );
    assert_eq!(count(&h.devices.inputs_released), 1);
    assert_eq!(count(&h.devices.outputs_closed), 1);
    let traffic = h.connector.traffic.clone();
    eventually("close command", || traffic.closes.load(Ordering::SeqCst) == 1).await;

    h.controller.stop().await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(matches!(h.controller.state(), SessionState::Error(_)));
    assert_eq!(count(&h.devices.inputs_released), 1);
    assert_eq!(traffic.closes.load(Ordering::SeqCst), 1);
    assert_eq!(traffic.frames.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn remote_error_mid_session_shows_interruption() {
    let mut h = harness(false);
    h.controller.start(&calculate_scores(&[])).await.unwrap();
    let remote = h.connector.remote();
    remote.emit(TransportEvent::Opened).await;
    pump(&mut h.controller).await;
    remote.emit(TransportEvent::AudioChunk(speech(0.5, 1000))).await;
    pump(&mut h.controller).await;

    remote.emit(TransportEvent::Error("socket reset".into())).await;
    pump(&mut h.controller).await;

    assert_eq!(
        h.controller.state(),
        &SessionState::Error(SessionError::Remote("socket reset".into()))
    );
    assert_eq!(
        h.controller.current_status(),
        SessionStatus::Error("Verbindung unterbrochen.".into())
    );
    assert_eq!(h.controller.in_flight(), 0);
    assert_eq!(count(&h.devices.inputs_released), 1);
    assert_eq!(count(&h.devices.outputs_closed), 1);
}

#[tokio::test]
async fn remote_close_ends_session_and_allows_restart() {
    let mut h = harness(false);
    let scores = calculate_scores(&[2; 50]);
    h.controller.start(&scores).await.unwrap();
    let remote = h.connector.remote();
    remote.emit(TransportEvent::Opened).await;
    pump(&mut h.controller).await;

    remote.emit(TransportEvent::Closed).await;
    pump(&mut h.controller).await;
    assert_eq!(h.controller.state(), &SessionState::Closed);
    assert_eq!(h.controller.current_status(), SessionStatus::NotStarted);
    assert_eq!(count(&h.devices.inputs_released), 1);
    assert_eq!(count(&h.devices.outputs_closed), 1);

    h.controller.start(&scores).await.unwrap();
    assert_eq!(h.connector.connects.load(Ordering::SeqCst), 2);
    assert_eq!(count(&h.devices.inputs_opened), 2);
    h.controller.stop().await;
    assert_eq!(count(&h.devices.inputs_released), 2);
}

#[tokio::test]
async fn denied_microphone_never_connects() {
    let mut h = harness(true);
    let err = h.controller.start(&calculate_scores(&[])).await.unwrap_err();

    assert!(matches!(err, SessionError::PermissionDenied(_)));
    assert_eq!(
        h.controller.current_status(),
        SessionStatus::Error("Kein Zugriff auf das Mikrofon.".into())
    );
    assert_eq!(h.connector.connects.load(Ordering::SeqCst), 0);
    assert_eq!(count(&h.devices.outputs_opened), 0);
}

#[tokio::test]
async fn actor_serializes_commands_and_events() {
    let h = harness(false);
    let connector = h.connector.clone();
    let devices = h.devices.clone();
    let (handle, task) = spawn_session_actor(h.controller);
    let mut status = handle.status();
    let scores = calculate_scores(&[4; 50]);

    handle.start(scores).await.unwrap();
    assert_eq!(
        handle.start(scores).await,
        Err(SessionError::AlreadyActive)
    );

    let remote = connector.remote();
    remote.emit(TransportEvent::Opened).await;
    tokio::time::timeout(
        Duration::from_secs(2),
        status.wait_for(|s| *s == SessionStatus::Listening),
    )
    .await
    .expect("never listening")
    .unwrap();

    remote.emit(TransportEvent::AudioChunk(speech(0.5, 1000))).await;
    tokio::time::timeout(
        Duration::from_secs(2),
        status.wait_for(|s| *s == SessionStatus::Speaking),
    )
    .await
    .expect("never speaking")
    .unwrap();

    handle.stop().await;
    assert_eq!(*status.borrow(), SessionStatus::NotStarted);
    assert_eq!(count(&devices.inputs_released), 1);
    assert_eq!(count(&devices.outputs_closed), 1);

    drop(handle);
    drop(status);
    tokio::time::timeout(Duration::from_secs(2), task)
        .await
        .expect("actor did not exit")
        .unwrap();
}
