use pilot_recorder::platform::memory::{Dispatched, VirtualInput, VirtualSink};
use pilot_recorder::prelude::*;
use pilot_recorder::{storage, ErrorCode};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tempfile::tempdir;

fn engine_with(settings: Settings) -> (Arc<VirtualInput>, Arc<VirtualSink>, MacroEngine) {
    let input = Arc::new(VirtualInput::new());
    let sink = Arc::new(VirtualSink::new());
    let engine = MacroEngine::new(input.clone(), sink.clone(), settings).unwrap();
    (input, sink, engine)
}

fn engine() -> (Arc<VirtualInput>, Arc<VirtualSink>, MacroEngine) {
    engine_with(Settings::default())
}

fn click_macro() -> Macro {
    Macro::from(vec![
        Event::new(0.0, Action::Move { x: 10, y: 10 }),
        Event::new(
            0.1,
            Action::Click { x: 10, y: 10, button: MouseButton::Left, pressed: true },
        ),
        Event::new(
            0.05,
            Action::Click { x: 10, y: 10, button: MouseButton::Left, pressed: false },
        ),
    ])
}

#[test]
fn test_record_with_no_input_is_empty() {
    let (_input, _sink, e) = engine();
    e.start_recording().unwrap();
    assert_eq!(e.stop_recording(), Some(0));
    assert!(e.current_macro().is_empty());
}

#[test]
fn test_recorded_click_replays_as_move_then_button() {
    let (input, sink, e) = engine();
    e.start_recording().unwrap();
    input.button(40, 50, MouseButton::Right, true);
    input.button(40, 50, MouseButton::Right, false);
    e.stop_recording();

    e.play().unwrap();
    e.wait_playback().unwrap();

    assert_eq!(
        sink.dispatched(),
        vec![
            Dispatched::MoveTo { x: 40, y: 50 },
            Dispatched::Button { button: MouseButton::Right, pressed: true },
            Dispatched::MoveTo { x: 40, y: 50 },
            Dispatched::Button { button: MouseButton::Right, pressed: false },
        ]
    );
}

#[test]
fn test_repeat_count_replays_every_pass() {
    let settings = Settings {
        repeat_count: 3,
        ..Settings::default()
    };
    let (_input, sink, e) = engine_with(settings);
    e.replace_macro(Macro::from(vec![
        Event::new(0.0, Action::KeyPress { key: KeyToken::Char('a') }),
        Event::new(0.0, Action::KeyRelease { key: KeyToken::Char('a') }),
    ]))
    .unwrap();

    e.play().unwrap();
    let stats = e.wait_playback().unwrap();

    assert_eq!(stats.events, 6);
    assert_eq!(stats.passes, 3);
    assert_eq!(sink.len(), 6);
    assert_eq!(e.state(), EngineState::Idle);
}

#[test]
fn test_infinite_repeat_stops_promptly() {
    let settings = Settings {
        repeat_count: 0,
        ..Settings::default()
    };
    let (_input, sink, e) = engine_with(settings);
    e.replace_macro(Macro::from(vec![
        Event::new(0.02, Action::Move { x: 1, y: 1 }),
        Event::new(0.02, Action::Move { x: 2, y: 2 }),
    ]))
    .unwrap();

    e.play().unwrap();
    // first pass complete
    let deadline = Instant::now() + Duration::from_secs(2);
    while sink.len() < 2 {
        assert!(Instant::now() < deadline, "first pass never finished");
        thread::sleep(Duration::from_millis(1));
    }
    assert_eq!(e.state(), EngineState::Playing);

    let started = Instant::now();
    let stats = e.stop_playback().unwrap();
    assert!(started.elapsed() < Duration::from_millis(500));
    assert!(stats.cancelled);
    assert!((1..=2).contains(&stats.passes), "{stats:?}");

    // nothing is injected after stop returns
    let after_stop = sink.len();
    thread::sleep(Duration::from_millis(50));
    assert_eq!(sink.len(), after_stop);
    assert_eq!(after_stop as u64, stats.events);
}

#[test]
fn test_second_play_does_not_disturb_first() {
    let (_input, sink, e) = engine();
    e.replace_macro(click_macro()).unwrap();

    e.play().unwrap();
    let err = e.play().unwrap_err();
    assert_eq!(err.code(), ErrorCode::AlreadyPlaying);

    let stats = e.wait_playback().unwrap();
    assert_eq!(stats.events, 3);
    assert!(!stats.cancelled);
    assert_eq!(sink.len(), 5);
}

#[test]
fn test_unresolved_key_does_not_stop_replay() {
    let (_input, sink, e) = engine();
    e.replace_macro(Macro::from(vec![
        Event::new(0.0, Action::KeyPress { key: KeyToken::named("no_such_key") }),
        Event::new(0.0, Action::Move { x: 9, y: 9 }),
    ]))
    .unwrap();

    e.play().unwrap();
    let stats = e.wait_playback().unwrap();
    assert_eq!(stats.skipped, 1);
    assert_eq!(sink.dispatched(), vec![Dispatched::MoveTo { x: 9, y: 9 }]);
}

#[test]
fn test_save_reload_play_keeps_timing() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("clicks.json");

    let (_input, _sink, first) = engine();
    first.replace_macro(click_macro()).unwrap();
    first.save(&path).unwrap();

    let (_input, sink, e) = engine();
    assert_eq!(e.load(&path).unwrap(), 3);
    assert_eq!(e.current_macro(), click_macro());

    e.play().unwrap();
    e.wait_playback().unwrap();

    let timeline = sink.timeline();
    let kinds: Vec<_> = timeline.iter().map(|(_, d)| d.clone()).collect();
    assert_eq!(
        kinds,
        vec![
            Dispatched::MoveTo { x: 10, y: 10 },
            Dispatched::MoveTo { x: 10, y: 10 },
            Dispatched::Button { button: MouseButton::Left, pressed: true },
            Dispatched::MoveTo { x: 10, y: 10 },
            Dispatched::Button { button: MouseButton::Left, pressed: false },
        ]
    );

    let press_gap = timeline[2].0 - timeline[0].0;
    let release_gap = timeline[4].0 - timeline[2].0;
    let total = timeline[4].0 - timeline[0].0;
    assert!(press_gap >= Duration::from_millis(95), "{press_gap:?}");
    assert!(release_gap >= Duration::from_millis(45), "{release_gap:?}");
    assert!(total < Duration::from_millis(400), "{total:?}");
}

#[test]
fn test_load_rejects_corrupt_and_invalid_files() {
    let dir = tempdir().unwrap();
    let corrupt = dir.path().join("corrupt.json");
    let invalid = dir.path().join("invalid.json");
    std::fs::write(&corrupt, "{\"events\": [").unwrap();
    std::fs::write(&invalid, r#"{"events":[{"type":"move","delay":0}]}"#).unwrap();

    let (_input, _sink, e) = engine();
    e.replace_macro(click_macro()).unwrap();

    assert_eq!(e.load(&corrupt).unwrap_err().code(), ErrorCode::CorruptData);
    assert_eq!(e.load(&invalid).unwrap_err().code(), ErrorCode::Schema);
    // a failed load keeps the current macro
    assert_eq!(e.current_macro(), click_macro());
}

#[test]
fn test_delays_longer_than_a_day_do_not_load() {
    let dir = tempdir().unwrap();
    let huge = dir.path().join("huge.json");
    let longest = dir.path().join("longest.json");
    std::fs::write(&huge, r#"[{"type":"move","delay":1e20,"x":0,"y":0}]"#).unwrap();
    std::fs::write(&longest, r#"[{"type":"move","delay":86400,"x":0,"y":0}]"#).unwrap();

    let (_input, sink, e) = engine();
    assert_eq!(e.load(&huge).unwrap_err().code(), ErrorCode::Schema);
    assert!(e.current_macro().is_empty());

    e.load(&longest).unwrap();
    assert_eq!(e.current_macro().duration(), Duration::from_secs(86_400));
    e.play().unwrap();
    thread::sleep(Duration::from_millis(20));
    assert_eq!(e.state(), EngineState::Playing);

    let stats = e.stop_playback().unwrap();
    assert!(stats.cancelled);
    assert!(sink.is_empty());
    assert_eq!(e.state(), EngineState::Idle);
}

#[test]
fn test_hotkeys_drive_the_engine() {
    let (input, sink, e) = engine();
    let actions = e.hotkey_actions();

    input.tap(KeyToken::named("f10"));
    let state = e.handle_hotkey(actions.recv_timeout(Duration::from_secs(1)).unwrap());
    assert_eq!(state.unwrap(), EngineState::Recording);

    input.move_to(4, 2);
    input.tap(KeyToken::named("f10"));
    let state = e.handle_hotkey(actions.recv_timeout(Duration::from_secs(1)).unwrap());
    assert_eq!(state.unwrap(), EngineState::Idle);
    assert_eq!(e.current_macro().len(), 1);

    input.tap(KeyToken::named("f6"));
    e.handle_hotkey(actions.recv_timeout(Duration::from_secs(1)).unwrap())
        .unwrap();
    e.wait_playback();
    assert_eq!(sink.dispatched(), vec![Dispatched::MoveTo { x: 4, y: 2 }]);
}

#[test]
fn test_rebinding_hotkeys_through_settings() {
    let (input, _sink, e) = engine();
    let actions = e.hotkey_actions();

    let mut s = e.settings();
    s.record_hotkey = "ctrl+r".parse().unwrap();
    e.update_settings(s).unwrap();

    input.tap(KeyToken::named("f10"));
    assert!(actions.try_recv().is_err());

    input.key_down(KeyToken::named("ctrl"));
    input.tap(KeyToken::Char('r'));
    assert_eq!(actions.try_recv().unwrap(), HotkeyAction::ToggleRecord);
}

#[test]
fn test_store_round_trip() {
    let dir = tempdir().unwrap();
    let store = MacroStore::with_dir(dir.path()).unwrap();

    store.save("clicks", &click_macro()).unwrap();
    assert_eq!(store.list().unwrap(), vec!["clicks.json"]);
    assert_eq!(store.load("clicks.json").unwrap(), click_macro());

    let text = storage::to_string(&click_macro()).unwrap();
    assert_eq!(storage::from_str(&text).unwrap(), click_macro());
}
