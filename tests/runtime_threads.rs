use std::{sync::Arc, thread, time::Duration};

use tfdrag::config::{LiveTunables, Tunables, TunablesSource};
use tfdrag::io::SharedRecorder;
use tfdrag::runtime::GestureRuntime;
use tfdrag::touch::Contact;
use tfdrag::GesturePhase;

fn three(x: i32) -> Vec<Contact> {
    vec![
        Contact::new(1, x, 100, true),
        Contact::new(2, x + 100, 100, true),
        Contact::new(3, x + 200, 100, true),
    ]
}

fn quick_release() -> LiveTunables {
    LiveTunables::new(Tunables {
        cancellation_delay_ms: 30,
        inertia_enabled: false,
        ..Tunables::default()
    })
}

#[test]
fn live_drag_presses_moves_and_releases() {
    let recorder = SharedRecorder::new();
    let tunables = quick_release();
    let source: Arc<dyn TunablesSource> = Arc::new(tunables.clone());
    let mut runtime = GestureRuntime::start(recorder.clone(), source).expect("start");
    let sender = runtime.sender();

    for _ in 0..8 {
        assert!(sender.submit(three(100)));
        thread::sleep(Duration::from_millis(10));
    }
    let mut x = 100;
    for _ in 0..10 {
        x += 4;
        assert!(sender.submit(three(x)));
        thread::sleep(Duration::from_millis(10));
    }
    assert!(sender.submit(Vec::new()));
    thread::sleep(Duration::from_millis(300));

    let kinds = recorder.kinds();
    assert_eq!(kinds.first(), Some(&"down"), "{kinds:?}");
    assert_eq!(kinds.last(), Some(&"up"), "{kinds:?}");
    assert!(kinds.contains(&"move"));
    assert!(!recorder.snapshot().button_held);
    assert_eq!(runtime.snapshot().phase, GesturePhase::Idle);

    runtime.shutdown();
    assert!(!runtime.is_running());
    assert!(!sender.submit(three(100)));
    assert_eq!(runtime.dropped_reports(), 0);
}

#[test]
fn two_fingers_never_reach_the_pointer() {
    let recorder = SharedRecorder::new();
    let source: Arc<dyn TunablesSource> = Arc::new(quick_release());
    let mut runtime = GestureRuntime::start(recorder.clone(), source).expect("start");
    let sender = runtime.sender();

    let mut x = 100;
    for _ in 0..15 {
        x += 4;
        sender.submit(vec![
            Contact::new(1, x, 100, true),
            Contact::new(2, x + 100, 100, true),
        ]);
        thread::sleep(Duration::from_millis(10));
    }
    sender.submit(Vec::new());
    thread::sleep(Duration::from_millis(100));
    runtime.shutdown();

    assert!(recorder.kinds().is_empty());
}
