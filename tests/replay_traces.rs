use std::{fs, path::PathBuf};

use tfdrag::config::Tunables;
use tfdrag::replay::{parse_expected_kinds, read_trace, replay};

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("demos").join(name)
}

fn assert_trace_matches(stem: &str) {
    let reports = read_trace(&demo(&format!("{stem}.csv"))).expect("trace");
    let expect_text = fs::read_to_string(demo(&format!("{stem}.expect"))).expect("expect file");
    let expected = parse_expected_kinds(&expect_text).expect("expected kinds");

    let actual: Vec<&'static str> = replay(&reports, &Tunables::default())
        .iter()
        .map(|r| r.command.kind())
        .collect();
    assert_eq!(actual, expected, "{stem}");
}

#[test]
fn drag_release_demo_matches_expectation() {
    assert_trace_matches("drag_release");
}

#[test]
fn two_finger_scroll_demo_never_presses() {
    assert_trace_matches("two_finger_scroll");
}

#[test]
fn slower_speed_moves_the_pointer_less() {
    let reports = read_trace(&demo("drag_release.csv")).expect("trace");
    let distance = |speed: u16| -> i32 {
        let tunables = Tunables {
            gesture_speed_percent: speed,
            ..Tunables::default()
        };
        replay(&reports, &tunables)
            .iter()
            .map(|r| match r.command {
                tfdrag::PointerCommand::Move { dx, .. } => dx,
                _ => 0,
            })
            .sum()
    };

    assert_eq!(distance(100), 14 * 15);
    assert!(distance(50) < distance(100));
    assert!(distance(50) > 0);
}
