use std::{
    fs,
    time::{Duration, SystemTime},
};

use super::*;
use crate::config::MAX_INERTIA_FRICTION;

fn bump_mtime(path: &Path, secs: u64) {
    let file = fs::File::options().write(true).open(path).expect("open");
    file.set_modified(SystemTime::now() + Duration::from_secs(secs))
        .expect("set mtime");
}

#[test]
fn missing_keys_fall_back_to_defaults() {
    let tunables = parse_tunables(
        r#"
[gesture]
speed_percent = 60

[inertia]
enabled = false
"#,
    )
    .expect("parse");

    assert_eq!(tunables.gesture_speed_percent, 60);
    assert!(!tunables.inertia_enabled);
    assert_eq!(
        tunables.cancellation_delay_ms,
        Tunables::default().cancellation_delay_ms
    );
    assert_eq!(parse_tunables("").expect("empty"), Tunables::default());
}

#[test]
fn parsed_values_are_sanitized() {
    let tunables = parse_tunables(
        r#"
[inertia]
friction_start = 3.0
min_flick_velocity = -10.0
"#,
    )
    .expect("parse");
    assert_eq!(tunables.inertia_friction_start, MAX_INERTIA_FRICTION);
    assert_eq!(tunables.min_flick_velocity, 0.0);
}

#[test]
fn save_then_load_preserves_every_section() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("nested").join(CONFIG_FILE_NAME);
    let tunables = Tunables {
        gesture_speed_percent: 75,
        cancellation_delay_ms: 250,
        cancel_on_finger_count_change: true,
        activation_threshold_enabled: true,
        inertia_speed_multiplier: 1.25,
        ..Tunables::default()
    };

    save_tunables(&path, &tunables).expect("save");
    let text = fs::read_to_string(&path).expect("read");
    assert!(text.contains("[gesture]"));
    assert!(text.contains("[cancellation]"));
    assert!(text.contains("[inertia]"));

    assert_eq!(load_tunables(&path).expect("load"), tunables);
}

#[test]
fn malformed_file_reports_parse_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, "[gesture]\nspeed_percent = \"fast\"\n").expect("write");

    let err = load_tunables(&path).expect_err("should fail");
    assert!(matches!(err, ConfigError::Parse { .. }));
    assert!(!err.is_not_found());

    let missing = load_tunables(&dir.path().join("absent.toml")).expect_err("missing");
    assert!(missing.is_not_found());
}

#[test]
fn file_source_reloads_on_change_and_keeps_last_good() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join(CONFIG_FILE_NAME);
    fs::write(&path, "[gesture]\nspeed_percent = 80\n").expect("write");

    let source = TunablesFile::open(&path);
    assert_eq!(source.current().gesture_speed_percent, 80);
    assert!(!source.refresh());

    fs::write(&path, "[gesture]\nspeed_percent = 120\n").expect("write");
    bump_mtime(&path, 5);
    assert!(source.refresh());
    assert_eq!(source.current().gesture_speed_percent, 120);

    fs::write(&path, "[gesture\nspeed_percent = ").expect("write");
    bump_mtime(&path, 10);
    assert!(!source.refresh());
    assert_eq!(source.current().gesture_speed_percent, 120);
}

#[test]
fn missing_file_source_uses_defaults() {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = TunablesFile::open(dir.path().join(CONFIG_FILE_NAME));
    assert_eq!(source.current(), Tunables::default());
    assert!(!source.refresh());
}
