use super::*;
use crate::touch::types::{AxisBounds, MAX_CONTACT_SLOTS};

fn down(id: u32, x: i32, y: i32) -> Contact {
    Contact::new(id, x, y, true)
}

fn up(id: u32, x: i32, y: i32) -> Contact {
    Contact::new(id, x, y, false)
}

fn ids(frame: &ContactFrame) -> Vec<u32> {
    frame.contacts().iter().map(|c| c.id).collect()
}

#[test]
fn frame_is_ordered_by_id() {
    let mut tracker = ContactTracker::new();
    let frame = tracker.merge(&[down(7, 10, 10), down(2, 20, 20), down(4, 30, 30)]);
    assert_eq!(ids(frame), vec![2, 4, 7]);
    assert_eq!(frame.contact_count(), 3);
    assert!(frame.can_start_gesture());
}

#[test]
fn invalid_samples_are_dropped() {
    let mut tracker = ContactTracker::new();
    let bounds = AxisBounds {
        min_x: 1,
        max_x: 1000,
        min_y: 1,
        max_y: 800,
    };
    let frame = tracker.merge(&[
        down(64, 10, 10),
        down(1, 0, 10),
        down(2, 10, 0),
        down(3, 1200, 10).with_bounds(bounds),
        down(5, 500, 400).with_bounds(bounds),
    ]);
    assert_eq!(ids(frame), vec![5]);
    assert_eq!(tracker.dropped_invalid(), 4);
}

#[test]
fn partial_report_keeps_missing_contacts() {
    let mut tracker = ContactTracker::new();
    tracker.merge(&[down(1, 10, 10), down(2, 20, 20), down(3, 30, 30)]);
    tracker.prune();

    let frame = tracker.merge(&[down(2, 25, 21)]);
    assert_eq!(frame.contact_count(), 3);
    assert_eq!(frame.get(2).map(|c| c.x), Some(25));
    assert_eq!(frame.get(1).map(|c| c.x), Some(10));
}

#[test]
fn lifted_contact_survives_one_cycle_then_is_pruned() {
    let mut tracker = ContactTracker::new();
    tracker.merge(&[down(1, 10, 10), down(2, 20, 20)]);
    tracker.prune();

    let frame = tracker.merge(&[up(2, 20, 20)]);
    assert_eq!(frame.len(), 2);
    assert_eq!(frame.contact_count(), 1);

    tracker.prune();
    assert_eq!(ids(tracker.frame()), vec![1]);
}

#[test]
fn empty_batch_lifts_everything() {
    let mut tracker = ContactTracker::new();
    tracker.merge(&[down(1, 10, 10), down(2, 20, 20), down(3, 30, 30)]);
    tracker.prune();

    let frame = tracker.merge(&[]);
    assert_eq!(frame.len(), 3);
    assert_eq!(frame.contact_count(), 0);

    tracker.prune();
    assert!(tracker.frame().is_empty());
}

#[test]
fn table_overflow_drops_new_ids() {
    let mut tracker = ContactTracker::new();
    let batch: Vec<Contact> = (1..=12).map(|id| down(id, 10 + id as i32, 10)).collect();
    let frame = tracker.merge(&batch);
    assert_eq!(frame.len(), MAX_CONTACT_SLOTS);
    assert_eq!(tracker.dropped_overflow(), 2);
}

#[test]
fn released_ids_include_lifted_and_missing() {
    let before = ContactFrame::from_contacts(&[down(1, 10, 10), down(2, 20, 20), down(3, 30, 30)]);
    let after = ContactFrame::from_contacts(&[down(1, 11, 10), up(2, 20, 20)]);
    let released: Vec<u32> = before.released_in(&after).collect();
    assert_eq!(released, vec![2, 3]);
}
