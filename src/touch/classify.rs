use super::types::ContactFrame;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FrameKind {
    Activity,
    Release,
}

/// One classified processing cycle.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FrameEvent {
    pub now_ms: u64,
    pub current: ContactFrame,
    pub previous: ContactFrame,
}

impl FrameEvent {
    pub fn contact_count(&self) -> usize {
        self.current.contact_count()
    }

    pub fn previous_count(&self) -> usize {
        self.previous.contact_count()
    }

    pub fn can_start_gesture(&self) -> bool {
        self.current.can_start_gesture()
    }
}

/// Receiver of classified frames.
pub trait FrameHandler {
    type Output;

    fn on_activity(&mut self, event: &FrameEvent) -> Self::Output;
    fn on_release(&mut self, event: &FrameEvent) -> Self::Output;
}

/// Release whenever nothing touches the surface. The previous frame's count
/// is not consulted.
pub fn classify(current: &ContactFrame) -> FrameKind {
    if current.contact_count() == 0 {
        FrameKind::Release
    } else {
        FrameKind::Activity
    }
}

pub fn dispatch<H: FrameHandler>(handler: &mut H, event: &FrameEvent) -> H::Output {
    match classify(&event.current) {
        FrameKind::Activity => handler.on_activity(event),
        FrameKind::Release => handler.on_release(event),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::touch::types::Contact;

    #[derive(Default)]
    struct Recorder {
        seen: Vec<(FrameKind, usize)>,
    }

    impl FrameHandler for Recorder {
        type Output = ();

        fn on_activity(&mut self, event: &FrameEvent) {
            self.seen.push((FrameKind::Activity, event.contact_count()));
        }

        fn on_release(&mut self, event: &FrameEvent) {
            self.seen.push((FrameKind::Release, event.previous_count()));
        }
    }

    #[test]
    fn zero_contacts_release_regardless_of_previous() {
        let lifted = ContactFrame::from_contacts(&[Contact::new(1, 10, 10, false)]);
        assert_eq!(classify(&lifted), FrameKind::Release);
        assert_eq!(classify(&ContactFrame::new()), FrameKind::Release);
    }

    #[test]
    fn dispatch_routes_to_handler() {
        let touching = ContactFrame::from_contacts(&[
            Contact::new(1, 10, 10, true),
            Contact::new(2, 20, 10, true),
        ]);
        let lifted = ContactFrame::from_contacts(&[
            Contact::new(1, 10, 10, false),
            Contact::new(2, 20, 10, false),
        ]);

        let mut recorder = Recorder::default();
        dispatch(
            &mut recorder,
            &FrameEvent {
                now_ms: 0,
                current: touching.clone(),
                previous: ContactFrame::new(),
            },
        );
        dispatch(
            &mut recorder,
            &FrameEvent {
                now_ms: 8,
                current: lifted,
                previous: touching,
            },
        );

        assert_eq!(
            recorder.seen,
            vec![(FrameKind::Activity, 2), (FrameKind::Release, 2)]
        );
    }
}
