use futures::executor::block_on;

use tandem_call::{CallRole, Intent, MediaTrack, SessionEvent, TrackKind};

use super::fake::{FakePlatform, Recorder, session_between};

#[test]
fn mute_toggle_is_reversible_without_reacquiring_hardware() {
    block_on(async {
        let platform = FakePlatform::new();
        let mut session = session_between(&platform, "alice", "bob", CallRole::Initiator, true);

        session.start().await;
        let audio_id = session
            .local_tracks()
            .iter()
            .find(|t| t.kind() == TrackKind::Audio)
            .expect("audio track")
            .id();

        session
            .handle_event(SessionEvent::Intent(Intent::ToggleMute))
            .await;
        assert!(session.is_muted());
        let muted_track = session
            .local_tracks()
            .iter()
            .find(|t| t.kind() == TrackKind::Audio)
            .unwrap();
        assert!(!muted_track.enabled());
        assert!(!muted_track.is_stopped());

        session
            .handle_event(SessionEvent::Intent(Intent::ToggleMute))
            .await;
        assert!(!session.is_muted());
        let restored = session
            .local_tracks()
            .iter()
            .find(|t| t.kind() == TrackKind::Audio)
            .unwrap();
        assert!(restored.enabled());
        // Same track identity, no second hardware grant.
        assert_eq!(restored.id(), audio_id);
        assert_eq!(platform.log.acquisitions.get(), 1);
    });
}

#[test]
fn video_off_releases_the_camera() {
    block_on(async {
        let platform = FakePlatform::new();
        let mut session = session_between(&platform, "alice", "bob", CallRole::Initiator, true);

        session.start().await;
        let video_id = session
            .local_tracks()
            .iter()
            .find(|t| t.kind() == TrackKind::Video)
            .expect("video track")
            .id();

        session
            .handle_event(SessionEvent::Intent(Intent::ToggleVideo))
            .await;

        assert!(session.is_video_off());
        // The underlying grant is released, not merely disabled.
        let stopped = platform
            .log
            .tracks
            .borrow()
            .iter()
            .find(|t| t.id() == video_id)
            .unwrap()
            .is_stopped();
        assert!(stopped);
        assert!(
            session
                .local_tracks()
                .iter()
                .all(|t| t.kind() != TrackKind::Video)
        );
        assert!(
            platform
                .peer()
                .log
                .senders
                .borrow()
                .iter()
                .all(|t| t.kind() != TrackKind::Video)
        );
    });
}

#[test]
fn video_off_on_cycle_acquires_a_fresh_track() {
    block_on(async {
        let platform = FakePlatform::new();
        let mut session = session_between(&platform, "alice", "bob", CallRole::Initiator, true);

        session.start().await;
        let first_id = session
            .local_tracks()
            .iter()
            .find(|t| t.kind() == TrackKind::Video)
            .unwrap()
            .id();

        session
            .handle_event(SessionEvent::Intent(Intent::ToggleVideo))
            .await;
        session
            .handle_event(SessionEvent::Intent(Intent::ToggleVideo))
            .await;

        assert!(!session.is_video_off());
        let second = session
            .local_tracks()
            .iter()
            .find(|t| t.kind() == TrackKind::Video)
            .expect("fresh video track");
        assert_ne!(second.id(), first_id);
        assert!(!second.is_stopped());
        // Exactly two distinct acquisitions: the initial one and the re-enable.
        assert_eq!(platform.log.video_acquisitions.get(), 2);
        // The sender was swapped in place, not renegotiated from scratch.
        assert_eq!(platform.peer().log.swapped.borrow().len(), 1);
    });
}

#[test]
fn camera_reacquire_failure_keeps_video_off() {
    block_on(async {
        let platform = FakePlatform::new();
        let mut session = session_between(&platform, "alice", "bob", CallRole::Initiator, true);
        let recorder = Recorder::default();
        recorder.hook(&mut session);

        session.start().await;
        session
            .handle_event(SessionEvent::Intent(Intent::ToggleVideo))
            .await;

        platform.log.deny_media.set(true);
        session
            .handle_event(SessionEvent::Intent(Intent::ToggleVideo))
            .await;

        assert!(session.is_video_off());
        assert_eq!(
            recorder.last_error().as_deref(),
            Some("Failed to turn on camera. Please check permissions.")
        );
    });
}

#[test]
fn audio_only_session_starts_without_video() {
    block_on(async {
        let platform = FakePlatform::new();
        let mut session = session_between(&platform, "alice", "bob", CallRole::Initiator, false);

        session.start().await;

        assert!(session.is_video_off());
        assert_eq!(platform.log.video_acquisitions.get(), 0);
        assert!(
            session
                .local_tracks()
                .iter()
                .all(|t| t.kind() == TrackKind::Audio)
        );
    });
}
