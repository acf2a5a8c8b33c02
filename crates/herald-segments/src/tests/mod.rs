//! Unit and behavioural tests for segment announcement.


use std::sync::Arc;

use herald::memory::MemoryCoordinator;
use herald::{Announcer, AnnouncerError, CoordinationClient};
use herald_config::AnnouncementPaths;
use mockall::mock;
use rstest::{fixture, rstest};

use crate::{
    CoordinatedSegmentAnnouncer, DataSegment, DescriptorSerializer, SegmentAnnouncer,
    SegmentAnnouncerError, SerializationError, ServerMetadata,
};

mock! {
    Serializer {}
    impl DescriptorSerializer for Serializer {
        fn server_bytes(&self, server: &ServerMetadata) -> Result<Vec<u8>, SerializationError>;
        fn segment_bytes(&self, segment: &DataSegment) -> Result<Vec<u8>, SerializationError>;
    }
}

struct Harness<S> {
    coordinator: MemoryCoordinator,
    announcer: Arc<Announcer>,
    segments: CoordinatedSegmentAnnouncer<S>,
}

fn server() -> ServerMetadata {
    ServerMetadata::new("hist-1", "10.0.0.1:8080", 10_000, "historical", "_default")
}

pub(crate) fn segment(partition: u32) -> DataSegment {
    DataSegment {
        data_source: String::from("wikipedia"),
        interval_start: String::from("2012-01-01T00:00:00.000Z"),
        interval_end: String::from("2012-01-02T00:00:00.000Z"),
        version: String::from("v1"),
        partition,
        size: 512,
    }
}

fn paths() -> AnnouncementPaths {
    AnnouncementPaths::new("/druid/announcements", "/druid/servedSegments").expect("valid roots")
}

fn harness_with<S: DescriptorSerializer>(serializer: S) -> Harness<S> {
    let coordinator = MemoryCoordinator::new();
    let client: Arc<dyn CoordinationClient> = Arc::new(coordinator.clone());
    let announcer = Arc::new(Announcer::new(client));
    announcer.start().expect("announcer starts");
    let segments =
        CoordinatedSegmentAnnouncer::new(server(), &paths(), Arc::clone(&announcer), serializer);
    Harness {
        coordinator,
        announcer,
        segments,
    }
}

#[fixture]
fn json() -> Harness<crate::JsonDescriptorSerializer> {
    harness_with(crate::JsonDescriptorSerializer)
}

#[rstest]
fn start_announces_server_descriptor(json: Harness<crate::JsonDescriptorSerializer>) {
    json.segments.start().expect("start");

    let data = json
        .coordinator
        .data("/druid/announcements/hist-1")
        .expect("server announced");
    let published: ServerMetadata = serde_json::from_slice(&data).expect("descriptor decodes");
    assert_eq!(published, server());
}

#[rstest]
fn start_and_stop_are_idempotent(json: Harness<crate::JsonDescriptorSerializer>) {
    json.segments.start().expect("start");
    json.segments.start().expect("second start");
    assert_eq!(json.coordinator.creates().len(), 1);

    json.segments.stop().expect("stop");
    json.segments.stop().expect("second stop");
    assert_eq!(json.coordinator.deletes(), vec!["/druid/announcements/hist-1"]);
    assert!(!json.announcer.is_announced("/druid/announcements/hist-1"));
}

#[rstest]
#[case::unpartitioned(0)]
#[case::partitioned(7)]
fn segments_are_announced_under_the_server(
    json: Harness<crate::JsonDescriptorSerializer>,
    #[case] partition: u32,
) {
    let served = segment(partition);
    let expected = format!("/druid/servedSegments/hist-1/{}", served.identifier());

    json.segments.announce_segment(&served).expect("announce");

    assert_eq!(json.segments.segment_path(&served), expected);
    assert!(json.announcer.is_announced(&expected));
    json.segments.unannounce_segment(&served).expect("unannounce");
    assert!(!json.coordinator.exists(&expected));
}

#[rstest]
fn announcing_a_segment_twice_is_a_duplicate(json: Harness<crate::JsonDescriptorSerializer>) {
    json.segments.announce_segment(&segment(0)).expect("announce");

    let error = json
        .segments
        .announce_segment(&segment(0))
        .expect_err("duplicate must fail");

    assert!(matches!(
        error,
        SegmentAnnouncerError::Announcer(AnnouncerError::DuplicateAnnouncement { .. })
    ));
}

#[rstest]
fn unannouncing_an_unknown_segment_fails(json: Harness<crate::JsonDescriptorSerializer>) {
    let error = json
        .segments
        .unannounce_segment(&segment(0))
        .expect_err("unknown must fail");

    assert!(matches!(
        error,
        SegmentAnnouncerError::Announcer(AnnouncerError::UnknownAnnouncement { .. })
    ));
    assert!(json.coordinator.deletes().is_empty());
}

#[rstest]
fn serialization_failure_announces_nothing() {
    let mut serializer = MockSerializer::new();
    serializer
        .expect_segment_bytes()
        .once()
        .return_once(|_| Err(SerializationError::new("segment", "unrepresentable size")));
    let harness = harness_with(serializer);

    let error = harness
        .segments
        .announce_segment(&segment(0))
        .expect_err("serialization must fail");

    assert!(matches!(error, SegmentAnnouncerError::Serialization(_)));
    assert!(harness.coordinator.creates().is_empty());
}

#[rstest]
fn failed_server_serialization_leaves_announcer_stopped() {
    let mut serializer = MockSerializer::new();
    let mut attempts = 0_u8;
    serializer
        .expect_server_bytes()
        .times(2)
        .returning(move |_| {
            attempts += 1;
            if attempts == 1 {
                Err(SerializationError::new("server", "bad host"))
            } else {
                Ok(b"server".to_vec())
            }
        });
    let harness = harness_with(serializer);

    let error = harness.segments.start().expect_err("start must fail");
    assert!(matches!(error, SegmentAnnouncerError::Serialization(_)));
    assert!(harness.coordinator.creates().is_empty());

    harness.segments.start().expect("retry succeeds");
    assert_eq!(
        harness.coordinator.data(harness.segments.announcement_path()),
        Some(b"server".to_vec())
    );
}
