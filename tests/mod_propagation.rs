mod support;

use channel_catalog::errors::CatalogError;
use channel_catalog::model::{ChannelRecord, VideoRecord};
use channel_catalog::query::Filter;
use channel_catalog::store::{DocumentStore, MemoryStore};
use channel_catalog::VideoRepository;
use std::sync::Arc;
use support::{FaultyStore, videos_for};

fn channel_doc(channel: &ChannelRecord) -> bson::Document {
    bson::to_document(channel).unwrap()
}

fn stored_channel<S: DocumentStore + ?Sized>(store: &S, channel_id: &str) -> ChannelRecord {
    let doc = store.find_one("channel", &Filter::eq("channelId", channel_id)).unwrap().unwrap();
    bson::from_document(doc).unwrap()
}

#[test]
fn propagation_increments_and_fans_out() {
    let store = Arc::new(MemoryStore::new());
    let repo = VideoRepository::new(store.clone());
    let mut channel = ChannelRecord::new("UC-fan", "Fan Out");
    channel.applied_videos = 4;
    store.insert_one("channel", channel_doc(&channel)).unwrap();
    let videos = videos_for(&channel, 5, 5);
    repo.insert_many(&videos).unwrap();
    let bystander = VideoRecord::new("other", "https://v/other").with_channel(&ChannelRecord::new("UC-other", "Other"));
    repo.insert_one(&bystander).unwrap();

    let fresh = repo.propagate_channel_application(&videos[2]).unwrap();
    assert_eq!(fresh.applied_videos, 5);
    assert_eq!(stored_channel(&*store, "UC-fan"), fresh);

    for v in &videos {
        let back = repo.get_by_id(v.id).unwrap();
        assert_eq!(back.channel.as_ref(), Some(&fresh));
        assert_eq!(back.applied, v.id == videos[2].id);
    }
    let untouched = repo.get_by_id(bystander.id).unwrap();
    assert_eq!(untouched.channel.unwrap().applied_videos, 0);
}

#[test]
fn missing_channel_is_reported() {
    let repo = VideoRepository::new(Arc::new(MemoryStore::new()));
    let ghost = ChannelRecord::new("UC-ghost", "Ghost");
    let video = VideoRecord::new("orphan", "https://v/o").with_channel(&ghost);
    repo.insert_one(&video).unwrap();
    match repo.propagate_channel_application(&video) {
        Err(CatalogError::ChannelNotFound(id)) => assert_eq!(id, "UC-ghost"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(!repo.get_by_id(video.id).unwrap().applied);
}

#[test]
fn failure_after_increment_is_surfaced_and_not_rolled_back() {
    let store = Arc::new(FaultyStore::new());
    let repo = VideoRepository::new(store.clone());
    let channel = ChannelRecord::new("UC-half", "Half");
    store.inner.insert_one("channel", channel_doc(&channel)).unwrap();
    let videos = videos_for(&channel, 2, 0);
    repo.insert_many(&videos).unwrap();

    store.fail("update_many");
    match repo.propagate_channel_application(&videos[0]) {
        Err(CatalogError::StoreUnavailable { op, .. }) => assert_eq!(op, "propagate_channel_application"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(stored_channel(&store.inner, "UC-half").applied_videos, 1);
    assert!(!repo.get_by_id(videos[0].id).unwrap().applied);
}

#[test]
fn counter_that_cannot_be_incremented_is_an_error() {
    let store = Arc::new(MemoryStore::new());
    let repo = VideoRepository::new(store.clone());
    let mut channel = ChannelRecord::new("UC-full", "Full");
    channel.applied_videos = i64::MAX;
    store.insert_one("channel", channel_doc(&channel)).unwrap();
    let videos = videos_for(&channel, 2, 0);
    repo.insert_many(&videos).unwrap();

    match repo.propagate_channel_application(&videos[0]) {
        Err(CatalogError::StoreUnavailable { op, .. }) => assert_eq!(op, "propagate_channel_application"),
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(stored_channel(&*store, "UC-full").applied_videos, i64::MAX);
    assert!(!repo.get_by_id(videos[0].id).unwrap().applied);
}

#[test]
fn non_numeric_counter_is_left_untouched() {
    let store = Arc::new(MemoryStore::new());
    let repo = VideoRepository::new(store.clone());
    let channel = ChannelRecord::new("UC-text", "Text");
    let mut doc = channel_doc(&channel);
    doc.insert("applied_videos", "7");
    store.insert_one("channel", doc).unwrap();
    let videos = videos_for(&channel, 1, 0);
    repo.insert_many(&videos).unwrap();

    assert!(matches!(
        repo.propagate_channel_application(&videos[0]),
        Err(CatalogError::StoreUnavailable { .. })
    ));
    let raw = store.find_one("channel", &Filter::eq("channelId", "UC-text")).unwrap().unwrap();
    assert_eq!(raw.get_str("applied_videos").unwrap(), "7");
    assert!(!repo.get_by_id(videos[0].id).unwrap().applied);
}

#[test]
fn unknown_triggering_video_is_not_found() {
    let store = Arc::new(MemoryStore::new());
    let repo = VideoRepository::new(store.clone());
    let channel = ChannelRecord::new("UC-gone", "Gone");
    store.insert_one("channel", channel_doc(&channel)).unwrap();
    let stored = videos_for(&channel, 1, 0);
    repo.insert_many(&stored).unwrap();
    let never_saved = VideoRecord::new("draft", "https://v/draft").with_channel(&channel);

    match repo.propagate_channel_application(&never_saved) {
        Err(CatalogError::NotFound { entity, id }) => {
            assert_eq!(entity, "Video");
            assert_eq!(id, never_saved.id.to_hex());
        }
        other => panic!("unexpected {other:?}"),
    }
    assert_eq!(stored_channel(&*store, "UC-gone").applied_videos, 1);
    assert!(!repo.get_by_id(stored[0].id).unwrap().applied);
}

#[test]
fn concurrent_propagation_loses_no_increments() {
    let store = Arc::new(MemoryStore::new());
    let repo = VideoRepository::new(store.clone());
    let channel = ChannelRecord::new("UC-busy", "Busy");
    store.insert_one("channel", channel_doc(&channel)).unwrap();
    let videos = videos_for(&channel, 16, 16);
    repo.insert_many(&videos).unwrap();

    let handles: Vec<_> = videos
        .iter()
        .cloned()
        .map(|v| {
            let repo = repo.clone();
            std::thread::spawn(move || repo.propagate_channel_application(&v).is_ok())
        })
        .collect();
    let ok = handles.into_iter().map(|h| h.join().unwrap()).filter(|ok| *ok).count();

    assert_eq!(ok, 16);
    assert_eq!(stored_channel(&*store, "UC-busy").applied_videos, 16);
    assert!(repo.list_all(&Default::default(), None).unwrap().iter().all(|v| v.applied));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_propagation_from_blocking_tasks() {
    let store = Arc::new(MemoryStore::new());
    let repo = VideoRepository::new(store.clone());
    let channel = ChannelRecord::new("UC-async", "Async");
    store.insert_one("channel", channel_doc(&channel)).unwrap();
    let videos = videos_for(&channel, 8, 0);
    repo.insert_many(&videos).unwrap();

    let mut tasks = Vec::new();
    for v in videos {
        let repo = repo.clone();
        tasks.push(tokio::task::spawn_blocking(move || repo.propagate_channel_application(&v)));
    }
    let mut last_seen = Vec::new();
    for t in tasks {
        last_seen.push(t.await.unwrap().unwrap().applied_videos);
    }
    last_seen.sort_unstable();
    assert_eq!(last_seen, (1..=8).collect::<Vec<i64>>());
}
