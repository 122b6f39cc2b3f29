use std::str::FromStr as _;

use musicbee_core::entity::{CommentView, EventDetails, Genre, StoryDetails, Venue};
use musicbee_core::id::{GenreId, Username};
use musicbee_core::{CommentId, EventId, ImageId, StoryId, Timestamp};
use musicbee_util_error::BoxedErrorResult;
use snafu::ResultExt as _;
use tempfile::{TempDir, tempdir};

use super::Mirror;
use crate::{EventMirrorRecord, StoryMirrorRecord};

async fn temp_mirror() -> BoxedErrorResult<(TempDir, Mirror)> {
    let dir = tempdir()?;
    let mirror = Mirror::open(dir.path().join("mirror.redb")).await.boxed()?;

    Ok((dir, mirror))
}

fn username(s: &str) -> Username {
    Username::from_str(s).expect("Valid username")
}

fn test_event(id: EventId, organiser: &str, name: &str) -> EventDetails {
    EventDetails {
        id,
        name: name.to_owned(),
        organiser: username(organiser),
        venue: Venue {
            address: "12 Hive St".to_owned(),
            latitude: 51.5,
            longitude: -0.1,
        },
        starts_at: Timestamp(1_000),
        ends_at: Timestamp(2_000),
        genres: vec![Genre {
            id: GenreId::from_str("techno").expect("Valid slug"),
            name: "Techno".to_owned(),
        }],
        description: "An event".to_owned(),
        image: None,
        interested: vec![],
        going: vec![username("att_1")],
        comments: vec![],
    }
}

fn test_story(id: StoryId, owner: &str, event: Option<EventId>) -> StoryDetails {
    StoryDetails {
        id,
        owner: username(owner),
        image: ImageId::from_bytes([1; 16]),
        caption: Some("caption".to_owned()),
        location: None,
        created_at: Timestamp(500),
        event,
        likes: vec![],
        comments: vec![CommentView {
            id: CommentId::from_bytes([2; 16]),
            author: username("commenter"),
            text: "nice".to_owned(),
            created_at: Timestamp(600),
        }],
    }
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn put_overwrites_last_write_wins() -> BoxedErrorResult<()> {
    let (_dir, mirror) = temp_mirror().await?;

    let id = EventId::from_bytes([3; 16]);
    for i in 0..5u64 {
        let record =
            EventMirrorRecord::snapshot(&test_event(id, "organiser", &format!("rev {i}")), Timestamp(i));
        mirror.put_event(record).await.boxed()?;
    }

    let got = mirror.get_event(id).await.boxed()?.expect("Present");
    assert_eq!(got.name, "rev 4");
    assert_eq!(got.fetched_at, Timestamp(4));

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn event_round_trip_preserves_display_fields() -> BoxedErrorResult<()> {
    let (_dir, mirror) = temp_mirror().await?;

    let id = EventId::from_bytes([4; 16]);
    let event = test_event(id, "organiser", "Hive Rave");
    let record = EventMirrorRecord::snapshot(&event, Timestamp(7));
    mirror.put_event(record.clone()).await.boxed()?;

    let got = mirror.get_event(id).await.boxed()?.expect("Present");
    assert_eq!(got, record);
    // Relational fields arrive flattened to display scalars
    assert_eq!(got.organiser, event.organiser);
    assert_eq!(got.genre_names, vec!["Techno".to_owned()]);
    assert_eq!(got.going, event.going);

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn story_indexes_follow_overwrites_and_deletes() -> BoxedErrorResult<()> {
    let (_dir, mirror) = temp_mirror().await?;

    let event_a = EventId::from_bytes([10; 16]);
    let event_b = EventId::from_bytes([11; 16]);
    let story_id = StoryId::from_bytes([12; 16]);

    let rec = StoryMirrorRecord::snapshot(&test_story(story_id, "owner_1", Some(event_a)), Timestamp(1));
    mirror.put_story(rec).await.boxed()?;
    assert_eq!(mirror.stories_by_event(event_a).await.boxed()?.len(), 1);

    // Re-homing the story must drop the stale index entry
    let rec = StoryMirrorRecord::snapshot(&test_story(story_id, "owner_1", Some(event_b)), Timestamp(2));
    mirror.put_story(rec).await.boxed()?;
    assert!(mirror.stories_by_event(event_a).await.boxed()?.is_empty());
    assert_eq!(mirror.stories_by_event(event_b).await.boxed()?.len(), 1);
    assert_eq!(
        mirror
            .stories_by_owner(&username("owner_1"))
            .await
            .boxed()?
            .len(),
        1
    );

    mirror.delete_story(story_id).await.boxed()?;
    assert!(mirror.get_story(story_id).await.boxed()?.is_none());
    assert!(mirror.stories_by_event(event_b).await.boxed()?.is_empty());
    assert!(
        mirror
            .stories_by_owner(&username("owner_1"))
            .await
            .boxed()?
            .is_empty()
    );

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn organiser_index_lookups() -> BoxedErrorResult<()> {
    let (_dir, mirror) = temp_mirror().await?;

    for (byte, organiser) in [(20u8, "organiser_a"), (21, "organiser_a"), (22, "organiser_b")] {
        let id = EventId::from_bytes([byte; 16]);
        mirror
            .put_event(EventMirrorRecord::snapshot(
                &test_event(id, organiser, &format!("event {byte}")),
                Timestamp(1),
            ))
            .await
            .boxed()?;
    }

    let a_events = mirror
        .events_by_organiser(&username("organiser_a"))
        .await
        .boxed()?;
    assert_eq!(a_events.len(), 2);

    // The index is non-unique; a single lookup is just the first match
    let first = mirror
        .first_event_by_organiser(&username("organiser_a"))
        .await
        .boxed()?
        .expect("Present");
    assert_eq!(first.organiser, username("organiser_a"));

    assert!(
        mirror
            .first_event_by_organiser(&username("nobody_here"))
            .await
            .boxed()?
            .is_none()
    );

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn reopen_is_idempotent() -> BoxedErrorResult<()> {
    let dir = tempdir()?;
    let path = dir.path().join("mirror.redb");

    let mirror = Mirror::open(&path).await.boxed()?;
    let id = EventId::from_bytes([5; 16]);
    mirror
        .put_event(EventMirrorRecord::snapshot(
            &test_event(id, "organiser", "Survivor"),
            Timestamp(1),
        ))
        .await
        .boxed()?;
    drop(mirror);

    // Schema setup re-runs on every open; existing stores are untouched.
    let mirror = Mirror::open(&path).await.boxed()?;
    let got = mirror.get_event(id).await.boxed()?.expect("Present");
    assert_eq!(got.name, "Survivor");

    Ok(())
}
