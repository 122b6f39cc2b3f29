use std::str::FromStr as _;

use musicbee_core::Timestamp;
use musicbee_core::entity::{
    EventCreate, ProfileEdit, RsvpState, StoryCreate, Venue,
};
use musicbee_core::id::{GenreId, Username};
use musicbee_util_error::BoxedErrorResult;
use snafu::ResultExt as _;
use tempfile::{TempDir, tempdir};

use super::{ProfileUpdateOutcome, Store, StoryCreateOutcome, WriteOutcome};
use crate::store::EventWriteOutcome;

async fn temp_store() -> BoxedErrorResult<(TempDir, Store)> {
    let dir = tempdir()?;
    let store = Store::open(dir.path().join("musicbee.redb"))
        .await
        .boxed()?;

    Ok((dir, store))
}

fn username(s: &str) -> Username {
    Username::from_str(s).expect("Valid username")
}

async fn sign_up(store: &Store, name: &str) -> BoxedErrorResult<Username> {
    let user = username(name);
    store
        .upsert_user_on_sign_in(&user, name, &format!("{name}@example.com"))
        .await
        .boxed()?;
    Ok(user)
}

fn event_create(name: &str) -> EventCreate {
    EventCreate {
        name: name.to_owned(),
        venue: Venue {
            address: "12 Hive St".to_owned(),
            latitude: 51.5,
            longitude: -0.1,
        },
        starts_at: Timestamp(u64::MAX / 2),
        ends_at: Timestamp(u64::MAX / 2 + 3600),
        genres: vec![GenreId::from_str("techno").expect("Seeded")],
        description: "A test event".to_owned(),
        image: None,
    }
}

async fn create_event(
    store: &Store,
    organiser: &Username,
    name: &str,
) -> BoxedErrorResult<musicbee_core::entity::EventDetails> {
    match store.create_event(organiser, event_create(name)).await.boxed()? {
        EventWriteOutcome::Done(details) => Ok(details),
        other => Err(format!("Unexpected outcome: {other:?}").into()),
    }
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn rsvp_states_are_exclusive() -> BoxedErrorResult<()> {
    let (_dir, store) = temp_store().await?;
    let organiser = sign_up(&store, "organiser").await?;
    let u1 = sign_up(&store, "user1").await?;

    let event = create_event(&store, &organiser, "Exclusive").await?;
    assert!(event.interested.is_empty());
    assert!(event.going.is_empty());

    let event = store
        .set_rsvp(&u1, event.id, RsvpState::Interested)
        .await
        .boxed()?
        .expect("Event exists");
    assert_eq!(event.interested, vec![u1.clone()]);
    assert!(event.going.is_empty());

    // Switching to going clears interested
    let event = store
        .set_rsvp(&u1, event.id, RsvpState::Going)
        .await
        .boxed()?
        .expect("Event exists");
    assert!(event.interested.is_empty());
    assert_eq!(event.going, vec![u1.clone()]);

    // And back again
    let event = store
        .set_rsvp(&u1, event.id, RsvpState::Interested)
        .await
        .boxed()?
        .expect("Event exists");
    assert_eq!(event.interested, vec![u1.clone()]);
    assert!(event.going.is_empty());

    let event = store
        .set_rsvp(&u1, event.id, RsvpState::None)
        .await
        .boxed()?
        .expect("Event exists");
    assert!(event.interested.is_empty());
    assert!(event.going.is_empty());

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn sign_in_creates_once() -> BoxedErrorResult<()> {
    let (_dir, store) = temp_store().await?;

    let user = username("returning");
    assert!(
        store
            .upsert_user_on_sign_in(&user, "Returning", "ret@example.com")
            .await
            .boxed()?
    );
    // Second sign-in leaves the account alone
    assert!(
        !store
            .upsert_user_on_sign_in(&user, "Other Name", "other@example.com")
            .await
            .boxed()?
    );

    let profile = store
        .get_user_profile(&user)
        .await
        .boxed()?
        .expect("Created");
    assert_eq!(profile.display_name, "Returning");
    assert_eq!(profile.email, "ret@example.com");

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn duplicate_email_is_rejected() -> BoxedErrorResult<()> {
    let (_dir, store) = temp_store().await?;
    let alice = sign_up(&store, "alice").await?;
    let _bob = sign_up(&store, "bob").await?;

    let outcome = store
        .update_profile(
            &alice,
            ProfileEdit {
                email: Some("bob@example.com".to_owned()),
                ..Default::default()
            },
        )
        .await
        .boxed()?;
    assert!(matches!(outcome, ProfileUpdateOutcome::DuplicateEmail));

    // Re-submitting your own email is fine
    let outcome = store
        .update_profile(
            &alice,
            ProfileEdit {
                email: Some("alice@example.com".to_owned()),
                bio: Some("hello".to_owned()),
                ..Default::default()
            },
        )
        .await
        .boxed()?;
    let ProfileUpdateOutcome::Updated(profile) = outcome else {
        return Err(format!("Unexpected outcome: {outcome:?}").into());
    };
    assert_eq!(profile.bio, "hello");

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn follow_toggles_both_directions() -> BoxedErrorResult<()> {
    let (_dir, store) = temp_store().await?;
    let alice = sign_up(&store, "alice").await?;
    let bob = sign_up(&store, "bob").await?;

    let bob_profile = store
        .toggle_follow(&alice, &bob)
        .await
        .boxed()?
        .expect("Bob exists");
    assert_eq!(bob_profile.followers, vec![alice.clone()]);

    let alice_profile = store
        .get_user_profile(&alice)
        .await
        .boxed()?
        .expect("Alice exists");
    assert_eq!(alice_profile.following, vec![bob.clone()]);

    // Toggling again unfollows
    let bob_profile = store
        .toggle_follow(&alice, &bob)
        .await
        .boxed()?
        .expect("Bob exists");
    assert!(bob_profile.followers.is_empty());

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn feed_is_followed_users_only() -> BoxedErrorResult<()> {
    let (_dir, store) = temp_store().await?;
    let viewer = sign_up(&store, "viewer").await?;
    let followed = sign_up(&store, "followed").await?;
    let stranger = sign_up(&store, "stranger").await?;

    store.toggle_follow(&viewer, &followed).await.boxed()?;

    let image = store
        .put_image("image/jpeg".to_owned(), vec![0xff; 16])
        .await
        .boxed()?;
    for owner in [&followed, &stranger] {
        let outcome = store
            .create_story(
                owner,
                StoryCreate {
                    image,
                    caption: Some(format!("by {owner}")),
                    location: None,
                    event: None,
                },
            )
            .await
            .boxed()?;
        assert!(matches!(outcome, StoryCreateOutcome::Created(_)));
    }

    let feed = store.story_feed(&viewer, 100).await.boxed()?;
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].owner, followed);

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn story_ownership_is_enforced() -> BoxedErrorResult<()> {
    let (_dir, store) = temp_store().await?;
    let owner = sign_up(&store, "owner").await?;
    let intruder = sign_up(&store, "intruder").await?;

    let image = store
        .put_image("image/png".to_owned(), vec![1, 2, 3])
        .await
        .boxed()?;
    let StoryCreateOutcome::Created(story) = store
        .create_story(
            &owner,
            StoryCreate {
                image,
                caption: None,
                location: None,
                event: None,
            },
        )
        .await
        .boxed()?
    else {
        return Err("Story not created".into());
    };

    let outcome = store
        .edit_story_caption(&intruder, story.id, Some("hijack".to_owned()))
        .await
        .boxed()?;
    assert!(matches!(outcome, WriteOutcome::Denied));

    let outcome = store.delete_story(&intruder, story.id).await.boxed()?;
    assert!(matches!(outcome, WriteOutcome::Denied));

    let outcome = store.delete_story(&owner, story.id).await.boxed()?;
    assert!(matches!(outcome, WriteOutcome::Done(())));
    assert!(store.get_story_details(story.id).await.boxed()?.is_none());

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn likes_toggle_membership() -> BoxedErrorResult<()> {
    let (_dir, store) = temp_store().await?;
    let owner = sign_up(&store, "owner").await?;
    let fan = sign_up(&store, "fan").await?;

    let image = store
        .put_image("image/png".to_owned(), vec![1])
        .await
        .boxed()?;
    let StoryCreateOutcome::Created(story) = store
        .create_story(
            &owner,
            StoryCreate {
                image,
                caption: None,
                location: None,
                event: None,
            },
        )
        .await
        .boxed()?
    else {
        return Err("Story not created".into());
    };

    let story = store
        .toggle_story_like(&fan, story.id)
        .await
        .boxed()?
        .expect("Story exists");
    assert_eq!(story.likes, vec![fan.clone()]);

    let story = store
        .toggle_story_like(&fan, story.id)
        .await
        .boxed()?
        .expect("Story exists");
    assert!(story.likes.is_empty());

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn comments_come_back_in_creation_order() -> BoxedErrorResult<()> {
    let (_dir, store) = temp_store().await?;
    let organiser = sign_up(&store, "organiser").await?;
    let commenter = sign_up(&store, "commenter").await?;

    let event = create_event(&store, &organiser, "Chatty").await?;

    for text in ["first", "second", "third"] {
        store
            .add_event_comment(&commenter, event.id, text.to_owned())
            .await
            .boxed()?
            .expect("Event exists");
    }

    let details = store
        .get_event_details(event.id)
        .await
        .boxed()?
        .expect("Event exists");
    let texts: Vec<_> = details.comments.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "second", "third"]);

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn organiser_only_event_edit() -> BoxedErrorResult<()> {
    let (_dir, store) = temp_store().await?;
    let organiser = sign_up(&store, "organiser").await?;
    let other = sign_up(&store, "other").await?;

    let event = create_event(&store, &organiser, "Editable").await?;

    let outcome = store
        .edit_event(
            &other,
            event.id,
            musicbee_core::entity::EventEdit {
                name: Some("Hijacked".to_owned()),
                ..Default::default()
            },
        )
        .await
        .boxed()?;
    assert!(matches!(outcome, EventWriteOutcome::NotOrganiser));

    let outcome = store
        .edit_event(
            &organiser,
            event.id,
            musicbee_core::entity::EventEdit {
                name: Some("Renamed".to_owned()),
                ..Default::default()
            },
        )
        .await
        .boxed()?;
    let EventWriteOutcome::Done(details) = outcome else {
        return Err(format!("Unexpected outcome: {outcome:?}").into());
    };
    assert_eq!(details.name, "Renamed");

    Ok(())
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn genres_are_seeded_idempotently() -> BoxedErrorResult<()> {
    let dir = tempdir()?;
    let path = dir.path().join("musicbee.redb");

    let store = Store::open(&path).await.boxed()?;
    let first = store.all_genres().await.boxed()?;
    assert!(!first.is_empty());
    drop(store);

    let store = Store::open(&path).await.boxed()?;
    let second = store.all_genres().await.boxed()?;
    assert_eq!(first.len(), second.len());

    Ok(())
}
