mod common;

use common::{TestRemote, client_with_mirror, event_create, sign_in, username};
use musicbee_client::{ViewContext, ViewState};
use musicbee_core::EventId;

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn fresh_load_then_cached_after_outage() {
    let remote = TestRemote::start().await;
    let (_mirror_dir, _mirror, client) = client_with_mirror(&remote.base_url).await;

    sign_in(&client, "organiser").await;
    let event = client
        .create_event(&event_create("Hive Rave"))
        .await
        .expect("Event created");

    let mut ctx = ViewContext::new();
    let loaded = client.load_event(&mut ctx, event.id).await;
    let ViewState::Fresh(fresh) = loaded else {
        panic!("Expected a fresh load, got {loaded:?}");
    };
    assert_eq!(fresh.name, "Hive Rave");
    // Let the write-through land before taking the remote away
    ctx.drain().await;

    remote.go_dark();

    let mut ctx = ViewContext::new();
    let loaded = client.load_event(&mut ctx, event.id).await;
    let ViewState::Cached(cached) = loaded else {
        panic!("Expected a cached fallback, got {loaded:?}");
    };
    // The snapshot round-trips the key and the display fields
    assert_eq!(cached.id, event.id);
    assert_eq!(cached.name, fresh.name);
    assert_eq!(cached.organiser, username("organiser"));
    assert_eq!(cached.genre_names, fresh.genre_names);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn unavailable_when_remote_and_mirror_both_miss() {
    // Nothing is listening here and the mirror is empty
    let (_mirror_dir, _mirror, client) = client_with_mirror("http://127.0.0.1:9").await;

    let mut ctx = ViewContext::new();
    let loaded = client
        .load_event(&mut ctx, EventId::from_bytes([9; 16]))
        .await;
    assert!(matches!(loaded, ViewState::Unavailable));

    let loaded = client.load_user(&mut ctx, &username("ghost")).await;
    assert!(matches!(loaded, ViewState::Unavailable));
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn list_views_fall_back_to_the_whole_mirror() {
    let remote = TestRemote::start().await;
    let (_mirror_dir, _mirror, client) = client_with_mirror(&remote.base_url).await;

    sign_in(&client, "organiser").await;
    for name in ["First Night", "Second Night"] {
        client
            .create_event(&event_create(name))
            .await
            .expect("Event created");
    }

    let mut ctx = ViewContext::new();
    let ViewState::Fresh(fresh) = client.load_upcoming_events(&mut ctx, None).await else {
        panic!("Expected a fresh list");
    };
    assert_eq!(fresh.len(), 2);
    ctx.drain().await;

    remote.go_dark();

    let mut ctx = ViewContext::new();
    let ViewState::Cached(cached) = client.load_upcoming_events(&mut ctx, None).await else {
        panic!("Expected a cached list");
    };
    assert_eq!(cached.len(), 2);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn unauthenticated_mutation_is_distinct() {
    let remote = TestRemote::start().await;
    let (_mirror_dir, _mirror, client) = client_with_mirror(&remote.base_url).await;

    // No sign-in: the error must be the sign-in prompt, not a generic one
    let err = client
        .create_event(&event_create("No auth"))
        .await
        .expect_err("Must be rejected");
    assert!(err.is_unauthorized());
    assert_eq!(err.user_message(), "Please sign in");
}
