mod common;

use common::TestServer;
use reqwest::StatusCode;
use serde_json::{Value, json};

fn future_secs(offset: u64) -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .expect("Clock after epoch")
        .as_secs()
        + offset
}

fn event_body(name: &str) -> Value {
    json!({
        "name": name,
        "venue": { "address": "12 Hive St", "latitude": 51.5, "longitude": -0.1 },
        "starts_at": future_secs(3600),
        "ends_at": future_secs(7200),
        "genres": ["techno"],
        "description": "An event",
        "image": null,
    })
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn sign_in_creates_account_once() {
    let server = TestServer::start().await;
    let driver = server.driver();

    let resp = driver.sign_in("alice").await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = driver.sign_in("alice").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = driver.get("/api/users/alice").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let profile: Value = resp.json().await.expect("Json body");
    assert_eq!(profile["username"], "alice");

    // Unknown users are a distinct not-found
    let resp = driver.get("/api/users/nobody").await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn writes_require_a_session() {
    let server = TestServer::start().await;
    let driver = server.driver();

    let resp = driver.post_json("/api/events", &event_body("No auth")).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let resp = driver
        .post_json("/api/stories", &json!({"image": "AAAAAAAAAAAAAAAAAAAAAAAAAA", "caption": null, "location": null, "event": null}))
        .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn rsvp_interested_then_going() {
    let server = TestServer::start().await;

    let organiser = server.driver();
    organiser.sign_in("organiser").await;
    let resp = organiser.post_json("/api/events", &event_body("e1")).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let event: Value = resp.json().await.expect("Json body");
    let event_id = event["id"].as_str().expect("Has id").to_owned();

    let u1 = server.driver();
    u1.sign_in("user1").await;

    let resp = u1
        .post_json(
            &format!("/api/events/{event_id}/rsvp"),
            &json!({"state": "interested"}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let event: Value = resp.json().await.expect("Json body");
    assert_eq!(event["interested"], json!(["user1"]));
    assert_eq!(event["going"], json!([]));

    let resp = u1
        .post_json(
            &format!("/api/events/{event_id}/rsvp"),
            &json!({"state": "going"}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let event: Value = resp.json().await.expect("Json body");
    assert_eq!(event["interested"], json!([]));
    assert_eq!(event["going"], json!(["user1"]));
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn only_the_organiser_edits_an_event() {
    let server = TestServer::start().await;

    let organiser = server.driver();
    organiser.sign_in("organiser").await;
    let event: Value = organiser
        .post_json("/api/events", &event_body("Mine"))
        .await
        .json()
        .await
        .expect("Json body");
    let event_id = event["id"].as_str().expect("Has id").to_owned();

    let other = server.driver();
    other.sign_in("other").await;
    let resp = other
        .put_json(
            &format!("/api/events/{event_id}"),
            &json!({"name": "Hijacked"}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = organiser
        .put_json(
            &format!("/api/events/{event_id}"),
            &json!({"name": "Renamed"}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn oversized_image_is_rejected() {
    let server = TestServer::start().await;
    let driver = server.driver();
    driver.sign_in("uploader").await;

    let resp = driver.upload_image(vec![0u8; 8 * 1024 * 1024 + 1]).await;
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let resp = driver.upload_image(vec![0u8; 1024]).await;
    assert_eq!(resp.status(), StatusCode::CREATED);
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn duplicate_email_conflicts() {
    let server = TestServer::start().await;

    let alice = server.driver();
    alice.sign_in("alice").await;
    let bob = server.driver();
    bob.sign_in("bob").await;

    let resp = alice
        .put_json("/api/users/alice", &json!({"email": "bob@example.com"}))
        .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
    let body: Value = resp.json().await.expect("Json body");
    assert!(
        body["message"]
            .as_str()
            .expect("Has message")
            .contains("already in use")
    );
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn story_like_comment_and_delete_flow() {
    let server = TestServer::start().await;

    let owner = server.driver();
    owner.sign_in("owner").await;
    let image: Value = owner
        .upload_image(vec![1, 2, 3])
        .await
        .json()
        .await
        .expect("Json body");
    let image_id = image["id"].as_str().expect("Has id").to_owned();

    let resp = owner
        .post_json(
            "/api/stories",
            &json!({"image": image_id, "caption": "first night", "location": null, "event": null}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let story: Value = resp.json().await.expect("Json body");
    let story_id = story["id"].as_str().expect("Has id").to_owned();

    let fan = server.driver();
    fan.sign_in("fan").await;

    let resp = fan
        .post_json(&format!("/api/stories/{story_id}/like"), &json!({}))
        .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let story: Value = resp.json().await.expect("Json body");
    assert_eq!(story["likes"], json!(["fan"]));

    let resp = fan
        .post_json(
            &format!("/api/stories/{story_id}/comments"),
            &json!({"text": "hello"}),
        )
        .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    // Deletion is owner-only
    let resp = fan.delete(&format!("/api/stories/{story_id}")).await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    let resp = owner.delete(&format!("/api/stories/{story_id}")).await;
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
    let resp = owner.get(&format!("/api/stories/{story_id}")).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
