mod common;

use std::time::Duration;

use common::TestStack;
use reqwest::StatusCode;
use scraper::{Html, Selector};

fn select<'a>(html: &'a Html, css: &str) -> Vec<scraper::ElementRef<'a>> {
    let selector = Selector::parse(css).expect("Valid selector");
    html.select(&selector).collect()
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn public_pages_render() {
    let stack = TestStack::start().await;
    let driver = stack.driver();

    let resp = driver.get("/").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let html = Html::parse_document(&resp.text().await.expect("Body text"));
    assert!(!select(&html, ".o-eventList").is_empty());

    let body = driver.get_text("/signin").await;
    assert!(body.contains("Sign in to Musicbee"));

    let body = driver.get_text("/genres").await;
    assert!(body.contains("Techno"));
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn sign_in_sets_session_and_redirects() {
    let stack = TestStack::start().await;
    let driver = stack.driver();

    let resp = driver.sign_in("alice").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert_eq!(
        resp.headers()
            .get("location")
            .expect("Has location")
            .to_str()
            .expect("Valid header"),
        "/"
    );

    // Signed-in nav shows the profile link
    let body = driver.get_text("/").await;
    assert!(body.contains("/profile/alice"));

    // Feed needs the session; without one it redirects to sign-in
    let resp = driver.get("/feed").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let anon = stack.driver();
    let resp = anon.get("/feed").await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);
    assert!(
        resp.headers()
            .get("location")
            .expect("Has location")
            .to_str()
            .expect("Valid header")
            .starts_with("/signin")
    );
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn event_page_renders_and_survives_remote_outage() {
    let stack = TestStack::start().await;

    let remote = stack.remote_driver();
    remote.sign_in("organiser").await;
    let event_id = remote.create_event("Hive Rave").await;

    let driver = stack.driver();
    let body = driver.get_text(&format!("/events/{event_id}")).await;
    let html = Html::parse_document(&body);
    assert!(!select(&html, ".o-eventPage").is_empty());
    assert!(body.contains("Hive Rave"));
    assert!(select(&html, ".o-staleNotice").is_empty());

    // Let the mirror write-through land, then take the remote away
    tokio::time::sleep(Duration::from_millis(500)).await;
    stack.remote_goes_dark();

    let body = driver.get_text(&format!("/events/{event_id}")).await;
    let html = Html::parse_document(&body);
    assert!(body.contains("Hive Rave"));
    assert!(
        !select(&html, ".o-staleNotice").is_empty(),
        "offline render must carry the stale notice"
    );

    // Never-seen entities render the deterministic placeholder
    let body = driver
        .get_text("/events/AAAAAAAAAAAAAAAAAAAAAAAAAA")
        .await;
    assert!(body.contains("Unable to load"));
}

#[test_log::test(tokio::test(flavor = "multi_thread"))]
async fn rsvp_from_the_viewer() {
    let stack = TestStack::start().await;

    let remote = stack.remote_driver();
    remote.sign_in("organiser").await;
    let event_id = remote.create_event("Hive Rave").await;

    let driver = stack.driver();
    driver.sign_in("dancer").await;

    let resp = driver
        .post_form(
            &format!("/events/{event_id}/rsvp"),
            &[("state", "interested")],
        )
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let body = driver.get_text(&format!("/events/{event_id}")).await;
    assert!(body.contains("1 interested, 0 going"));

    let resp = driver
        .post_form(&format!("/events/{event_id}/rsvp"), &[("state", "going")])
        .await;
    assert_eq!(resp.status(), StatusCode::SEE_OTHER);

    let body = driver.get_text(&format!("/events/{event_id}")).await;
    assert!(body.contains("0 interested, 1 going"));
}
