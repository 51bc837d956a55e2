mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::TestApp;

#[tokio::test]
async fn alice_shares_home_with_bob_read_only() {
    let app = TestApp::new();
    let alice = app.signup("alice", "pw1").await;
    let bob = app.signup("bob", "pw2").await;

    let id = app
        .create_marker(&alice, json!({ "title": "Home", "lat": 1.0, "lng": 2.0 }))
        .await["id"]
        .as_i64()
        .unwrap();

    let shared = app
        .json(
            Method::POST,
            &format!("/markers/{id}/share"),
            Some(&alice),
            Some(json!({ "username": "bob", "can_edit": false })),
        )
        .await;
    assert_eq!(shared.status, StatusCode::OK);
    assert_eq!(shared.data()["marker_id"], id);
    assert_eq!(shared.data()["username"], "bob");
    assert_eq!(shared.data()["can_edit"], false);

    let list = app.json(Method::GET, "/markers", Some(&bob), None).await;
    let markers = list.data().as_array().unwrap();
    assert_eq!(markers.len(), 1);
    assert_eq!(markers[0]["id"], id);
    assert_eq!(markers[0]["owner_username"], "alice");
    assert_eq!(markers[0]["can_edit"], false);
    assert_eq!(markers[0]["can_delete"], false);

    let update = app
        .json(Method::PUT, &format!("/markers/{id}"), Some(&bob), Some(json!({ "title": "x" })))
        .await;
    assert_eq!(update.status, StatusCode::NOT_FOUND);
    assert_eq!(update.code(), "MARKER_NOT_FOUND");
}

#[tokio::test]
async fn editor_updates_but_cannot_delete() {
    let app = TestApp::new();
    let alice = app.signup("alice", "pw1").await;
    let bob = app.signup("bob", "pw2").await;
    let id = app
        .create_marker(&alice, json!({ "title": "Home", "lat": 1.0, "lng": 2.0 }))
        .await["id"]
        .as_i64()
        .unwrap();
    app.json(
        Method::POST,
        &format!("/markers/{id}/share"),
        Some(&alice),
        Some(json!({ "username": "bob", "can_edit": true })),
    )
    .await;

    let update = app
        .json(Method::PUT, &format!("/markers/{id}"), Some(&bob), Some(json!({ "lat": 5.5 })))
        .await;
    assert_eq!(update.status, StatusCode::OK);
    assert_eq!(update.data()["lat"], 5.5);
    assert_eq!(update.data()["can_edit"], true);
    assert_eq!(update.data()["can_delete"], false);

    let delete = app.json(Method::DELETE, &format!("/markers/{id}"), Some(&bob), None).await;
    assert_eq!(delete.status, StatusCode::NOT_FOUND);

    let reshare = app
        .json(
            Method::POST,
            &format!("/markers/{id}/share"),
            Some(&bob),
            Some(json!({ "username": "alice" })),
        )
        .await;
    assert_eq!(reshare.status, StatusCode::NOT_FOUND);
    assert_eq!(reshare.code(), "MARKER_NOT_FOUND");
}

#[tokio::test]
async fn sharing_twice_keeps_one_row() {
    let app = TestApp::new();
    let alice = app.signup("alice", "pw1").await;
    app.signup("bob", "pw2").await;
    let id = app
        .create_marker(&alice, json!({ "title": "Home", "lat": 1.0, "lng": 2.0 }))
        .await["id"]
        .as_i64()
        .unwrap();

    for can_edit in [false, true] {
        let res = app
            .json(
                Method::POST,
                &format!("/markers/{id}/share"),
                Some(&alice),
                Some(json!({ "username": "bob", "can_edit": can_edit })),
            )
            .await;
        assert_eq!(res.status, StatusCode::OK);
    }

    let shares = app
        .json(Method::GET, &format!("/markers/{id}/shares"), Some(&alice), None)
        .await;
    let rows = shares.data().as_array().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["username"], "bob");
    assert_eq!(rows[0]["can_edit"], true);
    assert!(rows[0]["share_id"].is_i64());
    assert!(rows[0]["user_id"].is_i64());
}

#[tokio::test]
async fn share_errors() {
    let app = TestApp::new();
    let alice = app.signup("alice", "pw1").await;
    let id = app
        .create_marker(&alice, json!({ "title": "Home", "lat": 1.0, "lng": 2.0 }))
        .await["id"]
        .as_i64()
        .unwrap();

    let to_self = app
        .json(
            Method::POST,
            &format!("/markers/{id}/share"),
            Some(&alice),
            Some(json!({ "username": "alice" })),
        )
        .await;
    assert_eq!(to_self.status, StatusCode::BAD_REQUEST);
    assert_eq!(to_self.code(), "BAD_REQUEST");

    let to_nobody = app
        .json(
            Method::POST,
            &format!("/markers/{id}/share"),
            Some(&alice),
            Some(json!({ "username": "nobody" })),
        )
        .await;
    assert_eq!(to_nobody.status, StatusCode::NOT_FOUND);
    assert_eq!(to_nobody.code(), "USER_NOT_FOUND");

    let missing_marker = app
        .json(
            Method::POST,
            &format!("/markers/{}/share", id + 1),
            Some(&alice),
            Some(json!({ "username": "nobody" })),
        )
        .await;
    assert_eq!(missing_marker.code(), "MARKER_NOT_FOUND");
}

#[tokio::test]
async fn removing_shares() {
    let app = TestApp::new();
    let alice = app.signup("alice", "pw1").await;
    let bob = app.signup("bob", "pw2").await;
    let id = app
        .create_marker(&alice, json!({ "title": "Home", "lat": 1.0, "lng": 2.0 }))
        .await["id"]
        .as_i64()
        .unwrap();
    let shared = app
        .json(
            Method::POST,
            &format!("/markers/{id}/share"),
            Some(&alice),
            Some(json!({ "username": "bob" })),
        )
        .await;
    assert_eq!(shared.status, StatusCode::OK);
    assert_eq!(shared.data()["can_edit"], false);

    let shares = app
        .json(Method::GET, &format!("/markers/{id}/shares"), Some(&alice), None)
        .await;
    let bob_id = shares.data()[0]["user_id"].as_i64().unwrap();

    let removed = app
        .json(Method::DELETE, &format!("/markers/{id}/share/{bob_id}"), Some(&alice), None)
        .await;
    assert_eq!(removed.status, StatusCode::OK);
    assert_eq!(removed.data()["removed"], true);

    let list = app.json(Method::GET, "/markers", Some(&bob), None).await;
    assert!(list.data().as_array().unwrap().is_empty());

    let again = app
        .json(Method::DELETE, &format!("/markers/{id}/share/{bob_id}"), Some(&alice), None)
        .await;
    assert_eq!(again.status, StatusCode::NOT_FOUND);
    assert_eq!(again.code(), "SHARE_NOT_FOUND");
}

#[tokio::test]
async fn deleting_marker_drops_its_shares() {
    let app = TestApp::new();
    let alice = app.signup("alice", "pw1").await;
    let bob = app.signup("bob", "pw2").await;
    let id = app
        .create_marker(&alice, json!({ "title": "Home", "lat": 1.0, "lng": 2.0 }))
        .await["id"]
        .as_i64()
        .unwrap();
    app.json(
        Method::POST,
        &format!("/markers/{id}/share"),
        Some(&alice),
        Some(json!({ "username": "bob", "can_edit": true })),
    )
    .await;

    let deleted = app.json(Method::DELETE, &format!("/markers/{id}"), Some(&alice), None).await;
    assert_eq!(deleted.status, StatusCode::OK);

    let shares = app
        .json(Method::GET, &format!("/markers/{id}/shares"), Some(&alice), None)
        .await;
    assert_eq!(shares.status, StatusCode::NOT_FOUND);
    assert_eq!(shares.code(), "MARKER_NOT_FOUND");

    let list = app.json(Method::GET, "/markers", Some(&bob), None).await;
    assert!(list.data().as_array().unwrap().is_empty());
}
