//! End-to-end tests of the HTTP API against an in-memory database.

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use hackvault_api::auth::{AdminCredential, AppStateInner};
use hackvault_db::Database;

const ADMIN_EMAIL: &str = "root@hackvault.test";
const ADMIN_PASSWORD: &str = "root-password-123";

fn app() -> Router {
    let state = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        jwt_secret: "test-secret".into(),
        token_ttl: chrono::Duration::days(1),
        admin_credentials: vec![AdminCredential {
            email: ADMIN_EMAIL.into(),
            password: ADMIN_PASSWORD.into(),
        }],
    });
    hackvault_api::router(state)
}

async fn send(app: &Router, method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

async fn register(app: &Router, username: &str, email: &str, password: &str) -> Value {
    let (status, body) = send(
        app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "username": username, "email": email, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{}", body);
    body
}

async fn admin_token(app: &Router) -> String {
    let body = register(app, "root", ADMIN_EMAIL, ADMIN_PASSWORD).await;
    body["token"].as_str().unwrap().to_string()
}

/// Register, approve and log in a regular member. Returns (user id, token).
async fn member(app: &Router, admin: &str, username: &str) -> (String, String) {
    let email = format!("{}@hackvault.test", username);
    let body = register(app, username, &email, "member-password").await;
    let id = body["user"]["id"].as_str().unwrap().to_string();

    let (status, _) = send(app, Method::POST, &format!("/admin/users/{}/approve", id), Some(admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": email, "password": "member-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    (id, body["token"].as_str().unwrap().to_string())
}

async fn category_id(app: &Router, slug: &str) -> String {
    let (_, body) = send(app, Method::GET, "/categories", None, None).await;
    body.as_array()
        .unwrap()
        .iter()
        .find(|c| c["slug"] == slug)
        .map(|c| c["id"].as_str().unwrap().to_string())
        .unwrap()
}

async fn create(app: &Router, token: &str, kind: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::POST, &format!("/content/{}", kind), Some(token), Some(body)).await
}

fn ids(list: &Value) -> Vec<String> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|item| item["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn pending_user_cannot_log_in_until_approved() {
    let app = app();
    let admin = admin_token(&app).await;

    let body = register(&app, "newbie", "newbie@hackvault.test", "newbie-password").await;
    assert!(body["token"].is_null());
    assert_eq!(body["user"]["is_approved"], false);
    let id = body["user"]["id"].as_str().unwrap().to_string();

    let login = json!({ "email": "newbie@hackvault.test", "password": "newbie-password" });
    let (status, _) = send(&app, Method::POST, "/auth/login", None, Some(login.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (_, pending) = send(&app, Method::GET, "/admin/users/pending", Some(&admin), None).await;
    assert_eq!(ids(&pending), vec![id.clone()]);

    let approve_uri = format!("/admin/users/{}/approve", id);
    let (status, body) = send(&app, Method::POST, &approve_uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "approved");

    let (_, body) = send(&app, Method::POST, &approve_uri, Some(&admin), None).await;
    assert_eq!(body["outcome"], "already_approved");

    let (_, pending) = send(&app, Method::GET, "/admin/users/pending", Some(&admin), None).await;
    assert!(pending.as_array().unwrap().is_empty());

    let (status, body) = send(&app, Method::POST, "/auth/login", None, Some(login)).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();

    let (status, me) = send(&app, Method::GET, "/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "newbie");
}

#[tokio::test]
async fn wrong_password_and_duplicate_email_are_rejected() {
    let app = app();
    admin_token(&app).await;

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/login",
        None,
        Some(json!({ "email": ADMIN_EMAIL, "password": "not-the-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        Method::POST,
        "/auth/register",
        None,
        Some(json!({ "username": "other", "email": ADMIN_EMAIL, "password": "whatever-123" })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn admin_routes_need_an_admin() {
    let app = app();
    let admin = admin_token(&app).await;
    let (_, member_token) = member(&app, &admin, "alice").await;

    let (status, _) = send(&app, Method::GET, "/admin/users", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, Method::GET, "/admin/users", Some(&member_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::GET, "/admin/users", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn reject_only_removes_pending_accounts() {
    let app = app();
    let admin = admin_token(&app).await;
    let (approved_id, _) = member(&app, &admin, "bob").await;

    let body = register(&app, "spammer", "spam@hackvault.test", "spam-password").await;
    let pending_id = body["user"]["id"].as_str().unwrap();

    let (status, _) = send(&app, Method::POST, &format!("/admin/users/{}/reject", pending_id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, Method::POST, &format!("/admin/users/{}/reject", approved_id), Some(&admin), None).await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, users) = send(&app, Method::GET, "/admin/users", Some(&admin), None).await;
    assert_eq!(users.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn private_content_is_hidden_from_strangers() {
    let app = app();
    let admin = admin_token(&app).await;
    let (_, alice) = member(&app, &admin, "alice").await;
    let (_, bob) = member(&app, &admin, "bob").await;

    let (status, public) = create(
        &app,
        &alice,
        "write_ups",
        json!({ "title": "public", "kind": "write_ups", "content": "shared" }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let (_, private) = create(
        &app,
        &alice,
        "write_ups",
        json!({ "title": "draft", "kind": "write_ups", "content": "mine", "is_public": false }),
    )
    .await;
    let private_id = private["id"].as_str().unwrap();

    let (_, anon) = send(&app, Method::GET, "/content/write_ups", None, None).await;
    assert_eq!(ids(&anon), vec![public["id"].as_str().unwrap().to_string()]);

    let (_, as_bob) = send(&app, Method::GET, "/content/write_ups", Some(&bob), None).await;
    assert_eq!(as_bob.as_array().unwrap().len(), 1);

    let uri = format!("/content/write_ups/{}", private_id);
    let (status, _) = send(&app, Method::GET, &uri, Some(&bob), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, Method::GET, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, as_admin) = send(&app, Method::GET, "/content/write_ups", Some(&admin), None).await;
    assert_eq!(as_admin.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn visibility_toggle_is_admin_only() {
    let app = app();
    let admin = admin_token(&app).await;
    let (_, alice) = member(&app, &admin, "alice").await;

    let (_, tool) = create(
        &app,
        &alice,
        "testing_tools",
        json!({ "title": "sqlmap", "kind": "testing_tools", "url": "https://sqlmap.org" }),
    )
    .await;
    let uri = format!("/content/testing_tools/{}/visibility", tool["id"].as_str().unwrap());

    let (status, _) = send(&app, Method::PATCH, &uri, Some(&alice), Some(json!({ "is_public": false }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, Method::PATCH, &uri, Some(&admin), Some(json!({ "is_public": false }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["is_public"], false);

    let (_, anon) = send(&app, Method::GET, "/content/testing_tools", None, None).await;
    assert!(anon.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn protected_categories_cannot_be_deleted() {
    let app = app();
    let admin = admin_token(&app).await;
    let (_, alice) = member(&app, &admin, "alice").await;
    let rules = category_id(&app, "rules").await;
    let forensics = category_id(&app, "forensics").await;

    let (_, notice) = create(
        &app,
        &admin,
        "posts",
        json!({ "title": "Be nice", "kind": "posts", "content": "no doxxing", "category_id": rules }),
    )
    .await;
    let uri = format!("/content/posts/{}", notice["id"].as_str().unwrap());
    for token in [&admin, &alice] {
        let (status, _) = send(&app, Method::DELETE, &uri, Some(token.as_str()), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    let (_, snippet) = create(
        &app,
        &alice,
        "code_snippets",
        json!({ "title": "volatility", "kind": "code_snippets", "code": "vol -f mem.raw pslist", "category_id": forensics }),
    )
    .await;
    let uri = format!("/content/code_snippets/{}", snippet["id"].as_str().unwrap());
    let (status, body) = send(&app, Method::DELETE, &uri, Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn deleting_a_post_removes_its_replies() {
    let app = app();
    let admin = admin_token(&app).await;
    let (_, alice) = member(&app, &admin, "alice").await;

    let (_, root) = create(
        &app,
        &alice,
        "posts",
        json!({ "title": "CTF team?", "kind": "posts", "content": "looking for a team" }),
    )
    .await;
    let root_id = root["id"].as_str().unwrap();

    let (status, reply) = create(
        &app,
        &admin,
        "posts",
        json!({ "title": "Re", "kind": "posts", "content": "join us", "parent_id": root_id }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = create(
        &app,
        &alice,
        "posts",
        json!({ "title": "Re Re", "kind": "posts", "content": "ok", "parent_id": reply["id"] }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, thread) = send(&app, Method::GET, &format!("/posts/{}/thread", root_id), None, None).await;
    assert_eq!(thread["replies"].as_array().unwrap().len(), 1);

    let (status, body) = send(&app, Method::DELETE, &format!("/content/posts/{}", root_id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["deleted"],
        json!([root_id, reply["id"].as_str().unwrap()])
    );

    let (status, _) = send(&app, Method::GET, &format!("/content/posts/{}", reply["id"].as_str().unwrap()), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn replies_take_their_parent_category() {
    let app = app();
    let admin = admin_token(&app).await;
    let (_, alice) = member(&app, &admin, "alice").await;
    let rules = category_id(&app, "rules").await;

    let (_, root) = create(
        &app,
        &alice,
        "posts",
        json!({ "title": "stego help", "kind": "posts", "content": "png with extra IDAT" }),
    )
    .await;
    let root_id = root["id"].as_str().unwrap();

    // A reply cannot smuggle itself into a protected category.
    let (status, reply) = create(
        &app,
        &admin,
        "posts",
        json!({ "title": "Re", "kind": "posts", "content": "try zsteg", "parent_id": root_id, "category_id": rules }),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(reply["category_id"], Value::Null);

    let (status, body) = send(&app, Method::DELETE, &format!("/content/posts/{}", root_id), Some(&alice), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["deleted"].as_array().unwrap().len(), 2);

    // Replies under a protected post are protected with it.
    let (_, notice) = create(
        &app,
        &admin,
        "posts",
        json!({ "title": "Rule 1", "kind": "posts", "content": "no spoilers", "category_id": rules }),
    )
    .await;
    let notice_id = notice["id"].as_str().unwrap();
    let (_, reply) = create(
        &app,
        &alice,
        "posts",
        json!({ "title": "Re", "kind": "posts", "content": "ack", "parent_id": notice_id }),
    )
    .await;
    assert_eq!(reply["category_id"].as_str(), Some(rules.as_str()));

    let uri = format!("/content/posts/{}", reply["id"].as_str().unwrap());
    let (status, _) = send(&app, Method::DELETE, &uri, Some(&admin), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn malformed_content_is_rejected() {
    let app = app();
    let admin = admin_token(&app).await;

    let (status, _) = create(
        &app,
        &admin,
        "youtube_channels",
        json!({ "title": "ippsec", "kind": "youtube_channels", "url": "not a url" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = create(
        &app,
        &admin,
        "write_ups",
        json!({ "title": "mismatch", "kind": "posts", "content": "wrong table" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, Method::GET, "/content/write_ups?category=nope", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = create(
        &app,
        "",
        "write_ups",
        json!({ "title": "anon", "kind": "write_ups", "content": "x" }),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}
