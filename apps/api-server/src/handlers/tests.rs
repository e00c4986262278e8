//! Handler tests against the in-memory store.

use std::sync::Arc;

use actix_web::http::{StatusCode, header};
use actix_web::{App, test, web};
use serde_json::{Value, json};
use uuid::Uuid;

use quill_core::domain::Role;
use quill_core::ports::{Repositories, Store};
use quill_core::services::accounts::{self, RegisterInput};
use quill_infra::{
    Argon2PasswordService, InMemoryFileStorage, InMemoryStore, JwtConfig, JwtTokenService,
};

use super::configure_routes;
use crate::middleware::error::GENERIC_FAILURE;
use crate::state::AppState;

struct Fixture {
    state: AppState,
    store: Arc<InMemoryStore>,
    files: Arc<InMemoryFileStorage>,
}

impl Fixture {
    fn new() -> Self {
        let store = Arc::new(InMemoryStore::new());
        let files = Arc::new(InMemoryFileStorage::new());
        let state = AppState {
            store: store.clone(),
            files: files.clone(),
            tokens: Arc::new(JwtTokenService::new(JwtConfig::default())),
            passwords: Arc::new(Argon2PasswordService::new()),
        };

        Self {
            state,
            store,
            files,
        }
    }

    /// Create an account directly and return its id and a bearer token.
    async fn account(&self, username: &str, role: Role) -> (Uuid, String) {
        let email = format!("{username}@example.com");
        let input = RegisterInput {
            name: username.to_uppercase(),
            username: username.to_string(),
            email: email.clone(),
            password: "secret123".to_string(),
        };

        let tx = self.state.store.begin().await.unwrap();
        let account =
            accounts::create_account(tx.as_ref(), self.state.passwords.as_ref(), input, role)
                .await
                .unwrap();
        tx.commit().await.unwrap();

        let token = self
            .state
            .tokens
            .generate_token(account.user.id, &email, role)
            .unwrap();
        (account.user.id, format!("Bearer {token}"))
    }
}

macro_rules! init_app {
    ($fx:expr) => {
        test::init_service(
            App::new()
                .app_data(web::Data::new($fx.state.clone()))
                .configure(configure_routes),
        )
        .await
    };
}

macro_rules! send {
    ($app:expr, $req:expr) => {{
        let resp = test::call_service(&$app, $req.to_request()).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }};
}

fn post_body(title: &str, tag_ids: Value) -> Value {
    json!({
        "title": title,
        "content": "A body that is comfortably long enough.",
        "status": "published",
        "tag_ids": tag_ids,
    })
}

fn multipart(file_name: &str, bytes: &[u8]) -> (String, Vec<u8>) {
    let boundary = "quill-test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{boundary}\r\n").as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"image_path\"; filename=\"{file_name}\"\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(b"Content-Type: image/png\r\n\r\n");
    body.extend_from_slice(bytes);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={boundary}"), body)
}

#[actix_rt::test]
async fn test_health_reports_backend() {
    let fx = Fixture::new();
    let app = init_app!(fx);

    let (status, body) = send!(app, test::TestRequest::get().uri("/health"));

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["storage"], "memory");
}

#[actix_rt::test]
async fn test_register_then_login() {
    let fx = Fixture::new();
    let app = init_app!(fx);

    let (status, body) = send!(
        app,
        test::TestRequest::post().uri("/v1/register").set_json(json!({
            "name": "Author One",
            "username": "author1",
            "email": "author1@example.com",
            "password": "secret123",
        }))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Registration successful");
    assert_eq!(body["data"]["role"], "author");
    assert_eq!(body["data"]["name"], "Author One");

    let (status, body) = send!(
        app,
        test::TestRequest::post().uri("/v1/register").set_json(json!({
            "name": "Again",
            "username": "again",
            "email": "author1@example.com",
            "password": "secret123",
        }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["email"][0], "The email has already been taken.");

    let (status, body) = send!(
        app,
        test::TestRequest::post().uri("/v1/login").set_json(json!({
            "email": "author1@example.com",
            "password": "secret123",
        }))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["token_type"], "Bearer");
    assert_eq!(body["data"]["user"]["username"], "author1");
    assert!(body["data"]["token"].as_str().is_some_and(|t| !t.is_empty()));

    let (status, body) = send!(
        app,
        test::TestRequest::post().uri("/v1/login").set_json(json!({
            "email": "author1@example.com",
            "password": "wrong-password",
        }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Invalid email or password");
    assert_eq!(body["data"], Value::Null);
}

#[actix_rt::test]
async fn test_writes_require_login() {
    let fx = Fixture::new();
    let app = init_app!(fx);

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/v1/posts")
            .set_json(post_body("Hello", json!([1])))
    );

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Access denied! You are not logged in");

    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri("/v1/tags")
            .insert_header((header::AUTHORIZATION, "Bearer not-a-token"))
            .set_json(json!({"name": "Rust"}))
    );
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[actix_rt::test]
async fn test_only_admins_manage_tags() {
    let fx = Fixture::new();
    let (_, admin) = fx.account("admin", Role::Admin).await;
    let (_, author) = fx.account("author", Role::Author).await;
    let app = init_app!(fx);

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/v1/tags")
            .insert_header((header::AUTHORIZATION, author))
            .set_json(json!({"name": "Rust"}))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Access denied! You are not an admin");

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/v1/tags")
            .insert_header((header::AUTHORIZATION, admin.clone()))
            .set_json(json!({"name": "Web Development"}))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["slug"], "web-development");
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/v1/tags")
            .insert_header((header::AUTHORIZATION, admin.clone()))
            .set_json(json!({"name": "Web Development"}))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["name"][0], "The name has already been taken.");

    let (status, body) = send!(
        app,
        test::TestRequest::put()
            .uri(&format!("/v1/tags/{id}"))
            .insert_header((header::AUTHORIZATION, admin.clone()))
            .set_json(json!({"name": "Web"}))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["slug"], "web");

    let (status, _) = send!(
        app,
        test::TestRequest::delete()
            .uri(&format!("/v1/tags/{id}"))
            .insert_header((header::AUTHORIZATION, admin))
    );
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send!(app, test::TestRequest::get().uri(&format!("/v1/tags/{id}")));
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Tag not found");
}

#[actix_rt::test]
async fn test_post_lifecycle() {
    let fx = Fixture::new();
    let (_, admin) = fx.account("admin", Role::Admin).await;
    let (author_id, author) = fx.account("author", Role::Author).await;
    let app = init_app!(fx);

    let mut tag_ids = Vec::new();
    for name in ["Entertainment", "Sport", "Academic"] {
        let (_, body) = send!(
            app,
            test::TestRequest::post()
                .uri("/v1/tags")
                .insert_header((header::AUTHORIZATION, admin.clone()))
                .set_json(json!({"name": name}))
        );
        tag_ids.push(body["data"]["id"].as_i64().unwrap());
    }
    let (t1, t2, t3) = (tag_ids[0], tag_ids[1], tag_ids[2]);

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/v1/posts")
            .insert_header((header::AUTHORIZATION, author.clone()))
            .set_json(post_body("First Post", json!([t1, t1, t2])))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Post created successfully");
    assert_eq!(body["data"]["slug"], "first-post");
    assert_eq!(body["data"]["author"]["id"], author_id.to_string());
    assert_eq!(body["data"]["tags"].as_array().unwrap().len(), 2);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send!(
        app,
        test::TestRequest::patch()
            .uri(&format!("/v1/posts/{id}"))
            .insert_header((header::AUTHORIZATION, author.clone()))
            .set_json(post_body("First Post", json!([t2, t3])))
    );
    assert_eq!(status, StatusCode::OK);
    let tags: Vec<i64> = body["data"]["tags"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["id"].as_i64().unwrap())
        .collect();
    assert_eq!(tags, vec![t2, t3]);

    let (status, body) = send!(app, test::TestRequest::get().uri("/v1/posts"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, body) = send!(
        app,
        test::TestRequest::delete()
            .uri(&format!("/v1/posts/{id}"))
            .insert_header((header::AUTHORIZATION, author))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "First Post");
    assert_eq!(body["data"]["tags"].as_array().unwrap().len(), 2);
    assert!(fx.store.association_rows().await.is_empty());

    let (status, body) = send!(app, test::TestRequest::get().uri(&format!("/v1/posts/{id}")));
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Post not found");
}

#[actix_rt::test]
async fn test_invalid_post_requests() {
    let fx = Fixture::new();
    let (_, author) = fx.account("author", Role::Author).await;
    let app = init_app!(fx);

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/v1/posts")
            .insert_header((header::AUTHORIZATION, author.clone()))
            .set_json(json!({"title": "", "content": "short", "status": "archived"}))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation errors");
    for field in ["title", "content", "status", "tag_ids"] {
        assert!(body["data"][field].is_array(), "{field}");
    }

    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/v1/posts")
            .insert_header((header::AUTHORIZATION, author))
            .set_json(post_body("Ghost Tags", json!([404])))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["data"]["tag_ids"][0], "The selected tag_ids is invalid.");
    assert!(fx.store.posts().list().await.unwrap().is_empty());

    let (status, body) = send!(app, test::TestRequest::get().uri("/v1/posts/not-a-uuid"));
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[actix_rt::test]
async fn test_injected_failure_is_generic_500() {
    let fx = Fixture::new();
    let (_, admin) = fx.account("admin", Role::Admin).await;
    let app = init_app!(fx);

    let mut tag_ids = Vec::new();
    for name in ["One", "Two"] {
        let (_, body) = send!(
            app,
            test::TestRequest::post()
                .uri("/v1/tags")
                .insert_header((header::AUTHORIZATION, admin.clone()))
                .set_json(json!({"name": name}))
        );
        tag_ids.push(body["data"]["id"].clone());
    }

    fx.store.fail_association_inserts_after(1);
    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/v1/posts")
            .insert_header((header::AUTHORIZATION, admin))
            .set_json(post_body("Doomed", Value::Array(tag_ids)))
    );
    fx.store.clear_faults();

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body,
        json!({"success": false, "message": GENERIC_FAILURE, "data": null})
    );
    assert!(fx.store.posts().list().await.unwrap().is_empty());
    assert!(fx.store.association_rows().await.is_empty());
}

#[actix_rt::test]
async fn test_only_owner_or_admin_edits_a_post() {
    let fx = Fixture::new();
    let (_, admin) = fx.account("admin", Role::Admin).await;
    let (_, owner) = fx.account("owner", Role::Author).await;
    let (_, other) = fx.account("other", Role::Author).await;
    let app = init_app!(fx);

    let (_, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/v1/tags")
            .insert_header((header::AUTHORIZATION, admin.clone()))
            .set_json(json!({"name": "Rust"}))
    );
    let tag = body["data"]["id"].clone();

    let (_, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/v1/posts")
            .insert_header((header::AUTHORIZATION, owner))
            .set_json(post_body("Mine", json!([tag.clone()])))
    );
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, _) = send!(
        app,
        test::TestRequest::put()
            .uri(&format!("/v1/posts/{id}"))
            .insert_header((header::AUTHORIZATION, other.clone()))
            .set_json(post_body("Stolen", json!([tag.clone()])))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send!(
        app,
        test::TestRequest::delete()
            .uri(&format!("/v1/posts/{id}"))
            .insert_header((header::AUTHORIZATION, other))
    );
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send!(
        app,
        test::TestRequest::put()
            .uri(&format!("/v1/posts/{id}"))
            .insert_header((header::AUTHORIZATION, admin))
            .set_json(post_body("Moderated", json!([tag])))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Moderated");
}

#[actix_rt::test]
async fn test_image_upload_replaces_previous_file() {
    let fx = Fixture::new();
    let (_, admin) = fx.account("admin", Role::Admin).await;
    let app = init_app!(fx);

    let (_, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/v1/tags")
            .insert_header((header::AUTHORIZATION, admin.clone()))
            .set_json(json!({"name": "Rust"}))
    );
    let tag = body["data"]["id"].clone();

    let (_, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/v1/posts")
            .insert_header((header::AUTHORIZATION, admin.clone()))
            .set_json(post_body("Pictured", json!([tag])))
    );
    let id = body["data"]["id"].as_str().unwrap().to_string();
    let uri = format!("/v1/posts/{id}/upload-image");

    let (content_type, payload) = multipart("cover.png", b"\x89PNG first");
    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri(&uri)
            .insert_header((header::AUTHORIZATION, admin.clone()))
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(payload)
    );
    assert_eq!(status, StatusCode::OK);
    let first = body["data"]["image_path"].as_str().unwrap().to_string();
    assert!(first.starts_with("posts/") && first.ends_with("-cover.png"));
    assert_eq!(fx.files.paths().await, vec![first.clone()]);

    let (content_type, payload) = multipart("second.png", b"\x89PNG second");
    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri(&uri)
            .insert_header((header::AUTHORIZATION, admin.clone()))
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(payload)
    );
    assert_eq!(status, StatusCode::OK);
    let second = body["data"]["image_path"].as_str().unwrap().to_string();
    assert_eq!(fx.files.paths().await, vec![second]);

    let (content_type, payload) = multipart("notes.txt", b"plain text");
    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri(&uri)
            .insert_header((header::AUTHORIZATION, admin.clone()))
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(payload)
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["data"]["image_path"].is_array());

    let (status, _) = send!(
        app,
        test::TestRequest::delete()
            .uri(&format!("/v1/posts/{id}"))
            .insert_header((header::AUTHORIZATION, admin))
    );
    assert_eq!(status, StatusCode::OK);
    assert!(fx.files.paths().await.is_empty());
}

#[actix_rt::test]
async fn test_failed_upload_discards_new_file() {
    let fx = Fixture::new();
    let (_, admin) = fx.account("admin", Role::Admin).await;
    let app = init_app!(fx);

    let (_, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/v1/tags")
            .insert_header((header::AUTHORIZATION, admin.clone()))
            .set_json(json!({"name": "Rust"}))
    );
    let tag = body["data"]["id"].clone();

    let (_, body) = send!(
        app,
        test::TestRequest::post()
            .uri("/v1/posts")
            .insert_header((header::AUTHORIZATION, admin.clone()))
            .set_json(post_body("Pictured", json!([tag])))
    );
    let id = body["data"]["id"].as_str().unwrap().to_string();
    let uri = format!("/v1/posts/{id}/upload-image");

    let (content_type, payload) = multipart("kept.png", b"\x89PNG kept");
    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri(&uri)
            .insert_header((header::AUTHORIZATION, admin.clone()))
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(payload)
    );
    assert_eq!(status, StatusCode::OK);
    let kept = body["data"]["image_path"].as_str().unwrap().to_string();

    // The post update fails inside the transaction.
    fx.store.fail_post_updates();
    let (content_type, payload) = multipart("rolled-back.png", b"\x89PNG lost");
    let (status, body) = send!(
        app,
        test::TestRequest::post()
            .uri(&uri)
            .insert_header((header::AUTHORIZATION, admin.clone()))
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(payload)
    );
    fx.store.clear_faults();
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["message"], GENERIC_FAILURE);
    assert_eq!(fx.files.paths().await, vec![kept.clone()]);

    // The transaction cannot even be opened.
    fx.store.refuse_transactions();
    let (content_type, payload) = multipart("unreachable.png", b"\x89PNG lost");
    let (status, _) = send!(
        app,
        test::TestRequest::post()
            .uri(&uri)
            .insert_header((header::AUTHORIZATION, admin))
            .insert_header((header::CONTENT_TYPE, content_type))
            .set_payload(payload)
    );
    fx.store.clear_faults();
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(fx.files.paths().await, vec![kept.clone()]);

    let post = fx
        .store
        .posts()
        .find(id.parse().unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(post.post.image_path, Some(kept));
}
