//! End-to-end tests over HTTP against a server on an ephemeral port.

mod common;

use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use serde_json::{json, Value};

use common::spawn_app;

fn jpeg(name: &str, size: usize) -> Form {
    let part = Part::bytes(vec![0xAB; size])
        .file_name(name.to_string())
        .mime_str("image/jpeg")
        .unwrap();
    Form::new().part("file", part)
}

#[tokio::test]
async fn health_reports_ok() {
    let app = spawn_app(None).await;
    let body: Value = app
        .client()
        .get(app.url("/health"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn api_requires_a_session() {
    let app = spawn_app(None).await;
    let client = app.client();

    for path in ["/api/tasks", "/api/images", "/api/notes", "/api/profile"] {
        let response = client.get(app.url(path)).send().await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", path);
    }

    let session: Value = client
        .get(app.url("/auth/session"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(session.is_null());
}

#[tokio::test]
async fn sign_in_works_with_cookie_and_bearer_token() {
    let app = spawn_app(None).await;
    app.signed_up("ana@example.com").await;

    let client = app.client();
    let response = client
        .post(app.url("/auth/sign-in"))
        .json(&json!({ "email": "ANA@example.com", "password": "secret1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let signed: Value = response.json().await.unwrap();
    let token = signed["token"].as_str().unwrap().to_string();

    let via_cookie: Value = client
        .get(app.url("/auth/session"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(via_cookie["email"], "ana@example.com");

    let via_bearer = app
        .client()
        .get(app.url("/api/tasks"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(via_bearer.status(), StatusCode::OK);

    let wrong = app
        .client()
        .post(app.url("/auth/sign-in"))
        .json(&json!({ "email": "ana@example.com", "password": "nope123" }))
        .send()
        .await
        .unwrap();
    assert_eq!(wrong.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn task_lifecycle() {
    let app = spawn_app(None).await;
    let (client, _) = app.signed_up("ana@example.com").await;

    let created: Value = client
        .post(app.url("/api/tasks"))
        .json(&json!({ "title": "Buy milk", "priority": "LOW" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let id = created["id"].as_str().unwrap().to_string();

    let tasks: Vec<Value> = client
        .get(app.url("/api/tasks"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0]["title"], "Buy milk");
    assert_eq!(tasks[0]["completed"], false);
    assert_eq!(tasks[0]["priority"], "LOW");

    let updated: Value = client
        .patch(app.url(&format!("/api/tasks/{}", id)))
        .json(&json!({ "completed": true }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(updated["completed"], true);
    assert_eq!(updated["created_at"], created["created_at"]);
    assert_ne!(updated["updated_at"], created["updated_at"]);

    let tasks: Vec<Value> = client
        .get(app.url("/api/tasks"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(tasks[0]["completed"], true);

    let removed: Value = client
        .delete(app.url(&format!("/api/tasks/{}", id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(removed["id"], id.as_str());
    assert!(removed.get("warning").is_none());

    let tasks: Vec<Value> = client
        .get(app.url("/api/tasks"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(tasks.is_empty());
}

#[tokio::test]
async fn validation_errors_are_reported_as_json() {
    let app = spawn_app(None).await;
    let (client, _) = app.signed_up("ana@example.com").await;

    let response = client
        .post(app.url("/api/tasks"))
        .json(&json!({ "title": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Please enter a todo title");

    let response = client
        .post(app.url("/api/creatures/25/comments"))
        .json(&json!({ "creature_name": "pikachu", "rating": 6, "body": "Too good" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let comments: Vec<Value> = client
        .get(app.url("/api/creatures/25/comments"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(comments.is_empty());
}

#[tokio::test]
async fn other_accounts_cannot_touch_records() {
    let app = spawn_app(None).await;
    let (ana, _) = app.signed_up("ana@example.com").await;
    let (bob, _) = app.signed_up("bob@example.com").await;

    let note: Value = ana
        .post(app.url("/api/notes"))
        .json(&json!({ "title": "Diary", "body": "Dear diary" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let path = format!("/api/notes/{}", note["id"].as_str().unwrap());

    let response = bob
        .patch(app.url(&path))
        .json(&json!({ "title": "Mine now" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let response = bob.delete(app.url(&path)).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let bobs_notes: Vec<Value> = bob
        .get(app.url("/api/notes"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(bobs_notes.is_empty());

    let anas_notes: Vec<Value> = ana
        .get(app.url("/api/notes"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(anas_notes[0]["title"], "Diary");
}

#[tokio::test]
async fn photo_upload_serve_and_delete() {
    let app = spawn_app(None).await;
    let (client, _) = app.signed_up("ana@example.com").await;

    let image: Value = client
        .post(app.url("/api/images"))
        .multipart(jpeg("a.jpg", 1024))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(image["name"], "a.jpg");
    assert_eq!(image["size"], 1024);
    let url = image["url"].as_str().unwrap().to_string();
    assert!(url.starts_with(&app.url("/storage/photos/")));

    let served = client.get(&url).send().await.unwrap();
    assert_eq!(served.status(), StatusCode::OK);
    assert_eq!(served.headers()["content-type"], "image/jpeg");
    assert_eq!(served.bytes().await.unwrap().len(), 1024);

    let renamed: Value = client
        .patch(app.url(&format!("/api/images/{}", image["id"].as_str().unwrap())))
        .json(&json!({ "name": "beach.jpg" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(renamed["name"], "beach.jpg");
    assert_eq!(renamed["url"], image["url"]);

    client
        .delete(app.url(&format!("/api/images/{}", image["id"].as_str().unwrap())))
        .send()
        .await
        .unwrap();
    let images: Vec<Value> = client
        .get(app.url("/api/images"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(images.is_empty());
    assert_eq!(
        client.get(&url).send().await.unwrap().status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn delete_reports_a_file_it_could_not_remove() {
    let app = spawn_app(None).await;
    let (client, _) = app.signed_up("ana@example.com").await;

    let image: Value = client
        .post(app.url("/api/images"))
        .multipart(jpeg("a.jpg", 64))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let url = image["url"].as_str().unwrap();
    let key = url
        .strip_prefix(&app.url("/storage/photos/"))
        .unwrap()
        .to_string();

    // A directory where the file was cannot be removed as a file.
    let path = app.state.config.storage_path().join("photos").join(&key);
    std::fs::remove_file(&path).unwrap();
    std::fs::create_dir_all(path.join("stuck")).unwrap();

    let response = client
        .delete(app.url(&format!("/api/images/{}", image["id"].as_str().unwrap())))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let removal: Value = response.json().await.unwrap();
    assert_eq!(removal["id"], image["id"]);
    assert_eq!(removal["warning"]["bucket"], "photos");
    assert_eq!(removal["warning"]["key"], key.as_str());

    let images: Vec<Value> = client
        .get(app.url("/api/images"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(images.is_empty());
}

#[tokio::test]
async fn uploads_must_be_images() {
    let app = spawn_app(None).await;
    let (client, _) = app.signed_up("ana@example.com").await;

    let text = Part::bytes(b"hello".to_vec())
        .file_name("notes.txt")
        .mime_str("text/plain")
        .unwrap();
    let response = client
        .post(app.url("/api/images"))
        .multipart(Form::new().part("file", text))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Please select an image file");
}

#[tokio::test]
async fn food_posts_collect_comments_from_anyone() {
    let app = spawn_app(None).await;
    let (ana, _) = app.signed_up("ana@example.com").await;
    let (bob, bob_account) = app.signed_up("bob@example.com").await;

    let post: Value = ana
        .post(app.url("/api/food"))
        .multipart(jpeg("ramen.png", 64).text("name", "Ramen"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(post["name"], "Ramen");
    assert!(post["url"].as_str().unwrap().contains("/storage/food-photos/"));
    let post_id = post["id"].as_str().unwrap().to_string();
    let comments_path = format!("/api/food/{}/comments", post_id);

    let comment: Value = bob
        .post(app.url(&comments_path))
        .json(&json!({ "rating": 4, "body": "Rich broth" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(comment["user_id"], bob_account["id"]);
    assert_eq!(comment["rating"], 4);

    let comment_path = format!("/api/food/comments/{}", comment["id"].as_str().unwrap());
    let response = ana
        .patch(app.url(&comment_path))
        .json(&json!({ "rating": 1 }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let edited: Value = bob
        .patch(app.url(&comment_path))
        .json(&json!({ "rating": 5 }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(edited["rating"], 5);
    assert_eq!(edited["body"], "Rich broth");

    let seen_by_ana: Vec<Value> = ana
        .get(app.url(&comments_path))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(seen_by_ana.len(), 1);
    assert_eq!(seen_by_ana[0]["rating"], 5);

    ana.delete(app.url(&format!("/api/food/{}", post_id)))
        .send()
        .await
        .unwrap();
    let after: Vec<Value> = bob
        .get(app.url(&comments_path))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(after.is_empty());
}

#[tokio::test]
async fn lists_filter_and_sort_from_query() {
    let app = spawn_app(None).await;
    let (client, _) = app.signed_up("ana@example.com").await;

    for title in ["walk dog", "Buy milk", "buy bread"] {
        client
            .post(app.url("/api/tasks"))
            .json(&json!({ "title": title }))
            .send()
            .await
            .unwrap();
    }

    let titles = |tasks: Vec<Value>| -> Vec<String> {
        tasks
            .iter()
            .map(|t| t["title"].as_str().unwrap().to_string())
            .collect()
    };

    let newest_first: Vec<Value> = client
        .get(app.url("/api/tasks"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(titles(newest_first), ["buy bread", "Buy milk", "walk dog"]);

    let filtered: Vec<Value> = client
        .get(app.url("/api/tasks?q=BUY&sort=name-asc"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(titles(filtered), ["buy bread", "Buy milk"]);
}

#[tokio::test]
async fn profile_rename_is_visible_to_others() {
    let app = spawn_app(None).await;
    let (ana, ana_account) = app.signed_up("ana@example.com").await;
    let (bob, _) = app.signed_up("bob@example.com").await;
    let ana_id = ana_account["id"].as_str().unwrap().to_string();

    let own: Value = ana
        .get(app.url("/api/profile"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(own["email"], "ana@example.com");
    assert!(own["display_name"].is_null());

    let renamed: Value = ana
        .patch(app.url("/api/profile"))
        .json(&json!({ "display_name": "Ana" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(renamed["display_name"], "Ana");

    let seen: Vec<Value> = bob
        .get(app.url(&format!("/api/profiles?ids={},missing", ana_id)))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["display_name"], "Ana");

    let session: Value = ana
        .get(app.url("/auth/session"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(session["display_name"], "Ana");
}

#[tokio::test]
async fn sign_out_ends_the_session() {
    let app = spawn_app(None).await;
    let (client, _) = app.signed_up("ana@example.com").await;

    let response = client.post(app.url("/auth/sign-out")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = client.get(app.url("/api/tasks")).send().await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_deletes_an_account_and_everything_it_owns() {
    let app = spawn_app(None).await;
    let (admin, admin_account) = app.signed_up("admin@example.com").await;
    assert_eq!(admin_account["is_admin"], true);
    let (bob, bob_account) = app.signed_up("bob@example.com").await;
    assert_eq!(bob_account["is_admin"], false);
    let bob_id = bob_account["id"].as_str().unwrap().to_string();

    let image: Value = bob
        .post(app.url("/api/images"))
        .multipart(jpeg("me.jpg", 16))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    bob.post(app.url("/api/creatures/25/comments"))
        .json(&json!({ "creature_name": "pikachu", "rating": 3, "body": "Fine" }))
        .send()
        .await
        .unwrap();

    let response = bob
        .post(app.url("/api/admin/delete-account"))
        .json(&json!({ "user_id": admin_account["id"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = admin
        .post(app.url("/api/admin/delete-account"))
        .json(&json!({ "userId": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let deleted: Value = admin
        .post(app.url("/api/admin/delete-account"))
        .json(&json!({ "user_id": bob_id }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(deleted["id"], bob_id.as_str());
    assert!(deleted["rows"].as_u64().unwrap() >= 4);

    let comments: Vec<Value> = admin
        .get(app.url("/api/creatures/25/comments"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(comments.is_empty());

    let session: Value = bob
        .get(app.url("/auth/session"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(session.is_null());
    assert_eq!(
        admin
            .get(image["url"].as_str().unwrap())
            .send()
            .await
            .unwrap()
            .status(),
        StatusCode::NOT_FOUND
    );
}
