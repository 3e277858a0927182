//! Shared harness: a real server on an ephemeral port, backed by a temporary
//! database and storage root, plus a stand-in creature catalog.

#![allow(dead_code)]

use std::net::SocketAddr;

use axum::extract::Path;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;

use quintet::config::Config;
use quintet::db;
use quintet::routes;
use quintet::state::AppState;

pub struct TestApp {
    pub base: String,
    pub state: AppState,
    _dir: TempDir,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    /// A fresh client with its own cookie jar.
    pub fn client(&self) -> Client {
        Client::builder().cookie_store(true).build().unwrap()
    }

    /// Sign up `email` on a new client and return it, signed in.
    pub async fn signed_up(&self, email: &str) -> (Client, Value) {
        let client = self.client();
        let response = client
            .post(self.url("/auth/sign-up"))
            .json(&json!({ "email": email, "password": "secret1" }))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK, "sign-up failed");
        let body: Value = response.json().await.unwrap();
        (client, body["account"].clone())
    }
}

async fn bind() -> (tokio::net::TcpListener, SocketAddr) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    (listener, addr)
}

/// Start the app. `catalog` overrides the creature catalog base URL.
pub async fn spawn_app(catalog: Option<String>) -> TestApp {
    let dir = TempDir::new().unwrap();
    let (listener, addr) = bind().await;
    let base = format!("http://{}", addr);

    let mut config = Config::default();
    config.database.path = Some(dir.path().join("quintet.db"));
    config.storage.path = Some(dir.path().join("storage"));
    config.server.public_url = Some(base.clone());
    config.auth.bcrypt_cost = 4;
    config.catalog.timeout_secs = 2;
    config.catalog.base_url = catalog.unwrap_or_else(|| "http://127.0.0.1:9".to_string());

    let pool = db::create_pool(&config.db_path()).unwrap();
    db::run_migrations(&pool).unwrap();
    let state = AppState::new(pool, config).unwrap();

    let app = routes::app(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        base,
        state,
        _dir: dir,
    }
}

const CREATURES: &[(i64, &str, &str)] = &[
    (25, "pikachu", "electric"),
    (26, "raichu", "electric"),
    (172, "pichu", "electric"),
    (1, "bulbasaur", "grass"),
];

/// A catalog shaped like the public creature API, serving a fixed roster.
pub async fn spawn_catalog() -> String {
    let (listener, addr) = bind().await;
    let base = format!("http://{}", addr);

    let index_base = base.clone();
    let app = Router::new()
        .route(
            "/pokemon",
            get(move || {
                let base = index_base.clone();
                async move {
                    let results: Vec<Value> = CREATURES
                        .iter()
                        .map(|(_, name, _)| {
                            json!({ "name": name, "url": format!("{}/pokemon/{}", base, name) })
                        })
                        .collect();
                    Json(json!({ "count": results.len(), "results": results }))
                }
            }),
        )
        .route("/pokemon/{name}", get(creature));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    base
}

async fn creature(Path(name): Path<String>) -> impl IntoResponse {
    match CREATURES.iter().find(|(_, n, _)| *n == name) {
        Some((id, name, kind)) => Json(json!({
            "id": id,
            "name": name,
            "sprites": { "front_default": format!("https://img.example/{}.png", id) },
            "types": [{ "slot": 1, "type": { "name": kind, "url": "" } }],
        }))
        .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
