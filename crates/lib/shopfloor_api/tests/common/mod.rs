//! Shared helpers for API integration tests: an in-memory app driven with
//! `tower::ServiceExt::oneshot`.

#![allow(dead_code)]

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use serde_json::{Value, json};
use shopfloor_api::config::ApiConfig;
use shopfloor_api::{AppState, router};
use shopfloor_core::auth::password::BcryptHasher;
use shopfloor_core::store::Stores;
use tower::ServiceExt;

pub const PASSWORD: &str = "correct-horse";

pub struct Response {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl Response {
    /// `name=value` of the refresh cookie set by this response, if any.
    pub fn refresh_cookie(&self) -> Option<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .find(|v| v.starts_with("shopfloor_refresh="))
            .and_then(|v| v.split(';').next())
            .map(str::to_string)
    }
}

pub struct TestApp {
    router: Router,
    pub stores: Stores,
}

pub fn test_config() -> ApiConfig {
    ApiConfig {
        bind_addr: "127.0.0.1:0".into(),
        database_url: String::new(),
        jwt_secret: "integration-test-secret".into(),
        access_ttl_secs: 900,
        refresh_ttl_secs: 3600,
        cookie_secure: false,
    }
}

impl TestApp {
    pub fn new() -> Self {
        let stores = Stores::memory();
        let state = AppState::with_hasher(
            test_config(),
            stores.clone(),
            Arc::new(BcryptHasher::with_cost(4)),
        );
        Self {
            router: router(state),
            stores,
        }
    }

    pub async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        cookie: Option<&str>,
        body: Option<Value>,
    ) -> Response {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        let req = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let resp = self.router.clone().oneshot(req).await.expect("request");
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .expect("read body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        Response {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: &str) -> Response {
        self.send(Method::GET, uri, Some(token), None, None).await
    }

    pub async fn post(&self, uri: &str, token: &str, body: Value) -> Response {
        self.send(Method::POST, uri, Some(token), None, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str, body: Value) -> Response {
        self.send(Method::PUT, uri, Some(token), None, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> Response {
        self.send(Method::DELETE, uri, Some(token), None, None).await
    }

    pub async fn login(&self, email: &str, password: &str) -> Response {
        self.send(
            Method::POST,
            "/users/login",
            None,
            None,
            Some(json!({"email": email, "password": password})),
        )
        .await
    }

    /// Log in and return the access token.
    pub async fn token(&self, email: &str) -> String {
        let resp = self.login(email, PASSWORD).await;
        assert_eq!(resp.status, StatusCode::OK, "login {email}: {}", resp.body);
        resp.body["accessToken"]
            .as_str()
            .expect("accessToken")
            .to_string()
    }
}

/// Ids and tokens for a planner, two supervisors and one technician under each.
pub struct Plant {
    pub app: TestApp,
    pub planner: String,
    pub sup_a_id: String,
    pub sup_a: String,
    pub sup_b_id: String,
    pub sup_b: String,
    pub tech_a_id: String,
    pub tech_a: String,
    pub tech_b_id: String,
    pub tech_b: String,
}

async fn create_user(app: &TestApp, planner: &str, body: Value) -> String {
    let resp = app.post("/users", planner, body).await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.body);
    resp.body["id"].as_str().expect("id").to_string()
}

pub async fn plant() -> Plant {
    let app = TestApp::new();
    let resp = app
        .send(
            Method::POST,
            "/users/bootstrap",
            None,
            None,
            Some(json!({
                "username": "Pat Planner",
                "email": "planner@plant.example",
                "password": PASSWORD
            })),
        )
        .await;
    assert_eq!(resp.status, StatusCode::CREATED, "{}", resp.body);
    let planner = app.token("planner@plant.example").await;

    let sup_a_id = create_user(
        &app,
        &planner,
        json!({
            "username": "Sam A",
            "email": "sup-a@plant.example",
            "password": PASSWORD,
            "role": "supervisor",
            "teamType": "production"
        }),
    )
    .await;
    let sup_b_id = create_user(
        &app,
        &planner,
        json!({
            "username": "Sam B",
            "email": "sup-b@plant.example",
            "password": PASSWORD,
            "role": "supervisor",
            "teamType": "quality"
        }),
    )
    .await;
    let tech_a_id = create_user(
        &app,
        &planner,
        json!({
            "username": "Tess A",
            "email": "tech-a@plant.example",
            "password": PASSWORD,
            "role": "technician",
            "teamType": "production",
            "supervisorRef": sup_a_id
        }),
    )
    .await;
    let tech_b_id = create_user(
        &app,
        &planner,
        json!({
            "username": "Tess B",
            "email": "tech-b@plant.example",
            "password": PASSWORD,
            "role": "technician",
            "teamType": "quality",
            "supervisorRef": sup_b_id
        }),
    )
    .await;

    Plant {
        sup_a: app.token("sup-a@plant.example").await,
        sup_b: app.token("sup-b@plant.example").await,
        tech_a: app.token("tech-a@plant.example").await,
        tech_b: app.token("tech-b@plant.example").await,
        app,
        planner,
        sup_a_id,
        sup_b_id,
        tech_a_id,
        tech_b_id,
    }
}
