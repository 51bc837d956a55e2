#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use navi_api::AppStateInner;
use navi_api::config::Config;
use navi_db::Database;

pub struct TestApp {
    router: Router,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    pub fn code(&self) -> &str {
        self.body["code"].as_str().unwrap_or_default()
    }

    pub fn data(&self) -> &Value {
        &self.body["data"]
    }
}

impl TestApp {
    pub fn new() -> Self {
        let config = Config {
            app_env: "test".into(),
            jwt_secret: "integration-test-secret".into(),
            ..Config::default()
        };
        let db = Database::open_in_memory().unwrap();
        Self {
            router: navi_api::app(AppStateInner::new(db, config)),
        }
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn json(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        self.send(request).await
    }

    pub async fn register(&self, username: &str, password: &str) -> TestResponse {
        self.json(
            Method::POST,
            "/auth/register",
            None,
            Some(serde_json::json!({ "username": username, "password": password })),
        )
        .await
    }

    pub async fn login_raw(&self, username: &str, password: &str) -> TestResponse {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/auth/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!(
                "grant_type=password&username={username}&password={password}"
            )))
            .unwrap();
        self.send(request).await
    }

    /// Register and log in, returning the bearer token.
    pub async fn signup(&self, username: &str, password: &str) -> String {
        let registered = self.register(username, password).await;
        assert_eq!(registered.status, StatusCode::OK, "{:?}", registered.body);

        let login = self.login_raw(username, password).await;
        assert_eq!(login.status, StatusCode::OK, "{:?}", login.body);
        login.data()["access_token"].as_str().unwrap().to_string()
    }

    pub async fn create_marker(&self, token: &str, body: Value) -> Value {
        let res = self.json(Method::POST, "/markers", Some(token), Some(body)).await;
        assert_eq!(res.status, StatusCode::OK, "{:?}", res.body);
        res.data().clone()
    }
}
