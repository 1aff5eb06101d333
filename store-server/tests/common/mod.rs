//! Shared harness for the API integration tests
//!
//! Each test gets its own in-memory database and a fully layered router,
//! driven with `oneshot`.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use http::{Method, Request, StatusCode, header};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use shared::models::CustomerCreate;
use std::sync::Arc;
use std::time::Duration;
use store_server::notify::{EmailMessage, NotificationSink, SmsMessage};
use store_server::util::hash_password;
use store_server::{AppState, Config, build_app, db};
use tokio::sync::Mutex;
use tower::ServiceExt;

/// Keeps every notification the server sends
#[derive(Default)]
pub struct RecordingSink {
    pub emails: Mutex<Vec<EmailMessage>>,
    pub sms: Mutex<Vec<SmsMessage>>,
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn send_email(&self, email: &EmailMessage) -> anyhow::Result<()> {
        self.emails.lock().await.push(email.clone());
        Ok(())
    }

    async fn send_sms(&self, sms: &SmsMessage) -> anyhow::Result<()> {
        self.sms.lock().await.push(sms.clone());
        Ok(())
    }
}

pub struct TestApp {
    pub state: AppState,
    pub sink: Arc<RecordingSink>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: http::HeaderMap,
    pub body: Value,
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_config(Config::in_memory()).await
    }

    pub async fn with_config(config: Config) -> Self {
        let pool = db::connect(&config.database_url).await.unwrap();
        db::migrate(&pool).await.unwrap();
        let sink = Arc::new(RecordingSink::default());
        let state = AppState::from_pool(pool, config, sink.clone());
        Self { state, sink }
    }

    fn app(&self) -> Router {
        build_app(self.state.clone())
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        self.request_with_headers(method, uri, token, body, &[]).await
    }

    pub async fn request_with_headers(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
        headers: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
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

        let response = self.app().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or_else(|_| {
                Value::String(String::from_utf8_lossy(&bytes).into_owned())
            })
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::GET, uri, token, None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::PATCH, uri, token, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: Option<&str>) -> TestResponse {
        self.request(Method::DELETE, uri, token, None).await
    }

    /// Account created straight in the database; returns an access token.
    /// Bypasses the registration rate limit.
    pub async fn user(&self, email: &str, is_staff: bool) -> String {
        let hash = hash_password("password123").unwrap();
        let id = db::users::insert(&self.state.pool, email, &hash, is_staff)
            .await
            .unwrap();
        let user = db::users::find_by_id(&self.state.pool, id)
            .await
            .unwrap()
            .unwrap();
        self.state.jwt.issue_pair(&user).unwrap().access_token
    }

    pub async fn staff(&self) -> String {
        self.user("staff@anthonystore.local", true).await
    }

    /// Customer account with a linked profile; returns (token, customer id)
    pub async fn customer(&self, email: &str) -> (String, i64) {
        let token = self.user(email, false).await;
        let user = db::users::find_credentials(&self.state.pool, email)
            .await
            .unwrap()
            .unwrap();
        let id = db::customers::insert(
            &self.state.pool,
            Some(user.id),
            &CustomerCreate {
                first_name: "Test".into(),
                last_name: "Customer".into(),
                email: email.into(),
                phone: Some("+254700000002".into()),
                address: None,
                city: Some("Nairobi".into()),
                country: Some("Kenya".into()),
            },
        )
        .await
        .unwrap();
        (token, id)
    }

    pub async fn create_category(&self, token: &str, name: &str, parent: Option<&str>) -> Value {
        let res = self
            .post(
                "/api/categories",
                Some(token),
                json!({ "name": name, "parent": parent }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.body
    }

    pub async fn create_product(
        &self,
        token: &str,
        sku: &str,
        price: &str,
        category: &str,
        stock: i64,
    ) -> Value {
        let res = self
            .post(
                "/api/products",
                Some(token),
                json!({
                    "name": format!("Product {sku}"),
                    "sku": sku,
                    "price": price,
                    "category": category,
                    "stock": stock,
                }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.body
    }

    /// Wait for the notification worker to drain
    pub async fn emails(&self, expected: usize) -> Vec<EmailMessage> {
        for _ in 0..50 {
            {
                let emails = self.sink.emails.lock().await;
                if emails.len() >= expected {
                    return emails.clone();
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        self.sink.emails.lock().await.clone()
    }
}
