#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use shopease_api::{
    app::build_app,
    config::JwtConfig,
    models::{Role, User},
    services::auth_service::{hash_password, issue_token},
    state::AppState,
};

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

impl TestApp {
    pub fn new() -> Self {
        let state = AppState::in_memory(JwtConfig::new("integration-secret", 1));
        let router = build_app(state.clone());
        Self { state, router }
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    /// Stores a user with the given role and returns a token for it.
    pub async fn user_token(&self, email: &str, role: Role) -> String {
        let hash = hash_password("password1").unwrap();
        let user = self
            .state
            .users
            .create(User::new(None, email, "Test", "User", hash, role))
            .await
            .unwrap();
        issue_token(&self.state.jwt, &user).unwrap().0
    }

    pub async fn admin_token(&self) -> String {
        self.user_token("admin@shop.test", Role::Admin).await
    }

    pub async fn create_category(&self, admin: &str, name: &str) -> String {
        let (status, body) = self
            .request(
                "POST",
                "/api/admin/categories",
                Some(admin),
                Some(json!({ "name": name, "image": format!("{name}.png") })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"]["id"].as_str().unwrap().to_string()
    }

    pub async fn create_product(&self, admin: &str, category_id: &str, name: &str, price: f64) -> Value {
        let (status, body) = self
            .request(
                "POST",
                "/api/admin/products",
                Some(admin),
                Some(product_body(category_id, name, price)),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["data"].clone()
    }
}

pub fn product_body(category_id: &str, name: &str, price: f64) -> Value {
    json!({
        "name": name,
        "description": format!("{name} for everyday use"),
        "price": price,
        "image": "product.png",
        "categoryId": category_id,
        "rating": 4.2,
        "reviews": 8,
        "discount": 5,
        "stock": 10,
        "colors": ["black", "white"],
        "sizes": ["M"]
    })
}
