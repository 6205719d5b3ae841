#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use graidea_api::{
    config::Config,
    create_router,
    middlewares::auth::{JwtClaims, JwtService},
    models::{course::Course, teacher::Teacher, user::User, user::UserRole},
    services::{memory_store::MemoryStore, AppState, CourseStore},
};
use mongodb::bson::oid::ObjectId;
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub const TEST_JWT_SECRET: &str = "graidea-test-secret";

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    jwt: JwtService,
}

pub fn create_test_app() -> TestApp {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();

    let store = Arc::new(MemoryStore::new());
    let app_state = Arc::new(AppState::new(
        Config::for_memory(TEST_JWT_SECRET),
        store.clone() as Arc<dyn CourseStore>,
    ));

    TestApp {
        router: create_router(app_state),
        store,
        jwt: JwtService::new(TEST_JWT_SECRET),
    }
}

impl TestApp {
    /// Token in the shape the identity service issues.
    pub fn token_for(&self, user: &User) -> String {
        let now = Utc::now().timestamp();
        let claims = JwtClaims {
            user_id: user.id.to_hex(),
            email: user.email.clone(),
            roles: user.roles.clone(),
            exp: (now + 3600) as usize,
            iat: now as usize,
        };
        self.jwt.generate_token(&claims).unwrap()
    }

    pub async fn seed_user(&self, name: &str, roles: &[UserRole]) -> User {
        let now = Utc::now();
        let user = User {
            id: ObjectId::new(),
            name: name.to_string(),
            email: format!("{}@graidea.test", name.to_lowercase().replace(' ', ".")),
            phone: None,
            profile_image_url: None,
            roles: roles.to_vec(),
            created_at: now,
            updated_at: now,
        };
        self.store.insert_user(user.clone()).await;
        user
    }

    /// User with a token for the given role.
    pub async fn login_as(&self, role: UserRole) -> (User, String) {
        let user = self.seed_user(&format!("{} user", role.as_str()), &[role]).await;
        let token = self.token_for(&user);
        (user, token)
    }

    pub async fn seed_teacher(&self, user: &User) -> Teacher {
        let now = Utc::now();
        let teacher = Teacher {
            id: ObjectId::new(),
            user_id: user.id,
            year_of_experience: 7,
            degree_name: "MSc Computer Science".to_string(),
            photo_url: None,
            skills: vec!["rust".to_string(), "databases".to_string()],
            salary: 50_000.0,
            courses_enrolled: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.store.insert_teacher(teacher.clone()).await;
        teacher
    }

    pub async fn seed_course(&self, title: &str, price: f64) -> Course {
        let now = Utc::now();
        let course = Course {
            id: ObjectId::new(),
            title: title.to_string(),
            description: format!("{} description", title),
            image_link: None,
            price,
            assigned_teachers: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        self.store.insert_course(&course).await.unwrap();
        course
    }

    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }
}
