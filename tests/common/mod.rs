#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::{
        header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE},
        HeaderMap, Request, StatusCode,
    },
    Router,
};
use serde::Serialize;
use std::{net::SocketAddr, sync::Arc};
use tower::ServiceExt; // for `oneshot`

use ward_status::{
    config::Config,
    db,
    services::auth_service,
    session::{SessionKey, COOKIE_NAME},
    smtp::MemoryMailer,
    AppState,
};

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn assert_redirect(&self, to: &str) {
        assert_eq!(self.status, StatusCode::SEE_OTHER, "body: {}", self.text());
        assert_eq!(self.location(), Some(to));
    }
}

/// One browser against the in-process router: a cookie jar holding the session.
pub struct TestApp {
    pub state: AppState,
    pub mailer: Arc<MemoryMailer>,
    router: Router,
    cookie: Option<String>,
}

pub fn test_config() -> Config {
    Config {
        public_url: "http://ward.test".into(),
        approver_email: Some("doctor@example.org".into()),
        bcrypt_cost: 4,
        hospital_name: "RS Uji".into(),
        report_city: "Bandung".into(),
        ..Config::default()
    }
}

impl TestApp {
    pub async fn new() -> Self {
        Self::with_mailer(MemoryMailer::new()).await
    }

    pub async fn with_mailer(mailer: MemoryMailer) -> Self {
        let pool = db::connect_in_memory().await.unwrap();
        db::run_migrations(&pool).await.unwrap();
        let config = test_config();
        db::seed_hospital(&pool, &config.hospital_address, &config.hospital_phone)
            .await
            .unwrap();

        let mailer = Arc::new(mailer);
        let key = SessionKey::new(b"integration-secret".to_vec(), 3600);
        let state = AppState::new(pool, config, mailer.clone(), key).unwrap();
        let router = ward_status::router(state.clone());
        Self {
            state,
            mailer,
            router,
            cookie: None,
        }
    }

    /// Second client on the same server, starting without a session.
    pub fn other_client(&self) -> Self {
        Self {
            state: self.state.clone(),
            mailer: self.mailer.clone(),
            router: self.router.clone(),
            cookie: None,
        }
    }

    /// Raw response with the body left unread, for streaming endpoints.
    pub async fn open(&self, uri: &str) -> axum::response::Response {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();
        self.router.clone().oneshot(req).await.unwrap()
    }

    /// Serve the router on an ephemeral local port.
    pub async fn serve(&self) -> SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = self.router.clone();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        addr
    }

    pub async fn get(&mut self, uri: &str) -> TestResponse {
        let req = Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        self.send(req).await
    }

    pub async fn post_form<T: Serialize>(&mut self, uri: &str, form: &T) -> TestResponse {
        let body = serde_urlencoded::to_string(form).unwrap();
        let req = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .unwrap();
        self.send(req).await
    }

    /// GET the redirect target of `res`.
    pub async fn follow(&mut self, res: &TestResponse) -> TestResponse {
        let to = res.location().expect("redirect location").to_string();
        self.get(&to).await
    }

    async fn send(&mut self, mut req: Request<Body>) -> TestResponse {
        if let Some(cookie) = &self.cookie {
            req.headers_mut().insert(COOKIE, cookie.parse().unwrap());
        }
        let res = self.router.clone().oneshot(req).await.unwrap();

        let prefix = format!("{COOKIE_NAME}=");
        if let Some(pair) = res
            .headers()
            .get_all(SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .filter_map(|v| v.split(';').next())
            .find(|pair| pair.starts_with(&prefix))
        {
            self.cookie = Some(pair.to_string());
        }

        let status = res.status();
        let headers = res.headers().clone();
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        TestResponse {
            status,
            headers,
            body: body.to_vec(),
        }
    }

    /// Create an approved nurse directly and log this client in.
    pub async fn login_as_nurse(&mut self, username: &str) {
        let hash = auth_service::hash_password("rahasia1", 4).await.unwrap();
        sqlx::query("INSERT OR IGNORE INTO nurse (username, password_hash) VALUES (?, ?)")
            .bind(username)
            .bind(hash)
            .execute(&self.state.pool)
            .await
            .unwrap();
        let res = self
            .post_form(
                "/login",
                &[("username", username), ("password", "rahasia1")],
            )
            .await;
        res.assert_redirect("/nurse");
    }

    /// Create a patient through the dashboard form and return its id.
    pub async fn create_patient(&mut self, fields: &[(&str, &str)]) -> i64 {
        let res = self.post_form("/nurse", &fields).await;
        res.assert_redirect("/nurse");
        let id: Option<i64> = sqlx::query_scalar("SELECT MAX(id) FROM patient")
            .fetch_one(&self.state.pool)
            .await
            .unwrap();
        id.expect("patient created")
    }

    pub async fn set_condition(&mut self, id: i64, condition: &str) {
        let res = self
            .post_form(&format!("/patient/{id}"), &[("condition", condition)])
            .await;
        res.assert_redirect(&format!("/patient/{id}"));
    }
}
