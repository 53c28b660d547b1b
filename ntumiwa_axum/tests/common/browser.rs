use axum::Router;
use axum::body::{Body, Bytes};
use http::header::{CONTENT_TYPE, COOKIE, SET_COOKIE};
use http::{HeaderMap, Method, Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(SET_COOKIE)
            .iter()
            .map(|value| value.to_str().unwrap().to_string())
            .collect()
    }

    pub fn text(&self) -> String {
        String::from_utf8(self.body.to_vec()).unwrap()
    }

    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

/// Simulates a browser: keeps the session cookie and the last advertised CSRF token.
pub struct MockBrowser {
    router: Router,
    /// The `name=value` pair of the session cookie
    pub cookie: Option<String>,
    pub csrf_token: Option<String>,
}

impl MockBrowser {
    pub fn new(router: Router) -> Self {
        Self {
            router,
            cookie: None,
            csrf_token: None,
        }
    }

    pub async fn get(&mut self, path: &str) -> TestResponse {
        self.send(Method::GET, path, None, Body::empty(), None)
            .await
    }

    /// POSTs a urlencoded form; the current CSRF token is added as `csrf_token`.
    pub async fn post_form(&mut self, path: &str, fields: &[(&str, &str)]) -> TestResponse {
        let mut form = url::form_urlencoded::Serializer::new(String::new());
        for (key, value) in fields {
            form.append_pair(key, value);
        }
        if let Some(token) = &self.csrf_token {
            form.append_pair("csrf_token", token);
        }
        self.send(
            Method::POST,
            path,
            Some("application/x-www-form-urlencoded"),
            Body::from(form.finish()),
            None,
        )
        .await
    }

    /// POSTs an already encoded form body, with the CSRF token in the `X-CSRF-Token` header.
    pub async fn post_raw_form(&mut self, path: &str, body: String) -> TestResponse {
        let token = self.csrf_token.clone();
        self.send(
            Method::POST,
            path,
            Some("application/x-www-form-urlencoded"),
            Body::from(body),
            token.as_deref(),
        )
        .await
    }

    /// Sends JSON with the current CSRF token in the `X-CSRF-Token` header.
    pub async fn send_json(
        &mut self,
        method: Method,
        path: &str,
        body: Option<Value>,
    ) -> TestResponse {
        let token = self.csrf_token.clone();
        self.send_json_with_token(method, path, body, token.as_deref())
            .await
    }

    pub async fn send_json_with_token(
        &mut self,
        method: Method,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let body = match body {
            Some(value) => Body::from(value.to_string()),
            None => Body::empty(),
        };
        self.send(method, path, Some("application/json"), body, token)
            .await
    }

    async fn send(
        &mut self,
        method: Method,
        path: &str,
        content_type: Option<&str>,
        body: Body,
        csrf_header: Option<&str>,
    ) -> TestResponse {
        let mut request = Request::builder().method(method).uri(path);
        if let Some(cookie) = &self.cookie {
            request = request.header(COOKIE, cookie);
        }
        if let Some(content_type) = content_type {
            request = request.header(CONTENT_TYPE, content_type);
        }
        if let Some(token) = csrf_header {
            request = request.header("X-CSRF-Token", token);
        }

        let response = self
            .router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        if let Some(set_cookie) = headers.get(SET_COOKIE) {
            let pair = set_cookie.to_str().unwrap().split(';').next().unwrap();
            self.cookie = Some(pair.to_string());
        }
        if let Some(token) = headers.get("x-csrf-token") {
            self.csrf_token = Some(token.to_str().unwrap().to_string());
        }

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Logs in as the fixture administrator.
    pub async fn login(&mut self, username: &str, password: &str) -> TestResponse {
        if self.csrf_token.is_none() {
            self.get("/auth/login").await;
        }
        self.post_form("/auth/login", &[("username", username), ("password", password)])
            .await
    }
}
