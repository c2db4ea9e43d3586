//! End-to-end login, session and logout over the HTTP router.
//!
//! The router is driven in-process with `tower::ServiceExt::oneshot`. The
//! remote verifier tests bind a small axum backend on a loopback port.

use anyhow::{Context, Result};
use axum::{
    body::{to_bytes, Body},
    http::{
        header::{COOKIE, SET_COOKIE},
        Request, StatusCode,
    },
    response::Response,
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::{sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceExt;
use url::Url;
use wsauth::{
    api,
    auth::{
        AuthConfig, AuthService, CookieCodec, CredentialVerifier, RemoteVerifier, SessionStore,
        StaticVerifier, DEFAULT_SESSION_TTL_SECONDS,
    },
};

fn app_with(verifier: Arc<dyn CredentialVerifier>) -> Result<Router> {
    let service = AuthService::new(
        AuthConfig::new(),
        verifier,
        SessionStore::with_ttl_seconds(DEFAULT_SESSION_TTL_SECONDS),
        CookieCodec::generate()?,
    );
    Ok(api::router(Arc::new(service)))
}

fn app() -> Result<Router> {
    app_with(Arc::new(StaticVerifier::new("me", "this is the password")))
}

fn login_request(body: &'static str) -> Result<Request<Body>> {
    Ok(Request::builder()
        .method("POST")
        .uri("/login")
        .header("content-type", "text/plain")
        .body(Body::from(body))?)
}

fn session_request(cookie: Option<&str>) -> Result<Request<Body>> {
    let mut builder = Request::builder().method("GET").uri("/session");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    Ok(builder.body(Body::empty())?)
}

/// The `name=value` pair of the response's `Set-Cookie`.
fn cookie_pair(response: &Response) -> Result<String> {
    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .context("missing Set-Cookie")?
        .to_str()?;
    let pair = set_cookie.split(';').next().context("empty Set-Cookie")?;
    Ok(pair.to_string())
}

async fn json_body(response: Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn login_then_session_then_logout() -> Result<()> {
    let app = app()?;

    let response = app
        .clone()
        .oneshot(login_request("me\nthis is the password")?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    let set_cookie = response
        .headers()
        .get(SET_COOKIE)
        .context("missing Set-Cookie")?
        .to_str()?
        .to_string();
    assert!(set_cookie.starts_with("CockpitAuth="));
    assert!(set_cookie.contains("HttpOnly"));
    assert!(set_cookie.contains("Path=/"));
    let cookie = cookie_pair(&response)?;
    assert_eq!(json_body(response).await?, json!({ "user": "me" }));

    let response = app
        .clone()
        .oneshot(session_request(Some(&cookie))?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await?, json!({ "user": "me" }));

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/logout")
                .header(COOKIE, &cookie)
                .body(Body::empty())?,
        )
        .await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert!(cookie_pair(&response)?.starts_with("CockpitAuth="));

    let response = app.oneshot(session_request(Some(&cookie))?).await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn login_errors_map_to_status_codes() -> Result<()> {
    let app = app()?;

    let response = app.clone().oneshot(login_request("me=bad")?).await?;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(SET_COOKIE).is_none());
    assert_eq!(
        json_body(response).await?,
        json!({ "error": "invalid-data" })
    );

    let response = app.clone().oneshot(login_request("me\nbad")?).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(SET_COOKIE).is_none());

    let response = app.oneshot(login_request("aaaaaa\n")?).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(response.headers().get(SET_COOKIE).is_none());
    Ok(())
}

#[tokio::test]
async fn bad_cookies_look_anonymous() -> Result<()> {
    let app = app()?;
    for cookie in [
        None,
        Some("CockpitAuth=v=1;k=blah"),
        Some("CockpitAuth=v=2;k=blah"),
        Some("CockpitAuth=not-base64!"),
        Some("other=value"),
    ] {
        let response = app.clone().oneshot(session_request(cookie)?).await?;
        assert_eq!(response.status(), StatusCode::NO_CONTENT, "{cookie:?}");
    }
    Ok(())
}

#[tokio::test]
async fn cookie_from_another_instance_is_rejected() -> Result<()> {
    let first = app()?;
    let second = app()?;

    let response = first
        .oneshot(login_request("me\nthis is the password")?)
        .await?;
    let cookie = cookie_pair(&response)?;

    let response = second.oneshot(session_request(Some(&cookie))?).await?;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    Ok(())
}

#[tokio::test]
async fn health_reports_live_sessions() -> Result<()> {
    let app = app()?;
    app.clone()
        .oneshot(login_request("me\nthis is the password")?)
        .await?;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty())?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().contains_key("x-app"));
    assert!(response.headers().contains_key("x-request-id"));
    let body = json_body(response).await?;
    assert_eq!(body["name"], env!("CARGO_PKG_NAME"));
    assert_eq!(body["sessions"], 1);
    Ok(())
}

async fn verify_backend(Json(body): Json<Value>) -> StatusCode {
    match (body["user"].as_str(), body["password"].as_str()) {
        (Some("broken"), _) => StatusCode::INTERNAL_SERVER_ERROR,
        (Some("me"), Some("secret")) => StatusCode::NO_CONTENT,
        _ => StatusCode::UNAUTHORIZED,
    }
}

/// Serve the fake verification backend and return its URL.
async fn spawn_backend() -> Result<Url> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let backend = Router::new().route("/verify", post(verify_backend));
    tokio::spawn(async move {
        let _ = axum::serve(listener, backend).await;
    });
    Ok(Url::parse(&format!("http://{addr}/verify"))?)
}

#[tokio::test]
async fn remote_verifier_end_to_end() -> Result<()> {
    let url = spawn_backend().await?;
    let verifier = RemoteVerifier::new(url, Duration::from_secs(5))?;
    let app = app_with(Arc::new(verifier))?;

    let response = app.clone().oneshot(login_request("me\nsecret")?).await?;
    assert_eq!(response.status(), StatusCode::OK);
    let cookie = cookie_pair(&response)?;

    let response = app
        .clone()
        .oneshot(session_request(Some(&cookie))?)
        .await?;
    assert_eq!(response.status(), StatusCode::OK);

    let response = app.clone().oneshot(login_request("me\nwrong")?).await?;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app.oneshot(login_request("broken\nsecret")?).await?;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert!(response.headers().get(SET_COOKIE).is_none());
    Ok(())
}
