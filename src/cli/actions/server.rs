use crate::{
    api,
    auth::{
        spawn_session_reaper, AuthConfig, AuthService, CookieCodec, RemoteVerifier, SessionStore,
    },
    cli::telemetry,
};
use anyhow::{Context, Result};
use std::{sync::Arc, time::Duration};
use tracing::info;
use url::Url;

const REAPER_PERIOD: Duration = Duration::from_secs(60);

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub verifier_url: Url,
    pub verifier_timeout_seconds: u64,
    pub session_ttl_seconds: u64,
    pub cookie_secure: bool,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the verifier client, cookie secret or server fail to start.
pub async fn execute(args: Args) -> Result<()> {
    info!(
        port = args.port,
        verifier_url = %args.verifier_url,
        session_ttl_seconds = args.session_ttl_seconds,
        cookie_secure = args.cookie_secure,
        "starting {} {} - {}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        crate::GIT_COMMIT_HASH
    );

    let config = AuthConfig::new().with_cookie_secure(args.cookie_secure);
    let store = SessionStore::with_ttl_seconds(args.session_ttl_seconds);

    let verifier = RemoteVerifier::new(
        args.verifier_url,
        Duration::from_secs(args.verifier_timeout_seconds),
    )
    .context("Failed to build verifier client")?;

    let codec = CookieCodec::generate().context("Failed to generate cookie secret")?;

    let service = Arc::new(AuthService::new(config, Arc::new(verifier), store, codec));

    spawn_session_reaper(Arc::clone(&service), REAPER_PERIOD);

    let result = api::new(args.port, service).await;

    telemetry::shutdown_tracer();

    result
}
