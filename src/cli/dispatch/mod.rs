use crate::cli::{
    actions::{server::Args, Action},
    commands::{
        ARG_COOKIE_SECURE, ARG_PORT, ARG_SESSION_TTL_SECONDS, ARG_VERIFIER_TIMEOUT_SECONDS,
        ARG_VERIFIER_URL,
    },
};
use anyhow::{Context, Result};
use url::Url;

/// # Errors
/// Returns an error if required arguments are missing or malformed.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    let verifier_url = matches
        .get_one::<String>(ARG_VERIFIER_URL)
        .context("missing required argument: --verifier-url")?;
    let verifier_url = Url::parse(verifier_url).context("invalid --verifier-url")?;

    let verifier_timeout_seconds = matches
        .get_one::<u64>(ARG_VERIFIER_TIMEOUT_SECONDS)
        .copied()
        .unwrap_or(10);

    let session_ttl_seconds = matches
        .get_one::<u64>(ARG_SESSION_TTL_SECONDS)
        .copied()
        .unwrap_or(crate::auth::DEFAULT_SESSION_TTL_SECONDS);

    Ok(Action::Server(Args {
        port,
        verifier_url,
        verifier_timeout_seconds,
        session_ttl_seconds,
        cookie_secure: matches.get_flag(ARG_COOKIE_SECURE),
    }))
}
