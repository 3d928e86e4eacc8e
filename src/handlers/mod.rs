//! Request handlers and route assembly

pub mod auth;

use std::convert::Infallible;
use std::sync::Arc;
use warp::{Filter, Reply};

use crate::auth::{AuthorizationGate, SessionService};
use crate::constants::USERS_PATH;
use crate::security::with_api_security_headers;

pub use auth::{handle_rejection, with_auth};

/// Maximum accepted JSON body
const MAX_BODY_BYTES: u64 = 16 * 1024;

/// Shared services handed to every route
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AuthorizationGate>,
    pub sessions: Arc<SessionService>,
}

fn with_sessions(
    sessions: Arc<SessionService>,
) -> impl Filter<Extract = (Arc<SessionService>,), Error = Infallible> + Clone {
    warp::any().map(move || sessions.clone())
}

/// All HTTP routes with error recovery and security headers applied
pub fn create_routes(
    state: AppState,
) -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
    let login = warp::post()
        .and(warp::path(USERS_PATH))
        .and(warp::path("login"))
        .and(warp::path::end())
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(warp::addr::remote())
        .and(with_sessions(state.sessions.clone()))
        .and_then(auth::login_handler);

    // Logout is reachable with any token, even one the gate would refuse
    let logout = warp::post()
        .and(warp::path(USERS_PATH))
        .and(warp::path("logout"))
        .and(warp::path::end())
        .and(warp::header::optional::<String>("authorization"))
        .and(with_sessions(state.sessions.clone()))
        .and_then(auth::logout_handler);

    let me = warp::get()
        .and(warp::path(USERS_PATH))
        .and(warp::path("me"))
        .and(warp::path::end())
        .and(with_auth(state.gate.clone()))
        .and(with_sessions(state.sessions.clone()))
        .and_then(auth::me_handler);

    let create_user = warp::post()
        .and(warp::path(USERS_PATH))
        .and(warp::path::end())
        .and(with_auth(state.gate.clone()))
        .and(warp::body::content_length_limit(MAX_BODY_BYTES))
        .and(warp::body::json())
        .and(with_sessions(state.sessions.clone()))
        .and_then(auth::create_user_handler);

    let health = warp::get()
        .and(warp::path("health"))
        .and(warp::path::end())
        .map(|| warp::reply::json(&serde_json::json!({ "status": "ok" })));

    login
        .or(logout)
        .or(me)
        .or(create_user)
        .or(health)
        .map(|reply| with_api_security_headers(reply))
        .recover(handle_rejection)
        .with(warp::log("rusty_users::http"))
}
