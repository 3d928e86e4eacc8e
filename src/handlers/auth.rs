//! HTTP handlers for login, logout and user endpoints

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::auth::gate::{AuthDecision, AuthorizationGate};
use crate::auth::token::extract_bearer_token;
use crate::auth::user::{Identity, NewUser, User};
use crate::auth::SessionService;
use crate::error::RustyUsersError;
use crate::security::with_api_security_headers;
use crate::security_logger::{log_security_event, SecurityEvent};

/// Login request body
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Response to a successful login
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub status: u16,
    pub message: String,
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub error: bool,
}

/// Standard response envelope
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub status: u16,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    pub error: bool,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(message: &str, data: Option<T>) -> Self {
        Self {
            status: StatusCode::OK.as_u16(),
            message: message.to_string(),
            data,
            error: false,
        }
    }
}

fn error_reply(status: StatusCode, message: String) -> warp::reply::WithStatus<warp::reply::Json> {
    let body = ApiResponse::<()> {
        status: status.as_u16(),
        message,
        data: None,
        error: true,
    };
    warp::reply::with_status(warp::reply::json(&body), status)
}

fn reject(err: RustyUsersError) -> Rejection {
    warp::reject::custom(err)
}

/// Filter that runs the authorization gate and yields the caller's identity
pub fn with_auth(
    gate: Arc<AuthorizationGate>,
) -> impl Filter<Extract = (Identity,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(warp::addr::remote())
        .and_then(move |header: Option<String>, remote: Option<SocketAddr>| {
            let gate = gate.clone();
            async move {
                match gate.authorize(header.as_deref()).await {
                    AuthDecision::Authorized(identity) => Ok(identity),
                    AuthDecision::Denied(reason) => {
                        log_security_event(SecurityEvent::UnauthorizedAccess {
                            remote,
                            reason: reason.to_string(),
                        })
                        .await;
                        Err(reject(reason.into()))
                    }
                }
            }
        })
}

pub async fn login_handler(
    request: LoginRequest,
    remote: Option<SocketAddr>,
    sessions: Arc<SessionService>,
) -> Result<impl Reply, Rejection> {
    let issued = sessions
        .login(&request.email, &request.password, remote)
        .await
        .map_err(reject)?;

    Ok(warp::reply::json(&LoginResponse {
        status: StatusCode::OK.as_u16(),
        message: "Login successful".to_string(),
        token: issued.token,
        expires_at: issued.expires_at,
        error: false,
    }))
}

pub async fn logout_handler(
    auth_header: Option<String>,
    sessions: Arc<SessionService>,
) -> Result<impl Reply, Rejection> {
    let header = auth_header
        .ok_or_else(|| reject(RustyUsersError::ValidationError("No token provided".to_string())))?;
    let token = extract_bearer_token(&header).ok_or_else(|| reject(RustyUsersError::MalformedHeader))?;

    sessions.logout(&token).await.map_err(reject)?;

    Ok(warp::reply::json(&ApiResponse::<()>::ok(
        "Successfully logged out",
        None,
    )))
}

pub async fn me_handler(
    identity: Identity,
    sessions: Arc<SessionService>,
) -> Result<impl Reply, Rejection> {
    let user = sessions.profile(&identity).await.map_err(reject)?;
    Ok(warp::reply::json(&ApiResponse::ok("Success to get user", Some(user))))
}

pub async fn create_user_handler(
    identity: Identity,
    new_user: NewUser,
    sessions: Arc<SessionService>,
) -> Result<impl Reply, Rejection> {
    let user: User = sessions.register(new_user).await.map_err(reject)?;
    log::info!("User {} created by {}", user.id, identity.subject);

    Ok(warp::reply::with_status(
        warp::reply::json(&ApiResponse::ok("User created successfully", Some(user))),
        StatusCode::CREATED,
    ))
}

/// Turn rejections into JSON envelopes
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, message) = if let Some(e) = err.find::<RustyUsersError>() {
        if e.status_code().is_server_error() {
            log::error!("Request failed: {}", e);
        }
        (e.status_code(), e.public_message())
    } else if err.is_not_found() {
        (StatusCode::NOT_FOUND, "Not found".to_string())
    } else if err.find::<warp::filters::body::BodyDeserializeError>().is_some() {
        (StatusCode::BAD_REQUEST, "Invalid request data".to_string())
    } else if err.find::<warp::reject::InvalidHeader>().is_some() {
        (
            StatusCode::BAD_REQUEST,
            RustyUsersError::MalformedHeader.public_message(),
        )
    } else if err.find::<warp::reject::LengthRequired>().is_some() {
        (StatusCode::LENGTH_REQUIRED, "Content-Length required".to_string())
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (StatusCode::PAYLOAD_TOO_LARGE, "Payload too large".to_string())
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
    } else {
        log::error!("Unhandled rejection: {:?}", err);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "Internal server error".to_string(),
        )
    };

    Ok(with_api_security_headers(error_reply(status, message)))
}
