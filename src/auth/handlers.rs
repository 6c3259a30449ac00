use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    middleware,
    routing::{post, put},
    Extension, Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{error, info, instrument, warn};

use crate::{
    auth::{
        dto::{
            ForgotPasswordRequest, LoginRequest, LoginResponse, MessageResponse, PublicUser,
            RegisterRequest, RegisterResponse, ResetPasswordRequest, UpdatePasswordRequest,
            UpdateUserRequest, UserResponse,
        },
        guard::{authenticate, require_admin, AuthedUser},
        password::{hash_password, verify_password},
        repo::{self, User},
        token::TokenKeys,
    },
    error::{is_unique_violation, ApiError},
    mailer::reset_link,
    state::AppState,
};

pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password/:token", post(reset_password))
}

/// Routes behind the access gate. `/update` stacks both checkpoints; the
/// outermost layer runs first, so `authenticate` is added last.
pub fn account_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .merge(
            Router::new()
                .route("/update", put(update_user))
                .route_layer(middleware::from_fn(require_admin))
                .route_layer(middleware::from_fn_with_state(state.clone(), authenticate)),
        )
        .merge(
            Router::new()
                .route("/update-password", put(update_password))
                .route_layer(middleware::from_fn_with_state(state, authenticate)),
        )
}

fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Both login failure causes answer through this one constructor, so the two
/// response bodies are byte-identical and leak nothing about which check
/// failed.
fn invalid_credentials() -> ApiError {
    ApiError::unauthorized("Invalid email or password")
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(ApiError::validation("Invalid email"));
    }

    if payload.password.is_empty() {
        warn!(username = %payload.username, "empty password on register");
        return Err(ApiError::validation("Password is required"));
    }

    // Pre-check for a friendlier message; the unique index is the real guard.
    match repo::find_by_username(&state.db, &payload.username).await {
        Ok(Some(_)) => {
            warn!(username = %payload.username, "username already taken");
            return Err(ApiError::conflict("Username already taken"));
        }
        Ok(None) => {}
        Err(e) => {
            error!(error = %e, "find_by_username failed");
            return Err(ApiError::internal("Error registering user"));
        }
    }

    let hash = match hash_password(&payload.password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "hash_password failed");
            return Err(ApiError::internal("Error registering user"));
        }
    };

    let user = match repo::create(
        &state.db,
        &payload.username,
        &payload.name,
        &payload.email,
        &hash,
        payload.role,
    )
    .await
    {
        Ok(u) => u,
        Err(e) if is_unique_violation(&e) => {
            // Lost a race with a concurrent registration, or the email is
            // already registered.
            warn!(username = %payload.username, "duplicate user on insert");
            let message = match e.as_database_error().and_then(|db| db.constraint()) {
                Some("users_email_key") => "Email already registered",
                _ => "Username already taken",
            };
            return Err(ApiError::conflict(message));
        }
        Err(e) => {
            error!(error = %e, "create user failed");
            return Err(ApiError::internal("Error registering user"));
        }
    };

    info!(user_id = %user.id, username = %user.username, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully",
            user: PublicUser::from(user),
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    // No email-format check here: a malformed email gets the same generic
    // rejection as a wrong password.
    let user = match repo::find_by_email(&state.db, &payload.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(email = %payload.email, "login unknown email");
            return Err(invalid_credentials());
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err(ApiError::internal(
                "Something went wrong. Please try again later.",
            ));
        }
    };

    let ok = match verify_password(&payload.password, &user.password_hash) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, "verify_password failed");
            return Err(ApiError::internal(
                "Something went wrong. Please try again later.",
            ));
        }
    };

    if !ok {
        warn!(email = %payload.email, user_id = %user.id, "login invalid password");
        return Err(invalid_credentials());
    }

    let keys = TokenKeys::from_ref(&state);
    let token = match keys.sign_session(&user) {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "session token signing failed");
            return Err(ApiError::internal(
                "Something went wrong. Please try again later.",
            ));
        }
    };

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok(Json(LoginResponse {
        message: "Login successful",
        token,
        id: user.id,
    }))
}

#[instrument(skip(state, user, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    Extension(AuthedUser(user)): Extension<AuthedUser>,
    Json(mut payload): Json<UpdateUserRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    if let Some(email) = payload.email.take() {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email on update");
            return Err(ApiError::validation("Invalid email"));
        }
        payload.email = Some(email);
    }

    let hash = match payload.password.as_deref() {
        Some(plain) => match hash_password(plain) {
            Ok(h) => Some(h),
            Err(e) => {
                error!(error = %e, "hash_password failed");
                return Err(ApiError::internal("Error updating user"));
            }
        },
        None => None,
    };

    let updated = match repo::update_profile(
        &state.db,
        user.id,
        payload.name.as_deref(),
        payload.email.as_deref(),
        hash.as_deref(),
    )
    .await
    {
        Ok(row) => row,
        Err(e) if is_unique_violation(&e) => {
            warn!(user_id = %user.id, "profile update hit a unique constraint");
            return Err(ApiError::conflict("Email already in use"));
        }
        Err(e) => {
            error!(error = %e, user_id = %user.id, "update_profile failed");
            return Err(ApiError::internal("Error updating user"));
        }
    };

    let Some(updated) = updated else {
        // The gate resolved this identity moments ago; the row vanishing in
        // between means the account was deleted.
        warn!(user_id = %user.id, "update target no longer exists");
        return Err(ApiError::not_found("User not found"));
    };

    info!(user_id = %updated.id, "user updated");
    Ok(Json(UserResponse {
        message: "User updated successfully",
        user: PublicUser::from(updated),
    }))
}

#[instrument(skip(state, user, payload))]
pub async fn update_password(
    State(state): State<AppState>,
    Extension(AuthedUser(user)): Extension<AuthedUser>,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let ok = match verify_password(&payload.current_password, &user.password_hash) {
        Ok(v) => v,
        Err(e) => {
            error!(error = %e, user_id = %user.id, "verify_password failed");
            return Err(ApiError::internal("Error updating password"));
        }
    };

    if !ok {
        warn!(user_id = %user.id, "current password mismatch");
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    let hash = match hash_password(&payload.new_password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "hash_password failed");
            return Err(ApiError::internal("Error updating password"));
        }
    };

    match repo::set_password(&state.db, user.id, &hash).await {
        Ok(true) => {}
        Ok(false) => {
            warn!(user_id = %user.id, "password update target no longer exists");
            return Err(ApiError::not_found("User not found"));
        }
        Err(e) => {
            error!(error = %e, user_id = %user.id, "set_password failed");
            return Err(ApiError::internal("Error updating password"));
        }
    }

    info!(user_id = %user.id, "password updated");
    Ok(Json(MessageResponse {
        message: "Password updated successfully",
    }))
}

/// Issues a reset token and hands the link to the mailer. The token is signed
/// before the send attempt, so a transport failure leaves no state to clean
/// up; the link stays usable until it expires (at-most-once delivery).
pub(crate) async fn dispatch_reset_link(state: &AppState, user: &User) -> anyhow::Result<()> {
    let keys = TokenKeys::from_ref(state);
    let token = keys.sign_reset(user.id)?;
    let link = reset_link(&state.config.reset_base_url, &token);
    state.mailer.send_reset_link(&user.email, &link).await
}

#[instrument(skip(state, payload))]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(mut payload): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let user = match repo::find_by_email(&state.db, &payload.email).await {
        Ok(Some(u)) => u,
        Ok(None) => {
            warn!(email = %payload.email, "forgot-password for unknown email");
            return Err(ApiError::not_found("User with this email does not exist"));
        }
        Err(e) => {
            error!(error = %e, "find_by_email failed");
            return Err(ApiError::internal("Error sending reset email"));
        }
    };

    if let Err(e) = dispatch_reset_link(&state, &user).await {
        error!(error = %e, user_id = %user.id, "reset link dispatch failed");
        return Err(ApiError::internal("Error sending reset email"));
    }

    info!(user_id = %user.id, "reset link dispatched");
    Ok(Json(MessageResponse {
        message: "Password reset link sent to your email",
    }))
}

#[instrument(skip(state, token, payload))]
pub async fn reset_password(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let new_password = match payload.new_password.as_deref() {
        Some(p) if !p.is_empty() => p,
        _ => return Err(ApiError::validation("New password is required")),
    };

    let keys = TokenKeys::from_ref(&state);
    let claims = match keys.verify_reset(&token) {
        Ok(c) => c,
        Err(e) => {
            // Expired and invalid collapse to one caller-visible answer.
            warn!(error = %e, "reset token rejected");
            return Err(ApiError::not_found("Invalid or expired token"));
        }
    };

    let hash = match hash_password(new_password) {
        Ok(h) => h,
        Err(e) => {
            error!(error = %e, "hash_password failed");
            return Err(ApiError::internal("Error resetting password"));
        }
    };

    match repo::set_password(&state.db, claims.sub, &hash).await {
        Ok(true) => {}
        Ok(false) => {
            warn!(user_id = %claims.sub, "reset token names a deleted user");
            return Err(ApiError::not_found("Invalid or expired token"));
        }
        Err(e) => {
            error!(error = %e, user_id = %claims.sub, "set_password failed");
            return Err(ApiError::internal("Error resetting password"));
        }
    }

    info!(user_id = %claims.sub, "password reset");
    Ok(Json(MessageResponse {
        message: "Password has been reset successfully",
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::Role;
    use crate::auth::token::ResetClaims;
    use crate::mailer::Mailer;
    use axum::{async_trait, body::Body, http::Request, response::IntoResponse};
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;
    use uuid::Uuid;

    fn public_app(state: AppState) -> axum::Router {
        public_routes().with_state(state)
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn error_message(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        body["error"].as_str().unwrap().to_string()
    }

    #[test]
    fn email_regex_accepts_plain_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.example.org"));
    }

    #[test]
    fn email_regex_rejects_malformed_addresses() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("a b@x.com"));
        assert!(!is_valid_email("a@x"));
        assert!(!is_valid_email("@x.com"));
    }

    #[tokio::test]
    async fn login_failure_body_is_identical_for_both_causes() {
        // Unknown email and wrong password go through the same constructor,
        // so a caller cannot tell which check failed.
        let unknown_email = invalid_credentials().into_response();
        let wrong_password = invalid_credentials().into_response();
        assert_eq!(unknown_email.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);

        let a = axum::body::to_bytes(unknown_email.into_body(), usize::MAX)
            .await
            .unwrap();
        let b = axum::body::to_bytes(wrong_password.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(a, b);
    }

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_reset_link(&self, to: &str, link: &str) -> anyhow::Result<()> {
            self.sent.lock().unwrap().push((to.into(), link.into()));
            Ok(())
        }
    }

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send_reset_link(&self, _to: &str, _link: &str) -> anyhow::Result<()> {
            anyhow::bail!("relay down")
        }
    }

    #[tokio::test]
    async fn reset_dispatch_sends_exactly_one_email_with_the_users_token() {
        let recorder = Arc::new(RecordingMailer::default());
        let state = AppState::fake_with_mailer(recorder.clone());
        let user = User::fake(Role::User);

        dispatch_reset_link(&state, &user).await.unwrap();

        let sent = recorder.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let (to, link) = &sent[0];
        assert_eq!(to, &user.email);

        let token = link.rsplit('/').next().unwrap();
        let claims = TokenKeys::from_ref(&state).verify_reset(token).unwrap();
        assert_eq!(claims.sub, user.id);
    }

    #[tokio::test]
    async fn reset_dispatch_surfaces_transport_failure() {
        let state = AppState::fake_with_mailer(Arc::new(FailingMailer));
        let err = dispatch_reset_link(&state, &User::fake(Role::User))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("relay down"));
    }

    #[tokio::test]
    async fn register_rejects_a_malformed_email() {
        let response = public_app(AppState::fake())
            .oneshot(post_json(
                "/register",
                r#"{"username":"alice","name":"Alice","password":"Secret1","email":"not-an-email"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_message(response).await, "Invalid email");
    }

    #[tokio::test]
    async fn register_rejects_an_empty_password() {
        let response = public_app(AppState::fake())
            .oneshot(post_json(
                "/register",
                r#"{"username":"alice","name":"Alice","password":"","email":"a@x.com"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_message(response).await, "Password is required");
    }

    #[tokio::test]
    async fn reset_password_requires_a_new_password() {
        let response = public_app(AppState::fake())
            .oneshot(post_json("/reset-password/whatever", "{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_message(response).await, "New password is required");
    }

    #[tokio::test]
    async fn reset_password_rejects_a_garbage_token() {
        let response = public_app(AppState::fake())
            .oneshot(post_json(
                "/reset-password/not-a-token",
                r#"{"newPassword":"Secret2"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(error_message(response).await, "Invalid or expired token");
    }

    #[tokio::test]
    async fn reset_password_rejects_an_expired_token() {
        let state = AppState::fake();
        let keys = TokenKeys::from_ref(&state);
        let now = time::OffsetDateTime::now_utc().unix_timestamp() as usize;
        let claims = ResetClaims {
            sub: Uuid::new_v4(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token =
            jsonwebtoken::encode(&jsonwebtoken::Header::default(), &claims, &keys.encoding)
                .unwrap();

        let response = public_app(state)
            .oneshot(post_json(
                &format!("/reset-password/{token}"),
                r#"{"newPassword":"Secret2"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(error_message(response).await, "Invalid or expired token");
    }
}
