use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::{
    auth::{
        jwt::{AuthUser, JwtKeys},
        password,
    },
    error::ApiError,
    state::AppState,
    users::{
        dto::{
            AuthResponse, LoginRequest, MessageResponse, RegisterRequest, UpdateAccountRequest,
        },
        repo::{EmailExists, NewUser, User, UserPatch},
    },
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/login", post(login))
        .route(
            "/users/profile",
            get(get_account).patch(update_account).delete(delete_account),
        )
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    if payload.name.trim().is_empty() {
        return Err(ApiError::Validation("name is required".into()));
    }
    if !is_valid_email(&payload.email) {
        return Err(ApiError::Validation("invalid email".into()));
    }
    if payload.password.is_empty() {
        return Err(ApiError::Validation("password is required".into()));
    }

    // Pre-check for a friendly error; the uniqueness constraint in the store
    // is the backstop when two registrations race.
    if state.users.find_by_email(&payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        return Err(ApiError::EmailTaken);
    }

    let password_hash = password::hash(&payload.password)?;
    let user = match state
        .users
        .create(NewUser {
            name: payload.name.trim().to_string(),
            email: payload.email,
            password_hash,
        })
        .await
    {
        Ok(user) => user,
        Err(e) if e.downcast_ref::<EmailExists>().is_some() => return Err(ApiError::EmailTaken),
        Err(e) => return Err(e.into()),
    };

    let token = JwtKeys::from_ref(&state).sign(user.id)?;
    info!(user_id = user.id, "user registered");
    Ok((StatusCode::CREATED, Json(AuthResponse { user, token })))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<AuthResponse>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    // Unknown email and wrong password yield the identical error.
    let Some(user) = state.users.find_by_email(&payload.email).await? else {
        warn!(email = %payload.email, "login with unknown email");
        return Err(ApiError::InvalidCredentials);
    };

    if !password::verify(&payload.password, &user.password_hash)? {
        warn!(user_id = user.id, "login with invalid password");
        return Err(ApiError::InvalidCredentials);
    }

    let token = JwtKeys::from_ref(&state).sign(user.id)?;
    info!(user_id = user.id, "user logged in");
    Ok(Json(AuthResponse { user, token }))
}

#[instrument(skip(state))]
pub async fn get_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<User>, ApiError> {
    let user = state
        .users
        .find_by_id(user_id)
        .await?
        .ok_or(ApiError::NotFound("User"))?;
    Ok(Json(user))
}

#[instrument(skip(state, payload))]
pub async fn update_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<UpdateAccountRequest>,
) -> Result<Json<User>, ApiError> {
    let mut patch = UserPatch {
        name: payload.name,
        ..Default::default()
    };

    if let Some(email) = payload.email {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(ApiError::Validation("invalid email".into()));
        }
        patch.email = Some(email);
    }

    if let Some(password) = payload.password {
        if password.is_empty() {
            return Err(ApiError::Validation("password must not be empty".into()));
        }
        patch.password_hash = Some(password::hash(&password)?);
    }

    let user = match state.users.update(user_id, patch).await {
        Ok(Some(user)) => user,
        Ok(None) => return Err(ApiError::NotFound("User")),
        Err(e) if e.downcast_ref::<EmailExists>().is_some() => {
            warn!(user_id, "account update to an email already registered");
            return Err(ApiError::EmailTaken);
        }
        Err(e) => return Err(e.into()),
    };
    info!(user_id, "account updated");
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn delete_account(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<MessageResponse>, ApiError> {
    // Owned records go first; the database cascade is a backstop for the
    // Postgres backend, the in-memory stores rely on this ordering.
    state.profiles.delete(user_id).await?;
    state.cards.delete(user_id).await?;

    if !state.users.delete(user_id).await? {
        return Err(ApiError::NotFound("User"));
    }
    info!(user_id, "account deleted");
    Ok(Json(MessageResponse {
        message: "Account deleted successfully".into(),
    }))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;

    use crate::app::testing::{json_request, register_user, send, test_app};
    use crate::auth::jwt::JwtKeys;

    #[tokio::test]
    async fn register_then_login_returns_matching_identity() {
        let app = test_app();
        let (status, registered) = send(
            &app,
            json_request(
                "POST",
                "/api/users/register",
                None,
                Some(json!({"name": "A", "email": "a@x.com", "password": "pw"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let user_id = registered["user"]["id"].as_i64().expect("user id");
        assert!(registered["user"].get("password_hash").is_none());

        let (status, logged_in) = send(
            &app,
            json_request(
                "POST",
                "/api/users/login",
                None,
                Some(json!({"email": "a@x.com", "password": "pw"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let token = logged_in["token"].as_str().expect("token");
        let claims = JwtKeys::new("test-secret", 24).verify(token).expect("verify");
        assert_eq!(claims.sub, user_id);
    }

    #[tokio::test]
    async fn register_rejects_duplicate_email() {
        let app = test_app();
        register_user(&app, "a@x.com").await;
        let (status, body) = send(
            &app,
            json_request(
                "POST",
                "/api/users/register",
                None,
                Some(json!({"name": "B", "email": "a@x.com", "password": "pw2"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Email already registered");
        assert_eq!(body["status"], 400);
    }

    #[tokio::test]
    async fn register_validates_input() {
        let app = test_app();
        for payload in [
            json!({"name": "", "email": "a@x.com", "password": "pw"}),
            json!({"name": "A", "email": "not-an-email", "password": "pw"}),
            json!({"name": "A", "email": "a@x.com", "password": ""}),
        ] {
            let (status, _) = send(
                &app,
                json_request("POST", "/api/users/register", None, Some(payload)),
            )
            .await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
        }
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let app = test_app();
        register_user(&app, "a@x.com").await;

        let (unknown_status, unknown_body) = send(
            &app,
            json_request(
                "POST",
                "/api/users/login",
                None,
                Some(json!({"email": "nobody@x.com", "password": "pw"})),
            ),
        )
        .await;
        let (wrong_status, wrong_body) = send(
            &app,
            json_request(
                "POST",
                "/api/users/login",
                None,
                Some(json!({"email": "a@x.com", "password": "wrong"})),
            ),
        )
        .await;

        assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
        assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
        assert_eq!(unknown_body, wrong_body);
    }

    #[tokio::test]
    async fn account_lifecycle_register_get_delete() {
        let app = test_app();
        let token = register_user(&app, "a@x.com").await;

        let (status, body) = send(
            &app,
            json_request("GET", "/api/users/profile", Some(&token), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "a@x.com");

        let (status, body) = send(
            &app,
            json_request("DELETE", "/api/users/profile", Some(&token), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["message"], "Account deleted successfully");

        let (status, _) = send(
            &app,
            json_request("GET", "/api/users/profile", Some(&token), None),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn patch_account_updates_only_supplied_fields() {
        let app = test_app();
        let token = register_user(&app, "a@x.com").await;

        let (status, body) = send(
            &app,
            json_request(
                "PATCH",
                "/api/users/profile",
                Some(&token),
                Some(json!({"name": "Renamed"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Renamed");
        assert_eq!(body["email"], "a@x.com");
    }

    #[tokio::test]
    async fn patch_email_cannot_take_another_users_email() {
        let app = test_app();
        register_user(&app, "a@x.com").await;
        let token_b = register_user(&app, "b@x.com").await;

        let (status, body) = send(
            &app,
            json_request(
                "PATCH",
                "/api/users/profile",
                Some(&token_b),
                Some(json!({"email": "a@x.com"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Email already registered");

        // The conflicting patch must not have been applied.
        let (status, body) = send(
            &app,
            json_request("GET", "/api/users/profile", Some(&token_b), None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "b@x.com");
    }

    #[tokio::test]
    async fn patch_password_keeps_login_working() {
        let app = test_app();
        let token = register_user(&app, "a@x.com").await;

        let (status, _) = send(
            &app,
            json_request(
                "PATCH",
                "/api/users/profile",
                Some(&token),
                Some(json!({"password": "new-password"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/api/users/login",
                None,
                Some(json!({"email": "a@x.com", "password": "new-password"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _) = send(
            &app,
            json_request(
                "POST",
                "/api/users/login",
                None,
                Some(json!({"email": "a@x.com", "password": "pw"})),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn guard_rejects_missing_and_malformed_tokens() {
        let app = test_app();

        let (status, body) = send(
            &app,
            json_request("GET", "/api/users/profile", None, None),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Access token required");

        let (status, body) = send(
            &app,
            json_request("GET", "/api/users/profile", Some("garbage"), None),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"], "Invalid or expired token");
    }
}
