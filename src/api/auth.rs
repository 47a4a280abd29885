use crate::entities::user;
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use serde_json::json;
use tower_cookies::{Cookie, Cookies};
use tracing::field::display;

use super::middleware::SESSION_COOKIE;

#[derive(serde::Deserialize)]
pub struct SignupRequest {
    username: String,
    email: String,
    password: String,
}

pub async fn signup(
    Extension(db): Extension<DatabaseConnection>,
    Json(payload): Json<SignupRequest>,
) -> Response {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = match argon2.hash_password(payload.password.as_bytes(), &salt) {
        Ok(hash) => hash.to_string(),
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Failed to hash password"})),
            )
                .into_response()
        }
    };

    let new_user = user::ActiveModel {
        username: Set(payload.username),
        email: Set(payload.email),
        password_hash: Set(password_hash),
        created_at: Set(chrono::Utc::now().naive_utc()),
        ..Default::default()
    };

    match new_user.insert(&db).await {
        Ok(user) => {
            tracing::Span::current()
                .record("table", "users")
                .record("action", "signup")
                .record("user_id", user.id)
                .record("business_event", "User signed up");

            metrics::counter!("stillpoint_users_registered_total").increment(1);
            metrics::gauge!("stillpoint_users_total").increment(1.0);

            (
                StatusCode::CREATED,
                Json(json!({"id": user.id, "username": user.username, "email": user.email})),
            )
                .into_response()
        }
        Err(e) => {
            if super::is_unique_violation(&e) {
                tracing::Span::current()
                    .record("table", "users")
                    .record("action", "signup_failed")
                    .record("error", "duplicate_username_or_email");

                return (
                    StatusCode::CONFLICT,
                    Json(json!({"error": "Username or email already exists"})),
                )
                    .into_response();
            }

            tracing::Span::current()
                .record("table", "users")
                .record("action", "signup_error")
                .record("error", display(&e));

            super::db_error(e)
        }
    }
}

#[derive(serde::Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

pub async fn login(
    Extension(db): Extension<DatabaseConnection>,
    cookies: Cookies,
    Json(payload): Json<LoginRequest>,
) -> Response {
    let user = match user::Entity::find()
        .filter(user::Column::Email.eq(payload.email.clone()))
        .one(&db)
        .await
    {
        Ok(Some(u)) => u,
        Ok(None) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "Invalid email or password"})),
            )
                .into_response()
        }
        Err(e) => return super::db_error(e),
    };

    let parsed_hash = match PasswordHash::new(&user.password_hash) {
        Ok(h) => h,
        Err(_) => {
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "Invalid password hash in DB"})),
            )
                .into_response()
        }
    };

    if Argon2::default()
        .verify_password(payload.password.as_bytes(), &parsed_hash)
        .is_ok()
    {
        let mut cookie = Cookie::new(SESSION_COOKIE, user.id.to_string());
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookies.add(cookie);

        tracing::Span::current()
            .record("table", "users")
            .record("action", "login")
            .record("user_id", user.id)
            .record("business_event", "User logged in");

        (
            StatusCode::OK,
            Json(json!({"message": "Login successful", "username": user.username})),
        )
            .into_response()
    } else {
        tracing::Span::current()
            .record("table", "users")
            .record("action", "login_failed")
            .record("error", "invalid_credentials");

        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": "Invalid email or password"})),
        )
            .into_response()
    }
}

pub async fn logout(Extension(user_id): Extension<i32>, cookies: Cookies) -> Response {
    let mut cookie = Cookie::new(SESSION_COOKIE, "");
    cookie.set_path("/");
    cookies.remove(cookie);

    tracing::Span::current()
        .record("action", "logout")
        .record("user_id", user_id);

    (StatusCode::OK, Json(json!({"message": "Logged out"}))).into_response()
}
