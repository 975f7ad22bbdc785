use crate::{
    auth::{
        hash_password, verify_password, AuthResponse, ForgotPasswordRequest,
        ForgotPasswordResponse, LoginRequest, RegisterRequest, ResetPasswordRequest,
    },
    error::AppError,
    models::{normalize_email, NewUser, User},
    state::AppState,
};
use actix_web::{post, put, web, HttpResponse, Responder};
use validator::Validate;

const FORGOT_PASSWORD_MESSAGE: &str =
    "If an account exists for that email, a password reset token has been issued";

fn auth_response(state: &AppState, user: &User) -> Result<AuthResponse, AppError> {
    Ok(AuthResponse {
        success: true,
        token: state.tokens.issue(user.id)?,
        user: user.profile(),
    })
}

/// Register a new user
///
/// Creates a new account and returns a bearer token for it.
#[post("/register")]
pub async fn register(
    state: web::Data<AppState>,
    register_data: web::Json<RegisterRequest>,
) -> Result<impl Responder, AppError> {
    register_data.validate()?;
    let input = register_data.into_inner();
    let email = normalize_email(&input.email);

    if state.users.find_by_email(&email).await?.is_some() {
        return Err(AppError::DuplicateIdentity("User already exists".into()));
    }

    let password_hash = hash_password(&input.password, state.bcrypt_cost)?;

    // A concurrent registration can still win the race; the store reports it as a duplicate.
    let user = state
        .users
        .insert_user(NewUser {
            name: input.name.trim().to_string(),
            email,
            password_hash,
        })
        .await?;

    log::info!("Registered user {}", user.id);
    Ok(HttpResponse::Created().json(auth_response(&state, &user)?))
}

/// Login user
///
/// Authenticates a user and returns a bearer token.
#[post("/login")]
pub async fn login(
    state: web::Data<AppState>,
    login_data: web::Json<LoginRequest>,
) -> Result<impl Responder, AppError> {
    login_data.validate()?;

    let user = state
        .users
        .find_by_email(&normalize_email(&login_data.email))
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid credentials".into()))?;

    if !verify_password(&login_data.password, &user.password_hash)? {
        return Err(AppError::Unauthorized("Invalid credentials".into()));
    }

    Ok(HttpResponse::Ok().json(auth_response(&state, &user)?))
}

/// Forgot password
///
/// Issues a single-use reset token. The response is the same whether or not the email
/// belongs to an account; the raw token is echoed back only outside production.
#[post("/forgotpassword")]
pub async fn forgot_password(
    state: web::Data<AppState>,
    forgot_data: web::Json<ForgotPasswordRequest>,
) -> Result<impl Responder, AppError> {
    forgot_data.validate()?;

    let ticket = state.resets.issue_reset_token(&forgot_data.email).await?;

    let (reset_token, reset_url) = if state.environment.is_production() {
        (None, None)
    } else {
        let raw = ticket.raw_token().to_string();
        let url = format!("{}/reset-password/{}", state.client_url, raw);
        (Some(raw), Some(url))
    };

    Ok(HttpResponse::Ok().json(ForgotPasswordResponse {
        success: true,
        message: FORGOT_PASSWORD_MESSAGE.to_string(),
        reset_token,
        reset_url,
    }))
}

/// Reset password
///
/// Consumes the reset token from the path, sets the new password and signs the user in.
#[put("/resetpassword/{resettoken}")]
pub async fn reset_password(
    state: web::Data<AppState>,
    reset_token: web::Path<String>,
    reset_data: web::Json<ResetPasswordRequest>,
) -> Result<impl Responder, AppError> {
    reset_data.validate()?;

    let user = state
        .resets
        .consume_reset_token(&reset_token, &reset_data.password)
        .await?;

    Ok(HttpResponse::Ok().json(auth_response(&state, &user)?))
}
