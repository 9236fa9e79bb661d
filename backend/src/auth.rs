use axum::{extract::State, http::StatusCode, Json};
use common::{utils::normalize_email, AuthResponse, Credentials, MeResponse, RegisterRequest, Role};

use axum::{extract::Request, middleware::Next, response::Response};
use axum_extra::{
    headers::{authorization::Bearer, Authorization},
    typed_header::TypedHeaderRejection,
    TypedHeader,
};

use crate::error::AppError;
use crate::extractors::{AppJson, AuthUser};
use crate::models::{NewUser, User};
use crate::password::{hash_password, verify_password};
use crate::token::{issue_token, verify_token};
use crate::web_server::AppState;
use validator::Validate;

/// Allow-list for admin-only routes.
pub const ADMIN_ONLY: &[Role] = &[Role::Admin];
/// Allow-list for routes shared by admins and moderators.
pub const STAFF: &[Role] = &[Role::Admin, Role::Moderator];

// --- API Handlers ---

/// ## Register a new user
/// Normalises the email, validates the payload, hashes the password and
/// stores the account. Responds with a token so the client is logged in.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = AuthResponse),
        (status = 400, description = "Invalid data or email already registered"),
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<AuthResponse>), AppError> {
    let payload = RegisterRequest {
        email: normalize_email(&payload.email),
        ..payload
    };
    payload.validate()?;

    tracing::info!("Registering user with email: {}", &payload.email);
    if User::find_by_email(&state.db_pool, &payload.email)
        .await?
        .is_some()
    {
        return Err(AppError::Duplicate(
            "User with this email already exists".to_string(),
        ));
    }

    let password_hash = hash_password(&payload.password, state.app_config.bcrypt_cost)?;

    let user = User::create(
        &state.db_pool,
        NewUser {
            email: &payload.email,
            password_hash: &password_hash,
            role: payload.role.unwrap_or_default(),
        },
    )
    .await
    .map_err(|e| match AppError::from(e) {
        // Lost a race with a concurrent registration.
        AppError::Duplicate(_) => {
            AppError::Duplicate("User with this email already exists".to_string())
        }
        other => other,
    })?;

    let token = issue_token(user.id, &user.email, user.role(), &state.app_config.jwt)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "User registered successfully".to_string(),
            token,
            user: user.to_dto(),
        }),
    ))
}

/// ## Login an existing user
/// Verifies email and password and returns a fresh token.
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = Credentials,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 400, description = "Email or password missing"),
        (status = 401, description = "Invalid credentials"),
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<Credentials>,
) -> Result<Json<AuthResponse>, AppError> {
    payload.validate()?;
    let email = normalize_email(&payload.email);

    tracing::info!("Logging in user with email: {}", &email);
    let user = User::find_by_email(&state.db_pool, &email)
        .await?
        .ok_or(AppError::Unauthorized)?;

    if !verify_password(&payload.password, &user.password_hash)? {
        return Err(AppError::Unauthorized);
    }

    let token = issue_token(user.id, &user.email, user.role(), &state.app_config.jwt)?;

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        token,
        user: user.to_dto(),
    }))
}

/// ## Current account
/// Re-reads the caller's account from the store.
#[utoipa::path(
    get,
    path = "/auth/me",
    security(
        ("bearer_auth" = [])
    ),
    responses(
        (status = 200, description = "The authenticated user", body = MeResponse),
        (status = 401, description = "Authentication required"),
        (status = 404, description = "Account no longer exists"),
    ),
    tag = "auth"
)]
pub async fn me(State(state): State<AppState>, user: AuthUser) -> Result<Json<MeResponse>, AppError> {
    let account = User::find_by_id(&state.db_pool, user.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(Json(MeResponse {
        user: account.to_dto(),
    }))
}

// --- Middleware for JWT Authentication ---

pub async fn auth_middleware(
    State(state): State<AppState>,
    auth_header: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = match auth_header {
        Ok(TypedHeader(authorization)) => authorization.token().to_owned(),
        Err(rejection) if rejection.is_missing() => return Err(AppError::MissingToken),
        Err(_) => return Err(AppError::MalformedAuthHeader),
    };

    let claims = verify_token(&token, &state.app_config.jwt.secret)?;

    // Attach the decoded claims for the handlers downstream.
    request.extensions_mut().insert(AuthUser::from_claims(&claims)?);

    Ok(next.run(request).await)
}

// --- Middleware for role checks; must run after `auth_middleware` ---

pub async fn require_role(
    State(allowed): State<&'static [Role]>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let role = request
        .extensions()
        .get::<AuthUser>()
        .map(|user| user.role)
        .ok_or(AppError::AuthenticationRequired)?;

    if !role.is_one_of(allowed) {
        let names = allowed
            .iter()
            .map(Role::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        return Err(AppError::Forbidden(format!(
            "Access denied. Requires one of the following roles: {names}"
        )));
    }

    Ok(next.run(request).await)
}
