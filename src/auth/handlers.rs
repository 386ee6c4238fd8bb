use crate::{
    auth::{
        auth::AuthUser,
        jwt::{TokenSubject, generate_access_token, generate_refresh_token, verify_token},
        password::{hash_secret, verify_secret},
    },
    config::Config,
    db::is_duplicate_key,
    error::{AppError, AppResult},
    model::role::{Capability, Role},
    models::{Claims, LoginReqDto, TokenType, UserReq, UserSql},
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{debug, error, info, instrument};
use utoipa::ToSchema;

#[derive(Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    access_token: String,
    refresh_token: String,
}

async fn store_refresh_token(pool: &MySqlPool, claims: &Claims) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO refresh_tokens (user_id, jti, expires_at)
        VALUES (?, ?, FROM_UNIXTIME(?))
        "#,
    )
    .bind(claims.user_id)
    .bind(&claims.jti)
    .bind(claims.exp as i64)
    .execute(pool)
    .await
    .map(|_| ())
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Create a user account (admin only)
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = UserReq,
    responses(
        (status = 201, description = "User created", body = Object, example = json!({
            "message": "User registered successfully"
        })),
        (status = 409, description = "Username already exists"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn register(
    auth: AuthUser,
    user: web::Json<UserReq>,
    pool: web::Data<MySqlPool>,
) -> AppResult<impl Responder> {
    auth.require(Capability::ManageUsers)?;

    let username = user.username.trim().to_lowercase();
    if username.is_empty() || user.password.is_empty() {
        return Err(AppError::bad_request("Username and password must not be empty"));
    }
    if Role::from_id(user.role_id).is_none() {
        return Err(AppError::bad_request("Unknown role"));
    }

    let hashed = hash_secret(&user.password)?;

    let result = sqlx::query(
        "INSERT INTO users (username, password, role_id, employee_id) VALUES (?, ?, ?, ?)",
    )
    .bind(&username)
    .bind(hashed)
    .bind(user.role_id)
    .bind(user.employee_id)
    .execute(pool.get_ref())
    .await;

    match result {
        Ok(_) => {
            info!(username = %username, role_id = user.role_id, "User registered");
            Ok(HttpResponse::Created().json(json!({
                "message": "User registered successfully"
            })))
        }
        Err(e) if is_duplicate_key(&e) => Err(AppError::Conflict("Username already exists".into())),
        Err(e) => Err(e.into()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Tokens issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(pool, config, user),
    fields(username = %user.username)
)]
pub async fn login(
    user: web::Json<LoginReqDto>,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    info!("Login request received");

    if user.username.trim().is_empty() || user.password.is_empty() {
        info!("Validation failed: empty username or password");
        return HttpResponse::BadRequest().body("Username or password required");
    }

    debug!("Fetching user from database");

    let db_user = match sqlx::query_as::<_, UserSql>(
        r#"
        SELECT id, username, password, role_id, employee_id, is_active
        FROM users
        WHERE username = ?
        "#,
    )
    .bind(user.username.trim().to_lowercase())
    .fetch_optional(pool.get_ref())
    .await
    {
        Ok(Some(user)) if user.is_active => {
            debug!(user_id = user.id, "User found");
            user
        }
        Ok(_) => {
            info!("Invalid credentials: user not found or inactive");
            return HttpResponse::Unauthorized().body("Invalid credentials");
        }
        Err(e) => {
            error!(error = %e, "Database error while fetching user");
            return HttpResponse::InternalServerError().finish();
        }
    };

    if let Err(e) = verify_secret(&user.password, &db_user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return HttpResponse::Unauthorized().body("Invalid credentials");
    }

    let subject = TokenSubject {
        user_id: db_user.id,
        username: db_user.username.clone(),
        role: db_user.role_id,
        employee_id: db_user.employee_id,
    };

    let tokens = generate_access_token(&subject, &config.jwt_secret, config.access_token_ttl)
        .and_then(|access| {
            generate_refresh_token(&subject, &config.jwt_secret, config.refresh_token_ttl)
                .map(|(refresh, claims)| (access, refresh, claims))
        });
    let (access_token, refresh_token, refresh_claims) = match tokens {
        Ok(t) => t,
        Err(e) => {
            error!(error = %e, "Failed to issue tokens");
            return HttpResponse::InternalServerError().finish();
        }
    };

    debug!(user_id = db_user.id, jti = %refresh_claims.jti, "Storing refresh token");
    if let Err(e) = store_refresh_token(pool.get_ref(), &refresh_claims).await {
        error!(error = %e, "Failed to store refresh token");
        return HttpResponse::InternalServerError().finish();
    }

    if let Err(e) = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = ?")
        .bind(db_user.id)
        .execute(pool.get_ref())
        .await
    {
        // not fatal for the login
        error!(error = %e, "Failed to update last_login_at");
    }

    info!("Login successful");

    HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token,
    })
}

#[utoipa::path(
    post,
    path = "/auth/refresh",
    responses(
        (status = 200, description = "Rotated tokens", body = LoginResponse),
        (status = 401, description = "Invalid or revoked refresh token")
    ),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> AppResult<impl Responder> {
    let token = bearer_token(&req).ok_or_else(|| AppError::Unauthorized("No token".into()))?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid token".into()))?;

    if claims.token_type != TokenType::Refresh {
        return Err(AppError::Unauthorized("Refresh token required".into()));
    }

    // Revoke-on-use: only one caller can rotate a given refresh token.
    let revoked = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ? AND revoked = FALSE")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await?;

    if revoked.rows_affected() == 0 {
        return Err(AppError::Unauthorized("Refresh token revoked".into()));
    }

    let subject = TokenSubject {
        user_id: claims.user_id,
        username: claims.sub.clone(),
        role: claims.role,
        employee_id: claims.employee_id,
    };

    let (new_refresh_token, new_claims) =
        generate_refresh_token(&subject, &config.jwt_secret, config.refresh_token_ttl)?;
    store_refresh_token(pool.get_ref(), &new_claims).await?;

    let access_token = generate_access_token(&subject, &config.jwt_secret, config.access_token_ttl)?;

    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token,
        refresh_token: new_refresh_token,
    }))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses((status = 204, description = "Refresh token revoked")),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    pool: web::Data<MySqlPool>,
    config: web::Data<Config>,
) -> impl Responder {
    let Some(token) = bearer_token(&req) else {
        return HttpResponse::NoContent().finish();
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) if c.token_type == TokenType::Refresh => c,
        _ => return HttpResponse::NoContent().finish(),
    };

    // idempotent
    if let Err(e) = sqlx::query("UPDATE refresh_tokens SET revoked = TRUE WHERE jti = ?")
        .bind(&claims.jti)
        .execute(pool.get_ref())
        .await
    {
        error!(error = %e, "Failed to revoke refresh token");
    }

    HttpResponse::NoContent().finish()
}
