use crate::config::Config;
use crate::error::AppError;
use crate::model::role::{Capabilities, Capability, Role};
use crate::models::{Claims, TokenType};
use crate::auth::jwt::verify_token;
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,

    /// Present only if this user is linked to an employee record
    pub employee_id: Option<u64>,

    /// Resolved once from the role when the token is decoded
    pub capabilities: Capabilities,
}

impl AuthUser {
    pub fn from_claims(claims: Claims) -> Result<Self, AppError> {
        if claims.token_type != TokenType::Access {
            return Err(AppError::Unauthorized("Access token required".into()));
        }

        let role = Role::from_id(claims.role)
            .ok_or_else(|| AppError::Unauthorized("Invalid role".into()))?;

        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.sub,
            role,
            employee_id: claims.employee_id,
            capabilities: role.capabilities(),
        })
    }

    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.capabilities.contains(capability) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!("Missing capability: {capability}")))
        }
    }

    pub fn employee_id(&self) -> Result<u64, AppError> {
        self.employee_id
            .ok_or_else(|| AppError::Forbidden("No employee profile".into()))
    }

    /// Own data is always visible; others' data needs `capability`.
    pub fn require_self_or(&self, employee_id: u64, capability: Capability) -> Result<(), AppError> {
        if self.employee_id == Some(employee_id) {
            return Ok(());
        }
        self.require(capability)
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, AppError> {
    if let Some(user) = req.extensions().get::<AuthUser>() {
        return Ok(user.clone());
    }

    let token = req
        .headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Missing token".into()))?;

    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| AppError::Internal("Config missing".into()))?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| AppError::Unauthorized("Invalid token".into()))?;

    AuthUser::from_claims(claims)
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}
