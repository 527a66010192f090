use crate::error::{AppError, AppResult};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// 身份令牌载荷，由 Discord OAuth 前端在握手完成后签发
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // discord user id
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    /// 是否已加入 Discord 服务器
    #[serde(default)]
    pub in_guild: bool,
    pub exp: i64,
    pub iat: i64,
}

/// 鉴权后注入请求扩展的调用方身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub display_name: String,
    pub avatar: Option<String>,
    pub in_guild: bool,
}

impl From<Claims> for Identity {
    fn from(c: Claims) -> Self {
        Identity {
            id: c.sub,
            display_name: c.name,
            avatar: c.avatar,
            in_guild: c.in_guild,
        }
    }
}

/// 只校验令牌，签发在 OAuth 前端完成
#[derive(Clone)]
pub struct JwtService {
    decoding_key: DecodingKey,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn verify_identity_token(&self, token: &str) -> AppResult<Identity> {
        let validation = Validation::new(Algorithm::HS256);
        let claims = decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(AppError::JwtError)?;

        if claims.sub.trim().is_empty() {
            return Err(AppError::AuthError("Identity token has no subject".to_string()));
        }

        Ok(claims.into())
    }
}
