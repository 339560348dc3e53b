//! 浏览器标识
//!
//! 每个浏览器持有一个签名 Cookie，`sub` 为随机 UUID，仅用作数据分区键，不是认证凭据。

use std::future::{Ready, ready};

use actix_web::cookie::{Cookie, SameSite};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::IdentityConfig;
use crate::errors::ShortenerError;
use crate::utils::generate_random_code;

/// 当前请求的用户标识，由 `IdentityMiddleware` 注入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId(pub String);

impl UserId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromRequest for UserId {
    type Error = ShortenerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<UserId>()
                .cloned()
                .ok_or_else(|| ShortenerError::identity("request has no user identity")),
        )
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IdentityClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
}

/// 签发与校验标识 Cookie
pub struct IdentityService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    cookie_name: String,
    cookie_days: u64,
    secure: bool,
}

impl IdentityService {
    pub fn new(secret: &str, cookie_name: impl Into<String>, cookie_days: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            cookie_name: cookie_name.into(),
            cookie_days: cookie_days.max(1),
            secure: false,
        }
    }

    pub fn from_config(config: &IdentityConfig) -> Self {
        // 未配置密钥时随机生成，重启后旧 Cookie 失效
        let secret = if config.secret.is_empty() {
            warn!("Identity secret not configured, generating a random one");
            generate_random_code(48)
        } else {
            config.secret.clone()
        };

        let mut service = Self::new(&secret, config.cookie_name.clone(), config.cookie_days);
        service.secure = config.secure;
        service
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// 生成新的用户标识及其令牌
    pub fn issue(&self) -> Result<(UserId, String), ShortenerError> {
        let user_id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now();
        let claims = IdentityClaims {
            sub: user_id.clone(),
            iat: now.timestamp(),
            exp: (now + Duration::days(self.cookie_days as i64)).timestamp(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| ShortenerError::identity(format!("failed to sign identity: {}", e)))?;
        Ok((UserId(user_id), token))
    }

    /// 校验令牌，返回其中的用户标识
    pub fn verify(&self, token: &str) -> Result<UserId, ShortenerError> {
        let data = decode::<IdentityClaims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| ShortenerError::identity(format!("invalid identity token: {}", e)))?;

        if data.claims.sub.is_empty() {
            return Err(ShortenerError::identity("identity token has empty subject"));
        }
        Ok(UserId(data.claims.sub))
    }

    pub fn build_cookie(&self, token: String) -> Cookie<'static> {
        let mut cookie = Cookie::new(self.cookie_name.clone(), token);
        cookie.set_path("/");
        cookie.set_http_only(true);
        cookie.set_secure(self.secure);
        cookie.set_same_site(SameSite::Lax);
        cookie.set_max_age(actix_web::cookie::time::Duration::days(
            self.cookie_days as i64,
        ));
        cookie
    }
}
