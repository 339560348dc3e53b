//! Identity middleware
//!
//! 从 Cookie 中恢复用户标识；缺失或签名无效时签发新的标识并在响应中写回 Cookie。

use actix_service::{Service, Transform};
use actix_web::{
    Error, HttpMessage,
    dev::{ServiceRequest, ServiceResponse},
};
use futures_util::future::{LocalBoxFuture, Ready, ready};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::api::identity::{IdentityService, UserId};

/// 标识中间件工厂
#[derive(Clone)]
pub struct IdentityMiddleware {
    identity: Arc<IdentityService>,
}

impl IdentityMiddleware {
    pub fn new(identity: Arc<IdentityService>) -> Self {
        Self { identity }
    }
}

impl<S, B> Transform<S, ServiceRequest> for IdentityMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = IdentityMiddlewareService<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(IdentityMiddlewareService {
            service: Rc::new(service),
            identity: self.identity.clone(),
        }))
    }
}

pub struct IdentityMiddlewareService<S> {
    service: Rc<S>,
    identity: Arc<IdentityService>,
}

impl<S, B> Service<ServiceRequest> for IdentityMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(
        &self,
        ctx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Result<(), Self::Error>> {
        self.service.poll_ready(ctx)
    }

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let srv = self.service.clone();
        let identity = self.identity.clone();

        let existing = req
            .cookie(identity.cookie_name())
            .and_then(|cookie| match identity.verify(cookie.value()) {
                Ok(user) => Some(user),
                Err(e) => {
                    debug!("Discarding identity cookie: {}", e);
                    None
                }
            });

        // 新签发的令牌需要写回 Cookie
        let (user, minted) = match existing {
            Some(user) => (user, None),
            None => match identity.issue() {
                Ok((user, token)) => (user, Some(token)),
                Err(e) => return Box::pin(async move { Err(e.into()) }),
            },
        };

        req.extensions_mut().insert::<UserId>(user);

        Box::pin(async move {
            let mut response = srv.call(req).await?;

            if let Some(token) = minted
                && let Err(e) = response
                    .response_mut()
                    .add_cookie(&identity.build_cookie(token))
            {
                warn!("Failed to attach identity cookie: {}", e);
            }

            Ok(response)
        })
    }
}
