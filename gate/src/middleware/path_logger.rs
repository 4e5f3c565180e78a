//! Structured per-request path logging (generalizes
//! `middleware/path_logger.rs`'s debug `println!`s into `log::info!`
//! lines carrying method, path and status).

use actix_web::dev::{self, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::Error;
use futures_util::future::LocalBoxFuture;
use std::future::{ready, Ready};
use std::time::Instant;

pub struct PathLogger;

impl<S, B> Transform<S, ServiceRequest> for PathLogger
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = PathLoggerMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(PathLoggerMiddleware { service }))
    }
}

pub struct PathLoggerMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for PathLoggerMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    dev::forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let method = req.method().clone();
        let path = req.path().to_string();
        let started = Instant::now();
        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;
            log::info!(
                "{method} {path} -> {} ({:?})",
                res.status(),
                started.elapsed()
            );
            Ok(res)
        })
    }
}
