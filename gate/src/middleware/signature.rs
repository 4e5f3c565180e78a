//! Request-body buffering so a handler can both verify the raw bytes
//! (`X-GW-Signature` HMAC check, spec §4.H steps 1-2) and still bind the
//! body as JSON afterwards. Grounded on `middleware/auth.rs`'s
//! body-buffering `call()` (`take_payload()` + `BytesMut` loop), but the
//! buffered bytes are restored onto the request as a fresh payload
//! stream instead of only being stashed in extensions, so the downstream
//! `web::Json` extractor keeps working — the teacher's own version does
//! not do this and would starve any handler that both HMAC-checks and
//! JSON-binds the same request.

use actix_web::dev::{self, Payload, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::web::BytesMut;
use actix_web::Error;
use actix_web::HttpMessage;
use futures_util::future::LocalBoxFuture;
use futures_util::StreamExt;
use std::future::{ready, Ready};
use std::rc::Rc;

pub struct BufferBody;

impl<S, B> Transform<S, ServiceRequest> for BufferBody
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = BufferBodyMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(BufferBodyMiddleware { service: Rc::new(service) }))
    }
}

pub struct BufferBodyMiddleware<S> {
    service: Rc<S>,
}

impl<S, B> Service<ServiceRequest> for BufferBodyMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    dev::forward_ready!(service);

    fn call(&self, mut req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        Box::pin(async move {
            let mut payload = req.take_payload();
            let mut body = BytesMut::new();
            while let Some(chunk) = payload.next().await {
                let chunk = chunk.map_err(Error::from)?;
                body.extend_from_slice(&chunk);
            }
            let bytes = body.freeze();
            req.extensions_mut().insert(bytes.to_vec());
            req.set_payload(Payload::from(bytes));

            service.call(req).await
        })
    }
}
