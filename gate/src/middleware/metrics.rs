//! In-memory request counters, analogous to the teacher's
//! `middleware/metrics.rs` but without the `metrics`/`metrics-exporter-
//! prometheus` crates: spec.md's operational-controls surface is covered
//! by `/v1/status`, so this exposes counters through that route's
//! internal fields rather than a separate `/metrics` endpoint.

use actix_web::dev::{self, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::Error;
use futures_util::future::LocalBoxFuture;
use once_cell::sync::Lazy;
use std::future::{ready, Ready};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

pub struct RequestCounters {
    pub total_requests: AtomicU64,
    pub total_latency_us: AtomicU64,
}

pub static COUNTERS: Lazy<RequestCounters> = Lazy::new(|| RequestCounters {
    total_requests: AtomicU64::new(0),
    total_latency_us: AtomicU64::new(0),
});

impl RequestCounters {
    pub fn snapshot(&self) -> (u64, f64) {
        let total = self.total_requests.load(Ordering::Relaxed);
        let latency_us = self.total_latency_us.load(Ordering::Relaxed);
        let avg_ms = if total == 0 {
            0.0
        } else {
            (latency_us as f64 / total as f64) / 1000.0
        };
        (total, avg_ms)
    }
}

pub struct Metrics;

impl<S, B> Transform<S, ServiceRequest> for Metrics
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = MetricsMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(MetricsMiddleware { service }))
    }
}

pub struct MetricsMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for MetricsMiddleware<S>
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
        let start = Instant::now();
        let fut = self.service.call(req);

        Box::pin(async move {
            let res = fut.await?;
            COUNTERS.total_requests.fetch_add(1, Ordering::Relaxed);
            COUNTERS
                .total_latency_us
                .fetch_add(start.elapsed().as_micros() as u64, Ordering::Relaxed);
            Ok(res)
        })
    }
}
