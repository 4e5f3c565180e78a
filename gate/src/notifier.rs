//! Outbound notification sinks (Discord/email) are out of scope (spec §1)
//! — treated here as a narrow trait with a logging-only implementation,
//! matching the teacher's own pattern of stubbing not-yet-built
//! integrations behind a log line (`services/risk.rs::spawn_guardian`'s
//! "flip a flag" stub is the same kind of scoped placeholder).

use async_trait::async_trait;

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, message: &str);
}

pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &str) {
        log::info!("notifier: {message}");
    }
}
