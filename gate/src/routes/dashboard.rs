//! `GET /` (spec §7 "User-visible behaviour"): a minimal human-readable
//! dashboard, the same way the teacher's own `main.rs` serves a plain
//! status page rather than shipping a separate frontend crate.

use crate::ledger::queries;
use crate::state::AppState;
use actix_web::{get, web, HttpResponse};
use std::fmt::Write as _;

#[get("/")]
pub async fn dashboard(app: web::Data<AppState>) -> HttpResponse {
    let gate = app.gate.lock().await;
    let proposals = queries::recent_proposals(&app.pool, 10).await.unwrap_or_default();

    let mut rows = String::new();
    for p in &proposals {
        let reason = p.rejection_reason.as_deref().unwrap_or("-");
        let _ = writeln!(
            rows,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            p.ts_s, p.symbol, p.strategy, p.side, p.status, reason
        );
    }

    let lock_banner = if gate.is_locked() {
        format!(
            "<p style=\"color:red\"><strong>LOCKED</strong>: {}</p>",
            gate.lock.reason.as_deref().unwrap_or("no reason recorded")
        )
    } else {
        "<p style=\"color:green\">NORMAL</p>".to_string()
    };

    let html = format!(
        "<html><head><title>gate</title></head><body>\
         <h1>Risk Gate</h1>{lock_banner}\
         <h2>Recent proposals</h2>\
         <table border=\"1\"><tr><th>ts</th><th>symbol</th><th>strategy</th><th>side</th><th>status</th><th>reason</th></tr>{rows}</table>\
         </body></html>"
    );

    HttpResponse::Ok().content_type("text/html").body(html)
}
