use actix_web::{post, test, web, App, HttpMessage, HttpRequest, HttpResponse, Responder};
use gate::middleware::signature::BufferBody;
use serde::Deserialize;

#[derive(Deserialize)]
struct Echo {
    value: i32,
}

#[post("/echo")]
async fn echo(req: HttpRequest, body: web::Json<Echo>) -> impl Responder {
    let buffered = req.extensions().get::<Vec<u8>>().cloned().unwrap_or_default();
    HttpResponse::Ok().json(serde_json::json!({
        "buffered_len": buffered.len(),
        "value": body.value,
    }))
}

/// Confirms the fix over the teacher's own auth middleware: a handler can
/// both read the buffered raw bytes (for HMAC verification) and bind the
/// same body as JSON, because the middleware restores the payload stream.
#[actix_rt::test]
async fn buffered_body_is_still_readable_as_json() {
    let app = test::init_service(App::new().wrap(BufferBody).service(echo)).await;

    let req = test::TestRequest::post()
        .uri("/echo")
        .insert_header(("content-type", "application/json"))
        .set_payload(r#"{"value": 42}"#)
        .to_request();

    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: serde_json::Value = test::read_body_json(resp).await;
    assert_eq!(body["value"], 42);
    assert!(body["buffered_len"].as_u64().unwrap() > 0);
}
