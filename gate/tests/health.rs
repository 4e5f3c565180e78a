use actix_web::{test, App};
use gate::routes::health::healthz;

#[actix_rt::test]
async fn healthz_reports_ok() {
    let app = test::init_service(App::new().service(healthz)).await;
    let req = test::TestRequest::get().uri("/healthz").to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
}
