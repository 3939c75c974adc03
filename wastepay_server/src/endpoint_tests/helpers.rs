use actix_web::{body::MessageBody, http::StatusCode, test, test::TestRequest, web, App};
use log::debug;
use wastepay_engine::dispatcher::Dispatcher;

use crate::server::{configure_routes, json_error_handler};

async fn call(req: TestRequest, dispatcher: Dispatcher) -> Result<(StatusCode, String), String> {
    let req = req.to_request();
    let app = App::new()
        .app_data(web::Data::new(dispatcher))
        .app_data(web::JsonConfig::default().error_handler(json_error_handler))
        .configure(configure_routes);
    let service = test::init_service(app).await;
    debug!("Making request");
    let (_, res) = test::try_call_service(&service, req).await.map_err(|e| e.to_string())?.into_parts();
    let status = res.status();
    let body = String::from_utf8_lossy(&res.into_body().try_into_bytes().unwrap()).into_owned();
    Ok((status, body))
}

pub async fn get_request(path: &str, dispatcher: Dispatcher) -> Result<(StatusCode, String), String> {
    call(TestRequest::get().uri(path), dispatcher).await
}

pub async fn post_request(path: &str, body: &str, dispatcher: Dispatcher) -> Result<(StatusCode, String), String> {
    let req = TestRequest::post()
        .uri(path)
        .insert_header(("Content-Type", "application/json"))
        .set_payload(body.to_string());
    call(req, dispatcher).await
}
