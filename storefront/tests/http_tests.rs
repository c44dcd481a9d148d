// tests/http_tests.rs
mod common;

use actix_web::http::{header, Method, StatusCode};
use actix_web::{test, web, App};
use common::*;
use serde_json::{json, Value};
use serial_test::serial;

use storefront::store::{Actor, DataStore};
use storefront::web::configure_app_routes;

macro_rules! init_app {
  ($state:expr) => {
    test::init_service(
      App::new()
        .app_data(web::Data::new($state.clone()))
        .configure(configure_app_routes),
    )
    .await
  };
}

fn bearer(token: &str) -> (header::HeaderName, String) {
  (header::AUTHORIZATION, format!("Bearer {}", token))
}

#[actix_web::test]
#[serial]
async fn functions_require_the_service_key() {
  let app_state = TestApp::new();
  let app = init_app!(app_state.state);

  for path in ["/functions/v1/process-order", "/functions/v1/process-payment"] {
    let req = test::TestRequest::post().uri(path).set_json(json!({})).to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", path);
    assert_eq!(
      resp.headers().get("access-control-allow-origin").map(|v| v.to_str().unwrap()),
      Some("*")
    );

    let req = test::TestRequest::post()
      .uri(path)
      .insert_header(bearer("not-the-key"))
      .set_json(json!({}))
      .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED, "{}", path);
  }
}

#[actix_web::test]
#[serial]
async fn preflight_replies_ok_with_cors_headers() {
  let app_state = TestApp::new();
  let app = init_app!(app_state.state);

  let req = test::TestRequest::default()
    .method(Method::OPTIONS)
    .uri("/functions/v1/process-payment")
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  assert_eq!(
    resp.headers().get("access-control-allow-headers").map(|v| v.to_str().unwrap()),
    Some("authorization, x-client-info, apikey, content-type")
  );
  let body = test::read_body(resp).await;
  assert_eq!(body.as_ref(), b"ok");
}

#[actix_web::test]
#[serial]
async fn incomplete_payment_body_is_a_bad_request() {
  let app_state = TestApp::new();
  let app = init_app!(app_state.state);

  let req = test::TestRequest::post()
    .uri("/functions/v1/process-payment")
    .insert_header(bearer(SERVICE_KEY))
    .set_json(json!({ "paymentId": uuid::Uuid::new_v4(), "amount": 10.0 }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body, json!({ "error": "Missing required fields" }));
}

#[actix_web::test]
#[serial]
async fn process_order_failures_are_server_errors() {
  let app_state = TestApp::new();
  let app = init_app!(app_state.state);

  let req = test::TestRequest::post()
    .uri("/functions/v1/process-order")
    .insert_header(bearer(SERVICE_KEY))
    .set_json(json!({ "orderId": uuid::Uuid::new_v4(), "userId": uuid::Uuid::new_v4(), "items": [] }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
  let body: Value = test::read_body_json(resp).await;
  assert!(body["error"].as_str().unwrap().contains("not found"));
}

#[actix_web::test]
#[serial]
async fn shopper_flow_over_http() {
  let app_state = TestApp::new();
  let product = app_state.product("Canvas Tote", 2000, 10).await;
  let app = init_app!(app_state.state);

  let req = test::TestRequest::post()
    .uri("/api/v1/auth/signup")
    .set_json(json!({ "email": "http@example.com", "password": PASSWORD, "fullName": "Http Shopper" }))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

  let req = test::TestRequest::post()
    .uri("/api/v1/auth/signin")
    .set_json(json!({ "email": "http@example.com", "password": PASSWORD }))
    .to_request();
  let signin: Value = test::call_and_read_body_json(&app, req).await;
  let token = signin["session"]["accessToken"].as_str().unwrap().to_string();
  assert!(signin["user"].get("password_hash").is_none());

  let req = test::TestRequest::get().uri("/api/v1/products?sort=price_asc").to_request();
  let page: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(page["total"], 1);

  let req = test::TestRequest::post()
    .uri("/api/v1/checkout")
    .insert_header(bearer(&token))
    .set_json(json!({
      "items": [{ "productId": product.id, "quantity": 3 }],
      "fullName": "Http Shopper",
      "email": "http@example.com",
      "phone": "555-0100",
      "address": "1 Market St",
      "city": "Springfield",
      "country": "US",
      "zipCode": "12345",
      "paymentMethod": "card"
    }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::CREATED);
  let receipt: Value = test::read_body_json(resp).await;
  assert_eq!(receipt["totalCents"], 7600);

  let req = test::TestRequest::get()
    .uri("/api/v1/orders")
    .insert_header(bearer(&token))
    .to_request();
  let orders: Value = test::call_and_read_body_json(&app, req).await;
  assert_eq!(orders["orders"].as_array().unwrap().len(), 1);

  let req = test::TestRequest::post()
    .uri("/api/v1/auth/signout")
    .insert_header(bearer(&token))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

  let req = test::TestRequest::get()
    .uri("/api/v1/auth/user")
    .insert_header(bearer(&token))
    .to_request();
  assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
}

#[actix_web::test]
#[serial]
async fn payment_function_confirms_over_http() {
  let app_state = TestApp::new();
  let product = app_state.product("Canvas Tote", 2000, 10).await;
  let (user, session) = app_state.signed_in_user("fn@example.com").await;
  let receipt = storefront::services::checkout::submit(
    &app_state.state,
    &session,
    vec![storefront::models::CartItem {
      product_id: product.id,
      quantity: 1,
    }],
    checkout_form(),
  )
  .await
  .unwrap();
  let app = init_app!(app_state.state);

  let req = test::TestRequest::post()
    .uri("/functions/v1/process-payment")
    .insert_header(bearer(SERVICE_KEY))
    .set_json(json!({
      "paymentId": receipt.payment_id,
      "orderId": receipt.order_id,
      "userId": user.id,
      "amount": 32.0,
      "paymentMethod": "card"
    }))
    .to_request();
  let resp = test::call_service(&app, req).await;
  assert_eq!(resp.status(), StatusCode::OK);
  let body: Value = test::read_body_json(resp).await;
  assert_eq!(body["success"], true);
  assert_eq!(body["status"], "success");

  let order = app_state
    .store
    .get_order(&Actor::Service, receipt.order_id)
    .await
    .unwrap()
    .unwrap();
  assert_eq!(order.status, storefront::models::OrderStatus::Confirmed);
}
