// storefront/src/web/routes.rs

use actix_web::http::Method;
use actix_web::middleware::DefaultHeaders;
use actix_web::web;

use crate::web::handlers::{auth_handlers, checkout_handlers, function_handlers, order_handlers, product_handlers};

pub const CORS_ALLOW_HEADERS: &str = "authorization, x-client-info, apikey, content-type";

async fn health_check_handler() -> actix_web::HttpResponse {
  actix_web::HttpResponse::Ok().json(serde_json::json!({ "status": "ok" }))
}

/// Called in `main.rs` (and the HTTP tests) to mount every route.
pub fn configure_app_routes(cfg: &mut web::ServiceConfig) {
  cfg.service(
    web::scope("/api/v1")
      .route("/health", web::get().to(health_check_handler))
      .service(
        web::scope("/auth")
          .route("/signup", web::post().to(auth_handlers::signup_handler))
          .route("/signin", web::post().to(auth_handlers::signin_handler))
          .route("/signout", web::post().to(auth_handlers::signout_handler))
          .route("/user", web::get().to(auth_handlers::current_user_handler)),
      )
      .service(
        web::scope("/products")
          .route("", web::get().to(product_handlers::list_products_handler))
          .route("/{product_id}", web::get().to(product_handlers::get_product_handler)),
      )
      .route("/checkout", web::post().to(checkout_handlers::checkout_handler))
      .service(
        web::scope("/orders")
          .route("", web::get().to(order_handlers::list_orders_handler))
          .route("/{order_id}", web::get().to(order_handlers::get_order_handler)),
      )
      .route("/notifications", web::get().to(order_handlers::list_notifications_handler)),
  );

  // Fulfillment functions answer CORS for any origin, errors included.
  cfg.service(
    web::scope("/functions/v1")
      .wrap(
        DefaultHeaders::new()
          .add(("Access-Control-Allow-Origin", "*"))
          .add(("Access-Control-Allow-Headers", CORS_ALLOW_HEADERS)),
      )
      .service(
        web::resource("/process-order")
          .app_data(function_handlers::order_json_config())
          .route(web::post().to(function_handlers::process_order_handler))
          .route(web::method(Method::OPTIONS).to(function_handlers::preflight_handler)),
      )
      .service(
        web::resource("/process-payment")
          .app_data(function_handlers::payment_json_config())
          .route(web::post().to(function_handlers::process_payment_handler))
          .route(web::method(Method::OPTIONS).to(function_handlers::preflight_handler)),
      ),
  );
}
