// storefront/src/main.rs

use actix_web::{web as actix_data, App, HttpServer};
use std::sync::Arc;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

use storefront::config::AppConfig;
use storefront::seed;
use storefront::services::payment_gateway::ApprovingGateway;
use storefront::state::AppState;
use storefront::store::{DataStore, MemoryStore, PgStore};
use storefront::web::configure_app_routes;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .with_span_events(FmtSpan::CLOSE)
    .init();

  tracing::info!("Starting storefront server...");

  let app_config = AppConfig::from_env().map_err(|e| {
    tracing::error!(error = %e, "Failed to load application configuration.");
    e
  })?;

  let store: Arc<dyn DataStore> = match app_config.database_url.as_deref() {
    Some(database_url) => {
      let pg = PgStore::connect(database_url).await?;
      pg.apply_schema().await?;
      tracing::info!("Connected to the database and applied the schema.");
      Arc::new(pg)
    }
    None => {
      tracing::warn!("DATABASE_URL not set, using the in-memory store.");
      Arc::new(MemoryStore::new())
    }
  };

  if app_config.seed_db {
    seed::seed_demo_catalog(store.as_ref()).await?;
  }

  let server_address = app_config.bind_address();
  let app_state = AppState::new(app_config, store, Arc::new(ApprovingGateway));

  tracing::info!("Binding server to {}...", server_address);
  HttpServer::new(move || {
    App::new()
      .app_data(actix_data::Data::new(app_state.clone()))
      .wrap(tracing_actix_web::TracingLogger::default())
      .configure(configure_app_routes)
  })
  .bind(&server_address)?
  .run()
  .await?;
  Ok(())
}
