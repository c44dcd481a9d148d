// storefront/src/state.rs
use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::errors::AppError;
use crate::pipelines;
use crate::services::auth_service::AuthService;
use crate::services::payment_gateway::PaymentGateway;
use crate::services::session::SessionManager;
use crate::store::DataStore;
use orderflow::Registry;
use std::sync::Arc;

/// Collaborators shared by every request and every pipeline run.
#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn DataStore>,
  pub registry: Arc<Registry<AppError>>,
  pub sessions: Arc<SessionManager>,
  pub auth: AuthService,
  pub catalog: Catalog,
  pub gateway: Arc<dyn PaymentGateway>,
  pub config: Arc<AppConfig>,
}

impl AppState {
  /// Wires the collaborators together and registers every workflow pipeline.
  pub fn new(config: AppConfig, store: Arc<dyn DataStore>, gateway: Arc<dyn PaymentGateway>) -> Self {
    let sessions = Arc::new(SessionManager::new(config.session_ttl_secs));
    let registry = Arc::new(Registry::<AppError>::new());
    pipelines::register_all_pipelines(&registry);

    Self {
      auth: AuthService::new(store.clone(), sessions.clone()),
      catalog: Catalog::new(store.clone()),
      store,
      registry,
      sessions,
      gateway,
      config: Arc::new(config),
    }
  }
}
