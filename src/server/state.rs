use std::sync::Arc;

use crate::config::AppConfig;
use crate::errors::IdeaSwipeResult;
use crate::llm::registry::ProviderRegistry;
use crate::server::auth::{Authenticator, BearerAuth};

pub struct AppState {
    pub registry: ProviderRegistry,
    pub auth: Box<dyn Authenticator>,
}

impl AppState {
    pub fn new(registry: ProviderRegistry, auth: Box<dyn Authenticator>) -> Arc<Self> {
        Arc::new(Self { registry, auth })
    }

    pub fn from_config(config: &AppConfig) -> IdeaSwipeResult<Arc<Self>> {
        let registry = ProviderRegistry::from_config(config)?;
        registry.get_active()?;
        Ok(Self::new(registry, Box::new(BearerAuth::new(&config.auth))))
    }
}
