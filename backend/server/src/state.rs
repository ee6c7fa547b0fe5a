use std::sync::Arc;

use super::{backend::BackendClient, config::Config};

pub struct State {
    pub config: Config,
    pub backend: BackendClient,
}

impl State {
    pub fn new(config: Config) -> Result<Arc<Self>, reqwest::Error> {
        let backend = BackendClient::new(config.backend_base_url.clone())?;

        Ok(Arc::new(Self { config, backend }))
    }
}
