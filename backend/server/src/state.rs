use std::sync::Arc;

use sqlx::PgPool;

use super::{config::Config, database::init_pool};

pub struct State {
    pub config: Config,
    pub pool: PgPool,
}

impl State {
    pub async fn new(config: Config) -> anyhow::Result<Arc<Self>> {
        let pool = init_pool(&config.database_url, config.max_connections).await?;

        Ok(Arc::new(Self { config, pool }))
    }
}
