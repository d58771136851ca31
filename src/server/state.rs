use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::notification::{NotificationDispatcher, NotificationProducer};
use crate::postgres::PostgresPool;
use crate::queue::NotificationQueue;
use crate::redis::RedisPool;
use crate::scheduler::SchedulerRegistry;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub scheduler: Arc<SchedulerRegistry>,
    pub queue: Arc<dyn NotificationQueue>,
    pub producer: NotificationProducer,
    pub dispatcher: Arc<NotificationDispatcher>,
    pub redis_pool: Option<Arc<RedisPool>>,
    pub postgres_pool: Option<PostgresPool>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(
        settings: Settings,
        scheduler: Arc<SchedulerRegistry>,
        queue: Arc<dyn NotificationQueue>,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        let producer = NotificationProducer::new(queue.clone());

        Self {
            settings: Arc::new(settings),
            scheduler,
            queue,
            producer,
            dispatcher,
            redis_pool: None,
            postgres_pool: None,
            start_time: Instant::now(),
        }
    }

    pub fn with_redis_pool(mut self, pool: Arc<RedisPool>) -> Self {
        self.redis_pool = Some(pool);
        self
    }

    pub fn with_postgres_pool(mut self, pool: PostgresPool) -> Self {
        self.postgres_pool = Some(pool);
        self
    }
}
