use async_trait::async_trait;

/// Work executed on every scheduler tick.
///
/// Ticks of one job never overlap. Implementations report their own
/// failures; a tick has no result.
#[async_trait]
pub trait CronJob: Send + Sync + 'static {
    async fn run(&self);
}
