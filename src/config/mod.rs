mod settings;

pub use settings::{
    ApiConfig, AppConfig, DatabaseConfig, LogFormat, LoggingConfig, MailConfig, OtelConfig,
    QueueConfig, RedisConfig, SchedulerConfig, ServerConfig, Settings, TemplateConfig,
};
