// Infrastructure
pub mod config;
pub mod error;
pub mod metrics;
pub mod postgres;
pub mod redis;
pub mod telemetry;

// Domain
pub mod mail;
pub mod notification;
pub mod queue;
pub mod scheduler;
pub mod template;
pub mod users;

// Application
pub mod api;
pub mod server;
pub mod tasks;
