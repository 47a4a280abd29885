pub mod api;
pub mod domain;
pub mod elevenlabs;
pub mod entities;
pub mod metrics;
pub mod migrator;
pub mod openai;
pub mod telemetry;
pub mod workflow;

pub use sea_orm;
