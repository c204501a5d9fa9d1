// Core moderation module - report classification via an external agent.

pub mod moderation_models;
pub mod moderation_service;
pub mod reply_parsing;

pub use moderation_models::*;
pub use moderation_service::*;
