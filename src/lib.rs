//! # Presentation Telegram Bot
//!
//! A Telegram bot that walks a user through choosing a background template,
//! a slide count and a topic, then builds a `.pptx` presentation from
//! AI-generated or fallback slide texts. Generations are paid for with
//! per-user tokens stored in SQLite.

pub mod bot;
pub mod circuit_breaker;
pub mod config;
pub mod db;
pub mod dialogue;
pub mod errors;
pub mod generation;
pub mod localization;
pub mod preferences;
pub mod quota;
pub mod rate_limit;
pub mod session_store;
pub mod templates;
