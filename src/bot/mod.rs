//! Bot module for handling Telegram interactions
//!
//! This module is split into several submodules:
//! - `message_handler`: Handles commands, menu buttons and dialogue text
//! - `callback_handler`: Handles inline keyboard callback queries
//! - `admin`: Token balance commands reserved for the administrator
//! - `ui_builder`: Creates keyboards and formats messages

pub mod admin;
pub mod callback_handler;
pub mod message_handler;
pub mod ui_builder;

use std::sync::Arc;
use teloxide::dispatching::UpdateHandler;
use teloxide::prelude::*;
use teloxide::utils::command::BotCommands;

use crate::config::BotConfig;
use crate::preferences::PreferenceStore;
use crate::quota::QuotaStore;
use crate::rate_limit::RateLimiter;
use crate::session_store::SessionStore;

pub use callback_handler::callback_handler;
pub use message_handler::{command_handler, message_handler};

#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "snake_case", description = "Available commands:")]
pub enum Command {
    #[command(description = "show the main menu")]
    Start,
    #[command(description = "how to use the bot")]
    Help,
    #[command(description = "about the bot")]
    About,
    #[command(description = "create a presentation")]
    Presentation,
    #[command(description = "list background templates")]
    Templates,
    #[command(description = "cancel the current presentation")]
    Cancel,
    #[command(description = "choose the bot language")]
    Language(String),
    #[command(description = "show token balance")]
    Balance(String),
    #[command(description = "admin: set balance <user_id> <amount>")]
    SetTokens(String),
    #[command(description = "admin: add tokens <user_id> <amount>")]
    AddTokens(String),
    #[command(description = "admin: remove tokens <user_id> <amount>")]
    RemoveTokens(String),
}

/// Shared handler dependencies, injected through the dispatcher
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub quota: QuotaStore,
    pub preferences: PreferenceStore,
    pub rate_limiter: Arc<RateLimiter>,
    pub config: Arc<BotConfig>,
}

/// Update routing: commands first, then other messages, then button presses
pub fn schema() -> UpdateHandler<anyhow::Error> {
    dptree::entry()
        .branch(
            Update::filter_message()
                .filter_command::<Command>()
                .endpoint(command_handler),
        )
        .branch(Update::filter_message().endpoint(message_handler))
        .branch(Update::filter_callback_query().endpoint(callback_handler))
}
