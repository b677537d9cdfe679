//! Token balance commands reserved for the administrator

use anyhow::Result;
use teloxide::prelude::*;
use tracing::{error, info, warn};

use crate::errors::QuotaError;
use crate::localization::{t_args_lang, t_lang};

use super::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    Set,
    Add,
    Remove,
}

impl AdminAction {
    pub fn command(self) -> &'static str {
        match self {
            AdminAction::Set => "/set_tokens",
            AdminAction::Add => "/add_tokens",
            AdminAction::Remove => "/remove_tokens",
        }
    }
}

/// Parse `<user_id> <amount>`
pub fn parse_admin_args(args: &str) -> Option<(i64, i64)> {
    let mut parts = args.split_whitespace();
    let user_id = parts.next()?.parse().ok()?;
    let amount = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((user_id, amount))
}

pub async fn handle_admin_command(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    user_id: i64,
    action: AdminAction,
    args: &str,
    language_code: Option<&str>,
) -> Result<()> {
    if !state.config.is_admin(user_id) {
        warn!(user_id, command = action.command(), "Admin command denied");
        bot.send_message(msg.chat.id, t_lang("access-denied", language_code))
            .await?;
        return Ok(());
    }

    let Some((target, amount)) = parse_admin_args(args) else {
        let usage = t_args_lang("admin-usage", &[("command", action.command())], language_code);
        bot.send_message(msg.chat.id, usage).await?;
        return Ok(());
    };

    let result = match action {
        AdminAction::Set => state.quota.set_balance(target, amount).await,
        AdminAction::Add => state.quota.add_tokens(target, amount).await,
        AdminAction::Remove => state.quota.remove_tokens(target, amount).await,
    };

    let text = match result {
        Ok(tokens) => {
            info!(admin_id = user_id, target_user_id = target, amount, tokens, ?action, "Admin changed balance");
            let target = target.to_string();
            let amount = amount.to_string();
            let tokens = tokens.to_string();
            let key = match action {
                AdminAction::Set => "admin-balance-set",
                AdminAction::Add => "admin-tokens-added",
                AdminAction::Remove => "admin-tokens-removed",
            };
            t_args_lang(
                key,
                &[("user_id", &target), ("amount", &amount), ("tokens", &tokens)],
                language_code,
            )
        }
        Err(QuotaError::InvalidAmount(_)) => t_lang("admin-invalid-amount", language_code),
        Err(e) => {
            error!(target_user_id = target, error = %e, "Admin balance change failed");
            t_lang("generic-error", language_code)
        }
    };

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}
