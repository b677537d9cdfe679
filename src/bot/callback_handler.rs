//! Callback Handler module for processing inline keyboard callback queries

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::CallbackQuery;
use tracing::debug;

use crate::localization::t_args_lang;
use crate::rate_limit::RateDecision;

use super::message_handler::{apply_language_choice, handle_template_choice, user_language};
use super::ui_builder::{LANGUAGE_CALLBACK_PREFIX, TEMPLATE_CALLBACK_PREFIX};
use super::AppState;

/// Handle callback queries from inline keyboards
pub async fn callback_handler(bot: Bot, q: CallbackQuery, state: AppState) -> Result<()> {
    let user_id = q.from.id.0 as i64;
    let language = user_language(&state, &q.from).await;
    let language_code = language.as_deref();
    debug!(user_id, data = ?q.data, "Received callback query");

    if let RateDecision::Limited { notify } = state.rate_limiter.check(user_id) {
        let mut answer = bot.answer_callback_query(q.id.clone());
        if notify {
            let seconds = state.rate_limiter.window().as_secs().to_string();
            answer = answer.text(t_args_lang("rate-limited", &[("seconds", &seconds)], language_code));
        }
        answer.await?;
        return Ok(());
    }

    // Stop the button spinner
    bot.answer_callback_query(q.id.clone()).await?;

    let chat_id = q
        .message
        .as_ref()
        .map(|message| message.chat().id)
        .unwrap_or_else(|| ChatId::from(q.from.id));

    let data = q.data.as_deref().unwrap_or_default();
    if let Some(raw) = data.strip_prefix(TEMPLATE_CALLBACK_PREFIX) {
        handle_template_choice(&bot, &state, chat_id, user_id, raw, language_code).await
    } else if let Some(raw) = data.strip_prefix(LANGUAGE_CALLBACK_PREFIX) {
        apply_language_choice(&bot, &state, chat_id, user_id, raw, language_code).await
    } else {
        debug!(user_id, data, "Ignoring unknown callback data");
        Ok(())
    }
}
