//! Message Handler module for processing incoming Telegram messages

use anyhow::Result;
use teloxide::prelude::*;
use teloxide::types::{ChatAction, InputFile, User};
use tracing::{debug, error, info, warn};

use crate::dialogue::{validate_topic, SessionState};
use crate::errors::FlowError;
use crate::generation::Artifact;
use crate::localization::{parse_language, t_args_lang, t_lang};
use crate::rate_limit::RateDecision;

use super::admin::{handle_admin_command, AdminAction};
use super::ui_builder::{
    format_flow_error, format_help, format_language_codes, format_slide_count_prompt,
    format_template_ids, format_welcome, language_keyboard, main_menu_keyboard, menu_action,
    template_keyboard, MenuAction,
};
use super::{AppState, Command};

/// Language chosen with `/language`, else the Telegram client language
pub(crate) async fn user_language(state: &AppState, user: &User) -> Option<String> {
    let user_id = user.id.0 as i64;
    match state.preferences.language(user_id).await {
        Ok(Some(language)) => Some(language),
        Ok(None) => user.language_code.clone(),
        Err(e) => {
            warn!(user_id, error = %e, "Failed to read language preference");
            user.language_code.clone()
        }
    }
}

/// Apply the rate limit, telling the user when they are throttled
pub(crate) async fn admit(
    bot: &Bot,
    state: &AppState,
    chat_id: ChatId,
    user_id: i64,
    language_code: Option<&str>,
) -> Result<bool> {
    match state.rate_limiter.check(user_id) {
        RateDecision::Allowed => Ok(true),
        RateDecision::Limited { notify } => {
            debug!(user_id, notify, "Message rate limited");
            if notify {
                let seconds = state.rate_limiter.window().as_secs().to_string();
                bot.send_message(
                    chat_id,
                    t_args_lang("rate-limited", &[("seconds", &seconds)], language_code),
                )
                .await?;
            }
            Ok(false)
        }
    }
}

async fn send_flow_error(
    bot: &Bot,
    state: &AppState,
    chat_id: ChatId,
    error: &FlowError,
    language_code: Option<&str>,
) -> Result<()> {
    let text = format_flow_error(
        error,
        state.sessions.limits(),
        state.sessions.orchestrator().templates(),
        language_code,
    );
    bot.send_message(chat_id, text).await?;
    Ok(())
}

pub async fn command_handler(bot: Bot, msg: Message, cmd: Command, state: AppState) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let user_id = user.id.0 as i64;
    let language = user_language(&state, user).await;
    let language_code = language.as_deref();

    if !admit(&bot, &state, msg.chat.id, user_id, language_code).await? {
        return Ok(());
    }
    debug!(user_id, command = ?cmd, "Received command");

    match cmd {
        Command::Start => handle_start(&bot, &msg, &state, user_id, language_code).await,
        Command::Help => send_help(&bot, &msg, &state, language_code).await,
        Command::About => send_about(&bot, &msg, language_code).await,
        Command::Presentation => start_presentation(&bot, msg.chat.id, &state, user_id, language_code).await,
        Command::Templates => send_templates(&bot, &msg, &state, language_code).await,
        Command::Cancel => handle_cancel(&bot, &msg, &state, user_id, language_code).await,
        Command::Language(args) => {
            handle_language(&bot, msg.chat.id, &state, user_id, &args, language_code).await
        }
        Command::Balance(args) => handle_balance(&bot, &msg, &state, user_id, &args, language_code).await,
        Command::SetTokens(args) => {
            handle_admin_command(&bot, &msg, &state, user_id, AdminAction::Set, &args, language_code).await
        }
        Command::AddTokens(args) => {
            handle_admin_command(&bot, &msg, &state, user_id, AdminAction::Add, &args, language_code).await
        }
        Command::RemoveTokens(args) => {
            handle_admin_command(&bot, &msg, &state, user_id, AdminAction::Remove, &args, language_code).await
        }
    }
}

pub async fn message_handler(bot: Bot, msg: Message, state: AppState) -> Result<()> {
    let Some(user) = msg.from.as_ref() else {
        return Ok(());
    };
    let user_id = user.id.0 as i64;
    let language = user_language(&state, user).await;
    let language_code = language.as_deref();

    if !admit(&bot, &state, msg.chat.id, user_id, language_code).await? {
        return Ok(());
    }

    let Some(text) = msg.text() else {
        debug!(user_id, "Received non-text message");
        bot.send_message(msg.chat.id, t_lang("unexpected-input", language_code))
            .await?;
        return Ok(());
    };

    if let Some(action) = menu_action(text) {
        return match action {
            MenuAction::Create => start_presentation(&bot, msg.chat.id, &state, user_id, language_code).await,
            MenuAction::Help => send_help(&bot, &msg, &state, language_code).await,
            MenuAction::About => send_about(&bot, &msg, language_code).await,
        };
    }

    if text.starts_with('/') {
        bot.send_message(msg.chat.id, t_lang("help-commands", language_code))
            .await?;
        return Ok(());
    }

    handle_dialogue_text(&bot, &msg, &state, user_id, text, language_code).await
}

/// Route free text by the current dialogue step
async fn handle_dialogue_text(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    user_id: i64,
    text: &str,
    language_code: Option<&str>,
) -> Result<()> {
    let current = state.sessions.state(user_id).await;
    debug!(user_id, state = ?current, message_length = text.len(), "Received dialogue text");

    match current {
        SessionState::Idle | SessionState::Done => {
            bot.send_message(msg.chat.id, t_lang("idle-hint", language_code))
                .reply_markup(main_menu_keyboard(language_code))
                .await?;
        }
        SessionState::AwaitingTemplate => {
            handle_template_choice(bot, state, msg.chat.id, user_id, text, language_code).await?;
        }
        SessionState::AwaitingCount => match state.sessions.submit_count(user_id, text).await {
            Ok(_) => {
                bot.send_message(msg.chat.id, t_lang("ask-topic", language_code))
                    .await?;
            }
            Err(e) => send_flow_error(bot, state, msg.chat.id, &e, language_code).await?,
        },
        SessionState::AwaitingTopic => {
            handle_topic(bot, state, msg.chat.id, user_id, text, language_code).await?;
        }
        SessionState::Generating => {
            bot.send_message(msg.chat.id, t_lang("generation-in-progress", language_code))
                .await?;
        }
    }
    Ok(())
}

/// Template chosen by text or by inline button
pub(crate) async fn handle_template_choice(
    bot: &Bot,
    state: &AppState,
    chat_id: ChatId,
    user_id: i64,
    raw: &str,
    language_code: Option<&str>,
) -> Result<()> {
    match state.sessions.submit_template(user_id, raw).await {
        Ok(_) => {
            let prompt = format_slide_count_prompt(state.sessions.limits(), language_code);
            bot.send_message(chat_id, prompt).await?;
        }
        Err(e) => send_flow_error(bot, state, chat_id, &e, language_code).await?,
    }
    Ok(())
}

async fn handle_topic(
    bot: &Bot,
    state: &AppState,
    chat_id: ChatId,
    user_id: i64,
    text: &str,
    language_code: Option<&str>,
) -> Result<()> {
    // Reject before announcing generation; the store validates again under its lock
    if let Err(e) = validate_topic(text, state.sessions.limits()) {
        return send_flow_error(bot, state, chat_id, &e, language_code).await;
    }

    bot.send_message(chat_id, t_lang("generating", language_code))
        .await?;
    if let Err(e) = bot.send_chat_action(chat_id, ChatAction::UploadDocument).await {
        debug!(user_id, error = %e, "Failed to send chat action");
    }

    match state.sessions.submit_topic(user_id, text).await {
        Ok(artifact) => send_artifact(bot, chat_id, user_id, &artifact, language_code).await,
        Err(e) => {
            warn!(user_id, error = %e, "Presentation request failed");
            let text = format_flow_error(
                &e,
                state.sessions.limits(),
                state.sessions.orchestrator().templates(),
                language_code,
            );
            bot.send_message(chat_id, text)
                .reply_markup(main_menu_keyboard(language_code))
                .await?;
            Ok(())
        }
    }
}

async fn send_artifact(
    bot: &Bot,
    chat_id: ChatId,
    user_id: i64,
    artifact: &Artifact,
    language_code: Option<&str>,
) -> Result<()> {
    let slides = artifact.slide_count.to_string();
    let tokens = artifact.remaining_tokens.to_string();
    let mut caption = t_args_lang("ready", &[("slides", &slides), ("tokens", &tokens)], language_code);
    if artifact.used_fallback {
        caption = format!("{caption}\n{}", t_lang("ready-fallback", language_code));
    }

    let sent = bot
        .send_document(chat_id, InputFile::file(artifact.path.clone()))
        .caption(caption)
        .reply_markup(main_menu_keyboard(language_code))
        .await;

    // The artifact lives in its own directory
    if let Some(dir) = artifact.path.parent() {
        if let Err(e) = tokio::fs::remove_dir_all(dir).await {
            warn!(user_id, dir = %dir.display(), error = %e, "Failed to remove artifact directory");
        }
    }

    match sent {
        Ok(_) => {
            info!(user_id, slides = artifact.slide_count, "Presentation delivered");
            Ok(())
        }
        Err(e) => {
            error!(user_id, error = %e, "Failed to send presentation");
            bot.send_message(chat_id, t_lang("generic-error", language_code))
                .await?;
            Ok(())
        }
    }
}

/// Enter the dialogue if the user can afford a presentation
pub(crate) async fn start_presentation(
    bot: &Bot,
    chat_id: ChatId,
    state: &AppState,
    user_id: i64,
    language_code: Option<&str>,
) -> Result<()> {
    let balance = match state.quota.get_balance(user_id).await {
        Ok(balance) => balance,
        Err(e) => {
            error!(user_id, error = %e, "Failed to read token balance");
            bot.send_message(chat_id, t_lang("generic-error", language_code))
                .await?;
            return Ok(());
        }
    };
    if balance <= 0 {
        bot.send_message(chat_id, t_lang("no-tokens", language_code))
            .await?;
        return Ok(());
    }

    let templates = state.sessions.orchestrator().templates();
    if templates.is_empty() {
        warn!(user_id, "Presentation requested but no templates are installed");
        bot.send_message(chat_id, t_lang("no-templates", language_code))
            .await?;
        return Ok(());
    }

    match state.sessions.start(user_id, language_code).await {
        Ok(_) => {
            let text = t_args_lang(
                "choose-template",
                &[("available", &format_template_ids(templates))],
                language_code,
            );
            bot.send_message(chat_id, text)
                .reply_markup(template_keyboard(templates, language_code))
                .await?;
        }
        Err(FlowError::UnexpectedInput) => {
            bot.send_message(chat_id, t_lang("generation-in-progress", language_code))
                .await?;
        }
        Err(e) => send_flow_error(bot, state, chat_id, &e, language_code).await?,
    }
    Ok(())
}

async fn handle_start(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    user_id: i64,
    language_code: Option<&str>,
) -> Result<()> {
    if let Err(FlowError::UnexpectedInput) = state.sessions.cancel(user_id).await {
        bot.send_message(msg.chat.id, t_lang("generation-in-progress", language_code))
            .await?;
        return Ok(());
    }

    let text = match state.quota.get_balance(user_id).await {
        Ok(tokens) => format_welcome(tokens, language_code),
        Err(e) => {
            error!(user_id, error = %e, "Failed to read token balance");
            t_lang("generic-error", language_code)
        }
    };

    bot.send_message(msg.chat.id, text)
        .reply_markup(main_menu_keyboard(language_code))
        .await?;
    Ok(())
}

async fn handle_cancel(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    user_id: i64,
    language_code: Option<&str>,
) -> Result<()> {
    let key = match state.sessions.cancel(user_id).await {
        Ok(true) => "cancelled",
        Ok(false) => "nothing-to-cancel",
        Err(_) => "generation-in-progress",
    };
    bot.send_message(msg.chat.id, t_lang(key, language_code))
        .reply_markup(main_menu_keyboard(language_code))
        .await?;
    Ok(())
}

async fn send_help(bot: &Bot, msg: &Message, state: &AppState, language_code: Option<&str>) -> Result<()> {
    bot.send_message(msg.chat.id, format_help(state.sessions.limits(), language_code))
        .reply_markup(main_menu_keyboard(language_code))
        .await?;
    Ok(())
}

async fn send_about(bot: &Bot, msg: &Message, language_code: Option<&str>) -> Result<()> {
    bot.send_message(msg.chat.id, t_lang("about-text", language_code))
        .await?;
    Ok(())
}

async fn send_templates(bot: &Bot, msg: &Message, state: &AppState, language_code: Option<&str>) -> Result<()> {
    let templates = state.sessions.orchestrator().templates();
    let text = if templates.is_empty() {
        t_lang("no-templates", language_code)
    } else {
        t_args_lang(
            "templates-list",
            &[("available", &format_template_ids(templates))],
            language_code,
        )
    };
    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}

async fn handle_language(
    bot: &Bot,
    chat_id: ChatId,
    state: &AppState,
    user_id: i64,
    args: &str,
    language_code: Option<&str>,
) -> Result<()> {
    if args.trim().is_empty() {
        bot.send_message(chat_id, t_lang("language-prompt", language_code))
            .reply_markup(language_keyboard())
            .await?;
        return Ok(());
    }
    apply_language_choice(bot, state, chat_id, user_id, args, language_code).await
}

/// Store the chosen language and confirm in that language
///
/// An unfinished dialogue is dropped, as with `/start`.
pub(crate) async fn apply_language_choice(
    bot: &Bot,
    state: &AppState,
    chat_id: ChatId,
    user_id: i64,
    raw: &str,
    language_code: Option<&str>,
) -> Result<()> {
    let Some(language) = parse_language(raw) else {
        let text = t_args_lang(
            "language-unknown",
            &[("available", &format_language_codes())],
            language_code,
        );
        bot.send_message(chat_id, text).await?;
        return Ok(());
    };

    if let Err(e) = state.preferences.set_language(user_id, language).await {
        error!(user_id, error = %e, "Failed to store language preference");
        bot.send_message(chat_id, t_lang("generic-error", language_code))
            .await?;
        return Ok(());
    }
    if let Err(e) = state.sessions.cancel(user_id).await {
        debug!(user_id, error = %e, "Dialogue kept while generating");
    }

    let lang = Some(language);
    bot.send_message(chat_id, t_lang("language-changed", lang))
        .reply_markup(main_menu_keyboard(lang))
        .await?;
    Ok(())
}

async fn handle_balance(
    bot: &Bot,
    msg: &Message,
    state: &AppState,
    user_id: i64,
    args: &str,
    language_code: Option<&str>,
) -> Result<()> {
    let args = args.trim();

    let text = if args.is_empty() {
        match state.quota.get_balance(user_id).await {
            Ok(tokens) => t_args_lang("balance-own", &[("tokens", &tokens.to_string())], language_code),
            Err(e) => {
                error!(user_id, error = %e, "Failed to read token balance");
                t_lang("generic-error", language_code)
            }
        }
    } else if !state.config.is_admin(user_id) {
        warn!(user_id, "Non-admin requested another user's balance");
        t_lang("access-denied", language_code)
    } else {
        match args.parse::<i64>() {
            Ok(target) => match state.quota.get_balance(target).await {
                Ok(tokens) => t_args_lang(
                    "balance-user",
                    &[("user_id", &target.to_string()), ("tokens", &tokens.to_string())],
                    language_code,
                ),
                Err(e) => {
                    error!(target_user_id = target, error = %e, "Failed to read token balance");
                    t_lang("generic-error", language_code)
                }
            },
            Err(_) => t_lang("balance-usage", language_code),
        }
    };

    bot.send_message(msg.chat.id, text).await?;
    Ok(())
}
