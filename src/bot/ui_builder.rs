//! UI Builder module for creating keyboards and formatting messages

use teloxide::types::{InlineKeyboardButton, InlineKeyboardMarkup, KeyboardButton, KeyboardMarkup};

use crate::config::FlowLimits;
use crate::errors::FlowError;
use crate::localization::{supported_languages, t_args_lang, t_lang};
use crate::templates::TemplateCatalog;

/// Callback data prefix of the template choice buttons
pub const TEMPLATE_CALLBACK_PREFIX: &str = "template:";
pub const LANGUAGE_CALLBACK_PREFIX: &str = "language:";

const TEMPLATE_BUTTONS_PER_ROW: usize = 4;

/// Main menu reply buttons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    Create,
    Help,
    About,
}

/// Create the main menu reply keyboard
pub fn main_menu_keyboard(language_code: Option<&str>) -> KeyboardMarkup {
    KeyboardMarkup::new(vec![
        vec![KeyboardButton::new(t_lang("menu-create", language_code))],
        vec![
            KeyboardButton::new(t_lang("menu-about", language_code)),
            KeyboardButton::new(t_lang("menu-help", language_code)),
        ],
    ])
    .resize_keyboard()
}

/// Recognize a main menu button press in any supported language
pub fn menu_action(text: &str) -> Option<MenuAction> {
    let text = text.trim();
    supported_languages().find_map(|lang| {
        let lang = Some(lang);
        if text == t_lang("menu-create", lang) {
            Some(MenuAction::Create)
        } else if text == t_lang("menu-help", lang) {
            Some(MenuAction::Help)
        } else if text == t_lang("menu-about", lang) {
            Some(MenuAction::About)
        } else {
            None
        }
    })
}

/// Create inline keyboard with one button per template
pub fn template_keyboard(templates: &TemplateCatalog, language_code: Option<&str>) -> InlineKeyboardMarkup {
    let buttons: Vec<InlineKeyboardButton> = templates
        .ids()
        .into_iter()
        .map(|id| {
            let id = id.to_string();
            InlineKeyboardButton::callback(
                t_args_lang("template-button", &[("id", &id)], language_code),
                format!("{TEMPLATE_CALLBACK_PREFIX}{id}"),
            )
        })
        .collect();

    InlineKeyboardMarkup::new(
        buttons
            .chunks(TEMPLATE_BUTTONS_PER_ROW)
            .map(|row| row.to_vec())
            .collect::<Vec<_>>(),
    )
}

/// One button per supported language, each labelled in that language
pub fn language_keyboard() -> InlineKeyboardMarkup {
    let buttons: Vec<InlineKeyboardButton> = supported_languages()
        .map(|lang| {
            InlineKeyboardButton::callback(
                t_lang("language-label", Some(lang)),
                format!("{LANGUAGE_CALLBACK_PREFIX}{lang}"),
            )
        })
        .collect();
    InlineKeyboardMarkup::new(vec![buttons])
}

/// Comma separated language codes
pub fn format_language_codes() -> String {
    supported_languages().collect::<Vec<_>>().join(", ")
}

/// Comma separated template ids
pub fn format_template_ids(templates: &TemplateCatalog) -> String {
    templates
        .ids()
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn format_welcome(tokens: i64, language_code: Option<&str>) -> String {
    let tokens = tokens.to_string();
    format!(
        "👋 {}\n\n{}\n\n{}",
        t_lang("welcome-title", language_code),
        t_lang("welcome-description", language_code),
        t_args_lang("tokens-info", &[("tokens", &tokens)], language_code)
    )
}

pub fn format_help(limits: &FlowLimits, language_code: Option<&str>) -> String {
    let min = limits.min_slides.to_string();
    let max = limits.max_slides.to_string();
    [
        t_lang("help-title", language_code),
        t_lang("help-step1", language_code),
        t_lang("help-step2", language_code),
        t_args_lang("help-step3", &[("min", &min), ("max", &max)], language_code),
        t_lang("help-step4", language_code),
        t_lang("help-cost", language_code),
        t_lang("help-commands", language_code),
    ]
    .join("\n")
}

pub fn format_slide_count_prompt(limits: &FlowLimits, language_code: Option<&str>) -> String {
    let min = limits.min_slides.to_string();
    let max = limits.max_slides.to_string();
    t_args_lang("ask-slide-count", &[("min", &min), ("max", &max)], language_code)
}

/// User-facing text for a rejected input or failed request
pub fn format_flow_error(
    error: &FlowError,
    limits: &FlowLimits,
    templates: &TemplateCatalog,
    language_code: Option<&str>,
) -> String {
    match error {
        FlowError::InvalidTemplate => t_args_lang(
            "invalid-template",
            &[("available", &format_template_ids(templates))],
            language_code,
        ),
        FlowError::InvalidCount => {
            let min = limits.min_slides.to_string();
            let max = limits.max_slides.to_string();
            t_args_lang("invalid-count", &[("min", &min), ("max", &max)], language_code)
        }
        FlowError::InvalidTopic => {
            let min = limits.min_topic_chars.to_string();
            let max = limits.max_topic_chars.to_string();
            t_args_lang("invalid-topic", &[("min", &min), ("max", &max)], language_code)
        }
        FlowError::UnexpectedInput => t_lang("unexpected-input", language_code),
        FlowError::InsufficientQuota { .. } => t_lang("no-tokens", language_code),
        FlowError::BuildFailed(_) => t_lang("build-failed", language_code),
        FlowError::Storage(_) => t_lang("generic-error", language_code),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::{TemplateAsset, TemplateFormat};
    use std::path::PathBuf;

    fn catalog(ids: &[u32]) -> TemplateCatalog {
        TemplateCatalog::from_assets(ids.iter().map(|&id| TemplateAsset {
            id,
            path: PathBuf::from(format!("{id}.png")),
            format: TemplateFormat::Png,
        }))
    }

    #[test]
    fn test_menu_action_matches_every_language() {
        assert_eq!(menu_action("Create presentation"), Some(MenuAction::Create));
        assert_eq!(menu_action("Создать презентацию"), Some(MenuAction::Create));
        assert_eq!(menu_action(" Help "), Some(MenuAction::Help));
        assert_eq!(menu_action("О боте"), Some(MenuAction::About));
        assert_eq!(menu_action("Space exploration"), None);
    }

    #[test]
    fn test_template_keyboard_layout() {
        let keyboard = template_keyboard(&catalog(&[1, 2, 3, 4, 5, 6]), Some("en"));
        assert_eq!(keyboard.inline_keyboard.len(), 2);
        assert_eq!(keyboard.inline_keyboard[0].len(), 4);
        assert_eq!(keyboard.inline_keyboard[1].len(), 2);
        assert_eq!(keyboard.inline_keyboard[0][0].text, "Template 1");
    }

    #[test]
    fn test_language_keyboard() {
        let keyboard = language_keyboard();
        let row = &keyboard.inline_keyboard[0];
        let labels: Vec<&str> = row.iter().map(|b| b.text.as_str()).collect();
        assert_eq!(labels, vec!["English", "Русский"]);
        assert_eq!(format_language_codes(), "en, ru");
    }

    #[test]
    fn test_flow_error_messages_include_bounds() {
        let limits = FlowLimits::default();
        let templates = catalog(&[1, 3]);

        let text = format_flow_error(&FlowError::InvalidCount, &limits, &templates, Some("en"));
        assert!(text.contains("1") && text.contains("30"));

        let text = format_flow_error(&FlowError::InvalidTemplate, &limits, &templates, Some("en"));
        assert!(text.contains("1, 3"));
    }
}
