//! Localization of bot messages with Fluent.
//!
//! Resources are embedded at compile time from `locales/<lang>/main.ftl`.
//! Unknown languages and missing keys fall back to English.

use anyhow::{anyhow, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource};
use std::collections::HashMap;
use std::sync::OnceLock;
use unic_langid::LanguageIdentifier;

pub const DEFAULT_LANGUAGE: &str = "en";

const RESOURCES: &[(&str, &str)] = &[
    ("en", include_str!("../locales/en/main.ftl")),
    ("ru", include_str!("../locales/ru/main.ftl")),
];

/// Localization manager for the presentation bot
pub struct LocalizationManager {
    bundles: HashMap<String, FluentBundle<FluentResource>>,
}

impl LocalizationManager {
    /// Create a new localization manager with every bundled language
    pub fn new() -> Result<Self> {
        let mut bundles = HashMap::new();

        for (lang, source) in RESOURCES {
            let locale: LanguageIdentifier = lang.parse()?;
            bundles.insert(lang.to_string(), Self::create_bundle(locale, source)?);
        }

        Ok(Self { bundles })
    }

    fn create_bundle(
        locale: LanguageIdentifier,
        source: &str,
    ) -> Result<FluentBundle<FluentResource>> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale.clone()]);
        // Telegram shows the Unicode isolation marks as-is
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow!("Invalid Fluent resource for {locale}: {errors:?}"))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("Duplicate Fluent messages for {locale}: {errors:?}"))?;

        Ok(bundle)
    }

    pub fn is_language_supported(&self, lang: &str) -> bool {
        self.bundles.contains_key(lang)
    }

    /// Get a localized message in a specific language, falling back to English
    pub fn get_message_in_language(
        &self,
        key: &str,
        lang: &str,
        args: Option<&HashMap<&str, &str>>,
    ) -> String {
        let bundle = self
            .bundles
            .get(lang)
            .filter(|bundle| bundle.has_message(key))
            .or_else(|| self.bundles.get(DEFAULT_LANGUAGE));

        let Some(bundle) = bundle else {
            return format!("Missing translation: {key}");
        };
        let Some(msg) = bundle.get_message(key) else {
            return format!("Missing translation: {key}");
        };
        let Some(pattern) = msg.value() else {
            return format!("Missing value for key: {key}");
        };

        let fluent_args = args.map(|args| {
            let mut fluent_args = FluentArgs::new();
            for (k, v) in args {
                fluent_args.set(*k, v.to_string());
            }
            fluent_args
        });

        let mut errors = vec![];
        bundle
            .format_pattern(pattern, fluent_args.as_ref(), &mut errors)
            .into_owned()
    }
}

static LOCALIZATION_MANAGER: OnceLock<LocalizationManager> = OnceLock::new();

/// Initialize the global localization manager
pub fn init_localization() -> Result<()> {
    if LOCALIZATION_MANAGER.get().is_none() {
        let manager = LocalizationManager::new()?;
        let _ = LOCALIZATION_MANAGER.set(manager);
    }
    Ok(())
}

/// Get the global localization manager
pub fn get_localization_manager() -> &'static LocalizationManager {
    LOCALIZATION_MANAGER.get_or_init(|| {
        LocalizationManager::new().expect("Bundled locale resources should be valid")
    })
}

/// Languages with bundled messages
pub fn supported_languages() -> impl Iterator<Item = &'static str> {
    RESOURCES.iter().map(|(lang, _)| *lang)
}

/// Map a Telegram language code (`en-US`, `ru`) to a supported language
pub fn detect_language(language_code: Option<&str>) -> &'static str {
    let primary = language_code
        .and_then(|code| code.split(['-', '_']).next())
        .map(|code| code.to_lowercase());

    supported_languages()
        .find(|lang| primary.as_deref() == Some(*lang))
        .unwrap_or(DEFAULT_LANGUAGE)
}

/// Supported language named by its code (`ru`) or its own label (`Русский`)
pub fn parse_language(input: &str) -> Option<&'static str> {
    let input = input.trim().to_lowercase();
    supported_languages().find(|lang| {
        input == *lang || input == t_lang("language-label", Some(lang)).to_lowercase()
    })
}

/// Localized message for a Telegram language code
pub fn t_lang(key: &str, language_code: Option<&str>) -> String {
    get_localization_manager().get_message_in_language(key, detect_language(language_code), None)
}

/// Localized message with arguments for a Telegram language code
pub fn t_args_lang(key: &str, args: &[(&str, &str)], language_code: Option<&str>) -> String {
    let args_map: HashMap<&str, &str> = args.iter().cloned().collect();
    get_localization_manager().get_message_in_language(
        key,
        detect_language(language_code),
        Some(&args_map),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_detection() {
        assert_eq!(detect_language(Some("ru")), "ru");
        assert_eq!(detect_language(Some("ru-RU")), "ru");
        assert_eq!(detect_language(Some("EN_gb")), "en");
        assert_eq!(detect_language(Some("uz")), "en");
        assert_eq!(detect_language(None), "en");
    }

    #[test]
    fn test_parse_language() {
        assert_eq!(parse_language("ru"), Some("ru"));
        assert_eq!(parse_language(" EN "), Some("en"));
        assert_eq!(parse_language("Русский"), Some("ru"));
        assert_eq!(parse_language("english"), Some("en"));
        assert_eq!(parse_language("uz"), None);
        assert_eq!(parse_language(""), None);
    }

    #[test]
    fn test_every_english_key_is_translated() {
        let manager = LocalizationManager::new().unwrap();
        let en = &manager.bundles["en"];
        let ru = &manager.bundles["ru"];

        let source = RESOURCES[0].1;
        for line in source.lines() {
            let Some((key, _)) = line.split_once(" =") else { continue };
            if key.starts_with(' ') || key.starts_with('#') || key.is_empty() {
                continue;
            }
            assert!(en.has_message(key), "en missing {key}");
            assert!(ru.has_message(key), "ru missing {key}");
        }
    }
}
