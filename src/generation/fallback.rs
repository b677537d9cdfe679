//! Static slide content used when no provider output is available

use super::SlideContent;
use crate::localization::{t_args_lang, t_lang};

/// Deterministic slides: an overview, numbered body slides and conclusions
///
/// A single slide is just the overview.
pub fn fallback_slides(topic: &str, slide_count: u32, language: &str) -> Vec<SlideContent> {
    let lang = Some(language);
    let bullets = |prefix: &str| -> Vec<String> {
        (1..=3)
            .map(|i| t_lang(&format!("{prefix}-{i}"), lang))
            .collect()
    };

    (1..=slide_count)
        .map(|index| {
            if index == 1 {
                SlideContent {
                    title: t_args_lang("fallback-overview-title", &[("topic", topic)], lang),
                    bullets: bullets("fallback-overview"),
                }
            } else if index == slide_count {
                SlideContent {
                    title: t_lang("fallback-conclusion-title", lang),
                    bullets: bullets("fallback-conclusion"),
                }
            } else {
                let index = index.to_string();
                SlideContent {
                    title: t_args_lang(
                        "fallback-body-title",
                        &[("topic", topic), ("index", &index)],
                        lang,
                    ),
                    bullets: bullets("fallback-body"),
                }
            }
        })
        .collect()
}

/// Truncate or pad `slides` to exactly `slide_count`
///
/// Missing slides are taken from a fallback set sized to the gap.
pub fn fit_slide_count(
    mut slides: Vec<SlideContent>,
    topic: &str,
    slide_count: u32,
    language: &str,
) -> Vec<SlideContent> {
    let wanted = slide_count as usize;
    if slides.len() < wanted {
        let missing = (wanted - slides.len()) as u32;
        slides.extend(fallback_slides(topic, missing, language));
    }
    slides.truncate(wanted);
    slides
}
