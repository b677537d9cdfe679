use anyhow::Result;
use std::path::PathBuf;

use presentations::config::FlowLimits;
use presentations::dialogue::{
    transition, validate_slide_count, validate_topic, FlowRules, SessionEvent, SessionState,
    UserSession,
};
use presentations::errors::FlowError;
use presentations::templates::{TemplateAsset, TemplateCatalog, TemplateFormat};

fn catalog() -> TemplateCatalog {
    TemplateCatalog::from_assets([1, 4].map(|id| TemplateAsset {
        id,
        path: PathBuf::from(format!("templates/{id}.jpg")),
        format: TemplateFormat::Jpeg,
    }))
}

/// Custom bounds replace the defaults
#[test]
fn test_custom_limits_are_applied() -> Result<()> {
    let limits = FlowLimits {
        min_slides: 3,
        max_slides: 10,
        min_topic_chars: 5,
        max_topic_chars: 20,
    };

    assert_eq!(validate_slide_count("2", &limits), Err(FlowError::InvalidCount));
    assert_eq!(validate_slide_count("10", &limits), Ok(10));
    assert_eq!(validate_topic("Rust", &limits), Err(FlowError::InvalidTopic));
    assert!(validate_topic("Rust async", &limits).is_ok());

    Ok(())
}

/// Session state survives a serde_json round trip
#[test]
fn test_session_serialization() -> Result<()> {
    let catalog = catalog();
    let limits = FlowLimits::default();
    let rules = FlowRules {
        templates: &catalog,
        limits: &limits,
    };

    let mut session = UserSession::new(77);
    session.language_code = Some("ru".to_string());
    transition(&mut session, SessionEvent::Start, &rules)?;
    transition(&mut session, SessionEvent::Template("4"), &rules)?;

    let json = serde_json::to_string(&session)?;
    assert!(json.contains("\"AwaitingCount\""));

    let restored: UserSession = serde_json::from_str(&json)?;
    assert_eq!(restored, session);
    Ok(())
}

/// Restarting mid-dialogue discards collected input but keeps the language
#[test]
fn test_restart_discards_progress() -> Result<()> {
    let catalog = catalog();
    let limits = FlowLimits::default();
    let rules = FlowRules {
        templates: &catalog,
        limits: &limits,
    };

    let mut session = UserSession::new(1);
    session.language_code = Some("en".to_string());
    transition(&mut session, SessionEvent::Start, &rules)?;
    transition(&mut session, SessionEvent::Template("1"), &rules)?;
    transition(&mut session, SessionEvent::Count("12"), &rules)?;

    assert_eq!(
        transition(&mut session, SessionEvent::Start, &rules)?,
        SessionState::AwaitingTemplate
    );
    assert_eq!(session.template_id, None);
    assert_eq!(session.slide_count, None);
    assert_eq!(session.language_code.as_deref(), Some("en"));

    // Failed generation folds back to Idle
    transition(&mut session, SessionEvent::Template("1"), &rules)?;
    transition(&mut session, SessionEvent::Count("3"), &rules)?;
    transition(&mut session, SessionEvent::Topic("Deep sea"), &rules)?;
    assert_eq!(
        transition(&mut session, SessionEvent::Fail, &rules)?,
        SessionState::Idle
    );
    assert_eq!(session.topic, None);
    Ok(())
}
