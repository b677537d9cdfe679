//! Presentation dialogue state and its transition function.
//!
//! Every change of a [`UserSession`] goes through [`transition`], which
//! either applies the event completely or leaves the session untouched and
//! reports why the input was rejected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::FlowLimits;
use crate::errors::FlowError;
use crate::templates::TemplateCatalog;

/// Step of the presentation dialogue
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingTemplate,
    AwaitingCount,
    AwaitingTopic,
    Generating,
    /// Terminal, folded back to `Idle` right after it is reached
    Done,
}

/// Inputs collected from one user
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UserSession {
    pub user_id: i64,
    pub state: SessionState,
    pub template_id: Option<u32>,
    pub slide_count: Option<u32>,
    pub topic: Option<String>,
    pub language_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserSession {
    pub fn new(user_id: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            state: SessionState::Idle,
            template_id: None,
            slide_count: None,
            topic: None,
            language_code: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Back to `Idle` with every collected field cleared
    pub fn clear(&mut self) {
        self.state = SessionState::Idle;
        self.template_id = None;
        self.slide_count = None;
        self.topic = None;
        self.updated_at = Utc::now();
    }
}

/// Something that happened to a session
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent<'a> {
    Start,
    Template(&'a str),
    Count(&'a str),
    Topic(&'a str),
    Cancel,
    /// Generation produced an artifact
    Finish,
    /// Generation failed
    Fail,
}

/// What the transition function validates input against
#[derive(Clone, Copy, Debug)]
pub struct FlowRules<'a> {
    pub templates: &'a TemplateCatalog,
    pub limits: &'a FlowLimits,
}

/// Apply `event` to `session` and return the new state
///
/// On error the session is left exactly as it was.
pub fn transition(
    session: &mut UserSession,
    event: SessionEvent<'_>,
    rules: &FlowRules<'_>,
) -> Result<SessionState, FlowError> {
    use SessionEvent as E;
    use SessionState as S;

    match (session.state, event) {
        (S::Generating, E::Start | E::Cancel) => return Err(FlowError::UnexpectedInput),
        (_, E::Start) => {
            session.clear();
            session.created_at = session.updated_at;
            session.state = S::AwaitingTemplate;
        }
        (_, E::Cancel) => session.clear(),
        (S::AwaitingTemplate, E::Template(raw)) => {
            session.template_id = Some(validate_template(raw, rules.templates)?);
            session.state = S::AwaitingCount;
        }
        (S::AwaitingCount, E::Count(raw)) => {
            session.slide_count = Some(validate_slide_count(raw, rules.limits)?);
            session.state = S::AwaitingTopic;
        }
        (S::AwaitingTopic, E::Topic(raw)) => {
            session.topic = Some(validate_topic(raw, rules.limits)?);
            session.state = S::Generating;
        }
        (S::Generating, E::Finish) => session.state = S::Done,
        (S::Generating, E::Fail) => session.clear(),
        _ => return Err(FlowError::UnexpectedInput),
    }

    session.updated_at = Utc::now();
    Ok(session.state)
}

/// Validates a template id input
pub fn validate_template(input: &str, templates: &TemplateCatalog) -> Result<u32, FlowError> {
    let id: u32 = input
        .trim()
        .parse()
        .map_err(|_| FlowError::InvalidTemplate)?;

    if templates.contains(id) {
        Ok(id)
    } else {
        Err(FlowError::InvalidTemplate)
    }
}

/// Validates a slide count input
pub fn validate_slide_count(input: &str, limits: &FlowLimits) -> Result<u32, FlowError> {
    let count: u32 = input.trim().parse().map_err(|_| FlowError::InvalidCount)?;

    if count == 0 || count < limits.min_slides || count > limits.max_slides {
        return Err(FlowError::InvalidCount);
    }
    Ok(count)
}

/// Validates a presentation topic input
pub fn validate_topic(input: &str, limits: &FlowLimits) -> Result<String, FlowError> {
    let trimmed = input.trim();
    let chars = trimmed.chars().count();

    if chars == 0 || chars < limits.min_topic_chars || chars > limits.max_topic_chars {
        return Err(FlowError::InvalidTopic);
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::{TemplateAsset, TemplateFormat};
    use std::path::PathBuf;

    fn catalog() -> TemplateCatalog {
        TemplateCatalog::from_assets([1, 2, 5].map(|id| TemplateAsset {
            id,
            path: PathBuf::from(format!("{id}.png")),
            format: TemplateFormat::Png,
        }))
    }

    fn session_in(state: SessionState) -> UserSession {
        let mut session = UserSession::new(1);
        session.state = state;
        session
    }

    #[test]
    fn test_slide_count_validation() {
        let limits = FlowLimits::default();
        assert_eq!(validate_slide_count("5", &limits), Ok(5));
        assert_eq!(validate_slide_count(" 30 ", &limits), Ok(30));
        assert_eq!(validate_slide_count("1", &limits), Ok(1));

        for bad in ["0", "31", "-1", "abc", "", "5.5", "99999999999"] {
            assert_eq!(validate_slide_count(bad, &limits), Err(FlowError::InvalidCount), "{bad}");
        }
    }

    #[test]
    fn test_template_validation() {
        let catalog = catalog();
        assert_eq!(validate_template("1", &catalog), Ok(1));
        assert_eq!(validate_template(" 5\n", &catalog), Ok(5));
        assert_eq!(validate_template("3", &catalog), Err(FlowError::InvalidTemplate));
        assert_eq!(validate_template("one", &catalog), Err(FlowError::InvalidTemplate));
    }

    #[test]
    fn test_topic_validation() {
        let limits = FlowLimits::default();
        assert_eq!(validate_topic("  Space exploration  ", &limits).unwrap(), "Space exploration");
        assert_eq!(validate_topic("   ", &limits), Err(FlowError::InvalidTopic));
        assert_eq!(validate_topic("ab", &limits), Err(FlowError::InvalidTopic));
        assert_eq!(
            validate_topic(&"a".repeat(limits.max_topic_chars + 1), &limits),
            Err(FlowError::InvalidTopic)
        );
        // Length counts characters, not bytes
        assert!(validate_topic("Космос", &limits).is_ok());
    }

    #[test]
    fn test_happy_path_transitions() {
        let catalog = catalog();
        let limits = FlowLimits::default();
        let rules = FlowRules { templates: &catalog, limits: &limits };
        let mut session = UserSession::new(1);

        assert_eq!(transition(&mut session, SessionEvent::Start, &rules), Ok(SessionState::AwaitingTemplate));
        assert_eq!(transition(&mut session, SessionEvent::Template("2"), &rules), Ok(SessionState::AwaitingCount));
        assert_eq!(transition(&mut session, SessionEvent::Count("7"), &rules), Ok(SessionState::AwaitingTopic));
        assert_eq!(
            transition(&mut session, SessionEvent::Topic("Rust in production"), &rules),
            Ok(SessionState::Generating)
        );
        assert_eq!(session.template_id, Some(2));
        assert_eq!(session.slide_count, Some(7));
        assert_eq!(session.topic.as_deref(), Some("Rust in production"));

        assert_eq!(transition(&mut session, SessionEvent::Finish, &rules), Ok(SessionState::Done));
    }

    #[test]
    fn test_each_event_is_rejected_outside_its_state() {
        let catalog = catalog();
        let limits = FlowLimits::default();
        let rules = FlowRules { templates: &catalog, limits: &limits };

        let cases = [
            (SessionState::Idle, SessionEvent::Template("1")),
            (SessionState::Idle, SessionEvent::Finish),
            (SessionState::AwaitingTemplate, SessionEvent::Count("5")),
            (SessionState::AwaitingTemplate, SessionEvent::Topic("Topic")),
            (SessionState::AwaitingCount, SessionEvent::Template("1")),
            (SessionState::AwaitingTopic, SessionEvent::Count("5")),
            (SessionState::AwaitingTopic, SessionEvent::Fail),
            (SessionState::Generating, SessionEvent::Start),
            (SessionState::Generating, SessionEvent::Cancel),
            (SessionState::Generating, SessionEvent::Topic("Again")),
        ];

        for (state, event) in cases {
            let mut session = session_in(state);
            let before = session.clone();
            assert_eq!(
                transition(&mut session, event, &rules),
                Err(FlowError::UnexpectedInput),
                "{state:?} / {event:?}"
            );
            assert_eq!(session, before);
        }
    }

    #[test]
    fn test_invalid_input_keeps_state() {
        let catalog = catalog();
        let limits = FlowLimits::default();
        let rules = FlowRules { templates: &catalog, limits: &limits };

        let mut session = session_in(SessionState::AwaitingCount);
        session.template_id = Some(1);
        assert_eq!(transition(&mut session, SessionEvent::Count("0"), &rules), Err(FlowError::InvalidCount));
        assert_eq!(session.state, SessionState::AwaitingCount);
        assert_eq!(session.template_id, Some(1));

        let mut session = session_in(SessionState::AwaitingTemplate);
        assert_eq!(
            transition(&mut session, SessionEvent::Template("9"), &rules),
            Err(FlowError::InvalidTemplate)
        );
        assert_eq!(session.state, SessionState::AwaitingTemplate);
    }

    #[test]
    fn test_cancel_clears_collected_fields() {
        let catalog = catalog();
        let limits = FlowLimits::default();
        let rules = FlowRules { templates: &catalog, limits: &limits };

        for state in [
            SessionState::Idle,
            SessionState::AwaitingTemplate,
            SessionState::AwaitingCount,
            SessionState::AwaitingTopic,
        ] {
            let mut session = session_in(state);
            session.template_id = Some(1);
            session.slide_count = Some(3);
            session.topic = Some("t".to_string());

            assert_eq!(transition(&mut session, SessionEvent::Cancel, &rules), Ok(SessionState::Idle));
            assert_eq!(session.template_id, None);
            assert_eq!(session.slide_count, None);
            assert_eq!(session.topic, None);
        }
    }

    #[test]
    fn test_restart_discards_previous_input() {
        let catalog = catalog();
        let limits = FlowLimits::default();
        let rules = FlowRules { templates: &catalog, limits: &limits };

        let mut session = session_in(SessionState::AwaitingTopic);
        session.template_id = Some(2);
        session.slide_count = Some(4);

        assert_eq!(transition(&mut session, SessionEvent::Start, &rules), Ok(SessionState::AwaitingTemplate));
        assert_eq!(session.template_id, None);
        assert_eq!(session.slide_count, None);
    }

    #[test]
    fn test_failure_during_generation_resets_to_idle() {
        let catalog = catalog();
        let limits = FlowLimits::default();
        let rules = FlowRules { templates: &catalog, limits: &limits };

        let mut session = session_in(SessionState::Generating);
        session.topic = Some("x".to_string());
        assert_eq!(transition(&mut session, SessionEvent::Fail, &rules), Ok(SessionState::Idle));
        assert_eq!(session.topic, None);
    }
}
