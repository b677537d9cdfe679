//! # Session Store
//!
//! Keyed store of presentation dialogues, one per Telegram user. Each user's
//! session sits behind its own async mutex so inputs from the same user are
//! applied one at a time while different users never wait on each other.
//!
//! During generation the lock is released; the session stays in
//! `Generating`, so further input from that user is rejected until the
//! orchestrator returns. Idle sessions are dropped from the map.

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::config::FlowLimits;
use crate::dialogue::{transition, FlowRules, SessionEvent, SessionState, UserSession};
use crate::errors::FlowError;
use crate::generation::{Artifact, GenerationRequest, Orchestrator};
use crate::localization::detect_language;

pub struct SessionStore {
    sessions: DashMap<i64, Arc<Mutex<UserSession>>>,
    limits: FlowLimits,
    orchestrator: Arc<Orchestrator>,
}

impl SessionStore {
    pub fn new(orchestrator: Arc<Orchestrator>, limits: FlowLimits) -> Self {
        Self {
            sessions: DashMap::new(),
            limits,
            orchestrator,
        }
    }

    pub fn limits(&self) -> &FlowLimits {
        &self.limits
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    fn rules(&self) -> FlowRules<'_> {
        FlowRules {
            templates: self.orchestrator.templates(),
            limits: &self.limits,
        }
    }

    fn session(&self, user_id: i64) -> Arc<Mutex<UserSession>> {
        self.sessions
            .entry(user_id)
            .or_insert_with(|| Arc::new(Mutex::new(UserSession::new(user_id))))
            .value()
            .clone()
    }

    async fn apply(&self, user_id: i64, event: SessionEvent<'_>) -> Result<SessionState, FlowError> {
        let result = {
            let session = self.session(user_id);
            let mut session = session.lock().await;
            let result = transition(&mut session, event, &self.rules());

            match &result {
                Ok(state) => debug!(user_id, ?event, ?state, "Session advanced"),
                Err(e) => debug!(user_id, ?event, state = ?session.state, error = %e, "Session input rejected"),
            }
            result
        };
        self.release_if_idle(user_id);
        result
    }

    /// Drop the entry of an idle session that no task is holding
    ///
    /// The map shard stays write-locked while the predicate runs, so no new
    /// handle can be handed out for the entry being removed.
    fn release_if_idle(&self, user_id: i64) {
        let released = self.sessions.remove_if(&user_id, |_, session| {
            Arc::strong_count(session) == 1
                && session
                    .try_lock()
                    .map_or(false, |s| s.state == SessionState::Idle)
        });
        if released.is_some() {
            debug!(user_id, "Idle session released");
        }
    }

    /// Number of sessions currently held in memory
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    /// Begin a new dialogue, discarding any unfinished one
    pub async fn start(
        &self,
        user_id: i64,
        language_code: Option<&str>,
    ) -> Result<SessionState, FlowError> {
        let session = self.session(user_id);
        let mut session = session.lock().await;
        let state = transition(&mut session, SessionEvent::Start, &self.rules())?;
        session.language_code = language_code.map(str::to_string);

        info!(user_id, "Presentation dialogue started");
        Ok(state)
    }

    pub async fn submit_template(&self, user_id: i64, raw: &str) -> Result<SessionState, FlowError> {
        self.apply(user_id, SessionEvent::Template(raw)).await
    }

    pub async fn submit_count(&self, user_id: i64, raw: &str) -> Result<SessionState, FlowError> {
        self.apply(user_id, SessionEvent::Count(raw)).await
    }

    /// Accept the topic and run generation to completion
    ///
    /// Generation runs on its own task. The session is `Idle` again once it
    /// ends, whatever the outcome, even if the generator panics or the
    /// caller stops waiting.
    pub async fn submit_topic(&self, user_id: i64, raw: &str) -> Result<Artifact, FlowError> {
        let handle = self.session(user_id);

        let request = {
            let mut session = handle.lock().await;
            let accepted = transition(&mut session, SessionEvent::Topic(raw), &self.rules())
                .and_then(|_| {
                    generation_request(&session).ok_or_else(|| {
                        warn!(user_id, "Session reached generation with missing fields");
                        session.clear();
                        FlowError::UnexpectedInput
                    })
                });

            match accepted {
                Ok(request) => request,
                Err(e) => {
                    drop(session);
                    drop(handle);
                    self.release_if_idle(user_id);
                    return Err(e);
                }
            }
        };

        info!(
            user_id,
            template_id = request.template_id,
            slide_count = request.slide_count,
            language = %request.language,
            "Generating presentation"
        );

        let job = tokio::spawn(run_generation(
            Arc::clone(&handle),
            Arc::clone(&self.orchestrator),
            self.limits.clone(),
            request,
        ));
        let result = match job.await {
            Ok(result) => result,
            Err(e) => {
                error!(user_id, error = %e, "Generation task failed");
                handle.lock().await.clear();
                Err(FlowError::BuildFailed(e.to_string()))
            }
        };

        drop(handle);
        self.release_if_idle(user_id);
        result
    }

    /// Abandon the current dialogue
    ///
    /// Returns whether a dialogue was in progress.
    pub async fn cancel(&self, user_id: i64) -> Result<bool, FlowError> {
        let Some(session) = self.sessions.get(&user_id).map(|s| s.value().clone()) else {
            return Ok(false);
        };
        let was_active = {
            let mut session = session.lock().await;
            let was_active = session.state != SessionState::Idle;
            transition(&mut session, SessionEvent::Cancel, &self.rules())?;
            was_active
        };
        drop(session);
        self.release_if_idle(user_id);

        if was_active {
            info!(user_id, "Presentation dialogue cancelled");
        }
        Ok(was_active)
    }

    /// Current state; `Idle` for a user without a session
    pub async fn state(&self, user_id: i64) -> SessionState {
        match self.sessions.get(&user_id).map(|s| s.value().clone()) {
            Some(session) => session.lock().await.state,
            None => SessionState::Idle,
        }
    }

    /// Copy of the session
    pub async fn snapshot(&self, user_id: i64) -> UserSession {
        match self.sessions.get(&user_id).map(|s| s.value().clone()) {
            Some(session) => session.lock().await.clone(),
            None => UserSession::new(user_id),
        }
    }
}

/// Generate, then fold the session back to `Idle`
async fn run_generation(
    session: Arc<Mutex<UserSession>>,
    orchestrator: Arc<Orchestrator>,
    limits: FlowLimits,
    request: GenerationRequest,
) -> Result<Artifact, FlowError> {
    let user_id = request.user_id;

    let generator = Arc::clone(&orchestrator);
    let result = tokio::spawn(async move { generator.generate(&request).await })
        .await
        .unwrap_or_else(|e| {
            error!(user_id, error = %e, "Generation panicked");
            Err(FlowError::BuildFailed(e.to_string()))
        });

    let rules = FlowRules {
        templates: orchestrator.templates(),
        limits: &limits,
    };
    let mut session = session.lock().await;
    let event = if result.is_ok() {
        SessionEvent::Finish
    } else {
        SessionEvent::Fail
    };
    if let Err(e) = transition(&mut session, event, &rules) {
        warn!(user_id, state = ?session.state, error = %e, "Unexpected state after generation");
    }
    session.clear();

    result
}

fn generation_request(session: &UserSession) -> Option<GenerationRequest> {
    Some(GenerationRequest {
        user_id: session.user_id,
        template_id: session.template_id?,
        slide_count: session.slide_count?,
        topic: session.topic.clone()?,
        language: detect_language(session.language_code.as_deref()).to_string(),
    })
}
