//! # Generation Module
//!
//! Turns a completed dialogue into a presentation file. The orchestrator
//! charges one token, asks the text generator for slide texts (falling back
//! to static content when the provider is missing, slow or failing) and hands
//! the slides to the file builder.

pub mod fallback;
pub mod openrouter;
pub mod pptx;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::errors::{AiError, BuildError, FlowError};
use crate::quota::QuotaStore;
use crate::templates::{TemplateAsset, TemplateCatalog};

use self::fallback::{fallback_slides, fit_slide_count};

/// Text of a single slide
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlideContent {
    pub title: String,
    pub bullets: Vec<String>,
}

/// Everything needed to produce one presentation
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationRequest {
    pub user_id: i64,
    pub template_id: u32,
    pub slide_count: u32,
    pub topic: String,
    /// Supported language code (`en`, `ru`)
    pub language: String,
}

/// A built presentation file
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
    pub slide_count: usize,
    /// Static content was used instead of provider output
    pub used_fallback: bool,
    pub remaining_tokens: i64,
}

/// Source of slide texts
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate_slides(
        &self,
        topic: &str,
        slide_count: u32,
        language: &str,
    ) -> Result<Vec<SlideContent>, AiError>;
}

/// Assembles the presentation file and returns its path
#[async_trait]
pub trait FileBuilder: Send + Sync {
    async fn build(
        &self,
        request: &GenerationRequest,
        template: &TemplateAsset,
        slides: &[SlideContent],
    ) -> Result<PathBuf, BuildError>;
}

pub struct Orchestrator {
    quota: QuotaStore,
    templates: Arc<TemplateCatalog>,
    generator: Option<Arc<dyn TextGenerator>>,
    builder: Arc<dyn FileBuilder>,
    generation_timeout: Duration,
}

impl Orchestrator {
    /// Orchestrator in fallback-only mode; see [`Orchestrator::with_generator`]
    pub fn new(
        quota: QuotaStore,
        templates: Arc<TemplateCatalog>,
        builder: Arc<dyn FileBuilder>,
        generation_timeout: Duration,
    ) -> Self {
        Self {
            quota,
            templates,
            generator: None,
            builder,
            generation_timeout,
        }
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn templates(&self) -> &TemplateCatalog {
        &self.templates
    }

    pub fn quota(&self) -> &QuotaStore {
        &self.quota
    }

    /// Produce the presentation for a completed dialogue
    ///
    /// The token is consumed before anything else and is not given back when
    /// the file builder fails.
    pub async fn generate(&self, request: &GenerationRequest) -> Result<Artifact, FlowError> {
        let remaining_tokens = self.quota.try_consume(request.user_id, 1).await?;

        let template = self.templates.get(request.template_id).ok_or_else(|| {
            error!(
                user_id = request.user_id,
                template_id = request.template_id,
                "Template disappeared from catalog"
            );
            FlowError::BuildFailed(format!("template {} not found", request.template_id))
        })?;

        let (slides, used_fallback) = self.slide_texts(request).await;

        let path = self
            .builder
            .build(request, template, &slides)
            .await
            .map_err(|e| {
                error!(user_id = request.user_id, error = %e, "Presentation build failed");
                FlowError::BuildFailed(e.to_string())
            })?;

        info!(
            user_id = request.user_id,
            path = %path.display(),
            slides = slides.len(),
            used_fallback,
            remaining_tokens,
            "Presentation built"
        );

        Ok(Artifact {
            path,
            slide_count: slides.len(),
            used_fallback,
            remaining_tokens,
        })
    }

    async fn slide_texts(&self, request: &GenerationRequest) -> (Vec<SlideContent>, bool) {
        let fallback = || {
            fallback_slides(&request.topic, request.slide_count, &request.language)
        };

        let Some(generator) = &self.generator else {
            debug!(user_id = request.user_id, "No text generator configured, using fallback");
            return (fallback(), true);
        };

        let call = generator.generate_slides(&request.topic, request.slide_count, &request.language);
        match tokio::time::timeout(self.generation_timeout, call).await {
            Ok(Ok(slides)) if !slides.is_empty() => {
                let slides =
                    fit_slide_count(slides, &request.topic, request.slide_count, &request.language);
                (slides, false)
            }
            Ok(Ok(_)) => {
                warn!(user_id = request.user_id, "Text generator returned no slides, using fallback");
                (fallback(), true)
            }
            Ok(Err(e)) => {
                warn!(user_id = request.user_id, error = %e, "Text generation failed, using fallback");
                (fallback(), true)
            }
            Err(_) => {
                warn!(
                    user_id = request.user_id,
                    timeout_secs = self.generation_timeout.as_secs(),
                    "Text generation timed out, using fallback"
                );
                (fallback(), true)
            }
        }
    }
}
