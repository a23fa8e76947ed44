//! Shared service state

use std::sync::Arc;

use deck_merge::{FieldCatalog, RenderOptions};
use deck_store::{ContainerLimits, ParseLimits, RenderDeckOptions};
use tracing::{info, warn};

use crate::auth::{StaticTokens, TokenVerifier};
use crate::catalog::TemplateCatalog;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::fetch::{TemplateSource, UrlFetcher};
use crate::storage::{LocalStorage, ObjectStorage};

/// Everything a request handler needs; immutable after startup
pub struct AppState {
    pub verifier: Arc<dyn TokenVerifier>,
    pub templates: TemplateCatalog,
    pub source: Arc<dyn TemplateSource>,
    pub storage: Arc<dyn ObjectStorage>,
    pub fields: FieldCatalog,
    pub limits: ParseLimits,
    pub container_limits: ContainerLimits,
    pub compression_level: Option<i64>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        verifier: Arc<dyn TokenVerifier>,
        source: Arc<dyn TemplateSource>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Self {
        Self {
            verifier,
            templates: TemplateCatalog::default(),
            source,
            storage,
            fields: FieldCatalog::builtin(),
            limits: ParseLimits::default(),
            container_limits: ContainerLimits::default(),
            compression_level: None,
        }
    }

    pub fn with_templates(mut self, templates: TemplateCatalog) -> Self {
        self.templates = templates;
        self
    }

    pub fn with_fields(mut self, fields: FieldCatalog) -> Self {
        self.fields = fields;
        self
    }

    pub fn with_limits(mut self, limits: ParseLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_container_limits(mut self, limits: ContainerLimits) -> Self {
        self.container_limits = limits;
        self
    }

    pub fn with_compression_level(mut self, level: Option<i64>) -> Self {
        self.compression_level = level;
        self
    }

    /// Build the state from configuration, reading catalog files
    pub fn from_config(config: &Config) -> Result<Self> {
        let tokens = StaticTokens::new(config.token_table()?);
        if tokens.is_empty() {
            warn!("no API tokens configured, every request will be rejected");
        }

        let templates = match &config.template_catalog {
            Some(path) => TemplateCatalog::load(path)?,
            None => TemplateCatalog::default(),
        };

        let mut fields = FieldCatalog::builtin();
        if let Some(path) = &config.field_catalog {
            let json = std::fs::read_to_string(path)
                .map_err(|source| Error::ReadFile { path: path.clone(), source })?;
            let extra = FieldCatalog::from_json(&json).map_err(Error::FieldCatalog)?;
            fields.extend(extra.fields().iter().cloned());
        }

        let source = UrlFetcher::new(config.fetch_timeout(), config.max_template_bytes)?;
        let storage = LocalStorage::new(&config.storage_dir, config.public_base_url.clone());

        info!(
            tokens = tokens.len(),
            templates = templates.len(),
            fields = fields.len(),
            storage = %config.storage_dir.display(),
            "service state ready"
        );

        Ok(Self::new(Arc::new(tokens), Arc::new(source), Arc::new(storage))
            .with_templates(templates)
            .with_fields(fields)
            .with_limits(config.parse_limits())
            .with_container_limits(config.container_limits())
            .with_compression_level(config.compression_level))
    }

    pub fn render_options(&self, strict: bool) -> RenderDeckOptions {
        RenderDeckOptions::default()
            .with_render(RenderOptions::default().with_strict(strict))
            .with_compression_level(self.compression_level)
            .with_container_limits(self.container_limits)
    }
}
