//! The parse and render operations over whole packages

use crate::error::{StoreError, StoreResult};
use crate::pptx::model::{Dimensions, ParsedTemplate};
use crate::pptx::reader::{Container, ContainerLimits};
use crate::pptx::structure::{dimensions, parse_layouts, parse_masters, parse_slides, ParseLimits};
use crate::pptx::writer::pack;
use crate::pptx::parts;
use deck_merge::{
    build_field_catalog, extract, heal_split_tokens, FieldCatalog, MergeEngine, MergeError,
    RenderOptions, TokenSet,
};
use std::collections::BTreeMap;
use std::fmt::Display;
use tracing::{debug, info, warn};

/// Options for [`parse_template`]
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    pub file_name: String,
    /// Reported size; defaults to the byte length of the package
    pub file_size: Option<u64>,
    pub limits: ParseLimits,
    pub container: ContainerLimits,
    pub catalog: FieldCatalog,
}

impl ParseOptions {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
            catalog: FieldCatalog::builtin(),
            ..Default::default()
        }
    }

    pub fn with_file_size(mut self, size: u64) -> Self {
        self.file_size = Some(size);
        self
    }

    pub fn with_limits(mut self, limits: ParseLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_container_limits(mut self, container: ContainerLimits) -> Self {
        self.container = container;
        self
    }

    pub fn with_catalog(mut self, catalog: FieldCatalog) -> Self {
        self.catalog = catalog;
        self
    }
}

/// Options for [`render_template`]
#[derive(Debug, Clone, Default)]
pub struct RenderDeckOptions {
    pub render: RenderOptions,
    /// Deflate level for rewritten parts, `None` for the library default
    pub compression_level: Option<i64>,
    pub container: ContainerLimits,
}

impl RenderDeckOptions {
    pub fn with_render(mut self, render: RenderOptions) -> Self {
        self.render = render;
        self
    }

    pub fn with_compression_level(mut self, level: Option<i64>) -> Self {
        self.compression_level = level;
        self
    }

    pub fn with_container_limits(mut self, container: ContainerLimits) -> Self {
        self.container = container;
        self
    }
}

/// A rendered package
#[derive(Debug, Clone)]
pub struct RenderedDeck {
    pub bytes: Vec<u8>,
    pub parts_total: usize,
    /// Parts whose text changed
    pub parts_rendered: usize,
}

/// Describe a template package.
///
/// Only an unreadable archive fails the operation. Any section that cannot
/// be read is left empty and reported in `warnings`.
pub fn parse_template(bytes: Vec<u8>, options: &ParseOptions) -> StoreResult<ParsedTemplate> {
    let file_size = options.file_size.unwrap_or(bytes.len() as u64);
    let mut container = Container::open_with_limits(bytes, options.container)?;
    let mut warnings = Vec::new();

    if !container.is_presentation() {
        degrade(&mut warnings, "package", "not a presentation package");
    }

    let dimensions = match container.get_text(parts::PRESENTATION) {
        Ok(Some(xml)) => dimensions(&xml),
        Ok(None) => Dimensions::default(),
        Err(e) => {
            degrade(&mut warnings, "dimensions", e);
            Dimensions::default()
        }
    };

    let masters = parse_masters(&mut container, &options.limits).unwrap_or_else(|e| {
        degrade(&mut warnings, "masters", e);
        Vec::new()
    });
    let layouts = parse_layouts(&mut container, &masters, &options.limits).unwrap_or_else(|e| {
        degrade(&mut warnings, "layouts", e);
        Vec::new()
    });
    let slides = parse_slides(&mut container, &layouts, &options.limits).unwrap_or_else(|e| {
        degrade(&mut warnings, "slides", e);
        Vec::new()
    });

    let mut tokens = TokenSet::new();
    for name in container.part_names().into_iter().filter(|n| parts::is_xml_part(n)) {
        match container.get_text(&name) {
            Ok(Some(xml)) => tokens.merge(extract(&heal_split_tokens(&xml))),
            Ok(None) => {}
            Err(e) => degrade(&mut warnings, &name, e),
        }
    }

    let field_catalog = build_field_catalog(&tokens, &options.catalog);

    info!(
        file = %options.file_name,
        size = file_size,
        masters = masters.len(),
        layouts = layouts.len(),
        slides = slides.len(),
        fields = tokens.scalars.len(),
        loops = tokens.loops.len(),
        "template parsed"
    );

    Ok(ParsedTemplate {
        file_name: options.file_name.clone(),
        file_size,
        slide_count: slides.len(),
        dimensions,
        masters,
        layouts,
        slides,
        custom_fields: tokens.scalars.into_iter().collect(),
        custom_loops: tokens.loops.into_iter().collect(),
        available_system_fields: options.catalog.fields().to_vec(),
        field_catalog,
        warnings,
    })
}

/// Render every XML part of a template against `data` and repackage.
///
/// Syntax problems are collected across all parts before failing, so the
/// caller sees every unbalanced tag at once. No output is produced on error.
pub fn render_template(
    bytes: Vec<u8>,
    data: &serde_json::Value,
    options: &RenderDeckOptions,
) -> StoreResult<RenderedDeck> {
    let mut container = Container::open_with_limits(bytes, options.container)?;
    let engine = MergeEngine::new(options.render.clone());
    let root = engine.prepare(data);

    let names = container.ordered_part_names()?;
    let mut mutated = BTreeMap::new();
    let mut issues = Vec::new();

    for name in names.iter().filter(|n| parts::is_xml_part(n)) {
        let Some(xml) = container.get_text(name)? else { continue };
        let healed = heal_split_tokens(&xml);
        match engine.render_text(&healed, &root) {
            Ok(rendered) => {
                if rendered != xml.as_str() {
                    debug!(part = %name, "part rendered");
                    mutated.insert(name.clone(), rendered.into_owned());
                }
            }
            Err(MergeError::TemplateSyntax(found)) => {
                issues.extend(found.into_iter().map(|issue| issue.in_part(name.as_str())));
            }
            Err(e) => {
                debug!(part = %name, error = %e, "render failed");
                return Err(e.into());
            }
        }
    }

    if !issues.is_empty() {
        warn!(count = issues.len(), "template syntax errors");
        return Err(StoreError::Merge(MergeError::TemplateSyntax(issues)));
    }

    let bytes = pack(&mutated, &mut container, options.compression_level)?;
    info!(
        parts = names.len(),
        rendered = mutated.len(),
        size = bytes.len(),
        strict = options.render.strict,
        "presentation rendered"
    );

    Ok(RenderedDeck { bytes, parts_total: names.len(), parts_rendered: mutated.len() })
}

fn degrade(warnings: &mut Vec<String>, section: &str, err: impl Display) {
    warn!(section, error = %err, "template section unreadable");
    warnings.push(format!("{}: {}", section, err));
}
