//! Deck Store - Presentation template packages
//!
//! This crate opens .pptx templates, describes their structure (canvas,
//! masters, layouts, slides and data-binding tokens), renders them against
//! a data tree and writes the result back out with every untouched part
//! preserved byte-for-byte.

mod error;
pub mod pptx;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use error::*;

pub use pptx::{
    pack, parse_template, render_template, Background, Container, ContainerLimits, Dimensions,
    ParseLimits, ParseOptions, ParsedTemplate, Placeholder, PlaceholderKind, Rect, RenderDeckOptions,
    RenderedDeck, TemplateLayout, TemplateMaster, TemplateSlide,
};
