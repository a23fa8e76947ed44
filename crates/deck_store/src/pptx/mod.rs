//! PPTX template packages
//!
//! This module handles reading presentation packages, describing their
//! structure, rendering their parts and writing them back out.
//!
//! A .pptx file is a ZIP archive of XML parts:
//! - `[Content_Types].xml` - content type declarations
//! - `_rels/.rels` - package relationships
//! - `ppt/presentation.xml` - slide size and slide lists
//! - `ppt/slideMasters/slideMasterN.xml` - masters
//! - `ppt/slideLayouts/slideLayoutN.xml` - layouts
//! - `ppt/slides/slideN.xml` - slides
//! - `ppt/media/*` - embedded images

mod api;
mod model;
mod reader;
mod relationships;
mod structure;
mod writer;


pub use api::{parse_template, render_template, ParseOptions, RenderedDeck, RenderDeckOptions};
pub use model::{
    Background, Dimensions, ParsedTemplate, Placeholder, PlaceholderKind, Rect, TemplateLayout,
    TemplateMaster, TemplateSlide,
};
pub use reader::{Container, ContainerLimits, XmlParser};
pub use relationships::{rels_path_for, resolve_target, Relationship, Relationships, TargetMode};
pub use structure::{dimensions, parse_layouts, parse_masters, parse_slides, ParseLimits};
pub use writer::pack;

/// XML namespaces used in presentation parts
pub mod namespaces {
    pub const P: &str = "http://schemas.openxmlformats.org/presentationml/2006/main";
    pub const A: &str = "http://schemas.openxmlformats.org/drawingml/2006/main";
    pub const R: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
    pub const RELATIONSHIPS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
    pub const CONTENT_TYPES: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
}

/// Relationship types
pub mod rel_types {
    pub const OFFICE_DOCUMENT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument";
    pub const SLIDE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide";
    pub const SLIDE_LAYOUT: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout";
    pub const SLIDE_MASTER: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster";
    pub const IMAGE: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/image";
    pub const THEME: &str =
        "http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme";
}

/// Well-known part paths
pub mod parts {
    pub const CONTENT_TYPES: &str = "[Content_Types].xml";
    pub const PRESENTATION: &str = "ppt/presentation.xml";

    pub fn slide_master(n: usize) -> String {
        format!("ppt/slideMasters/slideMaster{}.xml", n)
    }

    pub fn slide_layout(n: usize) -> String {
        format!("ppt/slideLayouts/slideLayout{}.xml", n)
    }

    pub fn slide(n: usize) -> String {
        format!("ppt/slides/slide{}.xml", n)
    }

    /// Parts eligible for token extraction and rendering
    pub fn is_xml_part(name: &str) -> bool {
        name.ends_with(".xml")
    }
}
