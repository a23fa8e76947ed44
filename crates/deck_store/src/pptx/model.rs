//! Structural description of a presentation template

use crate::pptx::reader::XmlParser;
use deck_merge::{FieldDescriptor, SystemField};
use serde::{Deserialize, Serialize};

/// Canvas size of the presentation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: f64,
    pub height: f64,
    pub unit: String,
}

impl Dimensions {
    /// Default 16:9 canvas (12192000 x 6858000 EMU)
    pub const DEFAULT_WIDTH_EMU: i64 = 12_192_000;
    pub const DEFAULT_HEIGHT_EMU: i64 = 6_858_000;

    pub fn from_mm(width: f64, height: f64) -> Self {
        Self { width, height, unit: "mm".to_string() }
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::from_mm(
            XmlParser::emu_to_mm(Self::DEFAULT_WIDTH_EMU),
            XmlParser::emu_to_mm(Self::DEFAULT_HEIGHT_EMU),
        )
    }
}

/// A placement frame in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Semantic kind of a placeholder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaceholderKind {
    Title,
    Body,
    Picture,
    Chart,
    Table,
    Custom,
}

impl PlaceholderKind {
    /// Map a raw `p:ph@type` value; an absent type means body
    pub fn from_ph_type(ph_type: Option<&str>) -> Self {
        match ph_type {
            Some("title") | Some("ctrTitle") => PlaceholderKind::Title,
            None | Some("body") | Some("subTitle") | Some("obj") => PlaceholderKind::Body,
            Some("pic") => PlaceholderKind::Picture,
            Some("chart") => PlaceholderKind::Chart,
            Some("tbl") => PlaceholderKind::Table,
            Some(_) => PlaceholderKind::Custom,
        }
    }
}

/// A placeholder declared on a master or layout
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placeholder {
    pub kind: PlaceholderKind,
    /// Raw OOXML placeholder type
    pub ph_type: String,
    pub name: String,
    /// Absent when the shape inherits its frame
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<Rect>,
}

/// Background of a master
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Background {
    Color { value: String },
    Image {
        #[serde(rename = "relId")]
        rel_id: String,
    },
    Gradient { stops: Vec<String> },
}

impl Default for Background {
    fn default() -> Self {
        Background::Color { value: "FFFFFF".to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateMaster {
    pub id: String,
    pub name: String,
    /// Z-order, zero-based
    pub index: usize,
    pub background: Background,
    pub placeholders: Vec<Placeholder>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateLayout {
    pub id: String,
    pub name: String,
    pub master_id: Option<String>,
    pub layout_type: String,
    pub placeholders: Vec<Placeholder>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSlide {
    /// 1-based
    pub index: usize,
    pub layout_id: Option<String>,
    pub custom_fields: Vec<String>,
    pub loops: Vec<String>,
}

/// Everything the parse operation reports about a template
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedTemplate {
    pub file_name: String,
    pub file_size: u64,
    pub slide_count: usize,
    pub dimensions: Dimensions,
    pub masters: Vec<TemplateMaster>,
    pub layouts: Vec<TemplateLayout>,
    pub slides: Vec<TemplateSlide>,
    /// Union of scalar tokens across every part
    pub custom_fields: Vec<String>,
    /// Union of loop names across every part
    pub custom_loops: Vec<String>,
    pub available_system_fields: Vec<SystemField>,
    pub field_catalog: Vec<FieldDescriptor>,
    /// Sections that could not be read
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}
