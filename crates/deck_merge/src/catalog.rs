//! System field catalog and the combined field surface of a template
//!
//! The catalog lists every field the render path can always supply, so a
//! template author knows what may be referenced. It is data, not code: the
//! builtin list can be replaced or extended from JSON configuration.

use crate::error::Result;
use crate::token::TokenSet;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Field grouping shown to template authors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    Project,
    Workstation,
    Module,
    Camera,
    Lens,
    Light,
    Controller,
    Summary,
    Generated,
    Custom,
}

impl FieldCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldCategory::Project => "project",
            FieldCategory::Workstation => "workstation",
            FieldCategory::Module => "module",
            FieldCategory::Camera => "camera",
            FieldCategory::Lens => "lens",
            FieldCategory::Light => "light",
            FieldCategory::Controller => "controller",
            FieldCategory::Summary => "summary",
            FieldCategory::Generated => "generated",
            FieldCategory::Custom => "custom",
        }
    }
}

/// Whether a field is a plain value or a repeated section
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Scalar,
    Loop,
}

/// A field the render path always knows how to supply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemField {
    pub name: String,
    pub category: FieldCategory,
    #[serde(default = "default_kind")]
    pub kind: FieldKind,
    #[serde(default)]
    pub label: String,
}

fn default_kind() -> FieldKind {
    FieldKind::Scalar
}

impl SystemField {
    pub fn scalar(name: &str, category: FieldCategory, label: &str) -> Self {
        Self { name: name.to_string(), category, kind: FieldKind::Scalar, label: label.to_string() }
    }

    pub fn collection(name: &str, category: FieldCategory, label: &str) -> Self {
        Self { name: name.to_string(), category, kind: FieldKind::Loop, label: label.to_string() }
    }
}

/// Where an advertised field comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldSource {
    Custom,
    System,
    Both,
}

/// One row of the combined field list presented to template authors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    pub source: FieldSource,
    pub category: FieldCategory,
}

/// An ordered, composable list of system fields
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldCatalog {
    fields: Vec<SystemField>,
}

impl FieldCatalog {
    pub fn new(fields: Vec<SystemField>) -> Self {
        let mut catalog = Self::default();
        catalog.extend(fields);
        catalog
    }

    /// The default catalog covering project, workstation, module and
    /// hardware attributes plus derived and generated fields.
    pub fn builtin() -> Self {
        use FieldCategory::*;
        let s = SystemField::scalar;
        let c = SystemField::collection;
        Self::new(vec![
            s("project_name", Project, "Project name"),
            s("project_number", Project, "Project number"),
            s("customer", Project, "Customer"),
            s("description", Project, "Project description"),
            s("author", Project, "Author"),
            s("date", Project, "Project date"),
            s("date_formatted", Project, "Project date (formatted)"),
            s("date_year", Project, "Project date year"),
            s("date_month", Project, "Project date month"),
            s("date_day", Project, "Project date day"),
            c("workstations", Workstation, "Workstations"),
            s("name", Workstation, "Workstation name"),
            s("index", Workstation, "Position in list (1-based)"),
            s("module_count", Workstation, "Number of modules"),
            s("position", Workstation, "Station position"),
            s("cycle_time", Workstation, "Cycle time"),
            c("modules", Module, "Modules"),
            s("type", Module, "Module type"),
            s("inspection_task", Module, "Inspection task"),
            s("field_of_view", Module, "Field of view"),
            s("working_distance", Module, "Working distance"),
            c("cameras", Camera, "Cameras"),
            s("camera_manufacturer", Camera, "Camera manufacturer"),
            s("camera_model", Camera, "Camera model"),
            s("camera_resolution", Camera, "Camera resolution"),
            s("camera_sensor", Camera, "Camera sensor"),
            s("camera_frame_rate", Camera, "Camera frame rate"),
            s("camera_interface", Camera, "Camera interface"),
            c("lenses", Lens, "Lenses"),
            s("lens_manufacturer", Lens, "Lens manufacturer"),
            s("lens_model", Lens, "Lens model"),
            s("lens_focal_length", Lens, "Focal length"),
            s("lens_aperture", Lens, "Aperture"),
            s("lens_mount", Lens, "Mount"),
            c("lights", Light, "Lights"),
            s("light_manufacturer", Light, "Light manufacturer"),
            s("light_model", Light, "Light model"),
            s("light_type", Light, "Light type"),
            s("light_color", Light, "Light color"),
            s("light_wavelength", Light, "Wavelength"),
            c("controllers", Controller, "Controllers"),
            s("controller_manufacturer", Controller, "Controller manufacturer"),
            s("controller_model", Controller, "Controller model"),
            s("controller_processor", Controller, "Processor"),
            s("controller_memory", Controller, "Memory"),
            s("camera_count", Summary, "Number of cameras"),
            s("lens_count", Summary, "Number of lenses"),
            s("light_count", Summary, "Number of lights"),
            s("controller_count", Summary, "Number of controllers"),
            s("hardware_count", Summary, "Total hardware count"),
            s("generated_at", Generated, "Generation timestamp"),
            s("generated_date", Generated, "Generation date"),
            s("generated_time", Generated, "Generation time"),
        ])
    }

    /// Parse a catalog from a JSON array of fields
    pub fn from_json(json: &str) -> Result<Self> {
        let fields: Vec<SystemField> = serde_json::from_str(json)?;
        Ok(Self::new(fields))
    }

    /// Add fields; a name already present is replaced in place
    pub fn extend(&mut self, fields: impl IntoIterator<Item = SystemField>) {
        for field in fields {
            match self.fields.iter_mut().find(|f| f.name == field.name) {
                Some(existing) => *existing = field,
                None => self.fields.push(field),
            }
        }
    }

    pub fn fields(&self) -> &[SystemField] {
        &self.fields
    }

    pub fn names(&self) -> Vec<String> {
        self.fields.iter().map(|f| f.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&SystemField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Combine discovered template tokens with the system catalog.
///
/// Discovered fields come first in name order, followed by the system fields
/// the template does not mention, in catalog order. No validation is done.
pub fn build_field_catalog(discovered: &TokenSet, catalog: &FieldCatalog) -> Vec<FieldDescriptor> {
    let mut out = Vec::with_capacity(discovered.scalars.len() + discovered.loops.len() + catalog.len());
    let mut seen = HashSet::new();

    let discovered_iter = discovered
        .loops
        .iter()
        .map(|n| (n, FieldKind::Loop))
        .chain(discovered.scalars.iter().map(|n| (n, FieldKind::Scalar)));

    let mut custom: Vec<(&String, FieldKind)> = discovered_iter.collect();
    custom.sort_by(|a, b| a.0.cmp(b.0));

    for (name, kind) in custom {
        if !seen.insert(name.as_str()) {
            continue;
        }
        let (source, category) = match catalog.get(name) {
            Some(field) => (FieldSource::Both, field.category),
            None => (FieldSource::Custom, FieldCategory::Custom),
        };
        out.push(FieldDescriptor { name: name.clone(), kind, source, category });
    }

    for field in catalog.fields() {
        if seen.insert(field.name.as_str()) {
            out.push(FieldDescriptor {
                name: field.name.clone(),
                kind: field.kind,
                source: FieldSource::System,
                category: field.category,
            });
        }
    }

    out
}
