//! Relationships (.rels) parsing and target resolution
//!
//! Presentation parts reference each other through relationship parts that
//! sit next to them (`ppt/slides/_rels/slide1.xml.rels`). Targets are
//! relative to the folder of the source part.

use crate::error::{StoreError, StoreResult};
use crate::pptx::reader::XmlParser;
use quick_xml::events::Event;

/// A single relationship in a .rels part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    /// Unique ID within the rels part (e.g., "rId1")
    pub id: String,
    /// Relationship type URI
    pub rel_type: String,
    /// Target path (relative to the source part)
    pub target: String,
    /// Target mode (Internal or External)
    pub target_mode: TargetMode,
}

/// Target mode for relationships
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TargetMode {
    /// Internal target within the package
    #[default]
    Internal,
    /// External target (URL)
    External,
}

/// Relationships of one source part, in document order
#[derive(Debug, Clone, Default)]
pub struct Relationships {
    relationships: Vec<Relationship>,
}

impl Relationships {
    /// Parse a .rels part from its XML content
    pub fn parse(content: &str) -> StoreResult<Self> {
        let mut result = Self::default();
        let mut reader = XmlParser::from_string(content);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e)) => {
                    if e.local_name().as_ref() != b"Relationship" {
                        continue;
                    }
                    let id = XmlParser::get_attribute(e, "Id")
                        .ok_or_else(|| StoreError::Relationship("Relationship missing Id".into()))?;
                    let rel_type = XmlParser::get_attribute(e, "Type").ok_or_else(|| {
                        StoreError::Relationship(format!("Relationship {} missing Type", id))
                    })?;
                    let target = XmlParser::get_attribute(e, "Target").ok_or_else(|| {
                        StoreError::Relationship(format!("Relationship {} missing Target", id))
                    })?;
                    let target_mode = match XmlParser::get_attribute(e, "TargetMode").as_deref() {
                        Some("External") => TargetMode::External,
                        _ => TargetMode::Internal,
                    };

                    result.relationships.push(Relationship { id, rel_type, target, target_mode });
                }
                Ok(Event::Eof) => break,
                Err(e) => return Err(StoreError::Relationship(e.to_string())),
                _ => {}
            }
        }

        Ok(result)
    }

    /// Get a relationship by ID
    pub fn get(&self, id: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.id == id)
    }

    /// First relationship of a given type
    pub fn get_by_type(&self, rel_type: &str) -> Option<&Relationship> {
        self.relationships.iter().find(|r| r.rel_type == rel_type)
    }

    /// Get all relationships
    pub fn all(&self) -> impl Iterator<Item = &Relationship> {
        self.relationships.iter()
    }

    pub fn len(&self) -> usize {
        self.relationships.len()
    }

    pub fn is_empty(&self) -> bool {
        self.relationships.is_empty()
    }
}

/// Path of the relationship part belonging to `part`:
/// `ppt/slides/slide1.xml` -> `ppt/slides/_rels/slide1.xml.rels`
pub fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{}/_rels/{}.rels", dir, file),
        None => format!("_rels/{}.rels", part),
    }
}

/// Resolve a relationship target against the folder of its source part.
///
/// Absolute targets (leading `/`) are package-rooted. `..` and `.` segments
/// are collapsed; a `..` above the package root is dropped.
pub fn resolve_target(source_part: &str, target: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    if let Some(absolute) = target.strip_prefix('/') {
        push_segments(&mut segments, absolute);
    } else {
        if let Some((dir, _)) = source_part.rsplit_once('/') {
            push_segments(&mut segments, dir);
        }
        push_segments(&mut segments, target);
    }
    segments.join("/")
}

fn push_segments<'a>(segments: &mut Vec<&'a str>, path: &'a str) {
    for segment in path.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
}
