//! ZIP container access and XML parsing utilities

use crate::error::{StoreError, StoreResult};
use quick_xml::events::BytesStart;
use quick_xml::Reader;
use std::io::{Cursor, Read, Seek, SeekFrom};
use zip::ZipArchive;

/// Size ceilings applied while reading a package.
///
/// Sizes declared in the archive are checked when opening; each part read
/// is additionally bounded, since declared sizes can understate the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContainerLimits {
    /// Compressed package size
    pub max_package_size: u64,
    /// Uncompressed size of one part
    pub max_part_size: u64,
    /// Sum of the declared uncompressed sizes of all parts
    pub max_total_size: u64,
}

impl Default for ContainerLimits {
    fn default() -> Self {
        Self {
            max_package_size: 256 * 1024 * 1024,
            max_part_size: 64 * 1024 * 1024,
            max_total_size: 1024 * 1024 * 1024,
        }
    }
}

impl ContainerLimits {
    pub fn with_max_package_size(mut self, max: u64) -> Self {
        self.max_package_size = max;
        self
    }

    pub fn with_max_part_size(mut self, max: u64) -> Self {
        self.max_part_size = max;
        self
    }

    pub fn with_max_total_size(mut self, max: u64) -> Self {
        self.max_total_size = max;
        self
    }
}

/// A presentation package opened for random access by part name.
///
/// Only the central directory is read when opening; members are
/// decompressed one at a time on request.
pub struct Container<R: Read + Seek = Cursor<Vec<u8>>> {
    pub(crate) archive: ZipArchive<R>,
    byte_size: u64,
    limits: ContainerLimits,
}

impl Container<Cursor<Vec<u8>>> {
    /// Open an in-memory package with the default limits
    pub fn open(bytes: Vec<u8>) -> StoreResult<Self> {
        Self::open_with_limits(bytes, ContainerLimits::default())
    }

    pub fn open_with_limits(bytes: Vec<u8>, limits: ContainerLimits) -> StoreResult<Self> {
        Self::from_reader(Cursor::new(bytes), limits)
    }
}

impl<R: Read + Seek> Container<R> {
    /// Open a package from any seekable source
    pub fn from_reader(mut reader: R, limits: ContainerLimits) -> StoreResult<Self> {
        let byte_size = reader.seek(SeekFrom::End(0))?;
        if byte_size > limits.max_package_size {
            return Err(StoreError::TooLarge {
                what: "Package".to_string(),
                size: byte_size,
                limit: limits.max_package_size,
            });
        }
        reader.seek(SeekFrom::Start(0))?;
        let mut archive =
            ZipArchive::new(reader).map_err(|e| StoreError::CorruptArchive(e.to_string()))?;

        let mut declared: u64 = 0;
        for i in 0..archive.len() {
            let size = archive
                .by_index_raw(i)
                .map_err(|e| StoreError::CorruptArchive(e.to_string()))?
                .size();
            declared = declared.saturating_add(size);
        }
        if declared > limits.max_total_size {
            return Err(StoreError::TooLarge {
                what: "Uncompressed package".to_string(),
                size: declared,
                limit: limits.max_total_size,
            });
        }

        Ok(Self { archive, byte_size, limits })
    }

    pub fn limits(&self) -> &ContainerLimits {
        &self.limits
    }

    /// Read a part's bytes, `None` when the part does not exist
    pub fn get_part(&mut self, path: &str) -> StoreResult<Option<Vec<u8>>> {
        let limit = self.limits.max_part_size;
        let file = match self.archive.by_name(path) {
            Ok(file) => file,
            Err(zip::result::ZipError::FileNotFound) => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let too_large = |size| StoreError::TooLarge { what: format!("Part {}", path), size, limit };
        if file.size() > limit {
            return Err(too_large(file.size()));
        }

        let mut contents = Vec::new();
        file.take(limit + 1).read_to_end(&mut contents)?;
        if contents.len() as u64 > limit {
            return Err(too_large(contents.len() as u64));
        }
        Ok(Some(contents))
    }

    /// Read a part as UTF-8 text
    pub fn get_text(&mut self, path: &str) -> StoreResult<Option<String>> {
        match self.get_part(path)? {
            Some(bytes) => String::from_utf8(bytes)
                .map(Some)
                .map_err(|_| StoreError::Utf8 { part: path.to_string() }),
            None => Ok(None),
        }
    }

    /// Check if a part exists in the archive
    pub fn has_part(&self, path: &str) -> bool {
        self.archive.index_for_name(path).is_some()
    }

    /// All member names
    pub fn part_names(&self) -> Vec<String> {
        self.archive.file_names().map(str::to_string).collect()
    }

    /// Member names in archive order (the central directory order)
    pub fn ordered_part_names(&mut self) -> StoreResult<Vec<String>> {
        let mut names = Vec::with_capacity(self.archive.len());
        for i in 0..self.archive.len() {
            names.push(self.archive.by_index_raw(i)?.name().to_string());
        }
        Ok(names)
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.archive.len()
    }

    pub fn is_empty(&self) -> bool {
        self.archive.len() == 0
    }

    /// Size of the whole package in bytes
    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    /// Check that this looks like a presentation package
    pub fn is_presentation(&self) -> bool {
        self.has_part("[Content_Types].xml") && self.has_part(super::parts::PRESENTATION)
    }
}

/// XML reader utilities for parsing presentation parts
pub struct XmlParser;

impl XmlParser {
    /// Create a new XML reader from a string
    pub fn from_string(content: &str) -> Reader<&[u8]> {
        let mut reader = Reader::from_str(content);
        reader.config_mut().trim_text(true);
        reader
    }

    /// Get an attribute value by local name, ignoring any namespace prefix
    pub fn get_attribute(event: &BytesStart, local: &str) -> Option<String> {
        event
            .attributes()
            .filter_map(|a| a.ok())
            .find(|a| a.key.local_name().as_ref() == local.as_bytes())
            .map(|a| match a.unescape_value() {
                Ok(value) => value.into_owned(),
                Err(_) => String::from_utf8_lossy(&a.value).into_owned(),
            })
    }

    /// Get an integer attribute by local name
    pub fn get_i64_attribute(event: &BytesStart, local: &str) -> Option<i64> {
        Self::get_attribute(event, local).and_then(|v| v.trim().parse().ok())
    }

    /// Local element name as a string slice
    pub fn local_name(event: &BytesStart) -> String {
        String::from_utf8_lossy(event.local_name().as_ref()).into_owned()
    }

    /// Convert EMUs (English Metric Units) to millimetres, two decimals.
    /// 1 inch = 914400 EMUs = 25.4 mm, so 1 mm = 36000 EMUs.
    pub fn emu_to_mm(emu: i64) -> f64 {
        let mm = emu as f64 / 36000.0;
        (mm * 100.0).round() / 100.0
    }
}
