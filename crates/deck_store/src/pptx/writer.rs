//! Output packaging
//!
//! Rebuilds a package from an opened original plus a set of replacement
//! part texts.

use crate::error::StoreResult;
use crate::pptx::reader::Container;
use std::collections::{BTreeMap, HashSet};
use std::io::{Cursor, Read, Seek, Write};
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Write a new package.
///
/// Members keep their original order. Members not in `mutated` are copied
/// raw, so their compressed bytes, CRC and timestamps are unchanged.
/// Mutated members are Deflate-compressed at `compression_level` (`None`
/// for the library default). Paths present only in `mutated` are appended.
pub fn pack<R: Read + Seek>(
    mutated: &BTreeMap<String, String>,
    original: &mut Container<R>,
    compression_level: Option<i64>,
) -> StoreResult<Vec<u8>> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(compression_level);

    let mut written = HashSet::with_capacity(original.len());
    let mut copied = 0usize;

    for i in 0..original.archive.len() {
        let file = original.archive.by_index_raw(i)?;
        let name = file.name().to_string();
        match mutated.get(&name) {
            Some(text) => {
                drop(file);
                zip.start_file(name.as_str(), options)?;
                zip.write_all(text.as_bytes())?;
            }
            None => {
                zip.raw_copy_file(file)?;
                copied += 1;
            }
        }
        written.insert(name);
    }

    for (name, text) in mutated.iter().filter(|(name, _)| !written.contains(*name)) {
        zip.start_file(name.as_str(), options)?;
        zip.write_all(text.as_bytes())?;
    }

    let bytes = zip.finish()?.into_inner();
    debug!(copied, mutated = mutated.len(), size = bytes.len(), "package written");
    Ok(bytes)
}
