//! Minimal presentation packages for tests
//!
//! [`PptxBuilder::sample`] produces a small but complete deck: one master
//! with a solid background and two placeholders, two layouts related to
//! the master, and three slides carrying tokens, one of them a loop.

use crate::pptx::{namespaces, parts, rel_types};
use std::io::{Cursor, Write};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Builds .pptx packages part by part
#[derive(Debug, Clone, Default)]
pub struct PptxBuilder {
    parts: Vec<(String, Vec<u8>, CompressionMethod)>,
}

impl PptxBuilder {
    /// An empty package
    pub fn new() -> Self {
        Self::default()
    }

    /// The sample deck
    pub fn sample() -> Self {
        Self::new()
            .part(parts::CONTENT_TYPES, content_types(3, 2))
            .part("_rels/.rels", package_rels())
            .part("docProps/core.xml", CORE_PROPS)
            .part(parts::PRESENTATION, presentation(9_144_000, 5_143_500))
            .part("ppt/_rels/presentation.xml.rels", presentation_rels(3))
            .part(&parts::slide_master(1), MASTER)
            .part("ppt/slideMasters/_rels/slideMaster1.xml.rels", master_rels(2))
            .part(&parts::slide_layout(1), layout("title", "Title Slide"))
            .part("ppt/slideLayouts/_rels/slideLayout1.xml.rels", to_master_rels())
            .part(&parts::slide_layout(2), layout("obj", "Title and Content"))
            .part("ppt/slideLayouts/_rels/slideLayout2.xml.rels", to_master_rels())
            .part(&parts::slide(1), slide(SLIDE_TITLE))
            .part("ppt/slides/_rels/slide1.xml.rels", slide_rels(1))
            .part(&parts::slide(2), slide(SLIDE_WORKSTATIONS))
            .part("ppt/slides/_rels/slide2.xml.rels", slide_rels(2))
            .part(&parts::slide(3), slide(SLIDE_NOTES))
            .stored_part("ppt/media/image1.png", PNG_BYTES)
    }

    /// Add or replace a Deflate-compressed part
    pub fn part(self, name: &str, content: impl Into<Vec<u8>>) -> Self {
        self.with_method(name, content.into(), CompressionMethod::Deflated)
    }

    /// Add or replace an uncompressed part
    pub fn stored_part(self, name: &str, content: impl Into<Vec<u8>>) -> Self {
        self.with_method(name, content.into(), CompressionMethod::Stored)
    }

    /// Replace the text of slide `n`'s shape tree content
    pub fn slide_text(self, n: usize, body: &str) -> Self {
        self.part(&parts::slide(n), slide(body))
    }

    /// Drop a part
    pub fn without(mut self, name: &str) -> Self {
        self.parts.retain(|(existing, _, _)| existing != name);
        self
    }

    pub fn part_names(&self) -> Vec<&str> {
        self.parts.iter().map(|(name, _, _)| name.as_str()).collect()
    }

    /// Write the package
    pub fn build(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content, method) in &self.parts {
            let options = SimpleFileOptions::default().compression_method(*method);
            zip.start_file(name.as_str(), options).expect("fixture part header");
            zip.write_all(content).expect("fixture part body");
        }
        zip.finish().expect("fixture package").into_inner()
    }

    fn with_method(mut self, name: &str, content: Vec<u8>, method: CompressionMethod) -> Self {
        match self.parts.iter_mut().find(|(existing, _, _)| existing == name) {
            Some(entry) => {
                entry.1 = content;
                entry.2 = method;
            }
            None => self.parts.push((name.to_string(), content, method)),
        }
        self
    }
}

/// Wrap shape XML in a slide part
pub fn slide(shapes: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}"><p:cSld><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>{shapes}</p:spTree></p:cSld><p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"#,
        a = namespaces::A,
        r = namespaces::R,
        p = namespaces::P,
        shapes = shapes
    )
}

/// A text shape with one paragraph per entry
pub fn text_shape(id: u32, paragraphs: &[&str]) -> String {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<a:p><a:r><a:rPr lang=\"de-DE\"/><a:t>{}</a:t></a:r></a:p>", p))
        .collect();
    format!(
        r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="TextBox {id}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:lstStyle/>{body}</p:txBody></p:sp>"#,
        id = id,
        body = body
    )
}

pub const SLIDE_TITLE: &str = r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="ctrTitle"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:rPr lang="de-DE"/><a:t>{{project_name}}</a:t></a:r></a:p></p:txBody></p:sp><p:sp><p:nvSpPr><p:cNvPr id="3" name="Subtitle 2"/><p:cNvSpPr/><p:nvPr><p:ph type="subTitle" idx="1"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:rPr lang="de-DE"/><a:t>{{customer}} | {{offer_</a:t></a:r><a:r><a:rPr lang="de-DE" b="1"/><a:t>date_formatted}}</a:t></a:r></a:p></p:txBody></p:sp>"#;

pub const SLIDE_WORKSTATIONS: &str = r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Content 1"/><p:cNvSpPr/><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:t>{{#workstations}}</a:t></a:r></a:p><a:p><a:r><a:t>{{index}}. {{name}}: {{module_count}} modules</a:t></a:r></a:p><a:p><a:r><a:t>{{/workstations}}</a:t></a:r></a:p></p:txBody></p:sp>"#;

pub const SLIDE_NOTES: &str = r#"<p:sp><p:nvSpPr><p:cNvPr id="2" name="Notes 1"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr/><a:p><a:r><a:t>Prepared {{generated_date}}</a:t></a:r></a:p></p:txBody></p:sp>"#;

const MASTER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldMaster xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld name="Corporate"><p:bg><p:bgPr><a:solidFill><a:srgbClr val="1F3864"/></a:solidFill><a:effectLst/></p:bgPr></p:bg><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/><p:sp><p:nvSpPr><p:cNvPr id="2" name="Title Placeholder 1"/><p:cNvSpPr><a:spLocks noGrp="1"/></p:cNvSpPr><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="360000" y="180000"/><a:ext cx="8424000" cy="720000"/></a:xfrm></p:spPr><p:txBody><a:bodyPr/><a:p><a:r><a:t>Click to edit title</a:t></a:r></a:p></p:txBody></p:sp><p:sp><p:nvSpPr><p:cNvPr id="3" name="Text Placeholder 2"/><p:cNvSpPr/><p:nvPr><p:ph type="body" idx="1"/></p:nvPr></p:nvSpPr><p:spPr><a:xfrm><a:off x="360000" y="1080000"/><a:ext cx="8424000" cy="3600000"/></a:xfrm></p:spPr></p:sp></p:spTree></p:cSld><p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/><p:sldLayoutId id="2147483650" r:id="rId2"/></p:sldLayoutIdLst></p:sldMaster>"#;

const CORE_PROPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" xmlns:dc="http://purl.org/dc/elements/1.1/"><dc:title>Offer template</dc:title></cp:coreProperties>"#;

/// 1x1 transparent PNG
const PNG_BYTES: &[u8] = &[
    0x89, 0x50, 0x4e, 0x47, 0x0d, 0x0a, 0x1a, 0x0a, 0x00, 0x00, 0x00, 0x0d, 0x49, 0x48, 0x44,
    0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1f,
    0x15, 0xc4, 0x89, 0x00, 0x00, 0x00, 0x0a, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9c, 0x63, 0x00,
    0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0d, 0x0a, 0x2d, 0xb4, 0x00, 0x00, 0x00, 0x00, 0x49,
    0x45, 0x4e, 0x44, 0xae, 0x42, 0x60, 0x82,
];

fn layout(layout_type: &str, name: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sldLayout xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}" type="{layout_type}" preserve="1"><p:cSld name="{name}"><p:spTree><p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/><p:sp><p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp><p:sp><p:nvSpPr><p:cNvPr id="3" name="Content Placeholder 2"/><p:cNvSpPr/><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvSpPr><p:spPr/></p:sp></p:spTree></p:cSld></p:sldLayout>"#,
        a = namespaces::A,
        r = namespaces::R,
        p = namespaces::P,
        layout_type = layout_type,
        name = name
    )
}

fn presentation(cx: i64, cy: i64) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:presentation xmlns:a="{a}" xmlns:r="{r}" xmlns:p="{p}"><p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst><p:sldIdLst><p:sldId id="256" r:id="rId2"/><p:sldId id="257" r:id="rId3"/><p:sldId id="258" r:id="rId4"/></p:sldIdLst><p:sldSz cx="{cx}" cy="{cy}"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#,
        a = namespaces::A,
        r = namespaces::R,
        p = namespaces::P,
        cx = cx,
        cy = cy
    )
}

fn relationships(entries: &[(String, &str, String)]) -> String {
    let body: String = entries
        .iter()
        .map(|(id, rel_type, target)| {
            format!(r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#, id, rel_type, target)
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="{}">{}</Relationships>"#,
        namespaces::RELATIONSHIPS,
        body
    )
}

fn package_rels() -> String {
    relationships(&[(
        "rId1".to_string(),
        rel_types::OFFICE_DOCUMENT,
        "ppt/presentation.xml".to_string(),
    )])
}

fn presentation_rels(slides: usize) -> String {
    let mut entries = vec![(
        "rId1".to_string(),
        rel_types::SLIDE_MASTER,
        "slideMasters/slideMaster1.xml".to_string(),
    )];
    for n in 1..=slides {
        entries.push((format!("rId{}", n + 1), rel_types::SLIDE, format!("slides/slide{}.xml", n)));
    }
    relationships(&entries)
}

fn master_rels(layouts: usize) -> String {
    let mut entries: Vec<_> = (1..=layouts)
        .map(|n| {
            (format!("rId{}", n), rel_types::SLIDE_LAYOUT, format!("../slideLayouts/slideLayout{}.xml", n))
        })
        .collect();
    entries.push((format!("rId{}", layouts + 1), rel_types::IMAGE, "../media/image1.png".to_string()));
    relationships(&entries)
}

fn to_master_rels() -> String {
    relationships(&[(
        "rId1".to_string(),
        rel_types::SLIDE_MASTER,
        "../slideMasters/slideMaster1.xml".to_string(),
    )])
}

/// Relationship part pointing a slide at layout `layout`
pub fn slide_rels(layout: usize) -> String {
    relationships(&[(
        "rId1".to_string(),
        rel_types::SLIDE_LAYOUT,
        format!("../slideLayouts/slideLayout{}.xml", layout),
    )])
}

fn content_types(slides: usize, layouts: usize) -> String {
    let mut overrides = String::new();
    let mut add = |part: String, content_type: &str| {
        overrides.push_str(&format!(
            r#"<Override PartName="/{}" ContentType="application/vnd.openxmlformats-officedocument.presentationml.{}+xml"/>"#,
            part, content_type
        ));
    };
    add(parts::PRESENTATION.to_string(), "presentation.main");
    add(parts::slide_master(1), "slideMaster");
    for n in 1..=layouts {
        add(parts::slide_layout(n), "slideLayout");
    }
    for n in 1..=slides {
        add(parts::slide(n), "slide");
    }
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="{}"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Default Extension="png" ContentType="image/png"/>{}</Types>"#,
        namespaces::CONTENT_TYPES,
        overrides
    )
}

/// A hand-assembled archive with one stored member whose zip64 extra field
/// declares `declared` uncompressed bytes while holding only `hello`
pub fn zip64_declaring(name: &str, declared: u64) -> Vec<u8> {
    const DATA: &[u8] = b"hello";
    const CRC: u32 = 0x3610_a686;
    const ZIP64_MARKER: u32 = 0xFFFF_FFFF;

    let mut out = Vec::new();

    // local file header
    out.extend_from_slice(&0x0403_4b50u32.to_le_bytes());
    out.extend_from_slice(&45u16.to_le_bytes());
    out.extend_from_slice(&[0; 6]); // flags, method (stored), time
    out.extend_from_slice(&0u16.to_le_bytes()); // date
    out.extend_from_slice(&CRC.to_le_bytes());
    out.extend_from_slice(&(DATA.len() as u32).to_le_bytes());
    out.extend_from_slice(&ZIP64_MARKER.to_le_bytes());
    out.extend_from_slice(&(name.len() as u16).to_le_bytes());
    out.extend_from_slice(&12u16.to_le_bytes());
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&8u16.to_le_bytes());
    out.extend_from_slice(&declared.to_le_bytes());
    out.extend_from_slice(DATA);

    // central directory
    let cd_offset = out.len() as u32;
    out.extend_from_slice(&0x0201_4b50u32.to_le_bytes());
    out.extend_from_slice(&45u16.to_le_bytes()); // made by
    out.extend_from_slice(&45u16.to_le_bytes()); // needed
    out.extend_from_slice(&[0; 8]); // flags, method, time, date
    out.extend_from_slice(&CRC.to_le_bytes());
    out.extend_from_slice(&(DATA.len() as u32).to_le_bytes());
    out.extend_from_slice(&ZIP64_MARKER.to_le_bytes());
    out.extend_from_slice(&(name.len() as u16).to_le_bytes());
    out.extend_from_slice(&12u16.to_le_bytes());
    out.extend_from_slice(&[0; 8]); // comment length, disk, internal attributes, external attributes (low)
    out.extend_from_slice(&[0; 2]); // external attributes (high)
    out.extend_from_slice(&0u32.to_le_bytes()); // local header offset
    out.extend_from_slice(name.as_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&8u16.to_le_bytes());
    out.extend_from_slice(&declared.to_le_bytes());
    let cd_size = out.len() as u32 - cd_offset;

    // end of central directory
    out.extend_from_slice(&0x0605_4b50u32.to_le_bytes());
    out.extend_from_slice(&[0; 4]); // disk numbers
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&1u16.to_le_bytes());
    out.extend_from_slice(&cd_size.to_le_bytes());
    out.extend_from_slice(&cd_offset.to_le_bytes());
    out.extend_from_slice(&0u16.to_le_bytes());
    out
}
