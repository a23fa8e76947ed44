//! Structural parsing of masters, layouts and slides
//!
//! Each part is read with a single pass over its XML events. Only the handful
//! of elements the description needs are recognized: names, backgrounds,
//! placeholder shapes and their frames.

use crate::error::{StoreError, StoreResult};
use crate::pptx::model::{
    Background, Dimensions, Placeholder, PlaceholderKind, Rect, TemplateLayout, TemplateMaster,
    TemplateSlide,
};
use crate::pptx::reader::{Container, XmlParser};
use crate::pptx::relationships::{rels_path_for, resolve_target, Relationships, TargetMode};
use crate::pptx::{parts, rel_types};
use deck_merge::{extract, heal_split_tokens};
use quick_xml::events::{BytesStart, Event};
use std::io::{Read, Seek};
use tracing::{debug, warn};

/// Enumeration ceilings for indexed parts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseLimits {
    pub max_masters: usize,
    pub max_layouts: usize,
    pub max_slides: usize,
}

impl Default for ParseLimits {
    fn default() -> Self {
        Self { max_masters: 20, max_layouts: 200, max_slides: 1000 }
    }
}

impl ParseLimits {
    pub fn with_max_masters(mut self, max: usize) -> Self {
        self.max_masters = max;
        self
    }

    pub fn with_max_layouts(mut self, max: usize) -> Self {
        self.max_layouts = max;
        self
    }

    pub fn with_max_slides(mut self, max: usize) -> Self {
        self.max_slides = max;
        self
    }
}

/// Read the canvas size from `ppt/presentation.xml`.
///
/// Falls back to the default 16:9 canvas when the declaration is absent or
/// unreadable.
pub fn dimensions(presentation_xml: &str) -> Dimensions {
    let mut reader = XmlParser::from_string(presentation_xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) | Ok(Event::Empty(ref e))
                if e.local_name().as_ref() == b"sldSz" =>
            {
                let cx = XmlParser::get_i64_attribute(e, "cx");
                let cy = XmlParser::get_i64_attribute(e, "cy");
                if let (Some(cx), Some(cy)) = (cx, cy) {
                    if cx > 0 && cy > 0 {
                        return Dimensions::from_mm(XmlParser::emu_to_mm(cx), XmlParser::emu_to_mm(cy));
                    }
                }
                break;
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!(error = %e, "presentation part unreadable, using default canvas");
                break;
            }
            _ => {}
        }
    }
    Dimensions::default()
}

/// Enumerate `ppt/slideMasters/slideMasterN.xml` until the first gap
pub fn parse_masters<R: Read + Seek>(
    container: &mut Container<R>,
    limits: &ParseLimits,
) -> StoreResult<Vec<TemplateMaster>> {
    let mut masters = Vec::new();
    for n in 1..=limits.max_masters {
        let path = parts::slide_master(n);
        let Some(xml) = container.get_text(&path)? else { break };
        let scan = SheetScan::parse(&path, &xml)?;
        let background = scan.background.resolve();

        masters.push(TemplateMaster {
            id: master_id(n),
            name: scan.name.unwrap_or_else(|| format!("Master {}", n)),
            index: n - 1,
            background,
            placeholders: scan.placeholders,
        });
    }
    debug!(count = masters.len(), "parsed slide masters");
    Ok(masters)
}

/// Enumerate `ppt/slideLayouts/slideLayoutN.xml` until the first gap.
///
/// The master is taken from the layout's relationship part when it points at
/// a known master, otherwise the first master.
pub fn parse_layouts<R: Read + Seek>(
    container: &mut Container<R>,
    masters: &[TemplateMaster],
    limits: &ParseLimits,
) -> StoreResult<Vec<TemplateLayout>> {
    let mut layouts = Vec::new();
    for n in 1..=limits.max_layouts {
        let path = parts::slide_layout(n);
        let Some(xml) = container.get_text(&path)? else { break };
        let scan = SheetScan::parse(&path, &xml)?;

        let master_id = related_part(container, &path, rel_types::SLIDE_MASTER)
            .and_then(|target| part_number(&target, "ppt/slideMasters/slideMaster"))
            .map(master_id)
            .filter(|id| masters.iter().any(|m| &m.id == id))
            .or_else(|| masters.first().map(|m| m.id.clone()));

        layouts.push(TemplateLayout {
            id: layout_id(n),
            name: scan.name.unwrap_or_else(|| format!("Layout {}", n)),
            master_id,
            layout_type: scan.layout_type.unwrap_or_else(|| "cust".to_string()),
            placeholders: scan.placeholders,
        });
    }
    debug!(count = layouts.len(), "parsed slide layouts");
    Ok(layouts)
}

/// Enumerate `ppt/slides/slideN.xml` until the first gap, collecting each
/// slide's tokens and layout reference
pub fn parse_slides<R: Read + Seek>(
    container: &mut Container<R>,
    layouts: &[TemplateLayout],
    limits: &ParseLimits,
) -> StoreResult<Vec<TemplateSlide>> {
    let mut slides = Vec::new();
    for n in 1..=limits.max_slides {
        let path = parts::slide(n);
        let Some(xml) = container.get_text(&path)? else { break };
        let tokens = extract(&heal_split_tokens(&xml));

        let layout_id = related_part(container, &path, rel_types::SLIDE_LAYOUT)
            .and_then(|target| part_number(&target, "ppt/slideLayouts/slideLayout"))
            .map(layout_id)
            .filter(|id| layouts.iter().any(|l| &l.id == id))
            .or_else(|| match layouts.len() {
                0 => None,
                len => Some(layouts[(n - 1) % len].id.clone()),
            });

        slides.push(TemplateSlide {
            index: n,
            layout_id,
            custom_fields: tokens.scalars.into_iter().collect(),
            loops: tokens.loops.into_iter().collect(),
        });
    }
    debug!(count = slides.len(), "parsed slides");
    Ok(slides)
}

fn master_id(n: usize) -> String {
    format!("master-{}", n)
}

fn layout_id(n: usize) -> String {
    format!("layout-{}", n)
}

/// `ppt/slideLayouts/slideLayout12.xml` with prefix `ppt/slideLayouts/slideLayout` -> 12
fn part_number(path: &str, prefix: &str) -> Option<usize> {
    path.strip_prefix(prefix)?.strip_suffix(".xml")?.parse().ok()
}

/// Resolved target of the first internal relationship of `rel_type` from `part`.
///
/// An unreadable relationship part is logged and treated as absent.
fn related_part<R: Read + Seek>(
    container: &mut Container<R>,
    part: &str,
    rel_type: &str,
) -> Option<String> {
    let rels_path = rels_path_for(part);
    let xml = match container.get_text(&rels_path) {
        Ok(Some(xml)) => xml,
        Ok(None) => return None,
        Err(e) => {
            warn!(part = %rels_path, error = %e, "unreadable relationship part");
            return None;
        }
    };
    match Relationships::parse(&xml) {
        Ok(rels) => rels
            .get_by_type(rel_type)
            .filter(|r| r.target_mode == TargetMode::Internal)
            .map(|r| resolve_target(part, &r.target)),
        Err(e) => {
            warn!(part = %rels_path, error = %e, "malformed relationship part");
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fill {
    Solid,
    Blip,
    Gradient,
}

#[derive(Debug, Default)]
struct BackgroundScan {
    color: Option<String>,
    image: Option<String>,
    gradient: Option<Vec<String>>,
}

impl BackgroundScan {
    /// Color wins over image, image over gradient
    fn resolve(self) -> Background {
        if let Some(value) = self.color {
            Background::Color { value }
        } else if let Some(rel_id) = self.image {
            Background::Image { rel_id }
        } else if let Some(stops) = self.gradient {
            Background::Gradient { stops }
        } else {
            Background::default()
        }
    }
}

#[derive(Debug, Default)]
struct ShapeScan {
    name: Option<String>,
    is_placeholder: bool,
    ph_type: Option<String>,
    offset: Option<(i64, i64)>,
    extent: Option<(i64, i64)>,
}

impl ShapeScan {
    fn into_placeholder(self) -> Placeholder {
        let kind = PlaceholderKind::from_ph_type(self.ph_type.as_deref());
        let ph_type = self.ph_type.unwrap_or_else(|| "body".to_string());
        let position = match (self.offset, self.extent) {
            (Some((x, y)), Some((cx, cy))) => Some(Rect {
                x: XmlParser::emu_to_mm(x),
                y: XmlParser::emu_to_mm(y),
                width: XmlParser::emu_to_mm(cx),
                height: XmlParser::emu_to_mm(cy),
            }),
            _ => None,
        };
        Placeholder {
            kind,
            name: self.name.unwrap_or_else(|| ph_type.clone()),
            ph_type,
            position,
        }
    }
}

/// Single-pass scan of a master or layout part
#[derive(Debug, Default)]
struct SheetScan {
    name: Option<String>,
    layout_type: Option<String>,
    background: BackgroundScan,
    placeholders: Vec<Placeholder>,
    shape: Option<ShapeScan>,
    in_background: bool,
    fill: Option<Fill>,
    in_xfrm: bool,
}

impl SheetScan {
    fn parse(part: &str, xml: &str) -> StoreResult<Self> {
        let mut scan = Self::default();
        let mut reader = XmlParser::from_string(xml);
        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => scan.open(e, false),
                Ok(Event::Empty(ref e)) => scan.open(e, true),
                Ok(Event::End(ref e)) => scan.close(e.local_name().as_ref()),
                Ok(Event::Eof) => break,
                Err(e) => return Err(StoreError::xml(part, e)),
                _ => {}
            }
        }
        Ok(scan)
    }

    fn open(&mut self, e: &BytesStart, empty: bool) {
        let local = e.local_name();
        let name = local.as_ref();
        match name {
            b"sldLayout" => self.layout_type = XmlParser::get_attribute(e, "type"),
            b"cSld" => {
                self.name = XmlParser::get_attribute(e, "name").filter(|n| !n.trim().is_empty())
            }
            b"bg" if !empty => self.in_background = true,
            b"sp" | b"pic" | b"graphicFrame" if !empty => self.shape = Some(ShapeScan::default()),
            b"xfrm" if !empty && self.shape.is_some() => self.in_xfrm = true,
            _ => {}
        }

        if self.in_background {
            self.open_background(name, e, empty);
        }

        let in_xfrm = self.in_xfrm;
        if let Some(shape) = self.shape.as_mut() {
            match name {
                b"cNvPr" if shape.name.is_none() => shape.name = XmlParser::get_attribute(e, "name"),
                b"ph" => {
                    shape.is_placeholder = true;
                    shape.ph_type = XmlParser::get_attribute(e, "type");
                }
                b"off" if in_xfrm => {
                    shape.offset = Some((
                        XmlParser::get_i64_attribute(e, "x").unwrap_or(0),
                        XmlParser::get_i64_attribute(e, "y").unwrap_or(0),
                    ));
                }
                b"ext" if in_xfrm => {
                    shape.extent = Some((
                        XmlParser::get_i64_attribute(e, "cx").unwrap_or(0),
                        XmlParser::get_i64_attribute(e, "cy").unwrap_or(0),
                    ));
                }
                _ => {}
            }
        }
    }

    fn open_background(&mut self, name: &[u8], e: &BytesStart, empty: bool) {
        match name {
            b"solidFill" | b"bgRef" if !empty => self.fill = Some(Fill::Solid),
            b"blipFill" if !empty => self.fill = Some(Fill::Blip),
            b"gradFill" if !empty => {
                self.fill = Some(Fill::Gradient);
                self.background.gradient.get_or_insert_with(Vec::new);
            }
            b"blip" if self.fill == Some(Fill::Blip) && self.background.image.is_none() => {
                self.background.image = XmlParser::get_attribute(e, "embed");
            }
            b"srgbClr" | b"schemeClr" | b"sysClr" | b"prstClr" => {
                let Some(value) = color_value(name, e) else { return };
                match self.fill {
                    Some(Fill::Solid) if self.background.color.is_none() => {
                        self.background.color = Some(value)
                    }
                    Some(Fill::Gradient) => {
                        self.background.gradient.get_or_insert_with(Vec::new).push(value)
                    }
                    _ => {}
                }
            }
            _ => {}
        }
    }

    fn close(&mut self, name: &[u8]) {
        match name {
            b"bg" => {
                self.in_background = false;
                self.fill = None;
            }
            b"solidFill" | b"bgRef" | b"blipFill" | b"gradFill" => self.fill = None,
            b"xfrm" => self.in_xfrm = false,
            b"sp" | b"pic" | b"graphicFrame" => {
                if let Some(shape) = self.shape.take() {
                    if shape.is_placeholder {
                        self.placeholders.push(shape.into_placeholder());
                    }
                }
                self.in_xfrm = false;
            }
            _ => {}
        }
    }
}

/// System colors carry their resolved value in `lastClr`
fn color_value(element: &[u8], e: &BytesStart) -> Option<String> {
    if element == b"sysClr" {
        if let Some(last) = XmlParser::get_attribute(e, "lastClr") {
            return Some(last);
        }
    }
    XmlParser::get_attribute(e, "val")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(xml: &str) -> SheetScan {
        SheetScan::parse("test.xml", xml).unwrap()
    }

    const MASTER: &str = r#"<p:sldMaster xmlns:a="a" xmlns:p="p" xmlns:r="r">
  <p:cSld name="Corporate">
    <p:bg><p:bgPr><a:solidFill><a:srgbClr val="1F3864"><a:lumMod val="75000"/></a:srgbClr></a:solidFill><a:effectLst/></p:bgPr></p:bg>
    <p:spTree>
      <p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
      <p:sp>
        <p:nvSpPr><p:cNvPr id="2" name="Title Placeholder 1"/><p:cNvSpPr/><p:nvPr><p:ph type="title"/></p:nvPr></p:nvSpPr>
        <p:spPr><a:xfrm><a:off x="838200" y="365125"/><a:ext cx="10515600" cy="1325563"/></a:xfrm></p:spPr>
        <p:txBody><a:bodyPr/><a:p><a:r><a:t>Title</a:t></a:r></a:p></p:txBody>
      </p:sp>
      <p:sp>
        <p:nvSpPr><p:cNvPr id="3" name="Text Placeholder 2"/><p:cNvSpPr/><p:nvPr><p:ph idx="1"/></p:nvPr></p:nvSpPr>
        <p:spPr/>
        <p:extLst><p:ext uri="{X}"/></p:extLst>
      </p:sp>
      <p:sp>
        <p:nvSpPr><p:cNvPr id="4" name="Logo Frame"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>
        <p:spPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="100" cy="100"/></a:xfrm></p:spPr>
      </p:sp>
    </p:spTree>
  </p:cSld>
</p:sldMaster>"#;

    #[test]
    fn test_master_scan() {
        let scan = scan(MASTER);
        assert_eq!(scan.name.as_deref(), Some("Corporate"));
        assert_eq!(scan.placeholders.len(), 2);

        let title = &scan.placeholders[0];
        assert_eq!(title.kind, PlaceholderKind::Title);
        assert_eq!(title.name, "Title Placeholder 1");
        let frame = title.position.unwrap();
        assert_eq!(frame.x, 23.28);
        assert_eq!(frame.width, 292.1);

        let body = &scan.placeholders[1];
        assert_eq!(body.kind, PlaceholderKind::Body);
        assert_eq!(body.ph_type, "body");
        assert!(body.position.is_none());

        assert_eq!(scan.background.resolve(), Background::Color { value: "1F3864".into() });
    }

    #[test]
    fn test_background_variants() {
        let bg_ref = r#"<p:sldMaster><p:cSld><p:bg><p:bgRef idx="1001"><a:schemeClr val="bg1"/></p:bgRef></p:bg></p:cSld></p:sldMaster>"#;
        assert_eq!(scan(bg_ref).background.resolve(), Background::Color { value: "bg1".into() });

        let image = r#"<p:sldMaster><p:cSld><p:bg><p:bgPr><a:blipFill><a:blip r:embed="rId7"/><a:stretch/></a:blipFill></p:bgPr></p:bg></p:cSld></p:sldMaster>"#;
        assert_eq!(scan(image).background.resolve(), Background::Image { rel_id: "rId7".into() });

        let gradient = r#"<p:sldMaster><p:cSld><p:bg><p:bgPr><a:gradFill><a:gsLst>
            <a:gs pos="0"><a:srgbClr val="FFFFFF"/></a:gs>
            <a:gs pos="100000"><a:sysClr val="windowText" lastClr="000000"/></a:gs>
            </a:gsLst></a:gradFill></p:bgPr></p:bg></p:cSld></p:sldMaster>"#;
        assert_eq!(
            scan(gradient).background.resolve(),
            Background::Gradient { stops: vec!["FFFFFF".into(), "000000".into()] }
        );

        let none = r#"<p:sldMaster><p:cSld><p:spTree/></p:cSld></p:sldMaster>"#;
        assert_eq!(scan(none).background.resolve(), Background::default());
    }

    #[test]
    fn test_shape_colors_do_not_leak_into_background() {
        let xml = r#"<p:sldMaster><p:cSld><p:spTree><p:sp><p:spPr><a:solidFill><a:srgbClr val="FF0000"/></a:solidFill></p:spPr></p:sp></p:spTree></p:cSld></p:sldMaster>"#;
        assert_eq!(scan(xml).background.resolve(), Background::default());
    }

    #[test]
    fn test_layout_scan() {
        let xml = r#"<p:sldLayout type="twoObj" preserve="1"><p:cSld name="Two Content"><p:spTree>
            <p:pic><p:nvPicPr><p:cNvPr id="2" name="Picture 1"/><p:cNvPicPr/><p:nvPr><p:ph type="pic" idx="2"/></p:nvPr></p:nvPicPr></p:pic>
            <p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="3" name="Table 2"/><p:cNvGraphicFramePr/><p:nvPr><p:ph type="tbl" idx="3"/></p:nvPr></p:nvGraphicFramePr>
              <p:xfrm><a:off x="36000" y="72000"/><a:ext cx="360000" cy="180000"/></p:xfrm></p:graphicFrame>
            <p:sp><p:nvSpPr><p:cNvPr id="4" name="Date 3"/><p:cNvSpPr/><p:nvPr><p:ph type="dt" sz="half" idx="10"/></p:nvPr></p:nvSpPr></p:sp>
        </p:spTree></p:cSld></p:sldLayout>"#;
        let scan = scan(xml);
        assert_eq!(scan.layout_type.as_deref(), Some("twoObj"));
        assert_eq!(scan.name.as_deref(), Some("Two Content"));

        let kinds: Vec<_> = scan.placeholders.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![PlaceholderKind::Picture, PlaceholderKind::Table, PlaceholderKind::Custom]
        );
        assert_eq!(
            scan.placeholders[1].position,
            Some(Rect { x: 1.0, y: 2.0, width: 10.0, height: 5.0 })
        );
    }

    #[test]
    fn test_blank_name_is_treated_as_absent() {
        let xml = r#"<p:sldMaster><p:cSld name="  "/></p:sldMaster>"#;
        assert!(scan(xml).name.is_none());
    }

    #[test]
    fn test_malformed_part() {
        let result = SheetScan::parse("ppt/slideMasters/slideMaster1.xml", "<p:sldMaster><p:cSld></p:sld>");
        assert!(matches!(result, Err(StoreError::Xml { .. })));
    }

    #[test]
    fn test_dimensions() {
        let xml = r#"<p:presentation><p:sldSz cx="9144000" cy="5143500"/><p:notesSz cx="6858000" cy="9144000"/></p:presentation>"#;
        let dims = dimensions(xml);
        assert_eq!(dims.width, 254.0);
        assert_eq!(dims.height, 142.88);
        assert_eq!(dims.unit, "mm");

        let default = dimensions("<p:presentation/>");
        assert_eq!((default.width, default.height), (338.67, 190.5));
        assert_eq!(dimensions("not xml <<<"), Dimensions::default());
    }

    #[test]
    fn test_part_number() {
        assert_eq!(part_number("ppt/slideLayouts/slideLayout12.xml", "ppt/slideLayouts/slideLayout"), Some(12));
        assert_eq!(part_number("ppt/slideLayouts/other.xml", "ppt/slideLayouts/slideLayout"), None);
    }
}
