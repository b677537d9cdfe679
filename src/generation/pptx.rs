//! # PPTX Writer
//!
//! Writes an Office Open XML presentation with the template image as the
//! background of every slide and a title plus bullet list on top of it.
//! The package is assembled on a blocking thread and persisted atomically.

use async_trait::async_trait;
use chrono::Utc;
use lazy_static::lazy_static;
use quick_xml::escape::escape;
use regex::Regex;
use std::fs;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{FileBuilder, GenerationRequest, SlideContent};
use crate::errors::BuildError;
use crate::templates::{TemplateAsset, TemplateFormat};

/// 16:9 slide size in EMU
pub const SLIDE_WIDTH: i64 = 12_192_000;
pub const SLIDE_HEIGHT: i64 = 6_858_000;

const MAX_FILE_STEM_CHARS: usize = 40;

/// Text zones as (left, top, width, height) ratios of the slide
const TITLE_ZONE: (f64, f64, f64, f64) = (0.08, 0.08, 0.84, 0.16);
const BODY_ZONE: (f64, f64, f64, f64) = (0.10, 0.26, 0.80, 0.58);

const TEXT_COLOR: &str = "1F1F1F";
const PANEL_COLOR: &str = "FFFFFF";
// 72% opaque
const PANEL_ALPHA: u32 = 72_000;

const NS_MAIN: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;
const XML_HEADER: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#;
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const REL_DOC: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

lazy_static! {
    static ref NON_WORD_RUN: Regex =
        Regex::new(r"[^\w\-]+").expect("File name pattern should be valid");
}

/// [`FileBuilder`] writing `.pptx` files under an output directory
#[derive(Debug, Clone)]
pub struct PptxBuilder {
    output_dir: PathBuf,
}

impl PptxBuilder {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl FileBuilder for PptxBuilder {
    async fn build(
        &self,
        request: &GenerationRequest,
        template: &TemplateAsset,
        slides: &[SlideContent],
    ) -> Result<PathBuf, BuildError> {
        let job_dir = self.output_dir.join(format!(
            "{}_{}",
            request.user_id,
            Utc::now().format("%Y%m%d_%H%M%S_%3f")
        ));
        let path = job_dir.join(format!("{}.pptx", safe_filename(&request.topic)));
        let template = template.clone();
        let slides = slides.to_vec();
        let topic = request.topic.clone();

        tokio::task::spawn_blocking(move || {
            fs::create_dir_all(&job_dir)?;
            let result = write_presentation(&path, &template, &slides, &topic);
            if result.is_err() {
                if let Err(e) = fs::remove_dir_all(&job_dir) {
                    warn!(dir = %job_dir.display(), error = %e, "Failed to remove output directory");
                }
            }
            result.map(|()| path)
        })
        .await
        .map_err(|e| BuildError::Io(std::io::Error::other(e)))?
    }
}

/// File stem derived from the topic
///
/// Runs of characters other than word characters and `-` become `_`.
pub fn safe_filename(topic: &str) -> String {
    let cleaned = NON_WORD_RUN.replace_all(topic, "_");
    let stem: String = cleaned
        .trim_matches('_')
        .chars()
        .take(MAX_FILE_STEM_CHARS)
        .collect();

    if stem.is_empty() {
        "presentation".to_string()
    } else {
        stem
    }
}

/// Title font size in points, smaller for longer titles
pub fn title_font_size(title: &str) -> u32 {
    match title.trim().chars().count() {
        n if n > 90 => 24,
        n if n > 70 => 26,
        n if n > 52 => 30,
        _ => 33,
    }
}

/// Body font size in points, smaller for denser slides
pub fn body_font_size(bullets: &[String]) -> u32 {
    let lengths = bullets.iter().map(|b| b.chars().count());
    let longest = lengths.clone().max().unwrap_or(0);
    let total: usize = lengths.sum();

    if bullets.len() >= 5 || longest > 210 || total > 680 {
        16
    } else if bullets.len() >= 4 || longest > 170 || total > 520 {
        18
    } else {
        19
    }
}

/// Write the complete package to `path`
pub fn write_presentation(
    path: &Path,
    template: &TemplateAsset,
    slides: &[SlideContent],
    topic: &str,
) -> Result<(), BuildError> {
    let image = fs::read(&template.path)?;
    if image.is_empty() {
        return Err(BuildError::UnsupportedTemplate(format!(
            "{} is empty",
            template.path.display()
        )));
    }

    let dir = path
        .parent()
        .ok_or_else(|| BuildError::UnsupportedTemplate("output path has no parent".to_string()))?;
    let file = NamedTempFile::new_in(dir)?;
    let mut zip = ZipWriter::new(file);

    write_package(&mut zip, template.format, &image, slides, topic)?;

    let file = zip.finish()?;
    file.persist(path).map_err(|e| BuildError::Io(e.error))?;

    debug!(path = %path.display(), slides = slides.len(), "Presentation written");
    Ok(())
}

fn write_package<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    format: TemplateFormat,
    image: &[u8],
    slides: &[SlideContent],
    topic: &str,
) -> Result<(), BuildError> {
    let deflated = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let stored = SimpleFileOptions::default().compression_method(CompressionMethod::Stored);

    let part = |zip: &mut ZipWriter<W>, name: &str, content: &str| -> Result<(), BuildError> {
        zip.start_file(name, deflated)?;
        zip.write_all(content.as_bytes())?;
        Ok(())
    };

    part(zip, "[Content_Types].xml", &content_types_xml(format, slides.len()))?;
    part(zip, "_rels/.rels", &package_rels_xml())?;
    part(zip, "docProps/core.xml", &core_props_xml(topic))?;
    part(zip, "docProps/app.xml", &app_props_xml(slides.len()))?;
    part(zip, "ppt/presentation.xml", &presentation_xml(slides.len()))?;
    part(zip, "ppt/_rels/presentation.xml.rels", &presentation_rels_xml(slides.len()))?;
    part(zip, "ppt/slideMasters/slideMaster1.xml", &slide_master_xml())?;
    part(zip, "ppt/slideMasters/_rels/slideMaster1.xml.rels", &slide_master_rels_xml())?;
    part(zip, "ppt/slideLayouts/slideLayout1.xml", &slide_layout_xml())?;
    part(zip, "ppt/slideLayouts/_rels/slideLayout1.xml.rels", &slide_layout_rels_xml())?;
    part(zip, "ppt/theme/theme1.xml", THEME_XML)?;

    zip.start_file(format!("ppt/media/background.{}", format.extension()), stored)?;
    zip.write_all(image)?;

    for (index, slide) in slides.iter().enumerate() {
        let number = index + 1;
        part(zip, &format!("ppt/slides/slide{number}.xml"), &slide_xml(slide))?;
        part(
            zip,
            &format!("ppt/slides/_rels/slide{number}.xml.rels"),
            &slide_rels_xml(format),
        )?;
    }

    Ok(())
}

fn xml_text(text: &str) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !c.is_control() || *c == '\t')
        .collect();
    escape(cleaned.as_str()).into_owned()
}

fn relationship(id: &str, kind: &str, target: &str) -> String {
    format!(r#"<Relationship Id="{id}" Type="{kind}" Target="{target}"/>"#)
}

fn relationships(items: &[String]) -> String {
    format!(
        r#"{XML_HEADER}<Relationships xmlns="{REL_NS}">{}</Relationships>"#,
        items.concat()
    )
}

fn content_types_xml(format: TemplateFormat, slide_count: usize) -> String {
    let slides: String = (1..=slide_count)
        .map(|n| {
            format!(
                r#"<Override PartName="/ppt/slides/slide{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#
            )
        })
        .collect();

    format!(
        concat!(
            "{header}",
            r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
            r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
            r#"<Default Extension="xml" ContentType="application/xml"/>"#,
            r#"<Default Extension="{ext}" ContentType="{mime}"/>"#,
            r#"<Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>"#,
            r#"<Override PartName="/ppt/slideMasters/slideMaster1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideMaster+xml"/>"#,
            r#"<Override PartName="/ppt/slideLayouts/slideLayout1.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slideLayout+xml"/>"#,
            r#"<Override PartName="/ppt/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/>"#,
            r#"<Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/>"#,
            r#"<Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/>"#,
            "{slides}</Types>"
        ),
        header = XML_HEADER,
        ext = format.extension(),
        mime = format.mime_type(),
        slides = slides,
    )
}

fn package_rels_xml() -> String {
    relationships(&[
        relationship("rId1", &format!("{REL_DOC}/officeDocument"), "ppt/presentation.xml"),
        relationship(
            "rId2",
            "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties",
            "docProps/core.xml",
        ),
        relationship("rId3", &format!("{REL_DOC}/extended-properties"), "docProps/app.xml"),
    ])
}

fn core_props_xml(topic: &str) -> String {
    let now = Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    format!(
        concat!(
            "{header}",
            r#"<cp:coreProperties xmlns:cp="http://schemas.openxmlformats.org/package/2006/metadata/core-properties" "#,
            r#"xmlns:dc="http://purl.org/dc/elements/1.1/" xmlns:dcterms="http://purl.org/dc/terms/" "#,
            r#"xmlns:dcmitype="http://purl.org/dc/dcmitype/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">"#,
            "<dc:title>{title}</dc:title><dc:creator>presentations</dc:creator>",
            r#"<dcterms:created xsi:type="dcterms:W3CDTF">{now}</dcterms:created>"#,
            r#"<dcterms:modified xsi:type="dcterms:W3CDTF">{now}</dcterms:modified>"#,
            "</cp:coreProperties>"
        ),
        header = XML_HEADER,
        title = xml_text(topic),
        now = now,
    )
}

fn app_props_xml(slide_count: usize) -> String {
    format!(
        r#"{XML_HEADER}<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes"><Application>presentations</Application><Slides>{slide_count}</Slides></Properties>"#
    )
}

fn presentation_xml(slide_count: usize) -> String {
    let ids: String = (0..slide_count)
        .map(|i| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + i, i + 2))
        .collect();

    format!(
        concat!(
            "{header}<p:presentation {ns}>",
            r#"<p:sldMasterIdLst><p:sldMasterId id="2147483648" r:id="rId1"/></p:sldMasterIdLst>"#,
            "<p:sldIdLst>{ids}</p:sldIdLst>",
            r#"<p:sldSz cx="{cx}" cy="{cy}"/><p:notesSz cx="6858000" cy="9144000"/>"#,
            "</p:presentation>"
        ),
        header = XML_HEADER,
        ns = NS_MAIN,
        ids = ids,
        cx = SLIDE_WIDTH,
        cy = SLIDE_HEIGHT,
    )
}

fn presentation_rels_xml(slide_count: usize) -> String {
    let mut items = vec![relationship(
        "rId1",
        &format!("{REL_DOC}/slideMaster"),
        "slideMasters/slideMaster1.xml",
    )];
    for i in 0..slide_count {
        items.push(relationship(
            &format!("rId{}", i + 2),
            &format!("{REL_DOC}/slide"),
            &format!("slides/slide{}.xml", i + 1),
        ));
    }
    items.push(relationship(
        &format!("rId{}", slide_count + 2),
        &format!("{REL_DOC}/theme"),
        "theme/theme1.xml",
    ));
    relationships(&items)
}

const EMPTY_SHAPE_TREE: &str = concat!(
    "<p:spTree>",
    r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>"#,
    r#"<p:grpSpPr><a:xfrm><a:off x="0" y="0"/><a:ext cx="0" cy="0"/><a:chOff x="0" y="0"/><a:chExt cx="0" cy="0"/></a:xfrm></p:grpSpPr>"#,
);

fn slide_master_xml() -> String {
    format!(
        concat!(
            "{header}<p:sldMaster {ns}><p:cSld>{tree}</p:spTree></p:cSld>",
            r#"<p:clrMap bg1="lt1" tx1="dk1" bg2="lt2" tx2="dk2" accent1="accent1" accent2="accent2" "#,
            r#"accent3="accent3" accent4="accent4" accent5="accent5" accent6="accent6" hlink="hlink" folHlink="folHlink"/>"#,
            r#"<p:sldLayoutIdLst><p:sldLayoutId id="2147483649" r:id="rId1"/></p:sldLayoutIdLst>"#,
            "</p:sldMaster>"
        ),
        header = XML_HEADER,
        ns = NS_MAIN,
        tree = EMPTY_SHAPE_TREE,
    )
}

fn slide_master_rels_xml() -> String {
    relationships(&[
        relationship(
            "rId1",
            &format!("{REL_DOC}/slideLayout"),
            "../slideLayouts/slideLayout1.xml",
        ),
        relationship("rId2", &format!("{REL_DOC}/theme"), "../theme/theme1.xml"),
    ])
}

fn slide_layout_xml() -> String {
    format!(
        concat!(
            r#"{header}<p:sldLayout {ns} type="blank" preserve="1">"#,
            r#"<p:cSld name="Blank">{tree}</p:spTree></p:cSld>"#,
            "<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sldLayout>"
        ),
        header = XML_HEADER,
        ns = NS_MAIN,
        tree = EMPTY_SHAPE_TREE,
    )
}

fn slide_layout_rels_xml() -> String {
    relationships(&[relationship(
        "rId1",
        &format!("{REL_DOC}/slideMaster"),
        "../slideMasters/slideMaster1.xml",
    )])
}

fn slide_rels_xml(format: TemplateFormat) -> String {
    relationships(&[
        relationship(
            "rId1",
            &format!("{REL_DOC}/slideLayout"),
            "../slideLayouts/slideLayout1.xml",
        ),
        relationship(
            "rId2",
            &format!("{REL_DOC}/image"),
            &format!("../media/background.{}", format.extension()),
        ),
    ])
}

fn zone_to_emu(zone: (f64, f64, f64, f64)) -> (i64, i64, i64, i64) {
    let (left, top, width, height) = zone;
    let w = SLIDE_WIDTH as f64;
    let h = SLIDE_HEIGHT as f64;
    (
        (left * w).round() as i64,
        (top * h).round() as i64,
        (width * w).round() as i64,
        (height * h).round() as i64,
    )
}

fn run_xml(text: &str, size_pt: u32, bold: bool) -> String {
    format!(
        r#"<a:r><a:rPr lang="en-US" sz="{sz}" b="{b}" dirty="0"><a:solidFill><a:srgbClr val="{TEXT_COLOR}"/></a:solidFill></a:rPr><a:t>{text}</a:t></a:r>"#,
        sz = size_pt * 100,
        b = u8::from(bold),
        text = xml_text(text),
    )
}

fn text_box_xml(id: u32, name: &str, zone: (f64, f64, f64, f64), anchor: &str, paragraphs: &str) -> String {
    let (x, y, cx, cy) = zone_to_emu(zone);
    format!(
        concat!(
            r#"<p:sp><p:nvSpPr><p:cNvPr id="{id}" name="{name}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr>"#,
            r#"<p:spPr><a:xfrm><a:off x="{x}" y="{y}"/><a:ext cx="{cx}" cy="{cy}"/></a:xfrm>"#,
            r#"<a:prstGeom prst="rect"><a:avLst/></a:prstGeom>"#,
            r#"<a:solidFill><a:srgbClr val="{fill}"><a:alpha val="{alpha}"/></a:srgbClr></a:solidFill></p:spPr>"#,
            r#"<p:txBody><a:bodyPr wrap="square" lIns="91440" tIns="45720" rIns="91440" bIns="45720" anchor="{anchor}"><a:normAutofit/></a:bodyPr>"#,
            "<a:lstStyle/>{paragraphs}</p:txBody></p:sp>"
        ),
        id = id,
        name = name,
        x = x,
        y = y,
        cx = cx,
        cy = cy,
        fill = PANEL_COLOR,
        alpha = PANEL_ALPHA,
        anchor = anchor,
        paragraphs = paragraphs,
    )
}

fn slide_xml(slide: &SlideContent) -> String {
    let title = format!(
        r#"<a:p><a:pPr algn="ctr"/>{}</a:p>"#,
        run_xml(&slide.title, title_font_size(&slide.title), true)
    );

    let body_size = body_font_size(&slide.bullets);
    let body: String = slide
        .bullets
        .iter()
        .map(|bullet| {
            format!(
                r#"<a:p><a:pPr algn="l"><a:spcAft><a:spcPts val="500"/></a:spcAft></a:pPr>{}</a:p>"#,
                run_xml(&format!("\u{2022} {bullet}"), body_size, false)
            )
        })
        .collect();

    format!(
        concat!(
            "{header}<p:sld {ns}><p:cSld>",
            r#"<p:bg><p:bgPr><a:blipFill dpi="0" rotWithShape="1"><a:blip r:embed="rId2"/><a:srcRect/><a:stretch><a:fillRect/></a:stretch></a:blipFill><a:effectLst/></p:bgPr></p:bg>"#,
            "{tree}{title}{body}</p:spTree></p:cSld>",
            "<p:clrMapOvr><a:masterClrMapping/></p:clrMapOvr></p:sld>"
        ),
        header = XML_HEADER,
        ns = NS_MAIN,
        tree = EMPTY_SHAPE_TREE,
        title = text_box_xml(2, "Title", TITLE_ZONE, "ctr", &title),
        body = text_box_xml(3, "Body", BODY_ZONE, "t", &body),
    )
}

const THEME_XML: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Presentation">"#,
    "<a:themeElements>",
    r#"<a:clrScheme name="Presentation">"#,
    r#"<a:dk1><a:srgbClr val="000000"/></a:dk1><a:lt1><a:srgbClr val="FFFFFF"/></a:lt1>"#,
    r#"<a:dk2><a:srgbClr val="1F1F1F"/></a:dk2><a:lt2><a:srgbClr val="EEECE1"/></a:lt2>"#,
    r#"<a:accent1><a:srgbClr val="4F81BD"/></a:accent1><a:accent2><a:srgbClr val="C0504D"/></a:accent2>"#,
    r#"<a:accent3><a:srgbClr val="9BBB59"/></a:accent3><a:accent4><a:srgbClr val="8064A2"/></a:accent4>"#,
    r#"<a:accent5><a:srgbClr val="4BACC6"/></a:accent5><a:accent6><a:srgbClr val="F79646"/></a:accent6>"#,
    r#"<a:hlink><a:srgbClr val="0000FF"/></a:hlink><a:folHlink><a:srgbClr val="800080"/></a:folHlink>"#,
    "</a:clrScheme>",
    r#"<a:fontScheme name="Presentation">"#,
    r#"<a:majorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont>"#,
    r#"<a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont>"#,
    "</a:fontScheme>",
    r#"<a:fmtScheme name="Presentation">"#,
    "<a:fillStyleLst>",
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    "</a:fillStyleLst>",
    "<a:lnStyleLst>",
    r#"<a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"<a:ln w="25400"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    r#"<a:ln w="38100"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln>"#,
    "</a:lnStyleLst>",
    "<a:effectStyleLst>",
    "<a:effectStyle><a:effectLst/></a:effectStyle>",
    "<a:effectStyle><a:effectLst/></a:effectStyle>",
    "<a:effectStyle><a:effectLst/></a:effectStyle>",
    "</a:effectStyleLst>",
    "<a:bgFillStyleLst>",
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    r#"<a:solidFill><a:schemeClr val="phClr"/></a:solidFill>"#,
    "</a:bgFillStyleLst>",
    "</a:fmtScheme>",
    "</a:themeElements>",
    "</a:theme>"
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_filename() {
        assert_eq!(safe_filename("Space exploration"), "Space_exploration");
        assert_eq!(safe_filename("  What? Why!  "), "What_Why");
        assert_eq!(safe_filename("Космос и люди"), "Космос_и_люди");
        assert_eq!(safe_filename("a-b"), "a-b");
        assert_eq!(safe_filename("???"), "presentation");
        assert_eq!(safe_filename(&"x".repeat(100)).chars().count(), 40);
    }

    #[test]
    fn test_title_font_size() {
        assert_eq!(title_font_size("Short"), 33);
        assert_eq!(title_font_size(&"a".repeat(53)), 30);
        assert_eq!(title_font_size(&"a".repeat(71)), 26);
        assert_eq!(title_font_size(&"a".repeat(91)), 24);
    }

    #[test]
    fn test_body_font_size() {
        let bullets = |n: usize, len: usize| vec!["b".repeat(len); n];
        assert_eq!(body_font_size(&bullets(3, 20)), 19);
        assert_eq!(body_font_size(&bullets(4, 20)), 18);
        assert_eq!(body_font_size(&bullets(5, 20)), 16);
        assert_eq!(body_font_size(&bullets(1, 180)), 18);
        assert_eq!(body_font_size(&bullets(1, 220)), 16);
        assert_eq!(body_font_size(&bullets(3, 200)), 18);
        assert_eq!(body_font_size(&[]), 19);
    }

    #[test]
    fn test_slide_text_is_escaped() {
        let xml = slide_xml(&SlideContent {
            title: "Tom & Jerry <3".to_string(),
            bullets: vec!["\"quoted\"\u{0007}".to_string()],
        });
        assert!(xml.contains("Tom &amp; Jerry &lt;3"));
        assert!(xml.contains("&quot;quoted&quot;"));
        assert!(!xml.contains('\u{0007}'));
    }

    #[test]
    fn test_presentation_lists_every_slide() {
        let xml = presentation_xml(3);
        assert!(xml.contains(r#"<p:sldId id="256" r:id="rId2"/>"#));
        assert!(xml.contains(r#"<p:sldId id="258" r:id="rId4"/>"#));

        let rels = presentation_rels_xml(3);
        assert!(rels.contains(r#"Id="rId4""#));
        assert!(rels.contains(r#"Id="rId5""#) && rels.contains("theme/theme1.xml"));
    }
}
