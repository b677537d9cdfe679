use anyhow::Result;
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use zip::ZipArchive;

use presentations::generation::pptx::{write_presentation, PptxBuilder};
use presentations::generation::{FileBuilder, GenerationRequest, SlideContent};
use presentations::templates::{TemplateAsset, TemplateCatalog, TemplateFormat};

// Bytes are embedded as-is, the image is never decoded
const FAKE_PNG: &[u8] = b"\x89PNG\r\n\x1a\nnot really an image";
const FAKE_JPEG: &[u8] = b"\xFF\xD8\xFF\xE0\x00\x10JFIF\x00not really an image";

fn template_in(dir: &Path, id: u32) -> Result<TemplateAsset> {
    let path = dir.join(format!("{id}.png"));
    fs::write(&path, FAKE_PNG)?;
    Ok(TemplateAsset {
        id,
        path,
        format: TemplateFormat::Png,
    })
}

fn slides(count: usize) -> Vec<SlideContent> {
    (1..=count)
        .map(|i| SlideContent {
            title: format!("Slide {i}"),
            bullets: vec![format!("First point of {i}"), "Fish & chips <cheap>".to_string()],
        })
        .collect()
}

fn read_entry(archive: &mut ZipArchive<File>, name: &str) -> Result<String> {
    let mut content = String::new();
    archive.by_name(name)?.read_to_string(&mut content)?;
    Ok(content)
}

#[test]
fn test_write_presentation_package_layout() -> Result<()> {
    let dir = TempDir::new()?;
    let template = template_in(dir.path(), 1)?;
    let path = dir.path().join("deck.pptx");

    write_presentation(&path, &template, &slides(3), "Space exploration")?;

    let mut archive = ZipArchive::new(File::open(&path)?)?;
    for name in [
        "[Content_Types].xml",
        "_rels/.rels",
        "docProps/core.xml",
        "docProps/app.xml",
        "ppt/presentation.xml",
        "ppt/_rels/presentation.xml.rels",
        "ppt/slideMasters/slideMaster1.xml",
        "ppt/slideLayouts/slideLayout1.xml",
        "ppt/theme/theme1.xml",
        "ppt/slides/slide1.xml",
        "ppt/slides/slide3.xml",
        "ppt/slides/_rels/slide3.xml.rels",
    ] {
        assert!(archive.by_name(name).is_ok(), "missing part {name}");
    }
    assert!(archive.by_name("ppt/slides/slide4.xml").is_err());

    let mut image = Vec::new();
    archive
        .by_name("ppt/media/background.png")?
        .read_to_end(&mut image)?;
    assert_eq!(image, FAKE_PNG);

    let slide = read_entry(&mut archive, "ppt/slides/slide2.xml")?;
    assert!(slide.contains("Slide 2"));
    assert!(slide.contains("Fish &amp; chips &lt;cheap&gt;"));

    let core = read_entry(&mut archive, "docProps/core.xml")?;
    assert!(core.contains("Space exploration"));
    Ok(())
}

#[test]
fn test_write_presentation_rejects_empty_template() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("7.png");
    fs::write(&path, b"")?;
    let template = TemplateAsset {
        id: 7,
        path,
        format: TemplateFormat::Png,
    };
    let output = dir.path().join("deck.pptx");

    assert!(write_presentation(&output, &template, &slides(1), "Empty").is_err());
    assert!(!output.exists());
    Ok(())
}

#[tokio::test]
async fn test_builder_writes_into_per_user_directory() -> Result<()> {
    let assets = TempDir::new()?;
    let output = TempDir::new()?;
    let template = template_in(assets.path(), 2)?;
    let builder = PptxBuilder::new(output.path());

    let request = GenerationRequest {
        user_id: 42,
        template_id: 2,
        slide_count: 2,
        topic: "Rust / async?".to_string(),
        language: "en".to_string(),
    };
    let path = builder.build(&request, &template, &slides(2)).await?;

    assert!(path.exists());
    assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("Rust_async.pptx"));
    let job_dir = path.parent().map(PathBuf::from).unwrap_or_default();
    assert_eq!(job_dir.parent(), Some(output.path()));
    assert!(job_dir
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n.starts_with("42_")));

    let archive = ZipArchive::new(File::open(&path)?)?;
    let slide_parts = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .count();
    assert_eq!(slide_parts, 2);
    Ok(())
}

#[tokio::test]
async fn test_builder_cleans_up_on_failure() -> Result<()> {
    let output = TempDir::new()?;
    let builder = PptxBuilder::new(output.path());
    let template = TemplateAsset {
        id: 9,
        path: output.path().join("does-not-exist.png"),
        format: TemplateFormat::Png,
    };
    let request = GenerationRequest {
        user_id: 5,
        template_id: 9,
        slide_count: 1,
        topic: "Missing".to_string(),
        language: "en".to_string(),
    };

    assert!(builder.build(&request, &template, &slides(1)).await.is_err());
    assert_eq!(fs::read_dir(output.path())?.count(), 0);
    Ok(())
}

#[test]
fn test_catalog_scan_picks_numbered_images() -> Result<()> {
    let dir = TempDir::new()?;
    fs::write(dir.path().join("1.png"), FAKE_PNG)?;
    fs::write(dir.path().join("3.jpg"), FAKE_JPEG)?;
    fs::write(dir.path().join("notes.txt"), b"ignored")?;
    fs::write(dir.path().join("cover.png"), FAKE_PNG)?;

    let catalog = TemplateCatalog::scan(dir.path())?;

    assert_eq!(catalog.ids(), vec![1, 3]);
    assert_eq!(catalog.get(3).map(|t| t.format), Some(TemplateFormat::Jpeg));
    assert!(!catalog.contains(2));
    Ok(())
}
