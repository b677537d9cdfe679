//! # Template Catalog
//!
//! Scans the templates directory for background images. A file is a
//! template when its stem starts with a number (`1.png`, `02-ocean.jpg`) and
//! its content is a PNG or JPEG image. The catalog is built once at startup
//! and never changes afterwards.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

// Bytes read from a file for format detection
const FORMAT_DETECTION_BUFFER_SIZE: usize = 32;
const MIN_FORMAT_BYTES: usize = 8;

lazy_static! {
    static ref TEMPLATE_ID_REGEX: Regex =
        Regex::new(r"^(\d+)").expect("Template id pattern should be valid");
}

/// Image formats accepted as slide backgrounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateFormat {
    Png,
    Jpeg,
}

impl TemplateFormat {
    pub fn extension(self) -> &'static str {
        match self {
            TemplateFormat::Png => "png",
            TemplateFormat::Jpeg => "jpeg",
        }
    }

    pub fn mime_type(self) -> &'static str {
        match self {
            TemplateFormat::Png => "image/png",
            TemplateFormat::Jpeg => "image/jpeg",
        }
    }
}

/// A selectable background image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateAsset {
    pub id: u32,
    pub path: PathBuf,
    pub format: TemplateFormat,
}

/// Read-only set of templates keyed by id
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    assets: BTreeMap<u32, TemplateAsset>,
}

impl TemplateCatalog {
    /// Scan a directory for template images
    ///
    /// A missing directory yields an empty catalog. When several files share
    /// an id, the first one in path order is kept.
    pub fn scan(dir: &Path) -> std::io::Result<Self> {
        let mut catalog = Self::default();

        if !dir.is_dir() {
            warn!(templates_dir = %dir.display(), "Templates directory not found");
            return Ok(catalog);
        }

        let mut paths = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_file())
            .collect::<Vec<_>>();
        paths.sort();

        for path in paths {
            let Some(id) = parse_template_id(&path) else {
                debug!(path = %path.display(), "Skipping file without numeric prefix");
                continue;
            };
            if catalog.assets.contains_key(&id) {
                debug!(template_id = id, path = %path.display(), "Duplicate template id ignored");
                continue;
            }
            match detect_template_format(&path) {
                Some(format) => {
                    catalog.assets.insert(id, TemplateAsset { id, path, format });
                }
                None => {
                    warn!(path = %path.display(), "Unsupported template image format");
                }
            }
        }

        info!(
            templates_dir = %dir.display(),
            templates = catalog.assets.len(),
            "Template catalog loaded"
        );
        Ok(catalog)
    }

    /// Build a catalog from already known assets
    pub fn from_assets(assets: impl IntoIterator<Item = TemplateAsset>) -> Self {
        Self {
            assets: assets.into_iter().map(|a| (a.id, a)).collect(),
        }
    }

    pub fn get(&self, id: u32) -> Option<&TemplateAsset> {
        self.assets.get(&id)
    }

    pub fn contains(&self, id: u32) -> bool {
        self.assets.contains_key(&id)
    }

    /// Template ids in ascending order
    pub fn ids(&self) -> Vec<u32> {
        self.assets.keys().copied().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }
}

/// Leading numeric prefix of the file stem
pub fn parse_template_id(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    TEMPLATE_ID_REGEX
        .captures(stem)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Detect a PNG or JPEG file from its leading bytes using image::guess_format
pub fn detect_template_format(path: &Path) -> Option<TemplateFormat> {
    let file = File::open(path).ok()?;
    let mut reader = BufReader::new(file);
    let mut buffer = vec![0; FORMAT_DETECTION_BUFFER_SIZE];

    let bytes_read = reader.read(&mut buffer).ok()?;
    if bytes_read < MIN_FORMAT_BYTES {
        debug!(path = %path.display(), bytes_read, "Not enough bytes to detect image format");
        return None;
    }
    buffer.truncate(bytes_read);

    match image::guess_format(&buffer) {
        Ok(image::ImageFormat::Png) => Some(TemplateFormat::Png),
        Ok(image::ImageFormat::Jpeg) => Some(TemplateFormat::Jpeg),
        Ok(other) => {
            debug!(path = %path.display(), format = ?other, "Image format not accepted for templates");
            None
        }
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    const PNG_MAGIC: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
    const JPEG_MAGIC: &[u8] = b"\xff\xd8\xff\xe0\0\x10JFIF\0";

    fn write_file(dir: &Path, name: &str, content: &[u8]) {
        let mut file = File::create(dir.join(name)).unwrap();
        file.write_all(content).unwrap();
    }

    #[test]
    fn test_parse_template_id() {
        assert_eq!(parse_template_id(Path::new("1.png")), Some(1));
        assert_eq!(parse_template_id(Path::new("/a/12-ocean.jpg")), Some(12));
        assert_eq!(parse_template_id(Path::new("007.jpeg")), Some(7));
        assert_eq!(parse_template_id(Path::new("ocean.png")), None);
        assert_eq!(parse_template_id(Path::new("x1.png")), None);
    }

    #[test]
    fn test_scan_detects_formats_by_content() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "1.png", PNG_MAGIC);
        write_file(dir.path(), "2-dark.jpg", JPEG_MAGIC);
        // Extension lies, content is PNG
        write_file(dir.path(), "3.jpg", PNG_MAGIC);
        write_file(dir.path(), "4.png", b"not an image at all");
        write_file(dir.path(), "readme.txt", b"templates");

        let catalog = TemplateCatalog::scan(dir.path()).unwrap();

        assert_eq!(catalog.ids(), vec![1, 2, 3]);
        assert_eq!(catalog.get(1).unwrap().format, TemplateFormat::Png);
        assert_eq!(catalog.get(2).unwrap().format, TemplateFormat::Jpeg);
        assert_eq!(catalog.get(3).unwrap().format, TemplateFormat::Png);
        assert!(!catalog.contains(4));
    }

    #[test]
    fn test_duplicate_ids_keep_first_path() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "1-a.png", PNG_MAGIC);
        write_file(dir.path(), "1-b.png", PNG_MAGIC);

        let catalog = TemplateCatalog::scan(dir.path()).unwrap();
        assert_eq!(catalog.len(), 1);
        assert!(catalog.get(1).unwrap().path.ends_with("1-a.png"));
    }

    #[test]
    fn test_missing_directory_is_empty_catalog() {
        let catalog = TemplateCatalog::scan(Path::new("/definitely/not/here")).unwrap();
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_short_file_is_rejected() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "1.png", b"\x89PN");
        assert_eq!(detect_template_format(&dir.path().join("1.png")), None);
    }
}
