// src/services/extractor.rs

//! Archive extraction and document parsing.
//!
//! The extraction directory mirrors the download cache: it holds the single
//! document of the most recent archive. When that document is already present
//! it is parsed again instead of being unzipped a second time.

use std::fs::{self, File};
use std::io::{self, BufRead};
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::Event;
use zip::ZipArchive;

use crate::error::{AppError, Result};
use crate::models::{ParsedDocument, XmlNode};

/// Service that unpacks a snapshot archive and parses its document.
pub struct ArchiveExtractor {
    extract_dir: PathBuf,
}

impl ArchiveExtractor {
    pub fn new(extract_dir: impl Into<PathBuf>) -> Self {
        Self {
            extract_dir: extract_dir.into(),
        }
    }

    /// Unzip `archive_path` (unless already extracted) and parse the document.
    pub fn extract(&self, archive_path: &Path) -> Result<ParsedDocument> {
        let stem = archive_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .ok_or_else(|| AppError::extract(archive_path.display(), "archive has no file name"))?;

        fs::create_dir_all(&self.extract_dir)?;

        if let Some(cached) = self.cached_document(&stem)? {
            log::info!(
                "{} already extracted to {}, parsing cached copy",
                stem,
                cached.display()
            );
            match parse_document(&cached) {
                Ok(document) => return Ok(document),
                Err(e) if archive_path.is_file() => {
                    log::warn!("Cached extraction is unusable ({}), unzipping again", e);
                }
                Err(e) => return Err(e),
            }
        }

        self.purge()?;
        log::info!("Unzipping {}...", archive_path.display());
        let document_path = self.unzip(archive_path)?;
        let document = parse_document(&document_path)?;
        log::info!("Unzipped and parsed {}", archive_path.display());
        Ok(document)
    }

    /// Find an extracted file belonging to the archive named `stem`.
    fn cached_document(&self, stem: &str) -> Result<Option<PathBuf>> {
        for entry in fs::read_dir(&self.extract_dir)? {
            let path = entry?.path();
            if !path.is_file() {
                continue;
            }
            let matches = path.file_stem().is_some_and(|s| s == stem)
                || path.file_name().is_some_and(|n| n == stem);
            if matches {
                return Ok(Some(path));
            }
        }
        Ok(None)
    }

    /// Remove everything left over from a different archive.
    fn purge(&self) -> Result<()> {
        for entry in fs::read_dir(&self.extract_dir)? {
            let entry = entry?;
            let path = entry.path();
            log::info!("Deleting stale extraction {}", path.display());
            if entry.file_type()?.is_dir() {
                fs::remove_dir_all(&path)?;
            } else {
                fs::remove_file(&path)?;
            }
        }
        Ok(())
    }

    /// Unpack the archive, returning the path of its (first) file.
    fn unzip(&self, archive_path: &Path) -> Result<PathBuf> {
        let file = File::open(archive_path)
            .map_err(|e| AppError::extract(archive_path.display(), e))?;
        let mut archive =
            ZipArchive::new(file).map_err(|e| AppError::extract(archive_path.display(), e))?;

        let mut extracted = Vec::new();
        for index in 0..archive.len() {
            let mut entry = archive
                .by_index(index)
                .map_err(|e| AppError::extract(archive_path.display(), e))?;
            if entry.is_dir() {
                continue;
            }
            let relative = entry.enclosed_name().ok_or_else(|| {
                AppError::extract(
                    archive_path.display(),
                    format!("entry '{}' escapes the extraction directory", entry.name()),
                )
            })?;

            let out_path = self.extract_dir.join(relative);
            if let Some(parent) = out_path.parent() {
                fs::create_dir_all(parent)?;
            }
            // Entries land under `.part` until fully written
            let part_path = part_path_for(&out_path);
            let copied = File::create(&part_path).and_then(|mut out| {
                io::copy(&mut entry, &mut out)?;
                out.sync_all()
            });
            if let Err(e) = copied {
                let _ = fs::remove_file(&part_path);
                return Err(AppError::extract(archive_path.display(), e));
            }
            fs::rename(&part_path, &out_path)?;
            extracted.push(out_path);
        }

        if extracted.len() > 1 {
            log::warn!(
                "{} contains {} files, using the first",
                archive_path.display(),
                extracted.len()
            );
        }
        extracted
            .into_iter()
            .next()
            .ok_or_else(|| AppError::extract(archive_path.display(), "archive contains no files"))
    }
}

fn part_path_for(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".part");
    PathBuf::from(name)
}

/// Parse a markup file into a document tree.
pub fn parse_document(path: &Path) -> Result<ParsedDocument> {
    let reader = Reader::from_file(path).map_err(|e| AppError::extract(path.display(), e))?;
    let root = build_tree(reader).map_err(|e| AppError::extract(path.display(), e))?;
    Ok(ParsedDocument {
        source: path.to_path_buf(),
        root,
    })
}

/// Parse markup held in memory.
pub fn parse_str(xml: &str) -> Result<XmlNode> {
    build_tree(Reader::from_str(xml)).map_err(|e| AppError::extract("<memory>", e))
}

fn build_tree<R: BufRead>(mut reader: Reader<R>) -> std::result::Result<XmlNode, String> {
    reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                stack.push(XmlNode::new(String::from_utf8_lossy(e.local_name().as_ref())));
            }
            Ok(Event::Empty(e)) => {
                let node = XmlNode::new(String::from_utf8_lossy(e.local_name().as_ref()));
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::End(_)) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| "closing tag without an open element".to_string())?;
                attach(&mut stack, &mut root, node)?;
            }
            Ok(Event::Text(e)) => {
                if let Some(top) = stack.last_mut() {
                    // Unknown entities are kept verbatim rather than failing the document.
                    let text = e
                        .unescape()
                        .map(|t| t.into_owned())
                        .unwrap_or_else(|_| String::from_utf8_lossy(&e).into_owned());
                    top.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(format!("at byte {}: {}", reader.buffer_position(), e)),
            _ => {}
        }
        buf.clear();
    }

    if let Some(open) = stack.last() {
        return Err(format!("document ended inside <{}>", open.name));
    }
    root.ok_or_else(|| "document has no root element".to_string())
}

fn attach(
    stack: &mut [XmlNode],
    root: &mut Option<XmlNode>,
    node: XmlNode,
) -> std::result::Result<(), String> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_some() => return Err("multiple root elements".to_string()),
        None => *root = Some(node),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<Grants xmlns="http://apply.grants.gov/system/OpportunityDetail-V1.0">
  <OpportunitySynopsisDetail_1_0>
    <OpportunityID>123</OpportunityID>
    <OpportunityTitle>Test &amp; Trial</OpportunityTitle>
    <Description><![CDATA[<p>Health</p>]]></Description>
    <ArchiveDate/>
  </OpportunitySynopsisDetail_1_0>
</Grants>"#;

    fn write_zip(path: &Path, entries: &[(&str, &str)]) {
        let file = File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, body) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_parse_str_builds_tree() {
        let root = parse_str(SAMPLE).unwrap();
        assert_eq!(root.name, "Grants");
        let detail = &root.children[0];
        assert_eq!(detail.name, "OpportunitySynopsisDetail_1_0");

        let names: Vec<&str> = detail.children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(
            names,
            ["OpportunityID", "OpportunityTitle", "Description", "ArchiveDate"]
        );
        assert_eq!(detail.children[1].text, "Test & Trial");
        assert_eq!(detail.children[2].text, "<p>Health</p>");
        assert_eq!(detail.children[3].text, "");
    }

    #[test]
    fn test_parse_str_strips_namespace_prefix() {
        let root = parse_str(r#"<ns:Grants xmlns:ns="urn:x"><ns:Item>1</ns:Item></ns:Grants>"#)
            .unwrap();
        assert_eq!(root.name, "Grants");
        assert_eq!(root.children[0].name, "Item");
    }

    #[test]
    fn test_parse_str_rejects_truncated_document() {
        assert!(parse_str("<Grants><Item>1</Item>").is_err());
        assert!(parse_str("<Grants></Other>").is_err());
        assert!(parse_str("").is_err());
    }

    #[test]
    fn test_extract_unzips_and_parses() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("GrantsDBExtract20240413v2.zip");
        write_zip(&archive, &[("GrantsDBExtract20240413v2.xml", SAMPLE)]);

        let unzipped = tmp.path().join("unzipped");
        std::fs::create_dir_all(&unzipped).unwrap();
        std::fs::write(unzipped.join("GrantsDBExtract20240101v2.xml"), "<old/>").unwrap();

        let doc = ArchiveExtractor::new(&unzipped).extract(&archive).unwrap();

        assert_eq!(doc.root.name, "Grants");
        assert_eq!(doc.source, unzipped.join("GrantsDBExtract20240413v2.xml"));
        assert!(!unzipped.join("GrantsDBExtract20240101v2.xml").exists());
    }

    #[test]
    fn test_extract_reuses_cached_document() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("GrantsDBExtract20240413v2.zip");
        write_zip(&archive, &[("GrantsDBExtract20240413v2.xml", SAMPLE)]);
        let unzipped = tmp.path().join("unzipped");
        let extractor = ArchiveExtractor::new(&unzipped);

        extractor.extract(&archive).unwrap();
        // The archive is gone; a second run must still yield the document.
        std::fs::remove_file(&archive).unwrap();
        let doc = extractor.extract(&archive).unwrap();

        assert_eq!(doc.root.children.len(), 1);
    }

    #[test]
    fn test_extract_replaces_truncated_cached_document() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("GrantsDBExtract20240413v2.zip");
        write_zip(&archive, &[("GrantsDBExtract20240413v2.xml", SAMPLE)]);
        let unzipped = tmp.path().join("unzipped");
        std::fs::create_dir_all(&unzipped).unwrap();
        std::fs::write(
            unzipped.join("GrantsDBExtract20240413v2.xml"),
            "<Grants><OpportunitySynopsisDetail_1_0><Oppor",
        )
        .unwrap();

        let doc = ArchiveExtractor::new(&unzipped).extract(&archive).unwrap();

        assert_eq!(doc.root.name, "Grants");
        assert_eq!(doc.root.children.len(), 1);
        let names: Vec<_> = std::fs::read_dir(&unzipped)
            .unwrap()
            .map(|e| e.unwrap().file_name().into_string().unwrap())
            .collect();
        assert_eq!(names, ["GrantsDBExtract20240413v2.xml"]);
    }

    #[test]
    fn test_extract_ignores_leftover_part_file() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("GrantsDBExtract20240413v2.zip");
        write_zip(&archive, &[("GrantsDBExtract20240413v2.xml", SAMPLE)]);
        let unzipped = tmp.path().join("unzipped");
        std::fs::create_dir_all(&unzipped).unwrap();
        std::fs::write(unzipped.join("GrantsDBExtract20240413v2.xml.part"), "<Gra").unwrap();

        let doc = ArchiveExtractor::new(&unzipped).extract(&archive).unwrap();

        assert_eq!(doc.source, unzipped.join("GrantsDBExtract20240413v2.xml"));
        assert!(!unzipped.join("GrantsDBExtract20240413v2.xml.part").exists());
    }

    #[test]
    fn test_extract_reports_corrupt_archive() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("GrantsDBExtract20240413v2.zip");
        std::fs::write(&archive, b"not a zip").unwrap();

        let result = ArchiveExtractor::new(tmp.path().join("unzipped")).extract(&archive);
        assert!(matches!(result, Err(AppError::Extract { .. })));
    }

    #[test]
    fn test_extract_reports_unparseable_document() {
        let tmp = TempDir::new().unwrap();
        let archive = tmp.path().join("GrantsDBExtract20240413v2.zip");
        write_zip(&archive, &[("GrantsDBExtract20240413v2.xml", "<Grants><open>")]);

        let result = ArchiveExtractor::new(tmp.path().join("unzipped")).extract(&archive);
        assert!(matches!(result, Err(AppError::Extract { .. })));
    }
}
