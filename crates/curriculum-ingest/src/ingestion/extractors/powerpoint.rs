//! PowerPoint presentations (.pptx) via zip + quick-xml

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::Reader;

use super::FormatExtractor;
use crate::error::{Error, Result};
use crate::processing::ExtractionVariant;

const SLIDE_PREFIX: &str = "ppt/slides/slide";

/// Extracts `<a:t>` text runs slide by slide
///
/// Each slide yields a `Slide N:` heading paragraph followed by its body, so
/// boilerplate repeated on every slide ends up in identical paragraphs.
pub struct PowerPointExtractor;

impl FormatExtractor for PowerPointExtractor {
    fn name(&self) -> &'static str {
        "pptx-xml"
    }

    fn try_primary(&self, path: &Path, _variant: ExtractionVariant) -> Result<String> {
        let file = BufReader::new(File::open(path)?);
        let mut archive = zip::ZipArchive::new(file)
            .map_err(|e| Error::extraction("pptx-xml", e.to_string()))?;

        let mut slide_names: Vec<(u32, String)> = archive
            .file_names()
            .filter_map(|name| slide_number(name).map(|n| (n, name.to_string())))
            .collect();
        slide_names.sort();

        if slide_names.is_empty() {
            return Err(Error::extraction("pptx-xml", "no slides found in archive"));
        }

        let mut sections = Vec::new();
        for (number, name) in slide_names {
            let mut xml = String::new();
            match archive.by_name(&name) {
                Ok(mut entry) => {
                    if let Err(e) = entry.read_to_string(&mut xml) {
                        tracing::debug!("Skipping unreadable slide {}: {}", number, e);
                        continue;
                    }
                }
                Err(e) => {
                    tracing::debug!("Skipping missing slide {}: {}", number, e);
                    continue;
                }
            }

            let body = slide_text(&xml);
            if !body.is_empty() {
                sections.push(format!("Slide {}:", number));
                sections.push(body);
            }
        }

        Ok(sections.join("\n\n"))
    }
}

/// `ppt/slides/slide12.xml` -> 12
fn slide_number(name: &str) -> Option<u32> {
    name.strip_prefix(SLIDE_PREFIX)?
        .strip_suffix(".xml")?
        .parse()
        .ok()
}

/// Text of one slide, one line per `<a:p>` paragraph
fn slide_text(xml: &str) -> String {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut lines = Vec::new();
    let mut current = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::Text(e)) if in_text => {
                if let Ok(text) = e.unescape() {
                    current.push_str(&text);
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    let line = current.trim();
                    if !line.is_empty() {
                        lines.push(line.to_string());
                    }
                    current.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                tracing::debug!("Malformed slide XML: {}", e);
                break;
            }
            _ => {}
        }
    }

    let tail = current.trim();
    if !tail.is_empty() {
        lines.push(tail.to_string());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    fn slide_xml(paragraphs: &[&str]) -> String {
        let body: String = paragraphs
            .iter()
            .map(|p| format!("<a:p><a:r><a:t>{}</a:t></a:r></a:p>", p))
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main"><p:cSld><p:spTree><p:sp><p:txBody>{}</p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
            body
        )
    }

    #[test]
    fn test_slide_number() {
        assert_eq!(slide_number("ppt/slides/slide12.xml"), Some(12));
        assert_eq!(slide_number("ppt/slides/_rels/slide1.xml.rels"), None);
        assert_eq!(slide_number("ppt/slideLayouts/slideLayout1.xml"), None);
    }

    #[test]
    fn test_slide_text_joins_runs_per_paragraph() {
        let xml = slide_xml(&["Learning objective", "Students &amp; teachers"]);
        assert_eq!(slide_text(&xml), "Learning objective\nStudents & teachers");
    }

    #[test]
    fn test_slides_in_numeric_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deck.pptx");
        let mut zip = zip::ZipWriter::new(File::create(&path).unwrap());
        let options = SimpleFileOptions::default();
        for (n, text) in [(10, "Tenth slide text"), (2, "Second slide text")] {
            zip.start_file(format!("ppt/slides/slide{}.xml", n), options).unwrap();
            zip.write_all(slide_xml(&[text]).as_bytes()).unwrap();
        }
        zip.finish().unwrap();

        let text = PowerPointExtractor.try_primary(&path, ExtractionVariant::Full).unwrap();
        assert_eq!(
            text,
            "Slide 2:\n\nSecond slide text\n\nSlide 10:\n\nTenth slide text"
        );
    }
}
