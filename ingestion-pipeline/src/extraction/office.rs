//! In-process parsers for Office Open XML formats: DOCX and PPTX text via
//! the zip container's XML parts, XLSX rows via calamine. All parsing is
//! synchronous and CPU-bound; callers run it under `spawn_blocking`.

use std::io::{Cursor, Read};

use calamine::{Data, Reader};
use common::error::AppError;
use serde_json::{Map, Value};

use super::Extraction;

/// Word document: paragraph text from `word/document.xml`. Embedded images
/// under `word/media/` are staged into a scratch directory scoped to this
/// extraction; the directory and its contents are removed when the function
/// returns.
pub(crate) fn extract_docx(content: &[u8]) -> Result<Extraction, AppError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(content))
        .map_err(|e| AppError::Extraction(format!("not a readable docx container: {e}")))?;

    let xml = read_archive_file(&mut archive, "word/document.xml")?;
    let text = text_from_xml(&xml);

    let media_names: Vec<String> = archive
        .file_names()
        .filter(|name| name.starts_with("word/media/"))
        .map(str::to_string)
        .collect();

    let mut metadata = Map::new();
    if !media_names.is_empty() {
        let scratch = tempfile::tempdir()
            .map_err(|e| AppError::Extraction(format!("failed to create scratch dir: {e}")))?;
        let mut staged = 0usize;
        for name in &media_names {
            let Ok(mut file) = archive.by_name(name) else {
                continue;
            };
            let mut bytes = Vec::new();
            if file.read_to_end(&mut bytes).is_err() {
                continue;
            }
            let target = scratch
                .path()
                .join(name.rsplit('/').next().unwrap_or("image"));
            if std::fs::write(target, bytes).is_ok() {
                staged += 1;
            }
        }
        metadata.insert("embedded_images".into(), Value::from(staged));
        // scratch drops here and takes the staged files with it
    }

    Ok(Extraction { text, metadata })
}

/// Presentation: one text block per slide, in slide order.
pub(crate) fn extract_pptx(content: &[u8]) -> Result<Extraction, AppError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(content))
        .map_err(|e| AppError::Extraction(format!("not a readable pptx container: {e}")))?;

    let mut slide_names: Vec<String> = archive
        .file_names()
        .filter(|name| name.starts_with("ppt/slides/slide") && name.ends_with(".xml"))
        .map(str::to_string)
        .collect();
    slide_names.sort_by_key(|name| {
        name.trim_start_matches("ppt/slides/slide")
            .trim_end_matches(".xml")
            .parse::<u32>()
            .unwrap_or(0)
    });

    let mut sections = Vec::with_capacity(slide_names.len());
    for (index, name) in slide_names.iter().enumerate() {
        let xml = read_archive_file(&mut archive, name)?;
        let slide_text = text_from_xml(&xml);
        if !slide_text.is_empty() {
            sections.push(format!("Slide {}:\n{slide_text}", index + 1));
        }
    }

    let mut metadata = Map::new();
    metadata.insert("slide_count".into(), Value::from(slide_names.len()));
    Ok(Extraction {
        text: sections.join("\n\n"),
        metadata,
    })
}

/// Workbook: every sheet rendered as comma-joined rows, or a single sheet
/// when `sheet` names one.
pub(crate) fn extract_xlsx(content: &[u8], sheet: Option<&str>) -> Result<Extraction, AppError> {
    let mut workbook = calamine::open_workbook_auto_from_rs(Cursor::new(content))
        .map_err(|e| AppError::Extraction(format!("not a readable workbook: {e}")))?;

    let sheet_names: Vec<String> = match sheet {
        Some(name) => {
            if !workbook.sheet_names().iter().any(|s| s == name) {
                return Err(AppError::Extraction(format!(
                    "workbook has no sheet named '{name}'"
                )));
            }
            vec![name.to_string()]
        }
        None => workbook.sheet_names().to_vec(),
    };

    let mut sections = Vec::with_capacity(sheet_names.len());
    for name in &sheet_names {
        let range = workbook
            .worksheet_range(name)
            .map_err(|e| AppError::Extraction(format!("failed to read sheet '{name}': {e}")))?;
        let rows: Vec<String> = range.rows().map(row_line).collect();
        sections.push(format!("Sheet: {name}\n{}", rows.join("\n")));
    }

    let mut metadata = Map::new();
    metadata.insert("sheet_count".into(), Value::from(sheet_names.len()));
    Ok(Extraction {
        text: sections.join("\n\n"),
        metadata,
    })
}

pub(crate) fn row_line(cells: &[Data]) -> String {
    cells
        .iter()
        .map(cell_text)
        .collect::<Vec<_>>()
        .join(", ")
}

pub(crate) fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(f) => f.to_string(),
        Data::Int(i) => i.to_string(),
        Data::Bool(b) => b.to_string(),
        Data::DateTime(dt) => dt.to_string(),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
    }
}

fn read_archive_file(
    archive: &mut zip::ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<String, AppError> {
    let mut file = archive
        .by_name(name)
        .map_err(|e| AppError::Extraction(format!("container is missing {name}: {e}")))?;
    let mut xml = String::new();
    file.read_to_string(&mut xml)
        .map_err(|e| AppError::Extraction(format!("failed to read {name}: {e}")))?;
    Ok(xml)
}

/// Text runs in both WordprocessingML and DrawingML live in `<w:t>` /
/// `<a:t>` elements; paragraphs end at `<w:p>` / `<a:p>`.
fn text_from_xml(xml: &str) -> String {
    use quick_xml::events::Event;
    use quick_xml::Reader;

    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut lines: Vec<String> = Vec::new();
    let mut current_line = String::new();
    let mut in_text_element = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => {
                in_text_element = true;
            }
            Ok(Event::Text(e)) => {
                if in_text_element {
                    if let Ok(text) = e.unescape() {
                        current_line.push_str(&text);
                    }
                }
            }
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text_element = false,
                b"p" => {
                    let line = current_line.trim().to_string();
                    if !line.is_empty() {
                        lines.push(line);
                    }
                    current_line.clear();
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
    }

    let tail = current_line.trim();
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

    fn container(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        let mut writer = zip::ZipWriter::new(&mut buffer);
        for (name, bytes) in files {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .expect("start zip entry");
            writer.write_all(bytes).expect("write zip entry");
        }
        writer.finish().expect("finish zip");
        buffer.into_inner()
    }

    #[test]
    fn docx_paragraph_text_is_extracted() {
        let document = br#"<?xml version="1.0"?>
            <w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
              <w:body>
                <w:p><w:r><w:t>First paragraph.</w:t></w:r></w:p>
                <w:p><w:r><w:t>Second </w:t></w:r><w:r><w:t>paragraph.</w:t></w:r></w:p>
              </w:body>
            </w:document>"#;
        let bytes = container(&[("word/document.xml", document.as_slice())]);

        let extraction = extract_docx(&bytes).expect("docx extraction");
        assert_eq!(extraction.text, "First paragraph.\nSecond paragraph.");
        assert!(extraction.metadata.get("embedded_images").is_none());
    }

    #[test]
    fn docx_embedded_images_are_counted() {
        let document = br#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
            <w:body><w:p><w:r><w:t>Body.</w:t></w:r></w:p></w:body></w:document>"#;
        let bytes = container(&[
            ("word/document.xml", document.as_slice()),
            ("word/media/image1.png", b"\x89PNG".as_slice()),
            ("word/media/image2.png", b"\x89PNG".as_slice()),
        ]);

        let extraction = extract_docx(&bytes).expect("docx extraction");
        assert_eq!(extraction.text, "Body.");
        assert_eq!(
            extraction.metadata.get("embedded_images"),
            Some(&Value::from(2))
        );
    }

    #[test]
    fn pptx_slides_are_emitted_in_order() {
        let slide = |text: &str| {
            format!(
                r#"<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main">
                    <a:p><a:r><a:t>{text}</a:t></a:r></a:p></p:sld>"#
            )
        };
        let first = slide("Intro");
        let second = slide("Results");
        let bytes = container(&[
            ("ppt/slides/slide2.xml", second.as_bytes()),
            ("ppt/slides/slide1.xml", first.as_bytes()),
        ]);

        let extraction = extract_pptx(&bytes).expect("pptx extraction");
        assert_eq!(extraction.text, "Slide 1:\nIntro\n\nSlide 2:\nResults");
        assert_eq!(extraction.metadata.get("slide_count"), Some(&Value::from(2)));
    }

    #[test]
    fn workbook_cells_render_as_text() {
        assert_eq!(
            row_line(&[
                Data::String("name".into()),
                Data::Int(3),
                Data::Float(2.5),
                Data::Bool(true),
                Data::Empty,
            ]),
            "name, 3, 2.5, true, "
        );
    }

    #[test]
    fn broken_containers_are_rejected() {
        assert!(matches!(
            extract_docx(b"not a zip"),
            Err(AppError::Extraction(_))
        ));
        assert!(matches!(
            extract_pptx(b"not a zip"),
            Err(AppError::Extraction(_))
        ));
    }
}
