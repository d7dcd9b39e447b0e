//! Office and PDF text extraction

use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::types::FileType;

/// Replace typographic glyphs that pdf-extract leaves in the text
fn cleanup_pdf_text(text: &str) -> String {
    text.replace('\u{2010}', "-")
        .replace('\u{2011}', "-")
        .replace('\u{00A0}', " ")
        .replace('\u{FB01}', "fi")
        .replace('\u{FB02}', "fl")
        .replace('\u{FB00}', "ff")
        .replace('\u{FB03}', "ffi")
        .replace('\u{FB04}', "ffl")
        .replace('\0', "")
}

/// Text extracted from an uploaded file
#[derive(Debug, Clone)]
pub struct ParsedDocument {
    /// Detected file type
    pub file_type: FileType,
    /// Line-oriented text content
    pub content: String,
    /// SHA-256 of the content
    pub content_hash: String,
    /// Pages, slides or sheets, when the format has them
    pub total_pages: Option<u32>,
}

impl ParsedDocument {
    fn new(file_type: FileType, content: String, total_pages: Option<u32>) -> Self {
        Self {
            file_type,
            content_hash: hash_content(&content),
            content,
            total_pages,
        }
    }
}

/// Multi-format file parser
pub struct FileParser;

impl FileParser {
    /// Parse a file based on its extension
    pub fn parse(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let file_type = FileType::from_filename(filename);

        let parsed = match file_type {
            FileType::Pdf => Self::parse_pdf(filename, data),
            FileType::Docx => Self::parse_docx(filename, data),
            FileType::Pptx => Self::parse_pptx(filename, data),
            FileType::Xlsx | FileType::Xls => Self::parse_spreadsheet(filename, data, file_type),
            FileType::Csv => Self::parse_csv(data),
            FileType::Txt => Ok(ParsedDocument::new(
                FileType::Txt,
                String::from_utf8_lossy(data).to_string(),
                None,
            )),
            FileType::Doc | FileType::Ppt => Err(Error::UnsupportedFileType(format!(
                "{} - legacy binary format, save as {} first",
                filename,
                if file_type == FileType::Doc { ".docx" } else { ".pptx" }
            ))),
            FileType::Xml | FileType::Unknown => Err(Error::UnsupportedFileType(format!(
                "{} - not an Office or PDF document",
                filename
            ))),
        }?;

        tracing::debug!(
            "Extracted {} bytes of text from {} ({})",
            parsed.content.len(),
            filename,
            file_type.display_name()
        );
        Ok(parsed)
    }

    #[cfg(feature = "pdf")]
    fn parse_pdf(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let raw = pdf_extract::extract_text_from_mem(data)
            .map_err(|e| Error::file_parse(filename, format!("Failed to read PDF: {}", e)))?;

        // pdf-extract separates pages with form feeds
        let total_pages = raw.matches('\u{000C}').count() as u32 + 1;

        let content = cleanup_pdf_text(&raw)
            .lines()
            .map(|l| l.trim())
            .filter(|l| !l.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        if content.is_empty() {
            return Err(Error::file_parse(
                filename,
                "No text content could be extracted from PDF",
            ));
        }

        Ok(ParsedDocument::new(FileType::Pdf, content, Some(total_pages)))
    }

    #[cfg(not(feature = "pdf"))]
    fn parse_pdf(filename: &str, _data: &[u8]) -> Result<ParsedDocument> {
        Err(Error::UnsupportedFileType(format!(
            "{} - built without the `pdf` feature",
            filename
        )))
    }

    #[cfg(feature = "docx")]
    fn parse_docx(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        let doc = docx_rs::read_docx(data).map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut content = String::new();
        for child in doc.document.children {
            match child {
                docx_rs::DocumentChild::Paragraph(p) => {
                    content.push_str(&paragraph_text(&p));
                    content.push('\n');
                }
                docx_rs::DocumentChild::Table(table) => {
                    for row in &table.rows {
                        #[allow(irrefutable_let_patterns)]
                        let docx_rs::TableChild::TableRow(row) = row else {
                            continue;
                        };
                        let cells: Vec<String> = row.cells.iter().map(table_cell_text).collect();
                        content.push_str(&cells.join(" | "));
                        content.push('\n');
                    }
                }
                _ => {}
            }
        }

        Ok(ParsedDocument::new(FileType::Docx, content, None))
    }

    #[cfg(not(feature = "docx"))]
    fn parse_docx(filename: &str, _data: &[u8]) -> Result<ParsedDocument> {
        Err(Error::UnsupportedFileType(format!(
            "{} - built without the `docx` feature",
            filename
        )))
    }

    /// Parse PowerPoint presentation (.pptx)
    fn parse_pptx(filename: &str, data: &[u8]) -> Result<ParsedDocument> {
        use std::io::Read;

        let cursor = std::io::Cursor::new(data);
        let mut archive =
            zip::ZipArchive::new(cursor).map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut slide_names: Vec<(u32, String)> = archive
            .file_names()
            .filter(|name| name.starts_with("ppt/slides/slide") && name.ends_with(".xml"))
            .map(|name| {
                let number = name
                    .trim_start_matches("ppt/slides/slide")
                    .trim_end_matches(".xml")
                    .parse::<u32>()
                    .unwrap_or(0);
                (number, name.to_string())
            })
            .collect();
        slide_names.sort();

        let mut content = String::new();
        for (number, name) in &slide_names {
            let mut xml = String::new();
            archive
                .by_name(name)
                .map_err(|e| Error::file_parse(filename, e.to_string()))?
                .read_to_string(&mut xml)?;

            let slide_text = Self::extract_text_from_pptx_xml(&xml);
            if !slide_text.is_empty() {
                content.push_str(&format!("Slide {}:\n{}\n", number, slide_text));
            }
        }

        Ok(ParsedDocument::new(
            FileType::Pptx,
            content,
            Some(slide_names.len() as u32),
        ))
    }

    /// Text runs of a slide, one line per paragraph
    fn extract_text_from_pptx_xml(xml: &str) -> String {
        use quick_xml::events::Event;
        use quick_xml::Reader;

        let mut reader = Reader::from_str(xml);
        reader.config_mut().trim_text(true);

        let mut lines = Vec::new();
        let mut paragraph: Vec<String> = Vec::new();
        let mut in_text = false;

        loop {
            match reader.read_event() {
                Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
                Ok(Event::Text(e)) if in_text => {
                    if let Ok(text) = e.unescape() {
                        if !text.trim().is_empty() {
                            paragraph.push(text.trim().to_string());
                        }
                    }
                }
                Ok(Event::End(e)) => match e.local_name().as_ref() {
                    b"t" => in_text = false,
                    b"p" if !paragraph.is_empty() => {
                        lines.push(paragraph.join(" "));
                        paragraph.clear();
                    }
                    _ => {}
                },
                Ok(Event::Eof) => break,
                Err(e) => {
                    tracing::warn!("Stopped reading slide XML: {}", e);
                    break;
                }
                _ => {}
            }
        }
        if !paragraph.is_empty() {
            lines.push(paragraph.join(" "));
        }

        lines.join("\n")
    }

    #[cfg(feature = "xlsx")]
    fn parse_spreadsheet(filename: &str, data: &[u8], file_type: FileType) -> Result<ParsedDocument> {
        use calamine::Reader;

        let cursor = std::io::Cursor::new(data);
        let mut workbook = calamine::open_workbook_auto_from_rs(cursor)
            .map_err(|e| Error::file_parse(filename, e.to_string()))?;

        let mut content = String::new();
        let sheet_names = workbook.sheet_names().to_vec();
        for sheet_name in &sheet_names {
            let range = match workbook.worksheet_range(sheet_name) {
                Ok(range) => range,
                Err(e) => {
                    tracing::warn!("Skipping sheet {} of {}: {}", sheet_name, filename, e);
                    continue;
                }
            };

            content.push_str(&format!("Sheet: {}\n", sheet_name));
            for row in range.rows() {
                let cells: Vec<String> = row
                    .iter()
                    .map(|cell| match cell {
                        calamine::Data::Empty => String::new(),
                        calamine::Data::String(s) => s.clone(),
                        calamine::Data::Float(f) => f.to_string(),
                        calamine::Data::Int(i) => i.to_string(),
                        calamine::Data::Bool(b) => b.to_string(),
                        calamine::Data::DateTime(dt) => dt.as_f64().to_string(),
                        _ => String::new(),
                    })
                    .collect();

                if !cells.iter().all(|s| s.is_empty()) {
                    content.push_str(&cells.join(" | "));
                    content.push('\n');
                }
            }
        }

        Ok(ParsedDocument::new(
            file_type,
            content,
            Some(sheet_names.len() as u32),
        ))
    }

    #[cfg(not(feature = "xlsx"))]
    fn parse_spreadsheet(filename: &str, _data: &[u8], _file_type: FileType) -> Result<ParsedDocument> {
        Err(Error::UnsupportedFileType(format!(
            "{} - built without the `xlsx` feature",
            filename
        )))
    }

    /// CSV rows joined with ` | `
    fn parse_csv(data: &[u8]) -> Result<ParsedDocument> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(data);

        let mut content = String::new();
        for record in reader.records() {
            let record = record?;
            content.push_str(&record.iter().collect::<Vec<_>>().join(" | "));
            content.push('\n');
        }

        Ok(ParsedDocument::new(FileType::Csv, content, None))
    }
}

#[cfg(feature = "docx")]
fn paragraph_text(paragraph: &docx_rs::Paragraph) -> String {
    let mut text = String::new();
    for child in &paragraph.children {
        if let docx_rs::ParagraphChild::Run(run) = child {
            for child in &run.children {
                if let docx_rs::RunChild::Text(t) = child {
                    text.push_str(&t.text);
                }
            }
        }
    }
    text
}

#[cfg(feature = "docx")]
fn table_cell_text(cell: &docx_rs::TableRowChild) -> String {
    #[allow(irrefutable_let_patterns)]
    let docx_rs::TableRowChild::TableCell(cell) = cell else {
        return String::new();
    };
    cell.children
        .iter()
        .filter_map(|c| match c {
            docx_rs::TableCellContent::Paragraph(p) => Some(paragraph_text(p)),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Hash content for deduplication
fn hash_content(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn non_empty_lines(parsed: &ParsedDocument) -> Vec<&str> {
        parsed
            .content
            .lines()
            .filter(|l| !l.trim().is_empty())
            .collect()
    }

    fn pptx_with_slides(slides: &[(&str, &str)]) -> Vec<u8> {
        let mut buf = std::io::Cursor::new(Vec::new());
        {
            let mut zip = zip::ZipWriter::new(&mut buf);
            let options = zip::write::SimpleFileOptions::default();
            for (name, xml) in slides {
                zip.start_file(*name, options).unwrap();
                zip.write_all(xml.as_bytes()).unwrap();
            }
            zip.finish().unwrap();
        }
        buf.into_inner()
    }

    #[test]
    fn test_pptx_slides_in_numeric_order() {
        let slide = |text: &str| {
            format!(
                r#"<p:sld xmlns:p="p" xmlns:a="a"><a:p><a:r><a:t>{}</a:t></a:r><a:r><a:t>part</a:t></a:r></a:p><a:p><a:r><a:t>second line</a:t></a:r></a:p></p:sld>"#,
                text
            )
        };
        let data = pptx_with_slides(&[
            ("ppt/slides/slide10.xml", &slide("Ten")),
            ("ppt/slides/slide2.xml", &slide("Two")),
            ("docProps/app.xml", "<x/>"),
        ]);

        let parsed = FileParser::parse("deck.pptx", &data).unwrap();
        let lines = non_empty_lines(&parsed);
        assert_eq!(
            lines,
            vec!["Slide 2:", "Two part", "second line", "Slide 10:", "Ten part", "second line"]
        );
        assert_eq!(parsed.total_pages, Some(2));
    }

    #[cfg(feature = "docx")]
    #[test]
    fn test_docx_paragraphs() {
        use docx_rs::{Docx, Paragraph, Run};

        let mut buf = std::io::Cursor::new(Vec::new());
        Docx::new()
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Maintenance")))
            .add_paragraph(Paragraph::new().add_run(Run::new().add_text("Check the valve.")))
            .build()
            .pack(&mut buf)
            .unwrap();

        let parsed = FileParser::parse("manual.docx", buf.get_ref()).unwrap();
        let lines = non_empty_lines(&parsed);
        assert_eq!(lines, vec!["Maintenance", "Check the valve."]);
        assert_eq!(parsed.file_type, FileType::Docx);
    }

    #[test]
    fn test_csv_and_text() {
        let parsed = FileParser::parse("parts.csv", b"id,name\n1,valve\n").unwrap();
        assert_eq!(parsed.content, "id | name\n1 | valve\n");

        let parsed = FileParser::parse("notes.txt", b"a\n\nb\n").unwrap();
        assert_eq!(non_empty_lines(&parsed), vec!["a", "b"]);
        assert_eq!(parsed.content_hash.len(), 64);
    }

    #[test]
    fn test_rejected_types() {
        for name in ["old.doc", "old.ppt", "data.xml", "blob.bin"] {
            let err = FileParser::parse(name, b"whatever").unwrap_err();
            assert!(matches!(err, Error::UnsupportedFileType(_)), "{}", name);
        }
    }

    #[test]
    fn test_corrupt_archive() {
        let err = FileParser::parse("deck.pptx", b"not a zip").unwrap_err();
        assert!(matches!(err, Error::FileParse { .. }));
    }
}
