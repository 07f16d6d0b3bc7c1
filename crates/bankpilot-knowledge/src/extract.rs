//! Content extraction: raw document bytes to normalized plain text.
//!
//! Dispatch is a closed set of format variants detected from the declared
//! content type first, then the locator's extension. Extraction never
//! fails the pipeline: a branch that cannot parse its input degrades to a
//! placeholder marker recording the format and byte length.

use std::io::Read;

use tracing::warn;

/// Document format tag driving the extraction strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocFormat {
    Pdf,
    /// Word-processor documents (docx).
    Word,
    /// Spreadsheet workbooks (xlsx, xls).
    Spreadsheet,
    /// Delimited text (csv).
    Delimited,
    /// Plain text and text-like content.
    Text,
    /// Anything unrecognized; always degrades to the placeholder.
    Other(String),
}

impl DocFormat {
    /// Detect from a content-type header (preferred) or the locator's
    /// file extension.
    pub fn detect(content_type: Option<&str>, locator: &str) -> Self {
        if let Some(ct) = content_type {
            let mime = ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
            match mime.as_str() {
                "application/pdf" => return Self::Pdf,
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
                | "application/msword" => return Self::Word,
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
                | "application/vnd.ms-excel" => return Self::Spreadsheet,
                "text/csv" => return Self::Delimited,
                _ => {
                    if mime.starts_with("text/") {
                        return Self::Text;
                    }
                }
            }
        }

        let ext = locator
            .split(['?', '#'])
            .next()
            .unwrap_or(locator)
            .rsplit('.')
            .next()
            .unwrap_or("")
            .to_ascii_lowercase();
        Self::from_extension(&ext)
    }

    pub fn from_extension(ext: &str) -> Self {
        match ext {
            "pdf" => Self::Pdf,
            "docx" | "doc" => Self::Word,
            "xlsx" | "xls" => Self::Spreadsheet,
            "csv" => Self::Delimited,
            "txt" | "text" | "md" | "html" | "htm" => Self::Text,
            other => Self::Other(other.to_string()),
        }
    }

    /// Short label used in the degradation marker.
    pub fn label(&self) -> &str {
        match self {
            Self::Pdf => "pdf",
            Self::Word => "docx",
            Self::Spreadsheet => "xlsx",
            Self::Delimited => "csv",
            Self::Text => "txt",
            Self::Other(ext) => ext,
        }
    }
}

/// Collapse whitespace runs to single spaces and trim.
pub fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Convert raw bytes to collapsed plain text. Pure transform: parse
/// failures are logged and degrade to `[BINARY {format} {len}B]`.
pub fn extract_text(format: &DocFormat, bytes: &[u8]) -> String {
    let result = match format {
        DocFormat::Pdf => extract_pdf(bytes),
        DocFormat::Word => extract_docx(bytes),
        DocFormat::Spreadsheet => extract_workbook(bytes),
        DocFormat::Delimited => extract_delimited(bytes),
        DocFormat::Text => Ok(String::from_utf8_lossy(bytes).into_owned()),
        DocFormat::Other(ext) => Err(format!("unrecognized format '{ext}'")),
    };

    match result {
        Ok(text) => collapse(&text),
        Err(e) => {
            warn!("extraction failed ({}): {e}", format.label());
            format!("[BINARY {} {}B]", format.label(), bytes.len())
        }
    }
}

fn extract_pdf(bytes: &[u8]) -> Result<String, String> {
    pdf_extract::extract_text_from_mem(bytes).map_err(|e| e.to_string())
}

/// A docx is a zip archive; the body text lives in `word/document.xml`.
fn extract_docx(bytes: &[u8]) -> Result<String, String> {
    let cursor = std::io::Cursor::new(bytes);
    let mut archive = zip::ZipArchive::new(cursor).map_err(|e| e.to_string())?;
    let mut file = archive
        .by_name("word/document.xml")
        .map_err(|e| e.to_string())?;
    let mut xml = String::new();
    file.read_to_string(&mut xml).map_err(|e| e.to_string())?;
    Ok(strip_xml_tags(&xml))
}

/// Drop markup, keep character data. Paragraph closes become spaces so
/// adjacent runs do not fuse into one word.
fn strip_xml_tags(xml: &str) -> String {
    let spaced = xml.replace("</w:p>", " ");
    let mut out = String::with_capacity(spaced.len() / 2);
    let mut in_tag = false;
    for c in spaced.chars() {
        match c {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
}

/// Serialize every sheet as "name: cell cell ..." rows.
fn extract_workbook(bytes: &[u8]) -> Result<String, String> {
    use calamine::Reader;

    let cursor = std::io::Cursor::new(bytes.to_vec());
    let mut workbook =
        calamine::open_workbook_auto_from_rs(cursor).map_err(|e| e.to_string())?;

    let mut out = String::new();
    for name in workbook.sheet_names().to_owned() {
        let range = match workbook.worksheet_range(&name) {
            Ok(r) => r,
            Err(e) => return Err(e.to_string()),
        };
        out.push_str(&name);
        out.push_str(": ");
        for row in range.rows() {
            for cell in row {
                let s = cell.to_string();
                if !s.is_empty() {
                    out.push_str(&s);
                    out.push(' ');
                }
            }
        }
        out.push('\n');
    }
    Ok(out)
}

/// Cell values joined by spaces, row per line.
fn extract_delimited(bytes: &[u8]) -> Result<String, String> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut out = String::new();
    for record in reader.records() {
        let record = record.map_err(|e| e.to_string())?;
        out.push_str(&record.iter().collect::<Vec<_>>().join(" "));
        out.push('\n');
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_prefers_content_type() {
        let fmt = DocFormat::detect(Some("application/pdf"), "https://x.example/report.txt");
        assert_eq!(fmt, DocFormat::Pdf);
    }

    #[test]
    fn test_detect_content_type_with_parameters() {
        let fmt = DocFormat::detect(Some("text/csv; charset=utf-8"), "https://x.example/data");
        assert_eq!(fmt, DocFormat::Delimited);
    }

    #[test]
    fn test_detect_falls_back_to_extension() {
        let fmt = DocFormat::detect(None, "https://x.example/fees.xlsx?dl=1");
        assert_eq!(fmt, DocFormat::Spreadsheet);
        let fmt = DocFormat::detect(None, "https://x.example/terms.docx");
        assert_eq!(fmt, DocFormat::Word);
    }

    #[test]
    fn test_detect_unknown_extension() {
        let fmt = DocFormat::detect(None, "https://x.example/logo.png");
        assert_eq!(fmt, DocFormat::Other("png".to_string()));
    }

    #[test]
    fn test_collapse_normalizes_whitespace() {
        assert_eq!(collapse("  a\t\tb\n\n c "), "a b c");
        assert_eq!(collapse(""), "");
    }

    #[test]
    fn test_plain_text_passthrough() {
        let text = extract_text(&DocFormat::Text, b"hello   world\n");
        assert_eq!(text, "hello world");
    }

    #[test]
    fn test_csv_cells_joined() {
        let text = extract_text(&DocFormat::Delimited, b"name,fee\nAcme,12\n");
        assert_eq!(text, "name fee Acme 12");
    }

    #[test]
    fn test_unknown_format_degrades_to_marker() {
        let text = extract_text(&DocFormat::Other("png".into()), &[0u8; 42]);
        assert_eq!(text, "[BINARY png 42B]");
    }

    #[test]
    fn test_corrupt_pdf_degrades_to_marker() {
        let text = extract_text(&DocFormat::Pdf, b"not a pdf");
        assert_eq!(text, "[BINARY pdf 9B]");
    }

    #[test]
    fn test_corrupt_docx_degrades_to_marker() {
        let text = extract_text(&DocFormat::Word, b"not a zip archive");
        assert!(text.starts_with("[BINARY docx"));
    }

    #[test]
    fn test_strip_xml_tags() {
        let xml = "<w:body><w:p><w:t>Hello</w:t></w:p><w:p><w:t>World &amp; Co</w:t></w:p></w:body>";
        let text = collapse(&strip_xml_tags(xml));
        assert_eq!(text, "Hello World & Co");
    }
}
