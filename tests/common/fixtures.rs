//! Builders for real DOCX/XLSX fixture files, written with the same zip
//! layout the stores read back.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

const DOCX_CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="xml" ContentType="application/xml"/></Types>"#,
);

fn xml_escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// Writes a DOCX whose single paragraph holds one run per entry of `runs`.
pub fn docx_with_runs(path: &Path, runs: &[&str]) -> PathBuf {
    docx_with_paragraphs(path, &[runs])
}

/// Writes a DOCX with one paragraph per entry, each holding its own runs.
pub fn docx_with_paragraphs(path: &Path, paragraphs: &[&[&str]]) -> PathBuf {
    let mut body = String::new();
    for runs in paragraphs {
        body.push_str("<w:p>");
        for run in *runs {
            body.push_str(&format!(
                r#"<w:r><w:t xml:space="preserve">{}</w:t></w:r>"#,
                xml_escape(run)
            ));
        }
        body.push_str("</w:p>");
    }
    let document = format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>{body}</w:body></w:document>"#
    );

    let mut writer = ZipWriter::new(File::create(path).expect("fixture file creates"));
    let options = SimpleFileOptions::default();
    writer.start_file("[Content_Types].xml", options).expect("zip entry starts");
    writer.write_all(DOCX_CONTENT_TYPES.as_bytes()).expect("zip entry writes");
    writer.start_file("word/document.xml", options).expect("zip entry starts");
    writer.write_all(document.as_bytes()).expect("zip entry writes");
    writer.finish().expect("zip finishes");
    path.to_path_buf()
}

/// Incremental XLSX builder: shared-string rows, numeric rows, or raw
/// cell XML for malformed-data cases.
#[derive(Default)]
pub struct XlsxFixture {
    shared: Vec<String>,
    rows: Vec<String>,
}

impl XlsxFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an entry to the shared-string table, returning its index.
    pub fn add_shared(&mut self, text: &str) -> usize {
        self.shared.push(text.to_string());
        self.shared.len() - 1
    }

    /// Appends a row of shared-string cells.
    pub fn push_str_row(&mut self, cells: &[&str]) -> &mut Self {
        let mut row = String::new();
        for cell in cells {
            let index = self.add_shared(cell);
            row.push_str(&format!(r#"<c t="s"><v>{index}</v></c>"#));
        }
        self.rows.push(row);
        self
    }

    /// Appends a row of numeric cells.
    pub fn push_num_row(&mut self, cells: &[&str]) -> &mut Self {
        let row = cells
            .iter()
            .map(|value| format!("<c><v>{}</v></c>", xml_escape(value)))
            .collect();
        self.rows.push(row);
        self
    }

    /// Appends a row from raw `<c>` cell XML.
    pub fn push_raw_row(&mut self, cells_xml: &str) -> &mut Self {
        self.rows.push(cells_xml.to_string());
        self
    }

    pub fn write(&self, path: &Path) -> PathBuf {
        let shared_xml = {
            let entries: String = self
                .shared
                .iter()
                .map(|text| format!("<si><t>{}</t></si>", xml_escape(text)))
                .collect();
            format!(r#"<sst count="{0}" uniqueCount="{0}">{entries}</sst>"#, self.shared.len())
        };
        let sheet_xml = {
            let rows: String = self
                .rows
                .iter()
                .enumerate()
                .map(|(index, cells)| format!(r#"<row r="{}">{cells}</row>"#, index + 1))
                .collect();
            format!(r#"<worksheet><sheetData>{rows}</sheetData></worksheet>"#)
        };

        let mut writer = ZipWriter::new(File::create(path).expect("fixture file creates"));
        let options = SimpleFileOptions::default();
        writer.start_file("xl/sharedStrings.xml", options).expect("zip entry starts");
        writer.write_all(shared_xml.as_bytes()).expect("zip entry writes");
        writer.start_file("xl/worksheets/sheet1.xml", options).expect("zip entry starts");
        writer.write_all(sheet_xml.as_bytes()).expect("zip entry writes");
        writer.finish().expect("zip finishes");
        path.to_path_buf()
    }
}
