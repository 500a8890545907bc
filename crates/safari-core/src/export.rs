//! Export of entity lists to CSV, JSON and XLSX.
//!
//! Column order follows the keys of the first record. Nested objects and
//! arrays are written as JSON text in CSV and XLSX cells.

use std::fmt;
use std::io::{Cursor, Write};
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::types::{EntityType, Record};

const SHEET_NAME: &str = "Data";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No data to export")]
    Empty,
    #[error("unknown export format '{0}' (expected csv, json or xlsx)")]
    UnknownFormat(String),
    #[error("failed to serialize records: {0}")]
    Json(#[from] serde_json::Error),
    #[error("failed to build workbook: {0}")]
    Zip(#[from] zip::result::ZipError),
    #[error("failed to write export: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Json,
    Xlsx,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
            ExportFormat::Xlsx => "xlsx",
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv",
            ExportFormat::Json => "application/json",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

/// `users_export.csv`
pub fn file_name(entity: EntityType, format: ExportFormat) -> String {
    format!("{}_export.{}", entity, format.extension())
}

/// Render records in the requested format
pub fn export(records: &[Record], format: ExportFormat) -> Result<Vec<u8>> {
    match format {
        ExportFormat::Csv => to_csv(records).map(String::into_bytes),
        ExportFormat::Json => Ok(serde_json::to_vec_pretty(records)?),
        ExportFormat::Xlsx => to_xlsx(records),
    }
}

fn headers(records: &[Record]) -> Result<Vec<String>> {
    let first = records.first().ok_or(ExportError::Empty)?;
    Ok(first.fields().keys().cloned().collect())
}

/// Cell text: strings as-is, scalars via Display, structures as JSON
fn cell_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        Some(other) => other.to_string(),
    }
}

pub fn to_csv(records: &[Record]) -> Result<String> {
    let headers = headers(records)?;
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(headers.join(","));
    for record in records {
        let row: Vec<String> = headers
            .iter()
            .map(|h| format!("\"{}\"", cell_text(record.fields().get(h)).replace('"', "\"\"")))
            .collect();
        lines.push(row.join(","));
    }
    Ok(lines.join("\n"))
}

fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

/// Spreadsheet column letters: 0 -> A, 25 -> Z, 26 -> AA
fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    loop {
        name.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    name.reverse();
    String::from_utf8_lossy(&name).into_owned()
}

fn xlsx_cell(reference: &str, value: Option<&Value>) -> String {
    match value {
        Some(Value::Number(n)) => format!(r#"<c r="{}"><v>{}</v></c>"#, reference, n),
        Some(Value::Bool(b)) => format!(r#"<c r="{}" t="b"><v>{}</v></c>"#, reference, u8::from(*b)),
        None | Some(Value::Null) => String::new(),
        other => format!(
            r#"<c r="{}" t="inlineStr"><is><t>{}</t></is></c>"#,
            reference,
            xml_escape(&cell_text(other))
        ),
    }
}

fn sheet_xml(headers: &[String], records: &[Record]) -> String {
    let mut rows = String::new();
    let header_cells: String = headers
        .iter()
        .enumerate()
        .map(|(col, h)| {
            xlsx_cell(
                &format!("{}1", column_name(col)),
                Some(&Value::String(h.clone())),
            )
        })
        .collect();
    rows.push_str(&format!(r#"<row r="1">{}</row>"#, header_cells));

    for (index, record) in records.iter().enumerate() {
        let row = index + 2;
        let cells: String = headers
            .iter()
            .enumerate()
            .map(|(col, h)| xlsx_cell(&format!("{}{}", column_name(col), row), record.fields().get(h)))
            .collect();
        rows.push_str(&format!(r#"<row r="{}">{}</row>"#, row, cells));
    }

    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">"#,
            r#"<sheetData>{}</sheetData></worksheet>"#
        ),
        rows
    )
}

const CONTENT_TYPES: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#,
    r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#,
    r#"<Default Extension="xml" ContentType="application/xml"/>"#,
    r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#,
    r#"<Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#,
    r#"</Types>"#
);

const ROOT_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#,
    r#"</Relationships>"#
);

const WORKBOOK_RELS: &str = concat!(
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
    r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/>"#,
    r#"</Relationships>"#
);

fn workbook_xml() -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#,
            r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
            r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
            r#"<sheets><sheet name="{}" sheetId="1" r:id="rId1"/></sheets></workbook>"#
        ),
        SHEET_NAME
    )
}

pub fn to_xlsx(records: &[Record]) -> Result<Vec<u8>> {
    let headers = headers(records)?;
    let parts = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("xl/workbook.xml", workbook_xml()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
        ("xl/worksheets/sheet1.xml", sheet_xml(&headers, records)),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    for (name, body) in parts {
        zip.start_file(name, options)?;
        zip.write_all(body.as_bytes())?;
    }
    Ok(zip.finish()?.into_inner())
}
