//! # Register Export
//!
//! Renders the compliance register (organization × requirement × status)
//! as `.xlsx` or `.csv` bytes for download.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rust_xlsxwriter::{Format, Workbook};

/// One row of the compliance register
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterRow {
    pub organization: String,
    pub requirement_code: String,
    pub requirement_title: String,
    pub status: String,
    pub due_date: Option<NaiveDate>,
    pub assignee: Option<String>,
}

const HEADERS: [&str; 6] = [
    "Organization",
    "Requirement code",
    "Requirement",
    "Status",
    "Due date",
    "Assignee",
];

/// Render the register as an xlsx workbook.
pub fn register_xlsx(rows: &[RegisterRow]) -> Result<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();

    let header_format = Format::new().set_bold();
    for (col, header) in HEADERS.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *header, &header_format)
            .context("failed to write register header")?;
    }

    for (idx, row) in rows.iter().enumerate() {
        let r = (idx + 1) as u32;
        worksheet
            .write_string(r, 0, &row.organization)
            .and_then(|ws| ws.write_string(r, 1, &row.requirement_code))
            .and_then(|ws| ws.write_string(r, 2, &row.requirement_title))
            .and_then(|ws| ws.write_string(r, 3, &row.status))
            .and_then(|ws| {
                ws.write_string(
                    r,
                    4,
                    row.due_date
                        .map(|d| d.to_string())
                        .unwrap_or_default()
                        .as_str(),
                )
            })
            .and_then(|ws| ws.write_string(r, 5, row.assignee.as_deref().unwrap_or_default()))
            .context("failed to write register row")?;
    }

    workbook
        .save_to_buffer()
        .context("failed to serialize register workbook")
}

/// Render the register as CSV bytes (UTF-8, comma-separated).
pub fn register_csv(rows: &[RegisterRow]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(HEADERS)
        .context("failed to write register header")?;

    for row in rows {
        writer
            .write_record([
                row.organization.as_str(),
                row.requirement_code.as_str(),
                row.requirement_title.as_str(),
                row.status.as_str(),
                row.due_date
                    .map(|d| d.to_string())
                    .unwrap_or_default()
                    .as_str(),
                row.assignee.as_deref().unwrap_or_default(),
            ])
            .context("failed to write register row")?;
    }

    writer.into_inner().context("failed to flush register CSV")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rows() -> Vec<RegisterRow> {
        vec![
            RegisterRow {
                organization: "ООО Пример".to_string(),
                requirement_code: "152-ФЗ ст.19".to_string(),
                requirement_title: "Security of personal data processing".to_string(),
                status: "in_progress".to_string(),
                due_date: NaiveDate::from_ymd_opt(2025, 9, 1),
                assignee: Some("officer@example.com".to_string()),
            },
            RegisterRow {
                organization: "АО Тест".to_string(),
                requirement_code: "187-ФЗ ст.10".to_string(),
                requirement_title: "KII security measures".to_string(),
                status: "not_started".to_string(),
                due_date: None,
                assignee: None,
            },
        ]
    }

    #[test]
    fn csv_contains_headers_and_rows() {
        let bytes = register_csv(&sample_rows()).unwrap();
        let text = String::from_utf8(bytes).unwrap();

        assert!(text.starts_with("Organization,Requirement code"));
        assert!(text.contains("152-ФЗ ст.19"));
        assert!(text.contains("2025-09-01"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn csv_empty_register_is_header_only() {
        let bytes = register_csv(&[]).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert_eq!(text.lines().count(), 1);
    }

    #[test]
    fn xlsx_produces_zip_container() {
        let bytes = register_xlsx(&sample_rows()).unwrap();
        // xlsx is a zip archive
        assert_eq!(&bytes[..2], b"PK");
    }
}
