use std::fs;
use std::path::Path;

use csv::{ReaderBuilder, Terminator, WriterBuilder};
use tracing::{info, warn};

use crate::common::error::Result;
use crate::domain::{FlatCaptionRow, GeneratedResponseRow};

pub const GENERATED_COLUMNS: [&str; 3] = ["ID", "attribute", "generated_question"];
pub const CAPTION_HEADER: [&str; 6] = [
    "id",
    "image_path",
    "csv_simple",
    "csv_emphatic",
    "model_simple",
    "model_empathetic",
];

/// Read the generated-responses CSV. Opening the file and reading its header
/// are fatal; each data row is returned as its own result.
pub fn read_generated_rows(path: &Path) -> Result<Vec<Result<GeneratedResponseRow>>> {
    info!("Reading generated responses from {}", path.display());
    let mut reader = ReaderBuilder::new().has_headers(true).from_path(path)?;
    let headers = reader.headers()?.clone();
    for column in GENERATED_COLUMNS {
        if !headers.iter().any(|h| h == column) {
            warn!("column '{}' is missing from {}", column, path.display());
        }
    }

    let rows = reader
        .deserialize::<GeneratedResponseRow>()
        .map(|row| row.map_err(Into::into))
        .collect();
    Ok(rows)
}

/// Write caption rows with a header line, CRLF terminated, minimal quoting.
/// The header is written even when there are no rows.
pub fn write_caption_rows(path: &Path, rows: &[FlatCaptionRow]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .terminator(Terminator::CRLF)
        .from_path(path)?;
    writer.write_record(CAPTION_HEADER)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn empty_cells_and_missing_columns_become_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in.csv");
        fs::write(&path, "ID,generated_question,extra\n7,,x\n,text,y\n").unwrap();

        let rows: Vec<_> = read_generated_rows(&path)
            .unwrap()
            .into_iter()
            .map(|r| r.unwrap())
            .collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id.as_deref(), Some("7"));
        assert_eq!(rows[0].generated_question, None);
        assert_eq!(rows[0].attribute, None);
        assert_eq!(rows[1].id, None);
        assert_eq!(rows[1].generated_question.as_deref(), Some("text"));
    }

    #[test]
    fn ragged_row_is_a_row_level_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in.csv");
        fs::write(&path, "ID,attribute,generated_question\n1,a,b\n2,a\n3,a,c\n").unwrap();

        let rows = read_generated_rows(&path).unwrap();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].is_ok());
        assert!(rows[1].is_err());
        assert!(rows[2].is_ok());
    }

    #[test]
    fn multiline_quoted_cells_are_preserved() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("in.csv");
        fs::write(
            &path,
            "ID,attribute,generated_question\n1,color,\"assistant Question: hue?\nAnswer: blue\"\n",
        )
        .unwrap();
        let rows = read_generated_rows(&path).unwrap();
        let row = rows[0].as_ref().unwrap();
        assert_eq!(
            row.generated_question.as_deref(),
            Some("assistant Question: hue?\nAnswer: blue")
        );
    }

    #[test]
    fn caption_csv_has_header_even_when_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        write_caption_rows(&path, &[]).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "id,image_path,csv_simple,csv_emphatic,model_simple,model_empathetic\r\n"
        );
    }

    #[test]
    fn caption_csv_quotes_only_when_needed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let row = FlatCaptionRow {
            id: "1".into(),
            image_path: "a.jpg".into(),
            csv_simple: "plain".into(),
            csv_emphatic: "with, comma".into(),
            model_simple: "say \"hi\"".into(),
            model_empathetic: String::new(),
        };
        write_caption_rows(&path, &[row]).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let body = text.lines().nth(1).unwrap();
        assert_eq!(body, "1,a.jpg,plain,\"with, comma\",\"say \"\"hi\"\"\",");
    }
}
