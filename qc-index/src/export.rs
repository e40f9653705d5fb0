//! Tabular export
//!
//! One record per row, three cells per column (annotation, rating, comment).
//! Cells without an entity are empty, so every record has the same width.
//! Fields holding a delimiter, quote or line break are quoted by the writer.

use crate::error::{IndexError, IndexResult};
use crate::view::EntityView;
use std::collections::{BTreeSet, HashMap};
use std::io::Write;

/// First header cell
pub const ROW_HEADER: &str = "subjects";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportTable {
    pub header: Vec<String>,
    /// Each line starts with the row name
    pub rows: Vec<Vec<String>>,
}

impl ExportTable {
    /// Write header and rows as tab-separated records
    pub fn write_tsv<W: Write>(&self, out: W) -> IndexResult<()> {
        let mut writer = csv::WriterBuilder::new().delimiter(b'\t').from_writer(out);

        writer.write_record(&self.header)?;
        for row in &self.rows {
            writer.write_record(row)?;
        }

        writer.flush()?;
        Ok(())
    }

    pub fn to_tsv(&self) -> IndexResult<String> {
        let mut buf = Vec::new();
        self.write_tsv(&mut buf)?;
        String::from_utf8(buf)
            .map_err(|e| IndexError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
    }
}

/// Project `entities` onto the `rows` × `columns` grid (both sorted by name)
pub fn build_export(rows: &[String], columns: &[String], entities: &[EntityView]) -> ExportTable {
    let rows: BTreeSet<&str> = rows.iter().map(String::as_str).collect();
    let columns: BTreeSet<&str> = columns.iter().map(String::as_str).collect();

    let cells: HashMap<(&str, &str), &EntityView> = entities
        .iter()
        .map(|e| ((e.row.as_str(), e.column.as_str()), e))
        .collect();

    let mut header = Vec::with_capacity(1 + columns.len() * 3);
    header.push(ROW_HEADER.to_string());
    for column in &columns {
        header.push(column.to_string());
        header.push(format!("{}_passfail", column));
        header.push(format!("{}_comment", column));
    }

    let lines = rows
        .iter()
        .map(|row| {
            let mut line = Vec::with_capacity(header.len());
            line.push(row.to_string());
            for column in &columns {
                match cells.get(&(*row, *column)) {
                    Some(entity) => {
                        line.push(
                            entity
                                .annotation
                                .as_ref()
                                .map(|a| a.name.clone())
                                .unwrap_or_default(),
                        );
                        line.push(
                            entity
                                .rating
                                .as_ref()
                                .map(|r| r.name.clone())
                                .unwrap_or_default(),
                        );
                        line.push(entity.comment.clone());
                    }
                    None => line.extend(std::iter::repeat(String::new()).take(3)),
                }
            }
            line
        })
        .collect();

    ExportTable {
        header,
        rows: lines,
    }
}
