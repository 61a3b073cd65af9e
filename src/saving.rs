use bincode::{deserialize_from, serialize_into};
use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::spreadsheet::{MemorySheet, MemoryWorkbook, SheetGrid};

#[derive(Serialize, Deserialize)]
struct WorkbookSnapshot {
    sheets: Vec<(String, SheetGrid)>,
}

/// Writes every sheet of `workbook` as gzip-compressed bincode.
pub fn save_workbook(workbook: &MemoryWorkbook, path: impl AsRef<Path>) -> std::io::Result<()> {
    let snapshot = WorkbookSnapshot {
        sheets: workbook
            .sheet_names()
            .into_iter()
            .filter_map(|name| workbook.sheet(&name).map(|s| (name, s.snapshot())))
            .collect(),
    };

    let file = File::create(path)?;
    let encoder = GzEncoder::new(file, Compression::default());
    let mut writer = std::io::BufWriter::new(encoder);

    serialize_into(&mut writer, &snapshot)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

    writer.flush()?;
    let encoder = writer.into_inner().map_err(|e| e.into_error())?;
    encoder.finish()?;
    Ok(())
}

pub fn load_workbook(path: impl AsRef<Path>) -> std::io::Result<MemoryWorkbook> {
    let file = File::open(path)?;
    let decoder = GzDecoder::new(file);
    let mut reader = std::io::BufReader::new(decoder);

    let snapshot: WorkbookSnapshot = deserialize_from(&mut reader)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

    let workbook = MemoryWorkbook::new();
    for (name, grid) in snapshot.sheets {
        workbook.insert_sheet(name, MemorySheet::new(grid));
    }
    Ok(workbook)
}
