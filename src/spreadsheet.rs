use crate::cell::RawCell;
use crate::error::{DashError, DashResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock};

/// A rectangular block of cells addressed with 1-based rows and columns.
/// Row 1 is the header row.
pub trait SourceTable: Send + Sync {
    fn read_range(
        &self,
        row_start: usize,
        col_start: usize,
        num_rows: usize,
        num_cols: usize,
    ) -> DashResult<Vec<Vec<RawCell>>>;

    fn write_cell(&self, row: usize, col: usize, value: RawCell) -> DashResult<()>;

    /// Index of the last row holding any non-empty cell, 0 for an empty table.
    fn last_row_index(&self) -> usize;

    /// Index of the last column holding any non-empty cell.
    fn last_column_index(&self) -> usize;
}

/// Named tables, looked up fresh on every call.
pub trait Workbook: Send + Sync {
    fn table(&self, name: &str) -> Option<Arc<dyn SourceTable>>;
}

/// Flat row-major cell storage.
#[derive(Clone, Serialize, Deserialize, Debug, Default, PartialEq)]
pub struct SheetGrid {
    pub rows: usize,
    pub cols: usize,
    pub cells: Vec<RawCell>,
}

impl SheetGrid {
    pub fn create(rows: usize, cols: usize) -> Self {
        SheetGrid {
            rows,
            cols,
            cells: vec![RawCell::Empty; rows * cols],
        }
    }

    /// Builds a grid from ragged rows, padding short rows with empty cells.
    pub fn from_rows(rows: Vec<Vec<RawCell>>) -> Self {
        let cols = rows.iter().map(|r| r.len()).max().unwrap_or(0);
        let mut grid = SheetGrid::create(rows.len(), cols);
        for (r, row) in rows.into_iter().enumerate() {
            for (c, cell) in row.into_iter().enumerate() {
                grid.cells[r * cols + c] = cell;
            }
        }
        grid
    }

    fn index(&self, row: usize, col: usize) -> Option<usize> {
        if row == 0 || col == 0 || row > self.rows || col > self.cols {
            return None;
        }
        Some((row - 1) * self.cols + (col - 1))
    }

    pub fn get(&self, row: usize, col: usize) -> &RawCell {
        static EMPTY: RawCell = RawCell::Empty;
        self.index(row, col).map_or(&EMPTY, |idx| &self.cells[idx])
    }

    /// Grows the grid so that `(rows, cols)` is addressable.
    fn ensure_size(&mut self, rows: usize, cols: usize) {
        if rows <= self.rows && cols <= self.cols {
            return;
        }
        let new_rows = rows.max(self.rows);
        let new_cols = cols.max(self.cols);
        let mut grown = SheetGrid::create(new_rows, new_cols);
        for r in 1..=self.rows {
            for c in 1..=self.cols {
                grown.cells[(r - 1) * new_cols + (c - 1)] = self.get(r, c).clone();
            }
        }
        *self = grown;
    }

    pub fn set(&mut self, row: usize, col: usize, value: RawCell) {
        self.ensure_size(row, col);
        if let Some(idx) = self.index(row, col) {
            self.cells[idx] = value;
        }
    }

    pub fn last_row(&self) -> usize {
        (1..=self.rows)
            .rev()
            .find(|&r| (1..=self.cols).any(|c| !self.get(r, c).is_empty()))
            .unwrap_or(0)
    }

    pub fn last_col(&self) -> usize {
        (1..=self.cols)
            .rev()
            .find(|&c| (1..=self.rows).any(|r| !self.get(r, c).is_empty()))
            .unwrap_or(0)
    }
}

/// An in-process sheet. Writers replace individual cells under a write lock;
/// readers copy out the range they asked for.
#[derive(Debug, Default)]
pub struct MemorySheet {
    grid: RwLock<SheetGrid>,
}

impl MemorySheet {
    pub fn new(grid: SheetGrid) -> Self {
        MemorySheet {
            grid: RwLock::new(grid),
        }
    }

    pub fn from_rows(rows: Vec<Vec<RawCell>>) -> Self {
        MemorySheet::new(SheetGrid::from_rows(rows))
    }

    pub fn snapshot(&self) -> SheetGrid {
        self.grid.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl SourceTable for MemorySheet {
    fn read_range(
        &self,
        row_start: usize,
        col_start: usize,
        num_rows: usize,
        num_cols: usize,
    ) -> DashResult<Vec<Vec<RawCell>>> {
        if row_start == 0 || col_start == 0 {
            return Err(DashError::InvalidInput(format!(
                "range must start at row and column 1 or above, got ({}, {})",
                row_start, col_start
            )));
        }
        let grid = self.grid.read().unwrap_or_else(|e| e.into_inner());
        Ok((row_start..row_start + num_rows)
            .map(|r| {
                (col_start..col_start + num_cols)
                    .map(|c| grid.get(r, c).clone())
                    .collect()
            })
            .collect())
    }

    fn write_cell(&self, row: usize, col: usize, value: RawCell) -> DashResult<()> {
        if row == 0 || col == 0 {
            return Err(DashError::InvalidInput(format!(
                "cell ({}, {}) is outside the sheet",
                row, col
            )));
        }
        let mut grid = self.grid.write().unwrap_or_else(|e| e.into_inner());
        grid.set(row, col, value);
        Ok(())
    }

    fn last_row_index(&self) -> usize {
        self.grid.read().unwrap_or_else(|e| e.into_inner()).last_row()
    }

    fn last_column_index(&self) -> usize {
        self.grid.read().unwrap_or_else(|e| e.into_inner()).last_col()
    }
}

/// A set of named in-memory sheets.
#[derive(Debug, Default)]
pub struct MemoryWorkbook {
    sheets: RwLock<BTreeMap<String, Arc<MemorySheet>>>,
}

impl MemoryWorkbook {
    pub fn new() -> Self {
        MemoryWorkbook::default()
    }

    pub fn insert_sheet(&self, name: impl Into<String>, sheet: MemorySheet) -> Arc<MemorySheet> {
        let sheet = Arc::new(sheet);
        let mut sheets = self.sheets.write().unwrap_or_else(|e| e.into_inner());
        sheets.insert(name.into(), Arc::clone(&sheet));
        sheet
    }

    pub fn remove_sheet(&self, name: &str) -> Option<Arc<MemorySheet>> {
        let mut sheets = self.sheets.write().unwrap_or_else(|e| e.into_inner());
        sheets.remove(name)
    }

    pub fn sheet(&self, name: &str) -> Option<Arc<MemorySheet>> {
        let sheets = self.sheets.read().unwrap_or_else(|e| e.into_inner());
        sheets.get(name).cloned()
    }

    pub fn sheet_names(&self) -> Vec<String> {
        let sheets = self.sheets.read().unwrap_or_else(|e| e.into_inner());
        sheets.keys().cloned().collect()
    }
}

impl Workbook for MemoryWorkbook {
    fn table(&self, name: &str) -> Option<Arc<dyn SourceTable>> {
        self.sheet(name).map(|s| s as Arc<dyn SourceTable>)
    }
}
