//! Expense ledger backed by a remote worksheet
//!
//! Rows are `date | category | amount`, addressed by their 1-based position.
//! Positions are not stable: deleting a row shifts every later row up.

mod auth;
mod google;

pub use google::GoogleSheet;

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use std::sync::Arc;
use thiserror::Error;

/// One row as read back from the worksheet
pub type Record = Vec<String>;

/// Failure talking to the remote worksheet
#[derive(Debug, Error)]
#[error("{0}")]
pub struct SheetError(pub String);

impl SheetError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Ledger operation failure
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("row {row} does not exist, the sheet has {count} rows")]
    InvalidRow { row: usize, count: usize },
    #[error("expense sheet unavailable: {0}")]
    Unavailable(#[from] SheetError),
}

/// The four spreadsheet operations the ledger needs. Rows are 1-based.
#[async_trait]
pub trait Worksheet: Send + Sync {
    async fn append_row(&self, cells: &[String]) -> Result<(), SheetError>;

    async fn delete_row(&self, row: usize) -> Result<(), SheetError>;

    /// All rows in sheet order; an empty sheet yields an empty list
    async fn get_all_values(&self) -> Result<Vec<Record>, SheetError>;

    /// Overwrite cells `A{row}:C{row}`
    async fn update_row(&self, row: usize, cells: &[String]) -> Result<(), SheetError>;
}

/// A new or rewritten expense
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseRow {
    pub date: NaiveDate,
    pub category: String,
    pub amount: String,
}

impl ExpenseRow {
    pub fn cells(&self) -> Vec<String> {
        vec![
            self.date.format("%Y-%m-%d").to_string(),
            self.category.clone(),
            self.amount.clone(),
        ]
    }
}

/// Expense operations over a worksheet
pub struct Ledger {
    sheet: Arc<dyn Worksheet>,
    today: fn() -> NaiveDate,
}

impl Ledger {
    pub fn new(sheet: Arc<dyn Worksheet>) -> Self {
        Self {
            sheet,
            today: || Local::now().date_naive(),
        }
    }

    /// Replace the date source used to stamp rows
    #[cfg(test)]
    pub fn with_clock(mut self, today: fn() -> NaiveDate) -> Self {
        self.today = today;
        self
    }

    fn stamp(&self, category: &str, amount: &str) -> ExpenseRow {
        ExpenseRow {
            date: (self.today)(),
            category: category.to_string(),
            amount: amount.to_string(),
        }
    }

    pub async fn append(&self, category: &str, amount: &str) -> Result<ExpenseRow, LedgerError> {
        let row = self.stamp(category, amount);
        self.sheet.append_row(&row.cells()).await?;
        tracing::info!(category = %row.category, amount = %row.amount, "Expense added");
        Ok(row)
    }

    pub async fn delete(&self, row: usize) -> Result<(), LedgerError> {
        self.check_row(row).await?;
        self.sheet.delete_row(row).await?;
        tracing::info!(row, "Expense removed");
        Ok(())
    }

    pub async fn update(
        &self,
        row: usize,
        category: &str,
        amount: &str,
    ) -> Result<ExpenseRow, LedgerError> {
        self.check_row(row).await?;
        let expense = self.stamp(category, amount);
        self.sheet.update_row(row, &expense.cells()).await?;
        tracing::info!(row, category = %expense.category, amount = %expense.amount, "Expense edited");
        Ok(expense)
    }

    /// Every row in store order, padded to a common width
    pub async fn list_all(&self) -> Result<Vec<Record>, LedgerError> {
        let rows = self.sheet.get_all_values().await?;
        Ok(pad_rows(rows))
    }

    pub async fn row_count(&self) -> Result<usize, LedgerError> {
        Ok(self.sheet.get_all_values().await?.len())
    }

    async fn check_row(&self, row: usize) -> Result<(), LedgerError> {
        let count = self.row_count().await?;
        if row == 0 || row > count {
            tracing::warn!(row, count, "Row out of range");
            return Err(LedgerError::InvalidRow { row, count });
        }
        Ok(())
    }
}

fn pad_rows(mut rows: Vec<Record>) -> Vec<Record> {
    let width = rows.iter().map(Vec::len).max().unwrap_or(0);
    for row in &mut rows {
        row.resize(width, String::new());
    }
    rows
}
