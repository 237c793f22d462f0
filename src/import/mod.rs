//! Bulk roster import from Excel workbooks.
//!
//! The pipeline is: decode the workbook ([`sheet`]), check its structure, parse each
//! data row ([`row`]), then re-validate, deduplicate and persist every candidate on
//! its own. Only structural problems reject the upload as a whole; everything
//! attributable to a single row is reported and skipped.

use async_trait::async_trait;

use crate::error::AppResult;
use crate::models::{Comrade, NewComrade};
use crate::repository::Repository;
use crate::validators::{self, ValidationErrors};

pub mod row;
pub mod sample;
pub mod sheet;

use row::{ImportCandidate, REQUIRED_COLUMNS, RowError, RowParser};
use sheet::{Sheet, SheetError, read_workbook};

/// Accepted upload extensions.
pub const ALLOWED_EXTENSIONS: [&str; 2] = ["xlsx", "xls"];

/// Reported for a row the store failed on. The cause is only logged.
pub const ROW_NOT_SAVED: &str = "could not be saved";

/// RosterStore
///
/// The two persistence capabilities the importer needs. Every [`Repository`] is a
/// `RosterStore`; tests can substitute a store that fails on demand.
#[async_trait]
pub trait RosterStore: Send + Sync {
    async fn roster_duplicate(
        &self,
        first_name: &str,
        last_name: &str,
        unit: &str,
    ) -> AppResult<Option<i64>>;

    async fn roster_insert(&self, comrade: NewComrade) -> AppResult<Comrade>;
}

#[async_trait]
impl<R: Repository + ?Sized> RosterStore for R {
    async fn roster_duplicate(
        &self,
        first_name: &str,
        last_name: &str,
        unit: &str,
    ) -> AppResult<Option<i64>> {
        self.find_comrade_duplicate(first_name, last_name, unit).await
    }

    async fn roster_insert(&self, comrade: NewComrade) -> AppResult<Comrade> {
        self.create_comrade(comrade).await
    }
}

/// ParsedSheet
///
/// Outcome of the parse phase. `structural` errors mean the file as a whole is
/// unusable; `row_errors` only disqualify their rows.
#[derive(Debug, Default)]
pub struct ParsedSheet {
    pub candidates: Vec<ImportCandidate>,
    pub structural: Vec<String>,
    pub row_errors: Vec<RowError>,
    pub warnings: Vec<String>,
}

/// ImportReport
///
/// Result of a completed import. `imported + skipped == total_processed`, where
/// `total_processed` counts every non-blank data row.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub total_processed: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// ImportOutcome
///
/// Either a finished report, or a rejection with nothing persisted.
#[derive(Debug, Clone, PartialEq)]
pub enum ImportOutcome {
    Completed(ImportReport),
    Rejected {
        errors: Vec<String>,
        warnings: Vec<String>,
    },
}

/// check_structure
///
/// File-level checks: at least one data row and every required column present.
pub fn check_structure(sheet: &Sheet) -> Vec<String> {
    let mut errors = Vec::new();
    if sheet.is_empty() {
        errors.push("Excel file is empty".to_string());
        return errors;
    }
    let missing = sheet.missing_columns(&REQUIRED_COLUMNS);
    if !missing.is_empty() {
        errors.push(format!("Missing required columns: {}", missing.join(", ")));
    }
    errors
}

/// parse_sheet
///
/// Structural check, then every data row in order. Structural failures stop
/// before any row is looked at.
pub fn parse_sheet(sheet: &Sheet, current_year: i64) -> ParsedSheet {
    let mut parsed = ParsedSheet {
        structural: check_structure(sheet),
        ..ParsedSheet::default()
    };
    if !parsed.structural.is_empty() {
        return parsed;
    }

    let parser = RowParser::new(sheet, current_year);
    for (index, cells) in sheet.rows().iter().enumerate() {
        match parser.parse_row(index + 1, cells, &mut parsed.warnings) {
            Ok(Some(candidate)) => parsed.candidates.push(candidate),
            Ok(None) => {}
            Err(error) => parsed.row_errors.push(error),
        }
    }
    parsed
}

fn describe(errors: &ValidationErrors) -> String {
    errors.values().cloned().collect::<Vec<_>>().join("; ")
}

/// Re-applies the field validators to a parsed candidate.
fn revalidate(candidate: &ImportCandidate, current_year: i64) -> ValidationErrors {
    let mut errors = validators::validate_year_range_at(
        Some(candidate.year_of_service_from),
        candidate.year_of_service_to,
        current_year,
    );
    if let Some(contact) = &candidate.contact_info {
        errors.extend(contact.validate());
    }
    errors
}

/// import_sheet
///
/// Persists the candidates of an already decoded sheet. Each candidate is stored in
/// its own statement, so a failing row never takes its neighbours down with it and
/// the counts in the report are exact.
pub async fn import_sheet<S>(store: &S, sheet: &Sheet, current_year: i64) -> ImportOutcome
where
    S: RosterStore + ?Sized,
{
    let parsed = parse_sheet(sheet, current_year);
    if !parsed.structural.is_empty() {
        tracing::warn!(errors = ?parsed.structural, "import rejected");
        return ImportOutcome::Rejected {
            errors: parsed.structural,
            warnings: parsed.warnings,
        };
    }

    let mut row_errors = parsed.row_errors;
    let mut imported = 0usize;
    let total_processed = parsed.candidates.len() + row_errors.len();

    for candidate in parsed.candidates {
        let invalid = revalidate(&candidate, current_year);
        if !invalid.is_empty() {
            row_errors.push(RowError {
                row: candidate.row,
                detail: describe(&invalid),
            });
            continue;
        }

        match store
            .roster_duplicate(&candidate.first_name, &candidate.last_name, &candidate.unit)
            .await
        {
            Ok(Some(existing)) => {
                row_errors.push(RowError {
                    row: candidate.row,
                    detail: format!(
                        "comrade {} {} from '{}' already exists (id {existing})",
                        candidate.last_name, candidate.first_name, candidate.unit
                    ),
                });
                continue;
            }
            Ok(None) => {}
            Err(error) => {
                tracing::error!(row = candidate.row, %error, "duplicate lookup failed");
                row_errors.push(RowError {
                    row: candidate.row,
                    detail: ROW_NOT_SAVED.to_string(),
                });
                continue;
            }
        }

        match store.roster_insert(candidate.to_new_comrade()).await {
            Ok(_) => imported += 1,
            Err(error) => {
                tracing::error!(row = candidate.row, %error, "comrade insert failed");
                row_errors.push(RowError {
                    row: candidate.row,
                    detail: ROW_NOT_SAVED.to_string(),
                });
            }
        }
    }

    // Parse failures were collected first; restore row order (stable for equal rows).
    row_errors.sort_by_key(|e| e.row);

    let report = ImportReport {
        imported,
        skipped: total_processed - imported,
        total_processed,
        errors: row_errors.iter().map(ToString::to_string).collect(),
        warnings: parsed.warnings,
    };

    tracing::info!(
        imported = report.imported,
        skipped = report.skipped,
        total = report.total_processed,
        "roster import finished"
    );

    ImportOutcome::Completed(report)
}

/// import_roster
///
/// Full pipeline from raw upload bytes. The workbook is decoded on the blocking
/// pool. An unreadable workbook is a single structural error.
pub async fn import_roster<S>(store: &S, bytes: Vec<u8>, current_year: i64) -> ImportOutcome
where
    S: RosterStore + ?Sized,
{
    let decoded = tokio::task::spawn_blocking(move || read_workbook(&bytes))
        .await
        .unwrap_or_else(|e| Err(SheetError::Unreadable(format!("decoder panicked: {e}"))));

    match decoded {
        Ok(sheet) => import_sheet(store, &sheet, current_year).await,
        Err(error) => {
            tracing::warn!(%error, "workbook could not be read");
            ImportOutcome::Rejected {
                errors: vec![error.to_string()],
                warnings: Vec::new(),
            }
        }
    }
}
