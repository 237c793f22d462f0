//! Row-level parsing of the roster import sheet.
//!
//! One data row becomes an [`ImportCandidate`], `None` for a structurally blank row,
//! or a [`RowError`]. Recoverable problems in optional columns (an unreadable
//! "year to", for instance) are pushed as warnings and the value is dropped.

use thiserror::Error;

use super::sheet::{Cell, Sheet};
use crate::models::{ContactInfo, NewComrade};
use crate::validators::MIN_SERVICE_YEAR;

pub const COL_LAST_NAME: &str = "Фамилия";
pub const COL_FIRST_NAME: &str = "Имя";
pub const COL_MIDDLE_NAME: &str = "Отчество";
pub const COL_UNIT: &str = "Воинская часть";
pub const COL_REGION: &str = "Регион";
pub const COL_YEAR_FROM: &str = "Год службы с";
pub const COL_YEAR_TO: &str = "Год службы по";
pub const COL_RANK: &str = "Звание";
pub const COL_PHONE: &str = "Телефон";
pub const COL_EMAIL: &str = "Email";
pub const COL_ADDRESS: &str = "Адрес";
pub const COL_ADDITIONAL_INFO: &str = "Дополнительная информация";

pub const REQUIRED_COLUMNS: [&str; 5] = [
    COL_LAST_NAME,
    COL_FIRST_NAME,
    COL_UNIT,
    COL_REGION,
    COL_YEAR_FROM,
];

pub const OPTIONAL_COLUMNS: [&str; 7] = [
    COL_MIDDLE_NAME,
    COL_YEAR_TO,
    COL_RANK,
    COL_PHONE,
    COL_EMAIL,
    COL_ADDRESS,
    COL_ADDITIONAL_INFO,
];

/// ImportCandidate
///
/// A parsed roster row that has not been re-validated, deduplicated or stored yet.
#[derive(Clone, Debug, PartialEq)]
pub struct ImportCandidate {
    /// 1-based data row number (the header row is not counted).
    pub row: usize,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub unit: String,
    pub region: String,
    pub year_of_service_from: i64,
    pub year_of_service_to: Option<i64>,
    pub rank: Option<String>,
    pub additional_info: Option<String>,
    pub contact_info: Option<ContactInfo>,
}

impl ImportCandidate {
    pub fn to_new_comrade(&self) -> NewComrade {
        NewComrade {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            middle_name: self.middle_name.clone(),
            unit: self.unit.clone(),
            region: self.region.clone(),
            year_of_service_from: self.year_of_service_from,
            year_of_service_to: self.year_of_service_to,
            rank: self.rank.clone(),
            photo_url: None,
            contact_info: self.contact_info.clone(),
            additional_info: self.additional_info.clone(),
        }
    }
}

/// RowError
///
/// A failure attributable to one input row. Non-fatal to the batch.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("Row {row}: {detail}")]
pub struct RowError {
    pub row: usize,
    pub detail: String,
}

/// RowParser
///
/// Parses the data rows of one sheet. Holds the clock so year range checks are
/// deterministic under test.
pub struct RowParser<'a> {
    sheet: &'a Sheet,
    current_year: i64,
}

impl<'a> RowParser<'a> {
    pub fn new(sheet: &'a Sheet, current_year: i64) -> Self {
        Self {
            sheet,
            current_year,
        }
    }

    /// parse_row
    ///
    /// `row` is the 1-based data row number used in messages. Warnings for dropped
    /// optional values are appended to `warnings` even when the row later fails.
    pub fn parse_row(
        &self,
        row: usize,
        cells: &[Cell],
        warnings: &mut Vec<String>,
    ) -> Result<Option<ImportCandidate>, RowError> {
        if cells.iter().all(Cell::is_blank) {
            return Ok(None);
        }

        let reader = CellReader {
            sheet: self.sheet,
            cells,
            row,
        };

        let last_name = reader.required_text(COL_LAST_NAME)?;
        let first_name = reader.required_text(COL_FIRST_NAME)?;
        let unit = reader.required_text(COL_UNIT)?;
        let region = reader.required_text(COL_REGION)?;
        let year_of_service_from = self
            .year(&reader, COL_YEAR_FROM, true, warnings)?
            .ok_or_else(|| reader.fail(format!("Empty value in required field '{COL_YEAR_FROM}'")))?;

        let middle_name = reader.optional_text(COL_MIDDLE_NAME);
        let year_of_service_to = self.year(&reader, COL_YEAR_TO, false, warnings)?;
        let rank = reader.optional_text(COL_RANK);
        let additional_info = reader.optional_text(COL_ADDITIONAL_INFO);

        let contact = ContactInfo {
            phone: reader.phone(),
            email: reader.optional_text(COL_EMAIL),
            address: reader.optional_text(COL_ADDRESS),
        };

        Ok(Some(ImportCandidate {
            row,
            first_name,
            last_name,
            middle_name,
            unit,
            region,
            year_of_service_from,
            year_of_service_to,
            rank,
            additional_info,
            contact_info: (!contact.is_empty()).then_some(contact),
        }))
    }

    /// Year cell: integers as-is, floats truncated, strings reduced to their digits.
    /// Unusable values fail the row for required columns; for optional columns the
    /// value is dropped with a warning.
    fn year(
        &self,
        reader: &CellReader<'_>,
        column: &str,
        required: bool,
        warnings: &mut Vec<String>,
    ) -> Result<Option<i64>, RowError> {
        let Some(cell) = reader.cell(column, required)? else {
            return Ok(None);
        };

        match self.extract_year(cell) {
            Ok(year) => Ok(Some(year)),
            Err(reason) if required => {
                Err(reader.fail(format!("Invalid value in field '{column}': {reason}")))
            }
            Err(reason) => {
                warnings.push(format!(
                    "Row {}: value in field '{column}' dropped ({reason})",
                    reader.row
                ));
                Ok(None)
            }
        }
    }

    fn extract_year(&self, cell: &Cell) -> Result<i64, String> {
        let year = match cell {
            Cell::Int(v) => *v,
            Cell::Float(v) if v.is_finite() => v.trunc() as i64,
            Cell::Text(s) => {
                let digits: String = s.chars().filter(char::is_ascii_digit).collect();
                if digits.is_empty() {
                    return Err(format!("invalid year format: {}", s.trim()));
                }
                digits
                    .parse::<i64>()
                    .map_err(|_| format!("invalid year format: {}", s.trim()))?
            }
            other => return Err(format!("unsupported value: {}", other.render())),
        };

        if year < MIN_SERVICE_YEAR || year > self.current_year {
            return Err(format!(
                "year must be between {MIN_SERVICE_YEAR} and {}, got {year}",
                self.current_year
            ));
        }
        Ok(year)
    }
}

/// Column lookups for a single row.
struct CellReader<'a> {
    sheet: &'a Sheet,
    cells: &'a [Cell],
    row: usize,
}

impl CellReader<'_> {
    fn fail(&self, detail: String) -> RowError {
        RowError {
            row: self.row,
            detail,
        }
    }

    /// Non-blank cell under `column`. Missing column or blank cell is `Ok(None)`
    /// for optional columns and a row failure for required ones.
    fn cell(&self, column: &str, required: bool) -> Result<Option<&Cell>, RowError> {
        let Some(index) = self.sheet.column_index(column) else {
            return if required {
                Err(self.fail(format!("Missing column '{column}'")))
            } else {
                Ok(None)
            };
        };

        match self.cells.get(index).filter(|cell| !cell.is_blank()) {
            Some(cell) => Ok(Some(cell)),
            None if required => Err(self.fail(format!(
                "Empty value in required field '{column}'"
            ))),
            None => Ok(None),
        }
    }

    fn required_text(&self, column: &str) -> Result<String, RowError> {
        let cell = self
            .cell(column, true)?
            .ok_or_else(|| self.fail(format!("Empty value in required field '{column}'")))?;
        Ok(cell.render())
    }

    fn optional_text(&self, column: &str) -> Option<String> {
        self.cell(column, false).ok().flatten().map(Cell::render)
    }

    /// Phone numbers stored as numbers have lost their leading `+`.
    fn phone(&self) -> Option<String> {
        match self.cell(COL_PHONE, false).ok().flatten()? {
            Cell::Int(v) => Some(format!("+{v}")),
            Cell::Float(v) if v.is_finite() => Some(format!("+{}", v.trunc() as i64)),
            other => Some(other.render()),
        }
    }
}
