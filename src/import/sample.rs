//! Downloadable example workbook for the roster import.

use rust_xlsxwriter::{Format, Workbook, Worksheet, XlsxError};

use super::row::{
    COL_ADDITIONAL_INFO, COL_ADDRESS, COL_EMAIL, COL_FIRST_NAME, COL_LAST_NAME, COL_MIDDLE_NAME,
    COL_PHONE, COL_RANK, COL_REGION, COL_UNIT, COL_YEAR_FROM, COL_YEAR_TO,
};

pub const SAMPLE_FILE_NAME: &str = "comrades_import_sample.xlsx";

pub const SAMPLE_SHEET_NAME: &str = "Comrades";

/// Column order of the example workbook.
pub const SAMPLE_HEADERS: [&str; 12] = [
    COL_LAST_NAME,
    COL_FIRST_NAME,
    COL_MIDDLE_NAME,
    COL_UNIT,
    COL_REGION,
    COL_YEAR_FROM,
    COL_YEAR_TO,
    COL_RANK,
    COL_PHONE,
    COL_EMAIL,
    COL_ADDRESS,
    COL_ADDITIONAL_INFO,
];

/// Example comrade, in [`SAMPLE_HEADERS`] order.
pub struct SampleRow {
    pub last_name: &'static str,
    pub first_name: &'static str,
    pub middle_name: &'static str,
    pub unit: &'static str,
    pub region: &'static str,
    pub year_from: u16,
    pub year_to: u16,
    pub rank: &'static str,
    pub phone: &'static str,
    pub email: &'static str,
    pub address: &'static str,
    pub additional_info: &'static str,
}

pub const SAMPLE_ROWS: [SampleRow; 3] = [
    SampleRow {
        last_name: "Иванов",
        first_name: "Иван",
        middle_name: "Петрович",
        unit: "Воинская часть 12345",
        region: "Ташкентская область",
        year_from: 1990,
        year_to: 1992,
        rank: "Сержант",
        phone: "+998901234567",
        email: "ivanov@example.com",
        address: "г. Ташкент, ул. Примерная 123",
        additional_info: "Служил в танковых войсках",
    },
    SampleRow {
        last_name: "Петров",
        first_name: "Петр",
        middle_name: "Иванович",
        unit: "Авиабаза Хурба",
        region: "Хабаровский край",
        year_from: 1985,
        year_to: 1987,
        rank: "Старший лейтенант",
        phone: "+79161234567",
        email: "petrov@example.com",
        address: "г. Хабаровск, ул. Тестовая 456",
        additional_info: "Военный летчик",
    },
    SampleRow {
        last_name: "Сидоров",
        first_name: "Алексей",
        middle_name: "Александрович",
        unit: "201-я мотострелковая дивизия",
        region: "Московская область",
        year_from: 1992,
        year_to: 1994,
        rank: "Рядовой",
        phone: "+79991234567",
        email: "sidorov@example.com",
        address: "г. Москва, ул. Образцовая 789",
        additional_info: "Связист",
    },
];

/// build_sample_workbook
///
/// Renders the header row and [`SAMPLE_ROWS`] into an in-memory `.xlsx`.
/// Years are written as numbers, everything else as text so phone numbers keep their `+`.
pub fn build_sample_workbook() -> Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();

    let sheet = workbook.add_worksheet();
    sheet.set_name(SAMPLE_SHEET_NAME)?;
    write_headers(sheet, &header_format)?;

    for (i, sample) in SAMPLE_ROWS.iter().enumerate() {
        let row = i as u32 + 1;
        sheet.write_string(row, 0, sample.last_name)?;
        sheet.write_string(row, 1, sample.first_name)?;
        sheet.write_string(row, 2, sample.middle_name)?;
        sheet.write_string(row, 3, sample.unit)?;
        sheet.write_string(row, 4, sample.region)?;
        sheet.write_number(row, 5, f64::from(sample.year_from))?;
        sheet.write_number(row, 6, f64::from(sample.year_to))?;
        sheet.write_string(row, 7, sample.rank)?;
        sheet.write_string(row, 8, sample.phone)?;
        sheet.write_string(row, 9, sample.email)?;
        sheet.write_string(row, 10, sample.address)?;
        sheet.write_string(row, 11, sample.additional_info)?;
    }

    workbook.save_to_buffer()
}

fn write_headers(sheet: &mut Worksheet, format: &Format) -> Result<(), XlsxError> {
    for (col, header) in SAMPLE_HEADERS.iter().enumerate() {
        sheet.write_string_with_format(0, col as u16, *header, format)?;
    }
    Ok(())
}
