use async_trait::async_trait;
use rust_xlsxwriter::Workbook;
use veterans_portal::{
    AppError, InMemoryRepository,
    error::AppResult,
    import::{
        ImportOutcome, ImportReport, ROW_NOT_SAVED, RosterStore, check_structure, import_roster,
        import_sheet, parse_sheet,
        row::{
            COL_ADDRESS, COL_EMAIL, COL_FIRST_NAME, COL_LAST_NAME, COL_PHONE, COL_REGION, COL_UNIT,
            COL_YEAR_FROM, COL_YEAR_TO, RowParser,
        },
        sample::build_sample_workbook,
        sheet::{Cell, Sheet, read_workbook},
    },
    models::{Comrade, NewComrade},
    repository::{ComradeFilter, Repository},
};

const YEAR: i64 = 2024;

fn headers(names: &[&str]) -> Vec<String> {
    names.iter().map(|h| h.to_string()).collect()
}

fn base_headers() -> Vec<String> {
    headers(&[
        COL_LAST_NAME,
        COL_FIRST_NAME,
        COL_UNIT,
        COL_REGION,
        COL_YEAR_FROM,
        COL_YEAR_TO,
        COL_PHONE,
    ])
}

fn row(last: &str, first: &str, unit: &str, from: Cell, to: Cell, phone: Cell) -> Vec<Cell> {
    vec![
        Cell::from(last),
        Cell::from(first),
        Cell::from(unit),
        Cell::from("Ташкент"),
        from,
        to,
        phone,
    ]
}

fn completed(outcome: ImportOutcome) -> ImportReport {
    match outcome {
        ImportOutcome::Completed(report) => report,
        ImportOutcome::Rejected { errors, .. } => panic!("import rejected: {errors:?}"),
    }
}

// --- Row parser ---

#[test]
fn test_blank_row_yields_no_candidate() {
    let sheet = Sheet::new(base_headers(), vec![]);
    let parser = RowParser::new(&sheet, YEAR);
    let mut warnings = Vec::new();

    let blank = vec![Cell::Empty, Cell::from("   "), Cell::Empty];
    assert_eq!(parser.parse_row(1, &blank, &mut warnings), Ok(None));
    assert!(warnings.is_empty());
}

#[test]
fn test_missing_last_name_fails_with_row_number() {
    let sheet = Sheet::new(base_headers(), vec![]);
    let parser = RowParser::new(&sheet, YEAR);
    let mut warnings = Vec::new();

    let cells = row("", "Иван", "В/ч 1", Cell::Int(1985), Cell::Empty, Cell::Empty);
    let error = parser.parse_row(4, &cells, &mut warnings).unwrap_err();

    assert_eq!(error.row, 4);
    let message = error.to_string();
    assert!(message.starts_with("Row 4:"), "{message}");
    assert!(message.contains(COL_LAST_NAME), "{message}");
}

#[test]
fn test_numeric_phone_gains_plus_prefix() {
    let sheet = Sheet::new(base_headers(), vec![]);
    let parser = RowParser::new(&sheet, YEAR);
    let mut warnings = Vec::new();

    let cells = row(
        "Иванов",
        "Иван",
        "В/ч 1",
        Cell::Int(1985),
        Cell::Empty,
        Cell::Float(998901234567.0),
    );
    let candidate = parser.parse_row(1, &cells, &mut warnings).unwrap().unwrap();

    let contact = candidate.contact_info.expect("contact block");
    assert_eq!(contact.phone.as_deref(), Some("+998901234567"));
    assert_eq!(contact.email, None);
}

#[test]
fn test_years_from_float_and_text() {
    let sheet = Sheet::new(base_headers(), vec![]);
    let parser = RowParser::new(&sheet, YEAR);
    let mut warnings = Vec::new();

    let cells = row(
        "Иванов",
        "Иван",
        "В/ч 1",
        Cell::Float(1985.0),
        Cell::from("1987 г."),
        Cell::Empty,
    );
    let candidate = parser.parse_row(1, &cells, &mut warnings).unwrap().unwrap();

    assert_eq!(candidate.year_of_service_from, 1985);
    assert_eq!(candidate.year_of_service_to, Some(1987));
    assert_eq!(candidate.contact_info, None);
    assert!(warnings.is_empty());
}

#[test]
fn test_bad_optional_year_is_dropped_with_warning() {
    let sheet = Sheet::new(base_headers(), vec![]);
    let parser = RowParser::new(&sheet, YEAR);
    let mut warnings = Vec::new();

    let cells = row(
        "Иванов",
        "Иван",
        "В/ч 1",
        Cell::Int(1985),
        Cell::from("unknown"),
        Cell::Empty,
    );
    let candidate = parser.parse_row(2, &cells, &mut warnings).unwrap().unwrap();

    assert_eq!(candidate.year_of_service_to, None);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].starts_with("Row 2:"));
    assert!(warnings[0].contains(COL_YEAR_TO));
}

#[test]
fn test_required_year_out_of_range_fails_row() {
    let sheet = Sheet::new(base_headers(), vec![]);
    let parser = RowParser::new(&sheet, YEAR);
    let mut warnings = Vec::new();

    let cells = row("Иванов", "Иван", "В/ч 1", Cell::Int(1850), Cell::Empty, Cell::Empty);
    let error = parser.parse_row(2, &cells, &mut warnings).unwrap_err();

    assert!(error.detail.contains(COL_YEAR_FROM));
    assert!(error.detail.contains("1850"));
}

#[test]
fn test_out_of_range_optional_year_is_dropped_with_warning() {
    let sheet = Sheet::new(base_headers(), vec![]);
    let parser = RowParser::new(&sheet, YEAR);

    for (row_number, year_to) in [(3, 2090), (4, 1850)] {
        let mut warnings = Vec::new();
        let cells = row(
            "Иванов",
            "Иван",
            "В/ч 1",
            Cell::Int(1985),
            Cell::Int(year_to),
            Cell::Empty,
        );
        let candidate = parser
            .parse_row(row_number, &cells, &mut warnings)
            .unwrap()
            .unwrap();

        assert_eq!(candidate.year_of_service_from, 1985);
        assert_eq!(candidate.year_of_service_to, None);
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].starts_with(&format!("Row {row_number}:")));
        assert!(warnings[0].contains(COL_YEAR_TO));
        assert!(warnings[0].contains(&year_to.to_string()), "{}", warnings[0]);
    }
}

#[test]
fn test_non_numeric_required_year_fails_row() {
    let sheet = Sheet::new(base_headers(), vec![]);
    let parser = RowParser::new(&sheet, YEAR);
    let mut warnings = Vec::new();

    let cells = row("Иванов", "Иван", "В/ч 1", Cell::from("abc"), Cell::Empty, Cell::Empty);
    let error = parser.parse_row(4, &cells, &mut warnings).unwrap_err();

    assert_eq!(error.row, 4);
    assert!(error.detail.contains(COL_YEAR_FROM));
    assert!(error.detail.contains("invalid year format: abc"), "{}", error.detail);
    assert!(warnings.is_empty());
}

#[test]
fn test_contact_block_from_email_or_address_only() {
    let sheet = Sheet::new(
        headers(&[
            COL_LAST_NAME,
            COL_FIRST_NAME,
            COL_UNIT,
            COL_REGION,
            COL_YEAR_FROM,
            COL_EMAIL,
            COL_ADDRESS,
        ]),
        vec![],
    );
    let parser = RowParser::new(&sheet, YEAR);
    let mut warnings = Vec::new();

    let cells = vec![
        Cell::from("Иванов"),
        Cell::from("Иван"),
        Cell::from("В/ч 1"),
        Cell::from("Ташкент"),
        Cell::Int(1985),
        Cell::Empty,
        Cell::from(" г. Ташкент "),
    ];
    let candidate = parser.parse_row(1, &cells, &mut warnings).unwrap().unwrap();
    let contact = candidate.contact_info.unwrap();
    assert_eq!(contact.address.as_deref(), Some("г. Ташкент"));
    assert_eq!(contact.phone, None);
}

// --- Structure ---

#[test]
fn test_missing_required_column_is_structural() {
    let sheet = Sheet::new(
        headers(&[COL_LAST_NAME, COL_FIRST_NAME, COL_UNIT, COL_REGION]),
        vec![vec![
            Cell::from("Иванов"),
            Cell::from("Иван"),
            Cell::from("В/ч 1"),
            Cell::from("Ташкент"),
        ]],
    );

    let errors = check_structure(&sheet);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains(COL_YEAR_FROM));

    let parsed = parse_sheet(&sheet, YEAR);
    assert!(parsed.candidates.is_empty());
    assert!(!parsed.structural.is_empty());
}

#[test]
fn test_empty_sheet_is_structural() {
    let sheet = Sheet::new(base_headers(), vec![]);
    assert_eq!(check_structure(&sheet), vec!["Excel file is empty".to_string()]);
}

// --- Orchestrator ---

#[tokio::test]
async fn test_missing_column_imports_nothing() {
    let repo = InMemoryRepository::new();
    let sheet = Sheet::new(
        headers(&[COL_LAST_NAME, COL_FIRST_NAME, COL_UNIT, COL_REGION]),
        vec![vec![
            Cell::from("Иванов"),
            Cell::from("Иван"),
            Cell::from("В/ч 1"),
            Cell::from("Ташкент"),
        ]],
    );

    let outcome = import_sheet(&repo, &sheet, YEAR).await;
    assert!(matches!(outcome, ImportOutcome::Rejected { ref errors, .. } if !errors.is_empty()));

    let stats = repo.get_stats().await.unwrap();
    assert_eq!(stats.total_comrades, 0);
}

#[tokio::test]
async fn test_partial_import_reports_bad_row() {
    let repo = InMemoryRepository::new();
    let sheet = Sheet::new(
        base_headers(),
        vec![
            row("Иванов", "Иван", "В/ч 1", Cell::Int(1985), Cell::Int(1987), Cell::Empty),
            row("Петров", "Петр", "В/ч 2", Cell::Int(1850), Cell::Empty, Cell::Empty),
            row("Сидоров", "Алексей", "В/ч 3", Cell::Int(1992), Cell::Empty, Cell::Empty),
        ],
    );

    let report = completed(import_sheet(&repo, &sheet, YEAR).await);

    assert_eq!(report.imported, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.total_processed, 3);
    assert_eq!(report.errors.len(), 1);
    assert!(report.errors[0].starts_with("Row 2:"), "{:?}", report.errors);

    let stored = repo.list_comrades(&ComradeFilter::default()).await.unwrap();
    assert_eq!(stored.total, 2);
}

#[tokio::test]
async fn test_out_of_range_year_to_still_imports_row() {
    let repo = InMemoryRepository::new();
    let sheet = Sheet::new(
        base_headers(),
        vec![
            row("Иванов", "Иван", "В/ч 1", Cell::Int(1985), Cell::Int(2090), Cell::Empty),
            row("Петров", "Петр", "В/ч 2", Cell::Int(1986), Cell::Int(1988), Cell::Empty),
        ],
    );

    let report = completed(import_sheet(&repo, &sheet, YEAR).await);

    assert_eq!(report.imported, 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.total_processed, 2);
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].starts_with("Row 1:"));

    let stored = repo.list_comrades(&ComradeFilter::default()).await.unwrap();
    let ivanov = stored.items.iter().find(|c| c.last_name == "Иванов").unwrap();
    assert_eq!(ivanov.year_of_service_to, None);
}

#[tokio::test]
async fn test_exact_duplicate_is_skipped_not_overwritten() {
    let repo = InMemoryRepository::new();
    let existing = repo
        .create_comrade(NewComrade {
            first_name: "Иван".to_string(),
            last_name: "Иванов".to_string(),
            unit: "В/ч 1".to_string(),
            region: "Самарканд".to_string(),
            year_of_service_from: 1980,
            ..NewComrade::default()
        })
        .await
        .unwrap();

    let sheet = Sheet::new(
        base_headers(),
        vec![row("Иванов", "Иван", "В/ч 1", Cell::Int(1985), Cell::Empty, Cell::Empty)],
    );
    let report = completed(import_sheet(&repo, &sheet, YEAR).await);

    assert_eq!(report.imported, 0);
    assert_eq!(report.skipped, 1);
    assert!(report.errors[0].contains("already exists"));

    let unchanged = repo.get_comrade(existing.id).await.unwrap().unwrap();
    assert_eq!(unchanged.region, "Самарканд");
    assert_eq!(unchanged.year_of_service_from, 1980);
}

#[tokio::test]
async fn test_duplicates_within_one_file() {
    let repo = InMemoryRepository::new();
    let sheet = Sheet::new(
        base_headers(),
        vec![
            row("Иванов", "Иван", "В/ч 1", Cell::Int(1985), Cell::Empty, Cell::Empty),
            row("Иванов", "Иван", "В/ч 1", Cell::Int(1986), Cell::Empty, Cell::Empty),
        ],
    );
    let report = completed(import_sheet(&repo, &sheet, YEAR).await);

    assert_eq!(report.imported, 1);
    assert_eq!(report.skipped, 1);
    assert!(report.errors[0].starts_with("Row 2:"));
}

#[tokio::test]
async fn test_invalid_contact_is_caught_by_revalidation() {
    let repo = InMemoryRepository::new();
    let sheet = Sheet::new(
        base_headers(),
        vec![row(
            "Иванов",
            "Иван",
            "В/ч 1",
            Cell::Int(1985),
            Cell::Int(1980),
            Cell::from("12345"),
        )],
    );
    let report = completed(import_sheet(&repo, &sheet, YEAR).await);

    assert_eq!(report.imported, 0);
    assert_eq!(report.errors.len(), 1);
    let error = &report.errors[0];
    assert!(error.starts_with("Row 1:"));
    assert!(error.contains("Year to cannot be earlier than year from"), "{error}");
    assert!(error.contains("Phone must start with +"), "{error}");
}

#[tokio::test]
async fn test_blank_rows_are_not_counted() {
    let repo = InMemoryRepository::new();
    let sheet = Sheet::new(
        base_headers(),
        vec![
            row("Иванов", "Иван", "В/ч 1", Cell::Int(1985), Cell::Empty, Cell::Empty),
            vec![Cell::Empty; 7],
            row("Петров", "Петр", "В/ч 2", Cell::Int(1986), Cell::Empty, Cell::Empty),
        ],
    );
    let report = completed(import_sheet(&repo, &sheet, YEAR).await);

    assert_eq!(report.imported, 2);
    assert_eq!(report.total_processed, 2);
    assert!(report.errors.is_empty());
}

/// Store that refuses to insert one particular last name.
struct FlakyStore {
    inner: InMemoryRepository,
    reject: &'static str,
}

#[async_trait]
impl RosterStore for FlakyStore {
    async fn roster_duplicate(
        &self,
        first_name: &str,
        last_name: &str,
        unit: &str,
    ) -> AppResult<Option<i64>> {
        self.inner.find_comrade_duplicate(first_name, last_name, unit).await
    }

    async fn roster_insert(&self, comrade: NewComrade) -> AppResult<Comrade> {
        if comrade.last_name == self.reject {
            return Err(AppError::Database("connection reset".to_string()));
        }
        self.inner.create_comrade(comrade).await
    }
}

#[tokio::test]
async fn test_store_failure_skips_only_that_row() {
    let store = FlakyStore {
        inner: InMemoryRepository::new(),
        reject: "Петров",
    };
    let sheet = Sheet::new(
        base_headers(),
        vec![
            row("Иванов", "Иван", "В/ч 1", Cell::Int(1985), Cell::Empty, Cell::Empty),
            row("Петров", "Петр", "В/ч 2", Cell::Int(1986), Cell::Empty, Cell::Empty),
            row("Сидоров", "Алексей", "В/ч 3", Cell::Int(1992), Cell::Empty, Cell::Empty),
        ],
    );

    let report = completed(import_sheet(&store, &sheet, YEAR).await);

    assert_eq!(report.imported, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.imported + report.skipped, report.total_processed);
    assert_eq!(report.errors, vec![format!("Row 2: {ROW_NOT_SAVED}")]);
    assert!(!report.errors[0].contains("connection reset"));

    let stats = store.inner.get_stats().await.unwrap();
    assert_eq!(stats.total_comrades, 2);
}

#[tokio::test]
async fn test_errors_stay_in_row_order() {
    let repo = InMemoryRepository::new();
    let sheet = Sheet::new(
        base_headers(),
        vec![
            row("Иванов", "Иван", "В/ч 1", Cell::Int(1985), Cell::Int(1970), Cell::Empty),
            row("", "Петр", "В/ч 2", Cell::Int(1986), Cell::Empty, Cell::Empty),
        ],
    );
    let report = completed(import_sheet(&repo, &sheet, YEAR).await);

    assert_eq!(report.errors.len(), 2);
    assert!(report.errors[0].starts_with("Row 1:"));
    assert!(report.errors[1].starts_with("Row 2:"));
}

// --- Real workbooks ---

fn workbook_bytes(rows: &[[&str; 5]], years: &[f64]) -> Vec<u8> {
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    for (col, header) in [COL_LAST_NAME, COL_FIRST_NAME, COL_UNIT, COL_REGION, COL_YEAR_FROM]
        .iter()
        .enumerate()
    {
        sheet.write_string(0, col as u16, *header).unwrap();
    }
    for (i, cells) in rows.iter().enumerate() {
        let r = i as u32 + 1;
        for (col, value) in cells.iter().take(4).enumerate() {
            sheet.write_string(r, col as u16, *value).unwrap();
        }
        sheet.write_number(r, 4, years[i]).unwrap();
    }
    workbook.save_to_buffer().unwrap()
}

#[tokio::test]
async fn test_xlsx_end_to_end() {
    let repo = InMemoryRepository::new();
    let bytes = workbook_bytes(
        &[
            ["Иванов", "Иван", "В/ч 1", "Ташкент", ""],
            ["Петров", "Петр", "В/ч 2", "Бухара", ""],
            ["Сидоров", "Алексей", "В/ч 3", "Фергана", ""],
        ],
        &[1985.0, 1850.0, 1992.0],
    );

    let report = completed(import_roster(&repo, bytes, YEAR).await);

    assert_eq!(report.imported, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(report.total_processed, 3);
    assert!(report.errors[0].starts_with("Row 2:"));
}

#[tokio::test]
async fn test_sample_workbook_imports_cleanly() {
    let repo = InMemoryRepository::new();
    let bytes = build_sample_workbook().unwrap();

    let sheet = read_workbook(&bytes).unwrap();
    assert!(check_structure(&sheet).is_empty());

    let report = completed(import_roster(&repo, bytes, YEAR).await);
    assert_eq!(report.imported, 3);
    assert!(report.errors.is_empty(), "{:?}", report.errors);
    assert!(report.warnings.is_empty(), "{:?}", report.warnings);

    let roster = repo.list_comrades(&ComradeFilter::default()).await.unwrap();
    let ivanov = roster
        .items
        .iter()
        .find(|c| c.last_name == "Иванов")
        .unwrap();
    assert_eq!(ivanov.contact_info.phone.as_deref(), Some("+998901234567"));
    assert_eq!(ivanov.year_of_service_to, Some(1992));
}

#[tokio::test]
async fn test_unreadable_file_is_rejected() {
    let repo = InMemoryRepository::new();
    let outcome = import_roster(&repo, b"definitely not a spreadsheet".to_vec(), YEAR).await;

    match outcome {
        ImportOutcome::Rejected { errors, .. } => assert_eq!(errors.len(), 1),
        other => panic!("expected rejection, got {other:?}"),
    }
}
