//! # Application Coordinator Module
//!
//! ## Purpose
//! Sequences one end-to-end operation at a time: validate input, invoke the
//! source connector, report to the presentation layer, drive the persistence
//! gateway. Also owns the read/export paths over the store.
//!
//! ## Input/Output Specification
//! - **Input**: plain parameters from the presentation layer (taxpayer ID,
//!   filter criteria, export paths) — the coordinator never reads UI state
//! - **Output**: status messages and result sets pushed through the
//!   [`Presenter`] port; export success flags
//! - **Faults**: every fault is caught here, converted to a user-visible
//!   status message plus a structured log entry; nothing propagates to a
//!   caller unprepared to render it

use crate::errors::CheckerError;
use crate::export;
use crate::scraper::CaseSource;
use crate::storage::{CaseFilter, CaseStore};
use crate::{is_valid_inn, CaseRecord};
use std::path::Path;
use tracing::{error, info, warn};

/// Presentation port. Implementations collect status text and tabular
/// results; the coordinator calls, never reads.
pub trait Presenter {
    /// Display a status line
    fn status(&self, text: &str);
    /// Display a result set
    fn results(&self, records: &[CaseRecord]);
}

/// Coordinator for search, filter and export operations.
///
/// Operations run strictly one at a time on the calling task; there is no
/// background work and no shared mutable state across operations.
pub struct App {
    source: Box<dyn CaseSource + Send + Sync>,
    store: CaseStore,
    max_results: usize,
}

impl App {
    pub fn new(
        source: impl CaseSource + Send + Sync + 'static,
        store: CaseStore,
        max_results: usize,
    ) -> Self {
        Self {
            source: Box::new(source),
            store,
            max_results,
        }
    }

    /// One search operation: validate, scrape, present, persist.
    pub async fn run_search(&self, inn: &str, presenter: &dyn Presenter) {
        presenter.status(&format!("Запускаю скрапинг для ИНН: {inn}..."));

        if !is_valid_inn(inn) {
            let err = CheckerError::Validation {
                field: "inn".to_string(),
                reason: "Неверный ИНН. Введите корректный ИНН (только цифры, 10 или 12 знаков)."
                    .to_string(),
            };
            error!(category = err.category(), "Rejected INN: {inn:?}");
            presenter.status(&err.user_message());
            return;
        }

        presenter.status(&format!(
            "Начинаю процесс веб-скрапинга: {}...",
            self.source.name()
        ));
        let cases = match self.source.fetch_cases(inn, self.max_results).await {
            Ok(cases) => cases,
            Err(err) => {
                error!(
                    category = err.category(),
                    "Scraping failed for INN {inn}: {err}"
                );
                presenter.status(&err.user_message());
                return;
            }
        };

        if cases.is_empty() {
            presenter.status(&format!(
                "Скрапинг завершен. Дела для ИНН {inn} не найдены."
            ));
        } else {
            presenter.status(&format!(
                "Скрапинг завершен. Найдено {} дел для ИНН {inn}.",
                cases.len()
            ));
        }
        presenter.results(&cases);

        if cases.is_empty() {
            presenter.status(&format!("Нет новых дел для сохранения для ИНН {inn}."));
            return;
        }

        presenter.status("Сохраняю полученные дела в базу данных...");
        if let Err(err) = self.store.ensure_schema() {
            error!(category = err.category(), "Schema creation failed: {err}");
            presenter.status(&err.user_message());
            return;
        }

        // Inserts are handled per record: the first hard failure stops the
        // remaining batch, already-inserted rows stay persisted, and the
        // reported count stays accurate.
        let mut inserted = 0usize;
        for case in &cases {
            match self.store.insert(case) {
                Ok(true) => inserted += 1,
                Ok(false) => {}
                Err(err) => {
                    error!(
                        category = err.category(),
                        "Insert failed for case {}: {err}", case.case_number
                    );
                    presenter.status(&err.user_message());
                    warn!("Stopping the insert batch; {inserted} records were already saved");
                    break;
                }
            }
        }
        presenter.status(&format!(
            "Успешно вставлено {inserted} новых дел (пропущены существующие)."
        ));
        presenter.status("Процесс скрапинга и обновления базы данных завершен.");
    }

    /// One filter operation: query the store, present the result set.
    pub fn run_filter(&self, filter: &CaseFilter, presenter: &dyn Presenter) {
        if filter.is_empty() {
            presenter.status("Фильтры не заданы, показываю все записи...");
        } else {
            presenter.status("Применяю фильтры и обновляю таблицу...");
        }
        match self.store.get_filtered(filter) {
            Ok(cases) => {
                info!("Filter matched {} cases", cases.len());
                presenter.status(&format!("Найдено {} дел по заданным фильтрам.", cases.len()));
                presenter.results(&cases);
            }
            Err(err) => {
                error!(category = err.category(), "Filter query failed: {err}");
                presenter.status(&err.user_message());
            }
        }
    }

    /// Export all persisted records to CSV. Returns whether a file was
    /// written; an empty store is a non-error "nothing to export".
    pub fn export_csv(&self, path: &Path, presenter: &dyn Presenter) -> bool {
        presenter.status(&format!("Экспортирую данные в CSV: {}...", path.display()));
        self.export_with(path, presenter, |records, path| {
            export::export_csv(records, path)
        })
    }

    /// Export all persisted records to JSON. Same contract as
    /// [`App::export_csv`].
    pub fn export_json(&self, path: &Path, presenter: &dyn Presenter) -> bool {
        presenter.status(&format!("Экспортирую данные в JSON: {}...", path.display()));
        self.export_with(path, presenter, |records, path| {
            export::export_json(records, path)
        })
    }

    fn export_with(
        &self,
        path: &Path,
        presenter: &dyn Presenter,
        write: impl Fn(&[CaseRecord], &Path) -> crate::Result<()>,
    ) -> bool {
        let cases = match self.store.get_all() {
            Ok(cases) => cases,
            Err(err) => {
                error!(category = err.category(), "Export read failed: {err}");
                presenter.status(&err.user_message());
                return false;
            }
        };

        if cases.is_empty() {
            warn!("Nothing to export");
            presenter.status("Нет данных для экспорта.");
            return false;
        }

        match write(&cases, path) {
            Ok(()) => {
                presenter.status(&format!(
                    "Данные успешно экспортированы: {}",
                    path.display()
                ));
                true
            }
            Err(err) => {
                error!(category = err.category(), "Export write failed: {err}");
                presenter.status(&err.user_message());
                false
            }
        }
    }
}
