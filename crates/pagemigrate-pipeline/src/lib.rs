//! The run driver: `Init → Reading → (Fetching → Extracting → Recording)* →
//! Finalizing → Done`.
//!
//! [`Run::init`] covers everything that can abort a run (settings, input
//! table, key column). Once a [`Run`] exists, no single row can stop it: every
//! row either lands in a sink or is skipped with a warning and an entry in
//! the failure log.

use pagemigrate_acquire::output::cache_html;
use pagemigrate_acquire::{FailureLog, Fetch, KeyCase, RecordSink, StatusSink, Table};
use pagemigrate_extract::{Page, RowOutput, Target, Variant};
use pagemigrate_model::{ConfigurationError, InputRecord, RowError, Settings, StatusRow};
use std::path::PathBuf;

/// Where a run reads from and writes to.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub input: PathBuf,
    pub key_column: String,
    /// Record table; written only when the variant declares output columns.
    pub output: PathBuf,
    /// Status table; written only when the variant declares status columns.
    pub status_output: PathBuf,
    pub failure_log: PathBuf,
    pub limit: Option<usize>,
    pub key_case: KeyCase,
    /// Keep a copy of every fetched page here.
    pub cache_dir: Option<PathBuf>,
}

/// Counts reported when a run finishes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub total: usize,
    pub extracted: usize,
    pub status_rows: usize,
    pub fetch_failures: usize,
    pub mismatches: usize,
    pub unresolved: usize,
}

impl RunSummary {
    pub fn skipped(&self) -> usize {
        self.fetch_failures + self.mismatches + self.unresolved
    }

    fn count(&mut self, error: &RowError) {
        match error {
            RowError::Fetch(_) => self.fetch_failures += 1,
            RowError::Mismatch { .. } => self.mismatches += 1,
            RowError::Unresolved { .. } => self.unresolved += 1,
        }
    }
}

/// A row that produced no output, plus any status rows still owed for it.
struct Skip {
    error: RowError,
    statuses: Vec<StatusRow>,
}

impl From<RowError> for Skip {
    fn from(error: RowError) -> Self {
        Self {
            error,
            statuses: Vec::new(),
        }
    }
}

/// The sinks a run fills, owned by the driver until `Finalizing`.
struct Sinks {
    records: RecordSink,
    statuses: StatusSink,
    failures: FailureLog,
    write_records: bool,
    write_statuses: bool,
}

/// A validated run, ready to process its input records.
#[derive(Debug)]
pub struct Run {
    options: RunOptions,
    records: Vec<InputRecord>,
}

impl Run {
    /// Validate settings, read the input table and collect its records.
    ///
    /// Nothing is written yet, so a configuration error here leaves no
    /// output files behind.
    pub fn init(options: RunOptions, settings: &Settings) -> Result<Self, ConfigurationError> {
        settings.validate()?;

        let table = Table::read_csv(&options.input)?;
        let mut records = table.records(&options.key_column, options.key_case)?;
        tracing::info!(
            input = %options.input.display(),
            column = %options.key_column,
            rows = table.row_count(),
            records = records.len(),
            "Read input table"
        );

        if let Some(limit) = options.limit {
            if records.len() > limit {
                tracing::info!(limit, dropped = records.len() - limit, "Limiting run");
                records.truncate(limit);
            }
        }

        Ok(Self { options, records })
    }

    pub fn records(&self) -> &[InputRecord] {
        &self.records
    }

    /// Process every record in order, then write the tables.
    ///
    /// The failure log is created here, after the variant (and any lookup
    /// tables it needed) was built successfully.
    pub async fn execute<V, F>(self, variant: &V, fetcher: &F) -> Result<RunSummary, ConfigurationError>
    where
        V: Variant,
        F: Fetch,
    {
        let output_columns = variant.output_columns();
        let status_columns = variant.status_columns();
        let mut sinks = Sinks {
            write_records: !output_columns.is_empty(),
            write_statuses: !status_columns.is_empty(),
            records: RecordSink::with_columns(output_columns),
            statuses: StatusSink::new(status_columns),
            failures: FailureLog::create(&self.options.failure_log)?,
        };

        let mut summary = RunSummary {
            total: self.records.len(),
            ..RunSummary::default()
        };
        tracing::info!(variant = variant.name(), records = summary.total, "Starting run");

        for (idx, record) in self.records.iter().enumerate() {
            tracing::info!(n = idx + 1, of = summary.total, key = %record.key, "Processing");

            match self.process(variant, fetcher, record).await {
                Ok(output) => {
                    summary.status_rows += output.statuses.len();
                    for row in output.statuses {
                        sinks.statuses.push(row);
                    }
                    if let Some(extracted) = output.record {
                        sinks.records.push(extracted);
                        summary.extracted += 1;
                        tracing::info!(key = %record.key, "Extracted");
                    }
                    if let Some(error) = output.skipped {
                        self.skip(&mut sinks.failures, &mut summary, record, &error)?;
                    }
                }
                Err(skip) => {
                    summary.status_rows += skip.statuses.len();
                    for row in skip.statuses {
                        sinks.statuses.push(row);
                    }
                    self.skip(&mut sinks.failures, &mut summary, record, &skip.error)?;
                }
            }
        }

        self.finalize(sinks, &summary)?;
        Ok(summary)
    }

    /// One record through Fetching and Extracting.
    async fn process<V, F>(&self, variant: &V, fetcher: &F, record: &InputRecord) -> Result<RowOutput, Skip>
    where
        V: Variant,
        F: Fetch,
    {
        let url = match variant.resolve(record)? {
            Target::Resolved(resolved) => return Ok(RowOutput::record(resolved)),
            Target::Fetch(url) => url,
        };

        let body = match fetcher.fetch(&url).await {
            Ok(body) => body,
            Err(failure) => {
                return Err(Skip {
                    statuses: variant.on_fetch_failure(record, &url),
                    error: RowError::Fetch(failure),
                });
            }
        };
        tracing::debug!(url = %url, bytes = body.len(), "Fetched");

        if let Some(dir) = &self.options.cache_dir {
            if let Err(e) = cache_html(dir, &url, &body) {
                tracing::warn!(url = %url, error = %e, "Could not cache page");
            }
        }

        Ok(extract_page(variant, record, &url, &body)?)
    }

    fn skip(
        &self,
        failures: &mut FailureLog,
        summary: &mut RunSummary,
        record: &InputRecord,
        error: &RowError,
    ) -> Result<(), ConfigurationError> {
        tracing::warn!(key = %record.key, error = %error, "Skipped");
        summary.count(error);
        failures
            .record(&format!("{} -> {}", record.key, error))
            .map_err(|e| self.failure_log_unwritable(e))
    }

    fn finalize(&self, sinks: Sinks, summary: &RunSummary) -> Result<(), ConfigurationError> {
        if sinks.write_records {
            sinks.records.write_csv(&self.options.output)?;
        }
        if sinks.write_statuses {
            sinks.statuses.write_csv(&self.options.status_output)?;
        }
        sinks
            .failures
            .finish()
            .map_err(|e| self.failure_log_unwritable(e))?;

        tracing::info!(
            total = summary.total,
            extracted = summary.extracted,
            status_rows = summary.status_rows,
            fetch_failures = summary.fetch_failures,
            mismatches = summary.mismatches,
            unresolved = summary.unresolved,
            "Run complete"
        );
        Ok(())
    }

    fn failure_log_unwritable(&self, e: std::io::Error) -> ConfigurationError {
        ConfigurationError::OutputUnwritable {
            path: self.options.failure_log.display().to_string(),
            reason: e.to_string(),
        }
    }
}

/// Parse and extract in one synchronous step, so the parsed document never
/// lives across an await.
fn extract_page<V: Variant>(
    variant: &V,
    record: &InputRecord,
    url: &str,
    body: &str,
) -> Result<RowOutput, RowError> {
    let prepared = variant.prepare_body(body);
    let page = Page::parse(url, &prepared);
    variant.extract(record, &page)
}
