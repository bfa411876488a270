use pagemigrate_model::{ConfigurationError, ExtractedRecord, StatusRow};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Accumulates extracted records and writes them as one CSV at the end of a run.
///
/// With declared columns the header is fixed up front; without, it is the
/// union of field names across all records in first-seen order. Records
/// missing a column render an empty cell.
#[derive(Debug, Clone, Default)]
pub struct RecordSink {
    columns: Option<Vec<String>>,
    records: Vec<ExtractedRecord>,
}

impl RecordSink {
    pub fn with_columns(columns: Vec<String>) -> Self {
        Self {
            columns: Some(columns),
            records: Vec::new(),
        }
    }

    /// A sink whose header is derived from the records it receives.
    pub fn with_union_header() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: ExtractedRecord) {
        self.records.push(record);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ExtractedRecord] {
        &self.records
    }

    pub fn columns(&self) -> Vec<String> {
        if let Some(columns) = &self.columns {
            return columns.clone();
        }
        let mut columns: Vec<String> = Vec::new();
        for record in &self.records {
            for name in record.field_names() {
                if !columns.iter().any(|c| c == name) {
                    columns.push(name.to_string());
                }
            }
        }
        columns
    }

    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), ConfigurationError> {
        let path = path.as_ref();
        let columns = self.columns();
        let rows = self.records.iter().map(|r| r.row(&columns));
        write_table(path, &columns, rows)?;
        tracing::info!(path = %path.display(), rows = self.records.len(), "Wrote output table");
        Ok(())
    }
}

/// Accumulates status rows (pass/fail markers) for the detect variants.
#[derive(Debug, Clone)]
pub struct StatusSink {
    columns: Vec<String>,
    rows: Vec<StatusRow>,
}

impl StatusSink {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: StatusRow) {
        self.rows.push(row);
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> &[StatusRow] {
        &self.rows
    }

    /// Write the table; rows are padded or cut to the declared width.
    pub fn write_csv(&self, path: impl AsRef<Path>) -> Result<(), ConfigurationError> {
        let path = path.as_ref();
        let width = self.columns.len();
        let rows = self.rows.iter().map(|row| {
            let mut cells = row.cells.clone();
            cells.resize(width, String::new());
            cells
        });
        write_table(path, &self.columns, rows)?;
        tracing::info!(path = %path.display(), rows = self.rows.len(), "Wrote status table");
        Ok(())
    }
}

fn write_table(
    path: &Path,
    columns: &[String],
    rows: impl Iterator<Item = Vec<String>>,
) -> Result<(), ConfigurationError> {
    let unwritable = |reason: String| ConfigurationError::OutputUnwritable {
        path: path.display().to_string(),
        reason,
    };

    ensure_parent(path).map_err(|e| unwritable(e.to_string()))?;
    let mut writer = csv::Writer::from_path(path).map_err(|e| unwritable(e.to_string()))?;
    writer
        .write_record(columns)
        .map_err(|e| unwritable(e.to_string()))?;
    for row in rows {
        writer
            .write_record(&row)
            .map_err(|e| unwritable(e.to_string()))?;
    }
    writer.flush().map_err(|e| unwritable(e.to_string()))
}

fn ensure_parent(path: &Path) -> std::io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent),
        _ => Ok(()),
    }
}

/// Plain-text log of identifiers that need manual follow-up.
///
/// Opened once per run in overwrite mode; one line per entry.
#[derive(Debug)]
pub struct FailureLog {
    path: PathBuf,
    writer: BufWriter<File>,
    entries: usize,
}

impl FailureLog {
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref().to_path_buf();
        let unwritable = |e: std::io::Error| ConfigurationError::OutputUnwritable {
            path: path.display().to_string(),
            reason: e.to_string(),
        };
        ensure_parent(&path).map_err(unwritable)?;
        let file = File::create(&path).map_err(unwritable)?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            entries: 0,
        })
    }

    pub fn record(&mut self, line: &str) -> std::io::Result<()> {
        writeln!(self.writer, "{}", line.trim_end())?;
        self.entries += 1;
        Ok(())
    }

    pub fn entries(&self) -> usize {
        self.entries
    }

    /// Flush and close, returning how many entries were written.
    pub fn finish(mut self) -> std::io::Result<usize> {
        self.writer.flush()?;
        tracing::info!(path = %self.path.display(), entries = self.entries, "Closed failure log");
        Ok(self.entries)
    }
}

/// Cache a fetched page so it can be re-examined without re-fetching.
pub fn cache_html(cache_dir: &Path, url: &str, html: &str) -> std::io::Result<PathBuf> {
    fs::create_dir_all(cache_dir)?;
    let path = cache_dir.join(cache_file_name(url));
    fs::write(&path, html)?;
    tracing::debug!(path = %path.display(), bytes = html.len(), "Cached raw HTML");
    Ok(path)
}

/// Flatten a URL into a file name: host and path segments joined by `_`.
fn cache_file_name(url: &str) -> String {
    let flat = match url::Url::parse(url) {
        Ok(parsed) => format!("{}{}", parsed.host_str().unwrap_or("page"), parsed.path()),
        Err(_) => url.to_string(),
    };
    let mut name: String = flat
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '.' { c } else { '_' })
        .collect();
    name = name.trim_matches('_').to_string();
    if name.is_empty() {
        name = "page".to_string();
    }
    format!("{name}.html")
}
