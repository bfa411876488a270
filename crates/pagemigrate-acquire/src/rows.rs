use pagemigrate_model::{ConfigurationError, InputRecord};
use std::collections::HashMap;
use std::path::Path;

/// How record keys are compared when collapsing duplicates and looking up
/// secondary tables.
///
/// `Preserve` treats `https://example.edu/A` and `https://example.edu/a` as
/// different keys; `Fold` lower-cases keys first. The same choice applies to
/// the input table and every lookup table of a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum KeyCase {
    #[default]
    Preserve,
    Fold,
}

impl KeyCase {
    pub fn apply(self, key: &str) -> String {
        match self {
            KeyCase::Preserve => key.to_string(),
            KeyCase::Fold => key.to_lowercase(),
        }
    }
}

/// A whole table held in memory: one header row plus data rows.
#[derive(Debug, Clone)]
pub struct Table {
    name: String,
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(name: impl Into<String>, header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            name: name.into(),
            header,
            rows,
        }
    }

    /// Read a CSV file. Row 1 is the header row; ragged rows are accepted.
    pub fn read_csv(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        let path = path.as_ref();
        let unreadable = |reason: String| ConfigurationError::InputUnreadable {
            path: path.display().to_string(),
            reason,
        };

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)
            .map_err(|e| unreadable(e.to_string()))?;

        let mut lines = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| unreadable(e.to_string()))?;
            lines.push(record.iter().map(|c| c.to_string()).collect::<Vec<_>>());
        }

        let mut lines = lines.into_iter();
        let header = lines.next().unwrap_or_default();
        let rows: Vec<Vec<String>> = lines.collect();
        tracing::debug!(path = %path.display(), columns = header.len(), rows = rows.len(), "Read table");

        Ok(Self::new(path.display().to_string(), header, rows))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Index of the first header cell whose trimmed text equals `header`.
    pub fn find_column(&self, header: &str) -> Result<usize, ConfigurationError> {
        self.header
            .iter()
            .position(|h| h.trim() == header)
            .ok_or_else(|| ConfigurationError::ColumnNotFound {
                column: header.to_string(),
                table: self.name.clone(),
            })
    }

    /// Trimmed cell text, `None` when the cell is missing or blank.
    pub fn cell(&self, row: usize, column: usize) -> Option<&str> {
        self.rows
            .get(row)
            .and_then(|r| r.get(column))
            .map(|c| c.trim())
            .filter(|c| !c.is_empty())
    }

    /// Distinct non-empty trimmed values of a column, in first-occurrence order.
    pub fn distinct_values(&self, column: usize) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        (0..self.rows.len())
            .filter_map(|row| self.cell(row, column))
            .filter(|value| seen.insert(value.to_string()))
            .map(|value| value.to_string())
            .collect()
    }

    /// Build one record per distinct key of `key_header`.
    ///
    /// A key keeps the position of its first occurrence; its auxiliary fields
    /// come from the last row that carried it.
    pub fn records(
        &self,
        key_header: &str,
        case: KeyCase,
    ) -> Result<Vec<InputRecord>, ConfigurationError> {
        let key_col = self.find_column(key_header)?;

        let mut records: Vec<InputRecord> = Vec::new();
        let mut index: HashMap<String, usize> = HashMap::new();

        for (row_idx, row) in self.rows.iter().enumerate() {
            let Some(key) = self.cell(row_idx, key_col) else {
                continue;
            };
            let key = case.apply(key);

            let mut record = InputRecord::new(key.clone());
            for (col, name) in self.header.iter().enumerate() {
                let name = name.trim();
                if col == key_col || name.is_empty() {
                    continue;
                }
                let value = row.get(col).map(|v| v.trim()).unwrap_or_default();
                record = record.with_field(name, value);
            }

            match index.get(&key) {
                Some(&pos) => records[pos] = record,
                None => {
                    index.insert(key, records.len());
                    records.push(record);
                }
            }
        }

        Ok(records)
    }
}

/// A secondary table indexed by one key column (a report keyed by ID, a
/// component sheet keyed by URL). Duplicate keys: the last row wins.
#[derive(Debug, Clone)]
pub struct LookupTable {
    name: String,
    header: Vec<String>,
    case: KeyCase,
    rows: HashMap<String, InputRecord>,
}

impl LookupTable {
    pub fn from_table(
        table: &Table,
        key_header: &str,
        case: KeyCase,
    ) -> Result<Self, ConfigurationError> {
        let rows = table
            .records(key_header, case)?
            .into_iter()
            .map(|r| (r.key.clone(), r))
            .collect();
        Ok(Self {
            name: table.name().to_string(),
            header: table.header.clone(),
            case,
            rows,
        })
    }

    pub fn read_csv(
        path: impl AsRef<Path>,
        key_header: &str,
        case: KeyCase,
    ) -> Result<Self, ConfigurationError> {
        let table = Table::read_csv(path)?;
        Self::from_table(&table, key_header, case)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Fail unless the table has a `header` column (trimmed, exact match).
    pub fn require_column(&self, header: &str) -> Result<(), ConfigurationError> {
        if self.header.iter().any(|h| h.trim() == header) {
            Ok(())
        } else {
            Err(ConfigurationError::ColumnNotFound {
                column: header.to_string(),
                table: self.name.clone(),
            })
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&InputRecord> {
        self.rows.get(&self.case.apply(key.trim()))
    }

    /// Every row, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &InputRecord> {
        self.rows.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn table(header: &[&str], rows: &[&[&str]]) -> Table {
        Table::new(
            "batch1",
            header.iter().map(|s| s.to_string()).collect(),
            rows.iter()
                .map(|r| r.iter().map(|s| s.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn test_find_column_trims_header() {
        let t = table(&["Title", "  URL  "], &[]);
        assert_eq!(t.find_column("URL").unwrap(), 1);
    }

    #[test]
    fn test_find_column_missing_is_configuration_error() {
        let t = table(&["Link"], &[&["https://example.edu/a"]]);
        let err = t.find_column("URL").unwrap_err();
        assert!(matches!(err, ConfigurationError::ColumnNotFound { .. }));
    }

    #[test]
    fn test_distinct_values_in_first_occurrence_order() {
        let t = table(
            &["URL"],
            &[
                &[" https://example.edu/b "],
                &[""],
                &["https://example.edu/a"],
                &["https://example.edu/b"],
                &["   "],
            ],
        );
        assert_eq!(
            t.distinct_values(0),
            vec!["https://example.edu/b", "https://example.edu/a"]
        );
    }

    #[test]
    fn test_duplicate_url_yields_one_record() {
        let t = table(
            &["URL"],
            &[&["https://example.edu/a"], &["https://example.edu/a"]],
        );
        let records = t.records("URL", KeyCase::Preserve).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "https://example.edu/a");
    }

    #[test]
    fn test_duplicate_keys_keep_first_position_and_last_fields() {
        let t = table(
            &["URL", "Component"],
            &[
                &["https://example.edu/a", "Hero"],
                &["https://example.edu/b", "Text"],
                &["https://example.edu/a", "Accordion"],
            ],
        );
        let records = t.records("URL", KeyCase::Preserve).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].key, "https://example.edu/a");
        assert_eq!(records[0].field("Component"), Some("Accordion"));
        assert_eq!(records[1].key, "https://example.edu/b");
    }

    #[test]
    fn test_key_case_folding() {
        let t = table(
            &["URL"],
            &[&["https://example.edu/A"], &["https://example.edu/a"]],
        );
        assert_eq!(t.records("URL", KeyCase::Preserve).unwrap().len(), 2);

        let folded = t.records("URL", KeyCase::Fold).unwrap();
        assert_eq!(folded.len(), 1);
        assert_eq!(folded[0].key, "https://example.edu/a");
    }

    #[test]
    fn test_lookup_table() {
        let t = table(
            &["Eaglenet ID", "Default Profile Page"],
            &[&["jdoe", "/faculty/jdoe.cfm"], &["asmith", ""]],
        );
        let lookup = LookupTable::from_table(&t, "Eaglenet ID", KeyCase::Preserve).unwrap();
        assert_eq!(lookup.len(), 2);
        assert_eq!(
            lookup.get(" jdoe ").and_then(|r| r.field("Default Profile Page")),
            Some("/faculty/jdoe.cfm")
        );
        assert!(lookup.get("asmith").unwrap().field("Default Profile Page").is_none());
        assert!(lookup.get("JDOE").is_none());

        let folded = LookupTable::from_table(&t, "Eaglenet ID", KeyCase::Fold).unwrap();
        assert!(folded.get("JDOE").is_some());
    }

    #[test]
    fn test_lookup_require_column() {
        let t = table(&["Eaglenet ID", " url "], &[&["X1", "/staff/x1"]]);
        let lookup = LookupTable::from_table(&t, "Eaglenet ID", KeyCase::Preserve).unwrap();
        assert!(lookup.require_column("url").is_ok());

        let err = lookup.require_column("URL").unwrap_err();
        assert!(matches!(
            err,
            ConfigurationError::ColumnNotFound { ref column, ref table }
                if column == "URL" && table == "batch1"
        ));
    }

    #[test]
    fn test_read_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("input.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "Title,URL").unwrap();
        writeln!(file, "Home,https://example.edu/index.cfm").unwrap();
        writeln!(file, "Ragged").unwrap();
        writeln!(file, "\"About, us\",https://example.edu/about.cfm").unwrap();
        drop(file);

        let t = Table::read_csv(&path).unwrap();
        assert_eq!(t.row_count(), 3);
        let col = t.find_column("URL").unwrap();
        assert_eq!(
            t.distinct_values(col),
            vec!["https://example.edu/index.cfm", "https://example.edu/about.cfm"]
        );
        assert_eq!(t.cell(2, 0), Some("About, us"));
    }

    #[test]
    fn test_read_csv_missing_file() {
        let err = Table::read_csv("/definitely/not/here.csv").unwrap_err();
        assert!(matches!(err, ConfigurationError::InputUnreadable { .. }));
    }
}
