use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One row of an input table, identified by its key column.
///
/// The key is the trimmed value of the key column (a URL or an ID). Every
/// other named column of the row is kept in `fields` so variants can consult
/// auxiliary values without re-reading the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputRecord {
    pub key: String,
    pub fields: BTreeMap<String, String>,
}

impl InputRecord {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Trimmed value of an auxiliary column, `None` when absent or blank.
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

/// One output row destined for import into the CMS.
///
/// Field order is insertion order; it only matters when a sink derives its
/// header from the records themselves. Records are built once and never
/// mutated after they reach a sink.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedRecord {
    fields: Vec<(String, String)>,
}

impl ExtractedRecord {
    /// A record carrying the four columns every content fragment row has.
    pub fn fragment(path: &str, name: &str, title: &str, template: &str) -> Self {
        Self::default()
            .with("path", path)
            .with("name", name)
            .with("title", title)
            .with("template", template)
    }

    /// Set a field, replacing any earlier value under the same name.
    pub fn with(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        match self.fields.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value,
            None => self.fields.push((name.to_string(), value)),
        }
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(n, _)| n.as_str())
    }

    /// Render the record against a column list; absent fields become `""`.
    pub fn row(&self, columns: &[String]) -> Vec<String> {
        columns
            .iter()
            .map(|c| self.get(c).unwrap_or_default().to_string())
            .collect()
    }
}

/// Pass/fail marker written into a status table by the detect variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StatusMarker {
    Pass,
    Fail,
}

impl StatusMarker {
    pub fn from_bool(pass: bool) -> Self {
        if pass {
            StatusMarker::Pass
        } else {
            StatusMarker::Fail
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StatusMarker::Pass => "✅",
            StatusMarker::Fail => "❌",
        }
    }
}

/// One row of a status table. Cells line up with the status columns the
/// variant declared before the run started.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusRow {
    pub cells: Vec<String>,
}

impl StatusRow {
    pub fn new<I, S>(cells: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cells: cells.into_iter().map(Into::into).collect(),
        }
    }
}
