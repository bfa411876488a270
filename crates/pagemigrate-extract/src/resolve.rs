// Profile URL resolution across several sources.

use pagemigrate_acquire::LookupTable;
use pagemigrate_model::{ConfigurationError, InputRecord, RowError, Settings};
use regex::Regex;
use std::sync::LazyLock;

pub const DEFAULT_PAGE_COLUMN: &str = "Default Profile Page";
pub const ALL_PAGES_COLUMN: &str = "All Profile Pages";
/// Column of the secondary URL table holding the profile URL.
pub const URL_TABLE_COLUMN: &str = "url";

static ROLE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*([A-Za-z][A-Za-z _-]*?)\s*:\s*(.*)$").expect("valid regex")
});

/// Finds the canonical profile page for an identifier.
///
/// Candidates, first non-empty wins:
/// 1. `Default Profile Page` of the profile row;
/// 2. the first usable segment of its `All Profile Pages` list;
/// 3. the `url` column of the secondary URL table, keyed by the same ID.
///
/// The profile row is the report row for the ID when a report is loaded,
/// otherwise the input record itself.
#[derive(Debug, Clone)]
pub struct ProfileUrlResolver {
    report: Option<LookupTable>,
    url_table: Option<LookupTable>,
    settings: Settings,
}

impl ProfileUrlResolver {
    /// Both tables must carry the column they are loaded for: the report
    /// its `Default Profile Page`, the URL table its `url`.
    pub fn new(
        report: Option<LookupTable>,
        url_table: Option<LookupTable>,
        settings: Settings,
    ) -> Result<Self, ConfigurationError> {
        if let Some(report) = &report {
            report.require_column(DEFAULT_PAGE_COLUMN)?;
        }
        if let Some(url_table) = &url_table {
            url_table.require_column(URL_TABLE_COLUMN)?;
        }
        Ok(Self {
            report,
            url_table,
            settings,
        })
    }

    /// The row carrying the profile columns for `record`, if any.
    pub fn profile_row<'a>(&'a self, record: &'a InputRecord) -> Option<&'a InputRecord> {
        match &self.report {
            Some(report) => report.get(&record.key),
            None => Some(record),
        }
    }

    /// Absolute profile URL for the record.
    pub fn resolve(&self, record: &InputRecord) -> Result<String, RowError> {
        let row = self.profile_row(record);
        if row.is_none() {
            tracing::debug!(id = %record.key, "Not found in report, trying URL table");
        }

        let candidate = row
            .and_then(|r| r.field(DEFAULT_PAGE_COLUMN).map(str::to_string))
            .or_else(|| {
                row.and_then(|r| r.field(ALL_PAGES_COLUMN))
                    .and_then(|list| first_profile_page(list, &self.settings.role_prefixes))
            })
            .or_else(|| {
                self.url_table
                    .as_ref()
                    .and_then(|t| t.get(&record.key))
                    .and_then(|r| r.field(URL_TABLE_COLUMN).map(str::to_string))
            });

        match candidate {
            Some(page) => Ok(self.settings.absolute_url(&page)),
            None if row.is_none() => Err(RowError::unresolved(
                &record.key,
                "not found in report and no fallback URL",
            )),
            None => Err(RowError::unresolved(&record.key, "has no profile page")),
        }
    }
}

/// First non-empty page of a `|`-delimited list, with role labels stripped.
///
/// `faculty:/fac/x1|staff:/staff/x1` yields `/fac/x1`. Only labels listed
/// in `role_prefixes` are stripped, so `https://…` segments stay intact.
pub fn first_profile_page(list: &str, role_prefixes: &[String]) -> Option<String> {
    list.split('|')
        .map(|segment| {
            let segment = segment.trim();
            match ROLE_LABEL.captures(segment) {
                Some(caps)
                    if role_prefixes
                        .iter()
                        .any(|p| p.trim().eq_ignore_ascii_case(&caps[1])) =>
                {
                    caps[2].trim().to_string()
                }
                _ => segment.to_string(),
            }
        })
        .find(|page| !page.is_empty())
}
