//! Field extraction: turns a fetched legacy page into content fragment rows.
//!
//! Every legacy migration job is one [`Variant`]: it declares its output
//! columns up front, says which URL to fetch for an input record, and pulls
//! its fields out of the parsed page.

use pagemigrate_model::{ExtractedRecord, InputRecord, RowError, StatusRow};
use scraper::Html;
use std::borrow::Cow;

pub mod components;
pub mod css;
pub mod dom;
pub mod magazine;
pub mod normalize;
pub mod paths;
pub mod profile;
pub mod profile_urls;
pub mod resolve;
pub mod side_nav;
pub mod text_block;

pub use components::Components;
pub use magazine::Magazine;
pub use profile::Profile;
pub use profile_urls::ProfileUrls;
pub use resolve::ProfileUrlResolver;
pub use side_nav::SideNav;
pub use text_block::TextBlock;

/// A fetched page, parsed and ready for field extraction.
pub struct Page<'a> {
    pub url: &'a str,
    pub document: Html,
}

impl<'a> Page<'a> {
    pub fn parse(url: &'a str, html: &str) -> Self {
        Self {
            url,
            document: Html::parse_document(html),
        }
    }
}

/// What to do with an input record once its target is known.
#[derive(Debug)]
pub enum Target {
    /// Fetch this URL and extract from it.
    Fetch(String),
    /// The record is complete without fetching anything.
    Resolved(ExtractedRecord),
}

/// What one page produced.
///
/// Status rows are kept even when the record itself is skipped: a detect job
/// still reports every section it looked at.
#[derive(Debug, Default)]
pub struct RowOutput {
    pub record: Option<ExtractedRecord>,
    pub statuses: Vec<StatusRow>,
    pub skipped: Option<RowError>,
}

impl RowOutput {
    pub fn record(record: ExtractedRecord) -> Self {
        Self {
            record: Some(record),
            ..Self::default()
        }
    }

    pub fn statuses(statuses: Vec<StatusRow>) -> Self {
        Self {
            statuses,
            ..Self::default()
        }
    }
}

/// One migration job: which pages to read and which fields to pull out.
pub trait Variant {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Columns of the record table. Empty when the job produces no records.
    fn output_columns(&self) -> Vec<String>;

    /// Columns of the status table. Empty when the job writes no status rows.
    fn status_columns(&self) -> Vec<String> {
        Vec::new()
    }

    /// The URL to fetch for a record, or a record that needs no fetch.
    fn resolve(&self, record: &InputRecord) -> Result<Target, RowError> {
        Ok(Target::Fetch(record.key.clone()))
    }

    /// Rewrite the raw body before it is parsed.
    fn prepare_body<'b>(&self, body: &'b str) -> Cow<'b, str> {
        Cow::Borrowed(body)
    }

    /// Pull the fields out of a fetched page.
    fn extract(&self, record: &InputRecord, page: &Page) -> Result<RowOutput, RowError>;

    /// Status rows to write when the page could not be fetched.
    fn on_fetch_failure(&self, _record: &InputRecord, _url: &str) -> Vec<StatusRow> {
        Vec::new()
    }
}

pub(crate) fn columns(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}
