use crate::dom::selector;
use crate::{columns, Page, RowOutput, Variant};
use pagemigrate_acquire::LookupTable;
use pagemigrate_model::{ConfigurationError, InputRecord, RowError, StatusRow};
use scraper::{ElementRef, Selector};
use std::collections::BTreeSet;

pub const COMPONENT_COLUMN: &str = "Component";

/// Component inventory: for every page, which of the known components its
/// sections actually render.
///
/// The component sheet lists, per URL, the components a page is expected to
/// use. The union of those lists (sorted) becomes the status columns; each
/// page gets a row of 0/1 cells.
pub struct Components {
    sheet: LookupTable,
    components: Vec<String>,
    require_class: Option<String>,
    sections: Selector,
}

impl Components {
    pub const KEY_COLUMN: &'static str = "URL";

    /// Fails when the sheet has no `Component` column.
    pub fn new(
        sheet: LookupTable,
        require_class: Option<&str>,
    ) -> Result<Self, ConfigurationError> {
        sheet.require_column(COMPONENT_COLUMN)?;
        let components: BTreeSet<String> = sheet
            .iter()
            .flat_map(listed_components)
            .collect();
        tracing::debug!(sheet = %sheet.name(), components = components.len(), "Component sheet");

        Ok(Self {
            sheet,
            components: components.into_iter().collect(),
            require_class: require_class
                .map(|c| c.trim().to_lowercase())
                .filter(|c| !c.is_empty()),
            sections: selector("section"),
        })
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Whether a section renders `component` (already lower-cased).
    fn section_matches(&self, section: ElementRef, component: &str) -> bool {
        let data_element = section
            .value()
            .attr("data-element")
            .unwrap_or_default()
            .trim()
            .to_lowercase();
        let has_class = |name: &str| {
            section
                .value()
                .classes()
                .any(|c| c.trim().to_lowercase() == name)
        };

        match &self.require_class {
            Some(required) => data_element == component && has_class(required),
            None => data_element == component || has_class(component),
        }
    }

    fn row(&self, url: &str, found: &[bool]) -> StatusRow {
        let listed = self
            .sheet
            .get(url)
            .map(|row| listed_components(row).join(", "))
            .unwrap_or_default();

        let mut cells = vec![url.to_string(), listed];
        cells.extend(found.iter().map(|&hit| u8::from(hit).to_string()));
        StatusRow::new(cells)
    }
}

/// The comma list of a sheet row, trimmed, blanks dropped.
fn listed_components(row: &InputRecord) -> Vec<String> {
    row.field(COMPONENT_COLUMN)
        .map(|list| {
            list.split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

impl Variant for Components {
    fn name(&self) -> &'static str {
        "components"
    }

    fn output_columns(&self) -> Vec<String> {
        Vec::new()
    }

    fn status_columns(&self) -> Vec<String> {
        let mut names = columns(&["URL", COMPONENT_COLUMN]);
        names.extend(self.components.iter().cloned());
        names
    }

    fn extract(&self, record: &InputRecord, page: &Page) -> Result<RowOutput, RowError> {
        let sections: Vec<ElementRef> = page.document.select(&self.sections).collect();
        let found: Vec<bool> = self
            .components
            .iter()
            .map(|component| {
                let component = component.to_lowercase();
                sections.iter().any(|s| self.section_matches(*s, &component))
            })
            .collect();

        tracing::debug!(
            url = %record.key,
            sections = sections.len(),
            found = found.iter().filter(|&&hit| hit).count(),
            "Component scan"
        );
        Ok(RowOutput::statuses(vec![self.row(&record.key, &found)]))
    }

    fn on_fetch_failure(&self, record: &InputRecord, _url: &str) -> Vec<StatusRow> {
        vec![self.row(&record.key, &vec![false; self.components.len()])]
    }
}
