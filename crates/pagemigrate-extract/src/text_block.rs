use crate::css;
use crate::dom::{self, selector};
use crate::paths;
use crate::{columns, Page, RowOutput, Variant};
use pagemigrate_model::{ExtractedRecord, InputRecord, RowError, Settings, StatusMarker, StatusRow};
use scraper::{ElementRef, Selector};

pub const DEFAULT_ELEMENT: &str = "2016 Text Block";
const STRUCTURED_CONTENT: &str = "dl, dt, form, table";

/// Text-block sections → HTML fragments.
///
/// Every section whose `data-element` names the block gets a status row
/// saying whether it holds structured content (a definition list, form or
/// table). A page with exactly one such section becomes a fragment row.
pub struct TextBlock {
    settings: Settings,
    element: String,
    structured: Selector,
}

impl TextBlock {
    pub const KEY_COLUMN: &'static str = "URL";

    pub fn default_settings() -> Settings {
        Settings::for_model(
            "/conf/au/settings/dam/cfm/models/side-nav-cf-model",
            "/content/dam/au/cf/html",
        )
    }

    pub fn new(settings: Settings, element: &str) -> Self {
        Self {
            settings,
            element: element.trim().to_lowercase(),
            structured: selector(STRUCTURED_CONTENT),
        }
    }

    fn is_block(&self, section: &ElementRef) -> bool {
        section
            .value()
            .attr("data-element")
            .is_some_and(|e| e.trim().to_lowercase() == self.element)
    }

    /// Page styles used by the section, re-scoped under the wrapper class.
    fn scoped_css(&self, scope: &str, page: &Page, section: ElementRef) -> String {
        let sheet: String = page
            .document
            .select(&selector("style"))
            .map(|style| style.text().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n");
        css::rescope(&sheet, &dom::class_names(section), scope)
    }
}

impl Variant for TextBlock {
    fn name(&self) -> &'static str {
        "text-block"
    }

    fn output_columns(&self) -> Vec<String> {
        let mut names = columns(&["path", "name", "title", "template", "html"]);
        if self.settings.scope_class.is_some() {
            names.push("css".to_string());
        }
        names
    }

    fn status_columns(&self) -> Vec<String> {
        columns(&["URL", "Element ID", "Contains DL/DT/Form/Table"])
    }

    fn extract(&self, record: &InputRecord, page: &Page) -> Result<RowOutput, RowError> {
        let blocks: Vec<ElementRef> = page
            .document
            .select(&selector("section"))
            .filter(|s| self.is_block(s))
            .collect();
        if blocks.is_empty() {
            return Err(RowError::mismatch(
                &format!("section[data-element='{}']", self.element),
                0,
            ));
        }

        let mut statuses = Vec::with_capacity(blocks.len());
        let mut qualifying = Vec::new();
        for section in &blocks {
            let structured = section.select(&self.structured).next().is_some();
            let element_id = section.value().attr("id").unwrap_or_default().trim().to_lowercase();
            tracing::debug!(url = %record.key, id = %element_id, structured, "Text block");

            statuses.push(StatusRow::new([
                record.key.clone(),
                element_id,
                StatusMarker::from_bool(structured).as_str().to_string(),
            ]));
            if structured {
                qualifying.push(*section);
            }
        }

        let &[section] = qualifying.as_slice() else {
            return Ok(RowOutput {
                statuses,
                skipped: Some(RowError::mismatch(STRUCTURED_CONTENT, qualifying.len())),
                ..RowOutput::default()
            });
        };

        let name = paths::page_name(page.url);
        let title = dom::page_title(&page.document).unwrap_or_else(|| name.clone());
        let mut fragment = ExtractedRecord::fragment(
            &paths::fragment_dir_path(&self.settings.cf_base_path, page.url),
            &name,
            &title,
            &self.settings.template_path,
        )
        .with("html", section.html());
        if let Some(scope) = &self.settings.scope_class {
            fragment = fragment.with("css", self.scoped_css(scope, page, section));
        }

        Ok(RowOutput {
            record: Some(fragment),
            statuses,
            skipped: None,
        })
    }
}
