use crate::dom::{self, selector};
use crate::paths;
use crate::{columns, Page, RowOutput, Variant};
use pagemigrate_model::{ExtractedRecord, InputRecord, RowError, Settings};
use scraper::{ElementRef, Selector};
use serde::Serialize;

pub const NAV_SELECTOR: &str = "nav#left-navigation";

/// One top-level menu entry of the side navigation fragment.
#[derive(Debug, Serialize)]
pub struct NavItem {
    #[serde(rename = "sideNavTitleCMF")]
    pub title: String,
    #[serde(rename = "sideNavLinkCMF")]
    pub link: String,
    #[serde(rename = "nested_sideNavLinks2CMF")]
    pub nested: Vec<NestedLink>,
}

#[derive(Debug, Serialize)]
pub struct NestedLink {
    #[serde(rename = "nested_sideNavTitle")]
    pub title: String,
    #[serde(rename = "nested_sideNavLink")]
    pub link: String,
}

/// Left navigation menus → side navigation fragments, one JSON object per
/// top-level entry.
pub struct SideNav {
    settings: Settings,
    nav: Selector,
    items: Selector,
    link: Selector,
}

impl SideNav {
    pub const KEY_COLUMN: &'static str = "URL";

    pub fn default_settings() -> Settings {
        Settings::for_model(
            "/conf/au/settings/dam/cfm/models/side-nav-cf-model",
            "/content/dam/au/cf",
        )
    }

    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            nav: selector(NAV_SELECTOR),
            items: selector("ul#nav-accordion-holder > li"),
            link: selector("a"),
        }
    }

    fn href(&self, anchor: ElementRef) -> String {
        let href = anchor.value().attr("href").unwrap_or("#");
        paths::page_link(href, &self.settings.page_base_path)
    }

    fn nav_item(&self, li: ElementRef) -> Option<NavItem> {
        let anchor = dom::first(li, &self.link)?;
        let nested_list = li
            .children()
            .filter_map(ElementRef::wrap)
            .find(|e| e.value().name() == "ul");

        let nested = nested_list
            .map(|ul| {
                ul.children()
                    .filter_map(ElementRef::wrap)
                    .filter(|e| e.value().name() == "li")
                    .filter_map(|child| dom::first(child, &self.link))
                    .map(|a| NestedLink {
                        title: dom::stripped_text(a),
                        link: self.href(a),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(NavItem {
            title: dom::stripped_text(anchor),
            link: if nested_list.is_some() {
                "#".to_string()
            } else {
                self.href(anchor)
            },
            nested,
        })
    }

    /// Serialize the menu, one compact JSON object per line.
    pub fn menu_json(&self, nav: ElementRef) -> Result<String, serde_json::Error> {
        let lines = nav
            .select(&self.items)
            .filter_map(|li| self.nav_item(li))
            .map(|item| serde_json::to_string(&item))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines.join("\n"))
    }
}

impl Variant for SideNav {
    fn name(&self) -> &'static str {
        "side-nav"
    }

    fn output_columns(&self) -> Vec<String> {
        columns(&["path", "name", "title", "template", "sideNavLinksCMF"])
    }

    fn extract(&self, _record: &InputRecord, page: &Page) -> Result<RowOutput, RowError> {
        let nav = dom::match_exactly_one(&page.document, &self.nav, NAV_SELECTOR)?;
        let menu = self
            .menu_json(nav)
            .map_err(|e| RowError::unresolved(page.url, format!("cannot serialize menu: {e}")))?;

        let name = paths::page_name(page.url);
        let title = dom::page_title(&page.document).unwrap_or_else(|| name.clone());
        tracing::debug!(url = %page.url, entries = menu.lines().count(), "Side navigation");

        Ok(RowOutput::record(
            ExtractedRecord::fragment(
                &paths::fragment_dir_path(&self.settings.cf_base_path, page.url),
                &name,
                &title,
                &self.settings.template_path,
            )
            .with("sideNavLinksCMF", menu),
        ))
    }
}
