// Optional-access helpers over parsed documents.
//
// Every lookup returns an `Option<ElementRef>`; every read of a field from a
// lookup has an explicit empty default. Nothing in here fails a record.

use ego_tree::NodeId;
use pagemigrate_model::{ConfigurationError, RowError};
use scraper::{ElementRef, Html, Selector};

/// Parse a selector written into the source.
pub fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("valid selector")
}

/// Parse a selector that came from configuration.
pub fn parse_selector(css: &str) -> Result<Selector, ConfigurationError> {
    Selector::parse(css).map_err(|e| ConfigurationError::InvalidSelector {
        selector: css.to_string(),
        reason: e.to_string(),
    })
}

/// The single element matching `selector`; zero or several is a mismatch.
pub fn match_exactly_one<'a>(
    document: &'a Html,
    selector: &Selector,
    css: &str,
) -> Result<ElementRef<'a>, RowError> {
    let mut matches = document.select(selector);
    match (matches.next(), matches.next()) {
        (Some(only), None) => Ok(only),
        (None, _) => Err(RowError::mismatch(css, 0)),
        (Some(_), Some(_)) => Err(RowError::mismatch(css, 2 + matches.count())),
    }
}

pub fn first<'a>(root: ElementRef<'a>, selector: &Selector) -> Option<ElementRef<'a>> {
    root.select(selector).next()
}

/// All text under the element, trimmed.
pub fn text(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

pub fn text_or_empty(element: Option<ElementRef>) -> String {
    element.map(text).unwrap_or_default()
}

/// Every text node trimmed, then concatenated. Collapses the indentation
/// between inline elements (`<a>\n  Home\n</a>` → `Home`).
pub fn stripped_text(element: ElementRef) -> String {
    element.text().map(str::trim).collect()
}

pub fn inner_or_empty(element: Option<ElementRef>) -> String {
    element.map(|e| e.inner_html()).unwrap_or_default()
}

pub fn attr_or_empty(element: Option<ElementRef>, name: &str) -> String {
    element
        .and_then(|e| e.value().attr(name))
        .unwrap_or_default()
        .to_string()
}

/// Trimmed, lower-cased text, used to compare labels.
pub fn normalized_label(element: ElementRef) -> String {
    text(element).to_lowercase()
}

/// Document `<title>`, if present and non-blank.
pub fn page_title(document: &Html) -> Option<String> {
    document
        .select(&selector("title"))
        .next()
        .map(stripped_text)
        .filter(|t| !t.is_empty())
}

/// Grouped-list extraction over a definition list.
///
/// Finds the `dt` whose normalized text equals `label` and joins the inner
/// HTML of the `dd` siblings that follow it, up to the next non-`dd`
/// element, with `<br>`. When a label repeats, the last group wins.
pub fn grouped_list(list: ElementRef, label: &str) -> String {
    let wanted = label.trim().to_lowercase();
    let mut joined = String::new();

    for dt in list.select(&selector("dt")) {
        if normalized_label(dt) != wanted {
            continue;
        }
        let parts: Vec<String> = dt
            .next_siblings()
            .filter_map(ElementRef::wrap)
            .take_while(|e| e.value().name() == "dd")
            .map(|e| e.inner_html())
            .collect();
        joined = parts.join("<br>");
    }

    joined
}

/// The closest preceding `dt` sibling of a `dd`.
pub fn preceding_label(dd: ElementRef) -> Option<ElementRef> {
    dd.prev_siblings()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() == "dt")
}

/// Inner HTML of `element` with every descendant matching `remove` dropped.
pub fn inner_html_without(element: ElementRef, remove: &Selector) -> String {
    rewrite_inner_html(element, |root| {
        root.select(remove)
            .filter(|e| e.id() != root.id())
            .map(|e| e.id())
            .collect()
    })
}

/// Inner HTML of `element` with its direct `tag` children dropped.
pub fn inner_html_without_children(element: ElementRef, tag: &str) -> String {
    rewrite_inner_html(element, |root| {
        root.children()
            .filter_map(ElementRef::wrap)
            .filter(|e| e.value().name() == tag)
            .map(|e| e.id())
            .collect()
    })
}

/// Text of `element` excluding everything under `excluded`, trimmed.
pub fn text_without(element: ElementRef, excluded: ElementRef) -> String {
    let excluded_id = excluded.id();
    element
        .descendants()
        .filter(|node| node.id() != excluded_id && !node.ancestors().any(|a| a.id() == excluded_id))
        .filter_map(|node| node.value().as_text().map(|t| &**t))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Class names used by the element and its descendants.
pub fn class_names(element: ElementRef) -> std::collections::BTreeSet<String> {
    element
        .descendants()
        .filter_map(ElementRef::wrap)
        .flat_map(|e| e.value().classes().map(|c| c.to_string()).collect::<Vec<_>>())
        .collect()
}

/// Re-parse the element on its own, detach the nodes `pick` selects, and
/// serialize what is left.
fn rewrite_inner_html<F>(element: ElementRef, pick: F) -> String
where
    F: Fn(ElementRef) -> Vec<NodeId>,
{
    let mut fragment = Html::parse_fragment(&element.html());

    let (root_id, doomed) = {
        let Some(root) = fragment.root_element().children().find_map(ElementRef::wrap) else {
            return element.inner_html();
        };
        (root.id(), pick(root))
    };

    for id in doomed {
        if let Some(mut node) = fragment.tree.get_mut(id) {
            node.detach();
        }
    }

    fragment
        .tree
        .get(root_id)
        .and_then(ElementRef::wrap)
        .map(|root| root.inner_html())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(html: &str) -> Html {
        Html::parse_document(html)
    }

    fn one<'a>(document: &'a Html, css: &str) -> ElementRef<'a> {
        document.select(&selector(css)).next().unwrap()
    }

    #[test]
    fn test_match_exactly_one() {
        let document = doc("<div class='a'></div><div class='b'></div><div class='b'></div><div class='b'></div>");
        assert!(match_exactly_one(&document, &selector("div.a"), "div.a").is_ok());

        let err = match_exactly_one(&document, &selector("div.c"), "div.c").unwrap_err();
        assert!(matches!(err, RowError::Mismatch { found: 0, .. }));

        let err = match_exactly_one(&document, &selector("div.b"), "div.b").unwrap_err();
        assert!(matches!(err, RowError::Mismatch { found: 3, .. }));
    }

    #[test]
    fn test_optional_reads_default_to_empty() {
        let document = doc("<div id='root'><a href='/x'>Link</a></div>");
        let root = one(&document, "#root");
        let missing = first(root, &selector("span"));
        assert_eq!(text_or_empty(missing), "");
        assert_eq!(inner_or_empty(missing), "");
        assert_eq!(attr_or_empty(missing, "href"), "");

        let link = first(root, &selector("a"));
        assert_eq!(attr_or_empty(link, "href"), "/x");
        assert_eq!(attr_or_empty(link, "title"), "");
        assert_eq!(text_or_empty(link), "Link");
    }

    #[test]
    fn test_grouped_list_stops_at_next_label() {
        let document = doc(
            "<dl id='bio'>\
               <dt>Degrees</dt><dd>BA</dd><dd>MA</dd>\
               <dt>Other</dt><dd>X</dd>\
             </dl>",
        );
        let list = one(&document, "#bio");
        assert_eq!(grouped_list(list, "Degrees"), "BA<br>MA");
        assert_eq!(grouped_list(list, "other"), "X");
        assert_eq!(grouped_list(list, "Missing"), "");
    }

    #[test]
    fn test_grouped_list_normalizes_label_and_keeps_markup() {
        let document = doc(
            "<dl id='bio'>\
               <dt>  Additional Positions at AU </dt>\
               <dd><a href='/dean'>Dean</a></dd>\
               <dd>Chair</dd>\
             </dl>",
        );
        let list = one(&document, "#bio");
        assert_eq!(
            grouped_list(list, "additional positions at au"),
            "<a href=\"/dean\">Dean</a><br>Chair"
        );
    }

    #[test]
    fn test_inner_html_without_removes_descendants() {
        let document = doc(
            "<section id='s'><div id='d'><header><h2>Scholarly</h2></header><p>Paper</p></div></section>",
        );
        let div = one(&document, "#d");
        assert_eq!(inner_html_without(div, &selector("header")), "<p>Paper</p>");
        // The source document is untouched.
        assert!(div.inner_html().contains("<header>"));
    }

    #[test]
    fn test_inner_html_without_children_only_direct() {
        let document = doc(
            "<section id='s'><figure>top</figure><p>Body</p><div><figure>nested</figure></div></section>",
        );
        let section = one(&document, "#s");
        assert_eq!(
            inner_html_without_children(section, "figure"),
            "<p>Body</p><div><figure>nested</figure></div>"
        );
    }

    #[test]
    fn test_text_without() {
        let document = doc(
            "<dl><dd class='profile-phone'>Fax: <a itemprop='faxNumber'>202-555-0100</a></dd></dl>",
        );
        let dd = one(&document, "dd.profile-phone");
        let link = one(&document, "dd.profile-phone > a");
        assert_eq!(text_without(dd, link), "Fax:");
    }

    #[test]
    fn test_stripped_text_and_title() {
        let document = doc("<html><head><title>\n  About AU \n</title></head><body><a>\n Home\n</a></body></html>");
        assert_eq!(page_title(&document).as_deref(), Some("About AU"));
        assert_eq!(stripped_text(one(&document, "a")), "Home");

        let untitled = doc("<html><head></head><body></body></html>");
        assert_eq!(page_title(&untitled), None);
    }

    #[test]
    fn test_preceding_label() {
        let document = doc("<dl><dt>For the Media</dt><dd id='m'>Press</dd><dt>Web</dt><dd id='w'>Site</dd></dl>");
        assert_eq!(text_or_empty(preceding_label(one(&document, "#m"))), "For the Media");
        assert_eq!(text_or_empty(preceding_label(one(&document, "#w"))), "Web");
    }

    #[test]
    fn test_class_names() {
        let document = doc("<section id='s' class='text-block wide'><p class='lead'>x</p><span class='lead note'></span></section>");
        let classes = class_names(one(&document, "#s"));
        let classes: Vec<&str> = classes.iter().map(String::as_str).collect();
        assert_eq!(classes, vec!["lead", "note", "text-block", "wide"]);
    }

    #[test]
    fn test_parse_selector_error() {
        assert!(parse_selector("div[").is_err());
        assert!(parse_selector("article[data-element='Magazine Article']").is_ok());
    }
}
