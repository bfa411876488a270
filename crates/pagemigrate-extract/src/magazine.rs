use crate::dom::{self, selector};
use crate::normalize::{self, AUTHOR_PREFIXES, ILLUSTRATION_CREDIT_PREFIXES, PHOTO_CREDIT_PREFIXES};
use crate::paths;
use crate::{columns, Page, RowOutput, Variant};
use chrono::NaiveDateTime;
use pagemigrate_model::{ExtractedRecord, InputRecord, RowError, Settings};
use scraper::{ElementRef, Selector};
use std::borrow::Cow;

pub const ARTICLE_SELECTOR: &str = "article[data-element='Magazine Article']";

/// Format of the `datetime` attribute on an issue's `time` element.
const ISSUE_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Magazine article pages → article content fragments.
pub struct Magazine {
    settings: Settings,
    article: Selector,
}

impl Magazine {
    pub const KEY_COLUMN: &'static str = "urls";

    pub fn default_settings() -> Settings {
        Settings::for_model(
            "/conf/au/settings/dam/cfm/models/magazine-article-model",
            "/content/dam/au/cf/magazine-articles/migrated",
        )
    }

    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            article: selector(ARTICLE_SELECTOR),
        }
    }
}

/// Fields read from `header.article-header`.
#[derive(Debug, Default, PartialEq)]
struct ArticleHeader {
    topic: String,
    topic_link: String,
    publication_date: String,
    title: String,
    teaser: String,
}

impl ArticleHeader {
    fn read(header: ElementRef) -> Self {
        let channel = dom::first(header, &selector("span.channel"));
        Self {
            topic: normalize::normalize_text(&dom::text_or_empty(channel)),
            topic_link: dom::attr_or_empty(channel.and_then(|c| dom::first(c, &selector("a"))), "href"),
            publication_date: issue_date(&dom::attr_or_empty(
                dom::first(header, &selector("time.issue")),
                "datetime",
            )),
            title: normalize::normalize_text(&dom::text_or_empty(dom::first(header, &selector("h1")))),
            teaser: normalize::normalize_text(&dom::text_or_empty(dom::first(
                header,
                &selector("p.teaser"),
            ))),
        }
    }
}

/// `2024-03-01 00:00:00` → `2024-03-01`. Anything else is kept as written.
pub fn issue_date(raw: &str) -> String {
    match NaiveDateTime::parse_from_str(raw, ISSUE_DATE_FORMAT) {
        Ok(parsed) => parsed.format("%Y-%m-%d").to_string(),
        Err(_) => raw.to_string(),
    }
}

impl Variant for Magazine {
    fn name(&self) -> &'static str {
        "magazine"
    }

    fn output_columns(&self) -> Vec<String> {
        columns(&[
            "path",
            "name",
            "title",
            "template",
            "topic",
            "topicLink",
            "news_title",
            "teaser",
            "showTeaser",
            "author",
            "illustrationBy",
            "photographyBy",
            "publicationDate",
            "description",
            "newsImage",
            "useImage",
            "altAsCaption",
        ])
    }

    fn prepare_body<'b>(&self, body: &'b str) -> Cow<'b, str> {
        Cow::Owned(normalize::clean_legacy_html(body, &self.settings))
    }

    fn extract(&self, _record: &InputRecord, page: &Page) -> Result<RowOutput, RowError> {
        let article = dom::match_exactly_one(&page.document, &self.article, ARTICLE_SELECTOR)?;

        let header_element = dom::first(article, &selector("header.article-header"));
        let header = header_element.map(ArticleHeader::read).unwrap_or_default();

        let og_description = page
            .document
            .select(&selector(r#"meta[property="og:description"]"#))
            .next()
            .and_then(|meta| meta.value().attr("content"))
            .unwrap_or_default();

        // Credits are only trusted on articles with a proper header.
        let credit = |css: &str, prefixes: &[&str]| {
            header_element
                .and_then(|_| dom::first(article, &selector(css)))
                .map(|p| normalize::clean_credit(&dom::text(p), prefixes))
                .unwrap_or_default()
        };

        let image = dom::first(article, &selector("section.section-1 > figure > img"))
            .filter(|img| img.value().attr("src").is_some());
        let description = dom::first(article, &selector("section.section-1"))
            .map(|section| dom::inner_html_without_children(section, "figure"))
            .unwrap_or_default();

        let show_teaser = !header.teaser.is_empty();
        let teaser = if show_teaser {
            header.teaser
        } else {
            og_description.to_string()
        };

        let fragment = ExtractedRecord::fragment(
            &paths::fragment_page_path(&self.settings.cf_base_path, page.url),
            "articleCF",
            "articleCF",
            &self.settings.template_path,
        )
        .with("topic", header.topic)
        .with("topicLink", header.topic_link)
        .with("news_title", header.title)
        .with("teaser", teaser)
        .with("showTeaser", show_teaser.to_string())
        .with("author", credit("p.credit.author", AUTHOR_PREFIXES))
        .with("illustrationBy", credit("p.credit.illustration", ILLUSTRATION_CREDIT_PREFIXES))
        .with("photographyBy", credit("p.credit.photo", PHOTO_CREDIT_PREFIXES))
        .with("publicationDate", header.publication_date)
        .with("description", description)
        .with("newsImage", dom::attr_or_empty(image, "src"))
        .with("useImage", "true")
        .with("altAsCaption", dom::attr_or_empty(image, "alt"));

        Ok(RowOutput::record(fragment))
    }
}
