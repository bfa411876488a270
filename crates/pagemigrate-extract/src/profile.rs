use crate::dom::{self, selector};
use crate::paths;
use crate::resolve::ProfileUrlResolver;
use crate::{columns, Page, RowOutput, Target, Variant};
use pagemigrate_model::{ExtractedRecord, InputRecord, RowError, Settings};
use scraper::{ElementRef, Selector};

pub const PROFILE_SELECTOR: &str = "div.CS_Element_Custom > div.profile-full";
const CONTENT_SELECTOR: &str = "section.profile-content";
const DEFAULT_PHOTO_SUFFIX: &str = "/uploads/defaults/original/au_profile.jpg";

/// Faculty/staff profile pages → profile content fragments.
///
/// The profile URL and a few fields (force display, resume, CV, photo) come
/// from the profile report; the bio sections come from the page itself.
pub struct Profile {
    settings: Settings,
    resolver: ProfileUrlResolver,
    root: Selector,
}

impl Profile {
    pub const KEY_COLUMN: &'static str = "Eaglenet ID";

    pub fn default_settings() -> Settings {
        Settings::for_model(
            "/conf/au/settings/dam/cfm/models/profiles",
            "/content/dam/au/cf/profiles-migrated",
        )
    }

    pub fn new(settings: Settings, resolver: ProfileUrlResolver) -> Self {
        Self {
            settings,
            resolver,
            root: selector(PROFILE_SELECTOR),
        }
    }

    fn report_fields(&self, record: &InputRecord) -> ReportFields {
        let row = self.resolver.profile_row(record);
        let field = |name: &str| row.and_then(|r| r.field(name)).unwrap_or_default().to_string();

        let asset_base = &self.settings.asset_base_path;
        let resume_path = |file: String| {
            format!("{asset_base}/migrated-profile-resumes/{}", file.trim_start_matches('/'))
        };

        // A CV replaces the resume when both are present.
        let resume = match (field("Resume"), field("CV")) {
            (_, cv) if !cv.is_empty() => resume_path(cv),
            (resume, _) if !resume.is_empty() => resume_path(resume),
            _ => String::new(),
        };

        let image = field("Profile Image");
        let photo = if image.is_empty() {
            String::new()
        } else if image.to_lowercase().ends_with(DEFAULT_PHOTO_SUFFIX) {
            format!("{asset_base}/global/images/au_profile.jpg")
        } else {
            format!("{asset_base}/migrated-profile-images/{}", image.trim_start_matches('/'))
        };

        ReportFields {
            force_display: field("Force Profile"),
            resume,
            photo,
        }
    }
}

struct ReportFields {
    force_display: String,
    resume: String,
    photo: String,
}

impl Variant for Profile {
    fn name(&self) -> &'static str {
        "profile"
    }

    fn output_columns(&self) -> Vec<String> {
        columns(&[
            "path",
            "name",
            "title",
            "template",
            "forceDisplay",
            "bio",
            "degrees",
            "additionalPositions",
            "partnerships",
            "scholarly",
            "officeHours",
            "altPhone",
            "altPhoneType",
            "contactLinks",
            "resume",
            "photo",
        ])
    }

    fn resolve(&self, record: &InputRecord) -> Result<Target, RowError> {
        self.resolver.resolve(record).map(Target::Fetch)
    }

    fn extract(&self, record: &InputRecord, page: &Page) -> Result<RowOutput, RowError> {
        let profile = dom::match_exactly_one(&page.document, &self.root, PROFILE_SELECTOR)?;
        if dom::first(profile, &selector(CONTENT_SELECTOR)).is_none() {
            return Err(RowError::mismatch(CONTENT_SELECTOR, 0));
        }

        let bio = dom::inner_or_empty(dom::first(profile, &selector("dd.bio-text")));

        let (degrees, additional_positions) =
            match dom::first(profile, &selector("dl.profile-info-bio")) {
                Some(list) => (
                    dom::grouped_list(list, "degrees"),
                    dom::grouped_list(list, "additional positions at au"),
                ),
                None => (String::new(), String::new()),
            };

        let partnerships = dom::inner_or_empty(dom::first(
            profile,
            &selector("section#profile-partnerships > div > ul"),
        ));

        let scholarly = dom::first(profile, &selector("section#profile-activities > div"))
            .map(|div| dom::inner_html_without(div, &selector("header")))
            .unwrap_or_default();

        let contact = dom::first(profile, &selector("dl#profile-contact-info"));
        let office_hours = contact
            .and_then(|c| c.select(&selector("dd")).last())
            .map(|dd| dd.inner_html())
            .unwrap_or_default();
        let (alt_phone, alt_phone_type) = contact.map(alternate_phone).unwrap_or_default();

        let contact_links = contact_links(profile);
        let report = self.report_fields(record);

        let fragment = ExtractedRecord::fragment(
            &paths::profile_path(&self.settings.cf_base_path, &record.key),
            "profileCF",
            "profileCF",
            &self.settings.template_path,
        )
        .with("forceDisplay", report.force_display)
        .with("bio", bio)
        .with("degrees", degrees)
        .with("additionalPositions", additional_positions)
        .with("partnerships", partnerships)
        .with("scholarly", scholarly)
        .with("officeHours", office_hours)
        .with("altPhone", alt_phone)
        .with("altPhoneType", alt_phone_type)
        .with("contactLinks", contact_links)
        .with("resume", report.resume)
        .with("photo", report.photo);

        Ok(RowOutput::record(fragment))
    }
}

/// A fax number listed as a phone: the number is the link text, the type is
/// whatever label text surrounds it in the same `dd`.
fn alternate_phone(contact: ElementRef) -> (String, String) {
    let Some(link) = dom::first(contact, &selector("dd.profile-phone > a")) else {
        return Default::default();
    };
    if link.value().attr("itemprop") != Some("faxNumber") {
        return Default::default();
    }
    let number = dom::text(link);
    let kind = link
        .parent()
        .and_then(ElementRef::wrap)
        .map(|dd| dom::text_without(dd, link))
        .unwrap_or_default();
    (number, kind)
}

/// "See also" links, except those listed under "For the Media".
fn contact_links(profile: ElementRef) -> String {
    profile
        .select(&selector("div.profile-see-also > dl > dd"))
        .filter(|dd| {
            dom::preceding_label(*dd)
                .map(dom::normalized_label)
                .as_deref()
                != Some("for the media")
        })
        .map(|dd| format!("{}<br>", dd.inner_html()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagemigrate_acquire::{KeyCase, LookupTable, Table};

    const PROFILE_PAGE: &str = r#"
    <html><head><title>Jane Doe | American University</title></head><body>
    <div class="CS_Element_Custom">
      <div class="profile-full">
        <section class="profile-content">
          <dl class="profile-info-bio">
            <dt>Bio</dt><dd class="bio-text"><p>Jane studies <em>rivers</em>.</p></dd>
            <dt>Degrees</dt><dd>PhD, Hydrology</dd><dd>BA, Geography</dd>
            <dt>Additional Positions at AU</dt><dd>Director, Water Lab</dd>
          </dl>
        </section>
        <section id="profile-partnerships"><div><ul><li>NOAA</li></ul></div></section>
        <section id="profile-activities"><div><header><h2>Scholarly</h2></header><p>River Dynamics (2021)</p></div></section>
        <dl id="profile-contact-info">
          <dt>Phone</dt><dd class="profile-phone">Fax <a itemprop="faxNumber" href="tel:2025550100">202-555-0100</a></dd>
          <dt>Office Hours</dt><dd>Mon 2-4pm</dd>
        </dl>
        <div class="profile-see-also">
          <dl>
            <dt>For the Media</dt><dd><a href="/media">Press contact</a></dd>
            <dt>Web</dt><dd><a href="https://lab.example.edu">Water Lab</a></dd>
          </dl>
        </div>
      </div>
    </div>
    </body></html>
    "#;

    fn report() -> LookupTable {
        let table = Table::new(
            "report",
            ["Eaglenet ID", "Default Profile Page", "Force Profile", "Resume", "CV", "Profile Image"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            vec![
                ["jdoe", "/profiles/jdoe.cfm", "Yes", "/files/jdoe-resume.pdf", "/files/jdoe-cv.pdf", "/uploads/jdoe.jpg"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
                ["x", "/profiles/x.cfm", "", "resume.pdf", "", "https://www.american.edu/uploads/defaults/original/au_profile.jpg"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ],
        );
        LookupTable::from_table(&table, "Eaglenet ID", KeyCase::Preserve).unwrap()
    }

    fn variant() -> Profile {
        let settings = Profile::default_settings();
        let resolver = ProfileUrlResolver::new(Some(report()), None, settings.clone()).unwrap();
        Profile::new(settings, resolver)
    }

    #[test]
    fn test_resolve_uses_report() {
        let target = variant().resolve(&InputRecord::new("jdoe")).unwrap();
        assert!(matches!(target, Target::Fetch(url) if url == "https://www.american.edu/profiles/jdoe.cfm"));
    }

    #[test]
    fn test_extract_profile() {
        let variant = variant();
        let page = Page::parse("https://www.american.edu/profiles/jdoe.cfm", PROFILE_PAGE);
        let out = variant.extract(&InputRecord::new("jdoe"), &page).unwrap();
        let record = out.record.unwrap();

        assert_eq!(record.get("path"), Some("/content/dam/au/cf/profiles-migrated/jd/jdoe"));
        assert_eq!(record.get("name"), Some("profileCF"));
        assert_eq!(record.get("template"), Some("/conf/au/settings/dam/cfm/models/profiles"));
        assert_eq!(record.get("forceDisplay"), Some("Yes"));
        assert_eq!(record.get("bio"), Some("<p>Jane studies <em>rivers</em>.</p>"));
        assert_eq!(record.get("degrees"), Some("PhD, Hydrology<br>BA, Geography"));
        assert_eq!(record.get("additionalPositions"), Some("Director, Water Lab"));
        assert_eq!(record.get("partnerships"), Some("<li>NOAA</li>"));
        assert_eq!(record.get("scholarly"), Some("<p>River Dynamics (2021)</p>"));
        assert_eq!(record.get("officeHours"), Some("Mon 2-4pm"));
        assert_eq!(record.get("altPhone"), Some("202-555-0100"));
        assert_eq!(record.get("altPhoneType"), Some("Fax"));
        assert_eq!(
            record.get("contactLinks"),
            Some("<a href=\"https://lab.example.edu\">Water Lab</a><br>")
        );
        assert_eq!(
            record.get("resume"),
            Some("/content/dam/au/assets/migrated-profile-resumes/files/jdoe-cv.pdf")
        );
        assert_eq!(
            record.get("photo"),
            Some("/content/dam/au/assets/migrated-profile-images/uploads/jdoe.jpg")
        );
    }

    #[test]
    fn test_missing_sections_default_to_empty() {
        let html = r#"<div class="CS_Element_Custom"><div class="profile-full">
            <section class="profile-content"></section></div></div>"#;
        let page = Page::parse("https://www.american.edu/profiles/x.cfm", html);
        let record = variant()
            .extract(&InputRecord::new("x"), &page)
            .unwrap()
            .record
            .unwrap();

        assert_eq!(record.get("path"), Some("/content/dam/au/cf/profiles-migrated/x"));
        for field in ["bio", "degrees", "scholarly", "officeHours", "altPhone", "contactLinks"] {
            assert_eq!(record.get(field), Some(""), "{field}");
        }
        assert_eq!(
            record.get("resume"),
            Some("/content/dam/au/assets/migrated-profile-resumes/resume.pdf")
        );
        assert_eq!(
            record.get("photo"),
            Some("/content/dam/au/assets/global/images/au_profile.jpg")
        );
    }

    #[test]
    fn test_phone_without_fax_is_ignored() {
        let html = r#"<div class="CS_Element_Custom"><div class="profile-full">
            <section class="profile-content"></section>
            <dl id="profile-contact-info"><dd class="profile-phone"><a itemprop="telephone">202-555-0199</a></dd></dl>
            </div></div>"#;
        let page = Page::parse("https://www.american.edu/profiles/jdoe.cfm", html);
        let record = variant()
            .extract(&InputRecord::new("jdoe"), &page)
            .unwrap()
            .record
            .unwrap();
        assert_eq!(record.get("altPhone"), Some(""));
        assert_eq!(record.get("altPhoneType"), Some(""));
        assert_eq!(record.get("officeHours"), Some("<a itemprop=\"telephone\">202-555-0199</a>"));
    }

    #[test]
    fn test_structural_mismatches() {
        let variant = variant();
        let record = InputRecord::new("jdoe");

        let none = Page::parse("https://www.american.edu/p", "<div class='profile-full'></div>");
        assert!(matches!(
            variant.extract(&record, &none),
            Err(RowError::Mismatch { found: 0, .. })
        ));

        let two = Page::parse(
            "https://www.american.edu/p",
            r#"<div class="CS_Element_Custom"><div class="profile-full"></div></div>
               <div class="CS_Element_Custom"><div class="profile-full"></div></div>"#,
        );
        assert!(matches!(
            variant.extract(&record, &two),
            Err(RowError::Mismatch { found: 2, .. })
        ));

        let no_content = Page::parse(
            "https://www.american.edu/p",
            r#"<div class="CS_Element_Custom"><div class="profile-full"></div></div>"#,
        );
        let err = variant.extract(&record, &no_content).unwrap_err();
        assert_eq!(err.to_string(), "expected 1 'section.profile-content' element, found 0");
    }
}
