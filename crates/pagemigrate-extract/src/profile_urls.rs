use crate::resolve::ProfileUrlResolver;
use crate::{columns, Page, RowOutput, Target, Variant};
use pagemigrate_model::{ExtractedRecord, InputRecord, RowError};

/// Profile IDs → canonical profile URLs. Nothing is fetched.
pub struct ProfileUrls {
    resolver: ProfileUrlResolver,
}

impl ProfileUrls {
    pub const KEY_COLUMN: &'static str = "Eaglenet ID";

    pub fn new(resolver: ProfileUrlResolver) -> Self {
        Self { resolver }
    }
}

impl Variant for ProfileUrls {
    fn name(&self) -> &'static str {
        "profile-urls"
    }

    fn output_columns(&self) -> Vec<String> {
        columns(&["id", "url"])
    }

    fn resolve(&self, record: &InputRecord) -> Result<Target, RowError> {
        let url = self.resolver.resolve(record)?;
        Ok(Target::Resolved(
            ExtractedRecord::default()
                .with("id", record.key.as_str())
                .with("url", url),
        ))
    }

    fn extract(&self, record: &InputRecord, page: &Page) -> Result<RowOutput, RowError> {
        Ok(RowOutput::record(
            ExtractedRecord::default()
                .with("id", record.key.as_str())
                .with("url", page.url),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pagemigrate_acquire::{KeyCase, LookupTable, Table};
    use pagemigrate_model::Settings;

    fn variant() -> ProfileUrls {
        let table = Table::new(
            "report",
            vec!["Eaglenet ID".into(), "Default Profile Page".into()],
            vec![
                vec!["jdoe".into(), "/profiles/jdoe.cfm".into()],
                vec!["nopage".into(), "".into()],
            ],
        );
        let report = LookupTable::from_table(&table, "Eaglenet ID", KeyCase::Preserve).unwrap();
        ProfileUrls::new(ProfileUrlResolver::new(Some(report), None, Settings::default()).unwrap())
    }

    #[test]
    fn test_resolves_without_fetch() {
        let target = variant().resolve(&InputRecord::new("jdoe")).unwrap();
        let Target::Resolved(record) = target else {
            panic!("expected a resolved record");
        };
        assert_eq!(record.get("id"), Some("jdoe"));
        assert_eq!(record.get("url"), Some("https://www.american.edu/profiles/jdoe.cfm"));
    }

    #[test]
    fn test_unresolvable_id() {
        let err = variant().resolve(&InputRecord::new("nopage")).unwrap_err();
        assert!(matches!(err, RowError::Unresolved { ref key, .. } if key == "nopage"));
    }
}
