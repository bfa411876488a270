use crate::error::ConfigurationError;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use url::Url;

/// Run-wide settings shared by every variant.
///
/// Each variant starts from its own defaults (template and content fragment
/// base path differ per fragment model); a JSON settings file may override
/// any subset of keys. The value is validated once, before the first row is
/// read, and then passed by reference into the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Value of the `x-user-agent` header sent with every request.
    pub importer_id: String,
    /// Per-request timeout, in seconds.
    pub timeout_secs: u64,
    /// Content fragment model the output rows are created from.
    pub template_path: String,
    /// Repository folder the content fragments are created under.
    pub cf_base_path: String,
    /// Prefix for root-relative page links (e.g. `/content/au`).
    pub page_base_path: String,
    /// Prefix for root-relative asset references (e.g. `/content/dam/au/assets`).
    pub asset_base_path: String,
    /// Origin of the legacy site; root-relative profile pages are joined to it.
    pub site_base_url: String,
    /// Role labels stripped from `All Profile Pages` segments (`faculty:/fac/x1`).
    pub role_prefixes: Vec<String>,
    /// When set, page styles used by the extracted markup are re-scoped under
    /// this wrapper class.
    pub scope_class: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            importer_id: "AU-AEM-Importer".to_string(),
            timeout_secs: 10,
            template_path: "/conf/au/settings/dam/cfm/models/side-nav-cf-model".to_string(),
            cf_base_path: "/content/dam/au/cf".to_string(),
            page_base_path: "/content/au".to_string(),
            asset_base_path: "/content/dam/au/assets".to_string(),
            site_base_url: "https://www.american.edu".to_string(),
            role_prefixes: ["faculty", "staff", "adjunct", "emeritus", "administrator", "student"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            scope_class: None,
        }
    }
}

impl Settings {
    /// Defaults with a specific fragment model and repository folder.
    pub fn for_model(template_path: &str, cf_base_path: &str) -> Self {
        Self {
            template_path: template_path.to_string(),
            cf_base_path: cf_base_path.to_string(),
            ..Self::default()
        }
    }

    /// Overlay the keys present in a JSON object onto `self`.
    ///
    /// Keys absent from `json` keep their current value, so a settings file
    /// only needs to mention what differs from the variant defaults.
    pub fn merged_with_json(&self, json: &str) -> Result<Self, ConfigurationError> {
        let overrides: serde_json::Value = serde_json::from_str(json)
            .map_err(|e| ConfigurationError::invalid_setting("settings file", e.to_string()))?;
        let serde_json::Value::Object(overrides) = overrides else {
            return Err(ConfigurationError::invalid_setting(
                "settings file",
                "expected a JSON object",
            ));
        };

        let mut base = serde_json::to_value(self)
            .map_err(|e| ConfigurationError::invalid_setting("settings file", e.to_string()))?;
        if let serde_json::Value::Object(map) = &mut base {
            for (key, value) in overrides {
                if !map.contains_key(&key) {
                    return Err(ConfigurationError::invalid_setting(&key, "unknown setting"));
                }
                map.insert(key, value);
            }
        }

        serde_json::from_value(base)
            .map_err(|e| ConfigurationError::invalid_setting("settings file", e.to_string()))
    }

    /// Check every setting once, before the run starts.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.importer_id.trim().is_empty() {
            return Err(ConfigurationError::invalid_setting("importer_id", "must not be empty"));
        }
        if !self.importer_id.chars().all(|c| c.is_ascii_graphic() || c == ' ') {
            return Err(ConfigurationError::invalid_setting(
                "importer_id",
                "must be printable ASCII to be sent as a header value",
            ));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigurationError::invalid_setting("timeout_secs", "must be at least 1"));
        }

        for (name, value) in [
            ("template_path", &self.template_path),
            ("cf_base_path", &self.cf_base_path),
            ("page_base_path", &self.page_base_path),
            ("asset_base_path", &self.asset_base_path),
        ] {
            if !value.starts_with('/') || (value.len() > 1 && value.ends_with('/')) {
                return Err(ConfigurationError::invalid_setting(
                    name,
                    format!("'{value}' must start with '/' and have no trailing '/'"),
                ));
            }
        }

        let site = Url::parse(&self.site_base_url)
            .map_err(|e| ConfigurationError::invalid_setting("site_base_url", e.to_string()))?;
        if !matches!(site.scheme(), "http" | "https") {
            return Err(ConfigurationError::invalid_setting(
                "site_base_url",
                format!("unsupported scheme '{}'", site.scheme()),
            ));
        }

        if self.role_prefixes.iter().any(|p| p.trim().is_empty()) {
            return Err(ConfigurationError::invalid_setting(
                "role_prefixes",
                "entries must not be empty",
            ));
        }

        if let Some(scope) = &self.scope_class {
            let mut chars = scope.chars();
            let valid_start = chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '-');
            if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-') {
                return Err(ConfigurationError::invalid_setting(
                    "scope_class",
                    format!("'{scope}' is not a valid CSS class name"),
                ));
            }
        }

        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Resolve a possibly root-relative page reference against the site origin.
    pub fn absolute_url(&self, reference: &str) -> String {
        let reference = reference.trim();
        if !reference.starts_with('/') {
            return reference.to_string();
        }
        match Url::parse(&self.site_base_url).and_then(|base| base.join(reference)) {
            Ok(url) => url.to_string(),
            Err(_) => format!("{}{}", self.site_base_url.trim_end_matches('/'), reference),
        }
    }
}
