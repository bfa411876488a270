// Mapping from legacy page URLs to content fragment locations and links.

use url::Url;

/// Path component of a URL, or of a bare path with any query/fragment cut.
pub fn url_path(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    }
}

/// Directory part of the URL path (`/cas/news/story.cfm` → `/cas/news`).
pub fn url_dir(url: &str) -> String {
    let path = url_path(url);
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(idx) => path[..idx].to_string(),
    }
}

/// File stem of the last path segment (`/cas/news/story.cfm` → `story`).
///
/// A URL ending in `/` names its directory instead, and the site root is
/// `index`, so a fragment never gets an empty name.
pub fn page_name(url: &str) -> String {
    let path = url_path(url);
    let segment = path
        .rsplit('/')
        .find(|s| !s.is_empty())
        .unwrap_or("index");
    strip_extension(segment)
}

/// Remove the extension of the last path segment. A leading dot is not an
/// extension (`/.well-known` is kept).
pub fn strip_extension(path: &str) -> String {
    let start = path.rfind('/').map(|i| i + 1).unwrap_or(0);
    match path[start..].rfind('.') {
        Some(dot) if dot > 0 => path[..start + dot].to_string(),
        _ => path.to_string(),
    }
}

/// Fragment folder mirroring the page's directory: `<base><url dir>`.
pub fn fragment_dir_path(cf_base: &str, url: &str) -> String {
    match url_dir(url).as_str() {
        "/" => cf_base.to_string(),
        dir => format!("{cf_base}{dir}"),
    }
}

/// Fragment folder named after the page: `<base>/<page name>`.
pub fn fragment_page_path(cf_base: &str, url: &str) -> String {
    format!("{cf_base}/{}", page_name(url))
}

/// Profile fragments are sharded by the first two characters of the ID:
/// `<base>/jd/jdoe`. One-character IDs go directly under the base.
pub fn profile_path(cf_base: &str, id: &str) -> String {
    let id = id.trim();
    if id.chars().count() >= 2 {
        let shard: String = id.chars().take(2).collect();
        format!("{cf_base}/{shard}/{id}")
    } else {
        format!("{cf_base}/{id}")
    }
}

/// Rewrite a navigation link for the new site.
///
/// Empty and `#` links are kept. Root-relative links move under the page
/// base path. The extension of the last path segment is dropped; query and
/// fragment are kept.
pub fn page_link(href: &str, page_base: &str) -> String {
    let href = href.trim();
    if href.is_empty() || href == "#" {
        return href.to_string();
    }

    if let Ok(mut absolute) = Url::parse(href) {
        let stripped = strip_extension(absolute.path());
        absolute.set_path(&stripped);
        return absolute.to_string();
    }

    let split = href.find(['?', '#']).unwrap_or(href.len());
    let (path, suffix) = href.split_at(split);
    let path = if path.starts_with('/') {
        format!("{page_base}{path}")
    } else {
        path.to_string()
    };
    format!("{}{suffix}", strip_extension(&path))
}
