//! Identifier and link helpers for portal URLs.

use url::Url;

use crate::schema::PLACEHOLDER;

/// Base URL relative portal links are resolved against.
pub const PORTAL_BASE: &str = "https://vbpl.vn";

/// Accepted attachment extensions, lower number wins.
const DOWNLOAD_PRIORITY: &[(&str, u8)] = &[
    ("doc", 1),
    ("docx", 1),
    ("pdf", 2),
    ("zip", 3),
    ("rar", 4),
];

/// Resolve an href (absolute or portal-relative) to a full URL.
pub fn absolute_url(href: &str) -> Option<Url> {
    let href = href.trim();
    Url::parse(href)
        .or_else(|_| Url::parse(PORTAL_BASE).and_then(|base| base.join(href)))
        .ok()
}

/// Look up a query parameter by case-insensitive name.
///
/// Detail pages use `ItemID=`, `itemid=` or `docid=` interchangeably.
/// Returns the placeholder when the parameter is absent or empty.
pub fn query_identifier(href: &str, name: &str) -> String {
    absolute_url(href)
        .and_then(|url| {
            url.query_pairs()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.trim().to_string())
        })
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| PLACEHOLDER.to_string())
}

/// Region code of a local-government portal link (`/danang` → `danang`).
///
/// The central portal (`TW`) and links without a path are not regions.
pub fn region_code(href: &str) -> Option<String> {
    let url = absolute_url(href)?;
    let code = url.path().trim_matches('/');
    if code.is_empty() || code.eq_ignore_ascii_case("tw") {
        None
    } else {
        Some(code.to_string())
    }
}

/// Pull the file path out of a `downloadfile('name', 'path')` script link.
pub fn download_target(href: &str) -> Option<&str> {
    let (_, args) = href.split_once("downloadfile(")?;
    let path = args.split('\'').nth(3)?.trim();
    (!path.is_empty()).then_some(path)
}

/// Keep only the attachments of the best available format.
///
/// Word documents beat PDFs, which beat archives. Unknown extensions are
/// dropped. Returned URLs are absolute and keep their input order.
pub fn preferred_download_links<'a, I>(paths: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let ranked: Vec<(u8, Url)> = paths
        .into_iter()
        .filter_map(|path| {
            let ext = path.rsplit('.').next()?.to_ascii_lowercase();
            let priority = DOWNLOAD_PRIORITY
                .iter()
                .find(|(e, _)| *e == ext)
                .map(|(_, p)| *p)?;
            Some((priority, absolute_url(path)?))
        })
        .collect();

    let Some(best) = ranked.iter().map(|(p, _)| *p).min() else {
        return Vec::new();
    };
    ranked
        .into_iter()
        .filter(|(p, _)| *p == best)
        .map(|(_, url)| url.to_string())
        .collect()
}
