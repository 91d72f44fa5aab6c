//! Pure reference rewriting

use serde::Serialize;

use super::matcher::split_authority;

/// Target of a rewrite, carrying the data the chosen form needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "form", rename_all = "kebab-case")]
pub enum RewriteTarget {
    /// `scheme://productionHost/...`; origin has no trailing slash
    ProductionAbsolute { origin: String },
    /// `/<uploads_segment>/<filename>`
    RootRelative { uploads_segment: String },
}

/// Rewrite a stale reference into the target form.
///
/// Only call this for references the [`StaleHostMatcher`](super::StaleHostMatcher)
/// accepted. For anything else the result is unspecified (but never panics).
///
/// - `ProductionAbsolute` swaps the leading `scheme://host[:port]` for the
///   origin and keeps path, filename and any query suffix verbatim.
/// - `RootRelative` keeps only the final path segment, so nested directories
///   before the filename do not affect the result.
pub fn rewrite(reference: &str, target: &RewriteTarget) -> String {
    let (_, rest) = split_authority(reference);

    match target {
        RewriteTarget::ProductionAbsolute { origin } => format!("{}{}", origin, rest),
        RewriteTarget::RootRelative { uploads_segment } => {
            let suffix_start = rest.find(['?', '#']).unwrap_or(rest.len());
            let (path, suffix) = rest.split_at(suffix_start);
            let filename = path.rsplit('/').next().unwrap_or(path);
            format!("/{}/{}{}", uploads_segment, filename, suffix)
        }
    }
}
