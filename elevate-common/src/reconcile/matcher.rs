//! Stale host detection

/// Recognizes references whose authority embeds the stale development host.
///
/// Matching is a literal, case-sensitive substring test restricted to the
/// part of the reference before the path. Stored references are written by
/// the upload workflow and never vary in case, so no normalization happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaleHostMatcher {
    marker: String,
}

impl StaleHostMatcher {
    /// Create a matcher for the given host token (e.g. `192.168.0.100:5000`).
    ///
    /// The token is validated by [`ReconcileSettings`](super::ReconcileSettings);
    /// constructing a matcher directly accepts it as-is.
    pub fn new(marker: impl Into<String>) -> Self {
        Self {
            marker: marker.into(),
        }
    }

    /// The literal host token this matcher looks for
    pub fn marker(&self) -> &str {
        &self.marker
    }

    /// True iff the reference's authority contains the stale host token
    pub fn matches(&self, reference: &str) -> bool {
        let (authority, _) = split_authority(reference);
        !self.marker.is_empty() && authority.contains(&self.marker)
    }
}

/// Split a reference into its `scheme://authority` head and the remainder.
///
/// The remainder starts at the first `/`, `?` or `#` after the authority and
/// is returned verbatim. Root-relative references have an empty head. A
/// reference without a scheme is treated as `host[:port]/path`.
pub(crate) fn split_authority(reference: &str) -> (&str, &str) {
    if let Some(scheme_end) = reference.find("://") {
        let authority_start = scheme_end + 3;
        let rest_start = reference[authority_start..]
            .find(['/', '?', '#'])
            .map(|offset| authority_start + offset)
            .unwrap_or(reference.len());
        return reference.split_at(rest_start);
    }

    if reference.starts_with('/') {
        return ("", reference);
    }

    let rest_start = reference.find('/').unwrap_or(reference.len());
    reference.split_at(rest_start)
}
