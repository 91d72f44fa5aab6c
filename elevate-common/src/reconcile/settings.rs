//! Validated reconciliation settings

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use super::error::ReconcileError;
use super::matcher::StaleHostMatcher;
use super::rewrite::RewriteTarget;

/// Form stored references are rewritten into
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TargetForm {
    /// Absolute URL on the production origin
    ProductionAbsolute,
    /// `/uploads/<filename>`, resolved against whichever origin serves it
    #[default]
    RootRelative,
}

impl TargetForm {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetForm::ProductionAbsolute => "production-absolute",
            TargetForm::RootRelative => "root-relative",
        }
    }
}

impl fmt::Display for TargetForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetForm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "production-absolute" | "production" | "absolute" => Ok(TargetForm::ProductionAbsolute),
            "root-relative" | "relative" => Ok(TargetForm::RootRelative),
            other => Err(format!(
                "unknown target form '{}' (expected production-absolute or root-relative)",
                other
            )),
        }
    }
}

/// Everything one reconciliation run needs, validated up front.
///
/// Construction is the only place configuration errors surface; once a
/// `ReconcileSettings` exists the driver can issue queries.
#[derive(Debug, Clone)]
pub struct ReconcileSettings {
    matcher: StaleHostMatcher,
    target_form: TargetForm,
    production_origin: Option<String>,
    uploads_segment: String,
    store_timeout: Duration,
}

impl ReconcileSettings {
    pub fn new(
        stale_host: &str,
        production_origin: Option<&str>,
        target_form: TargetForm,
        uploads_segment: &str,
        store_timeout: Duration,
    ) -> Result<Self, ReconcileError> {
        let stale_host = validate_stale_host(stale_host)?;
        let production_origin = production_origin
            .map(validate_production_origin)
            .transpose()?;
        let uploads_segment = validate_uploads_segment(uploads_segment)?;

        if store_timeout.is_zero() {
            return Err(ReconcileError::InvalidConfiguration(
                "store timeout must be greater than zero".to_string(),
            ));
        }

        let matcher = StaleHostMatcher::new(stale_host);
        // A rewritten reference must never match again
        if let Some(origin) = production_origin.as_deref() {
            if matcher.matches(origin) {
                return Err(ReconcileError::InvalidConfiguration(format!(
                    "production origin '{}' contains the stale host marker '{}'",
                    origin,
                    matcher.marker()
                )));
            }
        }

        let settings = Self {
            matcher,
            target_form,
            production_origin,
            uploads_segment,
            store_timeout,
        };
        settings.check_target()?;
        Ok(settings)
    }

    /// Same settings with a different target form
    pub fn with_target_form(&self, target_form: TargetForm) -> Result<Self, ReconcileError> {
        let settings = Self {
            target_form,
            ..self.clone()
        };
        settings.check_target()?;
        Ok(settings)
    }

    pub fn matcher(&self) -> &StaleHostMatcher {
        &self.matcher
    }

    pub fn target_form(&self) -> TargetForm {
        self.target_form
    }

    pub fn production_origin(&self) -> Option<&str> {
        self.production_origin.as_deref()
    }

    pub fn uploads_segment(&self) -> &str {
        &self.uploads_segment
    }

    pub fn store_timeout(&self) -> Duration {
        self.store_timeout
    }

    /// Rewrite target for the configured form
    pub fn rewrite_target(&self) -> RewriteTarget {
        match (self.target_form, &self.production_origin) {
            (TargetForm::ProductionAbsolute, Some(origin)) => RewriteTarget::ProductionAbsolute {
                origin: origin.clone(),
            },
            // check_target() rules out production without an origin
            _ => RewriteTarget::RootRelative {
                uploads_segment: self.uploads_segment.clone(),
            },
        }
    }

    fn check_target(&self) -> Result<(), ReconcileError> {
        if self.target_form == TargetForm::ProductionAbsolute && self.production_origin.is_none() {
            return Err(ReconcileError::InvalidConfiguration(
                "production origin is required for the production-absolute target form".to_string(),
            ));
        }
        Ok(())
    }
}

fn validate_stale_host(value: &str) -> Result<String, ReconcileError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ReconcileError::InvalidConfiguration(
            "stale host marker is empty".to_string(),
        ));
    }
    if value.contains('/') || value.chars().any(char::is_whitespace) {
        return Err(ReconcileError::InvalidConfiguration(format!(
            "stale host marker '{}' must be a bare host[:port]",
            value
        )));
    }
    Ok(value.to_string())
}

fn validate_production_origin(value: &str) -> Result<String, ReconcileError> {
    let invalid = |reason: &str| {
        ReconcileError::InvalidConfiguration(format!("production origin '{}' {}", value, reason))
    };

    let url = Url::parse(value.trim()).map_err(|e| invalid(&format!("is not a URL: {}", e)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(invalid("must use http or https"));
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(invalid("has no host"));
    }
    if url.path() != "/" || url.query().is_some() || url.fragment().is_some() {
        return Err(invalid("must not carry a path, query or fragment"));
    }

    Ok(value.trim().trim_end_matches('/').to_string())
}

fn validate_uploads_segment(value: &str) -> Result<String, ReconcileError> {
    let value = value.trim();
    if value.is_empty() || value.contains('/') || value.chars().any(char::is_whitespace) {
        return Err(ReconcileError::InvalidConfiguration(format!(
            "uploads segment '{}' must be a single non-empty path segment",
            value
        )));
    }
    Ok(value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_secs(5);

    #[test]
    fn test_valid_production_settings() {
        let settings = ReconcileSettings::new(
            "192.168.0.100:5000",
            Some("https://example-host.test/"),
            TargetForm::ProductionAbsolute,
            "uploads",
            TIMEOUT,
        )
        .unwrap();

        assert_eq!(settings.production_origin(), Some("https://example-host.test"));
        assert_eq!(
            settings.rewrite_target(),
            RewriteTarget::ProductionAbsolute {
                origin: "https://example-host.test".to_string()
            }
        );
    }

    #[test]
    fn test_relative_target_does_not_need_origin() {
        let settings =
            ReconcileSettings::new("192.168.0.100:5000", None, TargetForm::RootRelative, "uploads", TIMEOUT)
                .unwrap();
        assert_eq!(
            settings.rewrite_target(),
            RewriteTarget::RootRelative {
                uploads_segment: "uploads".to_string()
            }
        );
    }

    #[test]
    fn test_production_without_origin_is_rejected() {
        let err = ReconcileSettings::new(
            "192.168.0.100:5000",
            None,
            TargetForm::ProductionAbsolute,
            "uploads",
            TIMEOUT,
        )
        .unwrap_err();
        assert!(matches!(err, ReconcileError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        let cases = [
            ("", Some("https://example-host.test"), "uploads"),
            ("http://192.168.0.100:5000/", None, "uploads"),
            ("192.168.0.100:5000", Some("example-host.test"), "uploads"),
            ("192.168.0.100:5000", Some("ftp://example-host.test"), "uploads"),
            ("192.168.0.100:5000", Some("https://example-host.test/api"), "uploads"),
            ("192.168.0.100:5000", None, ""),
            ("192.168.0.100:5000", None, "up/loads"),
        ];

        for (host, origin, segment) in cases {
            let result =
                ReconcileSettings::new(host, origin, TargetForm::RootRelative, segment, TIMEOUT);
            assert!(
                matches!(result, Err(ReconcileError::InvalidConfiguration(_))),
                "expected rejection for host={:?} origin={:?} segment={:?}",
                host,
                origin,
                segment
            );
        }
    }

    #[test]
    fn test_origin_containing_marker_is_rejected() {
        for target in [TargetForm::ProductionAbsolute, TargetForm::RootRelative] {
            let err = ReconcileSettings::new(
                "elevate-backend",
                Some("https://elevate-backend-s28.onrender.com"),
                target,
                "uploads",
                TIMEOUT,
            )
            .unwrap_err();
            assert!(matches!(err, ReconcileError::InvalidConfiguration(_)));
        }

        // Marker with a port does not appear in the production authority
        assert!(ReconcileSettings::new(
            "elevate-backend:5000",
            Some("https://elevate-backend-s28.onrender.com"),
            TargetForm::ProductionAbsolute,
            "uploads",
            TIMEOUT,
        )
        .is_ok());
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let result = ReconcileSettings::new(
            "192.168.0.100:5000",
            None,
            TargetForm::RootRelative,
            "uploads",
            Duration::ZERO,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_with_target_form_revalidates() {
        let settings =
            ReconcileSettings::new("192.168.0.100:5000", None, TargetForm::RootRelative, "uploads", TIMEOUT)
                .unwrap();
        assert!(settings.with_target_form(TargetForm::ProductionAbsolute).is_err());
    }

    #[test]
    fn test_target_form_parsing() {
        assert_eq!("production".parse::<TargetForm>(), Ok(TargetForm::ProductionAbsolute));
        assert_eq!("Root-Relative".parse::<TargetForm>(), Ok(TargetForm::RootRelative));
        assert!("sideways".parse::<TargetForm>().is_err());
    }
}
