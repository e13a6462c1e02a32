//! Structural validation of package options.
//!
//! Validation collects every violation rather than stopping at the first,
//! so a client can fix a whole request in one round trip.

use std::fmt;

use thiserror::Error;

use super::types::{PackageOptions, SigningMode};

/// A single violated constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// The offending field, e.g. "icon_url" or "signing.alias".
    pub field: String,
    /// Human-readable description of the violation.
    pub message: String,
}

impl ValidationIssue {
    fn required(field: &str) -> Self {
        Self {
            field: field.to_string(),
            message: format!("{} is required", field),
        }
    }

    fn new(field: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

/// Options failed structural validation.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid package options: {}", issues.iter().map(|i| i.message.clone()).collect::<Vec<_>>().join(", "))]
pub struct ValidationError {
    /// All violated constraints, in field-declaration order.
    pub issues: Vec<ValidationIssue>,
}

/// Validates a package request, returning every violated constraint.
///
/// An empty result means the options are structurally sound; it says nothing
/// about whether the referenced URLs are fetchable.
pub fn validate_options(options: &PackageOptions) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    let required_strings: [(&str, &str); 10] = [
        ("app_version", options.app_version.as_str()),
        ("background_color", options.background_color.as_str()),
        ("host", options.host.as_str()),
        ("icon_url", options.icon_url.as_str()),
        ("launcher_name", options.launcher_name.as_str()),
        ("name", options.name.as_str()),
        ("navigation_color", options.navigation_color.as_str()),
        ("package_id", options.package_id.as_str()),
        ("start_url", options.start_url.as_str()),
        ("theme_color", options.theme_color.as_str()),
    ];
    for (field, value) in required_strings {
        if value.trim().is_empty() {
            issues.push(ValidationIssue::required(field));
        }
    }

    if options.web_manifest_url.trim().is_empty() {
        issues.push(ValidationIssue::required("web_manifest_url"));
    }

    for (field, value) in [
        ("icon_url", &options.icon_url),
        ("web_manifest_url", &options.web_manifest_url),
    ] {
        if !value.trim().is_empty() && !is_absolute_http_url(value) {
            issues.push(ValidationIssue::new(
                field,
                format!("{} must be an absolute http(s) URL", field),
            ));
        }
    }

    // Signing options are required whenever signing is enabled.
    match (&options.signing_mode, &options.signing) {
        (SigningMode::None, _) => {}
        (mode, None) => {
            issues.push(ValidationIssue::new(
                "signing",
                format!(
                    "signing options are required when signing mode = '{}'",
                    mode.as_str()
                ),
            ));
        }
        (mode, Some(signing)) => {
            if signing.alias.trim().is_empty() {
                issues.push(ValidationIssue::required("signing.alias"));
            }

            if *mode == SigningMode::Mine {
                match &signing.key_file_base64 {
                    None => issues.push(ValidationIssue::new(
                        "signing.key_file_base64",
                        "a signing key file must be supplied when signing mode = 'mine'",
                    )),
                    Some(file) if !file.starts_with("data:") => {
                        issues.push(ValidationIssue::new(
                            "signing.key_file_base64",
                            "signing key file must be a base64 data URI containing the keystore",
                        ));
                    }
                    Some(_) => {}
                }

                if signing.store_password.trim().is_empty() {
                    issues.push(ValidationIssue::new(
                        "signing.store_password",
                        "a store password must be supplied when signing mode = 'mine'",
                    ));
                }
                if signing.key_password.trim().is_empty() {
                    issues.push(ValidationIssue::new(
                        "signing.key_password",
                        "a key password must be supplied when signing mode = 'mine'",
                    ));
                }
            }

            // Creating a new key needs the full signer identity.
            if *mode == SigningMode::New {
                for (field, value) in [
                    ("signing.full_name", &signing.full_name),
                    ("signing.organization", &signing.organization),
                    ("signing.organizational_unit", &signing.organizational_unit),
                    ("signing.country_code", &signing.country_code),
                ] {
                    if value.trim().is_empty() {
                        issues.push(ValidationIssue::required(field));
                    }
                }
            }
        }
    }

    issues
}

/// Fills in server-generated values on an otherwise valid request.
///
/// When signing is requested without passwords, a single generated password
/// is used for both the key and the store, matching what the packaged
/// toolchain expects.
pub fn normalize_options(mut options: PackageOptions) -> PackageOptions {
    if options.signing_mode.is_signed() {
        if let Some(ref mut signing) = options.signing {
            if signing.key_password.is_empty() || signing.store_password.is_empty() {
                let generated = generate_password();
                if signing.key_password.is_empty() {
                    signing.key_password = generated.clone();
                }
                if signing.store_password.is_empty() {
                    signing.store_password = generated;
                }
            }
        }
    }
    options
}

/// Generates a random 12-character password for signing keys.
pub fn generate_password() -> String {
    let raw = uuid::Uuid::new_v4().simple().to_string();
    raw[..12].to_string()
}

fn is_absolute_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}
