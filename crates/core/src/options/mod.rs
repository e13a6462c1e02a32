//! The package request: option types, structural validation, and the
//! safe-URL proxy rewrite used by the asset-fetch fallback.

mod safe_urls;
mod types;
mod validate;

pub use safe_urls::with_safe_urls;
pub use types::{
    DisplayMode, FallbackType, Orientation, PackageOptions, SigningMode, SigningOptions,
};
pub use validate::{
    generate_password, normalize_options, validate_options, ValidationError, ValidationIssue,
};
