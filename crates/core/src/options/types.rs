//! Package request option types.

use serde::{Deserialize, Serialize};

/// How the packaged app should display on device.
///
/// `Standalone` keeps the status bar and navbar visible and is the right
/// choice for most PWAs. `Fullscreen` takes all available real estate.
/// `FullscreenSticky` additionally passes edge-swipe gestures through to
/// the app.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    #[default]
    Standalone,
    Fullscreen,
    FullscreenSticky,
}

/// Behavior when the trusted-web-activity feature is unavailable on device.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum FallbackType {
    #[default]
    CustomTabs,
    WebView,
}

/// Screen orientation lock for the packaged app.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    #[default]
    Default,
    Any,
    Natural,
    Landscape,
    Portrait,
}

/// The signing operation to perform.
///
/// `New` creates a fresh signing key (signing details required, key file
/// ignored). `Mine` uses an uploaded keystore (details and key file
/// required). `None` produces an unsigned package.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SigningMode {
    #[default]
    None,
    New,
    Mine,
}

impl SigningMode {
    /// Returns true when this mode produces a signed package.
    pub fn is_signed(&self) -> bool {
        !matches!(self, SigningMode::None)
    }

    /// Returns the mode as a string (for logs and filters).
    pub fn as_str(&self) -> &'static str {
        match self {
            SigningMode::None => "none",
            SigningMode::New => "new",
            SigningMode::Mine => "mine",
        }
    }
}

/// Details about the signing key.
///
/// Ignored when the signing mode is `None`. When the mode is `Mine`,
/// `key_file_base64` must carry the uploaded keystore as a base64 data URI.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SigningOptions {
    /// Uploaded keystore file as a base64 `data:` URI (mode = mine only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_file_base64: Option<String>,

    /// Key alias inside the keystore.
    pub alias: String,

    /// Signer's full name (required when creating a new key).
    #[serde(default)]
    pub full_name: String,

    /// Signer's organization (required when creating a new key).
    #[serde(default)]
    pub organization: String,

    /// Signer's organizational unit (required when creating a new key).
    #[serde(default)]
    pub organizational_unit: String,

    /// Signer's two-letter country code (required when creating a new key).
    #[serde(default)]
    pub country_code: String,

    /// Key password. Generated server-side when left empty.
    #[serde(default)]
    pub key_password: String,

    /// Keystore password. Generated server-side when left empty.
    #[serde(default)]
    pub store_password: String,
}

/// Options for generating an app package.
///
/// Captured immutably at enqueue time; a user-driven retry always creates a
/// new job from a fresh copy of these options rather than mutating an old
/// record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PackageOptions {
    /// The app version string, e.g. "1.0.0.0".
    pub app_version: String,

    /// The numeric app version code.
    pub app_version_code: u32,

    /// The app background color, e.g. "#ffffff".
    pub background_color: String,

    /// Display mode on device.
    #[serde(default)]
    pub display: DisplayMode,

    /// Whether push notification delegation is enabled.
    #[serde(default)]
    pub enable_notifications: bool,

    /// Whether to show the site-settings shortcut for the installed app.
    #[serde(default)]
    pub enable_site_settings_shortcut: bool,

    /// Fallback behavior when TWA is unavailable.
    #[serde(default)]
    pub fallback_type: FallbackType,

    /// The URL host for the app, e.g. "foo.com".
    pub host: String,

    /// Absolute URL to the primary app icon.
    pub icon_url: String,

    /// Whether to include the generated source project in the archive.
    #[serde(default)]
    pub include_source_code: bool,

    /// The name shown on the launch screen (may be a shortened app name).
    pub launcher_name: String,

    /// Absolute URL to a maskable icon, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maskable_icon_url: Option<String>,

    /// Absolute URL to a monochrome icon, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monochrome_icon_url: Option<String>,

    /// The app display name. Also the base name of archived binaries.
    pub name: String,

    /// Navbar color.
    pub navigation_color: String,

    /// Navbar color in dark mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_color_dark: Option<String>,

    /// Navbar divider color.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub navigation_divider_color: Option<String>,

    /// Screen orientation lock.
    #[serde(default)]
    pub orientation: Orientation,

    /// The package ID to generate, e.g. "com.mycompany.foo".
    pub package_id: String,

    /// The URL of the PWA as originally submitted.
    pub pwa_url: String,

    /// Signing key details. Ignored when `signing_mode` is `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signing: Option<SigningOptions>,

    /// The signing operation to perform.
    #[serde(default)]
    pub signing_mode: SigningMode,

    /// Splash screen fade out duration in milliseconds.
    #[serde(default = "default_splash_fade_ms")]
    pub splash_screen_fade_out_duration_ms: u32,

    /// The start url relative to the host.
    pub start_url: String,

    /// The app theme color, e.g. "#2f3d58".
    pub theme_color: String,

    /// The app theme color in dark mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_color_dark: Option<String>,

    /// Absolute URL to the web manifest.
    pub web_manifest_url: String,

    /// Minimum Android API level required to run the app.
    #[serde(default = "default_min_sdk_version")]
    pub min_sdk_version: u32,
}

fn default_splash_fade_ms() -> u32 {
    300
}

fn default_min_sdk_version() -> u32 {
    23
}

impl PackageOptions {
    /// Returns true when this request asks for a signed package.
    pub fn is_signed(&self) -> bool {
        self.signing_mode.is_signed()
    }
}
