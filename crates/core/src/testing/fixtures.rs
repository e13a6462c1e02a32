//! Shared test fixtures.

use crate::options::{
    DisplayMode, FallbackType, Orientation, PackageOptions, SigningMode, SigningOptions,
};

/// A structurally valid unsigned package request for the given host.
pub fn unsigned_options(host: &str) -> PackageOptions {
    PackageOptions {
        app_version: "1.0.0.0".to_string(),
        app_version_code: 1,
        background_color: "#ffffff".to_string(),
        display: DisplayMode::Standalone,
        enable_notifications: false,
        enable_site_settings_shortcut: true,
        fallback_type: FallbackType::CustomTabs,
        host: host.to_string(),
        icon_url: format!("https://{}/icon-512.png", host),
        include_source_code: false,
        launcher_name: "Foo".to_string(),
        maskable_icon_url: None,
        monochrome_icon_url: None,
        name: "Foo App".to_string(),
        navigation_color: "#ffffff".to_string(),
        navigation_color_dark: None,
        navigation_divider_color: None,
        orientation: Orientation::Default,
        package_id: "com.foo.app".to_string(),
        pwa_url: format!("https://{}", host),
        signing: None,
        signing_mode: SigningMode::None,
        splash_screen_fade_out_duration_ms: 300,
        start_url: "/".to_string(),
        theme_color: "#ffffff".to_string(),
        theme_color_dark: None,
        web_manifest_url: format!("https://{}/manifest.json", host),
        min_sdk_version: 23,
    }
}

/// A valid request asking for a newly created signing key.
pub fn signed_options(host: &str) -> PackageOptions {
    let mut options = unsigned_options(host);
    options.signing_mode = SigningMode::New;
    options.signing = Some(SigningOptions {
        key_file_base64: None,
        alias: "my-key-alias".to_string(),
        full_name: "Foo Admin".to_string(),
        organization: "Foo".to_string(),
        organizational_unit: "Engineering".to_string(),
        country_code: "US".to_string(),
        key_password: "key-pass".to_string(),
        store_password: "store-pass".to_string(),
    });
    options
}
