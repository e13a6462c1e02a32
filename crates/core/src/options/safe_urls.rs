//! Safe-URL proxy rewriting for the asset-fetch fallback.
//!
//! Some origins refuse fetches from the packaging service (403s from
//! anti-bot layers, HTTP/2-only servers, blocked IP ranges). When a build
//! fails on one of those, every absolute-URL option is rewritten to route
//! through a proxy that fetches on our behalf. The rewritten fields are an
//! explicit, exhaustive list; option fields are never discovered
//! dynamically.

use super::types::PackageOptions;

/// Returns a copy of the options with every absolute-URL field routed
/// through the safe-URL proxy.
///
/// Rewritten fields: `icon_url`, `maskable_icon_url`, `monochrome_icon_url`,
/// `web_manifest_url`. For example `https://foo.com/img.png` becomes
/// `{proxy_base}?url=https%3A%2F%2Ffoo.com%2Fimg.png`.
pub fn with_safe_urls(options: &PackageOptions, proxy_base: &str) -> PackageOptions {
    let mut rewritten = options.clone();

    rewritten.icon_url = proxied(proxy_base, &rewritten.icon_url);
    rewritten.web_manifest_url = proxied(proxy_base, &rewritten.web_manifest_url);
    rewritten.maskable_icon_url = rewritten
        .maskable_icon_url
        .as_deref()
        .map(|url| proxied(proxy_base, url));
    rewritten.monochrome_icon_url = rewritten
        .monochrome_icon_url
        .as_deref()
        .map(|url| proxied(proxy_base, url));

    rewritten
}

fn proxied(proxy_base: &str, url: &str) -> String {
    if url.is_empty() {
        return String::new();
    }
    format!("{}?url={}", proxy_base, urlencoding::encode(url))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::types::{
        DisplayMode, FallbackType, Orientation, SigningMode,
    };

    const PROXY: &str = "https://safe-url.packsmith.dev/fetch";

    fn options() -> PackageOptions {
        PackageOptions {
            app_version: "1.0.0.0".to_string(),
            app_version_code: 1,
            background_color: "#ffffff".to_string(),
            display: DisplayMode::Standalone,
            enable_notifications: false,
            enable_site_settings_shortcut: true,
            fallback_type: FallbackType::CustomTabs,
            host: "foo.com".to_string(),
            icon_url: "https://foo.com/img.png".to_string(),
            include_source_code: false,
            launcher_name: "Foo".to_string(),
            maskable_icon_url: Some("https://foo.com/maskable.png".to_string()),
            monochrome_icon_url: None,
            name: "Foo".to_string(),
            navigation_color: "#ffffff".to_string(),
            navigation_color_dark: None,
            navigation_divider_color: None,
            orientation: Orientation::Default,
            package_id: "com.foo.app".to_string(),
            pwa_url: "https://foo.com".to_string(),
            signing: None,
            signing_mode: SigningMode::None,
            splash_screen_fade_out_duration_ms: 300,
            start_url: "/".to_string(),
            theme_color: "#ffffff".to_string(),
            theme_color_dark: None,
            web_manifest_url: "https://foo.com/manifest.json".to_string(),
            min_sdk_version: 23,
        }
    }

    #[test]
    fn test_rewrites_every_url_field() {
        let rewritten = with_safe_urls(&options(), PROXY);

        assert_eq!(
            rewritten.icon_url,
            format!("{}?url=https%3A%2F%2Ffoo.com%2Fimg.png", PROXY)
        );
        assert_eq!(
            rewritten.web_manifest_url,
            format!("{}?url=https%3A%2F%2Ffoo.com%2Fmanifest.json", PROXY)
        );
        assert_eq!(
            rewritten.maskable_icon_url.as_deref(),
            Some(format!("{}?url=https%3A%2F%2Ffoo.com%2Fmaskable.png", PROXY).as_str())
        );
        assert!(rewritten.monochrome_icon_url.is_none());
    }

    #[test]
    fn test_non_url_fields_untouched() {
        let original = options();
        let rewritten = with_safe_urls(&original, PROXY);

        assert_eq!(rewritten.pwa_url, original.pwa_url);
        assert_eq!(rewritten.host, original.host);
        assert_eq!(rewritten.name, original.name);
        assert_eq!(rewritten.start_url, original.start_url);
    }

    #[test]
    fn test_double_rewrite_is_visible() {
        // Rewriting already-proxied options nests the encoding; the
        // orchestrator must only rewrite once per job.
        let once = with_safe_urls(&options(), PROXY);
        let twice = with_safe_urls(&once, PROXY);
        assert_ne!(once.icon_url, twice.icon_url);
        assert!(twice.icon_url.starts_with(PROXY));
    }
}
