//! TWA toolchain bundler implementation.
//!
//! Drives the external builder CLI: fetches the assets the build needs into
//! the workspace, writes the toolchain manifest, creates a signing key when
//! asked to, runs the builder under a timeout, and verifies the produced
//! files before returning them.

use std::error::Error as StdError;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::{timeout, Duration};
use tracing::{debug, info, warn};

use crate::config::BuilderToolConfig;
use crate::options::{PackageOptions, SigningMode};

use super::error::{BundlerError, FetchFailureKind};
use super::traits::Bundler;
use super::types::{BundleRequest, GeneratedPackage, LocalSigningKey, Transport};

/// Name of the manifest file handed to the builder CLI.
const TWA_MANIFEST_FILE: &str = "twa-manifest.json";

/// Validity of newly created signing keys, in days.
const KEY_VALIDITY_DAYS: u32 = 20_000;

/// Bundler backed by the external TWA builder CLI.
pub struct TwaBundler {
    config: BuilderToolConfig,
}

impl TwaBundler {
    /// Creates a new bundler with the given toolchain configuration.
    pub fn new(config: BuilderToolConfig) -> Self {
        Self { config }
    }

    /// Builds the HTTP client for the selected transport.
    ///
    /// The primary transport pins HTTP/1.1, matching the toolchain's default
    /// fetcher. The fallback client negotiates HTTP/2 via ALPN, which some
    /// origins require before they will serve us at all.
    fn asset_client(&self, transport: Transport) -> Result<reqwest::Client, BundlerError> {
        let builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.config.fetch_timeout_secs));

        let builder = match transport {
            Transport::Primary => builder.http1_only(),
            Transport::Fallback => builder,
        };

        builder
            .build()
            .map_err(|e| BundlerError::InvalidRequest(format!("failed to build HTTP client: {}", e)))
    }

    /// Fetches one remote asset into the workspace, classifying failures.
    async fn fetch_asset(
        client: &reqwest::Client,
        url: &str,
        dest: &Path,
    ) -> Result<(), BundlerError> {
        debug!("Fetching asset {} -> {}", url, dest.display());

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| classify_transport_error(url, &e))?;

        let status = response.status();
        if !status.is_success() {
            let kind = if status == reqwest::StatusCode::FORBIDDEN {
                FetchFailureKind::Forbidden
            } else {
                FetchFailureKind::Other
            };
            return Err(BundlerError::AssetFetch {
                url: url.to_string(),
                kind,
                detail: Some(format!("HTTP {}", status)),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| classify_transport_error(url, &e))?;

        tokio::fs::write(dest, &bytes).await?;
        Ok(())
    }

    /// Fetches every asset the options reference into `workspace/assets`.
    async fn fetch_assets(
        &self,
        request: &BundleRequest,
    ) -> Result<FetchedAssets, BundlerError> {
        let client = self.asset_client(request.transport)?;
        let asset_dir = request.workspace.join("assets");
        tokio::fs::create_dir_all(&asset_dir).await?;

        let manifest_path = asset_dir.join("manifest.json");
        Self::fetch_asset(&client, &request.options.web_manifest_url, &manifest_path).await?;

        let icon_path = asset_dir.join("icon.png");
        Self::fetch_asset(&client, &request.options.icon_url, &icon_path).await?;

        let maskable_icon_path = match &request.options.maskable_icon_url {
            Some(url) if !url.is_empty() => {
                let path = asset_dir.join("maskable-icon.png");
                Self::fetch_asset(&client, url, &path).await?;
                Some(path)
            }
            _ => None,
        };

        let monochrome_icon_path = match &request.options.monochrome_icon_url {
            Some(url) if !url.is_empty() => {
                let path = asset_dir.join("monochrome-icon.png");
                Self::fetch_asset(&client, url, &path).await?;
                Some(path)
            }
            _ => None,
        };

        Ok(FetchedAssets {
            manifest_path,
            icon_path,
            maskable_icon_path,
            monochrome_icon_path,
        })
    }

    /// Ensures the signing keystore exists for the request, creating a new
    /// key via keytool when the request asks for one.
    async fn prepare_keystore(
        &self,
        request: &BundleRequest,
    ) -> Result<Option<LocalSigningKey>, BundlerError> {
        let Some(ref signing) = request.signing else {
            return Ok(None);
        };

        match request.options.signing_mode {
            SigningMode::None => Ok(None),
            SigningMode::Mine => {
                // The orchestrator wrote the uploaded keystore before we
                // were invoked.
                if !signing.key_file_path.exists() {
                    return Err(BundlerError::InvalidRequest(format!(
                        "signing mode is 'mine' but keystore {} is missing",
                        signing.key_file_path.display()
                    )));
                }
                Ok(Some(signing.clone()))
            }
            SigningMode::New => {
                if !signing.key_file_path.exists() {
                    self.create_signing_key(signing).await?;
                }
                Ok(Some(signing.clone()))
            }
        }
    }

    /// Creates a new signing key with keytool.
    async fn create_signing_key(&self, signing: &LocalSigningKey) -> Result<(), BundlerError> {
        info!(
            "Creating new signing key at {}",
            signing.key_file_path.display()
        );

        let dname = keytool_dname(&signing.options);
        let validity = KEY_VALIDITY_DAYS.to_string();
        let output = Command::new(&self.config.keytool_path)
            .args([
                "-genkeypair",
                "-dname",
                dname.as_str(),
                "-alias",
                signing.options.alias.as_str(),
                "-keypass",
                signing.options.key_password.as_str(),
                "-storepass",
                signing.options.store_password.as_str(),
                "-validity",
                validity.as_str(),
                "-keyalg",
                "RSA",
                "-keystore",
            ])
            .arg(&signing.key_file_path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    BundlerError::KeytoolNotFound {
                        path: self.config.keytool_path.clone(),
                    }
                } else {
                    BundlerError::Io(e)
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(BundlerError::KeytoolFailed {
                reason: format!("keytool exited with code {:?}", output.status.code()),
                stderr: if stderr.is_empty() { None } else { Some(stderr) },
            });
        }

        Ok(())
    }

    /// Runs the builder CLI in the workspace, under the configured timeout.
    async fn run_builder(&self, request: &BundleRequest) -> Result<(), BundlerError> {
        let manifest_path = request.workspace.join(TWA_MANIFEST_FILE);

        let mut command = Command::new(&self.config.builder_path);
        command
            .arg("build")
            .arg("--directory")
            .arg(&request.workspace)
            .arg("--manifest")
            .arg(&manifest_path)
            .arg("--skipPwaValidation")
            .args(&self.config.extra_args)
            .current_dir(&request.workspace)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // On timeout the in-flight wait future is dropped; this makes
            // the drop also kill the toolchain process.
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                BundlerError::BuilderNotFound {
                    path: self.config.builder_path.clone(),
                }
            } else {
                BundlerError::Io(e)
            }
        })?;

        let timeout_duration = Duration::from_secs(self.config.timeout_secs);
        let output = match timeout(timeout_duration, child.wait_with_output()).await {
            Ok(result) => result.map_err(BundlerError::Io)?,
            Err(_) => {
                warn!(
                    "Builder timed out after {}s for job {}",
                    self.config.timeout_secs, request.job_id
                );
                return Err(BundlerError::Timeout {
                    timeout_secs: self.config.timeout_secs,
                });
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).to_string();
            return Err(BundlerError::toolchain(
                format!("builder exited with code {:?}", output.status.code()),
                if stderr.is_empty() { None } else { Some(stderr) },
            ));
        }

        Ok(())
    }
}

/// Local paths of the fetched remote assets.
struct FetchedAssets {
    manifest_path: PathBuf,
    icon_path: PathBuf,
    maskable_icon_path: Option<PathBuf>,
    monochrome_icon_path: Option<PathBuf>,
}

#[async_trait]
impl Bundler for TwaBundler {
    fn name(&self) -> &str {
        "twa"
    }

    async fn generate(&self, request: BundleRequest) -> Result<GeneratedPackage, BundlerError> {
        if !request.workspace.is_dir() {
            return Err(BundlerError::InvalidRequest(format!(
                "workspace {} does not exist",
                request.workspace.display()
            )));
        }

        // Stage inputs: remote assets, signing key, toolchain manifest.
        let assets = self.fetch_assets(&request).await?;
        let signing = self.prepare_keystore(&request).await?;

        let manifest = twa_manifest_json(&request.options, &assets, signing.as_ref());
        let manifest_path = request.workspace.join(TWA_MANIFEST_FILE);
        tokio::fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?).await?;

        // Run the external toolchain.
        self.run_builder(&request).await?;

        // Verify outputs before exposing them.
        locate_artifacts(&request.workspace, signing)
    }

    async fn validate(&self) -> Result<(), BundlerError> {
        let output = Command::new(&self.config.builder_path)
            .arg("--version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == io::ErrorKind::NotFound {
                    BundlerError::BuilderNotFound {
                        path: self.config.builder_path.clone(),
                    }
                } else {
                    BundlerError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(BundlerError::toolchain(
                "builder --version failed",
                Some(String::from_utf8_lossy(&output.stderr).to_string()),
            ));
        }

        Ok(())
    }
}

/// Classifies a reqwest transport error into a structured fetch failure.
///
/// Connection refusal is read off the io error kind in the source chain.
/// DNS failures carry no structured code through the transport stack, so
/// they are recognized by the resolver's message; this is the single place
/// that inspects rendered error text.
fn classify_transport_error(url: &str, error: &reqwest::Error) -> BundlerError {
    let kind = if error.is_timeout() {
        FetchFailureKind::Timeout
    } else if source_chain_has_io_kind(error, io::ErrorKind::ConnectionRefused) {
        FetchFailureKind::ConnectionRefused
    } else if source_chain_mentions_dns(error) {
        FetchFailureKind::HostNotFound
    } else {
        FetchFailureKind::Other
    };

    BundlerError::AssetFetch {
        url: url.to_string(),
        kind,
        detail: Some(error.to_string()),
    }
}

fn source_chain_has_io_kind(error: &dyn StdError, kind: io::ErrorKind) -> bool {
    let mut source = error.source();
    while let Some(err) = source {
        if let Some(io_err) = err.downcast_ref::<io::Error>() {
            if io_err.kind() == kind {
                return true;
            }
        }
        source = err.source();
    }
    false
}

fn source_chain_mentions_dns(error: &dyn StdError) -> bool {
    let mut current: Option<&dyn StdError> = Some(error);
    while let Some(err) = current {
        let text = err.to_string().to_lowercase();
        if text.contains("dns error") || text.contains("failed to lookup address") {
            return true;
        }
        current = err.source();
    }
    false
}

/// Renders the keytool distinguished name for a new signing key.
fn keytool_dname(options: &crate::options::SigningOptions) -> String {
    format!(
        "CN={}, OU={}, O={}, C={}",
        options.full_name, options.organizational_unit, options.organization, options.country_code
    )
}

/// Renders the manifest file consumed by the builder CLI.
fn twa_manifest_json(
    options: &PackageOptions,
    assets: &FetchedAssets,
    signing: Option<&LocalSigningKey>,
) -> serde_json::Value {
    let mut manifest = serde_json::json!({
        "packageId": options.package_id,
        "host": options.host,
        "name": options.name,
        "launcherName": options.launcher_name,
        "display": options.display,
        "themeColor": options.theme_color,
        "navigationColor": options.navigation_color,
        "backgroundColor": options.background_color,
        "startUrl": options.start_url,
        "appVersionName": options.app_version,
        "appVersionCode": options.app_version_code,
        "iconUrl": assets.icon_path.to_string_lossy(),
        "webManifestUrl": assets.manifest_path.to_string_lossy(),
        "splashScreenFadeOutDuration": options.splash_screen_fade_out_duration_ms,
        "enableNotifications": options.enable_notifications,
        "enableSiteSettingsShortcut": options.enable_site_settings_shortcut,
        "fallbackType": options.fallback_type,
        "orientation": options.orientation,
        "minSdkVersion": options.min_sdk_version,
    });

    if let Some(ref path) = assets.maskable_icon_path {
        manifest["maskableIconUrl"] = serde_json::Value::from(path.to_string_lossy());
    }
    if let Some(ref path) = assets.monochrome_icon_path {
        manifest["monochromeIconUrl"] = serde_json::Value::from(path.to_string_lossy());
    }
    if let Some(signing) = signing {
        manifest["signingKey"] = serde_json::json!({
            "path": signing.key_file_path.to_string_lossy(),
            "alias": signing.options.alias,
        });
    }

    manifest
}

impl From<serde_json::Error> for BundlerError {
    fn from(e: serde_json::Error) -> Self {
        BundlerError::InvalidRequest(format!("failed to render toolchain manifest: {}", e))
    }
}

/// Verifies and collects the files the toolchain produced.
///
/// The APK is required; the app bundle and asset links file are included
/// only when fully written. Failure here means the toolchain lied about
/// success, which is reported as a toolchain error.
fn locate_artifacts(
    workspace: &Path,
    signing: Option<LocalSigningKey>,
) -> Result<GeneratedPackage, BundlerError> {
    let apk_name = if signing.is_some() {
        "app-release-signed.apk"
    } else {
        "app-release-unsigned.apk"
    };

    let apk_path = workspace.join(apk_name);
    if !apk_path.is_file() {
        return Err(BundlerError::toolchain(
            format!("builder reported success but {} was not produced", apk_name),
            None,
        ));
    }

    let app_bundle_path = Some(workspace.join("app-release-bundle.aab")).filter(|p| p.is_file());

    let asset_links_path = if signing.is_some() {
        Some(workspace.join("assetlinks.json")).filter(|p| p.is_file())
    } else {
        None
    };

    Ok(GeneratedPackage {
        apk_path,
        app_bundle_path,
        asset_links_path,
        signing,
        project_dir: workspace.to_path_buf(),
    })
}
