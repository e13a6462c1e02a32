//! Zip assembly of a completed build.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::bundler::GeneratedPackage;
use crate::options::PackageOptions;

/// Next-steps document included in every archive of a signed package.
const NEXT_STEPS_SIGNED: &str = include_str!("next_steps.html");

/// Next-steps document for unsigned packages.
const NEXT_STEPS_UNSIGNED: &str = include_str!("next_steps_unsigned.html");

/// Errors raised while assembling the downloadable archive.
///
/// Deliberately distinct from `BundlerError`: the build succeeded, only the
/// packaging of its results failed.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// An artifact the archive must contain is missing from disk.
    #[error("expected artifact missing: {path}")]
    MissingArtifact { path: PathBuf },

    /// The zip library reported a failure.
    #[error("zip error: {0}")]
    Zip(String),

    /// I/O error while reading artifacts or writing the archive.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<zip::result::ZipError> for ArchiveError {
    fn from(e: zip::result::ZipError) -> Self {
        ArchiveError::Zip(e.to_string())
    }
}

/// Assembles the final downloadable bundle from a completed build.
#[derive(Debug, Clone, Default)]
pub struct ArchiveAssembler;

impl ArchiveAssembler {
    pub fn new() -> Self {
        Self
    }

    /// Builds the archive at `out_path` and returns that path.
    ///
    /// Contents, in order:
    /// - the APK, named after the app (`-unsigned` suffix when unsigned)
    /// - `Readme.html` with next steps (signed or unsigned variant)
    /// - for signed packages: `signing.keystore`, `signing-key-info.txt`
    ///   and `assetlinks.json` when produced
    /// - the AAB under the same naming convention, when produced
    /// - the generated project under `source/`, when requested
    pub fn assemble(
        &self,
        package: &GeneratedPackage,
        options: &PackageOptions,
        out_path: &Path,
    ) -> Result<PathBuf, ArchiveError> {
        debug!("Assembling archive at {}", out_path.display());

        if let Some(parent) = out_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = File::create(out_path)?;
        let mut archive = ZipWriter::new(file);
        let entry_options =
            SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        let base_name = base_package_name(options);

        // The APK and the next-steps readme go into every archive.
        append_file(
            &mut archive,
            &package.apk_path,
            &format!("{}.apk", base_name),
            entry_options,
        )?;

        let readme = if package.is_signed() {
            NEXT_STEPS_SIGNED
        } else {
            NEXT_STEPS_UNSIGNED
        };
        archive.start_file("Readme.html", entry_options)?;
        archive.write_all(readme.as_bytes())?;

        // Signing material rides along only when the package was signed.
        if let Some(ref signing) = package.signing {
            append_file(
                &mut archive,
                &signing.key_file_path,
                "signing.keystore",
                entry_options,
            )?;

            archive.start_file("signing-key-info.txt", entry_options)?;
            archive.write_all(signing_key_info(&signing.options).as_bytes())?;

            if let Some(ref asset_links) = package.asset_links_path {
                append_file(&mut archive, asset_links, "assetlinks.json", entry_options)?;
            }
        }

        if let Some(ref app_bundle) = package.app_bundle_path {
            append_file(
                &mut archive,
                app_bundle,
                &format!("{}.aab", base_name),
                entry_options,
            )?;
        }

        if options.include_source_code {
            append_dir(&mut archive, &package.project_dir, "source", entry_options)?;
        }

        archive.finish()?;
        info!("Archive assembled at {}", out_path.display());

        Ok(out_path.to_path_buf())
    }
}

/// Base file name for archived binaries: the app name, with an `-unsigned`
/// suffix when no signing occurred.
fn base_package_name(options: &PackageOptions) -> String {
    if options.is_signed() {
        options.name.clone()
    } else {
        format!("{}-unsigned", options.name)
    }
}

/// User-facing download name for a job's archive, derived from the PWA host.
pub fn archive_download_name(host: &str) -> String {
    let sanitizer = regex_lite::Regex::new(r"[^a-zA-Z0-9.-]").unwrap();
    let safe_host = sanitizer.replace_all(host, "_");
    format!("{} - app package.zip", safe_host)
}

/// Renders the plaintext signing key summary shipped next to the keystore.
fn signing_key_info(signing: &crate::options::SigningOptions) -> String {
    let lines = [
        "Keep this file and signing.keystore in a safe place. You'll need them to upload future versions of your app.\r\n".to_string(),
        "Key store file: signing.keystore".to_string(),
        format!("Key store password: {}", signing.store_password),
        format!("Key alias: {}", signing.alias),
        format!("Key password: {}", signing.key_password),
        format!("Signer's full name: {}", signing.full_name),
        format!("Signer's organization: {}", signing.organization),
        format!(
            "Signer's organizational unit: {}",
            signing.organizational_unit
        ),
        format!("Signer's country code: {}", signing.country_code),
    ];
    lines.join("\r\n")
}

fn append_file<W: Write + std::io::Seek>(
    archive: &mut ZipWriter<W>,
    source: &Path,
    entry_name: &str,
    options: SimpleFileOptions,
) -> Result<(), ArchiveError> {
    if !source.is_file() {
        return Err(ArchiveError::MissingArtifact {
            path: source.to_path_buf(),
        });
    }

    archive.start_file(entry_name, options)?;
    let mut file = File::open(source)?;
    let mut buf = Vec::new();
    file.read_to_end(&mut buf)?;
    archive.write_all(&buf)?;
    Ok(())
}

fn append_dir<W: Write + std::io::Seek>(
    archive: &mut ZipWriter<W>,
    source: &Path,
    prefix: &str,
    options: SimpleFileOptions,
) -> Result<(), ArchiveError> {
    let mut entries: Vec<_> = std::fs::read_dir(source)?
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .map(|e| e.path())
        .collect();
    entries.sort();

    for path in entries {
        let name = match path.file_name().and_then(|n| n.to_str()) {
            Some(name) => name.to_string(),
            None => continue,
        };
        let entry_name = format!("{}/{}", prefix, name);

        if path.is_dir() {
            append_dir(archive, &path, &entry_name, options)?;
        } else {
            append_file(archive, &path, &entry_name, options)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundler::LocalSigningKey;
    use crate::options::{SigningMode, SigningOptions};
    use crate::testing::fixtures;
    use std::collections::HashSet;

    fn read_entry_names(path: &Path) -> HashSet<String> {
        let file = File::open(path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect()
    }

    fn read_entry(path: &Path, name: &str) -> String {
        let file = File::open(path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let mut entry = archive.by_name(name).unwrap();
        let mut contents = String::new();
        entry.read_to_string(&mut contents).unwrap();
        contents
    }

    fn unsigned_package(dir: &Path) -> GeneratedPackage {
        std::fs::write(dir.join("app-release-unsigned.apk"), b"apk bytes").unwrap();
        GeneratedPackage {
            apk_path: dir.join("app-release-unsigned.apk"),
            app_bundle_path: None,
            asset_links_path: None,
            signing: None,
            project_dir: dir.to_path_buf(),
        }
    }

    fn signed_package(dir: &Path) -> GeneratedPackage {
        std::fs::write(dir.join("app-release-signed.apk"), b"apk bytes").unwrap();
        std::fs::write(dir.join("app-release-bundle.aab"), b"aab bytes").unwrap();
        std::fs::write(dir.join("assetlinks.json"), b"[]").unwrap();
        std::fs::write(dir.join("signing.keystore"), b"keystore bytes").unwrap();

        GeneratedPackage {
            apk_path: dir.join("app-release-signed.apk"),
            app_bundle_path: Some(dir.join("app-release-bundle.aab")),
            asset_links_path: Some(dir.join("assetlinks.json")),
            signing: Some(LocalSigningKey {
                key_file_path: dir.join("signing.keystore"),
                options: SigningOptions {
                    key_file_base64: None,
                    alias: "my-key-alias".to_string(),
                    full_name: "Example Admin".to_string(),
                    organization: "Example".to_string(),
                    organizational_unit: "Engineering".to_string(),
                    country_code: "US".to_string(),
                    key_password: "key-pass".to_string(),
                    store_password: "store-pass".to_string(),
                },
            }),
            project_dir: dir.to_path_buf(),
        }
    }

    #[test]
    fn test_unsigned_archive_contents() {
        let temp = tempfile::tempdir().unwrap();
        let package = unsigned_package(temp.path());
        let options = fixtures::unsigned_options("foo.com");

        let out = temp.path().join("out.zip");
        ArchiveAssembler::new()
            .assemble(&package, &options, &out)
            .unwrap();

        let names = read_entry_names(&out);
        assert!(names.contains("Foo App-unsigned.apk"));
        assert!(names.contains("Readme.html"));
        assert!(!names.contains("signing.keystore"));
        assert!(!names.contains("signing-key-info.txt"));
        assert!(!names.contains("assetlinks.json"));

        let readme = read_entry(&out, "Readme.html");
        assert!(readme.contains("unsigned"));
    }

    #[test]
    fn test_signed_archive_contents() {
        let temp = tempfile::tempdir().unwrap();
        let package = signed_package(temp.path());
        let mut options = fixtures::signed_options("foo.com");
        options.signing_mode = SigningMode::New;

        let out = temp.path().join("out.zip");
        ArchiveAssembler::new()
            .assemble(&package, &options, &out)
            .unwrap();

        let names = read_entry_names(&out);
        assert!(names.contains("Foo App.apk"));
        assert!(names.contains("Foo App.aab"));
        assert!(names.contains("Readme.html"));
        assert!(names.contains("signing.keystore"));
        assert!(names.contains("signing-key-info.txt"));
        assert!(names.contains("assetlinks.json"));

        let key_info = read_entry(&out, "signing-key-info.txt");
        assert!(key_info.contains("Key alias: my-key-alias"));
        assert!(key_info.contains("Key store password: store-pass"));
        assert!(key_info.contains("Signer's organization: Example"));
    }

    #[test]
    fn test_source_tree_included_when_requested() {
        let temp = tempfile::tempdir().unwrap();
        let package = unsigned_package(temp.path());
        std::fs::create_dir_all(temp.path().join("app/src")).unwrap();
        std::fs::write(temp.path().join("app/src/Main.kt"), b"fun main() {}").unwrap();

        let mut options = fixtures::unsigned_options("foo.com");
        options.include_source_code = true;

        let out_dir = tempfile::tempdir().unwrap();
        let out = out_dir.path().join("out.zip");
        ArchiveAssembler::new()
            .assemble(&package, &options, &out)
            .unwrap();

        let names = read_entry_names(&out);
        assert!(names.contains("source/app/src/Main.kt"));
    }

    #[test]
    fn test_missing_apk_aborts_with_archive_error() {
        let temp = tempfile::tempdir().unwrap();
        let package = GeneratedPackage {
            apk_path: temp.path().join("missing.apk"),
            app_bundle_path: None,
            asset_links_path: None,
            signing: None,
            project_dir: temp.path().to_path_buf(),
        };
        let options = fixtures::unsigned_options("foo.com");

        let out = temp.path().join("out.zip");
        let result = ArchiveAssembler::new().assemble(&package, &options, &out);
        assert!(matches!(
            result,
            Err(ArchiveError::MissingArtifact { .. })
        ));
    }

    #[test]
    fn test_archive_download_name_sanitizes_host() {
        assert_eq!(
            archive_download_name("foo.example.com"),
            "foo.example.com - app package.zip"
        );
        assert_eq!(
            archive_download_name("foo.com:8080/x"),
            "foo.com_8080_x - app package.zip"
        );
    }

    #[test]
    fn test_base_package_name_suffix() {
        let unsigned = fixtures::unsigned_options("foo.com");
        assert_eq!(base_package_name(&unsigned), "Foo App-unsigned");

        let signed = fixtures::signed_options("foo.com");
        assert_eq!(base_package_name(&signed), "Foo App");
    }
}
