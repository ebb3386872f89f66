use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use serde_json::json;
use sha2::{Digest, Sha256};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::contract::ComputeUnitSpec;
use crate::error::DeployError;
use crate::remote::DependencyInstaller;
use crate::telemetry::log_info;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltArtifact {
    pub unit: String,
    pub function_name: String,
    pub bytes: Vec<u8>,
    pub sha256: String,
    pub entries: Vec<String>,
}

impl BuiltArtifact {
    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }
}

/// Packages one compute unit into a zip.
///
/// Dependencies are installed into a throwaway staging directory first, then
/// the declared source files are copied on top, at their declared relative
/// paths, so they win on name clashes. Installer metadata never reaches the
/// archive. Archives over `max_bytes` are rejected before anything is uploaded.
pub fn build_artifact(
    unit: &ComputeUnitSpec,
    project_root: &Path,
    installer: &dyn DependencyInstaller,
    max_bytes: u64,
) -> Result<BuiltArtifact, DeployError> {
    let manifest = unit.manifest_path(project_root);
    if !manifest.is_file() {
        return Err(DeployError::MissingManifest { path: manifest });
    }

    let sources = unit.source_paths(project_root);
    if let Some(missing) = sources.iter().find(|path| !path.is_file()) {
        return Err(DeployError::MissingSource {
            path: missing.clone(),
        });
    }

    let staging = tempfile::Builder::new()
        .prefix(&format!("lexflow-{}-", unit.name))
        .tempdir()
        .map_err(|error| {
            DeployError::io("failed to create staging directory", std::env::temp_dir(), error)
        })?;

    installer
        .install(&manifest, staging.path())
        .map_err(|message| DeployError::DependencyInstall {
            unit: unit.name.clone(),
            message,
        })?;

    for (declared, source) in unit.source_files.iter().zip(&sources) {
        let target = staging.path().join(declared);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)
                .map_err(|error| DeployError::io("failed to stage source file", parent, error))?;
        }
        fs::copy(source, &target)
            .map_err(|error| DeployError::io("failed to stage source file", source, error))?;
    }

    let (bytes, entries) = zip_directory(staging.path())?;
    let size = bytes.len() as u64;
    if size > max_bytes {
        return Err(DeployError::ArchiveTooLarge {
            unit: unit.name.clone(),
            size,
            limit: max_bytes,
        });
    }

    let sha256 = format!("{:x}", Sha256::digest(&bytes));
    log_info(
        "artifact_builder",
        "artifact_built",
        json!({
            "unit": unit.name,
            "entries": entries.len(),
            "size_bytes": size,
            "sha256": sha256,
        }),
    );

    Ok(BuiltArtifact {
        unit: unit.name.clone(),
        function_name: unit.function_name.clone(),
        bytes,
        sha256,
        entries,
    })
}

/// Keeps a copy of the archive as `<dir>/<unit>.zip`.
pub fn write_local_copy(artifact: &BuiltArtifact, dir: &Path) -> Result<PathBuf, DeployError> {
    fs::create_dir_all(dir)
        .map_err(|error| DeployError::io("failed to create artifact directory", dir, error))?;
    let path = dir.join(format!("{}.zip", artifact.unit));
    fs::write(&path, &artifact.bytes)
        .map_err(|error| DeployError::io("failed to write artifact", &path, error))?;
    Ok(path)
}

fn is_build_only(relative: &Path) -> bool {
    let in_metadata_dir = relative.components().any(|component| {
        let name = component.as_os_str().to_string_lossy();
        name == "__pycache__" || name.ends_with(".dist-info") || name.ends_with(".egg-info")
    });
    in_metadata_dir || relative.extension().is_some_and(|ext| ext == "pyc")
}

fn collect_files(root: &Path, dir: &Path, files: &mut Vec<PathBuf>) -> Result<(), DeployError> {
    let entries = fs::read_dir(dir)
        .map_err(|error| DeployError::io("failed to read staging directory", dir, error))?;
    for entry in entries {
        let entry =
            entry.map_err(|error| DeployError::io("failed to read staging entry", dir, error))?;
        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(&path).to_path_buf();
        if is_build_only(&relative) {
            continue;
        }
        if path.is_dir() {
            collect_files(root, &path, files)?;
        } else {
            files.push(relative);
        }
    }
    Ok(())
}

fn zip_directory(root: &Path) -> Result<(Vec<u8>, Vec<String>), DeployError> {
    let mut files = Vec::new();
    collect_files(root, root, &mut files)?;
    files.sort();

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let mut entries = Vec::with_capacity(files.len());
    for relative in files {
        let name = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let absolute = root.join(&relative);
        let body = fs::read(&absolute)
            .map_err(|error| DeployError::io("failed to read staged file", &absolute, error))?;
        zip.start_file(name.as_str(), options)?;
        zip.write_all(&body)
            .map_err(|error| DeployError::io("failed to write archive entry", &absolute, error))?;
        entries.push(name);
    }

    let cursor = zip.finish()?;
    Ok((cursor.into_inner(), entries))
}

#[cfg(test)]
mod tests {
    use std::io::Read;

    use super::*;
    use crate::contract::MAX_DIRECT_UPLOAD_BYTES;

    struct FakePip;

    impl DependencyInstaller for FakePip {
        fn install(&self, _manifest: &Path, target_dir: &Path) -> Result<(), String> {
            let package = target_dir.join("anthropic");
            fs::create_dir_all(package.join("__pycache__")).map_err(|e| e.to_string())?;
            fs::write(package.join("__init__.py"), b"VERSION = '1'").map_err(|e| e.to_string())?;
            fs::write(package.join("__pycache__/__init__.cpython-312.pyc"), b"\0")
                .map_err(|e| e.to_string())?;
            let dist_info = target_dir.join("anthropic-0.40.0.dist-info");
            fs::create_dir_all(&dist_info).map_err(|e| e.to_string())?;
            fs::write(dist_info.join("RECORD"), b"anthropic/__init__.py").map_err(|e| e.to_string())?;
            fs::write(target_dir.join("handler.py"), b"stale").map_err(|e| e.to_string())?;
            Ok(())
        }
    }

    struct NoopPip;

    impl DependencyInstaller for NoopPip {
        fn install(&self, _manifest: &Path, _target_dir: &Path) -> Result<(), String> {
            Ok(())
        }
    }

    struct BrokenPip;

    impl DependencyInstaller for BrokenPip {
        fn install(&self, _manifest: &Path, _target_dir: &Path) -> Result<(), String> {
            Err("ERROR: No matching distribution found for anthropicc".to_string())
        }
    }

    fn intake_unit() -> ComputeUnitSpec {
        ComputeUnitSpec {
            name: "intake".to_string(),
            function_name: "lexflow-intake".to_string(),
            source_dir: PathBuf::from("lexflow-intake"),
            source_files: vec!["handler.py".to_string(), "prompt.py".to_string()],
            dependency_manifest: "requirements.txt".to_string(),
        }
    }

    fn build_intake(
        root: &Path,
        installer: &dyn DependencyInstaller,
    ) -> Result<BuiltArtifact, DeployError> {
        build_artifact(&intake_unit(), root, installer, MAX_DIRECT_UPLOAD_BYTES)
    }

    fn project() -> tempfile::TempDir {
        let root = tempfile::tempdir().expect("tempdir");
        let unit_dir = root.path().join("lexflow-intake");
        fs::create_dir_all(&unit_dir).expect("unit dir");
        fs::write(unit_dir.join("handler.py"), b"def lambda_handler(e, c): pass").expect("handler");
        fs::write(unit_dir.join("prompt.py"), b"SYSTEM_PROMPT = ''").expect("prompt");
        fs::write(unit_dir.join("requirements.txt"), b"anthropic\n").expect("requirements");
        root
    }

    #[test]
    fn archive_holds_sources_and_dependencies_without_metadata() {
        let root = project();
        let artifact = build_intake(root.path(), &FakePip).expect("build");

        assert_eq!(
            artifact.entries,
            vec!["anthropic/__init__.py", "handler.py", "prompt.py"]
        );
        assert_eq!(artifact.sha256.len(), 64);

        let mut archive =
            zip::ZipArchive::new(Cursor::new(artifact.bytes.clone())).expect("readable zip");
        let mut handler = String::new();
        archive
            .by_name("handler.py")
            .expect("handler entry")
            .read_to_string(&mut handler)
            .expect("read handler");
        assert_eq!(handler, "def lambda_handler(e, c): pass");
    }

    #[test]
    fn rebuilding_yields_the_same_entries() {
        let root = project();
        let first = build_intake(root.path(), &FakePip).expect("first");
        let second = build_intake(root.path(), &FakePip).expect("second");
        assert_eq!(first.entries, second.entries);
    }

    #[test]
    fn missing_source_file_is_fatal() {
        let root = project();
        fs::remove_file(root.path().join("lexflow-intake/prompt.py")).expect("remove");

        let error = build_intake(root.path(), &FakePip)
            .expect_err("missing source should fail");
        assert!(matches!(error, DeployError::MissingSource { .. }));
        assert!(error.to_string().contains("prompt.py"));
    }

    #[test]
    fn missing_manifest_is_fatal() {
        let root = project();
        fs::remove_file(root.path().join("lexflow-intake/requirements.txt")).expect("remove");

        let error = build_intake(root.path(), &FakePip)
            .expect_err("missing manifest should fail");
        assert!(matches!(error, DeployError::MissingManifest { .. }));
    }

    #[test]
    fn installer_failure_is_reported_with_unit() {
        let root = project();
        let error = build_intake(root.path(), &BrokenPip)
            .expect_err("install failure should fail");
        assert!(error.to_string().contains("intake"));
        assert!(error.to_string().contains("No matching distribution"));
    }

    #[test]
    fn local_copy_is_named_after_unit() {
        let root = project();
        let artifact = build_intake(root.path(), &FakePip).expect("build");
        let dist = root.path().join("dist");

        let path = write_local_copy(&artifact, &dist).expect("write copy");
        assert_eq!(path, dist.join("intake.zip"));
        assert_eq!(fs::read(path).expect("read copy"), artifact.bytes);
    }

    #[test]
    fn same_named_sources_keep_their_directories() {
        let root = project();
        let unit_dir = root.path().join("lexflow-intake");
        for dir in ["a", "b"] {
            fs::create_dir_all(unit_dir.join(dir)).expect("source dir");
            fs::write(unit_dir.join(dir).join("util.py"), dir).expect("util");
        }
        let mut unit = intake_unit();
        unit.source_files = vec!["a/util.py".to_string(), "b/util.py".to_string()];

        let artifact =
            build_artifact(&unit, root.path(), &NoopPip, MAX_DIRECT_UPLOAD_BYTES).expect("build");
        assert_eq!(artifact.entries, vec!["a/util.py", "b/util.py"]);

        let mut archive =
            zip::ZipArchive::new(Cursor::new(artifact.bytes.clone())).expect("readable zip");
        let mut body = String::new();
        archive
            .by_name("b/util.py")
            .expect("b entry")
            .read_to_string(&mut body)
            .expect("read b");
        assert_eq!(body, "b");
    }

    #[test]
    fn archive_over_the_limit_is_rejected() {
        let root = project();
        let error = build_artifact(&intake_unit(), root.path(), &FakePip, 16)
            .expect_err("oversize archive should fail");
        match error {
            DeployError::ArchiveTooLarge { unit, size, limit } => {
                assert_eq!(unit, "intake");
                assert_eq!(limit, 16);
                assert!(size > 16);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn build_only_paths_are_recognised() {
        assert!(is_build_only(Path::new("requests-2.32.dist-info/METADATA")));
        assert!(is_build_only(Path::new("pkg/__pycache__/mod.cpython-312.pyc")));
        assert!(is_build_only(Path::new("stray.pyc")));
        assert!(!is_build_only(Path::new("pkg/module.py")));
    }
}
