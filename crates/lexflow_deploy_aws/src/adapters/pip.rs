use std::path::Path;
use std::process::Command;

use lexflow_deploy_core::remote::DependencyInstaller;
use lexflow_deploy_core::telemetry::log_info;
use serde_json::json;

/// Installs a `requirements.txt` into a target directory with pip.
#[derive(Debug, Clone)]
pub struct PipInstaller {
    python: String,
    /// Wheel platform tag, e.g. `manylinux2014_x86_64`, when building on a
    /// machine that differs from the Lambda runtime.
    platform: Option<String>,
}

impl PipInstaller {
    pub fn new(python: impl Into<String>, platform: Option<String>) -> Self {
        Self {
            python: python.into(),
            platform,
        }
    }

    fn args(&self, manifest: &Path, target_dir: &Path) -> Vec<String> {
        let mut args = vec![
            "-m".to_string(),
            "pip".to_string(),
            "install".to_string(),
            "--quiet".to_string(),
            "--upgrade".to_string(),
            "-r".to_string(),
            manifest.display().to_string(),
            "-t".to_string(),
            target_dir.display().to_string(),
        ];
        if let Some(platform) = &self.platform {
            args.extend([
                "--platform".to_string(),
                platform.clone(),
                "--implementation".to_string(),
                "cp".to_string(),
                "--only-binary=:all:".to_string(),
            ]);
        }
        args
    }
}

impl DependencyInstaller for PipInstaller {
    fn install(&self, manifest: &Path, target_dir: &Path) -> Result<(), String> {
        let args = self.args(manifest, target_dir);
        log_info(
            "dependency_installer",
            "pip_started",
            json!({ "python": self.python, "args": args }),
        );
        let output = Command::new(&self.python)
            .args(&args)
            .output()
            .map_err(|error| format!("failed to run {}: {error}", self.python))?;

        if output.status.success() {
            return Ok(());
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(format!(
            "{} exited with {}: {}",
            self.python,
            output.status,
            stderr.trim()
        ))
    }
}
