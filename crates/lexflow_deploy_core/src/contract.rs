use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DeployError;

pub const DEFAULT_REGION: &str = "us-east-1";
pub const DEFAULT_STACK_NAME: &str = "lexflow";
pub const DEFAULT_SECRET_NAME: &str = "/lexflow/anthropic-api-key";
pub const DEFAULT_TEMPLATE_PATH: &str = "template.yaml";
pub const DEFAULT_ENDPOINT_FILE: &str = "api_endpoint.txt";
pub const DEFAULT_ARTIFACT_DIR: &str = "dist";

pub const INTAKE_URL_OUTPUT: &str = "IntakeApiUrl";
pub const DASHBOARD_URL_OUTPUT: &str = "DashboardUrl";

pub const ATTORNEY_EMAIL_PARAMETER: &str = "AttorneyEmail";
pub const FROM_EMAIL_PARAMETER: &str = "FromEmail";

/// Largest zip Lambda accepts through a direct `UpdateFunctionCode` upload.
pub const MAX_DIRECT_UPLOAD_BYTES: u64 = 50 * 1024 * 1024;
/// Largest template CloudFormation accepts inline as `TemplateBody`.
pub const MAX_INLINE_TEMPLATE_BYTES: u64 = 51_200;

pub const DEFAULT_CAPABILITIES: [&str; 2] = ["CAPABILITY_IAM", "CAPABILITY_NAMED_IAM"];

/// Operator-supplied values gathered at run start. Only lives for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunParameters {
    pub region: String,
    pub stack_name: String,
    pub attorney_email: String,
    pub from_email: String,
}

impl RunParameters {
    pub fn stack_parameters(&self, extra: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut parameters = extra.clone();
        parameters.insert(
            ATTORNEY_EMAIL_PARAMETER.to_string(),
            self.attorney_email.clone(),
        );
        parameters.insert(FROM_EMAIL_PARAMETER.to_string(), self.from_email.clone());
        parameters
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ComputeUnitSpec {
    /// Short name used in logs and for the local archive file.
    pub name: String,
    /// Name of the deployed function the stack creates for this unit.
    pub function_name: String,
    pub source_dir: PathBuf,
    pub source_files: Vec<String>,
    /// Relative to `source_dir`.
    #[serde(default = "default_dependency_manifest")]
    pub dependency_manifest: String,
}

impl ComputeUnitSpec {
    pub fn source_paths(&self, root: &Path) -> Vec<PathBuf> {
        self.source_files
            .iter()
            .map(|file| root.join(&self.source_dir).join(file))
            .collect()
    }

    pub fn manifest_path(&self, root: &Path) -> PathBuf {
        root.join(&self.source_dir).join(&self.dependency_manifest)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DeployManifest {
    pub units: Vec<ComputeUnitSpec>,
    #[serde(default = "default_output_keys")]
    pub output_keys: Vec<String>,
    #[serde(default = "default_endpoint_output")]
    pub endpoint_output: String,
    #[serde(default = "default_capabilities")]
    pub capabilities: Vec<String>,
    #[serde(default)]
    pub extra_parameters: BTreeMap<String, String>,
}

impl Default for DeployManifest {
    fn default() -> Self {
        Self {
            units: vec![
                ComputeUnitSpec {
                    name: "intake".to_string(),
                    function_name: "lexflow-intake".to_string(),
                    source_dir: PathBuf::from("lexflow-intake"),
                    source_files: vec![
                        "handler.py".to_string(),
                        "ai_classifier.py".to_string(),
                        "prompt.py".to_string(),
                        "emailer.py".to_string(),
                        "db.py".to_string(),
                    ],
                    dependency_manifest: default_dependency_manifest(),
                },
                ComputeUnitSpec {
                    name: "dashboard".to_string(),
                    function_name: "lexflow-dashboard".to_string(),
                    source_dir: PathBuf::from("lexflow-dashboard"),
                    source_files: vec!["handler.py".to_string(), "db.py".to_string()],
                    dependency_manifest: default_dependency_manifest(),
                },
            ],
            output_keys: default_output_keys(),
            endpoint_output: default_endpoint_output(),
            capabilities: default_capabilities(),
            extra_parameters: BTreeMap::new(),
        }
    }
}

impl DeployManifest {
    pub fn from_json(text: &str) -> Result<Self, DeployError> {
        let manifest: Self = serde_json::from_str(text)
            .map_err(|error| DeployError::InvalidManifest(error.to_string()))?;
        manifest.validate()?;
        Ok(manifest)
    }

    pub fn load(path: &Path) -> Result<Self, DeployError> {
        let text = std::fs::read_to_string(path)
            .map_err(|error| DeployError::io("failed to read deploy manifest", path, error))?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<(), DeployError> {
        if self.units.is_empty() {
            return Err(DeployError::InvalidManifest(
                "at least one compute unit is required".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        for unit in &self.units {
            if unit.name.trim().is_empty() || unit.function_name.trim().is_empty() {
                return Err(DeployError::InvalidManifest(
                    "unit names and function names must be non-empty".to_string(),
                ));
            }
            if !seen.insert(unit.name.as_str()) {
                return Err(DeployError::InvalidManifest(format!(
                    "duplicate unit name '{}'",
                    unit.name
                )));
            }
            if unit.source_files.is_empty() {
                return Err(DeployError::InvalidManifest(format!(
                    "unit '{}' must declare at least one source file",
                    unit.name
                )));
            }
            if let Some(file) = unit
                .source_files
                .iter()
                .find(|file| !is_plain_relative(Path::new(file.as_str())))
            {
                return Err(DeployError::InvalidManifest(format!(
                    "unit '{}' source file '{file}' must be a relative path inside its source directory",
                    unit.name
                )));
            }
        }

        if !self.output_keys.contains(&self.endpoint_output) {
            return Err(DeployError::InvalidManifest(format!(
                "endpoint output '{}' is not among the output keys",
                self.endpoint_output
            )));
        }

        Ok(())
    }
}

fn is_plain_relative(path: &Path) -> bool {
    path.components().next().is_some()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir))
}

fn default_dependency_manifest() -> String {
    "requirements.txt".to_string()
}

fn default_output_keys() -> Vec<String> {
    vec![
        INTAKE_URL_OUTPUT.to_string(),
        DASHBOARD_URL_OUTPUT.to_string(),
    ]
}

fn default_endpoint_output() -> String {
    INTAKE_URL_OUTPUT.to_string()
}

fn default_capabilities() -> Vec<String> {
    DEFAULT_CAPABILITIES.iter().map(|c| c.to_string()).collect()
}
