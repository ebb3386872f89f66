use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use lexflow_deploy_core::contract::{
    DeployManifest, DEFAULT_ARTIFACT_DIR, DEFAULT_ENDPOINT_FILE, DEFAULT_REGION,
    DEFAULT_SECRET_NAME, DEFAULT_STACK_NAME, DEFAULT_TEMPLATE_PATH, MAX_DIRECT_UPLOAD_BYTES,
};
use lexflow_deploy_core::prompt::PartialRunParameters;
use lexflow_deploy_core::wait::WaitPolicy;
use lexflow_deploy_core::{DeployError, RunConfig};

#[derive(Debug, Parser)]
#[command(
    name = "lexflow-deploy",
    about = "Deploy the LexFlow intake and dashboard functions",
    long_about = "Provisions the API key secret, deploys the CloudFormation stack,\n\
                  packages and uploads both Lambda functions, and reports the\n\
                  resulting endpoints."
)]
pub struct Cli {
    #[arg(long, env = "AWS_REGION", default_value = DEFAULT_REGION)]
    pub region: String,

    #[arg(long, env = "LEXFLOW_STACK_NAME", default_value = DEFAULT_STACK_NAME)]
    pub stack_name: String,

    /// Receives new-case alerts; prompted for when absent
    #[arg(long, env = "LEXFLOW_ATTORNEY_EMAIL")]
    pub attorney_email: Option<String>,

    /// Verified sender address; prompted for when absent
    #[arg(long, env = "LEXFLOW_FROM_EMAIL")]
    pub from_email: Option<String>,

    #[arg(long, env = "LEXFLOW_SECRET_NAME", default_value = DEFAULT_SECRET_NAME)]
    pub secret_name: String,

    #[arg(long, default_value = DEFAULT_TEMPLATE_PATH)]
    pub template: PathBuf,

    /// S3 bucket for templates too large to send inline
    #[arg(long, env = "LEXFLOW_TEMPLATE_BUCKET")]
    pub template_bucket: Option<String>,

    /// JSON deploy manifest; defaults describe the LexFlow functions
    #[arg(long)]
    pub manifest: Option<PathBuf>,

    /// Directory the function source directories are relative to
    #[arg(long, default_value = ".")]
    pub project_root: PathBuf,

    #[arg(long, default_value = DEFAULT_ARTIFACT_DIR)]
    pub artifact_dir: PathBuf,

    #[arg(long, default_value = DEFAULT_ENDPOINT_FILE)]
    pub endpoint_file: PathBuf,

    /// Largest archive accepted for a direct code upload
    #[arg(long, default_value_t = MAX_DIRECT_UPLOAD_BYTES)]
    pub max_archive_bytes: u64,

    #[arg(long, default_value_t = 1800)]
    pub stack_timeout_secs: u64,

    #[arg(long, default_value_t = 5)]
    pub poll_interval_secs: u64,

    #[arg(long, env = "LEXFLOW_PYTHON", default_value = "python3")]
    pub python: String,

    /// Wheel platform for pip, e.g. manylinux2014_x86_64
    #[arg(long, env = "LEXFLOW_PIP_PLATFORM")]
    pub pip_platform: Option<String>,

    /// Build the archives into the artifact directory and stop
    #[arg(long)]
    pub package_only: bool,
}

impl Cli {
    pub fn partial_parameters(&self) -> PartialRunParameters {
        PartialRunParameters {
            region: self.region.clone(),
            stack_name: self.stack_name.clone(),
            attorney_email: self.attorney_email.clone(),
            from_email: self.from_email.clone(),
        }
    }

    pub fn run_config(&self) -> Result<RunConfig, DeployError> {
        let manifest = match &self.manifest {
            Some(path) => DeployManifest::load(path)?,
            None => DeployManifest::default(),
        };

        Ok(RunConfig {
            secret_name: self.secret_name.clone(),
            template_path: self.template.clone(),
            project_root: self.project_root.clone(),
            manifest,
            artifact_dir: Some(self.artifact_dir.clone()),
            endpoint_file: self.endpoint_file.clone(),
            max_archive_bytes: self.max_archive_bytes,
        })
    }

    pub fn stack_wait_policy(&self) -> WaitPolicy {
        WaitPolicy {
            max_wait: Duration::from_secs(self.stack_timeout_secs),
            poll_interval: Duration::from_secs(self.poll_interval_secs.max(1)),
        }
    }
}
