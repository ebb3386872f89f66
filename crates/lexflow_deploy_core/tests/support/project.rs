use std::fs;

use lexflow_deploy_core::contract::{DeployManifest, RunParameters, MAX_DIRECT_UPLOAD_BYTES};
use lexflow_deploy_core::RunConfig;
use tempfile::TempDir;

pub const SECRET_NAME: &str = "/lexflow/anthropic-api-key";

/// A scratch project tree laid out the way the default manifest expects.
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let files: [(&str, &str); 10] = [
            ("lexflow-intake/handler.py", "def lambda_handler(event, context):\n    pass\n"),
            ("lexflow-intake/ai_classifier.py", "def classify():\n    pass\n"),
            ("lexflow-intake/prompt.py", "SYSTEM_PROMPT = ''\n"),
            ("lexflow-intake/emailer.py", "def send_client_ack():\n    pass\n"),
            ("lexflow-intake/db.py", "def put_item():\n    pass\n"),
            ("lexflow-intake/requirements.txt", "anthropic\nboto3\n"),
            ("lexflow-dashboard/handler.py", "def lambda_handler(event, context):\n    pass\n"),
            ("lexflow-dashboard/db.py", "def scan_all():\n    pass\n"),
            ("lexflow-dashboard/requirements.txt", "boto3\n"),
            ("template.yaml", "AWSTemplateFormatVersion: '2010-09-09'\n"),
        ];
        for (relative, body) in files {
            let path = dir.path().join(relative);
            fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
            fs::write(path, body).expect("write fixture");
        }
        Self { dir }
    }

    pub fn config(&self) -> RunConfig {
        RunConfig {
            secret_name: SECRET_NAME.to_string(),
            template_path: self.dir.path().join("template.yaml"),
            project_root: self.dir.path().to_path_buf(),
            manifest: DeployManifest::default(),
            artifact_dir: Some(self.dir.path().join("dist")),
            endpoint_file: self.dir.path().join("api_endpoint.txt"),
            max_archive_bytes: MAX_DIRECT_UPLOAD_BYTES,
        }
    }

    pub fn remove(&self, relative: &str) {
        fs::remove_file(self.dir.path().join(relative)).expect("remove fixture");
    }

    pub fn endpoint_file(&self) -> String {
        fs::read_to_string(self.dir.path().join("api_endpoint.txt")).expect("endpoint file")
    }
}

pub fn run_parameters() -> RunParameters {
    RunParameters {
        region: "us-east-1".to_string(),
        stack_name: "lexflow".to_string(),
        attorney_email: "a@x.com".to_string(),
        from_email: "b@x.com".to_string(),
    }
}
