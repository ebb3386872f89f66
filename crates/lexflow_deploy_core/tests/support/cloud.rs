use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use lexflow_deploy_core::remote::{
    DependencyInstaller, DeploymentService, InfrastructureEngine, SecretStore, StackDeployRequest,
};
use lexflow_deploy_core::stack::StackStatus;
use lexflow_deploy_core::DeployError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    SecretExists(String),
    SecretCreate { name: String, encrypted: bool },
    StackDeploy(String),
    InstallDependencies(String),
    UpdateCode { function_name: String, size: usize },
    DescribeOutputs(String),
}

/// In-memory stand-in for the secret store, stack engine, function service
/// and package installer, sharing one ordered call log.
pub struct FakeCloud {
    calls: Mutex<Vec<Call>>,
    secrets: Mutex<BTreeMap<String, String>>,
    live_stack: Mutex<Option<StackDeployRequest>>,
    live_code: Mutex<BTreeMap<String, Vec<u8>>>,
    functions: BTreeSet<String>,
    outputs: BTreeMap<String, String>,
    stack_failure: Option<StackStatus>,
    secret_store_down: bool,
}

impl FakeCloud {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            secrets: Mutex::new(BTreeMap::new()),
            live_stack: Mutex::new(None),
            live_code: Mutex::new(BTreeMap::new()),
            functions: BTreeSet::from([
                "lexflow-intake".to_string(),
                "lexflow-dashboard".to_string(),
            ]),
            outputs: BTreeMap::from([
                (
                    "IntakeApiUrl".to_string(),
                    "https://abc123.execute-api.us-east-1.amazonaws.com/intake".to_string(),
                ),
                (
                    "DashboardUrl".to_string(),
                    "https://abc123.execute-api.us-east-1.amazonaws.com/dashboard".to_string(),
                ),
            ]),
            stack_failure: None,
            secret_store_down: false,
        }
    }

    pub fn with_stack_failure(mut self, status: &str, reason: &str) -> Self {
        self.stack_failure = Some(StackStatus::Failed {
            status: status.to_string(),
            reason: reason.to_string(),
        });
        self
    }

    pub fn with_outputs(mut self, outputs: &[(&str, &str)]) -> Self {
        self.outputs = outputs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        self
    }

    pub fn without_function(mut self, function_name: &str) -> Self {
        self.functions.remove(function_name);
        self
    }

    pub fn with_secret_store_down(mut self) -> Self {
        self.secret_store_down = true;
        self
    }

    pub fn with_secret(self, name: &str, value: &str) -> Self {
        self.secrets
            .lock()
            .expect("poisoned mutex")
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().expect("poisoned mutex").clone()
    }

    pub fn secret(&self, name: &str) -> Option<String> {
        self.secrets.lock().expect("poisoned mutex").get(name).cloned()
    }

    pub fn live_code(&self, function_name: &str) -> Option<Vec<u8>> {
        self.live_code
            .lock()
            .expect("poisoned mutex")
            .get(function_name)
            .cloned()
    }

    pub fn count(&self, predicate: impl Fn(&Call) -> bool) -> usize {
        self.calls().iter().filter(|call| predicate(call)).count()
    }

    fn record(&self, call: Call) {
        self.calls.lock().expect("poisoned mutex").push(call);
    }
}

impl SecretStore for FakeCloud {
    fn exists(&self, name: &str) -> Result<bool, DeployError> {
        self.record(Call::SecretExists(name.to_string()));
        if self.secret_store_down {
            return Err(DeployError::Remote(
                "dispatch failure: could not reach ssm.us-east-1.amazonaws.com".to_string(),
            ));
        }
        Ok(self.secrets.lock().expect("poisoned mutex").contains_key(name))
    }

    fn create(&self, name: &str, value: &str, encrypted: bool) -> Result<(), DeployError> {
        self.record(Call::SecretCreate {
            name: name.to_string(),
            encrypted,
        });
        let mut secrets = self.secrets.lock().expect("poisoned mutex");
        if secrets.contains_key(name) {
            return Err(DeployError::Remote(format!(
                "ParameterAlreadyExists: {name}"
            )));
        }
        secrets.insert(name.to_string(), value.to_string());
        Ok(())
    }
}

impl InfrastructureEngine for FakeCloud {
    fn deploy(&self, request: &StackDeployRequest) -> Result<StackStatus, DeployError> {
        self.record(Call::StackDeploy(request.stack_name.clone()));
        if let Some(failure) = &self.stack_failure {
            return Ok(failure.clone());
        }

        let mut live = self.live_stack.lock().expect("poisoned mutex");
        let status = match live.as_ref() {
            None => StackStatus::Succeeded("CREATE_COMPLETE".to_string()),
            Some(current) if current == request => StackStatus::NoChanges,
            Some(_) => StackStatus::Succeeded("UPDATE_COMPLETE".to_string()),
        };
        *live = Some(request.clone());
        Ok(status)
    }

    fn describe_outputs(&self, stack_name: &str) -> Result<BTreeMap<String, String>, DeployError> {
        self.record(Call::DescribeOutputs(stack_name.to_string()));
        if self.live_stack.lock().expect("poisoned mutex").is_none() {
            return Err(DeployError::Remote(format!(
                "Stack with id {stack_name} does not exist"
            )));
        }
        Ok(self.outputs.clone())
    }
}

impl DeploymentService for FakeCloud {
    fn update_code(&self, function_name: &str, archive: &[u8]) -> Result<u64, DeployError> {
        self.record(Call::UpdateCode {
            function_name: function_name.to_string(),
            size: archive.len(),
        });
        let stack_live = self.live_stack.lock().expect("poisoned mutex").is_some();
        if !stack_live || !self.functions.contains(function_name) {
            return Err(DeployError::UnitNotFound {
                function_name: function_name.to_string(),
            });
        }
        self.live_code
            .lock()
            .expect("poisoned mutex")
            .insert(function_name.to_string(), archive.to_vec());
        Ok(archive.len() as u64)
    }
}

impl DependencyInstaller for FakeCloud {
    fn install(&self, manifest: &Path, target_dir: &Path) -> Result<(), String> {
        self.record(Call::InstallDependencies(manifest.display().to_string()));
        let package = target_dir.join("boto3_stub");
        fs::create_dir_all(&package).map_err(|error| error.to_string())?;
        fs::write(package.join("__init__.py"), b"").map_err(|error| error.to_string())?;
        let metadata = target_dir.join("boto3_stub-1.0.dist-info");
        fs::create_dir_all(&metadata).map_err(|error| error.to_string())?;
        fs::write(metadata.join("METADATA"), b"Name: boto3_stub").map_err(|error| error.to_string())
    }
}
