//! The deploy run as a forward-only state machine.
//!
//! `TRANSITIONS` is the whole control flow: each row names the state a step
//! starts from, the step, and the state it lands in on success. Any step error
//! moves the run to `Failed` and stops it. Nothing already done is undone.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde_json::json;

use crate::artifact::{build_artifact, write_local_copy, BuiltArtifact};
use crate::contract::{DeployManifest, RunParameters};
use crate::error::{DeployError, RunFailure};
use crate::outputs::{collect_outputs, write_endpoint_file};
use crate::prompt::ParameterSource;
use crate::publish::publish;
use crate::remote::{
    DependencyInstaller, DeploymentService, InfrastructureEngine, SecretStore, StackDeployRequest,
};
use crate::secrets::ensure_secret;
use crate::stack::{deploy_stack, StackStatus};
use crate::telemetry::{log_error, log_info};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunState {
    Start,
    SecretReady,
    StackReady,
    ArtifactsBuilt,
    ArtifactsPublished,
    OutputsCollected,
    Done,
    Failed,
}

impl RunState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Start => "START",
            Self::SecretReady => "SECRET_READY",
            Self::StackReady => "STACK_READY",
            Self::ArtifactsBuilt => "ARTIFACTS_BUILT",
            Self::ArtifactsPublished => "ARTIFACTS_PUBLISHED",
            Self::OutputsCollected => "OUTPUTS_COLLECTED",
            Self::Done => "DONE",
            Self::Failed => "FAILED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Label of the step that leaves this state.
    pub fn step_label(self) -> &'static str {
        next_transition(self)
            .map(|(step, _)| step.label())
            .unwrap_or("run")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    EnsureSecret,
    DeployStack,
    BuildArtifacts,
    PublishArtifacts,
    CollectOutputs,
    Finish,
}

impl Step {
    pub fn label(self) -> &'static str {
        match self {
            Self::EnsureSecret => "ensure secret",
            Self::DeployStack => "deploy stack",
            Self::BuildArtifacts => "build artifacts",
            Self::PublishArtifacts => "publish artifacts",
            Self::CollectOutputs => "collect outputs",
            Self::Finish => "finish",
        }
    }
}

pub const TRANSITIONS: [(RunState, Step, RunState); 6] = [
    (RunState::Start, Step::EnsureSecret, RunState::SecretReady),
    (RunState::SecretReady, Step::DeployStack, RunState::StackReady),
    (RunState::StackReady, Step::BuildArtifacts, RunState::ArtifactsBuilt),
    (
        RunState::ArtifactsBuilt,
        Step::PublishArtifacts,
        RunState::ArtifactsPublished,
    ),
    (
        RunState::ArtifactsPublished,
        Step::CollectOutputs,
        RunState::OutputsCollected,
    ),
    (RunState::OutputsCollected, Step::Finish, RunState::Done),
];

pub fn next_transition(state: RunState) -> Option<(Step, RunState)> {
    TRANSITIONS
        .iter()
        .find(|(from, _, _)| *from == state)
        .map(|(_, step, to)| (*step, *to))
}

/// The collaborators a run talks to.
#[derive(Clone, Copy)]
pub struct Services<'a> {
    pub secrets: &'a dyn SecretStore,
    pub engine: &'a dyn InfrastructureEngine,
    pub deployment: &'a dyn DeploymentService,
    pub installer: &'a dyn DependencyInstaller,
    pub parameters: &'a dyn ParameterSource,
}

#[derive(Debug, Clone)]
pub struct RunConfig {
    pub secret_name: String,
    pub template_path: PathBuf,
    /// Directory the unit source dirs are relative to.
    pub project_root: PathBuf,
    pub manifest: DeployManifest,
    pub artifact_dir: Option<PathBuf>,
    pub endpoint_file: PathBuf,
    /// Upper bound on each archive; larger builds fail before any upload.
    pub max_archive_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactSummary {
    pub unit: String,
    pub function_name: String,
    pub size_bytes: u64,
    pub sha256: String,
    pub entries: Vec<String>,
    pub local_copy: Option<PathBuf>,
}

#[derive(Debug, Default)]
pub struct RunReport {
    pub trail: Vec<RunState>,
    pub secret_existed: Option<bool>,
    pub stack_status: Option<StackStatus>,
    pub artifacts: Vec<ArtifactSummary>,
    pub published: Vec<(String, u64)>,
    pub outputs: BTreeMap<String, String>,
    pub endpoint_file: Option<PathBuf>,
    pub failure: Option<RunFailure>,
}

impl RunReport {
    pub fn final_state(&self) -> RunState {
        self.trail.last().copied().unwrap_or(RunState::Start)
    }

    pub fn endpoint(&self, key: &str) -> Option<&str> {
        self.outputs
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.is_empty())
    }
}

pub struct Sequencer<'a> {
    params: &'a RunParameters,
    config: &'a RunConfig,
    services: Services<'a>,
    state: RunState,
    built: Vec<BuiltArtifact>,
    report: RunReport,
}

impl<'a> Sequencer<'a> {
    pub fn new(params: &'a RunParameters, config: &'a RunConfig, services: Services<'a>) -> Self {
        Self {
            params,
            config,
            services,
            state: RunState::Start,
            built: Vec::new(),
            report: RunReport {
                trail: vec![RunState::Start],
                ..RunReport::default()
            },
        }
    }

    /// Walks the transition table until `Done` or the first failure.
    pub fn run(mut self) -> RunReport {
        log_info(
            "sequencer",
            "run_started",
            json!({
                "region": self.params.region,
                "stack_name": self.params.stack_name,
                "units": self.config.manifest.units.iter().map(|u| &u.name).collect::<Vec<_>>(),
            }),
        );

        while let Some((step, next)) = next_transition(self.state) {
            if let Err(error) = self.execute(step) {
                log_error(
                    "sequencer",
                    "run_failed",
                    json!({
                        "state": self.state.as_str(),
                        "step": step.label(),
                        "error": error.to_string(),
                    }),
                );
                self.report.failure = Some(RunFailure {
                    state: self.state,
                    error,
                });
                self.enter(RunState::Failed);
                return self.report;
            }
            self.enter(next);
        }

        log_info(
            "sequencer",
            "run_completed",
            json!({ "stack_name": self.params.stack_name }),
        );
        self.report
    }

    fn enter(&mut self, state: RunState) {
        self.state = state;
        self.report.trail.push(state);
        log_info(
            "sequencer",
            "state_entered",
            json!({ "state": state.as_str() }),
        );
    }

    fn execute(&mut self, step: Step) -> Result<(), DeployError> {
        let config = self.config;
        let services = self.services;
        match step {
            Step::EnsureSecret => {
                let existed =
                    ensure_secret(&config.secret_name, services.secrets, services.parameters)?;
                self.report.secret_existed = Some(existed);
            }
            Step::DeployStack => {
                let request = StackDeployRequest {
                    stack_name: self.params.stack_name.clone(),
                    template_path: config.template_path.clone(),
                    capabilities: config.manifest.capabilities.clone(),
                    parameters: self
                        .params
                        .stack_parameters(&config.manifest.extra_parameters),
                };
                self.report.stack_status = Some(deploy_stack(&request, services.engine)?);
            }
            Step::BuildArtifacts => {
                for unit in &config.manifest.units {
                    let artifact = build_artifact(
                        unit,
                        &config.project_root,
                        services.installer,
                        config.max_archive_bytes,
                    )?;
                    let local_copy = match &config.artifact_dir {
                        Some(dir) => Some(write_local_copy(&artifact, dir)?),
                        None => None,
                    };
                    self.report.artifacts.push(summarize(&artifact, local_copy));
                    self.built.push(artifact);
                }
            }
            Step::PublishArtifacts => {
                for artifact in &self.built {
                    let size = publish(artifact, services.deployment)?;
                    self.report.published.push((artifact.unit.clone(), size));
                }
            }
            Step::CollectOutputs => {
                let outputs = collect_outputs(
                    &self.params.stack_name,
                    &config.manifest.output_keys,
                    services.engine,
                )?;
                let endpoint = outputs
                    .get(&config.manifest.endpoint_output)
                    .cloned()
                    .unwrap_or_default();
                write_endpoint_file(&config.endpoint_file, &endpoint)?;
                self.report.outputs = outputs;
                self.report.endpoint_file = Some(config.endpoint_file.clone());
            }
            Step::Finish => {
                self.built.clear();
            }
        }
        Ok(())
    }
}

/// Builds every unit without touching any remote service.
pub fn package_artifacts(
    config: &RunConfig,
    installer: &dyn DependencyInstaller,
) -> Result<Vec<ArtifactSummary>, RunFailure> {
    let mut summaries = Vec::with_capacity(config.manifest.units.len());
    for unit in &config.manifest.units {
        let result = build_artifact(
            unit,
            &config.project_root,
            installer,
            config.max_archive_bytes,
        )
        .and_then(|artifact| {
            let local_copy = match &config.artifact_dir {
                Some(dir) => Some(write_local_copy(&artifact, dir)?),
                None => None,
            };
            Ok(summarize(&artifact, local_copy))
        });
        match result {
            Ok(summary) => summaries.push(summary),
            Err(error) => {
                return Err(RunFailure {
                    state: RunState::StackReady,
                    error,
                })
            }
        }
    }
    Ok(summaries)
}

fn summarize(artifact: &BuiltArtifact, local_copy: Option<PathBuf>) -> ArtifactSummary {
    ArtifactSummary {
        unit: artifact.unit.clone(),
        function_name: artifact.function_name.clone(),
        size_bytes: artifact.size(),
        sha256: artifact.sha256.clone(),
        entries: artifact.entries.clone(),
        local_copy,
    }
}
