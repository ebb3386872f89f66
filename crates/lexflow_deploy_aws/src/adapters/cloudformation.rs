use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use aws_sdk_cloudformation::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_cloudformation::types::{Capability, Parameter, Stack};
use aws_sdk_s3::primitives::ByteStream;
use lexflow_deploy_core::contract::MAX_INLINE_TEMPLATE_BYTES;
use lexflow_deploy_core::remote::{InfrastructureEngine, StackDeployRequest};
use lexflow_deploy_core::stack::StackStatus;
use lexflow_deploy_core::telemetry::log_info;
use lexflow_deploy_core::wait::{poll_until, PollOutcome, WaitPolicy};
use lexflow_deploy_core::DeployError;
use serde_json::json;

use super::block_on;

const NO_UPDATES_MESSAGE: &str = "No updates are to be performed";

#[derive(Debug, Clone, PartialEq, Eq)]
enum TemplateSource {
    Body(String),
    Url(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SubmitAction {
    Create,
    Update,
}

/// Infrastructure engine backed by CloudFormation.
pub struct CloudFormationEngine {
    client: aws_sdk_cloudformation::Client,
    s3_client: aws_sdk_s3::Client,
    region: String,
    template_bucket: Option<String>,
    wait_policy: WaitPolicy,
}

impl CloudFormationEngine {
    pub fn new(
        client: aws_sdk_cloudformation::Client,
        s3_client: aws_sdk_s3::Client,
        region: impl Into<String>,
        template_bucket: Option<String>,
        wait_policy: WaitPolicy,
    ) -> Self {
        Self {
            client,
            s3_client,
            region: region.into(),
            template_bucket,
            wait_policy,
        }
    }

    fn template_source(&self, stack_name: &str, path: &Path) -> Result<TemplateSource, DeployError> {
        let body = std::fs::read_to_string(path)
            .map_err(|error| DeployError::io("failed to read template", path, error))?;
        let size = body.len() as u64;
        let Some(bucket) = staging_bucket(path, size, self.template_bucket.as_deref())? else {
            return Ok(TemplateSource::Body(body));
        };

        let key = template_object_key(stack_name);
        let client = self.s3_client.clone();
        let object_key = key.clone();
        let target_bucket = bucket.to_string();
        block_on(async move {
            client
                .put_object()
                .bucket(target_bucket)
                .key(object_key)
                .body(ByteStream::from(body.into_bytes()))
                .send()
                .await
                .map(|_| ())
                .map_err(|error| {
                    DeployError::Remote(format!(
                        "failed to upload template to s3: {}",
                        DisplayErrorContext(&error)
                    ))
                })
        })?;

        Ok(TemplateSource::Url(template_url(bucket, &self.region, &key)))
    }

    /// Describes the live stack, or `None` when it does not exist.
    fn current_stack(&self, stack_name: &str) -> Result<Option<Stack>, DeployError> {
        let client = self.client.clone();
        let name = stack_name.to_string();

        block_on(async move {
            match client.describe_stacks().stack_name(name).send().await {
                Ok(output) => Ok(output.stacks().first().cloned()),
                Err(error)
                    if error
                        .as_service_error()
                        .and_then(|service| service.message())
                        .is_some_and(|message| message.contains("does not exist")) =>
                {
                    Ok(None)
                }
                Err(error) => Err(DeployError::Remote(format!(
                    "failed to describe stack: {}",
                    DisplayErrorContext(&error)
                ))),
            }
        })
    }

    fn submit(
        &self,
        action: SubmitAction,
        request: &StackDeployRequest,
        template: TemplateSource,
    ) -> Result<bool, DeployError> {
        let client = self.client.clone();
        let stack_name = request.stack_name.clone();
        let capabilities: Vec<Capability> = request
            .capabilities
            .iter()
            .map(|capability| Capability::from(capability.as_str()))
            .collect();
        let parameters: Vec<Parameter> = request
            .parameters
            .iter()
            .map(|(key, value)| {
                Parameter::builder()
                    .parameter_key(key)
                    .parameter_value(value)
                    .build()
            })
            .collect();
        let (body, url) = match template {
            TemplateSource::Body(body) => (Some(body), None),
            TemplateSource::Url(url) => (None, Some(url)),
        };

        block_on(async move {
            let result = match action {
                SubmitAction::Create => client
                    .create_stack()
                    .stack_name(stack_name)
                    .set_template_body(body)
                    .set_template_url(url)
                    .set_capabilities(Some(capabilities))
                    .set_parameters(Some(parameters))
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(submit_failure),
                SubmitAction::Update => client
                    .update_stack()
                    .stack_name(stack_name)
                    .set_template_body(body)
                    .set_template_url(url)
                    .set_capabilities(Some(capabilities))
                    .set_parameters(Some(parameters))
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(submit_failure),
            };

            match result {
                Ok(()) => Ok(true),
                Err((Some(message), _)) if message.contains(NO_UPDATES_MESSAGE) => Ok(false),
                Err((_, context)) => Err(DeployError::Remote(format!(
                    "failed to submit stack: {context}"
                ))),
            }
        })
    }

    fn wait_for_terminal(&self, stack_name: &str) -> Result<StackStatus, DeployError> {
        let target = format!("stack {stack_name}");
        let sleep = |interval: Duration| block_on(tokio::time::sleep(interval));
        poll_until(&target, &self.wait_policy, &sleep, || {
            let stack = self
                .current_stack(stack_name)?
                .ok_or_else(|| DeployError::Remote(format!("stack {stack_name} disappeared")))?;
            let status = stack
                .stack_status()
                .map(|status| status.as_str().to_string())
                .unwrap_or_default();
            let classified = StackStatus::classify(&status, stack.stack_status_reason());
            if classified.is_terminal() {
                Ok(PollOutcome::Ready(classified))
            } else {
                log_info(
                    "stack_deployer",
                    "stack_polled",
                    json!({ "stack_name": stack_name, "status": status }),
                );
                Ok(PollOutcome::Pending)
            }
        })
    }
}

impl InfrastructureEngine for CloudFormationEngine {
    fn deploy(&self, request: &StackDeployRequest) -> Result<StackStatus, DeployError> {
        let current = self
            .current_stack(&request.stack_name)?
            .and_then(|stack| stack.stack_status().map(|status| status.as_str().to_string()));
        let action = submit_action(&request.stack_name, current.as_deref())?;

        let template = self.template_source(&request.stack_name, &request.template_path)?;
        if !self.submit(action, request, template)? {
            return Ok(StackStatus::NoChanges);
        }
        self.wait_for_terminal(&request.stack_name)
    }

    fn describe_outputs(&self, stack_name: &str) -> Result<BTreeMap<String, String>, DeployError> {
        let stack = self
            .current_stack(stack_name)?
            .ok_or_else(|| DeployError::Remote(format!("stack {stack_name} does not exist")))?;

        Ok(stack
            .outputs()
            .iter()
            .filter_map(|output| {
                Some((
                    output.output_key()?.to_string(),
                    output.output_value().unwrap_or_default().to_string(),
                ))
            })
            .collect())
    }
}

/// Splits an SDK failure into the service message and the full error chain.
fn submit_failure<E, R>(error: SdkError<E, R>) -> (Option<String>, String)
where
    E: ProvideErrorMetadata + std::error::Error + 'static,
    R: std::fmt::Debug,
{
    let message = error
        .as_service_error()
        .and_then(|service| service.message())
        .map(str::to_string);
    (message, DisplayErrorContext(&error).to_string())
}

/// A stack only known through a pending change set (`REVIEW_IN_PROGRESS`)
/// already owns its name, so it is a conflict like any other in-progress state.
fn submit_action(stack_name: &str, current: Option<&str>) -> Result<SubmitAction, DeployError> {
    match current {
        None => Ok(SubmitAction::Create),
        Some(status) if status == "ROLLBACK_COMPLETE" || status.ends_with("_IN_PROGRESS") => {
            Err(DeployError::StackStateConflict {
                stack_name: stack_name.to_string(),
                status: status.to_string(),
            })
        }
        Some(_) => Ok(SubmitAction::Update),
    }
}

/// Picks where a template of `size` bytes travels: `None` to send it inline,
/// or the bucket to stage it in.
fn staging_bucket<'a>(
    path: &Path,
    size: u64,
    bucket: Option<&'a str>,
) -> Result<Option<&'a str>, DeployError> {
    if size <= MAX_INLINE_TEMPLATE_BYTES {
        return Ok(None);
    }
    match bucket {
        Some(bucket) => Ok(Some(bucket)),
        None => Err(DeployError::TemplateTooLarge {
            path: path.to_path_buf(),
            size,
            limit: MAX_INLINE_TEMPLATE_BYTES,
        }),
    }
}

fn template_object_key(stack_name: &str) -> String {
    format!("{stack_name}/template.yaml")
}

fn template_url(bucket: &str, region: &str, key: &str) -> String {
    format!("https://{bucket}.s3.{region}.amazonaws.com/{key}")
}
