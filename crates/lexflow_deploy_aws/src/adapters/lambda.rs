use std::time::Duration;

use aws_sdk_lambda::error::DisplayErrorContext;
use aws_sdk_lambda::primitives::Blob;
use aws_sdk_lambda::types::LastUpdateStatus;
use lexflow_deploy_core::remote::DeploymentService;
use lexflow_deploy_core::wait::{poll_until, PollOutcome, WaitPolicy};
use lexflow_deploy_core::DeployError;

use super::block_on;

/// Deployment service backed by Lambda `UpdateFunctionCode`.
pub struct LambdaDeploymentService {
    client: aws_sdk_lambda::Client,
    wait_policy: WaitPolicy,
}

impl LambdaDeploymentService {
    pub fn new(client: aws_sdk_lambda::Client, wait_policy: WaitPolicy) -> Self {
        Self {
            client,
            wait_policy,
        }
    }

    fn wait_until_updated(&self, function_name: &str) -> Result<(), DeployError> {
        let target = format!("function {function_name} to finish updating");
        let sleep = |interval: Duration| block_on(tokio::time::sleep(interval));
        poll_until(&target, &self.wait_policy, &sleep, || {
            let client = self.client.clone();
            let name = function_name.to_string();
            let configuration = block_on(async move {
                client
                    .get_function_configuration()
                    .function_name(name)
                    .send()
                    .await
                    .map_err(|error| {
                        DeployError::Remote(format!(
                            "failed to read function configuration: {}",
                            DisplayErrorContext(&error)
                        ))
                    })
            })?;

            update_progress(
                function_name,
                configuration.last_update_status(),
                configuration.last_update_status_reason(),
            )
        })
    }
}

impl DeploymentService for LambdaDeploymentService {
    fn update_code(&self, function_name: &str, archive: &[u8]) -> Result<u64, DeployError> {
        let client = self.client.clone();
        let name = function_name.to_string();
        let zip_file = Blob::new(archive.to_vec());

        let output = block_on(async move {
            client
                .update_function_code()
                .function_name(name)
                .zip_file(zip_file)
                .send()
                .await
        })
        .map_err(|error| {
            if error
                .as_service_error()
                .is_some_and(|service| service.is_resource_not_found_exception())
            {
                DeployError::UnitNotFound {
                    function_name: function_name.to_string(),
                }
            } else {
                DeployError::Remote(format!(
                    "failed to update function code: {}",
                    DisplayErrorContext(&error)
                ))
            }
        })?;

        self.wait_until_updated(function_name)?;
        Ok(u64::try_from(output.code_size()).unwrap_or_default())
    }
}

fn update_progress(
    function_name: &str,
    status: Option<&LastUpdateStatus>,
    reason: Option<&str>,
) -> Result<PollOutcome<()>, DeployError> {
    match status {
        Some(LastUpdateStatus::InProgress) => Ok(PollOutcome::Pending),
        Some(LastUpdateStatus::Failed) => Err(DeployError::UnitUpdateFailed {
            function_name: function_name.to_string(),
            reason: reason.unwrap_or("no reason reported").to_string(),
        }),
        _ => Ok(PollOutcome::Ready(())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_progress_update_keeps_waiting() {
        let outcome = update_progress("lexflow-intake", Some(&LastUpdateStatus::InProgress), None)
            .expect("pending is not an error");
        assert!(matches!(outcome, PollOutcome::Pending));
    }

    #[test]
    fn successful_or_unreported_update_is_ready() {
        for status in [Some(&LastUpdateStatus::Successful), None] {
            let outcome = update_progress("lexflow-intake", status, None).expect("ready");
            assert!(matches!(outcome, PollOutcome::Ready(())));
        }
    }

    #[test]
    fn failed_update_surfaces_reason() {
        let error = update_progress(
            "lexflow-intake",
            Some(&LastUpdateStatus::Failed),
            Some("Unzipped size must be smaller than 262144000 bytes"),
        )
        .err()
        .expect("failed update is fatal");
        assert!(error.to_string().contains("262144000"));
        assert!(error.to_string().contains("lexflow-intake"));
    }
}
