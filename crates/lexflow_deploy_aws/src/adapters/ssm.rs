use aws_sdk_ssm::error::DisplayErrorContext;
use aws_sdk_ssm::types::ParameterType;
use lexflow_deploy_core::remote::SecretStore;
use lexflow_deploy_core::DeployError;

use super::block_on;

/// Secret store backed by SSM Parameter Store.
pub struct SsmSecretStore {
    client: aws_sdk_ssm::Client,
}

impl SsmSecretStore {
    pub fn new(client: aws_sdk_ssm::Client) -> Self {
        Self { client }
    }
}

impl SecretStore for SsmSecretStore {
    fn exists(&self, name: &str) -> Result<bool, DeployError> {
        let client = self.client.clone();
        let parameter_name = name.to_string();

        block_on(async move {
            match client
                .get_parameter()
                .name(parameter_name)
                .with_decryption(false)
                .send()
                .await
            {
                Ok(_) => Ok(true),
                Err(error)
                    if error
                        .as_service_error()
                        .is_some_and(|service| service.is_parameter_not_found()) =>
                {
                    Ok(false)
                }
                Err(error) => Err(DeployError::Remote(format!(
                    "failed to look up secret: {}",
                    DisplayErrorContext(&error)
                ))),
            }
        })
    }

    fn create(&self, name: &str, value: &str, encrypted: bool) -> Result<(), DeployError> {
        let client = self.client.clone();
        let parameter_name = name.to_string();
        let parameter_value = value.to_string();
        let parameter_type = if encrypted {
            ParameterType::SecureString
        } else {
            ParameterType::String
        };

        block_on(async move {
            client
                .put_parameter()
                .name(parameter_name)
                .value(parameter_value)
                .r#type(parameter_type)
                .overwrite(false)
                .description("LexFlow intake classifier API key")
                .send()
                .await
                .map(|_| ())
                .map_err(|error| {
                    DeployError::Remote(format!(
                        "failed to create secret: {}",
                        DisplayErrorContext(&error)
                    ))
                })
        })
    }
}
