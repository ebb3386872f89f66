use dialoguer::{Input, Password};
use lexflow_deploy_core::prompt::ParameterSource;
use lexflow_deploy_core::DeployError;

/// Prompts the operator on the terminal. Empty answers are accepted.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalParameterSource;

impl TerminalParameterSource {
    fn ask(prompt: &str) -> Result<String, DeployError> {
        Input::<String>::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .map_err(input_error)
    }
}

impl ParameterSource for TerminalParameterSource {
    fn secret_value(&self, secret_name: &str) -> Result<String, DeployError> {
        Password::new()
            .with_prompt(format!("Value for secret {secret_name}"))
            .allow_empty_password(true)
            .interact()
            .map_err(input_error)
    }

    fn attorney_email(&self) -> Result<String, DeployError> {
        Self::ask("Attorney email (receives new-case alerts)")
    }

    fn from_email(&self) -> Result<String, DeployError> {
        Self::ask("Sender email (verified SES identity)")
    }
}

fn input_error(error: dialoguer::Error) -> DeployError {
    DeployError::Input(std::io::Error::other(error))
}
