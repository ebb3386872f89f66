use crate::contract::RunParameters;
use crate::error::DeployError;

/// Where operator-supplied values come from.
///
/// The binary prompts on the terminal; tests hand in literals.
pub trait ParameterSource {
    fn secret_value(&self, secret_name: &str) -> Result<String, DeployError>;
    fn attorney_email(&self) -> Result<String, DeployError>;
    fn from_email(&self) -> Result<String, DeployError>;
}

#[derive(Debug, Clone)]
pub struct LiteralParameterSource {
    secret_value: String,
    attorney_email: String,
    from_email: String,
}

impl LiteralParameterSource {
    pub fn new(
        secret_value: impl Into<String>,
        attorney_email: impl Into<String>,
        from_email: impl Into<String>,
    ) -> Self {
        Self {
            secret_value: secret_value.into(),
            attorney_email: attorney_email.into(),
            from_email: from_email.into(),
        }
    }
}

impl ParameterSource for LiteralParameterSource {
    fn secret_value(&self, _secret_name: &str) -> Result<String, DeployError> {
        Ok(self.secret_value.clone())
    }

    fn attorney_email(&self) -> Result<String, DeployError> {
        Ok(self.attorney_email.clone())
    }

    fn from_email(&self) -> Result<String, DeployError> {
        Ok(self.from_email.clone())
    }
}

/// Run parameters as given on the command line, before prompting.
#[derive(Debug, Clone, Default)]
pub struct PartialRunParameters {
    pub region: String,
    pub stack_name: String,
    pub attorney_email: Option<String>,
    pub from_email: Option<String>,
}

/// Fills any missing email from the parameter source. Values are not validated.
pub fn resolve_run_parameters(
    partial: PartialRunParameters,
    source: &dyn ParameterSource,
) -> Result<RunParameters, DeployError> {
    let attorney_email = match partial.attorney_email {
        Some(value) => value,
        None => source.attorney_email()?,
    };
    let from_email = match partial.from_email {
        Some(value) => value,
        None => source.from_email()?,
    };

    Ok(RunParameters {
        region: partial.region,
        stack_name: partial.stack_name,
        attorney_email,
        from_email,
    })
}
