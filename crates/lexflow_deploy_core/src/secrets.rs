use serde_json::json;

use crate::error::DeployError;
use crate::prompt::ParameterSource;
use crate::remote::SecretStore;
use crate::telemetry::log_info;

/// Ensures `name` is bound in the secret store.
///
/// Returns `true` when the secret was already there. Otherwise asks the
/// parameter source for a value and stores it encrypted. An empty answer is
/// stored as-is. Two operators running at once can both see the secret as
/// absent; the second create then fails with the store's error.
pub fn ensure_secret(
    name: &str,
    store: &dyn SecretStore,
    source: &dyn ParameterSource,
) -> Result<bool, DeployError> {
    if store.exists(name)? {
        log_info("secret_provisioner", "secret_exists", json!({ "name": name }));
        return Ok(true);
    }

    let value = source.secret_value(name)?;
    store.create(name, &value, true)?;
    log_info(
        "secret_provisioner",
        "secret_created",
        json!({ "name": name, "encrypted": true }),
    );
    Ok(false)
}
