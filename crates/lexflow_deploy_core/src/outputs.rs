use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde_json::json;

use crate::error::DeployError;
use crate::remote::InfrastructureEngine;
use crate::telemetry::{log_info, log_warn};

/// Looks up `keys` on the live stack. Absent keys come back empty.
pub fn collect_outputs(
    stack_name: &str,
    keys: &[String],
    engine: &dyn InfrastructureEngine,
) -> Result<BTreeMap<String, String>, DeployError> {
    let live = engine.describe_outputs(stack_name)?;

    let mut collected = BTreeMap::new();
    for key in keys {
        let value = match live.get(key) {
            Some(value) => value.clone(),
            None => {
                log_warn(
                    "output_collector",
                    "output_missing",
                    json!({ "stack_name": stack_name, "key": key }),
                );
                String::new()
            }
        };
        collected.insert(key.clone(), value);
    }
    Ok(collected)
}

/// Overwrites `path` with `value` and a trailing newline.
pub fn write_endpoint_file(path: &Path, value: &str) -> Result<(), DeployError> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|error| DeployError::io("failed to create endpoint directory", parent, error))?;
    }
    fs::write(path, format!("{value}\n"))
        .map_err(|error| DeployError::io("failed to write endpoint file", path, error))?;
    log_info(
        "output_collector",
        "endpoint_written",
        json!({ "path": path.display().to_string(), "empty": value.is_empty() }),
    );
    Ok(())
}
