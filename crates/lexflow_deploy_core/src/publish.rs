use serde_json::json;

use crate::artifact::BuiltArtifact;
use crate::error::DeployError;
use crate::remote::DeploymentService;
use crate::telemetry::log_info;

/// Uploads the archive as the new live code of its function.
///
/// Always performs the upload, even when the bytes are unchanged. The size the
/// service records must match what was sent.
pub fn publish(
    artifact: &BuiltArtifact,
    service: &dyn DeploymentService,
) -> Result<u64, DeployError> {
    let expected = artifact.size();
    let reported = service.update_code(&artifact.function_name, &artifact.bytes)?;
    if reported != expected {
        return Err(DeployError::SizeMismatch {
            function_name: artifact.function_name.clone(),
            expected,
            reported,
        });
    }

    log_info(
        "artifact_publisher",
        "artifact_published",
        json!({
            "unit": artifact.unit,
            "function_name": artifact.function_name,
            "size_bytes": reported,
            "sha256": artifact.sha256,
        }),
    );
    Ok(reported)
}
