use std::fmt;

use crate::contract::{RunParameters, DASHBOARD_URL_OUTPUT};
use crate::sequencer::RunReport;

const SAMPLE_INTAKE: &str = r#"{"name": "Jane Doe", "email": "jane@example.com", "phone": "555-0100", "incident_date": "2024-01-15", "prior_attorney": false, "description": "I was rear-ended at a red light and have ongoing back pain."}"#;

/// Human-readable report printed after a successful run.
pub fn render_summary(params: &RunParameters, report: &RunReport, endpoint_key: &str) -> String {
    Summary {
        params,
        report,
        endpoint_key,
    }
    .to_string()
}

struct Summary<'a> {
    params: &'a RunParameters,
    report: &'a RunReport,
    endpoint_key: &'a str,
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self {
            params,
            report,
            endpoint_key,
        } = self;

        writeln!(f, "\nDeployment complete")?;
        writeln!(f, "  stack:   {} ({})", params.stack_name, params.region)?;
        if let Some(status) = &report.stack_status {
            writeln!(f, "  status:  {}", status.as_str())?;
        }

        writeln!(f, "\nPublished units:")?;
        for (unit, size) in &report.published {
            writeln!(f, "  {unit:<12} {size} bytes")?;
        }

        writeln!(f, "\nStack outputs:")?;
        for (key, value) in &report.outputs {
            let shown = if value.is_empty() { "(missing)" } else { value };
            writeln!(f, "  {key:<14} {shown}")?;
        }

        writeln!(f, "\nNotifications:")?;
        writeln!(f, "  attorney alerts to: {}", params.attorney_email)?;
        writeln!(f, "  sent from:          {}", params.from_email)?;
        writeln!(
            f,
            "  (both addresses must be verified in SES before mail is delivered)"
        )?;

        if let Some(path) = &report.endpoint_file {
            writeln!(f, "\nEndpoint written to {}", path.display())?;
        }

        writeln!(f, "\nNext steps:")?;
        match report.endpoint(endpoint_key) {
            Some(url) => {
                writeln!(f, "  Submit a test intake:")?;
                writeln!(
                    f,
                    "    curl -X POST '{url}' -H 'Content-Type: application/json' -d '{SAMPLE_INTAKE}'"
                )?;
            }
            None => writeln!(
                f,
                "  {endpoint_key} was not reported by the stack; check the template outputs."
            )?,
        }
        if let Some(url) = report.endpoint(DASHBOARD_URL_OUTPUT) {
            writeln!(f, "  Open the dashboard: {url}")?;
        }
        Ok(())
    }
}
