use std::process::ExitCode;

use aws_config::{BehaviorVersion, Region};
use clap::Parser;
use lexflow_deploy_aws::adapters::cloudformation::CloudFormationEngine;
use lexflow_deploy_aws::adapters::lambda::LambdaDeploymentService;
use lexflow_deploy_aws::adapters::pip::PipInstaller;
use lexflow_deploy_aws::adapters::ssm::SsmSecretStore;
use lexflow_deploy_aws::cli::Cli;
use lexflow_deploy_aws::terminal::TerminalParameterSource;
use lexflow_deploy_core::prompt::resolve_run_parameters;
use lexflow_deploy_core::sequencer::package_artifacts;
use lexflow_deploy_core::summary::render_summary;
use lexflow_deploy_core::wait::WaitPolicy;
use lexflow_deploy_core::{RunConfig, Sequencer, Services};

fn package_only(config: &RunConfig, installer: &PipInstaller) -> ExitCode {
    match package_artifacts(config, installer) {
        Ok(summaries) => {
            println!("\nPackaged artifacts:");
            for summary in summaries {
                let location = summary
                    .local_copy
                    .map(|path| path.display().to_string())
                    .unwrap_or_default();
                println!(
                    "- {} ({} bytes, {} entries) {location}",
                    summary.unit,
                    summary.size_bytes,
                    summary.entries.len()
                );
            }
            ExitCode::SUCCESS
        }
        Err(failure) => {
            eprintln!("error: {failure}");
            ExitCode::FAILURE
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.run_config() {
        Ok(value) => value,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    };
    let installer = PipInstaller::new(cli.python.clone(), cli.pip_platform.clone());

    if cli.package_only {
        return package_only(&config, &installer);
    }

    let prompts = TerminalParameterSource;
    let params = match resolve_run_parameters(cli.partial_parameters(), &prompts) {
        Ok(value) => value,
        Err(error) => {
            eprintln!("error: {error}");
            return ExitCode::FAILURE;
        }
    };

    let aws_config = aws_config::defaults(BehaviorVersion::latest())
        .region(Region::new(params.region.clone()))
        .load()
        .await;
    let secrets = SsmSecretStore::new(aws_sdk_ssm::Client::new(&aws_config));
    let engine = CloudFormationEngine::new(
        aws_sdk_cloudformation::Client::new(&aws_config),
        aws_sdk_s3::Client::new(&aws_config),
        params.region.clone(),
        cli.template_bucket.clone(),
        cli.stack_wait_policy(),
    );
    let deployment = LambdaDeploymentService::new(
        aws_sdk_lambda::Client::new(&aws_config),
        WaitPolicy::function_update_default(),
    );

    let services = Services {
        secrets: &secrets,
        engine: &engine,
        deployment: &deployment,
        installer: &installer,
        parameters: &prompts,
    };
    let report = Sequencer::new(&params, &config, services).run();

    if let Some(failure) = &report.failure {
        eprintln!("error: {failure}");
        return ExitCode::FAILURE;
    }

    print!(
        "{}",
        render_summary(&params, &report, &config.manifest.endpoint_output)
    );
    ExitCode::SUCCESS
}
