use std::process::{exit, Command, ExitStatus};

use clap::{Parser, Subcommand, ValueEnum};

// ── CLI definition ─────────────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Task runner for the LexFlow deploy workspace",
    long_about = "A unified CLI for CI checks, packaging, and deploying the\n\
                  LexFlow serverless application."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run CI checks (fmt, clippy, tests)
    Ci {
        /// Job to run
        #[arg(value_enum, default_value_t = CiJob::Check)]
        job: CiJob,
    },
    /// Build the function archives into dist/ without deploying
    Package {
        /// Arguments forwarded to lexflow-deploy
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
    /// Run a full deploy
    Deploy {
        /// Arguments forwarded to lexflow-deploy
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },
}

#[derive(Clone, ValueEnum)]
enum CiJob {
    /// Formatting and clippy
    Lint,
    /// Unit and integration tests
    Test,
    /// Lint + test
    Check,
}

// ── helpers ────────────────────────────────────────────────────────

fn step(label: &str) {
    eprintln!("\n=== {label} ===");
}

fn cargo(args: &[&str]) -> ExitStatus {
    eprintln!("+ cargo {}", args.join(" "));
    Command::new("cargo")
        .args(args)
        .status()
        .expect("failed to execute cargo")
}

fn run_cargo(args: &[&str]) {
    let status = cargo(args);
    if !status.success() {
        exit(status.code().unwrap_or(1));
    }
}

fn deployer_args<'a>(extra: &'a [String], package_only: bool) -> Vec<&'a str> {
    let mut args = vec![
        "run",
        "--release",
        "-p",
        "lexflow_deploy_aws",
        "--bin",
        "lexflow-deploy",
        "--",
    ];
    if package_only {
        args.push("--package-only");
    }
    args.extend(extra.iter().map(String::as_str));
    args
}

// ── CI jobs ────────────────────────────────────────────────────────

fn ci_lint() {
    step("Check formatting");
    run_cargo(&["fmt", "--all", "--", "--check"]);

    step("Clippy");
    run_cargo(&[
        "clippy",
        "--all-targets",
        "--all-features",
        "--",
        "-D",
        "warnings",
    ]);
}

fn ci_test() {
    step("Test lexflow_deploy_core");
    run_cargo(&["test", "-p", "lexflow_deploy_core"]);

    step("Test lexflow_deploy_aws");
    run_cargo(&["test", "-p", "lexflow_deploy_aws"]);
}

// ── main ───────────────────────────────────────────────────────────

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ci { job } => {
            match job {
                CiJob::Lint => ci_lint(),
                CiJob::Test => ci_test(),
                CiJob::Check => {
                    ci_lint();
                    ci_test();
                }
            }
            eprintln!("\nCI job passed.");
        }
        Commands::Package { args } => {
            step("Package function archives");
            run_cargo(&deployer_args(&args, true));
        }
        Commands::Deploy { args } => {
            step("Deploy LexFlow");
            run_cargo(&deployer_args(&args, false));
        }
    }
}
