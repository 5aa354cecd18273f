use std::ffi::OsString;
#[cfg(unix)]
use std::os::unix::process::CommandExt;
use std::path::PathBuf;
use std::process::{self, Command};

use clap::{Args, Parser, Subcommand};
use parenv::{EnvLoader, TargetEnv};

const DEFAULT_FILE: &str = ".env";

#[derive(Debug, Parser)]
#[command(
    name = "parenv",
    about = "Load .env files in parallel and run commands with them",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Load an env file into the environment and execute a command
    Run(RunArgs),
    /// Load an env file in memory and print the resulting variables
    Check(LoadArgs),
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
struct LoadArgs {
    /// Env file path
    #[arg(short, long, default_value = DEFAULT_FILE)]
    file: PathBuf,

    /// Maximum worker threads (defaults to half the logical CPUs)
    #[arg(short = 'j', long)]
    jobs: Option<usize>,

    /// Print per-worker diagnostics and the completion time
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Args)]
struct RunArgs {
    #[command(flatten)]
    load: LoadArgs,

    /// Keep variables already present in the environment
    #[arg(long)]
    no_override: bool,

    /// Command to execute, followed by its arguments
    #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
    command: Vec<OsString>,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    process::exit(run(Cli::parse()));
}

fn run(cli: Cli) -> i32 {
    let result = match cli.command {
        Commands::Run(args) => execute_run(args),
        Commands::Check(args) => execute_check(args),
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("parenv: {err}");
            1
        }
    }
}

fn loader_for(args: &LoadArgs) -> EnvLoader {
    let loader = EnvLoader::new().path(&args.file).verbose(args.verbose);
    match args.jobs {
        Some(jobs) => loader.parallelism(jobs),
        None => loader,
    }
}

fn execute_run(args: RunArgs) -> Result<i32, String> {
    // SAFETY: nothing else runs yet; the only environment writers are the
    // loader's own workers, which go through `std`.
    let target = unsafe { TargetEnv::process() };
    let loader = loader_for(&args.load)
        .override_existing(!args.no_override)
        .target(target);
    loader.load().map_err(|err| err.to_string())?;

    let Some((program, program_args)) = args.command.split_first() else {
        return Err("missing command after `run`".to_owned());
    };
    let mut command = Command::new(program);
    command.args(program_args);
    execute_command(command, program)
}

fn execute_check(args: LoadArgs) -> Result<i32, String> {
    let loader = loader_for(&args).target(TargetEnv::memory());
    loader.load().map_err(|err| err.to_string())?;

    let loaded = loader.into_target().into_memory().unwrap_or_default();
    for (key, value) in loaded {
        println!("{key}={value}");
    }
    Ok(0)
}

#[cfg(unix)]
fn execute_command(mut command: Command, program: &OsString) -> Result<i32, String> {
    let err = command.exec();
    Err(format!(
        "failed to execute `{}`: {err}",
        program.to_string_lossy()
    ))
}

#[cfg(not(unix))]
fn execute_command(mut command: Command, program: &OsString) -> Result<i32, String> {
    let status = command
        .status()
        .map_err(|err| format!("failed to execute `{}`: {err}", program.to_string_lossy()))?;
    Ok(status.code().unwrap_or(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_uses_defaults() {
        let cli = Cli::try_parse_from(["parenv", "run", "printenv", "FOO"])
            .expect("parse should succeed");
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };

        assert_eq!(args.load.file, PathBuf::from(".env"));
        assert_eq!(args.load.jobs, None);
        assert!(!args.load.verbose);
        assert!(!args.no_override);
        assert_eq!(
            args.command,
            vec![OsString::from("printenv"), OsString::from("FOO")]
        );
    }

    #[test]
    fn run_accepts_options_before_separator() {
        let cli = Cli::try_parse_from([
            "parenv",
            "run",
            "-f",
            "custom.env",
            "-j",
            "3",
            "-v",
            "--no-override",
            "--",
            "sh",
            "-c",
            "echo ok",
        ])
        .expect("parse should succeed");
        let Commands::Run(args) = cli.command else {
            panic!("expected run");
        };

        assert_eq!(args.load.file, PathBuf::from("custom.env"));
        assert_eq!(args.load.jobs, Some(3));
        assert!(args.load.verbose);
        assert!(args.no_override);
        assert_eq!(
            args.command,
            vec![
                OsString::from("sh"),
                OsString::from("-c"),
                OsString::from("echo ok"),
            ]
        );
    }

    #[test]
    fn run_requires_a_command() {
        assert!(Cli::try_parse_from(["parenv", "run", "-f", "x.env"]).is_err());
    }

    #[test]
    fn check_parses_file_and_jobs() {
        let cli = Cli::try_parse_from(["parenv", "check", "--file", "a.env", "--jobs", "2"])
            .expect("parse should succeed");
        let Commands::Check(args) = cli.command else {
            panic!("expected check");
        };

        assert_eq!(args.file, PathBuf::from("a.env"));
        assert_eq!(args.jobs, Some(2));
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
