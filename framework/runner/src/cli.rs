use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Parser, Debug, Clone)]
#[command(about, long_about = None)]
pub struct PrLoadScenarioCli {
    /// Base URL of the service to put under load
    #[clap(
        short,
        long,
        env = "PR_LOAD_TARGET",
        default_value = "http://localhost:8080"
    )]
    pub connection_string: String,

    /// The number of virtual users to run concurrently
    #[clap(long, env = "PR_LOAD_AGENTS")]
    pub agents: Option<usize>,

    /// The number of seconds to run the scenario for
    #[clap(long, env = "PR_LOAD_DURATION")]
    pub duration: Option<u64>,

    /// Stop each virtual user after this many iterations, even if the duration has not elapsed
    #[clap(long)]
    pub iterations: Option<u64>,

    /// How long to wait for in-flight iterations to stop once the duration has elapsed
    #[clap(long, default_value = "5")]
    pub grace_period_s: u64,

    /// Do not show a progress bar on the CLI.
    ///
    /// This is recommended for CI/CD environments where the progress bar isn't being looked at by anyone and is just adding noise to the logs.
    #[clap(long, default_value = "false")]
    pub no_progress: bool,

    /// How the final report is presented
    #[arg(long, value_enum, default_value_t = ReporterOpt::InMemory)]
    pub reporter: ReporterOpt,

    /// Set the ID of this run
    ///
    /// If not set, a random ID is used.
    #[arg(long, short)]
    pub run_id: Option<String>,

    /// Append a JSON summary of the run to this file
    #[arg(long)]
    pub summary_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ReporterOpt {
    /// Print a table of operations when the run finishes
    #[default]
    InMemory,
    /// Only log, do not print a summary
    Noop,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = PrLoadScenarioCli::try_parse_from(["pr-load"]).unwrap();

        assert_eq!("http://localhost:8080", cli.connection_string);
        assert_eq!(None, cli.agents);
        assert_eq!(None, cli.duration);
        assert_eq!(5, cli.grace_period_s);
        assert_eq!(ReporterOpt::InMemory, cli.reporter);
    }

    #[test]
    fn explicit_values() {
        let cli = PrLoadScenarioCli::try_parse_from([
            "pr-load",
            "-c",
            "http://pr-service:9000",
            "--agents",
            "5",
            "--duration",
            "60",
            "--iterations",
            "10",
            "--reporter",
            "noop",
            "--run-id",
            "nightly",
        ])
        .unwrap();

        assert_eq!("http://pr-service:9000", cli.connection_string);
        assert_eq!(Some(5), cli.agents);
        assert_eq!(Some(60), cli.duration);
        assert_eq!(Some(10), cli.iterations);
        assert_eq!(ReporterOpt::Noop, cli.reporter);
        assert_eq!(Some("nightly".to_string()), cli.run_id);
    }
}
