use itertools::Itertools;
use serde::{Deserialize, Serialize};
use sha3::Digest;
use std::collections::{BTreeMap, HashMap};
use std::io::{BufRead, Read, Write};
use std::path::PathBuf;

/// Summary of a run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunSummary {
    /// The unique run id
    ///
    /// Chosen by the runner unless one is provided on the command line.
    pub run_id: String,
    /// The name of the scenario that was run
    pub scenario_name: String,
    /// The target service the load was driven against
    pub target: String,
    /// The time the run started, as a Unix timestamp in seconds.
    pub started_at: i64,
    /// The duration that the run was configured with, in seconds
    pub run_duration: u64,
    /// The number of virtual users configured
    pub agent_count: usize,
    /// The number of virtual users that were still running when the stop signal fired
    ///
    /// Lower than [RunSummary::agent_count] if some agents bailed.
    pub agent_end_count: usize,
    /// Total scenario iterations started across all agents
    pub iterations: u64,
    /// Totals per operation
    pub operations: BTreeMap<String, OperationTotals>,
    /// Scenario specific settings that shape the load, such as pacing or merge probability
    pub settings: HashMap<String, String>,
    /// The version of the load generator used for this run
    pub version: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OperationTotals {
    pub attempts: u64,
    pub successes: u64,
    pub failures: u64,
    pub mean_latency_ms: Option<f64>,
    pub p95_latency_ms: Option<f64>,
}

impl RunSummary {
    /// Create a new run summary
    pub fn new(
        run_id: String,
        scenario_name: String,
        target: String,
        started_at: i64,
        run_duration: u64,
        agent_count: usize,
        version: String,
    ) -> Self {
        Self {
            run_id,
            scenario_name,
            target,
            started_at,
            run_duration,
            agent_count,
            agent_end_count: 0,
            iterations: 0,
            operations: BTreeMap::new(),
            settings: HashMap::with_capacity(0),
            version,
        }
    }

    pub fn set_agent_end_count(&mut self, agent_end_count: usize) {
        self.agent_end_count = agent_end_count;
    }

    pub fn set_iterations(&mut self, iterations: u64) {
        self.iterations = iterations;
    }

    pub fn add_operation(&mut self, operation_id: String, totals: OperationTotals) {
        self.operations.insert(operation_id, totals);
    }

    pub fn add_setting(&mut self, key: String, value: String) {
        self.settings.insert(key, value);
    }

    /// Compute a fingerprint for this run summary
    ///
    /// The fingerprint identifies the configuration the scenario ran with, so that runs which can
    /// be compared share a fingerprint. It uses the
    ///     - Scenario name
    ///     - Run duration
    ///     - Agent count
    ///     - Scenario settings
    ///     - Version
    ///
    /// The fingerprint is computed using [sha3::Sha3_256].
    pub fn fingerprint(&self) -> String {
        let mut hasher = sha3::Sha3_256::new();
        Digest::update(&mut hasher, self.scenario_name.as_bytes());
        Digest::update(&mut hasher, self.run_duration.to_le_bytes());
        Digest::update(&mut hasher, (self.agent_count as u64).to_le_bytes());
        self.settings
            .iter()
            .sorted_by_key(|(k, _)| k.to_owned())
            .for_each(|(k, v)| {
                Digest::update(&mut hasher, k.as_bytes());
                Digest::update(&mut hasher, v.as_bytes());
            });
        Digest::update(&mut hasher, self.version.as_bytes());

        format!("{:x}", hasher.finalize())
    }
}

/// Append the run summary to a file
///
/// The summary will be serialized to JSON and output as a single line followed by a newline. The
/// recommended file extension is `.jsonl`.
pub fn append_run_summary(run_summary: RunSummary, path: PathBuf) -> anyhow::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)?;
    store_run_summary(run_summary, &mut file)?;
    file.write_all("\n".as_bytes())?;
    Ok(())
}

/// Serialize the run summary to a writer
pub fn store_run_summary<W: Write>(run_summary: RunSummary, writer: &mut W) -> anyhow::Result<()> {
    serde_json::to_writer(writer, &run_summary)?;
    Ok(())
}

/// Load a run summary from a reader
pub fn load_run_summary<R: Read>(reader: R) -> anyhow::Result<RunSummary> {
    let reader = std::io::BufReader::new(reader);
    let run_summary: RunSummary = serde_json::from_reader(reader)?;
    Ok(run_summary)
}

/// Load run summaries from a file
///
/// The file should contain one JSON object per line, as produced by [append_run_summary].
pub fn load_summary_runs(path: PathBuf) -> anyhow::Result<Vec<RunSummary>> {
    let file = std::fs::File::open(path)?;
    let reader = std::io::BufReader::new(file);
    let mut runs = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let run: RunSummary = serde_json::from_str(&line)?;
        runs.push(run);
    }
    Ok(runs)
}
