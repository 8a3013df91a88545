use clap::{Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{bail, eyre, Result, WrapErr};
use env_logger::Env;
use log::info;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use ipplan::algebra::{check_alignment, compare, summarize};
use ipplan::plan::{load_requests, plan_subnets, Strategy};
use ipplan::search::{find_next_available, BlockSize, Policy};
use ipplan::split::{deaggregate, split_by_count};

/// Address-space planning toolkit for IPv4 and IPv6
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Coalesce addresses, CIDR blocks and ranges into the minimal CIDR set
    Summarize {
        /// Entries to summarize, one per argument
        inputs: Vec<String>,

        /// Read newline-separated entries from a file instead
        #[arg(short, long, conflicts_with = "inputs")]
        file: Option<PathBuf>,
    },

    /// Diff two block lists after normalizing both to canonical CIDR sets
    Compare {
        /// File with the baseline list
        #[arg(long)]
        list_a: PathBuf,

        /// File with the updated list
        #[arg(long)]
        list_b: PathBuf,
    },

    /// Check whether blocks sit exactly on a target prefix boundary
    Align {
        /// Target prefix length, e.g. 24
        #[arg(short, long)]
        target: u8,

        /// Entries to check, one per argument
        inputs: Vec<String>,

        /// Read newline-separated entries from a file instead
        #[arg(short, long, conflicts_with = "inputs")]
        file: Option<PathBuf>,
    },

    /// Pack host-count requests into a parent block (VLSM)
    Plan {
        /// Parent block in CIDR notation, e.g. 192.168.1.0/24
        parent: String,

        /// YAML or JSON file with the allocation requests
        #[arg(short, long)]
        requests: PathBuf,

        /// Placement strategy
        #[arg(short, long, value_enum, default_value_t = StrategyArg::FitBest)]
        strategy: StrategyArg,

        /// Treat request sizes as raw address counts instead of usable hosts
        #[arg(long)]
        raw: bool,
    },

    /// Find unused blocks inside pools, excluding existing allocations
    NextAvailable {
        /// File with the pool list
        #[arg(long)]
        pools: PathBuf,

        /// File with the existing allocations
        #[arg(long)]
        allocations: Option<PathBuf>,

        /// Desired prefix length of each candidate
        #[arg(short, long)]
        prefix: Option<u8>,

        /// Desired usable host count of each candidate
        #[arg(long)]
        hosts: Option<u64>,

        /// Candidate selection policy
        #[arg(long, value_enum, default_value_t = PolicyArg::FirstFit)]
        policy: PolicyArg,

        /// Maximum number of candidates to return
        #[arg(short = 'n', long, default_value_t = 1)]
        count: usize,
    },

    /// Split blocks into smaller subnets
    Deaggregate {
        /// Entries to split, one per argument
        inputs: Vec<String>,

        /// Read newline-separated entries from a file instead
        #[arg(short, long, conflicts_with = "inputs")]
        file: Option<PathBuf>,

        /// Split down to this prefix length
        #[arg(short, long)]
        target: Option<u8>,

        /// Split into this many equal subnets instead
        #[arg(short, long)]
        count: Option<u64>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum StrategyArg {
    FitBest,
    PreserveOrder,
}

impl From<StrategyArg> for Strategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::FitBest => Strategy::FitBest,
            StrategyArg::PreserveOrder => Strategy::PreserveOrder,
        }
    }
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum PolicyArg {
    FirstFit,
    BestFit,
}

impl From<PolicyArg> for Policy {
    fn from(arg: PolicyArg) -> Self {
        match arg {
            PolicyArg::FirstFit => Policy::FirstFit,
            PolicyArg::BestFit => Policy::BestFit,
        }
    }
}

fn main() -> Result<()> {
    // Initialize error handling
    color_eyre::install()?;

    // Parse command-line arguments
    let args = Args::parse();

    // Initialize logging with default filter level of "info"
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    match args.command {
        Command::Summarize { inputs, file } => {
            let lines = gather_lines(inputs, file.as_deref())?;
            info!("Summarizing {} entries", lines.len());
            emit(&summarize(&lines))
        }
        Command::Compare { list_a, list_b } => {
            let a = read_list(&list_a)?;
            let b = read_list(&list_b)?;
            emit(&compare(&a, &b))
        }
        Command::Align {
            target,
            inputs,
            file,
        } => {
            let lines = gather_lines(inputs, file.as_deref())?;
            emit(&check_alignment(&lines, target))
        }
        Command::Plan {
            parent,
            requests,
            strategy,
            raw,
        } => {
            let requests = load_requests(&requests)?;
            emit(&plan_subnets(&parent, &requests, strategy.into(), !raw))
        }
        Command::NextAvailable {
            pools,
            allocations,
            prefix,
            hosts,
            policy,
            count,
        } => {
            let want = match (prefix, hosts) {
                (Some(prefix), None) => BlockSize::Prefix(prefix),
                (None, Some(hosts)) => BlockSize::Hosts(hosts),
                (Some(_), Some(_)) => bail!("--prefix and --hosts are mutually exclusive"),
                (None, None) => bail!("one of --prefix or --hosts is required"),
            };
            let pools = read_list(&pools)?;
            let allocations = match allocations {
                Some(path) => read_list(&path)?,
                None => String::new(),
            };
            emit(&find_next_available(
                &pools,
                &allocations,
                want,
                policy.into(),
                count,
            ))
        }
        Command::Deaggregate {
            inputs,
            file,
            target,
            count,
        } => {
            let lines = gather_lines(inputs, file.as_deref())?;
            let text = lines.join("\n");
            let result = match (target, count) {
                (Some(target), None) => deaggregate(&text, target),
                (None, Some(count)) => split_by_count(&text, count),
                (Some(_), Some(_)) => bail!("--target and --count are mutually exclusive"),
                (None, None) => bail!("one of --target or --count is required"),
            };
            emit(&result)
        }
    }
}

/// Entries from positional arguments or, when given, one per line from
/// a file.
fn gather_lines(inputs: Vec<String>, file: Option<&Path>) -> Result<Vec<String>> {
    if let Some(path) = file {
        let text = read_list(path)?;
        return Ok(text.lines().map(|l| l.to_string()).collect());
    }
    if inputs.is_empty() {
        return Err(eyre!("no inputs given; pass entries or --file"));
    }
    Ok(inputs)
}

fn read_list(path: &Path) -> Result<String> {
    fs::read_to_string(path).wrap_err_with(|| format!("Failed to read '{}'", path.display()))
}

/// Print a result record as pretty JSON on stdout.
fn emit<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
