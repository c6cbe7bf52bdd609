use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;
use clap::Parser;
use tracing_subscriber::EnvFilter;
use csimlib::config::SimulationConfig;
use csimlib::io::open_trace;
use csimlib::simulator::Simulator;

#[derive(Parser, Debug)]
#[command(
    about = String::from("Set associative LRU cache simulator for valgrind memory traces"),
    after_help = "Examples:\n  csim -s 4 -E 1 -b 4 -t traces/yi.trace\n  csim -v -s 8 -E 2 -b 4 -t traces/yi.trace"
)]
struct Args {
    /// Number of set index bits
    #[arg(short = 's', value_name = "num")]
    set_bits: Option<u32>,

    /// Number of lines per set
    #[arg(short = 'E', value_name = "num")]
    associativity: Option<usize>,

    /// Number of block offset bits
    #[arg(short = 'b', value_name = "num")]
    block_bits: Option<u32>,

    /// Trace file
    #[arg(short = 't', value_name = "file")]
    trace: PathBuf,

    /// Print the events caused by every access
    #[arg(short, long)]
    verbose: bool,

    /// JSON file providing set_bits, associativity and block_bits. Flags override it
    #[arg(long, value_name = "file")]
    config: Option<PathBuf>,

    /// Print the summary as JSON
    #[arg(long)]
    json: bool,

    /// Also write "<hits> <misses> <evictions>" to this file
    #[arg(long, value_name = "file")]
    results_file: Option<PathBuf>,

    #[arg(short, long)]
    performance: bool,

    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<(), String> {
    let start = Instant::now();
    let args = Args::parse();
    init_logging(args.debug);

    let file_config = match &args.config {
        Some(path) => {
            let config_file = File::open(path).map_err(|e| format!("Couldn't open the config file at path {}: {e}", path.display()))?;
            SimulationConfig::from_reader(BufReader::new(config_file)).map_err(|e| e.to_string())?
        }
        None => SimulationConfig::default(),
    };
    let config = file_config.merge(SimulationConfig {
        set_bits: args.set_bits,
        associativity: args.associativity,
        block_bits: args.block_bits,
        verbose: args.verbose,
    });
    tracing::debug!(?config, "parsed configuration");
    let mut simulator = Simulator::from_config(&config).map_err(|e| e.to_string())?;

    let trace_reader = open_trace(&args.trace).map_err(|e| e.to_string())?;
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let result = if config.verbose {
        simulator.simulate(trace_reader, Some(&mut out))
    } else {
        simulator.simulate(trace_reader, None)
    };
    // Whatever was traced before a failure is still worth seeing
    out.flush().map_err(|e| format!("Couldn't write the output: {e}"))?;
    let result = *result.map_err(|e| e.to_string())?;

    let summary = if args.json {
        serde_json::to_string_pretty(&result).map_err(|e| format!("Couldn't serialise the output {e}"))?
    } else {
        result.to_string()
    };
    writeln!(out, "{summary}").map_err(|e| format!("Couldn't write the output: {e}"))?;
    if let Some(path) = &args.results_file {
        result.write_results_file(path).map_err(|e| format!("Couldn't write the results file at path {}: {e}", path.display()))?;
    }
    if args.performance {
        let end = Instant::now();
        let simulation_time = simulator.get_execution_time();
        let total_time = end - start;
        writeln!(out, "Simulation time: {}s", simulation_time.as_nanos() as f64 / 1e9).map_err(|e| e.to_string())?;
        writeln!(out, "Total execution time (includes initial parsing, configuration, and output): {}s", total_time.as_nanos() as f64 / 1e9).map_err(|e| e.to_string())?;
    }
    if args.debug {
        let unclaimed = simulator.get_unclaimed_line_counts();
        let full_sets = unclaimed.iter().filter(|count| **count == 0).count();
        writeln!(out, "Parsed input configuration: {config:?}").map_err(|e| e.to_string())?;
        writeln!(out, "Sets filled to capacity: {full_sets} of {}", unclaimed.len()).map_err(|e| e.to_string())?;
        writeln!(out, "Total unclaimed cache lines: {}", unclaimed.iter().sum::<usize>()).map_err(|e| e.to_string())?;
    }
    out.flush().map_err(|e| format!("Couldn't write the output: {e}"))
}

/// Logs go to stderr so they never mix with the trace and summary on stdout. `RUST_LOG`
/// overrides the level picked here
fn init_logging(debug: bool) {
    let default_level = if debug { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}
