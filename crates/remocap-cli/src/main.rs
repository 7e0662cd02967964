use argh::FromArgs;
use std::path::PathBuf;

use remocap::geometry::diagnose::{Aggregation, Threshold};
use remocap::repair::io;
use remocap::repair::{ClusterKind, RepairConfig, RepairPipeline};

#[derive(FromArgs, Debug)]
/// Find and repair broken head and hand markers of a motion capture.
struct Args {
    /// path to the calibration (T-pose) marker positions
    #[argh(option)]
    calibration: PathBuf,

    /// path to the capture to repair
    #[argh(option, short = 'i')]
    input: PathBuf,

    /// path of the repaired capture, the input is overwritten if omitted
    #[argh(option, short = 'o')]
    output: Option<PathBuf>,

    /// path of a JSON run configuration
    #[argh(option)]
    config: Option<PathBuf>,

    /// distance tolerance, in capture units
    #[argh(option, short = 't')]
    threshold: Option<f64>,

    /// frame score aggregation: signed or absolute
    #[argh(option)]
    aggregation: Option<Aggregation>,

    /// frame distance beyond which a neighbor makes a repair low confidence
    #[argh(option)]
    cutoff: Option<usize>,

    /// cluster to process, can be repeated: head, left_hand, right_hand
    #[argh(option)]
    cluster: Vec<ClusterKind>,

    /// evaluate frames on a single thread
    #[argh(switch)]
    sequential: bool,

    /// only report the broken frames, do not repair
    #[argh(switch)]
    scan_only: bool,

    /// path of the JSON repair report
    #[argh(option, short = 'r')]
    report: Option<PathBuf>,

    /// log every reconstruction step
    #[argh(switch, short = 'v')]
    verbose: bool,

    /// only log warnings and errors
    #[argh(switch, short = 'q')]
    quiet: bool,

    /// log everything
    #[argh(switch)]
    debug: bool,

    /// always colorize the log output
    #[argh(switch, short = 'c')]
    colorize: bool,
}

impl Args {
    fn log_level(&self) -> log::LevelFilter {
        if self.debug {
            log::LevelFilter::Trace
        } else if self.verbose {
            log::LevelFilter::Debug
        } else if self.quiet {
            log::LevelFilter::Warn
        } else {
            log::LevelFilter::Info
        }
    }

    /// Load the configuration file if any, then apply the command line overrides.
    fn repair_config(&self) -> Result<RepairConfig, Box<dyn std::error::Error>> {
        let mut config = match &self.config {
            Some(path) => io::read_config(path)?,
            None => RepairConfig::default(),
        };

        if let Some(threshold) = self.threshold {
            config.threshold = Threshold::new(threshold)?;
        }
        if let Some(aggregation) = self.aggregation {
            config.aggregation = aggregation;
        }
        if let Some(cutoff) = self.cutoff {
            config.neighbor_cutoff = cutoff;
        }
        if !self.cluster.is_empty() {
            config.clusters = self.cluster.clone();
        }
        if self.sequential {
            config.parallel = false;
        }

        Ok(config)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Args = argh::from_env();

    let write_style = if args.colorize {
        env_logger::WriteStyle::Always
    } else {
        env_logger::WriteStyle::Auto
    };
    env_logger::Builder::new()
        .filter_level(args.log_level())
        .write_style(write_style)
        .parse_default_env()
        .init();

    let config = args.repair_config()?;
    let calibration = io::read_calibration(&args.calibration)?;
    let pipeline = RepairPipeline::new(config, &calibration)?;

    let mut capture = io::read_capture(&args.input)?;
    log::info!("Loaded {}", args.input.display());

    let scan = pipeline.scan(&capture)?;
    for cluster in &scan.clusters {
        println!("{}: broken frames {:?}", cluster.cluster, cluster.broken_frames());
    }

    if args.scan_only {
        return Ok(());
    }

    let report = pipeline.repair(&mut capture, &scan)?;
    println!(
        "Repaired {} frames, {} with low confidence, {} left as is",
        report.repaired_count(),
        report.low_confidence_count(),
        report.unresolved_count()
    );

    let output = args.output.as_ref().unwrap_or(&args.input);
    io::write_capture(output, &capture)?;
    log::info!("Wrote {}", output.display());

    if let Some(path) = &args.report {
        io::write_report(path, &report)?;
        log::info!("Wrote report {}", path.display());
    }

    Ok(())
}
