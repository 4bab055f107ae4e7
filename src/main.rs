use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};

use mzconsensus::binning::{BinGrid, BinningParameters, QuorumPolicy};
use mzconsensus::io::MGFError;
use mzconsensus::pipeline::{
    ClusterFailurePolicy, ConsensusPipeline, PipelineConfig, PipelineError,
};

const EX_USAGE: u8 = 64;
const EX_DATAERR: u8 = 65;
const EX_SOFTWARE: u8 = 70;
const EX_IOERR: u8 = 74;

/// Merge each cluster of a clustered MGF file into a single binned consensus spectrum
#[derive(Parser)]
#[command(name = "mzconsensus")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Clustered MGF file with `cluster_id;spectrum_identifier` titles, optionally gzipped.
    /// With --cluster-list, an MGF file whose titles are plain spectrum identifiers.
    #[arg(long, value_name = "PATH")]
    mgf_file: PathBuf,

    /// Where to write the consensus spectra. A `.gz` suffix compresses the output.
    #[arg(long, value_name = "PATH", default_value = "merged_spectra.mgf")]
    out: PathBuf,

    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Lower bound of the m/z grid, inclusive
    #[arg(long, default_value_t = 100.0)]
    min_mz: f64,

    /// Upper bound of the m/z grid, exclusive
    #[arg(long, default_value_t = 2000.0)]
    max_mz: f64,

    /// Width of each m/z bin
    #[arg(long, default_value_t = 0.02)]
    bin_width: f64,

    /// Keep every bin at least one member contributed to
    #[arg(long)]
    no_quorum: bool,

    /// Number of worker threads, 0 for one per core
    #[arg(long, default_value_t = 0)]
    threads: usize,

    /// Leave clusters that cannot be merged out of the output instead of stopping
    #[arg(long)]
    skip_invalid_clusters: bool,

    /// Take cluster membership from this tab-separated list rather than from MGF titles
    #[arg(long, value_name = "TSV")]
    cluster_list: Option<PathBuf>,
}

impl Cli {
    fn config(&self) -> Result<PipelineConfig, PipelineError> {
        let grid = BinGrid::new(self.min_mz, self.max_mz, self.bin_width)?;
        let binning = BinningParameters::new(grid, QuorumPolicy::from(!self.no_quorum));
        let failure_policy = if self.skip_invalid_clusters {
            ClusterFailurePolicy::Skip
        } else {
            ClusterFailurePolicy::Abort
        };
        Ok(PipelineConfig::default()
            .with_binning(binning)
            .with_failure_policy(failure_policy)
            .with_threads(self.threads))
    }
}

fn exit_code(err: &PipelineError) -> u8 {
    match err {
        PipelineError::Format {
            source: MGFError::IOError(_),
            ..
        } => EX_IOERR,
        PipelineError::Format { .. } | PipelineError::Cluster(_) => EX_DATAERR,
        PipelineError::IO { source, .. } if source.kind() == std::io::ErrorKind::InvalidData => {
            EX_DATAERR
        }
        PipelineError::IO { .. } | PipelineError::Write(_) => EX_IOERR,
        PipelineError::WorkerPanic | PipelineError::ThreadPool(_) => EX_SOFTWARE,
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();

    let config = match cli.config() {
        Ok(config) => config,
        Err(e) => {
            error!("{e}");
            return ExitCode::from(EX_USAGE);
        }
    };
    let pipeline = ConsensusPipeline::new(config);

    let result = match &cli.cluster_list {
        Some(cluster_list) => pipeline.run_cluster_list(cluster_list, &cli.mgf_file, &cli.out),
        None => pipeline.run_paths(&cli.mgf_file, &cli.out),
    };

    match result {
        Ok(summary) => {
            for skipped in summary.skipped.iter() {
                warn!("Skipped: {skipped}");
            }
            info!(
                "Merged {} of {} clusters into {}",
                summary.n_written,
                summary.n_clusters,
                cli.out.display()
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::from(exit_code(&e))
        }
    }
}

#[cfg(test)]
mod test {
    use std::io;

    use clap::error::ErrorKind;
    use mzconsensus::binning::ConsensusError;

    use super::*;

    fn io_error(kind: io::ErrorKind) -> io::Error {
        io::Error::new(kind, "test")
    }

    #[test]
    fn test_exit_codes() {
        let path = PathBuf::from("clustered.mgf");

        let err = PipelineError::Cluster(ConsensusError::EmptyCluster);
        assert_eq!(exit_code(&err), EX_DATAERR);
        assert_eq!(EX_DATAERR, 65);

        let err = PipelineError::Format {
            path: path.clone(),
            source: MGFError::UnterminatedRecord { line_number: 1 },
        };
        assert_eq!(exit_code(&err), EX_DATAERR);

        let err = PipelineError::Format {
            path: path.clone(),
            source: MGFError::IOError(io_error(io::ErrorKind::UnexpectedEof)),
        };
        assert_eq!(exit_code(&err), EX_IOERR);

        let err = PipelineError::IO {
            path: path.clone(),
            source: io_error(io::ErrorKind::NotFound),
        };
        assert_eq!(exit_code(&err), EX_IOERR);
        assert_eq!(EX_IOERR, 74);

        let err = PipelineError::IO {
            path,
            source: io_error(io::ErrorKind::InvalidData),
        };
        assert_eq!(exit_code(&err), EX_DATAERR);

        let err = PipelineError::Write(io_error(io::ErrorKind::BrokenPipe));
        assert_eq!(exit_code(&err), EX_IOERR);

        assert_eq!(exit_code(&PipelineError::WorkerPanic), EX_SOFTWARE);
        assert_eq!(
            exit_code(&PipelineError::ThreadPool("no threads".into())),
            EX_SOFTWARE
        );
        assert_eq!(EX_SOFTWARE, 70);
    }

    #[test]
    fn test_missing_mgf_file_is_a_usage_error() {
        let err = match Cli::try_parse_from(["mzconsensus"]) {
            Ok(_) => panic!("parsed without --mgf-file"),
            Err(err) => err,
        };
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_invalid_grid_is_rejected_by_config() {
        let cli = Cli::try_parse_from(["mzconsensus", "--mgf-file", "x.mgf", "--bin-width", "0"])
            .unwrap();
        let err = cli.config().unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Cluster(ConsensusError::InvalidBinGrid(_))
        ));
        assert_eq!(EX_USAGE, 64);

        let cli = Cli::try_parse_from([
            "mzconsensus",
            "--mgf-file",
            "x.mgf",
            "--min-mz",
            "500",
            "--max-mz",
            "400",
        ])
        .unwrap();
        assert!(cli.config().is_err());
    }

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["mzconsensus", "--mgf-file", "x.mgf"]).unwrap();
        assert_eq!(cli.out, PathBuf::from("merged_spectra.mgf"));
        assert!(cli.cluster_list.is_none());

        let config = cli.config().unwrap();
        assert_eq!(config.failure_policy, ClusterFailurePolicy::Abort);
        assert_eq!(config.binning.quorum, QuorumPolicy::Enabled);
        assert_eq!(config.threads, 0);

        let cli = Cli::try_parse_from([
            "mzconsensus",
            "--mgf-file",
            "x.mgf",
            "--skip-invalid-clusters",
            "--no-quorum",
            "--threads",
            "3",
        ])
        .unwrap();
        let config = cli.config().unwrap();
        assert_eq!(config.failure_policy, ClusterFailurePolicy::Skip);
        assert_eq!(config.binning.quorum, QuorumPolicy::Disabled);
        assert_eq!(config.threads, 3);
    }
}
