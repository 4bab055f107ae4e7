//! Drive parsing, per-cluster binning and serialization end to end.
//!
//! Clusters are reduced independently, optionally in parallel over a bounded
//! [`rayon`] pool, while a single writer thread restores input order with a
//! [`Collator`] and owns the output stream. The written order is always the order
//! in which clusters were first encountered in the input, whatever the number of
//! worker threads.
use std::fs;
use std::io::{self, prelude::*};
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;
use std::thread;

use log::{debug, error, info, warn};
use thiserror::Error;

#[cfg(feature = "parallelism")]
use rayon::prelude::*;

use crate::binning::{combine_bin_mean, BinningParameters, ConsensusError};
use crate::io::compression::{create_output, is_gzipped, open_input, OutputSink};
use crate::io::mgf::{MGFError, MGFReader, MGFReaderType, MGFWriter, SpectrumTitle};
use crate::io::traits::{ConsensusWriter, SeekRead};
use crate::io::{assemble_clusters, read_cluster_list};
use crate::spectrum::{group_by_cluster, ClusterMap, ConsensusSpectrum, PeakList};

mod collator;

pub use collator::Collator;

/// What to do when a single cluster cannot be reduced to a consensus spectrum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ClusterFailurePolicy {
    /// Stop at the first failing cluster in input order. Consensus spectra for the
    /// clusters before it have already been written.
    #[default]
    Abort,
    /// Log the failure, leave the cluster out of the output and carry on
    Skip,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PipelineConfig {
    pub binning: BinningParameters,
    pub failure_policy: ClusterFailurePolicy,
    /// The number of worker threads, 0 lets the thread pool decide
    pub threads: usize,
    /// How many finished clusters may queue for the writer
    pub channel_capacity: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            binning: BinningParameters::default(),
            failure_policy: ClusterFailurePolicy::default(),
            threads: 0,
            channel_capacity: 512,
        }
    }
}

impl PipelineConfig {
    pub fn with_binning(mut self, binning: BinningParameters) -> Self {
        self.binning = binning;
        self
    }

    pub fn with_failure_policy(mut self, failure_policy: ClusterFailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_channel_capacity(mut self, channel_capacity: usize) -> Self {
        self.channel_capacity = channel_capacity;
        self
    }
}

/// The outcome of a completed run
#[derive(Debug, Default, Clone, PartialEq)]
pub struct PipelineSummary {
    /// The number of clusters in the input
    pub n_clusters: usize,
    /// The number of consensus spectra written
    pub n_written: usize,
    /// Clusters left out of the output under [`ClusterFailurePolicy::Skip`], in input order
    pub skipped: Vec<ConsensusError>,
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to parse {path}: {source}")]
    Format {
        path: PathBuf,
        #[source]
        source: MGFError,
    },
    #[error("Failed to build a consensus spectrum: {0}")]
    Cluster(#[from] ConsensusError),
    #[error("An IO error occurred on {path}: {source}")]
    IO {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write a consensus spectrum: {0}")]
    Write(#[source] io::Error),
    #[error("A worker thread failed before all clusters were reduced")]
    WorkerPanic,
    #[error("Failed to start the worker thread pool: {0}")]
    ThreadPool(String),
}

impl PipelineError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::IO {
            path: path.to_path_buf(),
            source,
        }
    }

    fn format(path: &Path, source: MGFError) -> Self {
        match source {
            MGFError::IOError(source) => Self::io(path, source),
            source => Self::Format {
                path: path.to_path_buf(),
                source,
            },
        }
    }

    /// Attribute an error raised while writing to the file at `path`
    fn on_output(self, path: &Path) -> Self {
        match self {
            Self::Write(source) => Self::io(path, source),
            e => e,
        }
    }
}

type ClusterResult = Result<ConsensusSpectrum, ConsensusError>;

/// Builds one consensus spectrum per cluster and writes them out in input order
#[derive(Debug, Default, Clone)]
pub struct ConsensusPipeline {
    pub config: PipelineConfig,
}

impl ConsensusPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Reduce every cluster in `clusters` and write the results to `writer`.
    ///
    /// On success the summary and the writer are returned. Under
    /// [`ClusterFailurePolicy::Abort`] the first failing cluster in input order ends
    /// the run with [`PipelineError::Cluster`], after everything before it has been
    /// written and flushed.
    pub fn run<W: ConsensusWriter + Send + 'static>(
        &self,
        clusters: ClusterMap,
        writer: W,
    ) -> Result<(PipelineSummary, W), PipelineError> {
        let n_clusters = clusters.len();
        info!(
            "Building consensus spectra for {n_clusters} clusters from {} peak lists",
            clusters.n_peak_lists()
        );

        let (sender, receiver) = sync_channel(self.config.channel_capacity.max(1));
        let abort = Arc::new(AtomicBool::new(false));

        let policy = self.config.failure_policy;
        let writer_abort = Arc::clone(&abort);
        let writer_task =
            thread::spawn(move || write_in_order(receiver, writer, policy, &writer_abort));

        let reduced = panic::catch_unwind(AssertUnwindSafe(|| {
            self.reduce_all(clusters, sender, &abort)
        }));

        let written = match writer_task.join() {
            Ok(written) => written,
            Err(_) => {
                error!("The writer thread panicked");
                return Err(PipelineError::WorkerPanic);
            }
        };
        match reduced {
            Ok(result) => result?,
            Err(_) => {
                error!("A worker thread panicked");
                return Err(PipelineError::WorkerPanic);
            }
        }
        let (n_written, skipped, writer) = written?;

        if n_written + skipped.len() != n_clusters {
            error!(
                "Only {} of {n_clusters} clusters were accounted for",
                n_written + skipped.len()
            );
            return Err(PipelineError::WorkerPanic);
        }

        let summary = PipelineSummary {
            n_clusters,
            n_written,
            skipped,
        };
        info!(
            "Wrote {} consensus spectra, skipped {} clusters",
            summary.n_written,
            summary.skipped.len()
        );
        Ok((summary, writer))
    }

    #[cfg(feature = "parallelism")]
    fn reduce_all(
        &self,
        clusters: ClusterMap,
        sender: SyncSender<(usize, ClusterResult)>,
        abort: &AtomicBool,
    ) -> Result<(), PipelineError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.threads)
            .build()
            .map_err(|e| PipelineError::ThreadPool(e.to_string()))?;
        debug!("Reducing clusters on {} threads", pool.current_num_threads());
        let binning = &self.config.binning;
        pool.install(|| {
            clusters.into_iter().enumerate().par_bridge().for_each_with(
                sender,
                |sender, (index, (cluster_id, members))| {
                    reduce_one(index, &cluster_id, &members, binning, sender, abort)
                },
            )
        });
        Ok(())
    }

    #[cfg(not(feature = "parallelism"))]
    fn reduce_all(
        &self,
        clusters: ClusterMap,
        sender: SyncSender<(usize, ClusterResult)>,
        abort: &AtomicBool,
    ) -> Result<(), PipelineError> {
        if self.config.threads > 1 {
            warn!("Built without thread pool support, reducing clusters sequentially");
        }
        for (index, (cluster_id, members)) in clusters.into_iter().enumerate() {
            reduce_one(index, &cluster_id, &members, &self.config.binning, &sender, abort);
        }
        Ok(())
    }

    /// Read a clustered MGF file from `input` and write its consensus spectra to `output`.
    ///
    /// `input` may be gzip-compressed. `output` is gzip-compressed when its name ends in `.gz`.
    pub fn run_paths<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        input: P,
        output: Q,
    ) -> Result<PipelineSummary, PipelineError> {
        let input = input.as_ref();
        info!("Reading clustered peak lists from {}", input.display());
        let handle = open_input(input).map_err(|e| PipelineError::io(input, e))?;
        let clusters =
            group_by_cluster(MGFReader::new(handle)).map_err(|e| PipelineError::format(input, e))?;
        self.run_to_path(clusters, output.as_ref())
    }

    /// Read cluster membership from the list at `cluster_list`, look up each member in
    /// the MGF file at `source` by its title, and write the consensus spectra to `output`.
    pub fn run_cluster_list<P: AsRef<Path>, S: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        cluster_list: P,
        source: S,
        output: Q,
    ) -> Result<PipelineSummary, PipelineError> {
        let cluster_list = cluster_list.as_ref();
        let source = source.as_ref();
        info!("Reading cluster membership from {}", cluster_list.display());
        let members = fs::File::open(cluster_list)
            .map(io::BufReader::new)
            .and_then(read_cluster_list)
            .map_err(|e| PipelineError::io(cluster_list, e))?;

        let mut header = [0u8; 2];
        let n = fs::File::open(source)
            .and_then(|mut handle| handle.read(&mut header))
            .map_err(|e| PipelineError::io(source, e))?;
        let clusters = if is_gzipped(&header[..n]) {
            debug!("Decompressing {} into memory for indexing", source.display());
            let mut buffer = Vec::new();
            open_input(source)
                .and_then(|mut handle| handle.read_to_end(&mut buffer))
                .map_err(|e| PipelineError::io(source, e))?;
            assemble_from(&members, io::Cursor::new(buffer), source)?
        } else {
            let handle = fs::File::open(source).map_err(|e| PipelineError::io(source, e))?;
            assemble_from(&members, handle, source)?
        };
        self.run_to_path(clusters, output.as_ref())
    }

    fn run_to_path(
        &self,
        clusters: ClusterMap,
        output: &Path,
    ) -> Result<PipelineSummary, PipelineError> {
        let sink = create_output(output).map_err(|e| PipelineError::io(output, e))?;
        let (summary, writer) = self
            .run(clusters, MGFWriter::new(sink))
            .map_err(|e| e.on_output(output))?;
        let sink: OutputSink = writer
            .into_inner()
            .into_inner()
            .map_err(|e| PipelineError::io(output, e.into_error()))?;
        sink.finish().map_err(|e| PipelineError::io(output, e))?;
        info!("Consensus spectra written to {}", output.display());
        Ok(summary)
    }
}

fn assemble_from<R: SeekRead>(
    members: &[Vec<String>],
    handle: R,
    path: &Path,
) -> Result<ClusterMap, PipelineError> {
    let mut reader = MGFReaderType::new_indexed(handle, SpectrumTitle)
        .map_err(|e| PipelineError::format(path, e))?;
    debug!("Indexed {} spectra in {}", reader.len(), path.display());
    Ok(assemble_clusters(members, &mut reader))
}

fn reduce_one(
    index: usize,
    cluster_id: &str,
    members: &[PeakList],
    binning: &BinningParameters,
    sender: &SyncSender<(usize, ClusterResult)>,
    abort: &AtomicBool,
) {
    if abort.load(Ordering::Relaxed) {
        return;
    }
    let result = combine_bin_mean(members, binning);
    if let Err(e) = &result {
        debug!("Cluster {cluster_id} failed: {e}");
    }
    if sender.send((index, result)).is_err() {
        debug!("Writer stopped before cluster {cluster_id} could be sent");
    }
}

/// Receive reduced clusters in any order and write them in index order.
///
/// Returns the number of spectra written, the skipped clusters, and the writer.
fn write_in_order<W: ConsensusWriter>(
    receiver: Receiver<(usize, ClusterResult)>,
    mut writer: W,
    policy: ClusterFailurePolicy,
    abort: &AtomicBool,
) -> Result<(usize, Vec<ConsensusError>, W), PipelineError> {
    let mut collator = Collator::default();
    let mut n_written = 0;
    let mut skipped = Vec::new();
    for (index, result) in receiver.iter() {
        collator.receive(index, result);
        while let Some((_, result)) = collator.try_next() {
            match result {
                Ok(spectrum) => {
                    debug!(
                        "Writing cluster {} with {} peaks merged from {} members",
                        spectrum.cluster_id,
                        spectrum.len(),
                        spectrum.n_members
                    );
                    n_written += writer.write(&spectrum).map_err(PipelineError::Write)?;
                }
                Err(e) => match policy {
                    ClusterFailurePolicy::Abort => {
                        abort.store(true, Ordering::Relaxed);
                        error!("Aborting: {e}");
                        writer.close().map_err(PipelineError::Write)?;
                        return Err(PipelineError::Cluster(e));
                    }
                    ClusterFailurePolicy::Skip => {
                        warn!("Skipping cluster: {e}");
                        skipped.push(e);
                    }
                },
            }
        }
    }
    if !collator.is_empty() {
        warn!(
            "{} reduced clusters were left waiting for an earlier cluster",
            collator.len()
        );
    }
    writer.close().map_err(PipelineError::Write)?;
    Ok((n_written, skipped, writer))
}
