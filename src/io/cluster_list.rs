//! Build clusters from an external cluster membership list instead of from
//! cluster-annotated titles.
//!
//! The list is a whitespace-separated table in the style of MaRaCluster's
//! `clusters_p*.tsv` output: one spectrum per line with the spectrum identifier in
//! the second column, and a blank line closing each cluster.
use std::io::{self, prelude::*};

use log::{debug, warn};

use super::traits::PeakListSource;
use crate::spectrum::ClusterMap;

/// Read a cluster membership list into one list of spectrum identifiers per cluster,
/// in file order. Empty clusters are dropped.
pub fn read_cluster_list<R: BufRead>(reader: R) -> io::Result<Vec<Vec<String>>> {
    let mut clusters = Vec::new();
    let mut cluster: Vec<String> = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let mut columns = line.split_whitespace();
        let first = columns.next();
        if first.is_none() {
            if !cluster.is_empty() {
                clusters.push(std::mem::take(&mut cluster));
            }
            continue;
        }
        match columns.next() {
            Some(spectrum_id) => cluster.push(spectrum_id.to_string()),
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "Line {}: expected at least two columns in cluster list, found {line:?}",
                        i + 1
                    ),
                ))
            }
        }
    }
    if !cluster.is_empty() {
        clusters.push(cluster);
    }
    debug!("Read {} clusters from cluster list", clusters.len());
    Ok(clusters)
}

/// Fetch the members of each cluster from `source`, naming clusters by their
/// zero-based position in `cluster_list`.
///
/// Identifiers `source` cannot resolve are skipped with a warning. A cluster
/// with no resolvable members is omitted.
pub fn assemble_clusters<S: PeakListSource + ?Sized>(
    cluster_list: &[Vec<String>],
    source: &mut S,
) -> ClusterMap {
    let mut clusters = ClusterMap::new();
    for (i, members) in cluster_list.iter().enumerate() {
        let cluster_id = i.to_string();
        let mut n_found = 0;
        for spectrum_id in members {
            match source.get_peak_list_by_id(spectrum_id) {
                Some(peak_list) => {
                    clusters.push(peak_list.with_cluster_id(cluster_id.as_str()));
                    n_found += 1;
                }
                None => {
                    warn!("Spectrum {spectrum_id} of cluster {cluster_id} was not found, skipping")
                }
            }
        }
        if n_found == 0 {
            warn!("Cluster {cluster_id} has no resolvable members, omitting it");
        }
    }
    clusters
}
