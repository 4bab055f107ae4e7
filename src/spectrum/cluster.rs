use indexmap::map::{IntoIter, Iter};
use indexmap::IndexMap;

use super::peak_list::PeakList;

/**
An ordered mapping from cluster ID to the peak lists assigned to that cluster.

Clusters are kept in the order their first member was encountered, and members
in the order they were added. A cluster only exists once it has at least one
member.

A wrapper around [`indexmap::IndexMap`].
*/
#[derive(Debug, Default, Clone)]
pub struct ClusterMap {
    clusters: IndexMap<String, Vec<PeakList>>,
}

impl ClusterMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `peak_list` to the cluster named by its [`PeakList::cluster_id`]
    pub fn push(&mut self, peak_list: PeakList) {
        if let Some(members) = self.clusters.get_mut(peak_list.cluster_id()) {
            members.push(peak_list);
        } else {
            self.clusters
                .insert(peak_list.cluster_id().to_string(), vec![peak_list]);
        }
    }

    #[inline]
    pub fn get(&self, cluster_id: &str) -> Option<&[PeakList]> {
        self.clusters.get(cluster_id).map(|v| v.as_slice())
    }

    #[inline]
    pub fn get_index(&self, index: usize) -> Option<(&str, &[PeakList])> {
        self.clusters
            .get_index(index)
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    /// The number of clusters
    #[inline]
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// The number of peak lists across all clusters
    pub fn n_peak_lists(&self) -> usize {
        self.clusters.values().map(|v| v.len()).sum()
    }

    pub fn contains_key(&self, cluster_id: &str) -> bool {
        self.clusters.contains_key(cluster_id)
    }

    pub fn iter(&self) -> Iter<'_, String, Vec<PeakList>> {
        self.clusters.iter()
    }
}

impl IntoIterator for ClusterMap {
    type Item = (String, Vec<PeakList>);
    type IntoIter = IntoIter<String, Vec<PeakList>>;

    fn into_iter(self) -> Self::IntoIter {
        self.clusters.into_iter()
    }
}

impl FromIterator<PeakList> for ClusterMap {
    fn from_iter<T: IntoIterator<Item = PeakList>>(iter: T) -> Self {
        let mut map = Self::new();
        iter.into_iter().for_each(|p| map.push(p));
        map
    }
}

impl Extend<PeakList> for ClusterMap {
    fn extend<T: IntoIterator<Item = PeakList>>(&mut self, iter: T) {
        iter.into_iter().for_each(|p| self.push(p));
    }
}

/// Drain a stream of parsed peak lists into a [`ClusterMap`], stopping at
/// the first error.
pub fn group_by_cluster<I, E>(peak_lists: I) -> Result<ClusterMap, E>
where
    I: IntoIterator<Item = Result<PeakList, E>>,
{
    let mut clusters = ClusterMap::new();
    for peak_list in peak_lists {
        clusters.push(peak_list?);
    }
    log::debug!(
        "Grouped {} peak lists into {} clusters",
        clusters.n_peak_lists(),
        clusters.len()
    );
    Ok(clusters)
}
