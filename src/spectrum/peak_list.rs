use thiserror::Error;

/// The m/z and intensity arrays given for a peak list were not the same length
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Spectrum {spectrum_id:?} has {mz_len} m/z values but {intensity_len} intensities")]
pub struct UnpairedArrays {
    pub spectrum_id: String,
    pub mz_len: usize,
    pub intensity_len: usize,
}

/// A single centroided MSn peak list belonging to a cluster.
///
/// The m/z and intensity arrays are positionally paired and always have the
/// same length. They are not required to be sorted.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PeakList {
    cluster_id: String,
    spectrum_id: String,
    precursor_mz: f64,
    precursor_charge: i32,
    mz_array: Vec<f64>,
    intensity_array: Vec<f32>,
}

impl PeakList {
    /// Create a new peak list, checking that the arrays are paired.
    pub fn try_new(
        cluster_id: impl Into<String>,
        spectrum_id: impl Into<String>,
        precursor_mz: f64,
        precursor_charge: i32,
        mz_array: Vec<f64>,
        intensity_array: Vec<f32>,
    ) -> Result<Self, UnpairedArrays> {
        let spectrum_id = spectrum_id.into();
        if mz_array.len() != intensity_array.len() {
            return Err(UnpairedArrays {
                spectrum_id,
                mz_len: mz_array.len(),
                intensity_len: intensity_array.len(),
            });
        }
        Ok(Self {
            cluster_id: cluster_id.into(),
            spectrum_id,
            precursor_mz,
            precursor_charge,
            mz_array,
            intensity_array,
        })
    }

    /// Create a new peak list.
    ///
    /// # Panics
    /// If `mz_array` and `intensity_array` differ in length. See [`PeakList::try_new`]
    /// for the fallible version.
    pub fn new(
        cluster_id: impl Into<String>,
        spectrum_id: impl Into<String>,
        precursor_mz: f64,
        precursor_charge: i32,
        mz_array: Vec<f64>,
        intensity_array: Vec<f32>,
    ) -> Self {
        match Self::try_new(
            cluster_id,
            spectrum_id,
            precursor_mz,
            precursor_charge,
            mz_array,
            intensity_array,
        ) {
            Ok(peak_list) => peak_list,
            Err(e) => panic!("{e}"),
        }
    }

    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    pub fn spectrum_id(&self) -> &str {
        &self.spectrum_id
    }

    pub fn precursor_mz(&self) -> f64 {
        self.precursor_mz
    }

    pub fn precursor_charge(&self) -> i32 {
        self.precursor_charge
    }

    pub fn mz_array(&self) -> &[f64] {
        &self.mz_array
    }

    pub fn intensity_array(&self) -> &[f32] {
        &self.intensity_array
    }

    pub fn len(&self) -> usize {
        self.mz_array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz_array.is_empty()
    }

    /// Iterate over `(m/z, intensity)` pairs in stored order
    pub fn iter(&self) -> impl Iterator<Item = (f64, f32)> + '_ {
        self.mz_array
            .iter()
            .copied()
            .zip(self.intensity_array.iter().copied())
    }

    /// Re-home this peak list under another cluster, consuming it.
    pub fn with_cluster_id(self, cluster_id: impl Into<String>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            ..self
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pairs() {
        let peaks = PeakList::new(
            "7",
            "scan=12",
            450.5,
            2,
            vec![300.0, 150.0, 220.0],
            vec![5.0, 10.0, 1.0],
        );
        assert_eq!(peaks.len(), 3);
        let pairs: Vec<_> = peaks.iter().collect();
        assert_eq!(pairs[1], (150.0, 10.0));
    }

    #[test]
    fn test_with_cluster_id() {
        let peaks = PeakList::new("", "scan=1", 500.0, 3, vec![], vec![]);
        assert!(peaks.is_empty());
        let peaks = peaks.with_cluster_id("42");
        assert_eq!(peaks.cluster_id(), "42");
        assert_eq!(peaks.spectrum_id(), "scan=1");
    }

    #[test]
    fn test_try_new_rejects_unpaired_arrays() {
        let err = PeakList::try_new("1", "a", 100.0, 1, vec![1.0, 2.0], vec![1.0]).unwrap_err();
        assert_eq!(
            err,
            UnpairedArrays {
                spectrum_id: "a".into(),
                mz_len: 2,
                intensity_len: 1
            }
        );
        let peaks = PeakList::try_new("1", "a", 100.0, 1, vec![1.0], vec![1.0]).unwrap();
        assert_eq!(peaks.len(), 1);
    }

    #[test]
    #[should_panic]
    fn test_unpaired_arrays() {
        PeakList::new("1", "a", 100.0, 1, vec![1.0, 2.0], vec![1.0]);
    }
}
