/// The representative spectrum summarizing one cluster.
///
/// `mz_array` is ascending and `intensity_array` is parallel to it. Both hold
/// only bins that met the quorum.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ConsensusSpectrum {
    pub cluster_id: String,
    pub mz_array: Vec<f64>,
    pub intensity_array: Vec<f32>,
    pub precursor_mz: f64,
    pub precursor_charge: i32,
    /// How many peak lists were reduced into this spectrum
    pub n_members: usize,
}

impl ConsensusSpectrum {
    pub fn len(&self) -> usize {
        self.mz_array.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mz_array.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f32)> + '_ {
        self.mz_array
            .iter()
            .copied()
            .zip(self.intensity_array.iter().copied())
    }
}
