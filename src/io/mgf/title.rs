/// The identifiers carried on an MGF `TITLE=` line
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MGFTitle {
    pub cluster_id: String,
    pub spectrum_id: String,
}

impl MGFTitle {
    pub fn new(cluster_id: impl Into<String>, spectrum_id: impl Into<String>) -> Self {
        Self {
            cluster_id: cluster_id.into(),
            spectrum_id: spectrum_id.into(),
        }
    }
}

/// Interpret the text of a `TITLE=` line
pub trait TitleParser {
    /// Split `title` into its cluster and spectrum identifiers, or `None` if it
    /// is not in the expected shape.
    fn parse_title(&self, title: &str) -> Option<MGFTitle>;

    /// Describes the expected title shape in error messages
    fn expected(&self) -> &'static str;
}

/// Titles of the form `cluster_id;spectrum_identifier`, as emitted by clustering
/// tools that annotate their MGF output. Only the first `;` separates the two.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClusteredTitle;

impl TitleParser for ClusteredTitle {
    fn parse_title(&self, title: &str) -> Option<MGFTitle> {
        title
            .split_once(';')
            .map(|(cluster_id, spectrum_id)| MGFTitle::new(cluster_id, spectrum_id))
    }

    fn expected(&self) -> &'static str {
        "cluster_id;spectrum_identifier"
    }
}

/// Titles holding only a cluster identifier, as written for consensus spectra
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsensusTitle;

impl TitleParser for ConsensusTitle {
    fn parse_title(&self, title: &str) -> Option<MGFTitle> {
        Some(MGFTitle::new(title, title))
    }

    fn expected(&self) -> &'static str {
        "cluster_id"
    }
}

/// Titles holding only a spectrum identifier. The cluster is assigned elsewhere.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpectrumTitle;

impl TitleParser for SpectrumTitle {
    fn parse_title(&self, title: &str) -> Option<MGFTitle> {
        Some(MGFTitle::new("", title))
    }

    fn expected(&self) -> &'static str {
        "spectrum_identifier"
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_clustered_title() {
        let title = ClusteredTitle
            .parse_title("cluster-12;mzspec:PXD000561:run;1:scan:17555")
            .unwrap();
        assert_eq!(title.cluster_id, "cluster-12");
        assert_eq!(title.spectrum_id, "mzspec:PXD000561:run;1:scan:17555");
        assert!(ClusteredTitle.parse_title("no separator").is_none());
        assert_eq!(
            ClusteredTitle.parse_title(";orphan").unwrap(),
            MGFTitle::new("", "orphan")
        );
    }

    #[test]
    fn test_plain_titles() {
        assert_eq!(
            ConsensusTitle.parse_title("42").unwrap(),
            MGFTitle::new("42", "42")
        );
        assert_eq!(
            SpectrumTitle.parse_title("scan=9").unwrap(),
            MGFTitle::new("", "scan=9")
        );
    }
}
