use std::collections::HashSet;
use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::debug;

use crate::error::GuideError;

/// Landmark labels the bundled vision model was trained on, in output order.
pub const DEFAULT_LABELS: &[&str] = &[
    "AmenhotebIII and wife Tiye",
    "Bent pyramid for senefru",
    "Colossoi of Memnon",
    "Hatshepsut",
    "Khafre Pyramid",
    "Ramesses II",
    "Temple of Ramessum",
    "The Great Temple of Ramesses II",
    "Tut Ankh Amun",
    "sphinx",
];

/// File name of an optional label override next to the vision model.
pub const LABELS_FILE: &str = "labels.txt";

/// Fixed, ordered set of topic labels.
///
/// Index `i` names the `i`-th score of the vision model output. The set is
/// validated once and never changes afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSet {
    labels: Vec<String>,
}

impl LabelSet {
    /// Build a label set, rejecting empty sets, blank labels and duplicates.
    pub fn new<I, S>(labels: I) -> Result<Self, GuideError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.is_empty() {
            return Err(GuideError::InvalidConfig("label set is empty".into()));
        }

        let mut seen = HashSet::new();
        for label in &labels {
            if label.trim().is_empty() {
                return Err(GuideError::InvalidConfig("label set contains a blank label".into()));
            }
            if !seen.insert(label.as_str()) {
                return Err(GuideError::InvalidConfig(format!(
                    "label set contains duplicate label {label:?}"
                )));
            }
        }

        Ok(Self { labels })
    }

    /// Load labels from `dir/labels.txt` if present, otherwise use the
    /// built-in [`DEFAULT_LABELS`].
    ///
    /// Blank lines are skipped; surrounding whitespace is trimmed.
    pub fn load_or_default(dir: &Path) -> anyhow::Result<Self> {
        let path = dir.join(LABELS_FILE);
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let labels = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty());
        let set = Self::new(labels).with_context(|| format!("Invalid {}", path.display()))?;
        debug!(path = %path.display(), count = set.len(), "Loaded label override");
        Ok(set)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }
}

impl Default for LabelSet {
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABELS.iter().map(|l| (*l).to_string()).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_set_has_ten_labels() {
        let labels = LabelSet::default();
        assert_eq!(labels.len(), 10);
        assert_eq!(labels.get(0), Some("AmenhotebIII and wife Tiye"));
        assert_eq!(labels.get(9), Some("sphinx"));
        assert!(labels.contains("Hatshepsut"));
        assert!(!labels.contains("Eiffel Tower"));
    }

    #[test]
    fn rejects_empty_set() {
        let err = LabelSet::new(Vec::<String>::new()).unwrap_err();
        assert!(matches!(err, GuideError::InvalidConfig(_)));
    }

    #[test]
    fn rejects_duplicates_and_blanks() {
        assert!(LabelSet::new(["a", "b", "a"]).is_err());
        assert!(LabelSet::new(["a", "  "]).is_err());
    }

    #[test]
    fn load_falls_back_to_default_without_file() {
        let tmp = tempfile::tempdir().unwrap();
        let labels = LabelSet::load_or_default(tmp.path()).unwrap();
        assert_eq!(labels, LabelSet::default());
    }

    #[test]
    fn load_reads_override_file() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(LABELS_FILE), "Karnak\n\n  Luxor Temple \nAbu Simbel\n").unwrap();
        let labels = LabelSet::load_or_default(tmp.path()).unwrap();
        let all: Vec<&str> = labels.iter().collect();
        assert_eq!(all, vec!["Karnak", "Luxor Temple", "Abu Simbel"]);
    }

    #[test]
    fn load_rejects_invalid_override_file() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join(LABELS_FILE), "Karnak\nKarnak\n").unwrap();
        assert!(LabelSet::load_or_default(tmp.path()).is_err());
    }
}
