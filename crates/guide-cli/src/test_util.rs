use guide_lib::labels::LabelSet;
use guide_lib::vision::ClassificationResult;

pub use guide_lib::test_util::{RecordingGenerator, ScriptedClassifier};
pub use guide_test_util::scores::peaked_scores;

/// The canonical scenario: `sphinx` at 92% over the built-in labels.
pub fn sphinx_result() -> ClassificationResult {
    ClassificationResult::from_scores(&LabelSet::default(), &peaked_scores(10, 9, 0.92)).unwrap()
}
