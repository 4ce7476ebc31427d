use tracing::{debug, info, warn};

use super::turn::{History, Turn};
use crate::config::FALLBACK_TOPIC;
use crate::error::GuideError;
use crate::generation::TextGenerator;
use crate::vision::{ClassificationResult, ClassificationService};

/// Notice shown when the vision service cannot be reached.
pub const SERVICE_DOWN_NOTICE: &str =
    "Error: Vision Service is not running. Please run 'guide serve' in a separate terminal.";

/// Topic and history of one conversation.
///
/// Idle until the first successful classification sets a topic; engaged
/// afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    current_topic: Option<String>,
    history: History,
}

impl SessionState {
    pub fn current_topic(&self) -> Option<&str> {
        self.current_topic.as_deref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn is_engaged(&self) -> bool {
        self.current_topic.is_some()
    }
}

/// Result of submitting an image.
#[derive(Debug, Clone, PartialEq)]
pub enum StartOutcome {
    /// The session was reset around the identified landmark.
    Identified(ClassificationResult),
    /// Classification failed. The notice is shown but not stored, and the
    /// session is unchanged.
    Failed(Turn),
}

/// Result of submitting a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AskOutcome {
    /// The question was blank; nothing changed.
    Ignored,
    /// Both turns were appended; carries the assistant answer.
    Answered(Turn),
    /// Generation failed; the user turn and an error turn were appended.
    Failed(Turn),
}

/// Single writer of a [`SessionState`].
///
/// Owns the classification service and the text generator for one
/// conversation. Every per-request failure is converted into a turn here.
pub struct Orchestrator<C, G> {
    classifier: C,
    generator: G,
    state: SessionState,
}

impl<C: ClassificationService, G: TextGenerator> Orchestrator<C, G> {
    pub fn new(classifier: C, generator: G) -> Self {
        Self {
            classifier,
            generator,
            state: SessionState::default(),
        }
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn history(&self) -> &History {
        &self.state.history
    }

    pub fn current_topic(&self) -> Option<&str> {
        self.state.current_topic()
    }

    /// Identify the landmark in `image` and restart the conversation on it.
    pub fn start_session(&mut self, image: &[u8]) -> StartOutcome {
        match self.classifier.classify(image) {
            Ok(result) => {
                info!(
                    topic = result.label(),
                    confidence = result.confidence(),
                    "Session started"
                );
                self.state = SessionState {
                    current_topic: Some(result.label().to_string()),
                    history: History::starting_with(Turn::assistant(welcome_message(&result))),
                };
                StartOutcome::Identified(result)
            }
            Err(err) => {
                warn!(error = %err, "Classification failed");
                StartOutcome::Failed(Turn::assistant(classification_notice(&err)))
            }
        }
    }

    /// Answer `question` about the current topic.
    ///
    /// Blank questions are ignored. Without a topic the question is answered
    /// about [`FALLBACK_TOPIC`] and the session stays idle.
    pub fn ask(&mut self, question: &str) -> AskOutcome {
        if question.trim().is_empty() {
            return AskOutcome::Ignored;
        }

        let topic = self.state.current_topic().unwrap_or(FALLBACK_TOPIC);
        let prompt = build_prompt(topic, question);
        debug!(topic, "Generating answer");

        self.state.history.push(Turn::user(question));
        match self.generator.generate(&prompt) {
            Ok(answer) => {
                let turn = Turn::assistant(answer);
                self.state.history.push(turn.clone());
                AskOutcome::Answered(turn)
            }
            Err(err) => {
                warn!(error = %err, "Generation failed");
                let turn = Turn::assistant(format!("Error generating response: {err}"));
                self.state.history.push(turn.clone());
                AskOutcome::Failed(turn)
            }
        }
    }
}

/// Prompt that conditions the language model on `topic`.
pub fn build_prompt(topic: &str, question: &str) -> String {
    format!("tell me information about {topic}: {question}")
}

/// First assistant turn of a freshly identified session.
pub fn welcome_message(result: &ClassificationResult) -> String {
    format!(
        "I identified this artifact as **{}** ({:.1}% confidence). What would you like to know about it?",
        result.label(),
        result.confidence()
    )
}

/// User-facing text for a failed classification.
pub fn classification_notice(err: &GuideError) -> String {
    match err {
        GuideError::ServiceUnavailable(_) => SERVICE_DOWN_NOTICE.to_string(),
        GuideError::InvalidImage(detail) => {
            format!("Error: The image could not be read ({detail}).")
        }
        GuideError::Classification(detail) => format!("Error from Vision API: {detail}"),
        GuideError::ModelLoad(_) | GuideError::Generation(_) | GuideError::InvalidConfig(_) => {
            format!("Error: {err}")
        }
    }
}

#[cfg(test)]
mod tests {
    use guide_test_util::scores::peaked_scores;

    use super::*;
    use crate::labels::LabelSet;
    use crate::session::turn::Role;
    use crate::test_util::{RecordingGenerator, ScriptedClassifier};

    fn sphinx_result() -> ClassificationResult {
        ClassificationResult::from_scores(&LabelSet::default(), &peaked_scores(10, 9, 0.92))
            .unwrap()
    }

    fn hatshepsut_result() -> ClassificationResult {
        ClassificationResult::from_scores(&LabelSet::default(), &peaked_scores(10, 3, 0.7))
            .unwrap()
    }

    fn engaged_orchestrator() -> Orchestrator<ScriptedClassifier, RecordingGenerator> {
        let classifier = ScriptedClassifier::new(vec![Ok(sphinx_result())]);
        let mut orchestrator = Orchestrator::new(classifier, RecordingGenerator::replying("ok"));
        orchestrator.start_session(b"img");
        orchestrator
    }

    // --- start_session ---

    #[test]
    fn starts_idle() {
        let orchestrator =
            Orchestrator::new(ScriptedClassifier::new(vec![]), RecordingGenerator::replying(""));
        assert!(!orchestrator.state().is_engaged());
        assert!(orchestrator.history().is_empty());
        assert_eq!(orchestrator.current_topic(), None);
    }

    #[test]
    fn sphinx_scenario_resets_to_welcome_turn() {
        let orchestrator = engaged_orchestrator();

        assert_eq!(orchestrator.current_topic(), Some("sphinx"));
        assert_eq!(orchestrator.history().len(), 1);
        let welcome = &orchestrator.history().turns()[0];
        assert_eq!(welcome.role(), Role::Assistant);
        assert_eq!(
            welcome.content(),
            "I identified this artifact as **sphinx** (92.0% confidence). \
             What would you like to know about it?"
        );
    }

    #[test]
    fn new_image_replaces_existing_history() {
        let classifier =
            ScriptedClassifier::new(vec![Ok(sphinx_result()), Ok(hatshepsut_result())]);
        let mut orchestrator = Orchestrator::new(classifier, RecordingGenerator::replying("ok"));
        orchestrator.start_session(b"first");
        orchestrator.ask("Who built it?");
        orchestrator.ask("When?");
        assert_eq!(orchestrator.history().len(), 5);

        let outcome = orchestrator.start_session(b"second");

        assert!(matches!(outcome, StartOutcome::Identified(ref r) if r.label() == "Hatshepsut"));
        assert_eq!(orchestrator.current_topic(), Some("Hatshepsut"));
        assert_eq!(orchestrator.history().len(), 1);
        assert!(orchestrator.history().turns()[0].content().contains("70.0%"));
    }

    #[test]
    fn unreachable_service_leaves_state_unchanged() {
        let classifier = ScriptedClassifier::new(vec![
            Ok(sphinx_result()),
            Err(GuideError::ServiceUnavailable("connection refused".into())),
        ]);
        let mut orchestrator = Orchestrator::new(classifier, RecordingGenerator::replying("ok"));
        orchestrator.start_session(b"first");
        let before = orchestrator.state().clone();

        let outcome = orchestrator.start_session(b"second");

        match outcome {
            StartOutcome::Failed(turn) => {
                assert_eq!(turn.role(), Role::Assistant);
                assert!(turn.content().contains("guide serve"));
                assert!(turn.content().contains("not running"));
            }
            StartOutcome::Identified(_) => panic!("expected failure"),
        }
        assert_eq!(orchestrator.state(), &before);
    }

    #[test]
    fn invalid_image_from_idle_stays_idle() {
        let classifier =
            ScriptedClassifier::new(vec![Err(GuideError::InvalidImage("bad header".into()))]);
        let mut orchestrator = Orchestrator::new(classifier, RecordingGenerator::replying("ok"));

        let outcome = orchestrator.start_session(b"junk");

        assert!(matches!(outcome, StartOutcome::Failed(ref t) if t.content().contains("bad header")));
        assert!(!orchestrator.state().is_engaged());
        assert!(orchestrator.history().is_empty());
    }

    // --- ask ---

    #[test]
    fn prompt_is_conditioned_on_topic() {
        let mut orchestrator = engaged_orchestrator();
        orchestrator.ask("Who built it?");
        assert_eq!(
            orchestrator.generator.prompts,
            vec!["tell me information about sphinx: Who built it?".to_string()]
        );
    }

    #[test]
    fn ask_appends_user_then_assistant() {
        let mut orchestrator = engaged_orchestrator();

        let outcome = orchestrator.ask("Who built it?");

        assert_eq!(outcome, AskOutcome::Answered(Turn::assistant("ok")));
        let turns = orchestrator.history().turns();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[1], Turn::user("Who built it?"));
        assert_eq!(turns[2], Turn::assistant("ok"));
        assert_eq!(orchestrator.current_topic(), Some("sphinx"));
    }

    #[test]
    fn blank_question_is_a_no_op() {
        let mut orchestrator = engaged_orchestrator();
        let before = orchestrator.state().clone();

        assert_eq!(orchestrator.ask(""), AskOutcome::Ignored);
        assert_eq!(orchestrator.ask("   \t"), AskOutcome::Ignored);

        assert_eq!(orchestrator.state(), &before);
        assert!(orchestrator.generator.prompts.is_empty());
    }

    #[test]
    fn idle_question_uses_fallback_topic() {
        let mut orchestrator =
            Orchestrator::new(ScriptedClassifier::new(vec![]), RecordingGenerator::replying("Giza"));

        orchestrator.ask("What is famous here?");

        assert_eq!(
            orchestrator.generator.prompts,
            vec!["tell me information about Egypt: What is famous here?".to_string()]
        );
        assert_eq!(orchestrator.current_topic(), None);
        assert_eq!(orchestrator.history().len(), 2);
    }

    #[test]
    fn generation_failure_keeps_topic_and_records_error() {
        let classifier = ScriptedClassifier::new(vec![Ok(sphinx_result())]);
        let mut orchestrator =
            Orchestrator::new(classifier, RecordingGenerator::failing("decoder exploded"));
        orchestrator.start_session(b"img");

        let outcome = orchestrator.ask("Who built it?");

        match outcome {
            AskOutcome::Failed(turn) => {
                assert!(turn.content().starts_with("Error generating response:"));
                assert!(turn.content().contains("decoder exploded"));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
        assert_eq!(orchestrator.current_topic(), Some("sphinx"));
        assert_eq!(orchestrator.history().len(), 3);
    }

    // --- notices ---

    #[test]
    fn notices_distinguish_failure_kinds() {
        let down = classification_notice(&GuideError::ServiceUnavailable("refused".into()));
        let invalid = classification_notice(&GuideError::InvalidImage("truncated".into()));
        let remote = classification_notice(&GuideError::Classification("status 500".into()));

        assert_eq!(down, SERVICE_DOWN_NOTICE);
        assert!(invalid.contains("truncated"));
        assert!(!invalid.contains("not running"));
        assert_eq!(remote, "Error from Vision API: status 500");
    }
}
