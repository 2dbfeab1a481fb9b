//! Comprehension checks with shuffled options and bounded attempts.

use rand::Rng;
use study_core::{
    shuffle_with_index, ComprehensionCheck, ComprehensionOption, ErrorInfo, Indexed, StudyError,
};

/// Result of submitting an answer to a comprehension check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckOutcome {
    /// Correct answer.
    Passed,
    /// Wrong answer; the check is shown again with its selection cleared.
    Retry,
    /// Wrong answer that exhausted `maxAttempts`.
    Failed,
}

/// Feedback line shown above the options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckMessage<'a> {
    /// The configured retry message.
    Retry(&'a str),
    /// Last-chance warning, shown while exactly one attempt remains.
    Warning(&'a str),
}

/// Progress through a single comprehension check.
///
/// Options are shuffled once when the check is entered and keep that order
/// across retries; participants select by displayed position.
#[derive(Debug, Clone)]
pub struct CheckAttempt {
    index: usize,
    options: Vec<Indexed<ComprehensionOption>>,
    selected: Option<usize>,
    wrong_count: u32,
}

impl CheckAttempt {
    /// Enters check `index`, drawing its option order from `rng`.
    pub fn new<R: Rng + ?Sized>(index: usize, check: &ComprehensionCheck, rng: &mut R) -> Self {
        Self {
            index,
            options: shuffle_with_index(&check.options, rng),
            selected: None,
            wrong_count: 0,
        }
    }

    /// Position of the check in the configured sequence.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Options in display order.
    pub fn options(&self) -> &[Indexed<ComprehensionOption>] {
        &self.options
    }

    /// Displayed position of the current selection.
    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Wrong answers so far.
    pub fn wrong_count(&self) -> u32 {
        self.wrong_count
    }

    /// Selects the option shown at `displayed`.
    pub fn select(&mut self, displayed: usize) -> Result<(), StudyError> {
        if displayed >= self.options.len() {
            return Err(StudyError::Session(
                ErrorInfo::new("session-invalid-option", "no option at that position")
                    .with_context("position", displayed.to_string())
                    .with_context("options", self.options.len().to_string()),
            ));
        }
        self.selected = Some(displayed);
        Ok(())
    }

    /// Grades the current selection.
    ///
    /// A wrong answer clears the selection and counts towards `maxAttempts`.
    pub fn submit(&mut self, check: &ComprehensionCheck) -> Result<CheckOutcome, StudyError> {
        let displayed = self.selected.ok_or_else(|| {
            StudyError::Session(ErrorInfo::new(
                "session-no-selection",
                "an option must be selected before submitting",
            ))
        })?;
        if self.options[displayed].item.correct {
            return Ok(CheckOutcome::Passed);
        }
        self.wrong_count += 1;
        self.selected = None;
        match check.max_attempts {
            Some(max) if self.wrong_count >= max => Ok(CheckOutcome::Failed),
            _ => Ok(CheckOutcome::Retry),
        }
    }

    /// Configured position of the option shown at `displayed`.
    pub fn original_index(&self, displayed: usize) -> Option<usize> {
        self.options.get(displayed).map(|entry| entry.original_index)
    }

    /// Feedback for the next display: none before the first wrong answer, the
    /// kick warning while one attempt remains, otherwise the retry message.
    pub fn message<'c>(&self, check: &'c ComprehensionCheck) -> Option<CheckMessage<'c>> {
        if self.wrong_count == 0 {
            return None;
        }
        match (&check.kick_warning, check.max_attempts) {
            (Some(warning), Some(max)) if self.wrong_count + 1 == max => {
                Some(CheckMessage::Warning(warning))
            }
            _ => Some(CheckMessage::Retry(&check.retry_message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::RngHandle;

    fn check(max_attempts: Option<u32>, kick_warning: Option<&str>) -> ComprehensionCheck {
        ComprehensionCheck {
            id: "def".into(),
            definition: "A definition".into(),
            question: "Which is right?".into(),
            options: vec![
                ComprehensionOption {
                    text: "Wrong".into(),
                    correct: false,
                },
                ComprehensionOption {
                    text: "Right".into(),
                    correct: true,
                },
            ],
            retry_message: "Try again".into(),
            max_attempts,
            kick_warning: kick_warning.map(str::to_string),
        }
    }

    fn position_of(attempt: &CheckAttempt, correct: bool) -> usize {
        attempt
            .options()
            .iter()
            .position(|entry| entry.item.correct == correct)
            .unwrap()
    }

    #[test]
    fn retries_are_unbounded_without_max_attempts() {
        let config = check(None, None);
        let mut attempt = CheckAttempt::new(0, &config, &mut RngHandle::from_seed(1));
        for _ in 0..5 {
            attempt.select(position_of(&attempt, false)).unwrap();
            assert_eq!(attempt.submit(&config).unwrap(), CheckOutcome::Retry);
            assert_eq!(attempt.selected(), None);
        }
        assert_eq!(attempt.message(&config), Some(CheckMessage::Retry("Try again")));
        attempt.select(position_of(&attempt, true)).unwrap();
        assert_eq!(attempt.submit(&config).unwrap(), CheckOutcome::Passed);
    }

    #[test]
    fn submit_without_selection_is_rejected() {
        let config = check(Some(2), None);
        let mut attempt = CheckAttempt::new(0, &config, &mut RngHandle::from_seed(1));
        let err = attempt.submit(&config).unwrap_err();
        assert_eq!(err.code(), "session-no-selection");
        assert_eq!(attempt.wrong_count(), 0);
    }

    #[test]
    fn single_attempt_fails_immediately() {
        let config = check(Some(1), Some("Careful"));
        let mut attempt = CheckAttempt::new(0, &config, &mut RngHandle::from_seed(4));
        assert_eq!(attempt.message(&config), None);
        attempt.select(position_of(&attempt, false)).unwrap();
        assert_eq!(attempt.submit(&config).unwrap(), CheckOutcome::Failed);
    }

    #[test]
    fn original_index_undoes_the_shuffle() {
        let config = check(None, None);
        let attempt = CheckAttempt::new(0, &config, &mut RngHandle::from_seed(9));
        let right = position_of(&attempt, true);
        assert_eq!(attempt.original_index(right), Some(1));
        assert_eq!(attempt.original_index(5), None);
    }
}
