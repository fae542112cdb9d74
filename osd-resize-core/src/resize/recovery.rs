use std::{
    future::Future,
    io::{self, BufRead, Write},
};

use log::{error, info, warn};
use thiserror::Error;

use super::prompt::Prompter;
use crate::kubernetes::drain::DrainMode;

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("{} was cancelled by the operator!", .0)]
    Cancelled(String),
    #[error("Couldn't read the operator's decision! Reason: {}", .0)]
    Input(#[from] io::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryDecision {
    Retry,
    Skip,
    Force,
    Cancel,
}

impl RecoveryDecision {
    fn parse(answer: &str) -> Option<Self> {
        match answer.to_lowercase().as_str() {
            "retry" | "r" => Some(Self::Retry),
            "skip" | "s" => Some(Self::Skip),
            "force" | "f" => Some(Self::Force),
            "cancel" | "c" => Some(Self::Cancel),
            _ => None,
        }
    }
}

/// Decisions the operator may pick when a step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOptions {
    RetryCancel,
    RetrySkipCancel,
    RetrySkipForceCancel,
}

impl RecoveryOptions {
    pub fn allows(&self, decision: RecoveryDecision) -> bool {
        match decision {
            RecoveryDecision::Retry | RecoveryDecision::Cancel => true,
            RecoveryDecision::Skip => !matches!(self, Self::RetryCancel),
            RecoveryDecision::Force => matches!(self, Self::RetrySkipForceCancel),
        }
    }

    fn hint(&self) -> &'static str {
        match self {
            Self::RetryCancel => "[r]etry / [c]ancel",
            Self::RetrySkipCancel => "[r]etry / [s]kip / [c]ancel",
            Self::RetrySkipForceCancel => "[r]etry / [s]kip / [f]orce / [c]ancel",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    Normal,
    Forced,
}

impl From<Escalation> for DrainMode {
    fn from(value: Escalation) -> Self {
        match value {
            Escalation::Normal => DrainMode::Evict,
            Escalation::Forced => DrainMode::Force,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryOutcome {
    Succeeded,
    Forced,
    Skipped,
}

/// Runs `operation` until it succeeds, asking the operator what to do after every failure.
///
/// `operation` receives [`Escalation::Forced`] once the operator picks Force. From then on
/// only Retry, Skip and Cancel are offered.
pub async fn run_with_recovery<R, W, F, Fut>(
    prompter: &mut Prompter<R, W>,
    procedure: &str,
    options: RecoveryOptions,
    mut operation: F,
) -> Result<RecoveryOutcome, RecoveryError>
where
    R: BufRead,
    W: Write,
    F: FnMut(Escalation) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let mut escalation = Escalation::Normal;

    loop {
        let error = match operation(escalation).await {
            Ok(()) if escalation == Escalation::Forced => return Ok(RecoveryOutcome::Forced),
            Ok(()) => return Ok(RecoveryOutcome::Succeeded),
            Err(error) => error,
        };

        let (attempt, current_options) = match escalation {
            Escalation::Normal => (procedure.to_owned(), options),
            Escalation::Forced => (format!("Forced {procedure}"), RecoveryOptions::RetrySkipCancel),
        };

        error!("{attempt} failed: {error:#}");

        match ask_decision(prompter, &attempt, current_options)? {
            RecoveryDecision::Retry => info!("Retrying {attempt}..."),
            RecoveryDecision::Skip => {
                warn!("Skipping {attempt}!");
                return Ok(RecoveryOutcome::Skipped);
            }
            RecoveryDecision::Force => {
                warn!("Escalating {procedure} to forced mode!");
                escalation = Escalation::Forced;
            }
            RecoveryDecision::Cancel => return Err(RecoveryError::Cancelled(attempt)),
        }
    }
}

fn ask_decision<R: BufRead, W: Write>(
    prompter: &mut Prompter<R, W>,
    attempt: &str,
    options: RecoveryOptions,
) -> Result<RecoveryDecision, RecoveryError> {
    loop {
        let answer = prompter.read_line(&format!(
            "{attempt} failed, what now? {}: ",
            options.hint()
        ))?;

        match RecoveryDecision::parse(&answer) {
            Some(decision) if options.allows(decision) => return Ok(decision),
            _ => prompter.say(&format!(
                "'{answer}' isn't an option here, pick one of {}",
                options.hint()
            ))?,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, io::Cursor};

    use anyhow::anyhow;

    use super::{
        run_with_recovery, Escalation, RecoveryError, RecoveryOptions, RecoveryOutcome,
    };
    use crate::resize::prompt::Prompter;

    fn prompter(script: &str) -> Prompter<Cursor<Vec<u8>>, Vec<u8>> {
        Prompter::new(Cursor::new(script.as_bytes().to_vec()), Vec::new())
    }

    #[tokio::test]
    async fn retry_then_cancel_invokes_twice_and_fails() {
        let calls = RefCell::new(Vec::new());
        let mut prompter = prompter("retry\ncancel\n");

        let result = run_with_recovery(
            &mut prompter,
            "Drain of 'ip-10-0-1-1' node",
            RecoveryOptions::RetrySkipForceCancel,
            |escalation| {
                calls.borrow_mut().push(escalation);
                async { Err(anyhow!("PodDisruptionBudget violated")) }
            },
        )
        .await;

        assert!(matches!(result, Err(RecoveryError::Cancelled(_))));
        assert_eq!(*calls.borrow(), vec![Escalation::Normal, Escalation::Normal]);
    }

    #[tokio::test]
    async fn skip_invokes_once_and_continues() {
        let calls = RefCell::new(0);
        let mut prompter = prompter("skip\n");

        let result = run_with_recovery(
            &mut prompter,
            "Drain",
            RecoveryOptions::RetrySkipCancel,
            |_| {
                *calls.borrow_mut() += 1;
                async { Err(anyhow!("eviction refused")) }
            },
        )
        .await
        .unwrap();

        assert_eq!(result, RecoveryOutcome::Skipped);
        assert_eq!(*calls.borrow(), 1);
    }

    #[tokio::test]
    async fn force_escalates_and_narrows_the_options() {
        let calls = RefCell::new(Vec::new());
        // second failure is forced, so "f" is rejected and re-prompted
        let mut prompter = prompter("F\nf\nR\n");

        let result = run_with_recovery(
            &mut prompter,
            "Drain",
            RecoveryOptions::RetrySkipForceCancel,
            |escalation| {
                calls.borrow_mut().push(escalation);
                let attempt = calls.borrow().len();
                async move {
                    match attempt {
                        1 | 2 => Err(anyhow!("still failing")),
                        _ => Ok(()),
                    }
                }
            },
        )
        .await
        .unwrap();

        assert_eq!(result, RecoveryOutcome::Forced);
        assert_eq!(
            *calls.borrow(),
            vec![Escalation::Normal, Escalation::Forced, Escalation::Forced]
        );

        let output = String::from_utf8(prompter.output().clone()).unwrap();
        assert!(output.contains("'f' isn't an option here"));
    }

    #[tokio::test]
    async fn disallowed_and_unknown_answers_reprompt() {
        let mut prompter = prompter("skip\nwhat\nCANCEL\n");

        let result = run_with_recovery(&mut prompter, "Drain", RecoveryOptions::RetryCancel, |_| async {
            Err(anyhow!("nope"))
        })
        .await;

        assert!(matches!(result, Err(RecoveryError::Cancelled(_))));
    }

    #[tokio::test]
    async fn closed_input_is_terminal() {
        let mut prompter = prompter("");

        let result = run_with_recovery(&mut prompter, "Drain", RecoveryOptions::RetryCancel, |_| async {
            Err(anyhow!("nope"))
        })
        .await;

        assert!(matches!(result, Err(RecoveryError::Input(_))));
    }

    #[tokio::test]
    async fn success_needs_no_operator() {
        let mut prompter = prompter("");

        let result = run_with_recovery(&mut prompter, "Drain", RecoveryOptions::RetryCancel, |_| async {
            Ok(())
        })
        .await
        .unwrap();

        assert_eq!(result, RecoveryOutcome::Succeeded);
    }
}
