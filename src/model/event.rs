//! Run event model.

use bytes::Bytes;

/// Informational line sent to an observer whose trigger was coalesced into
/// the queued follow-up run.
pub const QUEUED_NOTICE: &str = "*** A deployment is currently in progress, queued\n";

/// One unit of output flowing from a running deployment to its observers.
///
/// Ordinary events carry a chunk of process output and no exit code. Exactly
/// one terminal event closes every completed run; it carries the exit code
/// and a human-readable summary line and is always the last event delivered.
/// A run whose event stream ends without a terminal event failed to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub data: Bytes,
    pub exit_code: Option<i32>,
}

impl Event {
    /// Wraps a chunk of process output.
    pub fn output(chunk: &[u8]) -> Self {
        Self {
            data: Bytes::copy_from_slice(chunk),
            exit_code: None,
        }
    }

    /// Wraps an informational message produced by the coordinator itself.
    pub fn info(message: &str) -> Self {
        Self {
            data: Bytes::from(message.to_owned()),
            exit_code: None,
        }
    }

    /// Builds the terminal event closing a run.
    pub fn terminal(exit_code: i32) -> Self {
        Self {
            data: Bytes::from(format!(
                "*** Deployment command finished with exit code {}\n",
                exit_code
            )),
            exit_code: Some(exit_code),
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.exit_code.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_event_carries_code_and_summary() {
        let event = Event::terminal(2);
        assert_eq!(event.exit_code, Some(2));
        assert!(event.is_terminal());
        assert_eq!(
            event.data.as_ref(),
            b"*** Deployment command finished with exit code 2\n"
        );
    }

    #[test]
    fn test_output_event_is_not_terminal() {
        let event = Event::output(b"pulling image\n");
        assert_eq!(event.exit_code, None);
        assert!(!event.is_terminal());
        assert_eq!(event.data.as_ref(), b"pulling image\n");
    }
}
