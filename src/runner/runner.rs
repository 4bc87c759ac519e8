//! Deployment command execution.
//!
//! `run` launches the external command and returns a finite, non-restartable
//! sequence of [`Event`]s. Output is forwarded in small chunks as soon as it
//! is readable, so long-running streaming commands stay live for observers.
//! stdout and stderr are drained by independent tasks writing to one channel:
//! order within each stream is preserved, order across the two streams is
//! best-effort.

use std::process::Stdio;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, error};

use crate::model::Event;

/// Forwarding chunk size. Small on purpose: latency matters more than
/// throughput for a human watching a deployment.
const CHUNK_SIZE: usize = 100;

/// Capacity of the run event channel between the runner and its consumer.
pub const EVENT_BUFFER: usize = 64;

/// Exit code reported when the process was terminated by a signal and the OS
/// gives us no code.
const SIGNAL_EXIT_CODE: i32 = -1;

/// Launches `program` with `args` and returns the receiving end of its event
/// stream.
///
/// The stream yields ordinary output events followed by exactly one terminal
/// event carrying the exit code, then closes. If the process cannot be
/// spawned the error is logged and the stream closes without a terminal
/// event; consumers treat that as an execution failure.
pub fn run(program: &str, args: &[String]) -> mpsc::Receiver<Event> {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let program = program.to_owned();
    let args = args.to_vec();

    tokio::task::spawn(async move {
        execute(&program, &args, tx).await;
    });

    rx
}

async fn execute(program: &str, args: &[String], events: mpsc::Sender<Event>) {
    let mut child = match Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
    {
        Ok(child) => child,
        Err(e) => {
            error!(
                component = "runner",
                event = "spawn_failed",
                command = program,
                error = %e,
                "failed to spawn deployment command"
            );
            return;
        }
    };

    // stdout/stderr are always present with piped stdio; a missing handle
    // means the child is unusable, treat it like a spawn failure.
    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        error!(
            component = "runner",
            event = "pipe_missing",
            command = program,
            "child process has no captured output pipes"
        );
        return;
    };

    let stdout_task = tokio::task::spawn(forward_output(stdout, events.clone()));
    let stderr_task = tokio::task::spawn(forward_output(stderr, events.clone()));

    // Both pipes must reach EOF before waiting, otherwise a chatty child can
    // fill an OS pipe buffer and never exit.
    let _ = stdout_task.await;
    let _ = stderr_task.await;

    let exit_code = match child.wait().await {
        Ok(status) => status.code().unwrap_or(SIGNAL_EXIT_CODE),
        Err(e) => {
            error!(
                component = "runner",
                event = "wait_failed",
                command = program,
                error = %e,
                "failed to collect deployment command exit status"
            );
            SIGNAL_EXIT_CODE
        }
    };

    let _ = events.send(Event::terminal(exit_code)).await;
}

/// Forwards one output pipe to the event channel in `CHUNK_SIZE` reads.
///
/// Keeps draining to EOF even if the consumer is gone, so the child never
/// blocks on a full pipe and `wait` always completes.
async fn forward_output<R: AsyncRead + Unpin>(mut reader: R, events: mpsc::Sender<Event>) {
    let mut buffer = [0u8; CHUNK_SIZE];
    let mut consumer_gone = false;

    loop {
        match reader.read(&mut buffer).await {
            Ok(0) => return,
            Ok(n) => {
                if !consumer_gone && events.send(Event::output(&buffer[..n])).await.is_err() {
                    consumer_gone = true;
                }
            }
            Err(e) => {
                debug!(
                    component = "runner",
                    event = "pipe_read_failed",
                    error = %e,
                    "output pipe read failed"
                );
                return;
            }
        }
    }
}
