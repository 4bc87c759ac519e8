//! Tests for deployment command execution and output forwarding.

#[cfg(test)]
mod tests {
    use crate::model::Event;
    use crate::runner;

    fn sh(script: &str) -> (&'static str, Vec<String>) {
        ("/bin/sh", vec!["-c".to_string(), script.to_string()])
    }

    async fn collect(mut rx: tokio::sync::mpsc::Receiver<Event>) -> Vec<Event> {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn test_run_streams_output_and_terminal_event() {
        let (program, args) = sh("printf one; printf two >&2");
        let events = collect(runner::run(program, &args)).await;

        let terminal = events.last().expect("stream must not be empty");
        assert_eq!(terminal.exit_code, Some(0));

        let output: Vec<u8> = events
            .iter()
            .filter(|e| !e.is_terminal())
            .flat_map(|e| e.data.to_vec())
            .collect();
        let output = String::from_utf8(output).unwrap();
        assert!(output.contains("one"));
        assert!(output.contains("two"));
    }

    #[tokio::test]
    async fn test_run_reports_nonzero_exit_code() {
        let (program, args) = sh("echo failing; exit 3");
        let events = collect(runner::run(program, &args)).await;

        let terminal = events.last().unwrap();
        assert_eq!(terminal.exit_code, Some(3));
        assert_eq!(
            terminal.data.as_ref(),
            b"*** Deployment command finished with exit code 3\n"
        );
    }

    #[tokio::test]
    async fn test_terminal_event_is_last_and_unique() {
        let (program, args) = sh("echo a; echo b; echo c");
        let events = collect(runner::run(program, &args)).await;

        let terminals: Vec<usize> = events
            .iter()
            .enumerate()
            .filter(|(_, e)| e.is_terminal())
            .map(|(i, _)| i)
            .collect();
        assert_eq!(terminals, vec![events.len() - 1]);
    }

    #[tokio::test]
    async fn test_output_is_chunked_below_limit() {
        // 1000 bytes on stdout must arrive as multiple chunks of at most 100.
        let (program, args) = sh("head -c 1000 /dev/zero");
        let events = collect(runner::run(program, &args)).await;

        let chunks: Vec<&Event> = events.iter().filter(|e| !e.is_terminal()).collect();
        assert!(chunks.len() >= 10);
        assert!(chunks.iter().all(|e| e.data.len() <= 100));

        let total: usize = chunks.iter().map(|e| e.data.len()).sum();
        assert_eq!(total, 1000);
    }

    #[tokio::test]
    async fn test_per_stream_order_is_preserved() {
        let (program, args) = sh("echo first; sleep 0.05; echo second; sleep 0.05; echo third");
        let events = collect(runner::run(program, &args)).await;

        let output: Vec<u8> = events
            .iter()
            .filter(|e| !e.is_terminal())
            .flat_map(|e| e.data.to_vec())
            .collect();
        assert_eq!(String::from_utf8(output).unwrap(), "first\nsecond\nthird\n");
    }

    #[tokio::test]
    async fn test_spawn_failure_closes_stream_without_terminal_event() {
        let args: Vec<String> = Vec::new();
        let events = collect(runner::run("/nonexistent/deployd-test-binary", &args)).await;
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn test_signal_death_reports_negative_code() {
        let (program, args) = sh("kill -9 $$");
        let events = collect(runner::run(program, &args)).await;

        let terminal = events.last().unwrap();
        assert_eq!(terminal.exit_code, Some(-1));
    }
}
