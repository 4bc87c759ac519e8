// Metric names and registration.

/// Deployment runs started (initial and follow-up).
pub const RUNS_STARTED: &str = "deployd_runs_started_total";
/// Deployment runs that delivered a terminal event.
pub const RUNS_FINISHED: &str = "deployd_runs_finished_total";
/// Observers attached across all services.
pub const OBSERVER_ATTACHES: &str = "deployd_observer_attaches_total";
/// Observers that arrived while a run was active and were coalesced into the
/// queued follow-up.
pub const OBSERVER_COALESCED: &str = "deployd_observer_coalesced_total";
/// Observers evicted for disconnecting or stalling mid-broadcast.
pub const OBSERVER_DROPPED: &str = "deployd_observer_dropped_total";
/// Registry synchronization passes.
pub const REGISTRY_SYNCS: &str = "deployd_registry_syncs_total";
/// Registry synchronization passes that failed at the discovery source.
pub const REGISTRY_SYNC_FAILURES: &str = "deployd_registry_sync_failures_total";

/// Registers metric descriptions with the installed recorder.
pub fn describe() {
    metrics::describe_counter!(RUNS_STARTED, "Deployment runs started");
    metrics::describe_counter!(RUNS_FINISHED, "Deployment runs finished with a terminal event");
    metrics::describe_counter!(OBSERVER_ATTACHES, "Observers attached to a coordinator");
    metrics::describe_counter!(
        OBSERVER_COALESCED,
        "Observers coalesced into a queued follow-up run"
    );
    metrics::describe_counter!(
        OBSERVER_DROPPED,
        "Observers evicted for disconnecting or stalling"
    );
    metrics::describe_counter!(REGISTRY_SYNCS, "Registry synchronization passes");
    metrics::describe_counter!(
        REGISTRY_SYNC_FAILURES,
        "Registry synchronization passes failed at the discovery source"
    );
}
