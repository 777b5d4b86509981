use poolscope::domain::{DiagnosticError, PoolStats};
use poolscope::report::ReportWriter;
use poolscope::saturation::{capture_hang_report, SaturationHandler};
use poolscope::snapshot::SnapshotCollector;

fn fixture_stats() -> PoolStats {
    PoolStats {
        pool_size: 4,
        active_count: 4,
        core_size: 4,
        max_size: 4,
        largest_size: 4,
        task_count: 9,
        completed_count: 5,
        is_shutdown: false,
        is_terminated: false,
        is_terminating: false,
    }
}

fn fixture_collector() -> SnapshotCollector {
    SnapshotCollector::with_command("cat tests/fixtures/worker_dump.txt")
}

#[test]
fn test_pipeline_summarizes_the_fixture() {
    let dir = tempfile::tempdir().unwrap();
    let stream = fixture_collector().collect().unwrap();
    let writer = ReportWriter::with_detail_dir(dir.path());

    let summary = capture_hang_report(stream, "order-pool", &writer).unwrap();

    assert_eq!(summary.matched_workers, 4);
    assert_eq!(summary.hanging_workers, 3);
    assert_eq!(summary.hang_points.len(), 2);
    assert_eq!(summary.hang_points[0].count, 2);
    assert_eq!(
        summary.hang_points[0].frame,
        "at java.net.PlainSocketImpl.socketConnect(Native Method)"
    );
    assert_eq!(summary.hang_points[1].count, 1);
    assert_eq!(summary.hang_points[1].frame, "at java.lang.Thread.sleep(Native Method)");
}

#[test]
fn test_detail_artifact_round_trips_matched_stacks() {
    let dir = tempfile::tempdir().unwrap();
    let stream = fixture_collector().collect().unwrap();
    let writer = ReportWriter::with_detail_dir(dir.path());

    let summary = capture_hang_report(stream, "order-pool", &writer).unwrap();
    let detail = std::fs::read_to_string(&summary.detail_path).unwrap();

    // Every matched record's full stack text appears verbatim
    assert!(detail.contains(
        "\"order-pool-1\" #12 prio=5 os_prio=0 tid=0x00007f1a2444f800 nid=0x1b2f runnable [0x00007f1a0d9d8000]\n\
         \x20\x20\x20java.lang.Thread.State: RUNNABLE\n\
         \tat java.net.PlainSocketImpl.socketConnect(Native Method)\n\
         \tat java.net.AbstractPlainSocketImpl.doConnect(AbstractPlainSocketImpl.java:350)\n\
         \tat com.example.orders.Gateway.call(Gateway.java:88)\n\n"
    ));
    // The frameless worker still appears
    assert!(detail.contains("\"order-pool-4\""));
    // Non-matching threads never do
    assert!(!detail.contains("GC task"));
    assert!(!detail.contains("VM Thread"));
    assert!(!detail.contains("Attach Listener"));
}

#[test]
fn test_handler_raises_the_composed_summary() {
    let dir = tempfile::tempdir().unwrap();
    let handler = SaturationHandler::new("order-pool", "ignored")
        .with_collector(fixture_collector())
        .with_report_writer(ReportWriter::with_detail_dir(dir.path()));

    let error = handler.handle(&fixture_stats());
    let DiagnosticError::PoolSaturated(msg) = error else {
        panic!("expected PoolSaturated, got {error:?}");
    };

    let lines: Vec<&str> = msg.lines().collect();
    assert_eq!(
        lines[0],
        "Thread pool is EXHAUSTED! Thread Name: order-pool, Pool Size: 4 (active: 4, \
         core: 4, max: 4, largest: 4), Task: 9 (completed: 5), \
         Executor status:(isShutdown:false, isTerminated:false, isTerminating:false)"
    );
    assert_eq!(
        lines[1],
        "2 threads are hanging on this code : at java.net.PlainSocketImpl.socketConnect(Native Method)"
    );
    assert_eq!(
        lines[2],
        "1 threads are hanging on this code : at java.lang.Thread.sleep(Native Method)"
    );
    let expected_path = dir.path().join("order-pool.detail");
    assert_eq!(
        lines[3],
        format!(
            "You can fetch more thread statck information by the detail file : {}",
            expected_path.display()
        )
    );
    assert!(expected_path.exists());
}

#[test]
fn test_summary_serializes_for_json_export() {
    let dir = tempfile::tempdir().unwrap();
    let stream = fixture_collector().collect().unwrap();
    let writer = ReportWriter::with_detail_dir(dir.path());

    let summary = capture_hang_report(stream, "order-pool", &writer).unwrap();
    let json = serde_json::to_value(&summary).unwrap();

    assert_eq!(json["worker_match"], "order-pool");
    assert_eq!(json["matched_workers"], 4);
    assert_eq!(json["hanging_workers"], 3);
    assert_eq!(json["hang_points"][0]["count"], 2);
    assert_eq!(
        json["hang_points"][0]["frame"],
        "at java.net.PlainSocketImpl.socketConnect(Native Method)"
    );
    assert!(json["detail_path"].as_str().unwrap().ends_with("order-pool.detail"));
}

#[test]
fn test_empty_dump_still_raises_a_usable_summary() {
    let dir = tempfile::tempdir().unwrap();
    // The shell starts but the pipeline produces nothing on stdout: zero
    // matches, an empty artifact. (A command that cannot even be started is
    // covered by the snapshot module's own tests.)
    let handler = SaturationHandler::new("order-pool", "ignored")
        .with_collector(SnapshotCollector::with_command("exit 3"))
        .with_report_writer(ReportWriter::with_detail_dir(dir.path()));

    let error = handler.handle(&fixture_stats());
    let DiagnosticError::PoolSaturated(msg) = error else {
        panic!("expected PoolSaturated, got {error:?}");
    };
    assert!(msg.contains("Thread pool is EXHAUSTED!"));
    // No hang-point lines between header and trailer
    assert_eq!(msg.lines().count(), 2);
    let detail = std::fs::read_to_string(dir.path().join("order-pool.detail")).unwrap();
    assert!(detail.is_empty());
}
