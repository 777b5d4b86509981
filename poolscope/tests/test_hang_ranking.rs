use poolscope::analysis::HangAggregator;
use poolscope::dump::DumpParser;

/// Synthetic dump with `count` workers per (name prefix, top frame) group.
fn synthetic_dump(groups: &[(&str, usize)]) -> String {
    let mut text = String::new();
    let mut worker = 0;
    for (frame, count) in groups {
        for _ in 0..*count {
            worker += 1;
            text.push_str(&format!("\"batch-pool-{worker}\" #{worker} runnable\n"));
            text.push_str(&format!("\tat {frame}\n\n"));
        }
    }
    text
}

fn rank(dump: &str) -> (usize, Vec<(String, usize)>) {
    let lines = dump.lines().map(|l| Ok(l.to_string()));
    let mut aggregator = HangAggregator::new();
    for record in DumpParser::new("batch-pool", lines) {
        aggregator.record(&record.unwrap());
    }
    let hanging = aggregator.hanging_workers();
    let ranked = aggregator.into_ranked().into_iter().map(|h| (h.frame, h.count)).collect();
    (hanging, ranked)
}

#[test]
fn test_ten_workers_six_x_four_y() {
    let dump = synthetic_dump(&[("x.X.x(X.java:1)", 6), ("y.Y.y(Y.java:2)", 4)]);
    let (hanging, ranked) = rank(&dump);

    assert_eq!(hanging, 10);
    assert_eq!(
        ranked,
        vec![
            ("at x.X.x(X.java:1)".to_string(), 6),
            ("at y.Y.y(Y.java:2)".to_string(), 4),
        ]
    );
}

#[test]
fn test_counts_sum_to_workers_with_frames() {
    let dump = synthetic_dump(&[("a.A.a(A.java:1)", 3), ("b.B.b(B.java:2)", 2)])
        // one matched worker with no frames at all
        + "\"batch-pool-99\" #99 waiting on condition\n\n";
    let (hanging, ranked) = rank(&dump);

    assert_eq!(hanging, 5, "the frameless worker is excluded");
    assert_eq!(ranked.iter().map(|(_, c)| c).sum::<usize>(), 5);
}

#[test]
fn test_equal_counts_both_survive() {
    let dump = synthetic_dump(&[("b.B.b(B.java:2)", 3), ("a.A.a(A.java:1)", 3)]);
    let (_, ranked) = rank(&dump);

    assert_eq!(
        ranked,
        vec![
            ("at a.A.a(A.java:1)".to_string(), 3),
            ("at b.B.b(B.java:2)".to_string(), 3),
        ],
        "equal-count frames must both appear, ordered by frame text"
    );
}

#[test]
fn test_unrelated_threads_never_count() {
    let dump = "\"main\" #1 runnable\n\tat app.Main.main(Main.java:3)\n\n".to_string()
        + &synthetic_dump(&[("x.X.x(X.java:1)", 2)]);
    let (hanging, ranked) = rank(&dump);

    assert_eq!(hanging, 2);
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].0, "at x.X.x(X.java:1)");
}
