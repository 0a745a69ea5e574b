//! Edge case tests for the aggregation engine and the ingestion pipeline.

use donation_analytics::{
    pipeline, AggregationEngine, Amount, DirectHandler, DonorRecord, EngineError, EventSink,
    GroupKey, OffloadedHandler, OrderStatisticTree, Percentile, PipeWriter, RecordHandler,
    RepeatDonorEvent, Strategy,
};
use std::io::Cursor;
use std::str::FromStr;

fn pct(s: &str) -> Percentile {
    Percentile::from_str(s).unwrap()
}

fn record(committee: &str, zip5: &str, name: &str, year: i32, amount: &str) -> DonorRecord {
    DonorRecord {
        committee_id: committee.to_string(),
        zip5: zip5.to_string(),
        name: name.to_string(),
        year,
        amount: Amount::from_str(amount).unwrap(),
    }
}

/// Builds one input row with the columns the ingestion layer looks at.
fn row(committee: &str, name: &str, zip: &str, date: &str, amount: &str) -> String {
    format!(
        "{}|N|M2|P|0|15|IND|{}|CITY|ST|{}|EMPLOYER|OCCUPATION|{}|{}||||||\n",
        committee, name, zip, date, amount
    )
}

fn run_csv(strategy: Strategy, input: &str, percentile: &str) -> Vec<String> {
    let (_, events) = pipeline::run(
        strategy,
        Cursor::new(input.to_string()),
        pct(percentile),
        Vec::<RepeatDonorEvent>::new(),
    )
    .unwrap();
    events.iter().map(|e| e.to_string()).collect()
}

// ==================== REPEAT DONOR DETECTION ====================

#[test]
fn test_earlier_record_lowers_first_seen_year() {
    let mut engine = AggregationEngine::new();
    let p = pct("30");

    let years = [2017, 2016, 2018];
    let emitted: Vec<bool> = years
        .iter()
        .map(|&year| {
            engine
                .process(record("C01", "90210", "DOE, JANE", year, "10"), p)
                .unwrap()
                .is_some()
        })
        .collect();

    assert_eq!(emitted, vec![false, false, true]);
    assert_eq!(engine.first_seen_year("DOE, JANE", "90210"), Some(2016));
}

#[test]
fn test_repeat_years_keep_original_first_seen() {
    let mut engine = AggregationEngine::new();
    let p = pct("50");

    engine
        .process(record("C01", "90210", "DOE, JANE", 2015, "10"), p)
        .unwrap();
    for year in [2016, 2017, 2018] {
        assert!(engine
            .process(record("C01", "90210", "DOE, JANE", year, "10"), p)
            .unwrap()
            .is_some());
    }
    // A 2016 record still qualifies because 2015 stays recorded
    assert!(engine
        .process(record("C01", "90210", "DOE, JANE", 2016, "10"), p)
        .unwrap()
        .is_some());
    assert_eq!(engine.first_seen_year("DOE, JANE", "90210"), Some(2015));
}

#[test]
fn test_unknown_donor_has_no_first_seen_year() {
    let engine = AggregationEngine::new();
    assert_eq!(engine.first_seen_year("NOBODY", "00000"), None);
    assert!(engine.group(&GroupKey::new("C01", "00000", 2017)).is_none());
}

// ==================== PERCENTILES ====================

#[test]
fn test_percentile_scenario_through_pipeline() {
    let mut input = String::new();
    for name in ["A", "B", "C"] {
        input.push_str(&row("C99", name, "90210", "01012016", "1"));
    }
    input.push_str(&row("C01", "A", "90210", "01012017", "100"));
    input.push_str(&row("C01", "B", "90210", "01012017", "50"));
    input.push_str(&row("C01", "C", "90210", "01012017", "75"));

    let lines = run_csv(Strategy::Direct, &input, "30");
    assert_eq!(
        lines,
        vec![
            "C01|90210|2017|100|100|1",
            "C01|90210|2017|50|150|2",
            "C01|90210|2017|50|225|3",
        ]
    );
}

#[test]
fn test_hundredth_percentile_tracks_maximum() {
    let mut engine = AggregationEngine::new();
    let p = pct("100");
    engine
        .process(record("C01", "10001", "DONOR", 2010, "1"), p)
        .unwrap();

    let mut max: i64 = 0;
    for (i, amount) in [5i64, 3, 9, 9, 1, 12, 7].iter().enumerate() {
        max = max.max(*amount);
        let event = engine
            .process(
                record("C01", "10001", "DONOR", 2011, &amount.to_string()),
                p,
            )
            .unwrap()
            .unwrap();
        assert_eq!(event.percentile_value, max);
        assert_eq!(event.sample_count, i + 1);
    }
}

#[test]
fn test_median_of_even_count_takes_lower_value() {
    let mut engine = AggregationEngine::new();
    let p = pct("50");
    engine
        .process(record("C01", "10001", "DONOR", 2010, "1"), p)
        .unwrap();

    let mut last = None;
    for amount in ["40", "10", "30", "20"] {
        last = engine
            .process(record("C01", "10001", "DONOR", 2011, amount), p)
            .unwrap();
    }
    let event = last.unwrap();
    assert_eq!(event.percentile_value, 20);
    assert_eq!(event.running_total, 100);
}

#[test]
fn test_fractional_amounts_round_and_truncate() {
    let mut input = String::new();
    input.push_str(&row("C01", "A", "90210", "01012016", "1"));
    input.push_str(&row("C01", "A", "90210", "01012017", "2.5"));
    input.push_str(&row("C01", "A", "90210", "01012017", "0.4"));

    let lines = run_csv(Strategy::Direct, &input, "100");
    assert_eq!(lines, vec!["C01|90210|2017|3|2|1", "C01|90210|2017|3|2|2"]);
}

// ==================== INPUT FILTERING ====================

#[test]
fn test_invalid_rows_do_not_affect_state() {
    let mut input = String::new();
    input.push_str(&row("C01", "A", "90210", "01012016", "10"));
    // Each of these would be a repeat donation if it were valid
    input.push_str(&row("", "A", "90210", "01012017", "10"));
    input.push_str(&row("C01", "A", "90210", "02302017", "10"));
    input.push_str(&row("C01", "A", "9021", "01012017", "10"));
    input.push_str(&row("C01", "A", "90210", "01012017", ""));
    input.push_str(&row("C01", "A", "90210", "01012017", "-10"));
    input.push_str("C01|N|M2|P|0|15|IND|A|CITY|ST|90210|E|O|01012017|10|C00000042|||||\n");
    input.push_str("truncated|row\n");

    let lines = run_csv(Strategy::Direct, &input, "50");
    assert!(lines.is_empty());
}

#[test]
fn test_nine_digit_zip_is_cut_to_five() {
    let mut input = String::new();
    input.push_str(&row("C01", "A", "902101234", "01012016", "10"));
    input.push_str(&row("C01", "A", "90210", "01012017", "20"));

    let lines = run_csv(Strategy::Direct, &input, "50");
    assert_eq!(lines, vec!["C01|90210|2017|20|20|1"]);
}

#[test]
fn test_non_utf8_donor_name_is_kept() {
    let mut input = Vec::new();
    for date in ["01012016", "01012017"] {
        input.extend_from_slice(b"C01|N|M2|P|0|15|IND|PE\xd1A, JOSE|CITY|ST|90210|E|O|");
        input.extend_from_slice(date.as_bytes());
        input.extend_from_slice(b"|25||||||\n");
    }

    for strategy in [Strategy::Direct, Strategy::Offloaded] {
        let (summary, events) = pipeline::run(
            strategy,
            Cursor::new(input.clone()),
            pct("50"),
            Vec::<RepeatDonorEvent>::new(),
        )
        .unwrap();
        assert_eq!(summary.accepted, 2);
        assert_eq!(summary.rejected, 0);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].to_string(), "C01|90210|2017|25|25|1");
    }
}

#[test]
fn test_digit_separators_in_amount_are_rejected() {
    let mut input = String::new();
    input.push_str(&row("C01", "A", "90210", "01012016", "10"));
    input.push_str(&row("C01", "A", "90210", "01012017", "1_000"));

    assert!(run_csv(Strategy::Direct, &input, "50").is_empty());
}

#[test]
fn test_empty_input() {
    for strategy in [Strategy::Direct, Strategy::Offloaded] {
        assert!(run_csv(strategy, "", "50").is_empty());
    }
}

// ==================== HANDLERS ====================

#[test]
fn test_offloaded_handler_drains_before_finish() {
    let mut handler = OffloadedHandler::spawn(pct("50"), Vec::<RepeatDonorEvent>::new()).unwrap();

    handler
        .handle(record("C01", "10001", "DONOR", 2010, "1"))
        .unwrap();
    for i in 0..1000 {
        handler
            .handle(record("C01", "10001", "DONOR", 2011, &i.to_string()))
            .unwrap();
    }

    let events = handler.finish().unwrap();
    assert_eq!(events.len(), 1000);
    for (i, event) in events.iter().enumerate() {
        assert_eq!(event.sample_count, i + 1);
    }
    assert_eq!(events[999].running_total, (0..1000).sum::<i64>());
}

#[test]
fn test_direct_and_offloaded_agree() {
    let mut input = String::new();
    for i in 0..2000u32 {
        let name = format!("DONOR {}", i % 31);
        let zip = format!("{:05}", 10000 + i % 4);
        let date = format!("0615{}", 2012 + (i.wrapping_mul(2654435761) >> 16) % 6);
        let amount = format!("{}.{:02}", (i * 131) % 500, i % 100);
        input.push_str(&row(&format!("C{:02}", i % 5), &name, &zip, &date, &amount));
    }

    let direct = run_csv(Strategy::Direct, &input, "42.5");
    let offloaded = run_csv(Strategy::Offloaded, &input, "42.5");
    assert!(!direct.is_empty());
    assert_eq!(direct, offloaded);
}

#[test]
fn test_direct_handler_exposes_engine() {
    let mut handler = DirectHandler::new(pct("50"), PipeWriter::new(Vec::new()));
    handler
        .handle(record("C01", "10001", "DONOR", 2010, "1"))
        .unwrap();
    handler
        .handle(record("C01", "10001", "DONOR", 2011, "2"))
        .unwrap();

    let key = GroupKey::new("C01", "10001", 2011);
    assert_eq!(handler.engine().group(&key).unwrap().count(), 1);

    let output = handler.finish().unwrap().into_inner().unwrap();
    assert_eq!(String::from_utf8(output).unwrap(), "C01|10001|2011|2|2|1\n");
}

/// Sink that accepts a fixed number of events, then fails.
struct LimitedSink {
    remaining: usize,
}

impl EventSink for LimitedSink {
    fn emit(&mut self, _event: &RepeatDonorEvent) -> donation_analytics::Result<()> {
        if self.remaining == 0 {
            return Err(EngineError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "sink closed",
            )));
        }
        self.remaining -= 1;
        Ok(())
    }
}

#[test]
fn test_sink_failure_propagates_from_worker() {
    let mut handler = OffloadedHandler::spawn(pct("50"), LimitedSink { remaining: 2 }).unwrap();
    handler
        .handle(record("C01", "10001", "DONOR", 2010, "1"))
        .unwrap();

    // The worker may stop while we are still sending
    for _ in 0..10 {
        let _ = handler.handle(record("C01", "10001", "DONOR", 2011, "1"));
    }

    assert!(matches!(handler.finish(), Err(EngineError::Io(_))));
}

// ==================== TREE ====================

#[test]
fn test_tree_of_amounts_orders_decimals() {
    let tree: OrderStatisticTree<Amount> = ["10.50", "2", "10.5", "0.01", "100"]
        .iter()
        .map(|s| Amount::from_str(s).unwrap())
        .collect();

    let sorted: Vec<String> = tree.iter().map(|a| a.to_string()).collect();
    assert_eq!(sorted.len(), 5);
    assert_eq!(sorted[0], "0.01");
    assert_eq!(sorted[1], "2");
    assert_eq!(*tree.get_at(4).unwrap(), Amount::from(100));
    assert_eq!(tree.get_at(2).unwrap(), tree.get_at(3).unwrap());
}
