//! # Capture Table Demo
//!
//! Wires a live table to the findings bus, feeds it from a producer thread,
//! and shows how finding events refresh the cached columns.

use std::sync::Arc;
use std::thread;

use crawl_table::{
    AlertBus, AlertEvent, CaptureRecord, CaptureTable, CellValue, Column, InMemoryFindingStore,
    Severity, TableConfig, FINDINGS_PUBLISHER,
};

fn main() {
    env_logger::init();

    println!("=================================================");
    println!("  Capture Table - Live Findings Demo             ");
    println!("=================================================");
    println!();

    let bus = Arc::new(AlertBus::new());
    let findings = Arc::new(InMemoryFindingStore::new());
    let table = CaptureTable::new(TableConfig::default(), &bus, None, findings.clone());
    let handle = table.handle();

    // Producer thread feeding captured transactions.
    let producer = {
        let handle = table.handle();
        thread::spawn(move || {
            for id in 1..=5u64 {
                let mut record = CaptureRecord::new(id, "GET", format!("http://target/page/{}", id));
                record.status_code = 200;
                record.status_reason = "OK".to_string();
                handle.append(record, id == 4);
            }
        })
    };
    producer.join().expect("producer thread panicked");

    println!("Appended {} records", handle.row_count());
    println!();

    // A finding arrives for record 2 and the bus pushes the change.
    findings.raise(2, Severity::High);
    bus.publish(
        FINDINGS_PUBLISHER,
        &AlertEvent::finding_added(2, Severity::High),
    );

    println!("Rows after finding-added for record 2:");
    for row in 0..handle.row_count() {
        let id = match handle.value_at(row, Column::Id) {
            CellValue::Id(id) => id,
            _ => unreachable!(),
        };
        let processed = match handle.value_at(row, Column::Processed) {
            CellValue::Processed(status) => status.to_string(),
            _ => unreachable!(),
        };
        let finding = match handle.value_at(row, Column::HighestFinding) {
            CellValue::Severity(Some(severity)) => severity.to_string(),
            _ => "-".to_string(),
        };
        println!(
            "  - row {} | id {} | {:<10} | highest finding: {}",
            row, id, processed, finding
        );
    }
    println!();

    let stats = handle.stats();
    println!("Table Statistics:");
    println!("  - Rows: {}", stats.rows);
    println!("  - Successful: {}", stats.successful_rows);
    println!("  - I/O errors: {}", stats.io_error_rows);
    println!("  - Refreshes: {}", stats.refreshes);
    println!("  - Live subscription: {}", stats.subscribed);
    println!();

    handle.reset();
    println!("After reset: {} rows", handle.row_count());

    println!();
    println!("=================================================");
    println!("  Demo Finished                                  ");
    println!("=================================================");
}
