//! Debug tool: show what the extractor sees on the sector page of a report

use azimuth_inspector::azimuth::{azimuth_columns, tilt_columns, TARGET_PAGE_INDEX};
use azimuth_inspector::extractor::{extract_page_items, group_into_lines, load_document, page_count};
use azimuth_inspector::tables::detect_tables;
use azimuth_inspector::{extract_local_pdf, StationId};
use std::env;
use std::process;

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <pdf_file> <station_id>", args[0]);
        process::exit(1);
    }

    let pdf_path = &args[1];
    let station_id = match StationId::new(&args[2]) {
        Ok(id) => id,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let doc = match load_document(pdf_path) {
        Ok(doc) => doc,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    println!("File: {}", pdf_path);
    println!("Pages: {}", page_count(&doc));
    println!();

    let items = match extract_page_items(&doc, TARGET_PAGE_INDEX) {
        Ok(items) => items,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    println!("=== Page {} lines ===", TARGET_PAGE_INDEX + 1);
    for line in group_into_lines(items.clone()) {
        println!("y={:7.1}  {}", line.y, line.text());
    }

    let tables = detect_tables(&items);
    println!();
    println!("=== Tables: {} ===", tables.len());
    for (i, table) in tables.iter().enumerate() {
        println!(
            "Table {}: {} columns, {} rows (azimuth cols {:?}, tilt cols {:?})",
            i + 1,
            table.column_count(),
            table.rows.len(),
            azimuth_columns(table),
            tilt_columns(table)
        );
        println!("  | {} |", table.headers.join(" | "));
        for row in &table.rows {
            println!("  | {} |", row.join(" | "));
        }
    }

    let record = extract_local_pdf(pdf_path, &station_id);
    println!();
    println!("=== Record ===");
    println!("Station ID: {}", record.station_id);
    println!("PDF File: {}", record.pdf_file);
    println!("Azymuts: {}", record.azimuth_column());
    if let Some(tilts) = record.tilts() {
        println!("Tilts: {}", tilts.join(", "));
    }
}
