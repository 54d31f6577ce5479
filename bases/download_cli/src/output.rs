// bases/download_cli/src/output.rs
use std::io::{IsTerminal, Write};

use download_service::{DownloadRecord, QualityListing, ResolvedStream, ServiceError};

const FILE_COLUMN_WIDTH: usize = 40;
const HEADERS: [&str; 4] = ["File", "Size", "Progress", "Status"];

pub struct OutputHandler {
    verbose: bool,
}

impl OutputHandler {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn print_qualities(&self, listing: &QualityListing) {
        println!("{}", listing.title);
        for (index, option) in listing.options.iter().enumerate() {
            println!("  {:>2}. {}", index + 1, option.display_line());
            if self.verbose {
                for line in option.detail_lines() {
                    println!("        {}", line);
                }
            }
            println!("        format: {}", option.combined_format_id);
        }
    }

    pub fn print_resolved(&self, resolved: &ResolvedStream) {
        println!("Filename: {}", resolved.suggested_filename);
        println!("URL: {}", resolved.direct_media_url);
    }

    pub fn print_prompt(&self, count: usize) {
        print!("Select quality [1-{}] (Enter for 1, q to skip): ", count);
        // a failed flush only delays the prompt
        let _ = std::io::stdout().flush();
    }

    pub fn print_invalid_choice(&self, message: &str) {
        eprintln!("{}", message);
    }

    pub fn print_skipped(&self, url: &str, error: &ServiceError) {
        eprintln!("Skipping {}: {}", url, error);
    }

    pub fn print_cancelling(&self, active: usize) {
        eprintln!("Cancelling {} active downloads...", active);
    }

    pub fn print_history(&self, records: &[DownloadRecord]) {
        if records.is_empty() {
            println!("No downloads yet");
            return;
        }
        for record in records {
            println!(
                "#{:<4} {}  {:<12} {:>10}  {}",
                record.id,
                record.created_at.format("%Y-%m-%d %H:%M"),
                record.status.to_string(),
                record.file_size_label(),
                record.display_name()
            );
            if self.verbose {
                println!("       {}", record.url);
            }
        }
    }

    pub fn print_error(&self, error: &color_eyre::Report) {
        eprintln!("Error: {}", error);

        if self.verbose {
            eprintln!("\nError details:");
            error.chain().skip(1).for_each(|cause| {
                eprintln!("  caused by: {}", cause);
            });
        }
    }
}

/// The download table, redrawn in place on a terminal
#[derive(Default)]
pub struct TableView {
    drawn_lines: usize,
}

impl TableView {
    pub fn redraw(&mut self, rows: &[DownloadRecord], active: usize) {
        let text = render_table(rows, active);
        let mut stdout = std::io::stdout().lock();

        if stdout.is_terminal() && self.drawn_lines > 0 {
            // cursor up, then clear to end of screen
            let _ = write!(stdout, "\x1b[{}A\x1b[J", self.drawn_lines);
        }
        let _ = write!(stdout, "{}", text);
        let _ = stdout.flush();
        self.drawn_lines = text.lines().count();
    }
}

pub fn render_table(rows: &[DownloadRecord], active: usize) -> String {
    let cells: Vec<[String; 4]> = rows
        .iter()
        .map(|record| {
            [
                truncate(record.display_name(), FILE_COLUMN_WIDTH),
                record.file_size_label(),
                format!("{:.1}%", record.progress),
                record.status.to_string(),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    push_row(&mut out, &HEADERS.map(String::from), &widths);
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    out.push_str(&rule.join("-+-"));
    out.push('\n');
    for row in &cells {
        push_row(&mut out, row, &widths);
    }
    out.push_str(&format!("Active downloads: {}\n", active));
    out
}

fn push_row(out: &mut String, row: &[String; 4], widths: &[usize; 4]) {
    let padded: Vec<String> = row
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    out.push_str(padded.join(" | ").trim_end());
    out.push('\n');
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{kept}...")
}

/// What the user typed at the quality prompt
#[derive(Debug, PartialEq, Eq)]
pub enum Choice {
    Pick(usize),
    Skip,
}

/// Parse a 1-based selection; empty input picks the first (best) option
pub fn parse_choice(input: &str, count: usize) -> Result<Choice, String> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(Choice::Pick(0));
    }
    if input.eq_ignore_ascii_case("q") {
        return Ok(Choice::Skip);
    }
    match input.parse::<usize>() {
        Ok(n) if (1..=count).contains(&n) => Ok(Choice::Pick(n - 1)),
        _ => Err(format!("Enter a number between 1 and {count}, or q")),
    }
}
