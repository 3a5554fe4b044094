use clap::ValueEnum;
use comfy_table::{Cell, Table};
use media_retention_models::{ItemKind, RetentionRecord, RunSummary};
use owo_colors::OwoColorize;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    #[value(name = "json-pretty")]
    JsonPretty,
}

/// Prints command results to stdout, either for humans or as JSON lines.
pub struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    pub fn format(&self) -> OutputFormat {
        self.format
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    pub fn is_human(&self) -> bool {
        self.format == OutputFormat::Human
    }

    fn message(&self, kind: &str, msg: &str) {
        self.print_json(&json!({ "type": kind, "message": msg }));
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }
        match self.format {
            OutputFormat::Human => println!("{} {}", "✓".green(), msg.as_ref()),
            _ => self.message("success", msg.as_ref()),
        }
    }

    /// Shown even in quiet mode.
    pub fn error(&self, msg: impl AsRef<str>) {
        match self.format {
            OutputFormat::Human => eprintln!("{} {}", "✗".red(), msg.as_ref()),
            _ => self.message("error", msg.as_ref()),
        }
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }
        match self.format {
            OutputFormat::Human => println!("{}", msg.as_ref()),
            _ => self.message("info", msg.as_ref()),
        }
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }
        match self.format {
            OutputFormat::Human => println!("{} {}", "⚠".yellow(), msg.as_ref()),
            _ => self.message("warning", msg.as_ref()),
        }
    }

    pub fn json(&self, data: &serde_json::Value) {
        if self.quiet && self.format != OutputFormat::Human {
            return;
        }
        self.print_json(data);
    }

    fn print_json(&self, data: &serde_json::Value) {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string(data).unwrap_or_default()),
            OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(data).unwrap_or_default()),
            OutputFormat::Human => println!("{}", data),
        }
    }

    /// Print a run summary: one table per outcome, or the whole summary as JSON.
    pub fn summary(&self, summary: &RunSummary) {
        if !self.is_human() {
            match serde_json::to_value(summary) {
                Ok(value) => self.json(&value),
                Err(e) => self.error(format!("Failed to serialize run summary: {}", e)),
            }
            return;
        }
        if self.quiet {
            return;
        }

        let mode = if summary.dry_run { "dry run".yellow().to_string() } else { "live".green().to_string() };
        println!();
        println!("{} {} ({})", "Retention run".bright_cyan().bold(), summary.started_at.format("%Y-%m-%d %H:%M:%S UTC"), mode);
        println!();

        let mut counts = styled_table();
        counts.set_header(vec![header_cell("Outcome"), header_cell("Count")]);
        counts.add_row(vec![Cell::new("Examined"), Cell::new(summary.items_examined)]);
        counts.add_row(vec![Cell::new("Warned"), Cell::new(summary.warned.len())]);
        counts.add_row(vec![Cell::new("Movies deleted"), Cell::new(summary.deleted_count(ItemKind::Movie))]);
        counts.add_row(vec![Cell::new("Series deleted"), Cell::new(summary.deleted_count(ItemKind::Series))]);
        counts.add_row(vec![Cell::new("Kept"), Cell::new(summary.skipped.len())]);
        counts.add_row(vec![Cell::new("Errors"), Cell::new(summary.errors.len())]);
        println!("{}", counts);

        let (warn_label, delete_label) = if summary.dry_run {
            ("Would warn", "Would delete")
        } else {
            ("Warned", "Deleted")
        };
        if !summary.warned.is_empty() {
            let mut table = styled_table();
            table.set_header(vec![header_cell(warn_label), header_cell("Type"), header_cell("Id")]);
            for item in &summary.warned {
                table.add_row(vec![Cell::new(&item.title), Cell::new(item.kind), Cell::new(&item.item_id)]);
            }
            println!("{}", table);
        }
        if !summary.deleted.is_empty() {
            let mut table = styled_table();
            table.set_header(vec![header_cell(delete_label), header_cell("Type"), header_cell("Id")]);
            for item in &summary.deleted {
                table.add_row(vec![
                    Cell::new(&item.title).fg(comfy_table::Color::Red),
                    Cell::new(item.kind),
                    Cell::new(&item.item_id),
                ]);
            }
            println!("{}", table);
        }
        if !summary.skipped.is_empty() {
            let mut table = styled_table();
            table.set_header(vec![header_cell("Kept"), header_cell("Reason")]);
            for item in &summary.skipped {
                table.add_row(vec![Cell::new(&item.title), Cell::new(&item.reason)]);
            }
            println!("{}", table);
        }
        if !summary.errors.is_empty() {
            let mut table = styled_table();
            table.set_header(vec![
                Cell::new("Failed").fg(comfy_table::Color::Red).add_attribute(comfy_table::Attribute::Bold),
                header_cell("Error"),
            ]);
            for item in &summary.errors {
                table.add_row(vec![Cell::new(&item.title), Cell::new(&item.error)]);
            }
            println!("{}", table);
        }
    }

    pub fn records(&self, records: &[RetentionRecord]) {
        if !self.is_human() {
            self.json(&json!({ "records": records }));
            return;
        }
        if self.quiet {
            return;
        }
        if records.is_empty() {
            println!("{}", "No items have been warned or deleted yet".bright_black());
            return;
        }

        let mut table = styled_table();
        table.set_header(vec![header_cell("Id"), header_cell("Title"), header_cell("Phase"), header_cell("Since")]);
        for record in records {
            table.add_row(vec![
                Cell::new(&record.item_id),
                Cell::new(record.title.as_deref().unwrap_or("-")),
                Cell::new(record.phase),
                Cell::new(record.phase_entered_at.format("%Y-%m-%d %H:%M")),
            ]);
        }
        println!("{}", table);
    }
}

pub fn styled_table() -> Table {
    let mut table = Table::new();
    table.load_preset(comfy_table::presets::UTF8_FULL);
    table.apply_modifier(comfy_table::modifiers::UTF8_ROUND_CORNERS);
    table
}

pub fn header_cell(title: impl Into<String>) -> Cell {
    Cell::new(title.into()).fg(comfy_table::Color::Cyan).add_attribute(comfy_table::Attribute::Bold)
}
