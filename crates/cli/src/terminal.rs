use anyhow::{Context, Result};
use crossterm::{
    execute,
    style::{Color, Print, ResetColor, SetForegroundColor},
};
use serde::Serialize;
use serde_json::Value;
use std::io::{self, BufRead, Write};

use tracity_client::wire::UploadReceipt;
use tracity_core::{InsightResult, PlatformStats, PublicDataset, Record, UserFile};
use tracity_explorer::{Identity, RenderModel};

/// Color scheme for terminal output.
struct Colors;

impl Colors {
    const HEADER: Color = Color::Magenta;
    const VALUE: Color = Color::Cyan;
    const WARNING: Color = Color::Yellow;
    const ERROR: Color = Color::Red;
    const DIM: Color = Color::DarkGrey;
}

const MAX_CELL_WIDTH: usize = 24;

/// Writes command results either as colored tables or as JSON.
pub struct Terminal {
    json: bool,
}

impl Terminal {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn print_json<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let mut stdout = io::stdout();
        writeln!(stdout, "{}", serde_json::to_string_pretty(value)?)?;
        stdout.flush()?;
        Ok(())
    }

    fn print_header(&self, title: &str, columns: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print(format!("{}\n", title)),
            SetForegroundColor(Colors::DIM),
            Print(format!("{}\n", columns)),
            Print(format!("{}\n", "-".repeat(columns.len().max(40)))),
            ResetColor,
        )?;
        Ok(())
    }

    pub fn print_datasets(&self, datasets: &[PublicDataset]) -> Result<()> {
        if self.json {
            return self.print_json(datasets);
        }
        if datasets.is_empty() {
            return self.print_info("No datasets available.");
        }
        self.print_header(
            "Datasets:",
            &format!("{:<20} {:<30} {:>10}", "COLLECTION", "NAME", "RECORDS"),
        )?;
        let mut stdout = io::stdout();
        for d in datasets {
            writeln!(
                stdout,
                "{:<20} {:<30} {:>10}",
                d.collection,
                truncate(&d.name, 30),
                d.record_count
            )?;
        }
        stdout.flush()?;
        Ok(())
    }

    pub fn print_files(&self, files: &[UserFile]) -> Result<()> {
        if self.json {
            return self.print_json(files);
        }
        if files.is_empty() {
            return self.print_info("No uploaded files.");
        }
        self.print_header(
            "Uploaded Files:",
            &format!(
                "{:<38} {:<30} {:<6} {:>8} {:<10}",
                "ID", "FILENAME", "TYPE", "RECORDS", "UPLOADED"
            ),
        )?;
        let mut stdout = io::stdout();
        for f in files {
            writeln!(
                stdout,
                "{:<38} {:<30} {:<6} {:>8} {:<10}",
                f.file_id,
                truncate(&f.filename, 30),
                f.file_type,
                f.record_count,
                f.upload_date.format("%Y-%m-%d")
            )?;
        }
        stdout.flush()?;
        Ok(())
    }

    pub fn print_stats(&self, stats: &PlatformStats) -> Result<()> {
        if self.json {
            return self.print_json(stats);
        }
        let mut stdout = io::stdout();
        for (label, value) in [
            ("Visualizations", stats.total_visualizations),
            ("Users", stats.total_users),
            ("Datasets", stats.total_datasets),
            ("Insights", stats.total_insights),
        ] {
            execute!(
                stdout,
                Print(format!("{:<16}", label)),
                SetForegroundColor(Colors::VALUE),
                Print(format!("{}\n", value)),
                ResetColor,
            )?;
        }
        stdout.flush()?;
        Ok(())
    }

    pub fn print_identity(&self, identity: &Identity) -> Result<()> {
        if self.json {
            return self.print_json(identity);
        }
        self.print_info(&format!("Signed in as {} ({})", identity.email, identity.user_id))
    }

    pub fn print_upload(&self, receipt: &UploadReceipt) -> Result<()> {
        if self.json {
            return self.print_json(receipt);
        }
        self.print_info(&format!(
            "Uploaded {} as {} ({} records)",
            receipt.filename, receipt.file_id, receipt.record_count
        ))
    }

    /// Rows as a table followed by the insight block.
    pub fn print_render_model(&self, model: &RenderModel) -> Result<()> {
        if self.json {
            return self.print_json(model);
        }
        let mut stdout = io::stdout();
        let title = model
            .source
            .as_ref()
            .map_or("No source selected", |s| s.display_name());
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print(format!("{}\n", title)),
            SetForegroundColor(Colors::DIM),
            Print(format!(
                "chart: {}{} | {}\n",
                model.chart_type,
                if model.year_separated { " (by year)" } else { "" },
                model.record_label.as_deref().unwrap_or("no records")
            )),
            ResetColor,
        )?;

        if model.rows.is_empty() {
            self.print_warning("No data available for the current selection.")?;
        } else {
            let columns = columns(&model.rows);
            let header: Vec<String> = columns
                .iter()
                .map(|c| format!("{:<w$}", truncate(c, MAX_CELL_WIDTH), w = MAX_CELL_WIDTH))
                .collect();
            execute!(
                stdout,
                SetForegroundColor(Colors::DIM),
                Print(format!("{}\n", header.join(" ").trim_end())),
                ResetColor,
            )?;
            for row in &model.rows {
                let cells: Vec<String> = columns
                    .iter()
                    .map(|c| {
                        let cell = row.get(c.as_str()).map(format_cell).unwrap_or_default();
                        format!("{:<w$}", truncate(&cell, MAX_CELL_WIDTH), w = MAX_CELL_WIDTH)
                    })
                    .collect();
                writeln!(stdout, "{}", cells.join(" ").trim_end())?;
            }
        }

        if let Some(insights) = &model.insights {
            self.print_insights(insights)?;
        }
        stdout.flush()?;
        Ok(())
    }

    fn print_insights(&self, insights: &InsightResult) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::HEADER),
            Print("\nInsights"),
            SetForegroundColor(Colors::DIM),
            Print(format!(" (trend: {})\n", insights.trend)),
            ResetColor,
            Print(format!("{}\n", insights.summary)),
        )?;
        for (title, items) in [
            ("Key findings", &insights.key_findings),
            ("Recommendations", &insights.recommendations),
            ("Anomalies", &insights.anomalies),
        ] {
            if items.is_empty() {
                continue;
            }
            execute!(
                stdout,
                SetForegroundColor(Colors::VALUE),
                Print(format!("{}:\n", title)),
                ResetColor,
            )?;
            for item in items {
                writeln!(stdout, "  - {}", item)?;
            }
        }
        for (title, text) in [
            ("Comparison", &insights.comparison_insights),
            ("Over time", &insights.temporal_analysis),
        ] {
            if let Some(text) = text {
                execute!(
                    stdout,
                    SetForegroundColor(Colors::VALUE),
                    Print(format!("{}: ", title)),
                    ResetColor,
                    Print(format!("{}\n", text)),
                )?;
            }
        }
        Ok(())
    }

    /// Ask for the captcha answer on stdin.
    pub fn prompt_captcha(&self) -> Result<i64> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::VALUE),
            Print("Captcha answer: "),
            ResetColor,
        )?;
        stdout.flush()?;

        let mut line = String::new();
        io::stdin()
            .lock()
            .read_line(&mut line)
            .context("failed to read captcha answer")?;
        line.trim()
            .parse()
            .context("captcha answer must be a whole number")
    }

    pub fn print_warning(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::WARNING),
            Print(format!("{}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }

    pub fn print_error(&self, msg: &str) -> Result<()> {
        let mut stderr = io::stderr();
        execute!(
            stderr,
            SetForegroundColor(Colors::ERROR),
            Print(format!("Error: {}\n", msg)),
            ResetColor,
        )?;
        stderr.flush()?;
        Ok(())
    }

    pub fn print_info(&self, msg: &str) -> Result<()> {
        let mut stdout = io::stdout();
        execute!(
            stdout,
            SetForegroundColor(Colors::DIM),
            Print(format!("{}\n", msg)),
            ResetColor,
        )?;
        stdout.flush()?;
        Ok(())
    }
}

/// Union of row keys in first-seen order.
fn columns(rows: &[Record]) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !seen.iter().any(|k| k == key) {
                seen.push(key.clone());
            }
        }
    }
    seen
}

fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}
