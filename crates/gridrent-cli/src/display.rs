use crate::Result;
use colored::Colorize;
use dialoguer::{theme::ColorfulTheme, Confirm};
use gridrent_core::{
    AvailabilityState, CostEstimate, EarningsProjection, Job, JobStatus, Listing, ModelSummary,
    Page, ProviderStats,
};
use gridrent_utils::{
    format_gpu_specs, format_hours, format_percentage, format_price_in,
};

/// Table formatting utilities
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    max_widths: Vec<usize>,
}

/// Printable width of a cell, ignoring ANSI color sequences
fn visible_width(cell: &str) -> usize {
    let mut width = 0;
    let mut in_escape = false;
    for c in cell.chars() {
        match (in_escape, c) {
            (false, '\u{1b}') => in_escape = true,
            (true, 'm') => in_escape = false,
            (true, _) => {}
            (false, _) => width += 1,
        }
    }
    width
}

impl Table {
    pub fn new<S: Into<String>>(headers: impl IntoIterator<Item = S>) -> Self {
        let headers: Vec<String> = headers.into_iter().map(Into::into).collect();
        let max_widths = headers.iter().map(|h| visible_width(h)).collect();
        Self {
            headers,
            rows: Vec::new(),
            max_widths,
        }
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        for (i, cell) in row.iter().enumerate() {
            if i < self.max_widths.len() {
                self.max_widths[i] = self.max_widths[i].max(visible_width(cell));
            }
        }
        self.rows.push(row);
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&self.separator('┌', '┬', '┐'));
        out.push_str(&self.line(&self.headers, true));
        out.push_str(&self.separator('├', '┼', '┤'));
        for row in &self.rows {
            out.push_str(&self.line(row, false));
        }
        out.push_str(&self.separator('└', '┴', '┘'));
        out
    }

    pub fn print(&self) {
        print!("{}", self.render());
    }

    fn separator(&self, left: char, mid: char, right: char) -> String {
        let inner: Vec<String> = self
            .max_widths
            .iter()
            .map(|&width| "─".repeat(width + 2))
            .collect();
        format!("{}{}{}\n", left, inner.join(&mid.to_string()), right)
    }

    fn line(&self, cells: &[String], header: bool) -> String {
        let mut out = String::from("│");
        for (i, &width) in self.max_widths.iter().enumerate() {
            let cell = cells.get(i).map(String::as_str).unwrap_or("");
            let padding = " ".repeat(width.saturating_sub(visible_width(cell)));
            let text = if header {
                cell.bold().to_string()
            } else {
                cell.to_string()
            };
            out.push_str(&format!(" {}{} │", text, padding));
        }
        out.push('\n');
        out
    }
}

fn colored_state(state: AvailabilityState) -> String {
    match state {
        AvailabilityState::Online => state.as_str().green().to_string(),
        AvailabilityState::Busy => state.as_str().yellow().to_string(),
        AvailabilityState::Maintenance => state.as_str().blue().to_string(),
        AvailabilityState::Offline => state.as_str().red().to_string(),
    }
}

fn colored_job_status(status: JobStatus) -> String {
    match status {
        JobStatus::Completed => status.as_str().green().to_string(),
        JobStatus::Running => status.as_str().cyan().to_string(),
        JobStatus::Pending | JobStatus::Queued => status.as_str().yellow().to_string(),
        JobStatus::Failed | JobStatus::Cancelled => status.as_str().red().to_string(),
    }
}

/// Display listings in a formatted table
pub fn display_listings_table(listings: &[Listing]) {
    if listings.is_empty() {
        println!("{}", "No GPUs match these filters.".yellow());
        return;
    }

    let mut table = Table::new([
        "#", "ID", "GPU", "VRAM", "Price/hr", "Location", "Uptime", "Rating", "Provider", "Status",
    ]);

    for (i, listing) in listings.iter().enumerate() {
        table.add_row(vec![
            (i + 1).to_string(),
            listing.id.clone(),
            listing.specs.model.clone(),
            format!("{}GB", listing.specs.vram_gb),
            format_price_in(listing.price_per_hour(), &listing.pricing.currency),
            format!("{}, {}", listing.location.city, listing.location.country),
            format_percentage(listing.performance.uptime),
            format!("{:.1}", listing.performance.rating),
            listing.owner.name.clone(),
            colored_state(listing.status),
        ]);
    }

    table.print();
}

/// One line per listing
pub fn display_listings_compact(listings: &[Listing]) {
    if listings.is_empty() {
        println!("{}", "No GPUs match these filters.".yellow());
        return;
    }

    for listing in listings {
        let icon = if listing.status.is_rentable() {
            "●".green()
        } else {
            "○".dimmed()
        };
        println!(
            "{} {:<10} {:<28} {:>10}/hr  {} ({})",
            icon,
            listing.id,
            format_gpu_specs(listing.specs.vram_gb, &listing.specs.model),
            format_price_in(listing.price_per_hour(), &listing.pricing.currency),
            listing.location.city,
            listing.location.region
        );
    }
}

/// Aggregated view per GPU model
pub fn display_model_summary(summaries: &[ModelSummary], currency: &str) {
    if summaries.is_empty() {
        println!("{}", "No GPU models found.".yellow());
        return;
    }

    let mut table = Table::new(["GPU", "Count", "Online", "Min/hr", "Avg/hr", "Max/hr"]);
    for summary in summaries {
        table.add_row(vec![
            summary.model.clone(),
            summary.count.to_string(),
            format!("{}/{}", summary.online, summary.count),
            format_price_in(summary.min_price, currency),
            format_price_in(summary.avg_price, currency),
            format_price_in(summary.max_price, currency),
        ]);
    }
    table.print();
}

pub fn display_listing_details(listing: &Listing) {
    println!("{}", format!("GPU Node: {}", listing.name).bold().blue());
    println!("  {}: {}", "ID".bold(), listing.id);
    println!("  {}: {}", "Status".bold(), colored_state(listing.status));
    println!(
        "  {}: {}",
        "GPU".bold(),
        format_gpu_specs(listing.specs.vram_gb, &listing.specs.model)
    );
    println!(
        "  {}: {} cores, {}GB RAM, {}GB storage",
        "Hardware".bold(),
        listing.specs.cores,
        listing.specs.memory_gb,
        listing.specs.storage_gb
    );
    println!(
        "  {}: {}/hr",
        "Price".bold(),
        format_price_in(listing.price_per_hour(), &listing.pricing.currency)
    );
    println!(
        "  {}: {}, {} ({})",
        "Location".bold(),
        listing.location.city,
        listing.location.country,
        listing.location.region
    );
    println!(
        "  {}: {} - {}",
        "Rental window".bold(),
        format_hours(listing.rental_window.min_duration),
        format_hours(listing.rental_window.max_duration)
    );
    println!();
}

/// Display cost estimate
pub fn display_estimate(estimate: &CostEstimate, min_vram_gb: f64, budget: Option<f64>, currency: &str) {
    println!("{}", "Cost Estimate".bold().blue());
    println!("  {}: {}GB", "Minimum VRAM".bold(), min_vram_gb);
    println!(
        "  {}: {}/hr",
        "Rate".bold(),
        format_price_in(estimate.hourly_rate, currency)
    );
    println!("  {}: {}", "Duration".bold(), format_hours(estimate.hours));
    println!(
        "  {}: {}",
        "Total".bold(),
        format_price_in(estimate.total, currency).bold()
    );

    if let Some(budget) = budget {
        if estimate.total <= budget {
            print_success(&format!(
                "Within budget ({} remaining)",
                format_price_in(budget - estimate.total, currency)
            ));
        } else {
            print_warning(&format!(
                "Over budget by {}",
                format_price_in(estimate.total - budget, currency)
            ));
        }
    }
}

/// Display jobs in a formatted table
pub fn display_jobs_table(page: &Page<Job>) {
    if page.items.is_empty() {
        println!("{}", "No jobs found.".yellow());
        return;
    }

    let mut table = Table::new(["ID", "Name", "Status", "Image", "Budget", "Created"]);
    for job in &page.items {
        table.add_row(vec![
            job.id.clone(),
            job.name.clone(),
            colored_job_status(job.status),
            job.image.clone(),
            format_price_in(job.pricing.max_budget, &job.pricing.currency),
            job.timestamps.created.format("%Y-%m-%d %H:%M").to_string(),
        ]);
    }
    table.print();

    println!(
        "Page {} ({} jobs total){}",
        page.page,
        page.total,
        if page.has_next { ", more with --page" } else { "" }
    );
}

/// Display detailed job information
pub fn display_job_details(job: &Job) {
    println!("{}", format!("Job: {}", job.name).bold().blue());
    println!("  {}: {}", "ID".bold(), job.id);
    println!("  {}: {}", "Status".bold(), colored_job_status(job.status));
    println!("  {}: {}", "Image".bold(), job.image);
    if let Some(description) = &job.description {
        println!("  {}: {}", "Description".bold(), description);
    }
    println!(
        "  {}: {}GB VRAM, up to {}",
        "Requirements".bold(),
        job.requirements.min_vram_gb,
        format_hours(job.requirements.max_duration)
    );
    println!(
        "  {}: {}",
        "Budget".bold(),
        format_price_in(job.pricing.max_budget, &job.pricing.currency)
    );
    if let Some(cost) = job.pricing.actual_cost {
        println!(
            "  {}: {}",
            "Actual cost".bold(),
            format_price_in(cost, &job.pricing.currency)
        );
    }
    if let Some(node) = &job.assigned_node {
        println!(
            "  {}: {} ({})",
            "Node".bold(),
            node.id,
            format_gpu_specs(node.specs.vram_gb, &node.specs.model)
        );
    }
    if let Some(progress) = &job.progress {
        println!(
            "  {}: {} ({})",
            "Progress".bold(),
            format_percentage(progress.percentage),
            progress.stage
        );
    }
    println!(
        "  {}: {}",
        "Created".bold(),
        job.timestamps.created.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(completed) = job.timestamps.completed {
        println!(
            "  {}: {}",
            "Completed".bold(),
            completed.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    println!();
}

pub fn display_provider_stats(stats: &ProviderStats, currency: &str) {
    println!("{}", "Provider Statistics".bold().blue());
    println!(
        "  {}: {}",
        "Total earnings".bold(),
        format_price_in(stats.total_earnings, currency)
    );
    println!(
        "  {}: {}",
        "Pending payments".bold(),
        format_price_in(stats.pending_payments, currency)
    );
    println!(
        "  {}: {}",
        "Withdrawn".bold(),
        format_price_in(stats.total_withdrawn, currency)
    );
    println!("  {}: {}", "Runtime".bold(), format_hours(stats.total_runtime));
    println!(
        "  {}: {} completed, {} running",
        "Jobs".bold(),
        stats.jobs_completed,
        stats.current_jobs
    );
    println!("  {}: {}", "Uptime".bold(), format_percentage(stats.uptime));
    println!("  {}: {:.1}/5", "Rating".bold(), stats.rating);
}

pub fn display_earnings(projection: &EarningsProjection, currency: &str) {
    let mut table = Table::new(["Period", "Earnings"]);
    table.add_row(vec![
        format!("Daily ({})", format_hours(projection.hours_per_day)),
        format_price_in(projection.daily, currency),
    ]);
    table.add_row(vec![
        "Monthly (30d)".to_string(),
        format_price_in(projection.monthly, currency),
    ]);
    table.add_row(vec![
        "Yearly (365d)".to_string(),
        format_price_in(projection.yearly, currency),
    ]);

    println!(
        "{} at {}/hr",
        "Projected earnings".bold().blue(),
        format_price_in(projection.hourly_rate, currency)
    );
    table.print();
}

/// Pretty-print an untyped backend response
pub fn display_json(value: &serde_json::Value) {
    match value {
        serde_json::Value::Null => {}
        other => println!(
            "{}",
            serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())
        ),
    }
}

/// Interactive prompts
pub fn prompt_confirm(message: &str, default: bool) -> Result<bool> {
    let result = Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(message)
        .default(default)
        .interact()?;

    Ok(result)
}

/// Status messages
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_visible_width_ignores_color() {
        assert_eq!(visible_width("\u{1b}[32monline\u{1b}[0m"), 6);
        assert_eq!(visible_width("\u{1b}[1;31mfailed\u{1b}[0m"), 6);
        assert_eq!(visible_width("RTX 4090"), 8);
    }

    #[test]
    fn test_table_columns_align() {
        let mut table = Table::new(["ID", "Price/hr"]);
        table.add_row(vec!["gpu-1".to_string(), "$0.85".to_string()]);
        table.add_row(vec!["gpu-10".to_string(), "$2.50".to_string()]);

        let rendered = table.render();
        let widths: Vec<usize> = rendered.lines().map(visible_width).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]));
        assert!(rendered.contains("│ gpu-10 │ $2.50    │"));
    }
}
