use crate::cli::OutputFormat;
use crate::models::{ScanReport, ScanResult};
use anyhow::{Context, Result};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL};
use std::fs;
use std::path::Path;

/// Generate and output a report in the specified format
pub fn generate_report(
    report: &ScanReport,
    format: OutputFormat,
    output_path: Option<&Path>,
) -> Result<()> {
    let output = match format {
        OutputFormat::Terminal => format_terminal(report),
        OutputFormat::Markdown => format_markdown(report),
        OutputFormat::Json => format_json(report)?,
    };

    if let Some(path) = output_path {
        fs::write(path, output)
            .with_context(|| format!("Failed to write output to {}", path.display()))?;
        println!("Report written to {}", path.display());
    } else {
        println!("{}", output);
    }

    Ok(())
}

fn no_leaks_message(report: &ScanReport) -> String {
    match report.target_email {
        Some(ref email) => format!("No leaks found for {}", email),
        None => "No identities found".to_string(),
    }
}

/// Format report as terminal table
fn format_terminal(report: &ScanReport) -> String {
    let mut output = String::new();

    let line = "─".repeat(58);
    output.push_str(&format!("╭{}╮\n", line));
    output.push_str(&format!("│ {:^56} │\n", "Patchfinder"));
    output.push_str(&format!("│ Account: {:<47} │\n", report.account));
    if let Some(ref email) = report.target_email {
        output.push_str(&format!("│ Searching for: {:<41} │\n", email));
    }
    output.push_str(&format!(
        "│ Repositories: {:<5} Patches: {:<7} Skipped: {:<9} │\n",
        report.repositories, report.patches, report.warnings
    ));
    output.push_str(&format!("╰{}╯\n\n", line));

    if report.result.is_empty() {
        output.push_str(&no_leaks_message(report));
        output.push('\n');
        return output;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);

    match report.result {
        ScanResult::Identities(ref identities) => {
            output.push_str(&format!("Unique Identities ({}):\n", identities.len()));
            table.set_header(vec![
                Cell::new("Name").fg(Color::Cyan),
                Cell::new("Email").fg(Color::Cyan),
            ]);
            for identity in identities {
                table.add_row(vec![identity.name.as_str(), identity.email.as_str()]);
            }
        }
        ScanResult::Matches(ref matches) => {
            output.push_str(&format!("Leaking Commits ({}):\n", matches.len()));
            table.set_header(vec![
                Cell::new("Repository").fg(Color::Cyan),
                Cell::new("Commit").fg(Color::Cyan),
                Cell::new("Name").fg(Color::Cyan),
            ]);
            for m in matches {
                table.add_row(vec![
                    m.repository.as_str(),
                    m.commit_reference.as_str(),
                    m.name.as_str(),
                ]);
            }
        }
    }

    output.push_str(&format!("{}\n", table));
    output
}

/// Format report as Markdown
fn format_markdown(report: &ScanReport) -> String {
    let mut output = String::new();

    output.push_str("# Patchfinder Report\n\n");
    output.push_str(&format!("**Account**: `{}`\n", report.account));
    if let Some(ref email) = report.target_email {
        output.push_str(&format!("**Searching for**: `{}`\n", email));
    }
    output.push_str(&format!("**Repositories**: {}\n", report.repositories));
    output.push_str(&format!("**Patches**: {}\n", report.patches));
    output.push_str(&format!("**Skipped requests**: {}\n\n", report.warnings));

    if report.result.is_empty() {
        output.push_str(&format!("_{}_\n", no_leaks_message(report)));
        return output;
    }

    match report.result {
        ScanResult::Identities(ref identities) => {
            output.push_str("## Unique Identities\n\n");
            output.push_str("| Name | Email |\n|------|-------|\n");
            for identity in identities {
                output.push_str(&format!(
                    "| {} | {} |\n",
                    escape_cell(&identity.name),
                    escape_cell(&identity.email)
                ));
            }
        }
        ScanResult::Matches(ref matches) => {
            output.push_str("## Leaking Commits\n\n");
            for (idx, m) in matches.iter().enumerate() {
                output.push_str(&format!(
                    "{}. **{}** {} ({})\n",
                    idx + 1,
                    m.repository,
                    m.commit_reference,
                    m.name
                ));
            }
        }
    }

    output
}

fn escape_cell(value: &str) -> String {
    value.replace('|', "\\|")
}

/// Format report as JSON
fn format_json(report: &ScanReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")
}
