//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! information to the user in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::{ArtifactHasher, DumpReport};
use crate::model::{CheckReport, Component};
use crate::zone::{HelmRelease, Zone};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Component row for table display.
#[derive(Tabled)]
struct ComponentRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "Form")]
    form: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Hosts")]
    hosts: String,
    #[tabled(rename = "Hash")]
    hash: String,
}

/// Release row for table display.
#[derive(Tabled)]
struct ReleaseRow {
    #[tabled(rename = "Release")]
    name: String,
    #[tabled(rename = "Component")]
    component: String,
    #[tabled(rename = "Context")]
    context: String,
    #[tabled(rename = "Namespace")]
    namespace: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats the components of a zone, optionally only the enabled ones.
    #[must_use]
    pub fn format_components(&self, zone: &Zone, enabled_only: bool) -> String {
        let hasher = ArtifactHasher::new();
        let components: Vec<&Component> = zone
            .product
            .components
            .values()
            .filter(|c| !enabled_only || c.enabled)
            .collect();

        match self.format {
            OutputFormat::Json => {
                let list: Vec<ComponentJson> = components
                    .iter()
                    .map(|c| ComponentJson {
                        name: c.name.clone(),
                        version: c.version.clone(),
                        form: c.form.to_string(),
                        enabled: c.enabled,
                        external: c.external,
                        hosts: zone.cmdb.hosts_for_component(&c.name),
                        hash: hasher.hash_component(c).unwrap_or_default(),
                    })
                    .collect();
                serde_json::to_string_pretty(&list).unwrap_or_default()
            }
            OutputFormat::Text => {
                if components.is_empty() {
                    return "   No components.\n".to_string();
                }
                let rows: Vec<ComponentRow> = components
                    .iter()
                    .map(|c| ComponentRow {
                        name: c.name.clone(),
                        version: c.version.clone(),
                        form: c.form.to_string(),
                        state: Self::format_state(c),
                        hosts: Self::truncate(&zone.cmdb.hosts_for_component(&c.name).join(","), 40),
                        hash: hasher
                            .hash_component(c)
                            .map(|h| hasher.short_hash(&h))
                            .unwrap_or_default(),
                    })
                    .collect();

                let mut output = format!(
                    "\nProduct: {} ({}/{})\n\n",
                    zone.meta.product, zone.target, zone.name
                );
                output.push_str(&Table::new(rows).to_string());
                output.push('\n');
                output
            }
        }
    }

    /// Formats a check report.
    #[must_use]
    pub fn format_check(&self, report: &CheckReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => {
                let mut output = String::new();
                if report.is_valid() {
                    let _ = writeln!(output, "{} All services are valid.", "✓".green());
                } else {
                    let _ = writeln!(output, "{} {} error(s):", "✗".red(), report.error_count());
                    for error in &report.errors {
                        let _ = writeln!(output, "   - {error}");
                    }
                }
                if report.warning_count() > 0 {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &report.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }
                output
            }
        }
    }

    /// Formats a list of play tags.
    #[must_use]
    pub fn format_tags(&self, tags: &[String]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(tags).unwrap_or_default(),
            OutputFormat::Text => format!("{}\n", tags.join(",")),
        }
    }

    /// Formats planned chart releases.
    #[must_use]
    pub fn format_releases(&self, releases: &[HelmRelease]) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(releases).unwrap_or_default(),
            OutputFormat::Text => {
                if releases.is_empty() {
                    return "   No releases.\n".to_string();
                }
                let rows: Vec<ReleaseRow> = releases
                    .iter()
                    .map(|r| ReleaseRow {
                        name: r.name.clone(),
                        component: r.component.clone().unwrap_or_else(|| "-".to_string()),
                        context: r
                            .k8s
                            .as_ref()
                            .map_or_else(String::new, |k| k.kube_context.clone()),
                        namespace: r
                            .k8s
                            .as_ref()
                            .map_or_else(String::new, |k| k.namespace.clone()),
                    })
                    .collect();
                let mut output = Table::new(rows).to_string();
                output.push('\n');
                output
            }
        }
    }

    /// Formats the outcome of writing a zone.
    #[must_use]
    pub fn format_dump(&self, zone: &Zone, report: &DumpReport) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({
                    "target": zone.target,
                    "zone": zone.name,
                    "hash": report.hash,
                    "changed": report.changed(),
                });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => {
                let hash = ArtifactHasher::new().short_hash(&report.hash);
                if report.changed() {
                    format!(
                        "{} Zone {}/{} written ({hash})\n",
                        "✓".green(),
                        zone.target,
                        zone.name
                    )
                } else {
                    format!(
                        "{} Zone {}/{} unchanged ({hash})\n",
                        "✓".green(),
                        zone.target,
                        zone.name
                    )
                }
            }
        }
    }

    /// Formats an error message.
    #[must_use]
    pub fn error(&self, message: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({ "status": "error", "message": message });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => format!("{} {message}", "✗".red()),
        }
    }

    /// Formats a warning message.
    #[must_use]
    pub fn warning(&self, message: &str) -> String {
        match self.format {
            OutputFormat::Json => {
                let json = serde_json::json!({ "status": "warning", "message": message });
                serde_json::to_string_pretty(&json).unwrap_or_default()
            }
            OutputFormat::Text => format!("{} {message}", "⚠".yellow()),
        }
    }

    /// Formats the activation state of a component with color.
    fn format_state(component: &Component) -> String {
        if component.external {
            "external".cyan().to_string()
        } else if component.enabled {
            "enabled".green().to_string()
        } else {
            "disabled".dimmed().to_string()
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{head}...")
        }
    }
}

// JSON serialization helpers

#[derive(serde::Serialize)]
struct ComponentJson {
    name: String,
    version: String,
    form: String,
    enabled: bool,
    external: bool,
    hosts: Vec<String>,
    hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CheckError;

    #[test]
    fn test_truncate() {
        assert_eq!(OutputFormatter::truncate("short", 10), "short");
        assert_eq!(OutputFormatter::truncate("0123456789abc", 10), "0123456...");
    }

    #[test]
    fn test_format_tags() {
        let formatter = OutputFormatter::new(OutputFormat::Text);
        let tags = vec!["play-a".to_string(), "play-b".to_string()];
        assert_eq!(formatter.format_tags(&tags), "play-a,play-b\n");

        let json = OutputFormatter::new(OutputFormat::Json).format_tags(&tags);
        let parsed: Vec<String> = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, tags);
    }

    #[test]
    fn test_format_check_json() {
        let report = CheckReport {
            errors: vec![CheckError {
                component: "web".to_string(),
                service: "http".to_string(),
                message: "port is 0".to_string(),
            }],
            warnings: Vec::new(),
        };
        let json = OutputFormatter::new(OutputFormat::Json).format_check(&report);
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["errors"][0]["component"], "web");
    }
}
