//! Output formatting for CLI commands.
//!
//! Text output is a table per listing; JSON output serialises the portable
//! metadata types as they are.

use colored::Colorize;
use serde::Serialize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::compute::{
    CreatedNode, HardwareMetadata, ImageMetadata, LocationMetadata, NodeMetadata, NodeStatus,
};
use crate::config::ValidationResult;
use crate::planner::StepSummary;

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug, Clone, Copy)]
pub struct OutputFormatter {
    format: OutputFormat,
}

#[derive(Tabled)]
struct LocationRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Description")]
    description: String,
}

#[derive(Tabled)]
struct HardwareRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Cores")]
    cores: u32,
    #[tabled(rename = "RAM (MB)")]
    ram_mb: u64,
    #[tabled(rename = "Disk (GB)")]
    disk_gb: u64,
    #[tabled(rename = "Location")]
    location: String,
}

#[derive(Tabled)]
struct ImageRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Version")]
    version: String,
    #[tabled(rename = "OS")]
    os: String,
    #[tabled(rename = "Location")]
    location: String,
}

#[derive(Tabled)]
struct NodeRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Group")]
    group: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Hardware")]
    hardware: String,
    #[tabled(rename = "Public IP")]
    public_ip: String,
}

#[derive(Tabled)]
struct StepRow {
    #[tabled(rename = "#")]
    index: usize,
    #[tabled(rename = "Step")]
    description: String,
    #[tabled(rename = "After")]
    after: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats locations.
    #[must_use]
    pub fn format_locations(&self, locations: &[LocationMetadata]) -> String {
        self.render(locations, || {
            let rows = locations.iter().map(|l| LocationRow {
                id: l.id.clone(),
                description: l.description.clone(),
            });
            Self::table("locations", rows)
        })
    }

    /// Formats hardware profiles.
    #[must_use]
    pub fn format_hardware(&self, profiles: &[HardwareMetadata]) -> String {
        self.render(profiles, || {
            let rows = profiles.iter().map(|h| HardwareRow {
                id: h.id.clone(),
                cores: h.cores,
                ram_mb: h.ram_mb,
                disk_gb: h.disk_gb,
                location: h.location.clone().unwrap_or_else(|| String::from("any")),
            });
            Self::table("hardware profiles", rows)
        })
    }

    /// Formats images.
    #[must_use]
    pub fn format_images(&self, images: &[ImageMetadata]) -> String {
        self.render(images, || {
            let rows = images.iter().map(|i| ImageRow {
                id: Self::truncate(&i.id, 60),
                name: i.name.clone(),
                version: i.version.clone(),
                os: i.os_family.to_string(),
                location: i.location.clone().unwrap_or_default(),
            });
            Self::table("images", rows)
        })
    }

    /// Formats a single image, or its absence.
    #[must_use]
    pub fn format_image(&self, id: &str, image: Option<&ImageMetadata>) -> String {
        match (self.format, image) {
            (OutputFormat::Json, _) => Self::json(&image),
            (OutputFormat::Text, None) => format!("{} Image {id} not found\n", "✗".red()),
            (OutputFormat::Text, Some(image)) => {
                let mut output = format!("\n{}\n", image.name.bold());
                let _ = writeln!(output, "   ID: {}", image.id);
                let _ = writeln!(output, "   Version: {}", image.version);
                let _ = writeln!(output, "   OS family: {}", image.os_family);
                if let Some(location) = &image.location {
                    let _ = writeln!(output, "   Location: {location}");
                }
                if let Some(description) = &image.description {
                    let _ = writeln!(output, "   Description: {description}");
                }
                if let Some(credentials) = &image.default_credentials {
                    let _ = writeln!(output, "   Default user: {}", credentials.user);
                }
                output
            }
        }
    }

    /// Formats nodes.
    #[must_use]
    pub fn format_nodes(&self, nodes: &[NodeMetadata]) -> String {
        self.render(nodes, || {
            let rows = nodes.iter().map(|n| NodeRow {
                id: n.id.clone(),
                name: n.name.clone(),
                group: n.group.clone().unwrap_or_default(),
                status: Self::format_status(n.status),
                hardware: n.hardware_id.clone().unwrap_or_default(),
                public_ip: n.public_addresses.join(", "),
            });
            Self::table("nodes", rows)
        })
    }

    /// Formats a single node, or its absence.
    #[must_use]
    pub fn format_node(&self, id: &str, node: Option<&NodeMetadata>) -> String {
        match (self.format, node) {
            (OutputFormat::Json, _) => Self::json(&node),
            (OutputFormat::Text, None) => format!("{} Node {id} not found\n", "✗".red()),
            (OutputFormat::Text, Some(node)) => {
                let mut output = format!("\n{} {}\n", node.name.bold(), Self::format_status(node.status));
                let _ = writeln!(output, "   ID: {}", node.id);
                if let Some(group) = &node.group {
                    let _ = writeln!(output, "   Group: {group}");
                }
                if let Some(location) = &node.location {
                    let _ = writeln!(output, "   Location: {location}");
                }
                if let Some(hardware) = &node.hardware_id {
                    let _ = writeln!(output, "   Hardware: {hardware}");
                }
                if let Some(image) = &node.image_id {
                    let _ = writeln!(output, "   Image: {image}");
                }
                let _ = writeln!(output, "   Public addresses: {}", node.public_addresses.join(", "));
                let _ = writeln!(output, "   Private addresses: {}", node.private_addresses.join(", "));
                output
            }
        }
    }

    /// Formats the steps a creation would take.
    #[must_use]
    pub fn format_plan(&self, group: &str, steps: &[StepSummary]) -> String {
        match self.format {
            OutputFormat::Json => Self::json(&serde_json::json!({ "group": group, "steps": steps })),
            OutputFormat::Text => {
                let mut output = format!("\nCreation plan for a node of group {}\n", group.bold());
                let rows = steps.iter().map(|s| StepRow {
                    index: s.index,
                    description: s.description.clone(),
                    after: s
                        .dependencies
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(", "),
                });
                output.push_str(&Table::new(rows).to_string());
                let _ = writeln!(output, "\n\nPlan: {} steps", steps.len().to_string().green());
                output
            }
        }
    }

    /// Formats created nodes with their credentials.
    #[must_use]
    pub fn format_created(&self, created: &[CreatedNode]) -> String {
        match self.format {
            OutputFormat::Json => {
                let json: Vec<_> = created
                    .iter()
                    .map(|c| serde_json::json!({ "node": c.node, "credentials": c.credentials }))
                    .collect();
                Self::json(&json)
            }
            OutputFormat::Text => {
                let mut output = String::new();
                for c in created {
                    let _ = writeln!(
                        output,
                        "{} Created {} ({}) at {}",
                        "✓".green(),
                        c.node.name.bold(),
                        c.node.id,
                        c.node.public_addresses.join(", ")
                    );
                    if let Some(credentials) = &c.credentials {
                        let auth = if credentials.key.is_some() { "key" } else { "password" };
                        let _ = writeln!(output, "   login: {} ({auth})", credentials.user);
                    }
                }
                output
            }
        }
    }

    /// Formats a validation result.
    #[must_use]
    pub fn format_validation(&self, result: &ValidationResult, show_warnings: bool) -> String {
        match self.format {
            OutputFormat::Json => Self::json(&serde_json::json!({
                "valid": result.is_valid(),
                "errors": result.errors.iter().map(ToString::to_string).collect::<Vec<_>>(),
                "warnings": result.warnings,
            })),
            OutputFormat::Text => {
                let mut output = if result.is_valid() {
                    format!("{} Configuration is valid\n", "✓".green())
                } else {
                    format!("{} Configuration has {} error(s)\n", "✗".red(), result.error_count())
                };
                for error in &result.errors {
                    let _ = writeln!(output, "   - {error}");
                }
                if show_warnings && result.warning_count() > 0 {
                    let _ = write!(output, "\n{} Warnings:\n", "⚠".yellow());
                    for warning in &result.warnings {
                        let _ = writeln!(output, "   - {warning}");
                    }
                }
                output
            }
        }
    }

    /// Formats the outcome of an action on nodes.
    #[must_use]
    pub fn format_done(&self, action: &str, ids: &[String]) -> String {
        match self.format {
            OutputFormat::Json => Self::json(&serde_json::json!({ "action": action, "nodes": ids })),
            OutputFormat::Text if ids.is_empty() => format!("Nothing to {action}.\n"),
            OutputFormat::Text => {
                let mut output = String::new();
                for id in ids {
                    let _ = writeln!(output, "{} {action}: {id}", "✓".green());
                }
                output
            }
        }
    }

    fn render<T: Serialize>(&self, items: &[T], text: impl FnOnce() -> String) -> String {
        match self.format {
            OutputFormat::Json => Self::json(&items),
            OutputFormat::Text => text(),
        }
    }

    fn table<R: Tabled>(what: &str, rows: impl Iterator<Item = R>) -> String {
        let rows: Vec<R> = rows.collect();
        if rows.is_empty() {
            return format!("No {what}.\n");
        }
        let count = rows.len();
        format!("{}\n{count} {what}\n", Table::new(rows))
    }

    fn json<T: Serialize + ?Sized>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_default()
    }

    fn format_status(status: NodeStatus) -> String {
        let s = status.to_string().to_lowercase();
        match status {
            NodeStatus::Running => s.green().to_string(),
            NodeStatus::Pending => s.yellow().to_string(),
            NodeStatus::Suspended | NodeStatus::Terminated => s.red().to_string(),
            NodeStatus::Error => s.red().bold().to_string(),
            NodeStatus::Unrecognized => s.dimmed().to_string(),
        }
    }

    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len - 3).collect();
            format!("{kept}...")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node() -> NodeMetadata {
        NodeMetadata {
            id: String::from("dc-1/srv-1"),
            name: String::from("web-1a2b3c"),
            group: Some(String::from("web")),
            status: NodeStatus::Running,
            location: Some(String::from("de/fkb")),
            hardware_id: Some(String::from("cores=2,ram=2048,disk=20")),
            image_id: Some(String::from("img-1")),
            public_addresses: vec![String::from("46.16.73.50")],
            private_addresses: Vec::new(),
        }
    }

    #[test]
    fn test_nodes_as_json() {
        let output = OutputFormatter::new(OutputFormat::Json).format_nodes(&[node()]);
        let parsed: serde_json::Value = serde_json::from_str(&output).expect("json");
        assert_eq!(parsed[0]["id"], "dc-1/srv-1");
        assert_eq!(parsed[0]["status"], "RUNNING");
    }

    #[test]
    fn test_nodes_as_table() {
        colored::control::set_override(false);
        let output = OutputFormatter::new(OutputFormat::Text).format_nodes(&[node()]);
        assert!(output.contains("web-1a2b3c"));
        assert!(output.contains("46.16.73.50"));
        assert!(output.contains("1 nodes"));

        let empty = OutputFormatter::new(OutputFormat::Text).format_nodes(&[]);
        assert_eq!(empty, "No nodes.\n");
    }

    #[test]
    fn test_missing_node() {
        let text = OutputFormatter::new(OutputFormat::Text).format_node("dc/x", None);
        assert!(text.contains("dc/x not found"));
        let json = OutputFormatter::new(OutputFormat::Json).format_node("dc/x", None);
        assert_eq!(json, "null");
    }

    #[test]
    fn test_truncate() {
        assert_eq!(OutputFormatter::truncate("short", 10), "short");
        assert_eq!(OutputFormatter::truncate("a-very-long-image-id", 10), "a-very-...");
    }
}
