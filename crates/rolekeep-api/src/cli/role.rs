//! Role CLI subcommands.
//!
//! Thin wrappers over `RoleStore`: upsert a role from a JSON file, get, list,
//! delete one, or delete all.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Subcommand;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use console::style;
use dialoguer::Confirm;

use rolekeep_core::marshal::{JsonRoleMarshaler, RoleMarshaler};
use rolekeep_core::storage::backend::Backend;
use rolekeep_core::storage::clock::Clock;
use rolekeep_types::role::{RoleV1, ServiceRole};

use crate::state::AppState;

/// Role subcommands.
#[derive(Subcommand)]
pub enum RoleCommand {
    /// Create or replace a role from a JSON file.
    Upsert {
        /// Path to the role JSON (`{"kind":"role","version":"v1","metadata":{...},"spec":{...}}`).
        file: PathBuf,

        /// Time-to-live in seconds (0 = no expiration). Defaults to the configured value.
        #[arg(long)]
        ttl: Option<u64>,
    },

    /// Show a role by name.
    Get {
        /// Role name.
        name: String,
    },

    /// List all roles, sorted by name.
    #[command(alias = "ls")]
    List,

    /// Delete a role.
    #[command(alias = "rm")]
    Delete {
        /// Role name.
        name: String,
    },

    /// Delete every role.
    #[command(name = "delete-all")]
    DeleteAll {
        /// Skip the confirmation prompt.
        #[arg(long)]
        force: bool,
    },
}

/// Handle a role subcommand.
pub async fn handle_role_command(cmd: RoleCommand, state: &AppState, json: bool) -> Result<()> {
    match cmd {
        RoleCommand::Upsert { file, ttl } => upsert_role(state, &file, ttl, json).await,
        RoleCommand::Get { name } => get_role(state, &name, json).await,
        RoleCommand::List => list_roles(state, json).await,
        RoleCommand::Delete { name } => delete_role(state, &name, json).await,
        RoleCommand::DeleteAll { force } => delete_all_roles(state, force, json).await,
    }
}

/// Read and validate a role definition from disk.
async fn read_role_file(path: &Path) -> Result<RoleV1> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;

    JsonRoleMarshaler
        .unmarshal_service_role(&data)
        .with_context(|| format!("Invalid role definition in {}", path.display()))
}

async fn upsert_role(state: &AppState, file: &Path, ttl: Option<u64>, json: bool) -> Result<()> {
    let role = read_role_file(file).await?;
    let ttl = Duration::from_secs(ttl.unwrap_or(state.config.default_role_ttl_secs));

    state
        .role_store
        .upsert_role(&role, ttl)
        .await
        .with_context(|| format!("Failed to save role '{}'", role.name()))?;

    if json {
        let result = serde_json::json!({
            "name": role.name(),
            "ttl_secs": ttl.as_secs(),
            "expires": role.expires(),
        });
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        println!();
        println!(
            "  {} Role '{}' saved{}",
            style("ok").green(),
            style(role.name()).cyan(),
            if ttl.is_zero() {
                String::new()
            } else {
                format!(" (ttl {}s)", ttl.as_secs())
            },
        );
        println!();
    }

    Ok(())
}

async fn get_role(state: &AppState, name: &str, json: bool) -> Result<()> {
    let role = state.role_store.get_role(name).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&role)?);
        return Ok(());
    }

    let now = state.role_store.backend().clock().now();
    println!();
    println!("  {}", style(role.name()).cyan().bold());
    if !role.metadata.description.is_empty() {
        println!("  {}", style(&role.metadata.description).dim());
    }
    println!();
    println!("  {:<18} {}", style("Logins").bold(), join_or_dash(&role.spec.logins));
    println!(
        "  {:<18} {}",
        style("Namespaces").bold(),
        join_or_dash(&role.spec.namespaces)
    );
    println!(
        "  {:<18} {}s",
        style("Max session TTL").bold(),
        role.spec.max_session_ttl_secs
    );
    println!(
        "  {:<18} {}",
        style("Expires").bold(),
        format_expires(now, role.expires())
    );
    for (resource, verbs) in &role.spec.resources {
        println!(
            "  {:<18} {}: {}",
            style("Resource").bold(),
            resource,
            verbs.join(", ")
        );
    }
    println!();

    Ok(())
}

async fn list_roles(state: &AppState, json: bool) -> Result<()> {
    let roles = state.role_store.get_roles().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&roles)?);
        return Ok(());
    }

    if roles.is_empty() {
        println!();
        println!(
            "  {} No roles found. Add one with: {}",
            style("i").blue().bold(),
            style("rolekeep role upsert <file.json>").yellow()
        );
        println!();
        return Ok(());
    }

    let now = state.role_store.backend().clock().now();

    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    table.set_header(vec![
        Cell::new("Name").fg(Color::White),
        Cell::new("Logins").fg(Color::White),
        Cell::new("Description").fg(Color::White),
        Cell::new("Expires").fg(Color::White),
    ]);

    for role in &roles {
        let desc = &role.metadata.description;
        let desc = if desc.chars().count() > 50 {
            format!("{}...", desc.chars().take(47).collect::<String>())
        } else {
            desc.clone()
        };

        table.add_row(vec![
            Cell::new(role.name()).fg(Color::Cyan),
            Cell::new(join_or_dash(&role.spec.logins)),
            Cell::new(desc),
            Cell::new(format_expires(now, role.expires())).fg(Color::DarkGrey),
        ]);
    }

    println!("{table}");
    Ok(())
}

async fn delete_role(state: &AppState, name: &str, json: bool) -> Result<()> {
    state.role_store.delete_role(name).await?;

    if json {
        println!("{}", serde_json::json!({"deleted": true, "name": name}));
    } else {
        println!("  {} Role '{}' deleted.", style("✓").red().bold(), name);
    }

    Ok(())
}

async fn delete_all_roles(state: &AppState, force: bool, json: bool) -> Result<()> {
    if !force && !json {
        let confirmed = Confirm::new()
            .with_prompt(format!(
                "Permanently delete {} roles?",
                style("all").red().bold()
            ))
            .default(false)
            .interact()?;

        if !confirmed {
            println!("  Cancelled.");
            return Ok(());
        }
    }

    state.role_store.delete_all_roles().await?;

    if json {
        println!("{}", serde_json::json!({"deleted": "all"}));
    } else {
        println!("  {} All roles deleted.", style("✓").red().bold());
    }

    Ok(())
}

fn join_or_dash(items: &[String]) -> String {
    if items.is_empty() {
        "-".to_string()
    } else {
        items.join(", ")
    }
}

/// Render an expiration relative to `now`: "never", "expired", or "in 3h 5m".
fn format_expires(now: DateTime<Utc>, expires: Option<DateTime<Utc>>) -> String {
    let Some(at) = expires else {
        return "never".to_string();
    };

    let remaining = at - now;
    if remaining <= chrono::Duration::zero() {
        return "expired".to_string();
    }

    let days = remaining.num_days();
    let hours = remaining.num_hours() % 24;
    let minutes = remaining.num_minutes() % 60;
    if days > 0 {
        format!("in {days}d {hours}h")
    } else if hours > 0 {
        format!("in {hours}h {minutes}m")
    } else if minutes > 0 {
        format!("in {minutes}m")
    } else {
        format!("in {}s", remaining.num_seconds())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    #[test]
    fn test_format_expires() {
        let now = at("2026-03-01T09:00:00Z");
        assert_eq!(format_expires(now, None), "never");
        assert_eq!(format_expires(now, Some(at("2026-03-01T08:00:00Z"))), "expired");
        assert_eq!(format_expires(now, Some(at("2026-03-01T09:00:30Z"))), "in 30s");
        assert_eq!(format_expires(now, Some(at("2026-03-01T09:45:00Z"))), "in 45m");
        assert_eq!(format_expires(now, Some(at("2026-03-01T12:05:00Z"))), "in 3h 5m");
        assert_eq!(format_expires(now, Some(at("2026-03-03T11:00:00Z"))), "in 2d 2h");
    }

    #[test]
    fn test_join_or_dash() {
        assert_eq!(join_or_dash(&[]), "-");
        assert_eq!(
            join_or_dash(&["root".to_string(), "ubuntu".to_string()]),
            "root, ubuntu"
        );
    }

    #[tokio::test]
    async fn test_read_role_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("admin.json");
        tokio::fs::write(
            &path,
            r#"{"kind":"role","version":"v1","metadata":{"name":"admin"},"spec":{"logins":["root"]}}"#,
        )
        .await
        .unwrap();

        let role = read_role_file(&path).await.unwrap();
        assert_eq!(role.name(), "admin");
        assert_eq!(role.spec.logins, vec!["root".to_string()]);
    }

    #[tokio::test]
    async fn test_read_role_file_rejects_invalid_role() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        tokio::fs::write(&path, r#"{"kind":"role","version":"v2","metadata":{"name":"x"}}"#)
            .await
            .unwrap();

        let err = read_role_file(&path).await.unwrap_err();
        assert!(format!("{err:#}").contains("unsupported role version"));
    }

    #[tokio::test]
    async fn test_read_role_file_missing() {
        let err = read_role_file(Path::new("/nonexistent/role.json"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
