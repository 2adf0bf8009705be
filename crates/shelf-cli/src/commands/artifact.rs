//! Artifact command handlers

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde_json::Value;

use shelf_core::{ArtifactId, Lookup, SaveRequest, Selector, Shelf};

use crate::prompt::confirm;
use crate::output::Output;

/// Arguments for `shelf save`
pub struct SaveArgs {
    pub value: Option<String>,
    pub file: Option<PathBuf>,
    pub topic: String,
    pub name: String,
    pub comment: String,
    pub replace: Option<Selector>,
    pub type_tag: Option<String>,
}

/// Save a JSON value as a new version
pub fn save(shelf: &Shelf, args: SaveArgs, output: &Output) -> Result<()> {
    let text = match (args.value, args.file) {
        (Some(value), None) => value,
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {:?}", path))?,
        (Some(_), Some(_)) => bail!("Pass either a value or --file, not both"),
        (None, None) => bail!("Nothing to save: pass a JSON value or --file"),
    };
    let value: Value = serde_json::from_str(&text).context("Payload is not valid JSON")?;

    let mut request = SaveRequest::new(args.topic, args.name).comment(args.comment);
    request.replace = args.replace;
    request = request.type_tag(args.type_tag.unwrap_or_else(|| json_kind(&value).to_string()));

    let outcome = shelf.save(&value, &request)?;
    if let Some(reason) = &outcome.replace_missed {
        output.not_found(reason);
    }
    output.print_saved(&outcome);
    Ok(())
}

/// Load one version by identity
pub fn load(shelf: &Shelf, identity: ArtifactId, selector: Selector, output: &Output) -> Result<()> {
    match shelf.manager().load(identity, selector)? {
        Lookup::Found(stored) => {
            let value: Value = shelf.decode(&stored)?;
            output.print_value(&stored.record, &value);
        }
        Lookup::Missing(reason) => output.not_found(&reason),
    }
    Ok(())
}

/// Load one version by name
pub fn find(shelf: &Shelf, name: &str, selector: Selector, output: &Output) -> Result<()> {
    match shelf.manager().load_by_name(name, selector)? {
        Lookup::Found(stored) => {
            let value: Value = shelf.decode(&stored)?;
            output.print_value(&stored.record, &value);
        }
        Lookup::Missing(reason) => output.not_found(&reason),
    }
    Ok(())
}

/// List every artifact
pub fn list(shelf: &Shelf, output: &Output) -> Result<()> {
    output.print_summaries(&shelf.list()?);
    Ok(())
}

/// Show every version of one artifact
pub fn show(shelf: &Shelf, identity: ArtifactId, output: &Output) -> Result<()> {
    match shelf.versions(identity)? {
        Lookup::Found(records) => output.print_versions(&records),
        Lookup::Missing(reason) => output.not_found(&reason),
    }
    Ok(())
}

/// Delete one version
pub fn delete(
    shelf: &Shelf,
    identity: ArtifactId,
    selector: Selector,
    output: &Output,
) -> Result<()> {
    match shelf.delete_by_id(identity, selector)? {
        Lookup::Found(record) => output.success(&format!(
            "Deleted artifact {} v{}",
            record.identity, record.version
        )),
        Lookup::Missing(reason) => output.not_found(&reason),
    }
    Ok(())
}

/// Rename or move an artifact (all versions)
pub fn update(
    shelf: &Shelf,
    identity: ArtifactId,
    name: Option<String>,
    topic: Option<String>,
    output: &Output,
) -> Result<()> {
    if name.is_none() && topic.is_none() {
        bail!("Nothing to update: pass --name and/or --topic");
    }

    match shelf.update_meta(identity, name.as_deref(), topic.as_deref())? {
        Lookup::Found(rows) => output.success(&format!(
            "Updated artifact {} ({} version(s))",
            identity, rows
        )),
        Lookup::Missing(reason) => output.not_found(&reason),
    }
    Ok(())
}

/// Remove every artifact
pub fn clear(shelf: &Shelf, yes: bool, output: &Output) -> Result<()> {
    if !yes {
        if !output.should_prompt() {
            bail!("Refusing to clear without --yes");
        }
        if !confirm("Delete every artifact and version?")? {
            output.message("Cancelled.");
            return Ok(());
        }
    }

    let removed = shelf.clear()?;
    output.success(&format!("Removed {} version(s)", removed));
    Ok(())
}

/// Type tag for a command-line payload
fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}
