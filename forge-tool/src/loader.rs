//! Loads tool descriptors from a directory tree of TOML files.
//!
//! A bad descriptor is logged and skipped, never aborts startup — the
//! registry must come up with whatever parses, not refuse to start
//! because one file has a typo.

use forge_types::ToolDescriptor;
use std::path::Path;

/// Walk `root` recursively, parsing every `.toml` file as a
/// [`ToolDescriptor`]. Files that fail to parse, or parse but fail
/// [`validate`], are logged via `tracing::warn!` and skipped.
pub async fn load_descriptors(root: &Path) -> Vec<ToolDescriptor> {
    let mut descriptors = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let mut entries = match tokio::fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "could not read tool descriptor directory");
                continue;
            }
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some("toml") {
                continue;
            }
            match load_one(&path).await {
                Ok(descriptor) => descriptors.push(descriptor),
                Err(reason) => {
                    tracing::warn!(file = %path.display(), reason, "discarding invalid tool descriptor");
                }
            }
        }
    }
    descriptors
}

async fn load_one(path: &Path) -> Result<ToolDescriptor, String> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| format!("read failed: {e}"))?;
    let descriptor: ToolDescriptor =
        toml::from_str(&contents).map_err(|e| format!("parse failed: {e}"))?;
    validate(&descriptor)?;
    Ok(descriptor)
}

/// Field-level validation beyond what deserialization already
/// enforces via the `InvocationSpec` tagged enum shape.
pub fn validate(descriptor: &ToolDescriptor) -> Result<(), String> {
    if descriptor.tool_id.as_str().is_empty() {
        return Err("tool_id must not be empty".to_string());
    }
    match &descriptor.invocation {
        forge_types::InvocationSpec::LanguageModel { model_role, .. } if model_role.is_empty() => {
            Err("language_model invocation requires a non-empty model_role".to_string())
        }
        forge_types::InvocationSpec::Executable { path, .. } if path.is_empty() => {
            Err("executable invocation requires a non-empty path".to_string())
        }
        forge_types::InvocationSpec::RemoteApi { endpoint, .. } if endpoint.is_empty() => {
            Err("remote_api invocation requires a non-empty endpoint".to_string())
        }
        _ => Ok(()),
    }
}

/// Compute a tool's id from its file path, used by callers that need
/// to report which descriptor a [`ToolId`] came from.
pub fn descriptor_source_hint(path: &Path) -> String {
    path.display().to_string()
}
