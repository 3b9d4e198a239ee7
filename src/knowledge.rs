//! Startup knowledge loading.
//!
//! Two local files seed every chat session: a device-control schema
//! describing the commands the model may emit, and a system prompt steering
//! the reply format. Both are read fully into memory and injected as the
//! first user-role messages of the transcript.

use crate::config::KnowledgeConfig;
use anyhow::{Context, Result};
use std::path::Path;

/// Knowledge files loaded at session start.
#[derive(Debug)]
pub struct Knowledge {
    pub device_schema: String,
    pub system_prompt: String,
}

/// Load both knowledge files. A missing or unreadable file ends the process
/// before a session starts.
pub fn load(config: &KnowledgeConfig) -> Result<Knowledge> {
    Ok(Knowledge {
        device_schema: read_file(&config.schema_file)?,
        system_prompt: read_file(&config.prompt_file)?,
    })
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read knowledge file: {}", path.display()))
}
