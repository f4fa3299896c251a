//! Visitor implementations shipped with the CLI.
//!
//! The LLM transport itself lives outside this repository; the supported
//! seam is [`CommandVisitor`], which shells out to any program speaking a
//! one-request-per-invocation JSON protocol:
//!
//! - stdin: `{"names": ["a", "b"], "context": "<code>"}`
//! - stdout: `{"a": "userCount", "b": "retryLimit"}`
//!
//! Missing keys, identity values, and empty values all mean "leave that
//! binding alone", matching the engine's visitor contract. A non-zero exit
//! or unparseable output fails the batch, which the engine no-ops.

use std::collections::HashMap;
use std::process::Stdio;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use humanify_core::{NameVisitor, VisitorError};

#[derive(Serialize)]
struct VisitorRequest<'a> {
    names: &'a [String],
    context: &'a str,
}

/// A visitor that delegates each batch to an external command.
pub struct CommandVisitor {
    program: String,
    args: Vec<String>,
}

impl CommandVisitor {
    /// Build from a shell-style command line: first word is the program,
    /// the rest are arguments.
    pub fn from_command_line(command: &str) -> Option<Self> {
        let mut parts = command.split_whitespace();
        let program = parts.next()?.to_string();
        Some(CommandVisitor {
            program,
            args: parts.map(|s| s.to_string()).collect(),
        })
    }
}

#[async_trait]
impl NameVisitor for CommandVisitor {
    async fn visit(
        &self,
        names: &[String],
        context: &str,
    ) -> Result<HashMap<String, String>, VisitorError> {
        let payload = serde_json::to_vec(&VisitorRequest { names, context })
            .map_err(|e| VisitorError::failed(format!("cannot encode request: {e}")))?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .map_err(|e| VisitorError::failed(format!("cannot spawn {}: {e}", self.program)))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&payload)
                .await
                .map_err(|e| VisitorError::failed(format!("cannot write request: {e}")))?;
            // Close stdin so the child sees EOF.
            drop(stdin);
        }

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| VisitorError::failed(format!("visitor command failed: {e}")))?;
        if !output.status.success() {
            return Err(VisitorError::failed(format!(
                "visitor command exited with {}",
                output.status
            )));
        }

        let mapping: HashMap<String, String> = serde_json::from_slice(&output.stdout)
            .map_err(|e| VisitorError::unparseable(format!("bad visitor output: {e}")))?;
        debug!(
            requested = names.len(),
            returned = mapping.len(),
            "visitor command answered"
        );
        Ok(mapping)
    }
}
