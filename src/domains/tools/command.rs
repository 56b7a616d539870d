//! Subprocess plugins declared by a manifest `command` entry.
//!
//! Each invocation spawns the command afresh, writes the bound arguments as
//! one JSON object to its stdin and parses its stdout as the JSON result.
//! The child runs in the manifest's directory; nothing about the host
//! process changes.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use super::callable::{Arguments, SuspendingTool};
use super::error::{ToolError, ToolResult};

/// A tool backed by an external program.
#[derive(Debug, Clone)]
pub struct CommandTool {
    program: PathBuf,
    args: Vec<String>,
    working_dir: PathBuf,
}

impl CommandTool {
    /// Resolve `command` relative to `manifest_dir`.
    ///
    /// Commands containing a path separator are treated as paths; bare names
    /// (`python3`, `node`) are looked up on `PATH` when spawned.
    pub fn new(command: &str, args: Vec<String>, manifest_dir: &Path) -> Self {
        let as_path = Path::new(command);
        let program = if as_path.is_absolute() || as_path.components().count() == 1 {
            as_path.to_path_buf()
        } else {
            manifest_dir.join(as_path)
        };

        Self {
            program,
            args,
            working_dir: manifest_dir.to_path_buf(),
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }
}

#[async_trait]
impl SuspendingTool for CommandTool {
    async fn call(&self, arguments: Arguments) -> ToolResult<Value> {
        let mut input = serde_json::to_vec(&Value::Object(arguments))
            .map_err(|e| ToolError::internal(format!("cannot encode arguments: {e}")))?;
        input.push(b'\n');

        debug!("Spawning {} in {}", self.program.display(), self.working_dir.display());

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .current_dir(&self.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ToolError::execution_failed(format!(
                    "failed to start {}: {e}",
                    self.program.display()
                ))
            })?;

        // stdin is fed while stdout and stderr drain.
        let stdin = child.stdin.take();
        let write = async move {
            match stdin {
                Some(mut stdin) => {
                    stdin.write_all(&input).await?;
                    stdin.shutdown().await
                }
                None => Ok(()),
            }
        };
        let (written, output) = tokio::join!(write, child.wait_with_output());
        let output =
            output.map_err(|e| ToolError::execution_failed(format!("failed to wait for command: {e}")))?;

        match written {
            // A child that exits without reading its input is judged by its exit status.
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {
                debug!("{} closed stdin early", self.program.display());
            }
            Err(e) => {
                return Err(ToolError::execution_failed(format!(
                    "failed to write arguments to command: {e}"
                )));
            }
            Ok(()) => {}
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("command exited with {}", output.status)
            } else {
                stderr
            };
            return Err(ToolError::execution_failed(message));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stdout = stdout.trim();
        if stdout.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(stdout)
            .map_err(|e| ToolError::execution_failed(format!("command produced invalid JSON: {e}")))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use serde_json::json;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    fn script(dir: &Path, name: &str, body: &str) {
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    }

    fn args(value: Value) -> Arguments {
        match value {
            Value::Object(map) => map,
            _ => Arguments::new(),
        }
    }

    #[test]
    fn test_command_resolution() {
        let dir = Path::new("/opt/tools");
        assert_eq!(
            CommandTool::new("./wc.sh", vec![], dir).program(),
            Path::new("/opt/tools/./wc.sh")
        );
        assert_eq!(CommandTool::new("sh", vec![], dir).program(), Path::new("sh"));
        assert_eq!(
            CommandTool::new("/usr/bin/env", vec![], dir).program(),
            Path::new("/usr/bin/env")
        );
        assert_eq!(CommandTool::new("sh", vec![], dir).working_dir(), dir);
    }

    #[tokio::test]
    async fn test_arguments_in_result_out() {
        let dir = TempDir::new().unwrap();
        script(dir.path(), "wrap.sh", r#"read line; printf '{"got": %s}' "$line""#);

        let tool = CommandTool::new("./wrap.sh", vec![], dir.path());
        let value = tool.call(args(json!({"text": "a b c"}))).await.unwrap();
        assert_eq!(value, json!({"got": {"text": "a b c"}}));
    }

    #[tokio::test]
    async fn test_large_payload_streams_through() {
        let dir = TempDir::new().unwrap();
        let text = "x".repeat(1_500_000);

        let tool = CommandTool::new("cat", vec![], dir.path());
        let value = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            tool.call(args(json!({ "text": text }))),
        )
        .await
        .expect("command should not stall on a large payload")
        .unwrap();
        assert_eq!(value, json!({ "text": text }));
    }

    #[tokio::test]
    async fn test_runs_in_manifest_directory() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("_data.json"), r#"{"seed": 7}"#).unwrap();

        let tool = CommandTool::new("sh", vec!["-c".into(), "cat _data.json".into()], dir.path());
        let value = tool.call(Arguments::new()).await.unwrap();
        assert_eq!(value, json!({"seed": 7}));
    }

    #[tokio::test]
    async fn test_nonzero_exit_carries_stderr() {
        let dir = TempDir::new().unwrap();
        script(dir.path(), "fail.sh", "echo 'quota exceeded' >&2; exit 3");

        let err = CommandTool::new("./fail.sh", vec![], dir.path())
            .call(Arguments::new())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "quota exceeded");
    }

    #[tokio::test]
    async fn test_garbage_output_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = CommandTool::new("sh", vec!["-c".into(), "echo not-json".into()], dir.path())
            .call(Arguments::new())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("command produced invalid JSON"));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let dir = TempDir::new().unwrap();
        let err = CommandTool::new("./absent", vec![], dir.path())
            .call(Arguments::new())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("failed to start"));
    }
}
