use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::warn;

const FORMAT_TIMEOUT: Duration = Duration::from_secs(30);

/// Best-effort, per-extension source formatting via external tools.
///
/// Formatting never fails a task: if the tool is missing, errors out or
/// times out, the original content is returned unchanged.
#[derive(Clone, Default)]
pub struct CodeFormatter;

impl CodeFormatter {
    pub fn new() -> Self {
        Self
    }

    pub async fn format(&self, path: &str, content: &str) -> String {
        let Some((program, args)) = formatter_for(path) else {
            return content.to_string();
        };

        match run_formatter(program, &args, content).await {
            Ok(formatted) => formatted,
            Err(reason) => {
                warn!(path, formatter = program, %reason, "formatting skipped");
                content.to_string()
            }
        }
    }
}

fn formatter_for(path: &str) -> Option<(&'static str, Vec<String>)> {
    let ext = Path::new(path).extension()?.to_str()?;
    match ext {
        "rs" => Some(("rustfmt", vec!["--edition".into(), "2021".into()])),
        "py" => Some(("black", vec!["-q".into(), "-".into()])),
        "js" | "jsx" | "ts" | "tsx" | "json" | "css" | "scss" | "html" | "md" => Some((
            "prettier",
            vec!["--stdin-filepath".into(), path.to_string()],
        )),
        _ => None,
    }
}

async fn run_formatter(program: &str, args: &[String], content: &str) -> Result<String, String> {
    let mut child = Command::new(program)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| format!("failed to spawn: {e}"))?;

    if let Some(mut stdin) = child.stdin.take() {
        stdin
            .write_all(content.as_bytes())
            .await
            .map_err(|e| format!("failed to write stdin: {e}"))?;
    }

    let output = tokio::time::timeout(FORMAT_TIMEOUT, child.wait_with_output())
        .await
        .map_err(|_| "timed out".to_string())?
        .map_err(|e| format!("failed to wait: {e}"))?;

    if !output.status.success() {
        return Err(format!(
            "exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    String::from_utf8(output.stdout).map_err(|_| "non-utf8 output".to_string())
}
