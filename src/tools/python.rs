//! Python code execution in a local interpreter.
//!
//! Each call starts a fresh interpreter process in the sandbox directory. This
//! is not an isolation boundary: the code runs with the user's permissions.

use super::{required_str, Tool};
use crate::config::SandboxSettings;
use crate::error::{AgentGraphError, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, instrument};

const MATPLOTLIB_PRELUDE: &str = "import matplotlib\nmatplotlib.use('Agg')\n";

const FINAL_ANSWER_HINT: &str = "\n\nIf you have completed all tasks, respond with FINAL ANSWER. \
     Focus on what was accomplished, not the code details.";

/// Image files produced during one graph invocation.
///
/// Clones share the same list, so the tool and the caller that reads the
/// result see the same files. Call [`ArtifactTracker::take`] between runs.
#[derive(Debug, Clone, Default)]
pub struct ArtifactTracker {
    files: Arc<Mutex<Vec<String>>>,
}

impl ArtifactTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record file names, skipping ones already recorded.
    pub fn record<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        if let Ok(mut files) = self.files.lock() {
            for name in names {
                let name = name.into();
                if !files.contains(&name) {
                    files.push(name);
                }
            }
        }
    }

    pub fn files(&self) -> Vec<String> {
        self.files.lock().map(|f| f.clone()).unwrap_or_default()
    }

    /// Drain the recorded files.
    pub fn take(&self) -> Vec<String> {
        self.files
            .lock()
            .map(|mut f| std::mem::take(&mut *f))
            .unwrap_or_default()
    }
}

/// Outcome of one execution.
#[derive(Debug, Clone)]
pub struct Execution {
    /// The code as actually run, prelude included.
    pub code: String,
    pub stdout: String,
    /// New image files in the working directory, sorted by name.
    pub new_images: Vec<String>,
    /// Error output when the interpreter exited with a failure status.
    pub failure: Option<String>,
}

/// Runs Python snippets with a configured interpreter.
#[derive(Debug, Clone)]
pub struct PythonSandbox {
    interpreter: String,
    workdir: PathBuf,
    timeout: Duration,
    image_extensions: Vec<String>,
    artifacts: ArtifactTracker,
    /// Held for a whole execution; sandboxes sharing a directory share it.
    lock: Arc<AsyncMutex<()>>,
}

impl PythonSandbox {
    pub fn new(settings: &SandboxSettings, workdir: PathBuf) -> Self {
        Self {
            interpreter: settings.interpreter.clone(),
            workdir,
            timeout: Duration::from_secs(settings.timeout_secs),
            image_extensions: settings
                .image_extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_lowercase())
                .collect(),
            artifacts: ArtifactTracker::new(),
            lock: Arc::new(AsyncMutex::new(())),
        }
    }

    /// Serialize executions with every other sandbox holding `lock`.
    ///
    /// Image detection diffs the working directory, so sandboxes over the
    /// same directory must not run at the same time.
    pub fn with_lock(mut self, lock: Arc<AsyncMutex<()>>) -> Self {
        self.lock = lock;
        self
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    pub fn artifacts(&self) -> &ArtifactTracker {
        &self.artifacts
    }

    /// Execute `code` in a new interpreter process.
    ///
    /// A failing exit status is reported in [`Execution::failure`]; images
    /// written before the failure are still detected and recorded.
    #[instrument(skip_all, fields(interpreter = %self.interpreter))]
    pub async fn run(&self, code: &str) -> Result<Execution> {
        let _guard = self.lock.lock().await;
        tokio::fs::create_dir_all(&self.workdir).await?;

        let code = with_backend_prelude(code);
        let before = self.image_files()?;

        debug!("Executing {} bytes of Python", code.len());

        let child = Command::new(&self.interpreter)
            .arg("-c")
            .arg(&code)
            .current_dir(&self.workdir)
            .env("MPLBACKEND", "Agg")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();

        let child = match child {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(AgentGraphError::ToolNotFound(self.interpreter.clone()));
            }
            Err(e) => {
                return Err(AgentGraphError::Sandbox(format!("failed to start interpreter: {e}")));
            }
        };

        let waited = tokio::time::timeout(self.timeout, child.wait_with_output()).await;

        let after = self.image_files()?;
        let new_images: Vec<String> = after.difference(&before).cloned().collect();
        if !new_images.is_empty() {
            info!("Generated image files: {:?}", new_images);
            self.artifacts.record(new_images.iter().cloned());
        }

        let output = waited.map_err(|_| {
            AgentGraphError::Sandbox(format!("execution timed out after {}s", self.timeout.as_secs()))
        })??;

        let failure = if output.status.success() {
            None
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!("Interpreter exited with {}", output.status);
            Some(if stderr.is_empty() {
                format!("interpreter exited with {}", output.status)
            } else {
                stderr
            })
        };

        Ok(Execution {
            code,
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            new_images,
            failure,
        })
    }

    /// Names of image files currently in the working directory.
    fn image_files(&self) -> Result<BTreeSet<String>> {
        let mut names = BTreeSet::new();
        for entry in std::fs::read_dir(&self.workdir)?.flatten() {
            let path = entry.path();
            let is_image = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| self.image_extensions.contains(&e.to_lowercase()));
            if is_image && path.is_file() {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.insert(name.to_string());
                }
            }
        }
        Ok(names)
    }
}

/// Prepend a non-GUI matplotlib backend unless the code picks one itself.
fn with_backend_prelude(code: &str) -> String {
    if code.contains("matplotlib") && !code.contains("matplotlib.use(") {
        format!("{}{}", MATPLOTLIB_PRELUDE, code)
    } else {
        code.to_string()
    }
}

/// Text returned to the model for a finished run.
pub fn format_execution(execution: &Execution) -> String {
    let mut text = match &execution.failure {
        Some(error) => format!("Failed to execute. Error: {}", error),
        None => format!(
            "Successfully executed:\n```python\n{}\n```\nStdout: {}",
            execution.code, execution.stdout
        ),
    };
    if !execution.new_images.is_empty() {
        text.push_str(&format!("\n\nGenerated image files: {:?}", execution.new_images));
    }
    if execution.failure.is_none() {
        text.push_str(FINAL_ANSWER_HINT);
    }
    text
}

/// Error text without the error kind prefix.
fn error_detail(err: &AgentGraphError) -> String {
    match err {
        AgentGraphError::Sandbox(msg) => msg.clone(),
        AgentGraphError::Io(e) => e.to_string(),
        other => other.to_string(),
    }
}

/// The `python_repl` tool.
pub struct PythonReplTool {
    sandbox: PythonSandbox,
}

impl PythonReplTool {
    pub fn new(sandbox: PythonSandbox) -> Self {
        Self { sandbox }
    }
}

#[async_trait]
impl Tool for PythonReplTool {
    fn name(&self) -> &str {
        "python_repl"
    }

    fn description(&self) -> &str {
        "Use this to execute python code. If you want to see the output of a value, \
         you should print it out with `print(...)`. This is visible to the user."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "code": {
                    "type": "string",
                    "description": "The python code to execute"
                }
            },
            "required": ["code"]
        })
    }

    async fn call(&self, args: Value) -> Result<String> {
        let code = required_str(&args, "code")?;
        match self.sandbox.run(code).await {
            Ok(execution) => Ok(format_execution(&execution)),
            Err(e) => Ok(format!("Failed to execute. Error: {}", error_detail(&e))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sandbox(dir: &Path, interpreter: &str) -> PythonSandbox {
        let settings = SandboxSettings {
            interpreter: interpreter.to_string(),
            timeout_secs: 10,
            ..SandboxSettings::default()
        };
        PythonSandbox::new(&settings, dir.to_path_buf())
    }

    #[test]
    fn test_prelude_only_when_needed() {
        let plain = "print(1)";
        assert_eq!(with_backend_prelude(plain), plain);

        let plot = "import matplotlib.pyplot as plt";
        assert!(with_backend_prelude(plot).starts_with(MATPLOTLIB_PRELUDE));

        let chosen = "import matplotlib\nmatplotlib.use('SVG')";
        assert_eq!(with_backend_prelude(chosen), chosen);
    }

    #[test]
    fn test_format_execution() {
        let text = format_execution(&Execution {
            code: "print(2)".to_string(),
            stdout: "2\n".to_string(),
            new_images: vec!["chart.png".to_string()],
            failure: None,
        });
        assert!(text.starts_with("Successfully executed:\n```python\nprint(2)\n```\nStdout: 2\n"));
        assert!(text.contains("Generated image files: [\"chart.png\"]"));
        assert!(text.contains("respond with FINAL ANSWER"));
    }

    #[test]
    fn test_artifact_tracker_dedups_and_drains() {
        let tracker = ArtifactTracker::new();
        let shared = tracker.clone();
        tracker.record(["a.png", "b.svg"]);
        shared.record(["a.png"]);

        assert_eq!(tracker.files(), vec!["a.png", "b.svg"]);
        assert_eq!(shared.take(), vec!["a.png", "b.svg"]);
        assert!(tracker.files().is_empty());
    }

    #[tokio::test]
    async fn test_missing_interpreter_is_reported_as_text() {
        let dir = tempfile::tempdir().unwrap();
        let tool = PythonReplTool::new(sandbox(dir.path(), "definitely-not-a-python-binary"));

        let out = tool.call(json!({ "code": "print(1)" })).await.unwrap();
        assert!(out.starts_with("Failed to execute. Error:"), "{}", out);
    }

    #[tokio::test]
    async fn test_new_images_detected_with_stub_interpreter() {
        // `sh -c` stands in for the interpreter; it creates an image and prints.
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("old.png"), b"x").unwrap();
        let sandbox = sandbox(dir.path(), "sh");

        let execution = sandbox.run("touch plot.png notes.txt; echo done").await.unwrap();

        assert_eq!(execution.stdout.trim(), "done");
        assert_eq!(execution.new_images, vec!["plot.png"]);
        assert_eq!(sandbox.artifacts().files(), vec!["plot.png"]);
    }

    #[tokio::test]
    async fn test_failed_run_still_records_images() {
        let dir = tempfile::tempdir().unwrap();
        let sandbox = sandbox(dir.path(), "sh");

        let execution = sandbox.run("touch saved.png; echo boom >&2; exit 1").await.unwrap();
        assert_eq!(execution.failure.as_deref(), Some("boom"));
        assert_eq!(execution.new_images, vec!["saved.png"]);
        assert_eq!(sandbox.artifacts().files(), vec!["saved.png"]);

        let text = format_execution(&execution);
        assert!(text.starts_with("Failed to execute. Error: boom"), "{}", text);
        assert!(text.contains("Generated image files: [\"saved.png\"]"));
        assert!(!text.contains("FINAL ANSWER"));
    }

    #[tokio::test]
    async fn test_timeout_text_has_no_error_kind_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let settings = SandboxSettings {
            interpreter: "sh".to_string(),
            timeout_secs: 1,
            ..SandboxSettings::default()
        };
        let tool = PythonReplTool::new(PythonSandbox::new(&settings, dir.path().to_path_buf()));

        let out = tool.call(json!({ "code": "sleep 5" })).await.unwrap();
        assert_eq!(out, "Failed to execute. Error: execution timed out after 1s");
    }

    #[tokio::test]
    async fn test_shared_directory_runs_do_not_see_each_others_images() {
        let dir = tempfile::tempdir().unwrap();
        let lock = Arc::new(AsyncMutex::new(()));
        let first = sandbox(dir.path(), "sh").with_lock(lock.clone());
        let second = sandbox(dir.path(), "sh").with_lock(lock);

        let (a, b) = tokio::join!(
            first.run("sleep 0.3; touch a_chart.png"),
            second.run("touch b_chart.png"),
        );

        assert_eq!(a.unwrap().new_images, vec!["a_chart.png"]);
        assert_eq!(b.unwrap().new_images, vec!["b_chart.png"]);
        assert_eq!(first.artifacts().files(), vec!["a_chart.png"]);
        assert_eq!(second.artifacts().files(), vec!["b_chart.png"]);
    }
}
