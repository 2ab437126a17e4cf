//! Bounded Document Converter: HTML → PDF through an external renderer process.
//!
//! # Isolation
//! The renderer (wkhtmltopdf by default) runs as a child process in its own process
//! group. A renderer that hangs is sent SIGTERM when the timeout fires, given
//! `kill_grace` to exit, then the whole group is SIGKILLed. The group is also swept
//! after a normal exit, so no helper the renderer forked outlives the conversion.
//! The caller never waits longer than `timeout + kill_grace` (plus reaping).
//!
//! # Output contract
//! Success means the renderer exited 0 AND the destination holds more than
//! `min_output_bytes`. On any failure the destination may contain a partial file;
//! callers must treat every `Err` as "no usable file".

use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tracing::{debug, info};

/// Placeholder substituted with the temporary HTML input path.
pub const INPUT_PLACEHOLDER: &str = "{input}";
/// Placeholder substituted with the PDF destination path.
pub const OUTPUT_PLACEHOLDER: &str = "{output}";

/// How long to wait for the renderer's stderr after it exits.
const STDERR_DRAIN: Duration = Duration::from_millis(500);

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("PDF process killed after {}s timeout", .after.as_secs_f32())]
    Timeout { after: Duration },

    #[error("failed to start renderer '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("renderer failed ({status}): {stderr}")]
    RendererFailed { status: String, stderr: String },

    #[error("renderer produced an invalid document ({bytes} bytes)")]
    InvalidOutput { bytes: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Converts rendered HTML into a document on disk.
/// Carried by the delivery pipeline as `Arc<dyn DocumentConverter>`.
#[async_trait]
pub trait DocumentConverter: Send + Sync {
    async fn convert(&self, html: &str, destination: &Path) -> Result<PathBuf, ConversionError>;
}

/// Command line and limits for the external renderer.
#[derive(Debug, Clone)]
pub struct ConverterConfig {
    pub program: String,
    /// Arguments; `{input}` and `{output}` are substituted per conversion.
    pub args: Vec<String>,
    pub timeout: Duration,
    pub kill_grace: Duration,
    pub min_output_bytes: u64,
}

impl ConverterConfig {
    /// wkhtmltopdf tuned for speed over fidelity: low DPI, no images, no JavaScript,
    /// load errors ignored.
    pub fn wkhtmltopdf(
        program: &str,
        timeout: Duration,
        kill_grace: Duration,
        min_output_bytes: u64,
    ) -> Self {
        let args = [
            "--page-size", "A4",
            "--margin-top", "10mm",
            "--margin-right", "10mm",
            "--margin-bottom", "10mm",
            "--margin-left", "10mm",
            "--quiet",
            "--disable-smart-shrinking",
            "--zoom", "0.75",
            "--dpi", "72",
            "--image-quality", "20",
            "--disable-javascript",
            "--disable-plugins",
            "--no-images",
            "--grayscale",
            "--lowquality",
            "--load-error-handling", "ignore",
            "--load-media-error-handling", "ignore",
            "--disable-external-links",
            "--disable-internal-links",
            "--print-media-type",
            "--encoding", "UTF-8",
            INPUT_PLACEHOLDER,
            OUTPUT_PLACEHOLDER,
        ];

        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            timeout,
            kill_grace,
            min_output_bytes,
        }
    }
}

/// Runs the renderer as a supervised, killable child process.
pub struct ProcessConverter {
    config: ConverterConfig,
}

impl ProcessConverter {
    pub fn new(config: ConverterConfig) -> Self {
        Self { config }
    }

    fn build_command(&self, input: &Path, output: &Path) -> Command {
        let input = input.to_string_lossy();
        let output = output.to_string_lossy();

        let mut command = std::process::Command::new(&self.config.program);
        command
            .args(self.config.args.iter().map(|arg| {
                arg.replace(INPUT_PLACEHOLDER, &input)
                    .replace(OUTPUT_PLACEHOLDER, &output)
            }))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped());

        // Own process group, so termination reaches any helpers the renderer forks.
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let mut command = Command::from(command);
        command.kill_on_drop(true);
        command
    }

    /// SIGTERM, wait `kill_grace`, then SIGKILL the whole group. Always reaps the
    /// child. The group is swept even when the leader exits inside the grace window,
    /// since helpers it forked may ignore SIGTERM.
    async fn terminate(&self, child: &mut Child) {
        let Some(pid) = child.id() else {
            // Already reaped.
            return;
        };

        signal_group(pid, Signal::Terminate);
        match tokio::time::timeout(self.config.kill_grace, child.wait()).await {
            Ok(_) => {
                debug!(pid, "Renderer exited after SIGTERM");
                signal_group(pid, Signal::Kill);
            }
            Err(_) => {
                debug!(pid, "Renderer ignored SIGTERM; sending SIGKILL");
                signal_group(pid, Signal::Kill);
                if let Err(e) = child.kill().await {
                    debug!(pid, error = %e, "Failed to kill renderer");
                }
            }
        }
    }

    async fn validate_output(&self, destination: &Path) -> Result<PathBuf, ConversionError> {
        let bytes = match tokio::fs::metadata(destination).await {
            Ok(meta) if meta.is_file() => meta.len(),
            _ => 0,
        };
        if bytes <= self.config.min_output_bytes {
            return Err(ConversionError::InvalidOutput { bytes });
        }
        Ok(destination.to_path_buf())
    }
}

#[async_trait]
impl DocumentConverter for ProcessConverter {
    async fn convert(&self, html: &str, destination: &Path) -> Result<PathBuf, ConversionError> {
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Removed when dropped, whatever the outcome.
        let input = tempfile::Builder::new()
            .prefix("report-")
            .suffix(".html")
            .tempfile()?;
        tokio::fs::write(input.path(), html).await?;

        let started = Instant::now();
        let mut child = self
            .build_command(input.path(), destination)
            .spawn()
            .map_err(|source| ConversionError::Spawn {
                program: self.config.program.clone(),
                source,
            })?;

        let stderr = child.stderr.take();
        let mut stderr_reader = tokio::spawn(async move {
            let mut buf = Vec::new();
            if let Some(mut stderr) = stderr {
                let _ = stderr.read_to_end(&mut buf).await;
            }
            String::from_utf8_lossy(&buf).trim().to_string()
        });

        let pid = child.id();
        let status: ExitStatus = match tokio::time::timeout(self.config.timeout, child.wait()).await
        {
            Ok(status) => status?,
            Err(_) => {
                self.terminate(&mut child).await;
                stderr_reader.abort();
                debug!(
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "PDF renderer timed out"
                );
                return Err(ConversionError::Timeout {
                    after: self.config.timeout,
                });
            }
        };

        // The leader is gone; anything it left behind in its group goes too.
        if let Some(pid) = pid {
            signal_group(pid, Signal::Kill);
        }

        if !status.success() {
            let stderr = match tokio::time::timeout(STDERR_DRAIN, &mut stderr_reader).await {
                Ok(Ok(stderr)) => stderr,
                Ok(Err(_)) => String::new(),
                Err(_) => {
                    stderr_reader.abort();
                    String::new()
                }
            };
            return Err(ConversionError::RendererFailed {
                status: status.to_string(),
                stderr,
            });
        }
        stderr_reader.abort();

        let path = self.validate_output(destination).await?;
        info!(
            path = %path.display(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "PDF generated"
        );
        Ok(path)
    }
}

#[derive(Debug, Clone, Copy)]
enum Signal {
    Terminate,
    Kill,
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: Signal) {
    use nix::sys::signal::{killpg, Signal as NixSignal};
    use nix::unistd::Pid;

    let signal = match signal {
        Signal::Terminate => NixSignal::SIGTERM,
        Signal::Kill => NixSignal::SIGKILL,
    };
    if let Err(e) = killpg(Pid::from_raw(pid as i32), signal) {
        debug!(pid, error = %e, "killpg failed (group already gone?)");
    }
}

#[cfg(not(unix))]
fn signal_group(_pid: u32, _signal: Signal) {
    // No process groups; `Child::kill` in `terminate` is the only lever.
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    fn shell_converter(script: &str, timeout: Duration, grace: Duration) -> ProcessConverter {
        ProcessConverter::new(ConverterConfig {
            program: "sh".to_string(),
            // $1 = input html, $2 = output pdf
            args: vec![
                "-c".to_string(),
                script.to_string(),
                "sh".to_string(),
                INPUT_PLACEHOLDER.to_string(),
                OUTPUT_PLACEHOLDER.to_string(),
            ],
            timeout,
            kill_grace: grace,
            min_output_bytes: 1000,
        })
    }

    fn read_pid(path: &Path) -> i32 {
        std::fs::read_to_string(path).unwrap().trim().parse().unwrap()
    }

    fn is_alive(pid: i32) -> bool {
        kill(Pid::from_raw(pid), None).is_ok()
    }

    /// Like `is_alive`, but a zombie awaiting its (foreign) parent counts as dead.
    fn is_running(pid: i32) -> bool {
        if !Path::new("/proc/self/stat").exists() {
            return is_alive(pid);
        }
        match std::fs::read_to_string(format!("/proc/{pid}/stat")) {
            Ok(stat) => stat
                .rsplit(')')
                .next()
                .and_then(|rest| rest.split_whitespace().next())
                .is_some_and(|state| state != "Z" && state != "X"),
            Err(_) => false,
        }
    }

    /// SIGKILL is asynchronous for processes we do not reap; give it a moment.
    async fn wait_until_gone(pid: i32) -> bool {
        for _ in 0..20 {
            if !is_running(pid) {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        !is_running(pid)
    }

    #[tokio::test]
    async fn test_successful_conversion_returns_path() {
        let dir = tempfile::tempdir().unwrap();
        let dest = dir.path().join("nested").join("report.pdf");
        let converter = shell_converter(
            r#"test -s "$1" && head -c 4096 /dev/zero > "$2""#,
            Duration::from_secs(5),
            Duration::from_secs(1),
        );

        let path = converter.convert("<html>ok</html>", &dest).await.unwrap();
        assert_eq!(path, dest);
        assert_eq!(std::fs::metadata(&dest).unwrap().len(), 4096);
    }

    #[tokio::test]
    async fn test_hung_renderer_is_killed_within_budget() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("renderer.pid");
        let timeout = Duration::from_millis(500);
        let grace = Duration::from_millis(500);
        let converter = shell_converter(
            &format!("echo $$ > '{}'; exec sleep 30", pid_file.display()),
            timeout,
            grace,
        );

        let started = Instant::now();
        let result = converter
            .convert("<html/>", &dir.path().join("out.pdf"))
            .await;
        let elapsed = started.elapsed();

        assert!(matches!(result, Err(ConversionError::Timeout { .. })));
        assert!(
            elapsed < timeout + grace + Duration::from_secs(1),
            "took {elapsed:?}"
        );
        assert!(!is_alive(read_pid(&pid_file)), "renderer still running");
    }

    #[tokio::test]
    async fn test_renderer_ignoring_sigterm_is_force_killed() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("renderer.pid");
        let timeout = Duration::from_millis(300);
        let grace = Duration::from_millis(300);
        let converter = shell_converter(
            &format!(
                "trap '' TERM; echo $$ > '{}'; while true; do sleep 0.1; done",
                pid_file.display()
            ),
            timeout,
            grace,
        );

        let started = Instant::now();
        let result = converter
            .convert("<html/>", &dir.path().join("out.pdf"))
            .await;
        let elapsed = started.elapsed();

        assert!(matches!(result, Err(ConversionError::Timeout { .. })));
        assert!(elapsed >= timeout + grace, "SIGKILL sent too early: {elapsed:?}");
        assert!(elapsed < timeout + grace + Duration::from_secs(1));
        assert!(!is_alive(read_pid(&pid_file)), "renderer survived SIGKILL");
    }

    #[tokio::test]
    async fn test_forked_helper_ignoring_sigterm_is_killed_with_group() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("helper.pid");
        // The leader dies on SIGTERM straight away; its helper does not.
        let converter = shell_converter(
            &format!(
                r#"sh -c "trap '' TERM; echo \$\$ > '{}'; while true; do sleep 0.1; done" & sleep 30"#,
                pid_file.display()
            ),
            Duration::from_millis(500),
            Duration::from_millis(500),
        );

        let result = converter
            .convert("<html/>", &dir.path().join("out.pdf"))
            .await;

        assert!(matches!(result, Err(ConversionError::Timeout { .. })));
        let helper = read_pid(&pid_file);
        assert!(wait_until_gone(helper).await, "helper {helper} survived");
    }

    #[tokio::test]
    async fn test_failed_renderer_leaves_no_background_helpers() {
        let dir = tempfile::tempdir().unwrap();
        let pid_file = dir.path().join("helper.pid");
        // The background sleep inherits stderr and would hold the pipe open.
        let converter = shell_converter(
            &format!(
                "sleep 30 & echo $! > '{}'; echo 'boom' >&2; exit 3",
                pid_file.display()
            ),
            Duration::from_secs(5),
            Duration::from_secs(1),
        );

        let started = Instant::now();
        let result = converter
            .convert("<html/>", &dir.path().join("out.pdf"))
            .await;

        assert!(matches!(result, Err(ConversionError::RendererFailed { .. })));
        assert!(started.elapsed() < Duration::from_secs(3));
        let helper = read_pid(&pid_file);
        assert!(wait_until_gone(helper).await, "helper {helper} survived");
    }

    #[tokio::test]
    async fn test_renderer_failure_carries_diagnostics() {
        let dir = tempfile::tempdir().unwrap();
        let converter = shell_converter(
            "echo 'boom: bad html' >&2; exit 3",
            Duration::from_secs(5),
            Duration::from_secs(1),
        );

        match converter.convert("<html/>", &dir.path().join("out.pdf")).await {
            Err(ConversionError::RendererFailed { stderr, .. }) => {
                assert!(stderr.contains("boom: bad html"), "stderr was {stderr:?}")
            }
            other => panic!("expected RendererFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_trivial_output_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let converter = shell_converter(
            r#"printf tiny > "$2""#,
            Duration::from_secs(5),
            Duration::from_secs(1),
        );

        let result = converter.convert("<html/>", &dir.path().join("out.pdf")).await;
        assert!(matches!(
            result,
            Err(ConversionError::InvalidOutput { bytes: 4 })
        ));
    }

    #[tokio::test]
    async fn test_missing_output_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let converter = shell_converter("exit 0", Duration::from_secs(5), Duration::from_secs(1));

        let result = converter.convert("<html/>", &dir.path().join("out.pdf")).await;
        assert!(matches!(
            result,
            Err(ConversionError::InvalidOutput { bytes: 0 })
        ));
    }

    #[tokio::test]
    async fn test_missing_binary_is_a_spawn_error() {
        let dir = tempfile::tempdir().unwrap();
        let converter = ProcessConverter::new(ConverterConfig::wkhtmltopdf(
            "/nonexistent/wkhtmltopdf",
            Duration::from_secs(1),
            Duration::from_secs(1),
            1000,
        ));

        let result = converter.convert("<html/>", &dir.path().join("out.pdf")).await;
        assert!(matches!(result, Err(ConversionError::Spawn { .. })));
    }

    #[test]
    fn test_wkhtmltopdf_args_end_with_input_and_output() {
        let config = ConverterConfig::wkhtmltopdf(
            "wkhtmltopdf",
            Duration::from_secs(20),
            Duration::from_secs(2),
            1000,
        );
        let n = config.args.len();
        assert_eq!(config.args[n - 2], INPUT_PLACEHOLDER);
        assert_eq!(config.args[n - 1], OUTPUT_PLACEHOLDER);
        assert!(config.args.iter().any(|a| a == "--disable-javascript"));
    }
}
