#![forbid(unsafe_code)]

use std::collections::BTreeSet;
use std::ffi::OsString;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::{Arc, Mutex, PoisonError};

use crossterm::style::Color;
use tokio::sync::Semaphore;

use crate::output::style::Style;

/// Hard cap on simultaneously running external processes per dispatch.
pub const MAX_PARALLEL: usize = 10;

const FALLBACK_COLUMNS: u16 = 80;

/// One command applied to every target repository.
#[derive(Debug, Clone)]
pub enum BatchCommand {
    /// Git argument vector, invoked as `git -c color.ui=always <args...>`.
    Git(Vec<OsString>),
    /// Pre-joined shell command line, handed to the platform shell.
    Shell(String),
}

impl BatchCommand {
    fn to_process(&self, dir: &Path, columns: u16) -> Command {
        let mut cmd = match self {
            Self::Git(args) => {
                let mut cmd = Command::new("git");
                cmd.arg("-c").arg("color.ui=always").args(args);
                cmd
            }
            Self::Shell(line) => {
                #[cfg(windows)]
                let cmd = {
                    let mut c = Command::new("cmd");
                    c.arg("/C").arg(line);
                    c
                };
                #[cfg(not(windows))]
                let cmd = {
                    let mut c = Command::new("sh");
                    c.arg("-c").arg(line);
                    c
                };
                cmd
            }
        };
        // Let the invoked tool size its output to our terminal.
        cmd.current_dir(dir).env("COLUMNS", columns.to_string());
        cmd
    }
}

#[derive(Debug)]
struct Execution {
    code: Option<i32>,
    stdout: String,
    stderr: String,
}

/// Runs one command concurrently across a snapshot of target repositories,
/// printing a complete header/body/footer block per repository.
///
/// At most [`MAX_PARALLEL`] external processes run at once. Each worker
/// blocks on its process with no timeout; a process that never terminates
/// holds its slot for the rest of the batch. Blocks are emitted whole under
/// a writer lock owned by this call, so concurrent completions never
/// interleave their lines. Per-repository failures are reported in place and
/// never abort the remaining targets.
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    style: Style,
}

impl Dispatcher {
    #[must_use]
    pub fn new(style: Style) -> Self {
        Self { style }
    }

    pub async fn run(
        &self,
        targets: Vec<(PathBuf, BTreeSet<usize>)>,
        command: BatchCommand,
    ) -> anyhow::Result<()> {
        let writer = Arc::new(Mutex::new(std::io::stdout()));
        self.run_with_writer(targets, command, writer).await
    }

    pub async fn run_with_writer<W: Write + Send + 'static>(
        &self,
        targets: Vec<(PathBuf, BTreeSet<usize>)>,
        command: BatchCommand,
        writer: Arc<Mutex<W>>,
    ) -> anyhow::Result<()> {
        let columns = crossterm::terminal::size()
            .map(|(cols, _rows)| cols)
            .unwrap_or(FALLBACK_COLUMNS);

        let cap = MAX_PARALLEL.min(targets.len()).max(1);
        let sem = Arc::new(Semaphore::new(cap));
        let style = self.style;

        let mut handles = Vec::with_capacity(targets.len());
        for (path, highlights) in targets {
            let permit = sem.clone().acquire_owned().await.map_err(|_| {
                anyhow::anyhow!("failed to acquire dispatcher semaphore")
            })?;
            let command = command.clone();
            let writer = writer.clone();
            handles.push(tokio::task::spawn_blocking(move || {
                let _permit = permit;
                let block = run_one(&style, &path, &highlights, &command, columns);
                // Recover a poisoned lock so one panicked worker cannot
                // swallow the remaining blocks.
                let mut out = writer.lock().unwrap_or_else(PoisonError::into_inner);
                let _ = out.write_all(block.as_bytes());
                let _ = out.flush();
            }));
        }

        for h in handles {
            if let Err(e) = h.await {
                let mut out = writer.lock().unwrap_or_else(PoisonError::into_inner);
                let _ = writeln!(out, "{}", style.err(&format!("worker failed: {e}")));
            }
        }

        Ok(())
    }
}

fn run_one(
    style: &Style,
    path: &Path,
    highlights: &BTreeSet<usize>,
    command: &BatchCommand,
    columns: u16,
) -> String {
    let result = command
        .to_process(path, columns)
        .output()
        .map(|out| Execution {
            code: out.status.code(),
            stdout: String::from_utf8_lossy(&out.stdout).trim().to_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).trim().to_owned(),
        });

    match result {
        Ok(exec) => format_block(style, path, highlights, &exec),
        Err(e) => {
            let msg = if e.kind() == std::io::ErrorKind::NotFound {
                format!("path or command not found: {}", path.display())
            } else {
                format!("failed to launch command: {e}")
            };
            format_error_block(style, path, highlights, &msg)
        }
    }
}

fn block_header(style: &Style, path: &Path, highlights: &BTreeSet<usize>) -> String {
    let name = crate::core::registry::display_name(path);
    let name = style.highlight(&name, highlights, Some(Color::Cyan));
    format!(
        "{}{name}{} {}\n",
        style.header("┌── ["),
        style.header("]"),
        style.accent(&format!("in {}", path.display()))
    )
}

fn block_footer(style: &Style) -> String {
    format!("{}\n", style.accent("└──────────────────────────────"))
}

fn format_block(
    style: &Style,
    path: &Path,
    highlights: &BTreeSet<usize>,
    exec: &Execution,
) -> String {
    let mut block = block_header(style, path, highlights);

    if exec.code == Some(0) {
        // Many tools (git push/fetch among them) report progress on stderr,
        // so both streams are shown on success.
        if !exec.stdout.is_empty() {
            block.push_str(&exec.stdout);
            block.push('\n');
        }
        if !exec.stderr.is_empty() {
            block.push_str(&exec.stderr);
            block.push('\n');
        }
        if exec.stdout.is_empty() && exec.stderr.is_empty() {
            block.push_str(&style.ok("✓ done (no output)"));
            block.push('\n');
        }
    } else {
        let code = exec
            .code
            .map_or_else(|| "killed by signal".to_owned(), |c| format!("exit code {c}"));
        block.push_str(&style.err(&format!("✗ failed ({code})")));
        block.push('\n');
        if !exec.stdout.is_empty() {
            block.push_str(&exec.stdout);
            block.push('\n');
        }
        if !exec.stderr.is_empty() {
            block.push_str(&style.err(&exec.stderr));
            block.push('\n');
        }
    }

    block.push_str(&block_footer(style));
    block
}

fn format_error_block(
    style: &Style,
    path: &Path,
    highlights: &BTreeSet<usize>,
    msg: &str,
) -> String {
    let mut block = block_header(style, path, highlights);
    block.push_str(&style.err(&format!("error: {msg}")));
    block.push('\n');
    block.push_str(&block_footer(style));
    block
}
