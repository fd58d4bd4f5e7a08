use anyhow::{anyhow, Result};
use std::collections::VecDeque;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio_util::sync::CancellationToken;

pub struct CommandResult {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandResult {
    /// Last lines of both streams, stderr first, for error reports.
    pub fn excerpt(&self) -> String {
        let mut excerpt = self.stderr.trim_end().to_string();
        if !self.stdout.trim().is_empty() {
            if !excerpt.is_empty() {
                excerpt.push('\n');
            }
            excerpt.push_str(self.stdout.trim_end());
        }
        excerpt
    }
}

pub enum CommandOutcome {
    Finished(CommandResult),
    Cancelled,
}

fn push_bounded(buffer: &mut VecDeque<String>, line: String, max_lines: usize) {
    buffer.push_back(line);
    if buffer.len() > max_lines {
        buffer.pop_front(); // Keep only the last N lines
    }
}

fn join_lines(lines: &VecDeque<String>) -> String {
    lines
        .iter()
        .fold(String::new(), |acc, line| acc + line.as_str() + "\n")
}

/// Runs `exec` to completion, keeping the last `max_output_lines` of each stream.
/// With `stream` set every line is echoed to the operator as it arrives.
/// The child is killed if `cancel` fires first.
pub async fn run_generic_command(
    exec: &mut tokio::process::Command,
    max_output_lines: usize,
    stream: bool,
    cancel: &CancellationToken,
) -> Result<CommandOutcome> {
    exec.stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = exec.spawn()?;

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("Failed to capture stdout"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("Failed to capture stderr"))?;

    let mut stdout_reader = BufReader::new(stdout).lines();
    let mut stderr_reader = BufReader::new(stderr).lines();

    let mut last_stdout_lines = VecDeque::new();
    let mut last_stderr_lines = VecDeque::new();

    let mut stdout_done = false;
    let mut stderr_done = false;

    while !stdout_done || !stderr_done {
        tokio::select! {
            _ = cancel.cancelled() => {
                log::warn!("Cancellation requested, stopping child process");
                child.kill().await.ok();
                return Ok(CommandOutcome::Cancelled);
            },
            stdout_line = stdout_reader.next_line(), if !stdout_done => {
                match stdout_line {
                    Ok(Some(line)) => {
                        if stream {
                            println!("{}", line);
                        }
                        push_bounded(&mut last_stdout_lines, line, max_output_lines);
                    },
                    Ok(None) => stdout_done = true,
                    Err(e) => {
                        log::error!("Error reading stdout: {}", e);
                        stdout_done = true;
                    },
                }
            },
            stderr_line = stderr_reader.next_line(), if !stderr_done => {
                match stderr_line {
                    Ok(Some(line)) => {
                        if stream {
                            eprintln!("{}", line);
                        }
                        push_bounded(&mut last_stderr_lines, line, max_output_lines);
                    },
                    Ok(None) => stderr_done = true,
                    Err(e) => {
                        log::error!("Error reading stderr: {}", e);
                        stderr_done = true;
                    },
                }
            },
        }
    }

    let exit_status = tokio::select! {
        _ = cancel.cancelled() => {
            child.kill().await.ok();
            return Ok(CommandOutcome::Cancelled);
        },
        status = child.wait() => status?,
    };

    Ok(CommandOutcome::Finished(CommandResult {
        success: exit_status.success(),
        exit_code: exit_status.code(),
        stdout: join_lines(&last_stdout_lines),
        stderr: join_lines(&last_stderr_lines),
    }))
}

/// Runs `exec` with `input` written to its stdin, keeping values such as
/// secrets off the argument list.
pub async fn run_command_with_input(
    exec: &mut tokio::process::Command,
    input: &str,
    max_output_lines: usize,
) -> Result<CommandResult> {
    exec.stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = exec.spawn()?;
    let mut stdin = child
        .stdin
        .take()
        .ok_or_else(|| anyhow!("Failed to capture stdin"))?;
    match stdin.write_all(input.as_bytes()).await {
        Ok(()) => {}
        // The child exited without reading; its status tells the story.
        Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
        Err(e) => return Err(e.into()),
    }
    drop(stdin);

    let output = child.wait_with_output().await?;
    let tail = |bytes: &[u8]| {
        let mut lines = VecDeque::new();
        for line in String::from_utf8_lossy(bytes).lines() {
            push_bounded(&mut lines, line.to_string(), max_output_lines);
        }
        join_lines(&lines)
    };
    Ok(CommandResult {
        success: output.status.success(),
        exit_code: output.status.code(),
        stdout: tail(&output.stdout),
        stderr: tail(&output.stderr),
    })
}
