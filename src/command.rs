use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use std::time::Instant;

use tokio::process::Command;
use tokio::time::sleep;
use tokio::time::timeout;

use crate::error::Error;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_RETRY_TIMES: u32 = 5;
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct CmdOutput {
    pub status: i32,
    pub stdout: String,
    pub stderr: String,
}

impl CmdOutput {
    pub fn success(&self) -> bool {
        self.status == 0
    }
}

/// run a shell command line, killing its whole process group on timeout
pub async fn run(cmd: &str, dir: &Path, timeout_dur: Duration) -> Result<CmdOutput, Error> {
    log::info!(
        "execute command [{cmd}], timeout: {}s",
        timeout_dur.as_secs()
    );
    let start = Instant::now();
    let mut shell = Command::new("sh");
    shell
        .arg("-c")
        .arg(cmd)
        .current_dir(dir)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        // own group, so a timeout kill reaches every descendant
        .process_group(0);
    let child = shell.spawn()?;
    let pid = child.id();
    let output = match timeout(timeout_dur, child.wait_with_output()).await {
        Ok(output) => output?,
        Err(_) => {
            if let Some(pid) = pid {
                kill_group(pid);
            }
            log::warn!("command [{cmd}] timed out, process group killed");
            return Err(Error::CommandTimeout {
                cmd: cmd.to_owned(),
                timeout_secs: timeout_dur.as_secs(),
            });
        }
    };
    let status = output.status.code().unwrap_or(-1);
    let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
    let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
    let cost = start.elapsed().as_secs_f64();
    log::info!("command [{cmd}] finished, status: {status}, cost: {cost:.2}s");
    if !stdout.is_empty() {
        log::info!("stdout:\n{stdout}");
    }
    if !stderr.is_empty() {
        log::warn!("stderr:\n{stderr}");
    }
    Ok(CmdOutput {
        status,
        stdout,
        stderr,
    })
}

/// like `run`, non-zero exit is an error
pub async fn run_checked(cmd: &str, dir: &Path, timeout_dur: Duration) -> Result<CmdOutput, Error> {
    let output = run(cmd, dir, timeout_dur).await?;
    if !output.success() {
        return Err(Error::CommandFailed {
            cmd: cmd.to_owned(),
            status: output.status,
            stderr: output.stderr,
        });
    }
    Ok(output)
}

/// retry non-zero exits and timeouts with a fixed sleep in between
pub async fn run_with_retry(
    cmd: &str,
    dir: &Path,
    timeout_dur: Duration,
    retry_times: u32,
    retry_interval: Duration,
) -> Result<CmdOutput, Error> {
    let attempts = retry_times.max(1);
    for attempt in 1..attempts {
        match run(cmd, dir, timeout_dur).await {
            Ok(output) if output.success() => return Ok(output),
            Ok(output) => {
                log::warn!(
                    "command [{cmd}] failed with status {status}, attempt {attempt}/{attempts}",
                    status = output.status
                );
            }
            Err(Error::CommandTimeout { .. }) => {
                log::warn!("command [{cmd}] timed out, attempt {attempt}/{attempts}");
            }
            // spawn failures are not worth retrying
            Err(e) => return Err(e),
        }
        sleep(retry_interval).await;
    }
    let output = run(cmd, dir, timeout_dur).await?;
    if output.success() {
        return Ok(output);
    }
    Err(Error::CommandFailed {
        cmd: cmd.to_owned(),
        status: output.status,
        stderr: output.stderr,
    })
}

fn kill_group(pid: u32) {
    // the child is its own group leader, its pid doubles as the pgid
    unsafe {
        libc::killpg(pid as i32, libc::SIGKILL);
    }
}
