use anyhow::{Context, Result};
use serde::Serialize;
use std::process::Stdio;
use tokio::process::Command;

use crate::error::ToolError;
use crate::tools;

/// Captured output of one external process invocation.
#[derive(Debug, Clone, Serialize)]
pub struct CommandResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Execute a command and capture stdout/stderr as text.
///
/// With `check` set, a non-zero exit becomes a [`ToolError::CommandFailed`]
/// carrying both streams. One child per call; nothing is streamed
/// incrementally.
pub async fn run_command(argv: &[String], check: bool) -> Result<CommandResult> {
    let output = spawn_captured(argv).await?;

    let result = CommandResult {
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        exit_code: output.status.code().unwrap_or(-1),
    };

    if check && result.exit_code != 0 {
        return Err(ToolError::CommandFailed {
            command: argv.join(" "),
            code: result.exit_code,
            stdout: result.stdout,
            stderr: result.stderr,
        }
        .into());
    }

    Ok(result)
}

/// Execute a command and return raw stdout bytes.
///
/// Use this for binary output like screenshots, where a lossy text decode
/// would corrupt the payload.
pub async fn run_command_bytes(argv: &[String]) -> Result<Vec<u8>> {
    let output = spawn_captured(argv).await?;

    if !output.status.success() {
        return Err(ToolError::CommandFailed {
            command: argv.join(" "),
            code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        }
        .into());
    }

    Ok(output.stdout)
}

async fn spawn_captured(argv: &[String]) -> Result<std::process::Output> {
    let (program, rest) = argv
        .split_first()
        .ok_or_else(|| ToolError::InvalidInput("empty command".to_string()))?;

    let program_path = tools::find_tool(program)?;
    log::debug!("exec: {}", argv.join(" "));

    Command::new(&program_path)
        .args(rest)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .with_context(|| format!("failed to execute {}", argv.join(" ")))
}

/// Build the adb argument prefix, addressing `serial` when given.
pub fn adb_args(serial: Option<&str>) -> Vec<String> {
    let mut args = vec!["adb".to_string()];
    if let Some(s) = serial {
        args.push("-s".to_string());
        args.push(s.to_string());
    }
    args
}

/// Run an adb subcommand against the target device, failing on non-zero exit.
pub async fn run_adb(serial: Option<&str>, sub: &[&str]) -> Result<CommandResult> {
    let mut argv = adb_args(serial);
    argv.extend(sub.iter().map(|s| s.to_string()));
    run_command(&argv, true).await
}

/// Run an adb subcommand that produces binary output on stdout.
pub async fn run_adb_bytes(serial: Option<&str>, sub: &[&str]) -> Result<Vec<u8>> {
    let mut argv = adb_args(serial);
    argv.extend(sub.iter().map(|s| s.to_string()));
    run_command_bytes(&argv).await
}

/// A connected device as reported by `adb devices`.
#[derive(Debug, Clone, Serialize)]
pub struct Device {
    pub serial: String,
    pub state: String,
}

/// List connected devices.
pub async fn get_devices() -> Result<Vec<Device>> {
    let result = run_adb(None, &["devices"]).await?;
    Ok(parse_devices(&result.stdout))
}

fn parse_devices(output: &str) -> Vec<Device> {
    let mut devices = Vec::new();

    // First line is the "List of devices attached" banner.
    for line in output.lines().skip(1) {
        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.len() >= 2 {
            devices.push(Device {
                serial: parts[0].to_string(),
                state: parts[1].to_string(),
            });
        }
    }

    devices
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_devices_skips_banner_and_blank_lines() {
        let output = "List of devices attached\nemulator-5554\tdevice\n0123456789ABCDEF\tunauthorized\n\n";
        let devices = parse_devices(output);
        assert_eq!(devices.len(), 2);
        assert_eq!(devices[0].serial, "emulator-5554");
        assert_eq!(devices[0].state, "device");
        assert_eq!(devices[1].state, "unauthorized");
    }

    #[test]
    fn test_adb_args_with_serial() {
        assert_eq!(adb_args(None), vec!["adb"]);
        assert_eq!(
            adb_args(Some("emulator-5554")),
            vec!["adb", "-s", "emulator-5554"]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_captures_streams_and_exit_code() {
        let argv = vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo out; echo err 1>&2; exit 3".to_string(),
        ];
        let result = run_command(&argv, false).await.unwrap();
        assert_eq!(result.stdout, "out\n");
        assert_eq!(result.stderr, "err\n");
        assert_eq!(result.exit_code, 3);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_command_checked_fails_on_non_zero_exit() {
        let argv = vec!["sh".to_string(), "-c".to_string(), "exit 7".to_string()];
        let err = run_command(&argv, true).await.unwrap_err();
        match err.downcast_ref::<ToolError>() {
            Some(ToolError::CommandFailed { code, .. }) => assert_eq!(*code, 7),
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }
}
