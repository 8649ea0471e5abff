//! Emulator lifecycle.
//!
//! Start spawns the external `emulator` binary detached and releases
//! ownership of the child immediately; the caller is responsible for eventual
//! termination via [`stop`]. Stop goes through `adb emu kill` and does not
//! poll for confirmation.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::OpenOptions;
use std::process::{Command, Stdio};
use std::time::Duration;

use crate::artifacts::ArtifactStore;
use crate::device::{adb, boot};
use crate::error::ToolError;
use crate::tools;

/// Boot wait used by `--wait`; longer than the standalone wait-for-boot
/// default because a cold emulator start includes image setup.
const BOOT_WAIT_TIMEOUT: Duration = Duration::from_secs(180);

#[derive(Debug, Clone)]
pub struct StartOptions {
    pub avd: String,
    pub port: Option<u16>,
    pub gpu: Option<String>,
    pub extra: Vec<String>,
    pub wait: bool,
    pub serial: Option<String>,
    pub env: Vec<(String, String)>,
}

#[derive(Debug, Serialize)]
pub struct StartReport {
    pub pid: u32,
    pub command: Vec<String>,
    pub log_path: String,
    pub serial: Option<String>,
    pub waited_for_boot: bool,
}

#[derive(Debug, Serialize)]
pub struct StopReport {
    pub serial: String,
    pub status: String,
}

/// Parse `KEY=VALUE` entries collected from repeated `--env` flags.
pub fn parse_env_entries(entries: &[String]) -> Result<Vec<(String, String)>> {
    entries
        .iter()
        .map(|entry| match entry.split_once('=') {
            Some((key, value)) => Ok((key.to_string(), value.to_string())),
            None => Err(ToolError::InvalidInput(format!(
                "Invalid --env entry {entry:?}; expected KEY=VALUE"
            ))
            .into()),
        })
        .collect()
}

/// Start an emulator headlessly, detached, with output appended to a
/// timestamped log file under the artifact store.
pub async fn start(store: &ArtifactStore, opts: StartOptions) -> Result<StartReport> {
    let mut command = vec![
        "emulator".to_string(),
        "-avd".to_string(),
        opts.avd.clone(),
        "-no-window".to_string(),
        "-no-boot-anim".to_string(),
        "-no-audio".to_string(),
    ];
    if let Some(gpu) = &opts.gpu {
        command.push("-gpu".to_string());
        command.push(gpu.clone());
    }
    if let Some(port) = opts.port {
        command.push("-port".to_string());
        command.push(port.to_string());
    }
    command.extend(opts.extra.iter().cloned());

    store.ensure()?;
    let log_path = store.log_file(&opts.avd);
    let log_out = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open {}", log_path.display()))?;
    let log_err = log_out
        .try_clone()
        .context("failed to clone emulator log handle")?;

    let emulator_bin = tools::find_tool("emulator")?;

    // Caller-supplied variables overlay the inherited environment.
    // Fire-and-forget: the child is never waited on or reaped here.
    let child = Command::new(emulator_bin)
        .args(&command[1..])
        .envs(opts.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        .stdin(Stdio::null())
        .stdout(Stdio::from(log_out))
        .stderr(Stdio::from(log_err))
        .spawn()
        .context("failed to spawn emulator")?;

    let serial = opts
        .serial
        .clone()
        .or_else(|| opts.port.map(|p| format!("emulator-{p}")));

    if opts.wait {
        boot::wait_for_boot(serial.as_deref(), BOOT_WAIT_TIMEOUT).await?;
    }

    Ok(StartReport {
        pid: child.id(),
        command,
        log_path: log_path.display().to_string(),
        serial,
        waited_for_boot: opts.wait,
    })
}

/// Terminate an emulator via `adb emu kill`. Returns as soon as the command
/// itself succeeds; there is no confirmation polling.
pub async fn stop(serial: &str) -> Result<StopReport> {
    adb::run_adb(Some(serial), &["emu", "kill"]).await?;
    Ok(StopReport {
        serial: serial.to_string(),
        status: "terminated".to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_entries() {
        let parsed =
            parse_env_entries(&["FOO=bar".to_string(), "EMPTY=".to_string()]).unwrap();
        assert_eq!(
            parsed,
            vec![
                ("FOO".to_string(), "bar".to_string()),
                ("EMPTY".to_string(), String::new()),
            ]
        );
    }

    #[test]
    fn test_parse_env_entries_value_may_contain_equals() {
        let parsed = parse_env_entries(&["OPTS=a=b".to_string()]).unwrap();
        assert_eq!(parsed, vec![("OPTS".to_string(), "a=b".to_string())]);
    }

    #[test]
    fn test_parse_env_entries_rejects_missing_separator() {
        let err = parse_env_entries(&["NOVALUE".to_string()]).unwrap_err();
        match err.downcast_ref::<ToolError>() {
            Some(ToolError::InvalidInput(msg)) => {
                assert!(msg.contains("NOVALUE"));
                assert!(msg.contains("KEY=VALUE"));
            }
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }
}
