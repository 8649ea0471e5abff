//! Stateless device actions.
//!
//! Each function maps one structured input onto one adb command and reshapes
//! the result into its own report type. Coordinates and durations pass
//! through unvalidated beyond their numeric types; out-of-range values are
//! the device's concern.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use serde::Serialize;
use std::path::Path;

use crate::artifacts::ArtifactStore;
use crate::device::adb;
use crate::error::ToolError;

#[derive(Debug, Serialize)]
pub struct InstallReport {
    pub serial: Option<String>,
    pub output: String,
}

/// Install an APK with `-r` so an existing package is replaced.
pub async fn install_apk(serial: Option<&str>, apk: &str) -> Result<InstallReport> {
    let result = adb::run_adb(serial, &["install", "-r", apk]).await?;
    Ok(InstallReport {
        serial: serial.map(str::to_string),
        output: result.stdout.trim().to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct LaunchReport {
    pub serial: Option<String>,
    pub output: String,
}

/// Start an activity by component name (`pkg/.Activity`).
pub async fn launch_activity(serial: Option<&str>, component: &str) -> Result<LaunchReport> {
    let result = adb::run_adb(serial, &["shell", "am", "start", "-n", component]).await?;
    Ok(LaunchReport {
        serial: serial.map(str::to_string),
        output: result.stdout.trim().to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

#[derive(Debug, Serialize)]
pub struct TapReport {
    pub serial: Option<String>,
    pub tap: Point,
}

pub async fn tap(serial: Option<&str>, x: i32, y: i32) -> Result<TapReport> {
    adb::run_adb(
        serial,
        &["shell", "input", "tap", &x.to_string(), &y.to_string()],
    )
    .await?;
    Ok(TapReport {
        serial: serial.map(str::to_string),
        tap: Point { x, y },
    })
}

#[derive(Debug, Serialize)]
pub struct SwipeDetail {
    #[serde(rename = "from")]
    pub start: Point,
    pub to: Point,
    pub duration_ms: u32,
}

#[derive(Debug, Serialize)]
pub struct SwipeReport {
    pub serial: Option<String>,
    pub swipe: SwipeDetail,
}

pub async fn swipe(
    serial: Option<&str>,
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    duration_ms: u32,
) -> Result<SwipeReport> {
    adb::run_adb(
        serial,
        &[
            "shell",
            "input",
            "swipe",
            &x1.to_string(),
            &y1.to_string(),
            &x2.to_string(),
            &y2.to_string(),
            &duration_ms.to_string(),
        ],
    )
    .await?;
    Ok(SwipeReport {
        serial: serial.map(str::to_string),
        swipe: SwipeDetail {
            start: Point { x: x1, y: y1 },
            to: Point { x: x2, y: y2 },
            duration_ms,
        },
    })
}

/// `input text` treats a raw space as an argument separator; `%s` is the
/// escape the shell command expects instead.
pub fn escape_text_input(text: &str) -> String {
    text.replace(' ', "%s")
}

#[derive(Debug, Serialize)]
pub struct TextReport {
    pub serial: Option<String>,
    pub text: String,
}

/// Type text on the device. The report carries the original unescaped text.
pub async fn input_text(serial: Option<&str>, text: &str) -> Result<TextReport> {
    let escaped = escape_text_input(text);
    adb::run_adb(serial, &["shell", "input", "text", &escaped]).await?;
    Ok(TextReport {
        serial: serial.map(str::to_string),
        text: text.to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct KeyeventReport {
    pub serial: Option<String>,
    pub keyevent: String,
}

/// Send a keyevent by numeric code or symbolic name.
pub async fn keyevent(serial: Option<&str>, code: &str) -> Result<KeyeventReport> {
    adb::run_adb(serial, &["shell", "input", "keyevent", code]).await?;
    Ok(KeyeventReport {
        serial: serial.map(str::to_string),
        keyevent: code.to_string(),
    })
}

#[derive(Debug, Serialize)]
pub struct ScreenshotReport {
    pub serial: Option<String>,
    pub bytes: usize,
    pub saved_to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base64_png: Option<String>,
}

/// Capture a PNG screenshot via `exec-out screencap -p`.
///
/// The capture always lands on disk; `as_base64` additionally embeds the
/// encoded bytes in the report.
pub async fn screenshot(
    store: &ArtifactStore,
    serial: Option<&str>,
    output: Option<&Path>,
    as_base64: bool,
) -> Result<ScreenshotReport> {
    store.ensure()?;

    let data = adb::run_adb_bytes(serial, &["exec-out", "screencap", "-p"]).await?;

    let out_path = match output {
        Some(path) => path.to_path_buf(),
        None => store.screenshot_file(serial.unwrap_or("device")),
    };
    if let Some(parent) = out_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    std::fs::write(&out_path, &data)
        .with_context(|| format!("failed to write {}", out_path.display()))?;

    Ok(ScreenshotReport {
        serial: serial.map(str::to_string),
        bytes: data.len(),
        saved_to: out_path.display().to_string(),
        base64_png: as_base64.then(|| STANDARD.encode(&data)),
    })
}

#[derive(Debug, Serialize)]
pub struct LogcatReport {
    pub serial: Option<String>,
    pub bytes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logcat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cleared: Option<bool>,
}

/// Fetch the log buffer with `logcat -d`, optionally clearing it afterwards.
pub async fn collect_logcat(
    serial: Option<&str>,
    output: Option<&Path>,
    clear: bool,
) -> Result<LogcatReport> {
    let result = adb::run_adb(serial, &["logcat", "-d"]).await?;
    let logs = result.stdout;

    let saved_to = match output {
        Some(path) => {
            std::fs::write(path, &logs)
                .with_context(|| format!("failed to write {}", path.display()))?;
            Some(path.display().to_string())
        }
        None => None,
    };

    if clear {
        adb::run_adb(serial, &["logcat", "-c"]).await?;
    }

    Ok(LogcatReport {
        serial: serial.map(str::to_string),
        bytes: logs.len(),
        logcat: saved_to.is_none().then_some(logs),
        saved_to,
        cleared: clear.then_some(true),
    })
}

#[derive(Debug, Serialize)]
pub struct RawReport {
    pub serial: Option<String>,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
}

/// Pass arbitrary arguments straight through to adb, unchecked.
///
/// A non-zero child exit fails the invocation with the child's own exit code
/// so callers can distinguish adb failures from tool failures.
pub async fn raw_adb(serial: Option<&str>, args: &[String]) -> Result<RawReport> {
    if args.is_empty() {
        return Err(ToolError::InvalidInput("adb command requires sub-arguments".to_string()).into());
    }

    let mut argv = adb::adb_args(serial);
    argv.extend(args.iter().cloned());
    let result = adb::run_command(&argv, false).await?;

    if result.exit_code != 0 {
        return Err(ToolError::CommandFailed {
            command: argv.join(" "),
            code: result.exit_code,
            stdout: result.stdout,
            stderr: result.stderr,
        }
        .into());
    }

    Ok(RawReport {
        serial: serial.map(str::to_string),
        stdout: result.stdout,
        stderr: result.stderr,
        exit_code: result.exit_code,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_text_input_replaces_spaces() {
        assert_eq!(escape_text_input("hello world"), "hello%sworld");
        assert_eq!(escape_text_input("a b c"), "a%sb%sc");
    }

    #[test]
    fn test_escape_text_input_leaves_other_text_alone() {
        assert_eq!(escape_text_input("no-spaces"), "no-spaces");
        assert_eq!(escape_text_input(""), "");
    }

    #[tokio::test]
    async fn test_raw_adb_rejects_empty_args() {
        let err = raw_adb(None, &[]).await.unwrap_err();
        match err.downcast_ref::<ToolError>() {
            Some(ToolError::InvalidInput(msg)) => {
                assert!(msg.contains("sub-arguments"));
            }
            other => panic!("expected InvalidInput, got {:?}", other),
        }
    }

    #[test]
    fn test_swipe_report_serializes_from_and_to() {
        let report = SwipeReport {
            serial: None,
            swipe: SwipeDetail {
                start: Point { x: 1, y: 2 },
                to: Point { x: 3, y: 4 },
                duration_ms: 300,
            },
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["swipe"]["from"]["x"], 1);
        assert_eq!(value["swipe"]["to"]["y"], 4);
        assert_eq!(value["swipe"]["duration_ms"], 300);
    }
}
