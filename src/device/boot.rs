use anyhow::Result;
use serde::Serialize;
use std::time::Duration;
use tokio::time::{sleep, Instant};

use crate::device::adb;
use crate::error::ToolError;

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Some system images report `sys.boot_completed=1` before the system UI
/// accepts input; a short settle delay absorbs that race.
const SETTLE_DELAY: Duration = Duration::from_secs(2);

#[derive(Debug, Serialize)]
pub struct BootReport {
    pub serial: Option<String>,
    pub boot_complete: bool,
}

/// Block until the device reports `sys.boot_completed=1` or `timeout` elapses.
///
/// The leading `adb wait-for-device` carries no timeout of its own, so total
/// wall time is only loosely bounded while adb enumerates the transport.
pub async fn wait_for_boot(serial: Option<&str>, timeout: Duration) -> Result<()> {
    let deadline = Instant::now() + timeout;
    adb::run_adb(serial, &["wait-for-device"]).await?;

    while Instant::now() < deadline {
        let status = adb::run_adb(serial, &["shell", "getprop", "sys.boot_completed"]).await?;
        if status.stdout.replace('\r', "").trim() == "1" {
            sleep(SETTLE_DELAY).await;
            return Ok(());
        }
        sleep(POLL_INTERVAL).await;
    }

    Err(ToolError::BootTimeout.into())
}
