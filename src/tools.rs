use anyhow::Result;
use std::path::PathBuf;

fn with_exe(name: &str) -> String {
    if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    }
}

/// Locate an external tool, preferring the Android SDK layout over PATH.
///
/// `adb` lives under `platform-tools/` and `emulator` under `emulator/` in a
/// standard SDK install; `ANDROID_HOME` takes precedence over the older
/// `ANDROID_SDK_ROOT`.
pub fn find_tool(name: &str) -> Result<PathBuf> {
    let file_name = with_exe(name);

    for var in ["ANDROID_HOME", "ANDROID_SDK_ROOT"] {
        if let Ok(sdk) = std::env::var(var) {
            let sdk = PathBuf::from(sdk);
            let candidate = match name {
                "adb" => sdk.join("platform-tools").join(&file_name),
                "emulator" => sdk.join("emulator").join(&file_name),
                _ => continue,
            };
            if candidate.exists() {
                return Ok(candidate);
            }
        }
    }

    // Fallback to system PATH
    Ok(which::which(name)?)
}
