use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use wearctl::artifacts::ArtifactStore;
use wearctl::device::{actions, adb, boot};
use wearctl::error::ToolError;
use wearctl::hierarchy;
use wearctl::response::Envelope;
use wearctl::{emulator, server};

#[derive(Parser)]
#[command(name = "wearctl")]
#[command(version = "0.1.0")]
#[command(about = "Wear OS emulator and device automation with JSON output", long_about = None)]
struct Cli {
    /// Target emulator/device serial (adb device id)
    #[arg(long)]
    serial: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a Wear OS emulator headlessly
    StartEmulator {
        /// Name of the AVD to boot
        #[arg(long)]
        avd: String,

        /// TCP port for the emulator (implies serial emulator-<port>)
        #[arg(long)]
        port: Option<u16>,

        /// GPU backend, e.g. swiftshader_indirect
        #[arg(long)]
        gpu: Option<String>,

        /// Block until sys.boot_completed = 1
        #[arg(long)]
        wait: bool,

        /// Extra environment variables KEY=VALUE to pass to the emulator
        #[arg(long)]
        env: Vec<String>,

        /// Extra arguments passed to the emulator binary
        #[arg(long, num_args = 1.., allow_hyphen_values = true)]
        extra: Vec<String>,
    },

    /// Terminate an emulator via adb emu kill
    StopEmulator {
        /// Serial of the emulator to kill (e.g. emulator-5554)
        #[arg(long)]
        serial: String,
    },

    /// Install an APK onto the target device
    InstallApk {
        /// Path to the APK
        #[arg(long)]
        apk: PathBuf,
    },

    /// Start an activity by component
    LaunchActivity {
        /// Component name pkg/.Activity
        #[arg(long)]
        component: String,
    },

    /// Capture a PNG screenshot
    Screenshot {
        /// Optional path to save the PNG
        #[arg(long)]
        output: Option<PathBuf>,

        /// Embed base64 data in the JSON response
        #[arg(long)]
        base64: bool,
    },

    /// Dump the uiautomator view hierarchy
    DumpUi {
        /// Return the parsed node list
        #[arg(long)]
        parse: bool,
    },

    /// Send a tap event
    Tap { x: i32, y: i32 },

    /// Send a swipe gesture
    Swipe {
        x1: i32,
        y1: i32,
        x2: i32,
        y2: i32,

        /// Gesture duration in milliseconds
        #[arg(long, default_value_t = 300)]
        duration_ms: u32,
    },

    /// Send text input
    InputText { text: String },

    /// Send a keyevent by numeric code or name
    Keyevent { code: String },

    /// Fetch logcat output
    Logcat {
        /// Optional file to save logs
        #[arg(long)]
        output: Option<PathBuf>,

        /// Clear logs after fetching
        #[arg(long)]
        clear: bool,
    },

    /// Run a raw adb subcommand
    Adb {
        /// Args passed through to adb
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Block until the device reports boot completed
    WaitForBoot {
        /// Timeout in seconds
        #[arg(long, default_value_t = 180)]
        timeout: u64,
    },

    /// List connected devices
    Devices,

    /// Expose the artifacts directory via HTTP
    ServeArtifacts {
        /// Directory to serve (defaults to the artifact store)
        #[arg(long)]
        directory: Option<PathBuf>,

        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value_t = 8000)]
        port: u16,
    },
}

enum Outcome {
    Payload(serde_json::Value),
    /// serve-artifacts prints its own envelope before blocking.
    Served,
}

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();
    let store = ArtifactStore::from_env();
    let raw_passthrough = matches!(cli.command, Commands::Adb { .. });

    match run(cli, &store).await {
        Ok(Outcome::Payload(data)) => {
            Envelope::success(data).print();
            ExitCode::SUCCESS
        }
        Ok(Outcome::Served) => ExitCode::SUCCESS,
        Err(err) => {
            let message = match err.downcast_ref::<ToolError>() {
                Some(_) => format!("{err:#}"),
                None => format!("Unexpected error: {err:#}"),
            };
            Envelope::failure(message).print();

            // Recognized failures exit 1; a failed raw passthrough propagates
            // the child's own exit code.
            if raw_passthrough {
                if let Some(ToolError::CommandFailed { code, .. }) =
                    err.downcast_ref::<ToolError>()
                {
                    return ExitCode::from(u8::try_from(*code).unwrap_or(1));
                }
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, store: &ArtifactStore) -> anyhow::Result<Outcome> {
    let Cli { serial, command } = cli;
    let target = serial.as_deref();

    let data = match command {
        Commands::StartEmulator {
            avd,
            port,
            gpu,
            wait,
            env,
            extra,
        } => {
            let env = emulator::parse_env_entries(&env)?;
            let report = emulator::start(
                store,
                emulator::StartOptions {
                    avd,
                    port,
                    gpu,
                    extra,
                    wait,
                    serial: serial.clone(),
                    env,
                },
            )
            .await?;
            serde_json::to_value(report)?
        }

        Commands::StopEmulator { serial } => {
            let report = emulator::stop(&serial).await?;
            serde_json::to_value(report)?
        }

        Commands::InstallApk { apk } => {
            let report = actions::install_apk(target, &apk.to_string_lossy()).await?;
            serde_json::to_value(report)?
        }

        Commands::LaunchActivity { component } => {
            let report = actions::launch_activity(target, &component).await?;
            serde_json::to_value(report)?
        }

        Commands::Screenshot { output, base64 } => {
            let report = actions::screenshot(store, target, output.as_deref(), base64).await?;
            serde_json::to_value(report)?
        }

        Commands::DumpUi { parse } => {
            let report = hierarchy::dump_ui(target, parse).await?;
            serde_json::to_value(report)?
        }

        Commands::Tap { x, y } => {
            let report = actions::tap(target, x, y).await?;
            serde_json::to_value(report)?
        }

        Commands::Swipe {
            x1,
            y1,
            x2,
            y2,
            duration_ms,
        } => {
            let report = actions::swipe(target, x1, y1, x2, y2, duration_ms).await?;
            serde_json::to_value(report)?
        }

        Commands::InputText { text } => {
            let report = actions::input_text(target, &text).await?;
            serde_json::to_value(report)?
        }

        Commands::Keyevent { code } => {
            let report = actions::keyevent(target, &code).await?;
            serde_json::to_value(report)?
        }

        Commands::Logcat { output, clear } => {
            let report = actions::collect_logcat(target, output.as_deref(), clear).await?;
            serde_json::to_value(report)?
        }

        Commands::Adb { args } => {
            let report = actions::raw_adb(target, &args).await?;
            serde_json::to_value(report)?
        }

        Commands::WaitForBoot { timeout } => {
            boot::wait_for_boot(target, std::time::Duration::from_secs(timeout)).await?;
            serde_json::to_value(boot::BootReport {
                serial: serial.clone(),
                boot_complete: true,
            })?
        }

        Commands::Devices => {
            let devices = adb::get_devices().await?;
            serde_json::json!({ "devices": devices })
        }

        Commands::ServeArtifacts {
            directory,
            host,
            port,
        } => {
            store.ensure()?;
            let dir = directory.unwrap_or_else(|| store.root().to_path_buf());
            let report = server::describe(&dir, &host, port);
            Envelope::success(serde_json::to_value(report)?).print();
            server::serve(dir, &host, port).await?;
            return Ok(Outcome::Served);
        }
    };

    Ok(Outcome::Payload(data))
}
