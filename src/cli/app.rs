//! Main app runner: one invocation, one mode

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::CommandFactory;
use tokio::sync::broadcast;

use crate::application::devices::collect_devices;
use crate::application::ports::{ConfigStore, MediaUrl, PinPrompt, ProgressCallback};
use crate::application::record::record_clip;
use crate::application::setup::{run_setup, SetupOutcome};
use crate::application::LiveBroadcaster;
use crate::domain::config::{AppConfig, DeviceConfig};
use crate::domain::device::{DeviceDescriptor, Protocol};
use crate::domain::error::ConfigError;
use crate::infrastructure::cast::{create_all_casters, create_caster};
use crate::infrastructure::recording::write_clip_file;
use crate::infrastructure::server::{guess_content_type, local_ip_toward, StreamSource};
use crate::infrastructure::{CpalMic, Mp3LiveEncoder, StreamServer, XdgConfigStore};

use super::args::{Cli, Mode};
use super::presenter::Presenter;
use super::prompt;
use super::signals::ShutdownSignal;

/// Exit codes
pub const EXIT_SUCCESS: u8 = 0;
pub const EXIT_ERROR: u8 = 1;
pub const EXIT_USAGE_ERROR: u8 = 2;

/// File extensions the audio directory listing includes
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "wav", "flac", "aac"];

/// Upper bound for `--record`; the clip is held in memory before encoding
const MAX_RECORD_SECONDS: u64 = 60 * 60;

/// Run one invocation and produce its exit code.
pub async fn run(cli: Cli) -> ExitCode {
    let store = XdgConfigStore::new();
    let config = load_merged_config(&store, &cli).await;

    match cli.mode() {
        Some(Mode::List) => run_list(&config).await,
        Some(Mode::Setup) => run_setup_mode(&store, &config).await,
        Some(Mode::Pair) => run_pair(&store, &config).await,
        Some(Mode::Play(file)) => run_play(&store, &config, &file).await,
        Some(Mode::Live) => run_live(&store, &config).await,
        Some(Mode::Record(seconds)) => run_record(&store, &config, seconds).await,
        None => run_default(&store, &config).await,
    }
}

/// Bare invocation, the scheduled-reminder path: play from the audio
/// directory. A single file plays without asking; several prompt for a
/// choice; an empty directory falls back to usage output.
async fn run_default(store: &XdgConfigStore, config: &AppConfig) -> ExitCode {
    let presenter = Presenter::new();
    let audio_dir = config.audio_dir_or_default();
    let files = list_audio_files(audio_dir);

    let file = match files.as_slice() {
        [] => {
            let _ = Cli::command().print_help();
            return ExitCode::from(EXIT_USAGE_ERROR);
        }
        [only] => only.clone(),
        _ => {
            println!("Audio files in {}/:", audio_dir);
            for (i, name) in files.iter().enumerate() {
                println!("  {}. {}", i + 1, name);
            }
            print!("Select a file (1-{}, q to quit): ", files.len());
            let _ = io::stdout().flush();
            match prompt::select_index(&mut io::stdin().lock(), files.len()) {
                Some(index) => files[index].clone(),
                None => {
                    presenter.info("Cancelled");
                    return ExitCode::from(EXIT_SUCCESS);
                }
            }
        }
    };

    run_play(store, config, &file).await
}

/// Merge file config with CLI overrides. CLI wins; defaults fill the rest.
async fn load_merged_config(store: &XdgConfigStore, cli: &Cli) -> AppConfig {
    let file_config = store.load().await.unwrap_or_else(|_| AppConfig::empty());
    let cli_config = AppConfig {
        device: None,
        port: cli.port,
        audio_dir: None,
        discovery_timeout_secs: cli.timeout,
    };
    AppConfig::defaults().merge(file_config).merge(cli_config)
}

async fn run_list(config: &AppConfig) -> ExitCode {
    let mut presenter = Presenter::new();
    presenter.start_spinner("Scanning for speakers...");

    let casters = create_all_casters();
    let devices = match collect_devices(&casters, config.discovery_timeout_or_default()).await {
        Ok(devices) => devices,
        Err(e) => {
            presenter.spinner_fail("Scan failed");
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };
    presenter.stop_spinner();

    // An empty network is a normal answer, not a failure.
    if devices.is_empty() {
        presenter.info("No speakers found");
        return ExitCode::from(EXIT_SUCCESS);
    }

    for device in &devices {
        presenter.output(&format!(
            "{}  [{}]  {}:{}",
            device.name, device.protocol, device.address, device.port
        ));
    }
    ExitCode::from(EXIT_SUCCESS)
}

/// Discover speakers, prompt for one, and persist the selection.
async fn interactive_setup(
    store: &XdgConfigStore,
    config: &AppConfig,
    presenter: &mut Presenter,
) -> Result<SetupOutcome, String> {
    presenter.start_spinner("Scanning for speakers...");
    let spinner = presenter.spinner_handle();

    let casters = create_all_casters();
    let select = move |devices: &[DeviceDescriptor]| {
        if let Some(spinner) = &spinner {
            spinner.finish_and_clear();
        }
        println!("Found {} speaker(s):", devices.len());
        for (i, device) in devices.iter().enumerate() {
            println!(
                "  {}. {}  [{}]  {}",
                i + 1,
                device.name,
                device.protocol,
                device.address
            );
        }
        print!("Select a speaker (1-{}, q to quit): ", devices.len());
        io::stdout().flush().ok()?;
        prompt::select_index(&mut io::stdin().lock(), devices.len())
    };

    let outcome = run_setup(
        &casters,
        store,
        config.discovery_timeout_or_default(),
        select,
    )
    .await;
    presenter.stop_spinner();

    let outcome = outcome.map_err(|e| e.to_string())?;
    match &outcome {
        SetupOutcome::Saved(device) => {
            presenter.success(&format!(
                "Saved \"{}\" as the target speaker ({})",
                device.name, device.protocol
            ));
            if device.protocol == Protocol::Airplay {
                presenter.info("If the speaker asks for a PIN, run 'herald --pair'");
            }
        }
        SetupOutcome::NoDevices => presenter.warn("No speakers found"),
        SetupOutcome::Cancelled => presenter.info("Setup cancelled"),
    }
    Ok(outcome)
}

async fn run_setup_mode(store: &XdgConfigStore, config: &AppConfig) -> ExitCode {
    let mut presenter = Presenter::new();
    match interactive_setup(store, config, &mut presenter).await {
        Ok(SetupOutcome::Saved(_)) | Ok(SetupOutcome::Cancelled) => {
            ExitCode::from(EXIT_SUCCESS)
        }
        Ok(SetupOutcome::NoDevices) => ExitCode::from(EXIT_ERROR),
        Err(message) => {
            presenter.error(&message);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// The saved target device, running setup first when none is saved yet.
async fn ensure_device(
    store: &XdgConfigStore,
    config: &AppConfig,
    presenter: &mut Presenter,
) -> Result<DeviceConfig, String> {
    if let Some(device) = &config.device {
        return Ok(device.clone());
    }

    presenter.info("No speaker configured yet; running setup");
    match interactive_setup(store, config, presenter).await? {
        SetupOutcome::Saved(device) => Ok(device),
        SetupOutcome::NoDevices | SetupOutcome::Cancelled => {
            Err(ConfigError::NoDevice.to_string())
        }
    }
}

async fn run_pair(store: &XdgConfigStore, config: &AppConfig) -> ExitCode {
    let mut presenter = Presenter::new();
    let device = match ensure_device(store, config, &mut presenter).await {
        Ok(device) => device,
        Err(message) => {
            presenter.error(&message);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let descriptor = match descriptor_from(&device) {
        Ok(descriptor) => descriptor,
        Err(message) => {
            presenter.error(&message);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let read_pin: PinPrompt = Arc::new(|| {
        eprint!("Enter the PIN shown on the speaker: ");
        io::stderr().flush().ok()?;
        prompt::read_pin(&mut io::stdin().lock())
    });

    let caster = create_caster(device.protocol);
    match caster.pair(&descriptor, read_pin).await {
        Ok(credentials) => {
            // Write the credential back next to the saved device.
            let mut saved = store.load().await.unwrap_or_else(|_| AppConfig::empty());
            if let Some(saved_device) = saved.device.as_mut() {
                saved_device.credentials = Some(credentials.into_string());
            }
            if let Err(e) = store.save(&saved).await {
                presenter.error(&e.to_string());
                return ExitCode::from(EXIT_ERROR);
            }
            presenter.success(&format!("Paired with \"{}\"", device.name));
            ExitCode::from(EXIT_SUCCESS)
        }
        Err(e) => {
            presenter.error(&e.to_string());
            ExitCode::from(EXIT_ERROR)
        }
    }
}

async fn run_play(store: &XdgConfigStore, config: &AppConfig, file: &str) -> ExitCode {
    let mut presenter = Presenter::new();
    let device = match ensure_device(store, config, &mut presenter).await {
        Ok(device) => device,
        Err(message) => {
            presenter.error(&message);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    let audio_dir = config.audio_dir_or_default();
    let Some(path) = resolve_audio_file(file, audio_dir) else {
        presenter.error(&format!("Audio file not found: {}", file));
        let available = list_audio_files(audio_dir);
        if !available.is_empty() {
            presenter.info(&format!("Available in {}/: {}", audio_dir, available.join(", ")));
        }
        return ExitCode::from(EXIT_ERROR);
    };

    match stream_file(&device, path, config.port_or_default(), &mut presenter).await {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(message) => {
            presenter.error(&message);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

async fn run_live(store: &XdgConfigStore, config: &AppConfig) -> ExitCode {
    let mut presenter = Presenter::new();
    match live_session(store, config, &mut presenter).await {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(message) => {
            presenter.error(&message);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

async fn live_session(
    store: &XdgConfigStore,
    config: &AppConfig,
    presenter: &mut Presenter,
) -> Result<(), String> {
    let device = ensure_device(store, config, presenter).await?;

    let shutdown = ShutdownSignal::new();
    shutdown
        .setup()
        .map_err(|e| format!("Failed to setup signal handler: {}", e))?;

    // The server gets the receiving side only. The encoder ends up owning
    // the sole sender, so stopping it closes every chunked response.
    let (chunks, live_rx) = broadcast::channel(64);
    let server = StreamServer::start(
        config.port_or_default(),
        StreamSource::Live { chunks: live_rx },
    )
    .await
    .map_err(|e| e.to_string())?;

    let mut broadcaster = LiveBroadcaster::new(CpalMic::new(), Mp3LiveEncoder::new());
    let sample_rate = match broadcaster.start(chunks).await {
        Ok(rate) => rate,
        Err(e) => {
            server.shutdown().await;
            return Err(e.to_string());
        }
    };
    presenter.info(&format!("Microphone open at {} Hz", sample_rate));

    // Connect only once audio is flowing, so the device hears from the
    // first chunk it fetches.
    let session = connect_and_play(&device, &server, MediaUrl::live("")).await;
    let mut session = match session {
        Ok(session) => session,
        Err(message) => {
            broadcaster.stop().await;
            server.shutdown().await;
            return Err(message);
        }
    };

    presenter.success(&format!("Broadcasting live to \"{}\"", device.name));
    presenter.info("Press Ctrl-C to stop");
    shutdown.wait().await;

    presenter.info("Stopping...");
    if let Err(e) = session.stop().await {
        presenter.warn(&e.to_string());
    }
    broadcaster.stop().await;
    server.shutdown().await;
    Ok(())
}

async fn run_record(store: &XdgConfigStore, config: &AppConfig, seconds: u64) -> ExitCode {
    let mut presenter = Presenter::new();
    if seconds == 0 {
        presenter.error("Recording duration must be at least 1 second");
        return ExitCode::from(EXIT_USAGE_ERROR);
    }
    if seconds > MAX_RECORD_SECONDS {
        presenter.error(&format!(
            "Recording duration must be {} seconds or less",
            MAX_RECORD_SECONDS
        ));
        return ExitCode::from(EXIT_USAGE_ERROR);
    }

    let device = match ensure_device(store, config, &mut presenter).await {
        Ok(device) => device,
        Err(message) => {
            presenter.error(&message);
            return ExitCode::from(EXIT_ERROR);
        }
    };

    presenter.start_spinner("Recording...");
    let progress: Option<ProgressCallback> = presenter.spinner_handle().map(|spinner| {
        let callback: ProgressCallback = Arc::new(move |elapsed_ms, total_ms| {
            spinner.set_message(format!(
                "Recording... {}",
                Presenter::format_progress(elapsed_ms, total_ms)
            ));
        });
        callback
    });

    let clip = match record_clip(&CpalMic::new(), seconds, progress).await {
        Ok(clip) => clip,
        Err(e) => {
            presenter.spinner_fail("Recording failed");
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
    };
    presenter.spinner_success(&format!("Recorded {:.1}s", clip.duration_secs()));

    let path = match tokio::task::spawn_blocking(move || write_clip_file(&clip)).await {
        Ok(Ok(path)) => path,
        Ok(Err(e)) => {
            presenter.error(&e.to_string());
            return ExitCode::from(EXIT_ERROR);
        }
        Err(e) => {
            presenter.error(&format!("Encode task failed: {}", e));
            return ExitCode::from(EXIT_ERROR);
        }
    };

    match stream_file(&device, path, config.port_or_default(), &mut presenter).await {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(message) => {
            presenter.error(&message);
            ExitCode::from(EXIT_ERROR)
        }
    }
}

/// Serve one file and play it on the device until interrupted.
///
/// The thin protocol clients cannot poll remote playback position, so the
/// session stays up until Ctrl-C rather than guessing when the file ends.
async fn stream_file(
    device: &DeviceConfig,
    path: PathBuf,
    port: u16,
    presenter: &mut Presenter,
) -> Result<(), String> {
    let shutdown = ShutdownSignal::new();
    shutdown
        .setup()
        .map_err(|e| format!("Failed to setup signal handler: {}", e))?;

    let content_type = guess_content_type(&path).to_string();
    let server = StreamServer::start(
        port,
        StreamSource::File {
            path,
            content_type: content_type.clone(),
        },
    )
    .await
    .map_err(|e| e.to_string())?;

    let media = MediaUrl::file("", content_type);
    let mut session = match connect_and_play(device, &server, media).await {
        Ok(session) => session,
        Err(message) => {
            server.shutdown().await;
            return Err(message);
        }
    };

    presenter.success(&format!("Playing on \"{}\"", device.name));
    presenter.info("Press Ctrl-C when done");
    shutdown.wait().await;

    if let Err(e) = session.stop().await {
        presenter.warn(&e.to_string());
    }
    server.shutdown().await;
    Ok(())
}

/// Connect to the saved device and start it fetching from our server.
///
/// The URL inside `media` is filled in here, once the advertised address
/// is known.
async fn connect_and_play(
    device: &DeviceConfig,
    server: &StreamServer,
    mut media: MediaUrl,
) -> Result<Box<dyn crate::application::ports::CastSession>, String> {
    let device_ip = device
        .address
        .parse()
        .map_err(|_| format!("Invalid device address in config: {}", device.address))?;
    let host = local_ip_toward(device_ip).map_err(|e| e.to_string())?;
    media.url = server.url_for(host);

    let caster = create_caster(device.protocol);
    let mut session = caster.connect(device).await.map_err(|e| e.to_string())?;
    session.play(&media).await.map_err(|e| e.to_string())?;
    Ok(session)
}

/// Rebuild a descriptor from the saved device record.
fn descriptor_from(device: &DeviceConfig) -> Result<DeviceDescriptor, String> {
    let address = device
        .address
        .parse()
        .map_err(|_| format!("Invalid device address in config: {}", device.address))?;
    Ok(DeviceDescriptor {
        id: device.id.clone(),
        name: device.name.clone(),
        address,
        port: device.port,
        protocol: device.protocol,
    })
}

/// Find the named file directly or inside the audio directory.
fn resolve_audio_file(name: &str, audio_dir: &str) -> Option<PathBuf> {
    let direct = PathBuf::from(name);
    if direct.is_file() {
        return Some(direct);
    }
    let in_dir = Path::new(audio_dir).join(name);
    if in_dir.is_file() {
        return Some(in_dir);
    }
    None
}

/// Audio files in the audio directory, sorted by name.
fn list_audio_files(audio_dir: &str) -> Vec<String> {
    let Ok(entries) = std::fs::read_dir(audio_dir) else {
        return Vec::new();
    };

    let mut files: Vec<String> = entries
        .flatten()
        .filter_map(|entry| {
            let path = entry.path();
            let extension = path.extension()?.to_str()?.to_ascii_lowercase();
            if AUDIO_EXTENSIONS.contains(&extension.as_str()) {
                Some(entry.file_name().to_string_lossy().into_owned())
            } else {
                None
            }
        })
        .collect();
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_prefers_direct_path() {
        let dir = tempfile::tempdir().unwrap();
        let direct = dir.path().join("chime.mp3");
        std::fs::write(&direct, b"x").unwrap();

        let resolved = resolve_audio_file(direct.to_str().unwrap(), "nonexistent");
        assert_eq!(resolved, Some(direct));
    }

    #[test]
    fn resolve_falls_back_to_audio_dir() {
        let dir = tempfile::tempdir().unwrap();
        let inside = dir.path().join("bell.wav");
        std::fs::write(&inside, b"x").unwrap();

        let resolved = resolve_audio_file("bell.wav", dir.path().to_str().unwrap());
        assert_eq!(resolved, Some(inside));
    }

    #[test]
    fn resolve_missing_file_is_none() {
        assert_eq!(resolve_audio_file("ghost.mp3", "/nonexistent"), None);
    }

    #[test]
    fn listing_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.mp3", "a.flac", "notes.txt", "c.m4a"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let files = list_audio_files(dir.path().to_str().unwrap());
        assert_eq!(files, vec!["a.flac", "b.mp3", "c.m4a"]);
    }

    #[test]
    fn listing_missing_dir_is_empty() {
        assert!(list_audio_files("/nonexistent/audio").is_empty());
    }

    #[test]
    fn descriptor_round_trips_saved_device() {
        let device = DeviceConfig {
            id: "abc".into(),
            name: "Den".into(),
            address: "192.168.1.5".into(),
            port: 7000,
            protocol: Protocol::Airplay,
            credentials: None,
        };
        let descriptor = descriptor_from(&device).unwrap();
        assert_eq!(descriptor.address.to_string(), "192.168.1.5");
        assert_eq!(descriptor.port, 7000);
    }

    #[test]
    fn descriptor_rejects_bad_address() {
        let device = DeviceConfig {
            id: "abc".into(),
            name: "Den".into(),
            address: "not-an-ip".into(),
            port: 7000,
            protocol: Protocol::Airplay,
            credentials: None,
        };
        assert!(descriptor_from(&device).is_err());
    }
}
