// Binary crate: some accessors exist for tests and remote tooling only
#![allow(dead_code)]

mod audio;
mod control;
mod display;
mod error;
mod gpu;
mod input;
mod mqtt;
mod noise;
mod settings;
mod sim;
mod source;
mod util;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{anyhow, Context};
use clap::Parser;
use log::{debug, error, info, warn};
use sdl2::keyboard::Keycode;

use audio::AudioReactor;
use control::{Command, Controller};
use display::{Display, InputEvent, PixelBuffer, RenderTarget, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use gpu::DeviceLimits;
use input::BrushInteractor;
use mqtt::{MqttClient, RemoteMessage};
use settings::{Settings, View};
use sim::{Channel, Engine};
use source::{DriftingCard, ImageSource, StillImage};
use util::FpsCounter;

const STATS_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Parser, Debug)]
#[command(name = "reactink", version, about = "Camera-reactive CMYK reaction-diffusion")]
struct Args {
    /// Window width
    #[arg(short = 'W', long, default_value_t = DEFAULT_WIDTH)]
    width: u32,

    /// Window height
    #[arg(short = 'H', long, default_value_t = DEFAULT_HEIGHT)]
    height: u32,

    /// Window size as WxH, overrides --width/--height
    #[arg(short, long, value_parser = parse_resolution)]
    resolution: Option<(u32, u32)>,

    /// Disable VSync for an uncapped frame rate
    #[arg(long)]
    no_vsync: bool,

    /// Settings file, created on save
    #[arg(short, long, default_value = "reactink.json")]
    settings: PathBuf,

    /// Still image to react to instead of the drifting test card
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// MQTT broker host; MQTT stays off unless given
    #[arg(long)]
    mqtt_host: Option<String>,

    /// MQTT topic for settings patches and spectra
    #[arg(long, default_value = MqttClient::default_topic())]
    mqtt_topic: String,

    /// Listen for commands on the control socket
    #[arg(long)]
    control: bool,
}

/// Parse `WxH` (e.g. `1920x1080`)
fn parse_resolution(s: &str) -> Result<(u32, u32), String> {
    let (w, h) = s
        .split_once(['x', 'X'])
        .ok_or_else(|| format!("expected WxH, got '{}'", s))?;
    let w: u32 = w.trim().parse().map_err(|_| format!("bad width '{}'", w))?;
    let h: u32 = h.trim().parse().map_err(|_| format!("bad height '{}'", h))?;
    if w == 0 || h == 0 {
        return Err("resolution must be non-zero".into());
    }
    Ok((w, h))
}

/// Keyboard shortcuts share the control socket's command set
fn key_command(key: Keycode) -> Option<Command> {
    let command = match key {
        Keycode::R => Command::Restart,
        Keycode::I => Command::Invert,
        Keycode::P => Command::TogglePerChannel,
        Keycode::Left => Command::PrevPreset,
        Keycode::Right => Command::NextPreset,
        Keycode::Num1 => Command::View(View::Channel(Channel::Cyan)),
        Keycode::Num2 => Command::View(View::Channel(Channel::Magenta)),
        Keycode::Num3 => Command::View(View::Channel(Channel::Yellow)),
        Keycode::Num4 => Command::View(View::Channel(Channel::Key)),
        Keycode::Num0 => Command::View(View::Composite),
        Keycode::S => Command::Save,
        Keycode::L => Command::Load,
        Keycode::Escape => Command::Quit,
        _ => return None,
    };
    Some(command)
}

/// Apply one command. Returns false when the app should quit.
fn apply_command(command: Command, settings: &mut Settings, engine: &mut Engine, path: &Path) -> bool {
    match command {
        Command::Restart => {
            info!("restart");
            engine.restart();
        },
        Command::Invert => settings.invert = !settings.invert,
        Command::TogglePerChannel => {
            settings.per_channel = !settings.per_channel;
            info!("per-channel presets {}", if settings.per_channel { "on" } else { "off" });
        },
        Command::Preset(name) => select_preset(settings, engine, &name),
        Command::NextPreset => cycle_preset(settings, engine, 1),
        Command::PrevPreset => cycle_preset(settings, engine, -1),
        Command::View(view) => settings.view = view,
        Command::Save => match settings.save(path) {
            Ok(()) => info!("settings saved to {}", path.display()),
            Err(e) => error!("failed to save {}: {}", path.display(), e),
        },
        Command::Load => match Settings::load(path) {
            Ok(loaded) => {
                *settings = loaded;
                engine.set_presets(settings.registry());
                info!("settings loaded from {}", path.display());
            },
            Err(e) => error!("failed to load {}: {}", path.display(), e),
        },
        Command::Quit => return false,
    }
    true
}

fn select_preset(settings: &mut Settings, engine: &Engine, name: &str) {
    if settings.apply_preset(engine.presets(), name) {
        info!("preset '{}'", name);
    } else {
        warn!("unknown preset '{}'", name);
    }
}

fn cycle_preset(settings: &mut Settings, engine: &Engine, step: i32) {
    if let Some(name) = engine.presets().cycle(&settings.preset, step).map(str::to_string) {
        select_preset(settings, engine, &name);
    }
}

fn load_settings(path: &Path) -> Settings {
    if !path.exists() {
        info!("{} not found, using defaults", path.display());
        return Settings::default();
    }
    match Settings::load(path) {
        Ok(settings) => {
            info!("settings loaded from {}", path.display());
            settings
        },
        Err(e) => {
            warn!("ignoring {}: {}", path.display(), e);
            Settings::default()
        },
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let (width, height) = args.resolution.unwrap_or((args.width, args.height));
    let vsync = !args.no_vsync;

    let mut settings = load_settings(&args.settings);

    let mut source: Box<dyn ImageSource> = match &args.image {
        Some(path) => Box::new(StillImage::load(path)?),
        None => Box::new(DriftingCard::new(320, 240, 7)),
    };

    let controller = if args.control {
        let controller = Controller::new().map_err(|e| anyhow!(e))?;
        info!("control socket at {}", Controller::socket_path());
        Some(controller)
    } else {
        None
    };

    let mqtt = match &args.mqtt_host {
        Some(host) => Some(
            MqttClient::new(host, &args.mqtt_topic)
                .map_err(|e| anyhow!(e))
                .context("MQTT is enabled but the broker is unreachable")?,
        ),
        None => None,
    };

    let (mut display, texture_creator) = Display::with_options("reactink", width, height, vsync)
        .map_err(|e| anyhow!(e))
        .context("failed to open window")?;
    let mut target = RenderTarget::with_size(&texture_creator, width, height).map_err(|e| anyhow!(e))?;
    let mut buffer = PixelBuffer::with_size(width, height);

    let mut engine = Engine::new(DeviceLimits::default()).with_presets(settings.registry());
    engine.resize(width, height);

    let mut brush = BrushInteractor::new(width, height);
    let mut reactor = AudioReactor::new();
    let mut fps_counter = FpsCounter::new(120);

    info!(
        "reactink {}x{}, vsync {}, input '{}'",
        width,
        height,
        if vsync { "on" } else { "off" },
        source.name()
    );
    info!("keys: R restart, I invert, P per-channel, Left/Right preset, 1-4 channel, 0 composite, S save, L load, Esc quit");

    let start = Instant::now();
    let mut last_stats = Instant::now();

    'main: loop {
        fps_counter.tick();

        let mut commands = Vec::new();
        for event in display.poll_events() {
            match &event {
                InputEvent::Quit => break 'main,
                InputEvent::KeyDown(key) => commands.extend(key_command(*key)),
                InputEvent::Resized { width, height } => {
                    target = RenderTarget::with_size(&texture_creator, *width, *height).map_err(|e| anyhow!(e))?;
                    buffer = PixelBuffer::with_size(*width, *height);
                    engine.resize(*width, *height);
                    debug!("window resized to {}x{}", width, height);
                },
                _ => {},
            }
            brush.handle_event(&event);
        }

        if let Some(controller) = &controller {
            commands.extend(controller.poll());
        }
        for command in commands {
            if !apply_command(command, &mut settings, &mut engine, &args.settings) {
                break 'main;
            }
        }

        if let Some(mqtt) = &mqtt {
            for message in mqtt.poll() {
                match message {
                    RemoteMessage::Spectrum(bins) => reactor.feed(bins),
                    RemoteMessage::Patch(patch) => match settings.apply_patch(&patch) {
                        Ok(()) => engine.set_presets(settings.registry()),
                        Err(e) => warn!("rejected settings patch: {}", e),
                    },
                }
            }
        }
        reactor.apply(&mut settings);

        let elapsed = start.elapsed();
        if let Some(frame) = source.frame(elapsed.as_secs_f32()) {
            // Failure is logged by the engine; the previous image stays bound
            let _ = engine.upload_input(frame.width, frame.height, frame.rgba);
        }

        let now_ms = elapsed.as_secs_f64() * 1000.0;
        // Engine failures skip the frame; the previous buffer is shown again
        if let Err(e) = engine.update(&settings, &brush.brush(), now_ms) {
            debug!("simulation step skipped: {}", e);
        }
        match engine.render(&settings) {
            Ok(Some(texture)) => {
                if let Err(e) = buffer.copy_from_rgba(texture.width(), texture.height(), texture.as_bytes()) {
                    debug!("composite not copied: {}", e);
                }
            },
            Ok(None) => {},
            Err(e) => debug!("composite skipped: {}", e),
        }
        display.present(&mut target, &buffer).map_err(|e| anyhow!(e))?;

        if last_stats.elapsed() >= STATS_INTERVAL {
            let stats = fps_counter.stats();
            let (gw, gh) = engine.field_dimensions();
            info!(
                "{:.1} fps (min {:.1}, max {:.1}, p99 {:.1} ms), grid {}x{}, iteration {}",
                stats.avg_fps,
                stats.min_fps,
                stats.max_fps,
                stats.p99_ms,
                gw,
                gh,
                engine.iteration()
            );
            last_stats = Instant::now();
        }
    }

    info!("bye");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_resolution() {
        assert_eq!(parse_resolution("1920x1080"), Ok((1920, 1080)));
        assert_eq!(parse_resolution("800X600"), Ok((800, 600)));
        assert!(parse_resolution("1920").is_err());
        assert!(parse_resolution("0x600").is_err());
    }

    #[test]
    fn test_commands_edit_settings() {
        let mut settings = Settings::default();
        let mut engine = Engine::new(DeviceLimits::default());
        let path = std::env::temp_dir().join("reactink-main-test.json");

        assert!(apply_command(Command::Invert, &mut settings, &mut engine, &path));
        assert!(settings.invert);

        assert!(apply_command(Command::Preset("Coral".into()), &mut settings, &mut engine, &path));
        assert_eq!(settings.preset, "Coral");
        assert_eq!(Some(&settings.params), engine.presets().get("Coral"));

        assert!(apply_command(Command::Preset("Nope".into()), &mut settings, &mut engine, &path));
        assert_eq!(settings.preset, "Coral");

        assert!(apply_command(Command::View(View::Channel(Channel::Key)), &mut settings, &mut engine, &path));
        assert_eq!(settings.view, View::Channel(Channel::Key));

        assert!(!apply_command(Command::Quit, &mut settings, &mut engine, &path));
    }

    #[test]
    fn test_preset_cycling_wraps() {
        let mut settings = Settings::default();
        let mut engine = Engine::new(DeviceLimits::default());
        let path = std::env::temp_dir().join("reactink-main-test.json");
        let names: Vec<String> = engine.presets().names().to_vec();

        apply_command(Command::PrevPreset, &mut settings, &mut engine, &path);
        assert_eq!(Some(&settings.preset), names.last());
        apply_command(Command::NextPreset, &mut settings, &mut engine, &path);
        assert_eq!(settings.preset, names[0]);
    }

    #[test]
    fn test_key_bindings() {
        assert_eq!(key_command(Keycode::R), Some(Command::Restart));
        assert_eq!(key_command(Keycode::Num3), Some(Command::View(View::Channel(Channel::Yellow))));
        assert_eq!(key_command(Keycode::Q), None);
    }
}
