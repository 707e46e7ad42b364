use antogram_core::{Canvas, SimulationMode};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

// --- Error Type ---
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileReadError(#[from] std::io::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Failed to parse TOML: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// --- Enums for Choices ---

/// How agents find work.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TargetingKind {
    /// Agents claim source/destination jobs from the shared queue.
    #[default]
    JobQueue,
    /// Agents chase the nearest free bit and pick a destination from a pool.
    TargetPool,
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SerializerType {
    #[default]
    Json,
    Binary,
}

/// Where serialized frames go.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(tag = "type", content = "options", rename_all = "lowercase")]
pub enum SenderConfig {
    #[default]
    Null,
    Stdio,
    File(FileSenderOptions),
    WebSocket(WebSocketOptions),
}

// --- Configuration Sections ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CanvasSettings {
    pub width: f32,
    pub height: f32,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            width: 800.0,
            height: 600.0,
        }
    }
}

impl From<&CanvasSettings> for Canvas {
    fn from(settings: &CanvasSettings) -> Self {
        Canvas::new(settings.width, settings.height)
    }
}

/// Agent physics and behaviour tunables. Distances are in canvas units,
/// speeds in units per tick.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct AgentSettings {
    pub count: usize,
    pub max_speed: f32,
    /// Speed floor applied to moving agents so they don't spin in place.
    pub min_speed: f32,
    /// Steering limit at rest; grows linearly to `steer_max` at full speed.
    pub steer_min: f32,
    pub steer_max: f32,
    pub arrival_radius: f32,
    pub pickup_radius: f32,
    pub body_length: f32,
    /// Fraction of the body length between center and jaws.
    pub jaw_ratio: f32,
    pub wander_turn_degrees: f32,
    pub wander_min_bodies: f32,
    pub wander_max_bodies: f32,
    pub separation_radius_bodies: f32,
    pub separation_strength: f32,
    /// Largest random heading deviation, reached at `noise_distance` from the target.
    pub heading_noise_degrees: f32,
    pub noise_distance: f32,
    pub seek_jitter: f32,
    pub carry_jitter: f32,
    pub delivery_jitter: f32,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            count: 200,
            max_speed: 3.0,
            min_speed: 0.5,
            steer_min: 0.1,
            steer_max: 0.3,
            arrival_radius: 5.0,
            pickup_radius: 8.0,
            body_length: 96.0 * 0.25,
            jaw_ratio: 0.6,
            wander_turn_degrees: 60.0,
            wander_min_bodies: 5.0,
            wander_max_bodies: 10.0,
            separation_radius_bodies: 2.0,
            separation_strength: 0.5,
            heading_noise_degrees: 180.0 / 16.0,
            noise_distance: 200.0,
            seek_jitter: 0.5,
            carry_jitter: 0.15,
            delivery_jitter: 2.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
#[serde(default)]
pub struct TargetingSettings {
    pub strategy: TargetingKind,
    /// Overrides the strategy's default for inter-agent separation.
    pub separation: Option<bool>,
}

impl TargetingSettings {
    /// Separation is on by default only for the target-pool strategy.
    pub fn separation_enabled(&self) -> bool {
        self.separation
            .unwrap_or(self.strategy == TargetingKind::TargetPool)
    }
}

/// Target field sampling and layout tunables.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct FieldSettings {
    pub text_step: u32,
    pub image_step: u32,
    pub alpha_threshold: u8,
    /// Text pixels count as glyph only when red is below this.
    pub darkness_threshold: u8,
    pub initial_font_size: f32,
    pub min_font_size: f32,
    pub font_size_step: f32,
    pub line_spacing: f32,
    /// Share of the canvas the rendered text may occupy.
    pub fill_ratio: f32,
    pub soil_color: [u8; 3],
    pub soil_jitter: [f32; 3],
    /// Start-position jitter for bits in reverse mode.
    pub reverse_jitter: f32,
    pub scatter_margin: f32,
    pub scatter_separation: f32,
    pub scatter_attempts: u32,
}

impl Default for FieldSettings {
    fn default() -> Self {
        Self {
            text_step: 4,
            image_step: 8,
            alpha_threshold: 128,
            darkness_threshold: 200,
            initial_font_size: 120.0,
            min_font_size: 20.0,
            font_size_step: 2.0,
            line_spacing: 1.2,
            fill_ratio: 0.9,
            soil_color: [85, 38, 38],
            soil_jitter: [40.0, 30.0, 30.0],
            reverse_jitter: 2.0,
            scatter_margin: 50.0,
            scatter_separation: 30.0,
            scatter_attempts: 10,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FileSenderOptions {
    pub output_path: String,
}

// --- WebSocket Configuration ---
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct WebSocketOptions {
    #[serde(default = "default_ws_host")]
    pub host: String,
    #[serde(default = "default_ws_port")]
    pub port: u16,
}

fn default_ws_host() -> String { "127.0.0.1".to_string() }
fn default_ws_port() -> u16 { 8080 }

impl Default for WebSocketOptions {
    fn default() -> Self {
        Self {
            host: default_ws_host(),
            port: default_ws_port(),
        }
    }
}

/// Periodic PNG snapshots of the rendered canvas.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PngSettings {
    pub directory: String,
    #[serde(default = "default_png_frequency")]
    pub frequency: u32,
}

fn default_png_frequency() -> u32 { 30 }

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct TransportConfig {
    pub serializer: SerializerType,
    pub sender: SenderConfig,
    /// Send every Nth frame.
    pub frame_frequency: u32,
    pub png: Option<PngSettings>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            serializer: SerializerType::Json,
            sender: SenderConfig::Null,
            frame_frequency: 1,
            png: None,
        }
    }
}

// --- Top-Level Config Struct ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Config {
    #[serde(default = "default_framerate")]
    pub framerate: u32,
    /// Constrained devices tick at no more than 20 Hz.
    #[serde(default)]
    pub low_power: bool,
    /// Fixed RNG seed for reproducible runs.
    #[serde(default)]
    pub seed: Option<u64>,
    #[serde(default)]
    pub canvas: CanvasSettings,
    #[serde(default)]
    pub mode: SimulationMode,
    /// Ticks to keep running after every bit has been delivered.
    #[serde(default = "default_linger_ticks")]
    pub linger_ticks: u64,
    #[serde(default)]
    pub agents: AgentSettings,
    #[serde(default)]
    pub targeting: TargetingSettings,
    #[serde(default)]
    pub field: FieldSettings,
    #[serde(default)]
    pub transport: TransportConfig,
}

fn default_framerate() -> u32 { 30 }
fn default_linger_ticks() -> u64 { 90 }

const LOW_POWER_FRAMERATE: u32 = 20;

impl Default for Config {
    fn default() -> Self {
        Self {
            framerate: default_framerate(),
            low_power: false,
            seed: None,
            canvas: CanvasSettings::default(),
            mode: SimulationMode::default(),
            linger_ticks: default_linger_ticks(),
            agents: AgentSettings::default(),
            targeting: TargetingSettings::default(),
            field: FieldSettings::default(),
            transport: TransportConfig::default(),
        }
    }
}

impl Config {
    /// Tick rate after applying the low-power cap.
    pub fn effective_framerate(&self) -> u32 {
        if self.low_power {
            self.framerate.min(LOW_POWER_FRAMERATE)
        } else {
            self.framerate
        }
    }

    pub fn canvas(&self) -> Canvas {
        Canvas::from(&self.canvas)
    }
}

// --- Loading ---

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads a config file; `.toml` files are parsed as TOML, anything else as JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        let is_toml = path
            .extension()
            .map_or(false, |ext| ext.eq_ignore_ascii_case("toml"));
        let config = if is_toml {
            toml::from_str(&content)?
        } else {
            serde_json::from_str(&content)?
        };
        Ok(config)
    }

    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        fn invalid(message: &str) -> Result<(), ConfigError> {
            Err(ConfigError::ValidationError(message.to_string()))
        }

        if config.framerate == 0 {
            return invalid("Framerate cannot be zero.");
        }
        if config.canvas.width <= 0.0 || config.canvas.height <= 0.0 {
            return invalid("Canvas dimensions must be positive.");
        }

        let agents = &config.agents;
        if agents.count == 0 {
            return invalid("Agent count must be greater than 0.");
        }
        if agents.max_speed <= 0.0 {
            return invalid("Agent max_speed must be positive.");
        }
        if agents.min_speed < 0.0 || agents.min_speed > agents.max_speed {
            return invalid("Agent min_speed must lie in [0, max_speed].");
        }
        if agents.steer_min < 0.0 || agents.steer_min > agents.steer_max {
            return invalid("Agent steer_min must lie in [0, steer_max].");
        }
        if agents.arrival_radius <= 0.0 || agents.pickup_radius <= 0.0 {
            return invalid("Arrival and pickup radii must be positive.");
        }
        if agents.body_length <= 0.0 {
            return invalid("Agent body_length must be positive.");
        }
        if agents.wander_min_bodies <= 0.0 || agents.wander_min_bodies > agents.wander_max_bodies {
            return invalid("Wander distance must satisfy 0 < wander_min_bodies <= wander_max_bodies.");
        }
        if !(agents.wander_turn_degrees >= 0.0 && agents.wander_turn_degrees.is_finite()) {
            return invalid("Agent wander_turn_degrees must be a finite, non-negative angle.");
        }
        if !(agents.heading_noise_degrees >= 0.0 && agents.heading_noise_degrees.is_finite()) {
            return invalid("Agent heading_noise_degrees must be a finite, non-negative angle.");
        }
        if !(agents.noise_distance > 0.0 && agents.noise_distance.is_finite()) {
            return invalid("Agent noise_distance must be positive.");
        }

        let field = &config.field;
        if field.text_step == 0 || field.image_step == 0 {
            return invalid("Sampling steps must be greater than 0.");
        }
        if !(field.fill_ratio > 0.0 && field.fill_ratio <= 1.0) {
            return invalid("Field fill_ratio must lie in (0, 1].");
        }
        if field.min_font_size <= 0.0 || field.min_font_size > field.initial_font_size {
            return invalid("Font sizes must satisfy 0 < min_font_size <= initial_font_size.");
        }
        if field.font_size_step <= 0.0 {
            return invalid("Font size step must be positive.");
        }
        if field.scatter_attempts == 0 {
            return invalid("Scatter attempts must be greater than 0.");
        }

        if config.transport.frame_frequency == 0 {
            return invalid("Frame frequency must be greater than 0.");
        }
        if let Some(png) = &config.transport.png {
            if png.frequency == 0 {
                return invalid("PNG frequency must be greater than 0.");
            }
        }

        Ok(())
    }
}

/// Loads and validates a config file in one go.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let config = ConfigLoader::from_file(path)?;
    ConfigLoader::validate(&config)?;
    Ok(config)
}
