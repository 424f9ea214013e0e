//! Parameter store
//!
//! Every tunable the engine reads once per frame. The host owns the only
//! mutable copy; the engine only ever receives `&Settings`.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::sim::{Channel, ParameterTuple, PresetRegistry, DEFAULT_PRESET};

/// Where the feed/kill modulation comes from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interface {
    /// Modulated by the input image, brush and noise
    #[default]
    Image,
    /// Feed varies vertically and kill horizontally across the grid
    ParameterMap,
}

/// Pattern written into every field on reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InitState {
    /// Sparse seed dots
    #[default]
    Starter,
    /// Uniform substrate, nothing to react until the brush touches it
    Blank,
}

/// What the compositor puts on screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Composite,
    Channel(Channel),
}

/// Preset names bound to each channel when per-channel mode is on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelPresets {
    pub cyan: String,
    pub magenta: String,
    pub yellow: String,
    pub key: String,
}

impl ChannelPresets {
    pub fn get(&self, channel: Channel) -> &str {
        match channel {
            Channel::Cyan => &self.cyan,
            Channel::Magenta => &self.magenta,
            Channel::Yellow => &self.yellow,
            Channel::Key => &self.key,
        }
    }

    pub fn set(&mut self, channel: Channel, name: impl Into<String>) {
        let slot = match channel {
            Channel::Cyan => &mut self.cyan,
            Channel::Magenta => &mut self.magenta,
            Channel::Yellow => &mut self.yellow,
            Channel::Key => &mut self.key,
        };
        *slot = name.into();
    }
}

impl Default for ChannelPresets {
    fn default() -> Self {
        Self {
            cyan: DEFAULT_PRESET.into(),
            magenta: DEFAULT_PRESET.into(),
            yellow: DEFAULT_PRESET.into(),
            key: DEFAULT_PRESET.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    pub reactive: bool,
    pub strength_influence: f32,
    pub speed_influence: f32,
    pub sensitivity: f32,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            reactive: false,
            strength_influence: 0.02,
            speed_influence: 0.02,
            sensitivity: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub interface: Interface,
    pub init_state: InitState,
    pub view: View,
    /// Kernel iterations per frame at 60 fps
    pub speed: u32,
    /// Grid coarsening factor, 1 = one cell per output pixel
    pub chunkiness: u32,
    pub zoom: f32,
    pub invert: bool,
    /// Global multiplier on both diffusion terms
    pub diffuse_scale: f32,
    pub edge_influence: f32,
    pub brightness_influence: f32,
    pub brush_size: f32,
    pub brush_strength: f32,
    pub pattern_sharpness: f32,
    pub pattern_threshold: f32,
    pub noise_scale: f32,
    pub noise_strength: f32,
    pub noise_speed: f32,
    /// Globally selected preset
    pub preset: String,
    /// Global tuple used when per-channel mode is off
    pub params: ParameterTuple,
    pub per_channel: bool,
    pub channel_presets: ChannelPresets,
    pub audio: AudioSettings,
    /// Extra presets registered on top of the built-in set
    pub custom_presets: BTreeMap<String, ParameterTuple>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            interface: Interface::Image,
            init_state: InitState::Starter,
            view: View::Composite,
            speed: 60,
            chunkiness: 1,
            zoom: 1.1,
            invert: false,
            diffuse_scale: 5.0,
            edge_influence: -0.09,
            brightness_influence: 0.0,
            brush_size: 0.01,
            brush_strength: 1.0,
            pattern_sharpness: 40.0,
            pattern_threshold: 0.23,
            noise_scale: 1.0,
            noise_strength: 0.0,
            noise_speed: 0.0,
            preset: DEFAULT_PRESET.into(),
            params: ParameterTuple::default(),
            per_channel: true,
            channel_presets: ChannelPresets::default(),
            audio: AudioSettings::default(),
            custom_presets: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Save settings to a JSON file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| e.to_string())
    }

    /// Load settings from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, String> {
        let json = fs::read_to_string(path).map_err(|e| e.to_string())?;
        serde_json::from_str(&json).map_err(|e| e.to_string())
    }

    /// Merge a partial JSON object into these settings.
    ///
    /// Nested objects merge recursively; keys the struct does not know are
    /// dropped, except new preset names under `custom_presets`. On a type
    /// mismatch nothing is changed.
    pub fn apply_patch(&mut self, patch: &serde_json::Value) -> Result<(), String> {
        let mut current = serde_json::to_value(&*self).map_err(|e| e.to_string())?;
        merge(&mut current, patch, false);
        *self = serde_json::from_value(current).map_err(|e| e.to_string())?;
        Ok(())
    }

    /// Copy a preset's tuple into the global parameters and select it
    pub fn apply_preset(&mut self, registry: &PresetRegistry, name: &str) -> bool {
        match registry.get(name) {
            Some(tuple) => {
                self.params = *tuple;
                self.preset = name.to_string();
                true
            },
            None => false,
        }
    }

    /// Built-in presets plus the ones declared in this file
    pub fn registry(&self) -> PresetRegistry {
        let mut registry = PresetRegistry::builtin();
        for (name, tuple) in &self.custom_presets {
            registry.insert(name.clone(), *tuple);
        }
        registry
    }
}

/// Keys of `custom_presets` are names, not fields; a patch may add them
const OPEN_MAPS: [&str; 1] = ["custom_presets"];

fn merge(target: &mut serde_json::Value, patch: &serde_json::Value, open: bool) {
    match (target, patch) {
        (serde_json::Value::Object(target), serde_json::Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(key) {
                    Some(slot) => merge(slot, value, OPEN_MAPS.contains(&key.as_str())),
                    None if open => {
                        target.insert(key.clone(), value.clone());
                    },
                    None => {},
                }
            }
        },
        (target, patch) => *target = patch.clone(),
    }
}
