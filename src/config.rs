//! Engine configuration
//!
//! [`Settings`] is a flat, ordered key/value store usually filled from
//! `key=value` command-line arguments. [`EngineConfig`] is the typed view
//! the engine is built from.

use std::str::FromStr;

use glam::Vec4;

use crate::pipeline::PostEffect;

/// Ordered string key/value store
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    entries: Vec<(String, String)>,
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `key=value` arguments. Arguments without `=` are ignored.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut settings = Self::new();
        for arg in args {
            match arg.as_ref().split_once('=') {
                Some((key, value)) if !key.is_empty() => settings.set(key, value),
                _ => log::trace!("Ignoring argument '{}'", arg.as_ref()),
            }
        }
        settings
    }

    /// Insert or replace a value, keeping the original position
    pub fn set(&mut self, key: &str, value: impl ToString) {
        let value = value.to_string();
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Typed lookup; missing or unparsable values yield `default`
    pub fn get<T: FromStr>(&self, key: &str, default: T) -> T {
        match self.get_str(key) {
            Some(value) => value.parse().unwrap_or_else(|_| {
                log::warn!("Setting '{}' has invalid value '{}', using default", key, value);
                default
            }),
            None => default,
        }
    }

    pub fn has(&self, key: &str) -> bool {
        self.get_str(key).is_some()
    }

    /// Visit every entry in insertion order
    pub fn each<F: FnMut(&str, &str)>(&self, mut callback: F) {
        for (key, value) in &self.entries {
            callback(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Which graph preset the engine builds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RenderPreset {
    #[default]
    Forward,
    Deferred,
}

impl FromStr for RenderPreset {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "forward" => Ok(RenderPreset::Forward),
            "deferred" => Ok(RenderPreset::Deferred),
            other => Err(format!("unknown render preset '{}'", other)),
        }
    }
}

/// Configuration for initializing the engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Initial screen width
    pub width: u32,
    /// Initial screen height
    pub height: u32,
    pub preset: RenderPreset,
    /// Append a vignette effect
    pub vignette: bool,
    /// Append a tonemap effect
    pub tonemap: bool,
    /// Apply ambient occlusion before the other effects
    pub ssao: bool,
    pub clear_color: Vec4,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            preset: RenderPreset::Forward,
            vignette: false,
            tonemap: false,
            ssao: false,
            clear_color: Vec4::new(0.0, 0.0, 0.0, 1.0),
        }
    }
}

impl EngineConfig {
    pub const WIDTH: &'static str = "video.width";
    pub const HEIGHT: &'static str = "video.height";
    pub const PRESET: &'static str = "render.preset";
    pub const VIGNETTE: &'static str = "render.vignette";
    pub const TONEMAP: &'static str = "render.tonemap";
    pub const SSAO: &'static str = "render.ssao";

    pub fn from_settings(settings: &Settings) -> Self {
        let defaults = Self::default();
        Self {
            width: settings.get(Self::WIDTH, defaults.width).max(1),
            height: settings.get(Self::HEIGHT, defaults.height).max(1),
            preset: settings.get(Self::PRESET, defaults.preset),
            vignette: settings.get(Self::VIGNETTE, defaults.vignette),
            tonemap: settings.get(Self::TONEMAP, defaults.tonemap),
            ssao: settings.get(Self::SSAO, defaults.ssao),
            clear_color: defaults.clear_color,
        }
    }

    /// Post effects in application order
    pub fn post_effects(&self) -> Vec<PostEffect> {
        let mut effects = Vec::new();
        if self.ssao {
            effects.push(PostEffect::ssao());
        }
        if self.tonemap {
            effects.push(PostEffect::tonemap());
        }
        if self.vignette {
            effects.push(PostEffect::vignette());
        }
        effects
    }
}
