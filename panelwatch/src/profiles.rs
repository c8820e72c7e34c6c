//! Panel profiles: load/save a JSON mapping of profile name -> { panel_url, tls_ca }.
//! Stored under $XDG_CONFIG_HOME/panelwatch/profiles.json (fallback: platform config dir).
//! API keys are never written here.

use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, io, path::PathBuf};

pub const PROFILES_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct ProfileEntry {
    pub panel_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_ca: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ProfilesFile {
    #[serde(default)]
    pub profiles: BTreeMap<String, ProfileEntry>,
    #[serde(default)]
    pub version: u32,
}

pub fn config_dir() -> PathBuf {
    if let Some(xdg) = std::env::var_os("XDG_CONFIG_HOME") {
        PathBuf::from(xdg).join("panelwatch")
    } else {
        dirs_next::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("panelwatch")
    }
}

pub fn profiles_path() -> PathBuf {
    config_dir().join("profiles.json")
}

pub fn load_profiles() -> ProfilesFile {
    match fs::read_to_string(profiles_path()) {
        Ok(s) => serde_json::from_str(&s).unwrap_or_default(),
        Err(_) => ProfilesFile::default(),
    }
}

pub fn save_profiles(p: &ProfilesFile) -> io::Result<()> {
    let path = profiles_path();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = p.clone();
    out.version = PROFILES_VERSION;
    let data = serde_json::to_vec_pretty(&out).map_err(io::Error::other)?;
    fs::write(path, data)
}

#[derive(Debug, PartialEq, Eq)]
pub enum ResolveProfile {
    /// Use the provided runtime inputs (not persisted). (panel_url, tls_ca)
    Direct(String, Option<String>),
    /// Loaded from an existing profile entry (panel_url, tls_ca)
    Loaded(String, Option<String>),
    /// Should prompt user to select among profile names
    PromptSelect(Vec<String>),
    /// Should prompt user to create a new profile (name)
    PromptCreate(String),
    /// Nothing to go on
    None,
}

pub struct ProfileRequest {
    pub profile_name: Option<String>,
    pub panel_url: Option<String>,
    pub tls_ca: Option<String>,
}

impl ProfileRequest {
    pub fn resolve(self, pf: &ProfilesFile) -> ResolveProfile {
        match (self.profile_name, self.panel_url) {
            // URL given (with or without a name): direct, caller may persist
            (_, Some(u)) => ResolveProfile::Direct(u, self.tls_ca),
            (Some(name), None) => match pf.profiles.get(&name) {
                Some(entry) => ResolveProfile::Loaded(
                    entry.panel_url.clone(),
                    self.tls_ca.or_else(|| entry.tls_ca.clone()),
                ),
                None => ResolveProfile::PromptCreate(name),
            },
            (None, None) if pf.profiles.is_empty() => ResolveProfile::None,
            (None, None) => ResolveProfile::PromptSelect(pf.profiles.keys().cloned().collect()),
        }
    }
}

/// What `apply_direct` decided about the profile file.
#[derive(Debug, PartialEq, Eq)]
pub enum SaveAction {
    Created,
    Unchanged,
    Overwrite,
    NeedsConfirm,
}

/// Decide how a direct (URL-given) resolution under profile `name` touches `pf`.
/// New profiles are inserted; changed ones only when `force` is set.
pub fn apply_direct(
    pf: &mut ProfilesFile,
    name: &str,
    entry: ProfileEntry,
    force: bool,
) -> SaveAction {
    match pf.profiles.get(name) {
        None => {
            pf.profiles.insert(name.to_string(), entry);
            SaveAction::Created
        }
        Some(existing) if *existing == entry => SaveAction::Unchanged,
        Some(_) if force => {
            pf.profiles.insert(name.to_string(), entry);
            SaveAction::Overwrite
        }
        Some(_) => SaveAction::NeedsConfirm,
    }
}
