//! Generation profiles for jvm-stress.
//!
//! Profiles are presets for the plan, fill and synthesis configuration.
//! Each one is a TOML file embedded in the binary at compile time. Fields
//! omitted from a TOML file inherit the `Default` impls of each config
//! struct, which together form the "default" profile.

use std::io;

use thiserror::Error;

use crate::driver::DriverConfig;
use crate::emit::GenerationConfig;
use crate::planner::PlanConfig;

/// A generation profile combining all phase configurations.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Knobs read by the synthesizer and control-flow engine.
    pub generation: GenerationConfig,
    /// Configuration for the planning phase.
    pub plan: PlanConfig,
    /// Configuration for the fill phase.
    pub driver: DriverConfig,
}

/// Why a profile could not be loaded.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("unknown profile '{name}', available profiles: {}", available_profiles().join(", "))]
    Unknown { name: String },
    #[error("failed to read profile file '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse profile '{name}': {source}")]
    Parse {
        name: String,
        #[source]
        source: toml::de::Error,
    },
}

// Embedded profile TOML data (compiled into the binary).
static PROFILES: &[(&str, &str)] = &[
    ("default", include_str!("../profiles/default.toml")),
    ("minimal", include_str!("../profiles/minimal.toml")),
    ("safe", include_str!("../profiles/safe.toml")),
    (
        "deep-nesting",
        include_str!("../profiles/deep-nesting.toml"),
    ),
    ("call-heavy", include_str!("../profiles/call-heavy.toml")),
];

/// Returns a list of available profile names.
pub fn available_profiles() -> Vec<&'static str> {
    PROFILES.iter().map(|(name, _)| *name).collect()
}

fn parse_profile_toml(name: &str, toml_str: &str) -> Result<Profile, ProfileError> {
    toml::from_str(toml_str).map_err(|source| ProfileError::Parse {
        name: name.to_string(),
        source,
    })
}

/// Get a profile by name, or load it from a file path.
///
/// If `name_or_path` contains `/` or ends with `.toml`, it is read from
/// disk. Otherwise it is looked up among the embedded profiles.
pub fn get_profile(name_or_path: &str) -> Result<Profile, ProfileError> {
    if name_or_path.contains('/') || name_or_path.ends_with(".toml") {
        let content = std::fs::read_to_string(name_or_path).map_err(|source| ProfileError::Read {
            path: name_or_path.to_string(),
            source,
        })?;
        return parse_profile_toml(name_or_path, &content);
    }
    PROFILES
        .iter()
        .find(|(name, _)| *name == name_or_path)
        .ok_or_else(|| ProfileError::Unknown {
            name: name_or_path.to_string(),
        })
        .and_then(|(name, toml_str)| parse_profile_toml(name, toml_str))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_embedded_profile_parses() {
        for name in available_profiles() {
            get_profile(name).unwrap_or_else(|e| panic!("{name}: {e}"));
        }
    }

    #[test]
    fn default_profile_matches_defaults() {
        let profile = get_profile("default").expect("default profile should exist");
        assert_eq!(profile, Profile::default());
    }

    #[test]
    fn minimal_profile_is_small() {
        let profile = get_profile("minimal").expect("minimal profile should exist");
        assert_eq!(profile.plan.methods, (1, 1));
        assert_eq!(profile.driver.max_nesting, 1);
        // Untouched tables keep their defaults.
        assert_eq!(profile.generation, GenerationConfig::default());
    }

    #[test]
    fn safe_profile_enables_guards() {
        let profile = get_profile("safe").expect("safe profile should exist");
        assert!(profile.generation.no_overflow);
        assert!(profile.generation.no_div_by_zero);
    }

    #[test]
    fn deep_nesting_profile_favors_compounds() {
        let profile = get_profile("deep-nesting").expect("deep-nesting profile should exist");
        assert!(profile.driver.max_nesting >= 5);
        assert!(profile.driver.weights.if_else > profile.driver.weights.declare_local);
        // Unnamed weights keep their defaults.
        assert_eq!(profile.driver.weights.cast, 2);
    }

    #[test]
    fn call_heavy_profile_has_many_methods() {
        let profile = get_profile("call-heavy").expect("call-heavy profile should exist");
        assert!(profile.plan.methods.0 >= 8);
        assert!(profile.driver.weights.method_call > profile.driver.weights.cast);
    }

    #[test]
    fn unknown_profile_returns_error() {
        let err = get_profile("nonexistent").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("nonexistent"));
        assert!(message.contains("minimal"));
        assert!(message.contains("safe"));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let err = get_profile("/nonexistent/dir/profile.toml").unwrap_err();
        assert!(matches!(err, ProfileError::Read { .. }));
    }

    #[test]
    fn bad_toml_is_a_parse_error() {
        let err = parse_profile_toml("inline", "[plan]\nfields = \"many\"").unwrap_err();
        assert!(matches!(err, ProfileError::Parse { .. }));
    }
}
