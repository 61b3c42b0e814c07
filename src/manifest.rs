//! Manifest generation for jvm-stress output.
//!
//! Writes `<Class>.json` next to the generated source, recording everything
//! needed to regenerate it.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::profile::Profile;

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Generator version information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratorInfo {
    pub name: String,
    pub version: String,
}

impl GeneratorInfo {
    pub fn current() -> Self {
        Self {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: VERSION.to_string(),
        }
    }
}

/// Size of what was generated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    pub fields: usize,
    pub methods: usize,
    /// Call edges registered between generated methods.
    pub call_edges: usize,
    /// Generation actions performed, including abandoned ones.
    pub actions: usize,
}

/// The complete manifest written to `<Class>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub seed: u64,
    pub profile: String,
    pub class_name: String,
    /// Effective configuration after command-line overrides.
    pub config: Profile,
    pub summary: Summary,
    pub generated_at: String,
    pub generator: GeneratorInfo,
}

impl Manifest {
    pub fn new(seed: u64, profile: String, class_name: String, config: Profile, summary: Summary) -> Self {
        Self {
            seed,
            profile,
            class_name,
            config,
            summary,
            generated_at: iso_timestamp(),
            generator: GeneratorInfo::current(),
        }
    }

    /// Write the manifest to `<dir>/<class_name>.json`.
    pub fn write_to_dir(&self, dir: &Path) -> io::Result<PathBuf> {
        let path = dir.join(format!("{}.json", self.class_name));
        let json = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        fs::write(&path, json)?;
        Ok(path)
    }
}

/// Generate an ISO 8601 timestamp string.
fn iso_timestamp() -> String {
    let duration = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let secs = duration.as_secs();

    let days_since_epoch = secs / 86400;
    let time_of_day = secs % 86400;

    let hours = time_of_day / 3600;
    let minutes = (time_of_day % 3600) / 60;
    let seconds = time_of_day % 60;

    let (year, month, day) = days_to_ymd(days_since_epoch);

    format!("{year:04}-{month:02}-{day:02}T{hours:02}:{minutes:02}:{seconds:02}Z")
}

/// Convert days since Unix epoch to (year, month, day).
fn days_to_ymd(days: u64) -> (u64, u64, u64) {
    // Howard Hinnant's civil_from_days.
    let z = days + 719468;
    let era = z / 146097;
    let doe = z - era * 146097;
    let yoe = (doe - doe / 1460 + doe / 36524 - doe / 146096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    let y = if m <= 2 { y + 1 } else { y };
    (y, m, d)
}
