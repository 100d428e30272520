//! Run configuration and the optional `generation.json` file

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};
use crate::pdf::WatermarkStyle;

/// Name of the optional per-run configuration file in the source root
pub const CONFIG_FILE_NAME: &str = "generation.json";

/// Folder (inside the source root) that receives the final dossier
pub const OUTPUT_FOLDER_NAME: &str = "Dossier Location";

/// Working folder of the older image-based protection tool
pub const PROTECTED_FOLDER_NAME: &str = "protected_files";

/// Working folder for per-document watermarked copies
pub const TEMP_FOLDER_NAME: &str = "temp_watermarked";

/// Default watermark text
pub const DEFAULT_WATERMARK_TEXT: &str = "DOCUMENT RESERVE A LA LOCATION";

/// Default dossier title
pub const DEFAULT_TITLE: &str = "Dossier de Location";

/// Per-person settings from `generation.json`
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PersonSettings {
    /// Display name used instead of the folder name
    #[serde(default)]
    pub alias: Option<String>,
    /// Explicit position; lower comes first
    #[serde(default)]
    pub order: Option<i64>,
}

/// Contents of `generation.json`: folder name → settings
///
/// ```json
/// {
///   "marie": { "alias": "Marie Dupont", "order": 1 },
///   "garant": { "order": 2 }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct GenerationConfig {
    pub persons: BTreeMap<String, PersonSettings>,
}

impl GenerationConfig {
    /// Parse a configuration from JSON text
    ///
    /// `path` is only used to label the error.
    pub fn from_json(json: impl AsRef<[u8]>, path: &Path) -> Result<Self> {
        serde_json::from_slice(json.as_ref()).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load `generation.json` from the source root, if present
    ///
    /// A missing file is not an error. A file that exists but cannot be
    /// parsed is, because guessing would silently reorder the dossier.
    pub fn load_from_root(root: &Path) -> Result<Option<Self>> {
        let path = root.join(CONFIG_FILE_NAME);
        if !path.is_file() {
            return Ok(None);
        }

        // Invalid UTF-8 is reported as a parse error, not an I/O one
        let json = std::fs::read(&path)?;
        let config = Self::from_json(&json, &path)?;
        log::info!(
            "Loaded {} with {} person entr{}",
            CONFIG_FILE_NAME,
            config.persons.len(),
            if config.persons.len() == 1 { "y" } else { "ies" }
        );
        Ok(Some(config))
    }

    /// Settings for one folder, if the configuration mentions it
    pub fn settings_for(&self, folder_name: &str) -> Option<&PersonSettings> {
        self.persons.get(folder_name)
    }
}

/// Options for a full dossier build
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Root folder containing one subfolder per person
    pub source: PathBuf,
    /// Watermark text stamped on every document page
    pub watermark_text: String,
    /// Title shown on the title page and used for the output file name
    pub title: String,
    /// Watermark appearance
    pub style: WatermarkStyle,
    /// Worker threads used for watermarking (1 = sequential)
    pub jobs: usize,
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self {
            source: PathBuf::from("."),
            watermark_text: DEFAULT_WATERMARK_TEXT.to_string(),
            title: DEFAULT_TITLE.to_string(),
            style: WatermarkStyle::default(),
            jobs: 1,
        }
    }
}

impl BuildOptions {
    /// Folder that receives the final dossier
    pub fn output_dir(&self) -> PathBuf {
        self.source.join(OUTPUT_FOLDER_NAME)
    }

    /// Full path of the final dossier
    pub fn output_path(&self) -> PathBuf {
        self.output_dir().join(crate::naming::output_file_name(&self.title))
    }
}

/// Subfolder names that never hold person documents
pub fn reserved_folder_names() -> [&'static str; 3] {
    [OUTPUT_FOLDER_NAME, PROTECTED_FOLDER_NAME, TEMP_FOLDER_NAME]
}
