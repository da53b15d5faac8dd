//! Session configuration.
//!
//! [`SessionConfig`] holds everything the experimenter supplies about a
//! session. Only the data path, animal name and date are required; all other
//! fields have defaults matching the lab's usual setup.
//!
//! ```
//! use rec_header_draft::SessionConfig;
//!
//! let cfg = SessionConfig {
//!     animal_nickname: Some("jaq".into()),
//!     ..SessionConfig::new("/data", "Jaq", "20190826")
//! };
//! assert_eq!(cfg.file_animal_name(), "jaq");
//! assert_eq!(cfg.session_id(), "Jaq_20190826");
//! ```

use std::env;
use std::path::PathBuf;

use crate::filename::DEFAULT_FILENAME_FORMAT;
use crate::probe::{PROBE_32C_2S, TETRODE_12_5};
use crate::tasks::TaskCodes;
use crate::types::UNKNOWN;

/// Named digital I/O channels of one port, e.g. prefix `"Din"` with
/// `(0, "poke_left")`. Channel indices are 0-based; the draft lists them
/// 1-based (`Din1`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DioGroup {
    pub prefix: String,
    pub channels: Vec<(usize, String)>,
}

impl DioGroup {
    pub fn new(prefix: &str, channels: &[(usize, &str)]) -> Self {
        DioGroup {
            prefix: prefix.to_string(),
            channels: channels
                .iter()
                .map(|(n, name)| (*n, name.to_string()))
                .collect(),
        }
    }
}

/// Subject fields of the draft. Unset weight is written as the placeholder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectInfo {
    pub description: String,
    pub genotype: String,
    pub sex: String,
    pub species: String,
    pub weight: Option<String>,
}

impl Default for SubjectInfo {
    fn default() -> Self {
        SubjectInfo {
            description: "Long Evans Rat".to_string(),
            genotype: "Wild Type".to_string(),
            sex: "Male".to_string(),
            species: "Rat".to_string(),
            weight: None,
        }
    }
}

/// Default directory for extracted rec headers: `~/tmp/rec_header/`, or a
/// `rec_header` directory in the system temp dir when `$HOME` is unset.
pub fn default_copy_path() -> PathBuf {
    match env::var_os("HOME") {
        Some(home) => PathBuf::from(home).join("tmp").join("rec_header"),
        None => env::temp_dir().join("rec_header"),
    }
}

/// Everything needed to draft the metadata of one session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Root of the data tree; recordings live in `{data_path}/{animal}/raw/{date}/`
    pub data_path: PathBuf,
    /// Animal name used for folder naming and as subject id
    pub animal_name: String,
    /// Session date as it appears in filenames, e.g. "20190826"
    pub date: String,
    /// Animal name used in filenames, when different from `animal_name`
    pub animal_nickname: Option<String>,
    /// Named digital I/O channels, listed as behavioral events
    pub dio_id: Vec<DioGroup>,
    pub experimenter_name: Option<String>,
    pub experiment_description: Option<String>,
    /// Defaults to the experiment description
    pub session_description: Option<String>,
    pub lab: String,
    pub institution: String,
    pub subject_info: SubjectInfo,
    /// Text written wherever a human has to supply a value
    pub placeholder_text: String,
    /// Where rec headers are extracted to when none exist next to the data
    pub copy_path: PathBuf,
    /// Trodes reconfiguration file to read instead of the rec header
    pub reconfig: Option<PathBuf>,
    pub task_codes: TaskCodes,
    pub filename_format: String,
    /// Probe types ntrodes may belong to, as probe catalog identifiers
    pub probe_types: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            data_path: PathBuf::new(),
            animal_name: String::new(),
            date: String::new(),
            animal_nickname: None,
            dio_id: Vec::new(),
            experimenter_name: None,
            experiment_description: None,
            session_description: None,
            lab: "Loren Frank".to_string(),
            institution: "University of California, San Francisco".to_string(),
            subject_info: SubjectInfo::default(),
            placeholder_text: UNKNOWN.to_string(),
            copy_path: default_copy_path(),
            reconfig: None,
            task_codes: TaskCodes::default(),
            filename_format: DEFAULT_FILENAME_FORMAT.to_string(),
            probe_types: vec![TETRODE_12_5.to_string(), PROBE_32C_2S.to_string()],
        }
    }
}

impl SessionConfig {
    pub fn new<P: Into<PathBuf>>(data_path: P, animal_name: &str, date: &str) -> Self {
        SessionConfig {
            data_path: data_path.into(),
            animal_name: animal_name.to_string(),
            date: date.to_string(),
            ..SessionConfig::default()
        }
    }

    pub fn with_dio(mut self, dio: DioGroup) -> Self {
        self.dio_id.push(dio);
        self
    }

    pub fn with_task_codes(mut self, task_codes: TaskCodes) -> Self {
        self.task_codes = task_codes;
        self
    }

    pub fn with_copy_path<P: Into<PathBuf>>(mut self, copy_path: P) -> Self {
        self.copy_path = copy_path.into();
        self
    }

    pub fn with_reconfig<P: Into<PathBuf>>(mut self, reconfig: P) -> Self {
        self.reconfig = Some(reconfig.into());
        self
    }

    /// `{animal_name}_{date}`
    pub fn session_id(&self) -> String {
        format!("{}_{}", self.animal_name, self.date)
    }

    /// Directory holding the session's recordings.
    pub fn rec_path(&self) -> PathBuf {
        self.data_path
            .join(&self.animal_name)
            .join("raw")
            .join(&self.date)
    }

    /// Animal name as it appears in filenames.
    pub fn file_animal_name(&self) -> &str {
        self.animal_nickname.as_deref().unwrap_or(&self.animal_name)
    }
}
