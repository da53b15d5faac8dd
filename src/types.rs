use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Sentinel written for fields that could not be determined from the
/// recording and need a human to fill them in.
pub const UNKNOWN: &str = "Unknown";

/// One `(epoch, task, ordinal)` triple inferred from a session filename.
///
/// The derived ordering compares `epoch`, then `task_code`, then `ordinal`,
/// which is the canonical sort order of a session's entries.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EpochLabelEntry {
    /// Epoch string as it appears in the filename (e.g. "02")
    pub epoch: String,
    /// Task code split off the label (e.g. "r"), or the whole label when
    /// no known code matched
    pub task_code: String,
    /// Remainder of the label once the task code is removed (e.g. "1")
    pub ordinal: String,
}

impl EpochLabelEntry {
    pub fn new(epoch: &str, task_code: &str, ordinal: &str) -> Self {
        EpochLabelEntry {
            epoch: epoch.to_string(),
            task_code: task_code.to_string(),
            ordinal: ordinal.to_string(),
        }
    }
}

/// Geometry of one physical probe type.
///
/// Probe types are referred to by their geometry file name
/// (e.g. `tetrode_12.5.yml`), which is also what ends up as the
/// `device_type` of an electrode group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProbeSpec {
    /// Identifier of the probe type
    pub device_type: String,
    /// Number of shanks on the probe
    pub num_shanks: usize,
    /// Number of recording channels on each shank
    pub channels_per_shank: usize,
    /// Free-form description of the probe
    pub description: String,
    /// Units used for contact geometry (usually "um")
    pub units: String,
    /// Contact size in `units`, when the geometry declares one
    pub contact_size: Option<f64>,
}

impl ProbeSpec {
    /// Builds a spec from per-shank channel counts.
    ///
    /// Every shank must carry the same number of channels.
    pub fn from_shanks(device_type: &str, shank_channels: &[usize]) -> Result<Self> {
        let channels_per_shank = match shank_channels.first() {
            Some(&n) if n > 0 => n,
            _ => {
                return Err(MetadataError::InvalidProbeSpec {
                    device_type: device_type.to_string(),
                    reason: "probe has no channels".to_string(),
                })
            }
        };
        if shank_channels.iter().any(|&n| n != channels_per_shank) {
            return Err(MetadataError::InvalidProbeSpec {
                device_type: device_type.to_string(),
                reason: format!("shanks differ in size: {:?}", shank_channels),
            });
        }
        Ok(ProbeSpec {
            device_type: device_type.to_string(),
            num_shanks: shank_channels.len(),
            channels_per_shank,
            description: UNKNOWN.to_string(),
            units: UNKNOWN.to_string(),
            contact_size: None,
        })
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_units(mut self, units: &str) -> Self {
        self.units = units.to_string();
        self
    }

    pub fn with_contact_size(mut self, contact_size: f64) -> Self {
        self.contact_size = Some(contact_size);
        self
    }

    /// Total channel count of the probe (shanks x channels per shank).
    pub fn channels_per_probe(&self) -> usize {
        self.num_shanks * self.channels_per_shank
    }
}

/// Electrode group reference carried by an ntrode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupRef {
    /// Not assigned (incomplete ntrode, or assignment not run yet)
    Unknown,
    /// Assigned to the electrode group with this id
    Id(usize),
}

impl Serialize for GroupRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            GroupRef::Unknown => serializer.serialize_str(UNKNOWN),
            GroupRef::Id(id) => serializer.serialize_u64(*id as u64),
        }
    }
}

/// One ntrode (probe-unit) from the `SpikeNTrode` section of a rec header.
///
/// `map` goes from the local channel index to a channel number. Straight out
/// of the header it holds raw hardware channels (`hwChan`); after electrode
/// group assignment it holds group-relative channel numbers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ntrode {
    /// Ntrode id from the header
    pub ntrode_id: i64,
    /// Electrode group this ntrode was assigned to
    pub electrode_group: GroupRef,
    /// Bad channel list; never read from the header, always left for review
    pub bad_channels: String,
    /// Local index to channel number, absent for incomplete ntrodes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub map: Option<BTreeMap<usize, u32>>,
}

impl Ntrode {
    /// Creates an ntrode with no channel map and unknown group.
    pub fn new(ntrode_id: i64) -> Self {
        Ntrode {
            ntrode_id,
            electrode_group: GroupRef::Unknown,
            bad_channels: UNKNOWN.to_string(),
            map: None,
        }
    }

    /// Creates an ntrode from raw hardware channels listed in header order.
    pub fn with_hw_channels(ntrode_id: i64, hw_channels: &[u32]) -> Self {
        let mut ntrode = Ntrode::new(ntrode_id);
        ntrode.map = Some(hw_channels.iter().copied().enumerate().collect());
        ntrode
    }

    pub fn num_channels(&self) -> Option<usize> {
        self.map.as_ref().map(|m| m.len())
    }
}

/// Logical electrode group made of one or more ntrodes of the same probe type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ElectrodeGroup {
    /// Sequential group id, starting at 0
    pub id: usize,
    /// Probe type of every ntrode in this group
    pub device_type: String,
    /// Probe description copied from the catalog
    pub description: String,
    /// Geometry units copied from the catalog
    pub units: String,
    /// Shank capacity of the probe type
    pub num_shanks: usize,
    /// Channels on each shank of the probe type
    pub channels_per_shank: usize,
    /// Contact size copied from the catalog
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_size: Option<f64>,
}

impl ElectrodeGroup {
    pub fn from_probe(id: usize, probe: &ProbeSpec) -> Self {
        ElectrodeGroup {
            id,
            device_type: probe.device_type.clone(),
            description: probe.description.clone(),
            units: probe.units.clone(),
            num_shanks: probe.num_shanks,
            channels_per_shank: probe.channels_per_shank,
            contact_size: probe.contact_size,
        }
    }
}

/// Recoverable problem noticed while collecting metadata.
///
/// None of these stop the draft from being written, but each one points at
/// a section of the draft that needs extra review.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// Filenames disagree with the expected session identity
    NamingMismatch {
        field: String,
        expected: Vec<String>,
        found: Vec<String>,
    },
    /// A session file did not match the filename template and was skipped
    UnparsedFilename { path: PathBuf },
    /// An ntrode had no usable channel list
    IncompleteNtrode { ntrode_id: i64 },
    /// Appending to the draft file failed
    WriteFailed { path: PathBuf, message: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Diagnostic::NamingMismatch {
                field,
                expected,
                found,
            } => write!(
                f,
                "{} mismatch: expected one of {:?}, found {:?}",
                field, expected, found
            ),
            Diagnostic::UnparsedFilename { path } => {
                write!(f, "filename does not match template: {}", path.display())
            }
            Diagnostic::IncompleteNtrode { ntrode_id } => {
                write!(f, "incomplete ntrode id {}", ntrode_id)
            }
            Diagnostic::WriteFailed { path, message } => {
                write!(f, "failed writing {}: {}", path.display(), message)
            }
        }
    }
}

/// Error types for metadata collection.
///
/// Every variant is fatal: the operation that returned it produced no
/// partial result. Recoverable conditions are reported as [`Diagnostic`]s.
#[derive(Error, Debug)]
pub enum MetadataError {
    /// An ntrode has more channels than any known probe shank
    #[error("unknown shank size: ntrode {ntrode_id} has {num_channels} channels, more than any known probe shank")]
    UnknownShankSize { ntrode_id: i64, num_channels: usize },

    /// No rec header could be found or extracted
    #[error("no rec header found under {}", path.display())]
    MissingHeader { path: PathBuf },

    /// Header extraction was asked to read something that is not a .rec file
    #[error("not a .rec file: {}", .0.display())]
    NotRecFile(PathBuf),

    /// Required node missing from the decoded configuration
    #[error("configuration node not found: {path}")]
    MissingConfig { path: String },

    /// A configuration value could not be interpreted
    #[error("invalid value for {field}: {value:?}")]
    InvalidConfigValue { field: String, value: String },

    /// The filename template is malformed
    #[error("invalid filename template {template:?}: {reason}")]
    InvalidTemplate { template: String, reason: String },

    /// A filename does not conform to the template
    #[error("filename {filename:?} does not match template {template:?}")]
    NoMatch { filename: String, template: String },

    /// A template field was not supplied when formatting a filename
    #[error("missing value for filename field {0:?}")]
    MissingField(String),

    /// Probe geometry is inconsistent
    #[error("invalid probe spec {device_type}: {reason}")]
    InvalidProbeSpec { device_type: String, reason: String },

    /// Probe type not present in the catalog
    #[error("unknown probe type {0:?}")]
    UnknownProbe(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("directory walk error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("invalid regex: {0}")]
    Regex(#[from] regex::Error),

    #[error("invalid file pattern: {0}")]
    Glob(#[from] glob::PatternError),
}

pub type Result<T> = std::result::Result<T, MetadataError>;
