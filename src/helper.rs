//! Session metadata collection and the draft writer.
//!
//! [`MetadataHelper`] gathers everything about one session up front and
//! renders it as commented YAML sections.

use serde_json::Value as JsonValue;
use serde_yaml::{Mapping, Value};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::SessionConfig;
use crate::document::{DraftDocument, Section};
use crate::electrode;
use crate::filename::{FilenameTemplate, ParsedFilename};
use crate::files;
use crate::header;
use crate::ntrode;
use crate::probe::{self, ProbeCatalog, StaticProbeCatalog};
use crate::tasks::{self, SessionIdentity, TaskInference};
use crate::types::*;
use crate::xml;

/// Extension of extracted rec headers.
pub const HEADER_EXTENSION: &str = ".rec_header.xml";

/// A/D units to volts for SpikeGadgets hardware (0.195 uV per bit).
const RAW_DATA_TO_VOLTS: f64 = 0.000000195;

fn mapping<I: IntoIterator<Item = (&'static str, Value)>>(items: I) -> Mapping {
    items
        .into_iter()
        .map(|(k, v)| (Value::from(k), v))
        .collect()
}

/// Epochs are written as integers when they parse as one.
fn epoch_value(epoch: &str) -> Value {
    match epoch.parse::<u64>() {
        Ok(n) => Value::from(n),
        Err(_) => Value::from(epoch),
    }
}

/// Collected metadata of one recording session.
///
/// Construction scans the session directory, reads the rec header and
/// assigns electrode groups; everything the draft needs is computed up
/// front. Recoverable problems found along the way are available from
/// [`MetadataHelper::diagnostics`].
#[derive(Debug, Clone)]
pub struct MetadataHelper {
    config: SessionConfig,
    template: FilenameTemplate,
    rec_path: PathBuf,
    tasks: TaskInference,
    header_file: PathBuf,
    configuration: JsonValue,
    probes: Vec<ProbeSpec>,
    electrode_groups: Vec<ElectrodeGroup>,
    ntrodes: Vec<Ntrode>,
    diagnostics: Vec<Diagnostic>,
}

impl MetadataHelper {
    /// Collects session metadata using the built-in probe catalog.
    pub fn new(config: SessionConfig) -> Result<Self> {
        Self::with_catalog(config, &StaticProbeCatalog::builtin())
    }

    /// Collects session metadata, taking probe geometry from `catalog`.
    pub fn with_catalog<C: ProbeCatalog + ?Sized>(config: SessionConfig, catalog: &C) -> Result<Self> {
        let template = FilenameTemplate::compile(&config.filename_format)?;
        let rec_path = config.rec_path();
        let mut diagnostics = Vec::new();

        let identity = SessionIdentity {
            date: &config.date,
            animal_name: &config.animal_name,
            nickname: config.file_animal_name(),
        };
        let scan = tasks::scan_session(&rec_path, identity, &template, &config.task_codes)?;
        diagnostics.extend(scan.diagnostics);
        info!(
            "detected tasks {:?} in {}",
            scan.inference.detected_tasks(),
            rec_path.display()
        );

        let header_file = locate_header_file(&config, &rec_path)?;
        info!("reading configuration from {}", header_file.display());
        let tree = xml::decode(&header::read_header_text(&header_file)?)?;
        let configuration = tree
            .get("Configuration")
            .cloned()
            .ok_or_else(|| MetadataError::MissingConfig {
                path: "Configuration".to_string(),
            })?;

        let extraction = ntrode::extract_ntrodes(&configuration)?;
        diagnostics.extend(extraction.diagnostics);
        let probes = probe::load_probes(catalog, &config.probe_types)?;
        let assignment = electrode::assign_electrode_groups(extraction.ntrodes, &probes)?;
        info!(
            "{} ntrodes in {} electrode groups",
            assignment.ntrodes.len(),
            assignment.electrode_groups.len()
        );

        Ok(MetadataHelper {
            config,
            template,
            rec_path,
            tasks: scan.inference,
            header_file,
            configuration,
            probes,
            electrode_groups: assignment.electrode_groups,
            ntrodes: assignment.ntrodes,
            diagnostics,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn session_id(&self) -> String {
        self.config.session_id()
    }

    pub fn rec_path(&self) -> &Path {
        &self.rec_path
    }

    pub fn tasks(&self) -> &TaskInference {
        &self.tasks
    }

    pub fn detected_tasks(&self) -> &[String] {
        self.tasks.detected_tasks()
    }

    /// Header (or reconfig) file the configuration was read from.
    pub fn header_file(&self) -> &Path {
        &self.header_file
    }

    /// The decoded `Configuration` node of the header.
    pub fn configuration(&self) -> &JsonValue {
        &self.configuration
    }

    /// Probe specs in matching order.
    pub fn probes(&self) -> &[ProbeSpec] {
        &self.probes
    }

    pub fn electrode_groups(&self) -> &[ElectrodeGroup] {
        &self.electrode_groups
    }

    pub fn ntrodes(&self) -> &[Ntrode] {
        &self.ntrodes
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn find_files_with_extension(&self, extension: &str) -> Result<Vec<PathBuf>> {
        files::find_files_with_extension(&self.rec_path, extension)
    }

    pub fn parse_filename<P: AsRef<Path>>(&self, path: P) -> Result<ParsedFilename> {
        self.template.decompose_path(path)
    }

    /// Name of a session file for the given epoch, label and extension.
    pub fn get_filename(&self, epoch: &str, label: &str, extension: &str) -> Result<String> {
        let extension = extension.strip_prefix('.').unwrap_or(extension);
        let mut values = HashMap::new();
        values.insert("date", self.config.date.as_str());
        values.insert("animal", self.config.file_animal_name());
        values.insert("epoch", epoch);
        values.insert("label", label);
        values.insert("extension", extension);
        self.template.format(&values)
    }

    fn placeholder(&self) -> Value {
        Value::from(self.config.placeholder_text.as_str())
    }

    fn task_name(&self, task_code: &str) -> Value {
        match self.config.task_codes.name(task_code) {
            Some(name) => Value::from(name),
            None => self.placeholder(),
        }
    }

    pub fn basic_info(&self) -> Section {
        let cfg = &self.config;
        let text = |v: &Option<String>| match v {
            Some(s) => Value::from(s.as_str()),
            None => self.placeholder(),
        };
        let experiment_description = text(&cfg.experiment_description);
        let session_description = match &cfg.session_description {
            Some(s) => Value::from(s.as_str()),
            None => experiment_description.clone(),
        };
        let subject = mapping([
            ("description", Value::from(cfg.subject_info.description.as_str())),
            ("genotype", Value::from(cfg.subject_info.genotype.as_str())),
            ("sex", Value::from(cfg.subject_info.sex.as_str())),
            ("species", Value::from(cfg.subject_info.species.as_str())),
            ("subject id", Value::from(cfg.animal_name.as_str())),
            ("weight", text(&cfg.subject_info.weight)),
        ]);
        Section {
            entries: mapping([
                ("experimenter name", text(&cfg.experimenter_name)),
                ("lab", Value::from(cfg.lab.as_str())),
                ("institution", Value::from(cfg.institution.as_str())),
                ("experiment description", experiment_description),
                ("session description", session_description),
                ("session_id", Value::from(self.session_id())),
                ("subject", Value::Mapping(subject)),
            ]),
            comments: Vec::new(),
        }
    }

    pub fn data_acq_device(&self) -> Section {
        let device = mapping([
            ("name", Value::from("SpikeGadgets")),
            ("amplifier", Value::from("Intan")),
            ("adc_circuit", Value::from("Intan")),
        ]);
        Section::entry("data acq device", vec![Value::Mapping(device)])
    }

    /// One entry per StateScript log of the session.
    pub fn associated_files(&self) -> Result<Section> {
        let mut entries = Vec::new();
        for file in self.find_files_with_extension(".stateScriptLog")? {
            let parsed = match self.parse_filename(&file) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("skipping associated file: {}", e);
                    continue;
                }
            };
            let ext = parsed.get("extension").unwrap_or_default();
            let label = parsed.get("label").unwrap_or_default();
            let epoch = parsed.get("epoch").unwrap_or_default();
            entries.push(Value::Mapping(mapping([
                ("name", Value::from(format!("{}_{}", ext, label))),
                (
                    "description",
                    Value::from(format!("{} {}", ext, self.config.task_codes.unpack_label(label))),
                ),
                ("path", Value::from(file.to_string_lossy().into_owned())),
                ("task_epochs", Value::Sequence(vec![epoch_value(epoch)])),
            ])));
        }
        Ok(Section::entry("associated_files", entries))
    }

    pub fn device(&self) -> Section {
        let device = mapping([("name", Value::Sequence(vec![Value::from("Trodes")]))]);
        Section::entry("device", Value::Mapping(device))
    }

    pub fn units(&self) -> Section {
        let units = mapping([
            ("analog", self.placeholder()),
            ("behavioral_events", self.placeholder()),
        ]);
        Section::entry("units", Value::Mapping(units))
    }

    pub fn conversion(&self) -> Section {
        Section::entry("raw_data_to_volts", RAW_DATA_TO_VOLTS)
            .with_comments(&["A/D units to volts: 0.195 uV / lsb"])
    }

    pub fn default_header_file_path(&self) -> Section {
        Section::entry("default_header_file_path", "default_header.xml")
    }

    /// One camera per detected task, in task order.
    pub fn cameras(&self) -> Section {
        let entries: Vec<Value> = self
            .detected_tasks()
            .iter()
            .enumerate()
            .map(|(i, task)| {
                let camera_name = match self.config.task_codes.name(task) {
                    Some(name) => format!("{} camera", name),
                    None => format!("{} camera", self.config.placeholder_text),
                };
                Value::Mapping(mapping([
                    ("id", Value::from(i)),
                    ("meters_per_pixel", self.placeholder()),
                    ("manufacturer", self.placeholder()),
                    ("model", self.placeholder()),
                    ("lens", self.placeholder()),
                    ("camera_name", Value::from(camera_name)),
                ]))
            })
            .collect();
        Section::entry("cameras", entries)
            .with_comments(&["meters_per_pixel: to be determined from video & maze dimensions"])
    }

    pub fn tasks_section(&self) -> Section {
        let entries: Vec<Value> = self
            .detected_tasks()
            .iter()
            .enumerate()
            .map(|(i, task)| {
                let epochs: Vec<Value> = self
                    .tasks
                    .task_epochs(task)
                    .into_iter()
                    .map(epoch_value)
                    .collect();
                Value::Mapping(mapping([
                    ("task_name", self.task_name(task)),
                    ("task_description", self.task_name(task)),
                    ("camera_id", Value::Sequence(vec![Value::from(i)])),
                    ("task_epochs", Value::Sequence(epochs)),
                ]))
            })
            .collect();
        Section::entry("tasks", entries)
    }

    /// One entry per video file; the camera is the one of the label's task.
    pub fn associated_video_files(&self) -> Result<Section> {
        let mut entries = Vec::new();
        for file in self.find_files_with_extension(".*h264")? {
            let parsed = match self.parse_filename(&file) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!("skipping video file: {}", e);
                    continue;
                }
            };
            let (task_code, _) = self
                .config
                .task_codes
                .split_label(parsed.get("label").unwrap_or_default());
            let camera_id = match self.tasks.task_index(&task_code) {
                Some(i) => Value::from(i),
                None => self.placeholder(),
            };
            let basename = file
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            entries.push(Value::Mapping(mapping([
                ("name", Value::from(basename)),
                ("camera_id", camera_id),
                ("task_epochs", epoch_value(parsed.get("epoch").unwrap_or_default())),
            ])));
        }
        Ok(Section::entry("associated_video_files", entries).with_comments(&["need camera information"]))
    }

    pub fn behavioral_events(&self) -> Section {
        let mut entries = Vec::new();
        for dio in &self.config.dio_id {
            for (n, name) in &dio.channels {
                entries.push(Value::Mapping(mapping([
                    ("description", Value::from(format!("{}{}", dio.prefix, n + 1))),
                    ("name", Value::from(name.as_str())),
                ])));
            }
        }
        Section::entry("behavioral_events", entries)
            .with_comments(&["read from dio_id (experimenter input)"])
    }

    pub fn electrode_groups_section(&self) -> Section {
        let entries: Vec<Value> = self
            .electrode_groups
            .iter()
            .map(|group| {
                Value::Mapping(mapping([
                    ("id", Value::from(group.id)),
                    ("location", self.placeholder()),
                    ("device_type", Value::from(group.device_type.as_str())),
                    ("description", Value::from(group.description.as_str())),
                    ("targeted_location", self.placeholder()),
                    ("targeted_x", self.placeholder()),
                    ("targeted_y", self.placeholder()),
                    ("targeted_z", self.placeholder()),
                    ("units", self.placeholder()),
                ]))
            })
            .collect();
        Section::entry("electrode groups", entries).with_comments(&[
            "one group per probe (or tetrode), numbered in header order;",
            "fill in location and targeting for each group",
        ])
    }

    pub fn ntrode_electrode_group_channel_map(&self) -> Result<Section> {
        let ntrodes = serde_yaml::to_value(&self.ntrodes)?;
        Ok(Section::entry("ntrode electrode group channel map", ntrodes).with_comments(&[
            "ntrode electrode group channel map:",
            "read directly from the header (or reconfig) xml file,",
            "channels renumbered from 0 within each electrode group.",
            "",
        ]))
    }

    /// Writes `{session_id}_metadata_draft.yml` into `out_dir` and returns its
    /// path.
    ///
    /// Write failures do not abort the draft; they are added to
    /// [`MetadataHelper::diagnostics`] and the file may be incomplete.
    /// Failures from an earlier call are discarded first.
    pub fn write_metadata_draft<P: AsRef<Path>>(&mut self, out_dir: P) -> Result<PathBuf> {
        self.diagnostics
            .retain(|d| !matches!(d, Diagnostic::WriteFailed { .. }));

        // build everything first so a failure here leaves no partial file
        let basic_info = self.basic_info();
        let environment = [
            self.data_acq_device(),
            self.associated_files()?,
            self.device(),
            self.units(),
            self.conversion(),
            self.default_header_file_path(),
        ];
        let behavior = [
            self.cameras(),
            self.tasks_section(),
            self.associated_video_files()?,
            self.behavioral_events(),
        ];
        let electrode_groups = self.electrode_groups_section();
        let channel_map = self.ntrode_electrode_group_channel_map()?;

        fs::create_dir_all(out_dir.as_ref())?;
        let out_filename = format!("{}_metadata_draft.yml", self.session_id());
        let out_file = out_dir.as_ref().join(&out_filename);

        let mut doc = DraftDocument::create(&out_file);
        doc.write_comments(&[
            out_filename.clone(),
            "This is a draft metadata file auto-generated by rec_header_draft.".to_string(),
            "This file still needs human attention -- double check all entries!".to_string(),
            format!(
                "In particular, search for the placeholder string \"{}\"",
                self.config.placeholder_text
            ),
            "and replace with appropriate values.".to_string(),
        ]);

        doc.write_comments(&["", "", "=== basic information ===", ""]);
        doc.append_yaml(&basic_info.entries);

        doc.write_comments(&["", "", "=== environment ==="]);
        for section in &environment {
            doc.write_section(section);
        }

        doc.write_comments(&["", "", "=== behavior / video ==="]);
        for section in &behavior {
            doc.write_section(section);
        }

        doc.write_comments(&["", "", "=== electrodes ==="]);
        doc.write_section(&electrode_groups);
        doc.write_comments(&[""]);
        doc.write_section(&channel_map);

        doc.write_comments(&[""]);

        let failures = doc.into_failures();
        if failures.is_empty() {
            info!("Saved to file: {}", out_file.display());
        } else {
            warn!(
                "{} write failures, {} may be incomplete",
                failures.len(),
                out_file.display()
            );
        }
        self.diagnostics.extend(failures);
        Ok(out_file)
    }
}

/// Finds the XML configuration for a session: the reconfig file if given,
/// else the first rec header next to the recordings, else headers freshly
/// extracted from the `.rec` files.
fn locate_header_file(config: &SessionConfig, rec_path: &Path) -> Result<PathBuf> {
    if let Some(reconfig) = &config.reconfig {
        if reconfig.is_file() {
            return Ok(reconfig.clone());
        }
        warn!("reconfig file {} not found, using rec headers", reconfig.display());
    }

    if let Some(existing) = files::find_files_with_extension(rec_path, HEADER_EXTENSION)?
        .into_iter()
        .next()
    {
        return Ok(existing);
    }

    let rec_files = files::find_files_with_extension(rec_path, ".rec")?;
    let mut extracted = header::extract_rec_headers(&rec_files, &config.copy_path)?;
    extracted.sort();
    extracted
        .into_iter()
        .next()
        .ok_or_else(|| MetadataError::MissingHeader {
            path: rec_path.to_path_buf(),
        })
}
