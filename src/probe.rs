//! Probe geometry catalogs.
//!
//! A probe type is identified by the name of its geometry file, e.g.
//! `tetrode_12.5.yml`. Geometry files list shanks and their electrodes:
//!
//! ```yaml
//! probe_type: tetrode_12.5
//! units: um
//! probe_description: four wire electrode
//! num_shanks: 1
//! contact_size: 12.5
//! shanks:
//!   - shank_id: 0
//!     electrodes:
//!       - {id: 0, rel_x: 0, rel_y: 0, rel_z: 0}
//!       - ...
//! ```

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::types::*;

/// Geometry file of the 12.5 um tetrode.
pub const TETRODE_12_5: &str = "tetrode_12.5.yml";

/// Geometry file of the 32-channel, 2-shank silicon probe.
pub const PROBE_32C_2S: &str = "32c-2s8mm6cm-20um-40um-dl.yml";

/// Source of probe geometry.
pub trait ProbeCatalog {
    /// Returns the spec of a probe type.
    fn probe(&self, device_type: &str) -> Result<ProbeSpec>;
}

/// Fetches every requested probe type and orders them by total channel count,
/// smallest first. Ties keep the requested order.
pub fn load_probes<C: ProbeCatalog + ?Sized>(catalog: &C, device_types: &[String]) -> Result<Vec<ProbeSpec>> {
    let mut probes = device_types
        .iter()
        .map(|device_type| catalog.probe(device_type))
        .collect::<Result<Vec<_>>>()?;
    sort_probes(&mut probes);
    Ok(probes)
}

/// Stable ascending sort by channels per probe.
pub fn sort_probes(probes: &mut [ProbeSpec]) {
    probes.sort_by_key(|p| p.channels_per_probe());
}

/// Catalog backed by an in-memory list of specs.
#[derive(Debug, Clone, Default)]
pub struct StaticProbeCatalog {
    probes: Vec<ProbeSpec>,
}

impl StaticProbeCatalog {
    pub fn new(probes: Vec<ProbeSpec>) -> Self {
        StaticProbeCatalog { probes }
    }

    /// The probe types used in the lab's recordings.
    pub fn builtin() -> Self {
        StaticProbeCatalog::new(vec![
            ProbeSpec {
                device_type: TETRODE_12_5.to_string(),
                num_shanks: 1,
                channels_per_shank: 4,
                description: "four wire electrode".to_string(),
                units: "um".to_string(),
                contact_size: Some(12.5),
            },
            ProbeSpec {
                device_type: PROBE_32C_2S.to_string(),
                num_shanks: 2,
                channels_per_shank: 16,
                description: "32 channel 2 shank silicon probe, 20 um contacts, 40 um spacing"
                    .to_string(),
                units: "um".to_string(),
                contact_size: Some(20.0),
            },
        ])
    }

    pub fn with_probe(mut self, probe: ProbeSpec) -> Self {
        self.probes.push(probe);
        self
    }

    pub fn device_types(&self) -> Vec<String> {
        self.probes.iter().map(|p| p.device_type.clone()).collect()
    }
}

impl ProbeCatalog for StaticProbeCatalog {
    fn probe(&self, device_type: &str) -> Result<ProbeSpec> {
        self.probes
            .iter()
            .find(|p| p.device_type == device_type)
            .cloned()
            .ok_or_else(|| MetadataError::UnknownProbe(device_type.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ProbeGeometry {
    #[serde(default)]
    units: Option<String>,
    #[serde(default)]
    probe_description: Option<String>,
    #[serde(default)]
    num_shanks: Option<usize>,
    #[serde(default)]
    contact_size: Option<f64>,
    #[serde(default)]
    shanks: Vec<ShankGeometry>,
}

#[derive(Debug, Deserialize)]
struct ShankGeometry {
    #[serde(default)]
    electrodes: Vec<serde_yaml::Value>,
}

impl ProbeGeometry {
    fn into_spec(self, device_type: &str) -> Result<ProbeSpec> {
        let shank_channels: Vec<usize> = self.shanks.iter().map(|s| s.electrodes.len()).collect();
        if let Some(declared) = self.num_shanks {
            if declared != shank_channels.len() {
                return Err(MetadataError::InvalidProbeSpec {
                    device_type: device_type.to_string(),
                    reason: format!(
                        "num_shanks is {} but {} shanks are listed",
                        declared,
                        shank_channels.len()
                    ),
                });
            }
        }
        let mut spec = ProbeSpec::from_shanks(device_type, &shank_channels)?;
        if let Some(description) = self.probe_description {
            spec = spec.with_description(&description);
        }
        if let Some(units) = self.units {
            spec = spec.with_units(&units);
        }
        if let Some(contact_size) = self.contact_size {
            spec = spec.with_contact_size(contact_size);
        }
        Ok(spec)
    }
}

/// Parses a probe geometry document.
pub fn parse_probe_geometry(device_type: &str, yaml: &str) -> Result<ProbeSpec> {
    let geometry: ProbeGeometry = serde_yaml::from_str(yaml)?;
    geometry.into_spec(device_type)
}

/// Catalog reading geometry files from a directory, one file per probe type.
#[derive(Debug, Clone)]
pub struct ProbeDirectory {
    dir: PathBuf,
}

impl ProbeDirectory {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        ProbeDirectory {
            dir: dir.as_ref().to_path_buf(),
        }
    }
}

impl ProbeCatalog for ProbeDirectory {
    fn probe(&self, device_type: &str) -> Result<ProbeSpec> {
        let path = self.dir.join(device_type);
        if !path.is_file() {
            return Err(MetadataError::UnknownProbe(device_type.to_string()));
        }
        debug!("loading probe geometry {}", path.display());
        parse_probe_geometry(device_type, &fs::read_to_string(&path)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TWO_SHANK: &str = "
probe_type: test
units: um
probe_description: two shanks
num_shanks: 2
contact_size: 15.0
shanks:
  - shank_id: 0
    electrodes:
      - {id: 0, rel_x: 0, rel_y: 0, rel_z: 0}
      - {id: 1, rel_x: 0, rel_y: 20, rel_z: 0}
  - shank_id: 1
    electrodes:
      - {id: 2, rel_x: 250, rel_y: 0, rel_z: 0}
      - {id: 3, rel_x: 250, rel_y: 20, rel_z: 0}
";

    #[test]
    fn parses_geometry() {
        let spec = parse_probe_geometry("two.yml", TWO_SHANK).unwrap();
        assert_eq!(spec.device_type, "two.yml");
        assert_eq!(spec.num_shanks, 2);
        assert_eq!(spec.channels_per_shank, 2);
        assert_eq!(spec.channels_per_probe(), 4);
        assert_eq!(spec.description, "two shanks");
        assert_eq!(spec.contact_size, Some(15.0));
    }

    #[test]
    fn unequal_shanks_are_invalid() {
        let yaml = "shanks:\n  - electrodes: [a, b]\n  - electrodes: [c]\n";
        assert!(matches!(
            parse_probe_geometry("bad.yml", yaml),
            Err(MetadataError::InvalidProbeSpec { .. })
        ));
    }

    #[test]
    fn declared_shank_count_must_match() {
        let yaml = "num_shanks: 3\nshanks:\n  - electrodes: [a]\n";
        assert!(parse_probe_geometry("bad.yml", yaml).is_err());
    }

    #[test]
    fn probes_sorted_smallest_first() {
        let catalog = StaticProbeCatalog::builtin();
        let requested = vec![PROBE_32C_2S.to_string(), TETRODE_12_5.to_string()];
        let probes = load_probes(&catalog, &requested).unwrap();
        assert_eq!(probes[0].device_type, TETRODE_12_5);
        assert_eq!(probes[1].device_type, PROBE_32C_2S);
    }

    #[test]
    fn extra_probes_extend_the_builtin_catalog() {
        let hexa = ProbeSpec::from_shanks("hexatrode.yml", &[6]).unwrap();
        let catalog = StaticProbeCatalog::builtin().with_probe(hexa);
        assert_eq!(
            catalog.device_types(),
            [TETRODE_12_5, PROBE_32C_2S, "hexatrode.yml"]
        );

        let probes = load_probes(&catalog, &catalog.device_types()).unwrap();
        let order: Vec<&str> = probes.iter().map(|p| p.device_type.as_str()).collect();
        assert_eq!(order, [TETRODE_12_5, "hexatrode.yml", PROBE_32C_2S]);
    }

    #[test]
    fn unknown_probe_type() {
        let catalog = StaticProbeCatalog::builtin();
        assert!(matches!(
            catalog.probe("nope.yml"),
            Err(MetadataError::UnknownProbe(_))
        ));
    }

    #[test]
    fn reads_geometry_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("two.yml"), TWO_SHANK).unwrap();
        let catalog = ProbeDirectory::new(dir.path());
        assert_eq!(catalog.probe("two.yml").unwrap().num_shanks, 2);
        assert!(catalog.probe("missing.yml").is_err());
    }
}
