//! Electrode group assignment.
//!
//! Trodes reports one ntrode per physical shank (or tetrode). Ntrodes are
//! folded into electrode groups in header order: consecutive ntrodes of the
//! same probe type share a group until the probe's shank count is used up,
//! and a change of probe type always starts a new group. Channel numbers are
//! then rewritten to be contiguous within each group, because downstream
//! consumers index channels relative to the group rather than the headstage.

use tracing::debug;

use crate::types::*;

/// Electrode groups together with the ntrodes that were assigned to them.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    pub electrode_groups: Vec<ElectrodeGroup>,
    pub ntrodes: Vec<Ntrode>,
}

/// Picks the first probe (in the given order) whose shanks can hold
/// `num_channels` channels.
pub fn match_probe(probes: &[ProbeSpec], num_channels: usize) -> Option<&ProbeSpec> {
    probes.iter().find(|p| p.channels_per_shank >= num_channels)
}

/// Assigns ntrodes to electrode groups and renumbers their channels.
///
/// `probes` must be ordered by total channel count, smallest first (see
/// [`crate::probe::sort_probes`]). Ntrodes without a channel map are passed
/// through untouched. Fails if any ntrode has more channels than the
/// largest shank in `probes`, in which case no groups are returned.
pub fn assign_electrode_groups(mut ntrodes: Vec<Ntrode>, probes: &[ProbeSpec]) -> Result<Assignment> {
    let mut electrode_groups: Vec<ElectrodeGroup> = Vec::new();
    let mut group_id = 0;
    let mut shank_id = 0;
    let mut channel_offset = 0;
    let mut last_probe_type: Option<&str> = None;

    for ntrode in ntrodes.iter_mut() {
        let map = match ntrode.map.as_mut() {
            Some(map) => map,
            None => continue,
        };
        let num_channels = map.len();

        let probe = match_probe(probes, num_channels).ok_or(MetadataError::UnknownShankSize {
            ntrode_id: ntrode.ntrode_id,
            num_channels,
        })?;

        let new_group =
            last_probe_type != Some(probe.device_type.as_str()) || shank_id >= probe.num_shanks;
        if new_group {
            if last_probe_type.is_some() {
                group_id += 1;
            }
            shank_id = 0;
            channel_offset = 0;
            electrode_groups.push(ElectrodeGroup::from_probe(group_id, probe));
        }

        let base = channel_offset;
        channel_offset += num_channels;
        shank_id += 1;
        ntrode.electrode_group = GroupRef::Id(group_id);
        last_probe_type = Some(probe.device_type.as_str());

        for (index, channel) in map.iter_mut() {
            *channel = (base + index) as u32;
        }
        debug!(
            "ntrode {} -> group {} ({}), channels {}..{}",
            ntrode.ntrode_id,
            group_id,
            probe.device_type,
            base,
            channel_offset
        );
    }

    Ok(Assignment {
        electrode_groups,
        ntrodes,
    })
}
