/// Shared helpers for building fake Trodes session directories.
use std::fs;
use std::path::{Path, PathBuf};

pub const DATE: &str = "20200101";
pub const ANIMAL: &str = "rat";

/// Session directory `{root}/rat/raw/20200101`.
pub fn session_dir(root: &Path) -> PathBuf {
    root.join(ANIMAL).join("raw").join(DATE)
}

/// Header XML with one `SpikeNTrode` per entry. `None` channels produce an
/// ntrode without `SpikeChannel` children.
pub fn header_xml(ntrodes: &[(i64, Option<Vec<u32>>)]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\"?>\n<Configuration>\n  <GlobalConfiguration headstageSerial=\"00000\"/>\n  <HardwareConfiguration samplingRate=\"30000\"/>\n  <SpikeConfiguration categories=\"\">\n",
    );
    for (id, channels) in ntrodes {
        match channels {
            Some(channels) => {
                xml.push_str(&format!("    <SpikeNTrode id=\"{}\" lowFilter=\"600\">\n", id));
                for ch in channels {
                    xml.push_str(&format!(
                        "      <SpikeChannel hwChan=\"{}\" maxDisp=\"200\"/>\n",
                        ch
                    ));
                }
                xml.push_str("    </SpikeNTrode>\n");
            }
            None => xml.push_str(&format!("    <SpikeNTrode id=\"{}\" lowFilter=\"600\"/>\n", id)),
        }
    }
    xml.push_str("  </SpikeConfiguration>\n</Configuration>\n");
    xml
}

/// Two tetrodes followed by both shanks of a 32-channel probe, with
/// scrambled hardware channel numbers.
pub fn standard_ntrodes() -> Vec<(i64, Option<Vec<u32>>)> {
    vec![
        (1, Some(vec![35, 33, 34, 32])),
        (2, Some(vec![39, 37, 38, 36])),
        (3, Some((0..16).rev().collect())),
        (4, Some((16..32).map(|c| c * 2 % 32).collect())),
    ]
}

/// `.rec` content: header text followed by binary packet bytes.
pub fn rec_bytes(header: &str) -> Vec<u8> {
    let mut bytes = header.as_bytes().to_vec();
    bytes.extend_from_slice(&[0x55, 0x00, 0xff, 0x10, b'\n', 0xfe, 0x80]);
    bytes
}

pub fn write(path: &Path, contents: &[u8]) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, contents).unwrap();
}

/// A session with sleep/run/sleep epochs, one StateScript log and two videos.
#[allow(unused)]
pub fn standard_session(root: &Path) -> PathBuf {
    let dir = session_dir(root);
    let rec = rec_bytes(&header_xml(&standard_ntrodes()));
    for name in [
        "20200101_rat_01_s1.rec",
        "20200101_rat_02_r1.rec",
        "20200101_rat_03_s2.rec",
    ] {
        write(&dir.join(name), &rec);
    }
    write(&dir.join("20200101_rat_02_r1.stateScriptLog"), b"# log\n");
    write(&dir.join("20200101_rat_01_s1.1.h264"), b"");
    write(&dir.join("20200101_rat_02_r1.1.h264"), b"");
    dir
}
