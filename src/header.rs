//! Extraction of the XML configuration header from Trodes `.rec` files.
//!
//! A `.rec` file starts with the workspace configuration as plain XML text,
//! terminated by `</Configuration>`, followed by binary packet data. The
//! header is copied line by line, byte for byte, into
//! `<copy_dir>/<name>.rec_header.xml`. Text is treated as ISO-8859-1 so that
//! arbitrary bytes survive the copy.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::types::*;

/// Line that terminates the configuration header.
pub const CONFIG_END_MARKER: &str = "</Configuration>";

/// Upper bound on header lines copied when no end marker is found.
pub const DEFAULT_MAX_LINES: usize = 1000;

/// File name suffix appended to the `.rec` file name for extracted headers.
pub const HEADER_SUFFIX: &str = "_header.xml";

/// Decodes ISO-8859-1 bytes. Every byte maps to the code point of the same
/// value, so this never fails.
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Reads lines (each including its `\n`) until `max_lines` have been read,
/// a line contains `stop_marker`, or the input ends.
pub fn read_header_lines<R: BufRead>(
    reader: &mut R,
    max_lines: usize,
    stop_marker: Option<&str>,
) -> Result<Vec<Vec<u8>>> {
    let mut lines = Vec::new();
    let mut line = Vec::new();
    while lines.len() < max_lines {
        line.clear();
        if reader.read_until(b'\n', &mut line)? == 0 {
            break;
        }
        let stop = stop_marker.is_some_and(|m| decode_latin1(&line).contains(m));
        lines.push(line.clone());
        if stop {
            break;
        }
    }
    Ok(lines)
}

/// Copies the configuration header of one `.rec` file into `copy_dir`.
///
/// Returns the path of the written `.rec_header.xml` file.
pub fn copy_rec_header<P: AsRef<Path>, Q: AsRef<Path>>(
    rec_path: P,
    copy_dir: Q,
    max_lines: usize,
) -> Result<PathBuf> {
    let rec_path = rec_path.as_ref();
    let rec_filename = rec_path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if !rec_filename.ends_with(".rec") {
        return Err(MetadataError::NotRecFile(rec_path.to_path_buf()));
    }
    debug!("Input file: {}", rec_path.display());

    fs::create_dir_all(copy_dir.as_ref())?;
    let copy_path = copy_dir
        .as_ref()
        .join(format!("{}{}", rec_filename, HEADER_SUFFIX));

    let mut reader = BufReader::with_capacity(65536, File::open(rec_path)?);
    let lines = read_header_lines(&mut reader, max_lines, Some(CONFIG_END_MARKER))?;

    let mut writer = BufWriter::new(File::create(&copy_path)?);
    for line in &lines {
        writer.write_all(line)?;
    }
    writer.flush()?;

    debug!("Output file: {} ({} lines)", copy_path.display(), lines.len());
    Ok(copy_path)
}

/// Extracts headers from every `.rec` file into `copy_dir`.
pub fn extract_rec_headers<P: AsRef<Path>>(rec_files: &[PathBuf], copy_dir: P) -> Result<Vec<PathBuf>> {
    info!(
        "extracting {} rec header files into {}...",
        rec_files.len(),
        copy_dir.as_ref().display()
    );
    let mut written = Vec::with_capacity(rec_files.len());
    for rec_file in rec_files {
        written.push(copy_rec_header(rec_file, copy_dir.as_ref(), DEFAULT_MAX_LINES)?);
    }
    info!("done.");
    Ok(written)
}

/// Reads an XML header file as ISO-8859-1 text.
pub fn read_header_text<P: AsRef<Path>>(path: P) -> Result<String> {
    Ok(decode_latin1(&fs::read(path)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const REC: &[u8] = b"<?xml version=\"1.0\"?>\n<Configuration>\n  <GlobalConfiguration/>\n</Configuration>\n\x00\x01\xff\xfe binary";

    #[test]
    fn stops_at_marker() {
        let mut cursor = Cursor::new(REC);
        let lines = read_header_lines(&mut cursor, DEFAULT_MAX_LINES, Some(CONFIG_END_MARKER)).unwrap();
        assert_eq!(lines.len(), 4);
        assert_eq!(lines[3], b"</Configuration>\n");
    }

    #[test]
    fn stops_at_line_limit() {
        let mut cursor = Cursor::new(REC);
        let lines = read_header_lines(&mut cursor, 2, Some(CONFIG_END_MARKER)).unwrap();
        assert_eq!(lines.len(), 2);
    }

    #[test]
    fn latin1_keeps_high_bytes() {
        assert_eq!(decode_latin1(b"caf\xe9"), "caf\u{e9}");
    }

    #[test]
    fn copies_header_next_to_name() {
        let dir = tempfile::tempdir().unwrap();
        let rec = dir.path().join("20200101_rat_01_s1.rec");
        fs::write(&rec, REC).unwrap();

        let out = copy_rec_header(&rec, dir.path().join("copy"), DEFAULT_MAX_LINES).unwrap();
        assert_eq!(
            out.file_name().unwrap().to_string_lossy(),
            "20200101_rat_01_s1.rec_header.xml"
        );
        let text = read_header_text(&out).unwrap();
        assert!(text.ends_with("</Configuration>\n"));
        assert!(!text.contains("binary"));
    }

    #[test]
    fn refuses_other_extensions() {
        let dir = tempfile::tempdir().unwrap();
        let err = copy_rec_header(dir.path().join("x.txt"), dir.path(), 10).unwrap_err();
        assert!(matches!(err, MetadataError::NotRecFile(_)));
    }
}
