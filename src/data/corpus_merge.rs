// ============================================================
// Layer 4 — Corpus Merge
// ============================================================
// Zips a title file and a content file, line by line, into one
// summarisation corpus:
//
//   titles.txt      contents.txt          merged.tsv
//   A               x              ──▶    A!=!x
//   B               y                     B!=!y
//
// Both inputs must have the same number of lines unless the
// caller explicitly asks for truncation.

use std::{
    fmt,
    fs,
    io::{BufRead, BufReader, BufWriter, Write},
    path::Path,
    str::FromStr,
};

use crate::domain::error::{ReaderError, Result};

pub const FIELD_DELIMITER: &str = "!=!";

/// Behaviour when the title and content files differ in length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MismatchPolicy {
    /// Refuse to write anything
    #[default]
    Fail,
    /// Pair lines up to the shorter file and drop the rest
    Truncate,
}

impl FromStr for MismatchPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fail"     => Ok(Self::Fail),
            "truncate" => Ok(Self::Truncate),
            other      => Err(format!("unknown mismatch policy '{other}' (expected fail|truncate)")),
        }
    }
}

impl fmt::Display for MismatchPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fail     => f.write_str("fail"),
            Self::Truncate => f.write_str("truncate"),
        }
    }
}

/// Render `title!=!content\n` for every pair, in input order.
pub fn merge_lines(titles: &[String], contents: &[String], policy: MismatchPolicy) -> Result<String> {
    if titles.len() != contents.len() {
        match policy {
            MismatchPolicy::Fail => {
                return Err(ReaderError::LengthMismatch {
                    titles:   titles.len(),
                    contents: contents.len(),
                });
            }
            MismatchPolicy::Truncate => tracing::warn!(
                "Title/content line counts differ ({} vs {}); keeping the first {}",
                titles.len(),
                contents.len(),
                titles.len().min(contents.len()),
            ),
        }
    }

    let mut out = String::new();
    for (title, content) in titles.iter().zip(contents) {
        out.push_str(title);
        out.push_str(FIELD_DELIMITER);
        out.push_str(content);
        out.push('\n');
    }
    Ok(out)
}

/// Merge `tgt` (titles) with `src` (contents) into `out`.
/// Returns the number of records written.
pub fn merge_files(src: &Path, tgt: &Path, out: &Path, policy: MismatchPolicy) -> Result<usize> {
    let contents = read_lines(src)?;
    let titles   = read_lines(tgt)?;
    let merged   = merge_lines(&titles, &contents, policy)?;

    let file = fs::File::create(out).map_err(|e| ReaderError::io(out, e))?;
    let mut writer = BufWriter::new(file);
    writer
        .write_all(merged.as_bytes())
        .and_then(|_| writer.flush())
        .map_err(|e| ReaderError::io(out, e))?;

    let written = titles.len().min(contents.len());
    tracing::info!("Wrote {} records to '{}'", written, out.display());
    Ok(written)
}

/// Lines of a UTF-8 file with `\n` / `\r\n` stripped.
fn read_lines(path: &Path) -> Result<Vec<String>> {
    let file = fs::File::open(path).map_err(|e| ReaderError::io(path, e))?;
    BufReader::new(file)
        .lines()
        .collect::<std::io::Result<Vec<_>>>()
        .map_err(|e| ReaderError::io(path, e))
}
