use crate::error::DslError;
use regex::Regex;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// `#NAME "..."` declaration on the first line of a DSL source.
fn name_decl_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"#NAME\s+"(.*)""#).unwrap())
}

/// A dictionary source decoded into memory: gunzipped (when dictzip) and
/// converted from UTF-16LE to a String with `\n` line endings.
#[derive(Debug, Clone)]
pub struct DictionarySource {
    path: PathBuf,
    text: String,
}

impl DictionarySource {
    /// Opens a `.dsl.dz` (gzip single-member archive) or plain `.dsl` file.
    /// Compression is detected by magic bytes, not extension.
    pub fn open(path: &Path) -> Result<DictionarySource, DslError> {
        let raw = std::fs::read(path)?;
        let bytes = if raw.starts_with(&GZIP_MAGIC) {
            let mut out = Vec::new();
            let mut gz = flate2::read::GzDecoder::new(raw.as_slice());
            gz.read_to_end(&mut out)
                .map_err(|e| DslError::CorruptArchive {
                    path: path.to_path_buf(),
                    reason: e.to_string(),
                })?;
            out
        } else {
            raw
        };

        // BOM sniffing built into encoding_rs: a UTF-16BE BOM overrides the
        // declared LE byte order, matching what real DSL tooling accepts.
        let (decoded, _, had_errors) = encoding_rs::UTF_16LE.decode(&bytes);
        if had_errors {
            return Err(DslError::EncodingError {
                path: path.to_path_buf(),
                encoding: "UTF-16LE",
            });
        }

        let text = decoded.replace("\r\n", "\n").replace('\r', "\n");
        Ok(DictionarySource {
            path: path.to_path_buf(),
            text,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Decoded lines, terminators stripped. The first line is the metadata
    /// line but is not excluded from scanning.
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.text.split('\n')
    }

    /// Display name from the `#NAME "..."` declaration on the first line,
    /// BOM stripped; falls back to the raw first line when the declaration
    /// is absent.
    pub fn display_name(&self) -> String {
        let first = self
            .lines()
            .next()
            .unwrap_or("")
            .trim_start_matches('\u{feff}')
            .trim();
        match name_decl_re().captures(first) {
            Some(c) => c[1].to_string(),
            None => first.to_string(),
        }
    }
}
