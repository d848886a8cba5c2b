//! Bidirectional mapping between coordinates and waveform file paths.
//!
//! An [`AddressCodec`] owns a directory root and a naming template with named
//! placeholders (`{chimney}`, `{connection}`, `{position}`, `{channel_index}`,
//! `{index}`, `{test}`) in arbitrary arrangement, rendered with `strfmt`. The
//! standard template reproduces file names like
//!
//! ```text
//! CHIMNEY_EW08_inprogress/HVwaveform_CH3_CHIMNEY_EW08_CONN_S12_POS_7_62.csv
//! ```
//!
//! [`parse_address`] is the inverse for any path produced with a compatible
//! template: it scans the `_`-separated file name for the marker tokens
//! (`CHIMNEY`, `CONN`, `POS`, `*WAVEFORM`/`CH<n>`, bare sample index),
//! reconstructs the full [`Coordinate`], and also recovers the template
//! itself, preserving unknown tokens verbatim so naming variants survive a
//! round trip.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::chimney::ChimneyId;
use crate::coordinate::{CableId, Coordinate, CHANNELS_PER_POSITION, MAX_POSITION, MIN_POSITION};
use crate::error::AddressingError;

/// Directory naming template for one chimney's campaign.
pub const STANDARD_DIRECTORY: &str = "CHIMNEY_{chimney}";

/// File naming template for one waveform.
pub const STANDARD_PATTERN: &str =
    "{test}waveform_CH{channel_index}_CHIMNEY_{chimney}_CONN_{connection}_POS_{position}_{index}.csv";

/// Suffix marking a campaign directory still being filled.
pub const IN_PROGRESS_SUFFIX: &str = "_inprogress";

fn render(template: &str, vars: &HashMap<String, String>) -> Result<String, AddressingError> {
    strfmt::strfmt(template, vars).map_err(|e| AddressingError::Template(e.to_string()))
}

fn coordinate_vars(coordinate: &Coordinate) -> HashMap<String, String> {
    HashMap::from([
        ("test".to_owned(), coordinate.test.clone()),
        ("chimney".to_owned(), coordinate.chimney.to_string()),
        ("connection".to_owned(), coordinate.connection.to_string()),
        ("position".to_owned(), coordinate.position.to_string()),
        (
            "channel_index".to_owned(),
            coordinate.channel_index.to_string(),
        ),
        ("index".to_owned(), coordinate.index.to_string()),
    ])
}

/// The final (archived) directory name for `chimney`.
pub fn directory_name(chimney: &ChimneyId) -> Result<String, AddressingError> {
    let vars = HashMap::from([("chimney".to_owned(), chimney.to_string())]);
    render(STANDARD_DIRECTORY, &vars)
}

/// The working directory name for `chimney`, with the in-progress suffix.
pub fn working_directory_name(chimney: &ChimneyId) -> Result<String, AddressingError> {
    Ok(format!("{}{}", directory_name(chimney)?, IN_PROGRESS_SUFFIX))
}

/// Renders coordinates into paths under a directory root.
#[derive(Debug, Clone)]
pub struct AddressCodec {
    root: PathBuf,
    pattern: String,
}

impl AddressCodec {
    /// A codec using `pattern` for files under `root`.
    pub fn new(root: impl Into<PathBuf>, pattern: impl Into<String>) -> Self {
        AddressCodec {
            root: root.into(),
            pattern: pattern.into(),
        }
    }

    /// A codec with the standard file pattern.
    pub fn standard(root: impl Into<PathBuf>) -> Self {
        Self::new(root, STANDARD_PATTERN)
    }

    /// The directory root paths are built under.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The file naming template.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Rebinds the codec to a different directory root.
    pub fn with_root(&self, root: impl Into<PathBuf>) -> Self {
        Self::new(root, self.pattern.clone())
    }

    /// The path of the waveform file for `coordinate`. Pure: same coordinate,
    /// same path.
    pub fn path_for(&self, coordinate: &Coordinate) -> Result<PathBuf, AddressingError> {
        let name = render(&self.pattern, &coordinate_vars(coordinate))?;
        Ok(self.root.join(name))
    }

    /// The `n` expected waveform paths for one channel of the coordinate's
    /// position, in ascending sample-index order.
    pub fn channel_paths(
        &self,
        coordinate: &Coordinate,
        channel_index: u32,
        n: u32,
    ) -> Result<Vec<PathBuf>, AddressingError> {
        let mut values = coordinate.clone();
        values.channel_index = channel_index;
        let first = Coordinate::first_index_of(values.position, n);
        (first..first + n)
            .map(|index| {
                values.index = index;
                self.path_for(&values)
            })
            .collect()
    }

    /// The `4n` expected waveform paths for the coordinate's position:
    /// per-channel blocks concatenated in ascending channel order.
    pub fn position_paths(
        &self,
        coordinate: &Coordinate,
        n: u32,
    ) -> Result<Vec<PathBuf>, AddressingError> {
        let mut paths = Vec::with_capacity((CHANNELS_PER_POSITION * n) as usize);
        for channel_index in 1..=CHANNELS_PER_POSITION {
            paths.extend(self.channel_paths(coordinate, channel_index, n)?);
        }
        Ok(paths)
    }
}

/// The result of parsing a waveform file path.
#[derive(Debug, Clone)]
pub struct ParsedAddress {
    /// The reconstructed coordinate, channel derived from position and index.
    pub coordinate: Coordinate,
    /// The recovered naming template, unknown tokens preserved verbatim.
    pub pattern: String,
    /// The directory part of the parsed path.
    pub dir: PathBuf,
}

impl ParsedAddress {
    /// A codec compatible with the parsed path.
    pub fn codec(&self) -> AddressCodec {
        AddressCodec::new(self.dir.clone(), self.pattern.clone())
    }
}

fn malformed(path: &Path, token: &str, reason: &str) -> AddressingError {
    AddressingError::MalformedAddress {
        path: path.to_owned(),
        token: token.to_owned(),
        reason: reason.to_owned(),
    }
}

/// Parses `path` back into the coordinate and template that produced it.
///
/// Fails with [`AddressingError::MalformedAddress`] when a marker token has
/// no value following it, a numeric token does not parse, or any of chimney,
/// connection, position, channel index and sample index is still missing
/// once the whole name has been scanned.
pub fn parse_address(path: &Path) -> Result<ParsedAddress, AddressingError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("")).to_owned();
    let file_name = path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| malformed(path, "", "path has no file name"))?;

    let (stem, extension) = match file_name.rfind('.') {
        Some(dot) => (&file_name[..dot], &file_name[dot..]),
        None => (file_name, ""),
    };
    if !extension.eq_ignore_ascii_case(".csv") {
        warn!(path = %path.display(), "file does not have a comma-separated values (.csv) name");
    }

    let mut test: Option<String> = None;
    let mut chimney: Option<ChimneyId> = None;
    let mut connection_text: Option<String> = None;
    let mut position: Option<u32> = None;
    let mut channel_index: Option<u32> = None;
    let mut index: Option<u32> = None;
    let mut pattern: Vec<String> = Vec::new();

    let tokens: Vec<&str> = stem.split('_').collect();
    let mut cursor = tokens.iter().peekable();
    while let Some(&token) = cursor.next() {
        let upper = token.to_uppercase();
        match upper.as_str() {
            "CHIMNEY" => {
                let value = cursor
                    .next()
                    .ok_or_else(|| malformed(path, token, "no chimney follows"))?;
                chimney = Some(ChimneyId::parse(value)?);
                pattern.push(token.to_owned());
                pattern.push("{chimney}".to_owned());
            }
            "CONN" => {
                let value = cursor
                    .next()
                    .ok_or_else(|| malformed(path, token, "no connection code follows"))?;
                connection_text = Some((*value).to_owned());
                pattern.push(token.to_owned());
                pattern.push("{connection}".to_owned());
            }
            "POS" => {
                let value = cursor
                    .next()
                    .ok_or_else(|| malformed(path, token, "no position follows"))?;
                let parsed: u32 = value
                    .parse()
                    .map_err(|_| malformed(path, value, "not a valid position"))?;
                if !(MIN_POSITION..=MAX_POSITION).contains(&parsed) {
                    return Err(malformed(path, value, "position out of range"));
                }
                position = Some(parsed);
                pattern.push(token.to_owned());
                pattern.push("{position}".to_owned());
            }
            _ if upper.ends_with("WAVEFORM") => {
                let prefix_len = token.len() - "WAVEFORM".len();
                test = Some(token[..prefix_len].to_owned());
                let value = cursor
                    .next()
                    .ok_or_else(|| malformed(path, token, "no channel follows"))?;
                let digits = value
                    .strip_prefix("CH")
                    .ok_or_else(|| malformed(path, value, "not a valid channel"))?;
                channel_index = Some(
                    digits
                        .parse()
                        .map_err(|_| malformed(path, value, "not a valid channel number"))?,
                );
                pattern.push(format!("{{test}}{}", &token[prefix_len..]));
                pattern.push("CH{channel_index}".to_owned());
            }
            _ => match token.parse::<u32>() {
                Ok(value) => {
                    index = Some(value);
                    pattern.push("{index}".to_owned());
                }
                Err(_) => {
                    warn!(token, path = %path.display(), "unexpected tag in file name");
                    pattern.push(token.to_owned());
                }
            },
        }
    }

    let chimney = chimney.ok_or_else(|| malformed(path, "chimney", "field missing"))?;
    let connection_text =
        connection_text.ok_or_else(|| malformed(path, "connection", "field missing"))?;
    let connection = CableId::parse(&connection_text, Some(&chimney))?;
    let position = position.ok_or_else(|| malformed(path, "position", "field missing"))?;
    let channel_index =
        channel_index.ok_or_else(|| malformed(path, "channel", "field missing"))?;
    let index = index.ok_or_else(|| malformed(path, "index", "field missing"))?;

    Ok(ParsedAddress {
        coordinate: Coordinate {
            test: test.unwrap_or_default(),
            chimney,
            connection,
            position,
            channel_index,
            index,
        },
        pattern: pattern.join("_") + extension,
        dir,
    })
}
