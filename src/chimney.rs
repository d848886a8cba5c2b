//! Chimney (detector module) identifiers and their naming styles.
//!
//! A chimney is identified by a row (series) and a number within the row.
//! The same physical chimney carries several equivalent textual names:
//!
//! - **geographic**: cryostat/side pairs `EE`, `EW`, `WE`, `WW` plus a number
//!   (e.g. `EW08`);
//! - **alphabetic**: a single row letter `A`–`D` plus a number (e.g. `B13`);
//! - **flange**: the special `F` series used for flange test setups.
//!
//! Conversion between styles is a three-step pipeline: parse the source
//! style, map onto the internal *standard* `(row letter, number)` form, and
//! reformat into the target style. Geographic and alphabetic are symmetric
//! bijections (20 chimneys per row, `EE↔A`, `EW↔B`, `WE↔C`, `WW↔D`, number
//! `n ↔ 21-n`). The flange style takes part in no conversion: converting into
//! or out of it fails with [`AddressingError::StyleNotConvertible`].

use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::AddressingError;

/// Number of chimneys in one row.
pub const CHIMNEYS_PER_ROW: u32 = 20;

static GEOGRAPHIC_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new("^([EW]{2})([0-9]+)$").expect("hard-coded pattern"));
static ALPHABETIC_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new("^([A-D])([0-9]+)$").expect("hard-coded pattern"));
static FLANGE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new("^(F)([0-9]+)$").expect("hard-coded pattern"));

/// One of the textual naming styles a chimney identifier can appear in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChimneyStyle {
    /// Cryostat/side naming (`EE`, `EW`, `WE`, `WW`).
    Geographic,
    /// Row-letter naming (`A`–`D`).
    Alphabetic,
    /// Flange test setups (`F`); not convertible.
    Flange,
}

impl ChimneyStyle {
    /// All styles, in the order they are tried when auto-detecting.
    pub const ALL: [ChimneyStyle; 3] = [
        ChimneyStyle::Geographic,
        ChimneyStyle::Alphabetic,
        ChimneyStyle::Flange,
    ];

    /// Lower-case style name, as used in messages and configuration.
    pub fn name(self) -> &'static str {
        match self {
            ChimneyStyle::Geographic => "geographic",
            ChimneyStyle::Alphabetic => "alphabetic",
            ChimneyStyle::Flange => "flange",
        }
    }

    fn pattern(self) -> &'static Regex {
        match self {
            ChimneyStyle::Geographic => &GEOGRAPHIC_PATTERN,
            ChimneyStyle::Alphabetic => &ALPHABETIC_PATTERN,
            ChimneyStyle::Flange => &FLANGE_PATTERN,
        }
    }

    /// Splits `text` into `(row, number)` if it is written in this style.
    pub fn split(self, text: &str) -> Option<(String, u32)> {
        let text = text.to_uppercase();
        let captures = self.pattern().captures(&text)?;
        let row = captures.get(1)?.as_str().to_owned();
        // leading zeros are allowed; an all-zero number reads as 0
        let number = captures.get(2)?.as_str().trim_start_matches('0');
        let number = if number.is_empty() {
            0
        } else {
            number.parse().ok()?
        };
        Some((row, number))
    }

    /// Maps `(row, number)` of this style onto the standard form.
    fn to_standard(self, row: &str, number: u32) -> Result<(String, u32), AddressingError> {
        match self {
            ChimneyStyle::Geographic => {
                let letter = match row {
                    "EE" => "A",
                    "EW" => "B",
                    "WE" => "C",
                    "WW" => "D",
                    other => return Err(AddressingError::InvalidChimney(other.to_owned())),
                };
                Ok((letter.to_owned(), CHIMNEYS_PER_ROW + 1 - number))
            }
            ChimneyStyle::Alphabetic => Ok((row.to_owned(), number)),
            ChimneyStyle::Flange => Err(AddressingError::StyleNotConvertible {
                style: self.name(),
                direction: "to",
            }),
        }
    }

    /// Maps the standard form back into `(row, number)` of this style.
    fn from_standard(self, row: &str, number: u32) -> Result<(String, u32), AddressingError> {
        match self {
            ChimneyStyle::Geographic => {
                let series = match row {
                    "A" => "EE",
                    "B" => "EW",
                    "C" => "WE",
                    "D" => "WW",
                    other => return Err(AddressingError::InvalidChimney(other.to_owned())),
                };
                Ok((series.to_owned(), CHIMNEYS_PER_ROW + 1 - number))
            }
            ChimneyStyle::Alphabetic => Ok((row.to_owned(), number)),
            ChimneyStyle::Flange => Err(AddressingError::StyleNotConvertible {
                style: self.name(),
                direction: "from",
            }),
        }
    }
}

/// A parsed chimney identifier, remembering the style it was written in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChimneyId {
    row: String,
    number: u32,
    style: ChimneyStyle,
}

impl ChimneyId {
    /// Parses `text`, auto-detecting the naming style.
    pub fn parse(text: &str) -> Result<Self, AddressingError> {
        for style in ChimneyStyle::ALL {
            if let Some((row, number)) = style.split(text) {
                return Ok(ChimneyId { row, number, style });
            }
        }
        Err(AddressingError::InvalidChimney(text.to_owned()))
    }

    /// Whether `text` is a well-formed chimney identifier in any style.
    pub fn is_chimney(text: &str) -> bool {
        Self::parse(text).is_ok()
    }

    /// The row (series) part, e.g. `"EW"` or `"B"`.
    pub fn row(&self) -> &str {
        &self.row
    }

    /// The number within the row.
    pub fn number(&self) -> u32 {
        self.number
    }

    /// The naming style this identifier is written in.
    pub fn style(&self) -> ChimneyStyle {
        self.style
    }

    /// Rewrites this identifier in `target` style.
    ///
    /// Converting a flange identifier to flange style is a no-op; any other
    /// conversion involving the flange style fails explicitly.
    pub fn convert_to(&self, target: ChimneyStyle) -> Result<ChimneyId, AddressingError> {
        if self.style == target {
            return Ok(self.clone());
        }
        let (row, number) = self.style.to_standard(&self.row, self.number)?;
        let (row, number) = target.from_standard(&row, number)?;
        Ok(ChimneyId {
            row,
            number,
            style: target,
        })
    }

    /// The cable tag letter for cables on this chimney.
    ///
    /// The tag depends on the series and on whether the chimney sits at an
    /// end of its row (positions 1 and 20 are wired differently). The lookup
    /// is applied in geographic style; flange chimneys always get `V`.
    pub fn cable_tag(&self) -> Result<char, AddressingError> {
        if self.style == ChimneyStyle::Flange {
            return Ok('V');
        }
        let geographic = self.convert_to(ChimneyStyle::Geographic)?;
        match geographic.row() {
            "EE" | "WE" => Ok(match geographic.number() {
                1 => 'D',
                20 => 'C',
                _ => 'V',
            }),
            "EW" | "WW" => Ok(match geographic.number() {
                1 => 'B',
                20 => 'A',
                _ => 'S',
            }),
            other => Err(AddressingError::NoCableTag(other.to_owned())),
        }
    }
}

impl fmt::Display for ChimneyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.row, self.number)
    }
}

impl FromStr for ChimneyId {
    type Err = AddressingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChimneyId::parse(s)
    }
}
