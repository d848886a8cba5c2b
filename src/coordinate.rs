//! The coordinate identifying one test unit of a campaign.
//!
//! A [`Coordinate`] names the waveform acquired as the `index`-th sample of
//! one scope channel, at one switch position of one cable of one chimney,
//! within one kind of test. It is the unit the sequencing, addressing and
//! verification layers all agree on.
//!
//! The scope channel number is never stored: `channel` is fully determined
//! by `(position, channel_index)` through
//! `channel = (position - 1) * CHANNELS_PER_POSITION + channel_index`,
//! so the two sides cannot drift apart.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::chimney::ChimneyId;
use crate::error::AddressingError;

/// Scope channels read at every switch position.
pub const CHANNELS_PER_POSITION: u32 = 4;
/// First switch position of a test box.
pub const MIN_POSITION: u32 = 1;
/// Last switch position of a test box.
pub const MAX_POSITION: u32 = 8;
/// First cable number on a chimney.
pub const MIN_CABLE: u32 = 1;
/// Last cable number on a chimney.
pub const MAX_CABLE: u32 = 18;

static CABLE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new("^([A-Z]?)([0-9]{1,2})$").expect("hard-coded pattern"));

/// A cable ("connection") on a chimney: tag letter plus number.
///
/// The tag letter is not independent information: it is derived from the
/// chimney through [`ChimneyId::cable_tag`]. It is kept here because file
/// names spell it out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CableId {
    tag: char,
    number: u32,
}

impl CableId {
    /// Builds a cable identifier for `number` on `chimney`, deriving the tag.
    pub fn for_chimney(chimney: &ChimneyId, number: u32) -> Result<Self, AddressingError> {
        Ok(CableId {
            tag: chimney.cable_tag()?,
            number,
        })
    }

    /// Parses a cable identifier such as `V12`.
    ///
    /// A bare number is accepted when `chimney` is given to derive the tag
    /// from; without a chimney it is an error.
    pub fn parse(text: &str, chimney: Option<&ChimneyId>) -> Result<Self, AddressingError> {
        let upper = text.to_uppercase();
        let captures = CABLE_PATTERN
            .captures(&upper)
            .ok_or_else(|| AddressingError::InvalidCable(text.to_owned()))?;
        let number = captures
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .ok_or_else(|| AddressingError::InvalidCable(text.to_owned()))?;
        let tag = match captures.get(1).map(|m| m.as_str()) {
            Some(tag) if !tag.is_empty() => tag.chars().next().unwrap_or('?'),
            _ => match chimney {
                Some(chimney) => chimney.cable_tag()?,
                None => return Err(AddressingError::CableNeedsChimney(text.to_owned())),
            },
        };
        Ok(CableId { tag, number })
    }

    /// The tag letter.
    pub fn tag(&self) -> char {
        self.tag
    }

    /// The cable number, in `MIN_CABLE..=MAX_CABLE`.
    pub fn number(&self) -> u32 {
        self.number
    }
}

impl fmt::Display for CableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:02}", self.tag, self.number)
    }
}

/// Identification of a single waveform acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coordinate {
    /// Test kind label; empty for the default (pulse) campaign.
    pub test: String,
    /// The chimney under test.
    pub chimney: ChimneyId,
    /// The cable under test.
    pub connection: CableId,
    /// Switch position, `MIN_POSITION..=MAX_POSITION`.
    pub position: u32,
    /// Scope channel within the position, `1..=CHANNELS_PER_POSITION`.
    pub channel_index: u32,
    /// Running sample index; `first_index_of(position, n)` for the first
    /// waveform of a position.
    pub index: u32,
}

impl Coordinate {
    /// The absolute channel number, derived from position and channel index.
    pub fn channel(&self) -> u32 {
        (self.position - 1) * CHANNELS_PER_POSITION + self.channel_index
    }

    /// Relocates to an absolute channel number, back-deriving position and
    /// channel index.
    pub fn set_channel(&mut self, channel: u32) {
        self.position = Self::position_of_channel(channel);
        self.channel_index = Self::index_of_channel(channel);
    }

    /// Resets `index` to the first sample index of the current position.
    pub fn set_first_index(&mut self, n: u32) {
        self.index = Self::first_index_of(self.position, n);
    }

    /// The sample index of the first waveform at `position`, for `n`
    /// waveforms per channel.
    pub fn first_index_of(position: u32, n: u32) -> u32 {
        (position - 1) * n + 1
    }

    /// The position owning an absolute channel number.
    pub fn position_of_channel(channel: u32) -> u32 {
        (channel - 1) / CHANNELS_PER_POSITION + 1
    }

    /// The within-position index of an absolute channel number.
    pub fn index_of_channel(channel: u32) -> u32 {
        (channel - 1) % CHANNELS_PER_POSITION + 1
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "chimney {} connection {} position {}",
            self.chimney, self.connection, self.position
        )?;
        if !self.test.is_empty() {
            write!(f, " ({} test)", self.test)?;
        }
        Ok(())
    }
}
