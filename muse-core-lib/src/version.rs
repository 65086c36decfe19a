//! Parser for the ASCII handshake line a headset sends when a link comes up.
//!
//! ```text
//! MUSE APP HW-0.0 FW-0.0.0 BL-0.0.0 FW_BUILD-0 FW_TARGET_HW-0.0 FW_TYPE- PROTO-2\n
//! ```
//!
//! Fields appear in a fixed order separated by single spaces and the line ends
//! with `\n` or `\r`. Each call is independent: the record is built on the
//! stack and only handed out once the whole line has parsed.

use std::fmt;

use strum_macros::Display;
use tracing::{trace, warn};

use crate::error::{DecodeError, DecodeResult};
use crate::numeric::parse_u16;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Token every version line starts with.
pub const MUSE_TOKEN: &[u8] = b"MUSE ";

/// The only protocol revision this crate speaks.
pub const SUPPORTED_PROTOCOL: u16 = 2;

/// Shortest well-formed version line (without its terminator).
pub const MUSE_MINVER: &str = "MUSE APP HW-0.0 FW-0.0.0 BL-0.0.0 FW_BUILD-0 FW_TARGET_HW-0.0 FW_TYPE- PROTO-2";

/// Longest version line the firmware is known to emit (without its terminator).
pub const MUSE_MAXVER: &str = "MUSE TEST HW-255.255 FW-255.255.255 BL-255.255.255 FW_BUILD-65535 \
                               FW_TARGET_HW-255.255 FW_TYPE-research PROTO-2";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ImageType {
    #[default]
    #[strum(to_string = "UNKNOWN")]
    Unknown,
    #[strum(to_string = "BOOT")]
    Boot,
    #[strum(to_string = "APP")]
    App,
    #[strum(to_string = "TEST")]
    Test,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum FirmwareType {
    #[default]
    #[strum(to_string = "")]
    Unknown,
    #[strum(to_string = "consumer")]
    Consumer,
    #[strum(to_string = "research")]
    Research,
}

/// Three-component version. Hardware versions are sent as `x.y` and stored
/// with `patch` set to 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct VersionNumber {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl VersionNumber {
    pub const fn new(major: u16, minor: u16, patch: u16) -> Self {
        Self { major, minor, patch }
    }
}

impl fmt::Display for VersionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// Firmware and hardware descriptor announced by the headset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MuseVersion {
    pub image_type: ImageType,
    pub hw_version: VersionNumber,
    pub fw_version: VersionNumber,
    pub bl_version: VersionNumber,
    pub build_number: u16,
    pub target_hw_version: VersionNumber,
    pub fw_type: FirmwareType,
}

impl fmt::Display for MuseVersion {
    /// Renders the canonical handshake line, without a terminator.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "MUSE {} HW-{}.{} FW-{} BL-{} FW_BUILD-{} FW_TARGET_HW-{}.{} FW_TYPE-{} PROTO-{}",
            self.image_type,
            self.hw_version.major,
            self.hw_version.minor,
            self.fw_version,
            self.bl_version,
            self.build_number,
            self.target_hw_version.major,
            self.target_hw_version.minor,
            self.fw_type,
            SUPPORTED_PROTOCOL,
        )
    }
}

/// Offset of a possible version line in `buf`.
///
/// A complete `"MUSE "` token wins. Otherwise a trailing partial token (such
/// as `"MU"` at the very end) is reported, so the caller can keep those bytes
/// until the rest of the line arrives.
pub fn find_start(buf: &[u8]) -> Option<usize> {
    if let Some(pos) = buf.windows(MUSE_TOKEN.len()).position(|w| w == MUSE_TOKEN) {
        return Some(pos);
    }
    let tail = buf.len().saturating_sub(MUSE_TOKEN.len() - 1);
    (tail..buf.len()).find(|&i| MUSE_TOKEN.starts_with(&buf[i..]))
}

/// Parses the version line at the front of `buf`.
///
/// On success the bytes consumed include the line terminator. `NeedMoreData`
/// is returned whenever the buffer ends before a field can be confirmed, even
/// if what is visible so far would later turn out malformed.
pub fn parse_version(buf: &[u8]) -> DecodeResult<MuseVersion> {
    let mut parser = VersionParser { buf, pos: 0 };
    let result = parser.line().map(|version| (version, parser.pos));
    if let Err(error) = &result {
        trace!(len = buf.len(), at = parser.pos, %error, "version line not parsed");
    }
    result
}

struct VersionParser<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl VersionParser<'_> {
    fn rest(&self) -> &[u8] {
        &self.buf[self.pos..]
    }

    fn peek(&self) -> Result<u8, DecodeError> {
        self.rest().first().copied().ok_or(DecodeError::NeedMoreData)
    }

    /// Matches `lit` exactly. A buffer too short to hold all of it is
    /// `NeedMoreData` before any byte is compared.
    fn literal(&mut self, lit: &[u8], what: &'static str) -> Result<(), DecodeError> {
        let rest = self.rest();
        if rest.len() < lit.len() {
            return Err(DecodeError::NeedMoreData);
        }
        if &rest[..lit.len()] != lit {
            return Err(DecodeError::BadString(what));
        }
        self.pos += lit.len();
        Ok(())
    }

    fn number(&mut self) -> Result<u16, DecodeError> {
        let (value, used) = parse_u16(self.rest())?;
        self.pos += used;
        Ok(value)
    }

    /// `<label>-`, preceded by the single space separating it from the
    /// previous field.
    fn label(&mut self, label: &'static [u8], what: &'static str) -> Result<(), DecodeError> {
        self.literal(b" ", "missing field separator")?;
        self.literal(label, what)?;
        self.literal(b"-", "missing '-' after field label")
    }

    fn version_xy(&mut self) -> Result<VersionNumber, DecodeError> {
        let major = self.number()?;
        self.literal(b".", "missing '.' in version")?;
        let minor = self.number()?;
        Ok(VersionNumber::new(major, minor, 0))
    }

    fn version_xyz(&mut self) -> Result<VersionNumber, DecodeError> {
        let VersionNumber { major, minor, .. } = self.version_xy()?;
        self.literal(b".", "missing '.' in version")?;
        let patch = self.number()?;
        Ok(VersionNumber::new(major, minor, patch))
    }

    fn image_type(&mut self) -> Result<ImageType, DecodeError> {
        let (rest, image_type) = match self.peek()? {
            b'A' => (&b"PP "[..], ImageType::App),
            b'B' => (&b"OOT "[..], ImageType::Boot),
            b'T' => (&b"EST "[..], ImageType::Test),
            _ => return Err(DecodeError::BadString("unknown image type")),
        };
        self.pos += 1;
        self.literal(rest, "unknown image type")?;
        Ok(image_type)
    }

    fn fw_type(&mut self) -> Result<FirmwareType, DecodeError> {
        match self.peek()? {
            b' ' => Ok(FirmwareType::Unknown),
            b'c' => {
                self.pos += 1;
                self.literal(b"onsumer", "unknown firmware type")?;
                Ok(FirmwareType::Consumer)
            }
            b'r' => {
                self.pos += 1;
                self.literal(b"esearch", "unknown firmware type")?;
                Ok(FirmwareType::Research)
            }
            _ => {
                // Unrecognised types are skipped as an opaque lowercase word.
                self.pos += 1;
                let run = self.rest().iter().take_while(|b| b.is_ascii_lowercase()).count();
                self.pos += run;
                if self.pos == self.buf.len() {
                    return Err(DecodeError::NeedMoreData);
                }
                Ok(FirmwareType::Unknown)
            }
        }
    }

    fn line(&mut self) -> Result<MuseVersion, DecodeError> {
        self.literal(MUSE_TOKEN, "missing MUSE token")?;
        let image_type = self.image_type()?;

        self.literal(b"HW-", "expected HW field")?;
        let hw_version = self.version_xy()?;
        self.label(b"FW", "expected FW field")?;
        let fw_version = self.version_xyz()?;
        self.label(b"BL", "expected BL field")?;
        let bl_version = self.version_xyz()?;
        self.label(b"FW_BUILD", "expected FW_BUILD field")?;
        let build_number = self.number()?;
        self.label(b"FW_TARGET_HW", "expected FW_TARGET_HW field")?;
        let target_hw_version = self.version_xy()?;
        self.label(b"FW_TYPE", "expected FW_TYPE field")?;
        let fw_type = self.fw_type()?;
        self.label(b"PROTO", "expected PROTO field")?;
        let proto = self.number()?;

        match self.peek()? {
            b'\n' | b'\r' => self.pos += 1,
            _ => return Err(DecodeError::BadString("version line not terminated")),
        }
        if proto != SUPPORTED_PROTOCOL {
            warn!(proto, "headset speaks an unsupported protocol");
            return Err(DecodeError::BadVersion(proto));
        }

        Ok(MuseVersion {
            image_type,
            hw_version,
            fw_version,
            bl_version,
            build_number,
            target_hw_version,
            fw_type,
        })
    }
}
