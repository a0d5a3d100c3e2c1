//! Scalar field codecs.
//!
//! Every value FSD puts on the wire has a mandated ASCII shape: coordinates
//! carry exactly five decimal places, frequencies drop the leading `1` of
//! the 100-MHz band, pitch/bank/heading travel bit-packed in one unsigned
//! integer. Encoders here are the single source of those shapes; decoders
//! are permissive and report [`FieldError`] instead of panicking so callers
//! can drop a malformed field and move on.

use crate::error::FieldError;

// ── Numeric tokens ─────────────────────────────────────────────────

pub(crate) fn parse_u32(tok: &str) -> Result<u32, FieldError> {
    tok.trim()
        .parse()
        .map_err(|_| FieldError::InvalidNumber(tok.to_string()))
}

pub(crate) fn parse_u16(tok: &str) -> Result<u16, FieldError> {
    tok.trim()
        .parse()
        .map_err(|_| FieldError::InvalidNumber(tok.to_string()))
}

pub(crate) fn parse_i32(tok: &str) -> Result<i32, FieldError> {
    tok.trim()
        .parse()
        .map_err(|_| FieldError::InvalidNumber(tok.to_string()))
}

pub(crate) fn parse_hex_u32(tok: &str) -> Result<u32, FieldError> {
    u32::from_str_radix(tok.trim(), 16).map_err(|_| FieldError::InvalidNumber(tok.to_string()))
}

// ── Coordinates ────────────────────────────────────────────────────

/// Latitude/longitude on the wire: fixed five decimal places.
pub fn encode_coordinate(deg: f64) -> String {
    format!("{deg:.5}")
}

/// Coordinates are parsed free-form; peers are not required to send five
/// decimals back.
pub fn parse_coordinate(tok: &str) -> Result<f64, FieldError> {
    tok.trim()
        .parse()
        .map_err(|_| FieldError::InvalidNumber(tok.to_string()))
}

// ── Pitch / bank / heading packing ─────────────────────────────────
//
// Layout of the packed word, high to low:
//
//   bits 31..22  pitch, sign-inverted, 10-bit two's complement, 1024/360 deg
//   bits 21..12  bank, same treatment
//   bits 11..2   heading, normalized to [0, 360), 1024/360 deg
//   bit  1       unused
//   bit  0       on-ground flag

const PBH_FIELD_MASK: u32 = 0x3FF;
const PBH_SCALE: f64 = 1024.0 / 360.0;

/// Pack pitch/bank/heading (degrees) and the on-ground flag into the wire
/// integer. Zero pitch and bank encode as a zero field, so they survive a
/// round trip exactly.
pub fn pack_pbh(pitch_deg: f64, bank_deg: f64, heading_deg: f64, on_ground: bool) -> u32 {
    let pitch = ((-pitch_deg * PBH_SCALE).round() as i32 as u32) & PBH_FIELD_MASK;
    let bank = ((-bank_deg * PBH_SCALE).round() as i32 as u32) & PBH_FIELD_MASK;
    let heading = ((heading_deg.rem_euclid(360.0) * PBH_SCALE).round() as u32) & PBH_FIELD_MASK;
    (pitch << 22) | (bank << 12) | (heading << 2) | u32::from(on_ground)
}

/// Inverse of [`pack_pbh`]: (pitch, bank, heading, on_ground) in degrees.
pub fn unpack_pbh(packed: u32) -> (f64, f64, f64, bool) {
    let pitch = sign_extend_10((packed >> 22) & PBH_FIELD_MASK);
    let bank = sign_extend_10((packed >> 12) & PBH_FIELD_MASK);
    let heading = ((packed >> 2) & PBH_FIELD_MASK) as f64 / PBH_SCALE;
    (
        -(f64::from(pitch)) / PBH_SCALE,
        -(f64::from(bank)) / PBH_SCALE,
        heading,
        packed & 1 == 1,
    )
}

fn sign_extend_10(field: u32) -> i32 {
    if field & 0x200 != 0 {
        (field | !PBH_FIELD_MASK) as i32
    } else {
        field as i32
    }
}

// ── Frequencies ────────────────────────────────────────────────────

/// VHF frequency token: kHz with the 100-MHz floor dropped, zero-padded to
/// five digits. 128.200 MHz (128200 kHz) becomes `"28200"`.
pub fn encode_frequency_khz(khz: u32) -> Result<String, FieldError> {
    let offset = khz
        .checked_sub(100_000)
        .ok_or(FieldError::FrequencyOutOfBand(khz))?;
    Ok(format!("{offset:05}"))
}

/// Inverse of [`encode_frequency_khz`].
pub fn parse_frequency_khz(tok: &str) -> Result<u32, FieldError> {
    Ok(parse_u32(tok)? + 100_000)
}

// ── Enumerated fields ──────────────────────────────────────────────

/// Network (controller) rating, also sent in pilot logins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum AtcRating {
    Observer = 1,
    Student1 = 2,
    Student2 = 3,
    Student3 = 4,
    Controller1 = 5,
    Controller2 = 6,
    Controller3 = 7,
    Instructor1 = 8,
    Instructor2 = 9,
    Instructor3 = 10,
    Supervisor = 11,
    Administrator = 12,
}

impl AtcRating {
    pub fn to_wire(self) -> u8 {
        self as u8
    }

    pub fn from_wire(v: u8) -> Result<Self, FieldError> {
        use AtcRating::*;
        Ok(match v {
            1 => Observer,
            2 => Student1,
            3 => Student2,
            4 => Student3,
            5 => Controller1,
            6 => Controller2,
            7 => Controller3,
            8 => Instructor1,
            9 => Instructor2,
            10 => Instructor3,
            11 => Supervisor,
            12 => Administrator,
            other => {
                return Err(FieldError::UnknownValue {
                    what: "ATC rating",
                    value: other.to_string(),
                });
            }
        })
    }
}

/// Pilot certificate rating, carried in the pilot position message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PilotRating {
    Student = 1,
    Vfr = 2,
    Ifr = 3,
    Instructor = 4,
    Supervisor = 5,
}

impl PilotRating {
    pub fn to_wire(self) -> u8 {
        self as u8
    }

    pub fn from_wire(v: u8) -> Result<Self, FieldError> {
        use PilotRating::*;
        Ok(match v {
            1 => Student,
            2 => Vfr,
            3 => Ifr,
            4 => Instructor,
            5 => Supervisor,
            other => {
                return Err(FieldError::UnknownValue {
                    what: "pilot rating",
                    value: other.to_string(),
                });
            }
        })
    }
}

/// ATC facility class in the `%` position message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FacilityType {
    Observer = 0,
    FlightService = 1,
    Delivery = 2,
    Ground = 3,
    Tower = 4,
    Approach = 5,
    Center = 6,
}

impl FacilityType {
    pub fn to_wire(self) -> u8 {
        self as u8
    }

    pub fn from_wire(v: u8) -> Result<Self, FieldError> {
        use FacilityType::*;
        Ok(match v {
            0 => Observer,
            1 => FlightService,
            2 => Delivery,
            3 => Ground,
            4 => Tower,
            5 => Approach,
            6 => Center,
            other => {
                return Err(FieldError::UnknownValue {
                    what: "facility type",
                    value: other.to_string(),
                });
            }
        })
    }
}

/// Transponder mode letter at the head of the pilot position message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransponderMode {
    Standby,
    ModeC,
    Ident,
}

impl TransponderMode {
    pub fn to_wire(self) -> &'static str {
        match self {
            TransponderMode::Standby => "S",
            TransponderMode::ModeC => "N",
            TransponderMode::Ident => "Y",
        }
    }

    pub fn from_wire(tok: &str) -> Result<Self, FieldError> {
        match tok {
            "S" => Ok(TransponderMode::Standby),
            "N" => Ok(TransponderMode::ModeC),
            "Y" => Ok(TransponderMode::Ident),
            other => Err(FieldError::UnknownValue {
                what: "transponder mode",
                value: other.to_string(),
            }),
        }
    }
}

/// Client protocol revision: one wire token, `major * 100 + minor`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProtocolVersion {
    pub major: u8,
    pub minor: u8,
}

impl ProtocolVersion {
    /// The revision this crate speaks.
    pub const CURRENT: ProtocolVersion = ProtocolVersion { major: 1, minor: 1 };

    pub fn to_wire(self) -> u16 {
        u16::from(self.major) * 100 + u16::from(self.minor)
    }

    pub fn from_wire(v: u16) -> Self {
        ProtocolVersion {
            major: (v / 100) as u8,
            minor: (v % 100) as u8,
        }
    }
}
