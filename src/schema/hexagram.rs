use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::trigram::Trigram;

/// Caller errors for out-of-range identifiers. These are never clamped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("hexagram number {0} is outside 1..=64")]
    InvalidHexagram(u32),
    #[error("line position {0} is outside 1..=6")]
    InvalidLine(u32),
    #[error("unknown yao name: {0}")]
    UnknownYaoName(String),
    #[error("line bit {0} is not 0 or 1")]
    InvalidLineBit(u8),
    #[error("line pattern {0:#b} has more than six lines")]
    InvalidPattern(u8),
}

/// King Wen number of a hexagram, always within 1..=64.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct HexagramId(u8);

impl HexagramId {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 64;
    /// 乾為天, the first hexagram in King Wen order.
    pub const FIRST: HexagramId = HexagramId(1);

    pub fn new(number: u32) -> Result<Self, PositionError> {
        if (Self::MIN as u32..=Self::MAX as u32).contains(&number) {
            Ok(Self(number as u8))
        } else {
            Err(PositionError::InvalidHexagram(number))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    /// Number from a zero-based index; only the low six bits are read.
    pub(crate) fn from_index(index: u8) -> Self {
        Self((index & 0b11_1111) + 1)
    }

    /// Every hexagram in King Wen order.
    pub fn all() -> impl Iterator<Item = HexagramId> {
        (Self::MIN..=Self::MAX).map(HexagramId)
    }
}

impl TryFrom<u32> for HexagramId {
    type Error = PositionError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<HexagramId> for u32 {
    fn from(id: HexagramId) -> u32 {
        id.0 as u32
    }
}

impl fmt::Display for HexagramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A line position, 1 (bottom) through 6 (top).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct LinePosition(u8);

impl LinePosition {
    pub const BOTTOM: LinePosition = LinePosition(1);
    pub const TOP: LinePosition = LinePosition(6);
    pub const ALL: [LinePosition; 6] = [
        LinePosition(1),
        LinePosition(2),
        LinePosition(3),
        LinePosition(4),
        LinePosition(5),
        LinePosition(6),
    ];

    pub fn new(position: u32) -> Result<Self, PositionError> {
        if (1..=6).contains(&position) {
            Ok(Self(position as u8))
        } else {
            Err(PositionError::InvalidLine(position))
        }
    }

    pub fn get(&self) -> u8 {
        self.0
    }

    /// Zero-based index into a bottom-first line array.
    pub fn index(&self) -> usize {
        (self.0 - 1) as usize
    }

    /// The next line upward, or `None` at the top line.
    pub fn next(&self) -> Option<LinePosition> {
        if self.0 < 6 {
            Some(LinePosition(self.0 + 1))
        } else {
            None
        }
    }

    pub fn all() -> impl Iterator<Item = LinePosition> {
        Self::ALL.into_iter()
    }

    /// Parse a classical line name such as "初九" or "六二".
    pub fn from_yao_name(name: &str) -> Result<Self, PositionError> {
        let position = match name.trim() {
            "初九" | "初六" => 1,
            "九二" | "六二" => 2,
            "九三" | "六三" => 3,
            "九四" | "六四" => 4,
            "九五" | "六五" => 5,
            "上九" | "上六" => 6,
            other => return Err(PositionError::UnknownYaoName(other.to_string())),
        };
        Ok(Self(position))
    }
}

impl TryFrom<u32> for LinePosition {
    type Error = PositionError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LinePosition> for u32 {
    fn from(line: LinePosition) -> u32 {
        line.0 as u32
    }
}

impl fmt::Display for LinePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Six lines packed bottom-first: bit 0 is line 1, bit 5 is line 6.
/// The lower trigram occupies bits 0..=2, the upper trigram bits 3..=5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct LinePattern(u8);

impl LinePattern {
    pub const MAX_MASK: u8 = 0b11_1111;

    pub fn new(mask: u8) -> Result<Self, PositionError> {
        if mask <= Self::MAX_MASK {
            Ok(Self(mask))
        } else {
            Err(PositionError::InvalidPattern(mask))
        }
    }

    pub fn from_trigrams(lower: Trigram, upper: Trigram) -> Self {
        Self(lower.bits() | (upper.bits() << 3))
    }

    /// Build from a bottom-first bit array of 0 (yin) and 1 (yang).
    pub fn from_lines(lines: [u8; 6]) -> Result<Self, PositionError> {
        let mut mask = 0;
        for (i, bit) in lines.iter().enumerate() {
            match bit {
                0 => {}
                1 => mask |= 1 << i,
                other => return Err(PositionError::InvalidLineBit(*other)),
            }
        }
        Ok(Self(mask))
    }

    /// Bottom-first bit array.
    pub fn lines(&self) -> [u8; 6] {
        let mut out = [0u8; 6];
        for (i, slot) in out.iter_mut().enumerate() {
            *slot = (self.0 >> i) & 1;
        }
        out
    }

    pub fn mask(&self) -> u8 {
        self.0
    }

    pub fn is_yang(&self, line: LinePosition) -> bool {
        (self.0 >> line.index()) & 1 == 1
    }

    /// The same pattern with one line's polarity flipped.
    pub fn flip(&self, line: LinePosition) -> Self {
        Self(self.0 ^ (1 << line.index()))
    }

    pub fn lower(&self) -> Trigram {
        Trigram::from_bits(self.0)
    }

    pub fn upper(&self) -> Trigram {
        Trigram::from_bits(self.0 >> 3)
    }
}

impl TryFrom<u8> for LinePattern {
    type Error = PositionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<LinePattern> for u8 {
    fn from(pattern: LinePattern) -> u8 {
        pattern.0
    }
}

impl fmt::Display for LinePattern {
    /// Bottom-first digits, e.g. "111000" for 地天泰.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for bit in self.lines() {
            write!(f, "{}", bit)?;
        }
        Ok(())
    }
}

/// Classical name of a line within a hexagram: 九 marks yang and 六 yin;
/// the bottom and top lines are 初 and 上.
pub fn yao_name(pattern: LinePattern, line: LinePosition) -> String {
    let polarity = if pattern.is_yang(line) { "九" } else { "六" };
    match line.get() {
        1 => format!("初{}", polarity),
        6 => format!("上{}", polarity),
        n => {
            let ordinal = ["二", "三", "四", "五"][(n - 2) as usize];
            format!("{}{}", polarity, ordinal)
        }
    }
}

/// A (hexagram, line) state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub hexagram: HexagramId,
    pub line: LinePosition,
}

impl Position {
    pub fn new(hexagram: u32, line: u32) -> Result<Self, PositionError> {
        Ok(Self {
            hexagram: HexagramId::new(hexagram)?,
            line: LinePosition::new(line)?,
        })
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.hexagram, self.line)
    }
}
