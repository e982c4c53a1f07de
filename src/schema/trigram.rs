use serde::{Deserialize, Serialize};

/// One of the eight three-line figures. Two trigrams, lower and upper,
/// compose a hexagram.
///
/// The bit pattern of each trigram is fixed: it defines hexagram identity,
/// so it is not configurable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Trigram {
    /// 乾 ☰ heaven
    Qian,
    /// 兌 ☱ lake
    Dui,
    /// 離 ☲ fire
    Li,
    /// 震 ☳ thunder
    Zhen,
    /// 巽 ☴ wind
    Xun,
    /// 坎 ☵ water
    Kan,
    /// 艮 ☶ mountain
    Gen,
    /// 坤 ☷ earth
    Kun,
}

impl Trigram {
    pub const ALL: [Trigram; 8] = [
        Self::Qian,
        Self::Dui,
        Self::Li,
        Self::Zhen,
        Self::Xun,
        Self::Kan,
        Self::Gen,
        Self::Kun,
    ];

    /// Lines of the trigram, bottom line first (1 = yang, 0 = yin).
    pub fn lines(&self) -> [u8; 3] {
        match self {
            Self::Qian => [1, 1, 1],
            Self::Dui => [1, 1, 0],
            Self::Li => [1, 0, 1],
            Self::Zhen => [1, 0, 0],
            Self::Xun => [0, 1, 1],
            Self::Kan => [0, 1, 0],
            Self::Gen => [0, 0, 1],
            Self::Kun => [0, 0, 0],
        }
    }

    /// Lines packed into the low three bits, bottom line in bit 0.
    pub fn bits(&self) -> u8 {
        self.lines()
            .iter()
            .enumerate()
            .fold(0, |acc, (i, bit)| acc | (bit << i))
    }

    /// Inverse of [`Trigram::bits`]. Only the low three bits are read.
    pub fn from_bits(bits: u8) -> Trigram {
        let bits = bits & 0b111;
        Self::ALL
            .into_iter()
            .find(|t| t.bits() == bits)
            .unwrap_or(Self::Kun)
    }

    /// The trigram's own character: "乾", "坤", ...
    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Qian => "乾",
            Self::Dui => "兌",
            Self::Li => "離",
            Self::Zhen => "震",
            Self::Xun => "巽",
            Self::Kan => "坎",
            Self::Gen => "艮",
            Self::Kun => "坤",
        }
    }

    /// The natural image used in hexagram names: "天", "地", ...
    pub fn image(&self) -> &'static str {
        match self {
            Self::Qian => "天",
            Self::Dui => "澤",
            Self::Li => "火",
            Self::Zhen => "雷",
            Self::Xun => "風",
            Self::Kan => "水",
            Self::Gen => "山",
            Self::Kun => "地",
        }
    }

    pub fn pinyin(&self) -> &'static str {
        match self {
            Self::Qian => "qian",
            Self::Dui => "dui",
            Self::Li => "li",
            Self::Zhen => "zhen",
            Self::Xun => "xun",
            Self::Kan => "kan",
            Self::Gen => "gen",
            Self::Kun => "kun",
        }
    }

    /// Look up a trigram by symbol, image, or pinyin name.
    pub fn from_name(name: &str) -> Option<Trigram> {
        let name = name.trim();
        let lowered = name.to_lowercase();
        Self::ALL.into_iter().find(|t| {
            t.symbol() == name || t.image() == name || t.pinyin() == lowered
        })
    }
}
