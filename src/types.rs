//! Host storage formats.
//!
//! XMLSERVICE and DB2JSON both describe a scalar parameter with a compact
//! `<length><category><scale>` string: `10a` is CHAR(10), `3u0` an unsigned
//! 1-byte integer, `12p2` DECIMAL(12,2), `12s2` NUMERIC(12,2), `8f4` a
//! double, `9b` nine bytes of binary. [`HostType`] is the single source of
//! that string; it is rendered from the category plus its length/scale
//! fields and never stored independently.

use std::fmt;

/// Width marker for varying-length character fields.
///
/// Rendered as the XMLSERVICE `varying='on|2|4'` attribute; the JSON wire
/// format carries no varying marker (the length prefix is implied host-side).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Varying {
    On,
    Two,
    Four,
}

impl fmt::Display for Varying {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Varying::On => write!(f, "on"),
            Varying::Two => write!(f, "2"),
            Varying::Four => write!(f, "4"),
        }
    }
}

/// One host scalar category with the fields its kind needs.
///
/// Category letters on the wire: `a` character, `i` signed integer,
/// `u` unsigned integer, `f` float, `p` packed decimal (unsigned),
/// `s` zoned decimal (signed), `b` binary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostType {
    /// Fixed character data, `<len>a`.
    Char { length: u32 },
    /// Integer, `<len>i0` signed or `<len>u0` unsigned. The scale digit is
    /// always zero.
    Int { length: u32, signed: bool },
    /// Floating point, `<len>f<precision>`.
    Float { length: u32, precision: u32 },
    /// Packed decimal, `<len>p<scale>`.
    Packed { length: u32, scale: u32 },
    /// Zoned (signed) decimal, `<len>s<scale>`.
    Zoned { length: u32, scale: u32 },
    /// Raw binary, `<len>b`. Values travel hex-encoded.
    Binary { length: u32 },
}

impl HostType {
    pub fn char(length: u32) -> Self {
        HostType::Char { length }
    }

    pub fn int(length: u32) -> Self {
        HostType::Int {
            length,
            signed: true,
        }
    }

    pub fn uint(length: u32) -> Self {
        HostType::Int {
            length,
            signed: false,
        }
    }

    pub fn float(length: u32, precision: u32) -> Self {
        HostType::Float { length, precision }
    }

    pub fn packed(length: u32, scale: u32) -> Self {
        HostType::Packed { length, scale }
    }

    pub fn zoned(length: u32, scale: u32) -> Self {
        HostType::Zoned { length, scale }
    }

    pub fn binary(length: u32) -> Self {
        HostType::Binary { length }
    }
}

impl fmt::Display for HostType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HostType::Char { length } => write!(f, "{}a", length),
            HostType::Int { length, signed } => {
                write!(f, "{}{}0", length, if signed { 'i' } else { 'u' })
            }
            HostType::Float { length, precision } => write!(f, "{}f{}", length, precision),
            HostType::Packed { length, scale } => write!(f, "{}p{}", length, scale),
            HostType::Zoned { length, scale } => write!(f, "{}s{}", length, scale),
            HostType::Binary { length } => write!(f, "{}b", length),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_format() {
        assert_eq!(HostType::char(10).to_string(), "10a");
        assert_eq!(HostType::char(32767).to_string(), "32767a");
    }

    #[test]
    fn integer_formats() {
        assert_eq!(HostType::int(3).to_string(), "3i0");
        assert_eq!(HostType::int(10).to_string(), "10i0");
        assert_eq!(HostType::uint(3).to_string(), "3u0");
        assert_eq!(HostType::uint(20).to_string(), "20u0");
    }

    #[test]
    fn decimal_formats() {
        assert_eq!(HostType::packed(12, 2).to_string(), "12p2");
        assert_eq!(HostType::packed(7, 4).to_string(), "7p4");
        assert_eq!(HostType::zoned(12, 2).to_string(), "12s2");
        assert_eq!(HostType::zoned(9, 0).to_string(), "9s0");
    }

    #[test]
    fn float_and_binary_formats() {
        assert_eq!(HostType::float(4, 2).to_string(), "4f2");
        assert_eq!(HostType::float(8, 4).to_string(), "8f4");
        assert_eq!(HostType::binary(9).to_string(), "9b");
    }

    #[test]
    fn varying_attribute_values() {
        assert_eq!(Varying::On.to_string(), "on");
        assert_eq!(Varying::Two.to_string(), "2");
        assert_eq!(Varying::Four.to_string(), "4");
    }
}
