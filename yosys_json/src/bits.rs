use std::fmt::{self, Debug, Display};
use std::ops::Index;

use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use smallvec::SmallVec;

/// A four-valued logic constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Logic {
    Zero,
    One,
    X,
    Z,
}

impl Logic {
    pub fn from_char(value: char) -> Option<Logic> {
        match value {
            '0' => Some(Logic::Zero),
            '1' => Some(Logic::One),
            'x' => Some(Logic::X),
            'z' => Some(Logic::Z),
            _ => None,
        }
    }

    pub fn to_char(self) -> char {
        match self {
            Logic::Zero => '0',
            Logic::One => '1',
            Logic::X => 'x',
            Logic::Z => 'z',
        }
    }
}

impl Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_char())
    }
}

/// A single position of a connection: a literal constant, or an opaque integer naming a net.
/// Two connections carrying the same net id within a module are electrically the same wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Bit {
    Const(Logic),
    Net(u64),
}

impl Bit {
    pub fn as_const(self) -> Option<Logic> {
        match self {
            Bit::Const(value) => Some(value),
            Bit::Net(_) => None,
        }
    }

    pub fn as_net_id(self) -> Option<u64> {
        match self {
            Bit::Const(_) => None,
            Bit::Net(id) => Some(id),
        }
    }

    pub fn is_const(self) -> bool {
        matches!(self, Bit::Const(_))
    }
}

impl From<Logic> for Bit {
    fn from(value: Logic) -> Self {
        Bit::Const(value)
    }
}

impl Serialize for Bit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Bit::Net(id) => serializer.serialize_u64(*id),
            Bit::Const(value) => serializer.serialize_str(&value.to_char().to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for Bit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct BitVisitor;

        impl Visitor<'_> for BitVisitor {
            type Value = Bit;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a net id or one of \"0\", \"1\", \"x\", \"z\"")
            }

            fn visit_u64<E: de::Error>(self, value: u64) -> Result<Bit, E> {
                Ok(Bit::Net(value))
            }

            fn visit_i64<E: de::Error>(self, value: i64) -> Result<Bit, E> {
                u64::try_from(value).map(Bit::Net).map_err(|_| E::custom("negative net id"))
            }

            fn visit_str<E: de::Error>(self, value: &str) -> Result<Bit, E> {
                let mut chars = value.chars();
                match (chars.next().and_then(Logic::from_char), chars.next()) {
                    (Some(logic), None) => Ok(Bit::Const(logic)),
                    _ => Err(E::custom(format!("invalid constant bit {value:?}"))),
                }
            }
        }

        deserializer.deserialize_any(BitVisitor)
    }
}

impl Display for Bit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Bit::Const(value) => write!(f, "{value}"),
            Bit::Net(id) => write!(f, "%{id}"),
        }
    }
}

/// An ordered sequence of [`Bit`]s; position within the vector is the bit index, LSB first.
///
/// Vectors compare and hash element-wise so they can key net maps: different cells carrying
/// equal-valued vectors refer to the same net.
#[derive(Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BitVector(SmallVec<[Bit; 4]>);

impl BitVector {
    pub fn new() -> Self {
        BitVector::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = Bit> + ExactSizeIterator + '_ {
        self.0.iter().copied()
    }

    pub fn push(&mut self, bit: impl Into<Bit>) {
        self.0.push(bit.into())
    }

    pub fn msb(&self) -> Bit {
        self[self.len() - 1]
    }

    pub fn slice(&self, range: impl std::ops::RangeBounds<usize>) -> BitVector {
        let slice = &self.0[(range.start_bound().cloned(), range.end_bound().cloned())];
        BitVector(SmallVec::from_slice(slice))
    }

    /// The same bits, highest first. Used where port order is reversed on the display side.
    pub fn reversed(&self) -> BitVector {
        self.iter().rev().collect()
    }

    /// Zero-extends to `width` by appending literal `0`s.
    pub fn zext(&self, width: usize) -> BitVector {
        assert!(width >= self.len());
        let mut value = self.clone();
        for _ in self.len()..width {
            value.push(Logic::Zero);
        }
        value
    }

    /// Sign-extends to `width` by replicating the topmost entry, which keeps a net id pointing at
    /// the same wire.
    pub fn sext(&self, width: usize) -> BitVector {
        assert!(!self.is_empty());
        assert!(width >= self.len());
        let mut value = self.clone();
        for _ in self.len()..width {
            value.push(self.msb());
        }
        value
    }

    pub fn is_const(&self) -> bool {
        self.iter().all(|bit| bit.is_const())
    }

    /// Renders an all-constant vector as an MSB-first string; `None` if any bit is a net.
    pub fn as_const_string(&self) -> Option<String> {
        self.iter().rev().map(|bit| bit.as_const().map(Logic::to_char)).collect()
    }

    /// Net ids appearing in the vector, in order.
    pub fn net_ids(&self) -> impl Iterator<Item = u64> + '_ {
        self.iter().filter_map(Bit::as_net_id)
    }
}

impl Index<usize> for BitVector {
    type Output = Bit;

    fn index(&self, index: usize) -> &Bit {
        &self.0[index]
    }
}

impl FromIterator<Bit> for BitVector {
    fn from_iter<T: IntoIterator<Item = Bit>>(iter: T) -> Self {
        BitVector(iter.into_iter().collect())
    }
}

impl From<&[Bit]> for BitVector {
    fn from(bits: &[Bit]) -> Self {
        BitVector(SmallVec::from_slice(bits))
    }
}

impl<'a> IntoIterator for &'a BitVector {
    type Item = Bit;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, Bit>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter().copied()
    }
}

impl Debug for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BitVector[")?;
        for (index, bit) in self.iter().enumerate() {
            if index != 0 {
                write!(f, ", ")?;
            }
            write!(f, "{bit}")?;
        }
        write!(f, "]")
    }
}

impl Display for BitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(value) = self.as_const_string() {
            return write!(f, "{}'b{value}", self.len());
        }
        write!(f, "[")?;
        for bit in self.iter().rev() {
            write!(f, " {bit}")?;
        }
        write!(f, " ]")
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn bits(text: &str) -> BitVector {
        serde_json::from_str(text).unwrap()
    }

    #[test]
    fn test_parse() {
        let value = bits(r#"[2, 3, "0", "x"]"#);
        assert_eq!(value.len(), 4);
        assert_eq!(value[0], Bit::Net(2));
        assert_eq!(value[2], Bit::Const(Logic::Zero));
        assert_eq!(value[3], Bit::Const(Logic::X));
    }

    #[test]
    fn test_value_equality() {
        assert_eq!(bits(r#"[2, 3]"#), bits(r#"[2, 3]"#));
        assert_ne!(bits(r#"[2, 3]"#), bits(r#"[3, 2]"#));
    }

    #[test]
    fn test_zext_sext() {
        let value = bits(r#"[4, 5]"#);
        assert_eq!(value.zext(4), bits(r#"[4, 5, "0", "0"]"#));
        assert_eq!(value.sext(4), bits(r#"[4, 5, 5, 5]"#));
    }

    #[test]
    fn test_const_string() {
        assert_eq!(bits(r#"["1", "0", "x"]"#).as_const_string().as_deref(), Some("x01"));
        assert_eq!(bits(r#"[7, "0"]"#).as_const_string(), None);
    }

    #[test]
    fn test_slice_reversed() {
        let value = bits(r#"[2, 3, 4, 5]"#);
        assert_eq!(value.slice(1..3), bits(r#"[3, 4]"#));
        assert_eq!(value.reversed(), bits(r#"[5, 4, 3, 2]"#));
    }
}
