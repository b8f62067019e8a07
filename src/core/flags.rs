//! Edge flag encoding
//!
//! Each edge owns one 64-bit word. A [`FlagLayout`] hands out bit ranges for
//! typed properties; two-directional properties get a second range for the
//! backward direction. Single-directional properties read the same bits in
//! both directions.
//!
//! The words live in a [`FlagStore`] of atomics so writes through shared edge
//! views (including virtual edges) reach the base graph without `&mut`.

use std::marker::PhantomData;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::core::error::{Error, Result};
use crate::core::graph::EdgeId;

const WORD_BITS: u32 = 64;

/// Allocates bit ranges inside the per-edge flag word
#[derive(Debug, Default)]
pub struct FlagLayout {
    used_bits: u32,
}

impl FlagLayout {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn used_bits(&self) -> u32 {
        self.used_bits
    }

    fn allocate(&mut self, name: &str, bits: u32) -> Result<u32> {
        let available = WORD_BITS - self.used_bits;
        if bits == 0 || bits > available {
            return Err(Error::FlagLayoutFull {
                name: name.to_string(),
                bits,
                available,
            });
        }
        let shift = self.used_bits;
        self.used_bits += bits;
        Ok(shift)
    }

    pub fn int_property(&mut self, name: &str, bits: u32, two_directions: bool) -> Result<IntProperty> {
        let needed = if two_directions { bits * 2 } else { bits };
        // check the total up front so a failed allocation leaves the layout untouched
        if needed > WORD_BITS - self.used_bits {
            return Err(Error::FlagLayoutFull {
                name: name.to_string(),
                bits: needed,
                available: WORD_BITS - self.used_bits,
            });
        }
        let fwd_shift = self.allocate(name, bits)?;
        let bwd_shift = if two_directions {
            Some(self.allocate(name, bits)?)
        } else {
            None
        };
        Ok(IntProperty {
            name: name.to_string(),
            bits,
            fwd_shift,
            bwd_shift,
        })
    }

    pub fn bool_property(&mut self, name: &str, two_directions: bool) -> Result<BoolProperty> {
        Ok(BoolProperty(self.int_property(name, 1, two_directions)?))
    }

    pub fn decimal_property(
        &mut self,
        name: &str,
        bits: u32,
        factor: f64,
        two_directions: bool,
    ) -> Result<DecimalProperty> {
        Ok(DecimalProperty {
            int: self.int_property(name, bits, two_directions)?,
            factor,
        })
    }

    pub fn enum_property<T: EnumValue>(&mut self, name: &str, two_directions: bool) -> Result<EnumProperty<T>> {
        let count = T::VALUES.len().max(2) as u64;
        let bits = 64 - (count - 1).leading_zeros();
        Ok(EnumProperty {
            int: self.int_property(name, bits, two_directions)?,
            _marker: PhantomData,
        })
    }
}

/// Unsigned integer stored in a bit range of the flag word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntProperty {
    name: String,
    bits: u32,
    fwd_shift: u32,
    bwd_shift: Option<u32>,
}

impl IntProperty {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_two_directional(&self) -> bool {
        self.bwd_shift.is_some()
    }

    pub fn max_value(&self) -> u64 {
        if self.bits >= 64 {
            u64::MAX
        } else {
            (1u64 << self.bits) - 1
        }
    }

    fn shift(&self, reverse: bool) -> u32 {
        match (reverse, self.bwd_shift) {
            (true, Some(bwd)) => bwd,
            _ => self.fwd_shift,
        }
    }

    pub fn read(&self, reverse: bool, word: u64) -> u64 {
        (word >> self.shift(reverse)) & self.max_value()
    }

    pub fn check(&self, value: u64) -> Result<()> {
        if value > self.max_value() {
            return Err(Error::PropertyValueOutOfRange {
                name: self.name.clone(),
                value: value as f64,
                max: self.max_value() as f64,
            });
        }
        Ok(())
    }

    /// Write `value` into `word`; callers validate with [`IntProperty::check`] first
    pub fn write(&self, reverse: bool, word: u64, value: u64) -> u64 {
        let shift = self.shift(reverse);
        let mask = self.max_value() << shift;
        (word & !mask) | ((value & self.max_value()) << shift)
    }

    pub(crate) fn require_two_directions(&self) -> Result<()> {
        if self.bwd_shift.is_none() {
            return Err(Error::SingleDirectionProperty(self.name.clone()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoolProperty(IntProperty);

impl BoolProperty {
    pub fn int(&self) -> &IntProperty {
        &self.0
    }

    pub fn read(&self, reverse: bool, word: u64) -> bool {
        self.0.read(reverse, word) != 0
    }

    pub fn write(&self, reverse: bool, word: u64, value: bool) -> u64 {
        self.0.write(reverse, word, value as u64)
    }
}

/// Fixed-point decimal: the stored integer times `factor`
#[derive(Debug, Clone, PartialEq)]
pub struct DecimalProperty {
    int: IntProperty,
    factor: f64,
}

impl DecimalProperty {
    pub fn int(&self) -> &IntProperty {
        &self.int
    }

    pub fn factor(&self) -> f64 {
        self.factor
    }

    pub fn max_value(&self) -> f64 {
        self.int.max_value() as f64 * self.factor
    }

    pub fn read(&self, reverse: bool, word: u64) -> f64 {
        self.int.read(reverse, word) as f64 * self.factor
    }

    /// Scale and range-check a value before writing
    pub fn to_raw(&self, value: f64) -> Result<u64> {
        let raw = (value / self.factor).round();
        if !raw.is_finite() || raw < 0.0 || raw > self.int.max_value() as f64 {
            return Err(Error::PropertyValueOutOfRange {
                name: self.int.name.clone(),
                value,
                max: self.max_value(),
            });
        }
        Ok(raw as u64)
    }
}

/// Enum that can be stored as its ordinal
pub trait EnumValue: Copy + PartialEq + 'static {
    const VALUES: &'static [Self];

    fn ordinal(self) -> u64 {
        Self::VALUES.iter().position(|v| *v == self).unwrap_or(0) as u64
    }

    fn from_ordinal(ordinal: u64) -> Self {
        Self::VALUES[(ordinal as usize).min(Self::VALUES.len() - 1)]
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumProperty<T> {
    int: IntProperty,
    _marker: PhantomData<T>,
}

impl<T: EnumValue> EnumProperty<T> {
    pub fn int(&self) -> &IntProperty {
        &self.int
    }

    pub fn read(&self, reverse: bool, word: u64) -> T {
        T::from_ordinal(self.int.read(reverse, word))
    }

    pub fn write(&self, reverse: bool, word: u64, value: T) -> u64 {
        self.int.write(reverse, word, value.ordinal())
    }
}

/// OSM highway classification, first value is the fallback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoadClass {
    #[default]
    Other,
    Motorway,
    Trunk,
    Primary,
    Secondary,
    Tertiary,
    Residential,
    Service,
    Track,
}

impl EnumValue for RoadClass {
    const VALUES: &'static [Self] = &[
        RoadClass::Other,
        RoadClass::Motorway,
        RoadClass::Trunk,
        RoadClass::Primary,
        RoadClass::Secondary,
        RoadClass::Tertiary,
        RoadClass::Residential,
        RoadClass::Service,
        RoadClass::Track,
    ];
}

impl FromStr for RoadClass {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "motorway" => Ok(RoadClass::Motorway),
            "trunk" => Ok(RoadClass::Trunk),
            "primary" => Ok(RoadClass::Primary),
            "secondary" => Ok(RoadClass::Secondary),
            "tertiary" => Ok(RoadClass::Tertiary),
            "residential" => Ok(RoadClass::Residential),
            "service" => Ok(RoadClass::Service),
            "track" => Ok(RoadClass::Track),
            "other" => Ok(RoadClass::Other),
            other => Err(Error::InvalidInput(format!("unknown road class '{other}'"))),
        }
    }
}

/// One flag word per edge
#[derive(Debug, Default)]
pub struct FlagStore {
    words: Vec<AtomicU64>,
}

impl FlagStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub(crate) fn push(&mut self, word: u64) {
        self.words.push(AtomicU64::new(word));
    }

    pub fn get(&self, edge: EdgeId) -> u64 {
        self.words
            .get(edge as usize)
            .map(|w| w.load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Read-modify-write of one edge word
    pub fn update(&self, edge: EdgeId, f: impl Fn(u64) -> u64) -> Result<()> {
        let word = self.words.get(edge as usize).ok_or(Error::EdgeNotFound(edge))?;
        // the closure never returns None, so this cannot fail
        let _ = word.fetch_update(Ordering::Relaxed, Ordering::Relaxed, |w| Some(f(w)));
        Ok(())
    }
}

impl Clone for FlagStore {
    fn clone(&self) -> Self {
        Self {
            words: self
                .words
                .iter()
                .map(|w| AtomicU64::new(w.load(Ordering::Relaxed)))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_allocates_consecutive_bits() {
        let mut layout = FlagLayout::new();
        let access = layout.bool_property("access", true).unwrap();
        let speed = layout.decimal_property("speed", 5, 5.0, true).unwrap();
        assert_eq!(layout.used_bits(), 12);

        let mut word = 0;
        word = access.write(false, word, true);
        word = speed.int().write(true, word, speed.to_raw(60.0).unwrap());
        assert!(access.read(false, word));
        assert!(!access.read(true, word));
        assert_eq!(speed.read(true, word), 60.0);
        assert_eq!(speed.read(false, word), 0.0);
    }

    #[test]
    fn test_single_direction_reads_same_bits() {
        let mut layout = FlagLayout::new();
        let lanes = layout.int_property("lanes", 3, false).unwrap();
        let word = lanes.write(false, 0, 5);
        assert_eq!(lanes.read(true, word), 5);
        assert!(lanes.require_two_directions().is_err());
    }

    #[test]
    fn test_layout_full() {
        let mut layout = FlagLayout::new();
        layout.int_property("big", 60, false).unwrap();
        let err = layout.int_property("more", 3, true).unwrap_err();
        assert!(matches!(err, Error::FlagLayoutFull { bits: 6, available: 4, .. }));
        assert_eq!(layout.used_bits(), 60);
    }

    #[test]
    fn test_value_out_of_range() {
        let mut layout = FlagLayout::new();
        let speed = layout.decimal_property("speed", 5, 5.0, false).unwrap();
        assert_eq!(speed.max_value(), 155.0);
        assert!(speed.to_raw(160.0).is_err());
        assert!(speed.to_raw(-5.0).is_err());

        let lanes = layout.int_property("lanes", 2, false).unwrap();
        assert!(lanes.check(4).is_err());
        assert!(lanes.check(3).is_ok());
    }

    #[test]
    fn test_enum_property() {
        let mut layout = FlagLayout::new();
        let class = layout.enum_property::<RoadClass>("road_class", false).unwrap();
        // nine values need four bits
        assert_eq!(layout.used_bits(), 4);
        let word = class.write(false, 0, RoadClass::Residential);
        assert_eq!(class.read(false, word), RoadClass::Residential);
        assert_eq!("track".parse::<RoadClass>().unwrap(), RoadClass::Track);
        assert!("autobahn".parse::<RoadClass>().is_err());
    }

    #[test]
    fn test_flag_store_update() {
        let mut store = FlagStore::new();
        store.push(0);
        store.push(7);
        store.update(0, |w| w | 2).unwrap();
        assert_eq!(store.get(0), 2);
        assert_eq!(store.get(1), 7);
        assert!(store.update(5, |w| w).is_err());
    }
}
