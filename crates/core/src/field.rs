// Airbin - AI Engine Array Configuration Compiler
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Register bitfields.
//!
//! A `Field<HIGH, LOW>` describes bits `[LOW, HIGH]` of a 32-bit register. It
//! holds no storage: `set` shifts and masks a value into place. Out-of-range
//! fields fail to compile as soon as they are used.

/// Bits `[LOW, HIGH]` of a 32-bit register word.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Field<const HIGH: u8, const LOW: u8>;

/// A single-bit field.
pub type Bit<const B: u8> = Field<B, B>;

impl<const HIGH: u8, const LOW: u8> Field<HIGH, LOW> {
    const RANGE_OK: () = {
        assert!(HIGH >= LOW, "the high bit should be higher than the low bit");
        assert!(HIGH < 32, "the field must live in a 32-bit register");
    };

    /// Number of bits covered.
    pub const WIDTH: u32 = {
        let () = Self::RANGE_OK;
        (HIGH - LOW) as u32 + 1
    };

    /// Mask of the field before shifting.
    pub const UNSHIFTED_MASK: u32 = if Self::WIDTH == 32 {
        u32::MAX
    } else {
        (1u32 << Self::WIDTH) - 1
    };

    /// Mask of the field in register position.
    pub const MASK: u32 = Self::UNSHIFTED_MASK << LOW;

    /// Place `value` into the field, dropping bits that do not fit.
    #[must_use]
    pub const fn set(value: u32) -> u32 {
        (value << LOW) & Self::MASK
    }

    /// Place a flag into a single-bit field.
    #[must_use]
    pub const fn flag(on: bool) -> u32 {
        Self::set(on as u32)
    }
}
