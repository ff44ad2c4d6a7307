//! Bit-depth scaling

/// Largest value representable in `bits` bits
pub const fn max_value(bits: u8) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    }
}

/// Widen `value` from `from_bits` to `to_bits`.
///
/// The vacated low bits are filled by repeating the input's top bits, so
/// zero maps to zero and full scale maps to full scale.
pub fn increase_bit_depth(value: u32, from_bits: u8, to_bits: u8) -> u32 {
    if from_bits == 0 || from_bits >= to_bits {
        return value;
    }
    let value = (value & max_value(from_bits)) as u64;
    let step = from_bits as i32;

    let mut out = 0u64;
    let mut remaining = to_bits as i32;
    while remaining > 0 {
        let shift = remaining - step;
        out |= if shift >= 0 {
            value << shift
        } else {
            value >> -shift
        };
        remaining -= step;
    }
    out as u32
}

/// Narrow `value` from `from_bits` to `to_bits` by dropping low bits
pub fn decrease_bit_depth(value: u32, from_bits: u8, to_bits: u8) -> u32 {
    if to_bits >= from_bits {
        return value;
    }
    (value & max_value(from_bits)) >> (from_bits - to_bits)
}

/// Widen or narrow, whichever applies
pub fn scale_bit_depth(value: u32, from_bits: u8, to_bits: u8) -> u32 {
    if to_bits > from_bits {
        increase_bit_depth(value, from_bits, to_bits)
    } else {
        decrease_bit_depth(value, from_bits, to_bits)
    }
}
