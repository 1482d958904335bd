use serde::{Deserialize, Serialize};

/// IEEE 754 half-precision storage. Arithmetic widens to `f32`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct F16 {
    pub bits: u16,
}

impl F16 {
    pub const ZERO: F16 = F16 { bits: 0 };

    /// Convert from `f32`, rounding to nearest even.
    pub fn from_f32(value: f32) -> Self {
        let bits = value.to_bits();
        let sign = ((bits >> 16) & 0x8000) as u16;
        let exp = ((bits >> 23) & 0xff) as i32;
        let mant = bits & 0x007f_ffff;

        if exp == 0xff {
            let nan = if mant != 0 { 0x0200 } else { 0 };
            return Self { bits: sign | 0x7c00 | nan };
        }

        let unbiased = exp - 127;
        if unbiased > 15 {
            return Self { bits: sign | 0x7c00 };
        }
        if unbiased >= -14 {
            let half_exp = ((unbiased + 15) as u32) << 10;
            let half_mant = mant >> 13;
            let rest = mant & 0x1fff;
            let mut out = half_exp | half_mant;
            if rest > 0x1000 || (rest == 0x1000 && (out & 1) == 1) {
                // Carry may roll into the exponent, which is still correct.
                out += 1;
            }
            return Self {
                bits: sign | out as u16,
            };
        }
        if unbiased < -25 {
            return Self { bits: sign };
        }

        // Subnormal half: shift the implicit bit into the mantissa.
        let full = mant | 0x0080_0000;
        let shift = (-unbiased - 14 + 13) as u32;
        let half_mant = full >> shift;
        let rest = full & ((1 << shift) - 1);
        let halfway = 1 << (shift - 1);
        let mut out = half_mant;
        if rest > halfway || (rest == halfway && (out & 1) == 1) {
            out += 1;
        }
        Self {
            bits: sign | out as u16,
        }
    }

    /// Widen to `f32`. Exact for every half value.
    pub fn to_f32(self) -> f32 {
        let sign = ((self.bits & 0x8000) as u32) << 16;
        let exp = ((self.bits >> 10) & 0x1f) as u32;
        let mant = (self.bits & 0x03ff) as u32;
        let bits = match (exp, mant) {
            (0, 0) => sign,
            (0, _) => {
                let value = mant as f32 / 1024.0 * f32::powi(2.0, -14);
                return if sign != 0 { -value } else { value };
            }
            (0x1f, _) => sign | 0x7f80_0000 | (mant << 13),
            _ => sign | ((exp + 127 - 15) << 23) | (mant << 13),
        };
        f32::from_bits(bits)
    }

    pub fn from_f64(value: f64) -> Self {
        Self::from_f32(value as f32)
    }

    pub fn to_f64(self) -> f64 {
        self.to_f32() as f64
    }
}
