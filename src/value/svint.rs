// src/value/svint.rs
//! Four-state arbitrary-precision integers.
//!
//! An `SvInt` stores two bit planes: `words` holds the value bits and `xz`
//! marks unknown bits. For an unknown bit, the value plane distinguishes
//! x (0) from z (1). The `xz` plane is kept empty whenever the value has no
//! unknown bits, so equality and hashing see a canonical form.

use smallvec::SmallVec;
use std::fmt;

/// Widest representable packed value.
pub const MAX_WIDTH: u32 = (1 << 24) - 1;

type Words = SmallVec<[u64; 2]>;

/// A single four-state bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Logic {
    Zero,
    One,
    X,
    Z,
}

impl Logic {
    pub fn is_unknown(self) -> bool {
        matches!(self, Logic::X | Logic::Z)
    }

    /// The (value, xz) plane bits for this state.
    fn planes(self) -> (bool, bool) {
        match self {
            Logic::Zero => (false, false),
            Logic::One => (true, false),
            Logic::X => (false, true),
            Logic::Z => (true, true),
        }
    }

    pub fn from_char(c: char) -> Option<Logic> {
        match c {
            '0' => Some(Logic::Zero),
            '1' => Some(Logic::One),
            'x' | 'X' => Some(Logic::X),
            'z' | 'Z' | '?' => Some(Logic::Z),
            _ => None,
        }
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let c = match self {
            Logic::Zero => '0',
            Logic::One => '1',
            Logic::X => 'x',
            Logic::Z => 'z',
        };
        write!(f, "{}", c)
    }
}

/// The numeric base of a based integer literal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LiteralBase {
    Binary,
    Octal,
    Decimal,
    Hex,
}

impl LiteralBase {
    pub fn from_char(c: char) -> Option<LiteralBase> {
        match c {
            'b' | 'B' => Some(LiteralBase::Binary),
            'o' | 'O' => Some(LiteralBase::Octal),
            'd' | 'D' => Some(LiteralBase::Decimal),
            'h' | 'H' => Some(LiteralBase::Hex),
            _ => None,
        }
    }

    fn bits_per_digit(self) -> u32 {
        match self {
            LiteralBase::Binary => 1,
            LiteralBase::Octal => 3,
            LiteralBase::Hex => 4,
            LiteralBase::Decimal => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SvInt {
    width: u32,
    signed: bool,
    words: Words,
    xz: Words,
}

fn nwords(width: u32) -> usize {
    ((width as usize) + 63) / 64
}

impl SvInt {
    pub fn new(width: u32, signed: bool) -> Self {
        let width = width.clamp(1, MAX_WIDTH);
        Self {
            width,
            signed,
            words: SmallVec::from_elem(0, nwords(width)),
            xz: SmallVec::new(),
        }
    }

    pub fn from_u64(width: u32, signed: bool, value: u64) -> Self {
        let mut v = Self::new(width, signed);
        v.words[0] = value;
        v.mask_top();
        v
    }

    pub fn from_i64(width: u32, value: i64) -> Self {
        let mut v = Self::new(width, true);
        let bits = value as u64;
        for (i, w) in v.words.iter_mut().enumerate() {
            *w = if i == 0 {
                bits
            } else if value < 0 {
                u64::MAX
            } else {
                0
            };
        }
        v.mask_top();
        v
    }

    /// A value with every bit x.
    pub fn all_x(width: u32, signed: bool) -> Self {
        let mut v = Self::new(width, signed);
        v.xz = SmallVec::from_elem(u64::MAX, nwords(width));
        for w in v.words.iter_mut() {
            *w = 0;
        }
        v.mask_top();
        v
    }

    /// A value with every bit z.
    pub fn all_z(width: u32, signed: bool) -> Self {
        let mut v = Self::new(width, signed);
        v.xz = SmallVec::from_elem(u64::MAX, nwords(width));
        for w in v.words.iter_mut() {
            *w = u64::MAX;
        }
        v.mask_top();
        v
    }

    /// A single four-state bit.
    pub fn from_logic(bit: Logic) -> Self {
        let mut v = Self::new(1, false);
        v.set_bit(0, bit);
        v
    }

    /// A value with every bit set to the given state (unbased unsized
    /// literals replicate to their context width this way).
    pub fn replicated(width: u32, bit: Logic) -> Self {
        let mut v = Self::new(width, false);
        let (val, xz) = bit.planes();
        if val {
            for w in v.words.iter_mut() {
                *w = u64::MAX;
            }
        }
        if xz {
            v.xz = SmallVec::from_elem(u64::MAX, nwords(width));
        }
        v.mask_top();
        v
    }

    /// Parse the digits of a based or decimal literal. Digits may contain
    /// x/z/? and '_' separators. Returns None when a digit is invalid for
    /// the base.
    pub fn from_digits(
        size: Option<u32>,
        signed: bool,
        base: LiteralBase,
        digits: &str,
    ) -> Option<Self> {
        let digits: Vec<char> = digits.chars().filter(|&c| c != '_').collect();
        if digits.is_empty() {
            return None;
        }

        if base == LiteralBase::Decimal {
            // Decimal digits cannot mix with x/z except as a single digit.
            if digits.len() == 1 {
                if let Some(bit) = Logic::from_char(digits[0]) {
                    if bit.is_unknown() {
                        let width = size.unwrap_or(32);
                        return Some(match bit {
                            Logic::X => Self::all_x(width, signed),
                            _ => Self::all_z(width, signed),
                        });
                    }
                }
            }
            let mut value: u128 = 0;
            for &c in &digits {
                let d = c.to_digit(10)?;
                value = value.checked_mul(10)?.checked_add(d as u128)?;
            }
            let width = size.unwrap_or(32);
            let mut v = Self::new(width, signed);
            v.words[0] = value as u64;
            if v.words.len() > 1 {
                v.words[1] = (value >> 64) as u64;
            }
            v.mask_top();
            return Some(v);
        }

        let bits_per = base.bits_per_digit();
        let natural_width = (digits.len() as u32) * bits_per;
        // Unsized based literals are at least 32 bits wide.
        let width = size.unwrap_or_else(|| natural_width.max(32));
        let mut v = Self::new(width, signed);
        let mut pos = 0u32;
        for &c in digits.iter().rev() {
            if let Some(bit) = Logic::from_char(c) {
                if bit.is_unknown() {
                    // An x/z digit covers all of the digit's bits.
                    for i in 0..bits_per {
                        if pos + i < width {
                            v.set_bit(pos + i, bit);
                        }
                    }
                    pos += bits_per;
                    continue;
                }
            }
            let d = c.to_digit(16)?;
            let max = match base {
                LiteralBase::Binary => 1,
                LiteralBase::Octal => 7,
                LiteralBase::Hex => 15,
                LiteralBase::Decimal => unreachable!(),
            };
            if d > max {
                return None;
            }
            for i in 0..bits_per {
                if pos + i < width && (d >> i) & 1 != 0 {
                    v.set_bit(pos + i, Logic::One);
                }
            }
            pos += bits_per;
        }
        // A leading x/z digit extends through the remaining high bits.
        if pos > 0 && pos < width {
            let top = v.get_bit(pos - 1);
            if top.is_unknown() {
                for i in pos..width {
                    v.set_bit(i, top);
                }
            }
        }
        v.mask_top();
        Some(v)
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    pub fn has_unknown(&self) -> bool {
        !self.xz.is_empty()
    }

    pub fn get_bit(&self, index: u32) -> Logic {
        if index >= self.width {
            return Logic::X;
        }
        let w = (index / 64) as usize;
        let b = index % 64;
        let val = (self.words[w] >> b) & 1 != 0;
        let unknown = self.xz.get(w).map_or(false, |x| (x >> b) & 1 != 0);
        match (val, unknown) {
            (false, false) => Logic::Zero,
            (true, false) => Logic::One,
            (false, true) => Logic::X,
            (true, true) => Logic::Z,
        }
    }

    pub fn set_bit(&mut self, index: u32, bit: Logic) {
        if index >= self.width {
            return;
        }
        let w = (index / 64) as usize;
        let b = index % 64;
        let (val, unknown) = bit.planes();
        if unknown && self.xz.is_empty() {
            self.xz = SmallVec::from_elem(0, self.words.len());
        }
        if val {
            self.words[w] |= 1 << b;
        } else {
            self.words[w] &= !(1 << b);
        }
        if let Some(x) = self.xz.get_mut(w) {
            if unknown {
                *x |= 1 << b;
            } else {
                *x &= !(1 << b);
            }
        }
        self.normalize();
    }

    /// The value as u64, if it is fully known and fits.
    pub fn to_u64(&self) -> Option<u64> {
        if self.has_unknown() {
            return None;
        }
        if self.words.iter().skip(1).any(|&w| w != 0) {
            return None;
        }
        Some(self.words[0])
    }

    /// The value as i64 honoring the sign flag, if fully known and in range.
    pub fn to_i64(&self) -> Option<i64> {
        if self.has_unknown() {
            return None;
        }
        if self.signed && self.msb() == Logic::One {
            // Everything above bit 63 must be sign extension for the value
            // to be representable.
            for i in 63..self.width {
                if self.get_bit(i) != Logic::One {
                    return None;
                }
            }
            let ext = self.resize(64, true);
            Some(ext.words[0] as i64)
        } else {
            self.to_u64().and_then(|v| i64::try_from(v).ok())
        }
    }

    pub fn to_usize(&self) -> Option<usize> {
        self.to_u64().and_then(|v| usize::try_from(v).ok())
    }

    /// Approximate conversion to a real value; unknown bits read as zero.
    pub fn to_real(&self) -> f64 {
        let mut v = self.clone();
        for (i, w) in v.words.iter_mut().enumerate() {
            if let Some(x) = v.xz.get(i) {
                *w &= !x;
            }
        }
        v.xz.clear();
        let negative = v.signed && v.msb() == Logic::One;
        if negative {
            v = v.negate();
        }
        let mut out = 0.0f64;
        for &w in v.words.iter().rev() {
            out = out * 18446744073709551616.0 + (w as f64);
        }
        if negative { -out } else { out }
    }

    /// Conversion from a real value, rounding away from zero per the LRM.
    pub fn from_real(value: f64, width: u32, signed: bool) -> Self {
        if value.is_nan() || value.is_infinite() {
            return Self::all_x(width, signed);
        }
        let rounded = if value < 0.0 {
            (value - 0.5).ceil()
        } else {
            (value + 0.5).floor()
        };
        Self::from_i64(64, rounded as i64).resize(width, signed)
    }

    fn msb(&self) -> Logic {
        self.get_bit(self.width - 1)
    }

    /// Resize to a new width: truncate, or extend with zero or the sign bit.
    pub fn resize(&self, new_width: u32, new_signed: bool) -> Self {
        let new_width = new_width.clamp(1, MAX_WIDTH);
        let mut out = Self::new(new_width, new_signed);
        let fill = if self.signed { self.msb() } else { Logic::Zero };
        if fill != Logic::Zero || self.has_unknown() {
            for i in 0..new_width {
                let bit = if i < self.width { self.get_bit(i) } else { fill };
                out.set_bit(i, bit);
            }
        } else {
            for (i, w) in out.words.iter_mut().enumerate() {
                *w = self.words.get(i).copied().unwrap_or(0);
            }
            out.mask_top();
        }
        out
    }

    fn mask_top(&mut self) {
        let bits = self.width % 64;
        if bits != 0 {
            let mask = (1u64 << bits) - 1;
            if let Some(w) = self.words.last_mut() {
                *w &= mask;
            }
            if let Some(x) = self.xz.last_mut() {
                *x &= mask;
            }
        }
        self.normalize();
    }

    fn normalize(&mut self) {
        if self.xz.iter().all(|&x| x == 0) {
            self.xz.clear();
        }
    }

    // ========================================================================
    // Arithmetic: any unknown operand bit poisons the whole result
    // ========================================================================

    fn common(&self, rhs: &SvInt) -> (u32, bool) {
        (self.width.max(rhs.width), self.signed && rhs.signed)
    }

    pub fn add(&self, rhs: &SvInt) -> SvInt {
        let (w, s) = self.common(rhs);
        if self.has_unknown() || rhs.has_unknown() {
            return Self::all_x(w, s);
        }
        let a = self.resize(w, s);
        let b = rhs.resize(w, s);
        let mut out = Self::new(w, s);
        let mut carry = 0u64;
        for i in 0..out.words.len() {
            let (sum1, c1) = a.words[i].overflowing_add(b.words[i]);
            let (sum2, c2) = sum1.overflowing_add(carry);
            out.words[i] = sum2;
            carry = (c1 as u64) + (c2 as u64);
        }
        out.mask_top();
        out
    }

    pub fn sub(&self, rhs: &SvInt) -> SvInt {
        let (w, s) = self.common(rhs);
        if self.has_unknown() || rhs.has_unknown() {
            return Self::all_x(w, s);
        }
        self.add(&rhs.resize(w, s).negate().resize(w, s))
    }

    pub fn negate(&self) -> SvInt {
        if self.has_unknown() {
            return Self::all_x(self.width, self.signed);
        }
        let mut out = Self::new(self.width, self.signed);
        let mut carry = 1u64;
        for i in 0..out.words.len() {
            let (v, c) = (!self.words[i]).overflowing_add(carry);
            out.words[i] = v;
            carry = c as u64;
        }
        out.mask_top();
        out
    }

    pub fn mul(&self, rhs: &SvInt) -> SvInt {
        let (w, s) = self.common(rhs);
        if self.has_unknown() || rhs.has_unknown() {
            return Self::all_x(w, s);
        }
        let a = self.resize(w, s);
        let b = rhs.resize(w, s);
        let mut acc: Words = SmallVec::from_elem(0, a.words.len());
        for i in 0..a.words.len() {
            let mut carry = 0u128;
            for j in 0..(a.words.len() - i) {
                let idx = i + j;
                let prod =
                    (a.words[i] as u128) * (b.words[j] as u128) + (acc[idx] as u128) + carry;
                acc[idx] = prod as u64;
                carry = prod >> 64;
            }
        }
        let mut out = Self::new(w, s);
        out.words = acc;
        out.mask_top();
        out
    }

    // Magnitude of a possibly-negative value, as unsigned words.
    fn magnitude(&self) -> (SvInt, bool) {
        if self.signed && self.msb() == Logic::One {
            (self.negate().resize(self.width, false), true)
        } else {
            (self.resize(self.width, false), false)
        }
    }

    fn is_zero(&self) -> bool {
        !self.has_unknown() && self.words.iter().all(|&w| w == 0)
    }

    fn cmp_magnitude(a: &Words, b: &Words) -> std::cmp::Ordering {
        let len = a.len().max(b.len());
        for i in (0..len).rev() {
            let x = a.get(i).copied().unwrap_or(0);
            let y = b.get(i).copied().unwrap_or(0);
            if x != y {
                return x.cmp(&y);
            }
        }
        std::cmp::Ordering::Equal
    }

    // Shift-subtract long division on magnitudes.
    fn divmod_magnitude(num: &SvInt, den: &SvInt) -> (SvInt, SvInt) {
        let w = num.width;
        let mut quot = SvInt::new(w, false);
        let mut rem = SvInt::new(w, false);
        for i in (0..w).rev() {
            // rem = (rem << 1) | num[i]
            rem = rem.shl(1);
            if num.get_bit(i) == Logic::One {
                rem.words[0] |= 1;
            }
            if Self::cmp_magnitude(&rem.words, &den.words) != std::cmp::Ordering::Less {
                rem = rem.sub(&den.resize(w, false));
                quot.words[(i / 64) as usize] |= 1 << (i % 64);
            }
        }
        quot.mask_top();
        rem.mask_top();
        (quot, rem)
    }

    /// Division truncates toward zero; x/z anywhere or a zero divisor
    /// produces all-x.
    pub fn div(&self, rhs: &SvInt) -> SvInt {
        let (w, s) = self.common(rhs);
        if self.has_unknown() || rhs.has_unknown() || rhs.is_zero() {
            return Self::all_x(w, s);
        }
        let a = self.resize(w, s);
        let b = rhs.resize(w, s);
        let (ma, neg_a) = a.magnitude();
        let (mb, neg_b) = b.magnitude();
        let (q, _) = Self::divmod_magnitude(&ma, &mb);
        let mut out = q.resize(w, s);
        if neg_a != neg_b {
            out = out.negate();
        }
        out
    }

    /// Remainder takes the sign of the dividend.
    pub fn rem(&self, rhs: &SvInt) -> SvInt {
        let (w, s) = self.common(rhs);
        if self.has_unknown() || rhs.has_unknown() || rhs.is_zero() {
            return Self::all_x(w, s);
        }
        let a = self.resize(w, s);
        let b = rhs.resize(w, s);
        let (ma, neg_a) = a.magnitude();
        let (mb, _) = b.magnitude();
        let (_, r) = Self::divmod_magnitude(&ma, &mb);
        let mut out = r.resize(w, s);
        if neg_a {
            out = out.negate();
        }
        out
    }

    /// Power operator per the LRM result table.
    pub fn pow(&self, rhs: &SvInt) -> SvInt {
        let (w, s) = self.common(rhs);
        if self.has_unknown() || rhs.has_unknown() {
            return Self::all_x(w, s);
        }
        let base = self.resize(w, s);
        let exp_negative = rhs.is_signed() && rhs.msb() == Logic::One;
        if exp_negative {
            // Negative exponent: only |base| <= 1 yields a nonzero result.
            let one = Self::from_u64(w, s, 1);
            if base.is_zero() {
                return Self::all_x(w, s);
            }
            if base.case_eq(&one) {
                return one;
            }
            let minus_one = one.negate();
            if s && base.case_eq(&minus_one) {
                let odd = rhs.get_bit(0) == Logic::One;
                return if odd { minus_one } else { one };
            }
            return Self::new(w, s);
        }
        let mut exp = rhs.resize(rhs.width, false);
        let mut result = Self::from_u64(w, s, 1);
        let mut acc = base;
        while !exp.is_zero() {
            if exp.get_bit(0) == Logic::One {
                result = result.mul(&acc);
            }
            acc = acc.mul(&acc);
            exp = exp.lshr(1);
        }
        result
    }

    // ========================================================================
    // Bitwise: four-state per bit
    // ========================================================================

    pub fn and(&self, rhs: &SvInt) -> SvInt {
        self.bitwise(rhs, |a, b| match (a, b) {
            (Logic::Zero, _) | (_, Logic::Zero) => Logic::Zero,
            (Logic::One, Logic::One) => Logic::One,
            _ => Logic::X,
        })
    }

    pub fn or(&self, rhs: &SvInt) -> SvInt {
        self.bitwise(rhs, |a, b| match (a, b) {
            (Logic::One, _) | (_, Logic::One) => Logic::One,
            (Logic::Zero, Logic::Zero) => Logic::Zero,
            _ => Logic::X,
        })
    }

    pub fn xor(&self, rhs: &SvInt) -> SvInt {
        self.bitwise(rhs, |a, b| match (a, b) {
            (Logic::Zero, Logic::Zero) | (Logic::One, Logic::One) => Logic::Zero,
            (Logic::Zero, Logic::One) | (Logic::One, Logic::Zero) => Logic::One,
            _ => Logic::X,
        })
    }

    pub fn xnor(&self, rhs: &SvInt) -> SvInt {
        self.xor(rhs).not()
    }

    pub fn not(&self) -> SvInt {
        let mut out = Self::new(self.width, self.signed);
        for i in 0..self.width {
            let bit = match self.get_bit(i) {
                Logic::Zero => Logic::One,
                Logic::One => Logic::Zero,
                _ => Logic::X,
            };
            out.set_bit(i, bit);
        }
        out
    }

    fn bitwise(&self, rhs: &SvInt, f: impl Fn(Logic, Logic) -> Logic) -> SvInt {
        let (w, s) = self.common(rhs);
        let a = self.resize(w, s);
        let b = rhs.resize(w, s);
        let mut out = Self::new(w, s);
        for i in 0..w {
            out.set_bit(i, f(a.get_bit(i), b.get_bit(i)));
        }
        out
    }

    // ========================================================================
    // Reductions
    // ========================================================================

    pub fn reduce_and(&self) -> Logic {
        let mut acc = Logic::One;
        for i in 0..self.width {
            match self.get_bit(i) {
                Logic::Zero => return Logic::Zero,
                Logic::One => {}
                _ => acc = Logic::X,
            }
        }
        acc
    }

    pub fn reduce_or(&self) -> Logic {
        let mut acc = Logic::Zero;
        for i in 0..self.width {
            match self.get_bit(i) {
                Logic::One => return Logic::One,
                Logic::Zero => {}
                _ => acc = Logic::X,
            }
        }
        acc
    }

    pub fn reduce_xor(&self) -> Logic {
        let mut acc = Logic::Zero;
        for i in 0..self.width {
            match self.get_bit(i) {
                Logic::One => {
                    acc = match acc {
                        Logic::Zero => Logic::One,
                        Logic::One => Logic::Zero,
                        other => other,
                    }
                }
                Logic::Zero => {}
                _ => return Logic::X,
            }
        }
        acc
    }

    // ========================================================================
    // Shifts
    // ========================================================================

    pub fn shl(&self, amount: u32) -> SvInt {
        let mut out = Self::new(self.width, self.signed);
        if amount >= self.width {
            return out;
        }
        for i in (amount..self.width).rev() {
            out.set_bit(i, self.get_bit(i - amount));
        }
        out
    }

    pub fn lshr(&self, amount: u32) -> SvInt {
        let mut out = Self::new(self.width, self.signed);
        if amount >= self.width {
            return out;
        }
        for i in 0..(self.width - amount) {
            out.set_bit(i, self.get_bit(i + amount));
        }
        out
    }

    pub fn ashr(&self, amount: u32) -> SvInt {
        if !self.signed {
            return self.lshr(amount);
        }
        let fill = self.msb();
        let mut out = Self::new(self.width, self.signed);
        for i in 0..self.width {
            let src = i.checked_add(amount);
            let bit = match src {
                Some(s) if s < self.width => self.get_bit(s),
                _ => fill,
            };
            out.set_bit(i, bit);
        }
        out
    }

    // ========================================================================
    // Comparison
    // ========================================================================

    /// Logical equality: x when either side has unknown bits.
    pub fn log_eq(&self, rhs: &SvInt) -> Logic {
        if self.has_unknown() || rhs.has_unknown() {
            return Logic::X;
        }
        let (w, s) = self.common(rhs);
        let a = self.resize(w, s);
        let b = rhs.resize(w, s);
        if a.words == b.words {
            Logic::One
        } else {
            Logic::Zero
        }
    }

    /// Case equality: bit-for-bit including x/z.
    pub fn case_eq(&self, rhs: &SvInt) -> bool {
        let (w, s) = self.common(rhs);
        let a = self.resize(w, s);
        let b = rhs.resize(w, s);
        a.words == b.words && a.xz == b.xz
    }

    /// Wildcard equality: x/z bits of the right operand are don't-care.
    pub fn wildcard_eq(&self, rhs: &SvInt) -> Logic {
        let (w, s) = self.common(rhs);
        let a = self.resize(w, s);
        let b = rhs.resize(w, s);
        let mut acc = Logic::One;
        for i in 0..w {
            let pb = b.get_bit(i);
            if pb.is_unknown() {
                continue;
            }
            let pa = a.get_bit(i);
            if pa.is_unknown() {
                acc = Logic::X;
            } else if pa != pb {
                return Logic::Zero;
            }
        }
        acc
    }

    /// Relational comparison; x when either side has unknown bits.
    /// Signed comparison applies only when both operands are signed.
    pub fn lt(&self, rhs: &SvInt) -> Logic {
        if self.has_unknown() || rhs.has_unknown() {
            return Logic::X;
        }
        let (w, s) = self.common(rhs);
        let a = self.resize(w, s);
        let b = rhs.resize(w, s);
        if s {
            let na = a.msb() == Logic::One;
            let nb = b.msb() == Logic::One;
            if na != nb {
                return if na { Logic::One } else { Logic::Zero };
            }
        }
        match Self::cmp_magnitude(&a.words, &b.words) {
            std::cmp::Ordering::Less => Logic::One,
            _ => Logic::Zero,
        }
    }

    // ========================================================================
    // Structure
    // ========================================================================

    /// Concatenate operands, first operand in the most significant position.
    pub fn concat(operands: &[SvInt]) -> SvInt {
        let total: u32 = operands.iter().map(|o| o.width).sum();
        let mut out = Self::new(total.max(1), false);
        let mut pos = 0;
        for op in operands.iter().rev() {
            for i in 0..op.width {
                out.set_bit(pos + i, op.get_bit(i));
            }
            pos += op.width;
        }
        out
    }

    /// Extract bit positions [lsb, msb] counted from the LSB. Positions
    /// outside the value read as x.
    pub fn extract(&self, msb: i64, lsb: i64) -> SvInt {
        let width = (msb - lsb + 1).max(1) as u32;
        let mut out = Self::new(width, false);
        for i in 0..width {
            let src = lsb + i as i64;
            let bit = if src < 0 || src >= self.width as i64 {
                Logic::X
            } else {
                self.get_bit(src as u32)
            };
            out.set_bit(i, bit);
        }
        out
    }

    /// True when the value is "truthy": at least one definite 1 bit.
    pub fn is_true(&self) -> bool {
        self.reduce_or() == Logic::One
    }

    /// The truth state for conditions: 1, 0, or x.
    pub fn truth(&self) -> Logic {
        self.reduce_or()
    }
}

impl fmt::Display for SvInt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.has_unknown() {
            if let Some(v) = self.to_i64() {
                return write!(f, "{}", v);
            }
            if let Some(v) = self.to_u64() {
                return write!(f, "{}", v);
            }
        }
        // Fall back to a binary literal when there are unknown bits or the
        // value does not fit a machine word.
        write!(f, "{}'b", self.width)?;
        for i in (0..self.width).rev() {
            write!(f, "{}", self.get_bit(i))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bits(s: &str) -> SvInt {
        SvInt::from_digits(Some(s.len() as u32), false, LiteralBase::Binary, s).unwrap()
    }

    #[test]
    fn parses_based_literals() {
        let v = SvInt::from_digits(Some(8), false, LiteralBase::Hex, "ff").unwrap();
        assert_eq!(v.to_u64(), Some(255));

        let v = SvInt::from_digits(Some(4), false, LiteralBase::Binary, "10x1").unwrap();
        assert!(v.has_unknown());
        assert_eq!(v.get_bit(3), Logic::One);
        assert_eq!(v.get_bit(2), Logic::Zero);
        assert_eq!(v.get_bit(1), Logic::X);
        assert_eq!(v.get_bit(0), Logic::One);

        let v = SvInt::from_digits(None, false, LiteralBase::Decimal, "42").unwrap();
        assert_eq!(v.width(), 32);
        assert_eq!(v.to_u64(), Some(42));
    }

    #[test]
    fn hex_x_digit_covers_four_bits() {
        let v = SvInt::from_digits(Some(8), false, LiteralBase::Hex, "fx").unwrap();
        for i in 0..4 {
            assert_eq!(v.get_bit(i), Logic::X);
        }
        for i in 4..8 {
            assert_eq!(v.get_bit(i), Logic::One);
        }
    }

    #[test]
    fn add_and_overflow_wraps() {
        let a = SvInt::from_u64(4, false, 0b1111);
        let b = SvInt::from_u64(4, false, 1);
        assert_eq!(a.add(&b).to_u64(), Some(0));
    }

    #[test]
    fn unknown_poisons_arithmetic() {
        let a = bits("10x1");
        let b = bits("0001");
        let sum = a.add(&b);
        assert_eq!(sum.width(), 4);
        for i in 0..4 {
            assert_eq!(sum.get_bit(i), Logic::X);
        }
    }

    #[test]
    fn signed_negation_and_division() {
        let a = SvInt::from_i64(32, -12);
        let b = SvInt::from_i64(32, 5);
        assert_eq!(a.div(&b).to_i64(), Some(-2));
        assert_eq!(a.rem(&b).to_i64(), Some(-2));
        assert_eq!(b.div(&a).to_i64(), Some(0));
    }

    #[test]
    fn division_by_zero_is_x() {
        let a = SvInt::from_u64(8, false, 10);
        let z = SvInt::from_u64(8, false, 0);
        assert!(a.div(&z).has_unknown());
        assert!(a.rem(&z).has_unknown());
    }

    #[test]
    fn wide_multiplication() {
        let a = SvInt::from_u64(128, false, u64::MAX);
        let b = SvInt::from_u64(128, false, 16);
        let prod = a.mul(&b);
        assert_eq!(prod.get_bit(67), Logic::One);
        assert_eq!(prod.extract(3, 0).to_u64(), Some(0));
    }

    #[test]
    fn pow_basic_and_negative_exponent() {
        let b = SvInt::from_i64(32, 2);
        let e = SvInt::from_i64(32, 10);
        assert_eq!(b.pow(&e).to_i64(), Some(1024));

        let neg = SvInt::from_i64(32, -2);
        assert_eq!(b.pow(&neg).to_i64(), Some(0));

        let one = SvInt::from_i64(32, 1);
        assert_eq!(one.pow(&neg).to_i64(), Some(1));

        let minus_one = SvInt::from_i64(32, -1);
        assert_eq!(minus_one.pow(&neg).to_i64(), Some(1));
        let neg3 = SvInt::from_i64(32, -3);
        assert_eq!(minus_one.pow(&neg3).to_i64(), Some(-1));
    }

    #[test]
    fn four_state_bitwise_tables() {
        let a = bits("01xz");
        let b = bits("1111");
        let anded = a.and(&b);
        assert_eq!(anded.get_bit(3), Logic::Zero);
        assert_eq!(anded.get_bit(2), Logic::One);
        assert_eq!(anded.get_bit(1), Logic::X);
        assert_eq!(anded.get_bit(0), Logic::X); // z & 1 = x

        let zeroes = bits("0000");
        let anded = a.and(&zeroes);
        for i in 0..4 {
            assert_eq!(anded.get_bit(i), Logic::Zero);
        }

        let ored = a.or(&zeroes);
        assert_eq!(ored.get_bit(1), Logic::X); // x | 0 = x
    }

    #[test]
    fn reductions() {
        assert_eq!(bits("1111").reduce_and(), Logic::One);
        assert_eq!(bits("1101").reduce_and(), Logic::Zero);
        assert_eq!(bits("11x1").reduce_and(), Logic::X);
        assert_eq!(bits("0000").reduce_or(), Logic::Zero);
        assert_eq!(bits("00x0").reduce_or(), Logic::X);
        assert_eq!(bits("0110").reduce_xor(), Logic::Zero);
        assert_eq!(bits("0111").reduce_xor(), Logic::One);
    }

    #[test]
    fn shifts() {
        let a = SvInt::from_u64(8, false, 0b0000_1010);
        assert_eq!(a.shl(2).to_u64(), Some(0b0010_1000));
        assert_eq!(a.lshr(1).to_u64(), Some(0b0000_0101));

        let neg = SvInt::from_i64(8, -8);
        assert_eq!(neg.ashr(1).to_i64(), Some(-4));
        assert_eq!(neg.lshr(1).to_u64(), Some(0b0111_1100));

        // Shifting by more than the width clears everything.
        assert_eq!(a.shl(64).to_u64(), Some(0));
    }

    #[test]
    fn equality_flavors() {
        let a = bits("10x1");
        let b = bits("10x1");
        assert_eq!(a.log_eq(&b), Logic::X);
        assert!(a.case_eq(&b));
        assert!(!a.case_eq(&bits("1001")));

        let pat = bits("10zz");
        assert_eq!(bits("1010").wildcard_eq(&pat), Logic::One);
        assert_eq!(bits("0010").wildcard_eq(&pat), Logic::Zero);
    }

    #[test]
    fn signed_comparison() {
        let a = SvInt::from_i64(8, -1);
        let b = SvInt::from_i64(8, 1);
        assert_eq!(a.lt(&b), Logic::One);
        assert_eq!(b.lt(&a), Logic::Zero);

        // Unsigned view of the same bits compares the other way.
        let ua = a.resize(8, false);
        let ub = b.resize(8, false);
        assert_eq!(ua.lt(&ub), Logic::Zero);
    }

    #[test]
    fn concat_and_extract() {
        let hi = bits("10");
        let lo = bits("x1");
        let cat = SvInt::concat(&[hi, lo]);
        assert_eq!(cat.width(), 4);
        assert_eq!(cat.get_bit(3), Logic::One);
        assert_eq!(cat.get_bit(2), Logic::Zero);
        assert_eq!(cat.get_bit(1), Logic::X);
        assert_eq!(cat.get_bit(0), Logic::One);

        let slice = cat.extract(2, 1);
        assert_eq!(slice.get_bit(1), Logic::Zero);
        assert_eq!(slice.get_bit(0), Logic::X);

        // Out-of-range positions read as x.
        let oob = cat.extract(5, 3);
        assert_eq!(oob.get_bit(0), Logic::One);
        assert_eq!(oob.get_bit(1), Logic::X);
        assert_eq!(oob.get_bit(2), Logic::X);
    }

    #[test]
    fn resize_sign_extends_unknowns() {
        let a = SvInt::from_digits(Some(4), true, LiteralBase::Binary, "x111").unwrap();
        let wide = a.resize(8, true);
        for i in 4..8 {
            assert_eq!(wide.get_bit(i), Logic::X);
        }
        assert_eq!(wide.get_bit(0), Logic::One);
    }

    #[test]
    fn real_round_trips() {
        let v = SvInt::from_i64(32, -3);
        assert_eq!(v.to_real(), -3.0);
        let back = SvInt::from_real(2.5, 32, true);
        assert_eq!(back.to_i64(), Some(3));
        let back = SvInt::from_real(-2.5, 32, true);
        assert_eq!(back.to_i64(), Some(-3));
    }

    #[test]
    fn display_forms() {
        assert_eq!(SvInt::from_i64(32, -5).to_string(), "-5");
        assert_eq!(SvInt::from_u64(8, false, 200).to_string(), "200");
        assert_eq!(bits("10x1").to_string(), "4'b10x1");
    }

    #[test]
    fn unbased_replication() {
        let v = SvInt::replicated(8, Logic::Z);
        for i in 0..8 {
            assert_eq!(v.get_bit(i), Logic::Z);
        }
        assert_eq!(SvInt::replicated(3, Logic::One).to_u64(), Some(0b111));
    }
}
