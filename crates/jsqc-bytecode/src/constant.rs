//! Constant pool for bytecode units.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};

use crate::function::BytecodeUnit;

/// A constant value in the constant pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Constant {
    /// 64-bit floating point number.
    Number(f64),
    /// String value (UTF-16 code units).
    String(Vec<u16>),
    /// BigInt value, stored as its canonical decimal digits.
    BigInt(Box<str>),
    /// Regular expression source.
    RegExp {
        /// The regex pattern.
        pattern: Box<str>,
        /// The regex flags (e.g. `"gi"`).
        flags: Box<str>,
    },
    /// Tagged-template call-site data. Each syntactic tagged-template
    /// expression gets its own entry; the VM is responsible for turning this
    /// into the frozen, identity-stable call-site object on first
    /// evaluation and caching it thereafter.
    TemplateLiteral {
        /// Unique template site id within the enclosing bytecode unit.
        site_id: u32,
        /// Cooked template parts (`None` for an invalid escape sequence).
        cooked: Vec<Option<Vec<u16>>>,
        /// Raw template parts.
        raw: Vec<Vec<u16>>,
    },
    /// Private-name symbol id.
    Symbol(u64),
    /// A nested function or method, lowered to its own bytecode unit.
    ///
    /// Deduplicated by reference identity at emission time, never by
    /// structural equality: two syntactically identical function bodies at
    /// different source positions are always distinct entries. Only
    /// [`ConstantPool::add_function`] appends this variant; it is never
    /// routed through [`ConstantPool::add`]'s structural dedup path.
    Function(Box<BytecodeUnit>),
}

impl Constant {
    /// Create a number constant.
    #[inline]
    pub fn number(n: f64) -> Self {
        Self::Number(n)
    }

    /// Create a string constant from UTF-16 units.
    #[inline]
    pub fn string(units: impl Into<Vec<u16>>) -> Self {
        Self::String(units.into())
    }

    /// Create a string constant from UTF-8 text.
    #[inline]
    pub fn string_from_str(s: &str) -> Self {
        Self::String(s.encode_utf16().collect())
    }

    /// Create a BigInt constant.
    #[inline]
    pub fn bigint(s: impl Into<Box<str>>) -> Self {
        Self::BigInt(s.into())
    }

    /// Create a RegExp constant.
    #[inline]
    pub fn regexp(pattern: impl Into<Box<str>>, flags: impl Into<Box<str>>) -> Self {
        Self::RegExp {
            pattern: pattern.into(),
            flags: flags.into(),
        }
    }

    /// Create a tagged-template-literal constant.
    #[inline]
    pub fn template_literal(
        site_id: u32,
        cooked: Vec<Option<Vec<u16>>>,
        raw: Vec<Vec<u16>>,
    ) -> Self {
        Self::TemplateLiteral {
            site_id,
            cooked,
            raw,
        }
    }

    /// Check if this is a number.
    #[inline]
    pub fn is_number(&self) -> bool {
        matches!(self, Self::Number(_))
    }

    /// Check if this is a string.
    #[inline]
    pub fn is_string(&self) -> bool {
        matches!(self, Self::String(_))
    }

    /// Get as number if this is a number constant.
    #[inline]
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Get as string if this is a string constant.
    #[inline]
    pub fn as_string(&self) -> Option<&[u16]> {
        match self {
            Self::String(s) => Some(s.as_slice()),
            _ => None,
        }
    }

    /// Get the nested bytecode unit if this is a function constant.
    #[inline]
    pub fn as_function(&self) -> Option<&BytecodeUnit> {
        match self {
            Self::Function(unit) => Some(unit),
            _ => None,
        }
    }

    /// Compute a hash for deduplication purposes.
    ///
    /// f64 doesn't implement `Hash`; NaN values hash the same via `to_bits`.
    /// [`Constant::Function`] is intentionally excluded from dedup: its hash
    /// is the entry's own pool index, so it never collides with anything
    /// and [`ConstantPool::add`] is never used to insert one.
    fn hash_for_dedup<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Number(n) => {
                n.to_bits().hash(state);
            }
            Self::String(s) => {
                s.hash(state);
            }
            Self::BigInt(s) => {
                s.hash(state);
            }
            Self::RegExp { pattern, flags } => {
                pattern.hash(state);
                flags.hash(state);
            }
            Self::TemplateLiteral {
                site_id,
                cooked,
                raw,
            } => {
                site_id.hash(state);
                cooked.hash(state);
                raw.hash(state);
            }
            Self::Symbol(id) => {
                id.hash(state);
            }
            Self::Function(_) => {
                // Never reached: see add_function.
            }
        }
    }
}

/// Constant pool with O(1) hash-based structural deduplication.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConstantPool {
    constants: Vec<Constant>,
    /// Hash-based deduplication index: hash -> list of indices with that hash.
    /// A list because different constants can share a hash (collision).
    #[serde(skip)]
    dedup_index: FxHashMap<u64, Vec<u32>>,
}

impl ConstantPool {
    /// Create a new empty constant pool.
    pub fn new() -> Self {
        Self {
            constants: Vec::new(),
            dedup_index: FxHashMap::default(),
        }
    }

    /// Create a constant pool with pre-allocated capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            constants: Vec::with_capacity(capacity),
            dedup_index: FxHashMap::with_capacity_and_hasher(capacity, Default::default()),
        }
    }

    /// Compute the hash of a constant for deduplication.
    #[inline]
    fn hash_constant(constant: &Constant) -> u64 {
        let mut hasher = rustc_hash::FxHasher::default();
        constant.hash_for_dedup(&mut hasher);
        hasher.finish()
    }

    /// Add a constant to the pool, returning its index.
    ///
    /// Deduplicates structurally equal constants via hash lookup. Must not
    /// be called with [`Constant::Function`]; use [`ConstantPool::add_function`].
    pub fn add(&mut self, constant: Constant) -> u32 {
        debug_assert!(
            !matches!(constant, Constant::Function(_)),
            "function constants are never structurally deduplicated"
        );
        let hash = Self::hash_constant(&constant);

        if let Some(indices) = self.dedup_index.get(&hash) {
            for &idx in indices {
                if self.constants[idx as usize] == constant {
                    return idx;
                }
            }
        }

        let idx = self.constants.len() as u32;
        self.constants.push(constant);
        self.dedup_index.entry(hash).or_default().push(idx);
        idx
    }

    /// Append a nested function's bytecode unit, always as a fresh entry.
    pub fn add_function(&mut self, unit: BytecodeUnit) -> u32 {
        let idx = self.constants.len() as u32;
        self.constants.push(Constant::Function(Box::new(unit)));
        idx
    }

    /// Rebuild the dedup index after deserialization.
    pub fn rebuild_dedup_index(&mut self) {
        self.dedup_index.clear();
        for (idx, constant) in self.constants.iter().enumerate() {
            if matches!(constant, Constant::Function(_)) {
                continue;
            }
            let hash = Self::hash_constant(constant);
            self.dedup_index.entry(hash).or_default().push(idx as u32);
        }
    }

    /// Add a number constant.
    #[inline]
    pub fn add_number(&mut self, n: f64) -> u32 {
        self.add(Constant::number(n))
    }

    /// Add a string constant from UTF-8 text.
    #[inline]
    pub fn add_string(&mut self, s: &str) -> u32 {
        self.add(Constant::string_from_str(s))
    }

    /// Add a UTF-16 string constant.
    #[inline]
    pub fn add_string_units(&mut self, units: Vec<u16>) -> u32 {
        self.add(Constant::string(units))
    }

    /// Get a constant by index.
    #[inline]
    pub fn get(&self, index: u32) -> Option<&Constant> {
        self.constants.get(index as usize)
    }

    /// Number of constants in the pool.
    #[inline]
    pub fn len(&self) -> usize {
        self.constants.len()
    }

    /// Check if the pool is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.constants.is_empty()
    }

    /// Iterate over constants.
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &Constant> {
        self.constants.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_pool_dedup() {
        let mut pool = ConstantPool::new();

        let idx1 = pool.add_string("hello");
        let idx2 = pool.add_string("world");
        let idx3 = pool.add_string("hello");

        assert_eq!(idx1, 0);
        assert_eq!(idx2, 1);
        assert_eq!(idx3, 0);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn constant_pool_number_nan() {
        let mut pool = ConstantPool::new();

        let idx1 = pool.add_number(f64::NAN);
        let idx2 = pool.add_number(f64::NAN);
        let idx3 = pool.add_number(42.0);

        assert_eq!(idx1, idx2);
        assert_ne!(idx1, idx3);
    }

    #[test]
    fn function_constants_never_dedup() {
        let mut pool = ConstantPool::new();
        let unit_a = BytecodeUnit::empty();
        let unit_b = BytecodeUnit::empty();

        let idx1 = pool.add_function(unit_a);
        let idx2 = pool.add_function(unit_b);

        assert_ne!(idx1, idx2);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn constant_get() {
        let mut pool = ConstantPool::new();
        pool.add_string("test");
        pool.add_number(123.0);

        assert_eq!(pool.get(0), Some(&Constant::string_from_str("test")));
        assert_eq!(pool.get(1), Some(&Constant::Number(123.0)));
        assert_eq!(pool.get(2), None);
    }
}
