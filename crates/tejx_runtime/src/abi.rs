use wasmtime::{Val, ValType};

/// One argument or result on the host import boundary.
///
/// Almost everything is a 64-bit word; a few imports take or return a double.
/// Conversions between the two are numeric, never bitwise.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar {
    Word(i64),
    Float(f64),
}

impl Scalar {
    pub const ZERO: Scalar = Scalar::Word(0);

    pub fn word(self) -> i64 {
        match self {
            Scalar::Word(word) => word,
            Scalar::Float(value) => value as i64,
        }
    }

    pub fn float(self) -> f64 {
        match self {
            Scalar::Word(word) => word as f64,
            Scalar::Float(value) => value,
        }
    }

    pub fn from_bool(value: bool) -> Self {
        Scalar::Word(i64::from(value))
    }

    pub fn from_val(val: &Val) -> Self {
        match val {
            Val::I32(value) => Scalar::Word(i64::from(*value)),
            Val::I64(value) => Scalar::Word(*value),
            Val::F32(bits) => Scalar::Float(f64::from(f32::from_bits(*bits))),
            Val::F64(bits) => Scalar::Float(f64::from_bits(*bits)),
            _ => Scalar::ZERO,
        }
    }

    /// Converts to a value of the declared wasm type.
    pub fn to_val(self, ty: &ValType) -> Val {
        match ty {
            ValType::I32 => Val::I32(self.word() as i32),
            ValType::F32 => Val::F32((self.float() as f32).to_bits()),
            ValType::F64 => Val::F64(self.float().to_bits()),
            _ => Val::I64(self.word()),
        }
    }
}

pub(crate) fn word_arg(args: &[Scalar], idx: usize) -> i64 {
    args.get(idx).map(|arg| arg.word()).unwrap_or(0)
}

pub(crate) fn float_arg(args: &[Scalar], idx: usize) -> f64 {
    args.get(idx).map(|arg| arg.float()).unwrap_or(0.0)
}
