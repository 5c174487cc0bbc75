use num_enum::TryFromPrimitive;

/// Scalar type tag.
///
/// The discriminants are part of the bytecode format: `iprint` and `astore`
/// carry a tag byte, so the numbering must stay stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, strum::EnumIter)]
#[repr(u8)]
pub enum TypeTag {
    /// Inference bottom; no type has been determined yet.
    Unknown = 0x00,
    /// Signed 8-bit integer.
    I8 = 0x01,
    /// Signed 16-bit integer.
    I16 = 0x02,
    /// Signed 32-bit integer.
    I32 = 0x03,
    /// Signed 64-bit integer.
    I64 = 0x04,
    /// Unsigned 8-bit integer.
    U8 = 0x05,
    /// Unsigned 16-bit integer.
    U16 = 0x06,
    /// Unsigned 32-bit integer.
    U32 = 0x07,
    /// Unsigned 64-bit integer.
    U64 = 0x08,
    /// Unit result of statements and value-less functions.
    Void = 0x09,
    /// Boolean.
    Bool = 0x0a,
    /// String; the cell holds a 16-bit data-buffer address.
    Str = 0x0b,
    /// 64-bit IEEE 754 float.
    Real = 0x0c,
    /// Function; the symbol carries return and parameter types.
    Func = 0x0d,
    /// Fixed-size scalar array; the symbol carries element type and length.
    Array = 0x0e,
}

impl TypeTag {
    /// Whether the tag is one of the eight fixed-width integer types.
    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Self::I8
                | Self::I16
                | Self::I32
                | Self::I64
                | Self::U8
                | Self::U16
                | Self::U32
                | Self::U64
        )
    }

    /// Whether the tag is an unsigned integer type.
    pub const fn is_unsigned_integer(self) -> bool {
        matches!(self, Self::U8 | Self::U16 | Self::U32 | Self::U64)
    }

    /// Whether the tag is `Bool`.
    pub const fn is_bool(self) -> bool {
        matches!(self, Self::Bool)
    }

    /// Whether the tag is `Real`.
    pub const fn is_real(self) -> bool {
        matches!(self, Self::Real)
    }

    /// Whether the tag is `Str`.
    pub const fn is_str(self) -> bool {
        matches!(self, Self::Str)
    }

    /// Whether the tag is `Array`.
    pub const fn is_array(self) -> bool {
        matches!(self, Self::Array)
    }

    /// Storage width of the scalar in bytes; `0` for non-scalar tags.
    pub const fn size(self) -> usize {
        match self {
            Self::Bool | Self::I8 | Self::U8 => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 => 4,
            Self::I64 | Self::U64 | Self::Real => 8,
            _ => 0,
        }
    }

    /// Whether a value of `self` may be assigned or passed where `to` is
    /// expected without an explicit cast. Only same-family integer widening
    /// qualifies.
    pub const fn widens_to(self, to: TypeTag) -> bool {
        if !self.is_integer() || !to.is_integer() {
            return false;
        }

        self.size() <= to.size()
    }

    /// The numeric mixing rule: the wider of two integers, `Real` when
    /// either side is real, `Unknown` for anything else.
    pub const fn mix(self, other: TypeTag) -> TypeTag {
        if self.is_integer() && other.is_integer() {
            return if self.size() >= other.size() { self } else { other };
        }

        if (self.is_integer() && other.is_real())
            || (other.is_integer() && self.is_real())
            || (self.is_real() && other.is_real())
        {
            return TypeTag::Real;
        }

        TypeTag::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn discriminants_round_trip() {
        for tag in TypeTag::iter() {
            assert_eq!(TypeTag::try_from(tag as u8).unwrap(), tag);
        }
    }

    #[test]
    fn mixing_prefers_width_then_real() {
        assert_eq!(TypeTag::I8.mix(TypeTag::I32), TypeTag::I32);
        assert_eq!(TypeTag::U16.mix(TypeTag::I8), TypeTag::U16);
        assert_eq!(TypeTag::I64.mix(TypeTag::Real), TypeTag::Real);
        assert_eq!(TypeTag::Real.mix(TypeTag::Real), TypeTag::Real);
        assert_eq!(TypeTag::Bool.mix(TypeTag::I8), TypeTag::Unknown);
        assert_eq!(TypeTag::Str.mix(TypeTag::Str), TypeTag::Unknown);
    }

    #[test]
    fn widening_is_one_directional() {
        assert!(TypeTag::I8.widens_to(TypeTag::I64));
        assert!(TypeTag::U8.widens_to(TypeTag::I16));
        assert!(TypeTag::I32.widens_to(TypeTag::I32));
        assert!(!TypeTag::I64.widens_to(TypeTag::I8));
        assert!(!TypeTag::Real.widens_to(TypeTag::I64));
        assert!(!TypeTag::Bool.widens_to(TypeTag::I8));
    }
}
