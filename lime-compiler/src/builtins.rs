//! Builtin functions and type names.

use lime_asm::Opcode;
use lime_types::TypeTag;

/// How a builtin call turns into code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuiltinKind {
    /// Variadic `print`: one `iprint`/`rprint`/`sprint` per argument,
    /// dispatched on the argument's type, then a single `allc` sentinel.
    Print,
    /// `abs`: `iabs` or `rabs`, chosen from the argument type; the call's
    /// result type is the argument type.
    Abs,
    /// `len`: `slen` for strings, `alen` for arrays.
    Len,
    /// Evaluate the arguments, then emit one fixed opcode.
    Fixed(Opcode),
}

/// One entry of the builtin function table.
#[derive(Debug)]
pub struct Builtin {
    /// Callable name.
    pub name: &'static str,
    /// Required argument count; `None` means variadic.
    pub arity: Option<usize>,
    /// Result type. `Unknown` marks the polymorphic `abs`, whose result
    /// follows its argument.
    pub ret: TypeTag,
    /// Emission strategy.
    pub kind: BuiltinKind,
    /// Types an argument may have.
    pub acceptable: &'static [TypeTag],
}

const INTEGER_TYPES: &[TypeTag] = &[
    TypeTag::I8,
    TypeTag::I16,
    TypeTag::I32,
    TypeTag::I64,
    TypeTag::U8,
    TypeTag::U16,
    TypeTag::U32,
    TypeTag::U64,
    TypeTag::Bool,
];

const REAL_TYPES: &[TypeTag] = &[TypeTag::Real];

const NUMERIC_TYPES: &[TypeTag] = &[
    TypeTag::I8,
    TypeTag::I16,
    TypeTag::I32,
    TypeTag::I64,
    TypeTag::U8,
    TypeTag::U16,
    TypeTag::U32,
    TypeTag::U64,
    TypeTag::Bool,
    TypeTag::Real,
];

const PRINT_TYPES: &[TypeTag] = &[
    TypeTag::I8,
    TypeTag::I16,
    TypeTag::I32,
    TypeTag::I64,
    TypeTag::U8,
    TypeTag::U16,
    TypeTag::U32,
    TypeTag::U64,
    TypeTag::Bool,
    TypeTag::Real,
    TypeTag::Str,
];

const LEN_TYPES: &[TypeTag] = &[TypeTag::Str, TypeTag::Array];

/// The builtin function table.
pub const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "print",
        arity: None,
        ret: TypeTag::Void,
        kind: BuiltinKind::Print,
        acceptable: PRINT_TYPES,
    },
    Builtin {
        name: "abs",
        arity: Some(1),
        ret: TypeTag::Unknown,
        kind: BuiltinKind::Abs,
        acceptable: NUMERIC_TYPES,
    },
    Builtin {
        name: "len",
        arity: Some(1),
        ret: TypeTag::I64,
        kind: BuiltinKind::Len,
        acceptable: LEN_TYPES,
    },
    Builtin {
        name: "mod",
        arity: Some(2),
        ret: TypeTag::Real,
        kind: BuiltinKind::Fixed(Opcode::RMOD),
        acceptable: REAL_TYPES,
    },
    Builtin {
        name: "pow",
        arity: Some(2),
        ret: TypeTag::Real,
        kind: BuiltinKind::Fixed(Opcode::RPOW),
        acceptable: REAL_TYPES,
    },
    Builtin {
        name: "sqrt",
        arity: Some(1),
        ret: TypeTag::Real,
        kind: BuiltinKind::Fixed(Opcode::RSQRT),
        acceptable: REAL_TYPES,
    },
    Builtin {
        name: "exp",
        arity: Some(1),
        ret: TypeTag::Real,
        kind: BuiltinKind::Fixed(Opcode::REXP),
        acceptable: REAL_TYPES,
    },
    Builtin {
        name: "sin",
        arity: Some(1),
        ret: TypeTag::Real,
        kind: BuiltinKind::Fixed(Opcode::RSIN),
        acceptable: REAL_TYPES,
    },
    Builtin {
        name: "cos",
        arity: Some(1),
        ret: TypeTag::Real,
        kind: BuiltinKind::Fixed(Opcode::RCOS),
        acceptable: REAL_TYPES,
    },
    Builtin {
        name: "tan",
        arity: Some(1),
        ret: TypeTag::Real,
        kind: BuiltinKind::Fixed(Opcode::RTAN),
        acceptable: REAL_TYPES,
    },
    Builtin {
        name: "asin",
        arity: Some(1),
        ret: TypeTag::Real,
        kind: BuiltinKind::Fixed(Opcode::RASIN),
        acceptable: REAL_TYPES,
    },
    Builtin {
        name: "acos",
        arity: Some(1),
        ret: TypeTag::Real,
        kind: BuiltinKind::Fixed(Opcode::RACOS),
        acceptable: REAL_TYPES,
    },
    Builtin {
        name: "atan2",
        arity: Some(2),
        ret: TypeTag::Real,
        kind: BuiltinKind::Fixed(Opcode::RATAN2),
        acceptable: REAL_TYPES,
    },
    Builtin {
        name: "log",
        arity: Some(1),
        ret: TypeTag::Real,
        kind: BuiltinKind::Fixed(Opcode::RLOG),
        acceptable: REAL_TYPES,
    },
    Builtin {
        name: "log10",
        arity: Some(1),
        ret: TypeTag::Real,
        kind: BuiltinKind::Fixed(Opcode::RLOG10),
        acceptable: REAL_TYPES,
    },
    Builtin {
        name: "log2",
        arity: Some(1),
        ret: TypeTag::Real,
        kind: BuiltinKind::Fixed(Opcode::RLOG2),
        acceptable: REAL_TYPES,
    },
    Builtin {
        name: "ceil",
        arity: Some(1),
        ret: TypeTag::Real,
        kind: BuiltinKind::Fixed(Opcode::RCEIL),
        acceptable: REAL_TYPES,
    },
    Builtin {
        name: "floor",
        arity: Some(1),
        ret: TypeTag::Real,
        kind: BuiltinKind::Fixed(Opcode::RFLOOR),
        acceptable: REAL_TYPES,
    },
    Builtin {
        name: "round",
        arity: Some(1),
        ret: TypeTag::Real,
        kind: BuiltinKind::Fixed(Opcode::RROUND),
        acceptable: REAL_TYPES,
    },
    Builtin {
        name: "i8",
        arity: Some(1),
        ret: TypeTag::I8,
        kind: BuiltinKind::Fixed(Opcode::I8CAST),
        acceptable: INTEGER_TYPES,
    },
    Builtin {
        name: "u8",
        arity: Some(1),
        ret: TypeTag::U8,
        kind: BuiltinKind::Fixed(Opcode::IU8CAST),
        acceptable: INTEGER_TYPES,
    },
    Builtin {
        name: "i16",
        arity: Some(1),
        ret: TypeTag::I16,
        kind: BuiltinKind::Fixed(Opcode::I16CAST),
        acceptable: INTEGER_TYPES,
    },
    Builtin {
        name: "u16",
        arity: Some(1),
        ret: TypeTag::U16,
        kind: BuiltinKind::Fixed(Opcode::IU16CAST),
        acceptable: INTEGER_TYPES,
    },
    Builtin {
        name: "i32",
        arity: Some(1),
        ret: TypeTag::I32,
        kind: BuiltinKind::Fixed(Opcode::I32CAST),
        acceptable: INTEGER_TYPES,
    },
    Builtin {
        name: "u32",
        arity: Some(1),
        ret: TypeTag::U32,
        kind: BuiltinKind::Fixed(Opcode::IU32CAST),
        acceptable: INTEGER_TYPES,
    },
    Builtin {
        name: "i64",
        arity: Some(1),
        ret: TypeTag::I64,
        kind: BuiltinKind::Fixed(Opcode::I64CAST),
        acceptable: INTEGER_TYPES,
    },
    Builtin {
        name: "u64",
        arity: Some(1),
        ret: TypeTag::U64,
        kind: BuiltinKind::Fixed(Opcode::IU64CAST),
        acceptable: INTEGER_TYPES,
    },
    Builtin {
        name: "itor",
        arity: Some(1),
        ret: TypeTag::Real,
        kind: BuiltinKind::Fixed(Opcode::ITOR),
        acceptable: INTEGER_TYPES,
    },
    Builtin {
        name: "rtoi",
        arity: Some(1),
        ret: TypeTag::I64,
        kind: BuiltinKind::Fixed(Opcode::RTOI),
        acceptable: REAL_TYPES,
    },
];

/// The builtin named `name`, if any.
pub fn lookup(name: &str) -> Option<&'static Builtin> {
    BUILTINS.iter().find(|b| b.name == name)
}

/// The scalar type named `name` in source text, if any.
pub fn type_by_name(name: &str) -> Option<TypeTag> {
    const DATA_TYPES: &[(&str, TypeTag)] = &[
        ("i8", TypeTag::I8),
        ("i16", TypeTag::I16),
        ("i32", TypeTag::I32),
        ("i64", TypeTag::I64),
        ("u8", TypeTag::U8),
        ("u16", TypeTag::U16),
        ("u32", TypeTag::U32),
        ("u64", TypeTag::U64),
        ("str", TypeTag::Str),
        ("real", TypeTag::Real),
        ("bool", TypeTag::Bool),
        ("void", TypeTag::Void),
        ("array", TypeTag::Array),
    ];

    DATA_TYPES
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, t)| *t)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_finds_known_builtins() {
        assert!(lookup("print").is_some());
        assert_eq!(lookup("sqrt").unwrap().arity, Some(1));
        assert!(lookup("nope").is_none());
    }

    #[test]
    fn print_is_variadic() {
        assert_eq!(lookup("print").unwrap().arity, None);
    }

    #[test]
    fn type_names_resolve() {
        assert_eq!(type_by_name("i32"), Some(TypeTag::I32));
        assert_eq!(type_by_name("array"), Some(TypeTag::Array));
        assert_eq!(type_by_name("int"), None);
    }
}
