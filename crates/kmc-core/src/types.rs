//! The closed set of possible particle types and its dense encoding.

use indexmap::IndexSet;

use crate::error::InputError;
use crate::id::TypeCode;

/// Name of the wildcard type.
pub const WILDCARD_NAME: &str = "*";

/// Bidirectional map between type names and dense [`TypeCode`]s.
///
/// Code 0 is always the wildcard; declared types follow in declaration
/// order, so the encoding is a pure function of the input records.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeTable {
    names: IndexSet<String>,
}

impl TypeTable {
    /// Build the table from the declared possible types.
    ///
    /// Rejects empty names, duplicates, and an explicit `"*"`.
    pub fn new<I, S>(possible_types: I) -> Result<Self, InputError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names = IndexSet::new();
        names.insert(WILDCARD_NAME.to_string());
        for name in possible_types {
            let name = name.into();
            if name.is_empty() {
                return Err(InputError::invalid("possible_types", "empty type name"));
            }
            if name == WILDCARD_NAME {
                return Err(InputError::invalid(
                    "possible_types",
                    "the wildcard '*' is implicit and may not be declared",
                ));
            }
            if !names.insert(name.clone()) {
                return Err(InputError::invalid(
                    "possible_types",
                    format!("duplicate type '{name}'"),
                ));
            }
        }
        if names.len() > u16::MAX as usize {
            return Err(InputError::invalid(
                "possible_types",
                format!("{} types exceed the encoding limit", names.len() - 1),
            ));
        }
        Ok(Self { names })
    }

    /// Code of a declared type. The wildcard is not accepted.
    pub fn code(&self, name: &str) -> Result<TypeCode, InputError> {
        match self.names.get_index_of(name) {
            Some(0) | None => Err(InputError::UnknownType {
                name: name.to_string(),
            }),
            Some(i) => Ok(TypeCode(i as u16)),
        }
    }

    /// Code of a declared type or the wildcard.
    pub fn pattern_code(&self, name: &str) -> Result<TypeCode, InputError> {
        self.names
            .get_index_of(name)
            .map(|i| TypeCode(i as u16))
            .ok_or_else(|| InputError::UnknownType {
                name: name.to_string(),
            })
    }

    /// Name for a code.
    ///
    /// # Panics
    ///
    /// Panics if `code` was not produced by this table.
    pub fn name(&self, code: TypeCode) -> &str {
        self.names
            .get_index(code.index())
            .expect("type code produced by this table")
    }

    /// Number of codes, the wildcard included.
    ///
    /// Per-type arrays are sized with this so they can be indexed by
    /// [`TypeCode::index`] directly.
    pub fn code_count(&self) -> usize {
        self.names.len()
    }

    /// Declared types in code order, the wildcard excluded.
    pub fn declared(&self) -> impl Iterator<Item = (TypeCode, &str)> + '_ {
        self.names
            .iter()
            .enumerate()
            .skip(1)
            .map(|(i, n)| (TypeCode(i as u16), n.as_str()))
    }

    /// Number of declared types.
    pub fn declared_count(&self) -> usize {
        self.names.len() - 1
    }
}
