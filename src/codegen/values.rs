use std::fmt;

use crate::diagnostics::CompileError;

/// C representation of a runtime value slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CType {
    /// `PyObject *`, NULL signals an exception.
    Object,
    /// Tri-state boolean with a dedicated exception value.
    Bool,
    /// Result-less operation that can still fail.
    Void,
}

impl CType {
    pub fn parse(decl: &str) -> Result<CType, CompileError> {
        match decl.trim() {
            "PyObject *" | "PyObject*" => Ok(CType::Object),
            "rt_bool" => Ok(CType::Bool),
            "rt_void" => Ok(CType::Void),
            _ => Err(CompileError::unknown_c_type(decl)),
        }
    }

    pub fn c_name(self) -> &'static str {
        match self {
            CType::Object => "PyObject *",
            CType::Bool => "rt_bool",
            CType::Void => "rt_void",
        }
    }

    /// Condition that is true when `name` holds this type's exception marker.
    pub fn exception_check_condition(self, name: &str) -> String {
        match self {
            CType::Object => format!("{name} == NULL"),
            CType::Bool => format!("{name} == RT_BOOL_EXCEPTION"),
            CType::Void => format!("{name} == RT_VOID_EXCEPTION"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ownership {
    /// The current scope must release it.
    OwnedReference,
    /// Someone else keeps it alive.
    BorrowedReference,
    /// Plain C value, nothing to release.
    ValueType,
}

/// Compile-time handle to a runtime value slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TempName {
    name: String,
    c_type: CType,
    ownership: Ownership,
}

impl TempName {
    pub fn owned(name: impl Into<String>) -> Self {
        Self { name: name.into(), c_type: CType::Object, ownership: Ownership::OwnedReference }
    }

    pub fn borrowed(name: impl Into<String>) -> Self {
        Self { name: name.into(), c_type: CType::Object, ownership: Ownership::BorrowedReference }
    }

    pub fn value(name: impl Into<String>, c_type: CType) -> Self {
        if c_type == CType::Object {
            panic!("ICE: object slot declared as value type");
        }
        Self { name: name.into(), c_type, ownership: Ownership::ValueType }
    }

    /// Build a handle from a C declaration string. Object slots start owned.
    pub fn from_decl(name: impl Into<String>, decl: &str) -> Result<Self, CompileError> {
        let name = name.into();
        Ok(match CType::parse(decl)? {
            CType::Object => Self::owned(name),
            c_type => Self::value(name, c_type),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn c_type(&self) -> CType {
        self.c_type
    }

    pub fn ownership(&self) -> Ownership {
        self.ownership
    }

    /// Whether the scope holding this handle is obliged to release it.
    pub fn has_cleanup_obligation(&self) -> bool {
        self.ownership == Ownership::OwnedReference
    }

    pub fn release_code(&self) -> Option<String> {
        match self.ownership {
            Ownership::OwnedReference => Some(format!("Py_DECREF({});", self.name)),
            Ownership::BorrowedReference | Ownership::ValueType => None,
        }
    }

    pub fn take_reference_code(&self) -> Option<String> {
        match self.c_type {
            CType::Object => Some(format!("Py_INCREF({});", self.name)),
            CType::Bool | CType::Void => None,
        }
    }

    pub fn exception_check_condition(&self) -> String {
        self.c_type.exception_check_condition(&self.name)
    }
}

impl fmt::Display for TempName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}
