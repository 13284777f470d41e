use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::ir::Constant;

/// Deduplicated table of literal values referenced by generated code.
///
/// `None` and the booleans are runtime singletons and never enter the pool.
#[derive(Debug, Default)]
pub struct ConstantPool {
    entries: Vec<(Constant, String)>,
    index: HashMap<Constant, usize>,
}

impl ConstantPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Symbolic reference for `value`, interning it on first use.
    pub fn intern(&mut self, value: &Constant) -> String {
        match value {
            Constant::None => return "Py_None".to_string(),
            Constant::Bool(true) => return "Py_True".to_string(),
            Constant::Bool(false) => return "Py_False".to_string(),
            Constant::Int(_) | Constant::Str(_) => {}
        }

        if let Some(&idx) = self.index.get(value) {
            return self.entries[idx].1.clone();
        }

        let code = constant_identifier(value);
        self.index.insert(value.clone(), self.entries.len());
        self.entries.push((value.clone(), code.clone()));
        code
    }

    /// Interned constants in first-use order.
    pub fn entries(&self) -> &[(Constant, String)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn constant_identifier(value: &Constant) -> String {
    match value {
        Constant::Int(n) if *n < 0 => format!("const_int_neg_{}", n.unsigned_abs()),
        Constant::Int(n) => format!("const_int_{n}"),
        Constant::Str(s) if s.is_empty() => "const_str_empty".to_string(),
        Constant::Str(s) if is_plain(s) => format!("const_str_plain_{s}"),
        Constant::Str(s) => format!("const_str_digest_{}", digest(s)),
        Constant::None | Constant::Bool(_) => unreachable!("singletons are not pooled"),
    }
}

fn is_plain(s: &str) -> bool {
    s.len() <= 40 && s.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

fn digest(s: &str) -> String {
    let hash = Sha256::digest(s.as_bytes());
    hash.iter().take(16).map(|b| format!("{b:02x}")).collect()
}
