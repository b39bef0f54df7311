//! Key-value attributes attached to records.
//!
//! Variable lists are immutable and kept sorted by key; "modification"
//! returns a new list.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::errors::{ensure_invariant, Result};

/// Variable payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VarValue {
    Int(i64),
    Double(f64),
    Bool(bool),
    Text(Arc<str>),
}

/// One attached attribute
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub key: Arc<str>,
    pub value: VarValue,
}

impl Variable {
    pub fn new(key: &str, value: VarValue) -> Self {
        Self {
            key: Arc::from(key),
            value,
        }
    }
}

/// Immutable attribute list sorted by key
pub type VarList = Arc<[Variable]>;

/// Shared empty list
pub fn no_vars() -> VarList {
    Arc::from(Vec::new())
}

/// Copy of `vars` with `var` inserted (replacing any entry with the same key)
pub fn with_var(vars: &VarList, var: Variable) -> VarList {
    match vars.binary_search_by(|v| v.key.as_ref().cmp(var.key.as_ref())) {
        Ok(i) if vars[i] == var => vars.clone(),
        Ok(i) => {
            let mut list = vars.to_vec();
            list[i] = var;
            Arc::from(list)
        }
        Err(i) => {
            let mut list = vars.to_vec();
            list.insert(i, var);
            Arc::from(list)
        }
    }
}

/// Copy of `vars` without `key`
pub fn without_var(vars: &VarList, key: &str) -> VarList {
    match vars.binary_search_by(|v| v.key.as_ref().cmp(key)) {
        Ok(i) => {
            let mut list = vars.to_vec();
            list.remove(i);
            Arc::from(list)
        }
        Err(_) => vars.clone(),
    }
}

pub fn find_var<'a>(vars: &'a VarList, key: &str) -> Option<&'a Variable> {
    vars.binary_search_by(|v| v.key.as_ref().cmp(key))
        .ok()
        .map(|i| &vars[i])
}

/// Keys must be non-empty and strictly increasing
pub fn check_vars(vars: &VarList) -> Result<()> {
    for (i, var) in vars.iter().enumerate() {
        ensure_invariant!(!var.key.is_empty(), "vars[{}] has an empty key", i);
        if i > 0 {
            ensure_invariant!(
                vars[i - 1].key < var.key,
                "vars[{}] key {:?} not after {:?}",
                i,
                var.key,
                vars[i - 1].key
            );
        }
    }
    Ok(())
}
