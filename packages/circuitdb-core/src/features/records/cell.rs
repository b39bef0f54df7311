use crate::errors::Result;
use crate::features::identity::{CellId, TechId};
use crate::shared::models::{check_vars, no_vars, with_var, without_var, Name, VarList, Variable};

/// Cell-level persistent data
#[derive(Debug, Clone, PartialEq)]
pub struct ImmutableCell {
    pub cell_id: CellId,
    pub cell_name: Name,
    /// Required before a snapshot can be built from this record
    pub tech_id: Option<TechId>,
    /// Milliseconds since the epoch
    pub creation_date: i64,
    pub revision_date: i64,
    pub flags: u32,
    pub vars: VarList,
}

impl ImmutableCell {
    pub fn new(cell_id: CellId, cell_name: Name, creation_date: i64) -> Self {
        Self {
            cell_id,
            cell_name,
            tech_id: None,
            creation_date,
            revision_date: creation_date,
            flags: 0,
            vars: no_vars(),
        }
    }

    pub fn with_tech(&self, tech_id: TechId) -> Self {
        Self {
            tech_id: Some(tech_id),
            ..self.clone()
        }
    }

    pub fn with_name(&self, cell_name: Name) -> Self {
        Self {
            cell_name,
            ..self.clone()
        }
    }

    pub fn with_revision_date(&self, revision_date: i64) -> Self {
        Self {
            revision_date,
            ..self.clone()
        }
    }

    pub fn with_flags(&self, flags: u32) -> Self {
        Self {
            flags,
            ..self.clone()
        }
    }

    pub fn with_var(&self, var: Variable) -> Self {
        Self {
            vars: with_var(&self.vars, var),
            ..self.clone()
        }
    }

    pub fn without_var(&self, key: &str) -> Self {
        Self {
            vars: without_var(&self.vars, key),
            ..self.clone()
        }
    }

    pub fn check(&self) -> Result<()> {
        check_vars(&self.vars)
    }
}
