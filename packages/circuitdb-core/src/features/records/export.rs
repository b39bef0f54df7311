use crate::errors::Result;
use crate::features::identity::{ExportId, NodeId, PortProtoId};
use crate::shared::models::{check_vars, no_vars, with_var, without_var, Name, VarList, Variable};

/// Electrical role of an export
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PortCharacteristic {
    #[default]
    Unknown,
    Input,
    Output,
    Bidirectional,
    Power,
    Ground,
    Clock,
}

impl PortCharacteristic {
    const ALL: [PortCharacteristic; 7] = [
        PortCharacteristic::Unknown,
        PortCharacteristic::Input,
        PortCharacteristic::Output,
        PortCharacteristic::Bidirectional,
        PortCharacteristic::Power,
        PortCharacteristic::Ground,
        PortCharacteristic::Clock,
    ];

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }
}

/// Export: a port of the cell re-exposed from one of its node's ports
#[derive(Debug, Clone, PartialEq)]
pub struct ImmutableExport {
    pub export_id: ExportId,
    pub name: Name,
    pub original_node_id: NodeId,
    pub original_port_id: PortProtoId,
    pub characteristic: PortCharacteristic,
    pub always_drawn: bool,
    pub body_only: bool,
    pub vars: VarList,
}

impl ImmutableExport {
    pub fn new(
        export_id: ExportId,
        name: Name,
        original_node_id: NodeId,
        original_port_id: impl Into<PortProtoId>,
    ) -> Self {
        Self {
            export_id,
            name,
            original_node_id,
            original_port_id: original_port_id.into(),
            characteristic: PortCharacteristic::Unknown,
            always_drawn: false,
            body_only: false,
            vars: no_vars(),
        }
    }

    pub fn with_name(&self, name: Name) -> Self {
        Self {
            name,
            ..self.clone()
        }
    }

    pub fn with_original_port(&self, node_id: NodeId, port_id: PortProtoId) -> Self {
        Self {
            original_node_id: node_id,
            original_port_id: port_id,
            ..self.clone()
        }
    }

    pub fn with_characteristic(&self, characteristic: PortCharacteristic) -> Self {
        Self {
            characteristic,
            ..self.clone()
        }
    }

    pub fn with_always_drawn(&self, always_drawn: bool) -> Self {
        Self {
            always_drawn,
            ..self.clone()
        }
    }

    pub fn with_body_only(&self, body_only: bool) -> Self {
        Self {
            body_only,
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
