use crate::errors::{ensure_invariant, Result};
use crate::features::identity::{ArcId, ArcProtoId, NodeId, PortProtoId};
use crate::shared::models::{check_vars, no_vars, with_var, without_var, Name, Point, VarList, Variable};

/// One end of an arc: the node, the port on its prototype, and the location
#[derive(Debug, Clone, PartialEq)]
pub struct ArcEnd {
    pub node_id: NodeId,
    pub port_id: PortProtoId,
    pub location: Point,
}

impl ArcEnd {
    pub fn new(node_id: NodeId, port_id: impl Into<PortProtoId>, location: Point) -> Self {
        Self {
            node_id,
            port_id: port_id.into(),
            location,
        }
    }
}

/// Arc instance inside a cell
#[derive(Debug, Clone, PartialEq)]
pub struct ImmutableArcInst {
    pub arc_id: ArcId,
    pub proto_id: ArcProtoId,
    pub name: Name,
    pub tail: ArcEnd,
    pub head: ArcEnd,
    pub width: i64,
    pub flags: u32,
    pub vars: VarList,
}

impl ImmutableArcInst {
    pub const TAIL: usize = 0;
    pub const HEAD: usize = 1;

    pub fn new(
        arc_id: ArcId,
        proto_id: ArcProtoId,
        name: Name,
        tail: ArcEnd,
        head: ArcEnd,
        width: i64,
    ) -> Self {
        Self {
            arc_id,
            proto_id,
            name,
            tail,
            head,
            width,
            flags: 0,
            vars: no_vars(),
        }
    }

    /// `TAIL` or `HEAD`
    pub fn end(&self, end: usize) -> &ArcEnd {
        if end == Self::TAIL {
            &self.tail
        } else {
            &self.head
        }
    }

    pub fn with_name(&self, name: Name) -> Self {
        Self {
            name,
            ..self.clone()
        }
    }

    pub fn with_ends(&self, tail: ArcEnd, head: ArcEnd) -> Self {
        Self {
            tail,
            head,
            ..self.clone()
        }
    }

    pub fn with_width(&self, width: i64) -> Self {
        Self {
            width,
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
        ensure_invariant!(
            self.width >= 0,
            "{} {} has negative width {}",
            self.arc_id,
            self.name,
            self.width
        );
        check_vars(&self.vars)
    }
}
