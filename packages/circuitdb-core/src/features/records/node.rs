use crate::errors::{ensure_invariant, Result};
use crate::features::identity::{NodeId, NodeProtoId};
use crate::shared::models::{
    check_vars, no_vars, with_var, without_var, Name, Orientation, Point, Rect, VarList, Variable,
};

/// Node instance inside a cell
#[derive(Debug, Clone, PartialEq)]
pub struct ImmutableNodeInst {
    pub node_id: NodeId,
    pub proto_id: NodeProtoId,
    pub name: Name,
    pub anchor: Point,
    pub orient: Orientation,
    /// Width and height before orientation; zero for subcell instances
    pub size: Point,
    pub flags: u32,
    pub vars: VarList,
}

impl ImmutableNodeInst {
    pub fn new(
        node_id: NodeId,
        proto_id: NodeProtoId,
        name: Name,
        anchor: Point,
        orient: Orientation,
        size: Point,
    ) -> Self {
        Self {
            node_id,
            proto_id,
            name,
            anchor,
            orient,
            size,
            flags: 0,
            vars: no_vars(),
        }
    }

    pub fn with_name(&self, name: Name) -> Self {
        Self {
            name,
            ..self.clone()
        }
    }

    pub fn with_anchor(&self, anchor: Point) -> Self {
        Self {
            anchor,
            ..self.clone()
        }
    }

    pub fn with_orient(&self, orient: Orientation) -> Self {
        Self {
            orient,
            ..self.clone()
        }
    }

    pub fn with_size(&self, size: Point) -> Self {
        Self {
            size,
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

    /// Extent in the parent's coordinates
    pub fn bounds(&self) -> Rect {
        let (w, h) = if self.orient.swaps_axes() {
            (self.size.y, self.size.x)
        } else {
            (self.size.x, self.size.y)
        };
        Rect::centered(self.anchor, w, h)
    }

    pub fn check(&self) -> Result<()> {
        ensure_invariant!(
            self.size.x >= 0 && self.size.y >= 0,
            "{} {} has negative size {:?}",
            self.node_id,
            self.name,
            self.size
        );
        if self.proto_id.is_cell() {
            ensure_invariant!(
                self.size == Point::ORIGIN,
                "subcell instance {} {} must have zero size",
                self.node_id,
                self.name
            );
        }
        check_vars(&self.vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::identity::IdManager;

    fn inst(ids: &IdManager, proto_is_cell: bool, size: Point) -> ImmutableNodeInst {
        let proto: NodeProtoId = if proto_is_cell {
            ids.get_or_create_cell_id("lib", "sub").unwrap().into()
        } else {
            ids.get_or_create_tech_id("t")
                .unwrap()
                .get_or_create_primitive_node_id("p", &["a"])
                .unwrap()
                .into()
        };
        ImmutableNodeInst::new(
            NodeId(0),
            proto,
            Name::new("n0").unwrap(),
            Point::new(10, 20),
            Orientation::R90,
            size,
        )
    }

    #[test]
    fn test_bounds_swap_axes() {
        let ids = IdManager::new();
        let node = inst(&ids, false, Point::new(4, 2));
        let b = node.bounds();
        assert_eq!(b.width(), 2);
        assert_eq!(b.height(), 4);
        assert_eq!(node.with_orient(Orientation::R0).bounds().width(), 4);
    }

    #[test]
    fn test_self_check() {
        let ids = IdManager::new();
        assert!(inst(&ids, false, Point::new(4, 2)).check().is_ok());
        assert!(inst(&ids, false, Point::new(-1, 2)).check().is_err());
        assert!(inst(&ids, true, Point::ORIGIN).check().is_ok());
        assert!(inst(&ids, true, Point::new(1, 1)).check().is_err());
    }

    #[test]
    fn test_with_copies_leave_original() {
        let ids = IdManager::new();
        let node = inst(&ids, false, Point::new(4, 2));
        let moved = node.with_anchor(Point::ORIGIN);
        assert_eq!(node.anchor, Point::new(10, 20));
        assert_eq!(moved.anchor, Point::ORIGIN);
        assert_eq!(moved.name, node.name);
    }
}
