//! Value types shared by every record kind

pub mod geometry;
pub mod name;
pub mod variable;

pub use geometry::{Orientation, Point, Rect};
pub use name::Name;
pub use variable::{check_vars, find_var, no_vars, with_var, without_var, VarList, VarValue, Variable};
