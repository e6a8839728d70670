use std::fmt::{Display, Formatter};

use strum::{EnumString, VariantArray};

use crate::graph::NodeHandle;

/// The two primitive actions of the game.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, EnumString, VariantArray, strum::Display)]
pub enum MoveKind {
    /// The node pays one unit to every neighbor.
    Give,
    /// The node collects one unit from every neighbor.
    Take,
}

impl MoveKind {
    /// The kind that undoes `self`.
    pub fn invert(&self) -> Self {
        match self {
            Self::Give => Self::Take,
            Self::Take => Self::Give,
        }
    }
}

/// A single [`MoveKind`] applied to one node.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Move {
    /// What the node does.
    pub kind: MoveKind,
    /// Which node acts.
    pub node: NodeHandle,
}

impl Move {
    /// Shorthand for a [`MoveKind::Give`] by `node`.
    pub fn give(node: NodeHandle) -> Self {
        Self { kind: MoveKind::Give, node }
    }

    /// Shorthand for a [`MoveKind::Take`] by `node`.
    pub fn take(node: NodeHandle) -> Self {
        Self { kind: MoveKind::Take, node }
    }

    /// The move which, applied right after `self`, restores the previous node values.
    pub fn inverse(&self) -> Self {
        Self { kind: self.kind.invert(), node: self.node }
    }
}

impl Display for Move {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({})", self.kind, self.node)
    }
}
