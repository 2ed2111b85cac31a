//! Netlist nodes

use std::fmt;

/// Widest supported signal, in bits
pub const MAX_WIDTH: u8 = 64;

/// Bit mask covering `width` low bits
pub fn mask(width: u8) -> u64 {
    if width >= MAX_WIDTH {
        u64::MAX
    } else {
        (1u64 << width) - 1
    }
}

/// Node identifier (index into the netlist)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

impl NodeId {
    /// Get the node as a netlist index
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Single-operand operations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    /// Bitwise inversion
    Not,
    /// 1 if any bit is set
    ReduceOr,
    /// 1 if all bits are set
    ReduceAnd,
}

/// Two-operand operations
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOp {
    /// Bitwise and
    And,
    /// Bitwise or
    Or,
    /// Bitwise xor
    Xor,
    /// Wrapping addition
    Add,
    /// Wrapping subtraction
    Sub,
    /// Equality (1 bit)
    Eq,
    /// Inequality (1 bit)
    Ne,
    /// Unsigned less-than (1 bit)
    Lt,
}

impl BinaryOp {
    /// Operation name used in error messages
    pub fn name(&self) -> &'static str {
        match self {
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Eq => "eq",
            BinaryOp::Ne => "ne",
            BinaryOp::Lt => "lt",
        }
    }

    /// Check if the result is a single comparison bit
    pub fn is_comparison(&self) -> bool {
        matches!(self, BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt)
    }

    /// Apply the operation to two masked operands
    pub fn apply(&self, lhs: u64, rhs: u64, width: u8) -> u64 {
        let m = mask(width);
        match self {
            BinaryOp::And => lhs & rhs,
            BinaryOp::Or => lhs | rhs,
            BinaryOp::Xor => lhs ^ rhs,
            BinaryOp::Add => lhs.wrapping_add(rhs) & m,
            BinaryOp::Sub => lhs.wrapping_sub(rhs) & m,
            BinaryOp::Eq => (lhs == rhs) as u64,
            BinaryOp::Ne => (lhs != rhs) as u64,
            BinaryOp::Lt => (lhs < rhs) as u64,
        }
    }
}

/// A combinational node
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Node {
    /// Primary input, assigned per evaluation
    Input {
        /// Input name (unique)
        name: String,
    },
    /// Constant value
    Const {
        /// Value, already masked to the node width
        value: u64,
    },
    /// Named placeholder driven later by another node
    Wire {
        /// Wire name
        name: String,
        /// Driving node, set once
        driver: Option<NodeId>,
    },
    /// Single-operand operation
    Unary {
        /// Operation
        op: UnaryOp,
        /// Operand
        arg: NodeId,
    },
    /// Two-operand operation
    Binary {
        /// Operation
        op: BinaryOp,
        /// First operand
        lhs: NodeId,
        /// Second operand
        rhs: NodeId,
    },
    /// Two-way multiplexer
    Mux {
        /// 1-bit select
        select: NodeId,
        /// Value when select is 1
        if_true: NodeId,
        /// Value when select is 0
        if_false: NodeId,
    },
    /// AND-OR multiplexer keyed by one-hot selects
    ///
    /// Evaluates to the OR of every value whose select is high, so it is a
    /// plain selection whenever at most one select is high.
    OneHot {
        /// 1-bit selects
        selects: Vec<NodeId>,
        /// Candidate values, one per select
        values: Vec<NodeId>,
    },
}

impl Node {
    /// Nodes this node reads
    pub fn operands(&self) -> Vec<NodeId> {
        match self {
            Node::Input { .. } | Node::Const { .. } => Vec::new(),
            Node::Wire { driver, .. } => driver.iter().copied().collect(),
            Node::Unary { arg, .. } => vec![*arg],
            Node::Binary { lhs, rhs, .. } => vec![*lhs, *rhs],
            Node::Mux {
                select,
                if_true,
                if_false,
            } => vec![*select, *if_true, *if_false],
            Node::OneHot { selects, values } => {
                selects.iter().chain(values.iter()).copied().collect()
            }
        }
    }

    /// Name of inputs and wires
    pub fn name(&self) -> Option<&str> {
        match self {
            Node::Input { name } | Node::Wire { name, .. } => Some(name),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask() {
        assert_eq!(mask(1), 1);
        assert_eq!(mask(8), 0xff);
        assert_eq!(mask(64), u64::MAX);
    }

    #[test]
    fn test_binary_apply_wraps() {
        assert_eq!(BinaryOp::Add.apply(0xff, 1, 8), 0);
        assert_eq!(BinaryOp::Sub.apply(0, 1, 4), 0xf);
        assert_eq!(BinaryOp::Lt.apply(2, 3, 8), 1);
        assert_eq!(BinaryOp::Eq.apply(2, 3, 8), 0);
    }

    #[test]
    fn test_operands() {
        let node = Node::OneHot {
            selects: vec![NodeId(0), NodeId(1)],
            values: vec![NodeId(2), NodeId(3)],
        };
        assert_eq!(node.operands().len(), 4);

        let wire = Node::Wire {
            name: "w".to_string(),
            driver: None,
        };
        assert!(wire.operands().is_empty());
        assert_eq!(wire.name(), Some("w"));
    }
}
