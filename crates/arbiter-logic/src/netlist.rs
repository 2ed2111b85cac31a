//! Netlist builder
//!
//! Nodes are appended and never removed. Every node except a wire reads
//! only nodes created before it; wires may be driven by later nodes, which
//! is how the scheduler closes the loop between a unit's `run` output and
//! the logic that reads it.

use crate::error::{LogicError, LogicResult};
use crate::layout::{Layout, StructValue};
use crate::node::{mask, BinaryOp, Node, NodeId, UnaryOp, MAX_WIDTH};
use std::collections::{HashMap, VecDeque};

/// Combinational netlist
#[derive(Clone, Debug, Default)]
pub struct Netlist {
    nodes: Vec<Node>,
    widths: Vec<u8>,
    inputs: HashMap<String, NodeId>,
    constants: HashMap<(u64, u8), NodeId>,
}

fn check_width(width: u8) -> LogicResult<()> {
    if width == 0 || width > MAX_WIDTH {
        return Err(LogicError::InvalidWidth(width as u32));
    }
    Ok(())
}

impl Netlist {
    /// Create an empty netlist
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, node: Node, width: u8) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.widths.push(width);
        id
    }

    /// Look up a node
    pub fn node(&self, id: NodeId) -> LogicResult<&Node> {
        self.nodes.get(id.index()).ok_or(LogicError::UnknownNode(id))
    }

    /// Width of a node in bits
    pub fn width(&self, id: NodeId) -> LogicResult<u8> {
        self.widths
            .get(id.index())
            .copied()
            .ok_or(LogicError::UnknownNode(id))
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the netlist is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Display name of a node: its own name if it has one, else `nN`
    pub fn label(&self, id: NodeId) -> String {
        self.nodes
            .get(id.index())
            .and_then(|n| n.name())
            .map(str::to_string)
            .unwrap_or_else(|| id.to_string())
    }

    // ==================== Leaves ====================

    /// Declare a named primary input
    pub fn input(&mut self, name: &str, width: u8) -> LogicResult<NodeId> {
        check_width(width)?;
        if self.inputs.contains_key(name) {
            return Err(LogicError::DuplicateName(name.to_string()));
        }
        let id = self.push(
            Node::Input {
                name: name.to_string(),
            },
            width,
        );
        self.inputs.insert(name.to_string(), id);
        Ok(id)
    }

    /// Declare a 1-bit primary input
    pub fn bit_input(&mut self, name: &str) -> LogicResult<NodeId> {
        self.input(name, 1)
    }

    /// Find an input by name
    pub fn find_input(&self, name: &str) -> Option<NodeId> {
        self.inputs.get(name).copied()
    }

    /// All inputs as `(node, name, width)`, in creation order
    pub fn inputs(&self) -> Vec<(NodeId, &str, u8)> {
        let mut out: Vec<_> = self
            .inputs
            .iter()
            .map(|(name, id)| (*id, name.as_str(), self.widths[id.index()]))
            .collect();
        out.sort_by_key(|(id, _, _)| *id);
        out
    }

    /// Constant of the given width (shared per value)
    pub fn constant(&mut self, value: u64, width: u8) -> LogicResult<NodeId> {
        check_width(width)?;
        let value = value & mask(width);
        if let Some(id) = self.constants.get(&(value, width)) {
            return Ok(*id);
        }
        let id = self.push(Node::Const { value }, width);
        self.constants.insert((value, width), id);
        Ok(id)
    }

    /// 1-bit constant one
    pub fn high(&mut self) -> NodeId {
        self.bool_const(true)
    }

    /// 1-bit constant zero
    pub fn low(&mut self) -> NodeId {
        self.bool_const(false)
    }

    fn bool_const(&mut self, value: bool) -> NodeId {
        let key = (value as u64, 1);
        if let Some(id) = self.constants.get(&key) {
            return *id;
        }
        let id = self.push(Node::Const { value: key.0 }, 1);
        self.constants.insert(key, id);
        id
    }

    /// Declare a wire to be driven later
    pub fn wire(&mut self, name: &str, width: u8) -> LogicResult<NodeId> {
        check_width(width)?;
        Ok(self.push(
            Node::Wire {
                name: name.to_string(),
                driver: None,
            },
            width,
        ))
    }

    /// Connect a wire to its driver
    pub fn drive(&mut self, wire: NodeId, source: NodeId) -> LogicResult<()> {
        let source_width = self.width(source)?;
        let wire_width = self.width(wire)?;
        if source_width != wire_width {
            return Err(LogicError::WidthMismatch {
                op: "drive",
                left: wire_width,
                right: source_width,
            });
        }
        match &mut self.nodes[wire.index()] {
            Node::Wire { name, driver } => {
                if driver.is_some() {
                    return Err(LogicError::AlreadyDriven(name.clone()));
                }
                *driver = Some(source);
                Ok(())
            }
            _ => Err(LogicError::NotAWire(wire)),
        }
    }

    /// Check if a wire already has a driver
    pub fn is_driven(&self, wire: NodeId) -> LogicResult<bool> {
        match self.node(wire)? {
            Node::Wire { driver, .. } => Ok(driver.is_some()),
            _ => Err(LogicError::NotAWire(wire)),
        }
    }

    // ==================== Operators ====================

    fn unary(&mut self, op: UnaryOp, arg: NodeId) -> LogicResult<NodeId> {
        let width = self.width(arg)?;
        let out = match op {
            UnaryOp::Not => width,
            UnaryOp::ReduceOr | UnaryOp::ReduceAnd => 1,
        };
        Ok(self.push(Node::Unary { op, arg }, out))
    }

    fn binary(&mut self, op: BinaryOp, lhs: NodeId, rhs: NodeId) -> LogicResult<NodeId> {
        let left = self.width(lhs)?;
        let right = self.width(rhs)?;
        if left != right {
            return Err(LogicError::WidthMismatch {
                op: op.name(),
                left,
                right,
            });
        }
        let out = if op.is_comparison() { 1 } else { left };
        Ok(self.push(Node::Binary { op, lhs, rhs }, out))
    }

    /// Bitwise not
    pub fn not(&mut self, arg: NodeId) -> LogicResult<NodeId> {
        self.unary(UnaryOp::Not, arg)
    }

    /// 1 if any bit of `arg` is set
    pub fn any(&mut self, arg: NodeId) -> LogicResult<NodeId> {
        self.unary(UnaryOp::ReduceOr, arg)
    }

    /// 1 if every bit of `arg` is set
    pub fn all(&mut self, arg: NodeId) -> LogicResult<NodeId> {
        self.unary(UnaryOp::ReduceAnd, arg)
    }

    /// Bitwise and
    pub fn and(&mut self, lhs: NodeId, rhs: NodeId) -> LogicResult<NodeId> {
        self.binary(BinaryOp::And, lhs, rhs)
    }

    /// Bitwise or
    pub fn or(&mut self, lhs: NodeId, rhs: NodeId) -> LogicResult<NodeId> {
        self.binary(BinaryOp::Or, lhs, rhs)
    }

    /// Bitwise xor
    pub fn xor(&mut self, lhs: NodeId, rhs: NodeId) -> LogicResult<NodeId> {
        self.binary(BinaryOp::Xor, lhs, rhs)
    }

    /// Wrapping addition
    pub fn add(&mut self, lhs: NodeId, rhs: NodeId) -> LogicResult<NodeId> {
        self.binary(BinaryOp::Add, lhs, rhs)
    }

    /// Wrapping subtraction
    pub fn sub(&mut self, lhs: NodeId, rhs: NodeId) -> LogicResult<NodeId> {
        self.binary(BinaryOp::Sub, lhs, rhs)
    }

    /// Equality comparison
    pub fn eq(&mut self, lhs: NodeId, rhs: NodeId) -> LogicResult<NodeId> {
        self.binary(BinaryOp::Eq, lhs, rhs)
    }

    /// Inequality comparison
    pub fn ne(&mut self, lhs: NodeId, rhs: NodeId) -> LogicResult<NodeId> {
        self.binary(BinaryOp::Ne, lhs, rhs)
    }

    /// Unsigned less-than
    pub fn lt(&mut self, lhs: NodeId, rhs: NodeId) -> LogicResult<NodeId> {
        self.binary(BinaryOp::Lt, lhs, rhs)
    }

    /// `!premise | conclusion`
    pub fn implies(&mut self, premise: NodeId, conclusion: NodeId) -> LogicResult<NodeId> {
        let not_premise = self.not(premise)?;
        self.or(not_premise, conclusion)
    }

    /// Two-way multiplexer
    pub fn mux(&mut self, select: NodeId, if_true: NodeId, if_false: NodeId) -> LogicResult<NodeId> {
        let sel = self.width(select)?;
        if sel != 1 {
            return Err(LogicError::WidthMismatch {
                op: "mux select",
                left: 1,
                right: sel,
            });
        }
        let t = self.width(if_true)?;
        let f = self.width(if_false)?;
        if t != f {
            return Err(LogicError::WidthMismatch {
                op: "mux",
                left: t,
                right: f,
            });
        }
        Ok(self.push(
            Node::Mux {
                select,
                if_true,
                if_false,
            },
            t,
        ))
    }

    /// AND of 1-bit operands; constant one when empty
    pub fn and_all(&mut self, operands: &[NodeId]) -> LogicResult<NodeId> {
        match operands.split_first() {
            None => Ok(self.high()),
            Some((first, rest)) => rest
                .iter()
                .try_fold(*first, |acc, &next| self.and(acc, next)),
        }
    }

    /// OR of 1-bit operands; constant zero when empty
    pub fn or_all(&mut self, operands: &[NodeId]) -> LogicResult<NodeId> {
        match operands.split_first() {
            None => Ok(self.low()),
            Some((first, rest)) => rest
                .iter()
                .try_fold(*first, |acc, &next| self.or(acc, next)),
        }
    }

    /// AND-OR multiplexer keyed by one-hot selects
    pub fn one_hot(&mut self, selects: &[NodeId], values: &[NodeId]) -> LogicResult<NodeId> {
        if selects.len() != values.len() {
            return Err(LogicError::ArityMismatch {
                expected: selects.len(),
                found: values.len(),
            });
        }
        let first = *values.first().ok_or(LogicError::EmptyOperands("one_hot"))?;
        let width = self.width(first)?;
        for &sel in selects {
            let w = self.width(sel)?;
            if w != 1 {
                return Err(LogicError::WidthMismatch {
                    op: "one_hot select",
                    left: 1,
                    right: w,
                });
            }
        }
        for &value in values {
            let w = self.width(value)?;
            if w != width {
                return Err(LogicError::WidthMismatch {
                    op: "one_hot",
                    left: width,
                    right: w,
                });
            }
        }
        Ok(self.push(
            Node::OneHot {
                selects: selects.to_vec(),
                values: values.to_vec(),
            },
            width,
        ))
    }

    // ==================== Structured values ====================

    /// One wire per field, named `prefix.field`
    pub fn struct_wire(&mut self, prefix: &str, layout: &Layout) -> LogicResult<StructValue> {
        let nodes = layout
            .fields()
            .iter()
            .map(|f| self.wire(&format!("{}.{}", prefix, f.name), f.width))
            .collect::<LogicResult<Vec<_>>>()?;
        StructValue::from_parts(layout.clone(), nodes)
    }

    /// One input per field, named `prefix.field`
    pub fn struct_input(&mut self, prefix: &str, layout: &Layout) -> LogicResult<StructValue> {
        let nodes = layout
            .fields()
            .iter()
            .map(|f| self.input(&format!("{}.{}", prefix, f.name), f.width))
            .collect::<LogicResult<Vec<_>>>()?;
        StructValue::from_parts(layout.clone(), nodes)
    }

    /// All-zero value of a layout
    pub fn struct_zero(&mut self, layout: &Layout) -> LogicResult<StructValue> {
        let nodes = layout
            .fields()
            .iter()
            .map(|f| self.constant(0, f.width))
            .collect::<LogicResult<Vec<_>>>()?;
        StructValue::from_parts(layout.clone(), nodes)
    }

    /// Bind existing nodes to a layout, checking each field width
    pub fn struct_from(&self, layout: &Layout, nodes: Vec<NodeId>) -> LogicResult<StructValue> {
        let value = StructValue::from_parts(layout.clone(), nodes)?;
        for (field, node) in layout.fields().iter().zip(value.nodes()) {
            let width = self.width(*node)?;
            if width != field.width {
                return Err(LogicError::WidthMismatch {
                    op: "struct field",
                    left: field.width,
                    right: width,
                });
            }
        }
        Ok(value)
    }

    /// Drive every field wire of `target` from `source`
    pub fn drive_struct(&mut self, target: &StructValue, source: &StructValue) -> LogicResult<()> {
        source.expect_layout(target.layout())?;
        for (wire, node) in target.nodes().iter().zip(source.nodes()) {
            self.drive(*wire, *node)?;
        }
        Ok(())
    }

    /// Field-wise one-hot multiplexer over structured values
    pub fn struct_one_hot(
        &mut self,
        layout: &Layout,
        selects: &[NodeId],
        values: &[StructValue],
    ) -> LogicResult<StructValue> {
        if values.is_empty() {
            return self.struct_zero(layout);
        }
        for value in values {
            value.expect_layout(layout)?;
        }
        let nodes = (0..layout.len())
            .map(|i| {
                let column: Vec<NodeId> = values.iter().map(|v| v.nodes()[i]).collect();
                self.one_hot(selects, &column)
            })
            .collect::<LogicResult<Vec<_>>>()?;
        StructValue::from_parts(layout.clone(), nodes)
    }

    // ==================== Levelization ====================

    /// Order nodes so that every node comes after its operands
    ///
    /// Uses Kahn's algorithm. Fails on undriven wires and on combinational
    /// loops, naming a node on the loop.
    pub fn levelize(&self) -> LogicResult<Vec<NodeId>> {
        let n = self.nodes.len();
        let mut pending = vec![0usize; n];
        let mut readers: Vec<Vec<NodeId>> = vec![Vec::new(); n];

        for (idx, node) in self.nodes.iter().enumerate() {
            if let Node::Wire { name, driver: None } = node {
                return Err(LogicError::UndrivenWire(name.clone()));
            }
            for operand in node.operands() {
                if operand.index() >= n {
                    return Err(LogicError::UnknownNode(operand));
                }
                pending[idx] += 1;
                readers[operand.index()].push(NodeId(idx as u32));
            }
        }

        let mut queue: VecDeque<NodeId> = (0..n)
            .filter(|&i| pending[i] == 0)
            .map(|i| NodeId(i as u32))
            .collect();
        let mut order = Vec::with_capacity(n);

        while let Some(id) = queue.pop_front() {
            order.push(id);
            for reader in &readers[id.index()] {
                pending[reader.index()] -= 1;
                if pending[reader.index()] == 0 {
                    queue.push_back(*reader);
                }
            }
        }

        if order.len() != n {
            // Prefer a named node when reporting the loop
            let stuck: Vec<usize> = (0..n).filter(|&i| pending[i] > 0).collect();
            let culprit = stuck
                .iter()
                .find(|&&i| self.nodes[i].name().is_some())
                .or(stuck.first())
                .map(|&i| self.label(NodeId(i as u32)))
                .unwrap_or_default();
            tracing::debug!("combinational loop: {} nodes unresolved", stuck.len());
            return Err(LogicError::CombinationalLoop(culprit));
        }

        Ok(order)
    }
}
