//! Netlist evaluation

use crate::error::{LogicError, LogicResult};
use crate::layout::StructValue;
use crate::netlist::Netlist;
use crate::node::{mask, Node, NodeId, UnaryOp};
use std::collections::HashMap;

/// Values assigned to primary inputs for one evaluation
///
/// Inputs that are not assigned read as zero.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Inputs {
    values: HashMap<NodeId, u64>,
}

impl Inputs {
    /// Create an empty assignment
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a value
    pub fn set(&mut self, input: NodeId, value: u64) -> &mut Self {
        self.values.insert(input, value);
        self
    }

    /// Assign a 1-bit value
    pub fn set_bit(&mut self, input: NodeId, value: bool) -> &mut Self {
        self.set(input, value as u64)
    }

    /// Builder form of [`Inputs::set`]
    pub fn with(mut self, input: NodeId, value: u64) -> Self {
        self.values.insert(input, value);
        self
    }

    /// Assigned value, if any
    pub fn get(&self, input: NodeId) -> Option<u64> {
        self.values.get(&input).copied()
    }

    /// Iterate over assignments
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, u64)> + '_ {
        self.values.iter().map(|(k, v)| (*k, *v))
    }
}

/// Result of evaluating every node once
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Evaluation {
    values: Vec<u64>,
}

impl Evaluation {
    /// Value of a node; zero for unknown nodes
    pub fn value(&self, node: NodeId) -> u64 {
        self.values.get(node.index()).copied().unwrap_or(0)
    }

    /// Check if the lowest bit of a node is set
    pub fn bit(&self, node: NodeId) -> bool {
        self.value(node) & 1 == 1
    }

    /// Field values of a structured value, in layout order
    pub fn fields(&self, value: &StructValue) -> Vec<u64> {
        value.nodes().iter().map(|n| self.value(*n)).collect()
    }
}

/// A finished netlist with a precomputed evaluation order
#[derive(Clone, Debug)]
pub struct Simulator {
    netlist: Netlist,
    order: Vec<NodeId>,
}

impl Simulator {
    /// Freeze a netlist, rejecting undriven wires and loops
    pub fn new(netlist: Netlist) -> LogicResult<Self> {
        let order = netlist.levelize()?;
        Ok(Self { netlist, order })
    }

    /// The frozen netlist
    pub fn netlist(&self) -> &Netlist {
        &self.netlist
    }

    /// Evaluate every node for the given inputs
    pub fn evaluate(&self, inputs: &Inputs) -> LogicResult<Evaluation> {
        for (id, _) in inputs.iter() {
            if !matches!(self.netlist.node(id)?, Node::Input { .. }) {
                return Err(LogicError::NotAnInput(id));
            }
        }

        let mut values = vec![0u64; self.netlist.len()];
        for &id in &self.order {
            let width = self.netlist.width(id)?;
            let value = match self.netlist.node(id)? {
                Node::Input { .. } => inputs.get(id).unwrap_or(0),
                Node::Const { value } => *value,
                Node::Wire { driver, .. } => driver.map(|d| values[d.index()]).unwrap_or(0),
                Node::Unary { op, arg } => {
                    let v = values[arg.index()];
                    match op {
                        UnaryOp::Not => !v,
                        UnaryOp::ReduceOr => (v != 0) as u64,
                        UnaryOp::ReduceAnd => {
                            let arg_width = self.netlist.width(*arg)?;
                            (v == mask(arg_width)) as u64
                        }
                    }
                }
                Node::Binary { op, lhs, rhs } => {
                    let operand_width = self.netlist.width(*lhs)?;
                    op.apply(values[lhs.index()], values[rhs.index()], operand_width)
                }
                Node::Mux {
                    select,
                    if_true,
                    if_false,
                } => {
                    if values[select.index()] & 1 == 1 {
                        values[if_true.index()]
                    } else {
                        values[if_false.index()]
                    }
                }
                Node::OneHot { selects, values: candidates } => selects
                    .iter()
                    .zip(candidates)
                    .filter(|(sel, _)| values[sel.index()] & 1 == 1)
                    .fold(0, |acc, (_, v)| acc | values[v.index()]),
            };
            values[id.index()] = value & mask(width);
        }

        Ok(Evaluation { values })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::Layout;

    #[test]
    fn test_evaluate_gates() {
        let mut net = Netlist::new();
        let a = net.bit_input("a").unwrap();
        let b = net.bit_input("b").unwrap();
        let and = net.and(a, b).unwrap();
        let or = net.or(a, b).unwrap();
        let not_a = net.not(a).unwrap();
        let imp = net.implies(a, b).unwrap();

        let sim = Simulator::new(net).unwrap();
        for (va, vb) in [(false, false), (false, true), (true, false), (true, true)] {
            let mut inputs = Inputs::new();
            inputs.set_bit(a, va).set_bit(b, vb);
            let eval = sim.evaluate(&inputs).unwrap();

            assert_eq!(eval.bit(and), va && vb);
            assert_eq!(eval.bit(or), va || vb);
            assert_eq!(eval.bit(not_a), !va);
            assert_eq!(eval.bit(imp), !va || vb);
        }
    }

    #[test]
    fn test_evaluate_words() {
        let mut net = Netlist::new();
        let x = net.input("x", 8).unwrap();
        let y = net.input("y", 8).unwrap();
        let sum = net.add(x, y).unwrap();
        let lt = net.lt(x, y).unwrap();
        let any = net.any(x).unwrap();
        let all = net.all(x).unwrap();
        let inv = net.not(x).unwrap();

        let sim = Simulator::new(net).unwrap();
        let eval = sim
            .evaluate(&Inputs::new().with(x, 0xf0).with(y, 0x20))
            .unwrap();

        assert_eq!(eval.value(sum), 0x10);
        assert!(!eval.bit(lt));
        assert!(eval.bit(any));
        assert!(!eval.bit(all));
        assert_eq!(eval.value(inv), 0x0f);
    }

    #[test]
    fn test_unassigned_inputs_read_zero() {
        let mut net = Netlist::new();
        let x = net.input("x", 4).unwrap();
        let sim = Simulator::new(net).unwrap();
        assert_eq!(sim.evaluate(&Inputs::new()).unwrap().value(x), 0);
    }

    #[test]
    fn test_input_values_are_masked() {
        let mut net = Netlist::new();
        let x = net.input("x", 4).unwrap();
        let sim = Simulator::new(net).unwrap();
        assert_eq!(sim.evaluate(&Inputs::new().with(x, 0xff)).unwrap().value(x), 0xf);
    }

    #[test]
    fn test_assigning_non_input_fails() {
        let mut net = Netlist::new();
        let one = net.high();
        let sim = Simulator::new(net).unwrap();
        assert_eq!(
            sim.evaluate(&Inputs::new().with(one, 0)),
            Err(LogicError::NotAnInput(one))
        );
    }

    #[test]
    fn test_one_hot_mux() {
        let mut net = Netlist::new();
        let s0 = net.bit_input("s0").unwrap();
        let s1 = net.bit_input("s1").unwrap();
        let v0 = net.constant(5, 8).unwrap();
        let v1 = net.constant(9, 8).unwrap();
        let out = net.one_hot(&[s0, s1], &[v0, v1]).unwrap();

        let sim = Simulator::new(net).unwrap();
        let eval = |a: bool, b: bool| {
            let mut inputs = Inputs::new();
            inputs.set_bit(s0, a).set_bit(s1, b);
            sim.evaluate(&inputs).unwrap().value(out)
        };

        assert_eq!(eval(false, false), 0);
        assert_eq!(eval(true, false), 5);
        assert_eq!(eval(false, true), 9);
    }

    #[test]
    fn test_wire_feeds_readers() {
        let mut net = Netlist::new();
        let layout = Layout::new([("v", 8)]).unwrap();
        let target = net.struct_wire("t", &layout).unwrap();
        let doubled = net.add(target.nodes()[0], target.nodes()[0]).unwrap();
        let source = net.struct_input("s", &layout).unwrap();
        net.drive_struct(&target, &source).unwrap();

        let sim = Simulator::new(net).unwrap();
        let eval = sim
            .evaluate(&Inputs::new().with(source.nodes()[0], 21))
            .unwrap();
        assert_eq!(eval.fields(&target), vec![21]);
        assert_eq!(eval.value(doubled), 42);
    }
}
