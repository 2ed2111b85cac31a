//! Argument combiners
//!
//! A method called from several sites sees one `data_in`. The combiner
//! decides how the per-site arguments merge, given one run bit per site.

use crate::unit::Combiner;
use arbiter_logic::{Layout, LogicResult, Netlist, NodeId, StructValue};

/// Default combiner: pick the arguments of the one running site
///
/// Field-wise one-hot multiplex keyed by the per-site run bits. When no site
/// runs every field reads zero.
pub(crate) fn one_hot(
    netlist: &mut Netlist,
    layout: &Layout,
    args: &[StructValue],
    runs: &[NodeId],
) -> LogicResult<StructValue> {
    netlist.struct_one_hot(layout, runs, args)
}

/// Fold the arguments of every running site, field by field
fn fold_running(
    netlist: &mut Netlist,
    layout: &Layout,
    args: &[StructValue],
    runs: &[NodeId],
    fold: fn(&mut Netlist, NodeId, NodeId) -> LogicResult<NodeId>,
) -> LogicResult<StructValue> {
    let mut acc = netlist.struct_zero(layout)?;
    for (value, &run) in args.iter().zip(runs) {
        value.expect_layout(layout)?;
        let mut nodes = Vec::with_capacity(layout.len());
        for (&current, &field) in acc.nodes().iter().zip(value.nodes()) {
            let zero = netlist.constant(0, netlist.width(field)?)?;
            let gated = netlist.mux(run, field, zero)?;
            nodes.push(fold(netlist, current, gated)?);
        }
        acc = StructValue::from_parts(layout.clone(), nodes)?;
    }
    Ok(acc)
}

/// Bitwise OR of the arguments of all running call sites
///
/// Suits nonexclusive methods whose callers set flags.
pub fn or_combiner(layout: Layout) -> Combiner {
    Box::new(move |netlist: &mut Netlist, args: &[StructValue], runs: &[NodeId]| {
        fold_running(netlist, &layout, args, runs, Netlist::or)
    })
}

/// Wrapping sum of the arguments of all running call sites
pub fn sum_combiner(layout: Layout) -> Combiner {
    Box::new(move |netlist: &mut Netlist, args: &[StructValue], runs: &[NodeId]| {
        fold_running(netlist, &layout, args, runs, Netlist::add)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_logic::{Inputs, Simulator};

    struct Sites {
        net: Netlist,
        layout: Layout,
        args: Vec<StructValue>,
        runs: Vec<NodeId>,
    }

    fn sites(n: usize) -> Sites {
        let mut net = Netlist::new();
        let layout = Layout::new([("v", 8)]).unwrap();
        let args = (0..n)
            .map(|i| net.struct_input(&format!("arg{}", i), &layout).unwrap())
            .collect();
        let runs = (0..n)
            .map(|i| net.bit_input(&format!("run{}", i)).unwrap())
            .collect();
        Sites {
            net,
            layout,
            args,
            runs,
        }
    }

    fn evaluate(sites: Sites, out: &StructValue, values: &[u64], runs: &[bool]) -> u64 {
        let mut inputs = Inputs::new();
        for (arg, value) in sites.args.iter().zip(values) {
            inputs.set(arg.nodes()[0], *value);
        }
        for (run, value) in sites.runs.iter().zip(runs) {
            inputs.set_bit(*run, *value);
        }
        let sim = Simulator::new(sites.net).unwrap();
        sim.evaluate(&inputs).unwrap().fields(out)[0]
    }

    #[test]
    fn test_one_hot_selects_running_site() {
        let mut s = sites(2);
        let out = one_hot(&mut s.net, &s.layout, &s.args, &s.runs).unwrap();
        assert_eq!(evaluate(s, &out, &[5, 9], &[false, true]), 9);
    }

    #[test]
    fn test_one_hot_idle_is_zero() {
        let mut s = sites(2);
        let out = one_hot(&mut s.net, &s.layout, &s.args, &s.runs).unwrap();
        assert_eq!(evaluate(s, &out, &[5, 9], &[false, false]), 0);
    }

    #[test]
    fn test_or_combiner() {
        let mut s = sites(3);
        let combine = or_combiner(s.layout.clone());
        let out = combine(&mut s.net, &s.args, &s.runs).unwrap();
        assert_eq!(evaluate(s, &out, &[0b0001, 0b0100, 0b1000], &[true, true, false]), 0b0101);
    }

    #[test]
    fn test_sum_combiner_wraps() {
        let mut s = sites(2);
        let combine = sum_combiner(s.layout.clone());
        let out = combine(&mut s.net, &s.args, &s.runs).unwrap();
        assert_eq!(evaluate(s, &out, &[200, 100], &[true, true]), 44);
    }

    #[test]
    fn test_combiner_rejects_wrong_layout() {
        let mut s = sites(1);
        let other = Layout::new([("w", 4)]).unwrap();
        let combine = or_combiner(other);
        assert!(combine(&mut s.net, &s.args, &s.runs).is_err());
    }
}
