//! Elaboration reports and graph export

use crate::design::Design;
use crate::diagnostic::Diagnostic;
use crate::graph::ConflictReason;
use arbiter_types::{UnitId, UnitKind};
use serde::Serialize;
use std::fmt::Write;

/// Counts summarizing an elaborated design
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ElaborationStats {
    /// Registered units
    pub units: usize,
    /// Transactions among them
    pub transactions: usize,
    /// Methods among them
    pub methods: usize,
    /// Components
    pub components: usize,
    /// Call sites
    pub calls: usize,
    /// Schedulable candidates
    pub candidates: usize,
    /// Conflict edges between candidates
    pub conflicts: usize,
    /// Priority edges between candidates
    pub priorities: usize,
    /// Nodes in the final netlist
    pub netlist_nodes: usize,
    /// Warnings
    pub diagnostics: usize,
}

/// One unit in a report
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct UnitReport {
    /// Unit id
    pub id: u32,
    /// Qualified name
    pub name: String,
    /// Transaction or method
    pub kind: UnitKind,
    /// Owning component path
    pub owner: Option<String>,
    /// Number of call sites invoking the unit
    pub callers: usize,
    /// Callers may run together
    pub nonexclusive: bool,
    /// At most one call site
    pub single_caller: bool,
}

/// One candidate in a report
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CandidateReport {
    /// Candidate name
    pub name: String,
    /// Member transactions
    pub members: Vec<String>,
    /// Methods used, without duplicates
    pub uses: Vec<String>,
    /// Position in the scheduling order
    pub position: usize,
}

/// One conflict edge in a report
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConflictReport {
    /// First candidate
    pub first: String,
    /// Second candidate
    pub second: String,
    /// Why they conflict
    pub reasons: Vec<String>,
}

/// Full elaboration report
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ElaborationReport {
    /// Scheduler used
    pub scheduler: String,
    /// Counts
    pub stats: ElaborationStats,
    /// Units in declaration order
    pub units: Vec<UnitReport>,
    /// Candidates in declaration-key order
    pub candidates: Vec<CandidateReport>,
    /// Conflict edges
    pub conflicts: Vec<ConflictReport>,
    /// Priority edges as `[preferred, other]`
    pub priorities: Vec<(String, String)>,
    /// Candidate names in scheduling order
    pub order: Vec<String>,
    /// Warnings
    pub diagnostics: Vec<Diagnostic>,
}

impl ElaborationReport {
    /// Export report as JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export report as compact JSON string
    pub fn to_json_compact(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl Design {
    fn unit_name(&self, id: UnitId) -> String {
        self.unit(id)
            .map(|u| u.qualified_name.clone())
            .unwrap_or_else(|_| id.to_string())
    }

    fn candidate_name(&self, index: usize) -> String {
        self.graph
            .candidate(index)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("#{}", index))
    }

    fn describe(&self, reason: ConflictReason) -> String {
        match reason {
            ConflictReason::Explicit { start, end } => {
                format!("{} conflicts with {}", self.unit_name(start), self.unit_name(end))
            }
            ConflictReason::SharedMethod(method) => format!("both call {}", self.unit_name(method)),
            ConflictReason::SharedMember(tx) => format!("both contain {}", self.unit_name(tx)),
            ConflictReason::Independent { first, second } => format!(
                "{} and {} are alternatives",
                self.unit_name(first),
                self.unit_name(second)
            ),
        }
    }

    /// Counts summarizing the design
    pub fn stats(&self) -> ElaborationStats {
        ElaborationStats {
            units: self.units.len(),
            transactions: self.units.iter().filter(|u| u.kind == UnitKind::Transaction).count(),
            methods: self.units.iter().filter(|u| u.kind == UnitKind::Method).count(),
            components: self.components.len(),
            calls: self.calls.len(),
            candidates: self.graph.len(),
            conflicts: self.graph.conflict_count(),
            priorities: self.graph.priority_edges().count(),
            netlist_nodes: self.netlist().len(),
            diagnostics: self.diagnostics().len(),
        }
    }

    /// Build a serializable report
    pub fn report(&self) -> ElaborationReport {
        let units = self
            .units
            .iter()
            .map(|u| UnitReport {
                id: u.id.as_u32(),
                name: u.qualified_name.clone(),
                kind: u.kind,
                owner: u.owner.and_then(|c| self.components.path(c).ok()),
                callers: self.calls.iter().filter(|c| c.callee == u.id).count(),
                nonexclusive: u.nonexclusive,
                single_caller: u.single_caller,
            })
            .collect();

        let order = self.graph.order();
        let candidates = self
            .graph
            .candidates()
            .iter()
            .enumerate()
            .map(|(index, c)| {
                let mut uses: Vec<String> = Vec::new();
                for used in &c.uses {
                    let name = self.unit_name(used.method);
                    if !uses.contains(&name) {
                        uses.push(name);
                    }
                }
                CandidateReport {
                    name: c.name.clone(),
                    members: c.members.iter().map(|m| self.unit_name(*m)).collect(),
                    uses,
                    position: order.iter().position(|&o| o == index).unwrap_or(index),
                }
            })
            .collect();

        let conflicts = self
            .graph
            .conflict_edges()
            .map(|(a, b)| ConflictReport {
                first: self.candidate_name(a),
                second: self.candidate_name(b),
                reasons: self.graph.reasons(a, b).map(|r| self.describe(r)).collect(),
            })
            .collect();

        ElaborationReport {
            scheduler: self.scheduler.to_string(),
            stats: self.stats(),
            units,
            candidates,
            conflicts,
            priorities: self
                .graph
                .priority_edges()
                .map(|(a, b)| (self.candidate_name(a), self.candidate_name(b)))
                .collect(),
            order: order.iter().map(|&i| self.candidate_name(i)).collect(),
            diagnostics: self.diagnostics().to_vec(),
        }
    }

    /// Graphviz rendering of candidates, conflicts and priorities
    ///
    /// Conflicts are plain undirected edges; priorities are dashed arrows from
    /// the preferred candidate.
    pub fn to_dot(&self) -> String {
        let mut out = String::from("digraph conflicts {\n    node [shape=box];\n");
        for (index, candidate) in self.graph.candidates().iter().enumerate() {
            let _ = writeln!(out, "    c{} [label=\"{}\"];", index, escape(&candidate.name));
        }
        for (a, b) in self.graph.conflict_edges() {
            let _ = writeln!(out, "    c{} -> c{} [dir=none, color=red];", a, b);
        }
        for (a, b) in self.graph.priority_edges() {
            let _ = writeln!(out, "    c{} -> c{} [style=dashed];", a, b);
        }
        out.push_str("}\n");
        out
    }
}

fn escape(label: &str) -> String {
    label.replace('\\', "\\\\").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use crate::elaboration::Elaboration;
    use arbiter_types::Priority;

    fn design() -> crate::design::Design {
        let mut elab = Elaboration::new();
        let high = elab.netlist_mut().high();
        let a = elab.transaction("A", None, high).unwrap();
        let b = elab.transaction("B", None, high).unwrap();
        let c = elab.transaction("C", None, high).unwrap();
        elab.add_conflict(a, b, Priority::Undefined).unwrap();
        elab.add_conflict(b, c, Priority::Left).unwrap();
        elab.finalize().unwrap()
    }

    #[test]
    fn test_report_contents() {
        let report = design().report();

        assert_eq!(report.scheduler, "eager");
        assert_eq!(report.stats.transactions, 3);
        assert_eq!(report.stats.conflicts, 2);
        assert_eq!(report.stats.priorities, 1);
        assert_eq!(report.order, vec!["A", "B", "C"]);
        assert_eq!(report.priorities, vec![("B".to_string(), "C".to_string())]);
        assert_eq!(report.conflicts[0].reasons, vec!["A conflicts with B"]);
    }

    #[test]
    fn test_report_json() {
        let json = design().report().to_json().unwrap();
        assert!(json.contains("\"scheduler\": \"eager\""));
        assert!(json.contains("\"kind\": \"transaction\""));
    }

    #[test]
    fn test_dot_export() {
        let dot = design().to_dot();
        assert!(dot.starts_with("digraph conflicts {"));
        assert!(dot.contains("c0 [label=\"A\"]"));
        assert!(dot.contains("c0 -> c1 [dir=none, color=red]"));
        assert!(dot.contains("c1 -> c2 [style=dashed]"));
    }
}
