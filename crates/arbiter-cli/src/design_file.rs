//! Design file loading and elaboration
//!
//! A design file is a TOML description of inputs, components, units, call
//! sites and relations:
//!
//! ```toml
//! [[inputs]]
//! name = "ra"
//!
//! [[transactions]]
//! name = "A"
//! request = "ra"
//!
//! [[conflicts]]
//! a = "A"
//! b = "B"
//! priority = "left"
//! ```
//!
//! Units are referred to by qualified name (`component.path.unit`), signals
//! by input name or by an integer constant.

use crate::CliError;
use arbiter_scheduler::logic::{mask, Layout, NodeId, StructValue};
use arbiter_scheduler::{
    or_combiner, sum_combiner, ComponentId, Design, Elaboration, MethodDef, Priority, UnitId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// Signal reference: an input name or a constant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Signal {
    /// Constant value
    Const(u64),
    /// Primary input by name
    Name(String),
}

impl Default for Signal {
    fn default() -> Self {
        Signal::Const(1)
    }
}

/// Primary input declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputDef {
    /// Input name
    pub name: String,
    /// Width in bits
    #[serde(default = "default_width")]
    pub width: u8,
}

fn default_width() -> u8 {
    1
}

/// Component declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentDef {
    /// Local name
    pub name: String,
    /// Dotted path of the parent component
    #[serde(default)]
    pub parent: Option<String>,
}

/// Transaction declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionDef {
    /// Local name
    pub name: String,
    /// Dotted path of the owning component
    #[serde(default)]
    pub component: Option<String>,
    /// Request signal, always high when omitted
    #[serde(default)]
    pub request: Signal,
}

/// One field of a method's input layout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    /// Field name
    pub name: String,
    /// Width in bits
    pub width: u8,
}

/// Built-in argument combiners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombinerKind {
    /// Bitwise OR of running callers' arguments
    Or,
    /// Sum of running callers' arguments
    Sum,
}

/// Argument validation: `field < below`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidateDef {
    /// Checked field
    pub field: String,
    /// Exclusive upper bound
    pub below: u64,
}

/// Method declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodFileDef {
    /// Local name
    pub name: String,
    /// Dotted path of the owning component
    #[serde(default)]
    pub component: Option<String>,
    /// Readiness signal, always high when omitted
    #[serde(default)]
    pub ready: Signal,
    /// Input layout
    #[serde(default)]
    pub input: Vec<FieldDef>,
    /// Callers may run together
    #[serde(default)]
    pub nonexclusive: bool,
    /// At most one call site
    #[serde(default)]
    pub single_caller: bool,
    /// Argument combiner
    #[serde(default)]
    pub combiner: Option<CombinerKind>,
    /// Argument validation
    #[serde(default)]
    pub validate: Option<ValidateDef>,
}

/// Call site declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallDef {
    /// Qualified name of the caller
    pub caller: String,
    /// Qualified name of the called method
    pub callee: String,
    /// Enable signal, always high when omitted
    #[serde(default)]
    pub enable: Signal,
    /// Argument value per input field
    #[serde(default)]
    pub args: BTreeMap<String, Signal>,
}

/// Conflict declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictDef {
    /// First unit
    pub a: String,
    /// Second unit
    pub b: String,
    /// Preferred end
    #[serde(default)]
    pub priority: Priority,
}

/// Ordering declaration: `before` wins over `after`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderDef {
    /// Preferred unit
    pub before: String,
    /// Other unit
    pub after: String,
}

/// Simultaneity declaration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimultaneousDef {
    /// Anchor unit
    pub unit: String,
    /// Units running together with the anchor
    pub with: Vec<String>,
    /// The other units are mutually exclusive alternatives
    #[serde(default)]
    pub alternatives: bool,
}

/// Acknowledged coupling between two units
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PairDef {
    /// First unit
    pub a: String,
    /// Second unit
    pub b: String,
}

/// Complete design file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesignFile {
    /// Primary inputs
    #[serde(default)]
    pub inputs: Vec<InputDef>,
    /// Components, parents first
    #[serde(default)]
    pub components: Vec<ComponentDef>,
    /// Transactions
    #[serde(default)]
    pub transactions: Vec<TransactionDef>,
    /// Methods
    #[serde(default)]
    pub methods: Vec<MethodFileDef>,
    /// Call sites
    #[serde(default)]
    pub calls: Vec<CallDef>,
    /// Conflicts
    #[serde(default)]
    pub conflicts: Vec<ConflictDef>,
    /// Orderings
    #[serde(default)]
    pub orderings: Vec<OrderDef>,
    /// Simultaneity groups
    #[serde(default)]
    pub simultaneous: Vec<SimultaneousDef>,
    /// Acknowledged couplings
    #[serde(default)]
    pub acknowledged: Vec<PairDef>,
}

impl DesignFile {
    /// Load a design file
    pub fn load(path: &Path) -> Result<Self, CliError> {
        tracing::info!("Loading design from {:?}", path);
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse design file contents
    pub fn parse(content: &str) -> Result<Self, CliError> {
        Ok(toml::from_str(content)?)
    }

    /// Declare everything and finalize
    pub fn elaborate(&self) -> Result<Design, CliError> {
        Builder::default().build(self)
    }
}

#[derive(Default)]
struct Builder {
    elab: Elaboration,
    inputs: HashMap<String, NodeId>,
    components: HashMap<String, ComponentId>,
    layouts: HashMap<UnitId, Layout>,
}

impl Builder {
    fn build(mut self, file: &DesignFile) -> Result<Design, CliError> {
        for input in &file.inputs {
            let node = self.elab.netlist_mut().input(&input.name, input.width)?;
            self.inputs.insert(input.name.clone(), node);
        }

        for component in &file.components {
            let parent = self.component(component.parent.as_deref())?;
            let id = self.elab.component(&component.name, parent)?;
            let path = self.elab.components().path(id)?;
            self.components.insert(path, id);
        }

        for tx in &file.transactions {
            let owner = self.component(tx.component.as_deref())?;
            let request = self.signal(&tx.request, 1)?;
            self.elab.transaction(&tx.name, owner, request)?;
        }

        for method in &file.methods {
            self.method(method)?;
        }

        for call in &file.calls {
            let caller = self.unit(&call.caller)?;
            let callee = self.unit(&call.callee)?;
            let enable = self.signal(&call.enable, 1)?;
            let args = self.arguments(call, callee)?;
            self.elab.call(caller, callee, enable, args)?;
        }

        for conflict in &file.conflicts {
            let (a, b) = (self.unit(&conflict.a)?, self.unit(&conflict.b)?);
            self.elab.add_conflict(a, b, conflict.priority)?;
        }
        for order in &file.orderings {
            let (a, b) = (self.unit(&order.before)?, self.unit(&order.after)?);
            self.elab.schedule_before(a, b)?;
        }
        for group in &file.simultaneous {
            let anchor = self.unit(&group.unit)?;
            let others = group
                .with
                .iter()
                .map(|name| self.unit(name))
                .collect::<Result<Vec<_>, _>>()?;
            if group.alternatives {
                self.elab.simultaneous_alternatives(anchor, &others)?;
            } else {
                self.elab.simultaneous(anchor, &others)?;
            }
        }
        for pair in &file.acknowledged {
            let (a, b) = (self.unit(&pair.a)?, self.unit(&pair.b)?);
            self.elab.acknowledge_coupling(a, b)?;
        }

        Ok(self.elab.finalize()?)
    }

    fn method(&mut self, def: &MethodFileDef) -> Result<(), CliError> {
        let owner = self.component(def.component.as_deref())?;
        let ready = self.signal(&def.ready, 1)?;
        let layout = Layout::new(def.input.iter().map(|f| (f.name.as_str(), f.width)))?;

        let mut method = MethodDef::new(&def.name).ready(ready).input(layout.clone());
        if let Some(owner) = owner {
            method = method.owner(owner);
        }
        if def.nonexclusive {
            method = method.nonexclusive();
        }
        if def.single_caller {
            method = method.single_caller();
        }
        method = match def.combiner {
            Some(CombinerKind::Or) => method.combiner(or_combiner(layout.clone())),
            Some(CombinerKind::Sum) => method.combiner(sum_combiner(layout.clone())),
            None => method,
        };
        if let Some(validate) = &def.validate {
            let Some(position) = layout.position(&validate.field) else {
                return Err(CliError::InvalidDesign(format!(
                    "method '{}' validates unknown field '{}'",
                    def.name, validate.field
                )));
            };
            let field = validate.field.clone();
            let below = validate.below;
            // A bound above the field's range accepts every value
            let unbounded = below > mask(layout.fields()[position].width);
            method = method.validate_arguments(move |net, args| {
                if unbounded {
                    return Ok(net.high());
                }
                let value = args.field(&field)?;
                let width = net.width(value)?;
                let bound = net.constant(below, width)?;
                net.lt(value, bound)
            });
        }

        let handle = self.elab.method(method)?;
        self.layouts.insert(handle.id, layout);
        Ok(())
    }

    fn arguments(&mut self, call: &CallDef, callee: UnitId) -> Result<StructValue, CliError> {
        let Some(layout) = self.layouts.get(&callee).cloned() else {
            // Transactions cannot be called; elaboration reports it
            return Ok(StructValue::empty());
        };
        if let Some(extra) = call.args.keys().find(|k| layout.position(k).is_none()) {
            return Err(CliError::InvalidDesign(format!(
                "call from '{}' passes unknown argument '{}' to '{}'",
                call.caller, extra, call.callee
            )));
        }
        let mut nodes = Vec::with_capacity(layout.len());
        for field in layout.fields() {
            let signal = call.args.get(&field.name).ok_or_else(|| {
                CliError::InvalidDesign(format!(
                    "call from '{}' to '{}' misses argument '{}'",
                    call.caller, call.callee, field.name
                ))
            })?;
            nodes.push(self.signal(signal, field.width)?);
        }
        Ok(self.elab.netlist().struct_from(&layout, nodes)?)
    }

    fn signal(&mut self, signal: &Signal, width: u8) -> Result<NodeId, CliError> {
        match signal {
            Signal::Const(value) if *value > mask(width) => Err(CliError::InvalidDesign(format!(
                "constant {} does not fit in {} bits",
                value, width
            ))),
            Signal::Const(value) => Ok(self.elab.netlist_mut().constant(*value, width)?),
            Signal::Name(name) => self
                .inputs
                .get(name)
                .copied()
                .ok_or_else(|| CliError::InvalidDesign(format!("unknown input '{}'", name))),
        }
    }

    fn component(&self, path: Option<&str>) -> Result<Option<ComponentId>, CliError> {
        path.map(|p| {
            self.components
                .get(p)
                .copied()
                .ok_or_else(|| CliError::InvalidDesign(format!("unknown component '{}'", p)))
        })
        .transpose()
    }

    fn unit(&self, name: &str) -> Result<UnitId, CliError> {
        self.elab
            .registry()
            .find(name)
            .ok_or_else(|| CliError::InvalidDesign(format!("unknown unit '{}'", name)))
    }
}
