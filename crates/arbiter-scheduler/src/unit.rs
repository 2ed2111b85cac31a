//! Transactions and methods

use arbiter_logic::{Layout, LogicResult, Netlist, NodeId, StructValue};
use arbiter_types::{CallId, ComponentId, UnitId, UnitKind};
use std::fmt;

/// Extra readiness predicate over a call site's arguments
pub type Validator = Box<dyn Fn(&mut Netlist, &StructValue) -> LogicResult<NodeId>>;

/// Builds a method's `data_in` from per-call-site arguments and run bits
///
/// Receives one argument value and one 1-bit run node per call site, in
/// call declaration order, and returns a value of the method's input layout.
pub type Combiner = Box<dyn Fn(&mut Netlist, &[StructValue], &[NodeId]) -> LogicResult<StructValue>>;

/// A registered transaction or method
pub struct UnitDef {
    pub(crate) id: UnitId,
    pub(crate) name: String,
    pub(crate) qualified_name: String,
    pub(crate) owner: Option<ComponentId>,
    pub(crate) kind: UnitKind,
    pub(crate) ready: NodeId,
    pub(crate) run: NodeId,
    pub(crate) data_in: StructValue,
    pub(crate) data_out: StructValue,
    pub(crate) nonexclusive: bool,
    pub(crate) single_caller: bool,
    pub(crate) validator: Option<Validator>,
    pub(crate) combiner: Option<Combiner>,
}

impl UnitDef {
    /// Unit id (also its declaration position)
    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Local name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name prefixed with the owner's component path
    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    /// Owning component
    pub fn owner(&self) -> Option<ComponentId> {
        self.owner
    }

    /// Transaction or method
    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    /// Readiness node declared by the unit
    pub fn ready(&self) -> NodeId {
        self.ready
    }

    /// Run wire, driven by the scheduler at finalization
    pub fn run(&self) -> NodeId {
        self.run
    }

    /// Input data wires (empty for transactions)
    pub fn data_in(&self) -> &StructValue {
        &self.data_in
    }

    /// Output data wires (empty for transactions)
    pub fn data_out(&self) -> &StructValue {
        &self.data_out
    }

    /// Check if callers may run simultaneously
    pub fn is_nonexclusive(&self) -> bool {
        self.nonexclusive
    }

    /// Check if the method admits at most one call site
    pub fn is_single_caller(&self) -> bool {
        self.single_caller
    }

    /// Check if a custom combiner was supplied
    pub fn has_combiner(&self) -> bool {
        self.combiner.is_some()
    }

    /// Check if an argument validator was supplied
    pub fn has_validator(&self) -> bool {
        self.validator.is_some()
    }
}

impl fmt::Debug for UnitDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitDef")
            .field("id", &self.id)
            .field("name", &self.qualified_name)
            .field("kind", &self.kind)
            .field("nonexclusive", &self.nonexclusive)
            .field("single_caller", &self.single_caller)
            .field("validator", &self.validator.is_some())
            .field("combiner", &self.combiner.is_some())
            .finish()
    }
}

/// Method declaration parameters
///
/// ```ignore
/// let def = MethodDef::new("write")
///     .owner(fifo)
///     .ready(not_full)
///     .input(Layout::new([("data", 8)])?);
/// ```
pub struct MethodDef {
    pub(crate) name: String,
    pub(crate) owner: Option<ComponentId>,
    pub(crate) ready: Option<NodeId>,
    pub(crate) input: Layout,
    pub(crate) output: Layout,
    pub(crate) nonexclusive: bool,
    pub(crate) single_caller: bool,
    pub(crate) validator: Option<Validator>,
    pub(crate) combiner: Option<Combiner>,
}

impl MethodDef {
    /// Always-ready method without data
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            owner: None,
            ready: None,
            input: Layout::empty(),
            output: Layout::empty(),
            nonexclusive: false,
            single_caller: false,
            validator: None,
            combiner: None,
        }
    }

    /// Set the owning component
    pub fn owner(mut self, owner: ComponentId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Set the readiness node (1 bit)
    pub fn ready(mut self, ready: NodeId) -> Self {
        self.ready = Some(ready);
        self
    }

    /// Set the input layout
    pub fn input(mut self, layout: Layout) -> Self {
        self.input = layout;
        self
    }

    /// Set the output layout
    pub fn output(mut self, layout: Layout) -> Self {
        self.output = layout;
        self
    }

    /// Allow several callers to run in the same cycle
    pub fn nonexclusive(mut self) -> Self {
        self.nonexclusive = true;
        self
    }

    /// Declare that the method has at most one call site
    pub fn single_caller(mut self) -> Self {
        self.single_caller = true;
        self
    }

    /// Refuse calls whose arguments fail the predicate
    pub fn validate_arguments(
        mut self,
        validator: impl Fn(&mut Netlist, &StructValue) -> LogicResult<NodeId> + 'static,
    ) -> Self {
        self.validator = Some(Box::new(validator));
        self
    }

    /// Replace the default one-hot argument multiplexer
    pub fn combiner(
        mut self,
        combiner: impl Fn(&mut Netlist, &[StructValue], &[NodeId]) -> LogicResult<StructValue> + 'static,
    ) -> Self {
        self.combiner = Some(Box::new(combiner));
        self
    }
}

/// Handles returned when a method is declared
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MethodHandle {
    /// Method id
    pub id: UnitId,
    /// Combined input data seen by the method body
    pub data_in: StructValue,
    /// Output wires, driven with [`crate::Elaboration::define_output`]
    pub data_out: StructValue,
    /// Run wire
    pub run: NodeId,
}

/// Handles returned when a call site is declared
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallHandle {
    /// Call site id
    pub id: CallId,
    /// The callee's output, as seen by the caller
    pub data_out: StructValue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_def_builder() {
        let layout = Layout::new([("v", 4)]).unwrap();
        let def = MethodDef::new("m")
            .owner(ComponentId::new(2))
            .input(layout.clone())
            .nonexclusive()
            .combiner(|net, _args, _runs| net.struct_zero(&Layout::new([("v", 4)])?));

        assert_eq!(def.name, "m");
        assert_eq!(def.owner, Some(ComponentId::new(2)));
        assert_eq!(def.input, layout);
        assert!(def.output.is_empty());
        assert!(def.nonexclusive);
        assert!(!def.single_caller);
        assert!(def.combiner.is_some());
        assert!(def.validator.is_none());
    }
}
