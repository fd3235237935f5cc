//! Arena-based circuit graph: pin nodes and gates are stored in flat `Vec`s
//! and referenced by index rather than by pointer, with [`Fanin`]/[`FanoutTarget`]
//! standing in for the original's `Element*` run-time type tag.

use crate::cell::Cell;
use crate::consts::{MAX_REQ_TIME, MIN_REQ_TIME};
use crate::rctree::RcTreeNode;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PinNodeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GateId(pub usize);

/// What drives a pin node: either another pin node (a wire tap feeding a
/// further pin node - rare, but the grammar allows it) or a gate's output pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fanin {
    PinNode(PinNodeId),
    GateOutput(GateId, usize),
}

/// What a pin node drives: another pin node, or a gate's input pin directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FanoutTarget {
    PinNode(PinNodeId),
    GateInput(GateId, usize),
}

/// Per-input-pin gate delay recorded on a [`GOutPin`] once a signal has been
/// propagated through the gate.
#[derive(Debug, Clone, Copy)]
pub enum DelayData {
    Unate {
        delay_from_input_fall: f64,
        delay_from_input_rise: f64,
    },
    NonUnate {
        input_fall_output_fall_delay: f64,
        input_fall_output_rise_delay: f64,
        input_rise_output_fall_delay: f64,
        input_rise_output_rise_delay: f64,
    },
}

#[derive(Debug, Clone)]
pub struct PinNode {
    pub name: String,
    visited: bool,

    pub fast_fall_arr_time: f64,
    fast_fall_req_time: f64,
    pub fast_fall_slew: f64,
    pub fast_rise_arr_time: f64,
    fast_rise_req_time: f64,
    pub fast_rise_slew: f64,

    pub slow_fall_arr_time: f64,
    slow_fall_req_time: f64,
    pub slow_fall_slew: f64,
    pub slow_rise_arr_time: f64,
    slow_rise_req_time: f64,
    pub slow_rise_slew: f64,

    pub fall_slew_hat_sq: f64,
    pub rise_slew_hat_sq: f64,

    pub fanin: Option<Fanin>,
    pub fanout: Vec<FanoutTarget>,
    /// number of `fanout` entries that are `PinNode` taps; see the "more
    /// fanouts than leaves" short-circuit case in `wiring`.
    pub fanout_pin_node_no: usize,

    /// present only between netlist loading and `inject_wiring_effects`.
    pub fanout_rc_tree: Vec<RcTreeNode>,
}

impl PinNode {
    pub fn new(name: impl Into<String>) -> Self {
        PinNode {
            name: name.into(),
            visited: false,
            fast_fall_arr_time: 0.0,
            fast_fall_req_time: MIN_REQ_TIME,
            fast_fall_slew: 0.0,
            fast_rise_arr_time: 0.0,
            fast_rise_req_time: MIN_REQ_TIME,
            fast_rise_slew: 0.0,
            slow_fall_arr_time: 0.0,
            slow_fall_req_time: MAX_REQ_TIME,
            slow_fall_slew: 0.0,
            slow_rise_arr_time: 0.0,
            slow_rise_req_time: MAX_REQ_TIME,
            slow_rise_slew: 0.0,
            fall_slew_hat_sq: 0.0,
            rise_slew_hat_sq: 0.0,
            fanin: None,
            fanout: Vec::new(),
            fanout_pin_node_no: 0,
            fanout_rc_tree: Vec::new(),
        }
    }

    pub fn is_not_visited(&self) -> bool {
        !self.visited
    }

    pub fn set_is_visited(&mut self) {
        self.visited = true;
    }

    pub fn fast_fall_req_time(&self) -> f64 {
        self.fast_fall_req_time
    }
    pub fn fast_rise_req_time(&self) -> f64 {
        self.fast_rise_req_time
    }
    pub fn slow_fall_req_time(&self) -> f64 {
        self.slow_fall_req_time
    }
    pub fn slow_rise_req_time(&self) -> f64 {
        self.slow_rise_req_time
    }

    /// Fast-mode (early) required times only ever rise towards the true
    /// bound as more constraints are folded in - later/smaller candidates
    /// are simply ignored.
    pub fn set_fast_fall_req_time(&mut self, val: f64) {
        if val > self.fast_fall_req_time {
            self.fast_fall_req_time = val;
        }
    }
    pub fn set_fast_rise_req_time(&mut self, val: f64) {
        if val > self.fast_rise_req_time {
            self.fast_rise_req_time = val;
        }
    }
    /// Slow-mode (late) required times only ever fall towards the true bound.
    pub fn set_slow_fall_req_time(&mut self, val: f64) {
        if val < self.slow_fall_req_time {
            self.slow_fall_req_time = val;
        }
    }
    pub fn set_slow_rise_req_time(&mut self, val: f64) {
        if val < self.slow_rise_req_time {
            self.slow_rise_req_time = val;
        }
    }

    pub fn fanout_no(&self) -> usize {
        self.fanout.len()
    }

    /// Snapshot of the eight arrival/slew fields, used where the borrow
    /// checker can't hold a `&PinNode` and a `&mut PinNode` to a different
    /// node at once during the forward/sequential wavefronts.
    pub fn clone_signals(&self) -> PinNodeSignals {
        PinNodeSignals {
            fast_fall_arr_time: self.fast_fall_arr_time,
            fast_rise_arr_time: self.fast_rise_arr_time,
            fast_fall_slew: self.fast_fall_slew,
            fast_rise_slew: self.fast_rise_slew,
            slow_fall_arr_time: self.slow_fall_arr_time,
            slow_rise_arr_time: self.slow_rise_arr_time,
            slow_fall_slew: self.slow_fall_slew,
            slow_rise_slew: self.slow_rise_slew,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PinNodeSignals {
    pub fast_fall_arr_time: f64,
    pub fast_rise_arr_time: f64,
    pub fast_fall_slew: f64,
    pub fast_rise_slew: f64,
    pub slow_fall_arr_time: f64,
    pub slow_rise_arr_time: f64,
    pub slow_fall_slew: f64,
    pub slow_rise_slew: f64,
}

#[derive(Debug, Clone)]
pub struct GInPin {
    pub pin_id: usize,
    pub fall_arr_delay: f64,
    pub rise_arr_delay: f64,
    pub fanin: Option<PinNodeId>,
}

impl GInPin {
    pub fn new(pin_id: usize) -> Self {
        GInPin {
            pin_id,
            fall_arr_delay: 0.0,
            rise_arr_delay: 0.0,
            fanin: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GOutPin {
    pub pin_id: usize,
    pub fall_load: f64,
    pub rise_load: f64,
    pub fast_delay_data: Vec<Option<DelayData>>,
    pub slow_delay_data: Vec<Option<DelayData>>,
    visited_count: usize,
    pub fanout: Option<PinNodeId>,
}

impl GOutPin {
    pub fn new(pin_id: usize) -> Self {
        GOutPin {
            pin_id,
            fall_load: 0.0,
            rise_load: 0.0,
            fast_delay_data: Vec::new(),
            slow_delay_data: Vec::new(),
            visited_count: 0,
            fanout: None,
        }
    }

    pub fn visited_count(&self) -> usize {
        self.visited_count
    }

    pub fn inc_visited_count(&mut self) {
        self.visited_count += 1;
    }

    pub fn init_delay_data_vecs(&mut self, input_no: usize) {
        self.fast_delay_data = vec![None; input_no];
        self.slow_delay_data = vec![None; input_no];
    }
}

/// A combinational or sequential gate, or a primary input/output (which
/// carries no [`Cell`] - `cell.is_none()` is how PI/PO gates are told apart
/// from real library instances).
#[derive(Debug, Clone)]
pub struct Gate {
    pub cell: Option<Rc<Cell>>,
    pub is_non_clocked: bool,
    pub input_vec: Vec<GInPin>,
    pub output_vec: Vec<GOutPin>,
    input_visited_count: usize,
}

impl Gate {
    pub fn primary_input() -> Self {
        Gate {
            cell: None,
            is_non_clocked: true,
            input_vec: Vec::new(),
            output_vec: vec![GOutPin::new(0)],
            input_visited_count: 0,
        }
    }

    pub fn primary_output() -> Self {
        Gate {
            cell: None,
            is_non_clocked: true,
            input_vec: vec![GInPin::new(0)],
            output_vec: Vec::new(),
            input_visited_count: 0,
        }
    }

    pub fn instance(cell: Rc<Cell>) -> Self {
        let is_non_clocked = cell.is_non_clocked;
        let input_vec = (0..cell.input_pin_no()).map(GInPin::new).collect();
        let output_vec = (0..cell.output_pin_no()).map(GOutPin::new).collect();
        Gate {
            cell: Some(cell),
            is_non_clocked,
            input_vec,
            output_vec,
            input_visited_count: 0,
        }
    }

    pub fn input_no(&self) -> usize {
        self.input_vec.len()
    }
    pub fn output_no(&self) -> usize {
        self.output_vec.len()
    }
    pub fn input_visited_count(&self) -> usize {
        self.input_visited_count
    }
    pub fn inc_input_visited_count(&mut self) {
        self.input_visited_count += 1;
    }
    pub fn input_pin_node(&self, id: usize) -> Option<PinNodeId> {
        self.input_vec[id].fanin
    }
    pub fn output_pin_node(&self, id: usize) -> Option<PinNodeId> {
        self.output_vec[id].fanout
    }
    pub fn clock_pin_id(&self) -> usize {
        self.cell
            .as_ref()
            .expect("clock_pin_id on a PI/PO gate")
            .clock_pin_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RatMode {
    Slow,
    Fast,
    Both,
}

#[derive(Debug, Clone, Copy)]
pub struct RatData {
    pub pin_node: PinNodeId,
    pub mode: RatMode,
    pub slow_fall_time: f64,
    pub slow_rise_time: f64,
    pub fast_fall_time: f64,
    pub fast_rise_time: f64,
}

#[derive(Default)]
pub struct Circuit {
    pub is_sequential: bool,
    pub clock_pnode: Option<PinNodeId>,
    pub clock_period: f64,

    pub pi: Vec<GateId>,
    pub po: Vec<GateId>,
    pub com_gates: Vec<GateId>,
    pub seq_gates: Vec<GateId>,

    pub pin_nodes: Vec<PinNode>,
    pub gates: Vec<Gate>,

    pub rat_data: Vec<RatData>,
}

impl Circuit {
    pub fn new() -> Self {
        Circuit::default()
    }

    pub fn pin_node(&self, id: PinNodeId) -> &PinNode {
        &self.pin_nodes[id.0]
    }
    pub fn pin_node_mut(&mut self, id: PinNodeId) -> &mut PinNode {
        &mut self.pin_nodes[id.0]
    }
    pub fn gate(&self, id: GateId) -> &Gate {
        &self.gates[id.0]
    }
    pub fn gate_mut(&mut self, id: GateId) -> &mut Gate {
        &mut self.gates[id.0]
    }

    pub fn pin_node_no(&self) -> usize {
        self.pin_nodes.len()
    }

    pub fn pi_no(&self) -> usize {
        self.pi.len()
    }
    pub fn po_no(&self) -> usize {
        self.po.len()
    }
    pub fn com_gate_no(&self) -> usize {
        self.com_gates.len()
    }
    pub fn seq_gate_no(&self) -> usize {
        self.seq_gates.len()
    }
    pub fn tot_gate_no(&self) -> usize {
        self.pi_no() + self.po_no() + self.com_gate_no() + self.seq_gate_no()
    }
    pub fn rat_data_no(&self) -> usize {
        self.rat_data.len()
    }

    pub fn push_gate(&mut self, gate: Gate) -> GateId {
        self.gates.push(gate);
        GateId(self.gates.len() - 1)
    }

    pub fn push_pin_node(&mut self, pin_node: PinNode) -> PinNodeId {
        self.pin_nodes.push(pin_node);
        PinNodeId(self.pin_nodes.len() - 1)
    }
}
