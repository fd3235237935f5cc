//! RC tree scratch structure used while a net's wiring effects are injected.
//!
//! Each [`PinNode`](crate::circuit::PinNode) with more than one physical tap
//! owns a `Vec<RcTreeNode>` for the duration of [`crate::wiring::inject_wiring_effects`];
//! the tree is discarded once its Elmore delays have been folded into the
//! driven pin nodes, so nothing here survives past that pass.

use crate::circuit::PinNodeId;

/// Node index 0 is always the net's root (the driver side); indices
/// `1..=leaf_no` are the tap nodes connected to a [`PinNode`](crate::circuit::PinNode),
/// and any remaining indices are bare internal RC junctions with no pin node
/// of their own.
#[derive(Debug, Clone)]
pub struct RcTreeNode {
    pub name: String,
    pub pin_node: Option<PinNodeId>,
    pub cap: f64,

    /// before [`crate::wiring::adjust_linking_and_get_reverse_order`] runs this holds every
    /// adjacent node (both directions); afterwards it holds only fanout edges
    /// and the fanin edge is moved into `fanin`.
    pub adjacent: Vec<(usize, f64)>,
    pub fanin: Option<(usize, f64)>,
}

impl RcTreeNode {
    /// A bare internal RC junction with no pin node of its own - created on
    /// first mention inside an `edge`/`cap` sub-line.
    pub fn junction(name: String) -> Self {
        RcTreeNode {
            name,
            pin_node: None,
            cap: 0.0,
            adjacent: Vec::new(),
            fanin: None,
        }
    }

    /// The net's root or one of its taps, each backed by a real pin node.
    pub fn with_pin_node(name: String, pin_node: PinNodeId) -> Self {
        RcTreeNode {
            name,
            pin_node: Some(pin_node),
            cap: 0.0,
            adjacent: Vec::new(),
            fanin: None,
        }
    }

    pub fn fanin_id(&self) -> usize {
        self.fanin.expect("node has no fanin edge yet").0
    }
}

/// Looks up (or creates) the RC tree node named `n` within `tree`, mirroring
/// the "grab id, creating on first use" helper the netlist loader calls while
/// reading a wire block's `edge`/`cap` sub-lines.
pub fn grab_node_id(tree: &mut Vec<RcTreeNode>, n: &str) -> usize {
    if let Some(id) = tree.iter().position(|node| node.name == n) {
        return id;
    }
    tree.push(RcTreeNode::junction(n.to_string()));
    tree.len() - 1
}
