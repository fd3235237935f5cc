//! Wiring engine: turns each net's RC tree into per-sink Elmore delays and
//! slew-shape constants, and folds sink-gate input capacitance into driver
//! loads. Grounded in `original_source/STA/injectWiringEffects.cpp`.

use log::{debug, trace};

use crate::circuit::{Circuit, Fanin, FanoutTarget, GateId, PinNodeId};
use crate::consts::dge;
use crate::rctree::RcTreeNode;

/// Inject wiring effects for every net in the circuit, then drop each net's
/// RC-tree storage - nothing downstream may read it again.
pub fn inject_wiring_effects(circuit: &mut Circuit) {
    for id in 0..circuit.pin_node_no() {
        inject_one(circuit, PinNodeId(id));
    }
}

fn inject_one(circuit: &mut Circuit, root_id: PinNodeId) {
    let tree = std::mem::take(&mut circuit.pin_node_mut(root_id).fanout_rc_tree);

    if tree.is_empty() {
        resist_short_circuit_no_tree(circuit, root_id);
        return;
    }

    assert!(
        circuit.pin_node(root_id).fanout_pin_node_no > 0,
        "pin node {:?} has an rc tree but no bound leaves",
        circuit.pin_node(root_id).name
    );

    let (reverse_vec, tree) = adjust_linking_and_get_reverse_order(tree);
    compute_elmore_delays(circuit, root_id, &reverse_vec, tree);
}

/// Reorients `tree`'s undirected adjacency into fanin/fanout edges and
/// returns a reverse topological order (`rev[rev.len()-1] == 0`, the root).
fn adjust_linking_and_get_reverse_order(mut tree: Vec<RcTreeNode>) -> (Vec<usize>, Vec<RcTreeNode>) {
    assert!(tree.len() > 1, "rc tree needs at least a root and a leaf");
    let node_no = tree.len();
    let mut reverse_vec = vec![0usize; node_no];
    let mut unreached = vec![true; node_no];
    unreached[0] = false;
    let mut next_id = node_no - 2;

    for i in (0..node_no).rev() {
        let cur_id = reverse_vec[i];
        let adjacent = std::mem::take(&mut tree[cur_id].adjacent);
        let mut fanout = Vec::with_capacity(adjacent.len());

        for (adj_id, r) in adjacent {
            if unreached[adj_id] {
                reverse_vec[next_id] = adj_id;
                next_id = next_id.wrapping_sub(1);
                unreached[adj_id] = false;
                fanout.push((adj_id, r));
            } else {
                tree[cur_id].fanin = Some((adj_id, r));
            }
        }

        tree[cur_id].adjacent = fanout;
    }

    assert!(
        tree[0].fanin.is_none(),
        "root must not have a fanin edge within its own rc tree"
    );
    assert!(!tree[0].adjacent.is_empty(), "rc tree root must have at least one fanout");

    for node in &tree {
        assert!(dge(node.cap, 0.0), "rc tree node {:?} has negative capacitance", node.name);
    }

    (reverse_vec, tree)
}

fn compute_elmore_delays(circuit: &mut Circuit, root_id: PinNodeId, reverse_vec: &[usize], mut tree: Vec<RcTreeNode>) {
    let node_no = tree.len();
    let leaf_no = circuit.pin_node(root_id).fanout_pin_node_no;

    let mut fall_cap = vec![0.0f64; node_no];
    let mut rise_cap = vec![0.0f64; node_no];
    for (i, node) in tree.iter().enumerate() {
        fall_cap[i] = node.cap;
        rise_cap[i] = node.cap;
    }

    // gate input capacitance fanned out by each leaf, folded into its own
    // node entry so it rides along in the accumulation below.
    let mut pin_fall_cap = vec![0.0f64; leaf_no + 1];
    let mut pin_rise_cap = vec![0.0f64; leaf_no + 1];

    for i in 1..=leaf_no {
        let leaf_pin_node = tree[i].pin_node.expect("tree leaf must be bound to a pin node");
        for fanout in circuit.pin_node(leaf_pin_node).fanout.clone() {
            if let FanoutTarget::GateInput(gate_id, pin_id) = fanout {
                if let Some(cell) = circuit.gate(gate_id).cell.as_ref() {
                    pin_fall_cap[i] += cell.input_fall_cap[pin_id];
                    pin_rise_cap[i] += cell.input_rise_cap[pin_id];
                }
            }
        }
        fall_cap[i] += pin_fall_cap[i];
        rise_cap[i] += pin_rise_cap[i];
    }

    accumulate_loads(&tree, reverse_vec, &mut fall_cap, &mut rise_cap);

    {
        let root_pnode = circuit.pin_node(root_id);
        let gout_fanin = root_pnode.fanin.expect("rc tree root must be driven");
        let Fanin::GateOutput(driver_gate, driver_pin) = gout_fanin else {
            panic!("rc tree root {:?} is not driven directly by a gate output", root_pnode.name);
        };

        if root_pnode.fanout_no() == leaf_no {
            let gout = &mut circuit.gate_mut(driver_gate).output_vec[driver_pin];
            gout.fall_load = fall_cap[0];
            gout.rise_load = rise_cap[0];
        } else {
            // pin node drives more sinks than the rc tree has leaves bound;
            // sum every sink's input cap directly without touching Elmore.
            assert!(root_pnode.fanout_no() > leaf_no);
            resist_short_circuit_with_extra(circuit, root_id, driver_gate, driver_pin, fall_cap[0], rise_cap[0]);
        }
    }

    let mut fall_delay = vec![0.0f64; node_no];
    let mut rise_delay = vec![0.0f64; node_no];

    {
        let root_fanout = tree[0].adjacent.clone();
        for (fanout_id, r) in &root_fanout {
            fall_delay[*fanout_id] = r * fall_cap[*fanout_id];
            rise_delay[*fanout_id] = r * rise_cap[*fanout_id];
        }
        fall_cap[0] = 0.0;
        rise_cap[0] = 0.0;

        for i in (0..node_no - 1).rev() {
            let cur_id = reverse_vec[i];
            let fanout = tree[cur_id].adjacent.clone();
            for (fanout_id, r) in fanout {
                fall_delay[fanout_id] = r * fall_cap[fanout_id] + fall_delay[cur_id];
                rise_delay[fanout_id] = r * rise_cap[fanout_id] + rise_delay[cur_id];
            }

            if cur_id > leaf_no {
                fall_cap[cur_id] = tree[cur_id].cap * fall_delay[cur_id];
                rise_cap[cur_id] = tree[cur_id].cap * rise_delay[cur_id];
            } else {
                fall_cap[cur_id] = (tree[cur_id].cap + pin_fall_cap[cur_id]) * fall_delay[cur_id];
                rise_cap[cur_id] = (tree[cur_id].cap + pin_rise_cap[cur_id]) * rise_delay[cur_id];
            }
        }
    }

    accumulate_loads(&tree, reverse_vec, &mut fall_cap, &mut rise_cap);
    let mut fall_beta = vec![0.0f64; node_no];
    let mut rise_beta = vec![0.0f64; node_no];

    {
        let root_fanout = tree[0].adjacent.clone();
        for (fanout_id, r) in &root_fanout {
            fall_beta[*fanout_id] = r * fall_cap[*fanout_id];
            rise_beta[*fanout_id] = r * rise_cap[*fanout_id];
        }

        for i in (0..node_no - 1).rev() {
            let cur_id = reverse_vec[i];
            let fanout = tree[cur_id].adjacent.clone();
            for (fanout_id, r) in fanout {
                fall_beta[fanout_id] = r * fall_cap[fanout_id] + fall_beta[cur_id];
                rise_beta[fanout_id] = r * rise_cap[fanout_id] + rise_beta[cur_id];
            }
        }
    }

    for i in 1..=leaf_no {
        let leaf_pin_node = tree[i].pin_node.unwrap();
        let cur_fall_delay = fall_delay[i];
        let cur_rise_delay = rise_delay[i];

        for fanout in circuit.pin_node(leaf_pin_node).fanout.clone() {
            let FanoutTarget::GateInput(gate_id, pin_id) = fanout else {
                panic!("wire tap {:?} must fan out only to gate inputs", circuit.pin_node(leaf_pin_node).name);
            };
            let gin = &mut circuit.gate_mut(gate_id).input_vec[pin_id];
            gin.fall_arr_delay = cur_fall_delay;
            gin.rise_arr_delay = cur_rise_delay;
        }

        assert!(
            dge(2.0 * fall_beta[i], cur_fall_delay * cur_fall_delay),
            "negative fall slew-shape square at {:?}",
            circuit.pin_node(leaf_pin_node).name
        );
        assert!(
            dge(2.0 * rise_beta[i], cur_rise_delay * cur_rise_delay),
            "negative rise slew-shape square at {:?}",
            circuit.pin_node(leaf_pin_node).name
        );

        let pnode = circuit.pin_node_mut(leaf_pin_node);
        pnode.fall_slew_hat_sq = 2.0 * fall_beta[i] - cur_fall_delay * cur_fall_delay;
        pnode.rise_slew_hat_sq = 2.0 * rise_beta[i] - cur_rise_delay * cur_rise_delay;
    }

    trace!("wiring: net rooted at {:?} resolved {} leaves", circuit.pin_node(root_id).name, leaf_no);
}

fn accumulate_loads(tree: &[RcTreeNode], reverse_vec: &[usize], fall_cap: &mut [f64], rise_cap: &mut [f64]) {
    for &cur_id in reverse_vec {
        for &(fanout_id, _) in &tree[cur_id].adjacent {
            fall_cap[cur_id] += fall_cap[fanout_id];
            rise_cap[cur_id] += rise_cap[fanout_id];
        }
    }
}

/// Degenerate net: no RC tree and no bound fanout leaves. The driver's load
/// is just the sum of every sink gate-input's capacitance.
fn resist_short_circuit_no_tree(circuit: &mut Circuit, pin_node_id: PinNodeId) {
    let Some(Fanin::GateOutput(driver_gate, driver_pin)) = circuit.pin_node(pin_node_id).fanin else {
        return;
    };
    if circuit.gate(driver_gate).cell.is_none() {
        return;
    }

    let mut fall_load = 0.0;
    let mut rise_load = 0.0;

    for fanout in circuit.pin_node(pin_node_id).fanout.clone() {
        let FanoutTarget::GateInput(gate_id, pin_id) = fanout else {
            continue;
        };
        let Some(cell) = circuit.gate(gate_id).cell.as_ref() else {
            // a primary output has no cell - per spec, skip the load update entirely.
            return;
        };
        fall_load += cell.input_fall_cap[pin_id];
        rise_load += cell.input_rise_cap[pin_id];
    }

    debug!(
        "wiring: degenerate net at {:?} load fall={fall_load} rise={rise_load}",
        circuit.pin_node(pin_node_id).name
    );

    let gout = &mut circuit.gate_mut(driver_gate).output_vec[driver_pin];
    gout.fall_load = fall_load;
    gout.rise_load = rise_load;
}

/// A pin node drives more gate inputs than the rc tree had leaves bound -
/// sum every sink's input cap (plus the tree's own accumulated load) directly.
fn resist_short_circuit_with_extra(
    circuit: &mut Circuit,
    pin_node_id: PinNodeId,
    driver_gate: GateId,
    driver_pin: usize,
    base_fall: f64,
    base_rise: f64,
) {
    let mut total_fall = base_fall;
    let mut total_rise = base_rise;

    for fanout in circuit.pin_node(pin_node_id).fanout.clone() {
        let FanoutTarget::GateInput(gate_id, pin_id) = fanout else {
            continue;
        };
        let Some(cell) = circuit.gate(gate_id).cell.as_ref() else {
            return;
        };
        total_fall += cell.input_fall_cap[pin_id];
        total_rise += cell.input_rise_cap[pin_id];
    }

    let gout = &mut circuit.gate_mut(driver_gate).output_vec[driver_pin];
    gout.fall_load = total_fall;
    gout.rise_load = total_rise;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Circuit, Fanin, FanoutTarget, GInPin, GOutPin, Gate, PinNode};
    use crate::rctree::RcTreeNode;

    #[test]
    fn single_rc_wire_computes_elmore_delay_and_zero_slew_shape() {
        let mut circuit = Circuit::new();

        let driver_gate = circuit.push_gate(Gate::primary_input());
        let root_id = circuit.push_pin_node(PinNode::new("driver"));
        circuit.gate_mut(driver_gate).output_vec[0].fanout = Some(root_id);
        circuit.pin_node_mut(root_id).fanin = Some(Fanin::GateOutput(driver_gate, 0));

        let sink_gate = circuit.push_gate(Gate::primary_output());
        let sink_id = circuit.push_pin_node(PinNode::new("sink"));
        circuit.gate_mut(sink_gate).input_vec[0] = GInPin::new(0);
        circuit.gate_mut(sink_gate).input_vec[0].fanin = Some(sink_id);
        circuit.pin_node_mut(sink_id).fanin = Some(Fanin::PinNode(root_id));
        circuit.pin_node_mut(sink_id).fanout.push(FanoutTarget::GateInput(sink_gate, 0));
        circuit.pin_node_mut(root_id).fanout.push(FanoutTarget::PinNode(sink_id));
        circuit.pin_node_mut(root_id).fanout_pin_node_no = 1;

        let mut root_node = RcTreeNode::with_pin_node("driver".into(), root_id);
        let mut sink_node = RcTreeNode::with_pin_node("sink".into(), sink_id);
        sink_node.cap = 2.0;
        root_node.adjacent.push((1, 1.0));
        sink_node.adjacent.push((0, 1.0));
        circuit.pin_node_mut(root_id).fanout_rc_tree = vec![root_node, sink_node];

        // no sink-gate cell (primary output), so delay math runs on bare C*R.
        inject_one(&mut circuit, root_id);

        assert_eq!(circuit.pin_node(sink_id).fall_slew_hat_sq, 0.0);
        assert_eq!(circuit.pin_node(sink_id).rise_slew_hat_sq, 0.0);
        let gin = &circuit.gate(sink_gate).input_vec[0];
        assert_eq!(gin.fall_arr_delay, 2.0); // R=1, C=2 -> Elmore delay = 2
        assert_eq!(gin.rise_arr_delay, 2.0);
    }

    #[test]
    fn degenerate_net_sums_sink_input_caps_into_driver_load() {
        use crate::cell::Cell;
        use std::rc::Rc;

        let mut circuit = Circuit::new();
        let driver_gate = circuit.push_gate(Gate::primary_input());
        let root_id = circuit.push_pin_node(PinNode::new("n1"));
        circuit.gate_mut(driver_gate).output_vec[0].fanout = Some(root_id);
        circuit.pin_node_mut(root_id).fanin = Some(Fanin::GateOutput(driver_gate, 0));

        let cell = Rc::new(Cell {
            name: "BUF".into(),
            is_non_clocked: true,
            input_pin_names: vec!["A".into()],
            input_fall_cap: vec![0.5],
            input_rise_cap: vec![0.7],
            input_timing: vec![vec![None]],
            clock_pin_id: 0,
            clock_params: vec![None],
            output_pin_names: vec!["Y".into()],
        });
        let sink_gate = circuit.push_gate(Gate::instance(cell));
        circuit.gate_mut(sink_gate).input_vec[0].fanin = Some(root_id);
        circuit.pin_node_mut(root_id).fanout.push(FanoutTarget::GateInput(sink_gate, 0));

        inject_one(&mut circuit, root_id);

        let gout = &circuit.gate(driver_gate).output_vec[0];
        assert_eq!(gout.fall_load, 0.5);
        assert_eq!(gout.rise_load, 0.7);
    }
}
