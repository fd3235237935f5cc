//! Top-level STA driver: defect resistance, then forward STA, then (when
//! required times are in play) backward STA, for either a combinational or
//! sequential circuit. Grounded in `original_source/STA/runSTA.cpp`.

use log::info;

use crate::backward::{inject_pos_rat_data, run_backward_wavefront};
use crate::circuit::{Circuit, RatMode};
use crate::defect::{resist_defect_gates, resist_defect_pin_nodes};
use crate::forward::run_com_forward_sta;
use crate::sequential::{run_seq_backward_sta, run_seq_forward_sta};

/// Run static timing analysis end to end on a fully loaded, wiring-injected
/// circuit. Mirrors `runSTA`.
pub fn run_sta(circuit: &mut Circuit) {
    resist_defect_pin_nodes(circuit);
    resist_defect_gates(circuit);

    if circuit.is_sequential {
        info!("sta: sequential circuit, {} flip-flops", circuit.seq_gate_no());
        run_seq_forward_sta(circuit);

        inject_given_rat_data(circuit);

        assert!(are_all_pin_nodes_non_visited(circuit));
        info!("sta: running sequential backward sta");
        run_seq_backward_sta(circuit);
        assert!(are_all_pin_nodes_visited(circuit));
    } else {
        info!("sta: combinational circuit, {} gates", circuit.com_gate_no());
        run_com_forward_sta(circuit);

        if circuit.rat_data_no() > 0 {
            inject_given_rat_data(circuit);

            assert!(are_all_pin_nodes_non_visited(circuit));
            info!("sta: running combinational backward sta");
            let mut queue = Vec::new();
            inject_pos_rat_data(circuit, &mut queue);
            run_backward_wavefront(circuit, queue, false);
            assert!(are_all_pin_nodes_visited(circuit));
        }
    }
}

fn are_all_pin_nodes_non_visited(circuit: &Circuit) -> bool {
    (0..circuit.pin_node_no()).all(|i| circuit.pin_node(crate::circuit::PinNodeId(i)).is_not_visited())
}

fn are_all_pin_nodes_visited(circuit: &Circuit) -> bool {
    (0..circuit.pin_node_no()).all(|i| !circuit.pin_node(crate::circuit::PinNodeId(i)).is_not_visited())
}

/// Fold explicitly authored `rat` netlist lines into each named pin node's
/// required times, using the monotone setters like everything else. Mirrors
/// `injectGivenRATData`.
fn inject_given_rat_data(circuit: &mut Circuit) {
    for rat in circuit.rat_data.clone() {
        let pnode = circuit.pin_node_mut(rat.pin_node);
        match rat.mode {
            RatMode::Both => {
                pnode.set_fast_fall_req_time(rat.fast_fall_time);
                pnode.set_fast_rise_req_time(rat.fast_rise_time);
                pnode.set_slow_fall_req_time(rat.slow_fall_time);
                pnode.set_slow_rise_req_time(rat.slow_rise_time);
            }
            RatMode::Slow => {
                pnode.set_slow_fall_req_time(rat.slow_fall_time);
                pnode.set_slow_rise_req_time(rat.slow_rise_time);
            }
            RatMode::Fast => {
                pnode.set_fast_fall_req_time(rat.fast_fall_time);
                pnode.set_fast_rise_req_time(rat.fast_rise_time);
            }
        }
    }
}
