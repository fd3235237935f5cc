//! Sequential glue: two-phase forward STA around each flip-flop's
//! clock-to-Q arc, and setup/hold required-time injection on its data
//! inputs. Grounded in `original_source/STA/runSeqSTA.cpp`.

use crate::backward::{inject_pos_rat_data, run_backward_wavefront};
use crate::cell::EdgeType;
use crate::circuit::Circuit;
use crate::forward::{propagate_single_input, run_forward_wavefront};

/// Run forward STA on a sequential circuit: a combinational wavefront from
/// the primary inputs (which starves at every flip-flop's D/clock pins,
/// since those gates are excluded from the push condition), then clock-to-Q
/// fires every flip-flop as a fresh source, then a second wavefront resumes
/// from there. Mirrors the two-argument/no-argument overload pair of
/// `runSeqForwardSTA`.
pub fn run_seq_forward_sta(circuit: &mut Circuit) {
    assert!(circuit.is_sequential);

    let first_wave = circuit.pi.clone();
    run_forward_wavefront(circuit, first_wave);

    for gate_id in circuit.seq_gates.clone() {
        let clock_pin_id = circuit.gate(gate_id).clock_pin_id();
        propagate_single_input(circuit, gate_id, clock_pin_id);
    }

    let second_wave = circuit.seq_gates.clone();
    run_forward_wavefront(circuit, second_wave);
}

/// Seed the backward wavefront at every flip-flop: notify the clock pin's
/// driving gate, notify every other input's driving gate, and fold the
/// setup/hold linear models into fast/slow required times on the data
/// inputs that carry a [`crate::cell::ClockParams`] constraint. Mirrors
/// `injectFFsRATData`.
pub fn inject_ffs_rat_data(circuit: &mut Circuit, queue: &mut Vec<crate::circuit::GateId>) {
    for gate_id in circuit.seq_gates.clone() {
        let clock_pin_id = circuit.gate(gate_id).clock_pin_id();
        let Some(clk_pnode_id) = circuit.gate(gate_id).input_pin_node(clock_pin_id) else {
            continue;
        };

        crate::backward::visit_and_notify_driving_gate(circuit, clk_pnode_id, queue);

        let cell = circuit.gate(gate_id).cell.clone().expect("sequential gate must carry a cell");
        let clk = circuit.pin_node(clk_pnode_id).clone_signals();

        for j in 0..circuit.gate(gate_id).input_no() {
            if j == clock_pin_id {
                continue;
            }
            let Some(input_pnode_id) = circuit.gate(gate_id).input_pin_node(j) else {
                continue;
            };

            crate::backward::visit_and_notify_driving_gate(circuit, input_pnode_id, queue);

            let Some(params) = cell.clock_params[j] else {
                continue;
            };

            let input = circuit.pin_node(input_pnode_id).clone_signals();

            let (fall_setup, rise_setup, setup_arr) = match params.setup_edge {
                EdgeType::Rising => (
                    params.fall_setup_g + params.fall_setup_h * clk.fast_rise_slew + params.fall_setup_j * input.slow_fall_slew,
                    params.rise_setup_g + params.rise_setup_h * clk.fast_rise_slew + params.rise_setup_j * input.slow_rise_slew,
                    clk.fast_rise_arr_time,
                ),
                EdgeType::Falling => (
                    params.fall_setup_g + params.fall_setup_h * clk.fast_fall_slew + params.fall_setup_j * input.slow_fall_slew,
                    params.rise_setup_g + params.rise_setup_h * clk.fast_fall_slew + params.rise_setup_j * input.slow_rise_slew,
                    clk.fast_fall_arr_time,
                ),
            };

            let (fall_hold, rise_hold, hold_arr) = match params.hold_edge {
                EdgeType::Rising => (
                    params.fall_hold_m + params.fall_hold_n * clk.slow_rise_slew + params.fall_hold_p * input.fast_fall_slew,
                    params.rise_hold_m + params.rise_hold_n * clk.slow_rise_slew + params.rise_hold_p * input.fast_rise_slew,
                    clk.slow_rise_arr_time,
                ),
                EdgeType::Falling => (
                    params.fall_hold_m + params.fall_hold_n * clk.slow_fall_slew + params.fall_hold_p * input.fast_fall_slew,
                    params.rise_hold_m + params.rise_hold_n * clk.slow_fall_slew + params.rise_hold_p * input.fast_rise_slew,
                    clk.slow_fall_arr_time,
                ),
            };

            let clock_period = circuit.clock_period;
            let pnode = circuit.pin_node_mut(input_pnode_id);
            pnode.set_slow_fall_req_time(clock_period + setup_arr - fall_setup);
            pnode.set_slow_rise_req_time(clock_period + setup_arr - rise_setup);
            pnode.set_fast_fall_req_time(hold_arr + fall_hold);
            pnode.set_fast_rise_req_time(hold_arr + rise_hold);
        }
    }
}

/// Run both phases of backward STA on a sequential circuit: seed flip-flop
/// setup/hold and primary-output required times, then walk the reverse
/// wavefront, stopping at each flip-flop's D/clock pin boundary. Mirrors
/// `runSeqBackwardSTA`.
pub fn run_seq_backward_sta(circuit: &mut Circuit) {
    let mut queue = Vec::new();
    inject_ffs_rat_data(circuit, &mut queue);
    inject_pos_rat_data(circuit, &mut queue);
    run_backward_wavefront(circuit, queue, true);
}
