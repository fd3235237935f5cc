//! Backward STA: required-arrival-time seeding at primary outputs, the
//! reverse wavefront that walks driven pin nodes back to their driving gate,
//! and `backtraceSignal`'s per-gate required-time computation. Grounded in
//! `original_source/STA/runComSTA.cpp` (the `runComBackwardSTA` half),
//! `original_source/STA/runSeqSTA.cpp` (the `runSeqBackwardSTA` half) and
//! `original_source/STA/backtraceSignal.cpp`.

use crate::cell::TimingSense;
use crate::circuit::{Circuit, DelayData, Fanin, GateId};

/// An output pin's visited count has caught up with every sink its owning
/// pin node fans out to, for every output of the gate - the gate itself is
/// now fully "reached" from downstream and can be queued.
fn are_outputs_reached(circuit: &Circuit, gate_id: GateId) -> bool {
    for out in &circuit.gate(gate_id).output_vec {
        let Some(pnode_id) = out.fanout else { continue };
        if out.visited_count() < circuit.pin_node(pnode_id).fanout_no() {
            return false;
        }
    }
    true
}

/// Increment the visited count on the `GOutPin` driving `pnode_id` (walking
/// through a single wire-tap hop if present) and queue its gate once every
/// one of its outputs has been fully reached.
pub fn visit_and_notify_driving_gate(circuit: &mut Circuit, pnode_id: crate::circuit::PinNodeId, queue: &mut Vec<GateId>) {
    let non_visited = circuit.pin_node(pnode_id).is_not_visited();
    circuit.pin_node_mut(pnode_id).set_is_visited();

    let Some(fanin) = circuit.pin_node(pnode_id).fanin else {
        return;
    };

    let (driver_gate, driver_pin) = match fanin {
        Fanin::GateOutput(g, p) => (g, p),
        Fanin::PinNode(wire_id) => {
            if !non_visited {
                return;
            }
            match circuit.pin_node(wire_id).fanin {
                None => {
                    // very special case: the wire tap itself is a dangling source.
                    circuit.pin_node_mut(wire_id).set_is_visited();
                    return;
                }
                Some(Fanin::GateOutput(g, p)) => (g, p),
                Some(Fanin::PinNode(_)) => panic!("wire tap fanin must not chain through a second pin node"),
            }
        }
    };

    circuit.gate_mut(driver_gate).output_vec[driver_pin].inc_visited_count();
    if are_outputs_reached(circuit, driver_gate) {
        queue.push(driver_gate);
    }
}

/// Seed the backward wavefront from every primary output's already-set
/// required time, notifying whatever gate drives it. Mirrors `injectPOsRATData`.
pub fn inject_pos_rat_data(circuit: &mut Circuit, queue: &mut Vec<GateId>) {
    for po_id in circuit.po.clone() {
        assert_eq!(circuit.gate(po_id).input_no(), 1);
        let pnode_id = circuit.gate(po_id).input_pin_node(0).expect("primary output must be connected");
        visit_and_notify_driving_gate(circuit, pnode_id, queue);
    }
}

/// Pull each output pin node's required time down from its sinks (subtracting
/// wire delay), mark it visited, then backtrace the owning gate's inputs and
/// notify whatever drives them. `stop_at_sequential` gates the D-pin boundary:
/// flip-flop outputs still get their RAT pulled but the gate itself does not
/// get backtraced, since a flip-flop's data input required time instead comes
/// from setup/hold injection.
pub fn run_backward_wavefront(circuit: &mut Circuit, mut queue: Vec<GateId>, stop_at_sequential: bool) {
    let mut i = 0;
    while i < queue.len() {
        let cur_gate = queue[i];
        i += 1;

        for out_id in 0..circuit.gate(cur_gate).output_no() {
            let Some(cur_pnode_id) = circuit.gate(cur_gate).output_pin_node(out_id) else {
                continue;
            };

            let mut fast_fall = Vec::new();
            let mut fast_rise = Vec::new();
            let mut slow_fall = Vec::new();
            let mut slow_rise = Vec::new();

            for fanout in circuit.pin_node(cur_pnode_id).fanout.clone() {
                let crate::circuit::FanoutTarget::PinNode(driven_pnode_id) = fanout else {
                    continue;
                };
                if circuit.pin_node(driven_pnode_id).fanout_no() == 0 {
                    continue;
                }
                let crate::circuit::FanoutTarget::GateInput(driven_gate, driven_pin) = circuit.pin_node(driven_pnode_id).fanout[0] else {
                    panic!("wire sink must fan out to a gate input");
                };
                let gin = &circuit.gate(driven_gate).input_vec[driven_pin];
                let driven_pnode = circuit.pin_node(driven_pnode_id);
                fast_fall.push(driven_pnode.fast_fall_req_time() - gin.fall_arr_delay);
                fast_rise.push(driven_pnode.fast_rise_req_time() - gin.rise_arr_delay);
                slow_fall.push(driven_pnode.slow_fall_req_time() - gin.fall_arr_delay);
                slow_rise.push(driven_pnode.slow_rise_req_time() - gin.rise_arr_delay);
            }

            circuit.pin_node_mut(cur_pnode_id).set_is_visited();

            if !fast_fall.is_empty() {
                let pnode = circuit.pin_node_mut(cur_pnode_id);
                pnode.set_fast_fall_req_time(max_of(&fast_fall));
                pnode.set_fast_rise_req_time(max_of(&fast_rise));
                pnode.set_slow_fall_req_time(min_of(&slow_fall));
                pnode.set_slow_rise_req_time(min_of(&slow_rise));
            }
        }

        let can_backtrace = circuit.gate(cur_gate).cell.is_some() && (!stop_at_sequential || circuit.gate(cur_gate).is_non_clocked);

        if can_backtrace {
            backtrace_signal(circuit, cur_gate);

            for in_id in 0..circuit.gate(cur_gate).input_no() {
                let pnode_id = circuit
                    .gate(cur_gate)
                    .input_pin_node(in_id)
                    .expect("connected gate input must have a pin node");
                visit_and_notify_driving_gate(circuit, pnode_id, &mut queue);
            }
        }
    }
}

fn min_of(v: &[f64]) -> f64 {
    v.iter().copied().fold(f64::INFINITY, f64::min)
}
fn max_of(v: &[f64]) -> f64 {
    v.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Compute each connected input's required arrival time from the required
/// times already set on the gate's outputs, for both fast and slow mode.
/// Mirrors `backtraceSignal(Gate&)`.
pub fn backtrace_signal(circuit: &mut Circuit, gate_id: GateId) {
    let cell = circuit.gate(gate_id).cell.clone().expect("backtrace_signal on a PI/PO gate");
    assert!(cell.is_non_clocked);
    let output_no = cell.output_pin_no();

    for i in 0..cell.input_pin_no() {
        let Some(input_pnode_id) = circuit.gate(gate_id).input_pin_node(i) else {
            continue;
        };
        if circuit.pin_node(input_pnode_id).fanin.is_none() {
            continue;
        }

        let mut fast_fall = Vec::new();
        let mut fast_rise = Vec::new();
        let mut slow_fall = Vec::new();
        let mut slow_rise = Vec::new();

        for j in 0..output_no {
            let Some(out_pnode_id) = circuit.gate(gate_id).output_pin_node(j) else {
                continue;
            };
            if circuit.pin_node(out_pnode_id).fanout_no() == 0 {
                continue;
            }
            let Some(timing) = cell.input_timing[i][j] else {
                continue;
            };

            let out_pnode = circuit.pin_node(out_pnode_id);
            let fast_data = circuit.gate(gate_id).output_vec[j].fast_delay_data[i].expect("fast delay data must be set before backtrace");
            let slow_data = circuit.gate(gate_id).output_vec[j].slow_delay_data[i].expect("slow delay data must be set before backtrace");

            match timing.sense {
                TimingSense::NegativeUnate => {
                    let DelayData::Unate { delay_from_input_fall, delay_from_input_rise } = fast_data else {
                        panic!("negative_unate arc must carry unate delay data");
                    };
                    fast_fall.push(out_pnode.fast_rise_req_time() - delay_from_input_fall);
                    fast_rise.push(out_pnode.fast_fall_req_time() - delay_from_input_rise);
                    let DelayData::Unate { delay_from_input_fall, delay_from_input_rise } = slow_data else {
                        panic!("negative_unate arc must carry unate delay data");
                    };
                    slow_fall.push(out_pnode.slow_rise_req_time() - delay_from_input_fall);
                    slow_rise.push(out_pnode.slow_fall_req_time() - delay_from_input_rise);
                }
                TimingSense::PositiveUnate => {
                    let DelayData::Unate { delay_from_input_fall, delay_from_input_rise } = fast_data else {
                        panic!("positive_unate arc must carry unate delay data");
                    };
                    fast_fall.push(out_pnode.fast_fall_req_time() - delay_from_input_fall);
                    fast_rise.push(out_pnode.fast_rise_req_time() - delay_from_input_rise);
                    let DelayData::Unate { delay_from_input_fall, delay_from_input_rise } = slow_data else {
                        panic!("positive_unate arc must carry unate delay data");
                    };
                    slow_fall.push(out_pnode.slow_fall_req_time() - delay_from_input_fall);
                    slow_rise.push(out_pnode.slow_rise_req_time() - delay_from_input_rise);
                }
                TimingSense::NonUnate => {
                    let DelayData::NonUnate {
                        input_fall_output_fall_delay,
                        input_fall_output_rise_delay,
                        input_rise_output_fall_delay,
                        input_rise_output_rise_delay,
                    } = fast_data
                    else {
                        panic!("non_unate arc must carry non-unate delay data");
                    };
                    fast_fall.push(out_pnode.fast_rise_req_time() - input_fall_output_rise_delay);
                    fast_rise.push(out_pnode.fast_fall_req_time() - input_rise_output_fall_delay);
                    fast_fall.push(out_pnode.fast_fall_req_time() - input_fall_output_fall_delay);
                    fast_rise.push(out_pnode.fast_rise_req_time() - input_rise_output_rise_delay);

                    let DelayData::NonUnate {
                        input_fall_output_fall_delay,
                        input_fall_output_rise_delay,
                        input_rise_output_fall_delay,
                        input_rise_output_rise_delay,
                    } = slow_data
                    else {
                        panic!("non_unate arc must carry non-unate delay data");
                    };
                    slow_fall.push(out_pnode.slow_rise_req_time() - input_fall_output_rise_delay);
                    slow_rise.push(out_pnode.slow_fall_req_time() - input_rise_output_fall_delay);
                    slow_fall.push(out_pnode.slow_fall_req_time() - input_fall_output_fall_delay);
                    slow_rise.push(out_pnode.slow_rise_req_time() - input_rise_output_rise_delay);
                }
            }
        }

        // a branch point driven straight off a gate output (no wire tap) already
        // carries a candidate required time from a sibling fanout visited earlier.
        if let Some(Fanin::GateOutput(_, _)) = circuit.pin_node(input_pnode_id).fanin {
            if circuit.pin_node(input_pnode_id).fanout_no() > 1 {
                let p = circuit.pin_node(input_pnode_id);
                fast_fall.push(p.fast_fall_req_time());
                fast_rise.push(p.fast_rise_req_time());
                slow_fall.push(p.slow_fall_req_time());
                slow_rise.push(p.slow_rise_req_time());
            }
        }

        assert!(!fast_fall.is_empty(), "at least one output must have a signal reaching this input");
        let pnode = circuit.pin_node_mut(input_pnode_id);
        pnode.set_fast_fall_req_time(max_of(&fast_fall));
        pnode.set_fast_rise_req_time(max_of(&fast_rise));
        pnode.set_slow_fall_req_time(min_of(&slow_fall));
        pnode.set_slow_rise_req_time(min_of(&slow_rise));
    }
}
