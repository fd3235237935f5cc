//! Forward STA: per-gate arc evaluation and the topological, data-driven
//! arrival/slew wavefront. Grounded in `original_source/STA/propagateSignal.cpp`
//! and the forward half of `original_source/STA/runComSTA.cpp` /
//! `original_source/STA/runSeqSTA.cpp`.

use log::trace;

use crate::cell::TimingSense;
use crate::circuit::{Circuit, DelayData, FanoutTarget, GateId};

fn eval_fall(timing: &crate::cell::InputTiming, input_arrival: f64, input_slew: f64, load: f64) -> (f64, f64) {
    timing.eval_fall(input_arrival, input_slew, load)
}
fn eval_rise(timing: &crate::cell::InputTiming, input_arrival: f64, input_slew: f64, load: f64) -> (f64, f64) {
    timing.eval_rise(input_arrival, input_slew, load)
}

/// Evaluate a combinational gate's arc table for both fast and slow mode,
/// reducing (min for fast, max for slow) at each of its output pin nodes.
/// Mirrors `propagateSignal(Gate*)`.
pub fn propagate_signal(circuit: &mut Circuit, gate_id: GateId) {
    let cell = circuit.gate(gate_id).cell.clone().expect("propagate_signal on a PI/PO gate");
    let input_no = cell.input_pin_no();
    let output_no = cell.output_pin_no();

    let mut in_fast_fall_arr = vec![0.0; input_no];
    let mut in_fast_rise_arr = vec![0.0; input_no];
    let mut in_fast_fall_slew = vec![0.0; input_no];
    let mut in_fast_rise_slew = vec![0.0; input_no];
    let mut in_slow_fall_arr = vec![0.0; input_no];
    let mut in_slow_rise_arr = vec![0.0; input_no];
    let mut in_slow_fall_slew = vec![0.0; input_no];
    let mut in_slow_rise_slew = vec![0.0; input_no];
    let mut in_connected = vec![false; input_no];

    for i in 0..input_no {
        let Some(pnode_id) = circuit.gate(gate_id).input_pin_node(i) else {
            continue;
        };
        if circuit.pin_node(pnode_id).fanin.is_none() {
            continue;
        }
        let pnode = circuit.pin_node(pnode_id);
        in_fast_fall_arr[i] = pnode.fast_fall_arr_time;
        in_fast_rise_arr[i] = pnode.fast_rise_arr_time;
        in_fast_fall_slew[i] = pnode.fast_fall_slew;
        in_fast_rise_slew[i] = pnode.fast_rise_slew;
        in_slow_fall_arr[i] = pnode.slow_fall_arr_time;
        in_slow_rise_arr[i] = pnode.slow_rise_arr_time;
        in_slow_fall_slew[i] = pnode.slow_fall_slew;
        in_slow_rise_slew[i] = pnode.slow_rise_slew;
        in_connected[i] = true;
    }

    for out_id in 0..output_no {
        let Some(out_pnode_id) = circuit.gate(gate_id).output_pin_node(out_id) else {
            continue;
        };
        if circuit.pin_node(out_pnode_id).fanout_no() == 0 {
            continue;
        }

        let fall_load = circuit.gate(gate_id).output_vec[out_id].fall_load;
        let rise_load = circuit.gate(gate_id).output_vec[out_id].rise_load;
        circuit.gate_mut(gate_id).output_vec[out_id].init_delay_data_vecs(input_no);

        let mut out_fast_fall_arr = Vec::with_capacity(input_no);
        let mut out_fast_rise_arr = Vec::with_capacity(input_no);
        let mut out_fast_fall_slew = Vec::with_capacity(input_no);
        let mut out_fast_rise_slew = Vec::with_capacity(input_no);
        let mut out_slow_fall_arr = Vec::with_capacity(input_no);
        let mut out_slow_rise_arr = Vec::with_capacity(input_no);
        let mut out_slow_fall_slew = Vec::with_capacity(input_no);
        let mut out_slow_rise_slew = Vec::with_capacity(input_no);

        for j in 0..input_no {
            if !in_connected[j] {
                continue;
            }
            let Some(timing) = cell.input_timing[j][out_id] else {
                continue; // unknown_unate: no arc
            };

            let fast_data;
            let slow_data;

            match timing.sense {
                TimingSense::NegativeUnate => {
                    let (fa, fs) = eval_fall(&timing, in_fast_rise_arr[j], in_fast_rise_slew[j], fall_load);
                    out_fast_fall_arr.push(fa);
                    out_fast_fall_slew.push(fs);
                    let (ra, rs) = eval_rise(&timing, in_fast_fall_arr[j], in_fast_fall_slew[j], rise_load);
                    out_fast_rise_arr.push(ra);
                    out_fast_rise_slew.push(rs);
                    let fast_delay_from_input_rise = fa - in_fast_rise_arr[j];
                    let fast_delay_from_input_fall = ra - in_fast_fall_arr[j];

                    let (fa, fs) = eval_fall(&timing, in_slow_rise_arr[j], in_slow_rise_slew[j], fall_load);
                    out_slow_fall_arr.push(fa);
                    out_slow_fall_slew.push(fs);
                    let (ra, rs) = eval_rise(&timing, in_slow_fall_arr[j], in_slow_fall_slew[j], rise_load);
                    out_slow_rise_arr.push(ra);
                    out_slow_rise_slew.push(rs);
                    let slow_delay_from_input_rise = fa - in_slow_rise_arr[j];
                    let slow_delay_from_input_fall = ra - in_slow_fall_arr[j];

                    fast_data = DelayData::Unate {
                        delay_from_input_fall: fast_delay_from_input_fall,
                        delay_from_input_rise: fast_delay_from_input_rise,
                    };
                    slow_data = DelayData::Unate {
                        delay_from_input_fall: slow_delay_from_input_fall,
                        delay_from_input_rise: slow_delay_from_input_rise,
                    };
                }
                TimingSense::PositiveUnate => {
                    let (fa, fs) = eval_fall(&timing, in_fast_fall_arr[j], in_fast_fall_slew[j], fall_load);
                    out_fast_fall_arr.push(fa);
                    out_fast_fall_slew.push(fs);
                    let (ra, rs) = eval_rise(&timing, in_fast_rise_arr[j], in_fast_rise_slew[j], rise_load);
                    out_fast_rise_arr.push(ra);
                    out_fast_rise_slew.push(rs);
                    let fast_delay_from_input_fall = fa - in_fast_fall_arr[j];
                    let fast_delay_from_input_rise = ra - in_fast_rise_arr[j];

                    let (fa, fs) = eval_fall(&timing, in_slow_fall_arr[j], in_slow_fall_slew[j], fall_load);
                    out_slow_fall_arr.push(fa);
                    out_slow_fall_slew.push(fs);
                    let (ra, rs) = eval_rise(&timing, in_slow_rise_arr[j], in_slow_rise_slew[j], rise_load);
                    out_slow_rise_arr.push(ra);
                    out_slow_rise_slew.push(rs);
                    let slow_delay_from_input_fall = fa - in_slow_fall_arr[j];
                    let slow_delay_from_input_rise = ra - in_slow_rise_arr[j];

                    fast_data = DelayData::Unate {
                        delay_from_input_fall: fast_delay_from_input_fall,
                        delay_from_input_rise: fast_delay_from_input_rise,
                    };
                    slow_data = DelayData::Unate {
                        delay_from_input_fall: slow_delay_from_input_fall,
                        delay_from_input_rise: slow_delay_from_input_rise,
                    };
                }
                TimingSense::NonUnate => {
                    let (ff_fall, ff_fall_slew) = eval_fall(&timing, in_fast_rise_arr[j], in_fast_rise_slew[j], fall_load);
                    out_fast_fall_arr.push(ff_fall);
                    out_fast_fall_slew.push(ff_fall_slew);
                    let input_rise_output_fall_delay_fast = ff_fall - in_fast_rise_arr[j];

                    let (ff_rise, ff_rise_slew) = eval_rise(&timing, in_fast_fall_arr[j], in_fast_fall_slew[j], rise_load);
                    out_fast_rise_arr.push(ff_rise);
                    out_fast_rise_slew.push(ff_rise_slew);
                    let input_fall_output_rise_delay_fast = ff_rise - in_fast_fall_arr[j];

                    let (ff_fall2, ff_fall_slew2) = eval_fall(&timing, in_fast_fall_arr[j], in_fast_fall_slew[j], fall_load);
                    out_fast_fall_arr.push(ff_fall2);
                    out_fast_fall_slew.push(ff_fall_slew2);
                    let input_fall_output_fall_delay_fast = ff_fall2 - in_fast_fall_arr[j];

                    let (ff_rise2, ff_rise_slew2) = eval_rise(&timing, in_fast_rise_arr[j], in_fast_rise_slew[j], rise_load);
                    out_fast_rise_arr.push(ff_rise2);
                    out_fast_rise_slew.push(ff_rise_slew2);
                    let input_rise_output_rise_delay_fast = ff_rise2 - in_fast_rise_arr[j];

                    let (sf_fall, sf_fall_slew) = eval_fall(&timing, in_slow_rise_arr[j], in_slow_rise_slew[j], fall_load);
                    out_slow_fall_arr.push(sf_fall);
                    out_slow_fall_slew.push(sf_fall_slew);
                    let input_rise_output_fall_delay_slow = sf_fall - in_slow_rise_arr[j];

                    let (sf_rise, sf_rise_slew) = eval_rise(&timing, in_slow_fall_arr[j], in_slow_fall_slew[j], rise_load);
                    out_slow_rise_arr.push(sf_rise);
                    out_slow_rise_slew.push(sf_rise_slew);
                    let input_fall_output_rise_delay_slow = sf_rise - in_slow_fall_arr[j];

                    let (sf_fall2, sf_fall_slew2) = eval_fall(&timing, in_slow_fall_arr[j], in_slow_fall_slew[j], fall_load);
                    out_slow_fall_arr.push(sf_fall2);
                    out_slow_fall_slew.push(sf_fall_slew2);
                    let input_fall_output_fall_delay_slow = sf_fall2 - in_slow_fall_arr[j];

                    let (sf_rise2, sf_rise_slew2) = eval_rise(&timing, in_slow_rise_arr[j], in_slow_rise_slew[j], rise_load);
                    out_slow_rise_arr.push(sf_rise2);
                    out_slow_rise_slew.push(sf_rise_slew2);
                    let input_rise_output_rise_delay_slow = sf_rise2 - in_slow_rise_arr[j];

                    fast_data = DelayData::NonUnate {
                        input_fall_output_fall_delay: input_fall_output_fall_delay_fast,
                        input_fall_output_rise_delay: input_fall_output_rise_delay_fast,
                        input_rise_output_fall_delay: input_rise_output_fall_delay_fast,
                        input_rise_output_rise_delay: input_rise_output_rise_delay_fast,
                    };
                    slow_data = DelayData::NonUnate {
                        input_fall_output_fall_delay: input_fall_output_fall_delay_slow,
                        input_fall_output_rise_delay: input_fall_output_rise_delay_slow,
                        input_rise_output_fall_delay: input_rise_output_fall_delay_slow,
                        input_rise_output_rise_delay: input_rise_output_rise_delay_slow,
                    };
                }
            }

            circuit.gate_mut(gate_id).output_vec[out_id].fast_delay_data[j] = Some(fast_data);
            circuit.gate_mut(gate_id).output_vec[out_id].slow_delay_data[j] = Some(slow_data);
        }

        assert!(!out_fast_fall_arr.is_empty(), "no active arc reached a connected output in propagate_signal");
        let pnode = circuit.pin_node_mut(out_pnode_id);
        pnode.fast_fall_arr_time = min_of(&out_fast_fall_arr);
        pnode.fast_fall_slew = min_of(&out_fast_fall_slew);
        pnode.fast_rise_arr_time = min_of(&out_fast_rise_arr);
        pnode.fast_rise_slew = min_of(&out_fast_rise_slew);
        pnode.slow_fall_arr_time = max_of(&out_slow_fall_arr);
        pnode.slow_fall_slew = max_of(&out_slow_fall_slew);
        pnode.slow_rise_arr_time = max_of(&out_slow_rise_arr);
        pnode.slow_rise_slew = max_of(&out_slow_rise_slew);
    }
}

/// Propagate a single input (the clock pin of a flip-flop) to every output,
/// used for clock-to-Q. Mirrors `propagateSignal(unsigned, Gate*)`.
pub fn propagate_single_input(circuit: &mut Circuit, gate_id: GateId, input_pin_id: usize) {
    let cell = circuit
        .gate(gate_id)
        .cell
        .clone()
        .expect("propagate_single_input on a PI/PO gate");
    let output_no = cell.output_pin_no();
    let input_pnode_id = circuit.gate(gate_id).input_pin_node(input_pin_id).expect("clock pin must be connected");

    for out_id in 0..output_no {
        let Some(out_pnode_id) = circuit.gate(gate_id).output_pin_node(out_id) else {
            continue;
        };
        if circuit.pin_node(out_pnode_id).fanout_no() == 0 {
            continue;
        }

        let fall_load = circuit.gate(gate_id).output_vec[out_id].fall_load;
        let rise_load = circuit.gate(gate_id).output_vec[out_id].rise_load;
        let timing = cell.input_timing[input_pin_id][out_id].expect("clock arc must not be unknown_unate");
        let pnode = circuit.pin_node(input_pnode_id).clone_signals();

        let mut fast_fall_arr = Vec::with_capacity(2);
        let mut fast_rise_arr = Vec::with_capacity(2);
        let mut fast_fall_slew = Vec::with_capacity(2);
        let mut fast_rise_slew = Vec::with_capacity(2);
        let mut slow_fall_arr = Vec::with_capacity(2);
        let mut slow_rise_arr = Vec::with_capacity(2);
        let mut slow_fall_slew = Vec::with_capacity(2);
        let mut slow_rise_slew = Vec::with_capacity(2);

        let mut push_fall = |arr: f64, slew: f64, load: f64, fast: bool| {
            let (a, s) = eval_fall(&timing, arr, slew, load);
            if fast {
                fast_fall_arr.push(a);
                fast_fall_slew.push(s);
            } else {
                slow_fall_arr.push(a);
                slow_fall_slew.push(s);
            }
        };
        let mut push_rise = |arr: f64, slew: f64, load: f64, fast: bool| {
            let (a, s) = eval_rise(&timing, arr, slew, load);
            if fast {
                fast_rise_arr.push(a);
                fast_rise_slew.push(s);
            } else {
                slow_rise_arr.push(a);
                slow_rise_slew.push(s);
            }
        };

        match timing.sense {
            TimingSense::NonUnate => {
                push_fall(pnode.fast_rise_arr_time, pnode.fast_rise_slew, fall_load, true);
                push_rise(pnode.fast_fall_arr_time, pnode.fast_fall_slew, rise_load, true);
                push_fall(pnode.slow_rise_arr_time, pnode.slow_rise_slew, fall_load, false);
                push_rise(pnode.slow_fall_arr_time, pnode.slow_fall_slew, rise_load, false);
                push_fall(pnode.fast_fall_arr_time, pnode.fast_fall_slew, fall_load, true);
                push_rise(pnode.fast_rise_arr_time, pnode.fast_rise_slew, rise_load, true);
                push_fall(pnode.slow_fall_arr_time, pnode.slow_fall_slew, fall_load, false);
                push_rise(pnode.slow_rise_arr_time, pnode.slow_rise_slew, rise_load, false);
            }
            TimingSense::NegativeUnate => {
                push_fall(pnode.fast_rise_arr_time, pnode.fast_rise_slew, fall_load, true);
                push_rise(pnode.fast_fall_arr_time, pnode.fast_fall_slew, rise_load, true);
                push_fall(pnode.slow_rise_arr_time, pnode.slow_rise_slew, fall_load, false);
                push_rise(pnode.slow_fall_arr_time, pnode.slow_fall_slew, rise_load, false);
            }
            TimingSense::PositiveUnate => {
                push_fall(pnode.fast_fall_arr_time, pnode.fast_fall_slew, fall_load, true);
                push_rise(pnode.fast_rise_arr_time, pnode.fast_rise_slew, rise_load, true);
                push_fall(pnode.slow_fall_arr_time, pnode.slow_fall_slew, fall_load, false);
                push_rise(pnode.slow_rise_arr_time, pnode.slow_rise_slew, rise_load, false);
            }
        }

        assert!(!fast_fall_arr.is_empty());
        let out_pnode = circuit.pin_node_mut(out_pnode_id);
        out_pnode.fast_fall_arr_time = min_of(&fast_fall_arr);
        out_pnode.fast_fall_slew = min_of(&fast_fall_slew);
        out_pnode.fast_rise_arr_time = min_of(&fast_rise_arr);
        out_pnode.fast_rise_slew = min_of(&fast_rise_slew);
        out_pnode.slow_fall_arr_time = max_of(&slow_fall_arr);
        out_pnode.slow_fall_slew = max_of(&slow_fall_slew);
        out_pnode.slow_rise_arr_time = max_of(&slow_rise_arr);
        out_pnode.slow_rise_slew = max_of(&slow_rise_slew);
    }
}

fn min_of(v: &[f64]) -> f64 {
    v.iter().copied().fold(f64::INFINITY, f64::min)
}
fn max_of(v: &[f64]) -> f64 {
    v.iter().copied().fold(f64::NEG_INFINITY, f64::max)
}

/// Run the topological, data-driven forward wavefront starting from the
/// gates already queued (primary inputs for a combinational circuit, or
/// flip-flops resuming after clock-to-Q). Mirrors the fanout loop shared by
/// `runComForwardSTA` and the two calls to the private `runSeqForwardSTA`.
pub fn run_forward_wavefront(circuit: &mut Circuit, mut queue: Vec<GateId>) {
    let mut i = 0;
    while i < queue.len() {
        let cur_gate = queue[i];
        i += 1;

        for out_id in 0..circuit.gate(cur_gate).output_no() {
            let Some(out_pnode_id) = circuit.gate(cur_gate).output_pin_node(out_id) else {
                continue;
            };

            let (fast_fall_sq, fast_rise_sq, slow_fall_sq, slow_rise_sq) = {
                let p = circuit.pin_node(out_pnode_id);
                (
                    p.fast_fall_slew * p.fast_fall_slew,
                    p.fast_rise_slew * p.fast_rise_slew,
                    p.slow_fall_slew * p.slow_fall_slew,
                    p.slow_rise_slew * p.slow_rise_slew,
                )
            };

            for fanout in circuit.pin_node(out_pnode_id).fanout.clone() {
                let driven_gate = match fanout {
                    FanoutTarget::PinNode(driven_pnode_id) => {
                        if circuit.pin_node(driven_pnode_id).fanout_no() == 0 {
                            continue; // very special case
                        }
                        let FanoutTarget::GateInput(driven_gate, driven_pin) = circuit.pin_node(driven_pnode_id).fanout[0] else {
                            panic!("wire sink must fan out to a gate input");
                        };
                        let wire_fall_delay = circuit.gate(driven_gate).input_vec[driven_pin].fall_arr_delay;
                        let wire_rise_delay = circuit.gate(driven_gate).input_vec[driven_pin].rise_arr_delay;

                        let driver = circuit.pin_node(out_pnode_id).clone_signals();
                        let sink = circuit.pin_node_mut(driven_pnode_id);
                        sink.fast_fall_arr_time = driver.fast_fall_arr_time + wire_fall_delay;
                        sink.fast_rise_arr_time = driver.fast_rise_arr_time + wire_rise_delay;
                        sink.fast_fall_slew = (fast_fall_sq + sink.fall_slew_hat_sq).sqrt();
                        sink.fast_rise_slew = (fast_rise_sq + sink.rise_slew_hat_sq).sqrt();
                        sink.slow_fall_arr_time = driver.slow_fall_arr_time + wire_fall_delay;
                        sink.slow_rise_arr_time = driver.slow_rise_arr_time + wire_rise_delay;
                        sink.slow_fall_slew = (slow_fall_sq + sink.fall_slew_hat_sq).sqrt();
                        sink.slow_rise_slew = (slow_rise_sq + sink.rise_slew_hat_sq).sqrt();

                        assert_eq!(circuit.pin_node(driven_pnode_id).fanout_no(), 1);
                        driven_gate
                    }
                    FanoutTarget::GateInput(driven_gate, _) => driven_gate,
                };

                circuit.gate_mut(driven_gate).inc_input_visited_count();
                assert!(circuit.gate(driven_gate).input_visited_count() <= circuit.gate(driven_gate).input_no());

                if circuit.gate(driven_gate).input_visited_count() >= circuit.gate(driven_gate).input_no() {
                    let is_ff_or_po = !circuit.gate(driven_gate).is_non_clocked || circuit.gate(driven_gate).cell.is_none();
                    if !is_ff_or_po {
                        queue.push(driven_gate);
                        trace!("forward: gate saturated, propagating signal");
                        propagate_signal(circuit, driven_gate);
                    }
                }
            }
        }
    }
}

/// Enqueue every primary input and run the forward wavefront over a purely
/// combinational circuit. Mirrors `runComForwardSTA`.
pub fn run_com_forward_sta(circuit: &mut Circuit) {
    assert!(!circuit.is_sequential);
    for gate_id in &circuit.com_gates {
        assert_eq!(circuit.gate(*gate_id).input_visited_count(), 0);
    }

    let queue: Vec<GateId> = circuit.pi.clone();
    run_forward_wavefront(circuit, queue);

    for gate_id in &circuit.com_gates {
        assert_eq!(
            circuit.gate(*gate_id).input_visited_count(),
            circuit.gate(*gate_id).input_no(),
            "gate never saturated during forward sta"
        );
    }
}
