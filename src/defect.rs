//! Defect handling: circuits retrieved from real layouts carry dangling
//! nodes (tie-off cells, unused decoder branches, floating test points) that
//! would otherwise starve the data-driven wavefronts of `forward`/`backward`
//! forever. Grounded in `original_source/STA/runSTA.cpp`
//! (`resistDefectPinNodes`/`resistDefectGates`/`propagateVirtualSignal`).

use crate::circuit::{Circuit, Fanin, FanoutTarget, PinNodeId};

/// A pin node with no fanin can never receive a real forward signal; walk
/// its fanout tree marking every sink gate input as already visited so the
/// wavefront doesn't wait on it. Mirrors `propagateVirtualSignal`.
pub fn propagate_virtual_signal(circuit: &mut Circuit, pnode_id: PinNodeId) {
    for target in circuit.pin_node(pnode_id).fanout.clone() {
        match target {
            FanoutTarget::GateInput(gate_id, _) => {
                circuit.gate_mut(gate_id).inc_input_visited_count();
                assert!(
                    circuit.gate(gate_id).input_visited_count() < circuit.gate(gate_id).input_no(),
                    "virtual signal alone should never saturate a gate"
                );
            }
            FanoutTarget::PinNode(next_id) => propagate_virtual_signal(circuit, next_id),
        }
    }
}

/// Resist two defects on pin nodes: a fanin-less node starves its fanout
/// cone of a real forward signal (fixed by [`propagate_virtual_signal`]), and
/// a fanout-less node starves its driving gate output's backward-wavefront
/// visited count (fixed by walking upstream and crediting that output once).
pub fn resist_defect_pin_nodes(circuit: &mut Circuit) {
    for id in 0..circuit.pin_node_no() {
        let pnode_id = PinNodeId(id);

        if circuit.pin_node(pnode_id).fanin.is_none() {
            propagate_virtual_signal(circuit, pnode_id);
        }

        if circuit.pin_node(pnode_id).fanout_no() == 0 {
            let mut fanin = circuit.pin_node(pnode_id).fanin;
            loop {
                match fanin {
                    None => break,
                    Some(Fanin::GateOutput(gate_id, pin_id)) => {
                        circuit.gate_mut(gate_id).output_vec[pin_id].inc_visited_count();
                        break;
                    }
                    Some(Fanin::PinNode(next_id)) => fanin = circuit.pin_node(next_id).fanin,
                }
            }
        }
    }
}

/// A combinational gate input left unconnected in the netlist (no `off`
/// pin, just silence) can never be visited by the forward wavefront either;
/// count it as already visited. Mirrors `resistDefectGates`.
pub fn resist_defect_gates(circuit: &mut Circuit) {
    for gate_id in circuit.com_gates.clone() {
        for j in 0..circuit.gate(gate_id).input_no() {
            if circuit.gate(gate_id).input_pin_node(j).is_none() {
                circuit.gate_mut(gate_id).inc_input_visited_count();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Gate, PinNode};

    #[test]
    fn dangling_gate_input_counts_as_already_visited() {
        let mut circuit = Circuit::new();
        let mut gate = Gate::instance(std::rc::Rc::new(crate::cell::Cell {
            name: "AND2".into(),
            is_non_clocked: true,
            input_pin_names: vec!["A".into(), "B".into()],
            input_fall_cap: vec![0.1, 0.1],
            input_rise_cap: vec![0.1, 0.1],
            input_timing: vec![vec![None], vec![None]],
            clock_pin_id: 0,
            clock_params: vec![None, None],
            output_pin_names: vec!["Y".into()],
        }));
        let pnode_id = circuit.push_pin_node(PinNode::new("a"));
        gate.input_vec[0].fanin = Some(pnode_id);
        let gate_id = circuit.push_gate(gate);
        circuit.com_gates.push(gate_id);

        resist_defect_gates(&mut circuit);

        assert_eq!(circuit.gate(gate_id).input_visited_count(), 1);
    }

    #[test]
    fn fanin_less_pin_node_marks_its_sink_visited() {
        // the sink must have >=2 inputs: a single-input gate would be driven
        // to full saturation by the virtual signal alone, tripping the
        // "never saturate a gate" assert in propagate_virtual_signal - the
        // same assert the original trips on that pathological shape.
        let mut circuit = Circuit::new();
        let gate = Gate::instance(std::rc::Rc::new(crate::cell::Cell {
            name: "AND2".into(),
            is_non_clocked: true,
            input_pin_names: vec!["A".into(), "B".into()],
            input_fall_cap: vec![0.1, 0.1],
            input_rise_cap: vec![0.1, 0.1],
            input_timing: vec![vec![None], vec![None]],
            clock_pin_id: 0,
            clock_params: vec![None, None],
            output_pin_names: vec!["Y".into()],
        }));
        let gate_id = circuit.push_gate(gate);
        let pnode_id = circuit.push_pin_node(PinNode::new("floating"));
        circuit.gate_mut(gate_id).input_vec[0].fanin = Some(pnode_id);
        circuit.pin_node_mut(pnode_id).fanout.push(FanoutTarget::GateInput(gate_id, 0));

        resist_defect_pin_nodes(&mut circuit);

        assert_eq!(circuit.gate(gate_id).input_visited_count(), 1);
    }
}
