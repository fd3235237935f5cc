//! Report writer: emits the `at`/`slack` text format read off a fully
//! analyzed circuit. Grounded in `original_source/STA/CircuitPrint.cpp`.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{self, Write};

use log::info;

use crate::circuit::{Circuit, PinNodeId};
use crate::consts::{NEGATIVE_BOUND, POSITIVE_BOUND};

/// Render the report as a single string, then write it to `path`. Mirrors
/// the pair of `PrintTimingData` overloads (the `cout`-based variant isn't
/// needed here - this crate only ever writes the file form).
pub fn write_report(circuit: &Circuit, path: &std::path::Path) -> io::Result<()> {
    let text = render_report(circuit);
    let mut file = File::create(path)?;
    file.write_all(text.as_bytes())?;
    info!("report: wrote {} bytes to {}", text.len(), path.display());
    Ok(())
}

pub fn render_report(circuit: &Circuit) -> String {
    let mut out = String::new();

    let mut po_pnodes: Vec<PinNodeId> = circuit
        .po
        .iter()
        .map(|&gate_id| {
            circuit
                .gate(gate_id)
                .input_pin_node(0)
                .expect("primary output must be connected")
        })
        .collect();
    po_pnodes.sort_by(|&a, &b| circuit.pin_node(a).name.cmp(&circuit.pin_node(b).name));

    for pnode_id in &po_pnodes {
        let p = circuit.pin_node(*pnode_id);
        writeln!(
            out,
            "at {} {:.5e} {:.5e} {:.5e} {:.5e} {:.5e} {:.5e} {:.5e} {:.5e}",
            p.name,
            p.fast_fall_arr_time,
            p.fast_rise_arr_time,
            p.slow_fall_arr_time,
            p.slow_rise_arr_time,
            p.fast_fall_slew,
            p.fast_rise_slew,
            p.slow_fall_slew,
            p.slow_rise_slew,
        )
        .expect("writing to a String never fails");
    }

    if circuit.is_sequential || circuit.rat_data_no() > 0 {
        let mut all_ids: Vec<PinNodeId> = (0..circuit.pin_node_no()).map(PinNodeId).collect();
        all_ids.sort_by(|&a, &b| circuit.pin_node(a).name.cmp(&circuit.pin_node(b).name));

        for pnode_id in all_ids {
            let p = circuit.pin_node(pnode_id);

            if p.fast_fall_req_time() > NEGATIVE_BOUND {
                let fast_fall_slack = p.fast_fall_arr_time - p.fast_fall_req_time();
                let fast_rise_slack = p.fast_rise_arr_time - p.fast_rise_req_time();
                writeln!(out, "slack {} early {:.5e} {:.5e}", p.name, fast_fall_slack, fast_rise_slack)
                    .expect("writing to a String never fails");
            }

            if p.slow_fall_req_time() < POSITIVE_BOUND {
                let slow_fall_slack = p.slow_fall_req_time() - p.slow_fall_arr_time;
                let slow_rise_slack = p.slow_rise_req_time() - p.slow_rise_arr_time;
                writeln!(out, "slack {} late {:.5e} {:.5e}", p.name, slow_fall_slack, slow_rise_slack)
                    .expect("writing to a String never fails");
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::{Fanin, Gate, PinNode};

    #[test]
    fn purely_combinational_report_has_no_slack_lines() {
        let mut circuit = Circuit::new();
        let driver = circuit.push_gate(Gate::primary_input());
        let pnode_id = circuit.push_pin_node(PinNode::new("z"));
        circuit.gate_mut(driver).output_vec[0].fanout = Some(pnode_id);
        circuit.pin_node_mut(pnode_id).fanin = Some(Fanin::GateOutput(driver, 0));
        circuit.pin_node_mut(pnode_id).fast_fall_arr_time = 1.23456;
        circuit.pin_node_mut(pnode_id).fast_rise_arr_time = 2.0;
        circuit.pin_node_mut(pnode_id).slow_fall_arr_time = 3.0;
        circuit.pin_node_mut(pnode_id).slow_rise_arr_time = 4.0;

        let po = circuit.push_gate(Gate::primary_output());
        circuit.gate_mut(po).input_vec[0].fanin = Some(pnode_id);
        circuit.po.push(po);

        let text = render_report(&circuit);
        assert!(text.starts_with("at z "));
        assert!(!text.contains("slack"));
        assert!(text.contains("1.23456e0"));
    }

    #[test]
    fn rat_constrained_node_emits_both_slack_directions() {
        let mut circuit = Circuit::new();
        let pnode_id = circuit.push_pin_node(PinNode::new("n1"));
        circuit.pin_node_mut(pnode_id).set_fast_fall_req_time(-5.0);
        circuit.pin_node_mut(pnode_id).set_fast_rise_req_time(-5.0);
        circuit.pin_node_mut(pnode_id).set_slow_fall_req_time(5.0);
        circuit.pin_node_mut(pnode_id).set_slow_rise_req_time(5.0);
        circuit.rat_data.push(crate::circuit::RatData {
            pin_node: pnode_id,
            mode: crate::circuit::RatMode::Both,
            slow_fall_time: 5.0,
            slow_rise_time: 5.0,
            fast_fall_time: -5.0,
            fast_rise_time: -5.0,
        });

        let text = render_report(&circuit);
        assert!(text.contains("slack n1 early"));
        assert!(text.contains("slack n1 late"));
    }
}
