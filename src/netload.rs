//! Netlist loader.
//!
//! Unlike the cell library's flat token stream, this grammar is strictly
//! line-oriented: each top-level statement is one line, except a `wire`
//! statement's `edge`/`cap` sub-lines, which continue until the next
//! top-level keyword is seen.

use std::fs;
use std::path::Path;
use std::str::Lines;

use rustc_hash::FxHashMap;

use crate::circuit::{Circuit, Fanin, FanoutTarget, GInPin, GOutPin, Gate, PinNode, PinNodeId, RatData, RatMode};
use crate::library::CellLibrary;
use crate::rctree::{grab_node_id, RcTreeNode};

struct Loader<'lib> {
    library: &'lib CellLibrary,
    circuit: Circuit,
    pin_node_map: FxHashMap<String, PinNodeId>,
}

pub fn load(path: impl AsRef<Path>, library: &CellLibrary) -> Circuit {
    let content = fs::read_to_string(path.as_ref())
        .unwrap_or_else(|e| panic!("error opening {:?} for input: {e}", path.as_ref()));

    let mut loader = Loader {
        library,
        circuit: Circuit::new(),
        pin_node_map: FxHashMap::default(),
    };

    let mut lines = content.lines();
    let mut cur_line = next_nonblank(&mut lines);

    while let Some(line) = cur_line {
        let mut toks = line.split_whitespace();
        let keyword = toks.next().expect("non-blank line has a keyword");

        match keyword {
            "input" => loader.load_primary_input(toks.next().expect("input node name")),
            "output" => loader.load_primary_output(toks.next().expect("output node name")),
            "instance" => loader.load_instance(toks),
            "wire" => {
                let leftover = loader.load_wire(toks, &mut lines);
                cur_line = leftover.or_else(|| next_nonblank(&mut lines));
                continue;
            }
            "slew" => loader.load_slew(toks),
            "at" => loader.load_at(toks),
            "rat" => loader.load_rat(toks),
            "clock" => loader.load_clock(toks),
            other => panic!("unknown netlist keyword {other:?}"),
        }

        cur_line = next_nonblank(&mut lines);
    }

    loader.circuit.is_sequential = !loader.circuit.seq_gates.is_empty();
    loader.circuit
}

fn next_nonblank<'a>(lines: &mut Lines<'a>) -> Option<&'a str> {
    for line in lines.by_ref() {
        if !line.trim().is_empty() {
            return Some(line);
        }
    }
    None
}

impl<'lib> Loader<'lib> {
    fn get_or_create(&mut self, name: &str) -> PinNodeId {
        if let Some(&id) = self.pin_node_map.get(name) {
            return id;
        }
        let id = self.circuit.push_pin_node(PinNode::new(name));
        self.pin_node_map.insert(name.to_string(), id);
        id
    }

    fn load_primary_input(&mut self, node_name: &str) {
        let pin_node_id = self.get_or_create(node_name);
        let gate_id = self.circuit.push_gate(Gate::primary_input());

        self.circuit.gate_mut(gate_id).output_vec[0].fanout = Some(pin_node_id);
        self.circuit.pin_node_mut(pin_node_id).fanin = Some(Fanin::GateOutput(gate_id, 0));
        self.circuit.pi.push(gate_id);
    }

    fn load_primary_output(&mut self, node_name: &str) {
        let pin_node_id = self.get_or_create(node_name);
        let gate_id = self.circuit.push_gate(Gate::primary_output());

        self.circuit.gate_mut(gate_id).input_vec[0].fanin = Some(pin_node_id);
        self.circuit
            .pin_node_mut(pin_node_id)
            .fanout
            .push(FanoutTarget::GateInput(gate_id, 0));
        self.circuit.po.push(gate_id);
    }

    fn load_instance<'a>(&mut self, mut toks: impl Iterator<Item = &'a str>) {
        let inst_name = toks.next().expect("instance name");
        let cell = self
            .library
            .find(inst_name)
            .unwrap_or_else(|| panic!("no cell named {inst_name:?} in library"));
        let cell = std::rc::Rc::new(cell.clone());
        let gate_id = self.circuit.push_gate(Gate::instance(cell.clone()));

        for tok in toks {
            let (pin_name, node_name) = tok
                .split_once(':')
                .unwrap_or_else(|| panic!("instance pin connection {tok:?} missing ':'"));
            let pin_node_id = self.get_or_create(node_name);

            if let Some(pin_id) = cell.input_pin_id(pin_name) {
                self.circuit.gate_mut(gate_id).input_vec[pin_id].fanin = Some(pin_node_id);
                self.circuit
                    .pin_node_mut(pin_node_id)
                    .fanout
                    .push(FanoutTarget::GateInput(gate_id, pin_id));
            } else {
                let pin_id = cell
                    .output_pin_id(pin_name)
                    .unwrap_or_else(|| panic!("pin {pin_name:?} not found on cell {:?}", cell.name));
                self.circuit.gate_mut(gate_id).output_vec[pin_id].fanout = Some(pin_node_id);
                assert!(
                    self.circuit.pin_node(pin_node_id).fanin.is_none(),
                    "pin node {node_name:?} driven twice"
                );
                self.circuit.pin_node_mut(pin_node_id).fanin = Some(Fanin::GateOutput(gate_id, pin_id));
            }
        }

        if cell.is_non_clocked {
            self.circuit.com_gates.push(gate_id);
        } else {
            self.circuit.gate_mut(gate_id).is_non_clocked = false;
            self.circuit.seq_gates.push(gate_id);
        }
    }

    /// Returns the first line after the wire block's `edge`/`cap` sub-lines
    /// that is itself a new top-level statement, so the caller can resume
    /// processing it without re-reading a line.
    fn load_wire<'a>(&mut self, mut toks: impl Iterator<Item = &'a str>, lines: &mut Lines<'a>) -> Option<&'a str> {
        let root_name = toks.next().expect("wire root node name");
        let root_id = self.get_or_create(root_name);

        assert!(
            self.circuit.pin_node(root_id).fanin.is_some() && self.circuit.pin_node(root_id).fanout.is_empty(),
            "wire root {root_name:?} must be driven and have no direct fanout yet"
        );

        let mut rc_tree = vec![RcTreeNode::with_pin_node(root_name.to_string(), root_id)];

        for tap_name in toks {
            let tap_id = self.get_or_create(tap_name);
            {
                let tap = self.circuit.pin_node(tap_id);
                assert!(
                    tap.fanin.is_none() && tap.fanout.len() == 1,
                    "wire tap {tap_name:?} must have exactly one gate-input fanout and no fanin yet"
                );
            }
            self.circuit.pin_node_mut(tap_id).fanin = Some(Fanin::PinNode(root_id));
            self.circuit.pin_node_mut(root_id).fanout.push(FanoutTarget::PinNode(tap_id));
            rc_tree.push(RcTreeNode::with_pin_node(tap_name.to_string(), tap_id));
        }

        self.circuit.pin_node_mut(root_id).fanout_pin_node_no = rc_tree.len() - 1;

        let leftover = loop {
            let Some(line) = next_nonblank(lines) else {
                break None;
            };

            let mut sub_toks = line.split_whitespace();
            let keyword = sub_toks.next().expect("non-blank line has a keyword");

            match keyword {
                "edge" => {
                    let a = sub_toks.next().expect("edge endpoint a");
                    let b = sub_toks.next().expect("edge endpoint b");
                    let r: f64 = sub_toks.next().expect("edge resistance").parse().expect("resistance");
                    let a_id = grab_node_id(&mut rc_tree, a);
                    let b_id = grab_node_id(&mut rc_tree, b);
                    rc_tree[a_id].adjacent.push((b_id, r));
                    rc_tree[b_id].adjacent.push((a_id, r));
                }
                "cap" => {
                    let end = sub_toks.next().expect("cap endpoint");
                    let c: f64 = sub_toks.next().expect("cap value").parse().expect("capacitance");
                    let end_id = grab_node_id(&mut rc_tree, end);
                    rc_tree[end_id].cap = c;
                }
                _ => break Some(line),
            }
        };

        self.circuit.pin_node_mut(root_id).fanout_rc_tree = rc_tree;
        leftover
    }

    fn load_slew<'a>(&mut self, mut toks: impl Iterator<Item = &'a str>) {
        let node_name = toks.next().expect("slew node name");
        let id = self.get_or_create(node_name);
        let fall: f64 = toks.next().expect("fast fall slew").parse().expect("slew value");
        let rise: f64 = toks.next().expect("fast rise slew").parse().expect("slew value");

        let pnode = self.circuit.pin_node_mut(id);
        pnode.fast_fall_slew = fall;
        pnode.fast_rise_slew = rise;
        pnode.slow_fall_slew = fall;
        pnode.slow_rise_slew = rise;
    }

    fn load_at<'a>(&mut self, mut toks: impl Iterator<Item = &'a str>) {
        let node_name = toks.next().expect("at node name");
        let id = self.get_or_create(node_name);
        let fast_fall: f64 = toks.next().expect("fast fall arrival").parse().expect("arrival time");
        let slow_fall: f64 = toks.next().expect("slow fall arrival").parse().expect("arrival time");
        let fast_rise: f64 = toks.next().expect("fast rise arrival").parse().expect("arrival time");
        let slow_rise: f64 = toks.next().expect("slow rise arrival").parse().expect("arrival time");

        let pnode = self.circuit.pin_node_mut(id);
        pnode.fast_fall_arr_time = fast_fall;
        pnode.slow_fall_arr_time = slow_fall;
        pnode.fast_rise_arr_time = fast_rise;
        pnode.slow_rise_arr_time = slow_rise;
    }

    fn load_rat<'a>(&mut self, mut toks: impl Iterator<Item = &'a str>) {
        let node_name = toks.next().expect("rat node name");
        let pin_node = self.get_or_create(node_name);
        let mode = toks.next().expect("rat mode: early|late");
        assert!(mode == "early" || mode == "late", "unknown rat mode {mode:?}");
        let required_fall: f64 = toks.next().expect("rat fall time").parse().expect("required time");
        let required_rise: f64 = toks.next().expect("rat rise time").parse().expect("required time");

        let existing = self
            .circuit
            .rat_data
            .iter_mut()
            .find(|r| r.pin_node == pin_node);

        if mode == "early" {
            match existing {
                Some(r) => {
                    assert_eq!(r.mode, RatMode::Slow, "duplicate early rat constraint on {node_name:?}");
                    r.mode = RatMode::Both;
                    r.fast_fall_time = required_fall;
                    r.fast_rise_time = required_rise;
                }
                None => self.circuit.rat_data.push(RatData {
                    pin_node,
                    mode: RatMode::Fast,
                    slow_fall_time: 0.0,
                    slow_rise_time: 0.0,
                    fast_fall_time: required_fall,
                    fast_rise_time: required_rise,
                }),
            }
        } else {
            match existing {
                Some(r) => {
                    assert_eq!(r.mode, RatMode::Fast, "duplicate late rat constraint on {node_name:?}");
                    r.mode = RatMode::Both;
                    r.slow_fall_time = required_fall;
                    r.slow_rise_time = required_rise;
                }
                None => self.circuit.rat_data.push(RatData {
                    pin_node,
                    mode: RatMode::Slow,
                    slow_fall_time: required_fall,
                    slow_rise_time: required_rise,
                    fast_fall_time: 0.0,
                    fast_rise_time: 0.0,
                }),
            }
        }
    }

    fn load_clock<'a>(&mut self, mut toks: impl Iterator<Item = &'a str>) {
        let node_name = toks.next().expect("clock node name");
        let id = self.get_or_create(node_name);
        self.circuit.clock_pnode = Some(id);
        self.circuit.clock_period = toks
            .next()
            .expect("clock period")
            .parse()
            .expect("clock period value");
    }
}
