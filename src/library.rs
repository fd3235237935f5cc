//! Cell library loader.
//!
//! The library file is a flat whitespace-delimited token stream (tokens may
//! cross line boundaries) rather than a line-oriented format, unlike the
//! netlist loader in [`crate::netload`] - the two grammars are kept as
//! separate parsers rather than forced through one shared tokenizer.

use std::fs;
use std::path::Path;

use crate::cell::{Cell, ClockParams, EdgeType, InputTiming, TimingSense};

pub struct CellLibrary {
    cells: Vec<Cell>,
}

impl CellLibrary {
    pub fn load(path: impl AsRef<Path>) -> Self {
        let content = fs::read_to_string(path.as_ref())
            .unwrap_or_else(|e| panic!("error opening {:?} for input: {e}", path.as_ref()));
        Self::parse(&content)
    }

    pub fn cell_no(&self) -> usize {
        self.cells.len()
    }

    pub fn cell(&self, id: usize) -> &Cell {
        &self.cells[id]
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn find(&self, name: &str) -> Option<&Cell> {
        self.cells.iter().find(|c| c.name == name)
    }

    fn parse(content: &str) -> Self {
        let mut toks = content.split_ascii_whitespace();
        let mut cells = Vec::new();
        let mut cur_tok = toks.next();

        while let Some(tok) = cur_tok {
            assert_eq!(tok, "cell", "expected a cell block");
            let name = toks.next().expect("cell name").to_string();
            let mut tok = toks.next().expect("token after cell name");

            let mut input_pin_names = Vec::new();
            let mut input_fall_cap = Vec::new();
            let mut input_rise_cap = Vec::new();
            let mut output_pin_names = Vec::new();
            let mut clock_pin_id = 0usize;
            let mut is_non_clocked = true;

            while tok.starts_with('p') {
                assert_eq!(tok, "pin");
                let pin_name = toks.next().expect("pin name").to_string();
                let direction = toks.next().expect("pin direction");

                match direction.as_bytes()[0] {
                    b'i' => {
                        input_pin_names.push(pin_name);
                        input_fall_cap.push(next_f64(&mut toks));
                        input_rise_cap.push(next_f64(&mut toks));
                    }
                    b'o' => output_pin_names.push(pin_name),
                    b'c' => {
                        clock_pin_id = input_pin_names.len();
                        input_pin_names.push(pin_name);
                        input_fall_cap.push(next_f64(&mut toks));
                        input_rise_cap.push(next_f64(&mut toks));
                        is_non_clocked = false;
                    }
                    _ => panic!("unknown pin direction {direction:?}"),
                }

                tok = toks.next().expect("token after pin entry");
            }

            let mut input_timing: Vec<Vec<Option<InputTiming>>> =
                vec![vec![None; output_pin_names.len()]; input_pin_names.len()];
            let mut clock_params: Vec<Option<ClockParams>> = vec![None; input_pin_names.len()];

            macro_rules! find_input {
                ($n:expr) => {{
                    let n = $n;
                    input_pin_names
                        .iter()
                        .position(|x| x == n)
                        .unwrap_or_else(|| panic!("unknown input pin {n:?} in cell {name:?}"))
                }};
            }
            macro_rules! find_output {
                ($n:expr) => {{
                    let n = $n;
                    output_pin_names
                        .iter()
                        .position(|x| x == n)
                        .unwrap_or_else(|| panic!("unknown output pin {n:?} in cell {name:?}"))
                }};
            }

            // Drives the shared `timing`/`setup`/`hold`/`preset`/`clear` section
            // for both combinational and sequential cells; terminates at the next
            // "cell" keyword or end of file.
            let next_cell_tok = loop {
                match tok {
                    "timing" => {
                        let input_id = find_input!(toks.next().expect("timing input pin"));
                        let output_id = find_output!(toks.next().expect("timing output pin"));
                        input_timing[input_id][output_id] = Some(parse_timing_arc(&mut toks));
                    }
                    "setup" => {
                        let clock_name = toks.next().expect("setup clock pin");
                        assert_eq!(clock_name, &input_pin_names[clock_pin_id]);
                        let input_id = find_input!(toks.next().expect("setup data pin"));
                        let params = clock_params[input_id].get_or_insert_with(Default::default);
                        params.setup_edge = EdgeType::from_token(toks.next().expect("setup edge"));
                        params.fall_setup_g = next_f64(&mut toks);
                        params.fall_setup_h = next_f64(&mut toks);
                        params.fall_setup_j = next_f64(&mut toks);
                        params.rise_setup_g = next_f64(&mut toks);
                        params.rise_setup_h = next_f64(&mut toks);
                        params.rise_setup_j = next_f64(&mut toks);
                    }
                    "hold" => {
                        let clock_name = toks.next().expect("hold clock pin");
                        assert_eq!(clock_name, &input_pin_names[clock_pin_id]);
                        let input_id = find_input!(toks.next().expect("hold data pin"));
                        let params = clock_params[input_id].get_or_insert_with(Default::default);
                        params.hold_edge = EdgeType::from_token(toks.next().expect("hold edge"));
                        params.fall_hold_m = next_f64(&mut toks);
                        params.fall_hold_n = next_f64(&mut toks);
                        params.fall_hold_p = next_f64(&mut toks);
                        params.rise_hold_m = next_f64(&mut toks);
                        params.rise_hold_n = next_f64(&mut toks);
                        params.rise_hold_p = next_f64(&mut toks);
                    }
                    "preset" | "clear" => {
                        // <input pin> <output pin> <edge type> <slew> <delay>: recorded
                        // in the grammar but not modeled by the arc/setup/hold tables.
                        for _ in 0..9 {
                            toks.next();
                        }
                    }
                    other => panic!("unknown cell section keyword {other:?}"),
                }

                match toks.next() {
                    Some(t) if t != "cell" => tok = t,
                    other => break other,
                }
            };

            cells.push(Cell {
                name,
                is_non_clocked,
                input_pin_names,
                input_fall_cap,
                input_rise_cap,
                input_timing,
                clock_pin_id,
                clock_params,
                output_pin_names,
            });

            cur_tok = next_cell_tok;
        }

        CellLibrary { cells }
    }
}

fn next_f64<'a>(toks: &mut impl Iterator<Item = &'a str>) -> f64 {
    toks.next()
        .expect("expected a numeric token")
        .parse()
        .expect("malformed floating point literal")
}

fn parse_timing_arc<'a>(toks: &mut impl Iterator<Item = &'a str>) -> InputTiming {
    let sense = TimingSense::from_token(toks.next().expect("timing sense"));
    InputTiming {
        sense,
        fall_slew_x: next_f64(toks),
        fall_slew_y: next_f64(toks),
        fall_slew_z: next_f64(toks),
        rise_slew_x: next_f64(toks),
        rise_slew_y: next_f64(toks),
        rise_slew_z: next_f64(toks),
        fall_delay_a: next_f64(toks),
        fall_delay_b: next_f64(toks),
        fall_delay_c: next_f64(toks),
        rise_delay_a: next_f64(toks),
        rise_delay_b: next_f64(toks),
        rise_delay_c: next_f64(toks),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const AND2_LIB: &str = "\
cell AND2X1
pin A input 1.0 1.1
pin B input 1.0 1.1
pin Y output
timing A Y positive_unate 0.1 0.2 0.3 0.4 0.5 0.6 0.01 0.02 0.03 0.04 0.05 0.06
timing B Y positive_unate 0.1 0.2 0.3 0.4 0.5 0.6 0.01 0.02 0.03 0.04 0.05 0.06
";

    const DFF_LIB: &str = "\
cell DFFX1
pin D input 0.5 0.6
pin CK clock 0.2 0.2
pin Q output
timing CK Q positive_unate 0.1 0.1 0.1 0.1 0.1 0.1 0.2 0.2 0.2 0.2 0.2 0.2
setup CK D rising 0.1 0.2 0.3 0.1 0.2 0.3
hold CK D rising 0.1 0.2 0.3 0.1 0.2 0.3
preset D Q rising 0.0 0.0 0.0 0.0 0.0 0.0
clear D Q rising 0.0 0.0 0.0 0.0 0.0 0.0
";

    #[test]
    fn parses_single_combinational_cell() {
        let lib = CellLibrary::parse(AND2_LIB);
        assert_eq!(lib.cell_no(), 1);
        let and2 = lib.find("AND2X1").unwrap();
        assert!(and2.is_non_clocked);
        assert_eq!(and2.input_pin_id("A"), Some(0));
        assert_eq!(and2.input_pin_id("B"), Some(1));
        assert_eq!(and2.output_pin_id("Y"), Some(0));
        let arc = and2.input_timing[0][0].unwrap();
        assert_eq!(arc.sense, TimingSense::PositiveUnate);
        assert_eq!(arc.fall_delay_a, 0.01);
    }

    #[test]
    fn parses_sequential_cell_with_preset_clear_skip() {
        let lib = CellLibrary::parse(DFF_LIB);
        let dff = lib.find("DFFX1").unwrap();
        assert!(!dff.is_non_clocked);
        assert_eq!(dff.clock_pin_id, 1);
        assert_eq!(dff.clock_pin_name(), "CK");
        let params = dff.clock_params[0].expect("setup/hold on D");
        assert_eq!(params.setup_edge, EdgeType::Rising);
        assert_eq!(params.fall_setup_g, 0.1);
    }

    #[test]
    fn parses_multiple_cells_back_to_back() {
        let combined = format!("{AND2_LIB}{DFF_LIB}");
        let lib = CellLibrary::parse(&combined);
        assert_eq!(lib.cell_no(), 2);
        assert!(lib.find("AND2X1").is_some());
        assert!(lib.find("DFFX1").is_some());
    }
}
