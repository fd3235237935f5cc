//! Cell library data: one [`Cell`] per library entry, plus the timing-arc
//! and sequential-constraint tables hung off it.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimingSense {
    PositiveUnate,
    NegativeUnate,
    NonUnate,
}

impl TimingSense {
    pub fn from_token(tok: &str) -> Self {
        match tok {
            "positive_unate" => TimingSense::PositiveUnate,
            "negative_unate" => TimingSense::NegativeUnate,
            "non_unate" => TimingSense::NonUnate,
            other => panic!("unknown timing sense token {other:?}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeType {
    Falling,
    Rising,
}

impl EdgeType {
    pub fn from_token(tok: &str) -> Self {
        match tok {
            "falling" => EdgeType::Falling,
            "rising" => EdgeType::Rising,
            other => panic!("unknown clock edge token {other:?}"),
        }
    }
}

/// A single input-to-output delay/slew arc, read verbatim off a `timing`
/// library line.
#[derive(Debug, Clone, Copy)]
pub struct InputTiming {
    pub sense: TimingSense,

    pub fall_slew_x: f64,
    pub fall_slew_y: f64,
    pub fall_slew_z: f64,
    pub fall_delay_a: f64,
    pub fall_delay_b: f64,
    pub fall_delay_c: f64,

    pub rise_slew_x: f64,
    pub rise_slew_y: f64,
    pub rise_slew_z: f64,
    pub rise_delay_a: f64,
    pub rise_delay_b: f64,
    pub rise_delay_c: f64,
}

impl InputTiming {
    /// `gate_delay = A + B * load + C * input_slew`; the companion output
    /// slew uses the same linear form over `(X, Y, Z)`.
    pub fn eval_fall(&self, input_arrival: f64, input_slew: f64, load: f64) -> (f64, f64) {
        let delay = self.fall_delay_a + self.fall_delay_b * load + self.fall_delay_c * input_slew;
        let slew = self.fall_slew_x + self.fall_slew_y * load + self.fall_slew_z * input_slew;
        (input_arrival + delay, slew)
    }

    pub fn eval_rise(&self, input_arrival: f64, input_slew: f64, load: f64) -> (f64, f64) {
        let delay = self.rise_delay_a + self.rise_delay_b * load + self.rise_delay_c * input_slew;
        let slew = self.rise_slew_x + self.rise_slew_y * load + self.rise_slew_z * input_slew;
        (input_arrival + delay, slew)
    }
}

/// Setup/hold linear-model coefficients relating a data input to the clock
/// pin of a sequential cell.
#[derive(Debug, Clone, Copy)]
pub struct ClockParams {
    pub setup_edge: EdgeType,
    pub hold_edge: EdgeType,

    pub fall_setup_g: f64,
    pub fall_setup_h: f64,
    pub fall_setup_j: f64,
    pub fall_hold_m: f64,
    pub fall_hold_n: f64,
    pub fall_hold_p: f64,

    pub rise_setup_g: f64,
    pub rise_setup_h: f64,
    pub rise_setup_j: f64,
    pub rise_hold_m: f64,
    pub rise_hold_n: f64,
    pub rise_hold_p: f64,
}

impl Default for ClockParams {
    fn default() -> Self {
        ClockParams {
            setup_edge: EdgeType::Rising,
            hold_edge: EdgeType::Rising,
            fall_setup_g: 0.0,
            fall_setup_h: 0.0,
            fall_setup_j: 0.0,
            fall_hold_m: 0.0,
            fall_hold_n: 0.0,
            fall_hold_p: 0.0,
            rise_setup_g: 0.0,
            rise_setup_h: 0.0,
            rise_setup_j: 0.0,
            rise_hold_m: 0.0,
            rise_hold_n: 0.0,
            rise_hold_p: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Cell {
    pub name: String,
    pub is_non_clocked: bool,

    pub input_pin_names: Vec<String>,
    pub input_fall_cap: Vec<f64>,
    pub input_rise_cap: Vec<f64>,
    /// `input_timing[input_id][output_id]`, unset arcs default to a
    /// zero-coefficient positive-unate arc.
    pub input_timing: Vec<Vec<Option<InputTiming>>>,

    pub clock_pin_id: usize,
    /// indexed like `input_pin_names`; `None` for the clock pin itself and
    /// for any data input without a setup/hold constraint.
    pub clock_params: Vec<Option<ClockParams>>,

    pub output_pin_names: Vec<String>,
}

impl Cell {
    pub fn input_pin_id(&self, name: &str) -> Option<usize> {
        self.input_pin_names.iter().position(|n| n == name)
    }

    pub fn output_pin_id(&self, name: &str) -> Option<usize> {
        self.output_pin_names.iter().position(|n| n == name)
    }

    pub fn clock_pin_name(&self) -> &str {
        &self.input_pin_names[self.clock_pin_id]
    }

    pub fn input_pin_no(&self) -> usize {
        self.input_pin_names.len()
    }

    pub fn output_pin_no(&self) -> usize {
        self.output_pin_names.len()
    }
}
