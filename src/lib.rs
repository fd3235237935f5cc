//! Static timing analysis for gate-level digital circuits: a cell library
//! and a netlist go in, per-primary-output arrival/slew data and per-pin
//! slack come out. See each module for the original this crate is grounded
//! on.

pub mod backward;
pub mod cell;
pub mod circuit;
pub mod consts;
pub mod defect;
pub mod forward;
pub mod library;
pub mod netload;
pub mod rctree;
pub mod report;
pub mod sequential;
pub mod sta;
pub mod wiring;

use std::path::Path;

use log::info;

use circuit::Circuit;
use library::CellLibrary;

/// Load a library and netlist, run static timing analysis, and write the
/// report to `output_path`. This is the one entry point `main.rs` drives;
/// every phase boundary is marked at `info!` level (see the ambient logging
/// design in the crate-level docs).
pub fn run(library_path: impl AsRef<Path>, netlist_path: impl AsRef<Path>, output_path: impl AsRef<Path>) {
    info!("loading cell library from {:?}", library_path.as_ref());
    let library = CellLibrary::load(library_path);
    info!("loaded {} cells", library.cell_no());

    info!("loading netlist from {:?}", netlist_path.as_ref());
    let mut circuit: Circuit = netload::load(netlist_path, &library);
    info!(
        "loaded circuit: {} pi, {} po, {} com gates, {} seq gates, {} pin nodes",
        circuit.pi_no(),
        circuit.po_no(),
        circuit.com_gate_no(),
        circuit.seq_gate_no(),
        circuit.pin_node_no()
    );

    info!("injecting wiring effects");
    wiring::inject_wiring_effects(&mut circuit);

    info!("running static timing analysis");
    sta::run_sta(&mut circuit);

    info!("writing report to {:?}", output_path.as_ref());
    report::write_report(&circuit, output_path.as_ref()).unwrap_or_else(|e| {
        panic!("error opening {:?} for output: {e}", output_path.as_ref());
    });
}
