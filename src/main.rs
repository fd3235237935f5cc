use std::path::PathBuf;

fn main() {
    env_logger::init();

    let mut args = std::env::args_os().skip(1);
    let (Some(library_path), Some(netlist_path), Some(output_path), None) =
        (args.next(), args.next(), args.next(), args.next())
    else {
        eprintln!("usage: gatesta <library> <netlist> <output>");
        std::process::exit(1);
    };

    let library_path = PathBuf::from(library_path);
    let netlist_path = PathBuf::from(netlist_path);
    let output_path = PathBuf::from(output_path);

    check_readable(&library_path);
    check_readable(&netlist_path);

    gatesta::run(&library_path, &netlist_path, &output_path);
}

fn check_readable(path: &PathBuf) {
    if let Err(e) = std::fs::metadata(path) {
        eprintln!("error opening {path:?} for input: {e}");
        std::process::exit(1);
    }
}
