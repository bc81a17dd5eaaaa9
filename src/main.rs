use std::path::Path;
use std::process::ExitCode;

use cosmo_rs::driver::Simulation;

fn main() -> ExitCode {
    let mut args = std::env::args().skip(1);
    let config = match (args.next(), args.next()) {
        (Some(path), None) => path,
        _ => {
            eprintln!("usage: cosmo-rs <config-file>");
            return ExitCode::FAILURE;
        }
    };

    let result = Simulation::from_config(Path::new(&config)).and_then(|mut sim| sim.run());
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
