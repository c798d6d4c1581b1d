use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match poold::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            let code = ExitCode::from(error.exit_code());
            if poold::telemetry_initialised() {
                return code;
            }
            // Failures before telemetry is installed would otherwise be silent.
            // A closed stderr leaves only the exit status.
            match writeln!(io::stderr().lock(), "poold: {error}") {
                Ok(()) | Err(_) => code,
            }
        }
    }
}
