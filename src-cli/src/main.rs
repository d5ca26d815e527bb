use std::process::ExitCode;

fn main() -> ExitCode {
    match slareview_lib::run() {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(code = %e.code, details = ?e.details, "{}", e.message);
            eprintln!("error: {e}");
            ExitCode::from(e.exit_status())
        }
    }
}
