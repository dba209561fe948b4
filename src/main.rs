use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    match kofia_fundstat::cli::app::run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}
