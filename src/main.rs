mod allocator;

use std::process::ExitCode;

use tdmcli::app::App;
use tdmcli::error::{EXIT_OK, exit_code_of};
use tdmcli::ui;

#[tokio::main]
async fn main() -> ExitCode {
    let result = match App::init() {
        Ok(app) => app.execute().await,
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_OK),
        Err(e) => {
            ui::show_error(&format!("{e:#}"));
            ExitCode::from(exit_code_of(&e))
        }
    }
}
