mod app;
mod commands;
mod config;
mod countdown;
mod logging;
mod recording;
mod ui;

fn main() -> Result<(), anyhow::Error> {
    app::run()
}
