use anyhow::Result;

mod app;
mod capture;
mod renderer;

use app::App;

fn main() -> Result<()> {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let subject_id = args.next().unwrap_or_else(|| "001".to_string());
    let experimenter = args.next().unwrap_or_else(|| "unspecified".to_string());

    let app = App::new(&subject_id, &experimenter)?;
    app.run()
}
