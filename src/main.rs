use anyhow::Result;

mod camera;
mod demo;
mod error;
mod math;
mod model;
mod rendering;
mod samples;
mod texture;
mod trajectory;
mod window;

fn main() -> Result<()> {
    pretty_env_logger::init();

    pollster::block_on(window::run())?;

    Ok(())
}
