mod keeper;
mod window;
mod x11;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let helper = x11::X11Helper::connect()?;
    keeper::run(&helper)
}
