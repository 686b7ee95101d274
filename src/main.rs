use std::io;
use std::process;
use tinysh::{Shell, ShellConfig, SystemHost};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("off"))
        .target(env_logger::Target::Stderr)
        .init();

    let config = ShellConfig::from_env();
    log::debug!("starting with {:?}", config);

    let mut source = tinysh::line::stdin_source();
    let mut shell = Shell::new(config, SystemHost::new());
    let code = shell.run(&mut *source, &mut io::stdout())?;
    process::exit(code)
}
