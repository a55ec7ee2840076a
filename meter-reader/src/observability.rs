use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Maps the `-v` count onto a level: none is warn, one is info, more is debug.
pub fn level_for_verbosity(verbose: u8) -> Level {
    match verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        _ => Level::DEBUG,
    }
}

pub fn init_tracing(verbose: u8) {
    let level = level_for_verbosity(verbose);
    let mut filter = EnvFilter::from_default_env();
    for target in ["meter_reader", "meter_domain"] {
        match format!("{target}={level}").parse() {
            Ok(directive) => filter = filter.add_directive(directive),
            Err(e) => eprintln!("ignoring log directive for {target}: {e}"),
        }
    }

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
