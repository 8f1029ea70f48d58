use jsonl_plot::logging;
use jsonl_plot::plot::{parse_cli, run};
use tracing::{error, info};

fn main() {
    let config = parse_cli();
    logging::init(config.verbose, &config.extract.date_format);
    match &config.input {
        Some(p) => info!("read data from {} and plot to {}", p.display(), config.outdir.display()),
        None => info!("read data from stdin and plot to {}", config.outdir.display()),
    }
    match run(&config) {
        Ok(written) => info!("wrote {} plot(s)", written.len()),
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
