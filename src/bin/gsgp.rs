use anyhow::Result;
use structopt::StructOpt;

use gsgp::cli::{run, Gsgp};

fn main() -> Result<()> {
    let opt = Gsgp::from_args();

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}] {}",
                record.level().to_string().to_lowercase(),
                message
            ))
        })
        .level(if opt.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .chain(std::io::stderr())
        .apply()?;

    run(opt)
}
