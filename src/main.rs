use clap::Parser;
use log::debug;
use stylesearch::cli::SubCommandExtend;
use stylesearch::config::{Opts, SubCommand};

#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let opts = Opts::parse();

    let threads = opts.threads.unwrap_or_else(num_cpus::get);
    rayon::ThreadPoolBuilder::new().num_threads(threads).build_global()?;
    debug!("using {} threads", threads);

    match &opts.subcmd {
        SubCommand::Build(config) => config.run(&opts),
        SubCommand::Search(config) => config.run(&opts),
        SubCommand::Show(config) => config.run(&opts),
        SubCommand::Intent(config) => config.run(&opts),
    }
}
