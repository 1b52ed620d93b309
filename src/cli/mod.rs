mod build;
mod intent;
mod search;
mod show;

pub use build::*;
pub use intent::*;
pub use search::*;
pub use show::*;

use crate::config::Opts;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> anyhow::Result<()>;
}
