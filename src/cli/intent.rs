use anyhow::Result;
use clap::Parser;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::intent::extract_query_intent;

#[derive(Parser, Debug, Clone)]
pub struct IntentCommand {
    /// 查询文本
    pub query: String,
}

impl SubCommandExtend for IntentCommand {
    fn run(&self, _opts: &Opts) -> Result<()> {
        let intent = extract_query_intent(&self.query);
        println!("{}", serde_json::to_string_pretty(&intent)?);
        Ok(())
    }
}
