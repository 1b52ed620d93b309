use std::path::PathBuf;

use anyhow::{Result, anyhow};
use clap::{Parser, ValueEnum};

use crate::RetrieverBuilder;
use crate::cli::SubCommandExtend;
use crate::config::{Opts, SearchOptions};
use crate::provider::{NpyEmbeddings, read_vector};
use crate::rerank::SearchResult;

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    #[command(flatten)]
    pub search: SearchOptions,
    /// 查询文本
    pub query: String,
    /// 查询文本的向量文件，不指定时从 `<embeddings>/text/` 中查找
    #[arg(short, long, value_name = "FILE")]
    pub query_embedding: Option<PathBuf>,
    /// 预先计算的文本向量所在目录
    #[arg(short, long, value_name = "DIR")]
    pub embeddings: Option<PathBuf>,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", value_enum, default_value_t = OutputFormat::Table)]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for SearchCommand {
    fn run(&self, opts: &Opts) -> Result<()> {
        let encoder = match (&self.query_embedding, &self.embeddings) {
            (Some(file), dir) => {
                let dir = dir.clone().unwrap_or_default();
                NpyEmbeddings::new(dir).with_query(read_vector(file)?)
            }
            (None, Some(dir)) => NpyEmbeddings::new(dir),
            (None, None) => return Err(anyhow!("需要指定 --query-embedding 或 --embeddings")),
        };

        let retriever = RetrieverBuilder::new(opts.conf_dir.clone())
            .overfetch(self.search.overfetch)
            .open()?;
        let result = retriever.search(&encoder, &self.query, self.search.count)?;

        print_result(&result, self.output_format)
    }
}

fn print_result(result: &[SearchResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(result)?)
        }
        OutputFormat::Table => {
            for r in result {
                println!("{:.4}\t{}", r.score, r.filename);
            }
        }
    }
    Ok(())
}

#[derive(ValueEnum, Debug, Clone, Copy)]
pub enum OutputFormat {
    Json,
    Table,
}
