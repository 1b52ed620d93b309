use anyhow::Result;
use clap::Parser;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::store::IndexSet;

#[derive(Parser, Debug, Clone)]
pub struct ShowCommand {
    /// 同时列出所有图片的元数据
    #[arg(long)]
    pub records: bool,
}

impl SubCommandExtend for ShowCommand {
    fn run(&self, opts: &Opts) -> Result<()> {
        let stores = IndexSet::open(&opts.conf_dir)?;
        let manifest = stores.manifest();
        println!("索引类型\t{:?}", manifest.kind);
        println!("图片数量\t{}", manifest.count);
        println!("向量维度\t{}", manifest.dim);
        println!("颜色分桶\t{}", manifest.bins);

        if self.records {
            for (position, meta) in stores.catalog().iter().enumerate() {
                let image_id = meta.image_id.map(|id| id.to_string()).unwrap_or_default();
                println!("{}\t{}\t{}\t{:?}", position, meta.filename, image_id, meta.attribute_ids);
            }
        }
        Ok(())
    }
}
