use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use crate::IndexBuilder;
use crate::cli::SubCommandExtend;
use crate::config::{BuildOptions, Opts};
use crate::provider::{HueHistogram, NpyEmbeddings, load_annotations};
use crate::utils::suffix_regex;

#[derive(Parser, Debug, Clone)]
pub struct BuildCommand {
    #[command(flatten)]
    pub build: BuildOptions,
    /// 图片所在目录，只扫描这一层
    pub path: PathBuf,
    /// 预先计算的图片向量所在目录，每张图片对应 `<文件名>.npy`
    #[arg(short, long, value_name = "DIR")]
    pub embeddings: PathBuf,
    /// Fashionpedia 格式的标注文件
    #[arg(short, long, value_name = "FILE")]
    pub annotations: Option<PathBuf>,
}

impl SubCommandExtend for BuildCommand {
    fn run(&self, opts: &Opts) -> Result<()> {
        let re_suf = suffix_regex(&self.build.suffix)?;
        let encoder = NpyEmbeddings::new(&self.embeddings);
        let color = HueHistogram::new(self.build.color_bins.into());

        let mut builder = IndexBuilder::new(&encoder, &color)
            .suffix(re_suf)
            .kind(self.build.index)
            .progress(true);
        if let Some(path) = &self.annotations {
            let annotations = load_annotations(path)?;
            info!("加载了 {} 张图片的标注", annotations.len());
            builder = builder.annotations(annotations);
        }

        let stores = builder.build(&self.path)?;
        let dir = stores.publish(&opts.conf_dir)?;
        info!("构建索引成功: {}", dir.display());
        Ok(())
    }
}
