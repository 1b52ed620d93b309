use std::convert::Infallible;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use crate::cli::*;
use crate::index::{DEFAULT_OVERFETCH, IndexKind};

static CONF_DIR: LazyLock<ConfDir> = LazyLock::new(|| {
    let proj_dirs =
        ProjectDirs::from("", "stylesearch", "stylesearch").expect("failed to get project dir");
    ConfDir { path: proj_dirs.data_dir().to_path_buf() }
});

fn default_config_dir() -> &'static str {
    CONF_DIR.path().to_str().unwrap()
}

/// 每个 generation 目录名的前缀
const GENERATION_PREFIX: &str = "gen-";

#[derive(Parser, Debug, Clone)]
pub struct BuildOptions {
    /// 扫描的文件后缀名，多个后缀用逗号分隔，不区分大小写
    #[arg(short, long, default_value = "jpg,jpeg,png")]
    pub suffix: String,
    /// 向量索引类型
    #[arg(long, value_enum, default_value_t = IndexKind::Flat)]
    pub index: IndexKind,
    /// 颜色直方图的分桶数量
    #[arg(long, value_name = "N", default_value_t = 8, value_parser = clap::value_parser!(u16).range(1..=180))]
    pub color_bins: u16,
}

#[derive(Parser, Debug, Clone)]
pub struct SearchOptions {
    /// 返回的结果数量
    #[arg(long, value_name = "COUNT", default_value_t = 5)]
    pub count: usize,
    /// 候选集扩大倍数，向量索引会返回 count * overfetch 个候选用于重排序
    #[arg(long, value_name = "N", default_value_t = DEFAULT_OVERFETCH)]
    pub overfetch: usize,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "stylesearch", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// 索引存放目录
    #[arg(short, long, default_value = default_config_dir())]
    pub conf_dir: ConfDir,
    /// 构建索引使用的线程数，默认为 CPU 核心数
    #[arg(long, value_name = "N")]
    pub threads: Option<usize>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 扫描图片目录并构建索引
    Build(BuildCommand),
    /// 使用文本搜索图片
    Search(SearchCommand),
    /// 显示当前索引的信息
    Show(ShowCommand),
    /// 显示从查询文本中提取的意图
    Intent(IntentCommand),
}

#[derive(Debug, Clone)]
pub struct ConfDir {
    path: PathBuf,
}

impl ConfDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 指向当前 generation 的文件
    pub fn current(&self) -> PathBuf {
        self.path.join("CURRENT")
    }

    /// 写入 CURRENT 前使用的临时文件
    pub fn current_tmp(&self) -> PathBuf {
        self.path.join("CURRENT.tmp")
    }

    /// 返回指定 generation 的目录
    pub fn generation(&self, n: u64) -> PathBuf {
        self.path.join(format!("{GENERATION_PREFIX}{n:06}"))
    }

    /// 构建中的 generation 临时目录
    pub fn generation_tmp(&self, n: u64) -> PathBuf {
        self.path.join(format!("{GENERATION_PREFIX}{n:06}.tmp"))
    }

    /// 返回所有已发布的 generation 编号，升序
    pub fn all_generations(&self) -> Vec<u64> {
        let Ok(entries) = fs::read_dir(&self.path) else {
            return vec![];
        };
        let mut gens = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().is_dir())
            .filter_map(|entry| {
                let name = entry.file_name();
                name.to_str()?.strip_prefix(GENERATION_PREFIX)?.parse::<u64>().ok()
            })
            .collect::<Vec<_>>();
        gens.sort_unstable();
        gens
    }

    /// 下一个 generation 的编号
    pub fn next_generation(&self) -> u64 {
        self.all_generations().last().map_or(1, |n| n + 1)
    }

    /// 读取 CURRENT，返回当前 generation 的目录
    pub fn current_generation(&self) -> Option<PathBuf> {
        let name = fs::read_to_string(self.current()).ok()?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(self.path.join(name))
    }
}

impl FromStr for ConfDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_generations() {
        let dir = TempDir::new().unwrap();
        let conf = ConfDir::new(dir.path());
        assert_eq!(conf.next_generation(), 1);
        assert!(conf.current_generation().is_none());

        fs::create_dir(conf.generation(1)).unwrap();
        fs::create_dir(conf.generation(3)).unwrap();
        fs::create_dir(conf.generation_tmp(4)).unwrap();
        fs::write(dir.path().join("gen-000005"), b"not a dir").unwrap();

        assert_eq!(conf.all_generations(), vec![1, 3]);
        assert_eq!(conf.next_generation(), 4);

        fs::write(conf.current(), "gen-000003\n").unwrap();
        assert_eq!(conf.current_generation(), Some(conf.generation(3)));
    }

    #[test]
    fn test_color_bins_range() {
        let parse = |bins: &str| {
            Opts::try_parse_from(["stylesearch", "build", "images", "-e", "emb", "--color-bins", bins])
        };
        assert!(parse("0").is_err());
        assert!(parse("181").is_err());
        let opts = parse("180").unwrap();
        let SubCommand::Build(cmd) = opts.subcmd else { panic!("expected build command") };
        assert_eq!(cmd.build.color_bins, 180);
    }
}
