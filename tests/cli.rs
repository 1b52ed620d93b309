use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*;
use assert_fs::TempDir;
use image::{Rgb, RgbImage};
use ndarray::{Array1, array};
use ndarray_npy::write_npy;
use predicates::prelude::*;
use rstest::*;

macro_rules! cargo_run {
    ($cmd:expr, $($args:expr),*) => {
        {
            let mut cmd = Command::cargo_bin($cmd)?;
            $(cmd.arg($args);)*
            cmd.assert()
        }
    };
}

/// 图片目录与对应的向量目录
struct Dataset {
    root: TempDir,
}

impl Dataset {
    fn images(&self) -> std::path::PathBuf {
        self.root.path().join("images")
    }

    fn embeddings(&self) -> std::path::PathBuf {
        self.root.path().join("embeddings")
    }

    fn add(&self, name: &str, color: [u8; 3], embedding: Array1<f32>) -> Result<()> {
        RgbImage::from_pixel(8, 8, Rgb(color)).save(self.images().join(name))?;
        write_npy(self.embeddings().join(format!("{name}.npy")), &embedding)?;
        Ok(())
    }
}

#[fixture]
fn dataset() -> Dataset {
    let root = TempDir::new().unwrap();
    let dataset = Dataset { root };
    fs::create_dir_all(dataset.images()).unwrap();
    fs::create_dir_all(dataset.embeddings()).unwrap();
    dataset.add("red.png", [255, 0, 0], array![1.0, 0.0, 0.0]).unwrap();
    dataset.add("green.png", [0, 255, 0], array![0.0, 1.0, 0.0]).unwrap();
    dataset.add("blue.png", [0, 0, 255], array![0.0, 0.0, 1.0]).unwrap();
    fs::write(dataset.images().join("notes.txt"), b"not an image").unwrap();
    dataset
}

fn write_query(dir: &Path, v: Array1<f32>) -> Result<std::path::PathBuf> {
    let path = dir.join("query.npy");
    write_npy(&path, &v)?;
    Ok(path)
}

#[rstest]
#[case::flat("flat")]
#[case::hnsw("hnsw")]
fn build_and_search(dataset: Dataset, #[case] index: &str) -> Result<()> {
    let conf_dir = TempDir::new()?;

    cargo_run!(
        "stylesearch",
        "-c",
        conf_dir.path(),
        "build",
        dataset.images(),
        "--embeddings",
        dataset.embeddings(),
        "--index",
        index
    )
    .success();

    let query = write_query(dataset.root.path(), array![0.0, 0.6, 0.8])?;
    cargo_run!(
        "stylesearch",
        "-c",
        conf_dir.path(),
        "search",
        "a shirt",
        "--query-embedding",
        &query,
        "--count",
        "1"
    )
    .success()
    .stdout(predicate::str::contains("blue.png"))
    .stdout(predicate::str::contains("green.png").not());

    cargo_run!("stylesearch", "-c", conf_dir.path(), "show", "--records")
        .success()
        .stdout(predicate::str::contains("red.png"))
        .stdout(predicate::str::contains("notes.txt").not());

    Ok(())
}

#[rstest]
fn search_json_output(dataset: Dataset) -> Result<()> {
    let conf_dir = TempDir::new()?;
    cargo_run!(
        "stylesearch",
        "-c",
        conf_dir.path(),
        "build",
        dataset.images(),
        "--embeddings",
        dataset.embeddings()
    )
    .success();

    // 文本向量按 blake3(查询) 查找
    let text = "red dress for a formal party";
    let text_dir = dataset.embeddings().join("text");
    fs::create_dir_all(&text_dir)?;
    let hash = blake3::hash(text.as_bytes()).to_hex();
    write_npy(text_dir.join(format!("{hash}.npy")), &array![1.0f32, 0.0, 0.0])?;

    cargo_run!(
        "stylesearch",
        "-c",
        conf_dir.path(),
        "search",
        text,
        "--embeddings",
        dataset.embeddings(),
        "--output-format",
        "json"
    )
    .success()
    .stdout(predicate::str::is_match(r#"(?s)^\[\s*\{\s*"filename": "red.png""#)?);

    Ok(())
}

#[test]
fn build_empty_directory() -> Result<()> {
    let conf_dir = TempDir::new()?;
    let images = TempDir::new()?;
    fs::write(images.path().join("readme.md"), b"nothing")?;

    cargo_run!(
        "stylesearch",
        "-c",
        conf_dir.path(),
        "build",
        images.path(),
        "--embeddings",
        images.path()
    )
    .failure();

    // 构建失败时不会发布索引
    assert!(!conf_dir.path().join("CURRENT").exists());
    cargo_run!("stylesearch", "-c", conf_dir.path(), "show").failure();

    Ok(())
}

#[test]
fn intent() -> Result<()> {
    cargo_run!("stylesearch", "intent", "A red tie and a white shirt in a formal setting")
        .success()
        .stdout(predicate::str::contains("\"red\""))
        .stdout(predicate::str::contains("\"white\""))
        .stdout(predicate::str::contains("\"formal\""));
    Ok(())
}
