use clap::Parser;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Folder (under the site root) that receives one subfolder per date
pub const IMAGES_SUBDIR: &str = "public/images";
/// Folder (under the site root) that receives the JSON index
pub const DATA_SUBDIR: &str = "data";
/// File name of the JSON index
pub const INDEX_FILE_NAME: &str = "lecturas.json";

/// Extract the reading illustrations embedded in `Lecturas *.docx` files
#[derive(Parser, Debug)]
#[command(name = "extract_images", version, about)]
pub struct Args {
    /// Site folder holding `public/images` and `data`. Defaults to the current directory.
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Folder scanned for `Lecturas *.docx`. Defaults to the parent of the site folder.
    #[arg(long)]
    pub source_dir: Option<PathBuf>,

    /// Print debug diagnostics
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine the current directory: {0}")]
    CurrentDir(#[source] std::io::Error),
    #[error("source directory does not exist: {}", .0.display())]
    MissingSource(PathBuf),
    #[error("source path is not a directory: {}", .0.display())]
    SourceNotDir(PathBuf),
    #[error("site folder {} has no parent to use as source directory", .0.display())]
    NoParent(PathBuf),
}

/// Resolved locations for one run
#[derive(Debug, Clone)]
pub struct Config {
    pub source_dir: PathBuf,
    pub images_dir: PathBuf,
    pub data_dir: PathBuf,
    pub index_path: PathBuf,
}

impl Config {
    /// Lay out the output tree under `root`, reading documents from `source_dir`
    pub fn new(root: &Path, source_dir: PathBuf) -> Self {
        let data_dir = root.join(DATA_SUBDIR);
        Config {
            source_dir,
            images_dir: root.join(IMAGES_SUBDIR),
            index_path: data_dir.join(INDEX_FILE_NAME),
            data_dir,
        }
    }

    /// Output folder for a single date
    pub fn date_dir(&self, date: &str) -> PathBuf {
        self.images_dir.join(date)
    }
}

impl Args {
    /// Turn the parsed flags into a validated [`Config`]
    pub fn resolve(&self) -> Result<Config, ConfigError> {
        let root = match &self.root {
            Some(root) => root.clone(),
            None => std::env::current_dir().map_err(ConfigError::CurrentDir)?,
        };

        let source_dir = match &self.source_dir {
            Some(dir) => dir.clone(),
            None => root
                .parent()
                .map(Path::to_path_buf)
                .ok_or_else(|| ConfigError::NoParent(root.clone()))?,
        };

        if !source_dir.exists() {
            return Err(ConfigError::MissingSource(source_dir));
        }
        if !source_dir.is_dir() {
            return Err(ConfigError::SourceNotDir(source_dir));
        }

        Ok(Config::new(&root, source_dir))
    }
}
