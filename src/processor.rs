use anyhow::{Context, Result};
use log::{debug, warn};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::archive::extract_images_from_docx;
use crate::args::Config;
use crate::filename::{
    extract_date, extract_description, format_display_date, is_lecturas_document,
};
use crate::record::{write_index, LecturaRecord};

const BANNER_WIDTH: usize = 60;

pub struct Processor {
    config: Config,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessingStats {
    pub total_files: usize,
    pub recorded: usize,
    pub skipped_no_date: usize,
    pub skipped_duplicate: usize,
    pub skipped_invalid_date: usize,
    pub without_images: usize,
}

/// What happened to a single document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileOutcome {
    Recorded(LecturaRecord),
    NoDate,
    DuplicateDate(String),
    InvalidDate(String),
    /// The document was opened (or attempted) but no image was saved
    NoImages(String),
}

/// Result of a complete run
#[derive(Debug)]
pub struct RunReport {
    /// Records in the order they were written to the index
    pub records: Vec<LecturaRecord>,
    pub stats: ProcessingStats,
}

/// Accumulator threaded through the sorted document list
#[derive(Debug, Default)]
struct Batch {
    processed_dates: HashSet<String>,
    records: Vec<LecturaRecord>,
    stats: ProcessingStats,
}

impl Batch {
    fn absorb(mut self, outcome: FileOutcome) -> Self {
        match outcome {
            FileOutcome::Recorded(record) => {
                self.stats.recorded += 1;
                self.processed_dates.insert(record.date.clone());
                self.records.push(record);
            }
            FileOutcome::NoDate => self.stats.skipped_no_date += 1,
            FileOutcome::DuplicateDate(_) => self.stats.skipped_duplicate += 1,
            FileOutcome::InvalidDate(_) => self.stats.skipped_invalid_date += 1,
            FileOutcome::NoImages(_) => self.stats.without_images += 1,
        }
        self
    }
}

impl Processor {
    pub fn new(config: Config) -> Result<Self> {
        fs::create_dir_all(&config.images_dir).with_context(|| {
            format!(
                "Failed to create images directory: {}",
                config.images_dir.display()
            )
        })?;
        fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("Failed to create data directory: {}", config.data_dir.display())
        })?;

        Ok(Processor { config })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Extract every document, then rewrite the index from scratch
    pub fn run(&self) -> Result<RunReport> {
        print_banner("Extracción de imágenes de archivos Word");

        let files = self.collect_documents()?;
        println!();
        println!("Encontrados {} archivos Word de lecturas", files.len());

        let mut batch = files.iter().fold(Batch::default(), |batch, path| {
            let outcome = self.process_file(path, &batch.processed_dates);
            batch.absorb(outcome)
        });
        batch.stats.total_files = files.len();
        batch.records.sort_by(|a, b| a.date.cmp(&b.date));

        write_index(&self.config.index_path, &batch.records)?;

        let report = RunReport {
            records: batch.records,
            stats: batch.stats,
        };
        self.print_summary(&report);
        Ok(report)
    }

    /// `Lecturas *.docx` files at the top level of the source directory, sorted by name
    pub fn collect_documents(&self) -> Result<Vec<PathBuf>> {
        let source_dir = &self.config.source_dir;
        debug!("Scanning {}", source_dir.display());

        let mut files = Vec::new();
        for entry_result in WalkDir::new(source_dir)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = match entry_result {
                Ok(e) => e,
                Err(err) if err.depth() == 0 => {
                    return Err(err).with_context(|| {
                        format!("Failed to read source directory: {}", source_dir.display())
                    });
                }
                Err(err) => {
                    match err.path() {
                        Some(path) => warn!("Failed to access {}: {}", path.display(), err),
                        None => warn!("WalkDir error: {}", err),
                    }
                    continue;
                }
            };

            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let name = entry.file_name().to_string_lossy();
            if !is_lecturas_document(&name) {
                continue;
            }
            if entry.file_name().to_str().is_none() {
                warn!("File name is not valid UTF-8: {}", path.display());
            }
            files.push(path.to_path_buf());
        }

        Ok(files)
    }

    /// Handle one document given the dates already recorded in this run
    pub fn process_file(&self, path: &Path, processed_dates: &HashSet<String>) -> FileOutcome {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let Some(date) = extract_date(&filename) else {
            println!("  SALTANDO (sin fecha): {}", filename);
            return FileOutcome::NoDate;
        };
        let date = date.to_string();

        if processed_dates.contains(&date) {
            println!("  SALTANDO (fecha duplicada): {}", filename);
            return FileOutcome::DuplicateDate(date);
        }

        let Some(date_display) = format_display_date(&date) else {
            println!("  ERROR fecha inválida ({}): {}", date, filename);
            return FileOutcome::InvalidDate(date);
        };

        let description = extract_description(&filename);
        let output_dir = self.config.date_dir(&date);

        println!();
        println!("Procesando: {}", filename);
        println!("  Fecha: {}", date);
        println!("  Descripción: {}", description);

        let extraction = extract_images_from_docx(path, &output_dir);
        if extraction.images.is_empty() {
            return FileOutcome::NoImages(date);
        }

        let names: Vec<&str> = extraction.images.iter().map(|r| r.as_str()).collect();
        println!("  Imágenes extraídas: {}", names.join(", "));

        FileOutcome::Recorded(LecturaRecord {
            date,
            date_display,
            description,
            images: extraction.images,
        })
    }

    fn print_summary(&self, report: &RunReport) {
        let stats = &report.stats;

        println!();
        println!("{}", "=".repeat(BANNER_WIDTH));
        println!("COMPLETADO");
        println!("  Total de fechas procesadas: {}", report.records.len());
        println!("  JSON guardado en: {}", self.config.index_path.display());
        println!("  Imágenes guardadas en: {}", self.config.images_dir.display());

        if stats.skipped_no_date > 0 {
            println!("  Sin fecha: {}", stats.skipped_no_date);
        }
        if stats.skipped_duplicate > 0 {
            println!("  Fechas duplicadas: {}", stats.skipped_duplicate);
        }
        if stats.skipped_invalid_date > 0 {
            println!("  Fechas inválidas: {}", stats.skipped_invalid_date);
        }
        if stats.without_images > 0 {
            println!("  Sin imágenes: {}", stats.without_images);
        }
        println!("{}", "=".repeat(BANNER_WIDTH));
    }
}

fn print_banner(title: &str) {
    println!("{}", "=".repeat(BANNER_WIDTH));
    println!("{}", title);
    println!("{}", "=".repeat(BANNER_WIDTH));
}
