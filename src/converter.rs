//! Conversion of one SPDX file into another serialization format.

use crate::copier::{self, CopyStats};
use crate::errors::ConverterError;
use crate::formats::rdf::ReaderMode;
use crate::formats::{Format, SerializableStore};
use crate::model;
use crate::store;
use log::{info, warn};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

/// Top-level configuration for a conversion run.
#[derive(Debug, Clone)]
pub struct ConvertConfig {
    pub input_file: PathBuf,
    pub output_file: PathBuf,
    /// Both formats are inferred from the file names unless both are given.
    pub input_format: Option<Format>,
    pub output_format: Option<Format>,
    /// Leave license detail records (cross references) out of the output.
    pub exclude_license_details: bool,
    /// Skip RDF/XML constructs the reader does not support instead of
    /// failing. Every skipped construct is logged as a warning.
    pub lenient_rdf_reader: bool,
}

impl ConvertConfig {
    pub fn new(input_file: impl Into<PathBuf>, output_file: impl Into<PathBuf>) -> Self {
        Self {
            input_file: input_file.into(),
            output_file: output_file.into(),
            input_format: None,
            output_format: None,
            exclude_license_details: false,
            lenient_rdf_reader: false,
        }
    }

    pub fn with_formats(mut self, input_format: Format, output_format: Format) -> Self {
        self.input_format = Some(input_format);
        self.output_format = Some(output_format);
        self
    }

    pub fn excluding_license_details(mut self, exclude: bool) -> Self {
        self.exclude_license_details = exclude;
        self
    }

    pub fn with_lenient_rdf_reader(mut self, lenient: bool) -> Self {
        self.lenient_rdf_reader = lenient;
        self
    }

    fn reader_mode(&self) -> ReaderMode {
        if self.lenient_rdf_reader {
            ReaderMode::Lenient
        } else {
            ReaderMode::Strict
        }
    }

    /// The formats to use, inferring both from the file names when either
    /// is missing.
    pub fn resolve_formats(&self) -> Result<(Format, Format), ConverterError> {
        match (self.input_format, self.output_format) {
            (Some(input), Some(output)) => Ok((input, output)),
            _ => Ok((
                Format::from_file_name(&self.input_file)?,
                Format::from_file_name(&self.output_file)?,
            )),
        }
    }
}

/// The main entry point for the conversion logic.
///
/// Any failure is returned as a [`ConverterError::Conversion`] keeping the
/// classification of the original cause. A destination file that was
/// already created when a later step fails is left in place.
pub fn convert(config: &ConvertConfig) -> Result<CopyStats, ConverterError> {
    run(config).map_err(ConverterError::into_conversion)
}

fn run(config: &ConvertConfig) -> Result<CopyStats, ConverterError> {
    let start_time = Instant::now();
    info!("Starting conversion");
    info!("  Input: {}", config.input_file.display());
    info!("  Output: {}", config.output_file.display());

    if !config.input_file.exists() {
        return Err(ConverterError::SourceNotFound(config.input_file.clone()));
    }
    if config.output_file.exists() {
        return Err(ConverterError::DestinationExists(config.output_file.clone()));
    }

    let (input_format, output_format) = config.resolve_formats()?;
    info!("  Input format: {input_format}");
    info!("  Output format: {output_format}");

    let mut source = input_format.store()?;
    let mut dest = output_format.store()?;

    if let Some(rdf) = source.as_rdf_mut() {
        rdf.set_reader_mode(config.reader_mode());
    }

    // --- 1. Read ---
    let read_start = Instant::now();
    let input_file = File::open(&config.input_file)
        .map_err(|e| ConverterError::Io(e, "Failed to open input file".to_string()))?;
    let mut input_reader = BufReader::new(input_file);
    source.deserialize(&mut input_reader)?;
    for warning in source.warnings() {
        warn!("{}: {warning}", config.input_file.display());
    }
    let document = store::document_from_store(source.model())?;
    let document_uri = model::namespace_of(&document.object_uri).to_string();
    info!(
        "Read document {document_uri} ({} records). (Took {:.2?})",
        source.model().len(),
        read_start.elapsed()
    );

    // --- 2. Copy ---
    if let Some(rdf) = dest.as_rdf_mut() {
        rdf.set_document_uri(&document_uri);
        rdf.set_dont_store_license_details(config.exclude_license_details);
    }
    let copy_start = Instant::now();
    let stats = copier::copy_document(
        dest.model_mut(),
        source.model(),
        &document_uri,
        config.exclude_license_details,
    )?;
    info!("Copy finished. (Took {:.2?})", copy_start.elapsed());

    // --- 3. Write ---
    write_output(dest.as_ref(), config)?;

    info!("Total execution time: {:.2?}", start_time.elapsed());
    Ok(stats)
}

fn write_output(dest: &dyn SerializableStore, config: &ConvertConfig) -> Result<(), ConverterError> {
    let output_file = File::create(&config.output_file)
        .map_err(|e| ConverterError::Io(e, "Failed to create output file".to_string()))?;
    let mut output_writer = BufWriter::new(output_file);
    dest.serialize(&mut output_writer)?;
    flush_output(&mut output_writer)?;

    let output_file = output_writer
        .into_inner()
        .map_err(|e| ConverterError::Io(e.into_error(), "Failed to write output file".to_string()))?;
    if let Err(e) = output_file.sync_all() {
        warn!(
            "Failed to close output file {}: {e}",
            config.output_file.display()
        );
    }
    Ok(())
}

/// Pushes buffered output to the file; a failure here means the file is
/// incomplete.
fn flush_output(writer: &mut dyn Write) -> Result<(), ConverterError> {
    writer
        .flush()
        .map_err(|e| ConverterError::Io(e, "Failed to write output file".to_string()))
}
