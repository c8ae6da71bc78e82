//! Decode command implementation

use std::{
    fs::File,
    io::{self, BufRead, BufReader, BufWriter, Write},
    sync::Arc,
    time::Instant,
};

use anyhow::{Context, Result};
use serde::Serialize;
use verso_common::error::{Error, ErrorKind};
use verso_decoder::{DecodeResult, Decoder, DecoderConfig, PhraseSource, PhraseTable, Sentence};

use crate::{
    DecodeArgs,
    commands::{build_features, load_config},
    utils::{format_nbest_line, validate_file_exists},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// The best translation, one line per sentence.
    Text,
    /// `id ||| text ||| features ||| score` lines.
    NBest,
    /// One JSON object per sentence.
    Json,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeSummary {
    pub sentences: usize,
    pub failed: usize,
    /// Sentences decoded without error but with no complete translation.
    pub untranslated: usize,
}

#[derive(Serialize)]
struct SentenceRecord<'a> {
    id: usize,
    #[serde(flatten)]
    result: &'a DecodeResult,
}

#[derive(Serialize)]
struct ErrorRecord {
    id: usize,
    error: String,
}

pub fn run(args: DecodeArgs) -> Result<()> {
    validate_file_exists(&args.phrase_table)?;
    let mut config = load_config(args.config.as_deref())?;
    apply_overrides(&mut config, &args);

    let table = PhraseTable::from_file(&args.phrase_table)
        .with_context(|| format!("Failed to load phrase table {}", args.phrase_table))?;
    log::info!(
        "phrase table {}: {} source phrases",
        args.phrase_table,
        table.len()
    );
    let features = build_features(table.num_scores(), &config.weights)?;
    let decoder = Decoder::new(Arc::new(table), Arc::new(features), config)
        .context("Failed to create decoder")?;

    let format = if args.json {
        OutputFormat::Json
    } else if args.nbest.is_some() {
        OutputFormat::NBest
    } else {
        OutputFormat::Text
    };

    let input: Box<dyn BufRead> = match &args.input {
        Some(path) => {
            validate_file_exists(path)?;
            let file = File::open(path).with_context(|| format!("Failed to open {path}"))?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(io::stdin().lock()),
    };
    let mut output: Box<dyn Write> = match &args.output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("Failed to create {path}"))?;
            Box::new(BufWriter::new(file))
        }
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };

    let started = Instant::now();
    let summary = decode_stream(&decoder, input, &mut output, format, args.walls)?;
    output.flush()?;

    log::info!(
        "decoded {} sentences in {:?}",
        summary.sentences,
        started.elapsed()
    );
    if summary.untranslated > 0 {
        log::warn!("{} sentences have no translation", summary.untranslated);
    }
    if summary.failed > 0 {
        anyhow::bail!("{} of {} sentences failed", summary.failed, summary.sentences);
    }
    Ok(())
}

/// Applies command-line settings on top of the loaded configuration.
pub fn apply_overrides(config: &mut DecoderConfig, args: &DecodeArgs) {
    if let Some(algorithm) = args.algorithm {
        config.search.algorithm = algorithm.into();
    }
    if let Some(nbest) = args.nbest {
        config.search.nbest_size = nbest;
    }
    if args.distinct {
        config.search.nbest_distinct = true;
    }
}

/// Decodes every line of `input` and writes the results to `output` in
/// input order.
///
/// A sentence that fails is logged and yields an empty line (or an error
/// object in JSON output); the others are unaffected.
pub fn decode_stream(
    decoder: &Decoder,
    input: impl BufRead,
    output: &mut impl Write,
    format: OutputFormat,
    walls: bool,
) -> Result<DecodeSummary> {
    let lines = input
        .lines()
        .collect::<io::Result<Vec<_>>>()
        .context("Failed to read input")?;
    let sentences = lines
        .iter()
        .map(|line| {
            let sentence = Sentence::from_text(line);
            if walls {
                sentence.with_punctuation_walls()
            } else {
                sentence
            }
        })
        .collect::<Vec<_>>();

    // empty lines are echoed without decoding
    let pending = sentences
        .iter()
        .filter(|sentence| !sentence.is_empty())
        .cloned()
        .collect::<Vec<_>>();
    let mut results = decoder.decode_batch(&pending).into_iter();

    let mut summary = DecodeSummary {
        sentences: sentences.len(),
        ..Default::default()
    };
    for (id, sentence) in sentences.iter().enumerate() {
        let result = if sentence.is_empty() {
            Ok(DecodeResult::default())
        } else {
            results
                .next()
                .context("Decoder returned fewer results than sentences")?
        };
        match result {
            Ok(result) => {
                if result.best.is_none() && !sentence.is_empty() {
                    summary.untranslated += 1;
                }
                write_result(output, id, &result, format)?;
            }
            Err(e) => {
                let e = unwrap_sentence_error(e);
                log::error!("sentence {id}: {e}");
                summary.failed += 1;
                match format {
                    OutputFormat::Json => write_json(
                        output,
                        &ErrorRecord {
                            id,
                            error: e.to_string(),
                        },
                    )?,
                    OutputFormat::Text => writeln!(output)?,
                    OutputFormat::NBest => {}
                }
            }
        }
    }
    Ok(summary)
}

fn write_result(
    output: &mut impl Write,
    id: usize,
    result: &DecodeResult,
    format: OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            let text = result.best.as_ref().map(|t| t.text()).unwrap_or_default();
            writeln!(output, "{text}")?;
        }
        OutputFormat::NBest => {
            for translation in &result.nbest {
                writeln!(output, "{}", format_nbest_line(id, translation))?;
            }
        }
        OutputFormat::Json => write_json(output, &SentenceRecord { id, result })?,
    }
    Ok(())
}

fn write_json(output: &mut impl Write, record: &impl Serialize) -> Result<()> {
    serde_json::to_writer(&mut *output, record)?;
    writeln!(output)?;
    Ok(())
}

/// Strips the batch index, which counts only non-empty lines; the caller
/// reports the line number itself.
fn unwrap_sentence_error(e: Error) -> Error {
    match e.into_kind() {
        ErrorKind::Sentence { source, .. } => *source,
        kind => kind.into(),
    }
}
