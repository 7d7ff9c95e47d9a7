use clap::Parser;
use rayon::prelude::*;
use std::cell::RefCell;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::Instant;

use khmer_segmenter::rules::RuleSpec;
use khmer_segmenter::Segmenter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to dictionary file (one word per line)
    #[arg(short, long)]
    dict: String,

    /// Path to frequency file (JSON map of word -> count)
    #[arg(short, long)]
    freq: Option<String>,

    /// Path to rules file (JSON list of rule objects)
    #[arg(short, long)]
    rules: Option<String>,

    /// Input text file, one sentence per line
    #[arg(short, long)]
    input: String,

    /// Output file (JSONL) - optional, skip to benchmark only
    #[arg(short, long)]
    output: Option<String>,

    /// Limit number of lines to process
    #[arg(short, long)]
    limit: Option<usize>,

    /// Emit the raw DP cover, skipping rule post-processing and grouping
    #[arg(long)]
    raw: bool,
}

// Output records are JSONL built by hand; serde_json only parses inputs.

const HEX_DIGITS: &[u8] = b"0123456789abcdef";

thread_local! {
    static JSON_BUFFER: RefCell<String> = RefCell::new(String::with_capacity(1024));
}

/// JSON string escaper - appends directly to buffer
#[inline]
fn escape_json_to(out: &mut String, s: &str) {
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if (c as u32) < 0x20 => {
                let code = c as u8;
                out.push_str("\\u00");
                out.push(HEX_DIGITS[(code >> 4) as usize] as char);
                out.push(HEX_DIGITS[(code & 0xF) as usize] as char);
            }
            c => out.push(c),
        }
    }
}

#[inline]
fn append_int(out: &mut String, val: usize) {
    if val == 0 {
        out.push('0');
        return;
    }
    let mut buf = [0u8; 20];
    let mut i = 20;
    let mut v = val;
    while v > 0 {
        i -= 1;
        buf[i] = b'0' + (v % 10) as u8;
        v /= 10;
    }
    for j in i..20 {
        out.push(buf[j] as char);
    }
}

/// Builds one `{"id":…,"input":…,"segments":[…],"unknown":[…]}` record,
/// where `unknown` lists the indices of out-of-vocabulary tokens.
#[inline]
fn build_json_record(
    id: usize,
    input: &str,
    segments: &[String],
    unknown_indices: &[usize],
) -> String {
    JSON_BUFFER.with(|buf| {
        let mut buffer = buf.borrow_mut();
        buffer.clear();

        buffer.push_str("{\"id\":");
        append_int(&mut buffer, id);
        buffer.push_str(",\"input\":\"");
        escape_json_to(&mut buffer, input);
        buffer.push_str("\",\"segments\":[");

        for (i, seg) in segments.iter().enumerate() {
            if i > 0 {
                buffer.push(',');
            }
            buffer.push('"');
            escape_json_to(&mut buffer, seg);
            buffer.push('"');
        }

        buffer.push_str("],\"unknown\":[");
        for (i, idx) in unknown_indices.iter().enumerate() {
            if i > 0 {
                buffer.push(',');
            }
            append_int(&mut buffer, *idx);
        }

        buffer.push_str("]}");
        buffer.clone()
    })
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();

    let start_load = Instant::now();

    let dict_text = std::fs::read_to_string(&args.dict)?;

    let frequencies: Option<HashMap<String, f64>> = match &args.freq {
        Some(path) => Some(serde_json::from_reader(File::open(path)?)?),
        None => None,
    };

    let rules: Vec<RuleSpec> = match &args.rules {
        Some(path) => serde_json::from_reader(File::open(path)?)?,
        None => Vec::new(),
    };

    let segmenter = Segmenter::new(&dict_text, frequencies.as_ref(), rules);
    eprintln!("Model loaded in {:.2}s", start_load.elapsed().as_secs_f32());

    let input = std::fs::read_to_string(&args.input)?;
    let mut lines: Vec<&str> = input
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect();

    if let Some(limit) = args.limit {
        if limit < lines.len() {
            lines.truncate(limit);
        }
    }

    eprintln!("Processing {} lines...", lines.len());
    let start_process = Instant::now();

    // The segmenter is immutable, so rayon workers share it read-only
    let results: Vec<String> = lines
        .par_iter()
        .enumerate()
        .map(|(i, line)| {
            let segments = if args.raw {
                segmenter.segment_raw(line)
            } else {
                segmenter.segment(line)
            };
            let unknown_indices: Vec<usize> = segments
                .iter()
                .enumerate()
                .filter(|(_, seg)| segmenter.is_unknown(seg))
                .map(|(idx, _)| idx)
                .collect();
            build_json_record(i, line, &segments, &unknown_indices)
        })
        .collect();

    if let Some(ref output_path) = args.output {
        let output_file = File::create(output_path)?;
        let mut writer = BufWriter::with_capacity(262144, output_file);
        for result in &results {
            writeln!(writer, "{}", result)?;
        }
        writer.flush()?;
        eprintln!("Done. Saved to {}", output_path);
    }

    let duration = start_process.elapsed();
    eprintln!("Time taken: {:.2}s", duration.as_secs_f32());
    eprintln!(
        "Speed: {:.2} lines/sec",
        lines.len() as f32 / duration.as_secs_f32()
    );

    Ok(())
}
