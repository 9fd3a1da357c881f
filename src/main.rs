use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use docx_layout::{ElementType, LayoutOptions, convert_docx_to_layout};

/// Lay out a DOCX document and write its positioned boxes as JSON.
#[derive(Parser, Debug)]
#[command(name = "docx-layout", version, about)]
struct Args {
    /// DOCX file to lay out
    #[arg(value_name = "INPUT")]
    input: PathBuf,

    /// Output JSON file [default: <INPUT stem>.layout.json next to the input]
    #[arg(short, long, value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// Pretty-print the JSON
    #[arg(long)]
    pretty: bool,

    /// Tables nested deeper than this are emitted as placeholders
    #[arg(long, value_name = "N", default_value_t = LayoutOptions::default().max_table_depth)]
    max_table_depth: usize,

    /// Print one line per section after writing
    #[arg(long)]
    summary: bool,
}

fn default_output(input: &std::path::Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "document".to_string());
    input.with_file_name(format!("{stem}.layout.json"))
}

fn main() -> ExitCode {
    env_logger::init();
    let args = Args::parse();

    let output = args.output.clone().unwrap_or_else(|| default_output(&args.input));
    let options = LayoutOptions {
        max_table_depth: args.max_table_depth,
    };

    let model = match convert_docx_to_layout(&args.input, &output, &options, args.pretty) {
        Ok(model) => model,
        Err(err) => {
            eprintln!("error: {}: {err}", args.input.display());
            return ExitCode::FAILURE;
        }
    };

    if args.summary {
        for (index, (page, boxes)) in model.pages.iter().zip(model.sections()).enumerate() {
            let count = |kind: ElementType| boxes.iter().filter(|b| b.element_type == kind).count();
            println!(
                "section {index}: {}x{}pt, {} boxes ({} paragraphs, {} tables, {} images, {} unsupported)",
                page.page_width,
                page.page_height,
                boxes.len(),
                count(ElementType::Paragraph),
                count(ElementType::Table),
                count(ElementType::Image),
                count(ElementType::Unsupported),
            );
        }
    }
    println!("{}", output.display());
    ExitCode::SUCCESS
}
