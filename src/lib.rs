mod docx;
mod error;
pub mod layout;
pub mod model;
pub mod numbering;
pub mod property;
pub mod styles;

pub use docx::{ParsedDocument, parse, parse_bytes};
pub use error::Error;
pub use layout::{LayoutContext, LayoutEngine, LayoutOptions, WrapMode};
pub use model::{
    BlockElement, BoxContent, DocumentSection, DocumentTree, ElementType, LayoutBox, LayoutModel,
    PageGroup, PropertyNode, SectionProperties, StyleDefinition, StyleType,
};
pub use numbering::NumberingCatalog;
pub use styles::StylesCatalog;

use std::path::Path;
use std::time::{Duration, Instant};

/// Lay out a parsed package with its own styles and lists.
pub fn layout_document(doc: &ParsedDocument, options: &LayoutOptions) -> LayoutModel {
    LayoutEngine::new(&doc.styles)
        .with_numbering(&doc.numbering)
        .with_options(options.clone())
        .layout(&doc.tree)
}

/// Serialise a layout model as JSON.
pub fn layout_to_json(model: &LayoutModel, pretty: bool) -> Result<Vec<u8>, Error> {
    let bytes = if pretty {
        serde_json::to_vec_pretty(model)?
    } else {
        serde_json::to_vec(model)?
    };
    Ok(bytes)
}

fn finish(
    doc: &ParsedDocument,
    options: &LayoutOptions,
    output: &Path,
    pretty: bool,
    t0: Instant,
    t_parse: Duration,
) -> Result<LayoutModel, Error> {
    let model = layout_document(doc, options);
    let t_layout = t0.elapsed();

    let bytes = layout_to_json(&model, pretty)?;
    std::fs::write(output, &bytes).map_err(Error::Io)?;
    let t_total = t0.elapsed();

    log::info!(
        "Timing: parse={:.1}ms, layout={:.1}ms, write={:.1}ms, total={:.1}ms ({} boxes, output {} bytes)",
        t_parse.as_secs_f64() * 1000.0,
        (t_layout - t_parse).as_secs_f64() * 1000.0,
        (t_total - t_layout).as_secs_f64() * 1000.0,
        t_total.as_secs_f64() * 1000.0,
        model.boxes.len(),
        bytes.len(),
    );

    Ok(model)
}

/// Parse `input`, lay it out and write the JSON layout model to `output`.
pub fn convert_docx_to_layout(
    input: &Path,
    output: &Path,
    options: &LayoutOptions,
    pretty: bool,
) -> Result<LayoutModel, Error> {
    let t0 = Instant::now();
    let doc = docx::parse(input)?;
    let t_parse = t0.elapsed();
    finish(&doc, options, output, pretty, t0, t_parse)
}

pub fn convert_docx_bytes_to_layout(
    input: &[u8],
    output: &Path,
    options: &LayoutOptions,
    pretty: bool,
) -> Result<LayoutModel, Error> {
    let t0 = Instant::now();
    let doc = docx::parse_bytes(input)?;
    let t_parse = t0.elapsed();
    finish(&doc, options, output, pretty, t0, t_parse)
}
