//! svgmin - A streaming SVG minifier
//!
//! svgmin shrinks SVG files without building a tree: editor metadata is
//! stripped, inline `style` declarations become plain attributes, and
//! auto-generated ids on drawing elements are dropped.

mod ast;
mod error;
mod filter;
mod parse;
mod policy;
mod serialize;
mod style;

use std::io::{BufRead, Write};

pub use ast::*;
pub use error::*;
pub use filter::*;
pub use parse::*;
pub use policy::*;
pub use serialize::*;
pub use style::*;

/// Minify an SVG string with default settings.
pub fn minify(svg: &str) -> Result<String, SvgMinError> {
    minify_with_options(svg, &Options::default())
}

/// Minify an SVG string with custom options.
pub fn minify_with_options(svg: &str, options: &Options) -> Result<String, SvgMinError> {
    let mut out = Vec::new();
    minify_stream(svg.as_bytes(), &mut out, options)?;
    Ok(String::from_utf8(out)?)
}

/// Minify a document read from `input`, writing the result to `output` as it goes.
pub fn minify_stream<R: BufRead, W: Write>(
    input: R,
    output: W,
    options: &Options,
) -> Result<FilterStats, SvgMinError> {
    let policy = ExclusionPolicy::new(options);
    let mut reader = EventReader::new(input);
    let mut writer = EventWriter::new(output, options.auto_format);

    let stats = Minifier::new(&policy, options.convert_style).run(&mut reader, &mut writer)?;
    writer.into_inner()?.flush()?;
    Ok(stats)
}

/// Minification options.
#[derive(Debug, Clone)]
pub struct Options {
    /// Convert `style` declarations into XML attributes
    pub convert_style: bool,
    /// Simplify style declarations (currently has no effect beyond `convert_style`)
    pub simplify_style: bool,
    /// Keep `<metadata>` elements
    pub keep_metadata: bool,
    /// Keep Inkscape, Sodipodi, and Adobe Illustrator data
    pub keep_editor_data: bool,
    /// Indent the output
    pub auto_format: bool,
    /// Drop `id` attributes of drawing elements matching one of these
    pub excluded_ids: Vec<String>,
    /// How an id is matched against `excluded_ids`
    pub id_match: IdMatch,
    /// Drop elements with these local names, along with their content
    pub excluded_tags: Vec<String>,
    /// Drop elements and attributes with these namespace prefixes
    pub excluded_namespaces: Vec<String>,
}

impl Options {
    /// Drop ids matching `prefix` on drawing elements.
    pub fn remove_id(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        if !self.excluded_ids.contains(&prefix) {
            self.excluded_ids.push(prefix);
        }
        self
    }

    /// Stop dropping ids matching `prefix`.
    pub fn keep_id(mut self, prefix: &str) -> Self {
        self.excluded_ids.retain(|id| id != prefix);
        self
    }

    /// Drop every element named `tag`.
    pub fn remove_tag(mut self, tag: impl Into<String>) -> Self {
        self.excluded_tags.push(tag.into());
        self
    }

    /// Drop every element and attribute using namespace prefix `prefix`.
    pub fn remove_namespace(mut self, prefix: impl Into<String>) -> Self {
        self.excluded_namespaces.push(prefix.into());
        self
    }
}

impl Default for Options {
    fn default() -> Self {
        Self {
            convert_style: true,
            simplify_style: true,
            keep_metadata: true,
            keep_editor_data: false,
            auto_format: true,
            excluded_ids: DRAWING_ELEMENTS.iter().map(|s| s.to_string()).collect(),
            id_match: IdMatch::default(),
            excluded_tags: Vec::new(),
            excluded_namespaces: Vec::new(),
        }
    }
}
