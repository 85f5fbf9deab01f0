//! Domain types for representing a deck's slides and shapes.

use serde::{Deserialize, Serialize};

/// Separator between paragraphs of a text frame.
pub const PARAGRAPH_SEPARATOR: char = '\n';

/// Separator for a soft line break inside a paragraph.
pub const LINE_BREAK: char = '\u{000B}';

/// Represents an entire presentation with its shapes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Presentation {
    /// Original filename (without path).
    pub filename: String,

    /// Detected format of the source file.
    pub format: PresentationFormat,

    /// Slides in presentation order.
    pub slides: Vec<Slide>,
}

impl Presentation {
    /// Create a new presentation with the given filename and format.
    pub fn new(filename: impl Into<String>, format: PresentationFormat) -> Self {
        Self {
            filename: filename.into(),
            format,
            slides: Vec::new(),
        }
    }

    /// Add a slide to the presentation.
    pub fn add_slide(&mut self, slide: Slide) {
        self.slides.push(slide);
    }

    /// All text frames in document order.
    pub fn text_frames(&self) -> impl Iterator<Item = &TextFrame> {
        self.slides.iter().flat_map(|s| s.text_frames())
    }

    /// All text frames in document order, for editing.
    pub fn text_frames_mut(&mut self) -> impl Iterator<Item = &mut TextFrame> {
        self.slides
            .iter_mut()
            .flat_map(|s| s.shapes.iter_mut().filter_map(Shape::text_frame_mut))
    }

    /// Number of text frames whose text differs from what was loaded.
    pub fn modified_count(&self) -> usize {
        self.text_frames().filter(|f| f.is_modified()).count()
    }
}

/// The format of the source presentation file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PresentationFormat {
    /// Modern PPTX (Office Open XML).
    Pptx,
    /// Legacy PPT (OLE/CFB binary). Detected, never edited.
    Ppt,
}

impl PresentationFormat {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pptx" => Some(Self::Pptx),
            "ppt" => Some(Self::Ppt),
            _ => None,
        }
    }

    /// Detect format from file magic bytes.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        // PPTX is a ZIP file (PK\x03\x04)
        if bytes.starts_with(&[0x50, 0x4B, 0x03, 0x04]) {
            return Some(Self::Pptx);
        }

        // PPT is an OLE/CFB file (D0 CF 11 E0 A1 B1 1A E1)
        if bytes.len() >= 8
            && bytes.starts_with(&[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1])
        {
            return Some(Self::Ppt);
        }

        None
    }
}

/// A single slide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Slide {
    /// 1-based slide number.
    pub number: usize,

    /// Package part the slide was read from, e.g. `ppt/slides/slide1.xml`.
    pub part: String,

    /// Top-level shapes in document order.
    pub shapes: Vec<Shape>,
}

impl Slide {
    /// Create a new, empty slide.
    pub fn new(number: usize, part: impl Into<String>) -> Self {
        Self {
            number,
            part: part.into(),
            shapes: Vec::new(),
        }
    }

    /// Add a shape to this slide.
    pub fn add_shape(&mut self, shape: Shape) {
        self.shapes.push(shape);
    }

    pub fn text_frames(&self) -> impl Iterator<Item = &TextFrame> {
        self.shapes.iter().filter_map(Shape::text_frame)
    }

    pub fn text_frame_count(&self) -> usize {
        self.text_frames().count()
    }

    /// Whether any text frame on this slide has been edited.
    pub fn is_modified(&self) -> bool {
        self.text_frames().any(TextFrame::is_modified)
    }
}

/// A positioned element on a slide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Shape {
    /// Numeric id from `cNvPr`, if present.
    pub id: Option<u32>,

    /// Display name from `cNvPr`.
    pub name: String,

    pub kind: ShapeKind,
}

impl Shape {
    pub fn new(id: Option<u32>, name: impl Into<String>, kind: ShapeKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
        }
    }

    /// The shape's text frame, if it carries one.
    pub fn text_frame(&self) -> Option<&TextFrame> {
        match &self.kind {
            ShapeKind::Text(frame) => Some(frame),
            _ => None,
        }
    }

    pub fn text_frame_mut(&mut self) -> Option<&mut TextFrame> {
        match &mut self.kind {
            ShapeKind::Text(frame) => Some(frame),
            _ => None,
        }
    }
}

/// What a shape is. Only [`ShapeKind::Text`] carries editable text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShapeKind {
    /// Auto shape or placeholder with a text body.
    Text(TextFrame),
    /// Auto shape without a text body.
    AutoShape,
    Picture,
    /// Graphic frame hosting a chart, table, diagram, or other object.
    Graphic(GraphicKind),
    Group,
    Connector,
    Other,
}

impl ShapeKind {
    /// Short lowercase label used in listings.
    pub fn label(&self) -> &'static str {
        match self {
            ShapeKind::Text(_) => "text",
            ShapeKind::AutoShape => "autoshape",
            ShapeKind::Picture => "picture",
            ShapeKind::Graphic(GraphicKind::Chart) => "chart",
            ShapeKind::Graphic(GraphicKind::Table) => "table",
            ShapeKind::Graphic(GraphicKind::Diagram) => "diagram",
            ShapeKind::Graphic(GraphicKind::Other) => "graphic",
            ShapeKind::Group => "group",
            ShapeKind::Connector => "connector",
            ShapeKind::Other => "other",
        }
    }
}

/// Content hosted by a graphic frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GraphicKind {
    Chart,
    Table,
    Diagram,
    Other,
}

impl GraphicKind {
    /// Classify from the `uri` attribute of `a:graphicData`.
    pub fn from_uri(uri: &str) -> Self {
        if uri.ends_with("/chart") {
            GraphicKind::Chart
        } else if uri.ends_with("/table") {
            GraphicKind::Table
        } else if uri.ends_with("/diagram") {
            GraphicKind::Diagram
        } else {
            GraphicKind::Other
        }
    }
}

/// Editable text of a shape.
///
/// Paragraphs are separated by [`PARAGRAPH_SEPARATOR`] and soft line breaks
/// inside a paragraph are [`LINE_BREAK`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextFrame {
    original: String,
    text: String,
}

impl TextFrame {
    /// Create a text frame holding the text as loaded.
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            original: text.clone(),
            text,
        }
    }

    /// Current text.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Text as it was loaded.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// Replace the current text.
    pub fn set_text(&mut self, text: impl Into<String>) {
        self.text = text.into();
    }

    /// Whether the current text differs byte-for-byte from the loaded text.
    pub fn is_modified(&self) -> bool {
        self.text != self.original
    }
}
