//! Minimal PPTX packages built in memory, for tests.
//!
//! The packages carry just the parts the reader needs (content types,
//! relationships, the presentation part, and slides), not masters or layouts.

use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

const NS: &str = r#"xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main""#;

/// A shape to place on a fixture slide.
#[derive(Debug, Clone)]
pub enum FixtureShape {
    /// Text box; `\n` separates paragraphs.
    Text { name: String, text: String },
    Picture { name: String },
    Chart { name: String },
    /// Auto shape with no text body.
    Bare { name: String },
}

/// How the presentation part lists its slides.
#[derive(Debug, Clone, Default)]
enum SlideList {
    /// `p:sldIdLst` in part order.
    #[default]
    Numeric,
    /// `p:sldIdLst` in the given order of 1-based part numbers.
    Ordered(Vec<usize>),
    /// No `p:sldIdLst` at all.
    Absent,
}

/// Builder for a minimal deck.
#[derive(Debug, Clone, Default)]
pub struct DeckFixture {
    slides: Vec<Vec<FixtureShape>>,
    list: SlideList,
}

impl DeckFixture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a slide holding `shapes`.
    pub fn slide(mut self, shapes: Vec<FixtureShape>) -> Self {
        self.slides.push(shapes);
        self
    }

    /// Append a slide with one text box per entry.
    pub fn text_slide(self, texts: &[&str]) -> Self {
        let shapes = texts
            .iter()
            .enumerate()
            .map(|(idx, text)| FixtureShape::text(format!("TextBox {}", idx + 1), *text))
            .collect();
        self.slide(shapes)
    }

    /// List the slide parts in `p:sldIdLst` in `order` (1-based part
    /// numbers) instead of part order.
    pub fn listed_in(mut self, order: &[usize]) -> Self {
        self.list = SlideList::Ordered(order.to_vec());
        self
    }

    /// Leave `p:sldIdLst` out of the presentation part.
    pub fn without_slide_list(mut self) -> Self {
        self.list = SlideList::Absent;
        self
    }

    /// Serialize the package.
    pub fn build(&self) -> Vec<u8> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = FileOptions::default();

        let mut put = |name: &str, body: String| {
            zip.start_file(name, options).expect("fixture entry");
            zip.write_all(body.as_bytes()).expect("fixture entry");
        };

        put("[Content_Types].xml", self.content_types());
        put(
            "_rels/.rels",
            relationships(&[(
                "rId1",
                "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument",
                "ppt/presentation.xml",
            )]),
        );
        put("ppt/presentation.xml", self.presentation());
        put("ppt/_rels/presentation.xml.rels", self.presentation_rels());
        for (idx, shapes) in self.slides.iter().enumerate() {
            put(&format!("ppt/slides/slide{}.xml", idx + 1), slide_xml(shapes));
        }

        zip.finish().expect("fixture archive").into_inner()
    }

    fn content_types(&self) -> String {
        let mut xml = String::from(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/ppt/presentation.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.presentation.main+xml"/>"#,
        );
        for idx in 1..=self.slides.len() {
            xml.push_str(&format!(
                r#"<Override PartName="/ppt/slides/slide{}.xml" ContentType="application/vnd.openxmlformats-officedocument.presentationml.slide+xml"/>"#,
                idx
            ));
        }
        xml.push_str("</Types>");
        xml
    }

    fn presentation(&self) -> String {
        let order: Vec<usize> = match &self.list {
            SlideList::Numeric => (1..=self.slides.len()).collect(),
            SlideList::Ordered(order) => order.clone(),
            SlideList::Absent => Vec::new(),
        };
        let list = if matches!(self.list, SlideList::Absent) {
            String::new()
        } else {
            let ids: String = order
                .iter()
                .enumerate()
                .map(|(pos, idx)| format!(r#"<p:sldId id="{}" r:id="rId{}"/>"#, 256 + pos, idx))
                .collect();
            format!("<p:sldIdLst>{}</p:sldIdLst>", ids)
        };
        format!(
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:presentation {}>{}<p:sldSz cx="9144000" cy="6858000"/></p:presentation>"#,
            NS, list
        )
    }

    fn presentation_rels(&self) -> String {
        let targets: Vec<(String, String)> = (1..=self.slides.len())
            .map(|idx| (format!("rId{}", idx), format!("slides/slide{}.xml", idx)))
            .collect();
        let rels: Vec<(&str, &str, &str)> = targets
            .iter()
            .map(|(id, target)| {
                (
                    id.as_str(),
                    "http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide",
                    target.as_str(),
                )
            })
            .collect();
        relationships(&rels)
    }
}

impl FixtureShape {
    pub fn text(name: impl Into<String>, text: impl Into<String>) -> Self {
        FixtureShape::Text {
            name: name.into(),
            text: text.into(),
        }
    }

    pub fn picture(name: impl Into<String>) -> Self {
        FixtureShape::Picture { name: name.into() }
    }

    pub fn chart(name: impl Into<String>) -> Self {
        FixtureShape::Chart { name: name.into() }
    }

    pub fn bare(name: impl Into<String>) -> Self {
        FixtureShape::Bare { name: name.into() }
    }
}

fn relationships(rels: &[(&str, &str, &str)]) -> String {
    let body: String = rels
        .iter()
        .map(|(id, kind, target)| {
            format!(r#"<Relationship Id="{}" Type="{}" Target="{}"/>"#, id, kind, target)
        })
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">{}</Relationships>"#,
        body
    )
}

fn slide_xml(shapes: &[FixtureShape]) -> String {
    let mut tree = String::from(
        r#"<p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr><p:grpSpPr/>"#,
    );

    for (idx, shape) in shapes.iter().enumerate() {
        let id = idx + 2;
        match shape {
            FixtureShape::Text { name, text } => {
                let paragraphs: String = text
                    .split('\n')
                    .map(|line| {
                        if line.is_empty() {
                            "<a:p/>".to_string()
                        } else {
                            format!(
                                r#"<a:p><a:r><a:rPr lang="en-US" dirty="0"/><a:t>{}</a:t></a:r></a:p>"#,
                                escape(line)
                            )
                        }
                    })
                    .collect();
                tree.push_str(&format!(
                    r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{}"/><p:cNvSpPr txBox="1"/><p:nvPr/></p:nvSpPr><p:spPr/><p:txBody><a:bodyPr wrap="square"/><a:lstStyle/>{}</p:txBody></p:sp>"#,
                    id,
                    escape(name),
                    paragraphs
                ));
            }
            FixtureShape::Picture { name } => tree.push_str(&format!(
                r#"<p:pic><p:nvPicPr><p:cNvPr id="{}" name="{}"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr><p:blipFill/><p:spPr/></p:pic>"#,
                id,
                escape(name)
            )),
            FixtureShape::Chart { name } => tree.push_str(&format!(
                r#"<p:graphicFrame><p:nvGraphicFramePr><p:cNvPr id="{}" name="{}"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr><p:xfrm/><a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/chart"/></a:graphic></p:graphicFrame>"#,
                id,
                escape(name)
            )),
            FixtureShape::Bare { name } => tree.push_str(&format!(
                r#"<p:sp><p:nvSpPr><p:cNvPr id="{}" name="{}"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr><p:spPr/></p:sp>"#,
                id,
                escape(name)
            )),
        }
    }

    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><p:sld {}><p:cSld><p:spTree>{}</p:spTree></p:cSld></p:sld>"#,
        NS, tree
    )
}

fn escape(text: &str) -> String {
    quick_xml::escape::escape(text).into_owned()
}
