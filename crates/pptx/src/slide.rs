//! Reads the shapes of a single slide part.

use deckfix_core::{
    Error, GraphicKind, Result, Shape, ShapeKind, Slide, TextFrame, LINE_BREAK,
    PARAGRAPH_SEPARATOR,
};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::xml::{
    attribute, collect_subtree, find_child, is_shape_element, local_name, subtree_end, OwnedEvent,
};

/// Parse the top-level shapes of a slide in document order.
///
/// Group members are not descended into; a group counts as one shape.
pub(crate) fn parse_slide(xml: &str, number: usize, part: &str) -> Result<Slide> {
    let mut slide = Slide::new(number, part);
    let mut reader = Reader::from_str(xml);

    let mut depth = 0usize;
    let mut tree_depth: Option<usize> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.name();
                let local = local_name(name.as_ref());

                if tree_depth == Some(depth) && is_shape_element(local) {
                    let events = collect_subtree(&mut reader, e)?;
                    slide.add_shape(shape_from_events(&events));
                    continue;
                }
                if local == b"spTree" && tree_depth.is_none() {
                    tree_depth = Some(depth + 1);
                }
                depth += 1;
            }
            Ok(Event::Empty(e)) => {
                let name = e.name();
                if tree_depth == Some(depth) && is_shape_element(local_name(name.as_ref())) {
                    let events = vec![Event::Empty(e.into_owned())];
                    slide.add_shape(shape_from_events(&events));
                }
            }
            Ok(Event::End(_)) => {
                if tree_depth == Some(depth) {
                    tree_depth = None;
                }
                depth = depth.saturating_sub(1);
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing slide '{}': {}",
                    part, e
                )));
            }
            _ => {}
        }
    }

    log::debug!(
        "Slide {} ({}): {} shapes, {} text frames",
        number,
        part,
        slide.shapes.len(),
        slide.text_frame_count()
    );

    Ok(slide)
}

/// Build a shape from the events of one `p:spTree` child.
fn shape_from_events(events: &[OwnedEvent]) -> Shape {
    let root = match events.first() {
        Some(Event::Start(e)) | Some(Event::Empty(e)) => local_name(e.name().as_ref()).to_vec(),
        _ => Vec::new(),
    };

    let (id, name) = non_visual_properties(events);

    let kind = match root.as_slice() {
        b"sp" => match find_child(events, b"txBody") {
            Some(body) => {
                let end = subtree_end(events, body);
                ShapeKind::Text(TextFrame::new(text_of_body(&events[body..=end])))
            }
            None => ShapeKind::AutoShape,
        },
        b"pic" => ShapeKind::Picture,
        b"graphicFrame" => ShapeKind::Graphic(graphic_kind(events)),
        b"grpSp" => ShapeKind::Group,
        b"cxnSp" => ShapeKind::Connector,
        _ => ShapeKind::Other,
    };

    Shape::new(id, name, kind)
}

/// `id` and `name` of the first `cNvPr` in the shape.
fn non_visual_properties(events: &[OwnedEvent]) -> (Option<u32>, String) {
    for event in events {
        if let Event::Start(e) | Event::Empty(e) = event {
            if local_name(e.name().as_ref()) == b"cNvPr" {
                let id = attribute(e, b"id").and_then(|v| v.parse().ok());
                let name = attribute(e, b"name").unwrap_or_default();
                return (id, name);
            }
        }
    }
    (None, String::new())
}

fn graphic_kind(events: &[OwnedEvent]) -> GraphicKind {
    for event in events {
        if let Event::Start(e) | Event::Empty(e) = event {
            if local_name(e.name().as_ref()) == b"graphicData" {
                return attribute(e, b"uri")
                    .map(|uri| GraphicKind::from_uri(&uri))
                    .unwrap_or(GraphicKind::Other);
            }
        }
    }
    GraphicKind::Other
}

/// Text of a `txBody`: paragraphs joined with `\n`, `a:br` as a vertical tab.
pub(crate) fn text_of_body(events: &[OwnedEvent]) -> String {
    let mut text = String::new();
    let mut paragraphs = 0usize;
    let mut in_text = false;

    for event in events {
        match event {
            Event::Start(e) => match local_name(e.name().as_ref()) {
                b"p" => {
                    if paragraphs > 0 {
                        text.push(PARAGRAPH_SEPARATOR);
                    }
                    paragraphs += 1;
                }
                b"t" => in_text = true,
                b"br" => text.push(LINE_BREAK),
                _ => {}
            },
            Event::Empty(e) => match local_name(e.name().as_ref()) {
                b"p" => {
                    if paragraphs > 0 {
                        text.push(PARAGRAPH_SEPARATOR);
                    }
                    paragraphs += 1;
                }
                b"br" => text.push(LINE_BREAK),
                _ => {}
            },
            Event::End(e) => {
                if local_name(e.name().as_ref()) == b"t" {
                    in_text = false;
                }
            }
            Event::Text(e) if in_text => match e.unescape() {
                Ok(t) => text.push_str(&t),
                Err(err) => {
                    log::warn!("Undecodable text run (kept raw): {}", err);
                    text.push_str(&String::from_utf8_lossy(e));
                }
            },
            Event::CData(e) if in_text => text.push_str(&String::from_utf8_lossy(e)),
            _ => {}
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLIDE: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<p:sld xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" xmlns:p="http://schemas.openxmlformats.org/presentationml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <p:cSld>
    <p:spTree>
      <p:nvGrpSpPr><p:cNvPr id="1" name=""/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
      <p:grpSpPr/>
      <p:sp>
        <p:nvSpPr><p:cNvPr id="2" name="Title 1"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>
        <p:spPr/>
        <p:txBody>
          <a:bodyPr/>
          <a:lstStyle/>
          <a:p><a:r><a:rPr lang="en-US"/><a:t>Helo </a:t></a:r><a:r><a:t>wrld &amp; co</a:t></a:r></a:p>
          <a:p><a:r><a:t>line one</a:t></a:r><a:br/><a:r><a:t>line two</a:t></a:r></a:p>
          <a:p/>
        </p:txBody>
      </p:sp>
      <p:pic>
        <p:nvPicPr><p:cNvPr id="3" name="Picture 2"/><p:cNvPicPr/><p:nvPr/></p:nvPicPr>
      </p:pic>
      <p:graphicFrame>
        <p:nvGraphicFramePr><p:cNvPr id="4" name="Chart 3"/><p:cNvGraphicFramePr/><p:nvPr/></p:nvGraphicFramePr>
        <a:graphic><a:graphicData uri="http://schemas.openxmlformats.org/drawingml/2006/chart"/></a:graphic>
      </p:graphicFrame>
      <p:grpSp>
        <p:nvGrpSpPr><p:cNvPr id="5" name="Group 4"/><p:cNvGrpSpPr/><p:nvPr/></p:nvGrpSpPr>
        <p:sp>
          <p:nvSpPr><p:cNvPr id="6" name="Inner"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>
          <p:txBody><a:bodyPr/><a:p><a:r><a:t>nested</a:t></a:r></a:p></p:txBody>
        </p:sp>
      </p:grpSp>
      <p:sp>
        <p:nvSpPr><p:cNvPr id="7" name="Rectangle 5"/><p:cNvSpPr/><p:nvPr/></p:nvSpPr>
        <p:spPr/>
      </p:sp>
    </p:spTree>
  </p:cSld>
</p:sld>"#;

    #[test]
    fn test_parse_slide_shapes_in_order() {
        let slide = parse_slide(SLIDE, 1, "ppt/slides/slide1.xml").unwrap();

        let kinds: Vec<&str> = slide.shapes.iter().map(|s| s.kind.label()).collect();
        assert_eq!(kinds, vec!["text", "picture", "chart", "group", "autoshape"]);

        let names: Vec<&str> = slide.shapes.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["Title 1", "Picture 2", "Chart 3", "Group 4", "Rectangle 5"]);
        assert_eq!(slide.shapes[0].id, Some(2));
    }

    #[test]
    fn test_text_joins_paragraphs_and_breaks() {
        let slide = parse_slide(SLIDE, 1, "ppt/slides/slide1.xml").unwrap();
        let frame = slide.shapes[0].text_frame().unwrap();
        assert_eq!(frame.text(), "Helo wrld & co\nline one\u{000B}line two\n");
    }

    #[test]
    fn test_group_members_are_not_text_frames() {
        let slide = parse_slide(SLIDE, 1, "ppt/slides/slide1.xml").unwrap();
        assert_eq!(slide.text_frame_count(), 1);
    }

    #[test]
    fn test_malformed_slide_is_an_error() {
        let result = parse_slide("<p:sld><p:cSld></p:sld>", 1, "ppt/slides/slide1.xml");
        assert!(result.is_err());
    }
}
