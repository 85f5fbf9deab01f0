//! Writes corrected text back into slide XML.
//!
//! Only the text bodies of shapes that have a replacement are rebuilt; every
//! other event is copied through untouched.

use deckfix_core::{Error, Result, LINE_BREAK, PARAGRAPH_SEPARATOR};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::xml::{
    child_indices, collect_subtree, event_local_name, find_child, is_shape_element, local_name,
    prefix, subtree_end, OwnedEvent,
};

/// Rewrite a slide, replacing the text of top-level shape `i` with
/// `replacements[i]` where that is `Some`.
///
/// Shape indices count the direct shape children of `p:spTree` in document
/// order, the same way the slide reader numbers them.
pub(crate) fn rewrite_slide(xml: &str, replacements: &[Option<&str>]) -> Result<String> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new(Vec::with_capacity(xml.len()));

    let mut depth = 0usize;
    let mut tree_depth: Option<usize> = None;
    let mut shape_index = 0usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::XmlError(format!("Error reading slide: {}", e)))?;

        match event {
            Event::Start(e) => {
                let is_shape =
                    tree_depth == Some(depth) && is_shape_element(local_name(e.name().as_ref()));

                if is_shape {
                    let index = shape_index;
                    shape_index += 1;
                    if let Some(Some(text)) = replacements.get(index) {
                        let shape = collect_subtree(&mut reader, e)?;
                        for event in replace_shape_text(shape, text) {
                            write(&mut writer, event)?;
                        }
                        continue;
                    }
                } else if local_name(e.name().as_ref()) == b"spTree" && tree_depth.is_none() {
                    tree_depth = Some(depth + 1);
                }

                depth += 1;
                write(&mut writer, Event::Start(e))?;
            }
            Event::Empty(e) => {
                if tree_depth == Some(depth) && is_shape_element(local_name(e.name().as_ref())) {
                    shape_index += 1;
                }
                write(&mut writer, Event::Empty(e))?;
            }
            Event::End(e) => {
                if tree_depth == Some(depth) {
                    tree_depth = None;
                }
                depth = depth.saturating_sub(1);
                write(&mut writer, Event::End(e))?;
            }
            Event::Eof => break,
            other => write(&mut writer, other)?,
        }
    }

    String::from_utf8(writer.into_inner())
        .map_err(|e| Error::XmlError(format!("Rewritten slide is not UTF-8: {}", e)))
}

fn write(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::XmlError(format!("Error writing slide: {}", e)))
}

/// Swap the `txBody` of a shape subtree for one holding `text`.
fn replace_shape_text(shape: Vec<OwnedEvent>, text: &str) -> Vec<OwnedEvent> {
    let Some(body_start) = find_child(&shape, b"txBody") else {
        log::warn!("Shape has no text body; replacement dropped");
        return shape;
    };
    let body_end = subtree_end(&shape, body_start);

    let mut out = Vec::with_capacity(shape.len());
    out.extend_from_slice(&shape[..body_start]);
    out.extend(rebuild_text_body(&shape[body_start..=body_end], text));
    out.extend_from_slice(&shape[body_end + 1..]);
    out
}

/// Build a new `txBody` holding `text`.
///
/// Body properties and list styles are kept. Every paragraph reuses the
/// first paragraph's `pPr` and every run reuses the first run's `rPr`, minus
/// its spelling-error flag.
pub(crate) fn rebuild_text_body(body: &[OwnedEvent], text: &str) -> Vec<OwnedEvent> {
    let mut kept: Vec<OwnedEvent> = Vec::new();
    let mut paragraph_props: Option<Vec<OwnedEvent>> = None;
    let mut run_props: Option<Vec<OwnedEvent>> = None;
    let mut ns: Option<String> = None;

    for idx in child_indices(body) {
        let end = subtree_end(body, idx);
        let child = &body[idx..=end];

        if ns.is_none() {
            ns = qualified_prefix(&child[0]);
        }

        if event_local_name(&child[0]).as_deref() != Some(b"p".as_slice()) {
            kept.extend_from_slice(child);
            continue;
        }

        if paragraph_props.is_none() {
            if let Some(props) = find_child(child, b"pPr") {
                paragraph_props = Some(child[props..=subtree_end(child, props)].to_vec());
            }
        }
        if run_props.is_none() {
            run_props = first_run_properties(child);
        }
    }

    let ns = ns.unwrap_or_else(|| "a".to_string());
    let tag = |local: &str| format!("{}:{}", ns, local);

    let mut out = Vec::new();
    out.push(body[0].clone());
    out.extend(kept);

    for paragraph in text.split(PARAGRAPH_SEPARATOR) {
        out.push(Event::Start(BytesStart::new(tag("p"))));
        if let Some(props) = &paragraph_props {
            out.extend(props.iter().cloned());
        }

        for (n, line) in paragraph.split(LINE_BREAK).enumerate() {
            if n > 0 {
                out.push(Event::Empty(BytesStart::new(tag("br"))));
            }
            if line.is_empty() {
                continue;
            }

            out.push(Event::Start(BytesStart::new(tag("r"))));
            if let Some(props) = &run_props {
                out.extend(props.iter().cloned());
            }
            out.push(Event::Start(BytesStart::new(tag("t"))));
            out.push(Event::Text(BytesText::new(&xml_safe(line)).into_owned()));
            out.push(Event::End(BytesEnd::new(tag("t"))));
            out.push(Event::End(BytesEnd::new(tag("r"))));
        }

        out.push(Event::End(BytesEnd::new(tag("p"))));
    }

    if let Some(last) = body.last() {
        out.push(last.clone());
    }
    out
}

/// The first `rPr` inside a run of this paragraph, with `err` stripped.
fn first_run_properties(paragraph: &[OwnedEvent]) -> Option<Vec<OwnedEvent>> {
    for run in child_indices(paragraph) {
        if event_local_name(&paragraph[run]).as_deref() != Some(b"r".as_slice()) {
            continue;
        }
        let run_events = &paragraph[run..=subtree_end(paragraph, run)];
        if let Some(props) = find_child(run_events, b"rPr") {
            let mut events = run_events[props..=subtree_end(run_events, props)].to_vec();
            events[0] = without_error_flag(&events[0]);
            return Some(events);
        }
    }
    None
}

fn without_error_flag(event: &OwnedEvent) -> OwnedEvent {
    let strip = |e: &BytesStart<'_>| {
        let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
        let mut stripped = BytesStart::new(name);
        for attr in e.attributes().flatten() {
            if attr.key.as_ref() != b"err" {
                stripped.push_attribute(attr);
            }
        }
        stripped
    };

    match event {
        Event::Start(e) => Event::Start(strip(e)),
        Event::Empty(e) => Event::Empty(strip(e)),
        other => other.clone(),
    }
}

fn qualified_prefix(event: &OwnedEvent) -> Option<String> {
    match event {
        Event::Start(e) | Event::Empty(e) => {
            prefix(e.name().as_ref()).map(|p| String::from_utf8_lossy(p).to_string())
        }
        _ => None,
    }
}

/// Drop characters XML 1.0 cannot carry.
fn xml_safe(text: &str) -> String {
    text.chars()
        .filter(|&c| c == '\t' || !c.is_control())
        .collect()
}
