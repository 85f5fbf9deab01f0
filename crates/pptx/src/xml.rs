//! Small helpers over quick-xml events shared by the slide reader and writer.

use deckfix_core::{Error, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Owned XML event.
pub(crate) type OwnedEvent = Event<'static>;

/// Shape elements that can appear as direct children of `p:spTree`.
const SHAPE_ELEMENTS: &[&[u8]] = &[
    b"sp",
    b"pic",
    b"graphicFrame",
    b"grpSp",
    b"cxnSp",
    b"contentPart",
];

/// Extract the local name from a potentially namespaced XML element name.
pub(crate) fn local_name(name: &[u8]) -> &[u8] {
    if let Some(pos) = name.iter().position(|&b| b == b':') {
        &name[pos + 1..]
    } else {
        name
    }
}

/// Prefix of a qualified name, if any (`a` for `a:p`).
pub(crate) fn prefix(name: &[u8]) -> Option<&[u8]> {
    name.iter().position(|&b| b == b':').map(|pos| &name[..pos])
}

pub(crate) fn is_shape_element(local: &[u8]) -> bool {
    SHAPE_ELEMENTS.contains(&local)
}

/// Value of the attribute named exactly `key`.
pub(crate) fn attribute(e: &BytesStart<'_>, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.as_ref() == key)
        .map(|attr| String::from_utf8_lossy(&attr.value).to_string())
}

/// Local name of a start, empty, or end event.
pub(crate) fn event_local_name(event: &Event<'_>) -> Option<Vec<u8>> {
    match event {
        Event::Start(e) | Event::Empty(e) => Some(local_name(e.name().as_ref()).to_vec()),
        Event::End(e) => Some(local_name(e.name().as_ref()).to_vec()),
        _ => None,
    }
}

/// Read events up to and including the end tag matching `start`, which the
/// caller has just taken from `reader`.
pub(crate) fn collect_subtree(
    reader: &mut Reader<&[u8]>,
    start: BytesStart<'_>,
) -> Result<Vec<OwnedEvent>> {
    let mut events = vec![Event::Start(start.into_owned())];
    let mut depth = 1usize;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| Error::XmlError(format!("Error reading element: {}", e)))?;
        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) => depth -= 1,
            Event::Eof => {
                return Err(Error::XmlError("Unexpected end of document".to_string()));
            }
            _ => {}
        }
        events.push(event.into_owned());
        if depth == 0 {
            return Ok(events);
        }
    }
}

/// Index of the event closing the element that opens at `start`.
///
/// An empty element closes itself.
pub(crate) fn subtree_end(events: &[OwnedEvent], start: usize) -> usize {
    if !matches!(events.get(start), Some(Event::Start(_))) {
        return start;
    }

    let mut depth = 0usize;
    for (idx, event) in events.iter().enumerate().skip(start) {
        match event {
            Event::Start(_) => depth += 1,
            Event::End(_) => {
                depth -= 1;
                if depth == 0 {
                    return idx;
                }
            }
            _ => {}
        }
    }
    events.len() - 1
}

/// Indices of the direct children of the element opened at `events[0]`.
pub(crate) fn child_indices(events: &[OwnedEvent]) -> Vec<usize> {
    let mut children = Vec::new();
    let last = events.len().saturating_sub(1);
    let mut idx = 1;

    while idx < last {
        match &events[idx] {
            Event::Start(_) => {
                children.push(idx);
                idx = subtree_end(events, idx) + 1;
            }
            Event::Empty(_) => {
                children.push(idx);
                idx += 1;
            }
            _ => idx += 1,
        }
    }

    children
}

/// First direct child of `events[0]` with the given local name.
pub(crate) fn find_child(events: &[OwnedEvent], local: &[u8]) -> Option<usize> {
    child_indices(events)
        .into_iter()
        .find(|&idx| event_local_name(&events[idx]).as_deref() == Some(local))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_all(xml: &str) -> Vec<OwnedEvent> {
        let mut reader = Reader::from_str(xml);
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) => return collect_subtree(&mut reader, e).unwrap(),
                Event::Eof => panic!("no root element"),
                _ => {}
            }
        }
    }

    #[test]
    fn test_local_name() {
        assert_eq!(local_name(b"p:sp"), b"sp");
        assert_eq!(local_name(b"a:t"), b"t");
        assert_eq!(local_name(b"sp"), b"sp");
    }

    #[test]
    fn test_prefix() {
        assert_eq!(prefix(b"a:p"), Some(&b"a"[..]));
        assert_eq!(prefix(b"p"), None);
    }

    #[test]
    fn test_collect_subtree_stops_at_matching_end() {
        let events = parse_all("<a:root><a:x><a:x/></a:x><a:y>t</a:y></a:root>");
        assert!(matches!(events.first(), Some(Event::Start(_))));
        assert!(matches!(events.last(), Some(Event::End(_))));
        assert_eq!(subtree_end(&events, 0), events.len() - 1);
    }

    #[test]
    fn test_children_and_find_child() {
        let events = parse_all("<r> <a:one><a:two/></a:one><a:two/><a:three>x</a:three></r>");
        let names: Vec<Vec<u8>> = child_indices(&events)
            .into_iter()
            .filter_map(|idx| event_local_name(&events[idx]))
            .collect();
        assert_eq!(names, vec![b"one".to_vec(), b"two".to_vec(), b"three".to_vec()]);

        let two = find_child(&events, b"two").unwrap();
        assert!(matches!(events[two], Event::Empty(_)));
        assert!(find_child(&events, b"four").is_none());
    }

    #[test]
    fn test_collect_subtree_reports_truncation() {
        let mut reader = Reader::from_str("<a><b></b>");
        let start = match reader.read_event().unwrap() {
            Event::Start(e) => e.into_owned(),
            other => panic!("unexpected {:?}", other),
        };
        assert!(collect_subtree(&mut reader, start).is_err());
    }
}
