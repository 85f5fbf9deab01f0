//! PPTX package handling: open a deck, then save it with corrected text.

use deckfix_core::{Error, Presentation, PresentationFormat, Result};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::rewrite::rewrite_slide;
use crate::slide::parse_slide;
use crate::xml::{attribute, local_name};

const PRESENTATION_PART: &str = "ppt/presentation.xml";
const PRESENTATION_RELS: &str = "ppt/_rels/presentation.xml.rels";

/// Largest uncompressed size accepted for a single package part.
const MAX_PART_SIZE: u64 = 512 * 1024 * 1024;

/// One file inside the package, in archive order.
#[derive(Debug, Clone)]
struct PackageEntry {
    name: String,
    is_dir: bool,
    data: Vec<u8>,
}

/// A PPTX deck held in memory.
///
/// Shapes are exposed through [`PptxDocument::presentation_mut`]; saving
/// rewrites only the slides whose text frames were changed and copies every
/// other package part back unchanged.
#[derive(Debug, Clone)]
pub struct PptxDocument {
    entries: Vec<PackageEntry>,
    presentation: Presentation,
}

impl PptxDocument {
    /// Open a deck from disk.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let filename = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("presentation.pptx");
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file), filename)
    }

    /// Read a deck from any seekable reader.
    pub fn from_reader<R: Read + Seek>(mut reader: R, filename: &str) -> Result<Self> {
        let mut magic = [0u8; 8];
        let read = read_prefix(&mut reader, &mut magic)?;
        reader.rewind()?;

        match PresentationFormat::from_magic(&magic[..read]) {
            Some(PresentationFormat::Pptx) => {}
            Some(PresentationFormat::Ppt) => {
                return Err(Error::UnsupportedFormat(
                    "legacy .ppt decks cannot be edited; save the file as .pptx".to_string(),
                ));
            }
            None => {
                return Err(Error::UnsupportedFormat(format!(
                    "'{}' is not a PPTX file",
                    filename
                )));
            }
        }

        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;
        let entries = read_entries(&mut archive)?;

        let mut document = Self {
            entries,
            presentation: Presentation::new(filename, PresentationFormat::Pptx),
        };

        let slide_order = document.slide_order()?;
        for (idx, part) in slide_order.iter().enumerate() {
            let xml = document.part_text(part)?;
            let slide = parse_slide(&xml, idx + 1, part)?;
            document.presentation.add_slide(slide);
        }

        log::debug!(
            "Opened '{}': {} parts, {} slides",
            filename,
            document.entries.len(),
            document.presentation.slides.len()
        );

        Ok(document)
    }

    pub fn presentation(&self) -> &Presentation {
        &self.presentation
    }

    pub fn presentation_mut(&mut self) -> &mut Presentation {
        &mut self.presentation
    }

    /// Serialize the package into a writer.
    pub fn write_to<W: Write + Seek>(&self, writer: W) -> Result<W> {
        let rewritten = self.rewritten_slides()?;

        let mut zip = ZipWriter::new(writer);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for entry in &self.entries {
            if entry.is_dir {
                zip.add_directory(entry.name.as_str(), options)
                    .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", entry.name, e)))?;
                continue;
            }

            zip.start_file(entry.name.as_str(), options)
                .map_err(|e| Error::ZipError(format!("Failed to add '{}': {}", entry.name, e)))?;
            let data = rewritten
                .get(entry.name.as_str())
                .map(|xml| xml.as_bytes())
                .unwrap_or(entry.data.as_slice());
            zip.write_all(data)?;
        }

        zip.finish()
            .map_err(|e| Error::ZipError(format!("Failed to finish archive: {}", e)))
    }

    /// Serialize the package to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.write_to(Cursor::new(Vec::new()))?.into_inner())
    }

    /// Save to `path`, replacing any existing file in one rename.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };

        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        self.write_to(staged.as_file_mut())?;
        staged.as_file().sync_all()?;
        staged.persist(path).map_err(|e| Error::IoError(e.error))?;

        log::debug!("Saved '{}'", path.display());
        Ok(())
    }

    /// New XML for every slide that has edited text frames.
    fn rewritten_slides(&self) -> Result<HashMap<&str, String>> {
        let mut rewritten = HashMap::new();

        for slide in self.presentation.slides.iter().filter(|s| s.is_modified()) {
            let replacements: Vec<Option<&str>> = slide
                .shapes
                .iter()
                .map(|shape| {
                    shape
                        .text_frame()
                        .filter(|frame| frame.is_modified())
                        .map(|frame| frame.text())
                })
                .collect();

            let xml = self.part_text(&slide.part)?;
            rewritten.insert(slide.part.as_str(), rewrite_slide(&xml, &replacements)?);
        }

        Ok(rewritten)
    }

    /// Slide parts in presentation order.
    ///
    /// Uses `p:sldIdLst` when present and falls back to ordering slide
    /// relationships by number.
    fn slide_order(&self) -> Result<Vec<String>> {
        let rels = self.part_text(PRESENTATION_RELS)?;
        let targets = slide_relationships(&rels)?;

        let presentation = self.part_text(PRESENTATION_PART)?;
        let listed = listed_slide_ids(&presentation)?;

        let order: Vec<String> = if listed.is_empty() {
            let mut slides: Vec<(String, Option<usize>)> = targets
                .into_values()
                .map(|target| {
                    let number = extract_slide_number(&target);
                    (target, number)
                })
                .collect();
            slides.sort_by(|a, b| match (a.1, b.1) {
                (Some(na), Some(nb)) => na.cmp(&nb),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => a.0.cmp(&b.0),
            });
            slides.into_iter().map(|(path, _)| path).collect()
        } else {
            listed
                .iter()
                .map(|id| {
                    targets.get(id).cloned().ok_or_else(|| {
                        Error::PptxParseError(format!("Slide relationship '{}' is missing", id))
                    })
                })
                .collect::<Result<_>>()?
        };

        for part in &order {
            if self.entry(part).is_none() {
                return Err(Error::CorruptedFile(format!("Slide part '{}' is missing", part)));
            }
        }

        Ok(order)
    }

    fn entry(&self, name: &str) -> Option<&PackageEntry> {
        self.entries.iter().find(|e| !e.is_dir && e.name == name)
    }

    /// Read a package part as UTF-8 text.
    fn part_text(&self, name: &str) -> Result<String> {
        let entry = self.entry(name).ok_or_else(|| {
            Error::PptxParseError(format!("File not found in archive '{}'", name))
        })?;
        String::from_utf8(entry.data.clone())
            .map_err(|e| Error::CorruptedFile(format!("'{}' is not UTF-8: {}", name, e)))
    }
}

/// Fill as much of `buf` as the reader allows.
fn read_prefix<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..])? {
            0 => break,
            n => filled += n,
        }
    }
    Ok(filled)
}

/// Read at most `limit` bytes, or `None` if the reader has more.
fn read_limited<R: Read>(reader: &mut R, limit: u64) -> std::io::Result<Option<Vec<u8>>> {
    let mut data = Vec::new();
    reader.take(limit + 1).read_to_end(&mut data)?;
    Ok((data.len() as u64 <= limit).then_some(data))
}

fn read_entries<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<Vec<PackageEntry>> {
    let mut entries = Vec::with_capacity(archive.len());

    for idx in 0..archive.len() {
        let mut file = archive
            .by_index(idx)
            .map_err(|e| Error::ZipError(format!("Failed to read entry {}: {}", idx, e)))?;

        let name = file.name().to_string();
        if file.size() > MAX_PART_SIZE {
            return Err(Error::CorruptedFile(format!(
                "'{}' claims {} bytes, more than the {} allowed",
                name,
                file.size(),
                MAX_PART_SIZE
            )));
        }

        // The declared size is not trusted beyond the check above.
        let data = read_limited(&mut file, MAX_PART_SIZE)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", name, e)))?
            .ok_or_else(|| {
                Error::CorruptedFile(format!("'{}' inflates past {} bytes", name, MAX_PART_SIZE))
            })?;

        entries.push(PackageEntry {
            name,
            is_dir: file.is_dir(),
            data,
        });
    }

    Ok(entries)
}

/// Map relationship id to package path for every slide relationship.
fn slide_relationships(rels: &str) -> Result<HashMap<String, String>> {
    let mut slides = HashMap::new();
    let mut reader = Reader::from_str(rels);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"Relationship" =>
            {
                let rel_type = attribute(e, b"Type").unwrap_or_default();
                let target = attribute(e, b"Target").unwrap_or_default();
                let id = attribute(e, b"Id").unwrap_or_default();

                if rel_type.ends_with("/slide") {
                    slides.insert(id, resolve_target("ppt", &target));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing relationships: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(slides)
}

/// Relationship ids listed in `p:sldIdLst`, in order.
fn listed_slide_ids(presentation: &str) -> Result<Vec<String>> {
    let mut ids = Vec::new();
    let mut reader = Reader::from_str(presentation);

    loop {
        match reader.read_event() {
            Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                if local_name(e.name().as_ref()) == b"sldId" =>
            {
                let rel_id = e
                    .attributes()
                    .flatten()
                    .find(|attr| attr.key.as_ref().ends_with(b":id"))
                    .map(|attr| String::from_utf8_lossy(&attr.value).to_string());
                if let Some(rel_id) = rel_id {
                    ids.push(rel_id);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!(
                    "Error parsing presentation: {}",
                    e
                )));
            }
            _ => {}
        }
    }

    Ok(ids)
}

/// Resolve a relationship target against the directory of its source part.
fn resolve_target(base_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }

    let mut parts: Vec<&str> = base_dir.split('/').filter(|p| !p.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            other => parts.push(other),
        }
    }
    parts.join("/")
}

/// Extract a slide number from a string like "slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml").trim_end_matches(".rels");

    let digits: String = s.chars().rev().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return None;
    }
    let digits: String = digits.chars().rev().collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{DeckFixture, FixtureShape};

    #[test]
    fn test_extract_slide_number() {
        assert_eq!(extract_slide_number("slide1.xml"), Some(1));
        assert_eq!(extract_slide_number("ppt/slides/slide123.xml"), Some(123));
        assert_eq!(extract_slide_number("nodigits"), None);
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("ppt", "slides/slide1.xml"), "ppt/slides/slide1.xml");
        assert_eq!(resolve_target("ppt", "/ppt/slides/slide2.xml"), "ppt/slides/slide2.xml");
        assert_eq!(resolve_target("ppt/slides", "../media/image1.png"), "ppt/media/image1.png");
    }

    #[test]
    fn test_listed_slide_ids_ignores_numeric_id() {
        let xml = r#"<p:presentation xmlns:p="p" xmlns:r="r"><p:sldIdLst><p:sldId id="257" r:id="rId3"/><p:sldId id="256" r:id="rId2"/></p:sldIdLst></p:presentation>"#;
        assert_eq!(listed_slide_ids(xml).unwrap(), vec!["rId3", "rId2"]);
    }

    #[test]
    fn test_slide_relationships_skip_layouts() {
        let xml = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideMaster" Target="slideMasters/slideMaster1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slide" Target="slides/slide1.xml"/></Relationships>"#;
        let rels = slide_relationships(xml).unwrap();
        assert_eq!(rels.len(), 1);
        assert_eq!(rels["rId2"], "ppt/slides/slide1.xml");
    }

    #[test]
    fn test_plain_text_is_rejected() {
        let err = PptxDocument::from_reader(Cursor::new(b"just some notes".to_vec()), "notes.txt")
            .unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_legacy_ppt_is_rejected() {
        let mut bytes = vec![0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];
        bytes.extend_from_slice(&[0u8; 64]);
        let err = PptxDocument::from_reader(Cursor::new(bytes), "old.ppt").unwrap_err();
        assert!(err.to_string().contains("legacy"));
    }

    fn sample_deck() -> Vec<u8> {
        DeckFixture::new()
            .slide(vec![
                FixtureShape::text("Title 1", "Teh quarterly report"),
                FixtureShape::picture("Logo"),
                FixtureShape::text("Body 2", "Revenue grew\nCosts fell"),
            ])
            .slide(vec![
                FixtureShape::chart("Chart 1"),
                FixtureShape::bare("Divider"),
                FixtureShape::text("Notes", "All good"),
            ])
            .build()
    }

    fn entry_bytes(bytes: &[u8], name: &str) -> Vec<u8> {
        let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut file = archive.by_name(name).unwrap();
        let mut data = Vec::new();
        file.read_to_end(&mut data).unwrap();
        data
    }

    #[test]
    fn test_open_reads_slides_in_order() {
        let doc = PptxDocument::from_reader(Cursor::new(sample_deck()), "q3.pptx").unwrap();
        let presentation = doc.presentation();

        assert_eq!(presentation.filename, "q3.pptx");
        assert_eq!(presentation.slides.len(), 2);
        assert_eq!(presentation.slides[0].part, "ppt/slides/slide1.xml");

        let texts: Vec<&str> = presentation.text_frames().map(|f| f.text()).collect();
        assert_eq!(
            texts,
            vec!["Teh quarterly report", "Revenue grew\nCosts fell", "All good"]
        );
        assert_eq!(presentation.slides[1].shapes[0].kind.label(), "chart");
    }

    #[test]
    fn test_unmodified_deck_keeps_every_part() {
        let bytes = sample_deck();
        let doc = PptxDocument::from_reader(Cursor::new(bytes.clone()), "q3.pptx").unwrap();
        let saved = doc.to_bytes().unwrap();

        for name in [
            "[Content_Types].xml",
            "ppt/presentation.xml",
            "ppt/slides/slide1.xml",
            "ppt/slides/slide2.xml",
        ] {
            assert_eq!(entry_bytes(&saved, name), entry_bytes(&bytes, name), "{}", name);
        }
    }

    #[test]
    fn test_edit_survives_save_and_reopen() {
        let bytes = sample_deck();
        let mut doc = PptxDocument::from_reader(Cursor::new(bytes.clone()), "q3.pptx").unwrap();
        doc.presentation_mut().slides[0].shapes[0]
            .text_frame_mut()
            .unwrap()
            .set_text("The quarterly report");

        let saved = doc.to_bytes().unwrap();
        let reopened = PptxDocument::from_reader(Cursor::new(saved.clone()), "q3.pptx").unwrap();

        let texts: Vec<&str> = reopened.presentation().text_frames().map(|f| f.text()).collect();
        assert_eq!(
            texts,
            vec!["The quarterly report", "Revenue grew\nCosts fell", "All good"]
        );
        assert_eq!(
            entry_bytes(&saved, "ppt/slides/slide2.xml"),
            entry_bytes(&bytes, "ppt/slides/slide2.xml")
        );
    }

    #[test]
    fn test_save_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corrected_q3.pptx");
        std::fs::write(&path, b"stale").unwrap();

        let doc = PptxDocument::from_reader(Cursor::new(sample_deck()), "q3.pptx").unwrap();
        doc.save(&path).unwrap();

        let reopened = PptxDocument::open(&path).unwrap();
        assert_eq!(reopened.presentation().slides.len(), 2);
        assert_eq!(reopened.presentation().filename, "corrected_q3.pptx");
    }

    #[test]
    fn test_zip_without_presentation_is_rejected() {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        zip.start_file("word/document.xml", FileOptions::default()).unwrap();
        zip.write_all(b"<w:document/>").unwrap();
        let bytes = zip.finish().unwrap().into_inner();

        let err = PptxDocument::from_reader(Cursor::new(bytes), "letter.docx").unwrap_err();
        assert!(matches!(err, Error::PptxParseError(_)));
    }

    #[test]
    fn test_read_limited() {
        assert_eq!(read_limited(&mut &b"abcd"[..], 4).unwrap(), Some(b"abcd".to_vec()));
        assert_eq!(read_limited(&mut &b"abcde"[..], 4).unwrap(), None);
    }

    /// Re-pack `bytes` so the first entry's central record claims `claimed`
    /// uncompressed bytes through a zip64 extra field.
    fn with_claimed_size(bytes: &[u8], claimed: u64) -> Vec<u8> {
        let mut source = ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));

        for idx in 0..source.len() {
            let mut file = source.by_index(idx).unwrap();
            let mut data = Vec::new();
            file.read_to_end(&mut data).unwrap();

            if idx == 0 {
                zip.start_file_with_extra_data(file.name(), FileOptions::default())
                    .unwrap();
                zip.end_local_start_central_extra_data().unwrap();
                // The writer refuses a zip64 tag, so it is patched in below.
                zip.write_all(&0x7a7au16.to_le_bytes()).unwrap();
                zip.write_all(&8u16.to_le_bytes()).unwrap();
                zip.write_all(&claimed.to_le_bytes()).unwrap();
                zip.end_extra_data().unwrap();
            } else {
                zip.start_file(file.name(), FileOptions::default()).unwrap();
            }
            zip.write_all(&data).unwrap();
        }
        let mut out = zip.finish().unwrap().into_inner();

        let eocd = out
            .windows(4)
            .rposition(|w| w == [0x50, 0x4b, 0x05, 0x06])
            .unwrap();
        let header = u32::from_le_bytes(out[eocd + 16..eocd + 20].try_into().unwrap()) as usize;
        let name_len = u16::from_le_bytes([out[header + 28], out[header + 29]]) as usize;
        out[header + 24..header + 28].copy_from_slice(&u32::MAX.to_le_bytes());
        let extra = header + 46 + name_len;
        out[extra..extra + 2].copy_from_slice(&1u16.to_le_bytes());
        out
    }

    #[test]
    fn test_huge_claimed_part_size_is_rejected() {
        let bytes = with_claimed_size(&sample_deck(), 1 << 40);
        let err = PptxDocument::from_reader(Cursor::new(bytes), "crafted.pptx").unwrap_err();
        assert!(matches!(err, Error::CorruptedFile(_)));
    }

    #[test]
    fn test_truthful_zip64_size_still_opens() {
        let deck = sample_deck();
        let actual = entry_bytes(&deck, "[Content_Types].xml").len() as u64;
        let bytes = with_claimed_size(&deck, actual);

        let doc = PptxDocument::from_reader(Cursor::new(bytes), "zip64.pptx").unwrap();
        assert_eq!(doc.presentation().slides.len(), 2);
    }

    #[test]
    fn test_slide_list_order_wins_over_part_numbers() {
        let deck = DeckFixture::new()
            .text_slide(&["first part"])
            .text_slide(&["second part"])
            .text_slide(&["third part"])
            .listed_in(&[3, 1, 2])
            .build();
        let doc = PptxDocument::from_reader(Cursor::new(deck), "shuffled.pptx").unwrap();
        let slides = &doc.presentation().slides;

        let parts: Vec<&str> = slides.iter().map(|s| s.part.as_str()).collect();
        assert_eq!(
            parts,
            vec![
                "ppt/slides/slide3.xml",
                "ppt/slides/slide1.xml",
                "ppt/slides/slide2.xml"
            ]
        );
        let numbers: Vec<usize> = slides.iter().map(|s| s.number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        let texts: Vec<&str> = doc.presentation().text_frames().map(|f| f.text()).collect();
        assert_eq!(texts, vec!["third part", "first part", "second part"]);
    }

    #[test]
    fn test_missing_slide_list_falls_back_to_part_numbers() {
        let labels: Vec<String> = (1..=11).map(|n| format!("slide {}", n)).collect();
        let deck = labels
            .iter()
            .fold(DeckFixture::new(), |deck, label| deck.text_slide(&[label.as_str()]))
            .without_slide_list()
            .build();
        let doc = PptxDocument::from_reader(Cursor::new(deck), "unlisted.pptx").unwrap();

        let texts: Vec<&str> = doc.presentation().text_frames().map(|f| f.text()).collect();
        assert_eq!(texts, labels.iter().map(String::as_str).collect::<Vec<_>>());
        assert_eq!(doc.presentation().slides[10].part, "ppt/slides/slide11.xml");
    }
}
