//! Codec for the two persisted XML document shapes: the flat result list
//! (`decRecogResult`) produced by decoder runs and written as diff reports,
//! and the grouped cache (`decRecogCache`). Tag names, attribute semantics,
//! and element-vs-attribute placement are fixed by existing files.

use anyhow::{bail, Context};
use hark_core::{UtterResult, UtterResultGroup};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::path::Path;

const RESULT_ROOT: &str = "decRecogResult";
const CACHE_ROOT: &str = "decRecogCache";
const UTTER_TAG: &str = "utter";
const GROUP_TAG: &str = "utterGroup";
const REL_WAV_PATH_ATTR: &str = "relWavPath";

/// Read a flat result document into records, in document order.
pub fn read_result_doc(path: &Path) -> anyhow::Result<Vec<UtterResult>> {
    let xml = std::fs::read_to_string(path)
        .with_context(|| format!("reading result document {}", path.display()))?;
    parse_result_doc(&xml)
        .with_context(|| format!("parsing result document {}", path.display()))
}

/// Read a grouped cache document into groups, in document order.
pub fn read_cache_doc(path: &Path) -> anyhow::Result<Vec<UtterResultGroup>> {
    let xml = std::fs::read_to_string(path)
        .with_context(|| format!("reading cache document {}", path.display()))?;
    parse_cache_doc(&xml)
        .with_context(|| format!("parsing cache document {}", path.display()))
}

pub fn parse_result_doc(xml: &str) -> anyhow::Result<Vec<UtterResult>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut items = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == UTTER_TAG.as_bytes() => {
                items.push(read_utter(&mut reader, &e, false)?);
            }
            Event::Empty(e) if e.name().as_ref() == UTTER_TAG.as_bytes() => {
                items.push(read_utter(&mut reader, &e, true)?);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(items)
}

pub fn parse_cache_doc(xml: &str) -> anyhow::Result<Vec<UtterResultGroup>> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut groups = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == GROUP_TAG.as_bytes() => {
                groups.push(read_group(&mut reader, &e)?);
            }
            Event::Empty(e) if e.name().as_ref() == GROUP_TAG.as_bytes() => {
                let rel = required_rel_wav_path(&e, GROUP_TAG)?;
                groups.push(UtterResultGroup::new(rel));
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(groups)
}

/// Render records as a flat result document: UTF-8, XML declaration,
/// 2-space indentation, one `<utter>` per record.
pub fn render_result_doc(items: &[UtterResult]) -> anyhow::Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new(RESULT_ROOT)))?;
    for item in items {
        write_utter(&mut writer, item)?;
    }
    writer.write_event(Event::End(BytesEnd::new(RESULT_ROOT)))?;
    finish(writer)
}

/// Render groups as a grouped cache document.
pub fn render_cache_doc(groups: &[UtterResultGroup]) -> anyhow::Result<String> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("utf-8"), None)))?;
    writer.write_event(Event::Start(BytesStart::new(CACHE_ROOT)))?;
    for group in groups {
        let mut start = BytesStart::new(GROUP_TAG);
        start.push_attribute((REL_WAV_PATH_ATTR, group.rel_wav_path.as_str()));
        if group.instances.is_empty() {
            writer.write_event(Event::Empty(start))?;
            continue;
        }
        writer.write_event(Event::Start(start))?;
        for instance in &group.instances {
            write_utter(&mut writer, instance)?;
        }
        writer.write_event(Event::End(BytesEnd::new(GROUP_TAG)))?;
    }
    writer.write_event(Event::End(BytesEnd::new(CACHE_ROOT)))?;
    finish(writer)
}

fn finish(writer: Writer<Vec<u8>>) -> anyhow::Result<String> {
    let mut out = writer.into_inner();
    out.push(b'\n');
    String::from_utf8(out).context("rendered XML is not valid UTF-8")
}

fn required_rel_wav_path(start: &BytesStart, tag: &str) -> anyhow::Result<String> {
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == REL_WAV_PATH_ATTR.as_bytes() {
            return Ok(attr.unescape_value()?.into_owned());
        }
    }
    bail!("<{tag}> element is missing the {REL_WAV_PATH_ATTR} attribute");
}

/// Parse one `<utter>` element. `relWavPath` is the required identity
/// attribute; every other attribute lands in `attributes` in document order,
/// every child element becomes one `sub_elements` entry keyed by tag name.
fn read_utter(
    reader: &mut Reader<&[u8]>,
    start: &BytesStart,
    empty: bool,
) -> anyhow::Result<UtterResult> {
    let mut item = UtterResult::default();
    for attr in start.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())
            .context("attribute name is not valid UTF-8")?
            .to_string();
        let value = attr.unescape_value()?.into_owned();
        if key == REL_WAV_PATH_ATTR {
            item.rel_wav_path = value;
        } else {
            item.attributes.push((key, value));
        }
    }
    if item.rel_wav_path.is_empty() {
        bail!("<{UTTER_TAG}> element is missing the {REL_WAV_PATH_ATTR} attribute");
    }
    if empty {
        return Ok(item);
    }

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let key = std::str::from_utf8(e.name().as_ref())
                    .context("element name is not valid UTF-8")?
                    .to_string();
                let value = read_element_text(reader)?;
                item.sub_elements.push((key, value));
            }
            Event::Empty(e) => {
                let key = std::str::from_utf8(e.name().as_ref())
                    .context("element name is not valid UTF-8")?
                    .to_string();
                item.sub_elements.push((key, String::new()));
            }
            Event::End(e) if e.name().as_ref() == UTTER_TAG.as_bytes() => break,
            Event::Eof => bail!("unexpected end of document inside <{UTTER_TAG}>"),
            _ => {}
        }
    }
    Ok(item)
}

fn read_group(reader: &mut Reader<&[u8]>, start: &BytesStart) -> anyhow::Result<UtterResultGroup> {
    let mut group = UtterResultGroup::new(required_rel_wav_path(start, GROUP_TAG)?);
    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == UTTER_TAG.as_bytes() => {
                group.instances.push(read_utter(reader, &e, false)?);
            }
            Event::Empty(e) if e.name().as_ref() == UTTER_TAG.as_bytes() => {
                group.instances.push(read_utter(reader, &e, true)?);
            }
            Event::End(e) if e.name().as_ref() == GROUP_TAG.as_bytes() => break,
            Event::Eof => bail!("unexpected end of document inside <{GROUP_TAG}>"),
            _ => {}
        }
    }
    Ok(group)
}

/// Text content of a leaf element, up to its end tag.
fn read_element_text(reader: &mut Reader<&[u8]>) -> anyhow::Result<String> {
    let mut text = String::new();
    loop {
        match reader.read_event()? {
            Event::Text(t) => text.push_str(&t.unescape()?),
            Event::CData(t) => {
                text.push_str(std::str::from_utf8(&t.into_inner()).context("CDATA is not UTF-8")?)
            }
            Event::End(_) => return Ok(text),
            Event::Eof => bail!("unexpected end of document inside an element"),
            _ => {}
        }
    }
}

fn write_utter<W: std::io::Write>(
    writer: &mut Writer<W>,
    item: &UtterResult,
) -> anyhow::Result<()> {
    let mut start = BytesStart::new(UTTER_TAG);
    start.push_attribute((REL_WAV_PATH_ATTR, item.rel_wav_path.as_str()));
    for (k, v) in &item.attributes {
        start.push_attribute((k.as_str(), v.as_str()));
    }
    if item.sub_elements.is_empty() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }
    writer.write_event(Event::Start(start))?;
    for (k, v) in &item.sub_elements {
        writer.write_event(Event::Start(BytesStart::new(k.as_str())))?;
        writer.write_event(Event::Text(BytesText::new(v)))?;
        writer.write_event(Event::End(BytesEnd::new(k.as_str())))?;
    }
    writer.write_event(Event::End(BytesEnd::new(UTTER_TAG)))?;
    Ok(())
}
