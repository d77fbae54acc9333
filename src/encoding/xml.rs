//! XML codec.
//!
//! # Mapping
//! - The document element is the tree root; its name is dropped
//! - Child elements become keys; repeated siblings become a sequence
//! - Attributes become keys on their element
//! - Text-only elements become scalars (with the same inference as env lines)

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde_json::Value as Node;

use crate::encoding::{infer_scalar, Codec};
use crate::reader::tree::Tree;

/// Key used for text that sits next to child elements.
const TEXT_KEY: &str = "#text";

pub struct XmlCodec;

struct Frame {
    name: String,
    children: Tree,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Result<Self, String> {
        let mut children = Tree::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| e.to_string())?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value().map_err(|e| e.to_string())?;
            children.insert(key, infer_scalar(&value));
        }
        Ok(Self {
            name: String::from_utf8_lossy(start.name().as_ref()).into_owned(),
            children,
            text: String::new(),
        })
    }

    fn close(self) -> Node {
        if self.children.is_empty() {
            return infer_scalar(self.text.trim());
        }
        let mut children = self.children;
        let text = self.text.trim();
        if !text.is_empty() {
            children.insert(TEXT_KEY.to_string(), Node::String(text.to_string()));
        }
        Node::Object(children)
    }
}

fn attach(parent: &mut Tree, key: String, node: Node) {
    match parent.get_mut(&key) {
        Some(Node::Array(items)) => items.push(node),
        Some(existing) => {
            let first = existing.take();
            *existing = Node::Array(vec![first, node]);
        }
        None => {
            parent.insert(key, node);
        }
    }
}

impl Codec for XmlCodec {
    fn decode(&self, data: &[u8]) -> Result<Tree, String> {
        let mut reader = Reader::from_reader(data);
        reader.trim_text(true);

        let mut stack: Vec<Frame> = Vec::new();
        let mut root: Option<Tree> = None;
        let mut buf = Vec::new();

        loop {
            let event = reader
                .read_event_into(&mut buf)
                .map_err(|e| format!("error at position {}: {}", reader.buffer_position(), e))?;

            match event {
                Event::Start(start) => stack.push(Frame::open(&start)?),
                Event::Empty(start) => {
                    let frame = Frame::open(&start)?;
                    finish(frame, &mut stack, &mut root);
                }
                Event::Text(text) => {
                    if let Some(frame) = stack.last_mut() {
                        frame.text.push_str(&text.unescape().map_err(|e| e.to_string())?);
                    }
                }
                Event::CData(cdata) => {
                    if let Some(frame) = stack.last_mut() {
                        frame.text.push_str(&String::from_utf8_lossy(&cdata.into_inner()));
                    }
                }
                Event::End(_) => {
                    let frame = stack.pop().ok_or("unbalanced closing tag")?;
                    finish(frame, &mut stack, &mut root);
                }
                Event::Eof => break,
                _ => {}
            }
            buf.clear();
        }

        if !stack.is_empty() {
            return Err("unexpected end of document".to_string());
        }
        Ok(root.unwrap_or_default())
    }
}

fn finish(frame: Frame, stack: &mut [Frame], root: &mut Option<Tree>) {
    match stack.last_mut() {
        Some(parent) => {
            let name = frame.name.clone();
            attach(&mut parent.children, name, frame.close());
        }
        None => {
            if root.is_none() {
                *root = Some(frame.children);
            }
        }
    }
}
