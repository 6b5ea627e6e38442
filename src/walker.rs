//! Streaming, forward-only traversal of an XML document.
//!
//! The walker never builds a tree and never collects an element's children.
//! It keeps one small frame per open element (name and leading text) and
//! reports each direct child to its parent the moment the child closes, so
//! memory is bounded by nesting depth whatever the width of the document.

use crate::error::{Result, XmlMeltError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// A direct child of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Child {
    /// Local name, namespace prefix stripped
    pub name: String,

    /// Character data before the child's first sub-element, if any
    pub text: Option<String>,
}

/// One traversal step, in document order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkEvent {
    /// Start tag of an element (local name)
    Start { name: String },

    /// A direct child of the innermost open element has closed
    Child { parent: String, child: Child },

    /// End tag of an element. Emitted before the element is reported to its
    /// parent as a `Child`.
    End { name: String },
}

/// An element that is still open
#[derive(Debug)]
struct Frame {
    name: String,
    text: Option<String>,
    seen_child: bool,
}

impl Frame {
    fn push_text(&mut self, chunk: &str) {
        // Text after the first child element is tail text, not ours.
        if self.seen_child {
            return;
        }
        self.text.get_or_insert_with(String::new).push_str(chunk);
    }
}

/// Lazy iterator over the traversal events of an XML document.
///
/// Yields `Err` at most once, after which the iterator is exhausted.
pub struct XmlWalker<R: BufRead> {
    reader: Reader<R>,
    buf: Vec<u8>,
    stack: Vec<Frame>,
    pending: VecDeque<WalkEvent>,
    seen_root: bool,
    finished: bool,
}

impl XmlWalker<BufReader<File>> {
    /// Open a document on disk
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(&path).map_err(|e| XmlMeltError::io(&path, e))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> XmlWalker<R> {
    pub fn new(source: R) -> Self {
        let mut reader = Reader::from_reader(source);
        reader.config_mut().trim_text(false);

        XmlWalker {
            reader,
            buf: Vec::new(),
            stack: Vec::new(),
            pending: VecDeque::new(),
            seen_root: false,
            finished: false,
        }
    }

    /// Number of currently open elements
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn position(&self) -> u64 {
        self.reader.buffer_position() as u64
    }

    fn parse_error(&self, message: impl Into<String>) -> XmlMeltError {
        XmlMeltError::parse(self.position(), message)
    }

    fn local_name(&self, start: &BytesStart<'_>) -> Result<String> {
        String::from_utf8(start.local_name().as_ref().to_vec())
            .map_err(|e| self.parse_error(format!("invalid element name: {}", e)))
    }

    fn open_frame(&mut self, name: &str) -> Result<()> {
        if self.stack.is_empty() {
            if self.seen_root {
                return Err(self.parse_error(format!(
                    "extra content after the root element: <{}>",
                    name
                )));
            }
            self.seen_root = true;
        }
        if let Some(parent) = self.stack.last_mut() {
            parent.seen_child = true;
        }

        self.stack.push(Frame {
            name: name.to_string(),
            text: None,
            seen_child: false,
        });
        Ok(())
    }

    /// Pop the innermost frame, queueing its `End` and then the `Child`
    /// report for its parent
    fn close_frame(&mut self) -> Result<()> {
        let frame = self
            .stack
            .pop()
            .ok_or_else(|| self.parse_error("end tag without a matching start tag"))?;

        self.pending.push_back(WalkEvent::End {
            name: frame.name.clone(),
        });
        if let Some(parent) = self.stack.last() {
            self.pending.push_back(WalkEvent::Child {
                parent: parent.name.clone(),
                child: Child {
                    name: frame.name,
                    text: frame.text,
                },
            });
        }
        Ok(())
    }

    /// Character data outside the root element must be whitespace
    fn outside_root(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            Ok(())
        } else {
            Err(self.parse_error("character data outside the root element"))
        }
    }

    fn next_event(&mut self) -> Result<Option<WalkEvent>> {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return Ok(Some(event));
            }

            self.buf.clear();
            let event = match self.reader.read_event_into(&mut self.buf) {
                Ok(event) => event.into_owned(),
                Err(e) => return Err(self.parse_error(e.to_string())),
            };

            match event {
                Event::Start(start) => {
                    let name = self.local_name(&start)?;
                    self.open_frame(&name)?;
                    return Ok(Some(WalkEvent::Start { name }));
                }
                Event::Empty(start) => {
                    let name = self.local_name(&start)?;
                    self.open_frame(&name)?;
                    self.close_frame()?;
                    return Ok(Some(WalkEvent::Start { name }));
                }
                Event::End(_) => self.close_frame()?,
                Event::Text(text) => {
                    let decoded = text
                        .unescape()
                        .map_err(|e| self.parse_error(e.to_string()))?
                        .into_owned();
                    match self.stack.last_mut() {
                        Some(frame) => frame.push_text(&decoded),
                        None => self.outside_root(&decoded)?,
                    }
                }
                Event::CData(data) => {
                    let decoded = String::from_utf8_lossy(&data).into_owned();
                    match self.stack.last_mut() {
                        Some(frame) => frame.push_text(&decoded),
                        None => {
                            return Err(self.parse_error("CDATA outside the root element"));
                        }
                    }
                }
                Event::Eof => {
                    if !self.stack.is_empty() {
                        return Err(self.parse_error(format!(
                            "unexpected end of document with {} unclosed element(s)",
                            self.stack.len()
                        )));
                    }
                    if !self.seen_root {
                        return Err(self.parse_error("document has no root element"));
                    }
                    return Ok(None);
                }
                _ => {}
            }
        }
    }
}

impl<R: BufRead> Iterator for XmlWalker<R> {
    type Item = Result<WalkEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_event() {
            Ok(Some(event)) => Some(Ok(event)),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
