//! JSON-lines landmark stream.
//!
//! One event per line:
//!
//! ```text
//! {"width": 640, "height": 480, "landmarks": [[0.51, 0.43, -0.02], ...]}
//! {"width": 640, "height": 480, "landmarks": null}
//! {"control": "left"}
//! ```
//!
//! Landmarks may be `[x, y]` pairs, in which case depth is zero. Control
//! values are `left`, `right`, `up`, `center` and `release`.

use crate::{
    arbiter::{ControlInput, ManualDirection},
    landmarks::{Landmark, LandmarkSet},
    Error, Result,
};
use serde::Deserialize;
use std::io::BufRead;

/// One landmark frame
#[derive(Debug, Clone, PartialEq)]
pub struct FrameInput {
    /// Frame width in pixels
    pub width: i32,
    /// Frame height in pixels
    pub height: i32,
    /// Detector output, `None` when no face was found
    pub landmarks: Option<LandmarkSet>,
}

/// Event read from the stream
#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Landmarks for a frame
    Frame(FrameInput),
    /// Operator input
    Control(ControlInput),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ControlName {
    Left,
    Right,
    Up,
    Center,
    Release,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawEvent {
    Control {
        control: ControlName,
    },
    Frame {
        width: i32,
        height: i32,
        #[serde(default)]
        landmarks: Option<Vec<Vec<f64>>>,
    },
}

fn to_landmark(values: &[f64], line: usize, index: usize) -> Result<Landmark> {
    match *values {
        [x, y] => Ok(Landmark::new(x, y, 0.0)),
        [x, y, z] => Ok(Landmark::new(x, y, z)),
        _ => Err(Error::InvalidInput(format!(
            "line {line}: landmark {index} has {} values, expected 2 or 3",
            values.len()
        ))),
    }
}

/// Parse one non-blank line
///
/// # Errors
///
/// Returns `Error::InvalidInput` naming the line if it is not a valid event
pub fn parse_event(text: &str, line: usize) -> Result<InputEvent> {
    let raw: RawEvent =
        serde_json::from_str(text).map_err(|e| Error::InvalidInput(format!("line {line}: {e}")))?;

    Ok(match raw {
        RawEvent::Control { control } => InputEvent::Control(match control {
            ControlName::Left => ControlInput::Manual(ManualDirection::Left),
            ControlName::Right => ControlInput::Manual(ManualDirection::Right),
            ControlName::Up => ControlInput::Manual(ManualDirection::Up),
            ControlName::Center => ControlInput::Manual(ManualDirection::Center),
            ControlName::Release => ControlInput::Release,
        }),
        RawEvent::Frame {
            width,
            height,
            landmarks,
        } => {
            let landmarks = landmarks
                .map(|points| {
                    points
                        .iter()
                        .enumerate()
                        .map(|(i, values)| to_landmark(values, line, i))
                        .collect::<Result<LandmarkSet>>()
                })
                .transpose()?;
            InputEvent::Frame(FrameInput {
                width,
                height,
                landmarks,
            })
        }
    })
}

/// Iterator over the events of a JSON-lines reader
pub struct EventSource<R> {
    reader: R,
    line: usize,
    buffer: String,
}

impl<R: BufRead> EventSource<R> {
    /// Wrap a reader
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buffer: String::new(),
        }
    }
}

impl<R: BufRead> Iterator for EventSource<R> {
    type Item = Result<InputEvent>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buffer.clear();
            match self.reader.read_line(&mut self.buffer) {
                Ok(0) => return None,
                Ok(_) => {
                    self.line += 1;
                    let text = self.buffer.trim();
                    if text.is_empty() {
                        continue;
                    }
                    return Some(parse_event(text, self.line));
                }
                Err(e) => return Some(Err(Error::Io(e))),
            }
        }
    }
}
