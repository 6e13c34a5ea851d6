//! Display device (kind 0): a character-cell canvas that lives on the peer.
//!
//! The hub keeps no canvas.  It only knows the grid size the peer last
//! reported and clips every drawing command against it before sending, so the
//! peer never receives a command that reaches outside its grid.
//!
//! # Events
//!
//! | Id | Name   | Payload                 |
//! |----|--------|-------------------------|
//! | 0  | RESIZE | `width:u8, height:u8`   |
//!
//! # Commands
//!
//! | Id | Name           | Payload (u16 fields little-endian)            |
//! |----|----------------|-----------------------------------------------|
//! | 0  | SET_BACKGROUND | colour name bytes                             |
//! | 1  | SET_FOREGROUND | colour name bytes                             |
//! | 2  | CLEAR          | (empty)                                       |
//! | 3  | WRITE          | `x:u16, y:u16, text..`                        |
//! | 4  | WRITE_VERTICAL | `x:u16, y:u16, text..`                        |
//! | 5  | FILL           | `x:u16, y:u16, w:u16, h:u16, char..`          |
//! | 6  | COPY           | `x:u16, y:u16, w:u16, h:u16, tx:u16, ty:u16`  |
//!
//! # Clipping
//!
//! The command methods take signed coordinates so callers can draw shapes
//! that are partly off-screen.  The `*_command` planners on [`DisplaySize`]
//! decide what, if anything, is sent; a command that would draw nothing is
//! suppressed silently.

use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::device::{Device, DeviceContext, DeviceEvent};
use crate::protocol::codec::{read_u16_le, require_len, ProtocolError};
use crate::protocol::messages::{DeviceId, DeviceKind};

pub const EVENT_RESIZE: u8 = 0;

pub const CMD_SET_BACKGROUND: u8 = 0;
pub const CMD_SET_FOREGROUND: u8 = 1;
pub const CMD_CLEAR: u8 = 2;
pub const CMD_WRITE: u8 = 3;
pub const CMD_WRITE_VERTICAL: u8 = 4;
pub const CMD_FILL: u8 = 5;
pub const CMD_COPY: u8 = 6;

/// Notification raised by a display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayEvent {
    /// The peer's grid changed size; the stored size has already been updated.
    Resized { width: u16, height: u16 },
}

// ── Commands ──────────────────────────────────────────────────────────────────

/// A fully clipped display command, ready to encode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayCommand {
    SetBackground(String),
    SetForeground(String),
    Clear,
    Write { x: u16, y: u16, text: String },
    WriteVertical { x: u16, y: u16, text: String },
    Fill {
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        ch: char,
    },
    Copy {
        x: u16,
        y: u16,
        width: u16,
        height: u16,
        tx: u16,
        ty: u16,
    },
}

impl DisplayCommand {
    /// The command id placed in the COMMAND frame.
    pub fn id(&self) -> u8 {
        match self {
            DisplayCommand::SetBackground(_) => CMD_SET_BACKGROUND,
            DisplayCommand::SetForeground(_) => CMD_SET_FOREGROUND,
            DisplayCommand::Clear => CMD_CLEAR,
            DisplayCommand::Write { .. } => CMD_WRITE,
            DisplayCommand::WriteVertical { .. } => CMD_WRITE_VERTICAL,
            DisplayCommand::Fill { .. } => CMD_FILL,
            DisplayCommand::Copy { .. } => CMD_COPY,
        }
    }

    /// Encodes the command payload (everything after the command id).
    pub fn encode_payload(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        match self {
            DisplayCommand::SetBackground(colour) | DisplayCommand::SetForeground(colour) => {
                buf.extend_from_slice(colour.as_bytes());
            }
            DisplayCommand::Clear => {}
            DisplayCommand::Write { x, y, text } | DisplayCommand::WriteVertical { x, y, text } => {
                put_u16s(&mut buf, &[*x, *y]);
                buf.extend_from_slice(text.as_bytes());
            }
            DisplayCommand::Fill {
                x,
                y,
                width,
                height,
                ch,
            } => {
                put_u16s(&mut buf, &[*x, *y, *width, *height]);
                let mut utf8 = [0u8; 4];
                buf.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
            }
            DisplayCommand::Copy {
                x,
                y,
                width,
                height,
                tx,
                ty,
            } => put_u16s(&mut buf, &[*x, *y, *width, *height, *tx, *ty]),
        }
        buf
    }

    /// Parses a COMMAND payload back into a typed command.
    ///
    /// This is the peer's side of the exchange; the hub itself never receives
    /// commands.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::FrameTooShort`] for truncated payloads and
    /// [`ProtocolError::MalformedPayload`] for unknown ids or invalid text.
    pub fn decode(command_id: u8, payload: &[u8]) -> Result<Self, ProtocolError> {
        let cmd = match command_id {
            CMD_SET_BACKGROUND => DisplayCommand::SetBackground(utf8(payload)?),
            CMD_SET_FOREGROUND => DisplayCommand::SetForeground(utf8(payload)?),
            CMD_CLEAR => DisplayCommand::Clear,
            CMD_WRITE | CMD_WRITE_VERTICAL => {
                let x = read_u16_le(payload, 0, "display WRITE")?;
                let y = read_u16_le(payload, 2, "display WRITE")?;
                let text = utf8(&payload[4..])?;
                if command_id == CMD_WRITE {
                    DisplayCommand::Write { x, y, text }
                } else {
                    DisplayCommand::WriteVertical { x, y, text }
                }
            }
            CMD_FILL => {
                require_len(payload, 9, "display FILL")?;
                let ch = utf8(&payload[8..])?
                    .chars()
                    .next()
                    .ok_or_else(|| ProtocolError::MalformedPayload("empty fill char".into()))?;
                DisplayCommand::Fill {
                    x: read_u16_le(payload, 0, "display FILL")?,
                    y: read_u16_le(payload, 2, "display FILL")?,
                    width: read_u16_le(payload, 4, "display FILL")?,
                    height: read_u16_le(payload, 6, "display FILL")?,
                    ch,
                }
            }
            CMD_COPY => {
                require_len(payload, 12, "display COPY")?;
                DisplayCommand::Copy {
                    x: read_u16_le(payload, 0, "display COPY")?,
                    y: read_u16_le(payload, 2, "display COPY")?,
                    width: read_u16_le(payload, 4, "display COPY")?,
                    height: read_u16_le(payload, 6, "display COPY")?,
                    tx: read_u16_le(payload, 8, "display COPY")?,
                    ty: read_u16_le(payload, 10, "display COPY")?,
                }
            }
            other => {
                return Err(ProtocolError::MalformedPayload(format!(
                    "unknown display command: {other}"
                )))
            }
        };
        Ok(cmd)
    }
}

fn put_u16s(buf: &mut Vec<u8>, values: &[u16]) {
    for v in values {
        buf.extend_from_slice(&v.to_le_bytes());
    }
}

fn utf8(bytes: &[u8]) -> Result<String, ProtocolError> {
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|e| ProtocolError::MalformedPayload(format!("invalid UTF-8: {e}")))
}

// ── Clipping planners ─────────────────────────────────────────────────────────

/// Grid size last reported by the peer.  Both dimensions start at zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DisplaySize {
    pub width: u16,
    pub height: u16,
}

impl DisplaySize {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }

    /// Plans a horizontal run of `text` starting at `(x, y)`.
    ///
    /// Characters left of column 0 are dropped, the run is cut at the right
    /// edge, and nothing is sent when the row is off-grid, the start is past
    /// the right edge, or no characters remain.
    pub fn write_command(&self, x: i32, y: i32, text: &str) -> Option<DisplayCommand> {
        if y < 0 || y >= i32::from(self.height) {
            return None;
        }
        let (x, text) = clip_run(x, self.width, text)?;
        Some(DisplayCommand::Write {
            x,
            y: y as u16,
            text,
        })
    }

    /// Plans a vertical run of `text` starting at `(x, y)`, going down.
    pub fn write_vertical_command(&self, x: i32, y: i32, text: &str) -> Option<DisplayCommand> {
        if x < 0 || x >= i32::from(self.width) {
            return None;
        }
        let (y, text) = clip_run(y, self.height, text)?;
        Some(DisplayCommand::WriteVertical {
            x: x as u16,
            y,
            text,
        })
    }

    /// Plans a rectangle fill.  `None` as the character fills with spaces.
    ///
    /// A negative start is clamped to 0 without shrinking the requested
    /// width or height; the size is then cut to the grid edge.
    pub fn fill_command(
        &self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        ch: Option<char>,
    ) -> Option<DisplayCommand> {
        let (x, y, width, height) = self.clamp_rect(x, y, width, height)?;
        Some(DisplayCommand::Fill {
            x,
            y,
            width,
            height,
            ch: ch.unwrap_or(' '),
        })
    }

    /// Plans a copy of a source rectangle to the target origin `(tx, ty)`.
    ///
    /// A target of exactly `(0, 0)` is suppressed, as are negative targets.
    /// The source rectangle is clamped like [`fill_command`](Self::fill_command).
    pub fn copy_command(
        &self,
        x: i32,
        y: i32,
        width: i32,
        height: i32,
        tx: i32,
        ty: i32,
    ) -> Option<DisplayCommand> {
        if tx == 0 && ty == 0 {
            return None;
        }
        let (x, y, width, height) = self.clamp_rect(x, y, width, height)?;
        Some(DisplayCommand::Copy {
            x,
            y,
            width,
            height,
            tx: u16::try_from(tx).ok()?,
            ty: u16::try_from(ty).ok()?,
        })
    }

    fn clamp_rect(&self, x: i32, y: i32, width: i32, height: i32) -> Option<(u16, u16, u16, u16)> {
        if width < 0 || height < 0 {
            return None;
        }
        let x = x.max(0);
        let y = y.max(0);
        let width = width.min(i32::from(self.width) - x);
        let height = height.min(i32::from(self.height) - y);
        if width <= 0 || height <= 0 {
            return None;
        }
        Some((
            u16::try_from(x).ok()?,
            u16::try_from(y).ok()?,
            u16::try_from(width).ok()?,
            u16::try_from(height).ok()?,
        ))
    }
}

/// Clips a run of `text` starting at `start` against `[0, extent)`.
fn clip_run(start: i32, extent: u16, text: &str) -> Option<(u16, String)> {
    if text.is_empty() || start >= i32::from(extent) {
        return None;
    }
    let skip = if start < 0 { start.unsigned_abs() as usize } else { 0 };
    let start = start.max(0);
    let room = (i32::from(extent) - start) as usize;
    let clipped: String = text.chars().skip(skip).take(room).collect();
    if clipped.is_empty() {
        None
    } else {
        Some((start as u16, clipped))
    }
}

// ── Device ────────────────────────────────────────────────────────────────────

/// A remote character-cell display.
#[derive(Debug)]
pub struct Display {
    ctx: DeviceContext,
    size: RwLock<DisplaySize>,
}

impl Display {
    pub fn new(ctx: DeviceContext) -> Self {
        Self {
            ctx,
            size: RwLock::new(DisplaySize::default()),
        }
    }

    /// Grid size as last reported by the peer (`0 x 0` before the first RESIZE).
    pub fn size(&self) -> DisplaySize {
        *self.size.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn width(&self) -> u16 {
        self.size().width
    }

    pub fn height(&self) -> u16 {
        self.size().height
    }

    pub fn background(&self, colour: &str) {
        self.send(DisplayCommand::SetBackground(colour.to_owned()));
    }

    pub fn foreground(&self, colour: &str) {
        self.send(DisplayCommand::SetForeground(colour.to_owned()));
    }

    pub fn clear(&self) {
        self.send(DisplayCommand::Clear);
    }

    pub fn write(&self, x: i32, y: i32, text: &str) {
        self.send_planned("WRITE", self.size().write_command(x, y, text));
    }

    pub fn write_vertical(&self, x: i32, y: i32, text: &str) {
        self.send_planned("WRITE_VERTICAL", self.size().write_vertical_command(x, y, text));
    }

    pub fn fill(&self, x: i32, y: i32, width: i32, height: i32, ch: Option<char>) {
        self.send_planned("FILL", self.size().fill_command(x, y, width, height, ch));
    }

    /// Fills a whole column.
    pub fn fill_column(&self, column: i32, ch: Option<char>) {
        let height = i32::from(self.height());
        self.fill(column, 0, 1, height, ch);
    }

    /// Fills a whole row.
    pub fn fill_line(&self, row: i32, ch: Option<char>) {
        let width = i32::from(self.width());
        self.fill(0, row, width, 1, ch);
    }

    pub fn copy(&self, x: i32, y: i32, width: i32, height: i32, tx: i32, ty: i32) {
        self.send_planned("COPY", self.size().copy_command(x, y, width, height, tx, ty));
    }

    /// Moves a rectangle by `(dx, dy)` cells.  Sent as a COPY.
    pub fn move_region(&self, x: i32, y: i32, width: i32, height: i32, dx: i32, dy: i32) {
        self.copy(
            x,
            y,
            width,
            height,
            x.saturating_add(dx),
            y.saturating_add(dy),
        );
    }

    fn send_planned(&self, name: &str, command: Option<DisplayCommand>) {
        match command {
            Some(cmd) => self.send(cmd),
            None => debug!(
                "session#{} display#{}: {name} suppressed by clipping",
                self.ctx.session_id(),
                self.ctx.device_id()
            ),
        }
    }

    fn send(&self, cmd: DisplayCommand) {
        self.ctx.send_command(cmd.id(), cmd.encode_payload());
    }
}

impl Device for Display {
    fn id(&self) -> DeviceId {
        self.ctx.device_id()
    }

    fn kind(&self) -> DeviceKind {
        DeviceKind::DISPLAY
    }

    fn handle_event(
        &self,
        event_id: u8,
        payload: &[u8],
    ) -> Result<Option<DeviceEvent>, ProtocolError> {
        match event_id {
            EVENT_RESIZE => {
                require_len(payload, 2, "display RESIZE")?;
                let size = DisplaySize::new(u16::from(payload[0]), u16::from(payload[1]));
                *self.size.write().unwrap_or_else(PoisonError::into_inner) = size;
                Ok(Some(DeviceEvent::Display(DisplayEvent::Resized {
                    width: size.width,
                    height: size.height,
                })))
            }
            _ => Ok(None),
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
