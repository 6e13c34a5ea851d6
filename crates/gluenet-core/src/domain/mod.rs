//! Pure domain logic with no protocol or I/O dependencies.
//!
//! Code here only computes values.  It does not know about frames, sessions
//! or sockets, which keeps it trivially testable and reusable by any
//! application that draws on GlueNet displays.

/// Line and circle rasterisation on the character grid.
///
/// See [`graphics::line`] and [`graphics::circle`].
pub mod graphics;
