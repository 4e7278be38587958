//! Encoding pipeline: one descriptor, submitted to the service in dependency order
//!
//! Creation order:
//! ```text
//! Input ─┐
//! Output ┼─► Encoding ─► H.264 config ─► video Stream ─┬─► Muxing(s) ─► Filters* ─► Sprite* ─► start
//!        │               AAC config ───► audio Stream ─┘                                        │
//!        │                                                                                      ▼
//!        └────────────────────────────────────────────────────────────────────────► DASH Manifest*
//!
//!                          poll status ─► FINISHED / CANCELED ─► start Manifest*
//! ```
//! `*` only when the descriptor asks for it.
//!
//! - Progressive: one MP4 muxing referencing both streams
//! - Segmented: one fMP4 muxing per stream, `<output>/video` and `<output>/audio`
//! - Filters go on the video stream only, positions follow list order from 0

pub mod ledger;
pub mod pipe;
pub mod types;
pub mod waiter;
