//! Herald - audio reminders for networked speakers
//!
//! This crate streams an audio file, a fresh microphone recording, or a live
//! microphone broadcast to a single AirPlay or Google Cast speaker. The speaker
//! pulls the audio from a small local HTTP server started per invocation.
//!
//! # Architecture
//!
//! The crate follows hexagonal (ports & adapters) architecture:
//!
//! - **Domain**: Value objects (protocol tag, device identity, config) and errors
//! - **Application**: Use cases and port interfaces (traits)
//! - **Infrastructure**: Adapter implementations (mDNS, Cast, AirPlay, cpal, LAME, axum)
//! - **CLI**: Command-line interface, argument parsing, and signal handling

pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;
