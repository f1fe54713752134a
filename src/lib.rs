// Copyright 2025 Tyler Neely (tylerneely@gmail.com).
// Copyright 2021 Emilie Gillet (emilie.o.gillet@gmail.com)
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in
// all copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN
// THE SOFTWARE.
//
// See http://creativecommons.org/licenses/MIT/ for more information.

//! Software MIDI synthesizer.
//!
//! A four-operator FM tone generator driven by a sixteen-channel MIDI
//! [`Synthesizer`], plus a [`Sequencer`] that plays Standard MIDI Files into
//! any [`OutputSink`]. [`Player`] ties the two together for sample-accurate
//! offline rendering.

pub mod channel;
pub mod config;
pub mod fm;
pub mod note;
pub mod player;
pub mod sequencer;
pub mod smf;
pub mod synth;
pub mod wav;

pub use channel::{Channel, SystemMode};
pub use config::RenderConfig;
pub use note::{Note, NoteFactory};
pub use player::Player;
pub use sequencer::{OutputSink, Sequencer, TempoMap};
pub use synth::Synthesizer;
