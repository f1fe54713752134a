//! Four-operator FM synthesis core
//!
//! Leaves first: [`tables`] and [`sine`] feed [`envelope`] and [`operator`],
//! which [`sound_generator`] wires through an [`algorithm`]. [`note`] wraps a
//! sound generator as a playable note and [`factory`] builds notes from the
//! preset library.

pub mod algorithm;
pub mod envelope;
pub mod factory;
pub mod note;
pub mod operator;
pub mod patch;
pub mod programs;
pub mod sine;
pub mod sound_generator;
pub mod tables;

pub use algorithm::Algorithm;
pub use envelope::{EnvelopeGenerator, EnvelopeState};
pub use factory::FmNoteFactory;
pub use note::FmNote;
pub use operator::FmOperator;
pub use patch::{DrumParameter, FmOperatorParameter, FmParameter};
pub use sine::SineWaveGenerator;
pub use sound_generator::FmSoundGenerator;
