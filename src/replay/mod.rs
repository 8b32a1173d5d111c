//! Cassette record/replay engine.
//!
//! A cassette is the recorded interaction set of one test, persisted as a
//! single `base64(zlib(msgpack))` text blob. [`ReplayTransport`] sits on the
//! client's transport seam, answering requests from the cassette during
//! replay and writing through to the live service while recording.

pub mod cassette;
pub mod matching;
pub mod normalize;
pub mod recorder;
pub mod serializer;

pub use cassette::{Cassette, CassetteStore, Interaction, RecordedRequest, RecordedResponse};
pub use normalize::{
    normalize_cassette, NormalizeRules, CANONICAL_ENDPOINT, CANONICAL_PROJECT_ID, PLACEHOLDER_AUTH,
};
pub use recorder::ReplayTransport;
