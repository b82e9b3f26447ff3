//! 类型模块：合成请求与合成结果。
//!
//! # Types Module
//!
//! Request and result types shared by the job client and the orchestrator.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`SynthesisRequest`] | Text plus exactly one voice selection |
//! | [`VoiceSelection`] | Preset speaker or clone-from-reference |
//! | [`ReferenceAudio`] | Local file (staged) or already-fetchable URL |
//! | [`AudioFormat`] | Output container requested from the worker |
//! | [`SynthesisResult`] | Structured outcome of one orchestrated operation |

pub mod request;
pub mod result;

pub use request::{AudioFormat, ReferenceAudio, SynthesisRequest, VoiceSelection};
pub use result::{AudioDuration, SynthesisResult, TIMELINE_FPS};
