//! Audio Codec Adapter - WAV 解析与 PCM 编解码

mod wav_codec;

pub use wav_codec::{DecodedAudio, WavCodec};
