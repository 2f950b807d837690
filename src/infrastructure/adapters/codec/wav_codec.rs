//! WAV Codec - 基于 symphonia 的 WAV 编解码
//!
//! 支持：
//! - WAV 头解析和信息提取（编排器校验转换输出）
//! - WAV → PCM f32 解码（Fake 协作者做信号处理）
//! - PCM f32 → 16 位 WAV 编码

use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::application::ports::{AudioInfo, AudioProbePort, CodecError};

/// 解码后的 PCM 音频（交错排列）
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_ms: u64,
}

impl DecodedAudio {
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        let duration_ms = if sample_rate > 0 && channels > 0 {
            (samples.len() as u64 * 1000) / (sample_rate as u64 * channels as u64)
        } else {
            0
        };
        Self {
            samples,
            sample_rate,
            channels,
            duration_ms,
        }
    }

    /// 均方根能量
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum: f32 = self.samples.iter().map(|s| s * s).sum();
        (sum / self.samples.len() as f32).sqrt()
    }
}

/// WAV 编解码器
#[derive(Debug, Clone, Default)]
pub struct WavCodec;

impl WavCodec {
    pub fn new() -> Self {
        Self
    }

    /// 解析 WAV 文件头
    fn parse_wav_header(&self, data: &[u8]) -> Result<WavHeader, CodecError> {
        if data.len() < 44 {
            return Err(CodecError::InvalidInput("WAV data too short".to_string()));
        }

        // 验证 RIFF 头
        if &data[0..4] != b"RIFF" {
            return Err(CodecError::InvalidInput(
                "Invalid WAV: missing RIFF header".to_string(),
            ));
        }

        // 验证 WAVE 标识
        if &data[8..12] != b"WAVE" {
            return Err(CodecError::InvalidInput(
                "Invalid WAV: missing WAVE identifier".to_string(),
            ));
        }

        let mut pos = 12;
        let mut fmt_chunk: Option<FmtChunk> = None;
        let mut data_size = None;

        while pos + 8 <= data.len() {
            let chunk_id = &data[pos..pos + 4];
            let chunk_size =
                u32::from_le_bytes([data[pos + 4], data[pos + 5], data[pos + 6], data[pos + 7]])
                    as usize;

            match chunk_id {
                b"fmt " => {
                    if chunk_size < 16 || pos + 8 + 16 > data.len() {
                        return Err(CodecError::InvalidInput(
                            "Invalid fmt chunk size".to_string(),
                        ));
                    }
                    let fmt = &data[pos + 8..pos + 8 + 16];
                    fmt_chunk = Some(FmtChunk {
                        num_channels: u16::from_le_bytes([fmt[2], fmt[3]]),
                        sample_rate: u32::from_le_bytes([fmt[4], fmt[5], fmt[6], fmt[7]]),
                        bits_per_sample: u16::from_le_bytes([fmt[14], fmt[15]]),
                    });
                }
                b"data" => {
                    // 截断的文件只统计实际存在的字节
                    data_size = Some(chunk_size.min(data.len() - pos - 8));
                    break;
                }
                _ => {}
            }

            pos += 8 + chunk_size;
            // 对齐到偶数字节
            if chunk_size % 2 != 0 {
                pos += 1;
            }
        }

        let fmt = fmt_chunk.ok_or_else(|| {
            CodecError::InvalidInput("Invalid WAV: missing fmt chunk".to_string())
        })?;

        let data_size = data_size.ok_or_else(|| {
            CodecError::InvalidInput("Invalid WAV: missing data chunk".to_string())
        })?;

        Ok(WavHeader { fmt, data_size })
    }

    /// 使用 symphonia 解码 WAV 获取 PCM 数据
    pub fn decode(&self, data: &[u8]) -> Result<DecodedAudio, CodecError> {
        let cursor = Cursor::new(data.to_vec());
        let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

        let mut hint = Hint::new();
        hint.with_extension("wav");

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| CodecError::DecodingError(format!("Probe failed: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .default_track()
            .ok_or_else(|| CodecError::DecodingError("No audio track found".to_string()))?;

        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| CodecError::DecodingError("Unknown sample rate".to_string()))?;

        let channels = track
            .codec_params
            .channels
            .map(|c| c.count() as u16)
            .ok_or_else(|| CodecError::DecodingError("Unknown channel count".to_string()))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| CodecError::DecodingError(format!("Decoder creation failed: {}", e)))?;

        let mut samples: Vec<f32> = Vec::new();
        let track_id = track.id;

        loop {
            let packet = match format.next_packet() {
                Ok(p) => p,
                Err(symphonia::core::errors::Error::IoError(e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(e) => {
                    return Err(CodecError::DecodingError(format!(
                        "Packet read error: {}",
                        e
                    )));
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(d) => d,
                Err(e) => {
                    tracing::warn!("Decode error (skipping packet): {}", e);
                    continue;
                }
            };

            let spec = *decoded.spec();
            let num_frames = decoded.frames();
            let mut sample_buf = SampleBuffer::<f32>::new(num_frames as u64, spec);
            sample_buf.copy_interleaved_ref(decoded);
            let actual_samples = num_frames * spec.channels.count();
            samples.extend(&sample_buf.samples()[..actual_samples]);
        }

        Ok(DecodedAudio::new(samples, sample_rate, channels))
    }

    /// 将 PCM f32 样本编码为 16 位 WAV
    pub fn encode(&self, pcm: &DecodedAudio) -> Result<Vec<u8>, CodecError> {
        if pcm.channels == 0 || pcm.sample_rate == 0 {
            return Err(CodecError::EncodingError(format!(
                "Invalid PCM layout: {} Hz, {} channels",
                pcm.sample_rate, pcm.channels
            )));
        }

        let bits_per_sample: u16 = 16;
        let num_channels = pcm.channels;
        let sample_rate = pcm.sample_rate;
        let byte_rate = sample_rate * num_channels as u32 * (bits_per_sample / 8) as u32;
        let block_align = num_channels * (bits_per_sample / 8);

        let data_size = pcm.samples.len() * 2;
        let file_size = 36 + data_size;

        let mut wav = Vec::with_capacity(44 + data_size);

        // RIFF header
        wav.extend_from_slice(b"RIFF");
        wav.extend_from_slice(&(file_size as u32).to_le_bytes());
        wav.extend_from_slice(b"WAVE");

        // fmt chunk
        wav.extend_from_slice(b"fmt ");
        wav.extend_from_slice(&16u32.to_le_bytes()); // chunk size
        wav.extend_from_slice(&1u16.to_le_bytes()); // PCM format
        wav.extend_from_slice(&num_channels.to_le_bytes());
        wav.extend_from_slice(&sample_rate.to_le_bytes());
        wav.extend_from_slice(&byte_rate.to_le_bytes());
        wav.extend_from_slice(&block_align.to_le_bytes());
        wav.extend_from_slice(&bits_per_sample.to_le_bytes());

        // data chunk
        wav.extend_from_slice(b"data");
        wav.extend_from_slice(&(data_size as u32).to_le_bytes());

        for &s in &pcm.samples {
            let sample = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            wav.extend_from_slice(&sample.to_le_bytes());
        }

        Ok(wav)
    }
}

#[derive(Debug)]
struct WavHeader {
    fmt: FmtChunk,
    data_size: usize,
}

#[derive(Debug)]
struct FmtChunk {
    num_channels: u16,
    sample_rate: u32,
    bits_per_sample: u16,
}

impl AudioProbePort for WavCodec {
    fn inspect(&self, wav_data: &[u8]) -> Result<AudioInfo, CodecError> {
        let header = self.parse_wav_header(wav_data)?;

        let bytes_per_sample = header.fmt.bits_per_sample as usize / 8;
        let samples_per_channel = if bytes_per_sample > 0 && header.fmt.num_channels > 0 {
            header.data_size / bytes_per_sample / header.fmt.num_channels as usize
        } else {
            0
        };

        let duration_ms = if header.fmt.sample_rate > 0 {
            (samples_per_channel as u64 * 1000) / header.fmt.sample_rate as u64
        } else {
            0
        };

        Ok(AudioInfo {
            duration_ms,
            sample_rate: header.fmt.sample_rate,
            channels: header.fmt.num_channels,
            bits_per_sample: header.fmt.bits_per_sample,
            data_size: header.data_size,
        })
    }
}
