use num_derive::FromPrimitive;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, FromPrimitive, Serialize)]
pub enum AudioCompression {
    UncompressedUnknownEndian = 0,
    Adpcm = 1,
    Mp3 = 2,
    Uncompressed = 3,
    Nellymoser16Khz = 4,
    Nellymoser8Khz = 5,
    Nellymoser = 6,
    Speex = 11,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SoundFormat {
    pub compression: AudioCompression,
    pub sample_rate: u16,
    pub is_16_bit: bool,
    pub is_stereo: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct SoundStreamHead {
    pub version: u8,
    pub playback_format: SoundFormat,
    pub stream_format: SoundFormat,
    pub num_samples_per_block: u16,
    /// Only meaningful for MP3 streams.
    pub latency_seek: i16,
}

/// The streaming sound of one timeline: its format and every block in the
/// order the frames carry them.
#[derive(Clone, Debug, Serialize)]
pub struct SoundStream<'a> {
    pub head: SoundStreamHead,
    #[serde(skip)]
    pub blocks: Vec<&'a [u8]>,
}

impl<'a> SoundStream<'a> {
    pub fn new(head: SoundStreamHead) -> Self {
        Self {
            head,
            blocks: Vec::new(),
        }
    }

    pub fn compression(&self) -> AudioCompression {
        self.head.stream_format.compression
    }

    pub fn push_block(&mut self, block: &'a [u8]) {
        self.blocks.push(block);
    }

    /// Codec payload of one block. MP3 blocks start with a sample count (u16)
    /// and a seek sample (i16) which are not part of the MP3 data.
    pub fn block_payload(&self, block: &'a [u8]) -> &'a [u8] {
        match self.compression() {
            AudioCompression::Mp3 => block.get(4..).unwrap_or_default(),
            _ => block,
        }
    }

    /// All block payloads concatenated, e.g. a playable MP3 elementary stream.
    pub fn concat_payload(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(self.blocks.iter().map(|b| b.len()).sum());
        for block in &self.blocks {
            data.extend_from_slice(self.block_payload(block));
        }
        data
    }
}

#[derive(Debug, Serialize)]
pub struct SoundStreamInfo {
    pub format: SoundFormat,
    pub num_blocks: usize,
    pub payload_len: usize,
}

impl From<&SoundStream<'_>> for SoundStreamInfo {
    fn from(stream: &SoundStream<'_>) -> Self {
        Self {
            format: stream.head.stream_format,
            num_blocks: stream.blocks.len(),
            payload_len: stream.blocks.iter().map(|b| stream.block_payload(b).len()).sum(),
        }
    }
}
