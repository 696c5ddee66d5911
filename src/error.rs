// wave-stream -- Streaming reader and writer for RIFF/WAVE PCM files.
// Copyright (c) 2016 Kevin Brothaler and the wave-stream project authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// A copy of the License has been included in the root of the repository.
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::io;
use std::result;

use thiserror::Error;

/// Every condition that can stop reading or writing a wave stream.
///
/// None of these are retried internally. Once one is returned, the file
/// that produced it should be treated as unusable.
#[derive(Debug, Error)]
pub enum WaveError {
    /// The declared stream length can't be addressed by 32-bit chunk sizes.
    #[error("input too large: {0} bytes")]
    InputTooLarge(u64),
    /// The stream doesn't start with a "RIFF" tag.
    #[error("not a RIFF file")]
    NotRiff,
    /// The RIFF chunk doesn't continue with a "WAVE" tag.
    #[error("not a WAVE file")]
    NotWave,
    /// The RIFF chunk size plus its 8-byte prefix disagrees with the stream length.
    #[error("incorrect chunk size: got {got}, wanted {wanted}")]
    IncorrectChunkSize { got: u64, wanted: u64 },
    /// A structural read or skip ran past the end of the stream.
    #[error("unexpected end of stream")]
    UnexpectedEndOfStream,
    /// The data chunk was reached before any "fmt " chunk.
    #[error("missing fmt chunk")]
    MissingFormatChunk,
    /// The bits per sample are too small to fill a single byte.
    #[error("bits per sample is zero")]
    ZeroBitsPerSample,
    /// Only uncompressed PCM (format tag 1) is supported.
    #[error("unsupported audio format {0}, only uncompressed PCM is supported")]
    UnsupportedFormat(u16),
    /// Only mono files can be written.
    #[error("unsupported channel layout: {0} channels, only mono is supported")]
    UnsupportedChannelLayout(u16),
    /// Only 8-bit, 16-bit, 24-bit and 32-bit PCM files can be written.
    #[error("unsupported bits per sample: {0}")]
    UnsupportedBitsPerSample(u16),
    /// The byte rate derived from this sample rate doesn't fit in the 32-bit
    /// byte rate field.
    #[error("unsupported sample rate: {0} Hz")]
    UnsupportedSampleRate(u32),
    /// A sample buffer doesn't match the declared bit depth. Both values are in bits.
    #[error("sample length mismatch: got {got} bits, wanted {wanted}")]
    SampleLengthMismatch { got: usize, wanted: u16 },
    /// Fewer bytes than one full sample could be read. Both values are in bytes.
    #[error("short read: got {got} bytes, wanted {wanted}")]
    ShortRead { got: usize, wanted: usize },
    /// Samples can only be decoded to integers from 1 to 4 bytes wide.
    #[error("unsupported sample width: {0} bytes")]
    UnsupportedSampleWidth(usize),
    /// A sparse read needs a stride of at least one byte.
    #[error("stride must be greater than zero")]
    ZeroStride,
    /// The underlying stream failed.
    #[error("IO error: {0}")]
    Io(#[source] io::Error),
}

/// Represents a result when reading or writing a wave file.
pub type WaveResult<T> = result::Result<T, WaveError>;

impl From<io::Error> for WaveError {
    fn from(err: io::Error) -> WaveError {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => WaveError::UnexpectedEndOfStream,
            _ => WaveError::Io(err),
        }
    }
}
