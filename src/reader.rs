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

use std::fmt;
use std::io;
use std::io::{Read, Seek, SeekFrom};
use std::time::Duration;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use log::{debug, trace};

use super::PcmFormat;
use crate::error::{WaveError, WaveResult};
use crate::layout::{ChunkHeader, FormatChunk, RiffHeader, CANONICAL_FMT_LEN, DATA_TAG, FMT_TAG,
                    FORMAT_UNCOMPRESSED_PCM, MAX_STREAM_LEN, RIFF_TAG, WAVE_TAG};

// MARK: Metadata

/// Everything known about a wave file once its header has been parsed.
///
/// The derived fields are computed once, while the reader is opened.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveInfo {
    /// Channels, sample rate and bits per sample, as stored in the "fmt " subchunk.
    pub pcm_format: PcmFormat,
    /// The format tag. Always 1 (uncompressed PCM) for files that could be opened.
    pub audio_format: u16,
    /// The byte rate as declared by the file. It isn't validated.
    pub byte_rate: u32,
    /// The block align as declared by the file. It isn't validated.
    pub block_align: u16,
    /// Total number of samples in the data subchunk, counting every channel.
    pub sample_count: u32,
    /// Size of the data subchunk in bytes.
    pub data_size: u32,
    /// Playback length, `sample_count / sample_rate` seconds.
    pub duration: Duration,
    /// True if the "fmt " subchunk was exactly 16 bytes and no other chunk
    /// had to be skipped before the data.
    pub canonical: bool,
}

impl WaveInfo {
    /// Bytes per sample. Bit depths that aren't a multiple of 8 are truncated.
    pub fn bytes_per_sample(&self) -> u16 {
        self.pcm_format.bits_per_sample / 8
    }
}

impl fmt::Display for WaveInfo {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f,
               "format {}, {} channel(s), {} Hz, {} bits, {} samples, {:.3}s, {}",
               self.audio_format,
               self.pcm_format.num_channels,
               self.pcm_format.sample_rate,
               self.pcm_format.bits_per_sample,
               self.sample_count,
               self.duration.as_secs_f64(),
               if self.canonical { "canonical" } else { "non-canonical" })
    }
}

// MARK: Parsing functions

// Outcome of a single iteration of the chunk walk.
#[derive(Debug)]
enum ChunkStep {
    Format { chunk: FormatChunk, canonical: bool },
    Data { first_sample_offset: u64, size: u32 },
    Skipped,
}

fn validate_riff_header(header: &RiffHeader, stream_len: u64) -> WaveResult<()> {
    if header.file_type != RIFF_TAG {
        return Err(WaveError::NotRiff);
    }
    let got = u64::from(header.chunk_size) + 8;
    if got != stream_len {
        return Err(WaveError::IncorrectChunkSize {
            got,
            wanted: stream_len,
        });
    }
    if header.form_type != WAVE_TAG {
        return Err(WaveError::NotWave);
    }
    Ok(())
}

fn duration_of(sample_count: u32, sample_rate: u32) -> Duration {
    if sample_rate == 0 {
        return Duration::ZERO;
    }
    Duration::from_secs_f64(f64::from(sample_count) / f64::from(sample_rate))
}

fn decode_sample(raw: &[u8]) -> WaveResult<i32> {
    match raw.len() {
        // Zero-extended: byte 0 is the least significant.
        width @ 1..=4 => Ok(LittleEndian::read_uint(raw, width) as u32 as i32),
        width => Err(WaveError::UnsupportedSampleWidth(width)),
    }
}

// Like read_exact, but reports how much was read instead of failing on EOF.
fn read_fully<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

trait ReadWaveExt: Read + Seek {
    /// Parses everything up to the first sample, returning the file info and
    /// the offset of the first sample.
    fn read_wave_header(&mut self, stream_len: u64) -> WaveResult<(WaveInfo, u64)> {
        let header = RiffHeader::read_from(self)?;
        validate_riff_header(&header, stream_len)?;

        let mut format = None;
        let mut format_canonical = false;
        let mut extra_chunk = false;

        let (first_sample_offset, data_size) = loop {
            match self.read_chunk_step(stream_len)? {
                ChunkStep::Format { chunk, canonical } => {
                    format = Some(chunk);
                    format_canonical = canonical;
                }
                ChunkStep::Data { first_sample_offset, size } => break (first_sample_offset, size),
                ChunkStep::Skipped => extra_chunk = true,
            }
        };

        let format = format.ok_or(WaveError::MissingFormatChunk)?;
        if format.audio_format != FORMAT_UNCOMPRESSED_PCM {
            return Err(WaveError::UnsupportedFormat(format.audio_format));
        }
        let bytes_per_sample = format.bits_per_sample / 8;
        if bytes_per_sample == 0 {
            return Err(WaveError::ZeroBitsPerSample);
        }

        let sample_count = data_size / u32::from(bytes_per_sample);
        let info = WaveInfo {
            pcm_format: PcmFormat {
                num_channels: format.num_channels,
                sample_rate: format.sample_rate,
                bits_per_sample: format.bits_per_sample,
            },
            audio_format: format.audio_format,
            byte_rate: format.byte_rate,
            block_align: format.block_align,
            sample_count,
            data_size,
            duration: duration_of(sample_count, format.sample_rate),
            canonical: format_canonical && !extra_chunk,
        };
        debug!("parsed wave header: {}", info);

        Ok((info, first_sample_offset))
    }

    fn read_chunk_step(&mut self, stream_len: u64) -> WaveResult<ChunkStep> {
        let header = ChunkHeader::read_from(self)?;
        match header.id {
            FMT_TAG => {
                let chunk = self.read_format_chunk(header.size, stream_len)?;
                Ok(ChunkStep::Format {
                    chunk,
                    canonical: header.size == CANONICAL_FMT_LEN,
                })
            }
            DATA_TAG => {
                let first_sample_offset = self.stream_position()?;
                trace!("data chunk of {} bytes at offset {}", header.size, first_sample_offset);
                Ok(ChunkStep::Data {
                    first_sample_offset,
                    size: header.size,
                })
            }
            _ => {
                debug!("skipping unused chunk {:?} ({} bytes)",
                       String::from_utf8_lossy(&header.id),
                       header.size);
                self.skip_bytes(header.size, stream_len)?;
                Ok(ChunkStep::Skipped)
            }
        }
    }

    fn read_format_chunk(&mut self, chunk_size: u32, stream_len: u64) -> WaveResult<FormatChunk> {
        let chunk = FormatChunk::read_from(self)?;
        if chunk_size != CANONICAL_FMT_LEN {
            let extension_len = self.read_u32::<LittleEndian>()?;
            debug!("skipping {} bytes of fmt extension", extension_len);
            self.skip_bytes(extension_len, stream_len)?;
        }
        Ok(chunk)
    }

    // Seeking past the end succeeds on most streams, so check against the
    // declared length instead.
    fn skip_bytes(&mut self, count: u32, stream_len: u64) -> WaveResult<()> {
        let position = self.seek(SeekFrom::Current(i64::from(count)))?;
        if position > stream_len {
            return Err(WaveError::UnexpectedEndOfStream);
        }
        Ok(())
    }
}

impl<T> ReadWaveExt for T where T: Read + Seek {}

// MARK: Reading

/// Helper struct that takes ownership of a reader and can be used to read
/// samples from a PCM wave file, one at a time, in file order.
///
/// The parsed metadata bounds every read, so it can only be looked at:
///
/// ```compile_fail
/// use std::io::Cursor;
///
/// use wave_stream::WaveReader;
///
/// let mut reader = WaveReader::from_stream(Cursor::new(Vec::new())).unwrap();
/// reader.info.sample_count = u32::MAX;
/// ```
pub struct WaveReader<T>
    where T: Read + Seek
{
    // Parsed once, in new.
    info: WaveInfo,

    // The byte offset in the file where the actual wave data begins (8 bytes
    // after the beginning of the data subchunk).
    first_sample_offset: u64,

    bytes_per_sample: usize,

    // Never exceeds info.sample_count.
    samples_read: u32,

    // The underlying reader that we'll use to read data.
    reader: T,
}

impl<T> WaveReader<T>
    where T: Read + Seek
{
    /// Parses the header of a wave stream that is exactly `stream_len` bytes
    /// long, leaving the reader positioned on the first sample.
    ///
    /// Either a fully usable reader is returned, or an error and nothing else.
    pub fn new(mut reader: T, stream_len: u64) -> WaveResult<WaveReader<T>> {
        if stream_len > MAX_STREAM_LEN {
            return Err(WaveError::InputTooLarge(stream_len));
        }

        let (info, first_sample_offset) = reader.read_wave_header(stream_len)?;
        let bytes_per_sample = usize::from(info.bytes_per_sample());

        Ok(WaveReader {
            info,
            first_sample_offset,
            bytes_per_sample,
            samples_read: 0,
            reader,
        })
    }

    /// Like `new`, but measures the stream length by seeking to its end. The
    /// stream is parsed from its beginning.
    pub fn from_stream(mut reader: T) -> WaveResult<WaveReader<T>> {
        let stream_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;
        WaveReader::new(reader, stream_len)
    }

    /// Returns the metadata parsed from the header.
    pub fn info(&self) -> &WaveInfo {
        &self.info
    }

    /// Total number of samples in the file.
    pub fn sample_count(&self) -> u32 {
        self.info.sample_count
    }

    /// Number of samples consumed since the reader was opened or last reset.
    pub fn samples_read(&self) -> u32 {
        self.samples_read
    }

    /// Reads the bytes of a single sample, exactly as stored. If we've reached
    /// the end of the data chunk, then this will return Ok(None).
    pub fn read_raw_sample(&mut self) -> WaveResult<Option<Vec<u8>>> {
        if self.samples_read >= self.info.sample_count {
            return Ok(None);
        }

        let mut raw = vec![0u8; self.bytes_per_sample];
        let read = read_fully(&mut self.reader, &mut raw)?;
        if read < raw.len() {
            return Err(WaveError::ShortRead {
                got: read,
                wanted: raw.len(),
            });
        }

        self.samples_read += 1;
        Ok(Some(raw))
    }

    /// Reads a single sample of 1 to 4 bytes as a zero-extended little-endian
    /// integer. If we've reached the end of the data chunk, then this will
    /// return Ok(None).
    pub fn read_sample(&mut self) -> WaveResult<Option<i32>> {
        if self.bytes_per_sample > 4 {
            return Err(WaveError::UnsupportedSampleWidth(self.bytes_per_sample));
        }
        match self.read_raw_sample()? {
            Some(raw) => decode_sample(&raw).map(Some),
            None => Ok(None),
        }
    }

    /// Moves back to the first sample.
    pub fn reset(&mut self) -> WaveResult<()> {
        self.reader.seek(SeekFrom::Start(self.first_sample_offset))?;
        self.samples_read = 0;
        Ok(())
    }

    /// Reads one value, then skips `stride` bytes, for `sample_count / stride`
    /// iterations, starting over from the first sample.
    ///
    /// If `window` isn't 0, each value is replaced by the median of the
    /// `window` samples that follow it, which keeps single-sample spikes out
    /// of the result. With a window of 1 that is simply the next sample.
    /// Reaching the end of the data ends the walk early; any error discards
    /// everything read so far.
    pub fn read_every(&mut self, stride: u32, window: usize) -> WaveResult<Vec<i32>> {
        if stride == 0 {
            return Err(WaveError::ZeroStride);
        }
        self.reset()?;

        let iterations = self.info.sample_count / stride;
        let bytes_per_sample = self.bytes_per_sample as u32;
        let samples_per_stride = stride.div_ceil(bytes_per_sample);

        // Both grow with what is actually read.
        let mut values = Vec::new();
        let mut smoothing = Vec::new();

        for _ in 0..iterations {
            let mut value = match self.read_sample()? {
                Some(value) => value,
                None => break,
            };

            let mut exhausted = false;
            if window > 0 {
                smoothing.clear();
                for _ in 0..window {
                    match self.read_sample()? {
                        Some(sample) => smoothing.push(sample),
                        None => {
                            exhausted = true;
                            break;
                        }
                    }
                }
                if !smoothing.is_empty() {
                    smoothing.sort_unstable();
                    value = smoothing[smoothing.len() / 2];
                }
            }
            values.push(value);
            if exhausted {
                break;
            }

            self.reader.seek(SeekFrom::Current(i64::from(stride)))?;
            self.samples_read = self.samples_read
                .saturating_add(samples_per_stride)
                .min(self.info.sample_count);
        }

        Ok(values)
    }

    /// Gives back the underlying reader.
    pub fn into_inner(self) -> T {
        self.reader
    }
}

impl<T> fmt::Debug for WaveReader<T>
    where T: Read + Seek
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("WaveReader")
            .field("info", &self.info)
            .field("first_sample_offset", &self.first_sample_offset)
            .field("samples_read", &self.samples_read)
            .finish()
    }
}

// MARK: Tests
