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
use std::io::{BufWriter, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use log::{debug, trace};

use super::PcmFormat;
use crate::error::{WaveError, WaveResult};
use crate::layout::{ChunkHeader, FormatChunk, RiffHeader, CANONICAL_FMT_LEN, CANONICAL_HEADER_LEN,
                    DATA_SIZE_OFFSET, DATA_TAG, FMT_TAG, RIFF_CHUNK_SIZE_OVERHEAD,
                    RIFF_HEADER_LEN};

// MARK: Validation functions

fn validate_pcm_format(pcm_format: &PcmFormat) -> WaveResult<()> {
    if pcm_format.num_channels != 1 {
        return Err(WaveError::UnsupportedChannelLayout(pcm_format.num_channels));
    }
    match pcm_format.bits_per_sample {
        8 | 16 | 24 | 32 => Ok(()),
        bits => Err(WaveError::UnsupportedBitsPerSample(bits)),
    }
}

// The RIFF chunk size has to stay representable once the header is added.
fn validate_data_len(bytes_written: u32, additional: usize) -> WaveResult<u32> {
    let max_data_len = u64::from(u32::MAX - RIFF_CHUNK_SIZE_OVERHEAD);
    let data_len = u64::from(bytes_written) + additional as u64;
    if data_len > max_data_len {
        return Err(WaveError::InputTooLarge(data_len + CANONICAL_HEADER_LEN));
    }
    Ok(data_len as u32)
}

// MARK: Writing functions

/// Helper struct that takes ownership of a writer and can be used to write
/// samples to a PCM wave file.
///
/// The header is written in two passes: the fmt and data subchunk headers
/// when the writer is created, and the two size fields when it is finalized.
/// Until then the file isn't a valid wave file.
///
/// The format can't be changed once the fmt subchunk has been written:
///
/// ```compile_fail
/// use std::io::Cursor;
///
/// use wave_stream::{PcmFormat, WaveWriter};
///
/// let pcm_format = PcmFormat { num_channels: 1, sample_rate: 44100, bits_per_sample: 16 };
/// let mut writer = WaveWriter::new(pcm_format, Cursor::new(Vec::new())).unwrap();
/// writer.pcm_format.bits_per_sample = 8;
/// ```
#[derive(Debug)]
pub struct WaveWriter<T>
    where T: Seek + Write
{
    // Fixed once the fmt subchunk has been written.
    pcm_format: PcmFormat,

    // Bytes of sample data written so far, excluding the header. This is
    // what the size fields are patched with.
    bytes_written: u32,

    // The underlying writer that we'll use to write data.
    writer: BufWriter<T>,
}

impl<T> WaveWriter<T>
    where T: Seek + Write
{
    /// Returns a new wave writer for the given writer, after reserving the 44
    /// bytes of the canonical header. Only mono files are supported.
    pub fn new(pcm_format: PcmFormat, writer: T) -> WaveResult<WaveWriter<T>> {
        validate_pcm_format(&pcm_format)?;
        let format_chunk = FormatChunk::for_pcm(&pcm_format)?;

        let mut writer = BufWriter::new(writer);

        // The RIFF header depends on the data length, so it's written last.
        writer.seek(SeekFrom::Start(RIFF_HEADER_LEN))?;
        let fmt_header = ChunkHeader {
            id: FMT_TAG,
            size: CANONICAL_FMT_LEN,
        };
        fmt_header.write_to(&mut writer)?;
        format_chunk.write_to(&mut writer)?;
        writer.write_all(&DATA_TAG)?;
        // Leave space for the data size.
        writer.seek(SeekFrom::Current(4))?;

        debug!("reserved {} header bytes for {:?}", CANONICAL_HEADER_LEN, pcm_format);

        Ok(WaveWriter {
            pcm_format,
            bytes_written: 0,
            writer,
        })
    }

    /// Returns the PCM format for this wave file.
    pub fn pcm_format(&self) -> &PcmFormat {
        &self.pcm_format
    }

    /// Number of sample bytes written so far.
    pub fn bytes_written(&self) -> u32 {
        self.bytes_written
    }

    /// Writes a single sample, given as raw little-endian bytes. The buffer
    /// must hold exactly `bits_per_sample` bits.
    pub fn write_sample(&mut self, sample: &[u8]) -> WaveResult<()> {
        let bits = sample.len() * 8;
        if bits != usize::from(self.pcm_format.bits_per_sample) {
            return Err(WaveError::SampleLengthMismatch {
                got: bits,
                wanted: self.pcm_format.bits_per_sample,
            });
        }
        self.append(sample)
    }

    /// Writes a single sample as a signed 32-bit value. The bit depth isn't
    /// checked, so this is only meaningful for 32-bit files.
    pub fn write_sample_i32(&mut self, sample: i32) -> WaveResult<()> {
        let new_len = validate_data_len(self.bytes_written, 4)?;
        self.writer.write_i32::<LittleEndian>(sample)?;
        self.bytes_written = new_len;
        Ok(())
    }

    fn append(&mut self, data: &[u8]) -> WaveResult<()> {
        let new_len = validate_data_len(self.bytes_written, data.len())?;
        self.writer.write_all(data)?;
        self.bytes_written = new_len;
        Ok(())
    }

    /// Patches the RIFF header and the data size with the number of bytes
    /// written so far, then moves back to the end of the data so writing can
    /// continue. Calling this again rewrites the same values.
    pub fn finalize(&mut self) -> WaveResult<()> {
        self.writer.flush()?;

        let riff_header = RiffHeader::for_data_len(self.bytes_written);
        trace!("patching RIFF chunk size {} and data size {}",
               riff_header.chunk_size,
               self.bytes_written);

        self.writer.seek(SeekFrom::Start(0))?;
        riff_header.write_to(&mut self.writer)?;
        self.writer.seek(SeekFrom::Start(DATA_SIZE_OFFSET))?;
        self.writer.write_u32::<LittleEndian>(self.bytes_written)?;

        self.writer
            .seek(SeekFrom::Start(CANONICAL_HEADER_LEN + u64::from(self.bytes_written)))?;
        self.writer.flush()?;
        Ok(())
    }

    /// Finalizes the file and gives back the underlying writer. Dropping the
    /// returned writer closes it.
    pub fn close(mut self) -> WaveResult<T> {
        self.finalize()?;
        self.writer.into_inner().map_err(|err| WaveError::from(err.into_error()))
    }

    /// Gets a reference to the underlying writer. Buffered samples may not
    /// have reached it yet.
    pub fn get_ref(&self) -> &T {
        self.writer.get_ref()
    }
}

// Raw pass-through into the data subchunk, counted like any other sample
// bytes. Useful for piping already encoded PCM with io::copy.
impl<T> Write for WaveWriter<T>
    where T: Seek + Write
{
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        validate_data_len(self.bytes_written, buf.len())
            .map_err(|err| io::Error::new(io::ErrorKind::InvalidInput, err))?;
        let written = self.writer.write(buf)?;
        self.bytes_written += written as u32;
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

// MARK: Tests

#[cfg(test)]
mod tests {
    use std::io;
    use std::io::{Cursor, Write};

    use super::{validate_data_len, WaveWriter};
    use crate::error::WaveError;
    use crate::PcmFormat;

    fn mono(bits_per_sample: u16) -> PcmFormat {
        PcmFormat {
            num_channels: 1,
            sample_rate: 44100,
            bits_per_sample,
        }
    }

    const EMPTY_16BIT_MONO_44100: &[u8] = b"RIFF\x24\x00\x00\x00WAVE\
                                            fmt \x10\x00\x00\x00\
                                            \x01\x00\
                                            \x01\x00\
                                            \x44\xAC\x00\x00\
                                            \x88\x58\x01\x00\
                                            \x02\x00\
                                            \x10\x00\
                                            data\x00\x00\x00\x00";

    // Validation tests

    #[test]
    fn test_validate_doesnt_accept_stereo() {
        let pcm_format = PcmFormat {
            num_channels: 2,
            sample_rate: 44100,
            bits_per_sample: 16,
        };
        let wave_writer = WaveWriter::new(pcm_format, Cursor::new(Vec::new()));
        assert_matches!(Err(WaveError::UnsupportedChannelLayout(2)), wave_writer);
    }

    #[test]
    fn test_validate_doesnt_accept_zero_channels() {
        let pcm_format = PcmFormat {
            num_channels: 0,
            sample_rate: 44100,
            bits_per_sample: 16,
        };
        let wave_writer = WaveWriter::new(pcm_format, Cursor::new(Vec::new()));
        assert_matches!(Err(WaveError::UnsupportedChannelLayout(0)), wave_writer);
    }

    #[test]
    fn test_validate_doesnt_accept_invalid_bits_per_sample() {
        let wave_writer = WaveWriter::new(mono(12), Cursor::new(Vec::new()));
        assert_matches!(Err(WaveError::UnsupportedBitsPerSample(12)), wave_writer);
    }

    #[test]
    fn test_validate_accepts_valid_combination() {
        let wave_writer = WaveWriter::new(mono(16), Cursor::new(Vec::new()));
        assert_matches!(Ok(_), wave_writer);
    }

    #[test]
    fn test_validate_byte_rate_fits_in_32_bits() {
        let pcm_format = PcmFormat {
            num_channels: 1,
            sample_rate: 200_000_000,
            bits_per_sample: 32,
        };
        let out = WaveWriter::new(pcm_format, Cursor::new(Vec::new()))
            .unwrap()
            .close()
            .unwrap()
            .into_inner();
        assert_eq!(&800_000_000u32.to_le_bytes(), &out[28..32]);

        let pcm_format = PcmFormat {
            num_channels: 1,
            sample_rate: u32::MAX,
            bits_per_sample: 32,
        };
        let wave_writer = WaveWriter::new(pcm_format, Cursor::new(Vec::new()));
        assert_matches!(Err(WaveError::UnsupportedSampleRate(u32::MAX)), wave_writer);
    }

    #[test]
    fn test_validate_data_len_limit() {
        assert_matches!(Ok(40), validate_data_len(36, 4));
        assert_matches!(Ok(_), validate_data_len(u32::MAX - 40, 4));
        assert_matches!(Err(WaveError::InputTooLarge(_)), validate_data_len(u32::MAX - 40, 5));
    }

    // Header tests

    #[test]
    fn test_empty_file_header() {
        let wave_writer = WaveWriter::new(mono(16), Cursor::new(Vec::new())).unwrap();
        let out = wave_writer.close().unwrap().into_inner();
        assert_eq!(EMPTY_16BIT_MONO_44100, &out[..]);
    }

    #[test]
    fn test_header_is_a_placeholder_until_finalized() {
        let mut wave_writer = WaveWriter::new(mono(16), Cursor::new(Vec::new())).unwrap();
        wave_writer.write_sample(&[1, 1]).unwrap();
        wave_writer.flush().unwrap();

        let out = wave_writer.get_ref().get_ref();
        assert_eq!(46, out.len());
        assert_eq!(&[0u8; 12], &out[0..12]);
        assert_eq!(b"fmt ", &out[12..16]);
        assert_eq!(b"data\x00\x00\x00\x00", &out[36..44]);
    }

    #[test]
    fn test_one_sample() {
        let mut wave_writer = WaveWriter::new(mono(16), Cursor::new(Vec::new())).unwrap();
        wave_writer.write_sample(&[1, 1]).unwrap();
        assert_eq!(2, wave_writer.bytes_written());

        let out = wave_writer.close().unwrap().into_inner();
        assert_eq!(46, out.len());
        assert_eq!(b"RIFF\x26\x00\x00\x00WAVE", &out[0..12]);
        assert_eq!(b"data\x02\x00\x00\x00\x01\x01", &out[36..]);
    }

    // Sample tests

    #[test]
    fn test_write_sample_length_mismatch() {
        let mut wave_writer = WaveWriter::new(mono(16), Cursor::new(Vec::new())).unwrap();
        assert_matches!(Err(WaveError::SampleLengthMismatch { got: 24, wanted: 16 }),
                        wave_writer.write_sample(&[1, 2, 3]));
        assert_eq!(0, wave_writer.bytes_written());
    }

    #[test]
    fn test_write_sample_i32() {
        let mut wave_writer = WaveWriter::new(mono(32), Cursor::new(Vec::new())).unwrap();
        wave_writer.write_sample_i32(-2).unwrap();
        wave_writer.write_sample_i32(0x01020304).unwrap();
        assert_eq!(8, wave_writer.bytes_written());

        let out = wave_writer.close().unwrap().into_inner();
        assert_eq!(b"\x08\x00\x00\x00", &out[40..44]);
        assert_eq!(b"\xFE\xFF\xFF\xFF\x04\x03\x02\x01", &out[44..]);
        assert_eq!(b"\x2C\x00\x00\x00", &out[4..8]);
    }

    #[test]
    fn test_finalize_twice_rewrites_the_same_trailer() {
        let mut wave_writer = WaveWriter::new(mono(8), Cursor::new(Vec::new())).unwrap();
        wave_writer.write_sample(&[7]).unwrap();
        wave_writer.finalize().unwrap();
        let first = wave_writer.get_ref().get_ref().clone();

        wave_writer.finalize().unwrap();
        assert_eq!(&first, wave_writer.get_ref().get_ref());
    }

    #[test]
    fn test_writing_continues_after_finalize() {
        let mut wave_writer = WaveWriter::new(mono(8), Cursor::new(Vec::new())).unwrap();
        wave_writer.write_sample(&[1]).unwrap();
        wave_writer.finalize().unwrap();
        wave_writer.write_sample(&[2]).unwrap();

        let out = wave_writer.close().unwrap().into_inner();
        assert_eq!(b"data\x02\x00\x00\x00\x01\x02", &out[36..]);
    }

    #[test]
    fn test_raw_pass_through() {
        let mut wave_writer = WaveWriter::new(mono(16), Cursor::new(Vec::new())).unwrap();
        let copied = io::copy(&mut Cursor::new(vec![1u8, 2, 3, 4, 5, 6]), &mut wave_writer).unwrap();
        assert_eq!(6, copied);
        assert_eq!(6, wave_writer.bytes_written());

        let out = wave_writer.close().unwrap().into_inner();
        assert_eq!(b"\x06\x00\x00\x00\x01\x02\x03\x04\x05\x06", &out[40..]);
    }
}
