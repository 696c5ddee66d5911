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

//! Fixed-size structures of the canonical wave header.

use std::io::{Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::PcmFormat;
use crate::error::{WaveError, WaveResult};

pub const RIFF_TAG: [u8; 4] = *b"RIFF";
pub const WAVE_TAG: [u8; 4] = *b"WAVE";
pub const FMT_TAG: [u8; 4] = *b"fmt ";
pub const DATA_TAG: [u8; 4] = *b"data";

pub const FORMAT_UNCOMPRESSED_PCM: u16 = 1;

/// Streams longer than this can't be described by the 32-bit RIFF chunk size.
pub const MAX_STREAM_LEN: u64 = 1 << 32;

/// "RIFF", chunk size, "WAVE".
pub const RIFF_HEADER_LEN: u64 = 12;
/// Size of the fmt subchunk body when there are no extension bytes.
pub const CANONICAL_FMT_LEN: u32 = 16;
/// Everything that precedes the sample payload in a canonical file.
pub const CANONICAL_HEADER_LEN: u64 = 44;
/// Absolute position of the data subchunk size field in a canonical file.
pub const DATA_SIZE_OFFSET: u64 = 40;
/// Header bytes counted by the RIFF chunk size, excluding the sample payload.
pub const RIFF_CHUNK_SIZE_OVERHEAD: u32 = 36;

/// The 12 bytes that open every wave file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiffHeader {
    pub file_type: [u8; 4],
    /// Length of everything after the first 8 bytes.
    pub chunk_size: u32,
    pub form_type: [u8; 4],
}

impl RiffHeader {
    /// The header of a canonical file carrying `data_len` bytes of samples.
    pub fn for_data_len(data_len: u32) -> RiffHeader {
        RiffHeader {
            file_type: RIFF_TAG,
            chunk_size: data_len + RIFF_CHUNK_SIZE_OVERHEAD,
            form_type: WAVE_TAG,
        }
    }

    pub fn read_from<R: Read + ?Sized>(reader: &mut R) -> WaveResult<RiffHeader> {
        let file_type = read_tag(reader)?;
        let chunk_size = reader.read_u32::<LittleEndian>()?;
        let form_type = read_tag(reader)?;
        Ok(RiffHeader {
            file_type,
            chunk_size,
            form_type,
        })
    }

    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> WaveResult<()> {
        writer.write_all(&self.file_type)?;
        writer.write_u32::<LittleEndian>(self.chunk_size)?;
        writer.write_all(&self.form_type)?;
        Ok(())
    }
}

/// The tag and size that prefix every subchunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkHeader {
    pub id: [u8; 4],
    pub size: u32,
}

impl ChunkHeader {
    pub fn read_from<R: Read + ?Sized>(reader: &mut R) -> WaveResult<ChunkHeader> {
        // Chunk ids are compared byte for byte, in stream order.
        let id = read_tag(reader)?;
        let size = reader.read_u32::<LittleEndian>()?;
        Ok(ChunkHeader { id, size })
    }

    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> WaveResult<()> {
        writer.write_all(&self.id)?;
        writer.write_u32::<LittleEndian>(self.size)?;
        Ok(())
    }
}

/// The 16 bytes of the "fmt " subchunk body shared by every PCM wave file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatChunk {
    pub audio_format: u16,
    pub num_channels: u16,
    pub sample_rate: u32,
    pub byte_rate: u32,
    pub block_align: u16,
    pub bits_per_sample: u16,
}

impl FormatChunk {
    /// Builds an uncompressed PCM format chunk, deriving the byte rate and
    /// block align from the given format. Fails if either doesn't fit in its
    /// field.
    pub fn for_pcm(pcm_format: &PcmFormat) -> WaveResult<FormatChunk> {
        let byte_rate = u64::from(pcm_format.num_channels) * u64::from(pcm_format.sample_rate) *
                        u64::from(pcm_format.bits_per_sample) / 8;
        let byte_rate = u32::try_from(byte_rate)
            .map_err(|_| WaveError::UnsupportedSampleRate(pcm_format.sample_rate))?;

        let block_align = u32::from(pcm_format.bits_per_sample / 8) *
                          u32::from(pcm_format.num_channels);
        let block_align = u16::try_from(block_align)
            .map_err(|_| WaveError::UnsupportedChannelLayout(pcm_format.num_channels))?;

        Ok(FormatChunk {
            audio_format: FORMAT_UNCOMPRESSED_PCM,
            num_channels: pcm_format.num_channels,
            sample_rate: pcm_format.sample_rate,
            byte_rate,
            block_align,
            bits_per_sample: pcm_format.bits_per_sample,
        })
    }

    pub fn read_from<R: Read + ?Sized>(reader: &mut R) -> WaveResult<FormatChunk> {
        Ok(FormatChunk {
            audio_format: reader.read_u16::<LittleEndian>()?,
            num_channels: reader.read_u16::<LittleEndian>()?,
            sample_rate: reader.read_u32::<LittleEndian>()?,
            byte_rate: reader.read_u32::<LittleEndian>()?,
            block_align: reader.read_u16::<LittleEndian>()?,
            bits_per_sample: reader.read_u16::<LittleEndian>()?,
        })
    }

    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> WaveResult<()> {
        writer.write_u16::<LittleEndian>(self.audio_format)?;
        writer.write_u16::<LittleEndian>(self.num_channels)?;
        writer.write_u32::<LittleEndian>(self.sample_rate)?;
        writer.write_u32::<LittleEndian>(self.byte_rate)?;
        writer.write_u16::<LittleEndian>(self.block_align)?;
        writer.write_u16::<LittleEndian>(self.bits_per_sample)?;
        Ok(())
    }
}

pub fn read_tag<R: Read + ?Sized>(reader: &mut R) -> WaveResult<[u8; 4]> {
    let mut tag: [u8; 4] = [0; 4];
    reader.read_exact(&mut tag)?;
    Ok(tag)
}
