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

//! Streaming reader and writer for uncompressed PCM wave files.
//!
//! [`WaveReader`] walks the chunks of a wave stream, decodes the "fmt "
//! subchunk and then hands out samples one at a time, in file order.
//! [`WaveWriter`] writes mono samples as they arrive and patches the header
//! sizes once writing is done. Both need a seekable stream: the reader skips
//! chunks it doesn't use, and the writer comes back to the header at the end.
//!
//! Only uncompressed PCM (format tag 1) is supported. Multi-channel files can
//! be read, but their samples are handed out interleaved, as stored.
//!
//! # The canonical wave file
//!
//! The writer always produces this 44-byte header, and the reader accepts it
//! as well as files with extra chunks or a longer "fmt " subchunk:
//!
//! Offset | Size | Data            | Description
//! -----: | ---: | --------------- | -----------------------------------------
//!      0 |    4 | "RIFF"          | Identifies the main chunk.
//!      4 |    4 | chunk size      | The size of the file minus 8 bytes.
//!      8 |    4 | "WAVE"          | Indicates that this is a wave file.
//!     12 |    4 | "fmt "          | Identifies the format subchunk.
//!     16 |    4 | subchunk size   | 16 for the canonical format.
//!     20 |    2 | format (1)      | 1 for uncompressed PCM.
//!     22 |    2 | num channels    | 1 for mono, 2 for stereo.
//!     24 |    4 | sample rate     | Samples per second.
//!     28 |    4 | byte rate       | `channels * sample rate * bits per sample / 8`.
//!     32 |    2 | block align     | `bits per sample / 8 * channels`.
//!     34 |    2 | bits per sample | 16 for 16-bit audio.
//!     36 |    4 | "data"          | Identifies the data subchunk.
//!     40 |    4 | subchunk size   | Bytes of audio data that follow.
//!     44 |  ... | audio data      | Little-endian PCM samples.
//!
//! All sizes are little-endian. Because both size fields are 32 bits wide,
//! streams can't be longer than 4 GiB.
//!
//! A file is reported as *canonical* when its "fmt " subchunk is exactly 16
//! bytes long and no other chunk comes before the data. Chunks after the data
//! subchunk are never visited.
//!
//! # Example
//!
//! ```
//! use std::io::Cursor;
//!
//! use wave_stream::{PcmFormat, WaveReader, WaveWriter};
//!
//! # fn main() -> wave_stream::WaveResult<()> {
//! let pcm_format = PcmFormat { num_channels: 1, sample_rate: 44100, bits_per_sample: 16 };
//! let mut writer = WaveWriter::new(pcm_format, Cursor::new(Vec::new()))?;
//! writer.write_sample(&[0x01, 0x01])?;
//! let file = writer.close()?;
//!
//! let mut reader = WaveReader::from_stream(file)?;
//! assert_eq!(pcm_format, reader.info().pcm_format);
//! assert_eq!(Some(257), reader.read_sample()?);
//! assert_eq!(None, reader.read_sample()?);
//! # Ok(())
//! # }
//! ```

#[cfg(test)]
#[macro_use]
mod macros;

mod error;
pub mod layout;
mod reader;
mod writer;

pub use error::{WaveError, WaveResult};
pub use reader::{WaveInfo, WaveReader};
pub use writer::WaveWriter;

/// The channel count, sample rate and bit depth of a PCM wave file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PcmFormat {
    pub num_channels: u16,
    pub sample_rate: u32,
    pub bits_per_sample: u16,
}
