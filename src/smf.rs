//! Standard MIDI File reader
//!
//! Splits an SMF into its tracks and decodes each track into tick-stamped
//! events. Times are left in ticks; converting them is up to the sequencer.

use anyhow::{anyhow, bail, Result};
use log::warn;

const HEADER_TAG: &[u8; 4] = b"MThd";
const TRACK_TAG: &[u8; 4] = b"MTrk";
const HEADER_LENGTH: u32 = 6;

/// Meta event type ending a track
pub const META_END_OF_TRACK: u8 = 0x2F;

/// Timing unit of the file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Division {
    /// Ticks per quarter note, scaled by the tempo
    TicksPerQuarter(u16),
    /// Absolute time: `fps` is the (negative) SMPTE rate, -29 meaning 29.97
    Smpte { fps: i8, subframes: u8 },
}

impl Division {
    pub fn from_raw(raw: u16) -> Self {
        if raw & 0x8000 != 0 {
            Division::Smpte {
                fps: (raw >> 8) as u8 as i8,
                subframes: (raw & 0xFF) as u8,
            }
        } else {
            Division::TicksPerQuarter(raw)
        }
    }

    /// Microseconds for `tick` under SMPTE timing, None for tempo-based files
    pub fn smpte_time(&self, tick: u64) -> Option<u64> {
        match *self {
            Division::TicksPerQuarter(_) => None,
            Division::Smpte { fps, subframes } => {
                // frames per hundred seconds
                let rate = match fps {
                    -29 => 2997,
                    fps => u128::from(fps.unsigned_abs()) * 100,
                };
                let denominator = rate * u128::from(subframes.max(1));
                Some((u128::from(tick) * 100_000_000 / denominator.max(1)) as u64)
            }
        }
    }
}

/// Payload of a track event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// Channel message packed as `status | data1 << 8 | data2 << 16`
    Short(u32),
    /// System exclusive, starting with 0xF0 (or the raw bytes of an 0xF7
    /// escape)
    SysEx(Vec<u8>),
    Meta { kind: u8, data: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackEvent {
    /// Absolute tick within the track
    pub tick: u64,
    pub kind: EventKind,
}

/// A parsed file
#[derive(Debug, Clone)]
pub struct Smf {
    pub format: u16,
    pub division: Division,
    pub tracks: Vec<Vec<TrackEvent>>,
}

/// Big-endian byte cursor
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| anyhow!("unexpected end of data at offset {}", self.pos))?;
        self.pos += 1;
        Ok(byte)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            bail!(
                "unexpected end of data: wanted {} bytes at offset {}, {} left",
                len,
                self.pos,
                self.remaining()
            );
        }
        let bytes = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(bytes)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Variable-length quantity: 7 bits per byte, high bit continues
    pub fn read_vlq(&mut self) -> Result<u32> {
        let mut value = 0u32;
        for _ in 0..4 {
            let byte = self.read_u8()?;
            value = (value << 7) | u32::from(byte & 0x7F);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        bail!("variable-length quantity longer than 4 bytes at offset {}", self.pos)
    }
}

/// Parses a format 0 or 1 file
pub fn parse(bytes: &[u8]) -> Result<Smf> {
    let mut reader = Reader::new(bytes);

    let tag = reader.read_bytes(4)?;
    if tag != HEADER_TAG {
        bail!("not a standard MIDI file (header tag {:02X?})", tag);
    }
    let length = reader.read_u32()?;
    if length < HEADER_LENGTH {
        bail!("header chunk too short: {} bytes", length);
    }
    let format = reader.read_u16()?;
    let ntrks = reader.read_u16()?;
    let division = Division::from_raw(reader.read_u16()?);
    reader.read_bytes((length - HEADER_LENGTH) as usize)?;

    if format > 1 {
        bail!("unsupported SMF format {}", format);
    }

    let mut tracks = Vec::with_capacity(usize::from(ntrks));
    while reader.remaining() >= 8 && tracks.len() < usize::from(ntrks) {
        let tag = reader.read_bytes(4)?;
        let length = reader.read_u32()? as usize;
        let body = reader.read_bytes(length)?;
        if tag == TRACK_TAG {
            let index = tracks.len();
            let events = parse_track(body).map_err(|e| e.context(format!("track {}", index)))?;
            tracks.push(events);
        } else {
            warn!(
                "skipping unknown chunk {:?} ({} bytes)",
                String::from_utf8_lossy(tag),
                length
            );
        }
    }
    if tracks.len() < usize::from(ntrks) {
        warn!("header announces {} tracks, found {}", ntrks, tracks.len());
    }

    Ok(Smf {
        format,
        division,
        tracks,
    })
}

fn parse_track(body: &[u8]) -> Result<Vec<TrackEvent>> {
    let mut reader = Reader::new(body);
    let mut events = Vec::new();
    let mut tick = 0u64;
    let mut running_status: Option<u8> = None;

    while !reader.is_empty() {
        tick += u64::from(reader.read_vlq()?);

        let first = reader.read_u8()?;
        let kind = match first {
            0xFF => {
                let kind = reader.read_u8()?;
                let length = reader.read_vlq()? as usize;
                let data = reader.read_bytes(length)?.to_vec();
                if kind == META_END_OF_TRACK {
                    events.push(TrackEvent {
                        tick,
                        kind: EventKind::Meta { kind, data },
                    });
                    break;
                }
                EventKind::Meta { kind, data }
            }
            0xF0 => {
                running_status = None;
                let length = reader.read_vlq()? as usize;
                let mut data = Vec::with_capacity(length + 1);
                data.push(0xF0);
                data.extend_from_slice(reader.read_bytes(length)?);
                EventKind::SysEx(data)
            }
            0xF7 => {
                running_status = None;
                let length = reader.read_vlq()? as usize;
                EventKind::SysEx(reader.read_bytes(length)?.to_vec())
            }
            0x80..=0xEF => {
                running_status = Some(first);
                let data1 = reader.read_u8()?;
                EventKind::Short(channel_message(first, data1, &mut reader)?)
            }
            0xF1..=0xFE => bail!("system message 0x{:02X} inside a track", first),
            _ => match running_status {
                Some(status) => EventKind::Short(channel_message(status, first, &mut reader)?),
                None => {
                    warn!("skipping data byte 0x{:02X} without running status", first);
                    continue;
                }
            },
        };
        events.push(TrackEvent { tick, kind });
    }

    Ok(events)
}

fn channel_message(status: u8, data1: u8, reader: &mut Reader<'_>) -> Result<u32> {
    let data2 = match status & 0xF0 {
        0xC0 | 0xD0 => 0,
        _ => reader.read_u8()?,
    };
    Ok(u32::from(status) | (u32::from(data1 & 0x7F) << 8) | (u32::from(data2 & 0x7F) << 16))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(format: u16, division: u16, tracks: &[&[u8]]) -> Vec<u8> {
        let mut bytes = b"MThd".to_vec();
        bytes.extend_from_slice(&6u32.to_be_bytes());
        bytes.extend_from_slice(&format.to_be_bytes());
        bytes.extend_from_slice(&(tracks.len() as u16).to_be_bytes());
        bytes.extend_from_slice(&division.to_be_bytes());
        for track in tracks {
            bytes.extend_from_slice(b"MTrk");
            bytes.extend_from_slice(&(track.len() as u32).to_be_bytes());
            bytes.extend_from_slice(track);
        }
        bytes
    }

    #[test]
    fn test_vlq() {
        let data = [0x00, 0x7F, 0x81, 0x00, 0xFF, 0x7F, 0x81, 0x80, 0x80, 0x00];
        let mut reader = Reader::new(&data);
        assert_eq!(reader.read_vlq().ok(), Some(0));
        assert_eq!(reader.read_vlq().ok(), Some(0x7F));
        assert_eq!(reader.read_vlq().ok(), Some(0x80));
        assert_eq!(reader.read_vlq().ok(), Some(0x3FFF));
        assert_eq!(reader.read_vlq().ok(), Some(0x200000));
        assert!(reader.read_vlq().is_err());
    }

    #[test]
    fn test_division() {
        assert_eq!(Division::from_raw(480), Division::TicksPerQuarter(480));
        let smpte = Division::from_raw(0xE728);
        assert_eq!(
            smpte,
            Division::Smpte {
                fps: -25,
                subframes: 40
            }
        );
        // 25 fps * 40 subframes = 1000 ticks per second
        assert_eq!(smpte.smpte_time(1000), Some(1_000_000));
        let drop = Division::from_raw(0xE301);
        assert_eq!(drop.smpte_time(2997), Some(100_000_000));
    }

    #[test]
    fn test_running_status() {
        let track: &[u8] = &[
            0x00, 0x90, 60, 100, // note on
            0x10, 64, 100, // running status
            0x10, 0xC1, 5, // program change, one data byte
            0x00, 0xFF, 0x2F, 0x00,
        ];
        let smf = parse(&file(0, 96, &[track])).unwrap();
        let events = &smf.tracks[0];
        assert_eq!(events.len(), 4);
        assert_eq!(events[1].tick, 0x10);
        assert_eq!(events[1].kind, EventKind::Short(0x90 | (64 << 8) | (100 << 16)));
        assert_eq!(events[2].kind, EventKind::Short(0xC1 | (5 << 8)));
        assert_eq!(events[2].tick, 0x20);
    }

    #[test]
    fn test_sysex_and_meta() {
        let track: &[u8] = &[
            0x00, 0xF0, 0x05, 0x7E, 0x7F, 0x09, 0x01, 0xF7, //
            0x00, 0xFF, 0x51, 0x03, 0x07, 0xA1, 0x20, //
            0x00, 0xFF, 0x2F, 0x00,
        ];
        let smf = parse(&file(0, 96, &[track])).unwrap();
        let events = &smf.tracks[0];
        assert_eq!(
            events[0].kind,
            EventKind::SysEx(vec![0xF0, 0x7E, 0x7F, 0x09, 0x01, 0xF7])
        );
        assert_eq!(
            events[1].kind,
            EventKind::Meta {
                kind: 0x51,
                data: vec![0x07, 0xA1, 0x20]
            }
        );
    }

    #[test]
    fn test_unknown_chunk_is_skipped() {
        let track: &[u8] = &[0x00, 0x90, 60, 100, 0x00, 0xFF, 0x2F, 0x00];
        let mut bytes = file(0, 96, &[]);
        // announce one track, then put a foreign chunk before it
        bytes[10..12].copy_from_slice(&1u16.to_be_bytes());
        bytes.extend_from_slice(b"XFIH");
        bytes.extend_from_slice(&3u32.to_be_bytes());
        bytes.extend_from_slice(&[1, 2, 3]);
        bytes.extend_from_slice(b"MTrk");
        bytes.extend_from_slice(&(track.len() as u32).to_be_bytes());
        bytes.extend_from_slice(track);
        let smf = parse(&bytes).unwrap();
        assert_eq!(smf.tracks.len(), 1);
    }

    #[test]
    fn test_structural_errors() {
        assert!(parse(b"RIFF\0\0\0\x06\0\0\0\x01\0\x60").is_err());
        assert!(parse(&file(2, 96, &[])).is_err());
        let track: &[u8] = &[0x00, 0x90, 60, 100];
        let mut truncated = file(0, 96, &[track]);
        truncated.truncate(truncated.len() - 2);
        assert!(parse(&truncated).is_err());
    }

    #[test]
    fn test_orphan_data_byte_is_skipped() {
        let track: &[u8] = &[
            0x00, 0x3C, // stray data byte
            0x00, 0x90, 60, 100, //
            0x00, 0xFF, 0x2F, 0x00,
        ];
        let smf = parse(&file(0, 96, &[track])).unwrap();
        let events = &smf.tracks[0];
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].kind, EventKind::Short(0x90 | (60 << 8) | (100 << 16)));
    }

    #[test]
    fn test_running_status_survives_meta() {
        let track: &[u8] = &[
            0x00, 0x90, 60, 100, //
            0x0A, 0xFF, 0x06, 0x01, b'A', //
            0x0A, 62, 100, //
            0x00, 0xFF, 0x2F, 0x00,
        ];
        let smf = parse(&file(0, 96, &[track])).unwrap();
        let events = &smf.tracks[0];
        assert_eq!(events.len(), 4);
        assert_eq!(events[2].tick, 0x14);
        assert_eq!(events[2].kind, EventKind::Short(0x90 | (62 << 8) | (100 << 16)));
    }
}
