//! Minimal EXIF reader for the plate caption.
//!
//! Only the four exposure tags are read. Anything malformed yields an empty summary; a photo
//! without readable metadata still renders, just without a caption.

const TAG_EXIF_IFD: u16 = 0x8769;
const TAG_EXPOSURE_TIME: u16 = 0x829A;
const TAG_F_NUMBER: u16 = 0x829D;
const TAG_ISO: u16 = 0x8827;
const TAG_FOCAL_LENGTH: u16 = 0x920A;

const TYPE_SHORT: u16 = 3;
const TYPE_LONG: u16 = 4;
const TYPE_RATIONAL: u16 = 5;
const TYPE_SRATIONAL: u16 = 10;

/// Exposure values pulled from EXIF.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ExifSummary {
    /// Seconds.
    pub exposure_time: Option<f64>,
    pub f_number: Option<f64>,
    pub iso: Option<u32>,
    /// Millimeters.
    pub focal_length: Option<f64>,
}

impl ExifSummary {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Plate text, e.g. `1/125s  f/2.8  ISO 200  35mm`. Missing values are skipped.
    pub fn caption(&self) -> String {
        let mut parts = Vec::with_capacity(4);
        if let Some(t) = self.exposure_time.filter(|t| *t > 0.0) {
            parts.push(format_exposure(t));
        }
        if let Some(f) = self.f_number.filter(|f| *f > 0.0) {
            parts.push(format!("f/{}", trim_decimal(f, 1)));
        }
        if let Some(iso) = self.iso.filter(|iso| *iso > 0) {
            parts.push(format!("ISO {iso}"));
        }
        if let Some(mm) = self.focal_length.filter(|mm| *mm > 0.0) {
            parts.push(format!("{}mm", mm.round() as u64));
        }
        parts.join("  ")
    }
}

fn format_exposure(secs: f64) -> String {
    if secs < 1.0 {
        format!("1/{}s", (1.0 / secs).round() as u64)
    } else {
        format!("{}s", trim_decimal(secs, 1))
    }
}

fn trim_decimal(v: f64, places: usize) -> String {
    let s = format!("{v:.places$}");
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.').to_string()
    } else {
        s
    }
}

/// Parse a raw EXIF block (with or without the `Exif\0\0` APP1 prefix).
pub fn parse_exif(raw: &[u8]) -> ExifSummary {
    let tiff = raw.strip_prefix(b"Exif\0\0").unwrap_or(raw);
    let Some(reader) = TiffReader::new(tiff) else {
        return ExifSummary::default();
    };

    let mut out = ExifSummary::default();
    let Some(ifd0) = reader.u32_at(4) else {
        return out;
    };
    let mut exif_ifd = None;
    reader.visit_ifd(ifd0 as usize, |entry| {
        if entry.tag == TAG_EXIF_IFD {
            exif_ifd = reader.integer(&entry);
        } else {
            reader.apply(&entry, &mut out);
        }
    });
    if let Some(offset) = exif_ifd {
        reader.visit_ifd(offset as usize, |entry| reader.apply(&entry, &mut out));
    }
    out
}

#[derive(Clone, Copy, Debug)]
struct IfdEntry {
    tag: u16,
    kind: u16,
    count: u32,
    /// Offset of the 4-byte value/offset field within the TIFF block.
    value_pos: usize,
}

struct TiffReader<'a> {
    data: &'a [u8],
    little_endian: bool,
}

impl<'a> TiffReader<'a> {
    fn new(data: &'a [u8]) -> Option<Self> {
        let little_endian = match data.get(0..2)? {
            b"II" => true,
            b"MM" => false,
            _ => return None,
        };
        let reader = Self {
            data,
            little_endian,
        };
        (reader.u16_at(2)? == 42).then_some(reader)
    }

    fn u16_at(&self, pos: usize) -> Option<u16> {
        let b: [u8; 2] = self.data.get(pos..pos + 2)?.try_into().ok()?;
        Some(if self.little_endian {
            u16::from_le_bytes(b)
        } else {
            u16::from_be_bytes(b)
        })
    }

    fn u32_at(&self, pos: usize) -> Option<u32> {
        let b: [u8; 4] = self.data.get(pos..pos + 4)?.try_into().ok()?;
        Some(if self.little_endian {
            u32::from_le_bytes(b)
        } else {
            u32::from_be_bytes(b)
        })
    }

    fn visit_ifd(&self, offset: usize, mut f: impl FnMut(IfdEntry)) {
        let Some(count) = self.u16_at(offset) else {
            return;
        };
        for i in 0..usize::from(count) {
            let pos = offset + 2 + i * 12;
            let (Some(tag), Some(kind), Some(n)) =
                (self.u16_at(pos), self.u16_at(pos + 2), self.u32_at(pos + 4))
            else {
                return;
            };
            f(IfdEntry {
                tag,
                kind,
                count: n,
                value_pos: pos + 8,
            });
        }
    }

    fn integer(&self, entry: &IfdEntry) -> Option<u32> {
        if entry.count == 0 {
            return None;
        }
        match entry.kind {
            TYPE_SHORT => self.u16_at(entry.value_pos).map(u32::from),
            TYPE_LONG => self.u32_at(entry.value_pos),
            _ => None,
        }
    }

    fn rational(&self, entry: &IfdEntry) -> Option<f64> {
        if entry.count == 0 {
            return None;
        }
        let at = self.u32_at(entry.value_pos)? as usize;
        let (num, den) = match entry.kind {
            TYPE_RATIONAL => (
                f64::from(self.u32_at(at)?),
                f64::from(self.u32_at(at + 4)?),
            ),
            TYPE_SRATIONAL => (
                f64::from(self.u32_at(at)? as i32),
                f64::from(self.u32_at(at + 4)? as i32),
            ),
            _ => return None,
        };
        (den != 0.0).then(|| num / den)
    }

    fn apply(&self, entry: &IfdEntry, out: &mut ExifSummary) {
        match entry.tag {
            TAG_EXPOSURE_TIME => out.exposure_time = self.rational(entry),
            TAG_F_NUMBER => out.f_number = self.rational(entry),
            TAG_ISO => out.iso = self.integer(entry),
            TAG_FOCAL_LENGTH => out.focal_length = self.rational(entry),
            _ => {}
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/exif.rs"]
mod tests;
