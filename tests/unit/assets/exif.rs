use super::*;

/// Build a TIFF block: IFD0 pointing at an Exif IFD with the given exposure tags.
fn tiff(little_endian: bool, with_prefix: bool) -> Vec<u8> {
    let u16b = |v: u16| {
        if little_endian {
            v.to_le_bytes()
        } else {
            v.to_be_bytes()
        }
    };
    let u32b = |v: u32| {
        if little_endian {
            v.to_le_bytes()
        } else {
            v.to_be_bytes()
        }
    };

    let mut out = Vec::new();
    out.extend_from_slice(if little_endian { b"II" } else { b"MM" });
    out.extend_from_slice(&u16b(42));
    out.extend_from_slice(&u32b(8));

    // IFD0 at 8: one entry pointing at the Exif IFD (26).
    out.extend_from_slice(&u16b(1));
    out.extend_from_slice(&u16b(TAG_EXIF_IFD));
    out.extend_from_slice(&u16b(TYPE_LONG));
    out.extend_from_slice(&u32b(1));
    out.extend_from_slice(&u32b(26));
    out.extend_from_slice(&u32b(0));
    assert_eq!(out.len(), 26);

    // Exif IFD at 26: four entries, rational data from 80.
    out.extend_from_slice(&u16b(4));
    let mut entry = |tag: u16, kind: u16, value: [u8; 4]| {
        out.extend_from_slice(&u16b(tag));
        out.extend_from_slice(&u16b(kind));
        out.extend_from_slice(&u32b(1));
        out.extend_from_slice(&value);
    };
    entry(TAG_EXPOSURE_TIME, TYPE_RATIONAL, u32b(80));
    entry(TAG_F_NUMBER, TYPE_RATIONAL, u32b(88));
    let mut iso = [0u8; 4];
    iso[..2].copy_from_slice(&u16b(200));
    entry(TAG_ISO, TYPE_SHORT, iso);
    entry(TAG_FOCAL_LENGTH, TYPE_RATIONAL, u32b(96));
    out.extend_from_slice(&u32b(0));
    assert_eq!(out.len(), 80);

    for (num, den) in [(1u32, 125u32), (28, 10), (35, 1)] {
        out.extend_from_slice(&u32b(num));
        out.extend_from_slice(&u32b(den));
    }

    if with_prefix {
        let mut prefixed = b"Exif\0\0".to_vec();
        prefixed.extend_from_slice(&out);
        prefixed
    } else {
        out
    }
}

#[test]
fn parses_little_endian_block() {
    let s = parse_exif(&tiff(true, false));
    assert_eq!(s.iso, Some(200));
    assert!((s.exposure_time.unwrap() - 0.008).abs() < 1e-12);
    assert!((s.f_number.unwrap() - 2.8).abs() < 1e-12);
    assert_eq!(s.focal_length, Some(35.0));
    assert_eq!(s.caption(), "1/125s  f/2.8  ISO 200  35mm");
}

#[test]
fn parses_big_endian_block_with_app1_prefix() {
    let s = parse_exif(&tiff(false, true));
    assert_eq!(s.caption(), "1/125s  f/2.8  ISO 200  35mm");
}

#[test]
fn missing_fields_are_skipped() {
    let s = ExifSummary {
        f_number: Some(8.0),
        iso: Some(100),
        ..ExifSummary::default()
    };
    assert_eq!(s.caption(), "f/8  ISO 100");
    assert_eq!(ExifSummary::default().caption(), "");
}

#[test]
fn long_exposures_use_seconds() {
    let s = ExifSummary {
        exposure_time: Some(2.5),
        ..ExifSummary::default()
    };
    assert_eq!(s.caption(), "2.5s");
}

#[test]
fn garbage_is_not_an_error() {
    assert!(parse_exif(b"").is_empty());
    assert!(parse_exif(b"not exif at all").is_empty());

    let mut truncated = tiff(true, false);
    truncated.truncate(40);
    let s = parse_exif(&truncated);
    assert!(s.focal_length.is_none());
}
