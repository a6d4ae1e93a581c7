#![no_main]

use libfuzzer_sys::fuzz_target;
use jpeg_comment_io::ExifDecoder;

fuzz_target!(|data: &[u8]| {
    // Arbitrary TIFF payloads: cycles and wild offsets must be refused
    if let Ok(exif) = ExifDecoder::parse(data.to_vec(), 0) {
        for entry in exif.entries() {
            let _ = exif.value_bytes(entry);
            let _ = exif.ascii_value(entry);
        }
        let _ = exif.user_comment_charset();
        let _ = exif.user_comment();
    }
});
