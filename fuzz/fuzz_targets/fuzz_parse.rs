#![no_main]

use libfuzzer_sys::fuzz_target;
use jpeg_comment_io::JpegIO;
use std::io::Cursor;

fuzz_target!(|data: &[u8]| {
    // Scanning any input should NEVER panic, only return errors
    let handler = JpegIO::new();
    let Ok(mut structure) = handler.parse(&mut Cursor::new(data)) else {
        return;
    };

    if let Some(exif) = &structure.exif {
        let _ = exif.user_comment();
        let _ = exif.orientation();
    }

    // Rewrite unchanged, then with a comment inserted
    let mut output = Vec::new();
    let _ = handler.write(&structure.catalog, &mut Cursor::new(data), &mut output);

    structure.catalog.upsert_comment(b"fuzz".to_vec());
    let mut output = Vec::new();
    let _ = handler.write(&structure.catalog, &mut Cursor::new(data), &mut output);
});
