//! Example: List the segments of a JPEG and show its comment
//!
//! Run: `cargo run --example inspect -- <file.jpg> [new comment]`
//!
//! With a second argument the comment is replaced and the file saved in place.

use jpeg_comment_io::{JpegDocument, SegmentSource};
use std::env;

fn main() -> jpeg_comment_io::Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <image_file> [new comment]", args[0]);
        std::process::exit(1);
    }

    let filename = &args[1];
    println!("Parsing: {}", filename);

    let mut doc = JpegDocument::open(filename)?;

    println!("\nFile structure:");
    println!("  Total size: {} bytes", doc.size());
    println!("  Segments: {}", doc.segments().len());

    if let Some(jfif) = doc.jfif_info() {
        println!("  {}", jfif);
    }

    println!("\nSegment breakdown:");
    for (i, segment) in doc.segments().iter().enumerate() {
        match &segment.source {
            SegmentSource::Offset(offset) => println!(
                "  [{}] {:<9} 0xFF{:02X} at {} ({} bytes)",
                i, segment.name, segment.marker, offset, segment.length
            ),
            SegmentSource::Buffer(data) => println!(
                "  [{}] {:<9} 0xFF{:02X} buffered ({} bytes)",
                i,
                segment.name,
                segment.marker,
                data.len()
            ),
        }
    }

    match doc.exif() {
        Some(exif) => {
            println!(
                "\n✓ Found EXIF ({:?}, {} entries, TIFF header at {})",
                exif.byte_order(),
                exif.entries().count(),
                exif.base_offset()
            );
            if let Some(orientation) = exif.orientation() {
                println!("  Orientation: {}", orientation);
            }
        }
        None => println!("\n✗ No EXIF data found"),
    }

    let comment = doc.comment();
    if comment.is_empty() {
        println!("\n✗ No comment");
    } else {
        println!("\n✓ Comment: {}", comment);
    }

    if let Some(text) = args.get(2) {
        doc.set_comment(text)?;
        let saved = doc.save(filename)?;
        println!("\nSaved new comment to {}", saved.display());
    }

    Ok(())
}
