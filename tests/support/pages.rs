//! HTML and image fixtures shaped like the media search site.

use std::io::Cursor;

use image::{ImageFormat, RgbImage};

/// A search page with one result anchor per `(file_name, thumb_path)` pair.
///
/// `thumb_path` is appended to `image_host` and should contain `/thumb/`.
pub fn search_page(image_host: &str, files: &[&str]) -> String {
    let anchors: String = files
        .iter()
        .map(|name| {
            format!(
                r#"<a class="sdms-image-result" href="/wiki/File:{name}">
                     <img data-src="{image_host}{}">
                   </a>"#,
                thumb_path(name)
            )
        })
        .collect();
    format!("<html><body><div class=\"sdms-search-results\">{anchors}</div></body></html>")
}

/// Thumbnail path for a file, at 250 px.
pub fn thumb_path(name: &str) -> String {
    format!("/wikipedia/commons/thumb/a/ab/{name}/250px-{name}")
}

/// Sized path for a file at `width` px.
pub fn sized_path(name: &str, width: u32) -> String {
    format!("/wikipedia/commons/thumb/a/ab/{name}/{width}px-{name}")
}

/// Original file path.
pub fn original_path(name: &str) -> String {
    format!("/wikipedia/commons/a/ab/{name}")
}

/// A file page with author, description and original dimensions.
pub fn detail_page(author: &str, description: &str, width: u32, height: u32) -> String {
    format!(
        r#"<html><head><title>File:photo.jpg - Wikimedia Commons</title></head><body>
             <div class="fullMedia"><span class="fileInfo">{width} × {height} pixels, file size: 1.2 MB</span></div>
             <table>
               <tr><td class="description">{description}</td></tr>
               <tr><td>Author</td><td>{author}</td></tr>
             </table>
           </body></html>"#
    )
}

/// A small encoded JPEG.
pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = Cursor::new(Vec::new());
    RgbImage::from_pixel(width, height, image::Rgb([200, 80, 40]))
        .write_to(&mut bytes, ImageFormat::Jpeg)
        .expect("encode jpeg fixture");
    bytes.into_inner()
}
